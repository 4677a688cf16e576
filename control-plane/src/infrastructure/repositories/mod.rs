mod in_memory_state_store;

pub use in_memory_state_store::InMemoryStateStore;
