use crate::application::CommandOutcome;
use crate::domain::{Strategy, SystemStatus, Timestamp};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Successful command response: `{status: "success", ...outcome}`
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

impl From<CommandOutcome> for CommandResponse {
    fn from(outcome: CommandOutcome) -> Self {
        CommandResponse {
            status: "success",
            outcome,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error",
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BannerResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub stream: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub version: &'static str,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        MessageResponse {
            status: "success",
            message: message.into(),
        }
    }
}

/// Dashboard view: system aggregate plus every strategy
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_profit: Decimal,
    pub total_trades: u64,
    /// Percentage of completed orders that filled; null before any completes
    pub success_rate: Option<Decimal>,
    pub active_strategies: usize,
    pub uptime: String,
    pub strategies: Vec<Strategy>,
}

impl DashboardResponse {
    pub fn new(
        status: SystemStatus,
        success_rate: Option<Decimal>,
        uptime: Duration,
        strategies: Vec<Strategy>,
    ) -> Self {
        DashboardResponse {
            total_profit: status.total_profit,
            total_trades: status.total_trades,
            success_rate,
            active_strategies: status.active_strategies,
            uptime: format_uptime(uptime),
            strategies,
        }
    }
}

/// `24h 15m` style uptime
pub fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub strategy: Option<String>,
    #[serde(alias = "order_type")]
    pub side: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub level: Option<String>,
    pub source: Option<String>,
    pub limit: Option<usize>,
}

impl LogsQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}
