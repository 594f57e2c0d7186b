use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// What an alert condition measures.
///
/// `Macd` and `Score` are accepted at creation time but have no evaluation
/// branch yet; they resolve to a non-triggered "unsupported" result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Price,
    Rsi,
    Score,
    Volume,
    Macd,
    SmaCross,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Price => "price",
            Indicator::Rsi => "rsi",
            Indicator::Score => "score",
            Indicator::Volume => "volume",
            Indicator::Macd => "macd",
            Indicator::SmaCross => "sma_cross",
        }
    }

    /// Indicators computed from the historical close series.
    pub fn needs_history(&self) -> bool {
        matches!(self, Indicator::Rsi | Indicator::SmaCross)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Above,
    Below,
    CrossesAbove,
    CrossesBelow,
}

/// The unit of `value` depends on `indicator`: currency for price, a 0-100
/// index for rsi, a multiplier of average volume for volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub indicator: Indicator,
    pub operator: Operator,
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,
    pub condition: AlertCondition,

    pub is_active: bool,
    // Terminal for non-recurring alerts unless reset externally.
    pub is_triggered: bool,
    pub is_recurring: bool,

    pub expires_at: Option<i64>,

    // e.g. ["telegram", "in_app"]
    pub notification_channels: Vec<String>,

    pub created_at: i64,
    pub last_checked_at: Option<i64>,
    pub triggered_at: Option<i64>,
    pub triggered_value: Option<f64>,
}

/// Channels delivered through the outbound dispatcher; the rest are
/// surfaced in-app only.
pub fn is_push_channel(channel: &str) -> bool {
    channel == "telegram" || channel == "push"
}

impl Alert {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    pub fn wants_push(&self) -> bool {
        self.notification_channels
            .iter()
            .any(|c| is_push_channel(c))
    }
}

/// Append-only record written when an alert fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub symbol: String,

    // Condition as it was at trigger time.
    pub condition: AlertCondition,
    pub message: String,
    pub triggered_value: f64,

    pub created_at: i64,
}

/// Per-alert outcome of one check cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub alert_id: ObjectId,
    pub symbol: String,
    pub triggered: bool,
    pub current_value: Option<f64>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Batch-level aggregate returned from one check cycle.
#[derive(Debug, Default, Serialize)]
pub struct CheckSummary {
    pub checked: usize,
    pub triggered: usize,
    pub errors: usize,
    pub results: Vec<CheckResult>,
}

impl CheckSummary {
    pub fn push(&mut self, result: CheckResult) {
        self.checked += 1;
        if result.triggered {
            self.triggered += 1;
        }
        if result.error.is_some() {
            self.errors += 1;
        }
        self.results.push(result);
    }
}
