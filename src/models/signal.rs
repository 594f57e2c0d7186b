use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Active,
    TargetHit,
    StopLoss,
    Expired,
    Cancelled,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Active => "ACTIVE",
            SignalStatus::TargetHit => "TARGET_HIT",
            SignalStatus::StopLoss => "STOP_LOSS",
            SignalStatus::Expired => "EXPIRED",
            SignalStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketTrend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

/// Persisted trade idea. At most one ACTIVE signal per (user, symbol); the
/// signals store enforces that with a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,
    pub signal_type: SignalType,

    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,

    pub score: f64,
    // Clamped to [0, 0.99] at creation.
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub risk_reward: f64,

    pub status: SignalStatus,
    pub timeframe: String,

    pub created_at: i64,
    pub expires_at: Option<i64>,

    pub exit_price: Option<f64>,
    pub return_pct: Option<f64>,
    pub closed_at: Option<i64>,
}

/// Volatility and market-regime context attached to an analysis result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskContext {
    pub volatility: Option<f64>,
    pub beta: Option<f64>,
    pub market_trend: Option<MarketTrend>,
    pub atr: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TechnicalContext {
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub trend: Option<MarketTrend>,
}

/// Externally computed analysis fed into the signal generator.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSnapshot {
    pub price: f64,
    // 0..=100
    pub score: f64,
    // 0..=1
    pub confidence: f64,
    #[serde(default)]
    pub risk: RiskContext,
    #[serde(default)]
    pub technicals: TechnicalContext,
    pub timeframe: String,
    // Human-readable detail flags produced by the analysis pipeline.
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// An accepted signal before identity/persistence fields are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDraft {
    pub signal_type: SignalType,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub score: f64,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub risk_reward: f64,
    pub strength: SignalStrength,
}

/// Outcome of pushing an analysis snapshot through the gate pipeline.
/// Rejection is a normal business decision, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalVerdict {
    Accepted(SignalDraft),
    Rejected { reason: String },
}

impl SignalVerdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        SignalVerdict::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SignalVerdict::Accepted(_))
    }
}
