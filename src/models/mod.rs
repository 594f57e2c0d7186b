pub mod alert;
pub mod market;
pub mod signal;

pub use alert::{
    Alert, AlertCondition, AlertHistoryEntry, CheckResult, CheckSummary, Indicator, Operator,
    is_push_channel,
};
pub use market::{HistoricalSeries, QuoteSnapshot};
pub use signal::{
    AnalysisSnapshot, MarketTrend, RiskContext, SignalDraft, SignalStatus, SignalStrength,
    SignalType, SignalVerdict, TechnicalContext, TradeSignal,
};
