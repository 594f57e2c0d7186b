//! Analysis-to-signal gate pipeline and level calculus.

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::error::EngineError;
use crate::models::{
    AnalysisSnapshot, MarketTrend, SignalDraft, SignalStatus, SignalStrength, SignalType,
    SignalVerdict, TradeSignal,
};
use crate::services::signals_repo::SignalsRepository;

const BUY_SCORE: f64 = 65.0;
const SELL_SCORE: f64 = 35.0;
const MIN_CONFIDENCE: f64 = 0.50;

const ADX_STRONG: f64 = 25.0;
const ADX_WEAK: f64 = 20.0;

const STRONG_SCORE_HIGH: f64 = 75.0;
const STRONG_SCORE_LOW: f64 = 25.0;
const STRONG_CONFIDENCE: f64 = 0.70;
const WEAK_CONFIDENCE: f64 = 0.60;

const STOP_MULT: f64 = 1.5;
const TARGET_MULT: f64 = 2.5;
// Strength scales both multipliers by +/-15%.
const STRENGTH_ADJ: f64 = 0.15;

// Percentage fallback when no usable ATR is available.
const PCT_STOP: f64 = 0.015;
const PCT_TARGET: f64 = 0.03;

const MIN_RISK_REWARD: f64 = 1.5;
const MAX_REASONS: usize = 5;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn timeframe_factor(timeframe: &str) -> f64 {
    match timeframe {
        "1W" => 0.7,
        "3M" | "6M" | "1Y" => 1.3,
        _ => 1.0,
    }
}

fn trend_label(trend: Option<MarketTrend>) -> &'static str {
    match trend {
        Some(MarketTrend::Bullish) => "bullish",
        Some(MarketTrend::Bearish) => "bearish",
        Some(MarketTrend::Neutral) => "neutral",
        None => "trendless",
    }
}

/// Push one analysis snapshot through the ordered gates. The first failing
/// gate short-circuits with its reason; a full pass yields a bounded draft.
pub fn generate(analysis: &AnalysisSnapshot) -> SignalVerdict {
    let score = analysis.score;
    let confidence = analysis.confidence;
    let price = analysis.price;

    // Gate 1: score zone.
    let signal_type = if score >= BUY_SCORE {
        SignalType::Buy
    } else if score <= SELL_SCORE {
        SignalType::Sell
    } else {
        return SignalVerdict::rejected(format!("neutral zone (score {score:.1})"));
    };

    // Gate 2: confidence floor.
    if confidence < MIN_CONFIDENCE {
        return SignalVerdict::rejected(format!(
            "confidence {confidence:.2} below {MIN_CONFIDENCE:.2} floor"
        ));
    }

    // Gate 3: regime compatibility. A counter-trend signal survives only a
    // weak or absent opposing trend.
    let trend = analysis.technicals.trend.or(analysis.risk.market_trend);
    let adx = analysis.technicals.adx;
    let trend_is_weak = adx.is_none_or(|a| a < ADX_WEAK);

    let opposing = matches!(
        (signal_type, trend),
        (SignalType::Buy, Some(MarketTrend::Bearish))
            | (SignalType::Sell, Some(MarketTrend::Bullish))
    );

    let mut counter_trend = false;
    if opposing {
        if trend_is_weak {
            counter_trend = true;
        } else {
            let qualifier = if adx.is_some_and(|a| a > ADX_STRONG) {
                "strong "
            } else {
                ""
            };
            return SignalVerdict::rejected(format!(
                "{} against a {qualifier}{} regime (ADX {})",
                signal_type.as_str(),
                trend_label(trend),
                adx.map(|a| format!("{a:.1}")).unwrap_or_else(|| "n/a".into()),
            ));
        }
    }

    // Gate 4: strength classification. A counter-trend pass from the regime
    // gate caps the signal at WEAK no matter how extreme the numbers are.
    let extreme_score = score >= STRONG_SCORE_HIGH || score <= STRONG_SCORE_LOW;
    let strength = if counter_trend || confidence < WEAK_CONFIDENCE {
        SignalStrength::Weak
    } else if extreme_score && confidence >= STRONG_CONFIDENCE {
        SignalStrength::Strong
    } else {
        SignalStrength::Moderate
    };

    // Gate 5: level calculation.
    let (stop_mult, target_mult) = match strength {
        SignalStrength::Strong => (
            STOP_MULT * (1.0 - STRENGTH_ADJ),
            TARGET_MULT * (1.0 + STRENGTH_ADJ),
        ),
        SignalStrength::Weak => (
            STOP_MULT * (1.0 + STRENGTH_ADJ),
            TARGET_MULT * (1.0 - STRENGTH_ADJ),
        ),
        SignalStrength::Moderate => (STOP_MULT, TARGET_MULT),
    };

    let direction = match signal_type {
        SignalType::Buy => 1.0,
        SignalType::Sell => -1.0,
    };

    let atr = analysis.risk.atr.filter(|a| *a > 0.0);
    let (mut stop_loss, mut target_price) = match atr {
        Some(atr) => (
            price - direction * atr * stop_mult,
            price + direction * atr * target_mult,
        ),
        None => (
            price * (1.0 - direction * PCT_STOP),
            price * (1.0 + direction * PCT_TARGET),
        ),
    };

    // Gate 6: timeframe scaling of both distances from entry.
    let factor = timeframe_factor(&analysis.timeframe);
    stop_loss = round2(price + (stop_loss - price) * factor);
    target_price = round2(price + (target_price - price) * factor);

    let gain = (target_price - price).abs();
    let loss = (price - stop_loss).abs();
    if loss <= 0.0 {
        return SignalVerdict::rejected("stop distance rounded to zero".to_string());
    }
    let risk_reward = gain / loss;

    // Gate 7: risk-reward floor.
    if risk_reward < MIN_RISK_REWARD {
        return SignalVerdict::rejected(format!(
            "risk-reward {risk_reward:.2} below {MIN_RISK_REWARD:.1} minimum"
        ));
    }

    let mut reasons = Vec::with_capacity(MAX_REASONS);
    if strength == SignalStrength::Strong {
        reasons.push(format!(
            "Strong {} setup in a {} regime",
            signal_type.as_str(),
            trend_label(trend)
        ));
    }
    reasons.extend(analysis.reasons.iter().cloned());
    reasons.truncate(MAX_REASONS);

    SignalVerdict::Accepted(SignalDraft {
        signal_type,
        entry_price: round2(price),
        target_price,
        stop_loss,
        score,
        confidence: confidence.clamp(0.0, 0.99),
        reasons,
        risk_reward: round2(risk_reward),
        strength,
    })
}

fn expiry_horizon_days(timeframe: &str) -> i64 {
    match timeframe {
        "1W" => 7,
        "1M" => 30,
        "3M" => 90,
        "6M" => 180,
        "1Y" => 365,
        _ => 30,
    }
}

/// Persists an accepted draft as an ACTIVE signal, honoring the store's
/// one-ACTIVE-per-(user, symbol) rule. Returns `None` when a live signal
/// already occupies the slot.
pub async fn record_signal<R: SignalsRepository>(
    repo: &R,
    user_id: ObjectId,
    symbol: &str,
    draft: SignalDraft,
    timeframe: &str,
) -> Result<Option<TradeSignal>, EngineError> {
    if repo.find_active(user_id, symbol).await?.is_some() {
        tracing::info!(symbol, "active signal already exists, skipping");
        return Ok(None);
    }

    let now = Utc::now().timestamp();
    let signal = TradeSignal {
        id: ObjectId::new(),
        user_id,
        symbol: symbol.to_string(),
        signal_type: draft.signal_type,
        entry_price: draft.entry_price,
        target_price: draft.target_price,
        stop_loss: draft.stop_loss,
        score: draft.score,
        confidence: draft.confidence,
        reasons: draft.reasons,
        risk_reward: draft.risk_reward,
        status: SignalStatus::Active,
        timeframe: timeframe.to_string(),
        created_at: now,
        expires_at: Some(now + expiry_horizon_days(timeframe) * 86_400),
        exit_price: None,
        return_pct: None,
        closed_at: None,
    };

    repo.insert(&signal).await?;
    Ok(Some(signal))
}
