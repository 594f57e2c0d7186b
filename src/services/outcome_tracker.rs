//! Resolves ACTIVE signals against session price action.

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::error::EngineError;
use crate::models::{SignalStatus, SignalType, TradeSignal};
use crate::services::data_cache::{CacheClock, DataCache};
use crate::services::provider::MarketDataProvider;
use crate::services::rate_limiter::RateLimiter;
use crate::services::signals_repo::SignalsRepository;

/// What one check did to a signal. `Unchanged` leaves it ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Closed {
        status: SignalStatus,
        exit_price: f64,
        return_pct: f64,
    },
    Unchanged,
}

fn return_pct(signal_type: SignalType, entry: f64, exit: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    match signal_type {
        SignalType::Buy => (exit - entry) / entry * 100.0,
        SignalType::Sell => (entry - exit) / entry * 100.0,
    }
}

/// Checks one ACTIVE signal. Target is checked before stop, so a bar that
/// spans both resolves in the signal's favor. Expiry only applies when
/// neither level was hit and uses the current price as exit.
pub fn resolve(
    signal: &TradeSignal,
    current_price: f64,
    session_high: Option<f64>,
    session_low: Option<f64>,
    now: i64,
) -> Outcome {
    let high = session_high.unwrap_or(current_price);
    let low = session_low.unwrap_or(current_price);

    let hit = match signal.signal_type {
        SignalType::Buy => {
            if high >= signal.target_price {
                Some((SignalStatus::TargetHit, signal.target_price))
            } else if low <= signal.stop_loss {
                Some((SignalStatus::StopLoss, signal.stop_loss))
            } else {
                None
            }
        }
        SignalType::Sell => {
            if low <= signal.target_price {
                Some((SignalStatus::TargetHit, signal.target_price))
            } else if high >= signal.stop_loss {
                Some((SignalStatus::StopLoss, signal.stop_loss))
            } else {
                None
            }
        }
    };

    if let Some((status, exit_price)) = hit {
        return Outcome::Closed {
            status,
            exit_price,
            return_pct: return_pct(signal.signal_type, signal.entry_price, exit_price),
        };
    }

    if signal.expires_at.is_some_and(|t| t <= now) {
        return Outcome::Closed {
            status: SignalStatus::Expired,
            exit_price: current_price,
            return_pct: return_pct(signal.signal_type, signal.entry_price, current_price),
        };
    }

    Outcome::Unchanged
}

/// Re-checks every ACTIVE signal for one user and persists terminal outcomes.
/// Returns how many signals were closed; per-signal failures are logged and
/// skipped.
pub async fn sweep_user_signals<P, C, R>(
    user_id: ObjectId,
    repo: &R,
    cache: &mut DataCache<P, C>,
    limiter: &mut RateLimiter,
) -> Result<usize, EngineError>
where
    P: MarketDataProvider,
    C: CacheClock,
    R: SignalsRepository,
{
    let signals = repo.active_signals(user_id).await?;
    let now = Utc::now().timestamp();
    let mut closed = 0;

    for signal in signals {
        limiter.acquire().await;

        let Some(quote) = cache.get_quote(&signal.symbol).await else {
            continue;
        };

        match resolve(&signal, quote.price, quote.day_high, quote.day_low, now) {
            Outcome::Closed {
                status,
                exit_price,
                return_pct,
            } => {
                match repo
                    .close(signal.id, signal.user_id, status, exit_price, return_pct, now)
                    .await
                {
                    Ok(()) => {
                        closed += 1;
                        tracing::info!(
                            symbol = %signal.symbol,
                            status = status.as_str(),
                            exit_price,
                            "signal closed"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(signal_id = %signal.id, error = %e, "signal close failed");
                    }
                }
            }
            Outcome::Unchanged => {}
        }
    }

    Ok(closed)
}
