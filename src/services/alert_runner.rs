//! One check cycle over a user's active alerts.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use mongodb::bson::oid::ObjectId;

use crate::error::EngineError;
use crate::models::{Alert, AlertHistoryEntry, CheckResult, CheckSummary, is_push_channel};
use crate::services::alerts_repo::AlertsRepository;
use crate::services::condition_evaluator::{self, CrossingMemory};
use crate::services::data_cache::{CacheClock, DataCache};
use crate::services::notifier::{NotificationPayload, Notifier};
use crate::services::provider::MarketDataProvider;
use crate::services::rate_limiter::RateLimiter;

// A stuck provider cannot hold a batch open forever; whatever was evaluated
// before the deadline is still returned.
const BATCH_DEADLINE: Duration = Duration::from_secs(120);

/// Runs one batch check for `user_id` and returns the per-alert outcomes.
///
/// Symbols are processed sequentially with a paced gap in between; one bad
/// symbol or one failed write never aborts the batch. The caller is expected
/// to serialize concurrent runs for the same user.
pub async fn run_user_check<P, C, R, N>(
    user_id: ObjectId,
    repo: &R,
    cache: &mut DataCache<P, C>,
    limiter: &mut RateLimiter,
    memory: &mut CrossingMemory,
    notifier: &N,
) -> Result<CheckSummary, EngineError>
where
    P: MarketDataProvider,
    C: CacheClock,
    R: AlertsRepository,
    N: Notifier,
{
    let alerts = repo.active_alerts(user_id).await?;
    let now = Utc::now().timestamp();

    let mut summary = CheckSummary::default();
    let mut by_symbol: HashMap<String, Vec<Alert>> = HashMap::new();

    for alert in alerts {
        if alert.is_expired(now) {
            // Expired alerts are swept out of rotation: no trigger, no
            // history entry, not counted as checked.
            if let Err(e) = repo.deactivate(alert.id, alert.user_id).await {
                tracing::warn!(alert_id = %alert.id, error = %e, "expiry sweep write failed");
            }
            continue;
        }
        by_symbol.entry(alert.symbol.clone()).or_default().push(alert);
    }

    let started = Instant::now();

    for (symbol, group) in by_symbol {
        if started.elapsed() > BATCH_DEADLINE {
            tracing::warn!(%symbol, "batch deadline exceeded, returning partial summary");
            break;
        }

        limiter.acquire().await;

        let Some(quote) = cache.get_quote(&symbol).await else {
            for alert in &group {
                summary.push(CheckResult {
                    alert_id: alert.id,
                    symbol: symbol.clone(),
                    triggered: false,
                    current_value: None,
                    message: None,
                    error: Some(format!("no quote data for {symbol}")),
                });
            }
            continue;
        };

        let needs_history = group.iter().any(|a| a.condition.indicator.needs_history());
        let history = if needs_history {
            cache.get_history(&symbol).await
        } else {
            None
        };

        for alert in group {
            // A failed history fetch is a provider outage, not a short
            // series; count it as an error instead of evaluating.
            if alert.condition.indicator.needs_history() && history.is_none() {
                summary.push(CheckResult {
                    alert_id: alert.id,
                    symbol: symbol.clone(),
                    triggered: false,
                    current_value: None,
                    message: None,
                    error: Some(format!("no history data for {symbol}")),
                });
                continue;
            }

            let eval = condition_evaluator::evaluate(
                alert.id,
                &symbol,
                &alert.condition,
                &quote,
                history.as_ref(),
                memory,
            );

            let mut error = None;

            if eval.triggered {
                match repo.mark_triggered(&alert, now, eval.current_value).await {
                    Ok(()) => {
                        let entry = AlertHistoryEntry {
                            id: ObjectId::new(),
                            alert_id: alert.id,
                            user_id: alert.user_id,
                            symbol: symbol.clone(),
                            condition: alert.condition.clone(),
                            message: eval.message.clone(),
                            triggered_value: eval.current_value,
                            created_at: now,
                        };
                        if let Err(e) = repo.append_history(&entry).await {
                            tracing::warn!(alert_id = %alert.id, error = %e, "history append failed");
                        }

                        if alert.wants_push() {
                            notify(notifier, &alert, &eval.message, eval.current_value).await;
                        }
                    }
                    Err(e) => error = Some(e.to_string()),
                }
            } else if let Err(e) = repo.touch_last_checked(alert.id, alert.user_id, now).await {
                error = Some(e.to_string());
            }

            summary.push(CheckResult {
                alert_id: alert.id,
                symbol: symbol.clone(),
                triggered: eval.triggered && error.is_none(),
                current_value: Some(eval.current_value),
                message: Some(eval.message),
                error,
            });
        }
    }

    Ok(summary)
}

async fn notify<N: Notifier>(notifier: &N, alert: &Alert, message: &str, value: f64) {
    let payload = NotificationPayload {
        symbol: alert.symbol.clone(),
        message: message.to_string(),
        triggered_value: value,
    };

    let push_channels = alert
        .notification_channels
        .iter()
        .filter(|c| is_push_channel(c));

    for channel in push_channels {
        if let Err(e) = notifier.dispatch(channel, &payload).await {
            tracing::warn!(alert_id = %alert.id, %channel, error = %e, "notification dispatch failed");
        }
    }
}
