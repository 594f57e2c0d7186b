use chrono::Utc;
use mongodb::Client;

use marketpulse::config;
use marketpulse::error::EngineError;
use marketpulse::services::alert_runner;
use marketpulse::services::alerts_repo::{AlertsRepository, MongoAlertsRepository};
use marketpulse::services::condition_evaluator::CrossingMemory;
use marketpulse::services::data_cache::{CacheClock, DataCache};
use marketpulse::services::db_init;
use marketpulse::services::market_clock;
use marketpulse::services::notifier::{Notifier, TelegramNotifier};
use marketpulse::services::outcome_tracker;
use marketpulse::services::provider::{MarketDataProvider, YahooFinanceClient};
use marketpulse::services::rate_limiter::RateLimiter;
use marketpulse::services::signals_repo::{MongoSignalsRepository, SignalsRepository};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "index bootstrap failed");
    }

    let alerts_repo = MongoAlertsRepository::new(db.clone());
    let signals_repo = MongoSignalsRepository::new(db);

    let provider = YahooFinanceClient::new(settings.http_timeout());
    let mut cache = DataCache::new(provider);
    let mut limiter = RateLimiter::new(settings.symbol_fetch_gap());
    // Crossing baselines live for the life of the process; a restart
    // re-baselines every crossing alert on its first observation.
    let mut memory = CrossingMemory::new();

    let notifier = TelegramNotifier::new(
        settings.telegram_bot_token.clone(),
        settings.telegram_chat_id.clone(),
        settings.http_timeout(),
    );

    tracing::info!(
        interval_secs = settings.check_interval_secs,
        "marketpulse scheduler started"
    );

    let mut interval = tokio::time::interval(settings.check_interval());
    loop {
        interval.tick().await;

        if !market_clock::is_open(Utc::now()) {
            tracing::debug!("market closed, skipping cycle");
            continue;
        }

        if let Err(e) = run_cycle(
            &alerts_repo,
            &signals_repo,
            &mut cache,
            &mut limiter,
            &mut memory,
            &notifier,
        )
        .await
        {
            tracing::error!(error = %e, "check cycle failed");
        }
    }
}

/// One scheduler tick: alert batches and signal sweeps, user by user.
/// Per-user failures are logged and do not stop the remaining users.
async fn run_cycle<P, C, A, S, N>(
    alerts_repo: &A,
    signals_repo: &S,
    cache: &mut DataCache<P, C>,
    limiter: &mut RateLimiter,
    memory: &mut CrossingMemory,
    notifier: &N,
) -> Result<(), EngineError>
where
    P: MarketDataProvider,
    C: CacheClock,
    A: AlertsRepository,
    S: SignalsRepository,
    N: Notifier,
{
    let users = alerts_repo.users_with_active_alerts().await?;

    for user_id in users {
        match alert_runner::run_user_check(user_id, alerts_repo, cache, limiter, memory, notifier)
            .await
        {
            Ok(summary) => tracing::info!(
                %user_id,
                checked = summary.checked,
                triggered = summary.triggered,
                errors = summary.errors,
                "alert batch done"
            ),
            Err(e) => tracing::warn!(%user_id, error = %e, "alert batch failed"),
        }

        match outcome_tracker::sweep_user_signals(user_id, signals_repo, cache, limiter).await {
            Ok(closed) if closed > 0 => tracing::info!(%user_id, closed, "signals closed"),
            Ok(_) => {}
            Err(e) => tracing::warn!(%user_id, error = %e, "signal sweep failed"),
        }
    }

    Ok(())
}
