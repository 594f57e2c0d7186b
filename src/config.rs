use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub check_interval_secs: u64,
    pub symbol_fetch_gap_ms: u64,
    pub http_timeout_secs: u64,

    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl Settings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn symbol_fetch_gap(&self) -> Duration {
        Duration::from_millis(self.symbol_fetch_gap_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri =
        env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB").unwrap_or_else(|_| "marketpulse".to_string());

    let check_interval_secs = env::var("CHECK_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(300);

    let symbol_fetch_gap_ms = env::var("SYMBOL_FETCH_GAP_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(100);

    let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);

    let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
    let telegram_chat_id = env::var("TELEGRAM_CHAT_ID").unwrap_or_default();

    Settings {
        mongodb_uri,
        mongodb_db,
        check_interval_secs,
        symbol_fetch_gap_ms,
        http_timeout_secs,
        telegram_bot_token,
        telegram_chat_id,
    }
}
