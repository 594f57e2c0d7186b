//! Signal persistence and outcome sweep against in-memory collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mongodb::bson::oid::ObjectId;

use marketpulse::error::EngineError;
use marketpulse::models::{
    AnalysisSnapshot, HistoricalSeries, QuoteSnapshot, RiskContext, SignalStatus, SignalVerdict,
    TechnicalContext, TradeSignal,
};
use marketpulse::services::data_cache::DataCache;
use marketpulse::services::outcome_tracker::sweep_user_signals;
use marketpulse::services::provider::MarketDataProvider;
use marketpulse::services::rate_limiter::RateLimiter;
use marketpulse::services::signal_generator::{generate, record_signal};
use marketpulse::services::signals_repo::SignalsRepository;

#[derive(Clone, Default)]
struct MockProvider {
    quotes: Arc<Mutex<HashMap<String, QuoteSnapshot>>>,
}

impl MockProvider {
    fn set_quote(&self, symbol: &str, price: f64, high: f64, low: f64) {
        self.quotes.lock().unwrap().insert(
            symbol.to_string(),
            QuoteSnapshot {
                price,
                day_high: Some(high),
                day_low: Some(low),
                ..QuoteSnapshot::default()
            },
        );
    }
}

impl MarketDataProvider for MockProvider {
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, EngineError> {
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| EngineError::DataUnavailable(format!("no quote for {symbol}")))
    }

    async fn history(&self, _symbol: &str) -> Result<HistoricalSeries, EngineError> {
        Ok(HistoricalSeries::default())
    }
}

#[derive(Default)]
struct MockSignalsRepo {
    signals: Mutex<Vec<TradeSignal>>,
}

impl SignalsRepository for MockSignalsRepo {
    async fn active_signals(&self, user_id: ObjectId) -> Result<Vec<TradeSignal>, EngineError> {
        Ok(self
            .signals
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.status == SignalStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_active(
        &self,
        user_id: ObjectId,
        symbol: &str,
    ) -> Result<Option<TradeSignal>, EngineError> {
        Ok(self
            .signals
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.symbol == symbol && s.status == SignalStatus::Active)
            .cloned())
    }

    async fn insert(&self, signal: &TradeSignal) -> Result<(), EngineError> {
        let mut signals = self.signals.lock().unwrap();
        let clash = signals.iter().any(|s| {
            s.user_id == signal.user_id
                && s.symbol == signal.symbol
                && s.status == SignalStatus::Active
        });
        if clash {
            return Err(EngineError::Persistence("duplicate active signal".into()));
        }
        signals.push(signal.clone());
        Ok(())
    }

    async fn close(
        &self,
        signal_id: ObjectId,
        user_id: ObjectId,
        status: SignalStatus,
        exit_price: f64,
        return_pct: f64,
        now: i64,
    ) -> Result<(), EngineError> {
        for s in self.signals.lock().unwrap().iter_mut() {
            if s.id == signal_id && s.user_id == user_id && s.status == SignalStatus::Active {
                s.status = status;
                s.exit_price = Some(exit_price);
                s.return_pct = Some(return_pct);
                s.closed_at = Some(now);
            }
        }
        Ok(())
    }
}

fn strong_buy_analysis(price: f64) -> AnalysisSnapshot {
    AnalysisSnapshot {
        price,
        score: 82.0,
        confidence: 0.85,
        risk: RiskContext {
            atr: Some(price * 0.01),
            ..RiskContext::default()
        },
        technicals: TechnicalContext::default(),
        timeframe: "1M".to_string(),
        reasons: vec!["momentum breakout".to_string(), "volume surge".to_string()],
    }
}

#[tokio::test]
async fn accepted_draft_is_recorded_as_an_active_signal() {
    let repo = MockSignalsRepo::default();
    let user = ObjectId::new();

    let SignalVerdict::Accepted(draft) = generate(&strong_buy_analysis(3500.0)) else {
        panic!("expected acceptance");
    };

    let signal = record_signal(&repo, user, "TCS.NS", draft, "1M")
        .await
        .unwrap()
        .expect("slot was free");

    assert_eq!(signal.status, SignalStatus::Active);
    assert_eq!(signal.symbol, "TCS.NS");
    assert!(signal.expires_at.is_some());
    assert!(signal.risk_reward >= 1.5);
}

#[tokio::test]
async fn second_signal_for_the_same_slot_is_skipped() {
    let repo = MockSignalsRepo::default();
    let user = ObjectId::new();

    let SignalVerdict::Accepted(draft) = generate(&strong_buy_analysis(3500.0)) else {
        panic!("expected acceptance");
    };
    let SignalVerdict::Accepted(second) = generate(&strong_buy_analysis(3600.0)) else {
        panic!("expected acceptance");
    };

    assert!(
        record_signal(&repo, user, "TCS.NS", draft, "1M")
            .await
            .unwrap()
            .is_some()
    );
    // Same user and symbol while the first is still ACTIVE.
    assert!(
        record_signal(&repo, user, "TCS.NS", second, "1M")
            .await
            .unwrap()
            .is_none()
    );

    assert_eq!(repo.signals.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn sweep_closes_a_buy_signal_whose_session_high_reached_target() {
    let provider = MockProvider::default();
    let repo = MockSignalsRepo::default();
    let user = ObjectId::new();

    let SignalVerdict::Accepted(draft) = generate(&strong_buy_analysis(3500.0)) else {
        panic!("expected acceptance");
    };
    let target = draft.target_price;
    let signal = record_signal(&repo, user, "TCS.NS", draft, "1M")
        .await
        .unwrap()
        .unwrap();

    // Session high pierced the target even though the close is back below.
    provider.set_quote("TCS.NS", target - 5.0, target + 1.0, 3490.0);

    let mut cache = DataCache::new(provider.clone());
    let mut limiter = RateLimiter::new(Duration::ZERO);
    let closed = sweep_user_signals(user, &repo, &mut cache, &mut limiter)
        .await
        .unwrap();

    assert_eq!(closed, 1);
    let stored = repo.signals.lock().unwrap()[0].clone();
    assert_eq!(stored.status, SignalStatus::TargetHit);
    assert_eq!(stored.exit_price, Some(target));
    assert!(stored.return_pct.unwrap() > 0.0);
    assert_eq!(stored.id, signal.id);
}

#[tokio::test]
async fn sweep_leaves_in_range_signals_active_and_skips_missing_quotes() {
    let provider = MockProvider::default();
    let repo = MockSignalsRepo::default();
    let user = ObjectId::new();

    let SignalVerdict::Accepted(draft) = generate(&strong_buy_analysis(3500.0)) else {
        panic!("expected acceptance");
    };
    record_signal(&repo, user, "TCS.NS", draft, "1M")
        .await
        .unwrap()
        .unwrap();

    let SignalVerdict::Accepted(other) = generate(&strong_buy_analysis(1500.0)) else {
        panic!("expected acceptance");
    };
    record_signal(&repo, user, "INFY.NS", other, "1M")
        .await
        .unwrap()
        .unwrap();

    // TCS trades inside its levels; INFY has no quote this cycle.
    provider.set_quote("TCS.NS", 3505.0, 3510.0, 3495.0);

    let mut cache = DataCache::new(provider.clone());
    let mut limiter = RateLimiter::new(Duration::ZERO);
    let closed = sweep_user_signals(user, &repo, &mut cache, &mut limiter)
        .await
        .unwrap();

    assert_eq!(closed, 0);
    for s in repo.signals.lock().unwrap().iter() {
        assert_eq!(s.status, SignalStatus::Active);
    }
}
