//! Typed access to the signals store.

use futures_util::StreamExt;
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};

use crate::error::EngineError;
use crate::models::{SignalStatus, TradeSignal};

pub trait SignalsRepository {
    fn active_signals(
        &self,
        user_id: ObjectId,
    ) -> impl Future<Output = Result<Vec<TradeSignal>, EngineError>> + Send;

    fn find_active(
        &self,
        user_id: ObjectId,
        symbol: &str,
    ) -> impl Future<Output = Result<Option<TradeSignal>, EngineError>> + Send;

    /// Insert a new ACTIVE signal. The store keeps at most one ACTIVE signal
    /// per (user, symbol); a second insert fails the uniqueness rule.
    fn insert(
        &self,
        signal: &TradeSignal,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Move an ACTIVE signal to a terminal status with its exit numbers.
    fn close(
        &self,
        signal_id: ObjectId,
        user_id: ObjectId,
        status: SignalStatus,
        exit_price: f64,
        return_pct: f64,
        now: i64,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[derive(Clone)]
pub struct MongoSignalsRepository {
    db: Database,
}

impl MongoSignalsRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn signals(&self) -> mongodb::Collection<TradeSignal> {
        self.db.collection::<TradeSignal>("signals")
    }
}

impl SignalsRepository for MongoSignalsRepository {
    async fn active_signals(&self, user_id: ObjectId) -> Result<Vec<TradeSignal>, EngineError> {
        let mut cursor = self
            .signals()
            .find(doc! { "user_id": user_id, "status": "ACTIVE" }, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res.map_err(|e| EngineError::Persistence(e.to_string()))?);
        }

        Ok(items)
    }

    async fn find_active(
        &self,
        user_id: ObjectId,
        symbol: &str,
    ) -> Result<Option<TradeSignal>, EngineError> {
        self.signals()
            .find_one(
                doc! { "user_id": user_id, "symbol": symbol, "status": "ACTIVE" },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))
    }

    async fn insert(&self, signal: &TradeSignal) -> Result<(), EngineError> {
        // The partial unique index from db_init backs the one-ACTIVE rule.
        self.signals()
            .insert_one(signal, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

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
        self.signals()
            .update_one(
                doc! { "_id": signal_id, "user_id": user_id, "status": "ACTIVE" },
                doc! { "$set": {
                    "status": status.as_str(),
                    "exit_price": exit_price,
                    "return_pct": return_pct,
                    "closed_at": now,
                } },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(())
    }
}
