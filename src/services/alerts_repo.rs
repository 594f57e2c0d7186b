//! Typed access to the alerts store.

use futures_util::StreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, doc, oid::ObjectId};

use crate::error::EngineError;
use crate::models::{Alert, AlertHistoryEntry};

/// Storage operations the batch runner needs. No optimistic-concurrency
/// token; last write wins, and the caller serializes runs per user.
pub trait AlertsRepository {
    fn users_with_active_alerts(
        &self,
    ) -> impl Future<Output = Result<Vec<ObjectId>, EngineError>> + Send;

    /// Active, not-yet-triggered alerts for one user.
    fn active_alerts(
        &self,
        user_id: ObjectId,
    ) -> impl Future<Output = Result<Vec<Alert>, EngineError>> + Send;

    /// Expiry sweep: the alert went past `expires_at` without firing.
    fn deactivate(
        &self,
        alert_id: ObjectId,
        user_id: ObjectId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Records a trigger. Non-recurring alerts become terminal
    /// (`is_triggered=true`, `is_active=false`); recurring alerts stay live.
    fn mark_triggered(
        &self,
        alert: &Alert,
        now: i64,
        triggered_value: f64,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn touch_last_checked(
        &self,
        alert_id: ObjectId,
        user_id: ObjectId,
        now: i64,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Append-only trigger history.
    fn append_history(
        &self,
        entry: &AlertHistoryEntry,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[derive(Clone)]
pub struct MongoAlertsRepository {
    db: Database,
}

impl MongoAlertsRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> mongodb::Collection<Alert> {
        self.db.collection::<Alert>("alerts")
    }
}

impl AlertsRepository for MongoAlertsRepository {
    async fn users_with_active_alerts(&self) -> Result<Vec<ObjectId>, EngineError> {
        let ids = self
            .alerts()
            .distinct(
                "user_id",
                doc! { "is_active": true, "is_triggered": false },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(ids
            .into_iter()
            .filter_map(|b| match b {
                Bson::ObjectId(oid) => Some(oid),
                _ => None,
            })
            .collect())
    }

    async fn active_alerts(&self, user_id: ObjectId) -> Result<Vec<Alert>, EngineError> {
        let mut cursor = self
            .alerts()
            .find(
                doc! { "user_id": user_id, "is_active": true, "is_triggered": false },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res.map_err(|e| EngineError::Persistence(e.to_string()))?);
        }

        Ok(items)
    }

    async fn deactivate(&self, alert_id: ObjectId, user_id: ObjectId) -> Result<(), EngineError> {
        self.alerts()
            .update_one(
                doc! { "_id": alert_id, "user_id": user_id },
                doc! { "$set": { "is_active": false } },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn mark_triggered(
        &self,
        alert: &Alert,
        now: i64,
        triggered_value: f64,
    ) -> Result<(), EngineError> {
        self.alerts()
            .update_one(
                doc! { "_id": alert.id, "user_id": alert.user_id },
                doc! { "$set": {
                    "is_triggered": !alert.is_recurring,
                    "is_active": alert.is_recurring,
                    "triggered_at": now,
                    "triggered_value": triggered_value,
                } },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn touch_last_checked(
        &self,
        alert_id: ObjectId,
        user_id: ObjectId,
        now: i64,
    ) -> Result<(), EngineError> {
        self.alerts()
            .update_one(
                doc! { "_id": alert_id, "user_id": user_id },
                doc! { "$set": { "last_checked_at": now } },
                None,
            )
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn append_history(&self, entry: &AlertHistoryEntry) -> Result<(), EngineError> {
        self.db
            .collection::<AlertHistoryEntry>("alert_history")
            .insert_one(entry, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        Ok(())
    }
}
