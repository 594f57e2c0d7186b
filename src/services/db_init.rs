use mongodb::{
    Database, IndexModel,
    bson::doc,
    options::IndexOptions,
};

use crate::error::EngineError;

pub async fn ensure_indexes(db: &Database) -> Result<(), EngineError> {
    // alerts: the batch runner scans by (user, active, not triggered)
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "is_active": 1, "is_triggered": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
    }

    // alert_history: read back per alert, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("alert_history");
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
    }

    // signals: at most one ACTIVE signal per (user, symbol)
    {
        let col = db.collection::<mongodb::bson::Document>("signals");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "symbol": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "status": "ACTIVE" })
                    .build(),
            )
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
    }

    Ok(())
}
