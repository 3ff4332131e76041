//! Audit event sink
//!
//! Every state-changing operation emits one event carrying the actor, the
//! action name, and the target entity. Delivery is fire-and-forget: the
//! insert runs in a spawned task, and failures are logged and swallowed so
//! they can never fail or block the primary operation.

use sqlx::PgPool;
use uuid::Uuid;

/// Audit sink for state-changing operations
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Emit an audit event without waiting for it to land.
    pub fn emit(&self, actor_id: Uuid, action: &str, entity_type: &str, entity_id: Uuid) {
        let db = self.db.clone();
        let action = action.to_string();
        let entity_type = entity_type.to_string();

        tokio::spawn(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO audit_events (actor_id, action, entity_type, entity_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(actor_id)
            .bind(&action)
            .bind(&entity_type)
            .bind(entity_id)
            .execute(&db)
            .await;

            if let Err(e) = result {
                tracing::warn!("Failed to record audit event {}: {}", action, e);
            }
        });
    }
}
