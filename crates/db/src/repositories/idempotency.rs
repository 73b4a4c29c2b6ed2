//! Idempotency keys for movement requests.
//!
//! A key is claimed inside the movement's unit of work. A concurrent request
//! with the same key blocks on the claim until the first one commits or rolls
//! back, then either replays its result or claims the key itself.

use cashpoint_shared::types::{ActorId, MovementId};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::idempotency_keys;

/// Outcome of claiming a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClaim {
    /// First use of the key; the caller records the movement.
    Claimed,
    /// The key was used before; these are the rows it produced.
    Replay(Vec<MovementId>),
}

/// Idempotency key operations.
pub struct IdempotencyStore;

impl IdempotencyStore {
    /// Claims `key` for `actor_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn claim(
        txn: &DatabaseTransaction,
        actor_id: ActorId,
        key: &str,
    ) -> RepoResult<KeyClaim> {
        let row = idempotency_keys::ActiveModel {
            actor_id: Set(actor_id.into_inner()),
            key: Set(key.to_string()),
            movement_ids: Set(serde_json::Value::Array(Vec::new())),
            created_at: Set(Utc::now().into()),
        };
        let inserted = idempotency_keys::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    idempotency_keys::Column::ActorId,
                    idempotency_keys::Column::Key,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;
        if inserted > 0 {
            return Ok(KeyClaim::Claimed);
        }

        let existing = idempotency_keys::Entity::find_by_id((actor_id.into_inner(), key.to_string()))
            .one(txn)
            .await?;
        let ids = existing
            .map(|row| parse_ids(&row.movement_ids))
            .unwrap_or_default();
        Ok(KeyClaim::Replay(ids))
    }

    /// Stores the rows a claimed key produced.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn complete(
        txn: &DatabaseTransaction,
        actor_id: ActorId,
        key: &str,
        movement_ids: &[MovementId],
    ) -> RepoResult<()> {
        let ids = movement_ids
            .iter()
            .map(|id| serde_json::Value::String(id.to_string()))
            .collect();
        idempotency_keys::ActiveModel {
            actor_id: Set(actor_id.into_inner()),
            key: Set(key.to_string()),
            movement_ids: Set(serde_json::Value::Array(ids)),
            ..Default::default()
        }
        .update(txn)
        .await?;
        Ok(())
    }
}

fn parse_ids(value: &serde_json::Value) -> Vec<MovementId> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter_map(|s| Uuid::parse_str(s).ok())
                .map(MovementId::from_uuid)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_skips_garbage() {
        let id = Uuid::now_v7();
        let value = serde_json::json!([id.to_string(), "not-a-uuid", 42]);
        assert_eq!(parse_ids(&value), vec![MovementId::from_uuid(id)]);
    }

    #[test]
    fn test_parse_ids_of_non_array_is_empty() {
        assert!(parse_ids(&serde_json::json!({"ids": []})).is_empty());
    }
}
