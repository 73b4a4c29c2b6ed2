//! Registry of business operations that movements reference.
//!
//! Exchanges, transfers and service payments are owned by their own modules;
//! they register the operation here before recording its balance effect, so
//! the ledger can refuse rows pointing at nothing.

use cashpoint_core::ledger::{LedgerError, ReferenceType};
use cashpoint_shared::types::{PointId, ReferenceId};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set};

use super::error::RepoResult;
use crate::entities::{business_references, sea_orm_active_enums};

/// Reference registry repository.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    db: DatabaseConnection,
}

impl ReferenceRepository {
    /// Creates a new reference repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers an operation. Registering the same operation twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn register(
        &self,
        reference_type: ReferenceType,
        reference_id: ReferenceId,
        point_id: Option<PointId>,
    ) -> RepoResult<()> {
        let row = business_references::ActiveModel {
            reference_type: Set(reference_type.into()),
            reference_id: Set(reference_id.into_inner()),
            point_id: Set(point_id.map(PointId::into_inner)),
            created_at: Set(Utc::now().into()),
        };
        business_references::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    business_references::Column::ReferenceType,
                    business_references::Column::ReferenceId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Fails unless the referenced operation is registered. ADJUSTMENT
    /// references are produced by reconciliation and never registered.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReferenceNotFound` if the operation is unknown.
    pub async fn ensure_exists<C: ConnectionTrait>(
        conn: &C,
        reference_type: ReferenceType,
        reference_id: ReferenceId,
    ) -> RepoResult<()> {
        if !reference_type.requires_registration() {
            return Ok(());
        }
        let found = business_references::Entity::find_by_id((
            sea_orm_active_enums::ReferenceType::from(reference_type),
            reference_id.into_inner(),
        ))
        .one(conn)
        .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(LedgerError::ReferenceNotFound {
                reference_type: reference_type.as_str(),
                reference_id: reference_id.into_inner(),
            }
            .into()),
        }
    }
}
