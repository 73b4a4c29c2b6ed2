//! Point and currency catalog.

use cashpoint_core::ledger::LedgerError;
use cashpoint_shared::types::{CurrencyId, PointId};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::{currencies, points};

/// Input for creating a point of attention.
#[derive(Debug, Clone)]
pub struct CreatePointInput {
    /// Short unique code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Input for creating a currency.
#[derive(Debug, Clone)]
pub struct CreateCurrencyInput {
    /// ISO code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Position in listings and cash-close details.
    pub display_order: i32,
}

/// Catalog repository.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
}

impl CatalogRepository {
    /// Creates a new catalog repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a point.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is taken or the insert fails.
    pub async fn create_point(&self, input: CreatePointInput) -> RepoResult<points::Model> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let point = points::ActiveModel {
            id: Set(Uuid::now_v7()),
            code: Set(input.code),
            name: Set(input.name),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(point.insert(&self.db).await?)
    }

    /// Creates a currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is taken or the insert fails.
    pub async fn create_currency(&self, input: CreateCurrencyInput) -> RepoResult<currencies::Model> {
        let currency = currencies::ActiveModel {
            id: Set(Uuid::now_v7()),
            code: Set(input.code),
            name: Set(input.name),
            display_order: Set(input.display_order),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };
        Ok(currency.insert(&self.db).await?)
    }

    /// Finds a point by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_point_by_code(&self, code: &str) -> RepoResult<Option<points::Model>> {
        Ok(points::Entity::find()
            .filter(points::Column::Code.eq(code))
            .one(&self.db)
            .await?)
    }

    /// Finds a currency by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_currency_by_code(&self, code: &str) -> RepoResult<Option<currencies::Model>> {
        Ok(currencies::Entity::find()
            .filter(currencies::Column::Code.eq(code))
            .one(&self.db)
            .await?)
    }

    /// Lists active currencies in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn active_currencies(&self) -> RepoResult<Vec<currencies::Model>> {
        Self::active_currencies_in(&self.db).await
    }

    /// Lists active currencies in display order on the given connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn active_currencies_in<C: ConnectionTrait>(
        conn: &C,
    ) -> RepoResult<Vec<currencies::Model>> {
        Ok(currencies::Entity::find()
            .filter(currencies::Column::IsActive.eq(true))
            .order_by_asc(currencies::Column::DisplayOrder)
            .order_by_asc(currencies::Column::Code)
            .all(conn)
            .await?)
    }

    /// Fails unless the point exists and is active.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PointNotFound` or `LedgerError::PointInactive`.
    pub async fn ensure_point_active<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
    ) -> RepoResult<points::Model> {
        let point = points::Entity::find_by_id(point_id.into_inner())
            .one(conn)
            .await?
            .ok_or(LedgerError::PointNotFound(point_id.into_inner()))?;
        if !point.is_active {
            return Err(LedgerError::PointInactive(point.id).into());
        }
        Ok(point)
    }

    /// Fails unless the currency exists and is active.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CurrencyNotFound` or `LedgerError::CurrencyInactive`.
    pub async fn ensure_currency_active<C: ConnectionTrait>(
        conn: &C,
        currency_id: CurrencyId,
    ) -> RepoResult<currencies::Model> {
        let currency = currencies::Entity::find_by_id(currency_id.into_inner())
            .one(conn)
            .await?
            .ok_or(LedgerError::CurrencyNotFound(currency_id.into_inner()))?;
        if !currency.is_active {
            return Err(LedgerError::CurrencyInactive(currency.id).into());
        }
        Ok(currency)
    }
}
