//! Balance store.
//!
//! Reads and writes the stored balance of a (point, currency) tuple or of a
//! (point, service, currency) tuple. Writes always go through a row locked
//! with `SELECT ... FOR UPDATE` inside the caller's unit of work.

use cashpoint_core::catalog::ExternalService;
use cashpoint_core::ledger::{BalanceScope, BalanceSnapshot, LedgerError};
use cashpoint_shared::types::{CurrencyId, PointId};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::{balances, sea_orm_active_enums, service_balances};

/// A balance row held under an exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedBalance {
    /// Row ID.
    pub id: Uuid,
    /// General or service balance.
    pub scope: BalanceScope,
    /// Figures read under the lock.
    pub snapshot: BalanceSnapshot,
}

/// Read model of one stored balance.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    /// Point of the balance.
    pub point_id: Uuid,
    /// Currency of the balance.
    pub currency_id: Uuid,
    /// General or service balance.
    pub scope: BalanceScope,
    /// Stored figures.
    pub balance: BalanceSnapshot,
    /// Last write.
    pub updated_at: DateTime<FixedOffset>,
}

impl From<balances::Model> for BalanceView {
    fn from(model: balances::Model) -> Self {
        Self {
            point_id: model.point_id,
            currency_id: model.currency_id,
            scope: BalanceScope::General,
            balance: model.snapshot(),
            updated_at: model.updated_at,
        }
    }
}

impl From<service_balances::Model> for BalanceView {
    fn from(model: service_balances::Model) -> Self {
        Self {
            point_id: model.point_id,
            currency_id: model.currency_id,
            scope: BalanceScope::Service(model.service.into()),
            balance: model.snapshot(),
            updated_at: model.updated_at,
        }
    }
}

/// Identity of one stored balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    /// Point of the balance.
    pub point_id: PointId,
    /// Currency of the balance.
    pub currency_id: CurrencyId,
    /// General or service balance.
    pub scope: BalanceScope,
}

/// Balance store operations.
///
/// Functions take the connection to run on, so the same store serves plain
/// reads and the locked reads of a unit of work.
pub struct BalanceStore;

impl BalanceStore {
    /// Reads a stored balance without locking. An absent row reads as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<BalanceSnapshot> {
        Ok(Self::find(conn, point_id, currency_id, scope)
            .await?
            .unwrap_or_default())
    }

    /// Reads a stored balance without locking, `None` if the tuple has no row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<Option<BalanceSnapshot>> {
        let snapshot = match scope {
            BalanceScope::General => Self::find_general(point_id, currency_id)
                .one(conn)
                .await?
                .map(|m| m.snapshot()),
            BalanceScope::Service(service) => Self::find_service(point_id, service, currency_id)
                .one(conn)
                .await?
                .map(|m| m.snapshot()),
        };
        Ok(snapshot)
    }

    /// Locks a balance row for the rest of the transaction, creating it at
    /// zero first if the tuple has never moved.
    ///
    /// Callers that need both balances of a movement lock the general balance
    /// first, then the service balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::LockTimeout` if the row stays locked past the
    /// unit of work's `lock_timeout`, or a database error.
    pub async fn lock(
        txn: &DatabaseTransaction,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<LockedBalance> {
        let now: DateTime<FixedOffset> = Utc::now().into();

        let (id, snapshot) = match scope {
            BalanceScope::General => {
                let row = balances::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    point_id: Set(point_id.into_inner()),
                    currency_id: Set(currency_id.into_inner()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                balances::Entity::insert(row)
                    .on_conflict(
                        OnConflict::columns([
                            balances::Column::PointId,
                            balances::Column::CurrencyId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;

                let model = Self::find_general(point_id, currency_id)
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or_else(|| missing_row(scope))?;
                (model.id, model.snapshot())
            }
            BalanceScope::Service(service) => {
                let row = service_balances::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    point_id: Set(point_id.into_inner()),
                    service: Set(service.into()),
                    currency_id: Set(currency_id.into_inner()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                service_balances::Entity::insert(row)
                    .on_conflict(
                        OnConflict::columns([
                            service_balances::Column::PointId,
                            service_balances::Column::Service,
                            service_balances::Column::CurrencyId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;

                let model = Self::find_service(point_id, service, currency_id)
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or_else(|| missing_row(scope))?;
                (model.id, model.snapshot())
            }
        };

        Ok(LockedBalance {
            id,
            scope,
            snapshot,
        })
    }

    /// Writes new figures to a locked row.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Internal` if `after` does not satisfy
    /// `quantity = bills + coins + bank`, or a database error.
    pub async fn store(
        txn: &DatabaseTransaction,
        locked: &LockedBalance,
        after: &BalanceSnapshot,
    ) -> RepoResult<()> {
        if !after.is_consistent() {
            return Err(LedgerError::Internal(format!(
                "refusing to store inconsistent balance {after:?}"
            ))
            .into());
        }
        let now: DateTime<FixedOffset> = Utc::now().into();

        match locked.scope {
            BalanceScope::General => {
                balances::ActiveModel {
                    id: Set(locked.id),
                    quantity: Set(after.quantity),
                    cash_bills: Set(after.cash_bills),
                    cash_coins: Set(after.cash_coins),
                    bank: Set(after.bank),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(txn)
                .await?;
            }
            BalanceScope::Service(_) => {
                service_balances::ActiveModel {
                    id: Set(locked.id),
                    quantity: Set(after.quantity),
                    cash_bills: Set(after.cash_bills),
                    cash_coins: Set(after.cash_coins),
                    bank: Set(after.bank),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(txn)
                .await?;
            }
        }
        Ok(())
    }

    /// Lists every stored balance of a point, general balances first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_point<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
    ) -> RepoResult<Vec<BalanceView>> {
        let general = balances::Entity::find()
            .filter(balances::Column::PointId.eq(point_id.into_inner()))
            .order_by_asc(balances::Column::CurrencyId)
            .all(conn)
            .await?;
        let services = service_balances::Entity::find()
            .filter(service_balances::Column::PointId.eq(point_id.into_inner()))
            .order_by_asc(service_balances::Column::Service)
            .order_by_asc(service_balances::Column::CurrencyId)
            .all(conn)
            .await?;

        Ok(general
            .into_iter()
            .map(BalanceView::from)
            .chain(services.into_iter().map(BalanceView::from))
            .collect())
    }

    /// Lists the keys of every stored balance, optionally for one point.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn keys<C: ConnectionTrait>(
        conn: &C,
        point_id: Option<PointId>,
    ) -> RepoResult<Vec<BalanceKey>> {
        let mut general = balances::Entity::find().order_by_asc(balances::Column::PointId);
        let mut services =
            service_balances::Entity::find().order_by_asc(service_balances::Column::PointId);
        if let Some(point_id) = point_id {
            general = general.filter(balances::Column::PointId.eq(point_id.into_inner()));
            services = services.filter(service_balances::Column::PointId.eq(point_id.into_inner()));
        }

        let general = general.all(conn).await?.into_iter().map(|m| BalanceKey {
            point_id: PointId::from_uuid(m.point_id),
            currency_id: CurrencyId::from_uuid(m.currency_id),
            scope: BalanceScope::General,
        });
        let services = services.all(conn).await?.into_iter().map(|m| BalanceKey {
            point_id: PointId::from_uuid(m.point_id),
            currency_id: CurrencyId::from_uuid(m.currency_id),
            scope: BalanceScope::Service(m.service.into()),
        });

        Ok(general.chain(services).collect())
    }

    fn find_general(point_id: PointId, currency_id: CurrencyId) -> sea_orm::Select<balances::Entity> {
        balances::Entity::find()
            .filter(balances::Column::PointId.eq(point_id.into_inner()))
            .filter(balances::Column::CurrencyId.eq(currency_id.into_inner()))
    }

    fn find_service(
        point_id: PointId,
        service: ExternalService,
        currency_id: CurrencyId,
    ) -> sea_orm::Select<service_balances::Entity> {
        service_balances::Entity::find()
            .filter(service_balances::Column::PointId.eq(point_id.into_inner()))
            .filter(
                service_balances::Column::Service
                    .eq(sea_orm_active_enums::ExternalService::from(service)),
            )
            .filter(service_balances::Column::CurrencyId.eq(currency_id.into_inner()))
    }
}

fn missing_row(scope: BalanceScope) -> LedgerError {
    LedgerError::Internal(format!("{scope:?} balance row vanished after upsert"))
}
