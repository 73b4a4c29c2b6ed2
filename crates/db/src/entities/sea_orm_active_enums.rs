//! `SeaORM` active enums and their mapping to domain enums.

use cashpoint_core::cash_close::CashCloseStatus as DomainCashCloseStatus;
use cashpoint_core::catalog::ExternalService as DomainExternalService;
use cashpoint_core::ledger::{Bucket, Direction, ReferenceType as DomainReferenceType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "movement_direction")]
pub enum MovementDirection {
    #[sea_orm(string_value = "INCOME")]
    Income,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "balance_bucket")]
pub enum BalanceBucket {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "BANK")]
    Bank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reference_type")]
pub enum ReferenceType {
    #[sea_orm(string_value = "EXCHANGE")]
    Exchange,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "EXTERNAL_SERVICE")]
    ExternalService,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "external_service")]
pub enum ExternalService {
    #[sea_orm(string_value = "SERVIENTREGA")]
    Servientrega,
    #[sea_orm(string_value = "WESTERN_UNION")]
    WesternUnion,
    #[sea_orm(string_value = "YA_GANASTE")]
    YaGanaste,
    #[sea_orm(string_value = "BANCO_GUAYAQUIL")]
    BancoGuayaquil,
    #[sea_orm(string_value = "PRODUBANCO")]
    Produbanco,
    #[sea_orm(string_value = "BANCO_PACIFICO")]
    BancoPacifico,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cash_close_status")]
pub enum CashCloseStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "PARTIAL")]
    Partial,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

impl From<Direction> for MovementDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Income => Self::Income,
            Direction::Expense => Self::Expense,
            Direction::Adjustment => Self::Adjustment,
        }
    }
}

impl From<MovementDirection> for Direction {
    fn from(value: MovementDirection) -> Self {
        match value {
            MovementDirection::Income => Self::Income,
            MovementDirection::Expense => Self::Expense,
            MovementDirection::Adjustment => Self::Adjustment,
        }
    }
}

impl From<Bucket> for BalanceBucket {
    fn from(value: Bucket) -> Self {
        match value {
            Bucket::Cash => Self::Cash,
            Bucket::Bank => Self::Bank,
        }
    }
}

impl From<BalanceBucket> for Bucket {
    fn from(value: BalanceBucket) -> Self {
        match value {
            BalanceBucket::Cash => Self::Cash,
            BalanceBucket::Bank => Self::Bank,
        }
    }
}

impl From<DomainReferenceType> for ReferenceType {
    fn from(value: DomainReferenceType) -> Self {
        match value {
            DomainReferenceType::Exchange => Self::Exchange,
            DomainReferenceType::Transfer => Self::Transfer,
            DomainReferenceType::ExternalService => Self::ExternalService,
            DomainReferenceType::Adjustment => Self::Adjustment,
        }
    }
}

impl From<ReferenceType> for DomainReferenceType {
    fn from(value: ReferenceType) -> Self {
        match value {
            ReferenceType::Exchange => Self::Exchange,
            ReferenceType::Transfer => Self::Transfer,
            ReferenceType::ExternalService => Self::ExternalService,
            ReferenceType::Adjustment => Self::Adjustment,
        }
    }
}

impl From<DomainExternalService> for ExternalService {
    fn from(value: DomainExternalService) -> Self {
        match value {
            DomainExternalService::Servientrega => Self::Servientrega,
            DomainExternalService::WesternUnion => Self::WesternUnion,
            DomainExternalService::YaGanaste => Self::YaGanaste,
            DomainExternalService::BancoGuayaquil => Self::BancoGuayaquil,
            DomainExternalService::Produbanco => Self::Produbanco,
            DomainExternalService::BancoPacifico => Self::BancoPacifico,
        }
    }
}

impl From<ExternalService> for DomainExternalService {
    fn from(value: ExternalService) -> Self {
        match value {
            ExternalService::Servientrega => Self::Servientrega,
            ExternalService::WesternUnion => Self::WesternUnion,
            ExternalService::YaGanaste => Self::YaGanaste,
            ExternalService::BancoGuayaquil => Self::BancoGuayaquil,
            ExternalService::Produbanco => Self::Produbanco,
            ExternalService::BancoPacifico => Self::BancoPacifico,
        }
    }
}

impl From<DomainCashCloseStatus> for CashCloseStatus {
    fn from(value: DomainCashCloseStatus) -> Self {
        match value {
            DomainCashCloseStatus::Open => Self::Open,
            DomainCashCloseStatus::Partial => Self::Partial,
            DomainCashCloseStatus::Closed => Self::Closed,
        }
    }
}

impl From<CashCloseStatus> for DomainCashCloseStatus {
    fn from(value: CashCloseStatus) -> Self {
        match value {
            CashCloseStatus::Open => Self::Open,
            CashCloseStatus::Partial => Self::Partial,
            CashCloseStatus::Closed => Self::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_mapping_is_total() {
        for service in DomainExternalService::ALL {
            let stored = ExternalService::from(service);
            assert_eq!(stored.to_value(), service.as_str());
            assert_eq!(DomainExternalService::from(stored), service);
        }
    }

    #[test]
    fn test_direction_values_match_domain() {
        for direction in [Direction::Income, Direction::Expense, Direction::Adjustment] {
            assert_eq!(MovementDirection::from(direction).to_value(), direction.as_str());
        }
    }
}
