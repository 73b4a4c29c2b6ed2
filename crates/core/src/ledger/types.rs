//! Domain types for movement recording.

use cashpoint_shared::types::{ActorId, CurrencyId, MovementId, PointId, ReferenceId, SubBucket};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::BalanceSnapshot;
use crate::catalog::ExternalService;

/// Effect of a movement on the bucket it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Money enters the bucket.
    Income,
    /// Money leaves the bucket.
    Expense,
    /// Stored-balance repair written by reconciliation.
    Adjustment,
}

impl Direction {
    /// Sign applied to the amount, `None` for adjustments whose sign is
    /// carried by `balance_after - balance_before`.
    #[must_use]
    pub const fn sign(self) -> Option<Decimal> {
        match self {
            Self::Income => Some(Decimal::ONE),
            Self::Expense => Some(Decimal::NEGATIVE_ONE),
            Self::Adjustment => None,
        }
    }

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Adjustment => "ADJUSTMENT",
        }
    }
}

/// CASH or BANK part of a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    /// Bills and coins held at the till.
    Cash,
    /// Money held in the bank account.
    Bank,
}

impl Bucket {
    /// Bucket a sub-bucket belongs to.
    #[must_use]
    pub const fn of(sub: SubBucket) -> Self {
        if sub.is_cash() { Self::Cash } else { Self::Bank }
    }

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How money is handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    /// Bills and coins only.
    Cash,
    /// Bank transfer only.
    Bank,
    /// Part cash, part bank transfer.
    Mixed,
}

/// Kind of business operation a movement supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    /// Currency exchange.
    Exchange,
    /// Transfer leg between points.
    Transfer,
    /// External-service transaction.
    ExternalService,
    /// Manual or reconciliation adjustment.
    Adjustment,
}

impl ReferenceType {
    /// Returns true if the reference must exist in the reference registry.
    #[must_use]
    pub const fn requires_registration(self) -> bool {
        !matches!(self, Self::Adjustment)
    }

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exchange => "EXCHANGE",
            Self::Transfer => "TRANSFER",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Adjustment => "ADJUSTMENT",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared split of the cash part of an amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBreakdown {
    /// Amount in bills.
    #[serde(default)]
    pub bills: Decimal,
    /// Amount in coins.
    #[serde(default)]
    pub coins: Decimal,
}

impl CashBreakdown {
    /// Creates a breakdown.
    #[must_use]
    pub const fn new(bills: Decimal, coins: Decimal) -> Self {
        Self { bills, coins }
    }

    /// Bills plus coins.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.bills + self.coins
    }
}

/// Amounts per sub-bucket. Used both for available funds and for deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBucketAmounts {
    /// Bills.
    pub bills: Decimal,
    /// Coins.
    pub coins: Decimal,
    /// Bank.
    pub bank: Decimal,
}

impl SubBucketAmounts {
    /// Creates amounts from their parts.
    #[must_use]
    pub const fn new(bills: Decimal, coins: Decimal, bank: Decimal) -> Self {
        Self { bills, coins, bank }
    }

    /// Amount held by one sub-bucket.
    #[must_use]
    pub const fn get(&self, sub: SubBucket) -> Decimal {
        match sub {
            SubBucket::Bills => self.bills,
            SubBucket::Coins => self.coins,
            SubBucket::Bank => self.bank,
        }
    }

    /// Adds `amount` to one sub-bucket.
    pub fn add(&mut self, sub: SubBucket, amount: Decimal) {
        match sub {
            SubBucket::Bills => self.bills += amount,
            SubBucket::Coins => self.coins += amount,
            SubBucket::Bank => self.bank += amount,
        }
    }

    /// Bills plus coins.
    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.bills + self.coins
    }

    /// Sum of all sub-buckets.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.bills + self.coins + self.bank
    }

    /// Amount held by a bucket.
    #[must_use]
    pub fn bucket(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Cash => self.cash(),
            Bucket::Bank => self.bank,
        }
    }

    /// Same amounts with the opposite sign.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self::new(-self.bills, -self.coins, -self.bank)
    }
}

/// Which balance of a point and currency a movement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "service", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceScope {
    /// The point's general balance.
    General,
    /// Pre-funded credit of an external service.
    Service(ExternalService),
}

impl BalanceScope {
    /// The service this scope belongs to, if any.
    #[must_use]
    pub const fn service(self) -> Option<ExternalService> {
        match self {
            Self::General => None,
            Self::Service(service) => Some(service),
        }
    }
}

/// Request to record the balance effect of a business operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMovementInput {
    /// Point whose balance changes.
    pub point_id: PointId,
    /// Currency of the amount.
    pub currency_id: CurrencyId,
    /// INCOME or EXPENSE from the point's perspective.
    pub direction: Direction,
    /// Total amount, always positive.
    pub amount: Decimal,
    /// How the money was handed over.
    pub delivery_method: DeliveryMethod,
    /// Declared bills/coins split of the cash part.
    pub breakdown: Option<CashBreakdown>,
    /// External service involved, if any.
    pub service: Option<ExternalService>,
    /// Kind of the originating operation.
    pub reference_type: ReferenceType,
    /// ID of the originating operation.
    pub reference_id: ReferenceId,
    /// Who performs the operation.
    pub actor_id: ActorId,
    /// Free-text description.
    pub description: Option<String>,
}

/// One ledger row about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMovement {
    /// Balance the row belongs to.
    pub scope: BalanceScope,
    /// Bucket the row targets.
    pub bucket: Bucket,
    /// Effect on the bucket.
    pub direction: Direction,
    /// Absolute amount.
    pub amount: Decimal,
    /// Signed change of the bills sub-bucket (CASH rows only).
    pub bills_delta: Decimal,
    /// Signed change of the coins sub-bucket (CASH rows only).
    pub coins_delta: Decimal,
    /// Bucket total before the row.
    pub balance_before: Decimal,
    /// Bucket total after the row.
    pub balance_after: Decimal,
}

/// Planned change to one balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegPlan {
    /// Balance the leg updates.
    pub scope: BalanceScope,
    /// Stored state read under lock.
    pub before: BalanceSnapshot,
    /// State to write back.
    pub after: BalanceSnapshot,
    /// Ledger rows to append, one per touched bucket.
    pub movements: Vec<PlannedMovement>,
}

/// Full effect of one `recordMovement` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPlan {
    /// Leg on the point's general balance.
    pub general: LegPlan,
    /// Leg on the service balance for services with their own credit.
    pub service: Option<LegPlan>,
}

impl MovementPlan {
    /// Every leg, general first.
    pub fn legs(&self) -> impl Iterator<Item = &LegPlan> {
        std::iter::once(&self.general).chain(self.service.as_ref())
    }

    /// Every ledger row across legs, in append order.
    pub fn movements(&self) -> impl Iterator<Item = &PlannedMovement> {
        self.legs().flat_map(|leg| leg.movements.iter())
    }
}

/// Outcome of a committed movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementResult {
    /// General balance after the movement.
    pub balance: BalanceSnapshot,
    /// Service balance after the movement, when a service leg ran.
    pub service_balance: Option<BalanceSnapshot>,
    /// IDs of the appended ledger rows.
    pub movement_ids: Vec<MovementId>,
    /// True when an idempotency key matched an earlier request.
    pub replayed: bool,
}
