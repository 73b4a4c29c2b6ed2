//! External services a point operates on behalf of partners.
//!
//! Some partners pre-fund a credit line at each point (courier, remittance,
//! top-up networks). Consuming the service spends that credit while the point
//! collects the customer's money. Banking correspondents settle directly
//! against the point's general balance and have no balance of their own.

use serde::{Deserialize, Serialize};

/// External service operated at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalService {
    /// Courier guides.
    Servientrega,
    /// International remittances.
    WesternUnion,
    /// Mobile top-ups and bill payments.
    YaGanaste,
    /// Banking correspondent.
    BancoGuayaquil,
    /// Banking correspondent.
    Produbanco,
    /// Banking correspondent.
    BancoPacifico,
}

impl ExternalService {
    /// Every service in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Servientrega,
        Self::WesternUnion,
        Self::YaGanaste,
        Self::BancoGuayaquil,
        Self::Produbanco,
        Self::BancoPacifico,
    ];

    /// Returns true if the service carries its own pre-funded balance.
    #[must_use]
    pub const fn has_assignable_balance(self) -> bool {
        match self {
            Self::Servientrega | Self::WesternUnion | Self::YaGanaste => true,
            Self::BancoGuayaquil | Self::Produbanco | Self::BancoPacifico => false,
        }
    }

    /// Returns the stored representation of the service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Servientrega => "SERVIENTREGA",
            Self::WesternUnion => "WESTERN_UNION",
            Self::YaGanaste => "YA_GANASTE",
            Self::BancoGuayaquil => "BANCO_GUAYAQUIL",
            Self::Produbanco => "PRODUBANCO",
            Self::BancoPacifico => "BANCO_PACIFICO",
        }
    }
}

impl std::fmt::Display for ExternalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExternalService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown external service: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExternalService::Servientrega, true)]
    #[case(ExternalService::WesternUnion, true)]
    #[case(ExternalService::YaGanaste, true)]
    #[case(ExternalService::BancoGuayaquil, false)]
    #[case(ExternalService::Produbanco, false)]
    #[case(ExternalService::BancoPacifico, false)]
    fn test_assignable_balance(#[case] service: ExternalService, #[case] expected: bool) {
        assert_eq!(service.has_assignable_balance(), expected);
    }

    #[test]
    fn test_round_trip_through_str() {
        for service in ExternalService::ALL {
            assert_eq!(service.as_str().parse::<ExternalService>(), Ok(service));
        }
        assert!("UNKNOWN".parse::<ExternalService>().is_err());
    }

    #[test]
    fn test_serde_matches_stored_representation() {
        let json = serde_json::to_string(&ExternalService::WesternUnion).unwrap();
        assert_eq!(json, "\"WESTERN_UNION\"");
    }
}
