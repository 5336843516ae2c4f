//! Domain identifier types with proper encapsulation.
//!
//! Every persisted entity is keyed by a UUID v4. The newtypes keep a pair id
//! from being passed where an order id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a tradable crypto pair.
    PairId
);
uuid_id!(
    /// Identifier of a stored OHLC candle.
    CandleId
);
uuid_id!(
    /// Identifier of a generated trading signal.
    SignalId
);
uuid_id!(
    /// Local identifier of an order (distinct from the exchange txid).
    OrderId
);
uuid_id!(
    /// Identifier of a position.
    PositionId
);
uuid_id!(
    /// Identifier of the portfolio record.
    PortfolioId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn id_round_trips_through_string() {
        let id = PositionId::new();
        let parsed: PositionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_id_fails_to_parse() {
        assert!("not-a-uuid".parse::<PairId>().is_err());
    }
}
