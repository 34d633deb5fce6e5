//! Party composition of a reservation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raised when a party count is negative or too large to store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be between 0 and {max}, got {value}")]
pub struct PartyCountError {
    pub field: &'static str,
    pub value: i64,
    pub max: u16,
}

/// Head counts for a stay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartyComposition {
    pub adults: u16,
    pub children: u16,
    pub infants: u16,
    pub pets: u16,
}

impl PartyComposition {
    /// Upper bound accepted for any single count.
    pub const MAX_COUNT: u16 = 99;

    /// Validate raw client counts.
    pub fn from_counts(
        adults: i64,
        children: i64,
        infants: i64,
        pets: i64,
    ) -> Result<Self, PartyCountError> {
        Ok(Self {
            adults: checked("adults", adults)?,
            children: checked("children", children)?,
            infants: checked("infants", infants)?,
            pets: checked("pets", pets)?,
        })
    }
}

fn checked(field: &'static str, value: i64) -> Result<u16, PartyCountError> {
    u16::try_from(value)
        .ok()
        .filter(|count| *count <= PartyComposition::MAX_COUNT)
        .ok_or(PartyCountError {
            field,
            value,
            max: PartyComposition::MAX_COUNT,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn accepts_zero_counts() {
        assert_eq!(
            PartyComposition::from_counts(0, 0, 0, 0),
            Ok(PartyComposition::default())
        );
    }

    #[rstest]
    #[case(-1, 0, 0, 0, "adults")]
    #[case(2, -3, 0, 0, "children")]
    #[case(2, 0, 100, 0, "infants")]
    #[case(2, 0, 0, -1, "pets")]
    fn rejects_out_of_range_counts(
        #[case] adults: i64,
        #[case] children: i64,
        #[case] infants: i64,
        #[case] pets: i64,
        #[case] field: &str,
    ) {
        let err = PartyComposition::from_counts(adults, children, infants, pets)
            .expect_err("count rejected");
        assert_eq!(err.field, field);
    }
}
