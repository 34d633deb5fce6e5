//! Half-open stay intervals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validation errors for [`StayDates`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StayDatesError {
    #[error("checkOut ({check_out}) must be after checkIn ({check_in})")]
    CheckOutNotAfterCheckIn {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

/// Nights `[check_in, check_out)` requested for a unit.
///
/// ## Invariants
/// - `check_out` is strictly after `check_in`, so a stay covers at least one
///   night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    /// Validate and build a stay interval.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, StayDatesError> {
        if check_out <= check_in {
            return Err(StayDatesError::CheckOutNotAfterCheckIn {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights in the stay; always at least one.
    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days();
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Whether two stays share at least one night.
    ///
    /// Back-to-back stays, where one checks out on the day the other checks
    /// in, do not overlap.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use lodging_backend::domain::StayDates;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).expect("date");
    /// let first = StayDates::new(d(1), d(3)).expect("stay");
    /// let next = StayDates::new(d(3), d(5)).expect("stay");
    /// assert!(!first.overlaps(&next));
    /// ```
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stay(from: u32, to: u32) -> StayDates {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).expect("date");
        StayDates::new(d(from), d(to)).expect("valid stay")
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 1)]
    fn rejects_empty_or_inverted_ranges(#[case] from: u32, #[case] to: u32) {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).expect("date");
        assert!(StayDates::new(d(from), d(to)).is_err());
    }

    #[rstest]
    #[case(stay(1, 3), 2)]
    #[case(stay(1, 2), 1)]
    #[case(stay(1, 30), 29)]
    fn counts_nights(#[case] stay: StayDates, #[case] expected: u32) {
        assert_eq!(stay.nights(), expected);
    }

    #[rstest]
    #[case(stay(1, 3), stay(2, 4), true)]
    #[case(stay(1, 3), stay(3, 5), false)]
    #[case(stay(3, 5), stay(1, 3), false)]
    #[case(stay(1, 10), stay(4, 5), true)]
    #[case(stay(4, 5), stay(1, 10), true)]
    #[case(stay(1, 3), stay(1, 3), true)]
    #[case(stay(1, 2), stay(5, 6), false)]
    fn overlap_is_half_open_and_symmetric(
        #[case] a: StayDates,
        #[case] b: StayDates,
        #[case] expected: bool,
    ) {
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }
}
