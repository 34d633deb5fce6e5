//! Reservation totals.
//!
//! The primary currency is KRW, which has no minor unit, so amounts are whole
//! won. A secondary USD display total in cents is derived through a fixed
//! conversion divisor and stored alongside; neither is recomputed after the
//! reservation is created.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Currency code of the amount charged by the payment provider.
pub const PRIMARY_CURRENCY: &str = "KRW";

/// Default number of won per US dollar used for the display total.
pub const DEFAULT_KRW_PER_USD: u32 = 1_300;

/// Errors raised while pricing a stay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("nightly rate must be positive")]
    NonPositiveRate,
    #[error("conversion divisor must be positive")]
    ZeroDivisor,
    #[error("total for {nights} nights overflows")]
    Overflow { nights: u32 },
}

/// Fixed conversion used for the secondary display total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConversion {
    krw_per_usd: u32,
}

impl DisplayConversion {
    pub fn new(krw_per_usd: u32) -> Result<Self, PricingError> {
        if krw_per_usd == 0 {
            return Err(PricingError::ZeroDivisor);
        }
        Ok(Self { krw_per_usd })
    }

    pub fn krw_per_usd(&self) -> u32 {
        self.krw_per_usd
    }

    /// Convert whole won to US cents, rounding half up.
    fn usd_cents(&self, krw: i64) -> i64 {
        let divisor = i64::from(self.krw_per_usd);
        (krw * 100 + divisor / 2) / divisor
    }
}

impl Default for DisplayConversion {
    fn default() -> Self {
        Self {
            krw_per_usd: DEFAULT_KRW_PER_USD,
        }
    }
}

/// Totals locked onto a reservation at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceTotals {
    /// Amount charged, in whole won.
    pub total_krw: i64,
    /// Display amount in US cents.
    pub total_usd_cents: i64,
}

impl PriceTotals {
    /// Price `nights` at `nightly_rate_krw` with no discounting.
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::{DisplayConversion, PriceTotals};
    ///
    /// let totals = PriceTotals::compute(130_000, 2, DisplayConversion::default()).expect("totals");
    /// assert_eq!(totals.total_krw, 260_000);
    /// assert_eq!(totals.total_usd_cents, 20_000);
    /// ```
    pub fn compute(
        nightly_rate_krw: i64,
        nights: u32,
        conversion: DisplayConversion,
    ) -> Result<Self, PricingError> {
        if nightly_rate_krw <= 0 {
            return Err(PricingError::NonPositiveRate);
        }
        let total_krw = nightly_rate_krw
            .checked_mul(i64::from(nights))
            .filter(|total| total.checked_mul(100).is_some())
            .ok_or(PricingError::Overflow { nights })?;
        Ok(Self {
            total_krw,
            total_usd_cents: conversion.usd_cents(total_krw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100_000, 1, 1_300, 100_000, 7_692)]
    #[case(100_000, 3, 1_300, 300_000, 23_077)]
    #[case(65, 1, 1_300, 65, 5)]
    #[case(1_000, 2, 1_000, 2_000, 200)]
    fn totals_scale_with_nights(
        #[case] rate: i64,
        #[case] nights: u32,
        #[case] divisor: u32,
        #[case] krw: i64,
        #[case] cents: i64,
    ) {
        let conversion = DisplayConversion::new(divisor).expect("divisor");
        let totals = PriceTotals::compute(rate, nights, conversion).expect("totals");
        assert_eq!(totals.total_krw, krw);
        assert_eq!(totals.total_usd_cents, cents);
    }

    #[rstest]
    fn rejects_zero_divisor() {
        assert_eq!(DisplayConversion::new(0), Err(PricingError::ZeroDivisor));
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    fn rejects_non_positive_rates(#[case] rate: i64) {
        assert_eq!(
            PriceTotals::compute(rate, 1, DisplayConversion::default()),
            Err(PricingError::NonPositiveRate)
        );
    }

    #[rstest]
    fn reports_overflow() {
        assert_eq!(
            PriceTotals::compute(i64::MAX / 2, 3, DisplayConversion::default()),
            Err(PricingError::Overflow { nights: 3 })
        );
    }
}
