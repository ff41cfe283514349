//! Balance verification.
//!
//! Compares two totals (assets against liabilities plus equity, or debits
//! against credits) and reports whether they agree within a tolerance.

use rust_decimal::Decimal;

use super::types::BalanceResult;

/// Default tolerance: anything below half a cent is treated as equal.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Compares pairs of totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceVerifier {
    tolerance: Decimal,
}

impl Default for BalanceVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl BalanceVerifier {
    /// Creates a verifier. Negative tolerances are treated as their magnitude.
    #[must_use]
    pub fn new(tolerance: Decimal) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    /// Returns the configured tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Compares `left` with `right`.
    #[must_use]
    pub fn verify(&self, left: Decimal, right: Decimal) -> BalanceResult {
        let signed_difference = left.saturating_sub(right);
        let difference = signed_difference.abs();
        BalanceResult {
            is_balanced: difference <= self.tolerance,
            difference,
            signed_difference,
        }
    }
}
