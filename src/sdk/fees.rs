//! Fee schedule of the verification network.

use ethereum_types::{U256, U512};
use serde::{Deserialize, Serialize};

use crate::config::FeeConfig;

/// Fixed plus proportional fee charged on mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Taken first, in the asset's smallest unit
    pub fixed_fee: U256,
    /// Taken from what remains, in basis points
    pub percent_fee_bips: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeConfig::default().into()
    }
}

impl From<FeeConfig> for FeeSchedule {
    fn from(config: FeeConfig) -> Self {
        Self {
            fixed_fee: U256::from(config.fixed_fee),
            percent_fee_bips: config.percent_fee_bips,
        }
    }
}

impl FeeSchedule {
    /// Amount received for an input of `amount`.
    ///
    /// `(a - f) - floor((a - f) * p / 10000)`, or zero when the input does
    /// not exceed the fixed fee. This is `ceil((a - f) * (1 - p / 10000))`.
    /// The product is taken in 512 bits so any `U256` input is accepted.
    pub fn estimate_output(&self, amount: U256) -> U256 {
        if amount <= self.fixed_fee {
            return U256::zero();
        }
        let after_fixed = amount - self.fixed_fee;
        let percent_fee = after_fixed.full_mul(U256::from(self.percent_fee_bips))
            / U512::from(10_000u64);
        // Above 10000 bips the fee exceeds the input
        let percent_fee = U256::try_from(percent_fee).unwrap_or(U256::MAX);
        after_fixed.saturating_sub(percent_fee)
    }

    /// Total fee taken from an input of `amount`.
    pub fn estimate_fee(&self, amount: U256) -> U256 {
        amount - self.estimate_output(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_output_default_schedule() {
        let fees = FeeSchedule::default();
        // 300000 sats: 299000 after the fixed fee, 448.5 -> 448 percent fee
        assert_eq!(fees.estimate_output(U256::from(300_000u64)), U256::from(298_552u64));
        assert_eq!(fees.estimate_fee(U256::from(300_000u64)), U256::from(1_448u64));
    }

    #[test]
    fn test_estimate_output_at_or_below_fixed_fee() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.estimate_output(U256::from(1_000u64)), U256::zero());
        assert_eq!(fees.estimate_output(U256::from(999u64)), U256::zero());
        assert_eq!(fees.estimate_output(U256::from(1_001u64)), U256::one());
    }

    #[test]
    fn test_estimate_output_at_u256_max() {
        let fees = FeeSchedule::default();
        let after_fixed = U256::MAX - U256::from(1_000u64);
        let ten_thousand = U256::from(10_000u64);
        let percent_fee = after_fixed / ten_thousand * U256::from(15u64)
            + after_fixed % ten_thousand * U256::from(15u64) / ten_thousand;

        assert_eq!(fees.estimate_output(U256::MAX), after_fixed - percent_fee);
        assert_eq!(
            fees.estimate_fee(U256::MAX),
            U256::from(1_000u64) + percent_fee
        );
    }

    #[test]
    fn test_percent_fee_above_whole_input() {
        let fees = FeeSchedule {
            fixed_fee: U256::zero(),
            percent_fee_bips: 20_000,
        };
        assert_eq!(fees.estimate_output(U256::from(50_000u64)), U256::zero());
        assert_eq!(fees.estimate_output(U256::MAX), U256::zero());
    }

    #[test]
    fn test_zero_percent_fee() {
        let fees = FeeSchedule {
            fixed_fee: U256::zero(),
            percent_fee_bips: 0,
        };
        assert_eq!(fees.estimate_output(U256::from(12_345u64)), U256::from(12_345u64));
    }
}
