//! Foundry contract pricing.

use crate::EconError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Baseline price in dollars of one wafer at `process_node`, before any foundry markup.
pub fn base_wafer_price(process_node: u32) -> Decimal {
    let dollars: i64 = match process_node {
        0..=3 => 30_000,
        4..=5 => 25_000,
        6..=7 => 18_000,
        8..=10 => 12_000,
        11..=14 => 8_000,
        15..=22 => 5_000,
        23..=28 => 4_000,
        29..=45 => 3_000,
        46..=65 => 2_500,
        66..=90 => 2_000,
        91..=130 => 1_500,
        131..=180 => 1_200,
        181..=250 => 1_000,
        251..=350 => 800,
        351..=600 => 600,
        _ => 400,
    };
    Decimal::from(dollars)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractType {
    /// One-off order at a premium.
    Spot,
    ShortTerm,
    LongTerm,
}

impl ContractType {
    /// Volume discount for `total_wafers` over the contract's life.
    pub fn discount(self, total_wafers: u64) -> Decimal {
        let pct = match self {
            ContractType::Spot => 0,
            ContractType::ShortTerm => match total_wafers {
                10_000.. => 10,
                5_000.. => 7,
                _ => 5,
            },
            ContractType::LongTerm => match total_wafers {
                100_000.. => 20,
                50_000.. => 17,
                20_000.. => 15,
                10_000.. => 12,
                _ => 10,
            },
        };
        Decimal::new(pct, 2)
    }

    /// Share of the contract value paid up front.
    pub fn deposit_fraction(self) -> Decimal {
        match self {
            ContractType::Spot => Decimal::ZERO,
            ContractType::ShortTerm => Decimal::new(10, 2),
            ContractType::LongTerm => Decimal::new(20, 2),
        }
    }

    fn premium(self) -> Decimal {
        match self {
            ContractType::Spot => Decimal::new(110, 2),
            _ => Decimal::ONE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContractType::Spot => "spot",
            ContractType::ShortTerm => "short-term",
            ContractType::LongTerm => "long-term",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContractType {
    type Err = EconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(ContractType::Spot),
            "short-term" => Ok(ContractType::ShortTerm),
            "long-term" => Ok(ContractType::LongTerm),
            other => Err(EconError::UnknownContractType(other.to_string())),
        }
    }
}

/// Priced contract terms, in dollars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractPricing {
    pub contract_type: ContractType,
    pub base_price: Decimal,
    pub foundry_multiplier: Decimal,
    pub price_before_discount: Decimal,
    /// Fraction, e.g. `0.12`.
    pub discount: Decimal,
    /// Whole dollars.
    pub price_per_wafer: Decimal,
    pub total_wafers: u64,
    /// Whole dollars, from the unrounded per-wafer price.
    pub total_value: Decimal,
    pub deposit_fraction: Decimal,
    pub deposit: Decimal,
    pub remaining_balance: Decimal,
}

fn whole_dollars(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices `wafers_per_week` wafers over `duration_weeks` at a foundry charging
/// `foundry_multiplier` times the baseline.
pub fn contract_pricing(
    foundry_multiplier: Decimal,
    contract_type: ContractType,
    process_node: u32,
    wafers_per_week: u32,
    duration_weeks: u32,
) -> Result<ContractPricing, EconError> {
    if foundry_multiplier <= Decimal::ZERO {
        return Err(EconError::InvalidPrice);
    }
    let base_price = base_wafer_price(process_node);
    let price_before_discount = base_price * foundry_multiplier;
    let total_wafers = u64::from(wafers_per_week) * u64::from(duration_weeks);
    let discount = contract_type.discount(total_wafers);
    let final_price = price_before_discount * contract_type.premium() * (Decimal::ONE - discount);

    let total_value = whole_dollars(final_price * Decimal::from(total_wafers));
    let deposit_fraction = contract_type.deposit_fraction();
    let deposit = total_value * deposit_fraction;

    debug!(
        %contract_type,
        process_node,
        total_wafers,
        %final_price,
        "contract priced"
    );

    Ok(ContractPricing {
        contract_type,
        base_price,
        foundry_multiplier,
        price_before_discount,
        discount,
        price_per_wafer: whole_dollars(final_price),
        total_wafers,
        total_value,
        deposit_fraction,
        deposit,
        remaining_balance: total_value - deposit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn base_price_steps() {
        assert_eq!(base_wafer_price(3), Decimal::from(30_000));
        assert_eq!(base_wafer_price(7), Decimal::from(18_000));
        assert_eq!(base_wafer_price(8), Decimal::from(12_000));
        assert_eq!(base_wafer_price(28), Decimal::from(4_000));
        assert_eq!(base_wafer_price(600), Decimal::from(600));
        assert_eq!(base_wafer_price(800), Decimal::from(400));
    }

    #[test]
    fn spot_carries_premium_and_no_deposit() {
        let p = contract_pricing(Decimal::new(115, 2), ContractType::Spot, 7, 100, 4).unwrap();
        assert_eq!(p.price_before_discount, Decimal::from(20_700));
        assert_eq!(p.discount, Decimal::ZERO);
        assert_eq!(p.price_per_wafer, Decimal::from(22_770));
        assert_eq!(p.total_wafers, 400);
        assert_eq!(p.total_value, Decimal::from(9_108_000));
        assert_eq!(p.deposit, Decimal::ZERO);
        assert_eq!(p.remaining_balance, p.total_value);
    }

    #[test]
    fn short_term_volume_tiers() {
        let p = contract_pricing(Decimal::ONE, ContractType::ShortTerm, 7, 1_000, 10).unwrap();
        assert_eq!(p.discount, Decimal::new(10, 2));
        assert_eq!(p.price_per_wafer, Decimal::from(16_200));
        assert_eq!(p.total_value, Decimal::from(162_000_000));
        assert_eq!(p.deposit, Decimal::from(16_200_000));
        assert_eq!(ContractType::ShortTerm.discount(4_999), Decimal::new(5, 2));
        assert_eq!(ContractType::ShortTerm.discount(5_000), Decimal::new(7, 2));
    }

    #[test]
    fn long_term_tiers_and_deposit() {
        let tiers = [(9_999, 10), (10_000, 12), (20_000, 15), (50_000, 17), (100_000, 20)];
        for (wafers, pct) in tiers {
            assert_eq!(ContractType::LongTerm.discount(wafers), Decimal::new(pct, 2));
        }
        let p = contract_pricing(Decimal::ONE, ContractType::LongTerm, 14, 500, 52).unwrap();
        assert_eq!(p.deposit_fraction, Decimal::new(20, 2));
        assert_eq!(p.deposit + p.remaining_balance, p.total_value);
    }

    #[test]
    fn parse_contract_types() {
        assert_eq!("long-term".parse::<ContractType>(), Ok(ContractType::LongTerm));
        assert_eq!(
            "forever".parse::<ContractType>(),
            Err(EconError::UnknownContractType("forever".into()))
        );
        assert_eq!(serde_json::to_value(ContractType::ShortTerm).unwrap(), "short-term");
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        assert_eq!(
            contract_pricing(Decimal::ZERO, ContractType::Spot, 7, 1, 1),
            Err(EconError::InvalidPrice)
        );
    }

    proptest! {
        #[test]
        fn discount_monotone_in_volume(a in 0u64..200_000, b in 0u64..200_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for t in [ContractType::ShortTerm, ContractType::LongTerm] {
                prop_assert!(t.discount(lo) <= t.discount(hi));
            }
        }

        #[test]
        fn longer_commitment_never_costs_more_per_wafer(wpw in 1u32..2_000, weeks in 1u32..104) {
            let short = contract_pricing(Decimal::ONE, ContractType::ShortTerm, 7, wpw, weeks).unwrap();
            let long = contract_pricing(Decimal::ONE, ContractType::LongTerm, 7, wpw, weeks).unwrap();
            let spot = contract_pricing(Decimal::ONE, ContractType::Spot, 7, wpw, weeks).unwrap();
            prop_assert!(long.price_per_wafer <= short.price_per_wafer);
            prop_assert!(short.price_per_wafer < spot.price_per_wafer);
        }
    }
}
