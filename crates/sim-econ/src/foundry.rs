//! Third-party foundries: capacity and process availability over time.

use crate::contract::ContractType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FoundryTier {
    Premium,
    MidRange,
    Budget,
    Specialty,
}

/// Weeks from order to first wafer start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeadTimes {
    pub spot: u32,
    pub short_term: u32,
    pub long_term: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Foundry {
    pub id: &'static str,
    pub name: &'static str,
    pub founded: i32,
    pub tier: FoundryTier,
    /// Price markup over baseline, in percent (115 = 15 % premium).
    pub pricing_percent: i64,
    /// Wafers per week, keyed by year, ascending.
    pub capacity_by_year: &'static [(i32, u32)],
    /// Offered nodes, keyed by the year the offering took effect, ascending.
    pub nodes_by_year: &'static [(i32, &'static [u32])],
    pub lead_times: LeadTimes,
}

impl Foundry {
    pub fn pricing_multiplier(&self) -> Decimal {
        Decimal::new(self.pricing_percent, 2)
    }

    pub fn capacity(&self, year: i32) -> u32 {
        interpolate_capacity(self.capacity_by_year, year)
    }

    pub fn nodes(&self, year: i32) -> &'static [u32] {
        available_nodes(self.nodes_by_year, year)
    }

    pub fn offers(&self, year: i32, process_node: u32) -> bool {
        year >= self.founded && self.nodes(year).contains(&process_node)
    }

    pub fn lead_time_weeks(&self, contract_type: ContractType) -> u32 {
        match contract_type {
            ContractType::Spot => self.lead_times.spot,
            ContractType::ShortTerm => self.lead_times.short_term,
            ContractType::LongTerm => self.lead_times.long_term,
        }
    }
}

/// Capacity at `year`, linearly interpolated between the bracketing table
/// years and rounded. Years outside the table clamp to its ends; an empty table
/// has no capacity.
pub fn interpolate_capacity(table: &[(i32, u32)], year: i32) -> u32 {
    let (Some(&(first_year, first)), Some(&(last_year, last))) = (table.first(), table.last()) else {
        return 0;
    };
    if year <= first_year {
        return first;
    }
    if year >= last_year {
        return last;
    }
    table
        .windows(2)
        .find(|w| year >= w[0].0 && year <= w[1].0)
        .map_or(0, |w| {
            let ((y1, c1), (y2, c2)) = (w[0], w[1]);
            let ratio = f64::from(year - y1) / f64::from(y2 - y1);
            let c = f64::from(c1) + (f64::from(c2) - f64::from(c1)) * ratio;
            c.round().max(0.0) as u32
        })
}

/// Node list of the most recent table year not after `year`; empty before the first entry.
pub fn available_nodes(table: &'static [(i32, &'static [u32])], year: i32) -> &'static [u32] {
    table
        .iter()
        .rev()
        .find(|(y, _)| *y <= year)
        .map(|(_, nodes)| *nodes)
        .unwrap_or_default()
}

pub const FOUNDRIES: &[Foundry] = &[
    Foundry {
        id: "tsmc",
        name: "TSMC",
        founded: 1987,
        tier: FoundryTier::Premium,
        pricing_percent: 115,
        capacity_by_year: &[
            (1990, 500),
            (1995, 2_000),
            (2000, 5_000),
            (2005, 15_000),
            (2010, 30_000),
            (2015, 50_000),
            (2020, 80_000),
            (2025, 120_000),
        ],
        nodes_by_year: &[
            (1987, &[800, 600]),
            (1990, &[600, 350]),
            (1995, &[350, 250]),
            (2000, &[250, 180, 130]),
            (2005, &[130, 90, 65]),
            (2010, &[65, 45, 32, 28]),
            (2015, &[28, 16, 10, 7]),
            (2020, &[7, 5]),
            (2022, &[5, 3]),
        ],
        lead_times: LeadTimes {
            spot: 4,
            short_term: 8,
            long_term: 12,
        },
    },
    Foundry {
        id: "globalfoundries",
        name: "GlobalFoundries",
        founded: 2009,
        tier: FoundryTier::MidRange,
        pricing_percent: 95,
        capacity_by_year: &[(2010, 8_000), (2015, 25_000), (2020, 40_000), (2025, 45_000)],
        nodes_by_year: &[
            (2009, &[65, 45, 32]),
            (2012, &[32, 28]),
            (2015, &[28, 14]),
            (2018, &[14, 12]),
            (2025, &[14, 12, 22]),
        ],
        lead_times: LeadTimes {
            spot: 3,
            short_term: 6,
            long_term: 10,
        },
    },
    Foundry {
        id: "umc",
        name: "UMC",
        founded: 1980,
        tier: FoundryTier::Budget,
        pricing_percent: 80,
        capacity_by_year: &[
            (1990, 300),
            (1995, 1_500),
            (2000, 4_000),
            (2005, 10_000),
            (2010, 20_000),
            (2015, 30_000),
            (2020, 35_000),
            (2025, 38_000),
        ],
        nodes_by_year: &[
            (1980, &[3000, 1500]),
            (1990, &[800, 600]),
            (1995, &[600, 350]),
            (2000, &[250, 180]),
            (2005, &[130, 90]),
            (2010, &[65, 45, 40]),
            (2015, &[40, 28]),
            (2020, &[28, 22]),
            (2025, &[22, 14]),
        ],
        lead_times: LeadTimes {
            spot: 2,
            short_term: 4,
            long_term: 8,
        },
    },
    Foundry {
        id: "smic",
        name: "SMIC",
        founded: 2000,
        tier: FoundryTier::MidRange,
        pricing_percent: 85,
        capacity_by_year: &[(2005, 2_000), (2010, 8_000), (2015, 20_000), (2020, 35_000), (2025, 50_000)],
        nodes_by_year: &[
            (2000, &[250, 180]),
            (2005, &[130, 90]),
            (2010, &[65, 45]),
            (2015, &[28, 22]),
            (2019, &[14]),
            (2020, &[14, 28]),
        ],
        lead_times: LeadTimes {
            spot: 3,
            short_term: 6,
            long_term: 10,
        },
    },
    Foundry {
        id: "samsung",
        name: "Samsung Foundry",
        founded: 2017,
        tier: FoundryTier::Premium,
        pricing_percent: 110,
        capacity_by_year: &[(2018, 15_000), (2020, 25_000), (2025, 40_000)],
        nodes_by_year: &[
            (2017, &[14, 10]),
            (2018, &[10, 8, 7]),
            (2020, &[7, 5]),
            (2022, &[5, 3]),
            (2025, &[3, 2]),
        ],
        lead_times: LeadTimes {
            spot: 5,
            short_term: 10,
            long_term: 14,
        },
    },
    Foundry {
        id: "intel_foundry",
        name: "Intel Foundry Services",
        founded: 2021,
        tier: FoundryTier::Premium,
        pricing_percent: 105,
        capacity_by_year: &[(2022, 5_000), (2025, 15_000), (2030, 40_000)],
        nodes_by_year: &[(2021, &[10, 7]), (2023, &[7, 4]), (2025, &[4, 3])],
        lead_times: LeadTimes {
            spot: 6,
            short_term: 12,
            long_term: 16,
        },
    },
    Foundry {
        id: "tower",
        name: "Tower Semiconductor",
        founded: 1993,
        tier: FoundryTier::Specialty,
        pricing_percent: 120,
        capacity_by_year: &[
            (1995, 200),
            (2000, 800),
            (2005, 3_000),
            (2010, 8_000),
            (2015, 12_000),
            (2020, 15_000),
            (2025, 18_000),
        ],
        nodes_by_year: &[
            (1993, &[600, 350]),
            (2000, &[250, 180]),
            (2005, &[180, 130]),
            (2010, &[130, 90, 65]),
            (2015, &[65, 45]),
            (2025, &[65, 45, 40]),
        ],
        lead_times: LeadTimes {
            spot: 4,
            short_term: 8,
            long_term: 12,
        },
    },
];

pub fn foundry_by_id(id: &str) -> Option<&'static Foundry> {
    FOUNDRIES.iter().find(|f| f.id == id)
}

/// Foundries operating in `year`, optionally restricted to those offering `process_node`.
pub fn available_foundries(year: i32, process_node: Option<u32>) -> Vec<&'static Foundry> {
    FOUNDRIES
        .iter()
        .filter(|f| year >= f.founded)
        .filter(|f| process_node.map_or(true, |n| f.nodes(year).contains(&n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tsmc() -> &'static Foundry {
        foundry_by_id("tsmc").unwrap()
    }

    #[test]
    fn capacity_interpolates_between_years() {
        assert_eq!(tsmc().capacity(2012), 38_000);
        assert_eq!(tsmc().capacity(2023), 104_000);
        assert_eq!(tsmc().capacity(1980), 500);
        assert_eq!(tsmc().capacity(2040), 120_000);
        assert_eq!(interpolate_capacity(&[], 2000), 0);
    }

    #[test]
    fn capacity_exact_at_table_years() {
        for f in FOUNDRIES {
            for &(year, cap) in f.capacity_by_year {
                assert_eq!(f.capacity(year), cap, "{} {year}", f.id);
            }
        }
    }

    #[test]
    fn nodes_follow_most_recent_entry() {
        assert_eq!(tsmc().nodes(2016), &[28, 16, 10, 7]);
        assert_eq!(tsmc().nodes(2022), &[5, 3]);
        assert!(tsmc().nodes(1985).is_empty());
        let gf = foundry_by_id("globalfoundries").unwrap();
        assert_eq!(gf.nodes(2011), &[65, 45, 32]);
    }

    #[test]
    fn availability_filters_by_year_and_node() {
        let ids: Vec<_> = available_foundries(2021, Some(7)).iter().map(|f| f.id).collect();
        assert_eq!(ids, ["tsmc", "samsung", "intel_foundry"]);
        assert!(available_foundries(1985, None).iter().all(|f| f.founded <= 1985));
        assert!(!tsmc().offers(1985, 800));
        assert!(tsmc().offers(1988, 800));
    }

    #[test]
    fn lead_times_by_contract() {
        let umc = foundry_by_id("umc").unwrap();
        assert_eq!(umc.lead_time_weeks(ContractType::ShortTerm), 4);
        assert_eq!(umc.pricing_multiplier(), Decimal::new(8, 1));
    }

    proptest! {
        #[test]
        fn capacity_within_bracketing_entries(year in 1980i32..2040) {
            for f in FOUNDRIES {
                let table = f.capacity_by_year;
                let lo = table.iter().map(|e| e.1).min().unwrap();
                let hi = table.iter().map(|e| e.1).max().unwrap();
                prop_assert!((lo..=hi).contains(&f.capacity(year)));
            }
        }
    }
}
