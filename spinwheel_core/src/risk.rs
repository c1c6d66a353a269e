use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Reward profile selecting which base table a wheel is built from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            _ => Err(EngineError::UnknownRiskTier(s.to_string())),
        }
    }
}

/// One hand-authored (multiplier, weight) pair of a tier's base table.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BaseEntry {
    pub multiplier: f64,
    pub weight: f64,
    pub color: &'static str,
}

const fn entry(multiplier: f64, weight: f64, color: &'static str) -> BaseEntry {
    BaseEntry {
        multiplier,
        weight,
        color,
    }
}

pub const LOSS_COLOR: &str = "#333947";
pub const HIGH_WIN_COLOR: &str = "#D72E60";

const LOW_TABLE: [BaseEntry; 3] = [
    entry(0.0, 0.70, LOSS_COLOR),
    entry(1.2, 0.20, "#D9D9D9"),
    entry(1.5, 0.10, "#00E403"),
];

const MEDIUM_TABLE: [BaseEntry; 6] = [
    entry(0.0, 0.35, LOSS_COLOR),
    entry(1.5, 0.20, "#00E403"),
    entry(1.7, 0.15, "#D9D9D9"),
    entry(2.0, 0.15, "#FDE905"),
    entry(3.0, 0.10, "#7F46FD"),
    entry(4.0, 0.05, "#FCA32F"),
];

/// Winning multiplier of the high tier, stepped by wheel size.
pub fn high_risk_multiplier(segment_count: usize) -> f64 {
    match segment_count {
        0..=10 => 9.90,
        11..=20 => 19.80,
        21..=30 => 29.70,
        31..=40 => 39.60,
        _ => 49.50,
    }
}

/// Nominal weight of the high tier's winning entry, stepped by wheel size.
pub fn high_risk_weight(segment_count: usize) -> f64 {
    match segment_count {
        0..=10 => 0.20,
        11..=20 => 0.15,
        21..=30 => 0.10,
        31..=40 => 0.07,
        _ => 0.05,
    }
}

/// Base table for a tier. `segment_count` is only consulted for [`RiskTier::High`].
/// Weights of the returned entries sum to 1.
pub fn base_table(tier: RiskTier, segment_count: usize) -> Vec<BaseEntry> {
    match tier {
        RiskTier::Low => LOW_TABLE.to_vec(),
        RiskTier::Medium => MEDIUM_TABLE.to_vec(),
        RiskTier::High => {
            let win_weight = high_risk_weight(segment_count);
            vec![
                entry(0.0, 1.0 - win_weight, LOSS_COLOR),
                entry(high_risk_multiplier(segment_count), win_weight, HIGH_WIN_COLOR),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier() {
        assert_eq!("LOW".parse::<RiskTier>().unwrap(), RiskTier::Low);
        assert_eq!(" medium ".parse::<RiskTier>().unwrap(), RiskTier::Medium);
        assert_eq!(
            "extreme".parse::<RiskTier>(),
            Err(EngineError::UnknownRiskTier("extreme".into()))
        );
        for tier in RiskTier::ALL {
            assert_eq!(tier.to_string().parse::<RiskTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_base_weights_sum_to_one() {
        for tier in RiskTier::ALL {
            for n in [1, 10, 11, 20, 21, 30, 31, 40, 41, 50, 100] {
                let sum: f64 = base_table(tier, n).iter().map(|e| e.weight).sum();
                assert!((sum - 1.0).abs() < 1e-12, "{tier} n={n} sum={sum}");
            }
        }
    }

    #[test]
    fn test_high_step_boundaries() {
        let cases = [
            (1, 9.90, 0.20),
            (10, 9.90, 0.20),
            (11, 19.80, 0.15),
            (20, 19.80, 0.15),
            (21, 29.70, 0.10),
            (30, 29.70, 0.10),
            (31, 39.60, 0.07),
            (40, 39.60, 0.07),
            (41, 49.50, 0.05),
            (50, 49.50, 0.05),
        ];
        for (n, multiplier, weight) in cases {
            let table = base_table(RiskTier::High, n);
            assert_eq!(table.len(), 2);
            assert_eq!(table[0].multiplier, 0.0);
            assert_eq!(table[1].multiplier, multiplier);
            assert_eq!(table[1].weight, weight);
            assert_eq!(table[0].weight, 1.0 - weight);
        }
    }

    #[test]
    fn test_fixed_table_sizes() {
        assert_eq!(base_table(RiskTier::Low, 10).len(), 3);
        assert_eq!(base_table(RiskTier::Medium, 10).len(), 6);
    }
}
