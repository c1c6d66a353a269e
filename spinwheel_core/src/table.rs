use serde::Serialize;

use crate::{
    error::{EngineError, EngineResult},
    risk::{base_table, BaseEntry, RiskTier},
};

/// Number of wedges on a dial. Always at least 1.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct SegmentCount(usize);

impl SegmentCount {
    pub fn new(count: usize) -> EngineResult<Self> {
        if count == 0 {
            return Err(EngineError::InvalidSegmentCount(count));
        }
        Ok(Self(count))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for SegmentCount {
    type Error = EngineError;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

/// One wedge of the dial.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Segment {
    pub multiplier: f64,
    pub weight: f64,
    pub color: &'static str,
}

impl From<BaseEntry> for Segment {
    fn from(e: BaseEntry) -> Self {
        Self {
            multiplier: e.multiplier,
            weight: e.weight,
            color: e.color,
        }
    }
}

/// Logical probability of landing on a given multiplier.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct MultiplierShare {
    pub multiplier: f64,
    pub color: &'static str,
    pub count: usize,
    pub probability: f64,
}

/// A tier's base table expanded to one entry per wedge.
///
/// Index `i` is the `i`-th wedge clockwise from the pointer at rest.
/// Every entry carries the same weight `1 / len`, so the chance of a
/// multiplier is decided by how many wedges show it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SegmentTable {
    tier: RiskTier,
    base: Vec<BaseEntry>,
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn tier(&self) -> RiskTier {
        self.tier
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_count(&self) -> SegmentCount {
        SegmentCount(self.segments.len())
    }

    pub fn get(&self, index: usize) -> EngineResult<&Segment> {
        self.segments.get(index).ok_or(EngineError::IndexOutOfRange {
            index,
            len: self.segments.len(),
        })
    }

    pub fn total_weight(&self) -> f64 {
        self.segments.iter().map(|s| s.weight).sum()
    }

    /// Distinct multipliers of the base table with their colors, in table order.
    pub fn legend(&self) -> Vec<(f64, &'static str)> {
        let mut out: Vec<(f64, &'static str)> = Vec::with_capacity(self.base.len());
        for e in &self.base {
            if !out.iter().any(|(m, _)| *m == e.multiplier) {
                out.push((e.multiplier, e.color));
            }
        }
        out
    }

    pub fn multiplier_shares(&self) -> Vec<MultiplierShare> {
        let n = self.segments.len() as f64;
        self.legend()
            .into_iter()
            .map(|(multiplier, color)| {
                let count = self
                    .segments
                    .iter()
                    .filter(|s| s.multiplier == multiplier)
                    .count();
                MultiplierShare {
                    multiplier,
                    color,
                    count,
                    probability: count as f64 / n,
                }
            })
            .collect()
    }

    /// Expected payout per unit staked under uniform wedge selection.
    pub fn expected_return(&self) -> f64 {
        self.multiplier_shares()
            .iter()
            .map(|s| s.probability * s.multiplier)
            .sum()
    }
}

/// Build the per-wedge table for a tier. Each tier has its own layout rule.
pub fn resolve_table(tier: RiskTier, count: SegmentCount) -> SegmentTable {
    let n = count.get();
    let base = base_table(tier, n);
    let mut segments = match tier {
        RiskTier::Low => expand_low(&base, n),
        RiskTier::Medium => expand_medium(&base, n),
        RiskTier::High => expand_high(&base, n),
    };
    let uniform = 1.0 / n as f64;
    for s in &mut segments {
        s.weight = uniform;
    }
    SegmentTable {
        tier,
        base,
        segments,
    }
}

// position of the 1.2x entry in the low base table
const LOW_COMMON: usize = 1;
// position of the 0x entry in the medium base table
const MEDIUM_COMMON: usize = 0;

/// Even wedges show 1.2x, odd wedges cycle 0x, 1.5x.
fn expand_low(base: &[BaseEntry], n: usize) -> Vec<Segment> {
    alternate_by_parity(base, LOW_COMMON, n)
}

/// Even wedges show 0x, odd wedges cycle through the five paying entries.
fn expand_medium(base: &[BaseEntry], n: usize) -> Vec<Segment> {
    alternate_by_parity(base, MEDIUM_COMMON, n)
}

/// Each entry gets `round(weight * n)` wedges; the last entry takes the remainder.
fn expand_high(base: &[BaseEntry], n: usize) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(n);
    let mut assigned = 0usize;
    for (i, e) in base.iter().enumerate() {
        let count = if i + 1 == base.len() {
            n.saturating_sub(assigned)
        } else {
            ((e.weight * n as f64).round() as usize).min(n - assigned)
        };
        assigned += count;
        segments.extend(std::iter::repeat(Segment::from(*e)).take(count));
    }
    segments
}

fn alternate_by_parity(base: &[BaseEntry], common: usize, n: usize) -> Vec<Segment> {
    let others: Vec<BaseEntry> = base
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != common)
        .map(|(_, e)| *e)
        .collect();
    let mut next_other = 0usize;
    (0..n)
        .map(|i| {
            if i % 2 == 0 || others.is_empty() {
                Segment::from(base[common])
            } else {
                let e = others[next_other % others.len()];
                next_other += 1;
                Segment::from(e)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(tier: RiskTier, n: usize) -> SegmentTable {
        resolve_table(tier, SegmentCount::new(n).unwrap())
    }

    fn multipliers(t: &SegmentTable) -> Vec<f64> {
        t.segments().iter().map(|s| s.multiplier).collect()
    }

    #[test]
    fn test_zero_segments_rejected() {
        assert_eq!(SegmentCount::new(0), Err(EngineError::InvalidSegmentCount(0)));
        assert!(SegmentCount::try_from(1).is_ok());
    }

    #[test]
    fn test_low_three_segments() {
        let t = table(RiskTier::Low, 3);
        assert_eq!(multipliers(&t), vec![1.2, 0.0, 1.2]);
        for s in t.segments() {
            assert_eq!(s.weight, 1.0 / 3.0);
        }
    }

    #[test]
    fn test_low_round_robin() {
        let t = table(RiskTier::Low, 8);
        assert_eq!(
            multipliers(&t),
            vec![1.2, 0.0, 1.2, 1.5, 1.2, 0.0, 1.2, 1.5]
        );
    }

    #[test]
    fn test_medium_round_robin() {
        let t = table(RiskTier::Medium, 12);
        assert_eq!(
            multipliers(&t),
            vec![0.0, 1.5, 0.0, 1.7, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 0.0, 1.5]
        );
    }

    #[test]
    fn test_medium_small_wheel_wraps() {
        let t = table(RiskTier::Medium, 4);
        assert_eq!(multipliers(&t), vec![0.0, 1.5, 0.0, 1.7]);
        let t = table(RiskTier::Medium, 1);
        assert_eq!(multipliers(&t), vec![0.0]);
    }

    #[test]
    fn test_high_ten_segments() {
        let t = table(RiskTier::High, 10);
        let m = multipliers(&t);
        assert_eq!(&m[..8], &[0.0; 8]);
        assert_eq!(&m[8..], &[9.90, 9.90]);
        for s in t.segments() {
            assert!((s.weight - 0.1).abs() < 1e-15);
        }
    }

    #[test]
    fn test_high_counts_by_size() {
        // (n, expected winning wedges)
        for (n, wins) in [(20, 3), (30, 3), (40, 3), (1, 0), (3, 1)] {
            let t = table(RiskTier::High, n);
            assert_eq!(t.len(), n);
            let count = t.segments().iter().filter(|s| s.multiplier > 0.0).count();
            assert_eq!(count, wins, "n={n}");
        }
    }

    #[test]
    fn test_legend_and_shares() {
        let t = table(RiskTier::Low, 10);
        assert_eq!(
            t.legend(),
            vec![(0.0, "#333947"), (1.2, "#D9D9D9"), (1.5, "#00E403")]
        );
        let shares = t.multiplier_shares();
        assert_eq!(shares[0].count, 3);
        assert_eq!(shares[1].count, 5);
        assert_eq!(shares[2].count, 2);
        assert!((t.expected_return() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_get_out_of_range() {
        let t = table(RiskTier::High, 10);
        assert!(t.get(9).is_ok());
        assert_eq!(
            t.get(10),
            Err(EngineError::IndexOutOfRange { index: 10, len: 10 })
        );
    }
}
