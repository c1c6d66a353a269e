use std::num::TryFromIntError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spinwheel_core::{Outcome, RiskTier, SegmentTable, Settlement};

/// Seeds and nonce behind a provably-fair draw, enough to re-run `verify`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FairDraw {
    pub client_seed: String,
    pub server_seed_hash: String,
    pub nonce: u64,
}

/// One row of the append-only spin history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub risk: RiskTier,
    pub segment_count: u32,
    pub bet: f64,
    pub multiplier: f64,
    pub payout: f64,
    pub target_angle: f64,
    /// Absent for spins drawn from OS randomness.
    pub fair: Option<FairDraw>,
}

impl HistoryEntry {
    pub fn from_spin(
        table: &SegmentTable,
        outcome: &Outcome,
        settlement: &Settlement,
        fair: Option<FairDraw>,
    ) -> Result<Self, TryFromIntError> {
        Ok(Self {
            id: 0,
            ts: Utc::now(),
            risk: table.tier(),
            segment_count: u32::try_from(table.len())?,
            bet: settlement.bet,
            multiplier: outcome.multiplier,
            payout: settlement.payout,
            target_angle: outcome.target_angle,
            fair,
        })
    }

    pub fn nonce(&self) -> Option<u64> {
        self.fair.as_ref().map(|f| f.nonce)
    }

    pub fn multiplier_label(&self) -> String {
        format!("{:.2}x", self.multiplier)
    }

    pub fn profit(&self) -> f64 {
        self.payout - self.bet
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FrameSegment {
    pub multiplier: f64,
    pub color: String,
}

/// What a renderer needs to draw the dial and animate it to the outcome.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WheelFrame {
    pub segments: Vec<FrameSegment>,
    pub target_angle: f64,
    pub spin_duration_ms: u64,
}

impl WheelFrame {
    pub fn new(table: &SegmentTable, outcome: &Outcome, spin_duration_ms: u64) -> Self {
        Self {
            segments: table
                .segments()
                .iter()
                .map(|s| FrameSegment {
                    multiplier: s.multiplier,
                    color: s.color.to_string(),
                })
                .collect(),
            target_angle: outcome.target_angle,
            spin_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinwheel_core::{resolve_table, settle, spin, SegmentCount};

    #[test]
    fn entry_from_spin() {
        let table = resolve_table(RiskTier::High, SegmentCount::new(10).unwrap());
        let outcome = spin(&table, 0.85, 5);
        let settlement = settle(10.0, outcome.multiplier);
        let fair = FairDraw {
            client_seed: "client".into(),
            server_seed_hash: "abc123".into(),
            nonce: 3,
        };
        let entry = HistoryEntry::from_spin(&table, &outcome, &settlement, Some(fair.clone())).unwrap();
        assert_eq!(entry.multiplier_label(), "9.90x");
        assert_eq!(entry.nonce(), Some(3));
        assert_eq!(entry.fair, Some(fair));
        assert_eq!(entry.risk, RiskTier::High);
        assert_eq!(entry.segment_count, 10);
        assert!((entry.profit() - 89.0).abs() < 1e-9);
    }

    #[test]
    fn entry_without_seeds() {
        let table = resolve_table(RiskTier::Low, SegmentCount::new(50).unwrap());
        let outcome = spin(&table, 0.3, 5);
        let entry =
            HistoryEntry::from_spin(&table, &outcome, &settle(1.0, outcome.multiplier), None).unwrap();
        assert_eq!(entry.segment_count, 50);
        assert_eq!(entry.nonce(), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["fair"].is_null());
    }

    #[test]
    fn frame_json_shape() {
        let table = resolve_table(RiskTier::Low, SegmentCount::new(3).unwrap());
        let outcome = spin(&table, 0.0, 0);
        let frame = WheelFrame::new(&table, &outcome, 3000);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["segments"].as_array().unwrap().len(), 3);
        assert_eq!(json["segments"][0]["color"], "#D9D9D9");
        let back: WheelFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }
}
