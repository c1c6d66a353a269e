//! Outcome resolution and dial geometry.
//!
//! Angle convention: wedge `i` covers dial angles `[i * w, (i + 1) * w)` with
//! `w = 2π / n`, measured clockwise from the leading edge of wedge 0. A dial
//! rotation `a` puts dial angle `a mod 2π` under the pointer. Targets aim at
//! the centre of a wedge, and [`segment_under_pointer`] reads back with the
//! same convention, so `segment_under_pointer(compute_target_angle(i, ..)) == i`.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{EngineError, EngineResult},
    risk::RiskTier,
    rng::{DrawSource, ProvablyFairRng},
    table::{resolve_table, Segment, SegmentCount, SegmentTable},
};

pub const DEFAULT_FULL_ROTATIONS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra full turns before the dial settles.
    pub full_rotations: u32,
    pub spin_duration_ms: u64,
    /// Pause after a spin lands before the next automated round.
    pub result_display_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            full_rotations: DEFAULT_FULL_ROTATIONS,
            spin_duration_ms: 3000,
            result_display_ms: 2000,
        }
    }
}

/// Index and multiplier picked by the sampler.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Sample {
    pub index: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Outcome {
    pub selected_index: usize,
    pub multiplier: f64,
    pub target_angle: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Settlement {
    pub bet: f64,
    pub multiplier: f64,
    pub payout: f64,
    pub profit: f64,
}

/// First index whose cumulative weight reaches `draw`, or the last index
/// when rounding leaves the cumulative sum just short of the draw.
pub fn sample_index(segments: &[Segment], draw: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, s) in segments.iter().enumerate() {
        cumulative += s.weight;
        if draw <= cumulative {
            return i;
        }
    }
    let last = segments.len().saturating_sub(1);
    warn!(draw, cumulative, last, "draw above cumulative weight, using last segment");
    last
}

pub fn sample_outcome(table: &SegmentTable, draw: f64) -> Sample {
    let index = sample_index(table.segments(), draw);
    Sample {
        index,
        multiplier: table.segments()[index].multiplier,
    }
}

pub fn segment_angle(count: SegmentCount) -> f64 {
    TAU / count.get() as f64
}

/// Rotation that lands the centre of wedge `index` under the pointer after
/// `full_rotations` extra turns.
pub fn compute_target_angle(
    index: usize,
    count: SegmentCount,
    full_rotations: u32,
) -> EngineResult<f64> {
    if index >= count.get() {
        return Err(EngineError::IndexOutOfRange {
            index,
            len: count.get(),
        });
    }
    Ok(wedge_center_angle(index, count, full_rotations))
}

fn wedge_center_angle(index: usize, count: SegmentCount, full_rotations: u32) -> f64 {
    (index as f64 + 0.5) * segment_angle(count) + full_rotations as f64 * TAU
}

/// Wedge under the pointer for a dial rotated by `rotation` radians.
pub fn segment_under_pointer(rotation: f64, count: SegmentCount) -> usize {
    let normalized = rotation.rem_euclid(TAU);
    let index = (normalized / segment_angle(count)).floor() as usize;
    index.min(count.get() - 1)
}

/// Absolute rotation to animate to from `current` so the dial keeps turning
/// forward and settles on `index`.
pub fn landing_rotation(
    current: f64,
    index: usize,
    count: SegmentCount,
    full_rotations: u32,
) -> EngineResult<f64> {
    let turn_start = current - current.rem_euclid(TAU);
    let mut target = turn_start + compute_target_angle(index, count, 0)?;
    if target < current {
        target += TAU;
    }
    Ok(target + full_rotations as f64 * TAU)
}

pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

/// Dial rotation `elapsed_ms` into an animation from `from` to `to`.
pub fn rotation_at(from: f64, to: f64, elapsed_ms: u64, duration_ms: u64) -> f64 {
    let progress = if duration_ms == 0 {
        1.0
    } else {
        elapsed_ms as f64 / duration_ms as f64
    };
    from + (to - from) * ease_out_cubic(progress)
}

/// Resolve one outcome from a single draw.
pub fn spin(table: &SegmentTable, draw: f64, full_rotations: u32) -> Outcome {
    let sample = sample_outcome(table, draw);
    let count = table.segment_count();
    let outcome = Outcome {
        selected_index: sample.index,
        multiplier: sample.multiplier,
        target_angle: wedge_center_angle(sample.index, count, full_rotations),
    };
    debug!(
        tier = %table.tier(),
        segments = count.get(),
        draw,
        index = outcome.selected_index,
        multiplier = outcome.multiplier,
        "spin resolved"
    );
    outcome
}

pub fn spin_with<S: DrawSource + ?Sized>(
    table: &SegmentTable,
    source: &mut S,
    config: &EngineConfig,
) -> Outcome {
    spin(table, source.next_draw(), config.full_rotations)
}

pub fn settle(bet: f64, multiplier: f64) -> Settlement {
    let payout = bet * multiplier;
    Settlement {
        bet,
        multiplier,
        payout,
        profit: payout - bet,
    }
}

/// Recompute the wedge a provably-fair spin must have landed on.
pub fn verify_outcome(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    tier: RiskTier,
    count: SegmentCount,
    expected_index: usize,
) -> bool {
    let rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    let table = resolve_table(tier, count);
    sample_outcome(&table, rng.draw_at(nonce)).index == expected_index
}
