pub mod engine;
pub mod error;
pub mod risk;
pub mod rng;
pub mod session;
pub mod table;

pub use crate::engine::{
    compute_target_angle, ease_out_cubic, landing_rotation, rotation_at, sample_index,
    sample_outcome, segment_angle, segment_under_pointer, settle, spin, spin_with, verify_outcome,
    EngineConfig, Outcome, Sample, Settlement, DEFAULT_FULL_ROTATIONS,
};
pub use crate::error::{EngineError, EngineResult};
pub use crate::risk::{base_table, high_risk_multiplier, high_risk_weight, BaseEntry, RiskTier};
pub use crate::rng::{derive_hash_hex, draw_from_bytes, DrawSource, ProvablyFairRng, ThreadDraws};
pub use crate::session::{
    manual_spin, validate_bet, AutoBetConfig, AutoBetSession, Round, SessionState, StopReason,
};
pub use crate::table::{resolve_table, MultiplierShare, Segment, SegmentCount, SegmentTable};
