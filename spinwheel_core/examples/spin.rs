use spinwheel_core::{
    resolve_table, segment_under_pointer, spin_with, EngineConfig, ProvablyFairRng, RiskTier,
    SegmentCount,
};

fn main() -> Result<(), spinwheel_core::EngineError> {
    // Example end-to-end spin
    let mut rng = ProvablyFairRng::new("example-server-seed", "example-client-seed", 1);
    let count = SegmentCount::new(20)?;
    let table = resolve_table(RiskTier::High, count);
    let outcome = spin_with(&table, &mut rng, &EngineConfig::default());
    println!(
        "server_seed_hash={} index={} multiplier={:.2}x angle={:.4} landed={}",
        rng.server_seed_hash_hex(),
        outcome.selected_index,
        outcome.multiplier,
        outcome.target_angle,
        segment_under_pointer(outcome.target_angle, count)
    );
    Ok(())
}
