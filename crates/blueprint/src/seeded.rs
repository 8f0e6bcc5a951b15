//! Position-seeded deterministic randomness.
//!
//! Pipeline rules never share a mutable random stream. Every draw site hashes
//! `(world_seed, position)` into a fresh `ChaCha8Rng`, so results depend only
//! on inputs and are reproducible under any call order or thread count.

use glam::IVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use xxhash_rust::xxh32::xxh32;

/// Folds a world seed and a cell position into a 64-bit stream seed.
pub fn position_seed(world_seed: i64, pos: IVec3) -> u64 {
    let mut buf = [0u8; 20];
    buf[0..8].copy_from_slice(&world_seed.to_le_bytes());
    buf[8..12].copy_from_slice(&pos.x.to_le_bytes());
    buf[12..16].copy_from_slice(&pos.y.to_le_bytes());
    buf[16..20].copy_from_slice(&pos.z.to_le_bytes());
    let lo = xxh32(&buf, 0x9E37);
    let hi = xxh32(&buf, 0x79B9);
    (u64::from(hi) << 32) | u64::from(lo)
}

/// Fresh deterministic generator for one call site.
pub fn rng_at(world_seed: i64, pos: IVec3) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(position_seed(world_seed, pos))
}
