//! Deterministic Random Number Generator
//!
//! Map generation must produce the same layout on every peer, so all
//! randomness comes from a seeded Xorshift128+ stream whose seed is derived
//! from the room id.

use sha2::{Sha256, Digest};

use super::fixed::{Fixed, FIELD_HALF_WIDTH, FIELD_HALF_HEIGHT};
use super::vec2::FixedVec2;

/// Deterministic PRNG using Xorshift128+.
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// The internal state is expanded with SplitMix64 so that adjacent seeds
    /// (round 1, round 2, ...) still produce unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random Fixed in range [min, max).
    #[inline]
    pub fn next_fixed_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if min >= max {
            return min;
        }
        let range = (max as i128) - (min as i128);
        let raw = (self.next_u64() >> 32) as i128;
        (min as i128 + ((raw * range) >> 32)) as Fixed
    }

    /// Random position inside the field, keeping `margin` away from the edges.
    pub fn field_position(&mut self, margin: Fixed) -> FixedVec2 {
        let x = self.next_fixed_range(-FIELD_HALF_WIDTH + margin, FIELD_HALF_WIDTH - margin);
        let y = self.next_fixed_range(-FIELD_HALF_HEIGHT + margin, FIELD_HALF_HEIGHT - margin);
        FixedVec2::new(x, y)
    }

    /// Random velocity with each component in [-speed, speed).
    pub fn velocity(&mut self, speed: Fixed) -> FixedVec2 {
        let x = self.next_fixed_range(-speed, speed);
        let y = self.next_fixed_range(-speed, speed);
        FixedVec2::new(x, y)
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the shared seed for a room.
///
/// Every peer that knows the room id computes the same value, which is what
/// lets role assignment (`roster[seed % n]`) and map layout agree without a
/// negotiation round.
pub fn derive_room_seed(room_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"ROOTED_ROOM_SEED_V1");
    hasher.update((room_id.len() as u32).to_be_bytes());
    hasher.update(room_id.as_bytes());
    let hash = hasher.finalize();

    let mut first = [0u8; 8];
    first.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(first)
}

/// Seed for a given round of a room.
pub fn derive_round_seed(room_seed: u64, round: u32) -> u64 {
    let mut s = room_seed ^ (round as u64).wrapping_mul(0xD1B54A32D192ED03);
    splitmix64(&mut s)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_field_position_in_bounds() {
        let mut rng = DeterministicRng::new(7777);
        for _ in 0..200 {
            let pos = rng.field_position(FIXED_MARGIN);
            assert!(pos.x >= -FIELD_HALF_WIDTH + FIXED_MARGIN && pos.x < FIELD_HALF_WIDTH - FIXED_MARGIN);
            assert!(pos.y >= -FIELD_HALF_HEIGHT + FIXED_MARGIN && pos.y < FIELD_HALF_HEIGHT - FIXED_MARGIN);
        }
    }

    const FIXED_MARGIN: Fixed = crate::core::fixed::FIXED_ONE;

    #[test]
    fn test_room_seed_stable() {
        assert_eq!(derive_room_seed("04217"), derive_room_seed("04217"));
        assert_ne!(derive_room_seed("04217"), derive_room_seed("04218"));
    }

    #[test]
    fn test_round_seed_varies_by_round() {
        let room = derive_room_seed("00001");
        assert_eq!(derive_round_seed(room, 3), derive_round_seed(room, 3));
        assert_ne!(derive_round_seed(room, 0), derive_round_seed(room, 1));
    }
}
