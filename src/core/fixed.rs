//! Q16.16 Fixed-Point Arithmetic
//!
//! Every transform that crosses the wire (rock spawn positions, body
//! snapshots) is a Q16.16 value, so peers exchange exact integers and never
//! disagree about float rounding.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// FIELD CONSTANTS (integer literals, no float conversion)
// =============================================================================

/// Field half-width: 16.0 units
pub const FIELD_HALF_WIDTH: Fixed = 16 * FIXED_ONE;

/// Field half-height: 9.0 units
pub const FIELD_HALF_HEIGHT: Fixed = 9 * FIXED_ONE;

/// Farmer and carrot body radius: 0.5
pub const AVATAR_RADIUS: Fixed = 32768;

/// Baby carrot body radius: 0.25
pub const BABY_RADIUS: Fixed = 16384;

/// Planting spot sensor radius: 0.75
pub const PLANTING_SPOT_RADIUS: Fixed = 49152;

/// Wheat patch sensor radius: 2.0
pub const WHEAT_RADIUS: Fixed = 2 * FIXED_ONE;

/// Rock spawn sensor radius: 0.4
pub const ROCK_SPAWN_RADIUS: Fixed = 26214;

/// Thrown rock radius: 0.2
pub const ROCK_RADIUS: Fixed = 13107;

/// Boundary post radius: 0.5
pub const BOUNDARY_RADIUS: Fixed = 32768;

/// Farmer walking speed: 4.0 units/sec
pub const FARMER_SPEED: Fixed = 4 * FIXED_ONE;

/// Carrot walking speed: 4.5 units/sec
pub const CARROT_SPEED: Fixed = 294912;

/// Dash speed multiplier: 2.0
pub const DASH_MULTIPLIER: Fixed = 2 * FIXED_ONE;

/// Thrown rock speed: 10.0 units/sec
pub const ROCK_THROW_SPEED: Fixed = 10 * FIXED_ONE;

/// Baby carrot wander speed: 1.0 units/sec
pub const BABY_WANDER_SPEED: Fixed = FIXED_ONE;

/// Distance at which a wandering baby carrot counts as arrived: 0.2
pub const BABY_ARRIVE_RADIUS: Fixed = 13107;

/// Slowest rock-versus-avatar closing speed that stuns: 2.0 units/sec
pub const ROCK_MIN_STUN_SPEED: Fixed = 2 * FIXED_ONE;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// Only for constants and demo setup.
///
/// ```
/// use rooted_sync::core::fixed::{to_fixed, FIXED_ONE};
/// assert_eq!(to_fixed(2.5), FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Convert a wall-clock step into fixed-point seconds (truncating).
#[inline]
pub fn duration_to_fixed(step: Duration) -> Fixed {
    let micros = step.as_micros() as i64;
    ((micros * FIXED_ONE as i64) / 1_000_000) as Fixed
}

/// Multiply two fixed-point numbers with an i64 intermediate.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers. Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root using a fixed number of Newton-Raphson iterations.
///
/// Returns 0 for non-positive inputs.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }

    let mut guess = (x >> 1).max(1);
    for _ in 0..8 {
        let div = fixed_div(x, guess);
        guess = (guess.wrapping_add(div)) >> 1;
        if guess == 0 {
            guess = 1;
        }
    }

    guess
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

// =============================================================================
// TESTS
// =============================================================================
