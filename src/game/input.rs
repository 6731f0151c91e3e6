//! Input Sampling
//!
//! Local input is sampled once per rendered frame (pre-update) and turned
//! into avatar movement plus outgoing events. Axes use an i8 encoding with
//! a lookup table so the same stick value yields the same fixed-point
//! direction on every platform.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;

// =============================================================================
// MOVE LOOKUP TABLE
// =============================================================================

/// i8 axis value to Fixed in [-1, 1]. Index 128 (-128) means released.
pub static MOVE_LUT: [Fixed; 256] = {
    let mut lut = [0i32; 256];
    let mut i = 0i32;
    while i < 256 {
        let signed = if i < 128 { i } else { i - 256 };
        if signed != -128 {
            lut[i as usize] = (signed * 65536) / 127;
        }
        i += 1;
    }
    lut
};

/// Convert an i8 axis value to Fixed.
#[inline]
pub fn move_to_fixed(input: i8) -> Fixed {
    MOVE_LUT[(input as u8) as usize]
}

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Input state for one rendered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Horizontal axis: -127 (left) to +127 (right), -128 released.
    pub move_x: i8,
    /// Vertical axis: -127 (down) to +127 (up), -128 released.
    pub move_y: i8,
    /// Action bits, see the `FLAG_*` constants.
    pub flags: u8,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Axis value meaning "stick released".
    pub const NO_INPUT: i8 = -128;

    /// Dash burst.
    pub const FLAG_DASH: u8 = 0x01;
    /// Farmer: root the held carrot into the spot underneath.
    pub const FLAG_ROOT: u8 = 0x02;
    /// Carrot: pull a rooted carrot out of the spot underneath.
    pub const FLAG_UNROOT: u8 = 0x04;
    /// Captured carrot: shake to break free.
    pub const FLAG_SHAKE: u8 = 0x08;
    /// Throw the held rock.
    pub const FLAG_THROW: u8 = 0x10;

    /// Idle frame.
    pub const fn new() -> Self {
        Self {
            move_x: Self::NO_INPUT,
            move_y: Self::NO_INPUT,
            flags: 0,
        }
    }

    /// Frame with a stick direction and no actions.
    pub const fn with_movement(move_x: i8, move_y: i8) -> Self {
        Self { move_x, move_y, flags: 0 }
    }

    /// Same frame with `flag` set.
    pub const fn with_flag(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }

    /// Stick direction as fixed-point components.
    #[inline]
    pub fn move_direction(&self) -> FixedVec2 {
        FixedVec2::new(move_to_fixed(self.move_x), move_to_fixed(self.move_y))
    }

    /// Whether the stick is deflected.
    #[inline]
    pub fn has_movement(&self) -> bool {
        self.move_direction() != FixedVec2::ZERO
    }

    /// Whether `flag` is set.
    #[inline]
    pub fn pressed(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// Where local input comes from.
pub trait InputSource: Send {
    /// Input for the current frame.
    fn sample(&mut self) -> InputFrame;
}

/// Replays a fixed list of frames, then idles.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    frames: VecDeque<InputFrame>,
}

impl ScriptedInput {
    /// Source that yields `frames` in order.
    pub fn new(frames: impl IntoIterator<Item = InputFrame>) -> Self {
        Self { frames: frames.into_iter().collect() }
    }

    /// Append `count` copies of `frame`.
    pub fn push_repeated(&mut self, frame: InputFrame, count: usize) {
        self.frames.extend(std::iter::repeat(frame).take(count));
    }

    /// Frames not yet consumed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputFrame {
        self.frames.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;

    #[test]
    fn test_move_lut_edges() {
        assert_eq!(move_to_fixed(127), FIXED_ONE);
        assert_eq!(move_to_fixed(-127), -FIXED_ONE);
        assert_eq!(move_to_fixed(0), 0);
        assert_eq!(move_to_fixed(InputFrame::NO_INPUT), 0);
    }

    #[test]
    fn test_idle_frame_has_no_movement() {
        let frame = InputFrame::new();
        assert!(!frame.has_movement());
        assert!(!frame.pressed(InputFrame::FLAG_DASH));
        assert!(InputFrame::with_movement(127, InputFrame::NO_INPUT).has_movement());
    }

    #[test]
    fn test_flags() {
        let frame = InputFrame::new()
            .with_flag(InputFrame::FLAG_DASH)
            .with_flag(InputFrame::FLAG_THROW);
        assert!(frame.pressed(InputFrame::FLAG_DASH));
        assert!(frame.pressed(InputFrame::FLAG_THROW));
        assert!(!frame.pressed(InputFrame::FLAG_ROOT));
    }

    #[test]
    fn test_scripted_input_idles_when_exhausted() {
        let mut input = ScriptedInput::new([InputFrame::with_movement(10, 0)]);
        input.push_repeated(InputFrame::new().with_flag(InputFrame::FLAG_DASH), 2);
        assert_eq!(input.remaining(), 3);
        assert_eq!(input.sample(), InputFrame::with_movement(10, 0));
        assert!(input.sample().pressed(InputFrame::FLAG_DASH));
        assert!(input.sample().pressed(InputFrame::FLAG_DASH));
        assert_eq!(input.sample(), InputFrame::new());
    }
}
