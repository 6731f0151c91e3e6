//! Feedback services.
//!
//! Audio and haptics are injected into the reducer and controller instead
//! of being reached through globals, so tests can record every cue.

use std::sync::{Arc, Mutex};

/// A feedback cue raised by game logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// A carrot was caught.
    Capture,
    /// A carrot was planted.
    Root,
    /// A carrot was pulled out.
    Unroot,
    /// A captured carrot broke free.
    Free,
    /// A baby carrot was collected.
    CollectBaby,
    /// A rock was picked up.
    PickupRock,
    /// A rock was thrown.
    ThrowRock,
    /// Wheat rustled.
    Rustle,
    /// An avatar dashed.
    Dash,
    /// A round ended.
    RoundOver,
}

/// Sound playback.
pub trait Audio: Send {
    /// Play the sound for `cue`.
    fn play(&mut self, cue: Cue);
}

/// Controller vibration.
pub trait Haptics: Send {
    /// Pulse for `cue`.
    fn pulse(&mut self, cue: Cue);
}

/// Silent audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl Audio for NullAudio {
    fn play(&mut self, _cue: Cue) {}
}

/// No vibration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHaptics;

impl Haptics for NullHaptics {
    fn pulse(&mut self, _cue: Cue) {}
}

/// Records cues in a shared list. Clones share the same list.
#[derive(Debug, Default, Clone)]
pub struct CueLog(Arc<Mutex<Vec<Cue>>>);

impl CueLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cues recorded so far.
    pub fn cues(&self) -> Vec<Cue> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, cue: Cue) {
        if let Ok(mut cues) = self.0.lock() {
            cues.push(cue);
        }
    }
}

impl Audio for CueLog {
    fn play(&mut self, cue: Cue) {
        self.record(cue);
    }
}

impl Haptics for CueLog {
    fn pulse(&mut self, cue: Cue) {
        self.record(cue);
    }
}

/// The services handed to game logic.
pub struct Services {
    /// Sound.
    pub audio: Box<dyn Audio>,
    /// Vibration.
    pub haptics: Box<dyn Haptics>,
}

impl Services {
    /// Services that do nothing.
    pub fn null() -> Self {
        Self {
            audio: Box::new(NullAudio),
            haptics: Box::new(NullHaptics),
        }
    }

    /// Both services record into `log`.
    pub fn recording(log: &CueLog) -> Self {
        Self {
            audio: Box::new(log.clone()),
            haptics: Box::new(log.clone()),
        }
    }

    /// Sound and vibration for `cue`.
    pub fn feedback(&mut self, cue: Cue) {
        self.audio.play(cue);
        self.haptics.pulse(cue);
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_services_share_log() {
        let log = CueLog::new();
        let mut services = Services::recording(&log);
        services.feedback(Cue::Dash);
        services.audio.play(Cue::Root);
        assert_eq!(log.cues(), vec![Cue::Dash, Cue::Dash, Cue::Root]);
    }

    #[test]
    fn test_null_services_are_silent() {
        let mut services = Services::null();
        services.feedback(Cue::Capture);
    }
}
