//! Sound trigger points
//!
//! The simulation never plays audio itself. It emits these triggers through
//! [`SimObserver::on_sound`](crate::sim::SimObserver::on_sound) and the host
//! maps them to whatever playback it has.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Player left the ground
    Jump,
    /// Player hit a hazard and the round ended
    Crash,
}

impl SoundEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Jump => "jump",
            SoundEffect::Crash => "crash",
        }
    }
}
