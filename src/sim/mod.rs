//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod events;
pub mod state;
pub mod tick;
pub mod wave;

pub use collision::{Aabb, circle_box_overlap, circles_overlap};
pub use events::{
    NullObserver, Shockwave, ShockwaveReceiver, ShockwaveSender, SimObserver, shockwave_queue,
};
pub use state::{Cullable, FallingObject, Obstacle, Player, Projectile, SimState, cull};
pub use tick::{Engine, TickInput};
pub use wave::{Harmonic, WaveField, WaveParams};
