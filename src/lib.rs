//! Sand Wave - A side-scrolling wave-runner arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain wave, physics, collisions, game state)
//! - `scheduler`: Dedicated simulation thread driving the engine at a fixed cadence
//! - `tuning`: Data-driven game balance
//! - `audio`: Sound trigger points emitted by the simulation
//! - `highscores`: Best-score storage contract

pub mod audio;
pub mod highscores;
pub mod scheduler;
pub mod sim;
pub mod tuning;

pub use highscores::{JsonFileScoreStore, MemoryScoreStore, ScoreStore};
pub use scheduler::{LoopConfig, Scheduler, SimHandle};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Target simulation cadence (~120 Hz)
    pub const TICK_INTERVAL_MS: u64 = 8;
    /// Fixed simulation timestep matching the tick cadence
    pub const SIM_DT: f32 = TICK_INTERVAL_MS as f32 / 1000.0;

    /// Physics constants are tuned per frame at this rate and scaled by `dt * PHYSICS_FPS`
    pub const PHYSICS_FPS: f32 = 60.0;

    /// Default canvas the game was balanced for
    pub const CANVAS_WIDTH: f32 = 1920.0;
    pub const CANVAS_HEIGHT: f32 = 1080.0;

    /// Player defaults - lane is fixed, the world scrolls instead
    pub const PLAYER_LANE_X: f32 = 240.0;
    pub const PLAYER_RADIUS: f32 = 30.0;
    pub const JUMP_VELOCITY: f32 = 15.0;

    /// Scroll speed (pixels per 60 Hz frame)
    pub const SPEED_NORMAL: f32 = 3.5;
    pub const SPEED_BOOST: f32 = 8.0;

    /// Gravity (pixels per 60 Hz frame squared)
    pub const GRAVITY_NORMAL: f32 = 0.4;
    pub const GRAVITY_REDUCED: f32 = 0.2;

    /// Obstacle defaults
    pub const OBSTACLE_WIDTH: f32 = 40.0;
    pub const OBSTACLE_CULL_X: f32 = -1000.0;

    /// Falling object defaults
    pub const FALLING_RADIUS: f32 = 35.0;

    /// Distance (pixels of scroll) per score point
    pub const PIXELS_PER_POINT: f32 = 10.0;
}

/// Scale factor converting a per-frame physics constant into a `dt`-sized step
#[inline]
pub fn frame_scale(dt: f32) -> f32 {
    dt * consts::PHYSICS_FPS
}
