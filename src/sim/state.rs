//! Game state and core simulation types
//!
//! Entities are stored in screen coordinates. World X = screen X + wave offset.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// The player - fixed lane X, dynamic Y
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Center of the player circle
    pub pos: Vec2,
    /// Upward velocity (positive = rising)
    pub velocity_y: f32,
    /// Airborne flag; while false Y is pinned to the wave surface
    pub is_jumping: bool,
}

impl Player {
    pub fn new(lane_x: f32) -> Self {
        Self {
            pos: Vec2::new(lane_x, 0.0),
            velocity_y: 0.0,
            is_jumping: false,
        }
    }
}

/// Ground obstacle resting on the wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Top-left corner
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
}

/// Hazard falling diagonally from the top-right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingObject {
    pub pos: Vec2,
    /// Velocity per 60 Hz frame
    pub vel: Vec2,
    pub radius: f32,
}

/// Charged shot released while airborne
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Velocity per 60 Hz frame
    pub vel: Vec2,
    pub radius: f32,
}

/// Capability shared by entities the engine removes once they leave the play area
pub trait Cullable {
    fn is_off_screen(&self, tuning: &Tuning) -> bool;
}

impl Cullable for Obstacle {
    fn is_off_screen(&self, tuning: &Tuning) -> bool {
        self.pos.x + self.width < tuning.obstacle_cull_x
    }
}

impl Cullable for FallingObject {
    fn is_off_screen(&self, tuning: &Tuning) -> bool {
        // Spawned beyond the right edge, so only left/bottom exits count
        self.pos.x + self.radius < 0.0 || self.pos.y - self.radius > tuning.canvas_height
    }
}

impl Cullable for Projectile {
    fn is_off_screen(&self, tuning: &Tuning) -> bool {
        self.pos.x - self.radius > tuning.canvas_width
            || self.pos.x + self.radius < 0.0
            || self.pos.y + self.radius < 0.0
            || self.pos.y - self.radius > tuning.canvas_height
    }
}

/// Remove off-screen entities in place, preserving order. Returns how many were dropped.
pub fn cull<T: Cullable>(items: &mut Vec<T>, tuning: &Tuning) -> usize {
    let before = items.len();
    items.retain(|item| !item.is_off_screen(tuning));
    before - items.len()
}

/// Complete simulation state (single writer: the engine)
///
/// Presentation receives clones of this as immutable snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub player: Player,
    /// Spawn order
    pub obstacles: Vec<Obstacle>,
    /// Spawn order
    pub falling_objects: Vec<FallingObject>,
    /// Spawn order
    pub projectiles: Vec<Projectile>,
    /// floor(wave_offset / pixels_per_point)
    pub score: u64,
    /// Horizontal scroll of the world (monotonic within a round)
    pub wave_offset: f32,
    /// Simulation tick counter (ticks actually simulated this round)
    pub time_ticks: u64,
    pub is_game_over: bool,
    pub is_paused: bool,
    /// Set by a reset, cleared by the next simulated tick
    pub is_reset: bool,
}

impl SimState {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            player: Player::new(tuning.player_x),
            obstacles: Vec::new(),
            falling_objects: Vec::new(),
            projectiles: Vec::new(),
            score: 0,
            wave_offset: 0.0,
            time_ticks: 0,
            is_game_over: false,
            is_paused: false,
            is_reset: false,
        }
    }

    /// Reinitialise in place (collections keep their allocations)
    pub fn reset(&mut self, tuning: &Tuning) {
        self.player = Player::new(tuning.player_x);
        self.obstacles.clear();
        self.falling_objects.clear();
        self.projectiles.clear();
        self.score = 0;
        self.wave_offset = 0.0;
        self.time_ticks = 0;
        self.is_game_over = false;
        self.is_reset = true;
    }
}
