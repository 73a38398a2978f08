//! Data-driven game balance
//!
//! Every gameplay constant the engine reads lives here so a session can be
//! re-tuned from JSON without touching code. Missing fields fall back to the
//! defaults the game shipped with.

use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading or validating a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Half-open numeric range `[min, max)` used for random draws
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform draw from `[min, max)`; an empty or inverted range yields `min`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.random_range(self.min..self.max)
        } else {
            self.min
        }
    }

    fn check(&self, field: &'static str) -> Result<(), TuningError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(TuningError::Invalid {
                field,
                reason: "bounds must be finite".into(),
            });
        }
        if self.min > self.max {
            return Err(TuningError::Invalid {
                field,
                reason: format!("min {} exceeds max {}", self.min, self.max),
            });
        }
        Ok(())
    }
}

/// Game balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Viewport ===
    pub canvas_width: f32,
    pub canvas_height: f32,

    // === Player ===
    /// Fixed screen X of the player lane
    pub player_x: f32,
    pub player_radius: f32,
    /// Upward velocity applied by a jump
    pub jump_velocity: f32,

    // === World motion ===
    pub speed_normal: f32,
    pub speed_boost: f32,
    /// Difficulty ramp: speed gained per second of play
    pub speed_ramp_per_sec: f32,
    pub speed_normal_max: f32,
    pub speed_boost_max: f32,

    // === Gravity ===
    pub gravity_normal: f32,
    /// Floor that fly-mode gravity decays toward
    pub gravity_reduced: f32,
    /// Fly-mode gravity decay per 60 Hz frame
    pub gravity_decay: f32,

    // === Obstacles ===
    pub obstacle_width: f32,
    pub obstacle_height: Range,
    /// Distance past the right edge of the canvas an obstacle spawns at
    pub obstacle_spawn_ahead: Range,
    /// Seconds between obstacle spawns (re-rolled per spawn)
    pub obstacle_spawn_delay: Range,
    /// Screen X an obstacle's right edge must pass before it is culled
    pub obstacle_cull_x: f32,

    // === Falling objects ===
    pub falling_radius: f32,
    /// Diagonal velocity per 60 Hz frame (x is negative: toward the player)
    pub falling_velocity: (f32, f32),
    pub falling_spawn_delay: Range,
    /// Upper bound (inclusive) on objects spawned per trigger
    pub falling_max_per_spawn: u32,
    /// Horizontal spread of spawn positions right of the canvas top corner
    pub falling_spawn_spread: f32,

    // === Charge / ultimate ===
    /// Hold time below which a release does nothing
    pub charge_min_secs: f32,
    /// Hold time at which power saturates
    pub charge_max_secs: f32,
    pub projectile_base_speed: f32,
    /// Extra speed at full power
    pub projectile_speed_per_power: f32,
    /// Radius at full power (radius is proportional to power)
    pub projectile_max_radius: f32,
    pub projectile_min_radius: f32,

    // === Scoring ===
    pub pixels_per_point: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,

            player_x: PLAYER_LANE_X,
            player_radius: PLAYER_RADIUS,
            jump_velocity: JUMP_VELOCITY,

            speed_normal: SPEED_NORMAL,
            speed_boost: SPEED_BOOST,
            speed_ramp_per_sec: 0.02,
            speed_normal_max: 7.0,
            speed_boost_max: 12.0,

            gravity_normal: GRAVITY_NORMAL,
            gravity_reduced: GRAVITY_REDUCED,
            gravity_decay: 0.01,

            obstacle_width: OBSTACLE_WIDTH,
            obstacle_height: Range::new(40.0, 100.0),
            obstacle_spawn_ahead: Range::new(300.0, 600.0),
            obstacle_spawn_delay: Range::new(2.5, 4.5),
            obstacle_cull_x: OBSTACLE_CULL_X,

            falling_radius: FALLING_RADIUS,
            falling_velocity: (-10.0, 3.0),
            falling_spawn_delay: Range::new(1.5, 3.5),
            falling_max_per_spawn: 3,
            falling_spawn_spread: 600.0,

            charge_min_secs: 0.2,
            charge_max_secs: 2.0,
            projectile_base_speed: 10.0,
            projectile_speed_per_power: 15.0,
            projectile_max_radius: 40.0,
            projectile_min_radius: 6.0,

            pixels_per_point: PIXELS_PER_POINT,
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Reject values the engine cannot simulate sanely
    pub fn validate(&self) -> Result<(), TuningError> {
        let positive = [
            ("canvas_width", self.canvas_width),
            ("canvas_height", self.canvas_height),
            ("player_radius", self.player_radius),
            ("obstacle_width", self.obstacle_width),
            ("falling_radius", self.falling_radius),
            ("pixels_per_point", self.pixels_per_point),
            ("charge_max_secs", self.charge_max_secs),
            ("projectile_max_radius", self.projectile_max_radius),
            // Obstacles only leave through the left edge
            ("speed_normal", self.speed_normal),
            ("speed_boost", self.speed_boost),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TuningError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }

        let non_negative = [
            ("jump_velocity", self.jump_velocity),
            ("speed_ramp_per_sec", self.speed_ramp_per_sec),
            ("gravity_normal", self.gravity_normal),
            ("gravity_reduced", self.gravity_reduced),
            ("gravity_decay", self.gravity_decay),
            ("charge_min_secs", self.charge_min_secs),
            ("projectile_base_speed", self.projectile_base_speed),
            ("projectile_min_radius", self.projectile_min_radius),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::Invalid {
                    field,
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }

        if self.speed_normal_max < self.speed_normal {
            return Err(TuningError::Invalid {
                field: "speed_normal_max",
                reason: "cap is below the starting speed".into(),
            });
        }
        if self.speed_boost_max < self.speed_boost {
            return Err(TuningError::Invalid {
                field: "speed_boost_max",
                reason: "cap is below the starting speed".into(),
            });
        }
        if self.gravity_reduced > self.gravity_normal {
            return Err(TuningError::Invalid {
                field: "gravity_reduced",
                reason: "floor is above normal gravity".into(),
            });
        }

        self.obstacle_height.check("obstacle_height")?;
        self.obstacle_spawn_ahead.check("obstacle_spawn_ahead")?;
        self.obstacle_spawn_delay.check("obstacle_spawn_delay")?;
        self.falling_spawn_delay.check("falling_spawn_delay")?;
        if self.obstacle_height.min <= 0.0 {
            return Err(TuningError::Invalid {
                field: "obstacle_height",
                reason: "heights must be positive".into(),
            });
        }
        let (vx, vy) = self.falling_velocity;
        if !vx.is_finite() || !vy.is_finite() {
            return Err(TuningError::Invalid {
                field: "falling_velocity",
                reason: "must be finite".into(),
            });
        }
        // Spawned past the right edge, culled past the left or bottom edge
        if vx >= 0.0 || vy <= 0.0 {
            return Err(TuningError::Invalid {
                field: "falling_velocity",
                reason: format!("must move left and down, got ({vx}, {vy})"),
            });
        }
        Ok(())
    }

    /// Ground band of the terrain wave: (min_y, max_y)
    pub fn wave_band(&self) -> (f32, f32) {
        (self.canvas_height * 0.45, self.canvas_height * 0.65)
    }
}
