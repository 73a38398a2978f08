//! Fixed timestep simulation engine
//!
//! The engine owns the simulation state and advances it one tick at a time.
//! World motion comes from a single source, the wave scroll offset; every
//! entity is moved relative to it.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{Aabb, circle_box_overlap, circles_overlap};
use super::events::{NullObserver, ShockwaveReceiver, ShockwaveSender, SimObserver, shockwave_queue};
use super::state::{Cullable, FallingObject, Obstacle, Projectile, SimState, cull};
use super::wave::{WaveField, WaveParams};
use crate::audio::SoundEffect;
use crate::frame_scale;
use crate::tuning::Tuning;

/// Commands latched by the input collaborator between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Jump requested (one-shot)
    pub jump: bool,
    /// Boost/charge input currently held (level)
    pub holding: bool,
    /// Charge released after being held this many seconds (one-shot)
    pub release_charge: Option<f32>,
}

/// The simulation engine
pub struct Engine {
    tuning: Tuning,
    seed: u64,
    rng: Pcg32,
    wave: WaveField,
    state: SimState,

    holding: bool,
    /// Projectiles released since the last tick, merged during the next one
    pending_projectiles: Vec<Projectile>,

    // Simulated clock (seconds since session start or last reset)
    elapsed: f32,
    last_obstacle_spawn: f32,
    next_obstacle_delay: f32,
    last_falling_spawn: f32,
    next_falling_delay: f32,

    // Difficulty ramp
    speed_normal: f32,
    speed_boost: f32,
    // Effective values for the current tick
    speed: f32,
    gravity: f32,

    events: ShockwaveSender,
    observer: Box<dyn SimObserver>,
}

impl Engine {
    /// Create an engine with its own shockwave queue and no observer
    pub fn new(tuning: Tuning, seed: u64) -> (Self, ShockwaveReceiver) {
        let (tx, rx) = shockwave_queue();
        (Self::with_parts(tuning, seed, tx, Box::new(NullObserver)), rx)
    }

    /// Create an engine wired to an existing event queue and observer
    pub fn with_parts(
        tuning: Tuning,
        seed: u64,
        events: ShockwaveSender,
        observer: Box<dyn SimObserver>,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        // Terrain is drawn first so it depends on the seed alone
        let wave = WaveField::new(WaveParams::generate(&mut rng, &tuning));
        let next_obstacle_delay = tuning.obstacle_spawn_delay.sample(&mut rng);
        let next_falling_delay = tuning.falling_spawn_delay.sample(&mut rng);

        let mut engine = Self {
            state: SimState::new(&tuning),
            seed,
            rng,
            wave,
            holding: false,
            pending_projectiles: Vec::new(),
            elapsed: 0.0,
            last_obstacle_spawn: 0.0,
            next_obstacle_delay,
            last_falling_spawn: 0.0,
            next_falling_delay,
            speed_normal: tuning.speed_normal,
            speed_boost: tuning.speed_boost,
            speed: tuning.speed_normal,
            gravity: tuning.gravity_normal,
            events,
            observer,
            tuning,
        };
        engine.settle_player();

        log::info!("Engine created with seed {}", seed);
        engine
    }

    /// Replace the observer
    pub fn set_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observer = observer;
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Immutable copy of the current state for presentation
    pub fn snapshot(&self) -> SimState {
        self.state.clone()
    }

    pub fn wave(&self) -> &WaveField {
        &self.wave
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Terrain height at a world X
    pub fn height_at(&self, world_x: f32) -> f32 {
        self.wave.height_at(world_x)
    }

    /// Scroll speed used by the last tick
    pub fn current_speed(&self) -> f32 {
        self.speed
    }

    /// Gravity used by the last tick
    pub fn current_gravity(&self) -> f32 {
        self.gravity
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Fly mode: airborne while holding the boost input
    pub fn is_flying(&self) -> bool {
        self.holding && self.state.player.is_jumping
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.is_paused = paused;
    }

    // === Commands ===

    /// Leave the ground with the jump impulse. Ignored while airborne.
    pub fn jump(&mut self) {
        if self.state.is_game_over || self.state.player.is_jumping {
            return;
        }
        self.state.player.velocity_y = self.tuning.jump_velocity;
        self.state.player.is_jumping = true;
        self.observer.on_sound(SoundEffect::Jump);
        log::trace!("Jump at tick {}", self.state.time_ticks);
    }

    /// Boost/charge input level
    pub fn set_holding(&mut self, active: bool) {
        self.holding = active;
    }

    /// Fire a charged projectile
    ///
    /// Only effective while airborne and after holding at least the minimum
    /// charge time. Power grows linearly with hold time up to the cap; speed
    /// and radius scale with it.
    pub fn release_charge(&mut self, hold_secs: f32) {
        let t = &self.tuning;
        if self.state.is_game_over
            || !self.state.player.is_jumping
            || !hold_secs.is_finite()
            || hold_secs < t.charge_min_secs
        {
            return;
        }

        let power = (hold_secs.min(t.charge_max_secs) / t.charge_max_secs).clamp(0.0, 1.0);
        let speed = t.projectile_base_speed + t.projectile_speed_per_power * power;
        let radius = (t.projectile_max_radius * power).max(t.projectile_min_radius);

        self.pending_projectiles.push(Projectile {
            pos: self.state.player.pos,
            vel: Vec2::new(speed, 0.0),
            radius,
        });
        log::debug!("Charge released: power {:.2}, radius {:.1}", power, radius);
    }

    /// Apply a latched input set (sampled at the start of a tick)
    pub fn apply_input(&mut self, input: &TickInput) {
        self.set_holding(input.holding);
        if input.jump {
            self.jump();
        }
        if let Some(hold) = input.release_charge {
            self.release_charge(hold);
        }
    }

    /// Reinitialise the round: state, timers and difficulty ramp
    ///
    /// The terrain is kept; it belongs to the session.
    pub fn reset(&mut self) {
        self.state.reset(&self.tuning);
        self.pending_projectiles.clear();
        self.holding = false;

        self.elapsed = 0.0;
        self.last_obstacle_spawn = 0.0;
        self.next_obstacle_delay = self.tuning.obstacle_spawn_delay.sample(&mut self.rng);
        self.last_falling_spawn = 0.0;
        self.next_falling_delay = self.tuning.falling_spawn_delay.sample(&mut self.rng);

        self.speed_normal = self.tuning.speed_normal;
        self.speed_boost = self.tuning.speed_boost;
        self.speed = self.speed_normal;
        self.gravity = self.tuning.gravity_normal;

        self.settle_player();
        self.observer.on_reset();
        log::info!("Round reset");
    }

    // === Tick ===

    /// Advance the simulation by `dt` seconds
    ///
    /// No-op once the round is over (until [`Engine::reset`]) or while paused.
    pub fn update(&mut self, dt: f32) {
        if self.state.is_game_over || self.state.is_paused {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let s = frame_scale(dt);

        self.state.time_ticks += 1;
        self.state.is_reset = false;
        self.elapsed += dt;

        self.ramp_difficulty(dt);
        self.apply_fly_mode(s);

        self.state.wave_offset += self.speed * s;
        self.state.score = (self.state.wave_offset / self.tuning.pixels_per_point).floor() as u64;

        self.update_player(s);
        self.update_obstacles(s);
        self.update_falling_objects(s);
        if self.state.is_game_over {
            return;
        }

        self.maybe_spawn_obstacle();
        self.maybe_spawn_falling_objects();

        self.check_obstacle_collisions();
        if self.state.is_game_over {
            return;
        }

        self.update_projectiles(s);
    }

    fn ramp_difficulty(&mut self, dt: f32) {
        let ramp = self.tuning.speed_ramp_per_sec * dt;
        self.speed_normal = (self.speed_normal + ramp).min(self.tuning.speed_normal_max);
        self.speed_boost = (self.speed_boost + ramp).min(self.tuning.speed_boost_max);
    }

    /// Boosted speed and decaying gravity while flying, normal values otherwise
    fn apply_fly_mode(&mut self, s: f32) {
        if self.is_flying() {
            self.speed = self.speed_boost;
            self.gravity = (self.gravity - self.tuning.gravity_decay * s)
                .max(self.tuning.gravity_reduced);
        } else {
            self.speed = self.speed_normal;
            self.gravity = self.tuning.gravity_normal;
        }
    }

    /// Pin a grounded player to the surface
    fn settle_player(&mut self) {
        let ground = self.wave.height_at(self.state.player.pos.x + self.state.wave_offset);
        self.state.player.pos.y = ground - self.tuning.player_radius;
    }

    fn update_player(&mut self, s: f32) {
        let radius = self.tuning.player_radius;
        let ground = self.wave.height_at(self.state.player.pos.x + self.state.wave_offset);
        let player = &mut self.state.player;

        if player.is_jumping {
            player.pos.y -= player.velocity_y * s;
            player.velocity_y -= self.gravity * s;
            if player.pos.y + radius > ground {
                // Land exactly on the surface
                player.pos.y = ground - radius;
                player.velocity_y = 0.0;
                player.is_jumping = false;
            }
        } else {
            player.pos.y = ground - radius;
        }
    }

    /// Scroll obstacles left and keep them resting on the wave
    fn update_obstacles(&mut self, s: f32) {
        let dx = self.speed * s;
        let offset = self.state.wave_offset;
        for obs in &mut self.state.obstacles {
            obs.pos.x -= dx;
            obs.pos.y = self.wave.height_at(obs.pos.x + offset) - obs.height;
        }
        let culled = cull(&mut self.state.obstacles, &self.tuning);
        if culled > 0 {
            log::trace!("Culled {} obstacles", culled);
        }
    }

    /// Move falling objects and resolve each against the player, then the ground
    fn update_falling_objects(&mut self, s: f32) {
        let player_pos = self.state.player.pos;
        let player_radius = self.tuning.player_radius;
        let flying = self.is_flying();
        let offset = self.state.wave_offset;
        let wave = &self.wave;
        let events = &self.events;
        let tuning = &self.tuning;
        let mut crashed = false;

        self.state.falling_objects.retain_mut(|obj| {
            obj.pos += obj.vel * s;

            if circles_overlap(player_pos, player_radius, obj.pos, obj.radius) {
                if flying {
                    log::debug!("Punched through falling object at {}", obj.pos);
                    events.push(obj.pos);
                    return false;
                }
                crashed = true;
                return false;
            }

            let ground = wave.height_at(obj.pos.x + offset);
            if obj.pos.y + obj.radius >= ground {
                events.push(Vec2::new(obj.pos.x, ground));
                return false;
            }

            !obj.is_off_screen(tuning)
        });

        if crashed {
            self.end_round();
        }
    }

    fn maybe_spawn_obstacle(&mut self) {
        if self.elapsed - self.last_obstacle_spawn <= self.next_obstacle_delay {
            return;
        }
        let t = &self.tuning;
        let offset = self.state.wave_offset;
        let ahead = t.obstacle_spawn_ahead.sample(&mut self.rng).floor();
        let spawn_world_x = offset + t.canvas_width + ahead;
        let height = t.obstacle_height.sample(&mut self.rng).max(1.0);
        let ground = self.wave.height_at(spawn_world_x);

        self.state.obstacles.push(Obstacle {
            pos: Vec2::new(spawn_world_x - offset, ground - height),
            width: t.obstacle_width,
            height,
        });
        self.last_obstacle_spawn = self.elapsed;
        self.next_obstacle_delay = t.obstacle_spawn_delay.sample(&mut self.rng);
        log::debug!("Spawned obstacle at world x {:.0}, height {:.0}", spawn_world_x, height);
    }

    fn maybe_spawn_falling_objects(&mut self) {
        if self.elapsed - self.last_falling_spawn <= self.next_falling_delay {
            return;
        }
        let t = &self.tuning;
        let count = self.rng.random_range(0..=t.falling_max_per_spawn);
        let (vx, vy) = t.falling_velocity;
        for _ in 0..count {
            let x = t.canvas_width + self.rng.random::<f32>() * t.falling_spawn_spread.max(0.0);
            let y = -t.falling_radius - self.rng.random::<f32>() * t.falling_radius * 3.0;
            self.state.falling_objects.push(FallingObject {
                pos: Vec2::new(x, y),
                vel: Vec2::new(vx, vy),
                radius: t.falling_radius,
            });
        }
        self.last_falling_spawn = self.elapsed;
        self.next_falling_delay = t.falling_spawn_delay.sample(&mut self.rng);
        if count > 0 {
            log::debug!("Spawned {} falling objects", count);
        }
    }

    /// Player (as its square bounding box) against every obstacle
    fn check_obstacle_collisions(&mut self) {
        let player_box = Aabb::around_circle(self.state.player.pos, self.tuning.player_radius);
        let hit = self
            .state
            .obstacles
            .iter()
            .any(|obs| player_box.overlaps(&Aabb::from_top_left(obs.pos, obs.width, obs.height)));
        if hit {
            self.end_round();
        }
    }

    /// Merge released shots, move them, and let each destroy at most one target
    fn update_projectiles(&mut self, s: f32) {
        let SimState {
            projectiles,
            obstacles,
            falling_objects,
            ..
        } = &mut self.state;
        projectiles.append(&mut self.pending_projectiles);

        let events = &self.events;
        let tuning = &self.tuning;
        projectiles.retain_mut(|p| {
            p.pos += p.vel * s;

            if let Some(idx) = obstacles.iter().position(|obs| {
                circle_box_overlap(p.pos, p.radius, &Aabb::from_top_left(obs.pos, obs.width, obs.height))
            }) {
                obstacles.remove(idx);
                events.push(p.pos);
                log::debug!("Projectile destroyed obstacle at {}", p.pos);
                return false;
            }

            if let Some(idx) = falling_objects
                .iter()
                .position(|obj| circles_overlap(p.pos, p.radius, obj.pos, obj.radius))
            {
                falling_objects.remove(idx);
                events.push(p.pos);
                log::debug!("Projectile destroyed falling object at {}", p.pos);
                return false;
            }

            !p.is_off_screen(tuning)
        });
    }

    /// Terminal transition; fires the crash trigger and game-over callback once
    fn end_round(&mut self) {
        if self.state.is_game_over {
            return;
        }
        self.state.is_game_over = true;
        self.observer.on_sound(SoundEffect::Crash);
        self.observer.on_game_over(self.state.score);
        log::info!("Game over: score {}", self.state.score);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("seed", &self.seed)
            .field("elapsed", &self.elapsed)
            .field("speed", &self.speed)
            .field("gravity", &self.gravity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
