//! Simulation thread
//!
//! The [`Scheduler`] owns the [`Engine`] on a dedicated thread and calls
//! `update` once per tick. Everything else talks to it through a
//! [`SimHandle`]:
//! - commands are latched and sampled at the start of the next tick
//! - presentation reads the latest published [`SimState`] snapshot
//!
//! Cadence comes from a [`TickSource`]. [`FixedCadence`] sleeps a fixed
//! interval between ticks (not an accumulator, so a loaded host runs the
//! game slower). [`ManualTicks`] lets a test step the loop one tick at a
//! time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::consts::{SIM_DT, TICK_INTERVAL_MS};
use crate::sim::{Engine, SimState, TickInput, WaveField};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("simulation thread panicked")]
    Panicked,
}

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Sleep between ticks (used by [`Scheduler::start`])
    pub tick_interval: Duration,
    /// Timestep passed to every `update`
    pub dt: f32,
    pub thread_name: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            dt: SIM_DT,
            thread_name: "sandwave-sim".to_string(),
        }
    }
}

/// Decides when the next tick runs
pub trait TickSource: Send + 'static {
    /// Block until the next tick is due. Returns `false` once `stop` fires.
    ///
    /// A stop signal is a message on `stop` or its disconnection.
    fn wait(&mut self, stop: &Receiver<()>) -> bool;

    /// Called after a tick has been applied and published
    fn tick_done(&mut self) {}
}

/// Sleep a fixed interval between ticks; the sleep is cut short by a stop
#[derive(Debug, Clone, Copy)]
pub struct FixedCadence {
    interval: Duration,
}

impl FixedCadence {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl TickSource for FixedCadence {
    fn wait(&mut self, stop: &Receiver<()>) -> bool {
        match stop.recv_timeout(self.interval) {
            Err(RecvTimeoutError::Timeout) => true,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Ticks on demand from a [`ManualTickDriver`]
#[derive(Debug)]
pub struct ManualTicks {
    ticks: Receiver<()>,
    acks: Sender<()>,
}

/// Test-side half of [`ManualTicks`]
#[derive(Debug)]
pub struct ManualTickDriver {
    ticks: Sender<()>,
    acks: Receiver<()>,
}

/// Create a connected manual tick source and its driver
pub fn manual_ticks() -> (ManualTicks, ManualTickDriver) {
    let (tick_tx, tick_rx) = channel::unbounded();
    let (ack_tx, ack_rx) = channel::unbounded();
    (
        ManualTicks {
            ticks: tick_rx,
            acks: ack_tx,
        },
        ManualTickDriver {
            ticks: tick_tx,
            acks: ack_rx,
        },
    )
}

impl ManualTickDriver {
    /// Run one tick and wait until its snapshot is published.
    /// Returns `false` if the loop has already stopped.
    pub fn step(&self) -> bool {
        self.ticks.send(()).is_ok() && self.acks.recv().is_ok()
    }
}

impl TickSource for ManualTicks {
    fn wait(&mut self, stop: &Receiver<()>) -> bool {
        crossbeam::select! {
            recv(stop) -> _ => false,
            recv(self.ticks) -> msg => msg.is_ok(),
        }
    }

    fn tick_done(&mut self) {
        let _ = self.acks.send(());
    }
}

/// State shared between the simulation thread and its handles
struct Shared {
    input: Mutex<TickInput>,
    snapshot: RwLock<Arc<SimState>>,
    wave: WaveField,
    paused: AtomicBool,
    reset_requested: AtomicBool,
}

impl Shared {
    /// Take the latched input. The held level persists; one-shots are consumed.
    fn take_input(&self) -> TickInput {
        let mut input = self.input.lock();
        let holding = input.holding;
        std::mem::replace(
            &mut *input,
            TickInput {
                holding,
                ..TickInput::default()
            },
        )
    }

    fn publish(&self, state: SimState) {
        *self.snapshot.write() = Arc::new(state);
    }
}

/// Thread-safe command and snapshot access to a running simulation
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Shared>,
}

impl SimHandle {
    pub fn jump(&self) {
        self.shared.input.lock().jump = true;
    }

    pub fn set_holding(&self, active: bool) {
        self.shared.input.lock().holding = active;
    }

    /// Latest release wins if several arrive within one tick
    pub fn release_charge(&self, hold_secs: f32) {
        self.shared.input.lock().release_charge = Some(hold_secs);
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Reinitialise the round at the next tick boundary
    pub fn request_reset(&self) {
        self.shared.reset_requested.store(true, Ordering::Release);
    }

    /// Most recently published state
    pub fn snapshot(&self) -> Arc<SimState> {
        self.shared.snapshot.read().clone()
    }

    /// Copy of the session's terrain
    pub fn wave(&self) -> WaveField {
        self.shared.wave
    }

    pub fn height_at(&self, world_x: f32) -> f32 {
        self.shared.wave.height_at(world_x)
    }
}

impl std::fmt::Debug for SimHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHandle")
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}

/// Owner of the simulation thread
pub struct Scheduler {
    handle: SimHandle,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<Engine>>,
}

impl Scheduler {
    /// Start ticking at `config.tick_interval`
    pub fn start(engine: Engine, config: LoopConfig) -> Result<Self, SchedulerError> {
        let ticks = FixedCadence::new(config.tick_interval);
        Self::start_with(engine, ticks, config)
    }

    /// Start ticking on an arbitrary tick source
    pub fn start_with<T: TickSource>(
        engine: Engine,
        ticks: T,
        config: LoopConfig,
    ) -> Result<Self, SchedulerError> {
        let shared = Arc::new(Shared {
            input: Mutex::new(TickInput::default()),
            snapshot: RwLock::new(Arc::new(engine.snapshot())),
            wave: *engine.wave(),
            paused: AtomicBool::new(engine.state().is_paused),
            reset_requested: AtomicBool::new(false),
        });
        let (stop_tx, stop_rx) = channel::bounded(1);

        let thread_shared = Arc::clone(&shared);
        let dt = config.dt;
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(engine, ticks, stop_rx, thread_shared, dt))
            .map_err(SchedulerError::Spawn)?;

        log::info!(
            "Scheduler started on thread '{}' (interval {:?}, dt {})",
            config.thread_name,
            config.tick_interval,
            config.dt
        );
        Ok(Self {
            handle: SimHandle { shared },
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    pub fn request_reset(&self) {
        self.handle.request_reset();
    }

    /// Whether the simulation thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop at the next tick boundary and hand back the engine
    ///
    /// Once this returns no further tick runs.
    pub fn stop(mut self) -> Result<Engine, SchedulerError> {
        self.shutdown().ok_or(SchedulerError::Panicked)
    }

    /// Signal stop and join. `None` if the thread panicked or was already joined.
    fn shutdown(&mut self) -> Option<Engine> {
        // Dropping the sender wakes any wait, sleeping or not
        self.stop_tx.take();
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(engine) => {
                log::info!("Scheduler stopped");
                Some(engine)
            }
            Err(_) => {
                log::warn!("Simulation thread panicked");
                None
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .field("handle", &self.handle)
            .finish()
    }
}

/// The tick loop
///
/// Per tick: sample input, apply a pending reset (a reset tick does not also
/// simulate), then update unless paused, then publish.
fn run<T: TickSource>(
    mut engine: Engine,
    mut ticks: T,
    stop: Receiver<()>,
    shared: Arc<Shared>,
    dt: f32,
) -> Engine {
    log::debug!("Simulation loop running");
    while ticks.wait(&stop) {
        let input = shared.take_input();
        let paused = shared.paused.load(Ordering::Acquire);
        engine.set_paused(paused);

        if shared.reset_requested.swap(false, Ordering::AcqRel) {
            engine.reset();
            engine.set_holding(input.holding);
        } else if paused {
            // One-shot commands issued while paused are dropped
            engine.set_holding(input.holding);
        } else {
            engine.apply_input(&input);
            engine.update(dt);
        }

        shared.publish(engine.snapshot());
        ticks.tick_done();
    }
    log::debug!("Simulation loop exited after tick {}", engine.state().time_ticks);
    engine
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::tuning::Tuning;

    fn start_manual() -> (Scheduler, ManualTickDriver) {
        let (engine, _events) = Engine::new(Tuning::default(), 7);
        let (ticks, driver) = manual_ticks();
        let scheduler = Scheduler::start_with(engine, ticks, LoopConfig::default()).unwrap();
        (scheduler, driver)
    }

    #[test]
    fn test_initial_snapshot_published() {
        let (scheduler, _driver) = start_manual();
        let snapshot = scheduler.handle().snapshot();
        assert_eq!(snapshot.time_ticks, 0);
        assert!(!snapshot.is_game_over);
    }

    #[test]
    fn test_each_step_runs_one_tick() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        let mut last_offset = 0.0;
        for i in 1..=5 {
            assert!(driver.step());
            let snapshot = handle.snapshot();
            assert_eq!(snapshot.time_ticks, i);
            assert!(snapshot.wave_offset > last_offset);
            last_offset = snapshot.wave_offset;
        }
        let engine = scheduler.stop().unwrap();
        assert_eq!(engine.state().time_ticks, 5);
    }

    #[test]
    fn test_paused_loop_keeps_running_without_updating() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        driver.step();

        scheduler.pause();
        assert!(handle.is_paused());
        for _ in 0..3 {
            assert!(driver.step());
        }
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.time_ticks, 1);
        assert!(snapshot.is_paused);

        scheduler.resume();
        driver.step();
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.time_ticks, 2);
        assert!(!snapshot.is_paused);
    }

    #[test]
    fn test_jump_command_applied_on_next_tick() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        handle.jump();
        assert!(!handle.snapshot().player.is_jumping);
        driver.step();
        assert!(handle.snapshot().player.is_jumping);
    }

    #[test]
    fn test_commands_while_paused_are_dropped() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        scheduler.pause();
        handle.jump();
        driver.step();
        scheduler.resume();
        driver.step();
        assert!(!handle.snapshot().player.is_jumping);
    }

    #[test]
    fn test_reset_applies_before_next_update() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        for _ in 0..10 {
            driver.step();
        }
        assert_eq!(handle.snapshot().time_ticks, 10);

        scheduler.request_reset();
        driver.step();
        let snapshot = handle.snapshot();
        assert!(snapshot.is_reset);
        assert_eq!(snapshot.time_ticks, 0);
        assert_eq!(snapshot.wave_offset, 0.0);
        assert_eq!(snapshot.score, 0);

        driver.step();
        let snapshot = handle.snapshot();
        assert!(!snapshot.is_reset);
        assert_eq!(snapshot.time_ticks, 1);
    }

    #[test]
    fn test_no_ticks_after_stop() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        driver.step();
        driver.step();
        let engine = scheduler.stop().unwrap();
        assert!(!driver.step());
        assert_eq!(engine.state().time_ticks, 2);
        assert_eq!(handle.snapshot().time_ticks, 2);
    }

    #[test]
    fn test_stop_interrupts_long_sleep() {
        let (engine, _events) = Engine::new(Tuning::default(), 1);
        let config = LoopConfig {
            tick_interval: Duration::from_secs(60),
            ..LoopConfig::default()
        };
        let scheduler = Scheduler::start(engine, config).unwrap();
        assert!(scheduler.is_running());

        let started = Instant::now();
        let engine = scheduler.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(engine.state().time_ticks, 0);
    }

    #[test]
    fn test_fixed_cadence_ticks() {
        let (engine, _events) = Engine::new(Tuning::default(), 3);
        let config = LoopConfig {
            tick_interval: Duration::from_millis(1),
            ..LoopConfig::default()
        };
        let scheduler = Scheduler::start(engine, config).unwrap();
        let handle = scheduler.handle();
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.snapshot().time_ticks < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(handle.snapshot().time_ticks >= 3);
        scheduler.stop().unwrap();
    }

    #[test]
    fn test_drop_joins_thread() {
        let (scheduler, driver) = start_manual();
        let handle = scheduler.handle();
        drop(scheduler);
        assert!(!driver.step());
        // Handles outlive the scheduler harmlessly
        handle.jump();
        assert_eq!(handle.snapshot().time_ticks, 0);
    }

    #[test]
    fn test_handle_wave_matches_engine() {
        let (engine, _events) = Engine::new(Tuning::default(), 11);
        let expected = engine.height_at(1234.0);
        let (ticks, _driver) = manual_ticks();
        let scheduler = Scheduler::start_with(engine, ticks, LoopConfig::default()).unwrap();
        assert_eq!(scheduler.handle().height_at(1234.0), expected);
    }
}
