//! Sand Wave headless runner
//!
//! Plays sessions on the simulation thread with a small autopilot standing in
//! for the player. The main thread acts as the presentation side: it reads a
//! snapshot and drains the shockwave queue once per frame, and records the
//! best score when a round ends.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{self, Receiver, Sender};

use sandwave::audio::SoundEffect;
use sandwave::sim::{Engine, ShockwaveReceiver, SimObserver, SimState, shockwave_queue};
use sandwave::{JsonFileScoreStore, LoopConfig, Scheduler, ScoreStore, SimHandle, Tuning};

/// Presentation refresh (~60 Hz)
const FRAME: Duration = Duration::from_millis(16);

/// Longest wait for a requested reset to be published
const RESET_WAIT: Duration = Duration::from_secs(1);

/// How far ahead of the player (px) the autopilot reacts to hazards
const LOOKAHEAD: f32 = 140.0;

#[derive(Parser, Debug)]
#[command(name = "sandwave")]
#[command(version, about = "Headless Sand Wave session", long_about = None)]
struct Cli {
    /// RNG seed (defaults to the current time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Give up on a round after this many seconds
    #[arg(long, default_value_t = 60)]
    seconds: u64,

    /// Rounds to play; the round resets in between
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,

    /// Tuning JSON file
    #[arg(short, long)]
    tuning: Option<PathBuf>,

    /// High score file
    #[arg(long, default_value = "sandwave-highscore.json")]
    highscore: PathBuf,

    /// Never touch the controls
    #[arg(long)]
    idle: bool,
}

/// Observer callbacks forwarded off the simulation thread
#[derive(Debug)]
enum Notice {
    Sound(SoundEffect),
    GameOver(u64),
}

struct Forwarder {
    tx: Sender<Notice>,
}

impl SimObserver for Forwarder {
    fn on_sound(&mut self, effect: SoundEffect) {
        let _ = self.tx.send(Notice::Sound(effect));
    }

    fn on_game_over(&mut self, score: u64) {
        let _ = self.tx.send(Notice::GameOver(score));
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    let seed = cli.seed.unwrap_or_else(time_seed);
    log::info!("Sand Wave (headless) starting, seed {}", seed);

    let store = JsonFileScoreStore::new(&cli.highscore);
    log::info!("Best so far: {}", store.load_best());

    let (notice_tx, notices) = channel::unbounded();
    let (events_tx, events) = shockwave_queue();
    let engine = Engine::with_parts(tuning, seed, events_tx, Box::new(Forwarder { tx: notice_tx }));

    let scheduler =
        Scheduler::start(engine, LoopConfig::default()).context("starting simulation thread")?;
    let handle = scheduler.handle();

    for round in 1..=cli.rounds {
        if round > 1 && !begin_next_round(&handle, &notices) {
            log::warn!("Reset was not observed within {:?}", RESET_WAIT);
        }
        let score = play_round(&handle, &events, &notices, &cli)?;
        println!("Round {}: score {}", round, score);
        if store.store_if_greater(score)? {
            println!("New best!");
        }
    }

    let engine = scheduler.stop().context("stopping simulation thread")?;
    log::info!("Session ended after {} ticks", engine.state().time_ticks);
    Ok(())
}

/// Run presentation frames until the round ends or times out. Returns the score.
fn play_round(
    handle: &SimHandle,
    events: &ShockwaveReceiver,
    notices: &Receiver<Notice>,
    cli: &Cli,
) -> Result<u64> {
    let deadline = Instant::now() + Duration::from_secs(cli.seconds);
    let mut shockwaves = 0usize;

    loop {
        thread::sleep(FRAME);
        let snapshot = handle.snapshot();
        if snapshot.is_reset {
            // Effects from the previous round are stale
            events.drain();
        }

        while let Some(wave) = events.poll_next() {
            shockwaves += 1;
            log::debug!("Shockwave at {}", wave.pos);
        }

        for notice in notices.try_iter() {
            match notice {
                Notice::Sound(effect) => log::debug!("Sound: {}", effect.as_str()),
                Notice::GameOver(score) => {
                    log::info!("Round over with {} shockwaves", shockwaves);
                    return Ok(score);
                }
            }
        }

        if Instant::now() >= deadline {
            log::warn!("Round timed out after {}s", cli.seconds);
            return Ok(snapshot.score);
        }

        if !cli.idle {
            autopilot(handle, &snapshot);
        }
    }
}

/// Request a reset, wait until it is published, then discard notices from
/// the previous round. Returns `false` if the reset was not seen in time.
fn begin_next_round(handle: &SimHandle, notices: &Receiver<Notice>) -> bool {
    let before = handle.snapshot().time_ticks;
    handle.request_reset();

    let deadline = Instant::now() + RESET_WAIT;
    let mut reset_seen = false;
    while Instant::now() < deadline {
        let snapshot = handle.snapshot();
        // The reset tick publishes a fresh round before any further update
        if snapshot.is_reset || snapshot.time_ticks < before {
            reset_seen = true;
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    // Anything queued before the reset tick belongs to the old round
    let stale = notices.try_iter().count();
    if stale > 0 {
        log::debug!("Dropped {} notices from the previous round", stale);
    }
    reset_seen
}

/// Jump over the next obstacle; glide through falling objects in fly mode
fn autopilot(handle: &SimHandle, state: &SimState) {
    let player = &state.player;
    let front = player.pos.x;

    let obstacle_ahead = state.obstacles.iter().any(|obs| {
        let gap = obs.pos.x - front;
        gap > 0.0 && gap < LOOKAHEAD
    });
    if obstacle_ahead && !player.is_jumping {
        handle.jump();
    }

    let falling_near = state
        .falling_objects
        .iter()
        .any(|obj| obj.pos.distance(player.pos) < LOOKAHEAD * 2.0);
    if falling_near && !player.is_jumping {
        handle.jump();
    }
    handle.set_holding(falling_near && player.is_jumping);
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwave::scheduler::manual_ticks;

    #[test]
    fn test_next_round_discards_game_over_from_timed_out_round() {
        let (tx, notices) = channel::unbounded();
        let (engine, _events) = Engine::new(Tuning::default(), 5);
        let (ticks, driver) = manual_ticks();
        let scheduler = Scheduler::start_with(engine, ticks, LoopConfig::default()).unwrap();
        let handle = scheduler.handle();
        for _ in 0..5 {
            driver.step();
        }

        // Lands after the round timed out but before the reset
        tx.send(Notice::GameOver(99)).unwrap();

        let stepper = thread::spawn(move || {
            for _ in 0..500 {
                if !driver.step() {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
        });

        assert!(begin_next_round(&handle, &notices));
        assert!(notices.try_recv().is_err());
        assert!(!handle.snapshot().is_game_over);

        scheduler.stop().unwrap();
        stepper.join().unwrap();
    }
}
