//! Events leaving the simulation
//!
//! Two channels:
//! - shockwaves: visual impact positions, queued for presentation to drain
//!   once per frame (multi-producer, single-consumer, FIFO, never blocks)
//! - observer callbacks: audio triggers and the game-over score, fired
//!   synchronously from inside the tick

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use glam::Vec2;

use crate::audio::SoundEffect;

/// Impact position (screen space) of a destructive collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shockwave {
    pub pos: Vec2,
}

/// Create a connected shockwave queue
pub fn shockwave_queue() -> (ShockwaveSender, ShockwaveReceiver) {
    let (tx, rx) = channel::unbounded();
    (ShockwaveSender { tx }, ShockwaveReceiver { rx })
}

/// Producer side, cloneable
#[derive(Debug, Clone)]
pub struct ShockwaveSender {
    tx: Sender<Shockwave>,
}

impl ShockwaveSender {
    /// Queue an event. A dropped consumer is not an error: the event is discarded.
    pub fn push(&self, pos: Vec2) {
        if self.tx.send(Shockwave { pos }).is_err() {
            log::trace!("Shockwave at {pos} dropped: no consumer");
        }
    }
}

/// Consumer side
#[derive(Debug)]
pub struct ShockwaveReceiver {
    rx: Receiver<Shockwave>,
}

impl ShockwaveReceiver {
    /// Next pending event, or `None` if the queue is empty
    pub fn poll_next(&self) -> Option<Shockwave> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Take everything queued right now
    pub fn drain(&self) -> Vec<Shockwave> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Collaborator notified by the engine
///
/// Called on the simulation thread; implementations must not block.
pub trait SimObserver: Send {
    /// An audio trigger point was reached
    fn on_sound(&mut self, _effect: SoundEffect) {}

    /// The round ended with this final score
    fn on_game_over(&mut self, _score: u64) {}

    /// The state was reinitialised
    fn on_reset(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SimObserver for NullObserver {}
