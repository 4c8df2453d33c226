//! Notification bus for collateral systems (effects, banners). The core never depends on a
//! subscriber existing.

use crate::tile::{RowId, TileId};
use log::trace;
use std::collections::VecDeque;

/// Oldest events are dropped beyond this many undrained ones.
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    TileRowReset {
        row: RowId,
    },
    /// The character reacted to a successful match.
    CharacterMessage {
        points: u32,
        power_up: bool,
    },
    /// The other tiles of a row burst while indestructible mode is active.
    TileExplosion {
        collided: TileId,
        tiles: Vec<TileId>,
    },
    SpeedIncreased {
        speed: f32,
    },
    /// Score reached the league's celebration threshold.
    Celebrate {
        score: u32,
    },
    GameOver {
        score: u32,
        duration_seconds: u32,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TileRowReset { .. } => "tileRowReset",
            Self::CharacterMessage { .. } => "characterMessage",
            Self::TileExplosion { .. } => "tileExplosion",
            Self::SpeedIncreased { .. } => "speedIncreased",
            Self::Celebrate { .. } => "celebrate",
            Self::GameOver { .. } => "gameOver",
        }
    }
}

type Subscriber = Box<dyn FnMut(&GameEvent)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    queue: VecDeque<GameEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&GameEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Notifies subscribers right away and queues the event for [`Self::drain`].
    pub fn emit(&mut self, event: GameEvent) {
        trace!("event {}", event.name());
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
        if self.queue.len() == QUEUE_CAPACITY {
            self.queue.pop_front();
        }
        self.queue.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.queue.drain(..)
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
