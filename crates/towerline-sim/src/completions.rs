//! Results of asynchronous external work, applied on the simulation thread.
//!
//! Work started outside the tick (terrain tiles loading, a sound finishing)
//! captures a [`CompletionTicket`] and sends its result through a
//! [`CompletionSender`]. The orchestrator drains the queue at the start of
//! each running tick and drops any completion whose generation is stale
//! (the simulation was reset meanwhile) or whose entity is no longer active.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use towerline_core::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTicket {
    pub generation: u64,
    pub entity: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    /// Terrain became available under a stationary entity. Path followers
    /// ignore it and keep their path height.
    TerrainHeight { height: f64 },
    /// A sound started for the entity finished playing.
    SoundFinished { handle: u64 },
}

/// Cloneable sending half, safe to move into other threads.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: Sender<(CompletionTicket, Completion)>,
}

impl CompletionSender {
    /// Returns `false` if the simulation has been dropped.
    pub fn send(&self, ticket: CompletionTicket, completion: Completion) -> bool {
        self.tx.send((ticket, completion)).is_ok()
    }
}

#[derive(Debug)]
pub struct CompletionQueue {
    tx: Sender<(CompletionTicket, Completion)>,
    rx: Receiver<(CompletionTicket, Completion)>,
}

impl Default for CompletionQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl CompletionQueue {
    pub fn sender(&self) -> CompletionSender {
        CompletionSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything received so far, in arrival order.
    pub fn drain(&self) -> Vec<(CompletionTicket, Completion)> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(item) => out.push(item),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_across_threads() {
        let queue = CompletionQueue::default();
        let sender = queue.sender();
        let ticket = CompletionTicket {
            generation: 3,
            entity: EntityId(9),
        };

        std::thread::spawn(move || {
            sender.send(ticket, Completion::SoundFinished { handle: 1 });
            sender.send(ticket, Completion::TerrainHeight { height: 12.5 });
        })
        .join()
        .unwrap();

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].1, Completion::SoundFinished { handle: 1 });
        assert_eq!(drained[1].0.generation, 3);
        assert!(queue.drain().is_empty());
    }
}
