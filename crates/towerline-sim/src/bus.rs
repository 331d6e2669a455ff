//! Per-tick event queue with any number of listeners.
//!
//! Managers push events while a tick runs. The orchestrator drains the
//! queue once at the end of the tick and hands each event, in order, to
//! every listener.

use towerline_core::events::SimEvent;

pub type Listener = Box<dyn FnMut(&SimEvent) + Send>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventBus {
    queue: Vec<SimEvent>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.queue.push(event);
    }

    /// Log at debug level and forward the message to listeners.
    pub fn debug_log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{message}");
        self.queue.push(SimEvent::debug(message));
    }

    /// Events queued so far this tick.
    pub fn pending(&self) -> &[SimEvent] {
        &self.queue
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drain the queue, dispatch to every listener and return the drained events.
    pub fn dispatch(&mut self) -> Vec<SimEvent> {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
        events
    }

    /// Drop queued events without dispatching them.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
