//! The global event queue — a thread-safe FIFO with a poison message.
//!
//! One queue per simulation instance. `Shutdown` is the sentinel used to
//! unblock and stop the consumer loop from outside (online mode, tests).

use crate::domain::Event;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// What travels on the queue: a domain event, or the shutdown poison.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    Event(Event),
    Shutdown,
}

/// FIFO queue of engine messages.
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<EngineMessage>,
    rx: Receiver<EngineMessage>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, event: Event) {
        // The queue owns both ends; send cannot fail while self is alive.
        let _ = self.tx.send(EngineMessage::Event(event));
    }

    /// Non-blocking pop of the queue head.
    pub fn try_pop(&self) -> Option<EngineMessage> {
        self.rx.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// A cloneable producer handle, usable from other threads to inject
    /// events or request shutdown.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            tx: self.tx.clone(),
        }
    }
}

/// Producer-side handle to an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: Sender<EngineMessage>,
}

impl QueueHandle {
    pub fn push(&self, event: Event) {
        let _ = self.tx.send(EngineMessage::Event(event));
    }

    /// Enqueue the shutdown poison.
    pub fn shutdown(&self) {
        let _ = self.tx.send(EngineMessage::Shutdown);
    }
}
