//! Synchronous observer lists for scene notifications.

use uuid::Uuid;

use crate::errors::StratumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered list of listeners. Delivery happens in registration order on the
/// calling thread.
pub struct Event<A> {
    listeners: Vec<(ListenerId, Box<dyn FnMut(&A)>)>,
    next_id: u64,
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<A> Event<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&A) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if no listener had this id.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn raise(&mut self, args: &A) {
        for (_, listener) in &mut self.listeners {
            listener(args);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<A> std::fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Pre- and post-render notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEvent {
    pub scene: Uuid,
    pub time: f64,
}

/// A frame failed. Carries the originating error.
#[derive(Debug)]
pub struct RenderErrorEvent {
    pub scene: Uuid,
    pub error: StratumError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    MoveStart,
    MoveEnd,
}
