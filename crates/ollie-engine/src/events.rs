//! Domain events and the subscription table.
//!
//! [`EventBus`] stores subscriptions and the pending-event queue. Delivery is
//! driven by [`Game::emit`](crate::game::Game::emit), which needs mutable
//! access to the whole game; the bus itself only hands handlers out and takes
//! them back.
//!
//! Subscriptions registered for an object are recorded on that object's
//! resource stack and removed when the object is disposed.

use std::collections::VecDeque;
use std::fmt;

use crate::game::Game;
use crate::object::{GameObject, ObjectId};

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// An event published on the game's bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameEvent {
    /// Fired by `start()` and every `restart()`. Level content re-initializes
    /// in response (for example, spawning the player).
    GameStart,
    LevelStart,
    LevelComplete,
    PlayerDied,
    Custom(String),
}

impl GameEvent {
    /// Wire name used as the subscription key.
    pub fn name(&self) -> &str {
        match self {
            GameEvent::GameStart => "gameStart",
            GameEvent::LevelStart => "levelStart",
            GameEvent::LevelComplete => "levelComplete",
            GameEvent::PlayerDied => "playerDied",
            GameEvent::Custom(name) => name,
        }
    }

    /// Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Self {
        match name {
            "gameStart" => GameEvent::GameStart,
            "levelStart" => GameEvent::LevelStart,
            "levelComplete" => GameEvent::LevelComplete,
            "playerDied" => GameEvent::PlayerDied,
            other => GameEvent::Custom(other.to_owned()),
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Handle for a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventSubscriptionId(u64);

/// Handler bound to an object. Runs with the object checked out of the scene.
pub type ObjectHandler = Box<dyn FnMut(&mut GameObject, &mut Game, &GameEvent)>;

/// Handler with no owning object.
pub type GlobalHandler = Box<dyn FnMut(&mut Game, &GameEvent)>;

pub(crate) enum Handler {
    Object(ObjectHandler),
    Global(GlobalHandler),
}

struct Subscription {
    id: EventSubscriptionId,
    event: String,
    owner: Option<ObjectId>,
    /// `None` while the handler is running.
    handler: Option<Handler>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Subscription table plus FIFO queue of undelivered events.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
    queue: VecDeque<GameEvent>,
    pub(crate) dispatching: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> EventSubscriptionId {
        let id = EventSubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn subscribe_object(
        &mut self,
        event: &str,
        owner: ObjectId,
        handler: ObjectHandler,
    ) -> EventSubscriptionId {
        let id = self.next_id();
        self.subscriptions.push(Subscription {
            id,
            event: event.to_owned(),
            owner: Some(owner),
            handler: Some(Handler::Object(handler)),
        });
        id
    }

    pub(crate) fn subscribe_global(&mut self, event: &str, handler: GlobalHandler) -> EventSubscriptionId {
        let id = self.next_id();
        self.subscriptions.push(Subscription {
            id,
            event: event.to_owned(),
            owner: None,
            handler: Some(Handler::Global(handler)),
        });
        id
    }

    /// Remove a subscription. Safe to call from inside the handler itself.
    pub fn unsubscribe(&mut self, id: EventSubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Remove every subscription owned by `owner`. Returns how many.
    pub(crate) fn unsubscribe_owner(&mut self, owner: ObjectId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.owner != Some(owner));
        before - self.subscriptions.len()
    }

    /// Remove subscriptions whose handler was taken and never restored.
    pub(crate) fn remove_orphaned(&mut self) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.handler.is_some());
        before - self.subscriptions.len()
    }

    /// Subscriptions for `event`, in registration order.
    pub(crate) fn matching(&self, event: &str) -> Vec<(EventSubscriptionId, Option<ObjectId>)> {
        self.subscriptions
            .iter()
            .filter(|s| s.event == event)
            .map(|s| (s.id, s.owner))
            .collect()
    }

    pub(crate) fn take_handler(&mut self, id: EventSubscriptionId) -> Option<Handler> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.handler.take())
    }

    /// Put a handler back. Dropped if it was unsubscribed while running.
    pub(crate) fn restore_handler(&mut self, id: EventSubscriptionId, handler: Handler) {
        if let Some(sub) = self.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.handler = Some(handler);
        }
    }

    pub(crate) fn push(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    pub(crate) fn pop(&mut self) -> Option<GameEvent> {
        self.queue.pop_front()
    }

    pub(crate) fn clear(&mut self) {
        self.subscriptions.clear();
        self.queue.clear();
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of subscriptions for one event name.
    pub fn count_for(&self, event: &str) -> usize {
        self.subscriptions.iter().filter(|s| s.event == event).count()
    }

    /// Events queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("pending", &self.queue.len())
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for ev in [
            GameEvent::GameStart,
            GameEvent::LevelStart,
            GameEvent::LevelComplete,
            GameEvent::PlayerDied,
            GameEvent::Custom("gatePassed".into()),
        ] {
            assert_eq!(GameEvent::from_name(ev.name()), ev);
        }
        assert_eq!(GameEvent::PlayerDied.to_string(), "playerDied");
    }

    #[test]
    fn unsubscribe_while_taken_drops_handler() {
        let mut bus = EventBus::new();
        let id = bus.subscribe_global("gameStart", Box::new(|_, _| {}));
        let handler = bus.take_handler(id).unwrap();
        assert!(bus.take_handler(id).is_none());
        assert!(bus.unsubscribe(id));
        bus.restore_handler(id, handler);
        assert!(bus.is_empty());
    }

    #[test]
    fn matching_preserves_order() {
        let mut bus = EventBus::new();
        let a = bus.subscribe_global("levelStart", Box::new(|_, _| {}));
        bus.subscribe_global("gameStart", Box::new(|_, _| {}));
        let c = bus.subscribe_global("levelStart", Box::new(|_, _| {}));
        let ids: Vec<_> = bus.matching("levelStart").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(bus.count_for("gameStart"), 1);
    }
}
