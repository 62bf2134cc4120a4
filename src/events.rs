//! Event bus: observers are notified synchronously on the publishing thread.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Move,
    Attack,
    Death,
    Hunger,
    LevelUp,
    Reproduction,
    ResourceConsumption,
    ResourceRespawn,
    UserAction,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Move => "MOVE",
            EventKind::Attack => "ATTACK",
            EventKind::Death => "DEATH",
            EventKind::Hunger => "HUNGER",
            EventKind::LevelUp => "LEVEL_UP",
            EventKind::Reproduction => "REPRODUCTION",
            EventKind::ResourceConsumption => "RESOURCE_CONSUMPTION",
            EventKind::ResourceRespawn => "RESOURCE_RESPAWN",
            EventKind::UserAction => "USER_ACTION",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub message: String,
    /// Structured data slot. The tick pipeline leaves it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl GameEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

pub trait Observer: Send {
    fn on_event(&mut self, event: &GameEvent);
}

/// Buffers event messages until the end of the tick.
#[derive(Debug, Default)]
pub struct RecapObserver {
    buffer: String,
}

impl RecapObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything buffered so far and empties the buffer.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Observer for RecapObserver {
    fn on_event(&mut self, event: &GameEvent) {
        self.buffer.push_str(&event.message);
        self.buffer.push('\n');
    }
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_event(&mut self, event: &GameEvent) {
        tracing::info!(kind = %event.kind, "{}", event.message);
    }
}

/// Fan-out point for game events. A recap buffer is always attached so each
/// tick can be summarised even with no external subscriber.
#[derive(Default)]
pub struct EventBus {
    recap: RecapObserver,
    observers: Vec<Box<dyn Observer>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn publish(&mut self, event: GameEvent) {
        self.recap.on_event(&event);
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn flush_recap(&mut self) -> String {
        self.recap.flush()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("recap", &self.recap)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Human-readable summary of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recap {
    pub tick: u64,
    pub body: String,
}

impl Recap {
    pub fn is_quiet(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }
}

impl fmt::Display for Recap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Tick {} Summary ===", self.tick)?;
        if self.is_quiet() {
            writeln!(f, "Nothing significant happened this turn.")?;
        } else {
            f.write_str(&self.body)?;
        }
        write!(f, "===============================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Collector(Arc<Mutex<Vec<EventKind>>>);

    impl Observer for Collector {
        fn on_event(&mut self, event: &GameEvent) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[test]
    fn recap_flush_returns_and_clears_buffer() {
        let mut bus = EventBus::new();
        bus.publish(GameEvent::new(EventKind::Death, "Animal 3 died."));
        bus.publish(GameEvent::new(EventKind::Hunger, "Animal 4 lost 5 HP due to hunger."));

        assert_eq!(
            bus.flush_recap(),
            "Animal 3 died.\nAnimal 4 lost 5 HP due to hunger.\n"
        );
        assert_eq!(bus.flush_recap(), "");
    }

    #[test]
    fn subscribers_see_every_event_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(Collector(seen.clone()));
        bus.subscribe(LoggingObserver);

        bus.publish_all([
            GameEvent::new(EventKind::Move, "a"),
            GameEvent::new(EventKind::Attack, "b"),
        ]);

        assert_eq!(*seen.lock().unwrap(), vec![EventKind::Move, EventKind::Attack]);
    }

    #[test]
    fn quiet_recap_prints_placeholder() {
        let recap = Recap {
            tick: 4,
            body: String::new(),
        };
        let text = recap.to_string();
        assert!(text.starts_with("=== Tick 4 Summary ==="));
        assert!(text.contains("Nothing significant happened this turn."));
    }

    #[test]
    fn payload_is_optional() {
        let event = GameEvent::new(EventKind::UserAction, "saved")
            .with_payload(serde_json::json!({ "path": "game.json" }));
        assert_eq!(event.payload.unwrap()["path"], "game.json");
    }
}
