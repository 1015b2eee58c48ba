//! Event system for module notifications
//!
//! Handlers register for an [`EventType`] and are called in registration order
//! when events are dispatched. A handler returning `true` consumes the event
//! and stops it reaching later handlers.

use std::collections::HashMap;

use crate::streams::StreamInfo;

/// Kinds of events the module raises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The stream registry was repopulated
    StreamsChanged,
    /// A schema (authored or fallback) was loaded
    SchemaLoaded,
    /// The controller asked the cluster to quit
    QuitRequested,
}

/// Event payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// No payload
    None,
    /// Current streams as `(channel, name)` pairs
    Streams(Vec<StreamInfo>),
    /// Number of scenes in the loaded schema
    SceneCount(usize),
}

/// Event with payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Payload
    pub arg: EventArg,
}

impl Event {
    /// Create a new event
    pub const fn new(event_type: EventType, arg: EventArg) -> Self {
        Self { event_type, arg }
    }

    /// Streams payload, if this event carries one
    pub fn streams(&self) -> Option<&[StreamInfo]> {
        match &self.arg {
            EventArg::Streams(streams) => Some(streams),
            _ => None,
        }
    }
}

/// Event handler trait
pub trait EventHandler: Send {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool + Send,
{
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Event queue with per-type handler chains
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<Event>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific event type
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Deliver all queued events, oldest first
    pub fn dispatch(&mut self) {
        for event in std::mem::take(&mut self.queue) {
            if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
                for handler in handlers.iter_mut() {
                    if handler.on_event(&event) {
                        break;
                    }
                }
            }
        }
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
