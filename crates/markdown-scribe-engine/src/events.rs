//! Typed publish/subscribe bus, one per editor instance.
//!
//! The payload of every event is an explicit variant rather than an untyped
//! argument list, so subscribers match exhaustively on [`EditorEvent`].

use crate::history::RangeSnapshot;
use crate::view::AffectedViewLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    Scroll,
    ScrollBy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollChange {
    pub x: f64,
    pub y: f64,
    pub action: ScrollAction,
}

/// Everything the core announces to the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// The flat element sequence changed.
    SchemaChange,
    /// The range set changed; payload is a snapshot of every live range.
    SelectionChange { ranges: Vec<RangeSnapshot> },
    /// The projected view-block tree changed.
    BlocksChange,
    /// Exactly the view lines that need re-rendering.
    Render { affected: Vec<AffectedViewLine> },
    /// The core wants the scrollbar widget to move.
    ScrollbarChange(ScrollChange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SchemaChange,
    SelectionChange,
    BlocksChange,
    Render,
    ScrollbarChange,
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::SchemaChange => EventKind::SchemaChange,
            EditorEvent::SelectionChange { .. } => EventKind::SelectionChange,
            EditorEvent::BlocksChange => EventKind::BlocksChange,
            EditorEvent::Render { .. } => EventKind::Render,
            EditorEvent::ScrollbarChange(_) => EventKind::ScrollbarChange,
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&EditorEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscription {
    id: SubscriberId,
    kind: EventKind,
    once: bool,
    handler: EventHandler,
}

/// Event emitter with per-kind subscriptions.
#[derive(Default)]
pub struct Emitter {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, handler: EventHandler) -> SubscriberId {
        self.subscribe(kind, handler, false)
    }

    /// Subscribe for a single delivery.
    pub fn once(&mut self, kind: EventKind, handler: EventHandler) -> SubscriberId {
        self.subscribe(kind, handler, true)
    }

    fn subscribe(&mut self, kind: EventKind, handler: EventHandler, once: bool) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            once,
            handler,
        });
        id
    }

    pub fn off(&mut self, id: SubscriberId) {
        self.subscriptions.retain(|s| s.id != id);
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn emit(&mut self, event: &EditorEvent) {
        let kind = event.kind();
        for sub in &mut self.subscriptions {
            if sub.kind == kind {
                (sub.handler)(event);
            }
        }
        self.subscriptions.retain(|s| !(s.once && s.kind == kind));
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_matching_subscribers_only() {
        let mut emitter = Emitter::new();
        let hits = Rc::new(RefCell::new(0));

        let h = hits.clone();
        emitter.on(
            EventKind::SchemaChange,
            Box::new(move |_| *h.borrow_mut() += 1),
        );

        emitter.emit(&EditorEvent::SchemaChange);
        emitter.emit(&EditorEvent::BlocksChange);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn once_subscription_fires_one_time() {
        let mut emitter = Emitter::new();
        let hits = Rc::new(RefCell::new(0));

        let h = hits.clone();
        emitter.once(
            EventKind::SchemaChange,
            Box::new(move |_| *h.borrow_mut() += 1),
        );

        emitter.emit(&EditorEvent::SchemaChange);
        emitter.emit(&EditorEvent::SchemaChange);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(emitter.subscriber_count(EventKind::SchemaChange), 0);
    }

    #[test]
    fn off_removes_subscription() {
        let mut emitter = Emitter::new();
        let hits = Rc::new(RefCell::new(0));

        let h = hits.clone();
        let id = emitter.on(
            EventKind::BlocksChange,
            Box::new(move |_| *h.borrow_mut() += 1),
        );
        emitter.off(id);

        emitter.emit(&EditorEvent::BlocksChange);
        assert_eq!(*hits.borrow(), 0);
    }
}
