//! Event Core
//!
//! Every entity owns an [`EventBus`]: an ordered list of subscriptions that
//! fire synchronously when an event is triggered on that entity.
//!
//! # Ordering
//!
//! Handlers for one event fire in descending priority, then in insertion
//! order. The model's own reactions (dependency resolution, revalidation,
//! call mirroring) subscribe at [`INTERNAL_PRIORITY`] so that observers
//! subscribed at the default priority always see a settled graph.
//!
//! # Re-entrancy
//!
//! Triggering an event that is already being dispatched for the same sender
//! does not recurse. The new record is parked in a pending slot (last write
//! wins) and replayed once the in-flight dispatch completes. See
//! [`Model::trigger`](crate::model::Model::trigger).

mod dispatch;

use std::fmt;
use std::rc::Rc;

use crate::model::{EntityId, Model};
use crate::types::Type;

pub(crate) use dispatch::DispatchState;

#[cfg(test)]
mod tests;

/// Priority of the model's own subscriptions
pub const INTERNAL_PRIORITY: i32 = 100;

/// Priority used by [`Model::on`](crate::model::Model::on) callers that do not care
pub const DEFAULT_PRIORITY: i32 = 0;

/* ===================== Event Vocabulary ===================== */

/// The four document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Imports,
    Structs,
    Workflows,
    Tasks,
}

/// Something that happened to an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Generic notification, bubbled after every specific change
    Changed,
    NameChanged {
        old: Option<String>,
        new: Option<String>,
    },
    AliasChanged {
        old: Option<String>,
        new: Option<String>,
    },
    ParentChanged {
        old: Option<EntityId>,
        new: Option<EntityId>,
    },
    /// The shape of the tree around the entity changed because `source`
    /// was moved, renamed, loaded or destroyed
    TreeChanged {
        source: EntityId,
    },
    ChildAdded {
        child: EntityId,
    },
    ChildRemoved {
        child: EntityId,
    },
    ValueChanged,
    TypeChanged {
        old: Option<Type>,
        new: Option<Type>,
    },
    ConnectionsChanged {
        peer: EntityId,
        connected: bool,
    },
    DependenciesChanged,
    IssuesChanged,
    CommandChanged,
    MetaChanged {
        key: String,
    },
    CallTargetChanged {
        target: Option<EntityId>,
    },
    ImportLoaded {
        document: Option<EntityId>,
    },
    CollectionChanged {
        collection: Collection,
        entity: EntityId,
        added: bool,
    },
    Destroyed,
}

/// Payload-free discriminant of [`Event`], used for filtering and coalescing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Changed,
    NameChanged,
    AliasChanged,
    ParentChanged,
    TreeChanged,
    ChildAdded,
    ChildRemoved,
    ValueChanged,
    TypeChanged,
    ConnectionsChanged,
    DependenciesChanged,
    IssuesChanged,
    CommandChanged,
    MetaChanged,
    CallTargetChanged,
    ImportLoaded,
    CollectionChanged,
    Destroyed,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Changed => EventKind::Changed,
            Event::NameChanged { .. } => EventKind::NameChanged,
            Event::AliasChanged { .. } => EventKind::AliasChanged,
            Event::ParentChanged { .. } => EventKind::ParentChanged,
            Event::TreeChanged { .. } => EventKind::TreeChanged,
            Event::ChildAdded { .. } => EventKind::ChildAdded,
            Event::ChildRemoved { .. } => EventKind::ChildRemoved,
            Event::ValueChanged => EventKind::ValueChanged,
            Event::TypeChanged { .. } => EventKind::TypeChanged,
            Event::ConnectionsChanged { .. } => EventKind::ConnectionsChanged,
            Event::DependenciesChanged => EventKind::DependenciesChanged,
            Event::IssuesChanged => EventKind::IssuesChanged,
            Event::CommandChanged => EventKind::CommandChanged,
            Event::MetaChanged { .. } => EventKind::MetaChanged,
            Event::CallTargetChanged { .. } => EventKind::CallTargetChanged,
            Event::ImportLoaded { .. } => EventKind::ImportLoaded,
            Event::CollectionChanged { .. } => EventKind::CollectionChanged,
            Event::Destroyed => EventKind::Destroyed,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An event as delivered to handlers
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Entity whose bus is dispatching
    pub sender: EntityId,
    /// Entity the event was raised on (differs from `sender` while bubbling or spreading)
    pub origin: EntityId,
    pub event: Event,
}

impl EventRecord {
    pub fn new(sender: EntityId, origin: EntityId, event: Event) -> Self {
        Self {
            sender,
            origin,
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/* ===================== Subscriptions ===================== */

/// Which events a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Exact(EventKind),
    /// Wildcard
    Any,
}

impl EventFilter {
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            EventFilter::Exact(expected) => *expected == kind,
            EventFilter::Any => true,
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        EventFilter::Exact(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Event handler
///
/// Handlers receive the whole model and may mutate it. Use interior
/// mutability for handler-local state.
pub type Handler = Rc<dyn Fn(&mut Model, &EventRecord)>;

#[derive(Clone)]
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) filter: EventFilter,
    pub(crate) priority: i32,
    /// Entity that owns the subscription; destroying it detaches the subscription
    pub(crate) context: Option<EntityId>,
    pub(crate) handler: Handler,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("priority", &self.priority)
            .field("context", &self.context)
            .finish()
    }
}

/// Filter for [`Model::off`](crate::model::Model::off)
///
/// Every field left as `None` matches everything, so `Off::all()` removes
/// every subscription and each `with_*` call narrows the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Off {
    pub event: Option<EventFilter>,
    pub subscription: Option<SubscriptionId>,
    pub context: Option<EntityId>,
}

impl Off {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn event(filter: impl Into<EventFilter>) -> Self {
        Self {
            event: Some(filter.into()),
            ..Self::default()
        }
    }

    pub fn subscription(id: SubscriptionId) -> Self {
        Self {
            subscription: Some(id),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: EntityId) -> Self {
        self.context = Some(context);
        self
    }

    fn matches(&self, subscription: &Subscription) -> bool {
        self.event.map_or(true, |f| f == subscription.filter)
            && self.subscription.map_or(true, |id| id == subscription.id)
            && self
                .context
                .map_or(true, |ctx| subscription.context == Some(ctx))
    }
}

/* ===================== EventBus ===================== */

/// Per-entity subscription list, kept in dispatch order
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping descending priority, FIFO within one priority
    pub(crate) fn insert(&mut self, subscription: Subscription) {
        let pos = self
            .subscriptions
            .iter()
            .position(|s| s.priority < subscription.priority)
            .unwrap_or(self.subscriptions.len());
        self.subscriptions.insert(pos, subscription);
    }

    /// Remove matching subscriptions, returning how many were removed
    pub(crate) fn remove(&mut self, off: &Off) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| !off.matches(s));
        before - self.subscriptions.len()
    }

    /// Snapshot of the handlers that should see an event of `kind`
    pub(crate) fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        self.subscriptions
            .iter()
            .filter(|s| s.filter.matches(kind))
            .map(|s| Rc::clone(&s.handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
