//! Subscription management and synchronous dispatch
//!
//! Dispatch is keyed by `(sender, event kind)`. A trigger for a key that is
//! already dispatching is parked in a single pending slot and replayed by the
//! outer dispatch loop once the current pass over the handlers completes, so
//! a handler that retriggers its own event never recurses.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use super::{
    Event, EventFilter, EventKind, EventRecord, Off, Subscription, SubscriptionId,
    DEFAULT_PRIORITY,
};
use crate::error::ModelResult;
use crate::model::{EntityId, Model};

type DispatchKey = (EntityId, EventKind);

#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    active: HashSet<DispatchKey>,
    pending: HashMap<DispatchKey, EventRecord>,
    /// Global mute depth
    muted: usize,
    next_subscription: u64,
}

impl Model {
    /* ===================== Subscribing ===================== */

    /// Subscribe to events raised on (or bubbled/spread through) `id`
    pub fn on(
        &mut self,
        id: EntityId,
        filter: impl Into<EventFilter>,
        handler: impl Fn(&mut Model, &EventRecord) + 'static,
    ) -> ModelResult<SubscriptionId> {
        self.on_with(id, filter, None, DEFAULT_PRIORITY, handler)
    }

    /// Subscribe with an owning context entity and a priority
    ///
    /// Subscriptions with a context are detached when that entity is destroyed.
    pub fn on_with(
        &mut self,
        id: EntityId,
        filter: impl Into<EventFilter>,
        context: Option<EntityId>,
        priority: i32,
        handler: impl Fn(&mut Model, &EventRecord) + 'static,
    ) -> ModelResult<SubscriptionId> {
        self.ensure_live(id)?;
        let subscription_id = SubscriptionId(self.dispatch.next_subscription);
        self.dispatch.next_subscription += 1;

        let subscription = Subscription {
            id: subscription_id,
            filter: filter.into(),
            priority,
            context,
            handler: Rc::new(handler),
        };
        self.node_mut(id)?.bus.insert(subscription);
        Ok(subscription_id)
    }

    /// Remove subscriptions on `id` matching `off`
    pub fn off(&mut self, id: EntityId, off: Off) -> ModelResult<usize> {
        Ok(self.node_mut(id)?.bus.remove(&off))
    }

    /// Remove every subscription owned by `context`, on every bus
    pub(crate) fn off_context(&mut self, context: EntityId) -> usize {
        let off = Off::all().with_context(context);
        self.entities
            .values_mut()
            .map(|node| node.bus.remove(&off))
            .sum()
    }

    /* ===================== Triggering ===================== */

    /// Fire `event` on `id` only
    pub fn trigger(&mut self, id: EntityId, event: Event) -> ModelResult<()> {
        self.ensure_live(id)?;
        self.dispatch_record(EventRecord::new(id, id, event));
        Ok(())
    }

    pub(crate) fn dispatch_record(&mut self, record: EventRecord) {
        let sender = record.sender;
        if self.is_muted(sender) {
            return;
        }

        let kind = record.kind();
        let key = (sender, kind);
        if self.dispatch.active.contains(&key) {
            trace!(entity = %sender, event = %kind, "coalescing re-entrant trigger");
            self.dispatch.pending.insert(key, record);
            return;
        }

        self.dispatch.active.insert(key);
        let mut current = Some(record);
        while let Some(record) = current {
            let handlers = match self.entities.get(&sender) {
                Some(node) => node.bus.handlers_for(kind),
                None => break,
            };
            for handler in handlers {
                if !self.entities.contains_key(&sender) {
                    break;
                }
                (*handler)(self, &record);
            }
            current = self.dispatch.pending.remove(&key);
        }
        self.dispatch.active.remove(&key);
        self.dispatch.pending.remove(&key);
    }

    /* ===================== Muting ===================== */

    /// Run `action` with all triggering suppressed
    pub fn mute_action<R>(&mut self, action: impl FnOnce(&mut Model) -> R) -> R {
        self.dispatch.muted += 1;
        let result = action(self);
        self.dispatch.muted -= 1;
        result
    }

    /// Run `action` with triggering suppressed on `id` and its descendants
    pub fn mute_entity<R>(
        &mut self,
        id: EntityId,
        action: impl FnOnce(&mut Model) -> R,
    ) -> ModelResult<R> {
        self.node_mut(id)?.muted += 1;
        let result = action(self);
        if let Ok(node) = self.node_mut(id) {
            node.muted -= 1;
        }
        Ok(result)
    }

    /// Whether events on `id` are currently suppressed
    pub fn is_muted(&self, id: EntityId) -> bool {
        if self.dispatch.muted > 0 {
            return true;
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.entities.get(&current) {
                Some(node) if node.muted > 0 => return true,
                Some(node) => cursor = node.parent,
                None => return false,
            }
        }
        false
    }
}
