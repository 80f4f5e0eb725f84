//! The single logical live-data subscription layered on a connection.
//!
//! One slot, guarded swap: a new `subscribe` detaches the previous handler
//! before the next delivery, a queued intent is flushed exactly once per
//! established connection, and delivery never holds the slot lock across the
//! handler call so handlers may resubscribe, unsubscribe or disconnect from
//! inside the callback.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::connection::Shared;
use crate::types::{ClientFrame, Sample, SubscribeOptions};

pub type LiveHandler = Box<dyn FnMut(&[Sample]) + Send>;

struct Entry {
    options: SubscribeOptions,
    /// `None` only while the handler is out on loan to an in-flight
    /// delivery; the entry itself never leaves the slot for that, so
    /// replay and clear keep working mid-delivery.
    handler: Option<LiveHandler>,
    /// Connection id the subscribe frame was last issued for. The server
    /// forgets interest on every transport reset, so each established
    /// connection must reissue it, and only once.
    sent_for: Option<u64>,
}

#[derive(Default)]
struct SlotInner {
    entry: Option<Entry>,
    /// Bumped on every install/clear; lets the delivery path detect that the
    /// handler it took out was swapped from under it mid-call.
    generation: u64,
}

/// Shared single-slot subscription state.
#[derive(Clone, Default)]
pub struct SubscriptionSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a subscription, atomically replacing any prior one. The old
    /// handler stops receiving deliveries at this point.
    pub fn install(&self, options: SubscribeOptions, handler: LiveHandler) {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.entry = Some(Entry {
            options,
            handler: Some(handler),
            sent_for: None,
        });
    }

    /// Clear the slot. Idempotent; returns whether a subscription was
    /// actually active so callers can best-effort notify the server.
    pub fn clear(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.entry.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().entry.is_some()
    }

    /// The subscribe frame to issue for the given connection, at most once
    /// per connection id. Returns `None` when no subscription is queued or
    /// the frame was already issued for this connection.
    pub fn replay_frame(&self, connection_id: u64) -> Option<ClientFrame> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry.as_mut()?;
        if entry.sent_for == Some(connection_id) {
            return None;
        }
        entry.sent_for = Some(connection_id);
        Some(ClientFrame::Subscribe {
            data: entry.options.clone(),
        })
    }

    /// Deliver a validated batch to the current handler. Only the handler
    /// leaves the slot while it runs, and the lock is released for the
    /// duration of the call, so the handler may resubscribe, unsubscribe
    /// or trigger a reconnect replay without deadlocking. If the
    /// subscription is swapped or cleared while the handler runs, the
    /// loaned-out handler is dropped instead of being put back.
    pub fn deliver(&self, samples: &[Sample]) {
        let (mut handler, generation) = {
            let mut inner = self.inner.lock().unwrap();
            let generation = inner.generation;
            match inner.entry.as_mut().and_then(|entry| entry.handler.take()) {
                Some(handler) => (handler, generation),
                None => return,
            }
        };

        handler(samples);

        let mut inner = self.inner.lock().unwrap();
        if inner.generation == generation {
            // clear() and install() both bump the generation, so a matching
            // one means the entry is still ours, merely missing its handler.
            if let Some(entry) = inner.entry.as_mut() {
                entry.handler = Some(handler);
            }
        } else {
            debug!("subscription swapped during delivery; dropping old handler");
        }
    }
}

/// Consumer-facing handle for the at-most-one live-data subscription on a
/// connection. Cheap to clone via [`crate::connection::ConnectionManager::subscription`].
pub struct SubscriptionController {
    shared: Arc<Shared>,
}

impl SubscriptionController {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Register the handler and the server-side interest. If the transport
    /// is not yet connected the intent is queued and flushed automatically
    /// on the next transition to connected, and again after every
    /// reconnection.
    pub fn subscribe<F>(&self, options: SubscribeOptions, handler: F)
    where
        F: FnMut(&[Sample]) + Send + 'static,
    {
        self.shared.subs().install(options, Box::new(handler));
        // The transport may already be up, or may have come up between the
        // install and this check; the sent_for marker keeps the frame
        // exactly-once per connection either way.
        self.flush();
    }

    /// Drop the local handler and best-effort tell the server. Safe to call
    /// repeatedly and when no subscription is active.
    pub fn unsubscribe(&self) {
        let had_subscription = self.shared.subs().clear();
        if had_subscription {
            if let Some((_, outbound)) = self.shared.live_connection() {
                let _ = outbound.send(ClientFrame::Unsubscribe);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.subs().is_active()
    }

    fn flush(&self) {
        if let Some((connection_id, outbound)) = self.shared.live_connection() {
            if let Some(frame) = self.shared.subs().replay_frame(connection_id) {
                let _ = outbound.send(frame);
            }
        }
    }
}
