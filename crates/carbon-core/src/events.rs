//! Out-of-band notifications raised by a user and the resources it owns.
//!
//! Events form a closed set. Subscribers register for one [`EventKind`] with
//! a callback typed for that kind's payload and get back a
//! [`SubscriptionId`] that can later be passed to [`EventBus::remove`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::api::FailureCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Login,
    Error,
}

/// Operation that produced an error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorOrigin {
    Login,
    ChangePassword,
    UpdateUuid,
    SaveColorTheme,
    FetchColorTheme,
    GetSchools,
    FetchSchool,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorOrigin::Login => "login",
            ErrorOrigin::ChangePassword => "changePassword",
            ErrorOrigin::UpdateUuid => "updateUUID",
            ErrorOrigin::SaveColorTheme => "saveColorTheme",
            ErrorOrigin::FetchColorTheme => "fetchColorTheme",
            ErrorOrigin::GetSchools => "getSchools",
            ErrorOrigin::FetchSchool => "fetchSchool",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub origin: ErrorOrigin,
    pub code: FailureCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Login,
    Error(ErrorEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Login => EventKind::Login,
            Event::Error(_) => EventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Subscriber {
    Login(Arc<dyn Fn() + Send + Sync>),
    Error(Arc<dyn Fn(&ErrorEvent) + Send + Sync>),
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, Subscriber)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_login<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Login, Subscriber::Login(Arc::new(callback)))
    }

    pub fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, Subscriber::Error(Arc::new(callback)))
    }

    fn subscribe(&self, kind: EventKind, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push((id, subscriber));
        id
    }

    /// Unsubscribe. Returns false if `id` was not registered for `kind`.
    pub fn remove(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        match list.iter().position(|(sub_id, _)| *sub_id == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its kind, in subscription order.
    ///
    /// Callbacks run after the subscriber list is released, so they may
    /// subscribe or unsubscribe themselves.
    pub fn emit(&self, event: Event) {
        let targets: Vec<Subscriber> = self
            .subscribers
            .read()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, s)| s.clone()).collect())
            .unwrap_or_default();

        for subscriber in targets {
            match (&subscriber, &event) {
                (Subscriber::Login(callback), Event::Login) => callback(),
                (Subscriber::Error(callback), Event::Error(payload)) => callback(payload),
                _ => {}
            }
        }
    }

    /// Log and emit a transport failure.
    pub fn emit_error(&self, origin: ErrorOrigin, code: FailureCode, message: impl Into<String>) {
        let message = message.into();
        warn!(origin = %origin, code = %code, message = %message, "Request failed");
        self.emit(Event::Error(ErrorEvent {
            origin,
            code,
            message,
        }));
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("login", &self.subscriber_count(EventKind::Login))
            .field("error", &self.subscriber_count(EventKind::Error))
            .finish()
    }
}
