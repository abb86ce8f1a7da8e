//! Client library for the carbon service.
//!
//! The centrepiece is [`Manager`], a generic fetch cache: it fills a keyed
//! [`Collection`] of [`Entity`] values through a [`Loader`], one at a time,
//! in bulk, or as a lazy stream. [`models`] builds the user-facing resources
//! on top of it, talking to the service through [`api::ApiClient`].

pub mod api;
pub mod collection;
pub mod entity;
pub mod error;
pub mod events;
pub mod manager;
pub mod models;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use collection::Collection;
pub use entity::Entity;
pub use error::{BucketOutOfRange, CacheError, StorageError};
pub use events::{ErrorEvent, ErrorOrigin, Event, EventBus, EventKind, SubscriptionId};
pub use manager::{Loader, Manager};
pub use storage::Storage;
