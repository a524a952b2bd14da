//! Process-wide event bus.
//!
//! This crate provides:
//! - A broadcast [`EventBus`] that decouples backend state changes from
//!   whoever listens (UI bridge, logs, tests)
//! - Topic-filtered streams and handler subscriptions
//! - Emitters that publish the resource and download event families

pub mod bus;
pub mod emitter;

pub use bus::{EventBus, EventStream, Subscription, DEFAULT_CAPACITY};
pub use emitter::{DownloadEmitter, ResourceEmitter};
