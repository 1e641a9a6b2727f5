//! Reactive Primitives
//!
//! In-memory state binding for synchronized values. A [`Signal`] is a
//! shared cell; views subscribe to it under a [`SubscriberId`] and are told
//! whenever the value changes, whether the change came from a local write,
//! the initial load, or the remote change feed.

mod signal;
mod subscriber;

pub use signal::Signal;
pub use subscriber::SubscriberId;
