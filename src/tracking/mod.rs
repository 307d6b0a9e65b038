//! The tracking screen: polling the subject, driving the map, reporting the
//! device position.

pub mod api;
pub mod location;
pub mod model;
pub mod notify;

#[cfg(feature = "tokio-runtime")]
pub mod controller;
#[cfg(feature = "tokio-runtime")]
pub mod poller;
