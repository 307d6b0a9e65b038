//! egui front end for the tracking screen

pub mod alert;
pub mod widget;

pub use alert::AlertQueue;
pub use widget::{TrackingMapView, UiTrackingExt};
