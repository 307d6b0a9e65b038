use crate::core::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};

/// Pointer and window events the map view forwards to the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Double click/tap (zooms in around the position)
    DoubleClick { position: Point },
    /// Drag in progress, delta in screen pixels
    Drag { delta: Point },
    /// Scroll wheel or pinch zoom, delta in zoom levels
    Scroll { delta: f64, position: Point },
    /// Zoom control button
    ZoomButton { zoom_in: bool },
    /// Viewport/window resize
    Resize { size: Point },
}

/// Map event types that can be emitted by the map
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Map view has changed (center, zoom, or size)
    ViewChanged { center: LatLng, zoom: f64 },
    /// Pan ended without a zoom change
    MoveEnd { center: LatLng },
    /// Layer was added to the map
    LayerAdd { layer_id: String },
    /// Layer was removed from the map
    LayerRemove { layer_id: String },
}

impl MapEvent {
    /// Listener key for this event, Leaflet-style lowercase
    pub fn event_type(&self) -> &'static str {
        match self {
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::MoveEnd { .. } => "moveend",
            MapEvent::LayerAdd { .. } => "layeradd",
            MapEvent::LayerRemove { .. } => "layerremove",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_event_types() {
        let event = MapEvent::LayerAdd {
            layer_id: "subject-marker".to_string(),
        };
        assert_eq!(event.event_type(), "layeradd");
        assert_eq!(
            MapEvent::MoveEnd {
                center: LatLng::default()
            }
            .event_type(),
            "moveend"
        );
    }
}
