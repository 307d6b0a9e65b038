use crate::core::geo::LatLngBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Tile,
    Marker,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Tile => write!(f, "tile"),
            LayerType::Marker => write!(f, "marker"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerProperties {
    pub id: String,
    pub layer_type: LayerType,
    pub z_index: i32,
}

impl LayerProperties {
    pub fn new(id: String, layer_type: LayerType) -> Self {
        let z_index = match layer_type {
            // Markers sit above the base tiles, as in Leaflet's marker pane
            LayerType::Marker => 600,
            LayerType::Tile => 200,
        };

        Self {
            id,
            layer_type,
            z_index,
        }
    }
}

/// Operations every map layer supports
pub trait LayerTrait: Send + Sync {
    fn id(&self) -> &str;

    fn layer_type(&self) -> LayerType;

    /// Layers are drawn in ascending z-index order
    fn z_index(&self) -> i32;

    /// Get layer bounds if applicable
    fn bounds(&self) -> Option<LatLngBounds> {
        None
    }

    /// Check if layer intersects with given bounds; unbounded layers always do
    fn intersects_bounds(&self, bounds: &LatLngBounds) -> bool {
        self.bounds()
            .map(|own| own.intersects(bounds))
            .unwrap_or(true)
    }

    fn as_any(&self) -> &dyn std::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
