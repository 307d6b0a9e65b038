use crate::{core::geo::LatLngBounds, layers::base::LayerTrait, prelude::HashMap, Result};

/// Manages layers for the map, handling ordering and lookup
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Ordered list of layer IDs for drawing (sorted by z-index)
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer to the manager. Ids are unique: a second layer with the
    /// same id is rejected.
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(crate::Error::Layer(format!(
                "layer '{}' is already on the map",
                layer_id
            )));
        }

        let z_index = layer.z_index();
        self.layers.insert(layer_id.clone(), layer);

        // Insert in sorted order by z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    /// Removes a layer from the manager
    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.render_order.retain(|id| id != layer_id);
        self.layers.remove(layer_id)
    }

    /// Gets a reference to a layer by ID
    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    /// Gets a layer by ID downcast to its concrete type
    pub fn get_layer_as<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.get_layer(layer_id)
            .and_then(|layer| layer.as_any().downcast_ref::<T>())
    }

    /// Applies a function to a specific layer mutably
    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layers.get_mut(layer_id).map(|layer| f(layer.as_mut()))
    }

    /// Lists all layer IDs in draw order
    pub fn list_layers(&self) -> Vec<String> {
        self.render_order.clone()
    }

    /// Gets all layers in draw order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.render_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|l| l.as_ref()))
            .collect()
    }

    /// Layers that intersect `bounds`, in draw order
    pub fn visible_layers(&self, bounds: &LatLngBounds) -> Vec<&dyn LayerTrait> {
        self.layers()
            .into_iter()
            .filter(|layer| layer.intersects_bounds(bounds))
            .collect()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{OSM_ATTRIBUTION, OSM_TILE_URL};
    use crate::core::geo::LatLng;
    use crate::layers::{marker::Marker, tile::TileLayer};

    fn osm() -> Box<TileLayer> {
        Box::new(TileLayer::from_template("osm".to_string(), OSM_TILE_URL, OSM_ATTRIBUTION))
    }

    #[test]
    fn test_markers_draw_above_tiles() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(Marker::new(
                "subject-marker".to_string(),
                LatLng::new(-6.2, 106.8),
            )))
            .unwrap();
        manager.add_layer(osm()).unwrap();

        assert_eq!(manager.list_layers(), vec!["osm", "subject-marker"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut manager = LayerManager::new();
        let position = LatLng::new(-6.2, 106.8);
        manager
            .add_layer(Box::new(Marker::new("m".to_string(), position)))
            .unwrap();
        let second = manager.add_layer(Box::new(Marker::new("m".to_string(), position)));

        assert!(second.is_err());
        assert_eq!(manager.list_layers(), vec!["m"]);
    }

    #[test]
    fn test_remove_and_downcast() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(Marker::new("m".to_string(), LatLng::new(1.0, 2.0))))
            .unwrap();

        let marker = manager.get_layer_as::<Marker>("m").unwrap();
        assert_eq!(marker.position(), LatLng::new(1.0, 2.0));
        assert!(manager.get_layer_as::<TileLayer>("m").is_none());

        assert!(manager.remove_layer("m").is_some());
        assert!(manager.remove_layer("m").is_none());
        assert!(manager.list_layers().is_empty());
    }
}
