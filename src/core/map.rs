use crate::{
    core::{
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    input::{Action, EventManager, InputEvent, InputHandler, MapEvent, MapOperations},
    layers::{base::LayerTrait, manager::LayerManager},
    Result,
};

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub dragging: bool,
    pub scroll_wheel_zoom: bool,
    pub double_click_zoom: bool,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub attribution_control: bool,
    pub zoom_control: bool,
    pub zoom_delta: f64,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            dragging: true,
            scroll_wheel_zoom: true,
            double_click_zoom: true,
            min_zoom: None,
            max_zoom: None,
            attribution_control: true,
            zoom_control: true,
            zoom_delta: 1.0,
        }
    }
}

/// Leaflet-style map: a viewport plus the layers drawn over it
pub struct Map {
    pub viewport: Viewport,
    layer_manager: LayerManager,
    event_manager: EventManager,
    options: MapOptions,
    input_handler: InputHandler,
}

impl Map {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        let viewport = Viewport::new(center, zoom, size);
        Self::with_options(viewport, MapOptions::default())
    }

    pub fn with_options(viewport: Viewport, options: MapOptions) -> Self {
        let input_handler = InputHandler {
            pan_on_drag: options.dragging,
            zoom_on_wheel: options.scroll_wheel_zoom,
            zoom_on_double_click: options.double_click_zoom,
            zoom_delta: options.zoom_delta,
            ..InputHandler::new()
        };

        let mut map = Self {
            viewport,
            layer_manager: LayerManager::new(),
            event_manager: EventManager::new(),
            options,
            input_handler,
        };

        if let (Some(min), Some(max)) = (map.options.min_zoom, map.options.max_zoom) {
            map.viewport.set_zoom_limits(min, max);
        }

        map
    }

    /// Moves to `center` at `zoom` in one step
    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()> {
        let old_center = self.viewport.center;
        let old_zoom = self.viewport.zoom;

        MapOperations::set_view(&mut self.viewport, center, zoom)?;

        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            self.event_manager.emit(MapEvent::ViewChanged {
                center: self.viewport.center,
                zoom: self.viewport.zoom,
            });
        }

        Ok(())
    }

    /// Re-centers on `center` keeping the current zoom
    pub fn pan_to(&mut self, center: LatLng) -> Result<()> {
        if !center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(center.to_string()));
        }

        let old_center = self.viewport.center;
        self.viewport.set_center(center);

        if self.viewport.center != old_center {
            self.event_manager.emit(MapEvent::MoveEnd {
                center: self.viewport.center,
            });
        }

        Ok(())
    }

    /// Pans by a screen-pixel delta
    pub fn pan_by(&mut self, delta: Point) -> Result<()> {
        let old_center = self.viewport.center;
        MapOperations::pan(&mut self.viewport, delta)?;

        if self.viewport.center != old_center {
            self.event_manager.emit(MapEvent::MoveEnd {
                center: self.viewport.center,
            });
        }

        Ok(())
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    pub fn center(&self) -> LatLng {
        self.viewport.center
    }

    pub fn zoom_to(&mut self, zoom: f64, focus_point: Option<Point>) -> Result<()> {
        let old_zoom = self.viewport.zoom;
        let old_center = self.viewport.center;

        MapOperations::zoom_to(&mut self.viewport, zoom, focus_point)?;

        if self.viewport.zoom != old_zoom || self.viewport.center != old_center {
            self.event_manager.emit(MapEvent::ViewChanged {
                center: self.viewport.center,
                zoom: self.viewport.zoom,
            });
        }

        Ok(())
    }

    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layer_manager.add_layer(layer)?;
        self.event_manager.emit(MapEvent::LayerAdd { layer_id });
        Ok(())
    }

    /// Removes a layer, returning whether one was present
    pub fn remove_layer(&mut self, layer_id: &str) -> bool {
        if self.layer_manager.remove_layer(layer_id).is_some() {
            self.event_manager.emit(MapEvent::LayerRemove {
                layer_id: layer_id.to_string(),
            });
            true
        } else {
            false
        }
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layer_manager.get_layer(layer_id)
    }

    pub fn get_layer_as<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.layer_manager.get_layer_as::<T>(layer_id)
    }

    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layer_manager.with_layer_mut(layer_id, f)
    }

    pub fn list_layers(&self) -> Vec<String> {
        self.layer_manager.list_layers()
    }

    /// Visible layers inside the current view, in draw order
    pub fn visible_layers(&self) -> Vec<&dyn LayerTrait> {
        self.layer_manager.visible_layers(&self.viewport.bounds())
    }

    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }

    pub fn handle_input(&mut self, input: InputEvent) -> Result<()> {
        let actions = self.input_handler.handle_event(input, self.viewport.zoom);

        for action in actions {
            match action {
                Action::Zoom { level, focus_point } => self.zoom_to(level, focus_point)?,
                Action::SetView { center, zoom } => self.set_view(center, zoom)?,
                Action::Pan { delta } => self.pan_by(delta)?,
                action @ Action::Resize { .. } => {
                    MapOperations::execute_action(&mut self.viewport, action)?
                }
            }
        }

        Ok(())
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{OSM_ATTRIBUTION, OSM_TILE_URL};
    use crate::layers::{marker::Marker, tile::TileLayer};

    fn subject_map() -> Map {
        Map::new(LatLng::new(-6.3276, 107.289), 6.0, Point::new(800.0, 600.0))
    }

    #[test]
    fn test_map_creation() {
        let map = subject_map();

        assert_eq!(map.center(), LatLng::new(-6.3276, 107.289));
        assert_eq!(map.zoom(), 6.0);
        assert_eq!(map.viewport.size, Point::new(800.0, 600.0));
    }

    #[test]
    fn test_set_view_emits_view_changed() {
        let mut map = subject_map();
        let target = LatLng::new(-6.2, 106.8);

        map.set_view(target, 12.0).unwrap();
        assert_eq!(map.center(), target);
        assert_eq!(map.zoom(), 12.0);
        assert_eq!(
            map.process_events(),
            vec![MapEvent::ViewChanged {
                center: target,
                zoom: 12.0
            }]
        );

        // Same view again is a no-op
        map.set_view(target, 12.0).unwrap();
        assert!(map.process_events().is_empty());
    }

    #[test]
    fn test_pan_to_keeps_zoom() {
        let mut map = subject_map();
        map.set_view(LatLng::new(-6.2, 106.8), 15.0).unwrap();
        map.process_events();

        let target = LatLng::new(-6.21, 106.81);
        map.pan_to(target).unwrap();

        assert_eq!(map.center(), target);
        assert_eq!(map.zoom(), 15.0);
        assert_eq!(map.process_events(), vec![MapEvent::MoveEnd { center: target }]);
    }

    #[test]
    fn test_invalid_center_rejected() {
        let mut map = subject_map();
        assert!(map.set_view(LatLng::new(f64::NAN, 0.0), 12.0).is_err());
        assert!(map.pan_to(LatLng::new(0.0, f64::INFINITY)).is_err());
        assert_eq!(map.center(), LatLng::new(-6.3276, 107.289));
    }

    #[test]
    fn test_layer_management() {
        let mut map = subject_map();

        map.add_layer(Box::new(TileLayer::from_template(
            "osm".to_string(),
            OSM_TILE_URL,
            OSM_ATTRIBUTION,
        )))
        .unwrap();
        map.add_layer(Box::new(Marker::new(
            "subject-marker".to_string(),
            LatLng::new(-6.2, 106.8),
        )))
        .unwrap();

        assert!(map.get_layer("osm").is_some());
        assert_eq!(map.list_layers(), vec!["osm", "subject-marker"]);
        assert!(map.get_layer_as::<Marker>("subject-marker").is_some());

        assert!(map.remove_layer("subject-marker"));
        assert!(!map.remove_layer("subject-marker"));
        assert!(map.get_layer("subject-marker").is_none());

        let events = map.process_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            MapEvent::LayerRemove {
                layer_id: "subject-marker".to_string()
            }
        );
    }

    #[test]
    fn test_zoom_to_clamps_to_limits() {
        let mut map = subject_map();

        map.zoom_to(15.0, None).unwrap();
        assert_eq!(map.zoom(), 15.0);

        map.zoom_to(25.0, None).unwrap();
        assert_eq!(map.zoom(), 20.0);
    }

    #[test]
    fn test_options_set_zoom_limits() {
        let options = MapOptions {
            min_zoom: Some(3.0),
            max_zoom: Some(18.0),
            ..Default::default()
        };
        let mut map = Map::with_options(Viewport::default(), options);

        map.zoom_to(20.0, None).unwrap();
        assert_eq!(map.zoom(), 18.0);
    }

    #[test]
    fn test_handle_input_routes_actions() {
        let mut map = subject_map();

        map.handle_input(InputEvent::ZoomButton { zoom_in: true })
            .unwrap();
        assert_eq!(map.zoom(), 7.0);

        let before = map.center();
        map.handle_input(InputEvent::Drag {
            delta: Point::new(40.0, 0.0),
        })
        .unwrap();
        // Dragging right shows what is to the west
        assert!(map.center().lng < before.lng);

        map.handle_input(InputEvent::Resize {
            size: Point::new(400.0, 300.0),
        })
        .unwrap();
        assert_eq!(map.viewport().size, Point::new(400.0, 300.0));
    }

    #[test]
    fn test_dragging_disabled() {
        let options = MapOptions {
            dragging: false,
            ..Default::default()
        };
        let mut map = Map::with_options(Viewport::default(), options);
        let before = map.center();

        map.handle_input(InputEvent::Drag {
            delta: Point::new(40.0, 0.0),
        })
        .unwrap();
        assert_eq!(map.center(), before);
    }
}
