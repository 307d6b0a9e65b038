use crate::{
    core::{
        constants::DEFAULT_ZOOM_DELTA,
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    input::events::{InputEvent, MapEvent},
    Result,
};
use std::collections::VecDeque;

/// Viewport change produced by user input
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the view by a screen-pixel delta
    Pan { delta: Point },
    /// Zoom, optionally around a screen point
    Zoom {
        level: f64,
        focus_point: Option<Point>,
    },
    /// Jump to a center and zoom
    SetView { center: LatLng, zoom: f64 },
    /// Container size changed
    Resize { size: Point },
}

/// Queue of map events waiting to be drained by the view
#[derive(Debug, Default)]
pub struct EventManager {
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Drains queued events, oldest first
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_queue.drain(..).collect()
    }
}

/// Map operation implementations
pub struct MapOperations;

impl MapOperations {
    /// Set the map view to a specific center and zoom
    pub fn set_view(viewport: &mut Viewport, center: LatLng, zoom: f64) -> Result<()> {
        if !center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(center.to_string()));
        }

        if viewport.center != center || viewport.zoom != zoom {
            viewport.set_center(center);
            viewport.set_zoom(zoom);
        }

        Ok(())
    }

    /// Pan the map by a pixel delta
    pub fn pan(viewport: &mut Viewport, delta: Point) -> Result<Point> {
        Ok(viewport.pan(delta))
    }

    /// Zoom to a specific level with optional focus point
    pub fn zoom_to(viewport: &mut Viewport, zoom: f64, focus_point: Option<Point>) -> Result<()> {
        viewport.zoom_to(zoom, focus_point);
        Ok(())
    }

    /// Execute any action
    pub fn execute_action(viewport: &mut Viewport, action: Action) -> Result<()> {
        match action {
            Action::Pan { delta } => {
                Self::pan(viewport, delta)?;
            }
            Action::Zoom { level, focus_point } => Self::zoom_to(viewport, level, focus_point)?,
            Action::SetView { center, zoom } => Self::set_view(viewport, center, zoom)?,
            Action::Resize { size } => viewport.set_size(size),
        }
        Ok(())
    }
}

/// Turns raw input events into map actions (like Leaflet's interaction handlers)
pub struct InputHandler {
    pub enabled: bool,
    pub zoom_on_wheel: bool,
    pub zoom_on_double_click: bool,
    pub pan_on_drag: bool,
    pub zoom_delta: f64,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            zoom_on_wheel: true,
            zoom_on_double_click: true,
            pan_on_drag: true,
            zoom_delta: DEFAULT_ZOOM_DELTA,
        }
    }

    /// Handle one input event and generate the actions it implies
    pub fn handle_event(&self, event: InputEvent, current_zoom: f64) -> Vec<Action> {
        if !self.enabled {
            return vec![];
        }

        let mut actions = vec![];

        match event {
            InputEvent::Drag { delta } => {
                if self.pan_on_drag {
                    // Dragging the content right moves the view left
                    actions.push(Action::Pan {
                        delta: delta.multiply(-1.0),
                    });
                }
            }
            InputEvent::Scroll { delta, position } => {
                if self.zoom_on_wheel && delta != 0.0 {
                    let step = if delta > 0.0 {
                        self.zoom_delta
                    } else {
                        -self.zoom_delta
                    };
                    actions.push(Action::Zoom {
                        level: current_zoom + step,
                        focus_point: Some(position),
                    });
                }
            }
            InputEvent::DoubleClick { position } => {
                if self.zoom_on_double_click {
                    actions.push(Action::Zoom {
                        level: current_zoom + self.zoom_delta,
                        focus_point: Some(position),
                    });
                }
            }
            InputEvent::ZoomButton { zoom_in } => {
                let step = if zoom_in {
                    self.zoom_delta
                } else {
                    -self.zoom_delta
                };
                actions.push(Action::Zoom {
                    level: current_zoom + step,
                    focus_point: None,
                });
            }
            InputEvent::Resize { size } => actions.push(Action::Resize { size }),
        }

        actions
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
