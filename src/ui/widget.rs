use crate::{
    core::{
        constants::SUBJECT_MARKER_ID,
        geo::{Point, TileCoord},
        map::Map,
        viewport::Viewport,
    },
    input::InputEvent,
    layers::{marker::Marker, tile::TileLayer},
    tracking::controller::TrackingController,
};
use egui::{Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, Ui, Vec2, Widget};

/// Raw scroll distance that makes one zoom step
const SCROLL_PER_ZOOM_STEP: f32 = 50.0;

const CONTROL_SIZE: f32 = 30.0;

const LAND: Color32 = Color32::from_rgb(242, 239, 233);
const GRID: Color32 = Color32::from_rgb(214, 210, 200);
const PIN: Color32 = Color32::from_rgb(38, 129, 204);

/// Immediate-mode view of the tracking map.
///
/// Draws the tile grid of the base layer, the subject marker with its popup,
/// the attribution and +/- zoom controls, and feeds drag, scroll and
/// double-click input back into the controller's map. Clicking the marker
/// toggles its popup.
///
/// ```rust,ignore
/// ui.add(TrackingMapView::new(&controller));
/// ```
pub struct TrackingMapView<'a> {
    controller: &'a TrackingController,
    size: Option<Vec2>,
    interactive: bool,
    show_controls: bool,
    show_attribution: bool,
}

impl<'a> TrackingMapView<'a> {
    pub fn new(controller: &'a TrackingController) -> Self {
        Self {
            controller,
            size: None,
            interactive: true,
            show_controls: true,
            show_attribution: true,
        }
    }

    pub fn size(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn controls(mut self, show: bool) -> Self {
        self.show_controls = show;
        self
    }

    pub fn attribution(mut self, show: bool) -> Self {
        self.show_attribution = show;
        self
    }

    /// Translates this frame's pointer input into map input events
    fn collect_input(&self, ui: &Ui, rect: Rect, response: &Response) -> (Vec<InputEvent>, bool) {
        let mut events = Vec::new();
        let mut marker_clicked = false;

        if !self.interactive {
            return (events, marker_clicked);
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            let scroll_id = response.id.with("scroll_accum");
            let accumulated =
                ui.ctx().memory(|mem| mem.data.get_temp::<f32>(scroll_id).unwrap_or(0.0)) + scroll;

            if accumulated.abs() >= SCROLL_PER_ZOOM_STEP {
                let position = ui
                    .input(|i| i.pointer.hover_pos())
                    .map(|pos| to_local(rect, pos))
                    .unwrap_or_else(|| {
                        Point::new(rect.width() as f64 / 2.0, rect.height() as f64 / 2.0)
                    });
                events.push(InputEvent::Scroll {
                    delta: accumulated as f64,
                    position,
                });
                ui.ctx().memory_mut(|mem| mem.data.insert_temp(scroll_id, 0.0_f32));
            } else {
                ui.ctx()
                    .memory_mut(|mem| mem.data.insert_temp(scroll_id, accumulated));
            }
        }

        if response.dragged() {
            let delta = response.drag_delta();
            if delta.length_sq() > 0.5 {
                events.push(InputEvent::Drag {
                    delta: Point::new(delta.x as f64, delta.y as f64),
                });
            }
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                events.push(InputEvent::DoubleClick {
                    position: to_local(rect, pos),
                });
            }
        } else if response.clicked() {
            marker_clicked = response
                .interact_pointer_pos()
                .map(|pos| to_local(rect, pos))
                .is_some_and(|local| {
                    self.controller
                        .with_map(|map| marker_hit(map, local))
                        .unwrap_or(false)
                });
        }

        (events, marker_clicked)
    }
}

impl Widget for TrackingMapView<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let desired_size = self.size.unwrap_or_else(|| ui.available_size());
        let (rect, mut response) = ui.allocate_exact_size(desired_size, Sense::click_and_drag());

        let (mut events, marker_clicked) = self.collect_input(ui, rect, &response);

        let (map_controls, map_attribution) = self
            .controller
            .with_map(|map| (map.options().zoom_control, map.options().attribution_control))
            .unwrap_or((true, true));
        let show_controls = self.show_controls && map_controls;
        let show_attribution = self.show_attribution && map_attribution;

        let (zoom_in_rect, zoom_out_rect) = control_rects(rect);
        if show_controls && self.interactive {
            if ui.allocate_rect(zoom_in_rect, Sense::click()).clicked() {
                events.push(InputEvent::ZoomButton { zoom_in: true });
            }
            if ui.allocate_rect(zoom_out_rect, Sense::click()).clicked() {
                events.push(InputEvent::ZoomButton { zoom_in: false });
            }
        }

        let size = Point::new(rect.width() as f64, rect.height() as f64);
        let painter = ui.painter_at(rect);

        let drawn = self.controller.with_map_mut(|map| {
            if map.viewport().size != size {
                events.insert(0, InputEvent::Resize { size });
            }
            let changed = !events.is_empty() || marker_clicked;

            for event in events.drain(..) {
                if let Err(err) = map.handle_input(event) {
                    log::warn!("map input rejected: {}", err);
                }
            }
            if marker_clicked {
                map.with_layer_mut(SUBJECT_MARKER_ID, |layer| {
                    if let Some(marker) = layer.as_any_mut().downcast_mut::<Marker>() {
                        marker.toggle_popup();
                    }
                });
            }

            paint_map(&painter, rect, map, show_attribution);
            changed
        });

        match drawn {
            Some(true) => response.mark_changed(),
            Some(false) => {}
            None => {
                painter.rect_filled(rect, 0.0, Color32::from_rgb(230, 230, 230));
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "Loading map...",
                    FontId::proportional(16.0),
                    Color32::from_gray(100),
                );
            }
        }

        if show_controls {
            paint_zoom_control(&painter, zoom_in_rect, "+");
            paint_zoom_control(&painter, zoom_out_rect, "−");
        }

        if let Some(pos) = response.hover_pos() {
            let local = to_local(rect, pos);
            if let Some(url) = self.controller.with_map(|map| tile_url_at(map, local)).flatten() {
                response = response.on_hover_text_at_pointer(url);
            }
        }

        response
    }
}

/// `ui.tracking_map(&controller)` shorthand
pub trait UiTrackingExt {
    fn tracking_map(&mut self, controller: &TrackingController) -> Response;
}

impl UiTrackingExt for Ui {
    fn tracking_map(&mut self, controller: &TrackingController) -> Response {
        self.add(TrackingMapView::new(controller))
    }
}

fn paint_map(painter: &egui::Painter, rect: Rect, map: &Map, show_attribution: bool) {
    painter.rect_filled(rect, 0.0, LAND);

    let viewport = map.viewport();
    let mut attributions = Vec::new();

    for layer in map.visible_layers() {
        if let Some(tiles) = layer.as_any().downcast_ref::<TileLayer>() {
            for tile in tiles.visible_tiles(viewport) {
                paint_tile(painter, rect, viewport, tile);
            }
            if !tiles.attribution().is_empty() {
                attributions.push(tiles.attribution().to_string());
            }
        } else if let Some(marker) = layer.as_any().downcast_ref::<Marker>() {
            paint_marker(painter, rect, viewport, marker);
        }
    }

    if show_attribution && !attributions.is_empty() {
        painter.text(
            rect.left_bottom() + Vec2::new(5.0, -5.0),
            Align2::LEFT_BOTTOM,
            attributions.join(" | "),
            FontId::proportional(10.0),
            Color32::from_gray(120),
        );
    }
}

/// URL of the base-layer tile under a container point
fn tile_url_at(map: &Map, local: Point) -> Option<String> {
    let viewport = map.viewport();
    let position = viewport.pixel_to_lat_lng(&local);

    map.visible_layers().into_iter().find_map(|layer| {
        let tiles = layer.as_any().downcast_ref::<TileLayer>()?;
        let coord = TileCoord::from_lat_lng(&position, tiles.tile_zoom(viewport.zoom));
        Some(tiles.tile_url(coord))
    })
}

fn paint_tile(painter: &egui::Painter, rect: Rect, viewport: &Viewport, tile: TileCoord) {
    let (min, max) = tile_screen_bounds(viewport, tile);
    let tile_rect = Rect::from_min_max(to_screen(rect, min), to_screen(rect, max));

    painter.rect_stroke(tile_rect, 0.0, Stroke::new(1.0, GRID));
    painter.text(
        tile_rect.left_top() + Vec2::new(4.0, 4.0),
        Align2::LEFT_TOP,
        format!("{}/{}/{}", tile.z, tile.x, tile.y),
        FontId::monospace(9.0),
        GRID,
    );
}

fn paint_marker(painter: &egui::Painter, rect: Rect, viewport: &Viewport, marker: &Marker) {
    let anchor = to_screen(rect, viewport.lat_lng_to_pixel(&marker.position()));
    let (width, height) = marker.icon().icon_size;
    let (anchor_x, anchor_y) = marker.icon().icon_anchor;

    let icon_rect = Rect::from_min_size(
        anchor - Vec2::new(anchor_x as f32, anchor_y as f32),
        Vec2::new(width as f32, height as f32),
    );
    let radius = icon_rect.width() / 2.0;
    let head = Pos2::new(icon_rect.center().x, icon_rect.top() + radius);

    // Shadow, tail, then head
    painter.circle_filled(
        anchor + Vec2::new(radius * 0.6, -2.0),
        radius * 0.5,
        Color32::from_black_alpha(60),
    );
    painter.add(Shape::convex_polygon(
        vec![
            head + Vec2::new(-radius * 0.85, radius * 0.5),
            head + Vec2::new(radius * 0.85, radius * 0.5),
            anchor,
        ],
        PIN,
        Stroke::NONE,
    ));
    painter.circle_filled(head, radius, PIN);
    painter.circle_filled(head, radius * 0.4, Color32::WHITE);

    if marker.is_popup_open() {
        if let Some(text) = marker.popup_text() {
            paint_popup(painter, Pos2::new(anchor.x, icon_rect.top() - 6.0), text);
        }
    }
}

fn paint_popup(painter: &egui::Painter, tip: Pos2, text: &str) {
    let galley = painter.layout_no_wrap(
        text.to_string(),
        FontId::proportional(13.0),
        Color32::BLACK,
    );
    let padding = Vec2::new(12.0, 8.0);
    let bubble = Rect::from_center_size(
        tip - Vec2::new(0.0, galley.size().y / 2.0 + padding.y + 6.0),
        galley.size() + padding * 2.0,
    );

    painter.add(Shape::convex_polygon(
        vec![
            Pos2::new(tip.x - 6.0, bubble.bottom()),
            Pos2::new(tip.x + 6.0, bubble.bottom()),
            tip,
        ],
        Color32::WHITE,
        Stroke::NONE,
    ));
    painter.rect_filled(bubble, 6.0, Color32::WHITE);
    painter.rect_stroke(bubble, 6.0, Stroke::new(1.0, Color32::from_gray(180)));
    painter.galley(bubble.min + padding, galley, Color32::BLACK);
}

fn paint_zoom_control(painter: &egui::Painter, rect: Rect, label: &str) {
    painter.rect_filled(rect, 3.0, Color32::from_rgba_unmultiplied(255, 255, 255, 220));
    painter.rect_stroke(rect, 3.0, Stroke::new(1.0, Color32::from_gray(100)));
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        label,
        FontId::proportional(16.0),
        Color32::BLACK,
    );
}

fn control_rects(rect: Rect) -> (Rect, Rect) {
    let zoom_in = Rect::from_min_size(
        rect.right_top() + Vec2::new(-40.0, 10.0),
        Vec2::splat(CONTROL_SIZE),
    );
    let zoom_out = Rect::from_min_size(
        rect.right_top() + Vec2::new(-40.0, 45.0),
        Vec2::splat(CONTROL_SIZE),
    );
    (zoom_in, zoom_out)
}

/// Container-relative map pixel to screen position
fn to_screen(rect: Rect, point: Point) -> Pos2 {
    Pos2::new(rect.min.x + point.x as f32, rect.min.y + point.y as f32)
}

/// Screen position to container-relative map pixel
fn to_local(rect: Rect, pos: Pos2) -> Point {
    Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64)
}

/// Container pixels of a tile's north-west and south-east corners
fn tile_screen_bounds(viewport: &Viewport, tile: TileCoord) -> (Point, Point) {
    let north_west = tile.to_lat_lng();
    let south_east = TileCoord::new(tile.x + 1, tile.y + 1, tile.z).to_lat_lng();
    (
        viewport.lat_lng_to_pixel(&north_west),
        viewport.lat_lng_to_pixel(&south_east),
    )
}

/// Whether a container pixel falls on the subject marker's icon
fn marker_hit(map: &Map, local: Point) -> bool {
    let Some(marker) = map.get_layer_as::<Marker>(SUBJECT_MARKER_ID) else {
        return false;
    };

    let anchor = map.viewport().lat_lng_to_pixel(&marker.position());
    let (width, height) = marker.icon().icon_size;
    let (anchor_x, anchor_y) = marker.icon().icon_anchor;
    let left = anchor.x - anchor_x as f64;
    let top = anchor.y - anchor_y as f64;

    (left..=left + width as f64).contains(&local.x)
        && (top..=top + height as f64).contains(&local.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{config::TrackerConfig, geo::LatLng},
        tracking::{
            api::TrackingApi,
            location::{
                FailureHandling, LocationError, LocationProvider, PositionOptions, ProviderKind,
            },
            model::Coordinate,
            notify::LogNotifier,
        },
        Result,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Idle;

    #[async_trait]
    impl TrackingApi for Idle {
        async fn fetch_subject_location(&self) -> Result<Option<Coordinate>> {
            Ok(None)
        }

        async fn report_location(&self, _coordinate: Coordinate) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl LocationProvider for Idle {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Browser
        }

        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> std::result::Result<Coordinate, LocationError> {
            Err(LocationError::Unsupported)
        }

        fn handle_failure(&self, _error: &LocationError) -> FailureHandling {
            FailureHandling::Alert
        }
    }

    fn controller() -> TrackingController {
        TrackingController::new(
            TrackerConfig::default(),
            Arc::new(Idle),
            Arc::new(Idle),
            Arc::new(LogNotifier),
        )
    }

    fn run_frame(ctx: &egui::Context, controller: &TrackingController, input: egui::RawInput) {
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.add(TrackingMapView::new(controller).size(Vec2::new(400.0, 300.0)));
            });
        });
    }

    #[test]
    fn test_screen_local_round_trip() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(400.0, 300.0));
        let local = Point::new(100.0, 50.0);
        assert_eq!(to_screen(rect, local), Pos2::new(110.0, 70.0));
        assert_eq!(to_local(rect, Pos2::new(110.0, 70.0)), local);
    }

    #[test]
    fn test_tile_bounds_are_one_tile_wide() {
        let viewport = Viewport::new(LatLng::new(-6.2, 106.8), 12.0, Point::new(800.0, 600.0));
        let tile = TileCoord::from_lat_lng(&viewport.center, 12);

        let (min, max) = tile_screen_bounds(&viewport, tile);
        assert!((max.x - min.x - 256.0).abs() < 1e-6);
        assert!((max.y - min.y - 256.0).abs() < 1e-3);
    }

    #[test]
    fn test_marker_hit_box_follows_anchor() {
        let mut map = Map::new(LatLng::new(-6.2, 106.8), 12.0, Point::new(800.0, 600.0));
        map.add_layer(Box::new(Marker::new(
            SUBJECT_MARKER_ID.to_string(),
            LatLng::new(-6.2, 106.8),
        )))
        .unwrap();

        // Icon is 25x41 anchored at its bottom middle, over the view center
        assert!(marker_hit(&map, Point::new(400.0, 290.0)));
        assert!(marker_hit(&map, Point::new(400.0, 299.0)));
        assert!(!marker_hit(&map, Point::new(400.0, 310.0)));
        assert!(!marker_hit(&map, Point::new(450.0, 290.0)));
    }

    #[test]
    fn test_tile_url_under_pointer() {
        let mut map = Map::new(LatLng::new(-6.2, 106.8), 12.0, Point::new(800.0, 600.0));
        assert_eq!(tile_url_at(&map, Point::new(400.0, 300.0)), None);

        map.add_layer(Box::new(TileLayer::from_template(
            "osm".to_string(),
            "https://tiles.example.org/{z}/{x}/{y}.png",
            "",
        )))
        .unwrap();

        let center = TileCoord::from_lat_lng(&LatLng::new(-6.2, 106.8), 12);
        assert_eq!(
            tile_url_at(&map, Point::new(400.0, 300.0)),
            Some(format!(
                "https://tiles.example.org/12/{}/{}.png",
                center.x, center.y
            ))
        );
    }

    #[test]
    fn test_view_without_map_shows_placeholder() {
        let controller = controller();
        let ctx = egui::Context::default();
        run_frame(&ctx, &controller, egui::RawInput::default());
        assert!(!controller.has_map());
    }

    #[test]
    fn test_view_resizes_map_to_widget() {
        let controller = controller();
        controller.create_map().unwrap();

        let ctx = egui::Context::default();
        run_frame(&ctx, &controller, egui::RawInput::default());

        let size = controller.with_map(|map| map.viewport().size).unwrap();
        assert_eq!(size, Point::new(400.0, 300.0));
        // Resizing keeps the view where it was
        let (center, zoom) = controller.with_map(|map| (map.center(), map.zoom())).unwrap();
        assert_eq!(center, LatLng::new(-6.3276, 107.289));
        assert_eq!(zoom, 6.0);
    }
}
