use crate::core::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_LATITUDE, TILE_SIZE};
use crate::core::geo::{LatLng, LatLngBounds, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const EARTH_RADIUS: f64 = 6378137.0;

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
    /// Projected center, cached so screen conversions skip re-projection
    pixel_origin: Option<Point>,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        let mut viewport = Self {
            center: Self::clamp_to_world(center),
            zoom: zoom.clamp(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            size,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            pixel_origin: None,
        };
        viewport.update_pixel_origin();
        viewport
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = Self::clamp_to_world(center);
        self.update_pixel_origin();
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.update_pixel_origin();
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
        self.update_pixel_origin();
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self.update_pixel_origin();
    }

    /// Projects a LatLng to world pixel coordinates (Web Mercator, EPSG:3857)
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let world_size = TILE_SIZE as f64 * 2_f64.powf(z);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let lat = LatLng::clamp_lat(lat_lng.lat);
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

        let circumference = 2.0 * PI * EARTH_RADIUS;
        let pixel_x = (x + PI * EARTH_RADIUS) / circumference * world_size;
        let pixel_y = (-y + PI * EARTH_RADIUS) / circumference * world_size;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let world_size = TILE_SIZE as f64 * 2_f64.powf(z);
        let circumference = 2.0 * PI * EARTH_RADIUS;

        let x = (pixel.x / world_size) * circumference - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / world_size) * circumference;

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }

    /// Gets or calculates the pixel origin for this viewport
    pub fn get_pixel_origin(&self) -> Point {
        self.pixel_origin
            .unwrap_or_else(|| self.project(&self.center, None))
    }

    fn update_pixel_origin(&mut self) {
        self.pixel_origin = Some(self.project(&self.center, None));
    }

    /// Converts a geographical coordinate to screen pixel coordinates (container relative)
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let layer_point = self.project(lat_lng, None).subtract(&self.get_pixel_origin());
        Point::new(
            layer_point.x + self.size.x / 2.0,
            layer_point.y + self.size.y / 2.0,
        )
    }

    /// Converts screen pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let layer_point = Point::new(pixel.x - self.size.x / 2.0, pixel.y - self.size.y / 2.0);
        self.unproject(&layer_point.add(&self.get_pixel_origin()), None)
    }

    /// Pans the viewport by the given pixel offset, returning the applied delta
    pub fn pan(&mut self, delta: Point) -> Point {
        let before = self.project(&self.center, None);
        let target = before.add(&delta);
        let new_center = self.unproject(&target, None);
        self.set_center(LatLng::new(new_center.lat, LatLng::wrap_lng(new_center.lng)));

        self.project(&self.center, None).subtract(&before)
    }

    /// Zooms the viewport to a specific level, keeping `focus_point` stationary if given
    pub fn zoom_to(&mut self, zoom: f64, focus_point: Option<Point>) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);

        if (new_zoom - self.zoom).abs() < 0.001 {
            return;
        }

        match focus_point {
            Some(focus_screen) => {
                let focus_lat_lng = self.pixel_to_lat_lng(&focus_screen);
                self.set_zoom(new_zoom);

                // Pan so the focused coordinate lands back under the cursor
                let drifted = self.lat_lng_to_pixel(&focus_lat_lng);
                self.pan(drifted.subtract(&focus_screen));
            }
            None => self.set_zoom(new_zoom),
        }
    }

    /// Gets the current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&Point::new(self.size.x, self.size.y));

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    fn clamp_to_world(center: LatLng) -> LatLng {
        LatLng::new(
            center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center.lng.clamp(-180.0, 180.0),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(LatLng::new(-6.3276, 107.289), 6.0, Point::new(800.0, 600.0));

        assert_eq!(viewport.zoom, 6.0);
        assert_eq!(viewport.center.lat, -6.3276);
        assert_eq!(viewport.size.x, 800.0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let center_lat_lng = viewport.pixel_to_lat_lng(&Point::new(256.0, 256.0));
        assert!(center_lat_lng.lat.abs() < 0.01);
        assert!(center_lat_lng.lng.abs() < 0.01);
    }

    #[test]
    fn test_projection_round_trip_near_subject() {
        let viewport = Viewport::new(LatLng::new(-6.2, 106.8), 12.0, Point::new(800.0, 600.0));
        let target = LatLng::new(-6.21, 106.83);

        let back = viewport.pixel_to_lat_lng(&viewport.lat_lng_to_pixel(&target));
        assert!((back.lat - target.lat).abs() < 1e-6);
        assert!((back.lng - target.lng).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(2.0, 15.0);

        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom, 2.0);

        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 15.0);
    }

    #[test]
    fn test_default_range_allows_focus_zoom() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 20.0);
    }

    #[test]
    fn test_pan() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let original_center = viewport.center;
        let applied = viewport.pan(Point::new(10.0, 10.0));

        assert_ne!(viewport.center, original_center);
        assert!((applied.x - 10.0).abs() < 1e-6);
        assert!((applied.y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_to_keeps_focus_point_stationary() {
        let mut viewport = Viewport::new(LatLng::new(-6.2, 106.8), 10.0, Point::new(800.0, 600.0));
        let focus = Point::new(600.0, 200.0);
        let under_cursor = viewport.pixel_to_lat_lng(&focus);

        viewport.zoom_to(11.0, Some(focus));

        let after = viewport.pixel_to_lat_lng(&focus);
        assert_eq!(viewport.zoom, 11.0);
        assert!((after.lat - under_cursor.lat).abs() < 1e-3);
        assert!((after.lng - under_cursor.lng).abs() < 1e-3);
    }
}
