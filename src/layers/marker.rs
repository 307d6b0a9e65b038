use crate::{
    core::{
        constants::{MARKER_ICON_ANCHOR, MARKER_ICON_SIZE, MARKER_ICON_URL, MARKER_SHADOW_URL},
        geo::{LatLng, LatLngBounds},
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
};
use serde::{Deserialize, Serialize};

/// Image used to draw a marker, mirroring Leaflet's `L.icon` options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub icon_url: String,
    pub shadow_url: Option<String>,
    pub icon_size: (u32, u32),
    /// Pixel inside the icon that sits on the marker's coordinate
    pub icon_anchor: (u32, u32),
}

impl Default for MarkerIcon {
    fn default() -> Self {
        Self {
            icon_url: MARKER_ICON_URL.to_string(),
            shadow_url: Some(MARKER_SHADOW_URL.to_string()),
            icon_size: MARKER_ICON_SIZE,
            icon_anchor: MARKER_ICON_ANCHOR,
        }
    }
}

pub struct Marker {
    properties: LayerProperties,
    position: LatLng,
    icon: MarkerIcon,
    popup_text: Option<String>,
    popup_open: bool,
}

impl Marker {
    pub fn new(id: String, position: LatLng) -> Self {
        let properties = LayerProperties::new(id, LayerType::Marker);
        Self {
            properties,
            position,
            icon: MarkerIcon::default(),
            popup_text: None,
            popup_open: false,
        }
    }

    pub fn with_icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = icon;
        self
    }

    /// Binds a popup label; it is shown when the marker is clicked
    pub fn with_popup(mut self, text: impl Into<String>) -> Self {
        self.popup_text = Some(text.into());
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn icon(&self) -> &MarkerIcon {
        &self.icon
    }

    pub fn popup_text(&self) -> Option<&str> {
        self.popup_text.as_deref()
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open && self.popup_text.is_some()
    }

    /// Toggles the bound popup; no-op without one
    pub fn toggle_popup(&mut self) {
        if self.popup_text.is_some() {
            self.popup_open = !self.popup_open;
        }
    }
}

impl LayerTrait for Marker {
    crate::impl_layer_trait!(Marker, properties);

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.position, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_defaults_to_leaflet_icon() {
        let marker = Marker::new("m".to_string(), LatLng::new(-6.2, 106.8));
        assert_eq!(marker.icon().icon_size, (25, 41));
        assert!(marker.icon().icon_url.ends_with("marker-icon.png"));
        assert_eq!(marker.layer_type(), LayerType::Marker);
    }

    #[test]
    fn test_popup_toggle() {
        let mut bare = Marker::new("a".to_string(), LatLng::default());
        bare.toggle_popup();
        assert!(!bare.is_popup_open());

        let mut marker = Marker::new("b".to_string(), LatLng::default()).with_popup("Saya Disini!");
        assert_eq!(marker.popup_text(), Some("Saya Disini!"));
        marker.toggle_popup();
        assert!(marker.is_popup_open());
        marker.toggle_popup();
        assert!(!marker.is_popup_open());
    }

    #[test]
    fn test_bounds_are_the_point() {
        let marker = Marker::new("m".to_string(), LatLng::new(-6.2, 106.8));
        let bounds = marker.bounds().unwrap();
        assert!(bounds.contains(&LatLng::new(-6.2, 106.8)));
    }
}
