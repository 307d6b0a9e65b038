use crate::{
    core::{
        constants::{OSM_ATTRIBUTION, OSM_TILE_URL},
        geo::{LatLng, TileCoord},
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    tiles::source::{TemplateTileSource, TileSource},
};

/// Configuration for a tile layer
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TileLayerOptions {
    /// URL template for tiles (e.g., "https://tile.openstreetmap.org/{z}/{x}/{y}.png")
    pub url_template: String,
    /// Available subdomains for `{s}`
    pub subdomains: Vec<String>,
    /// Attribution text
    pub attribution: String,
    /// Highest zoom the server has tiles for; deeper views overzoom these
    pub max_native_zoom: u8,
    pub min_zoom: u8,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            subdomains: Vec::new(),
            attribution: OSM_ATTRIBUTION.to_string(),
            max_native_zoom: 19,
            min_zoom: 0,
        }
    }
}

/// A tile-based base layer. It knows which tiles cover a viewport and where
/// to fetch them; fetching and drawing is left to the view.
pub struct TileLayer {
    properties: LayerProperties,
    options: TileLayerOptions,
    tile_source: Box<dyn TileSource>,
}

impl TileLayer {
    /// Create a new tile layer with custom options
    pub fn with_options(id: String, options: TileLayerOptions) -> Self {
        let properties = LayerProperties::new(id, LayerType::Tile);
        let tile_source: Box<dyn TileSource> = Box::new(TemplateTileSource::new(
            options.url_template.clone(),
            options.subdomains.clone(),
        ));

        Self {
            properties,
            options,
            tile_source,
        }
    }

    /// Create a tile layer from a URL template and attribution
    pub fn from_template(id: String, url_template: &str, attribution: &str) -> Self {
        let options = TileLayerOptions {
            url_template: url_template.to_string(),
            attribution: attribution.to_string(),
            ..TileLayerOptions::default()
        };
        Self::with_options(id, options)
    }

    pub fn attribution(&self) -> &str {
        &self.options.attribution
    }

    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.tile_source.url(coord)
    }

    /// Tile zoom used for a view zoom: rounded and capped to the server's range
    pub fn tile_zoom(&self, view_zoom: f64) -> u8 {
        let rounded = view_zoom.round().max(0.0) as u8;
        rounded.clamp(self.options.min_zoom, self.options.max_native_zoom)
    }

    /// Tiles covering the viewport, row-major from the north-west corner
    pub fn visible_tiles(&self, viewport: &Viewport) -> Vec<TileCoord> {
        let z = self.tile_zoom(viewport.zoom);
        let bounds = viewport.bounds();

        let nw = TileCoord::from_lat_lng(
            &LatLng::new(bounds.north_east.lat, bounds.south_west.lng),
            z,
        );
        let se = TileCoord::from_lat_lng(
            &LatLng::new(bounds.south_west.lat, bounds.north_east.lng),
            z,
        );

        let mut tiles = Vec::new();
        for y in nw.y..=se.y {
            for x in nw.x..=se.x {
                tiles.push(TileCoord::new(x, y, z));
            }
        }
        tiles
    }
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(TileLayer, properties);
}
