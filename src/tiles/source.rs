use crate::core::geo::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Slippy-map source driven by a Leaflet-style URL template with
/// `{s}`, `{z}`, `{x}` and `{y}` placeholders.
#[derive(Debug, Clone)]
pub struct TemplateTileSource {
    template: String,
    subdomains: Vec<String>,
}

impl TemplateTileSource {
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileSource for TemplateTileSource {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        if url.contains("{s}") {
            // Spread requests over subdomains; templates without a list fall back to "a"
            let sub = if self.subdomains.is_empty() {
                "a"
            } else {
                let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
                self.subdomains[idx].as_str()
            };
            url = url.replace("{s}", sub);
        }

        url
    }
}
