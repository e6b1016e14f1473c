//! Layer source documents and the fetchers that retrieve them.
//!
//! A layer's remote `src` resolves to a [`LayerDocument`]: a small manifest
//! describing the layer's title, declared projection, extent and content
//! sub-layers. Fetching is abstracted behind [`LayerFetcher`] so tests and
//! offline tools can serve canned documents.

use crate::core::bounds::Bounds;
use crate::{MapError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpFetcher;

/// The kinds of content a layer document can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubLayerKind {
    Tiles,
    Image,
    Vector,
    Template,
}

/// One content block inside a layer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubLayerDef {
    pub kind: SubLayerKind,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub min_zoom: Option<u8>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
    #[serde(default)]
    pub projection: Option<String>,
}

/// Extent metadata a layer document may declare for all of its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtent {
    pub bounds: Bounds,
    #[serde(default)]
    pub min_zoom: Option<u8>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
}

/// A fetched layer manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub projection: Option<String>,
    #[serde(default)]
    pub extent: Option<DocumentExtent>,
    #[serde(default)]
    pub content: Vec<SubLayerDef>,
}

/// Retrieves layer documents by URL.
#[async_trait]
pub trait LayerFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<LayerDocument>;
}

/// In-memory fetcher serving pre-registered documents. Unknown URLs fail
/// the same way a missing remote document would.
#[derive(Default)]
pub struct StaticFetcher {
    docs: crate::prelude::HashMap<String, LayerDocument>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, doc: LayerDocument) {
        self.docs.insert(url.into(), doc);
    }

    pub fn with_document(mut self, url: impl Into<String>, doc: LayerDocument) -> Self {
        self.insert(url, doc);
        self
    }
}

#[async_trait]
impl LayerFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<LayerDocument> {
        self.docs
            .get(url)
            .cloned()
            .ok_or_else(|| MapError::LayerSource(format!("no document at {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;

    #[test]
    fn test_document_deserializes_with_defaults() {
        let doc: LayerDocument = serde_json::from_str(r#"{"title": "Roads"}"#).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Roads"));
        assert!(doc.projection.is_none());
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_document_full_manifest() {
        let json = r#"{
            "title": "Forecast",
            "projection": "OSMTILE",
            "extent": {
                "bounds": {"min": {"x": -10.0, "y": -10.0}, "max": {"x": 10.0, "y": 10.0}},
                "min_zoom": 2,
                "max_zoom": 9
            },
            "content": [
                {"kind": "tiles"},
                {"kind": "image", "min_zoom": 4},
                {"kind": "template", "projection": "CBMTILE"}
            ]
        }"#;
        let doc: LayerDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.content.len(), 3);
        assert_eq!(doc.content[0].kind, SubLayerKind::Tiles);
        assert_eq!(doc.content[1].min_zoom, Some(4));
        assert_eq!(doc.content[2].projection.as_deref(), Some("CBMTILE"));
        let extent = doc.extent.unwrap();
        assert_eq!(extent.bounds.max, Point::new(10.0, 10.0));
        assert_eq!(extent.max_zoom, Some(9));
    }

    #[test]
    fn test_static_fetcher() {
        let fetcher = StaticFetcher::new().with_document(
            "https://example.com/roads",
            LayerDocument {
                title: Some("Roads".to_string()),
                ..Default::default()
            },
        );

        let doc = futures::executor::block_on(fetcher.fetch("https://example.com/roads")).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Roads"));

        let missing = futures::executor::block_on(fetcher.fetch("https://example.com/rail"));
        assert!(matches!(missing, Err(MapError::LayerSource(_))));
    }
}
