use crate::core::bounds::Bounds;
use crate::sources::{LayerDocument, SubLayerDef, SubLayerKind};

/// Snapshot of the view an engine is currently rendering, in terms a
/// sub-layer can test itself against.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub projection: String,
    pub zoom: u8,
    pub bounds: Option<Bounds>,
}

/// A renderable content block that knows whether the current view can show
/// it. Layers whose every sub-layer is out of view are reported as disabled
/// in the layer list.
pub trait BoundsCheck: Send + Sync {
    fn in_view(&self, state: &ViewState) -> bool;
    fn kind(&self) -> SubLayerKind;
}

/// Extent shared by every sub-layer kind: an optional projected bounding
/// box and the zoom range the content exists at.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLayerExtent {
    pub bounds: Option<Bounds>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl SubLayerExtent {
    pub fn new(bounds: Option<Bounds>, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            bounds,
            min_zoom,
            max_zoom,
        }
    }

    /// Zoom must fall in range; bounds only disqualify when both the view
    /// and the content declare one and they do not touch.
    fn visible_in(&self, state: &ViewState) -> bool {
        if state.zoom < self.min_zoom || state.zoom > self.max_zoom {
            return false;
        }
        match (&self.bounds, &state.bounds) {
            (Some(own), Some(view)) => own.intersects(view),
            _ => true,
        }
    }
}

/// Pre-rendered tile pyramid content.
pub struct StaticTiles {
    pub extent: SubLayerExtent,
}

/// A single georeferenced image.
pub struct ImageOverlay {
    pub extent: SubLayerExtent,
}

/// Inline vector features.
pub struct Vectors {
    pub extent: SubLayerExtent,
}

/// Client-templated content bound to a specific projection; it can never
/// be shown when the map runs a different one.
pub struct Templated {
    pub extent: SubLayerExtent,
    pub projection: Option<String>,
}

impl BoundsCheck for StaticTiles {
    fn in_view(&self, state: &ViewState) -> bool {
        self.extent.visible_in(state)
    }

    fn kind(&self) -> SubLayerKind {
        SubLayerKind::Tiles
    }
}

impl BoundsCheck for ImageOverlay {
    fn in_view(&self, state: &ViewState) -> bool {
        self.extent.visible_in(state)
    }

    fn kind(&self) -> SubLayerKind {
        SubLayerKind::Image
    }
}

impl BoundsCheck for Vectors {
    fn in_view(&self, state: &ViewState) -> bool {
        self.extent.visible_in(state)
    }

    fn kind(&self) -> SubLayerKind {
        SubLayerKind::Vector
    }
}

impl BoundsCheck for Templated {
    fn in_view(&self, state: &ViewState) -> bool {
        if let Some(projection) = &self.projection {
            if !projection.eq_ignore_ascii_case(&state.projection) {
                return false;
            }
        }
        self.extent.visible_in(state)
    }

    fn kind(&self) -> SubLayerKind {
        SubLayerKind::Template
    }
}

/// Builds the checkable sub-layers for a fetched document. Content blocks
/// inherit missing bounds and zoom limits from the document extent; a block
/// with no limits anywhere is visible at every zoom.
pub fn from_document(doc: &LayerDocument) -> Vec<Box<dyn BoundsCheck + Send + Sync>> {
    doc.content
        .iter()
        .map(|def| build_sublayer(def, doc))
        .collect()
}

fn build_sublayer(def: &SubLayerDef, doc: &LayerDocument) -> Box<dyn BoundsCheck + Send + Sync> {
    let doc_extent = doc.extent.as_ref();
    let bounds = def.bounds.or_else(|| doc_extent.map(|e| e.bounds));
    let min_zoom = def
        .min_zoom
        .or_else(|| doc_extent.and_then(|e| e.min_zoom))
        .unwrap_or(0);
    let max_zoom = def
        .max_zoom
        .or_else(|| doc_extent.and_then(|e| e.max_zoom))
        .unwrap_or(25);
    let extent = SubLayerExtent::new(bounds, min_zoom, max_zoom);

    match def.kind {
        SubLayerKind::Tiles => Box::new(StaticTiles { extent }),
        SubLayerKind::Image => Box::new(ImageOverlay { extent }),
        SubLayerKind::Vector => Box::new(Vectors { extent }),
        SubLayerKind::Template => Box::new(Templated {
            extent,
            projection: def.projection.clone(),
        }),
    }
}
