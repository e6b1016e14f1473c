//! # webmap
//!
//! A Rust-native `<web-map>` viewer core in the spirit of the MapML
//! custom elements.
//!
//! The crate models the element side of a map viewer: attribute
//! reflection, the attach lifecycle, layer and area children, projection
//! definitions, navigation history and DOM-style events. Rendering sits
//! behind the [`engine::MapEngine`] seam, with a headless implementation
//! included for tests and server-side use.

pub mod core;
pub mod elements;
pub mod engine;
pub mod prelude;
pub mod sources;

// Re-export public API
pub use crate::core::{
    bounds::Bounds,
    geo::{LatLng, Point},
    history::{HistoryEntry, ViewHistory},
    projection::{Projection, ProjectionRegistry, TcrsTemplate},
};

pub use crate::elements::{
    AreaShape, ControlKind, ControlsList, LifecycleState, MapArea, MapLayer, MapViewer,
    ViewExtent, ViewerBuilder, ViewerEvent,
};

pub use crate::engine::{EngineEvent, HeadlessEngine, LayerHandle, MapEngine, PointerKind};

pub use crate::sources::{LayerDocument, LayerFetcher, StaticFetcher};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("undefined projection: {0}")]
    UndefinedProjection(String),

    #[error("incomplete TCRS definition: missing {0}")]
    IncompleteTcrsDefinition(&'static str),

    #[error("invalid projection name: {0} (colons are not permitted)")]
    InvalidProjectionName(String),

    #[error("layer source error: {0}")]
    LayerSource(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Error type alias for convenience
pub type Error = MapError;
