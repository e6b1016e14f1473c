//! Prelude module for common webmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use webmap::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    geo::{LatLng, Point},
    history::{HistoryEntry, ViewHistory},
    projection::{CrsKind, Projection, ProjectionRegistry, TcrsTemplate, BUILTIN_CODES},
};

pub use crate::elements::{
    AreaShape, ControlKind, ControlSet, ControlsList, EventManager, LifecycleState, MapArea,
    MapLayer, MapViewer, Poster, ViewExtent, ViewerBuilder, ViewerEvent, ViewerOptions,
};

pub use crate::engine::{
    BoundsCheck, ControlHandle, EngineConfig, EngineEvent, EngineFactory, HeadlessEngine,
    LayerHandle, LayerStatus, MapEngine, PointerKind, ShapeGeometry, ShapeHandle, ViewState,
};

pub use crate::sources::{
    DocumentExtent, LayerDocument, LayerFetcher, StaticFetcher, SubLayerDef, SubLayerKind,
};

#[cfg(feature = "http")]
pub use crate::sources::HttpFetcher;

pub use crate::{Error as MapError, Result};

pub use std::{collections::VecDeque, sync::Arc};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

#[cfg(feature = "tokio-runtime")]
pub use futures::Future;
