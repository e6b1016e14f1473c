//! The rendering-engine seam.
//!
//! Viewer elements never talk to a concrete map engine; they drive the
//! [`MapEngine`] trait and react to the [`EngineEvent`]s it reports. The
//! crate ships [`HeadlessEngine`], a faithful non-rendering implementation
//! used by tests and server-side tooling; a GPU or DOM renderer plugs in by
//! implementing the same trait.

pub mod headless;
pub mod sublayer;

pub use headless::HeadlessEngine;
pub use sublayer::{BoundsCheck, SubLayerExtent, ViewState};

use crate::core::{bounds::Bounds, geo::LatLng, geo::Point, projection::Projection};
use crate::elements::controls::ControlKind;
use std::any::Any;
use std::sync::Arc;

/// Opaque identifier for a layer the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub u64);

/// Opaque identifier for a mounted control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle(pub u64);

/// Opaque identifier for an interactive shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u64);

/// Where a layer is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    Loading,
    Loaded,
    Failed,
}

/// Pointer gestures an engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Click,
    DblClick,
    MouseMove,
    MouseOver,
    MouseOut,
    MouseDown,
    MouseUp,
    ContextMenu,
}

impl PointerKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            PointerKind::Click => "click",
            PointerKind::DblClick => "dblclick",
            PointerKind::MouseMove => "mousemove",
            PointerKind::MouseOver => "mouseover",
            PointerKind::MouseOut => "mouseout",
            PointerKind::MouseDown => "mousedown",
            PointerKind::MouseUp => "mouseup",
            PointerKind::ContextMenu => "contextmenu",
        }
    }
}

/// Geometry for an interactive shape, in displayed pixel units.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Circle { center: Point, radius: f64 },
    Rect(Bounds),
    Polygon { points: Vec<Point> },
}

/// Everything an engine needs to come up.
#[derive(Clone)]
pub struct EngineConfig {
    pub center: LatLng,
    pub zoom: u8,
    pub projection: Arc<Projection>,
    pub size: Point,
}

/// Constructs an engine for a resolved viewer. Owned by the viewer so a
/// host can swap in its own renderer.
pub type EngineFactory = Box<dyn Fn(EngineConfig) -> Box<dyn MapEngine> + Send + Sync>;

/// Events an engine reports back to its viewer, drained via
/// [`MapEngine::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine finished constructing its surface.
    Load,
    MoveStart,
    Move { center: LatLng },
    MoveEnd { center: LatLng, zoom: u8 },
    ZoomStart { zoom: u8 },
    Zoom { zoom: u8 },
    ZoomEnd { zoom: u8 },
    Pointer { kind: PointerKind, position: LatLng, pixel: Point },
    LayerLoaded { layer: LayerHandle },
    LayerFailed { layer: LayerHandle, message: String },
    LayerAdded { layer: LayerHandle },
    LayerRemoved { layer: LayerHandle },
    LayerStyleChanged { layer: LayerHandle },
    ShapeClicked { shape: ShapeHandle },
}

/// A map rendering engine.
///
/// The contract is deliberately small: view state, a layer registry keyed
/// by opaque handles, a control surface and an event queue. `set_view` must
/// settle with exactly one trailing `MoveEnd`, and layer registration is an
/// upsert so callers can re-assert z-order without churning events.
pub trait MapEngine: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    // View state
    fn projection(&self) -> Arc<Projection>;
    fn set_projection(&mut self, projection: Arc<Projection>);
    fn center(&self) -> LatLng;
    fn zoom(&self) -> u8;
    fn size(&self) -> Point;
    fn resize(&mut self, size: Point);
    fn pcrs_bounds(&self) -> Option<Bounds>;
    fn view_state(&self) -> ViewState;
    fn set_view(&mut self, center: LatLng, zoom: u8);
    fn pan_by(&mut self, offset: Point);

    // Layers
    fn create_layer(&mut self, src: &str) -> LayerHandle;
    fn destroy_layer(&mut self, handle: LayerHandle);
    fn add_layer(&mut self, handle: LayerHandle, z_index: i32, opacity: f64);
    fn remove_layer(&mut self, handle: LayerHandle);
    fn is_layer_registered(&self, handle: LayerHandle) -> bool;
    fn layer_status(&self, handle: LayerHandle) -> Option<LayerStatus>;
    fn layer_title(&self, handle: LayerHandle) -> Option<String>;
    fn layer_projection(&self, handle: LayerHandle) -> Option<String>;
    fn sublayers(&self, handle: LayerHandle) -> Vec<&dyn BoundsCheck>;

    // Controls
    fn add_control(&mut self, kind: ControlKind) -> ControlHandle;
    fn remove_control(&mut self, handle: ControlHandle);
    fn layer_list_add_entry(&mut self, layer: LayerHandle, label: &str);
    fn layer_list_remove_entry(&mut self, layer: LayerHandle);
    fn layer_list_set_disabled(&mut self, layer: LayerHandle, disabled: bool);
    fn layer_list_entries(&self) -> Vec<LayerHandle>;

    // Shapes
    fn add_shape(&mut self, geometry: ShapeGeometry, title: Option<String>) -> ShapeHandle;
    fn remove_shape(&mut self, handle: ShapeHandle);
    fn shape_count(&self) -> usize;

    /// Drains every event queued since the last poll, in order.
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}
