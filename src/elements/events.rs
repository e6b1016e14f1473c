use crate::engine::PointerKind;
use crate::prelude::HashMap;
use std::collections::VecDeque;

/// Events a viewer dispatches to host listeners. Each carries the payload a
/// listener for that DOM-style event name would expect.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The map finished constructing.
    Load,
    MoveStart,
    Move { lat: f64, lon: f64 },
    MoveEnd { lat: f64, lon: f64, zoom: u8 },
    ZoomStart { zoom: u8 },
    Zoom { zoom: u8 },
    ZoomEnd { zoom: u8 },
    Pointer { kind: PointerKind, lat: f64, lon: f64, x: f64, y: f64 },
    /// A layer was checked or unchecked, whatever the cause.
    LayerChange { layer: usize, checked: bool },
    LayerLoadStart { layer: usize },
    LayerLoad { layer: usize },
    LayerError { layer: usize, message: String },
    StyleChanged { layer: usize },
    /// A layer declared content for a projection the map is not running.
    ProjectionRequest { layer: usize, projection: String },
    LabelChanged { layer: usize, label: String },
    /// An interactive area with a link was activated.
    LinkRequest { url: String },
}

impl ViewerEvent {
    /// The DOM-style event name listeners subscribe under.
    pub fn event_type(&self) -> &'static str {
        match self {
            ViewerEvent::Load => "load",
            ViewerEvent::MoveStart => "movestart",
            ViewerEvent::Move { .. } => "move",
            ViewerEvent::MoveEnd { .. } => "moveend",
            ViewerEvent::ZoomStart { .. } => "zoomstart",
            ViewerEvent::Zoom { .. } => "zoom",
            ViewerEvent::ZoomEnd { .. } => "zoomend",
            ViewerEvent::Pointer { kind, .. } => kind.event_type(),
            ViewerEvent::LayerChange { .. } => "layerchange",
            ViewerEvent::LayerLoadStart { .. } => "loadstart",
            ViewerEvent::LayerLoad { .. } => "load",
            ViewerEvent::LayerError { .. } => "error",
            ViewerEvent::StyleChanged { .. } => "changestyle",
            ViewerEvent::ProjectionRequest { .. } => "changeprojection",
            ViewerEvent::LabelChanged { .. } => "labelchanged",
            ViewerEvent::LinkRequest { .. } => "linkrequest",
        }
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&ViewerEvent) + Send + Sync>;

/// Event management system for the viewer
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event type
    listeners: HashMap<String, Vec<EventCallback>>,
    /// Event queue for processing
    event_queue: VecDeque<ViewerEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: ViewerEvent) {
        self.event_queue.push_back(event);
    }

    /// Process all queued events
    pub fn process_events(&mut self) -> Vec<ViewerEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(event.event_type()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    /// Clear all events from the queue
    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}
