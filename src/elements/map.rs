//! The `<web-map>` element itself: attribute state, the attach lifecycle,
//! engine construction and the event pump that keeps element state and
//! engine state agreeing with each other.

use crate::core::{
    history::{HistoryEntry, ViewHistory},
    projection::{ProjectionRegistry, BUILTIN_CODES},
    Bounds, LatLng, Point, Projection,
};
use crate::elements::{
    area::{MapArea, Poster},
    controls::{ControlKind, ControlSet, ControlsList},
    events::{EventManager, ViewerEvent},
    layer::MapLayer,
    lifecycle::LifecycleState,
    markup,
};
use crate::engine::{
    headless::HeadlessEngine, EngineConfig, EngineEvent, EngineFactory, LayerHandle, LayerStatus,
    MapEngine,
};
use crate::sources::LayerFetcher;
use crate::{MapError, Result};
use std::sync::Arc;

#[cfg(feature = "http")]
use crate::sources::HttpFetcher;
#[cfg(not(feature = "http"))]
use crate::sources::StaticFetcher;

/// Authored attributes of a viewer. `lat`, `lon` and `zoom` are mirrored
/// back on every move so they always describe the current view.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub projection: String,
    pub controls: bool,
    pub controlslist: ControlsList,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            lat: 0.0,
            lon: 0.0,
            zoom: 0,
            projection: "OSMTILE".to_string(),
            controls: false,
            controlslist: ControlsList::new(),
            width: None,
            height: None,
        }
    }
}

/// Projected bounds of the current view plus the zoom range the active
/// projection supports.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewExtent {
    pub bounds: Bounds,
    pub projection: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

fn default_fetcher() -> Arc<dyn LayerFetcher> {
    #[cfg(feature = "http")]
    return Arc::new(HttpFetcher::new());
    #[cfg(not(feature = "http"))]
    Arc::new(StaticFetcher::new())
}

/// Leading-integer parse in the style of HTML attribute reflection:
/// optional sign, then as many digits as are there, rest ignored.
fn parse_int_prefix(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Builder for configuring a [`MapViewer`] before it attaches anywhere.
pub struct ViewerBuilder {
    options: ViewerOptions,
    layers: Vec<MapLayer>,
    areas: Vec<MapArea>,
    poster: Option<Poster>,
    fetcher: Option<Arc<dyn LayerFetcher>>,
    engine_factory: Option<EngineFactory>,
    blocking_fetch: bool,
}

impl ViewerBuilder {
    pub fn new() -> Self {
        Self {
            options: ViewerOptions::default(),
            layers: Vec::new(),
            areas: Vec::new(),
            poster: None,
            fetcher: None,
            engine_factory: None,
            blocking_fetch: false,
        }
    }

    /// Set the initial center.
    pub fn with_center(mut self, lat: f64, lon: f64) -> Self {
        self.options.lat = lat;
        self.options.lon = lon;
        self
    }

    /// Set the initial zoom level.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.options.zoom = zoom;
        self
    }

    /// Set the projection attribute. Case is kept as authored; only an
    /// exact built-in name skips the creation signal.
    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.options.projection = projection.into();
        self
    }

    /// Enable or disable the controls attribute.
    pub fn with_controls(mut self, controls: bool) -> Self {
        self.options.controls = controls;
        self
    }

    /// Set the controlslist attribute from its text form.
    pub fn with_controlslist(mut self, value: &str) -> Self {
        self.options.controlslist = ControlsList::from_attr(value);
        self
    }

    /// Set explicit width and height attributes.
    pub fn with_dimensions(mut self, width: f64, height: f64) -> Self {
        self.options.width = Some(width);
        self.options.height = Some(height);
        self
    }

    /// Describe the poster image areas are authored against, so their
    /// pixel coordinates can be rescaled to the displayed size.
    pub fn with_poster(mut self, natural: Point, displayed: Point) -> Self {
        self.poster = Some(Poster::new(natural, displayed));
        self
    }

    /// Add a layer child.
    pub fn with_layer(mut self, layer: MapLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Add an area child.
    pub fn with_area(mut self, area: MapArea) -> Self {
        self.areas.push(area);
        self
    }

    /// Use a specific fetcher for layer documents.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn LayerFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the engine the viewer drives.
    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Resolve layer fetches inline instead of spawning them.
    pub fn with_blocking_fetch(mut self, blocking: bool) -> Self {
        self.blocking_fetch = blocking;
        self
    }

    pub fn build(self) -> MapViewer {
        let source = markup::viewer_source(&self.options, &self.layers, &self.areas);
        let factory = match self.engine_factory {
            Some(factory) => factory,
            None => {
                let fetcher = self.fetcher.unwrap_or_else(default_fetcher);
                let blocking = self.blocking_fetch;
                Box::new(move |config: EngineConfig| {
                    Box::new(HeadlessEngine::new(config, Arc::clone(&fetcher), blocking))
                        as Box<dyn MapEngine>
                })
            }
        };
        MapViewer {
            options: self.options,
            registry: ProjectionRegistry::new(),
            state: LifecycleState::Unattached,
            engine: None,
            engine_factory: factory,
            layers: self.layers,
            areas: self.areas,
            history: ViewHistory::new(),
            control_set: ControlSet::new(),
            events: EventManager::new(),
            poster: self.poster,
            source,
            resolved_size: None,
            needs_validity_check: false,
            toggle_state: false,
        }
    }
}

impl Default for ViewerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `<web-map>` viewer. Owns its attribute state, layer and area
/// children, projection registry, navigation history and listeners, and
/// drives whatever engine the factory produces once it attaches.
pub struct MapViewer {
    options: ViewerOptions,
    registry: ProjectionRegistry,
    state: LifecycleState,
    engine: Option<Box<dyn MapEngine>>,
    engine_factory: EngineFactory,
    layers: Vec<MapLayer>,
    areas: Vec<MapArea>,
    history: ViewHistory,
    control_set: ControlSet,
    events: EventManager,
    poster: Option<Poster>,
    source: String,
    resolved_size: Option<Point>,
    needs_validity_check: bool,
    toggle_state: bool,
}

impl MapViewer {
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    // ---- lifecycle -----------------------------------------------------

    /// Attach the viewer. `display_size` stands in for the measured size
    /// of the element; explicit width/height attributes win over it per
    /// dimension. Without a usable size the viewer parks until
    /// [`MapViewer::dimensions_resolved`].
    pub fn connect(&mut self, display_size: Option<Point>) {
        if self.state.is_connected() {
            return;
        }
        let width = self.options.width.or_else(|| display_size.map(|s| s.x));
        let height = self.options.height.or_else(|| display_size.map(|s| s.y));
        let size = match (width, height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Point::new(w, h),
            _ => {
                self.state = LifecycleState::AwaitingDimensions;
                return;
            }
        };
        self.resolved_size = Some(size);
        self.state = LifecycleState::AwaitingSignal;
        self.signal_or_wait();
    }

    /// Supply the size that was missing at attach time.
    pub fn dimensions_resolved(&mut self, size: Point) {
        if self.state != LifecycleState::AwaitingDimensions {
            return;
        }
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        self.resolved_size = Some(size);
        self.state = LifecycleState::AwaitingSignal;
        self.signal_or_wait();
    }

    // Built-in projections create immediately; custom ones wait for
    // create_map() once the projection has been defined.
    fn signal_or_wait(&mut self) {
        if BUILTIN_CODES.contains(&self.options.projection.as_str()) {
            if let Some(projection) = self.registry.get(&self.options.projection) {
                self.construct_engine(projection);
            }
        }
    }

    /// The creation signal for viewers whose projection is not one of the
    /// built-in names. A no-op unless the viewer is waiting for it.
    pub fn create_map(&mut self) -> Result<()> {
        if self.state != LifecycleState::AwaitingSignal {
            return Ok(());
        }
        let projection = self
            .registry
            .get(&self.options.projection)
            .ok_or_else(|| MapError::UndefinedProjection(self.options.projection.clone()))?;
        self.construct_engine(projection);
        Ok(())
    }

    fn construct_engine(&mut self, projection: Arc<Projection>) {
        if self.state != LifecycleState::AwaitingSignal {
            return;
        }
        let Some(size) = self.resolved_size else {
            return;
        };
        self.state = LifecycleState::EngineConstructed;
        let config = EngineConfig {
            center: LatLng::new(self.options.lat, self.options.lon),
            zoom: projection.clamp_zoom(self.options.zoom),
            projection: Arc::clone(&projection),
            size,
        };
        let mut engine = (self.engine_factory)(config);
        self.options.zoom = engine.zoom();
        // the creation view joins whatever trail survived a previous attach
        self.history
            .record(HistoryEntry::new(engine.zoom(), engine.center()));
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let was_attached = layer.is_attached();
            layer.attach(engine.as_mut(), index as i32);
            if !was_attached && layer.is_attached() {
                self.events.emit(ViewerEvent::LayerLoadStart { layer: index });
            }
        }
        let poster = self.poster;
        for area in self.areas.iter_mut() {
            area.attach(engine.as_mut(), poster.as_ref());
        }
        self.engine = Some(engine);
        self.apply_controls(None, true);
        self.state = LifecycleState::Active;
        log::info!(
            "map created: {} zoom {} at ({:.4}, {:.4})",
            self.options.projection,
            self.options.zoom,
            self.options.lat,
            self.options.lon
        );
    }

    /// Detach the viewer. Attributes, listeners and the history trail all
    /// survive; only the engine and anything mounted on it go away.
    pub fn disconnect(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            for layer in self.layers.iter_mut() {
                layer.detach(engine.as_mut());
            }
            for area in self.areas.iter_mut() {
                area.detach(engine.as_mut());
            }
        }
        self.control_set.clear();
        self.engine = None;
        self.resolved_size = None;
        // Anything queued but not yet dispatched belonged to the torn-down
        // engine; listeners and history survive for the next attach.
        self.events.clear_events();
        self.state = LifecycleState::Unattached;
    }

    // ---- attribute reflection ------------------------------------------

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn lat(&self) -> f64 {
        self.options.lat
    }

    pub fn lon(&self) -> f64 {
        self.options.lon
    }

    pub fn zoom(&self) -> u8 {
        self.options.zoom
    }

    pub fn projection(&self) -> &str {
        &self.options.projection
    }

    pub fn controls(&self) -> bool {
        self.options.controls
    }

    pub fn controlslist(&self) -> &ControlsList {
        &self.options.controlslist
    }

    /// Set the latitude attribute. Non-finite values are ignored; the
    /// attribute is the initial view, so a live map does not move.
    pub fn set_lat(&mut self, lat: f64) {
        if lat.is_finite() {
            self.options.lat = lat;
        }
    }

    /// Set the longitude attribute. Non-finite values are ignored.
    pub fn set_lon(&mut self, lon: f64) {
        if lon.is_finite() {
            self.options.lon = lon;
        }
    }

    /// Set the zoom attribute. Values outside 0..=25 are ignored.
    pub fn set_zoom(&mut self, zoom: i32) {
        if (0..=25).contains(&zoom) {
            self.options.zoom = zoom as u8;
        }
    }

    /// Set the zoom attribute from its text form. "4.9" and "12px" take
    /// their leading integer; anything without one is ignored.
    pub fn set_zoom_attr(&mut self, value: &str) {
        if let Some(zoom) = parse_int_prefix(value) {
            if (0..=25).contains(&zoom) {
                self.options.zoom = zoom as u8;
            }
        }
    }

    /// Switch the viewer to a registered projection. On a live map every
    /// layer is detached and immediately reattached so it renegotiates its
    /// content against the new grid; the view itself stays put. A viewer
    /// still waiting for its creation signal creates instead.
    pub fn set_projection(&mut self, projection: &str) -> Result<()> {
        let resolved = self
            .registry
            .get(projection)
            .ok_or_else(|| MapError::UndefinedProjection(projection.to_string()))?;
        self.options.projection = resolved.code.clone();
        if let Some(engine) = self.engine.as_mut() {
            if engine.projection().code != resolved.code {
                engine.set_projection(Arc::clone(&resolved));
                for (index, layer) in self.layers.iter_mut().enumerate() {
                    layer.set_disabled(false);
                    layer.detach(engine.as_mut());
                    layer.attach(engine.as_mut(), index as i32);
                    if layer.is_attached() {
                        self.events.emit(ViewerEvent::LayerLoadStart { layer: index });
                    }
                }
                self.needs_validity_check = true;
            }
        } else if self.state == LifecycleState::AwaitingSignal {
            self.create_map()?;
        }
        Ok(())
    }

    /// Register a custom TCRS definition from its JSON form and return
    /// the name layers should reference it by.
    pub fn define_custom_projection(&mut self, json: &str) -> Result<String> {
        let template = serde_json::from_str(json)?;
        self.registry.register(template)
    }

    // ---- controls ------------------------------------------------------

    /// Flip the controls attribute. Turning it off removes every mounted
    /// control; turning it on rebuilds them.
    pub fn set_controls(&mut self, controls: bool) {
        self.options.controls = controls;
        if self.engine.is_none() {
            return;
        }
        if controls {
            self.apply_controls(None, false);
        } else {
            self.remove_all_controls();
        }
    }

    /// Hide or rebuild the mounted controls without touching the
    /// attribute. Alternates starting with hide.
    pub fn toggle_controls(&mut self) {
        if !self.state.has_engine() {
            return;
        }
        let show = self.toggle_state;
        self.toggle_state = !self.toggle_state;
        self.apply_controls(Some(show), false);
    }

    /// Append one controlslist token. Unknown or already present tokens
    /// are rejected.
    pub fn add_controlslist_token(&mut self, token: &str) -> bool {
        if !self.options.controlslist.add_token(token) {
            return false;
        }
        self.apply_controls(None, false);
        true
    }

    /// Replace the controlslist attribute wholesale.
    pub fn set_controlslist(&mut self, value: &str) {
        self.options.controlslist = ControlsList::from_attr(value);
        self.apply_controls(None, false);
    }

    // Mount pass shared by creation, controlslist changes and toggling.
    // Zoom, reload and fullscreen are rebuilt every time; the layer list
    // survives so its entries outlive controlslist changes. Controls
    // stack downward until the next one no longer fits the map height.
    fn apply_controls(&mut self, toggle: Option<bool>, initial_setup: bool) {
        if !self.options.controls || self.engine.is_none() {
            return;
        }
        if toggle == Some(false) {
            self.remove_all_controls();
            return;
        }
        let list = self.options.controlslist;
        for kind in [ControlKind::Zoom, ControlKind::Reload, ControlKind::Fullscreen] {
            if let Some(handle) = self.control_set.take(kind) {
                if let Some(engine) = self.engine.as_mut() {
                    engine.remove_control(handle);
                }
            }
        }
        if list.excludes(ControlKind::LayerList) {
            if let Some(handle) = self.control_set.take(ControlKind::LayerList) {
                if let Some(engine) = self.engine.as_mut() {
                    engine.remove_control(handle);
                }
            }
        } else if self.control_set.get(ControlKind::LayerList).is_none() && !self.layers.is_empty()
        {
            let Some(engine) = self.engine.as_mut() else {
                return;
            };
            let handle = engine.add_control(ControlKind::LayerList);
            self.control_set.set(ControlKind::LayerList, handle);
            if !initial_setup {
                self.restore_layer_entries();
            }
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let available = engine.size().y;
        let mut used = 0.0;
        for kind in [ControlKind::Zoom, ControlKind::Reload, ControlKind::Fullscreen] {
            if list.excludes(kind) {
                continue;
            }
            if used + kind.bar_height() <= available {
                used += kind.bar_height();
                let handle = engine.add_control(kind);
                self.control_set.set(kind, handle);
            }
        }
    }

    fn remove_all_controls(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for kind in [
            ControlKind::LayerList,
            ControlKind::Zoom,
            ControlKind::Reload,
            ControlKind::Fullscreen,
        ] {
            if let Some(handle) = self.control_set.take(kind) {
                engine.remove_control(handle);
            }
        }
    }

    // Loaded, non-hidden layers get their entries back when the layer
    // list is recreated after having been removed.
    fn restore_layer_entries(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for layer in &self.layers {
            if layer.hidden() {
                continue;
            }
            let Some(handle) = layer.handle() else {
                continue;
            };
            if engine.layer_status(handle) != Some(LayerStatus::Loaded) {
                continue;
            }
            engine.layer_list_add_entry(handle, layer.label());
            engine.layer_list_set_disabled(handle, layer.disabled());
        }
    }

    // ---- navigation ----------------------------------------------------

    /// Step back through the location trail.
    pub fn back(&mut self) {
        if self.engine.is_none() {
            return;
        }
        if let Some(entry) = self.history.back() {
            if let Some(engine) = self.engine.as_mut() {
                engine.set_view(entry.center, entry.zoom);
            }
        }
    }

    /// Step forward through the location trail.
    pub fn forward(&mut self) {
        if self.engine.is_none() {
            return;
        }
        if let Some(entry) = self.history.forward() {
            if let Some(engine) = self.engine.as_mut() {
                engine.set_view(entry.center, entry.zoom);
            }
        }
    }

    /// Return to the first recorded view and forget the rest of the trail.
    pub fn reload(&mut self) {
        if self.engine.is_none() {
            return;
        }
        if let Some(entry) = self.history.reload() {
            if let Some(engine) = self.engine.as_mut() {
                engine.set_view(entry.center, entry.zoom);
            }
        }
    }

    /// Move the view. Attributes mirror the settled state immediately.
    pub fn zoom_to(&mut self, lat: f64, lon: f64, zoom: u8) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.set_view(LatLng::new(lat, lon), zoom);
        let center = engine.center();
        self.options.lat = center.lat;
        self.options.lon = center.lng;
        self.options.zoom = engine.zoom();
    }

    /// Resize the map. While parked for dimensions this doubles as the
    /// missing measurement.
    pub fn resize(&mut self, size: Point) {
        self.options.width = Some(size.x);
        self.options.height = Some(size.y);
        if self.state == LifecycleState::AwaitingDimensions {
            self.dimensions_resolved(size);
            return;
        }
        self.resolved_size = Some(size);
        if let Some(engine) = self.engine.as_mut() {
            engine.resize(size);
            self.needs_validity_check = true;
        }
    }

    /// Projected bounds of the current view, if a map is running.
    pub fn extent(&self) -> Option<ViewExtent> {
        let engine = self.engine.as_ref()?;
        let projection = engine.projection();
        Some(ViewExtent {
            bounds: engine.pcrs_bounds()?,
            projection: projection.code.clone(),
            min_zoom: 0,
            max_zoom: projection.max_zoom(),
        })
    }

    /// The markup the viewer was authored as.
    pub fn view_source(&self) -> &str {
        &self.source
    }

    pub fn history(&self) -> &ViewHistory {
        &self.history
    }

    // ---- drag and drop -------------------------------------------------

    /// Whether a drag carrying these content types may drop here.
    pub fn accepts_drop(&self, types: &[&str]) -> bool {
        types.iter().any(|t| *t == "text/uri-list")
    }

    /// Drop a URL onto the map: appends a checked layer labelled "Layer"
    /// that removes itself again if its document fails to load.
    pub fn handle_drop(&mut self, text: &str) -> Option<usize> {
        let url = text.trim();
        if url.is_empty() {
            return None;
        }
        let mut layer = MapLayer::new(url).with_label("Layer").with_checked(true);
        layer.mark_remove_on_error();
        Some(self.append_layer(layer))
    }

    // ---- layer children ------------------------------------------------

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&MapLayer> {
        self.layers.get(index)
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    /// Append a layer child; on a live map it starts loading right away.
    pub fn append_layer(&mut self, layer: MapLayer) -> usize {
        let index = self.layers.len();
        self.layers.push(layer);
        self.attach_layer_at(index);
        index
    }

    /// Insert a layer child, shifting paint order below it.
    pub fn insert_layer(&mut self, index: usize, layer: MapLayer) -> usize {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.attach_layer_at(index);
        self.reindex_layers();
        index
    }

    /// Remove a layer child and everything it put on the map.
    pub fn remove_layer_at(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        if let Some(engine) = self.engine.as_mut() {
            self.layers[index].detach(engine.as_mut());
        }
        self.layers.remove(index);
        self.reindex_layers();
        true
    }

    /// Check or uncheck a layer. On a live map the change round-trips
    /// through the engine, so `checked` and the layerchange event follow
    /// on the next pump, same as a control-driven toggle.
    pub fn set_layer_checked(&mut self, index: usize, checked: bool) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        let handle = self.layers[index].handle();
        let opacity = self.layers[index].opacity();
        if let (Some(handle), Some(engine)) = (handle, self.engine.as_mut()) {
            if checked {
                engine.add_layer(handle, index as i32, opacity);
            } else {
                engine.remove_layer(handle);
            }
        } else {
            self.layers[index].set_checked_raw(checked);
        }
        true
    }

    /// Hide or show a layer in the layer list. Hidden only governs list
    /// membership; the layer keeps rendering.
    pub fn set_layer_hidden(&mut self, index: usize, hidden: bool) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        self.layers[index].set_hidden_raw(hidden);
        let Some(handle) = self.layers[index].handle() else {
            return true;
        };
        if self.control_set.get(ControlKind::LayerList).is_none() {
            return true;
        }
        let disabled = self.layers[index].disabled();
        if let Some(engine) = self.engine.as_mut() {
            if hidden {
                engine.layer_list_remove_entry(handle);
            } else if engine.layer_status(handle) == Some(LayerStatus::Loaded) {
                engine.layer_list_add_entry(handle, self.layers[index].label());
                engine.layer_list_set_disabled(handle, disabled);
            }
        }
        true
    }

    /// Relabel a layer, renaming its list entry in place.
    pub fn set_layer_label(&mut self, index: usize, label: &str) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        self.layers[index].set_label_attr(Some(label.to_string()));
        let resolved = self.layers[index].label().to_string();
        if let Some(handle) = self.layers[index].handle() {
            if self.control_set.get(ControlKind::LayerList).is_some()
                && !self.layers[index].hidden()
            {
                if let Some(engine) = self.engine.as_mut() {
                    if engine.layer_status(handle) == Some(LayerStatus::Loaded) {
                        engine.layer_list_add_entry(handle, &resolved);
                    }
                }
            }
        }
        self.events.emit(ViewerEvent::LabelChanged {
            layer: index,
            label: resolved,
        });
        true
    }

    /// Point a layer at a different document. The old content is torn
    /// down and the new document fetched fresh.
    pub fn set_layer_src(&mut self, index: usize, src: &str) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        if let Some(engine) = self.engine.as_mut() {
            self.layers[index].detach(engine.as_mut());
        }
        self.layers[index].set_src_raw(Some(src.to_string()));
        self.attach_layer_at(index);
        true
    }

    /// Change a layer's opacity, pushing it through live when checked.
    pub fn set_layer_opacity(&mut self, index: usize, opacity: f64) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        self.layers[index].set_opacity_raw(opacity);
        let handle = self.layers[index].handle();
        let checked = self.layers[index].checked();
        let opacity = self.layers[index].opacity();
        if let (Some(handle), Some(engine), true) = (handle, self.engine.as_mut(), checked) {
            engine.add_layer(handle, index as i32, opacity);
        }
        true
    }

    fn attach_layer_at(&mut self, index: usize) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let layer = &mut self.layers[index];
        let was_attached = layer.is_attached();
        layer.attach(engine.as_mut(), index as i32);
        if !was_attached && layer.is_attached() {
            self.events.emit(ViewerEvent::LayerLoadStart { layer: index });
        }
    }

    // Re-register checked layers so z-order tracks document order again.
    fn reindex_layers(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for (index, layer) in self.layers.iter().enumerate() {
            if !layer.checked() {
                continue;
            }
            let Some(handle) = layer.handle() else {
                continue;
            };
            if engine.is_layer_registered(handle) {
                engine.add_layer(handle, index as i32, layer.opacity());
            }
        }
    }

    fn layer_index(&self, handle: LayerHandle) -> Option<usize> {
        self.layers.iter().position(|l| l.handle() == Some(handle))
    }

    // ---- area children -------------------------------------------------

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn area(&self, index: usize) -> Option<&MapArea> {
        self.areas.get(index)
    }

    pub fn areas(&self) -> &[MapArea] {
        &self.areas
    }

    /// Append an area child; on a live map its shape mounts right away.
    pub fn append_area(&mut self, mut area: MapArea) -> usize {
        if let Some(engine) = self.engine.as_mut() {
            let poster = self.poster;
            area.attach(engine.as_mut(), poster.as_ref());
        }
        self.areas.push(area);
        self.areas.len() - 1
    }

    /// Remove an area child and its shape.
    pub fn remove_area_at(&mut self, index: usize) -> bool {
        if index >= self.areas.len() {
            return false;
        }
        if let Some(engine) = self.engine.as_mut() {
            self.areas[index].detach(engine.as_mut());
        }
        self.areas.remove(index);
        true
    }

    // ---- events --------------------------------------------------------

    /// Register a listener for a DOM-style event name.
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        self.events.on(event_type, callback);
    }

    /// Drain engine events, fold them into element state, and dispatch
    /// the resulting viewer events to listeners. Returns what was
    /// dispatched, in order.
    pub fn pump(&mut self) -> Vec<ViewerEvent> {
        let engine_events = match self.engine.as_mut() {
            Some(engine) => engine.poll_events(),
            None => Vec::new(),
        };
        for event in engine_events {
            self.apply_engine_event(event);
        }
        if self.needs_validity_check {
            self.needs_validity_check = false;
            self.run_validity_checks();
        }
        self.events.process_events()
    }

    fn apply_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Load => self.events.emit(ViewerEvent::Load),
            EngineEvent::MoveStart => self.events.emit(ViewerEvent::MoveStart),
            EngineEvent::Move { center } => {
                self.options.lat = center.lat;
                self.options.lon = center.lng;
                self.events.emit(ViewerEvent::Move {
                    lat: center.lat,
                    lon: center.lng,
                });
            }
            EngineEvent::MoveEnd { center, zoom } => {
                self.options.lat = center.lat;
                self.options.lon = center.lng;
                self.options.zoom = zoom;
                self.history.record(HistoryEntry::new(zoom, center));
                self.needs_validity_check = true;
                self.events.emit(ViewerEvent::MoveEnd {
                    lat: center.lat,
                    lon: center.lng,
                    zoom,
                });
            }
            EngineEvent::ZoomStart { zoom } => {
                self.events.emit(ViewerEvent::ZoomStart { zoom })
            }
            EngineEvent::Zoom { zoom } => {
                self.options.zoom = zoom;
                self.events.emit(ViewerEvent::Zoom { zoom });
            }
            EngineEvent::ZoomEnd { zoom } => {
                self.options.zoom = zoom;
                self.events.emit(ViewerEvent::ZoomEnd { zoom });
            }
            EngineEvent::Pointer {
                kind,
                position,
                pixel,
            } => {
                self.events.emit(ViewerEvent::Pointer {
                    kind,
                    lat: position.lat,
                    lon: position.lng,
                    x: pixel.x,
                    y: pixel.y,
                });
            }
            EngineEvent::LayerLoaded { layer } => self.on_layer_loaded(layer),
            EngineEvent::LayerFailed { layer, message } => self.on_layer_failed(layer, message),
            EngineEvent::LayerAdded { layer } => {
                if let Some(index) = self.layer_index(layer) {
                    self.layers[index].set_checked_raw(true);
                    self.needs_validity_check = true;
                    self.events.emit(ViewerEvent::LayerChange {
                        layer: index,
                        checked: true,
                    });
                }
            }
            EngineEvent::LayerRemoved { layer } => {
                if let Some(index) = self.layer_index(layer) {
                    self.layers[index].set_checked_raw(false);
                    self.events.emit(ViewerEvent::LayerChange {
                        layer: index,
                        checked: false,
                    });
                }
            }
            EngineEvent::LayerStyleChanged { layer } => {
                if let Some(index) = self.layer_index(layer) {
                    self.events.emit(ViewerEvent::StyleChanged { layer: index });
                }
            }
            EngineEvent::ShapeClicked { shape } => {
                let url = self
                    .areas
                    .iter()
                    .find(|a| a.handle() == Some(shape))
                    .and_then(|a| a.href())
                    .map(|href| href.to_string());
                if let Some(url) = url {
                    self.events.emit(ViewerEvent::LinkRequest { url });
                }
            }
        }
    }

    fn on_layer_loaded(&mut self, handle: LayerHandle) {
        let Some(index) = self.layer_index(handle) else {
            return;
        };
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let title = engine.layer_title(handle);
        let declared = engine.layer_projection(handle);
        let running = engine.projection().code.clone();
        self.layers[index].set_title(title);
        if let Some(declared) = declared {
            // content for some other projection: ask the host to switch
            if !declared.eq_ignore_ascii_case(&running) {
                self.events.emit(ViewerEvent::ProjectionRequest {
                    layer: index,
                    projection: declared,
                });
            }
        }
        if self.control_set.get(ControlKind::LayerList).is_some() && !self.layers[index].hidden() {
            if let Some(engine) = self.engine.as_mut() {
                engine.layer_list_add_entry(handle, self.layers[index].label());
            }
        }
        self.needs_validity_check = true;
        self.events.emit(ViewerEvent::LayerLoad { layer: index });
    }

    fn on_layer_failed(&mut self, handle: LayerHandle, message: String) {
        let Some(index) = self.layer_index(handle) else {
            return;
        };
        self.events.emit(ViewerEvent::LayerError {
            layer: index,
            message,
        });
        if self.layers[index].remove_on_error() {
            // dropped layers that never load take themselves back out
            if let Some(engine) = self.engine.as_mut() {
                self.layers[index].detach(engine.as_mut());
            }
            self.layers.remove(index);
            self.reindex_layers();
        }
    }

    // A loaded layer is disabled when its declared projection disagrees
    // with the map, or every piece of its content has fallen out of the
    // current view. Checked in two phases so engine reads finish before
    // any state is written back.
    fn run_validity_checks(&mut self) {
        let mut updates: Vec<(usize, bool)> = Vec::new();
        {
            let Some(engine) = self.engine.as_ref() else {
                return;
            };
            let view = engine.view_state();
            for (index, layer) in self.layers.iter().enumerate() {
                let Some(handle) = layer.handle() else {
                    continue;
                };
                if engine.layer_status(handle) != Some(LayerStatus::Loaded) {
                    continue;
                }
                let mismatched = engine
                    .layer_projection(handle)
                    .map(|declared| !declared.eq_ignore_ascii_case(&view.projection))
                    .unwrap_or(false);
                let sublayers = engine.sublayers(handle);
                let all_out = !sublayers.is_empty() && sublayers.iter().all(|s| !s.in_view(&view));
                let disabled = mismatched || all_out;
                if disabled != layer.disabled() {
                    updates.push((index, disabled));
                }
            }
        }
        for (index, disabled) in updates {
            self.layers[index].set_disabled(disabled);
            let handle = self.layers[index].handle();
            if let (Some(engine), Some(handle)) = (self.engine.as_mut(), handle) {
                engine.layer_list_set_disabled(handle, disabled);
            }
        }
    }

    // ---- engine access -------------------------------------------------

    pub fn engine(&self) -> Option<&dyn MapEngine> {
        self.engine.as_deref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut (dyn MapEngine + 'static)> {
        self.engine.as_deref_mut()
    }
}
