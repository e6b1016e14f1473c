use super::sublayer::{self, BoundsCheck, ViewState};
use super::{
    ControlHandle, EngineConfig, EngineEvent, LayerHandle, LayerStatus, MapEngine, PointerKind,
    ShapeGeometry, ShapeHandle,
};
use crate::core::{bounds::Bounds, geo::LatLng, geo::Point, projection::Projection};
use crate::elements::controls::ControlKind;
use crate::prelude::HashMap;
use crate::sources::{LayerDocument, LayerFetcher};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

struct LayerRecord {
    src: String,
    status: LayerStatus,
    document: Option<LayerDocument>,
    sublayers: Vec<Box<dyn BoundsCheck + Send + Sync>>,
    registered: bool,
    z_index: i32,
    opacity: f64,
    failure: Option<String>,
}

impl LayerRecord {
    fn new(src: String) -> Self {
        Self {
            src,
            status: LayerStatus::Loading,
            document: None,
            sublayers: Vec::new(),
            registered: false,
            z_index: 0,
            opacity: 1.0,
            failure: None,
        }
    }
}

struct ShapeRecord {
    geometry: ShapeGeometry,
    title: Option<String>,
}

/// Engine that keeps full view and layer state without rendering anything.
///
/// Fetch results arrive on an internal channel and are folded into layer
/// records on the next [`MapEngine::poll_events`] call, so event order seen
/// by the viewer is deterministic. With `blocking_fetch` set fetches run
/// inline on the calling thread; otherwise they are spawned on the ambient
/// tokio runtime when one exists, or a detached thread when not.
pub struct HeadlessEngine {
    projection: Arc<Projection>,
    center: LatLng,
    zoom: u8,
    size: Point,
    layers: HashMap<LayerHandle, LayerRecord>,
    controls: HashMap<ControlHandle, ControlKind>,
    entries: Vec<(LayerHandle, String, bool)>,
    shapes: HashMap<ShapeHandle, ShapeRecord>,
    queue: VecDeque<EngineEvent>,
    results_tx: Sender<(LayerHandle, crate::Result<LayerDocument>)>,
    results_rx: Receiver<(LayerHandle, crate::Result<LayerDocument>)>,
    next_handle: u64,
    fetcher: Arc<dyn LayerFetcher>,
    blocking_fetch: bool,
}

impl HeadlessEngine {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn LayerFetcher>, blocking_fetch: bool) -> Self {
        let (results_tx, results_rx) = unbounded();
        let zoom = config.projection.clamp_zoom(config.zoom);
        let mut queue = VecDeque::new();
        queue.push_back(EngineEvent::Load);
        log::debug!(
            "headless engine up: {} zoom {} at ({:.4}, {:.4})",
            config.projection.code,
            zoom,
            config.center.lat,
            config.center.lng
        );
        Self {
            projection: config.projection,
            center: config.center,
            zoom,
            size: config.size,
            layers: HashMap::default(),
            controls: HashMap::default(),
            entries: Vec::new(),
            shapes: HashMap::default(),
            queue,
            results_tx,
            results_rx,
            next_handle: 1,
            fetcher,
            blocking_fetch,
        }
    }

    fn alloc_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn spawn_fetch(&self, handle: LayerHandle, src: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.results_tx.clone();
        log::debug!("fetch layer {:?} from {}", handle, src);

        if self.blocking_fetch {
            let result = futures::executor::block_on(fetcher.fetch(&src));
            let _ = tx.send((handle, result));
            return;
        }

        #[cfg(feature = "tokio-runtime")]
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let result = fetcher.fetch(&src).await;
                let _ = tx.send((handle, result));
            });
            return;
        }

        std::thread::spawn(move || {
            let result = futures::executor::block_on(fetcher.fetch(&src));
            let _ = tx.send((handle, result));
        });
    }

    fn drain_fetch_results(&mut self) {
        let results: Vec<_> = self.results_rx.try_iter().collect();
        for (handle, result) in results {
            let Some(record) = self.layers.get_mut(&handle) else {
                // Layer was destroyed while its fetch was in flight.
                continue;
            };
            match result {
                Ok(doc) => {
                    log::info!("layer {:?} loaded from {}", handle, record.src);
                    record.status = LayerStatus::Loaded;
                    record.sublayers = sublayer::from_document(&doc);
                    record.document = Some(doc);
                    record.failure = None;
                    self.queue.push_back(EngineEvent::LayerLoaded { layer: handle });
                }
                Err(e) => {
                    let message = e.to_string();
                    log::warn!("layer {:?} failed: {}", handle, message);
                    record.status = LayerStatus::Failed;
                    record.failure = Some(message.clone());
                    self.queue
                        .push_back(EngineEvent::LayerFailed { layer: handle, message });
                }
            }
        }
    }

    fn position_at(&self, pixel: Point) -> Option<LatLng> {
        let resolution = self.projection.resolution(self.zoom)?;
        let center = self.projection.project(&self.center)?;
        let delta = pixel.subtract(&self.size.multiply(0.5));
        self.projection
            .unproject(&center.add(&delta.to_pcrs_offset(resolution)))
    }

    /// Simulates a pointer gesture at a displayed pixel position.
    pub fn fire_pointer(&mut self, kind: PointerKind, pixel: Point) {
        let position = self.position_at(pixel).unwrap_or(self.center);
        self.queue.push_back(EngineEvent::Pointer {
            kind,
            position,
            pixel,
        });
    }

    /// Simulates the user toggling a layer-list checkbox.
    pub fn toggle_overlay(&mut self, handle: LayerHandle) {
        let Some(record) = self.layers.get(&handle) else {
            return;
        };
        if record.registered {
            self.remove_layer(handle);
        } else {
            let (z_index, opacity) = (record.z_index, record.opacity);
            self.add_layer(handle, z_index, opacity);
        }
    }

    /// Simulates the user choosing an alternate style for a layer.
    pub fn select_style(&mut self, handle: LayerHandle) {
        if self.layers.contains_key(&handle) {
            self.queue
                .push_back(EngineEvent::LayerStyleChanged { layer: handle });
        }
    }

    /// Simulates a click landing on an interactive shape.
    pub fn click_shape(&mut self, handle: ShapeHandle) {
        if self.shapes.contains_key(&handle) {
            self.queue
                .push_back(EngineEvent::ShapeClicked { shape: handle });
        }
    }

    pub fn shape_title(&self, handle: ShapeHandle) -> Option<&str> {
        self.shapes.get(&handle).and_then(|s| s.title.as_deref())
    }

    pub fn shape_geometry(&self, handle: ShapeHandle) -> Option<&ShapeGeometry> {
        self.shapes.get(&handle).map(|s| &s.geometry)
    }

    pub fn layer_src(&self, handle: LayerHandle) -> Option<&str> {
        self.layers.get(&handle).map(|r| r.src.as_str())
    }

    pub fn layer_z_index(&self, handle: LayerHandle) -> Option<i32> {
        self.layers.get(&handle).map(|r| r.z_index)
    }

    pub fn layer_opacity(&self, handle: LayerHandle) -> Option<f64> {
        self.layers.get(&handle).map(|r| r.opacity)
    }

    pub fn layer_failure(&self, handle: LayerHandle) -> Option<&str> {
        self.layers.get(&handle).and_then(|r| r.failure.as_deref())
    }

    pub fn control_kinds(&self) -> Vec<ControlKind> {
        self.controls.values().copied().collect()
    }

    pub fn entry_disabled(&self, handle: LayerHandle) -> Option<bool> {
        self.entries
            .iter()
            .find(|(h, _, _)| *h == handle)
            .map(|(_, _, disabled)| *disabled)
    }

    pub fn entry_label(&self, handle: LayerHandle) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _, _)| *h == handle)
            .map(|(_, label, _)| label.as_str())
    }
}

impl MapEngine for HeadlessEngine {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn projection(&self) -> Arc<Projection> {
        Arc::clone(&self.projection)
    }

    fn set_projection(&mut self, projection: Arc<Projection>) {
        self.projection = projection;
        self.zoom = self.projection.clamp_zoom(self.zoom);
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn size(&self) -> Point {
        self.size
    }

    fn resize(&mut self, size: Point) {
        self.size = size;
    }

    fn pcrs_bounds(&self) -> Option<Bounds> {
        let resolution = self.projection.resolution(self.zoom)?;
        let center = self.projection.project(&self.center)?;
        Some(Bounds::from_center_and_size(
            center,
            self.size.x * resolution,
            self.size.y * resolution,
        ))
    }

    fn view_state(&self) -> ViewState {
        ViewState {
            projection: self.projection.code.clone(),
            zoom: self.zoom,
            bounds: self.pcrs_bounds(),
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        let zoom = self.projection.clamp_zoom(zoom);
        let zoom_changed = zoom != self.zoom;
        let old_zoom = self.zoom;

        self.queue.push_back(EngineEvent::MoveStart);
        if zoom_changed {
            self.queue.push_back(EngineEvent::ZoomStart { zoom: old_zoom });
        }
        self.center = center;
        self.zoom = zoom;
        self.queue.push_back(EngineEvent::Move { center });
        if zoom_changed {
            self.queue.push_back(EngineEvent::Zoom { zoom });
            self.queue.push_back(EngineEvent::ZoomEnd { zoom });
        }
        self.queue.push_back(EngineEvent::MoveEnd { center, zoom });
    }

    fn pan_by(&mut self, offset: Point) {
        let center = match self
            .projection
            .resolution(self.zoom)
            .zip(self.projection.project(&self.center))
        {
            Some((resolution, pcrs)) => {
                let shifted = pcrs.add(&offset.to_pcrs_offset(resolution));
                self.projection.unproject(&shifted).unwrap_or(self.center)
            }
            None => self.center,
        };
        self.set_view(center, self.zoom);
    }

    fn create_layer(&mut self, src: &str) -> LayerHandle {
        let handle = LayerHandle(self.alloc_handle());
        self.layers.insert(handle, LayerRecord::new(src.to_string()));
        self.spawn_fetch(handle, src.to_string());
        handle
    }

    fn destroy_layer(&mut self, handle: LayerHandle) {
        if let Some(record) = self.layers.remove(&handle) {
            if record.registered {
                self.queue.push_back(EngineEvent::LayerRemoved { layer: handle });
            }
            self.entries.retain(|(h, _, _)| *h != handle);
        }
    }

    fn add_layer(&mut self, handle: LayerHandle, z_index: i32, opacity: f64) {
        if let Some(record) = self.layers.get_mut(&handle) {
            record.z_index = z_index;
            record.opacity = opacity;
            if !record.registered {
                record.registered = true;
                self.queue.push_back(EngineEvent::LayerAdded { layer: handle });
            }
        }
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        if let Some(record) = self.layers.get_mut(&handle) {
            if record.registered {
                record.registered = false;
                self.queue.push_back(EngineEvent::LayerRemoved { layer: handle });
            }
        }
    }

    fn is_layer_registered(&self, handle: LayerHandle) -> bool {
        self.layers.get(&handle).map(|r| r.registered).unwrap_or(false)
    }

    fn layer_status(&self, handle: LayerHandle) -> Option<LayerStatus> {
        self.layers.get(&handle).map(|r| r.status)
    }

    fn layer_title(&self, handle: LayerHandle) -> Option<String> {
        self.layers
            .get(&handle)
            .and_then(|r| r.document.as_ref())
            .and_then(|d| d.title.clone())
    }

    fn layer_projection(&self, handle: LayerHandle) -> Option<String> {
        self.layers
            .get(&handle)
            .and_then(|r| r.document.as_ref())
            .and_then(|d| d.projection.clone())
    }

    fn sublayers(&self, handle: LayerHandle) -> Vec<&dyn BoundsCheck> {
        self.layers
            .get(&handle)
            .map(|r| r.sublayers.iter().map(|s| s.as_ref() as &dyn BoundsCheck).collect())
            .unwrap_or_default()
    }

    fn add_control(&mut self, kind: ControlKind) -> ControlHandle {
        let handle = ControlHandle(self.alloc_handle());
        self.controls.insert(handle, kind);
        handle
    }

    fn remove_control(&mut self, handle: ControlHandle) {
        if let Some(kind) = self.controls.remove(&handle) {
            if kind == ControlKind::LayerList {
                self.entries.clear();
            }
        }
    }

    fn layer_list_add_entry(&mut self, layer: LayerHandle, label: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(h, _, _)| *h == layer) {
            entry.1 = label.to_string();
        } else {
            self.entries.push((layer, label.to_string(), false));
        }
    }

    fn layer_list_remove_entry(&mut self, layer: LayerHandle) {
        self.entries.retain(|(h, _, _)| *h != layer);
    }

    fn layer_list_set_disabled(&mut self, layer: LayerHandle, disabled: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|(h, _, _)| *h == layer) {
            entry.2 = disabled;
        }
    }

    fn layer_list_entries(&self) -> Vec<LayerHandle> {
        self.entries.iter().map(|(h, _, _)| *h).collect()
    }

    fn add_shape(&mut self, geometry: ShapeGeometry, title: Option<String>) -> ShapeHandle {
        let handle = ShapeHandle(self.alloc_handle());
        self.shapes.insert(handle, ShapeRecord { geometry, title });
        handle
    }

    fn remove_shape(&mut self, handle: ShapeHandle) {
        self.shapes.remove(&handle);
    }

    fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.drain_fetch_results();
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StaticFetcher;

    fn engine() -> HeadlessEngine {
        engine_with_fetcher(StaticFetcher::new())
    }

    fn engine_with_fetcher(fetcher: StaticFetcher) -> HeadlessEngine {
        let config = EngineConfig {
            center: LatLng::new(45.0, -75.0),
            zoom: 4,
            projection: Arc::new(Projection::osmtile()),
            size: Point::new(800.0, 600.0),
        };
        HeadlessEngine::new(config, Arc::new(fetcher), true)
    }

    #[test]
    fn test_reports_load_on_first_poll() {
        let mut engine = engine();
        let events = engine.poll_events();
        assert_eq!(events, vec![EngineEvent::Load]);
        assert!(engine.poll_events().is_empty());
    }

    #[test]
    fn test_set_view_settles_with_move_end() {
        let mut engine = engine();
        engine.poll_events();

        engine.set_view(LatLng::new(50.0, -80.0), 6);
        let events = engine.poll_events();
        assert_eq!(
            events,
            vec![
                EngineEvent::MoveStart,
                EngineEvent::ZoomStart { zoom: 4 },
                EngineEvent::Move {
                    center: LatLng::new(50.0, -80.0)
                },
                EngineEvent::Zoom { zoom: 6 },
                EngineEvent::ZoomEnd { zoom: 6 },
                EngineEvent::MoveEnd {
                    center: LatLng::new(50.0, -80.0),
                    zoom: 6
                },
            ]
        );
    }

    #[test]
    fn test_set_view_without_zoom_change_skips_zoom_events() {
        let mut engine = engine();
        engine.poll_events();

        engine.set_view(LatLng::new(50.0, -80.0), 4);
        let events = engine.poll_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events.last(), Some(EngineEvent::MoveEnd { zoom: 4, .. })));
    }

    #[test]
    fn test_zoom_clamped_to_ladder() {
        let mut engine = engine();
        engine.set_view(LatLng::new(0.0, 0.0), 200);
        assert_eq!(engine.zoom(), 24);
    }

    #[test]
    fn test_pan_by_shifts_and_settles() {
        let mut engine = engine();
        engine.poll_events();

        // Dragging content left/up reveals ground east and south.
        engine.pan_by(Point::new(120.0, 80.0));
        let center = engine.center();
        assert!(center.lng > -75.0);
        assert!(center.lat < 45.0);

        let events = engine.poll_events();
        assert!(matches!(events.last(), Some(EngineEvent::MoveEnd { zoom: 4, .. })));
    }

    #[test]
    fn test_layer_fetch_failure_surfaces_once() {
        let mut engine = engine(); // fetcher has no documents
        engine.poll_events();

        let handle = engine.create_layer("https://example.com/missing");
        let events = engine.poll_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::LayerFailed { layer, .. } if *layer == handle)));
        assert_eq!(engine.layer_status(handle), Some(LayerStatus::Failed));
        assert!(engine.layer_failure(handle).is_some());
    }

    #[test]
    fn test_layer_load_and_registration() {
        let fetcher = StaticFetcher::new().with_document(
            "https://example.com/roads",
            LayerDocument {
                title: Some("Roads".to_string()),
                ..Default::default()
            },
        );
        let mut engine = engine_with_fetcher(fetcher);
        engine.poll_events();

        let handle = engine.create_layer("https://example.com/roads");
        engine.add_layer(handle, 0, 1.0);
        let events = engine.poll_events();

        assert!(events.contains(&EngineEvent::LayerLoaded { layer: handle }));
        assert!(events.contains(&EngineEvent::LayerAdded { layer: handle }));
        assert_eq!(engine.layer_title(handle), Some("Roads".to_string()));
        assert!(engine.is_layer_registered(handle));

        // Re-adding is an upsert: z-order changes, no duplicate event.
        engine.add_layer(handle, 5, 0.5);
        assert!(engine.poll_events().is_empty());
        assert_eq!(engine.layer_z_index(handle), Some(5));
    }

    #[test]
    fn test_destroy_during_flight_drops_result() {
        let mut engine = engine();
        engine.poll_events();
        let handle = engine.create_layer("https://example.com/missing");
        engine.destroy_layer(handle);
        // The queued fetch result refers to a layer that no longer exists.
        let events = engine.poll_events();
        assert!(events.is_empty());
    }

    #[test]
    fn test_layer_list_entries() {
        let mut engine = engine();
        let handle = engine.create_layer("https://example.com/a");
        engine.layer_list_add_entry(handle, "Layer A");
        engine.layer_list_add_entry(handle, "Renamed");
        assert_eq!(engine.layer_list_entries(), vec![handle]);
        assert_eq!(engine.entry_label(handle), Some("Renamed"));

        engine.layer_list_set_disabled(handle, true);
        assert_eq!(engine.entry_disabled(handle), Some(true));

        let list = engine.add_control(ControlKind::LayerList);
        engine.remove_control(list);
        assert!(engine.layer_list_entries().is_empty());
    }

    #[test]
    fn test_pointer_position_round_trip() {
        let mut engine = engine();
        engine.poll_events();

        // Dead center of the viewport is the map center.
        engine.fire_pointer(PointerKind::Click, Point::new(400.0, 300.0));
        let events = engine.poll_events();
        match &events[0] {
            EngineEvent::Pointer { kind, position, .. } => {
                assert_eq!(*kind, PointerKind::Click);
                assert!((position.lat - 45.0).abs() < 1e-9);
                assert!((position.lng - (-75.0)).abs() < 1e-9);
            }
            other => panic!("expected pointer event, got {:?}", other),
        }

        // Right of center means east of center.
        engine.fire_pointer(PointerKind::Click, Point::new(500.0, 300.0));
        let events = engine.poll_events();
        match &events[0] {
            EngineEvent::Pointer { position, .. } => assert!(position.lng > -75.0),
            other => panic!("expected pointer event, got {:?}", other),
        }
    }

    #[test]
    fn test_shapes() {
        let mut engine = engine();
        let shape = engine.add_shape(
            ShapeGeometry::Circle {
                center: Point::new(10.0, 10.0),
                radius: 5.0,
            },
            Some("Ottawa".to_string()),
        );
        assert_eq!(engine.shape_count(), 1);
        assert_eq!(engine.shape_title(shape), Some("Ottawa"));

        engine.poll_events();
        engine.click_shape(shape);
        assert_eq!(
            engine.poll_events(),
            vec![EngineEvent::ShapeClicked { shape }]
        );

        engine.remove_shape(shape);
        assert_eq!(engine.shape_count(), 0);
        engine.click_shape(shape);
        assert!(engine.poll_events().is_empty());
    }
}
