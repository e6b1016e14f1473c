/// Integration tests for layer and area children: document loading,
/// checked synchronization, layer-list entries, validity checks and
/// interactive shapes.
#[cfg(test)]
mod layer_sync_tests {
    use std::sync::Arc;
    use webmap::engine::{HeadlessEngine, MapEngine, PointerKind, ShapeGeometry};
    use webmap::sources::{StaticFetcher, SubLayerKind};
    use webmap::{
        AreaShape, LayerDocument, MapArea, MapLayer, MapViewer, Point, ViewerEvent,
    };

    const ROADS: &str = "https://example.com/roads.json";
    const RIVERS: &str = "https://example.com/rivers.json";

    fn doc(title: &str, projection: &str, content: serde_json::Value) -> LayerDocument {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "projection": projection,
            "content": content,
        }))
        .unwrap()
    }

    fn viewer_with(fetcher: StaticFetcher, layers: Vec<MapLayer>) -> MapViewer {
        let mut builder = MapViewer::builder()
            .with_center(45.0, -75.0)
            .with_zoom(2)
            .with_dimensions(400.0, 300.0)
            .with_controls(true)
            .with_fetcher(Arc::new(fetcher))
            .with_blocking_fetch(true);
        for layer in layers {
            builder = builder.with_layer(layer);
        }
        let mut viewer = builder.build();
        viewer.connect(None);
        viewer
    }

    fn headless(viewer: &MapViewer) -> &HeadlessEngine {
        viewer
            .engine()
            .and_then(|e| e.as_any().downcast_ref::<HeadlessEngine>())
            .expect("headless engine should be running")
    }

    fn headless_mut(viewer: &mut MapViewer) -> &mut HeadlessEngine {
        viewer
            .engine_mut()
            .and_then(|e| e.as_any_mut().downcast_mut::<HeadlessEngine>())
            .expect("headless engine should be running")
    }

    fn event_types(events: &[ViewerEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_layer_loads_lists_and_checks() {
        println!("🧪 [TEST] Testing the full layer load flow");

        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);

        let events = viewer.pump();
        assert_eq!(
            event_types(&events),
            vec!["loadstart", "load", "layerchange", "load"],
            "attach start, map load, checked sync, then layer load"
        );

        let layer = viewer.layer(0).unwrap();
        assert!(layer.checked());
        assert_eq!(layer.label(), "Roads", "label falls back to the document title");
        let handle = layer.handle().unwrap();
        assert_eq!(headless(&viewer).layer_list_entries(), vec![handle]);
        assert_eq!(headless(&viewer).entry_label(handle), Some("Roads"));
        assert_eq!(headless(&viewer).entry_disabled(handle), Some(false));

        let sublayers = headless(&viewer).sublayers(handle);
        assert_eq!(sublayers.len(), 1);
        assert_eq!(sublayers[0].kind(), SubLayerKind::Tiles);
        println!("✅ [TEST] Layer load flow test passed");
    }

    #[test]
    fn test_checked_round_trips_through_engine() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();

        viewer.set_layer_checked(0, false);
        // the element does not change until the engine confirms
        assert!(viewer.layer(0).unwrap().checked());

        let events = viewer.pump();
        assert!(!viewer.layer(0).unwrap().checked());
        assert!(events.contains(&ViewerEvent::LayerChange {
            layer: 0,
            checked: false
        }));

        viewer.set_layer_checked(0, true);
        let events = viewer.pump();
        assert!(viewer.layer(0).unwrap().checked());
        assert!(events.contains(&ViewerEvent::LayerChange {
            layer: 0,
            checked: true
        }));
    }

    #[test]
    fn test_control_toggle_takes_the_same_path() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();

        let handle = viewer.layer(0).unwrap().handle().unwrap();
        headless_mut(&mut viewer).toggle_overlay(handle);

        let events = viewer.pump();
        assert!(!viewer.layer(0).unwrap().checked());
        assert!(events.contains(&ViewerEvent::LayerChange {
            layer: 0,
            checked: false
        }));
    }

    #[test]
    fn test_style_selection_reaches_listeners() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();

        let handle = viewer.layer(0).unwrap().handle().unwrap();
        headless_mut(&mut viewer).select_style(handle);

        let events = viewer.pump();
        assert!(events.contains(&ViewerEvent::StyleChanged { layer: 0 }));
        assert_eq!(
            events.last().map(|e| e.event_type()),
            Some("changestyle")
        );
    }

    #[test]
    fn test_unchecked_layer_loads_without_registering() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS)]);

        let events = viewer.pump();
        let types = event_types(&events);
        assert!(!types.contains(&"layerchange"));
        assert!(!viewer.layer(0).unwrap().checked());

        // unchecked layers still get their list entry
        let handle = viewer.layer(0).unwrap().handle().unwrap();
        assert_eq!(headless(&viewer).entry_label(handle), Some("Roads"));
    }

    #[test]
    fn test_src_swap_reloads_the_document() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])))
            .with_document(RIVERS, doc("Rivers", "OSMTILE", serde_json::json!([{ "kind": "vector" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();
        let old_handle = viewer.layer(0).unwrap().handle().unwrap();
        assert_eq!(viewer.layer(0).unwrap().label(), "Roads");

        viewer.set_layer_src(0, RIVERS);
        viewer.pump();

        let layer = viewer.layer(0).unwrap();
        assert_eq!(layer.label(), "Rivers");
        assert!(layer.checked(), "checked survives the swap");
        let new_handle = layer.handle().unwrap();
        assert_ne!(new_handle, old_handle);
        assert_eq!(headless(&viewer).layer_src(new_handle), Some(RIVERS));
        assert_eq!(headless(&viewer).layer_src(old_handle), None);
    }

    #[test]
    fn test_dropped_url_layer_removes_itself_on_error() {
        println!("🧪 [TEST] Testing drag-and-drop layer failure cleanup");

        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![]);
        viewer.pump();

        let index = viewer.handle_drop("https://bad.example/missing.json\n");
        assert_eq!(index, Some(0));
        assert_eq!(viewer.layer(0).unwrap().label(), "Layer");

        let events = viewer.pump();
        let types = event_types(&events);
        assert!(types.contains(&"error"));
        assert_eq!(viewer.layer_count(), 0, "failed drop cleans itself up");
        println!("✅ [TEST] Drop cleanup test passed");
    }

    #[test]
    fn test_dropped_url_layer_stays_on_success() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![]);
        viewer.pump();

        viewer.handle_drop(ROADS);
        viewer.pump();
        assert_eq!(viewer.layer_count(), 1);
        // the drop label is the literal attribute, not the document title
        assert_eq!(viewer.layer(0).unwrap().label(), "Layer");
    }

    #[test]
    fn test_hidden_layer_has_no_list_entry() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(
            fetcher,
            vec![MapLayer::new(ROADS).with_checked(true).with_hidden(true)],
        );
        viewer.pump();

        let handle = viewer.layer(0).unwrap().handle().unwrap();
        assert_eq!(headless(&viewer).entry_label(handle), None);

        viewer.set_layer_hidden(0, false);
        assert_eq!(headless(&viewer).entry_label(handle), Some("Roads"));

        viewer.set_layer_hidden(0, true);
        assert_eq!(headless(&viewer).entry_label(handle), None);
    }

    #[test]
    fn test_relabel_renames_entry_and_notifies() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();
        let handle = viewer.layer(0).unwrap().handle().unwrap();

        viewer.set_layer_label(0, "Base map");
        assert_eq!(headless(&viewer).entry_label(handle), Some("Base map"));

        let events = viewer.pump();
        assert!(events.contains(&ViewerEvent::LabelChanged {
            layer: 0,
            label: "Base map".to_string()
        }));
    }

    #[test]
    fn test_opacity_pushes_through_live() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])));
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();
        let handle = viewer.layer(0).unwrap().handle().unwrap();

        viewer.set_layer_opacity(0, 0.5);
        assert_eq!(headless(&viewer).layer_opacity(handle), Some(0.5));

        // out-of-range values clamp
        viewer.set_layer_opacity(0, 1.5);
        assert_eq!(headless(&viewer).layer_opacity(handle), Some(1.0));
    }

    #[test]
    fn test_document_order_is_paint_order() {
        let fetcher = StaticFetcher::new()
            .with_document(ROADS, doc("Roads", "OSMTILE", serde_json::json!([{ "kind": "tiles" }])))
            .with_document(RIVERS, doc("Rivers", "OSMTILE", serde_json::json!([{ "kind": "vector" }])));
        let mut viewer = viewer_with(
            fetcher,
            vec![
                MapLayer::new(ROADS).with_checked(true),
                MapLayer::new(RIVERS).with_checked(true),
            ],
        );
        viewer.pump();

        let roads = viewer.layer(0).unwrap().handle().unwrap();
        let rivers = viewer.layer(1).unwrap().handle().unwrap();
        assert_eq!(headless(&viewer).layer_z_index(roads), Some(0));
        assert_eq!(headless(&viewer).layer_z_index(rivers), Some(1));

        viewer.remove_layer_at(0);
        viewer.pump();
        assert_eq!(headless(&viewer).layer_z_index(rivers), Some(0));
    }

    #[test]
    fn test_zoom_window_disables_layer() {
        println!("🧪 [TEST] Testing zoom-window validity checks");

        let fetcher = StaticFetcher::new().with_document(
            ROADS,
            doc(
                "Roads",
                "OSMTILE",
                serde_json::json!([{ "kind": "tiles", "min_zoom": 0, "max_zoom": 2 }]),
            ),
        );
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);
        viewer.pump();
        let handle = viewer.layer(0).unwrap().handle().unwrap();
        assert!(!viewer.layer(0).unwrap().disabled());

        viewer.zoom_to(45.0, -75.0, 4);
        viewer.pump();
        assert!(viewer.layer(0).unwrap().disabled(), "outside its zoom window");
        assert_eq!(headless(&viewer).entry_disabled(handle), Some(true));

        viewer.zoom_to(45.0, -75.0, 2);
        viewer.pump();
        assert!(!viewer.layer(0).unwrap().disabled(), "back in range");
        assert_eq!(headless(&viewer).entry_disabled(handle), Some(false));
        println!("✅ [TEST] Validity check test passed");
    }

    #[test]
    fn test_projection_mismatch_disables_and_requests() {
        let fetcher = StaticFetcher::new().with_document(
            ROADS,
            doc("Roads", "CBMTILE", serde_json::json!([{ "kind": "tiles" }])),
        );
        let mut viewer = viewer_with(fetcher, vec![MapLayer::new(ROADS).with_checked(true)]);

        let events = viewer.pump();
        assert!(events.contains(&ViewerEvent::ProjectionRequest {
            layer: 0,
            projection: "CBMTILE".to_string()
        }));
        assert!(viewer.layer(0).unwrap().disabled());

        // switching the map to the declared projection reloads the layer
        // and clears the mismatch
        viewer.set_projection("CBMTILE").unwrap();
        viewer.pump();
        assert_eq!(viewer.projection(), "CBMTILE");
        assert_eq!(headless(&viewer).projection().code, "CBMTILE");
        assert!(!viewer.layer(0).unwrap().disabled());
    }

    #[test]
    fn test_area_click_emits_link_request() {
        let mut viewer = viewer_with(
            StaticFetcher::new(),
            vec![],
        );
        let index = viewer.append_area(
            MapArea::new(AreaShape::Rect, "10,10,60,60")
                .with_href("https://example.com/info")
                .with_alt("More information"),
        );
        let handle = viewer.area(index).unwrap().handle().unwrap();
        assert_eq!(headless(&viewer).shape_count(), 1);

        headless_mut(&mut viewer).click_shape(handle);
        let events = viewer.pump();
        assert!(events.contains(&ViewerEvent::LinkRequest {
            url: "https://example.com/info".to_string()
        }));
    }

    #[test]
    fn test_area_without_href_is_inert() {
        let mut viewer = viewer_with(StaticFetcher::new(), vec![]);
        let index = viewer.append_area(MapArea::new(AreaShape::Circle, "50,50,10"));
        let handle = viewer.area(index).unwrap().handle().unwrap();

        headless_mut(&mut viewer).click_shape(handle);
        let events = viewer.pump();
        assert!(!event_types(&events).contains(&"linkrequest"));
    }

    #[test]
    fn test_poster_scales_area_coordinates() {
        let fetcher = StaticFetcher::new();
        let mut viewer = MapViewer::builder()
            .with_dimensions(400.0, 300.0)
            .with_poster(Point::new(100.0, 100.0), Point::new(200.0, 200.0))
            .with_area(MapArea::new(AreaShape::Circle, "50,50,10"))
            .with_fetcher(Arc::new(fetcher))
            .with_blocking_fetch(true)
            .build();
        viewer.connect(None);

        let handle = viewer.area(0).unwrap().handle().unwrap();
        assert_eq!(
            headless(&viewer).shape_geometry(handle),
            Some(&ShapeGeometry::Circle {
                center: Point::new(100.0, 100.0),
                radius: 20.0
            })
        );
    }

    #[test]
    fn test_removed_area_unmounts_its_shape() {
        let mut viewer = viewer_with(StaticFetcher::new(), vec![]);
        viewer.append_area(MapArea::new(AreaShape::Rect, "0,0,10,10"));
        assert_eq!(headless(&viewer).shape_count(), 1);

        assert!(viewer.remove_area_at(0));
        assert_eq!(headless(&viewer).shape_count(), 0);
        assert_eq!(viewer.area_count(), 0);
    }

    #[test]
    fn test_pointer_events_relay_with_positions() {
        let mut viewer = viewer_with(StaticFetcher::new(), vec![]);
        viewer.pump();

        // dead center of a 400x300 viewport is the map center
        headless_mut(&mut viewer).fire_pointer(PointerKind::Click, Point::new(200.0, 150.0));
        let events = viewer.pump();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ViewerEvent::Pointer { kind, lat, lon, x, y } => {
                assert_eq!(*kind, PointerKind::Click);
                assert!((lat - 45.0).abs() < 1e-6);
                assert!((lon + 75.0).abs() < 1e-6);
                assert_eq!(*x, 200.0);
                assert_eq!(*y, 150.0);
            }
            other => panic!("expected pointer event, got {other:?}"),
        }
        assert_eq!(events[0].event_type(), "click");
    }
}
