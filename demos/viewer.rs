//! End-to-end tour of the viewer without any UI: attach a `<web-map>`,
//! load layers, listen for events, drop a URL onto the map and walk the
//! navigation history.

use std::sync::Arc;
use webmap::sources::StaticFetcher;
use webmap::{AreaShape, LayerDocument, MapArea, MapLayer, MapViewer, Point};

fn layer_doc(title: &str) -> LayerDocument {
    serde_json::from_value(serde_json::json!({
        "title": title,
        "projection": "OSMTILE",
        "content": [{ "kind": "tiles" }]
    }))
    .expect("static document is valid")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("🗺️ webmap Viewer Example");
    println!("========================");

    // Serve layer documents from memory so the demo runs offline
    let fetcher = StaticFetcher::new()
        .with_document("https://example.com/roads.json", layer_doc("Roads"))
        .with_document("https://example.com/terrain.json", layer_doc("Terrain"));

    let mut viewer = MapViewer::builder()
        .with_center(45.398, -75.703) // Ottawa
        .with_zoom(4)
        .with_dimensions(800.0, 600.0)
        .with_controls(true)
        .with_layer(
            MapLayer::new("https://example.com/roads.json")
                .with_checked(true)
                .with_opacity(0.8),
        )
        .with_layer(MapLayer::new("https://example.com/terrain.json"))
        .with_area(
            MapArea::new(AreaShape::Circle, "400,300,40")
                .with_href("https://example.com/info")
                .with_alt("Downtown"),
        )
        .with_fetcher(Arc::new(fetcher))
        .with_blocking_fetch(true)
        .build();

    viewer.on("layerchange", |event| {
        println!("   🔔 layerchange: {:?}", event);
    });
    viewer.on("moveend", |event| {
        println!("   🔔 moveend: {:?}", event);
    });

    viewer.connect(None);
    println!("✅ Attached: state {:?}", viewer.state());

    for event in viewer.pump() {
        println!("   ▶ {}: {:?}", event.event_type(), event);
    }
    println!(
        "✅ {} layer(s) loaded, first labelled {:?}",
        viewer.layer_count(),
        viewer.layer(0).map(|l| l.label().to_string())
    );

    // Drop a URL onto the map, exactly like dragging a link in
    println!("\n📌 Dropping a layer URL onto the map");
    if viewer.accepts_drop(&["text/uri-list"]) {
        viewer.handle_drop("https://example.com/terrain.json");
        viewer.pump();
        println!("   Layer count is now {}", viewer.layer_count());
    }

    // Walk somewhere else and come back through the history trail
    println!("\n🚀 Moving the view around:");
    let stops = [
        ("Toronto", 43.651, -79.347, 9),
        ("Vancouver", 49.246, -123.116, 10),
    ];
    for (name, lat, lon, zoom) in stops {
        viewer.zoom_to(lat, lon, zoom);
        viewer.pump();
        println!("   📍 {} ({:.3}, {:.3}) at zoom {}", name, lat, lon, zoom);
    }
    println!("   History holds {} views", viewer.history().len());

    viewer.back();
    viewer.pump();
    println!("   ⏪ back to ({:.3}, {:.3})", viewer.lat(), viewer.lon());

    viewer.forward();
    viewer.pump();
    println!("   ⏩ forward to ({:.3}, {:.3})", viewer.lat(), viewer.lon());

    viewer.reload();
    viewer.pump();
    println!(
        "   🔄 reload returns to ({:.3}, {:.3}) zoom {}",
        viewer.lat(),
        viewer.lon(),
        viewer.zoom()
    );

    if let Some(extent) = viewer.extent() {
        println!(
            "\n📐 Extent in {}: {:.0}..{:.0} x {:.0}..{:.0}, zoom 0..{}",
            extent.projection,
            extent.bounds.min.x,
            extent.bounds.max.x,
            extent.bounds.min.y,
            extent.bounds.max.y,
            extent.max_zoom
        );
    }

    println!("\n📄 View source:\n{}", viewer.view_source());

    viewer.resize(Point::new(1024.0, 768.0));
    println!("\n✅ Resized to 1024x768, done");
    Ok(())
}
