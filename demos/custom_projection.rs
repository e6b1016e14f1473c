//! Bring up a viewer on a projection the registry has never heard of:
//! the map parks itself until the definition arrives, then builds.

use std::sync::Arc;
use webmap::sources::StaticFetcher;
use webmap::{LayerDocument, MapLayer, MapViewer};

const POLAR_TCRS: &str = r#"{
    "projection": "POLAR",
    "proj4string": "+proj=stere +lat_0=90 +lat_ts=71 +lon_0=-96 +datum=WGS84 +units=m",
    "origin": [-2800000.0, 3200000.0],
    "bounds": [[-2800000.0, -2800000.0], [3200000.0, 3200000.0]],
    "resolutions": [24000.0, 12000.0, 6000.0, 3000.0, 1500.0],
    "tilesize": 512
}"#;

fn ice_doc() -> LayerDocument {
    serde_json::from_value(serde_json::json!({
        "title": "Sea Ice",
        "projection": "POLAR",
        "content": [{ "kind": "tiles" }]
    }))
    .expect("static document is valid")
}

fn main() -> webmap::Result<()> {
    env_logger::init();

    println!("🧭 webmap Custom Projection Example");
    println!("===================================");

    let fetcher = StaticFetcher::new().with_document("https://example.com/ice.json", ice_doc());

    let mut viewer = MapViewer::builder()
        .with_center(80.0, -90.0)
        .with_zoom(2)
        .with_projection("POLAR")
        .with_dimensions(640.0, 480.0)
        .with_layer(MapLayer::new("https://example.com/ice.json").with_checked(true))
        .with_fetcher(Arc::new(fetcher))
        .with_blocking_fetch(true)
        .build();

    viewer.connect(None);
    println!("📡 Attached, state {:?} (definition not loaded yet)", viewer.state());

    match viewer.create_map() {
        Ok(()) => println!("   unexpected: map built without a definition"),
        Err(err) => println!("   as expected: {}", err),
    }

    // A `map-link rel=projection` fetch would deliver this JSON
    let code = viewer.define_custom_projection(POLAR_TCRS)?;
    println!("✅ Registered custom TCRS {:?}", code);

    viewer.create_map()?;
    println!("✅ Map built, state {:?}", viewer.state());

    if let Some(engine) = viewer.engine() {
        let projection = engine.projection();
        println!(
            "   {} uses {}px tiles across zoom 0..{}",
            projection.code,
            projection.tile_size,
            projection.max_zoom()
        );
    }

    for event in viewer.pump() {
        println!("   ▶ {}: {:?}", event.event_type(), event);
    }

    if let Some(extent) = viewer.extent() {
        println!(
            "📐 Extent: x {:.0}..{:.0}, y {:.0}..{:.0}",
            extent.bounds.min.x, extent.bounds.max.x, extent.bounds.min.y, extent.bounds.max.y
        );
    }

    // Switching to a built-in projection reloads every layer in place.
    // The layer document still declares POLAR, so the viewer flags the
    // mismatch and asks for a projection change back.
    println!("\n🔁 Switching to OSMTILE");
    viewer.set_projection("OSMTILE")?;
    for event in viewer.pump() {
        println!("   ▶ {}: {:?}", event.event_type(), event);
    }
    println!(
        "✅ Now on {} at zoom {}, centre ({:.3}, {:.3})",
        viewer.projection(),
        viewer.zoom(),
        viewer.lat(),
        viewer.lon()
    );

    Ok(())
}
