use super::area::MapArea;
use super::layer::MapLayer;
use super::map::ViewerOptions;
use std::fmt::Write;

/// Renders the markup a viewer was authored as. Captured once at build
/// time so "view source" keeps showing the original document even after
/// attributes and children change.
pub fn viewer_source(options: &ViewerOptions, layers: &[MapLayer], areas: &[MapArea]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<web-map lat=\"{}\" lon=\"{}\" zoom=\"{}\" projection=\"{}\"",
        options.lat,
        options.lon,
        options.zoom,
        escape_attr(&options.projection)
    );
    if options.controls {
        out.push_str(" controls");
    }
    if !options.controlslist.is_empty() {
        let _ = write!(
            out,
            " controlslist=\"{}\"",
            options.controlslist.tokens().join(" ")
        );
    }
    if let Some(width) = options.width {
        let _ = write!(out, " width=\"{}\"", width);
    }
    if let Some(height) = options.height {
        let _ = write!(out, " height=\"{}\"", height);
    }
    out.push('>');

    for layer in layers {
        out.push_str("\n  <layer-");
        if let Some(src) = layer.src() {
            let _ = write!(out, " src=\"{}\"", escape_attr(src));
        }
        if let Some(label) = layer.label_attr() {
            let _ = write!(out, " label=\"{}\"", escape_attr(label));
        }
        if layer.checked() {
            out.push_str(" checked");
        }
        if layer.hidden() {
            out.push_str(" hidden");
        }
        if layer.opacity() != 1.0 {
            let _ = write!(out, " opacity=\"{}\"", layer.opacity());
        }
        out.push_str("></layer->");
    }

    for area in areas {
        let _ = write!(out, "\n  <map-area shape=\"{}\"", area.shape().as_attr());
        if !area.coords().is_empty() {
            let _ = write!(out, " coords=\"{}\"", escape_attr(area.coords()));
        }
        if let Some(href) = area.href() {
            let _ = write!(out, " href=\"{}\"", escape_attr(href));
        }
        if let Some(alt) = area.alt() {
            let _ = write!(out, " alt=\"{}\"", escape_attr(alt));
        }
        out.push_str("></map-area>");
    }

    if layers.is_empty() && areas.is_empty() {
        out.push_str("</web-map>");
    } else {
        out.push_str("\n</web-map>");
    }
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
