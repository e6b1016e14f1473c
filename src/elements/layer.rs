use crate::engine::{LayerHandle, MapEngine};

/// A map layer element: one entry in the viewer's layer stack.
///
/// Holds the authored attributes plus the state that accumulates once the
/// layer is attached to a live engine (its handle, the loaded document
/// title, and whether the current view can show any of its content). The
/// owning viewer drives attach/detach and keeps `checked` in sync with the
/// engine's registration events.
pub struct MapLayer {
    src: Option<String>,
    label: Option<String>,
    checked: bool,
    hidden: bool,
    opacity: f64,
    handle: Option<LayerHandle>,
    remove_on_error: bool,
    disabled: bool,
    title: Option<String>,
}

impl MapLayer {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            label: None,
            checked: false,
            hidden: false,
            opacity: 1.0,
            handle: None,
            remove_on_error: false,
            disabled: false,
            title: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// Effective display name: the authored label, else the loaded document
    /// title, else a generic fallback.
    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("Layer")
    }

    /// The raw `label` attribute, unresolved.
    pub fn label_attr(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn handle(&self) -> Option<LayerHandle> {
        self.handle
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn remove_on_error(&self) -> bool {
        self.remove_on_error
    }

    /// Creates the engine layer (if there is a source to load) and, when
    /// checked, registers it at the given z-order. Safe to call again; an
    /// attached layer only re-asserts its registration.
    pub(crate) fn attach(&mut self, engine: &mut dyn MapEngine, z_index: i32) {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let Some(src) = self.src.as_deref() else {
                    return;
                };
                let handle = engine.create_layer(src);
                self.handle = Some(handle);
                handle
            }
        };
        if self.checked {
            engine.add_layer(handle, z_index, self.opacity);
        }
    }

    /// Destroys the engine layer and forgets everything learned from it.
    pub(crate) fn detach(&mut self, engine: &mut dyn MapEngine) {
        if let Some(handle) = self.handle.take() {
            engine.destroy_layer(handle);
        }
        self.disabled = false;
        self.title = None;
    }

    pub(crate) fn set_label_attr(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub(crate) fn set_checked_raw(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub(crate) fn set_hidden_raw(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub(crate) fn set_src_raw(&mut self, src: Option<String>) {
        self.src = src;
    }

    pub(crate) fn set_opacity_raw(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub(crate) fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub(crate) fn mark_remove_on_error(&mut self) {
        self.remove_on_error = true;
    }
}
