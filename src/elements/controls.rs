use crate::engine::ControlHandle;

/// Built-in controls a viewer can mount on its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    LayerList,
    Zoom,
    Reload,
    Fullscreen,
}

impl ControlKind {
    /// Vertical space the control occupies in the stacked control bar. The
    /// layer list floats on the opposite corner and costs nothing.
    pub fn bar_height(&self) -> f64 {
        match self {
            ControlKind::LayerList => 0.0,
            ControlKind::Zoom => 93.0,
            ControlKind::Reload => 49.0,
            ControlKind::Fullscreen => 49.0,
        }
    }
}

/// Parsed `controlslist` attribute: which controls the author opted out of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlsList {
    pub nolayer: bool,
    pub nozoom: bool,
    pub noreload: bool,
    pub nofullscreen: bool,
}

impl ControlsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a space-separated attribute value. Unknown tokens are ignored.
    pub fn from_attr(value: &str) -> Self {
        let mut list = Self::default();
        for token in value.split_whitespace() {
            list.add_token(token);
        }
        list
    }

    /// Adds one token. Returns true when the token is recognized and was
    /// not already set.
    pub fn add_token(&mut self, token: &str) -> bool {
        let flag = match token.to_ascii_lowercase().as_str() {
            "nolayer" => &mut self.nolayer,
            "nozoom" => &mut self.nozoom,
            "noreload" => &mut self.noreload,
            "nofullscreen" => &mut self.nofullscreen,
            _ => return false,
        };
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    pub fn excludes(&self, kind: ControlKind) -> bool {
        match kind {
            ControlKind::LayerList => self.nolayer,
            ControlKind::Zoom => self.nozoom,
            ControlKind::Reload => self.noreload,
            ControlKind::Fullscreen => self.nofullscreen,
        }
    }

    /// Tokens currently set, in attribute order.
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.nolayer {
            tokens.push("nolayer");
        }
        if self.nozoom {
            tokens.push("nozoom");
        }
        if self.noreload {
            tokens.push("noreload");
        }
        if self.nofullscreen {
            tokens.push("nofullscreen");
        }
        tokens
    }

    pub fn is_empty(&self) -> bool {
        !(self.nolayer || self.nozoom || self.noreload || self.nofullscreen)
    }
}

/// Handles for the controls a viewer currently has mounted. One slot per
/// kind; setting a slot that is occupied returns the old handle so the
/// caller can unmount it.
#[derive(Debug, Default)]
pub struct ControlSet {
    layer_list: Option<ControlHandle>,
    zoom: Option<ControlHandle>,
    reload: Option<ControlHandle>,
    fullscreen: Option<ControlHandle>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: ControlKind) -> &mut Option<ControlHandle> {
        match kind {
            ControlKind::LayerList => &mut self.layer_list,
            ControlKind::Zoom => &mut self.zoom,
            ControlKind::Reload => &mut self.reload,
            ControlKind::Fullscreen => &mut self.fullscreen,
        }
    }

    pub fn get(&self, kind: ControlKind) -> Option<ControlHandle> {
        match kind {
            ControlKind::LayerList => self.layer_list,
            ControlKind::Zoom => self.zoom,
            ControlKind::Reload => self.reload,
            ControlKind::Fullscreen => self.fullscreen,
        }
    }

    pub fn set(&mut self, kind: ControlKind, handle: ControlHandle) -> Option<ControlHandle> {
        self.slot_mut(kind).replace(handle)
    }

    pub fn take(&mut self, kind: ControlKind) -> Option<ControlHandle> {
        self.slot_mut(kind).take()
    }

    pub fn clear(&mut self) {
        self.layer_list = None;
        self.zoom = None;
        self.reload = None;
        self.fullscreen = None;
    }
}
