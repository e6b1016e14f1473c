//! The custom elements: the `<web-map>` viewer plus its `<layer->` and
//! `<map-area>` children, and the plumbing they share.

pub mod area;
pub mod controls;
pub mod events;
pub mod layer;
pub mod lifecycle;
pub mod map;
pub mod markup;

pub use area::{AreaShape, MapArea, Poster};
pub use controls::{ControlKind, ControlSet, ControlsList};
pub use events::{EventCallback, EventManager, ViewerEvent};
pub use layer::MapLayer;
pub use lifecycle::LifecycleState;
pub use map::{MapViewer, ViewExtent, ViewerBuilder, ViewerOptions};
