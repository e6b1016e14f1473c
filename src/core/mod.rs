pub mod bounds;
pub mod geo;
pub mod history;
pub mod projection;

pub use bounds::Bounds;
pub use geo::{LatLng, Point};
pub use history::{HistoryEntry, ViewHistory};
pub use projection::{CrsKind, Projection, ProjectionRegistry, TcrsTemplate, BUILTIN_CODES};
