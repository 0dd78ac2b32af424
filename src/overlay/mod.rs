pub mod interaction;
pub mod layer;
pub mod paint;

pub use interaction::{DrawKind, InteractionState, PointerEffect, ShapeId};
pub use layer::{LayerResponse, OverlayLayer};
