//! Mask authoring: freehand paint/erase strokes over a displayed image,
//! turned into a black/white PNG mask after every completed stroke.

mod layer;
mod surface;
mod transform;

pub use layer::{BinaryMask, PaintLayer};
pub use surface::{MaskChange, MaskSurface, ToolMode};
pub use transform::{PointerInput, DEFAULT_MAX_DISPLAY_HEIGHT};
