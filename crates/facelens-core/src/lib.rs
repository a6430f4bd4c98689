//! facelens-core — Face overlay geometry and rendering.
//!
//! Takes keypoints produced by an external face-landmark model and draws an
//! accessory image (or fallback eye markers) over each face.

pub mod canvas;
pub mod overlay;
pub mod render;
pub mod resource;
pub mod types;

pub use canvas::{Canvas, ImageCanvas, Style};
pub use overlay::{eye_angle, EyeIndices, EyePair, OverlayPlacement};
pub use render::{draw_path, OverlayRenderer};
pub use resource::{load_image, Resource, ResourceError, ResourceState};
pub use types::{BoundingBox, Face, Keypoint, Point, Rect};
