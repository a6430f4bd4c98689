use serde::{Deserialize, Serialize};

/// A 2-D position in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A detected landmark as emitted by the face-landmark model.
///
/// `z` and `name` are optional: some models emit depth or a semantic label
/// ("rightEye", "noseTip"), others emit bare coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None, name: None }
    }

    /// Project to a raw (x, y) point, dropping depth and label.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Axis-aligned face box in the detector's `xMin`/`yMin`/`width`/`height` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Corners in drawing order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let x_max = self.x_min + self.width;
        let y_max = self.y_min + self.height;
        [
            Point::new(self.x_min, self.y_min),
            Point::new(x_max, self.y_min),
            Point::new(x_max, y_max),
            Point::new(self.x_min, y_max),
        ]
    }
}

/// One detected face: its keypoints and, if the model reports one, a box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Face {
    pub keypoints: Vec<Keypoint>,
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl Face {
    pub fn from_points(points: &[(f32, f32)]) -> Self {
        Self {
            keypoints: points.iter().map(|&(x, y)| Keypoint::new(x, y)).collect(),
            bounding_box: None,
        }
    }

    /// Raw (x, y) positions of every keypoint, in model order.
    pub fn points(&self) -> Vec<Point> {
        self.keypoints.iter().map(Keypoint::point).collect()
    }
}

/// Axis-aligned drawing rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}
