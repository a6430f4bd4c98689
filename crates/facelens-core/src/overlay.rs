//! Accessory placement from detected eye keypoints.
//!
//! The overlay is sized from the inter-eye distance and anchored on the eye
//! midpoint. The eye angle is computed alongside so callers can rotate the
//! asset, but the renderer draws it axis-aligned.

use crate::types::{Face, Point, Rect};

/// Overlay width as a multiple of the inter-eye distance.
pub const OVERLAY_SCALE: f32 = 3.0;
/// Overlay width / height.
pub const OVERLAY_ASPECT: f32 = 2.0;
/// The overlay's left edge sits `width / OVERLAY_OFFSET_DIVISOR` left of the eye midpoint.
pub const OVERLAY_OFFSET_DIVISOR: f32 = 1.7;

/// Positions of the two eye keypoints in the model's keypoint sequence.
///
/// Model-specific. Defaults to 1 and 2; override to match the landmark
/// model in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeIndices {
    pub left: usize,
    pub right: usize,
}

impl Default for EyeIndices {
    fn default() -> Self {
        Self { left: 1, right: 2 }
    }
}

/// The two eye points of one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePair {
    pub left: Point,
    pub right: Point,
}

/// Where and how large to draw the accessory for one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    /// Midpoint between the eyes.
    pub center: Point,
    /// Inter-eye distance.
    pub eye_distance: f32,
    /// Signed eye-line angle in radians. Not applied when drawing.
    pub angle: f32,
    pub rect: Rect,
}

impl EyePair {
    /// Pick the eye points out of `face`, or `None` if either index is absent.
    pub fn from_face(face: &Face, indices: EyeIndices) -> Option<Self> {
        let left = face.keypoints.get(indices.left)?.point();
        let right = face.keypoints.get(indices.right)?.point();
        Some(Self { left, right })
    }

    pub fn center(&self) -> Point {
        self.left.midpoint(&self.right)
    }

    pub fn distance(&self) -> f32 {
        self.left.distance(&self.right)
    }

    pub fn angle(&self) -> f32 {
        eye_angle(self.left, self.right)
    }

    pub fn placement(&self) -> OverlayPlacement {
        let center = self.center();
        let eye_distance = self.distance();
        let width = eye_distance * OVERLAY_SCALE;
        let height = width / OVERLAY_ASPECT;
        OverlayPlacement {
            center,
            eye_distance,
            angle: self.angle(),
            rect: Rect {
                x: center.x - width / OVERLAY_OFFSET_DIVISOR,
                y: center.y - height / 2.0,
                width,
                height,
            },
        }
    }
}

/// Signed angle (radians) of the line from `left` to `right`.
pub fn eye_angle(left: Point, right: Point) -> f32 {
    (right.y - left.y).atan2(right.x - left.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn face_with_eyes(left: (f32, f32), right: (f32, f32)) -> Face {
        Face::from_points(&[(0.0, 0.0), left, right, (20.0, 20.0)])
    }

    #[test]
    fn test_placement_horizontal_eyes() {
        let face = face_with_eyes((10.0, 10.0), (30.0, 10.0));
        let eyes = EyePair::from_face(&face, EyeIndices::default()).unwrap();
        let p = eyes.placement();

        assert_eq!(p.center, Point::new(20.0, 10.0));
        assert!((p.eye_distance - 20.0).abs() < 1e-6);
        assert!((p.rect.width - 60.0).abs() < 1e-5);
        assert!((p.rect.height - 30.0).abs() < 1e-5);
        assert!((p.rect.x - (20.0 - 60.0 / 1.7)).abs() < 1e-4, "x = {}", p.rect.x);
        assert!((p.rect.y + 5.0).abs() < 1e-5, "y = {}", p.rect.y);
        assert_eq!(p.angle, 0.0);
    }

    #[test]
    fn test_missing_eye_keypoint() {
        let face = Face::from_points(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(EyePair::from_face(&face, EyeIndices::default()).is_none());
        assert!(EyePair::from_face(&Face::default(), EyeIndices::default()).is_none());
    }

    #[test]
    fn test_custom_eye_indices() {
        let face = Face::from_points(&[(5.0, 5.0), (0.0, 0.0), (0.0, 0.0), (15.0, 5.0)]);
        let eyes = EyePair::from_face(&face, EyeIndices { left: 0, right: 3 }).unwrap();
        assert_eq!(eyes.center(), Point::new(10.0, 5.0));
    }

    #[test]
    fn test_eye_angle_sign() {
        let a = Point::new(0.0, 0.0);
        assert!((eye_angle(a, Point::new(10.0, 10.0)) - FRAC_PI_4).abs() < 1e-6);
        assert!((eye_angle(a, Point::new(10.0, -10.0)) + FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_eyes_give_empty_rect() {
        let face = face_with_eyes((7.0, 7.0), (7.0, 7.0));
        let p = EyePair::from_face(&face, EyeIndices::default()).unwrap().placement();
        assert_eq!(p.rect.width, 0.0);
        assert_eq!(p.rect.height, 0.0);
    }
}
