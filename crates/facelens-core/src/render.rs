//! Per-frame overlay drawing.

use crate::canvas::{Canvas, Style};
use crate::overlay::{EyeIndices, EyePair};
use crate::resource::Resource;
use crate::types::{Face, Point};
use image::{Rgba, RgbaImage};

const EYE_MARKER_RADIUS: f32 = 3.0;
const EYE_MARKER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const KEYPOINT_RADIUS: f32 = 2.0;
const KEYPOINT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BOX_STYLE: Style = Style::new(Rgba([255, 255, 255, 255]), 2.0);

/// Draws the accessory asset over each detected face's eyes.
pub struct OverlayRenderer {
    asset: Resource<RgbaImage>,
    eyes: EyeIndices,
}

impl OverlayRenderer {
    pub fn new(asset: Resource<RgbaImage>) -> Self {
        Self { asset, eyes: EyeIndices::default() }
    }

    pub fn with_eye_indices(mut self, eyes: EyeIndices) -> Self {
        self.eyes = eyes;
        self
    }

    /// Draw every face onto `ctx`.
    ///
    /// Faces are independent: one with a missing eye keypoint is skipped
    /// without affecting the others. While the asset is still loading (or
    /// failed, or has zero size) each eye gets a filled marker instead.
    /// `bounding_box` and `show_keypoints` add the face box outline and
    /// per-keypoint markers; both are off in the default demo.
    pub fn draw_results(
        &self,
        ctx: &mut impl Canvas,
        faces: &[Face],
        bounding_box: bool,
        show_keypoints: bool,
    ) {
        let asset = self
            .asset
            .try_get()
            .filter(|img| img.width() > 0 && img.height() > 0);

        for (i, face) in faces.iter().enumerate() {
            let points = face.points();

            if bounding_box {
                if let Some(b) = &face.bounding_box {
                    draw_path(ctx, &b.corners(), true, BOX_STYLE);
                }
            }
            if show_keypoints {
                for p in &points {
                    ctx.fill_circle(*p, KEYPOINT_RADIUS, KEYPOINT_COLOR);
                }
            }

            let Some(eyes) = EyePair::from_face(face, self.eyes) else {
                tracing::debug!(face = i, keypoints = points.len(), "no eye keypoints; skipping overlay");
                continue;
            };

            match &asset {
                Some(img) => {
                    let placement = eyes.placement();
                    tracing::trace!(
                        face = i,
                        eye_distance = placement.eye_distance,
                        angle = placement.angle,
                        "drawing overlay"
                    );
                    ctx.draw_image(img, placement.rect);
                }
                None => {
                    ctx.fill_circle(eyes.left, EYE_MARKER_RADIUS, EYE_MARKER_COLOR);
                    ctx.fill_circle(eyes.right, EYE_MARKER_RADIUS, EYE_MARKER_COLOR);
                }
            }
        }
    }
}

/// Stroke a polyline through `points`, joining the last point back to the
/// first when `closed`.
pub fn draw_path(ctx: &mut impl Canvas, points: &[Point], closed: bool, style: Style) {
    for pair in points.windows(2) {
        ctx.stroke_line(pair[0], pair[1], style);
    }
    if closed && points.len() > 2 {
        ctx.stroke_line(points[points.len() - 1], points[0], style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ImageCanvas;
    use crate::types::{BoundingBox, Rect};

    #[derive(Debug, PartialEq)]
    enum Op {
        Image(Rect),
        Circle(Point),
        Line(Point, Point),
    }

    #[derive(Default)]
    struct RecordingCanvas {
        ops: Vec<Op>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_image(&mut self, _image: &RgbaImage, rect: Rect) {
            self.ops.push(Op::Image(rect));
        }
        fn fill_circle(&mut self, center: Point, _radius: f32, _color: Rgba<u8>) {
            self.ops.push(Op::Circle(center));
        }
        fn stroke_line(&mut self, from: Point, to: Point, _style: Style) {
            self.ops.push(Op::Line(from, to));
        }
    }

    fn face() -> Face {
        Face::from_points(&[(20.0, 20.0), (10.0, 10.0), (30.0, 10.0)])
    }

    fn ready_asset(w: u32, h: u32) -> Resource<RgbaImage> {
        Resource::ready(RgbaImage::new(w, h))
    }

    #[test]
    fn test_fallback_circles_while_loading() {
        let renderer = OverlayRenderer::new(Resource::pending());
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, false);
        assert_eq!(
            ctx.ops,
            vec![Op::Circle(Point::new(10.0, 10.0)), Op::Circle(Point::new(30.0, 10.0))]
        );
    }

    #[test]
    fn test_fallback_circles_when_failed() {
        let renderer = OverlayRenderer::new(Resource::failed("404"));
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, false);
        assert_eq!(ctx.ops.len(), 2);
        assert!(ctx.ops.iter().all(|op| matches!(op, Op::Circle(_))));
    }

    #[test]
    fn test_fallback_when_asset_has_zero_size() {
        let renderer = OverlayRenderer::new(ready_asset(0, 0));
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, false);
        assert!(ctx.ops.iter().all(|op| matches!(op, Op::Circle(_))));
    }

    #[test]
    fn test_draws_image_when_ready() {
        let renderer = OverlayRenderer::new(ready_asset(64, 32));
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, false);

        assert_eq!(ctx.ops.len(), 1);
        let Op::Image(rect) = &ctx.ops[0] else {
            panic!("expected image draw, got {:?}", ctx.ops[0]);
        };
        assert!((rect.width - 60.0).abs() < 1e-5);
        assert!((rect.height - 30.0).abs() < 1e-5);
        assert!((rect.x - (20.0 - 60.0 / 1.7)).abs() < 1e-4);
        assert!((rect.y + 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_face_missing_eye_does_not_affect_others() {
        let renderer = OverlayRenderer::new(Resource::pending());
        let mut ctx = RecordingCanvas::default();
        let partial = Face::from_points(&[(0.0, 0.0), (1.0, 1.0)]);
        let other = Face::from_points(&[(0.0, 0.0), (50.0, 50.0), (70.0, 50.0)]);
        renderer.draw_results(&mut ctx, &[face(), partial, other], false, false);
        assert_eq!(
            ctx.ops,
            vec![
                Op::Circle(Point::new(10.0, 10.0)),
                Op::Circle(Point::new(30.0, 10.0)),
                Op::Circle(Point::new(50.0, 50.0)),
                Op::Circle(Point::new(70.0, 50.0)),
            ]
        );
    }

    #[test]
    fn test_empty_faces_draws_nothing() {
        let renderer = OverlayRenderer::new(ready_asset(4, 4));
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[], true, true);
        assert!(ctx.ops.is_empty());
    }

    #[test]
    fn test_bounding_box_outline() {
        let renderer = OverlayRenderer::new(ready_asset(4, 4));
        let mut ctx = RecordingCanvas::default();
        let mut f = Face::from_points(&[(0.0, 0.0)]);
        f.bounding_box = Some(BoundingBox { x_min: 0.0, y_min: 0.0, width: 10.0, height: 10.0 });
        renderer.draw_results(&mut ctx, &[f], true, false);
        assert_eq!(ctx.ops.len(), 4);
        assert_eq!(ctx.ops[3], Op::Line(Point::new(0.0, 10.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_show_keypoints_marks_every_point() {
        let renderer = OverlayRenderer::new(ready_asset(4, 4));
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, true);
        let circles = ctx.ops.iter().filter(|op| matches!(op, Op::Circle(_))).count();
        let images = ctx.ops.iter().filter(|op| matches!(op, Op::Image(_))).count();
        assert_eq!(circles, 3);
        assert_eq!(images, 1);
    }

    #[test]
    fn test_custom_eye_indices() {
        let renderer = OverlayRenderer::new(Resource::pending())
            .with_eye_indices(EyeIndices { left: 0, right: 2 });
        let mut ctx = RecordingCanvas::default();
        renderer.draw_results(&mut ctx, &[face()], false, false);
        assert_eq!(ctx.ops[0], Op::Circle(Point::new(20.0, 20.0)));
    }

    #[test]
    fn test_far_apart_eyes_on_small_frame() {
        let red = Rgba([255, 0, 0, 255]);
        let renderer = OverlayRenderer::new(Resource::ready(RgbaImage::from_pixel(4, 2, red)));
        let mut canvas = ImageCanvas::new(RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])));
        let f = Face::from_points(&[(0.0, 0.0), (0.0, 10.0), (100000.0, 10.0)]);
        renderer.draw_results(&mut canvas, &[f], false, false);
        assert_eq!(*canvas.frame().get_pixel(32, 32), red);
    }

    #[test]
    fn test_huge_bounding_box_outline() {
        let white = Rgba([255, 255, 255, 255]);
        let renderer = OverlayRenderer::new(Resource::pending());
        let mut canvas = ImageCanvas::new(RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255])));
        let mut f = Face::from_points(&[(0.0, 0.0)]);
        f.bounding_box = Some(BoundingBox { x_min: 4.0, y_min: 4.0, width: 1.0e12, height: 1.0e12 });
        renderer.draw_results(&mut canvas, &[f], true, false);
        assert_eq!(*canvas.frame().get_pixel(16, 4), white);
        assert_eq!(*canvas.frame().get_pixel(16, 16), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_path_open_and_closed() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let style = Style::new(Rgba([0, 0, 0, 255]), 1.0);

        let mut open = RecordingCanvas::default();
        draw_path(&mut open, &pts, false, style);
        assert_eq!(open.ops.len(), 2);

        let mut closed = RecordingCanvas::default();
        draw_path(&mut closed, &pts, true, style);
        assert_eq!(closed.ops.len(), 3);
        assert_eq!(closed.ops[2], Op::Line(pts[2], pts[0]));
    }

    #[test]
    fn test_draw_path_degenerate() {
        let style = Style::new(Rgba([0, 0, 0, 255]), 1.0);
        let mut ctx = RecordingCanvas::default();
        draw_path(&mut ctx, &[], true, style);
        draw_path(&mut ctx, &[Point::new(1.0, 1.0)], true, style);
        assert!(ctx.ops.is_empty());
    }
}
