//! 2-D drawing surface.
//!
//! [`Canvas`] is the small set of primitives the overlay renderer needs.
//! [`ImageCanvas`] implements it on an in-memory RGBA frame. Every primitive
//! is clipped to the frame before any per-pixel work, so cost is bounded by
//! the frame size whatever coordinates the detector reports.

use crate::types::{Point, Rect};
use image::{Rgba, RgbaImage};

/// Stroke/fill color and line width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Rgba<u8>,
    pub line_width: f32,
}

impl Style {
    pub const fn new(color: Rgba<u8>, line_width: f32) -> Self {
        Self { color, line_width }
    }
}

pub trait Canvas {
    /// Draw `image` scaled into `rect`.
    fn draw_image(&mut self, image: &RgbaImage, rect: Rect);
    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba<u8>);
    fn stroke_line(&mut self, from: Point, to: Point, style: Style);
}

/// Canvas backed by an RGBA frame buffer.
pub struct ImageCanvas {
    frame: RgbaImage,
}

impl ImageCanvas {
    pub fn new(frame: RgbaImage) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn into_frame(self) -> RgbaImage {
        self.frame
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.frame.width() as i64 || y >= self.frame.height() as i64 {
            return;
        }
        let dst = self.frame.get_pixel_mut(x as u32, y as u32);
        let a = color[3] as f32 / 255.0;
        for c in 0..3 {
            dst[c] = (color[c] as f32 * a + dst[c] as f32 * (1.0 - a)).round() as u8;
        }
        dst[3] = dst[3].max(color[3]);
    }
}

impl Canvas for ImageCanvas {
    fn draw_image(&mut self, image: &RgbaImage, rect: Rect) {
        if !(rect.x.is_finite() && rect.y.is_finite() && rect.width.is_finite() && rect.height.is_finite()) {
            return;
        }
        if rect.width.round() < 1.0 || rect.height.round() < 1.0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        // Visible destination region, in f64 so far-off rects don't lose precision.
        let (rx, ry) = (rect.x as f64, rect.y as f64);
        let (rw, rh) = (rect.width as f64, rect.height as f64);
        let x0 = rx.round().max(0.0);
        let y0 = ry.round().max(0.0);
        let x1 = (rx + rw).round().min(self.frame.width() as f64);
        let y1 = (ry + rh).round().min(self.frame.height() as f64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let sx = image.width() as f64 / rw;
        let sy = image.height() as f64 / rh;
        for y in y0 as u32..y1 as u32 {
            let v = (y as f64 + 0.5 - ry) * sy - 0.5;
            for x in x0 as u32..x1 as u32 {
                let u = (x as f64 + 0.5 - rx) * sx - 0.5;
                let px = sample_bilinear(image, u, v);
                self.blend(x as i64, y as i64, px);
            }
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba<u8>) {
        if radius <= 0.0 || !center.x.is_finite() || !center.y.is_finite() || !radius.is_finite() {
            return;
        }
        let r2 = radius * radius;
        let x0 = ((center.x - radius).floor() as i64).max(0);
        let x1 = ((center.x + radius).ceil() as i64).min(self.frame.width() as i64 - 1);
        let y0 = ((center.y - radius).floor() as i64).max(0);
        let y1 = ((center.y + radius).ceil() as i64).min(self.frame.height() as i64 - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: Style) {
        let half = (style.line_width / 2.0).max(0.5);
        // Integral margin keeps the clipped endpoints on the pixel grid.
        let margin = (half as f64).ceil() + 1.0;
        let bounds = (
            -margin,
            -margin,
            self.frame.width() as f64 + margin,
            self.frame.height() as f64 + margin,
        );
        let Some((from, to)) = clip_segment(from, to, bounds) else {
            return;
        };

        let len = from.distance(&to);
        let steps = len.ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            if half <= 0.5 {
                self.blend(p.x.round() as i64, p.y.round() as i64, style.color);
            } else {
                self.fill_circle(p, half, style.color);
            }
        }
    }
}

/// Bilinear sample at source coordinates `(u, v)`, clamped to the image edges.
fn sample_bilinear(image: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let u = u.clamp(0.0, max_x as f64);
    let v = v.clamp(0.0, max_y as f64);
    let x0 = u.floor() as i64;
    let y0 = v.floor() as i64;
    let x1 = (x0 + 1).min(max_x);
    let y1 = (y0 + 1).min(max_y);
    let fx = u - x0 as f64;
    let fy = v - y0 as f64;

    let tl = image.get_pixel(x0 as u32, y0 as u32);
    let tr = image.get_pixel(x1 as u32, y0 as u32);
    let bl = image.get_pixel(x0 as u32, y1 as u32);
    let br = image.get_pixel(x1 as u32, y1 as u32);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let val = tl[c] as f64 * (1.0 - fx) * (1.0 - fy)
            + tr[c] as f64 * fx * (1.0 - fy)
            + bl[c] as f64 * (1.0 - fx) * fy
            + br[c] as f64 * fx * fy;
        *slot = val.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Liang–Barsky clip of a segment to `(x_min, y_min, x_max, y_max)`.
///
/// Computed in f64: detector coordinates can be far outside the frame.
fn clip_segment(from: Point, to: Point, bounds: (f64, f64, f64, f64)) -> Option<(Point, Point)> {
    let (x_min, y_min, x_max, y_max) = bounds;
    let (x0, y0) = (from.x as f64, from.y as f64);
    let (x1, y1) = (to.x as f64, to.y as f64);
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (x1 - x0, y1 - y0);

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, x0 - x_min), (dx, x_max - x0), (-dy, y0 - y_min), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((
        Point::new((x0 + t0 * dx) as f32, (y0 + t0 * dy) as f32),
        Point::new((x0 + t1 * dx) as f32, (y0 + t1 * dy) as f32),
    ))
}
