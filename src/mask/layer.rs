//! Coverage raster and binary mask extraction.

use std::io::Cursor;

use eframe::egui;
use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

use crate::data_url;
use crate::error::MaskError;

const MASK_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const MASK_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeMode {
    /// Adds coverage.
    Paint,
    /// Removes existing coverage.
    Erase,
}

/// One committed gesture, kept in display space.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushStroke {
    pub mode: StrokeMode,
    /// Line width in display pixels; caps and joins are round.
    pub width: f32,
    pub points: Vec<egui::Pos2>,
}

impl BrushStroke {
    pub fn new(mode: StrokeMode, width: f32, start: egui::Pos2) -> Self {
        Self {
            mode,
            width,
            points: vec![start],
        }
    }

    /// Same gesture under a different display scale.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            mode: self.mode,
            width: self.width * factor,
            points: self
                .points
                .iter()
                .map(|p| egui::pos2(p.x * factor, p.y * factor))
                .collect(),
        }
    }
}

/// Coverage buffer the strokes are composited into.
///
/// One byte per pixel; non-zero means covered. It stands in for the alpha
/// channel of a transparent paint overlay.
#[derive(Clone, Debug)]
pub struct PaintLayer {
    coverage: GrayImage,
}

impl PaintLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            coverage: GrayImage::new(width, height),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    pub fn coverage(&self) -> &GrayImage {
        &self.coverage
    }

    pub fn clear(&mut self) {
        self.coverage.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.as_raw().iter().all(|&v| v == 0)
    }

    #[cfg(test)]
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.coverage
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] > 0)
    }

    pub fn covered_count(&self) -> usize {
        self.coverage.as_raw().iter().filter(|&&v| v > 0).count()
    }

    /// Composite a whole stroke. A single-point stroke leaves a round dot.
    pub fn apply_stroke(&mut self, stroke: &BrushStroke) {
        match stroke.points.as_slice() {
            [] => {}
            [only] => self.stamp_segment(*only, *only, stroke.width, stroke.mode),
            points => {
                for pair in points.windows(2) {
                    self.stamp_segment(pair[0], pair[1], stroke.width, stroke.mode);
                }
            }
        }
    }

    /// Rasterize one round-capped segment of the given width.
    ///
    /// A pixel belongs to the segment when its centre lies within `width / 2`
    /// of the segment. Paint sets coverage, erase clears it; pixels outside
    /// the segment are untouched.
    pub fn stamp_segment(&mut self, a: egui::Pos2, b: egui::Pos2, width: f32, mode: StrokeMode) {
        let (w, h) = self.coverage.dimensions();
        if w == 0 || h == 0 || !a.is_finite() || !b.is_finite() || !width.is_finite() {
            return;
        }
        let half = (width * 0.5).max(0.5);

        let min_x = (a.x.min(b.x) - half).floor().max(0.0) as u32;
        let min_y = (a.y.min(b.y) - half).floor().max(0.0) as u32;
        let max_x = ((a.x.max(b.x) + half).ceil().max(0.0) as u32).min(w - 1);
        let max_y = ((a.y.max(b.y) + half).ceil().max(0.0) as u32).min(h - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let value = match mode {
            StrokeMode::Paint => 255,
            StrokeMode::Erase => 0,
        };
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let centre = egui::pos2(x as f32 + 0.5, y as f32 + 0.5);
                if point_to_segment_dist(centre, a, b) <= half {
                    self.coverage.put_pixel(x, y, Luma([value]));
                }
            }
        }
    }

    /// Full-buffer pass: opaque white where covered, opaque black elsewhere.
    pub fn binarize(&self) -> RgbaImage {
        let (w, h) = self.coverage.dimensions();
        let mut out = RgbaImage::from_pixel(w, h, MASK_BLACK);
        for (src, dst) in self.coverage.pixels().zip(out.pixels_mut()) {
            if src.0[0] > 0 {
                *dst = MASK_WHITE;
            }
        }
        out
    }

    /// Binarize and encode as PNG. Reads the buffer fresh on every call.
    pub fn extract_mask(&self) -> Result<BinaryMask, MaskError> {
        let image = self.binarize();
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(MaskError::Encode)?;
        Ok(BinaryMask {
            width: image.width(),
            height: image.height(),
            png,
        })
    }
}

/// Encoded black/white mask handed out by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    png: Vec<u8>,
}

impl BinaryMask {
    #[cfg(test)]
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn to_data_url(&self) -> String {
        data_url::encode("image/png", &self.png)
    }

    #[cfg(test)]
    pub fn decode(&self) -> Result<RgbaImage, MaskError> {
        Ok(image::load_from_memory_with_format(&self.png, ImageFormat::Png)?.into_rgba8())
    }
}

fn point_to_segment_dist(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint(points: &[(f32, f32)], width: f32) -> BrushStroke {
        stroke(StrokeMode::Paint, points, width)
    }

    fn stroke(mode: StrokeMode, points: &[(f32, f32)], width: f32) -> BrushStroke {
        BrushStroke {
            mode,
            width,
            points: points.iter().map(|&(x, y)| egui::pos2(x, y)).collect(),
        }
    }

    #[test]
    fn new_layer_is_empty() {
        let layer = PaintLayer::new(40, 30);
        assert!(layer.is_empty());
        assert_eq!(layer.dimensions(), (40, 30));
    }

    #[test]
    fn single_point_stroke_is_a_round_dot() {
        let mut layer = PaintLayer::new(40, 40);
        layer.apply_stroke(&paint(&[(20.0, 20.0)], 10.0));
        assert!(layer.is_covered(20, 20));
        assert!(layer.is_covered(15, 19));
        assert!(layer.is_covered(24, 20));
        // Corner of the bounding square is outside the disk.
        assert!(!layer.is_covered(15, 15));
        assert!(!layer.is_covered(26, 20));
    }

    #[test]
    fn segment_coverage_follows_distance_rule() {
        let mut layer = PaintLayer::new(100, 100);
        layer.apply_stroke(&paint(&[(10.0, 50.0), (90.0, 50.0)], 20.0));
        // Centres at y + 0.5 within 10 of y = 50 → rows 40..=59.
        assert!(!layer.is_covered(50, 39));
        assert!(layer.is_covered(50, 40));
        assert!(layer.is_covered(50, 59));
        assert!(!layer.is_covered(50, 60));
        // Round caps reach past the end points.
        assert!(layer.is_covered(1, 50));
        assert!(!layer.is_covered(0, 40));
    }

    #[test]
    fn erase_only_removes_its_own_coverage() {
        let mut layer = PaintLayer::new(100, 100);
        layer.apply_stroke(&paint(&[(10.0, 50.0), (90.0, 50.0)], 20.0));
        layer.apply_stroke(&stroke(StrokeMode::Erase, &[(50.0, 50.0)], 10.0));
        assert!(!layer.is_covered(50, 50));
        assert!(layer.is_covered(30, 50));
        assert!(layer.is_covered(50, 42));
    }

    #[test]
    fn erase_on_empty_layer_is_a_no_op() {
        let mut layer = PaintLayer::new(20, 20);
        layer.apply_stroke(&stroke(StrokeMode::Erase, &[(0.0, 0.0), (20.0, 20.0)], 8.0));
        assert!(layer.is_empty());
    }

    #[test]
    fn strokes_outside_the_layer_are_clipped() {
        let mut layer = PaintLayer::new(20, 20);
        layer.apply_stroke(&paint(&[(-50.0, -50.0), (-30.0, -30.0)], 8.0));
        layer.apply_stroke(&paint(&[(500.0, 5.0), (600.0, 5.0)], 8.0));
        assert!(layer.is_empty());
        layer.apply_stroke(&paint(&[(-10.0, 10.0), (30.0, 10.0)], 4.0));
        assert!(layer.is_covered(0, 10));
        assert!(layer.is_covered(19, 10));
    }

    #[test]
    fn binarize_produces_only_opaque_black_and_white() {
        let mut layer = PaintLayer::new(30, 30);
        layer.apply_stroke(&paint(&[(5.0, 5.0), (25.0, 25.0)], 6.0));
        let out = layer.binarize();
        let mut white = 0;
        for p in out.pixels() {
            assert!(*p == MASK_BLACK || *p == MASK_WHITE, "unexpected pixel {p:?}");
            if *p == MASK_WHITE {
                white += 1;
            }
        }
        assert_eq!(white, layer.covered_count());
    }

    #[test]
    fn extracted_mask_decodes_to_same_pixels() {
        let mut layer = PaintLayer::new(32, 16);
        layer.apply_stroke(&paint(&[(4.0, 8.0), (28.0, 8.0)], 4.0));
        let mask = layer.extract_mask().unwrap();
        assert_eq!((mask.width, mask.height), (32, 16));
        assert_eq!(mask.decode().unwrap(), layer.binarize());
        assert!(mask.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn scaled_stroke_scales_points_and_width() {
        let s = paint(&[(10.0, 20.0), (30.0, 40.0)], 8.0).scaled(0.5);
        assert_eq!(s.width, 4.0);
        assert_eq!(s.points, vec![egui::pos2(5.0, 10.0), egui::pos2(15.0, 20.0)]);
    }

    #[test]
    fn degenerate_segment_distance_is_point_distance() {
        let a = egui::pos2(3.0, 4.0);
        assert_eq!(point_to_segment_dist(egui::Pos2::ZERO, a, a), 5.0);
    }
}
