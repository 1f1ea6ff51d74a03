//! The mask authoring surface: stroke state machine over a paint layer.

use eframe::egui;
use image::DynamicImage;

use super::layer::{BinaryMask, BrushStroke, PaintLayer, StrokeMode};
use super::transform::{map_to_surface, DisplayTransform, PointerInput};
use crate::error::MaskError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    View,
    Paint,
    Erase,
}

impl ToolMode {
    fn stroke_mode(self) -> Option<StrokeMode> {
        match self {
            ToolMode::View => None,
            ToolMode::Paint => Some(StrokeMode::Paint),
            ToolMode::Erase => Some(StrokeMode::Erase),
        }
    }
}

/// What the surface reports to its owner when the selection changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaskChange {
    /// A stroke completed; this is the freshly extracted mask.
    Updated(BinaryMask),
    /// The layer was explicitly cleared; no mask should be sent.
    Cleared,
}

/// Owns the paint layer of one editing session.
///
/// All handlers run synchronously on the caller's thread. Until an image has
/// been loaded (or while it fails to decode) every input is ignored.
#[derive(Default)]
pub struct MaskSurface {
    transform: Option<DisplayTransform>,
    layer: Option<PaintLayer>,
    strokes: Vec<BrushStroke>,
    active: Option<BrushStroke>,
    revision: u64,
}

impl MaskSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a new source image and start an empty session sized for it.
    ///
    /// On decode failure the surface is left unsized and the error returned.
    pub fn load_image(
        &mut self,
        bytes: &[u8],
        max_width: f32,
        max_height: f32,
    ) -> Result<DynamicImage, MaskError> {
        self.unload();
        let image = image::load_from_memory(bytes)?;
        if self
            .set_source_size([image.width(), image.height()], max_width, max_height)
            .is_none()
        {
            return Err(MaskError::Unsized);
        }
        Ok(image)
    }

    /// Start an empty session for a source of the given intrinsic size.
    pub fn set_source_size(
        &mut self,
        source_size: [u32; 2],
        max_width: f32,
        max_height: f32,
    ) -> Option<DisplayTransform> {
        self.unload();
        let transform = DisplayTransform::fit(source_size, max_width, max_height)?;
        let [w, h] = transform.display_size;
        self.transform = Some(transform);
        self.layer = Some(PaintLayer::new(w, h));
        log::debug!(
            "mask surface sized {}x{} (source {}x{}, scale {:.3})",
            w,
            h,
            source_size[0],
            source_size[1],
            transform.scale
        );
        Some(transform)
    }

    /// Drop the source image and every stroke.
    pub fn unload(&mut self) {
        self.transform = None;
        self.layer = None;
        self.strokes.clear();
        self.active = None;
        self.revision += 1;
    }

    /// Refit to a new container size. Existing strokes follow the image.
    ///
    /// When committed strokes were re-rasterized, the mask is re-extracted at
    /// the new display size so the owner never holds one of the old size.
    pub fn relayout(&mut self, max_width: f32, max_height: f32) -> Option<MaskChange> {
        let old = self.transform?;
        let new = DisplayTransform::fit(old.source_size, max_width, max_height)?;
        if new.display_size == old.display_size {
            return None;
        }

        let factor = new.scale / old.scale;
        self.strokes = self.strokes.iter().map(|s| s.scaled(factor)).collect();
        self.active = self.active.as_ref().map(|s| s.scaled(factor));

        let [w, h] = new.display_size;
        let mut layer = PaintLayer::new(w, h);
        for stroke in self.strokes.iter().chain(self.active.iter()) {
            layer.apply_stroke(stroke);
        }
        self.layer = Some(layer);
        self.transform = Some(new);
        self.revision += 1;
        log::debug!("mask surface relaid out to {}x{}", w, h);

        if self.strokes.is_empty() {
            return None;
        }
        match self.extract_mask() {
            Ok(mask) => Some(MaskChange::Updated(mask)),
            Err(e) => {
                log::warn!("mask extraction after relayout failed: {}", e);
                Some(MaskChange::Cleared)
            }
        }
    }

    pub fn transform(&self) -> Option<&DisplayTransform> {
        self.transform.as_ref()
    }

    pub fn layer(&self) -> Option<&PaintLayer> {
        self.layer.as_ref()
    }

    /// Bumped on every change to the layer; lets the UI skip texture uploads.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// idle → drawing. Returns true when a stroke was started.
    pub fn pointer_down(
        &mut self,
        input: PointerInput<'_>,
        surface_origin: egui::Pos2,
        mode: ToolMode,
        brush_width: f32,
    ) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(stroke_mode) = mode.stroke_mode() else {
            return false;
        };
        let Some(layer) = self.layer.as_mut() else {
            return false;
        };
        let Some(start) = map_to_surface(input, surface_origin) else {
            return false;
        };

        let stroke = BrushStroke::new(stroke_mode, brush_width.max(1.0), start);
        layer.apply_stroke(&stroke);
        self.active = Some(stroke);
        self.revision += 1;
        true
    }

    /// drawing → drawing. Returns true when the event extended a stroke, in
    /// which case the host should not scroll.
    pub fn pointer_move(&mut self, input: PointerInput<'_>, surface_origin: egui::Pos2) -> bool {
        let (Some(stroke), Some(layer)) = (self.active.as_mut(), self.layer.as_mut()) else {
            return false;
        };
        let Some(pos) = map_to_surface(input, surface_origin) else {
            return false;
        };
        if let Some(&last) = stroke.points.last() {
            layer.stamp_segment(last, pos, stroke.width, stroke.mode);
        }
        stroke.points.push(pos);
        self.revision += 1;
        true
    }

    /// drawing → idle. Extracts and returns the mask for the whole layer.
    pub fn pointer_up(&mut self) -> Option<MaskChange> {
        let stroke = self.active.take()?;
        log::debug!(
            "{:?} stroke committed ({} points, width {})",
            stroke.mode,
            stroke.points.len(),
            stroke.width
        );
        self.strokes.push(stroke);

        match self.extract_mask() {
            Ok(mask) => {
                log::debug!("mask extracted ({}x{})", mask.width, mask.height);
                Some(MaskChange::Updated(mask))
            }
            Err(e) => {
                log::warn!("mask extraction failed: {}", e);
                None
            }
        }
    }

    /// Pointer left the surface; ends the stroke exactly like a release.
    pub fn pointer_leave(&mut self) -> Option<MaskChange> {
        self.pointer_up()
    }

    /// Wipe every stroke. The owner should forget its mask.
    pub fn clear(&mut self) -> Option<MaskChange> {
        let layer = self.layer.as_mut()?;
        layer.clear();
        self.strokes.clear();
        self.active = None;
        self.revision += 1;
        Some(MaskChange::Cleared)
    }

    pub fn extract_mask(&self) -> Result<BinaryMask, MaskError> {
        self.layer
            .as_ref()
            .ok_or(MaskError::Unsized)?
            .extract_mask()
    }
}
