//! Mapping between source pixels, display pixels and viewport positions.

use eframe::egui;

/// Tallest the editing surface is allowed to get, in display pixels.
pub const DEFAULT_MAX_DISPLAY_HEIGHT: f32 = 600.0;

/// Uniform scale that fits a source image into the available display area.
///
/// The surface and the displayed image always share `display_size` and the
/// same origin, so display coordinates double as surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayTransform {
    pub source_size: [u32; 2],
    pub scale: f32,
    pub display_size: [u32; 2],
}

impl DisplayTransform {
    /// `scale = min(max_width / W, max_height / H)`; the aspect ratio is kept.
    /// Returns `None` for degenerate inputs (empty image or no room).
    pub fn fit(source_size: [u32; 2], max_width: f32, max_height: f32) -> Option<Self> {
        let [w, h] = source_size;
        if w == 0 || h == 0 || !(max_width > 0.0) || !(max_height > 0.0) {
            return None;
        }
        let scale = (max_width / w as f32).min(max_height / h as f32);
        let display_size = [
            ((w as f32 * scale).floor() as u32).max(1),
            ((h as f32 * scale).floor() as u32).max(1),
        ];
        Some(Self {
            source_size,
            scale,
            display_size,
        })
    }

    pub fn display_vec(&self) -> egui::Vec2 {
        egui::vec2(self.display_size[0] as f32, self.display_size[1] as f32)
    }
}

/// Raw pointer position as delivered by the host, in viewport coordinates.
#[derive(Clone, Copy, Debug)]
pub enum PointerInput<'a> {
    Mouse(egui::Pos2),
    /// Currently active touch points; only the first one draws.
    Touch(&'a [egui::Pos2]),
}

impl PointerInput<'_> {
    pub fn viewport_pos(&self) -> Option<egui::Pos2> {
        match self {
            PointerInput::Mouse(pos) => Some(*pos),
            PointerInput::Touch(touches) => touches.first().copied(),
        }
    }
}

/// Translate a viewport position into surface-local coordinates.
///
/// `surface_origin` must be the surface's top-left corner as laid out for the
/// event being handled; it moves with scrolling and resizing.
pub fn map_to_surface(input: PointerInput<'_>, surface_origin: egui::Pos2) -> Option<egui::Pos2> {
    input
        .viewport_pos()
        .map(|pos| (pos - surface_origin).to_pos2())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_halves_oversized_image() {
        let t = DisplayTransform::fit([800, 600], 400.0, DEFAULT_MAX_DISPLAY_HEIGHT).unwrap();
        assert_eq!(t.scale, 0.5);
        assert_eq!(t.display_size, [400, 300]);
    }

    #[test]
    fn fit_is_bounded_by_height() {
        let t = DisplayTransform::fit([1000, 2000], 1000.0, 600.0).unwrap();
        assert_eq!(t.scale, 0.3);
        assert_eq!(t.display_size, [300, 600]);
    }

    #[test]
    fn fit_upscales_small_image() {
        let t = DisplayTransform::fit([100, 50], 400.0, 600.0).unwrap();
        assert_eq!(t.scale, 4.0);
        assert_eq!(t.display_size, [400, 200]);
    }

    #[test]
    fn fit_rejects_degenerate_input() {
        assert!(DisplayTransform::fit([0, 10], 400.0, 600.0).is_none());
        assert!(DisplayTransform::fit([10, 10], 0.0, 600.0).is_none());
        assert!(DisplayTransform::fit([10, 10], f32::NAN, 600.0).is_none());
    }

    #[test]
    fn mouse_maps_relative_to_origin() {
        let origin = egui::pos2(120.0, 80.0);
        let mapped = map_to_surface(PointerInput::Mouse(egui::pos2(170.0, 130.0)), origin);
        assert_eq!(mapped, Some(egui::pos2(50.0, 50.0)));
    }

    #[test]
    fn touch_uses_first_point() {
        let touches = [egui::pos2(20.0, 30.0), egui::pos2(300.0, 300.0)];
        let mapped = map_to_surface(PointerInput::Touch(&touches), egui::pos2(10.0, 10.0));
        assert_eq!(mapped, Some(egui::pos2(10.0, 20.0)));
    }

    #[test]
    fn touch_without_points_maps_to_nothing() {
        assert_eq!(map_to_surface(PointerInput::Touch(&[]), egui::Pos2::ZERO), None);
    }
}
