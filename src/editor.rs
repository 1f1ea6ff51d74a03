//! The editor page: photo upload, mask canvas, prompt, material picker and
//! the generated result.

use eframe::egui;
use std::path::Path;

use crate::data_url;
use crate::error::MaskError;
use crate::library::Library;
use crate::mask::{MaskChange, MaskSurface, PaintLayer, PointerInput, ToolMode};
use crate::model::{GenerationConfig, Material};
use crate::thumbnails::ImageCache;

/// Red at 50 % opacity, premultiplied.
const OVERLAY_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(128, 0, 0, 128);

/// Canvas width assumed before the first layout pass.
const FALLBACK_CANVAS_WIDTH: f32 = 800.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Requests the editor hands back to the app.
#[derive(Debug)]
pub enum EditorAction {
    Generate {
        request: GenerationConfig,
        material_id: Option<String>,
    },
    ManageMaterials,
}

struct SourceImage {
    data_url: String,
    texture: egui::TextureHandle,
}

struct GeneratedImage {
    key: String,
    data_url: String,
}

pub struct Editor {
    surface: MaskSurface,
    source: Option<SourceImage>,
    overlay: Option<egui::TextureHandle>,
    overlay_revision: Option<u64>,
    /// Latest mask as a PNG data URL; `None` means "edit anywhere".
    mask: Option<String>,
    prompt: String,
    material_id: Option<String>,
    mode: ToolMode,
    brush_size: f32,
    max_display_height: f32,
    canvas_width: f32,
    touches: Vec<(egui::TouchId, egui::Pos2)>,
    result: Option<GeneratedImage>,
    error: Option<String>,
}

impl Editor {
    pub fn new(brush_size: f32, max_display_height: f32) -> Self {
        Self {
            surface: MaskSurface::new(),
            source: None,
            overlay: None,
            overlay_revision: None,
            mask: None,
            prompt: String::new(),
            material_id: None,
            mode: ToolMode::View,
            brush_size,
            max_display_height,
            canvas_width: 0.0,
            touches: Vec::new(),
            result: None,
            error: None,
        }
    }

    pub fn open_file(&mut self, ctx: &egui::Context, path: &Path) {
        match std::fs::read(path) {
            Ok(bytes) => {
                if let Err(e) = self.load_bytes(ctx, &bytes) {
                    log::error!("cannot open {}: {}", path.display(), e);
                    self.error = Some(format!("Could not read {} as an image.", path.display()));
                } else {
                    log::info!("opened {}", path.display());
                }
            }
            Err(e) => {
                log::error!("cannot read {}: {}", path.display(), e);
                self.error = Some(format!("Could not open {}: {}", path.display(), e));
            }
        }
    }

    /// Replace the photo being edited. Result, mask and error are dropped and
    /// the brush is picked up, so the user can start marking right away.
    pub fn load_bytes(&mut self, ctx: &egui::Context, bytes: &[u8]) -> Result<(), MaskError> {
        self.source = None;
        self.result = None;
        self.mask = None;
        self.error = None;
        self.touches.clear();

        let width = if self.canvas_width > 0.0 {
            self.canvas_width
        } else {
            FALLBACK_CANVAS_WIDTH
        };
        let image = self
            .surface
            .load_image(bytes, width, self.max_display_height)?;

        let rgba = image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        let texture = ctx.load_texture("source_image", color_image, egui::TextureOptions::LINEAR);

        self.source = Some(SourceImage {
            data_url: data_url::from_image_bytes(bytes),
            texture,
        });
        self.mode = ToolMode::Paint;
        Ok(())
    }

    fn upload(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.open_file(ctx, &path);
        }
    }

    /// Forget photo, prompt, mask and result. The material choice stays.
    pub fn reset(&mut self) {
        self.surface.unload();
        self.source = None;
        self.prompt.clear();
        self.mask = None;
        self.result = None;
        self.error = None;
        self.touches.clear();
    }

    /// `None` until there is both a photo and a non-blank prompt.
    pub fn generation_request(&self, library: &Library) -> Option<(GenerationConfig, Option<String>)> {
        let source = self.source.as_ref()?;
        if self.prompt.trim().is_empty() {
            return None;
        }
        let material = self
            .material_id
            .as_deref()
            .and_then(|id| library.material(id));
        let request = GenerationConfig {
            prompt: self.prompt.clone(),
            original_image: source.data_url.clone(),
            mask_image: self.mask.clone(),
            material_image: material.map(|m| m.image_base64.clone()),
        };
        Some((request, material.map(|m| m.id.clone())))
    }

    pub fn show_result(&mut self, project_id: &str, data_url: String) {
        self.error = None;
        self.result = Some(GeneratedImage {
            key: format!("generated-{}", project_id),
            data_url,
        });
    }

    pub fn show_error(&mut self, message: String) {
        self.error = Some(message);
    }

    fn apply_change(&mut self, change: Option<MaskChange>) {
        match change {
            Some(MaskChange::Updated(mask)) => self.mask = Some(mask.to_data_url()),
            Some(MaskChange::Cleared) => self.mask = None,
            None => {}
        }
    }

    // ── Layout ──────────────────────────────────────────────────────────────

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        library: &Library,
        images: &mut ImageCache,
        processing: bool,
    ) -> Option<EditorAction> {
        let mut action = None;

        egui::SidePanel::right("editor_controls")
            .resizable(false)
            .exact_width(300.0)
            .show(ctx, |ui| {
                action = self.controls(ui, library, images, processing);
            });

        if self.source.is_some() && self.result.is_none() {
            egui::TopBottomPanel::top("mask_toolbar").show(ctx, |ui| {
                self.toolbar(ui);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Editor");
                if self.source.is_some() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Reset").clicked() {
                            self.reset();
                        }
                    });
                }
            });
            ui.separator();

            if self.source.is_none() {
                self.upload_prompt(ui);
            } else if self.result.is_some() {
                self.result_view(ui, images);
            } else {
                self.canvas(ui);
            }
        });

        action
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.mode, ToolMode::Paint, "Mark Area");
            ui.selectable_value(&mut self.mode, ToolMode::Erase, "Eraser");
            ui.selectable_value(&mut self.mode, ToolMode::View, "View");
            ui.separator();
            ui.label("Brush:");
            ui.add(egui::Slider::new(&mut self.brush_size, 5.0..=100.0));
            ui.separator();
            if ui.button("Clear mask").clicked() {
                let change = self.surface.clear();
                self.apply_change(change);
            }
            ui.separator();
            ui.weak("Draw on the image to select area");
        });
    }

    fn upload_prompt(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            let button = egui::Button::new(
                egui::RichText::new("Upload a photo of your room").size(20.0),
            )
            .min_size(egui::vec2(320.0, 120.0));
            if ui.add(button).clicked() {
                self.upload(ui.ctx());
            }
            ui.weak("JPG or PNG supported");
        });
    }

    fn result_view(&mut self, ui: &mut egui::Ui, images: &mut ImageCache) {
        ui.horizontal(|ui| {
            if ui.button("Back to Edit").clicked() {
                self.result = None;
            }
            if ui.button("Save image…").clicked() {
                self.save_result();
            }
        });
        let Some(result) = &self.result else {
            return;
        };
        match images.image(&result.key, &result.data_url) {
            Some(image) => {
                ui.add(image.shrink_to_fit());
            }
            None => {
                ui.colored_label(ui.visuals().error_fg_color, "The generated image could not be displayed.");
            }
        }
    }

    fn save_result(&mut self) {
        let Some(result) = &self.result else {
            return;
        };
        let parsed = match data_url::parse(&result.data_url) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.error = Some(format!("Cannot save image: {}", e));
                return;
            }
        };
        let ext = data_url::extension_for(&parsed.mime);
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &[ext])
            .set_file_name(format!("renovation.{}", ext))
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, &parsed.bytes) {
            Ok(()) => log::info!("saved result to {}", path.display()),
            Err(e) => {
                log::error!("cannot write {}: {}", path.display(), e);
                self.error = Some(format!("Could not save {}: {}", path.display(), e));
            }
        }
    }

    fn controls(
        &mut self,
        ui: &mut egui::Ui,
        library: &Library,
        images: &mut ImageCache,
        processing: bool,
    ) -> Option<EditorAction> {
        let mut action = None;

        ui.add_space(8.0);
        ui.strong("Describe the Change");
        ui.add(
            egui::TextEdit::multiline(&mut self.prompt)
                .hint_text("e.g. 'Paint the walls sage green', 'Remove the chair', 'Add a modern rug'")
                .desired_rows(5)
                .desired_width(f32::INFINITY),
        );

        ui.separator();
        ui.horizontal(|ui| {
            ui.strong("Use Material (Optional)");
            if ui.small_button("Manage").clicked() {
                action = Some(EditorAction::ManageMaterials);
            }
        });
        self.material_picker(ui, library.materials(), images);

        ui.separator();
        let ready = self.source.is_some() && !self.prompt.trim().is_empty() && !processing;
        let label = if processing {
            "Designing..."
        } else {
            "Generate Renovation"
        };
        let button = egui::Button::new(label).min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(ready, button).clicked() {
            if let Some((request, material_id)) = self.generation_request(library) {
                self.error = None;
                action = Some(EditorAction::Generate {
                    request,
                    material_id,
                });
            }
        }
        if processing {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Waiting for Gemini…");
            });
        }
        if let Some(error) = &self.error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }

        ui.add_space(12.0);
        ui.weak(
            "Tip: masking helps Gemini focus. To change a wall, draw over the wall; \
             to remove an object, draw over the object.",
        );

        action
    }

    fn material_picker(&mut self, ui: &mut egui::Ui, materials: &[Material], images: &mut ImageCache) {
        if materials.is_empty() {
            ui.weak("No materials saved yet.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("material_picker")
            .max_height(180.0)
            .show(ui, |ui| {
                egui::Grid::new("material_picker_grid")
                    .spacing([6.0, 6.0])
                    .show(ui, |ui| {
                        for (i, material) in materials.iter().enumerate() {
                            let key = format!("material-{}", material.id);
                            let response = match images.image(&key, &material.image_base64) {
                                Some(image) => ui.add(
                                    image
                                        .fit_to_exact_size(egui::vec2(80.0, 80.0))
                                        .sense(egui::Sense::click()),
                                ),
                                None => ui.add(
                                    egui::Button::new(&material.name).min_size(egui::vec2(80.0, 80.0)),
                                ),
                            };
                            let selected = self.material_id.as_deref() == Some(material.id.as_str());
                            if selected {
                                ui.painter().rect_stroke(
                                    response.rect.expand(2.0),
                                    4.0,
                                    egui::Stroke::new(2.0, ui.visuals().selection.stroke.color),
                                    egui::StrokeKind::Outside,
                                );
                            }
                            if response.on_hover_text(&material.name).clicked() {
                                self.material_id = if selected {
                                    None
                                } else {
                                    Some(material.id.clone())
                                };
                            }
                            if i % 3 == 2 {
                                ui.end_row();
                            }
                        }
                    });
            });

        let selected = self
            .material_id
            .as_deref()
            .and_then(|id| materials.iter().find(|m| m.id == id));
        if let Some(material) = selected {
            ui.label(format!("Selected: {}", material.name));
        }
    }

    // ── Mask canvas ─────────────────────────────────────────────────────────

    fn canvas(&mut self, ui: &mut egui::Ui) {
        self.fit_canvas(ui.available_width());
        self.sync_overlay(ui.ctx());

        let Some(transform) = self.surface.transform().copied() else {
            return;
        };
        let Some(texture_id) = self.source.as_ref().map(|s| s.texture.id()) else {
            return;
        };

        let (response, painter) = ui.allocate_painter(transform.display_vec(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        self.route_input(ui.ctx(), rect);
        self.sync_overlay(ui.ctx());

        painter.image(texture_id, rect, uv, egui::Color32::WHITE);
        if let Some(overlay) = &self.overlay {
            painter.image(overlay.id(), rect, uv, egui::Color32::WHITE);
        }
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color),
            egui::StrokeKind::Outside,
        );

        // brush outline
        if self.mode != ToolMode::View {
            if let Some(pos) = response.hover_pos() {
                painter.circle_stroke(
                    pos,
                    self.brush_size / 2.0,
                    egui::Stroke::new(1.0, egui::Color32::WHITE),
                );
            }
        }

        if let Some(layer) = self.surface.layer() {
            let [sw, sh] = transform.source_size;
            ui.weak(if layer.is_empty() {
                format!("{} × {} photo, no area marked (the whole image may change)", sw, sh)
            } else {
                format!(
                    "{} × {} photo, {} px marked in {} strokes",
                    sw,
                    sh,
                    layer.covered_count(),
                    self.surface.stroke_count()
                )
            });
        }
    }

    /// Follow the panel width. A rescaled layer also replaces the held mask.
    fn fit_canvas(&mut self, available: f32) {
        if (available - self.canvas_width).abs() < 1.0 {
            return;
        }
        self.canvas_width = available;
        let change = self.surface.relayout(available, self.max_display_height);
        self.apply_change(change);
    }

    /// Forward this frame's raw pointer events to the surface. The canvas
    /// rect is re-read every frame, so scrolling and resizing are honoured.
    fn route_input(&mut self, ctx: &egui::Context, rect: egui::Rect) {
        let events = ctx.input(|i| i.events.clone());
        self.route_events(&events, rect);
    }

    fn route_events(&mut self, events: &[egui::Event], rect: egui::Rect) {
        // egui mirrors the first finger as mouse events; use the touch stream
        // alone when it is present.
        let touch_frame = events.iter().any(|e| matches!(e, egui::Event::Touch { .. }));

        for event in events {
            let change = match *event {
                egui::Event::Touch { id, phase, pos, .. } => self.touch_event(id, phase, pos, rect),
                _ if touch_frame => None,
                _ => self.pointer_event(event, rect),
            };
            self.apply_change(change);
        }
    }

    /// One mouse event. Presses only count inside `rect`; leaving it while
    /// drawing ends the stroke.
    fn pointer_event(&mut self, event: &egui::Event, rect: egui::Rect) -> Option<MaskChange> {
        match *event {
            egui::Event::PointerButton {
                pos,
                button: egui::PointerButton::Primary,
                pressed: true,
                ..
            } => {
                if rect.contains(pos) {
                    self.surface
                        .pointer_down(PointerInput::Mouse(pos), rect.min, self.mode, self.brush_size);
                }
                None
            }
            egui::Event::PointerButton {
                button: egui::PointerButton::Primary,
                pressed: false,
                ..
            } => self.surface.pointer_up(),
            egui::Event::PointerMoved(pos) => {
                if rect.contains(pos) {
                    self.surface.pointer_move(PointerInput::Mouse(pos), rect.min);
                    None
                } else if self.surface.is_drawing() {
                    self.surface.pointer_leave()
                } else {
                    None
                }
            }
            egui::Event::PointerGone => self.surface.pointer_leave(),
            _ => None,
        }
    }

    fn touch_event(
        &mut self,
        id: egui::TouchId,
        phase: egui::TouchPhase,
        pos: egui::Pos2,
        rect: egui::Rect,
    ) -> Option<MaskChange> {
        match phase {
            egui::TouchPhase::Start => {
                self.touches.push((id, pos));
                if self.touches.len() == 1 && rect.contains(pos) {
                    let points = self.touch_points();
                    self.surface
                        .pointer_down(PointerInput::Touch(&points), rect.min, self.mode, self.brush_size);
                }
                None
            }
            egui::TouchPhase::Move => {
                if let Some(touch) = self.touches.iter_mut().find(|t| t.0 == id) {
                    touch.1 = pos;
                }
                if self.touches.first().map(|t| t.0) != Some(id) {
                    return None;
                }
                if rect.contains(pos) {
                    let points = self.touch_points();
                    self.surface.pointer_move(PointerInput::Touch(&points), rect.min);
                    None
                } else {
                    self.surface.pointer_leave()
                }
            }
            egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                let was_first = self.touches.first().map(|t| t.0) == Some(id);
                self.touches.retain(|t| t.0 != id);
                if was_first {
                    self.surface.pointer_up()
                } else {
                    None
                }
            }
        }
    }

    fn touch_points(&self) -> Vec<egui::Pos2> {
        self.touches.iter().map(|t| t.1).collect()
    }

    /// Re-upload the overlay texture when the layer changed since last time.
    fn sync_overlay(&mut self, ctx: &egui::Context) {
        let revision = self.surface.revision();
        if self.overlay_revision == Some(revision) {
            return;
        }
        self.overlay_revision = Some(revision);

        let Some(layer) = self.surface.layer() else {
            self.overlay = None;
            return;
        };
        let image = overlay_image(layer);
        match &mut self.overlay {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.overlay = Some(ctx.load_texture("mask_overlay", image, egui::TextureOptions::NEAREST));
            }
        }
    }
}

/// Translucent red wherever the layer is covered, transparent elsewhere.
pub fn overlay_image(layer: &PaintLayer) -> egui::ColorImage {
    let (w, h) = layer.dimensions();
    let mut image = egui::ColorImage::new([w as usize, h as usize], egui::Color32::TRANSPARENT);
    for (dst, src) in image.pixels.iter_mut().zip(layer.coverage().pixels()) {
        if src.0[0] > 0 {
            *dst = OVERLAY_COLOR;
        }
    }
    image
}
