//! Login, dashboard, material library and project history screens.

use eframe::egui;

use crate::app::Page;
use crate::library::Library;
use crate::model::{Material, Project};
use crate::thumbnails::ImageCache;

const CARD_SIZE: egui::Vec2 = egui::vec2(220.0, 124.0);
const SWATCH_SIZE: egui::Vec2 = egui::vec2(150.0, 150.0);

/// Returns the trimmed name once the user submits a non-blank one.
pub fn login(ctx: &egui::Context, name: &mut String) -> Option<String> {
    let mut submitted = None;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.25);
            ui.heading("RenoVision AI");
            ui.label("Design your dream home with Gemini");
            ui.add_space(24.0);
            ui.label("What should we call you?");
            let edit = ui.add(
                egui::TextEdit::singleline(name)
                    .hint_text("e.g. Alex")
                    .desired_width(240.0),
            );
            let ready = !name.trim().is_empty();
            let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(ready, egui::Button::new("Start Designing").min_size(egui::vec2(240.0, 32.0)))
                .clicked();
            if ready && (clicked || enter) {
                submitted = Some(name.trim().to_string());
            }
        });
    });
    submitted
}

pub fn dashboard(ctx: &egui::Context, library: &Library, images: &mut ImageCache) -> Option<Page> {
    let mut open = None;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading("Welcome back");
                ui.weak("Ready to start your next renovation?");
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("➕ Start New Project").clicked() {
                    open = Some(Page::Editor);
                }
            });
        });
        ui.separator();

        ui.horizontal(|ui| {
            if stat_card(ui, "Create", "New Design") {
                open = Some(Page::Editor);
            }
            if stat_card(ui, "Library", &format!("{} Materials", library.materials().len())) {
                open = Some(Page::Materials);
            }
            if stat_card(ui, "History", &format!("{} Projects", library.projects().len())) {
                open = Some(Page::History);
            }
        });

        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.strong("Recent Projects");
            if ui.link("View All →").clicked() {
                open = Some(Page::History);
            }
        });

        let recent = library.recent_projects(3);
        if recent.is_empty() {
            ui.weak("No projects yet. Start your first design!");
            return;
        }
        ui.horizontal_wrapped(|ui| {
            for project in recent {
                ui.vertical(|ui| {
                    ui.set_width(CARD_SIZE.x);
                    project_thumbnail(ui, images, project);
                    ui.weak(format_timestamp(project.timestamp));
                    ui.add(egui::Label::new(&project.prompt).truncate());
                });
            }
        });
    });
    open
}

fn stat_card(ui: &mut egui::Ui, caption: &str, value: &str) -> bool {
    let text = egui::RichText::new(format!("{}\n{}", caption, value)).size(16.0);
    ui.add(egui::Button::new(text).min_size(egui::vec2(180.0, 64.0)))
        .clicked()
}

/// Preview image plus an "Edited" badge when a result exists. Clickable.
fn project_thumbnail(ui: &mut egui::Ui, images: &mut ImageCache, project: &Project) -> egui::Response {
    let key = format!("preview-{}", project.id);
    let response = match images.image(&key, project.preview_image()) {
        Some(image) => ui.add(
            image
                .fit_to_exact_size(CARD_SIZE)
                .sense(egui::Sense::click()),
        ),
        None => ui.add(egui::Button::new("(no preview)").min_size(CARD_SIZE)),
    };
    if project.generated_image_base64.is_some() {
        let badge = response.rect.right_top() + egui::vec2(-6.0, 6.0);
        ui.painter().text(
            badge,
            egui::Align2::RIGHT_TOP,
            "Edited",
            egui::FontId::proportional(12.0),
            ui.visuals().selection.stroke.color,
        );
    }
    response
}

/// What the material page asks the app to do.
#[derive(Debug, PartialEq, Eq)]
pub enum MaterialAction {
    Add,
    Delete(String),
}

pub fn materials(ctx: &egui::Context, library: &Library, images: &mut ImageCache) -> Option<MaterialAction> {
    let mut action = None;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading("Material Library");
                ui.weak("Upload textures, colors, and items to use in your designs.");
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Add Material").clicked() {
                    action = Some(MaterialAction::Add);
                }
            });
        });
        ui.separator();

        if library.materials().is_empty() {
            ui.weak("No materials yet. Upload pictures of wood, paint swatches, or furniture!");
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for material in library.materials() {
                    if material_swatch(ui, images, material) {
                        action = Some(MaterialAction::Delete(material.id.clone()));
                    }
                }
            });
        });
    });
    action
}

/// Returns true when the swatch's delete button was pressed.
fn material_swatch(ui: &mut egui::Ui, images: &mut ImageCache, material: &Material) -> bool {
    let mut delete = false;
    ui.vertical(|ui| {
        let key = format!("material-{}", material.id);
        match images.image(&key, &material.image_base64) {
            Some(image) => {
                ui.add(image.fit_to_exact_size(SWATCH_SIZE));
            }
            None => {
                ui.allocate_space(SWATCH_SIZE);
            }
        }
        ui.horizontal(|ui| {
            ui.add(egui::Label::new(&material.name).truncate());
            ui.weak(material.category.label());
            delete = ui.small_button("🗑").on_hover_text("Delete").clicked();
        });
    });
    delete
}

/// Which project the details window is showing.
#[derive(Default)]
pub struct HistoryState {
    pub selected: Option<String>,
}

pub fn history(
    ctx: &egui::Context,
    library: &Library,
    images: &mut ImageCache,
    state: &mut HistoryState,
) -> Option<String> {
    let mut delete = None;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Project History");
        ui.weak("View and compare your past renovations.");
        ui.separator();

        let projects = library.projects_newest_first();
        if projects.is_empty() {
            ui.weak("No history found. Create your first project!");
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for project in projects {
                    ui.vertical(|ui| {
                        ui.set_width(CARD_SIZE.x);
                        if project_thumbnail(ui, images, project).clicked() {
                            state.selected = Some(project.id.clone());
                        }
                        ui.weak(format_timestamp(project.timestamp));
                        ui.add(egui::Label::new(format!("\"{}\"", project.prompt)).truncate());
                        if ui.small_button("🗑 Delete").clicked() {
                            delete = Some(project.id.clone());
                        }
                    });
                }
            });
        });
    });

    project_details(ctx, library, images, state);
    delete
}

fn project_details(ctx: &egui::Context, library: &Library, images: &mut ImageCache, state: &mut HistoryState) {
    let Some(project) = state
        .selected
        .as_deref()
        .and_then(|id| library.projects().iter().find(|p| p.id == id))
    else {
        state.selected = None;
        return;
    };

    let mut open = true;
    egui::Window::new("Project Details")
        .open(&mut open)
        .collapsible(false)
        .default_width(820.0)
        .show(ctx, |ui| {
            ui.columns(2, |columns| {
                columns[0].strong("Original");
                match images.image(&format!("original-{}", project.id), &project.original_image_base64) {
                    Some(image) => {
                        columns[0].add(image.max_width(400.0));
                    }
                    None => {
                        columns[0].weak("(unreadable image)");
                    }
                }

                columns[1].strong("AI Generated Result");
                match project
                    .generated_image_base64
                    .as_deref()
                    .and_then(|url| images.image(&format!("generated-{}", project.id), url))
                {
                    Some(image) => {
                        columns[1].add(image.max_width(400.0));
                    }
                    None => {
                        columns[1].weak("No result generated yet");
                    }
                }
            });
            ui.separator();
            ui.strong("Prompt Used:");
            ui.label(&project.prompt);
        });
    if !open {
        state.selected = None;
    }
}

/// `YYYY-MM-DD HH:MM` in UTC for a millisecond Unix timestamp.
pub fn format_timestamp(millis: u64) -> String {
    let secs = millis / 1000;
    let days = (secs / 86_400) as i64;
    let h = (secs % 86_400) / 3600;
    let m = (secs % 3600) / 60;

    // days since 1970-01-01 → civil date (proleptic Gregorian)
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };

    format!("{:04}-{:02}-{:02} {:02}:{:02}", year, month, day, h, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_and_leap_day() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        // 2024-02-29T13:45:00Z
        assert_eq!(format_timestamp(1_709_214_300_000), "2024-02-29 13:45");
        // 2000-03-01T00:00:00Z
        assert_eq!(format_timestamp(951_868_800_000), "2000-03-01 00:00");
    }
}
