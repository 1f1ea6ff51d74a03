use eframe::egui;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::data_url;
use crate::editor::{Editor, EditorAction, IMAGE_EXTENSIONS};
use crate::error::GenerateError;
use crate::generate::{GenerationJob, ImageEditService};
use crate::library::Library;
use crate::model::{new_id, now_millis, GenerationConfig, Material, Project};
use crate::pages::{self, HistoryState, MaterialAction};
use crate::thumbnails::ImageCache;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Editor,
    Materials,
    History,
}

impl Page {
    const NAV: [(Page, &'static str); 4] = [
        (Page::Dashboard, "Dashboard"),
        (Page::Editor, "New Project"),
        (Page::Materials, "Materials"),
        (Page::History, "History"),
    ];
}

struct InFlight {
    job: GenerationJob,
    material_id: Option<String>,
}

pub struct RenoApp {
    library: Library,
    service: Option<Arc<dyn ImageEditService>>,
    page: Page,
    login_name: String,
    editor: Editor,
    history: HistoryState,
    images: ImageCache,
    in_flight: Option<InFlight>,
    /// Persistence problems, shown in the status bar until dismissed.
    notice: Option<String>,
}

impl RenoApp {
    pub fn new(
        ctx: &egui::Context,
        config: &Config,
        library: Library,
        service: Option<Arc<dyn ImageEditService>>,
    ) -> Self {
        let mut editor = Editor::new(config.brush_size, config.max_display_height);
        let mut page = Page::Dashboard;
        if let Some(path) = &config.image {
            editor.open_file(ctx, path);
            page = Page::Editor;
        }

        Self {
            library,
            service,
            page,
            login_name: String::new(),
            editor,
            history: HistoryState::default(),
            images: ImageCache::default(),
            in_flight: None,
            notice: None,
        }
    }

    fn report<E: std::fmt::Display>(&mut self, what: &str, result: Result<(), E>) {
        if let Err(e) = result {
            log::error!("{} failed: {}", what, e);
            self.notice = Some(format!("Could not {}: {}", what, e));
        }
    }

    // ── Generation ──────────────────────────────────────────────────────────

    fn start_generation(
        &mut self,
        ctx: &egui::Context,
        request: GenerationConfig,
        material_id: Option<String>,
    ) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(service) = self.service.clone() else {
            self.editor.show_error(GenerateError::MissingApiKey.to_string());
            return;
        };
        log::info!(
            "generating (mask: {}, material: {})",
            request.mask_image.is_some(),
            request.material_image.is_some()
        );
        let repaint = ctx.clone();
        let job = GenerationJob::spawn(service, request, move || repaint.request_repaint());
        self.in_flight = Some(InFlight { job, material_id });
    }

    /// Collect a finished generation, if any, and save it as a project.
    fn poll_generation(&mut self) {
        let Some(in_flight) = &self.in_flight else {
            return;
        };
        let Some(result) = in_flight.job.poll() else {
            return;
        };
        let Some(InFlight { job, material_id }) = self.in_flight.take() else {
            return;
        };

        match result {
            Ok(image) => {
                let request = job.request();
                let project = Project {
                    id: new_id(),
                    original_image_base64: request.original_image.clone(),
                    generated_image_base64: Some(image.clone()),
                    prompt: request.prompt.clone(),
                    timestamp: now_millis(),
                    mask_image_base64: request.mask_image.clone(),
                    used_material_id: material_id,
                };
                log::info!("generation finished, saved as project {}", project.id);
                self.editor.show_result(&project.id, image);
                let saved = self.library.add_project(project);
                self.report("save the project", saved);
            }
            Err(e) => {
                log::error!("generation failed: {}", e);
                self.editor.show_error(match e {
                    GenerateError::Refused(reason) => reason,
                    other => other.to_string(),
                });
            }
        }
    }

    // ── Library actions ─────────────────────────────────────────────────────

    fn add_material(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.report("read the material", Err(e));
                return;
            }
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("material")
            .to_string();
        let material = Material::new(name, data_url::from_image_bytes(&bytes));
        log::info!("adding material {} ({})", material.name, material.id);
        let saved = self.library.add_material(material);
        self.report("save the material", saved);
    }

    fn delete_material(&mut self, ctx: &egui::Context, id: &str) {
        self.images.forget(ctx, &format!("material-{}", id));
        let deleted = self.library.delete_material(id);
        self.report("delete the material", deleted);
    }

    fn delete_project(&mut self, ctx: &egui::Context, id: &str) {
        for prefix in ["preview", "original", "generated"] {
            self.images.forget(ctx, &format!("{}-{}", prefix, id));
        }
        let deleted = self.library.delete_project(id);
        self.report("delete the project", deleted);
    }

    fn logout(&mut self) {
        let result = self.library.logout();
        self.report("sign out", result);
        self.page = Page::Dashboard;
        self.editor.reset();
        self.login_name.clear();
    }

    // ── Layout ──────────────────────────────────────────────────────────────

    fn nav_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("nav")
            .resizable(false)
            .exact_width(180.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("RenoVision");
                ui.separator();
                for (page, label) in Page::NAV {
                    ui.selectable_value(&mut self.page, page, label);
                }

                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    ui.add_space(8.0);
                    if ui.button("Log out").clicked() {
                        self.logout();
                    }
                    if let Some(user) = self.library.user() {
                        ui.strong(&user.username);
                    }
                    ui.separator();
                });
            });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notice.clone() else {
            return;
        };
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(ui.visuals().warn_fg_color, notice);
                if ui.small_button("Dismiss").clicked() {
                    self.notice = None;
                }
            });
        });
    }
}

impl eframe::App for RenoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_generation();
        self.status_bar(ctx);

        if self.library.user().is_none() {
            if let Some(name) = pages::login(ctx, &mut self.login_name) {
                let result = self.library.login(&name);
                self.report("sign in", result);
            }
            return;
        }

        self.nav_panel(ctx);

        match self.page {
            Page::Dashboard => {
                if let Some(page) = pages::dashboard(ctx, &self.library, &mut self.images) {
                    self.page = page;
                }
            }
            Page::Editor => {
                let processing = self.in_flight.is_some();
                match self.editor.show(ctx, &self.library, &mut self.images, processing) {
                    Some(EditorAction::Generate {
                        request,
                        material_id,
                    }) => self.start_generation(ctx, request, material_id),
                    Some(EditorAction::ManageMaterials) => self.page = Page::Materials,
                    None => {}
                }
            }
            Page::Materials => match pages::materials(ctx, &self.library, &mut self.images) {
                Some(MaterialAction::Add) => self.add_material(),
                Some(MaterialAction::Delete(id)) => self.delete_material(ctx, &id),
                None => {}
            },
            Page::History => {
                if let Some(id) = pages::history(ctx, &self.library, &mut self.images, &mut self.history) {
                    self.delete_project(ctx, &id);
                }
            }
        }

        // the worker wakes us when it finishes; this is a fallback
        if self.in_flight.is_some() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{scratch_dir, Store};
    use clap::Parser;
    use std::time::Instant;

    struct Fixed(Result<&'static str, &'static str>);

    impl ImageEditService for Fixed {
        fn generate(&self, _: &GenerationConfig) -> Result<String, GenerateError> {
            self.0
                .map(str::to_string)
                .map_err(|reason| GenerateError::Refused(reason.to_string()))
        }
    }

    fn app(service: Option<Arc<dyn ImageEditService>>) -> (RenoApp, egui::Context) {
        let ctx = egui::Context::default();
        let config = Config::try_parse_from(["renovision"]).unwrap();
        let library = Library::load(Store::open(scratch_dir("app")).unwrap());
        (RenoApp::new(&ctx, &config, library, service), ctx)
    }

    fn request() -> GenerationConfig {
        GenerationConfig {
            prompt: "Add a modern rug".into(),
            original_image: "data:image/png;base64,AAAA".into(),
            mask_image: Some("data:image/png;base64,BBBB".into()),
            material_image: None,
        }
    }

    fn settle(app: &mut RenoApp) {
        let start = Instant::now();
        while app.in_flight.is_some() {
            assert!(start.elapsed() < Duration::from_secs(5), "generation never finished");
            std::thread::sleep(Duration::from_millis(5));
            app.poll_generation();
        }
    }

    #[test]
    fn successful_generation_is_saved_as_project() {
        let (mut app, ctx) = app(Some(Arc::new(Fixed(Ok("data:image/png;base64,CCCC")))));
        app.start_generation(&ctx, request(), Some("m1".into()));
        settle(&mut app);

        let projects = app.library.projects();
        assert_eq!(projects.len(), 1);
        let project = &projects[0];
        assert_eq!(project.prompt, "Add a modern rug");
        assert_eq!(project.generated_image_base64.as_deref(), Some("data:image/png;base64,CCCC"));
        assert_eq!(project.mask_image_base64.as_deref(), Some("data:image/png;base64,BBBB"));
        assert_eq!(project.used_material_id.as_deref(), Some("m1"));
    }

    #[test]
    fn failed_generation_saves_nothing() {
        let (mut app, ctx) = app(Some(Arc::new(Fixed(Err("No image generated")))));
        app.start_generation(&ctx, request(), None);
        settle(&mut app);
        assert!(app.library.projects().is_empty());
    }

    #[test]
    fn missing_service_never_spawns() {
        let (mut app, ctx) = app(None);
        app.start_generation(&ctx, request(), None);
        assert!(app.in_flight.is_none());
    }

    #[test]
    fn deleting_a_project_persists() {
        let (mut app, ctx) = app(Some(Arc::new(Fixed(Ok("data:image/png;base64,CCCC")))));
        app.start_generation(&ctx, request(), None);
        settle(&mut app);
        let id = app.library.projects()[0].id.clone();
        app.delete_project(&ctx, &id);
        assert!(app.library.projects().is_empty());
        assert!(app.notice.is_none());
    }
}
