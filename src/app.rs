use std::sync::Arc;
use std::sync::mpsc;

use eframe::egui;

use crate::components::drawing::DrawingView;
use crate::components::gallery::GalleryView;
use crate::components::{UiAction, header, menu, writing};
use crate::export::Exporter;
use crate::idea::{IdeaError, IdeaGenerator};
use crate::session::{DownloadFile, IdeaTicket, Session, View};
use crate::settings::AppSettings;

/// Result of a background idea request.
struct IdeaResult {
    ticket: IdeaTicket,
    result: Result<String, IdeaError>,
}

pub struct HeritagePromoApp {
    settings: AppSettings,
    session: Session,
    drawing: DrawingView,
    gallery: GalleryView,
    exporter: Exporter,
    generator: Arc<dyn IdeaGenerator>,
    idea_sender: mpsc::Sender<IdeaResult>,
    idea_receiver: mpsc::Receiver<IdeaResult>,
    /// Blocking message shown in a modal window until acknowledged.
    alert: Option<String>,
    /// Last download destination, shown under the header.
    status: Option<String>,
}

/// Find a system font with Hangul coverage for the UI.
/// Returns `(font_name, font_bytes)` if found.
fn discover_system_hangul_font() -> Option<(String, Vec<u8>)> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let families: Vec<FamilyName> = crate::caption::HANGUL_FAMILIES
        .iter()
        .map(|f| FamilyName::Title(f.to_string()))
        .collect();
    let handle = SystemSource::new().select_best_match(&families, &Properties::new()).ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    (data.len() > 100).then(|| (format!("system_hangul:{}", font.family_name()), (*data).clone()))
}

impl HeritagePromoApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();

        if settings.language.is_empty() {
            crate::i18n::set_language(&crate::i18n::detect_system_language());
        } else {
            crate::i18n::set_language(&settings.language);
        }

        // egui's bundled fonts have no Hangul; put a system face first.
        {
            let mut fonts = egui::FontDefinitions::default();
            match discover_system_hangul_font() {
                Some((name, data)) => {
                    log_info!("UI font: {}", name);
                    fonts.font_data.insert(name.clone(), egui::FontData::from_owned(data));
                    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                        fonts.families.entry(family).or_default().insert(0, name.clone());
                    }
                }
                None => log_warn!("UI font: no Hangul system font found"),
            }
            cc.egui_ctx.set_fonts(fonts);
        }
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let (idea_sender, idea_receiver) = mpsc::channel();
        Self {
            drawing: DrawingView::new(&settings),
            gallery: GalleryView::default(),
            exporter: Exporter::with_system_font(&settings.caption_font),
            generator: crate::idea::connect(&settings),
            session: Session::new(),
            idea_sender,
            idea_receiver,
            alert: None,
            status: None,
            settings,
        }
    }

    fn navigate(&mut self, view: View) {
        if view == View::Drawing && self.session.view() != View::Drawing {
            self.drawing = DrawingView::new(&self.settings);
        }
        self.session.navigate(view);
    }

    fn apply(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::Navigate(view) => self.navigate(view),
            UiAction::Alert(message) => self.alert = Some(message),
            UiAction::Download(file) => self.download(file),
            UiAction::StartIdea(ticket) => self.start_idea(ctx, ticket),
        }
    }

    fn download(&mut self, file: DownloadFile) {
        match crate::io::save_with_dialog(&file) {
            Some(Ok(path)) => self.status = Some(t!("status.downloaded", path = path.display())),
            Some(Err(e)) => {
                log_err!("Download of {} failed: {}", file.file_name, e);
                self.alert = Some(t!("alert.write_failed", error = e));
            }
            None => {}
        }
    }

    fn start_idea(&self, ctx: &egui::Context, ticket: IdeaTicket) {
        log_info!("Idea: requesting suggestion for {:?}", ticket.heritage_name);
        let generator = Arc::clone(&self.generator);
        let sender = self.idea_sender.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = generator.generate(&ticket.heritage_name);
            let _ = sender.send(IdeaResult { ticket, result });
            ctx.request_repaint();
        });
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else { return };
        let mut close = false;
        egui::Window::new(t!("alert.title"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button(t!("common.ok")).clicked() {
                        close = true;
                    }
                });
            });
        if close || ctx.input(|i| i.key_pressed(egui::Key::Enter) || i.key_pressed(egui::Key::Escape)) {
            self.alert = None;
        }
    }
}

impl eframe::App for HeritagePromoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll background idea requests ---
        while let Ok(done) = self.idea_receiver.try_recv() {
            // Failures are already reported inline on the writing form.
            let _ = self.session.finish_idea_request(&done.ticket, done.result);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            let response = header::show(ui, &crate::i18n::current_language());
            if let Some(lang) = response.language {
                crate::i18n::set_language(&lang);
                self.settings.language = lang;
                self.settings.save();
            }
            if let Some(view) = response.navigate {
                self.navigate(view);
            }
            if let Some(status) = &self.status {
                ui.small(status);
            }
            ui.add_space(4.0);
        });

        let blocked = self.alert.is_some();
        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_enabled(!blocked);
            match self.session.view() {
                View::MainMenu => {
                    if let Some(view) = menu::show(ui) {
                        actions.push(UiAction::Navigate(view));
                    }
                }
                View::Drawing => {
                    actions = self.drawing.show(ui, &mut self.session, &self.exporter);
                }
                View::Writing => {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        actions = writing::show(ui, &mut self.session);
                    });
                }
                View::Gallery => {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        self.gallery.show(ui, &mut self.session);
                    });
                }
            }
        });
        for action in actions {
            self.apply(ctx, action);
        }

        self.show_alert(ctx);
    }
}
