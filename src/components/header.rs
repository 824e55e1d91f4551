use eframe::egui;

use crate::i18n::LANGUAGES;
use crate::session::View;

/// What the header asked for this frame.
#[derive(Debug, Default, PartialEq)]
pub struct HeaderResponse {
    pub navigate: Option<View>,
    pub language: Option<String>,
}

pub fn show(ui: &mut egui::Ui, current_language: &str) -> HeaderResponse {
    let mut out = HeaderResponse::default();
    ui.horizontal(|ui| {
        ui.heading(format!("🏯 {}", t!("app.title")));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let mut lang = current_language.to_string();
            egui::ComboBox::from_id_source("language")
                .selected_text(
                    LANGUAGES
                        .iter()
                        .find(|(code, _)| *code == lang)
                        .map(|(_, name)| *name)
                        .unwrap_or(current_language),
                )
                .show_ui(ui, |ui| {
                    for (code, name) in LANGUAGES {
                        ui.selectable_value(&mut lang, code.to_string(), *name);
                    }
                });
            if lang != current_language {
                out.language = Some(lang);
            }

            if ui.button(t!("header.gallery")).clicked() {
                out.navigate = Some(View::Gallery);
            }
            if ui.button(t!("header.home")).clicked() {
                out.navigate = Some(View::MainMenu);
            }
        });
    });
    out
}
