use eframe::egui;
use egui::Color32;

use super::{UiAction, alert_for};
use crate::session::{Session, View};

/// Text plan form: title (heritage name), free-text content and the idea button.
pub fn show(ui: &mut egui::Ui, session: &mut Session) -> Vec<UiAction> {
    let mut actions = Vec::new();

    ui.vertical_centered(|ui| {
        ui.heading(t!("writing.heading"));
    });
    ui.add_space(8.0);

    ui.label(t!("writing.title_label"));
    ui.add(
        egui::TextEdit::singleline(&mut session.writing.title)
            .hint_text(t!("writing.title_hint"))
            .desired_width(f32::INFINITY),
    );
    ui.add_space(8.0);

    ui.label(t!("writing.content_label"));
    ui.add(
        egui::TextEdit::multiline(&mut session.writing.content)
            .hint_text(t!("writing.content_hint"))
            .desired_rows(10)
            .desired_width(f32::INFINITY),
    );
    ui.add_space(8.0);

    ui.vertical_centered(|ui| {
        let in_flight = session.writing.idea_in_flight();
        let label = if in_flight { t!("writing.thinking") } else { t!("writing.idea_button") };
        if ui.add_enabled(!in_flight, egui::Button::new(label)).clicked() {
            match session.begin_idea_request() {
                Ok(ticket) => actions.push(UiAction::StartIdea(ticket)),
                Err(e) => actions.push(UiAction::Alert(alert_for(&e))),
            }
        }
        if in_flight {
            ui.spinner();
        }
        if let Some(error) = &session.writing.error {
            ui.colored_label(Color32::from_rgb(0xdc, 0x26, 0x26), error);
        }
    });

    ui.add_space(10.0);
    ui.horizontal(|ui| {
        if ui.button(t!("common.back")).clicked() {
            actions.push(UiAction::Navigate(View::MainMenu));
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button(t!("writing.save")).clicked()
                && let Err(e) = session.save_text()
            {
                actions.push(UiAction::Alert(alert_for(&e)));
            }
            if ui.button(t!("writing.download")).clicked() {
                match session.download_text() {
                    Ok(file) => actions.push(UiAction::Download(file)),
                    Err(e) => actions.push(UiAction::Alert(alert_for(&e))),
                }
            }
        });
    });

    actions
}
