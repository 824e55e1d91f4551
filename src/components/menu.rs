use eframe::egui;
use egui::{Color32, RichText, Vec2};

use crate::session::View;

pub fn show(ui: &mut egui::Ui) -> Option<View> {
    let mut chosen = None;
    ui.vertical_centered(|ui| {
        ui.add_space(16.0);
        ui.heading(t!("menu.heading"));
        ui.label(t!("menu.subtitle"));
        ui.add_space(24.0);

        ui.horizontal(|ui| {
            let card = Vec2::new(260.0, 140.0);
            let left_pad = ((ui.available_width() - card.x * 2.0 - 24.0) / 2.0).max(0.0);
            ui.add_space(left_pad);
            if menu_card(ui, card, &t!("menu.drawing"), &t!("menu.drawing_desc"), Color32::from_rgb(0xe0, 0xf2, 0xfe)) {
                chosen = Some(View::Drawing);
            }
            ui.add_space(24.0);
            if menu_card(ui, card, &t!("menu.writing"), &t!("menu.writing_desc"), Color32::from_rgb(0xd1, 0xfa, 0xe5)) {
                chosen = Some(View::Writing);
            }
        });
    });
    chosen
}

fn menu_card(ui: &mut egui::Ui, size: Vec2, title: &str, desc: &str, fill: Color32) -> bool {
    let text = RichText::new(format!("{title}\n\n{desc}")).size(16.0).color(Color32::from_gray(40));
    ui.add_sized(size, egui::Button::new(text).fill(fill).rounding(12.0)).clicked()
}
