use std::collections::HashMap;

use eframe::egui;
use egui::{Color32, TextureHandle, TextureOptions, Vec2};
use uuid::Uuid;

use crate::export::decode_data_uri;
use crate::plan::Plan;
use crate::session::Session;

const CARD_WIDTH: f32 = 260.0;
const THUMB_HEIGHT: f32 = 160.0;

/// Gallery of saved plans.  Drawing thumbnails are decoded once per plan.
#[derive(Default)]
pub struct GalleryView {
    thumbnails: HashMap<Uuid, Option<TextureHandle>>,
}

impl GalleryView {
    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut Session) {
        ui.vertical_centered(|ui| {
            ui.heading(t!("gallery.heading"));
        });
        ui.add_space(8.0);

        if let Some(notice) = session.notice().map(str::to_string) {
            ui.horizontal(|ui| {
                ui.colored_label(Color32::from_rgb(0x15, 0x80, 0x3d), notice);
                if ui.small_button("✕").clicked() {
                    session.dismiss_notice();
                }
            });
            ui.add_space(6.0);
        }

        let plans = session.gallery().list();
        if plans.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.label(t!("gallery.empty"));
            });
            return;
        }

        ui.label(t!("gallery.count", count = plans.len()));
        ui.add_space(6.0);
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing = Vec2::new(16.0, 16.0);
            for plan in plans {
                self.card(ui, plan);
            }
        });
    }

    fn card(&mut self, ui: &mut egui::Ui, plan: &Plan) {
        egui::Frame::group(ui.style())
            .fill(Color32::from_rgb(0xff, 0xfb, 0xeb))
            .rounding(10.0)
            .show(ui, |ui| {
                ui.set_width(CARD_WIDTH);
                ui.strong(&plan.title);
                ui.small(format!("{} · {}", plan.kind.label(), plan.created_label()));
                ui.add_space(4.0);
                if plan.is_drawing() {
                    match self.thumbnail(ui.ctx(), plan) {
                        Some(tex) => {
                            let size = tex.size_vec2();
                            let scale = (CARD_WIDTH / size.x).min(THUMB_HEIGHT / size.y).min(1.0);
                            ui.image((tex.id(), size * scale));
                        }
                        None => {
                            ui.label(t!("gallery.image_unavailable"));
                        }
                    }
                } else {
                    egui::ScrollArea::vertical()
                        .id_source(plan.id)
                        .max_height(THUMB_HEIGHT)
                        .show(ui, |ui| {
                            ui.label(&plan.content);
                        });
                }
            });
    }

    fn thumbnail(&mut self, ctx: &egui::Context, plan: &Plan) -> Option<TextureHandle> {
        self.thumbnails
            .entry(plan.id)
            .or_insert_with(|| {
                let bytes = decode_data_uri(&plan.content)?;
                let img = match image::load_from_memory(&bytes) {
                    Ok(img) => img.to_rgba8(),
                    Err(e) => {
                        log_warn!("Gallery: could not decode plan {}: {}", plan.id, e);
                        return None;
                    }
                };
                let size = [img.width() as usize, img.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
                Some(ctx.load_texture(format!("plan_{}", plan.id), color_image, TextureOptions::LINEAR))
            })
            .clone()
    }
}
