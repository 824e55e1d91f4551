// ============================================================================
// DRAWING VIEW — hosts the surface inside an egui region
// ============================================================================
//
// egui points are the display space and `pixels_per_point` is the device
// pixel ratio.  Raw egui pointer and touch events are translated into
// `PointerInput` and fed to the stroke tracker; the backing store is shown
// as a texture at device resolution.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions, TouchId, TouchPhase, Vec2};

use super::{UiAction, alert_for, to_color32};
use crate::context::{PixelContext, Rgb};
use crate::export::Exporter;
use crate::session::{Session, View};
use crate::settings::AppSettings;
use crate::stroke::{ClientPoint, PointerInput, StrokeTracker};
use crate::surface::{
    DisplayRect, ERASER, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH, PALETTE, SurfaceHost, SurfaceManager,
};

/// Display height of the drawing region.
const CANVAS_HEIGHT: f32 = 400.0;

/// The egui region the surface is mounted in this frame.
pub struct EguiHost {
    pub rect: Rect,
    pub ratio: f32,
}

impl SurfaceHost for EguiHost {
    fn bounding_rect(&self) -> Option<DisplayRect> {
        if !self.rect.is_finite() || self.rect.width() <= 0.0 || self.rect.height() <= 0.0 {
            return None;
        }
        Some(DisplayRect::new(self.rect.left(), self.rect.top(), self.rect.width(), self.rect.height()))
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.ratio
    }
}

// ============================================================================
// Input translation
// ============================================================================

/// Turns egui's raw pointer and touch events into tracker input.
///
/// A gesture has to start inside the surface.  While fingers are down the
/// pointer events egui synthesizes from touches are ignored.
#[derive(Default)]
pub struct InputTranslator {
    /// Active touches in the order they went down.
    touches: Vec<(TouchId, Pos2)>,
    touch_gesture: bool,
    mouse_down: bool,
}

impl InputTranslator {
    fn touch_points(&self) -> Vec<ClientPoint> {
        self.touches.iter().map(|(_, p)| ClientPoint::new(p.x, p.y)).collect()
    }

    pub fn pointer_button(&mut self, pos: Pos2, pressed: bool, rect: Rect) -> Option<PointerInput> {
        if !self.touches.is_empty() {
            return None;
        }
        match (pressed, self.mouse_down) {
            (true, false) if rect.contains(pos) => {
                self.mouse_down = true;
                Some(PointerInput::MouseDown { x: pos.x, y: pos.y })
            }
            (false, true) => {
                self.mouse_down = false;
                Some(PointerInput::MouseUp)
            }
            _ => None,
        }
    }

    pub fn pointer_moved(&mut self, pos: Pos2, rect: Rect) -> Option<PointerInput> {
        if !self.touches.is_empty() || !self.mouse_down {
            return None;
        }
        if rect.contains(pos) {
            Some(PointerInput::MouseMove { x: pos.x, y: pos.y })
        } else {
            self.mouse_down = false;
            Some(PointerInput::MouseLeave)
        }
    }

    pub fn pointer_gone(&mut self) -> Option<PointerInput> {
        if !self.mouse_down {
            return None;
        }
        self.mouse_down = false;
        Some(PointerInput::MouseLeave)
    }

    pub fn touch(&mut self, id: TouchId, phase: TouchPhase, pos: Pos2, rect: Rect) -> Option<PointerInput> {
        match phase {
            TouchPhase::Start => {
                self.touches.push((id, pos));
                if self.touches.len() == 1 {
                    self.touch_gesture = rect.contains(pos);
                }
                self.touch_gesture
                    .then(|| PointerInput::TouchStart { touches: self.touch_points(), cancelable: true })
            }
            TouchPhase::Move => {
                if let Some(entry) = self.touches.iter_mut().find(|(t, _)| *t == id) {
                    entry.1 = pos;
                }
                self.touch_gesture
                    .then(|| PointerInput::TouchMove { touches: self.touch_points(), cancelable: true })
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.touches.retain(|(t, _)| *t != id);
                let gesture = self.touch_gesture;
                if self.touches.is_empty() {
                    self.touch_gesture = false;
                }
                gesture.then_some(if phase == TouchPhase::End {
                    PointerInput::TouchEnd
                } else {
                    PointerInput::TouchCancel
                })
            }
        }
    }

    fn translate(&mut self, event: &egui::Event, rect: Rect) -> Option<PointerInput> {
        match event {
            egui::Event::PointerButton { pos, button: egui::PointerButton::Primary, pressed, .. } => {
                self.pointer_button(*pos, *pressed, rect)
            }
            egui::Event::PointerMoved(pos) => self.pointer_moved(*pos, rect),
            egui::Event::PointerGone => self.pointer_gone(),
            egui::Event::Touch { id, phase, pos, .. } => self.touch(*id, *phase, *pos, rect),
            _ => None,
        }
    }
}

// ============================================================================
// View
// ============================================================================

pub struct DrawingView {
    surface: SurfaceManager<PixelContext>,
    tracker: StrokeTracker,
    input: InputTranslator,
    texture: Option<TextureHandle>,
    dirty: bool,
}

impl DrawingView {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            surface: SurfaceManager::pixel()
                .with_resize_policy(settings.resize_policy)
                .with_brush(settings.default_brush()),
            tracker: StrokeTracker::new(),
            input: InputTranslator::default(),
            texture: None,
            dirty: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut Session, exporter: &Exporter) -> Vec<UiAction> {
        let mut actions = Vec::new();

        ui.vertical_centered(|ui| {
            ui.heading(t!("drawing.heading"));
        });
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label(t!("drawing.title_label"));
            ui.add(
                egui::TextEdit::singleline(&mut session.drawing.title)
                    .hint_text(t!("drawing.title_hint"))
                    .desired_width(f32::INFINITY),
            );
        });
        ui.add_space(6.0);
        self.toolbar(ui);
        ui.add_space(6.0);

        let size = Vec2::new(ui.available_width(), CANVAS_HEIGHT);
        let (rect, _response) = ui.allocate_exact_size(size, Sense::drag());
        let host = EguiHost { rect, ratio: ui.ctx().pixels_per_point() };
        self.sync_surface(&host);

        let events = ui.input(|i| i.events.clone());
        self.feed(&events, &host, ui.is_enabled());

        self.paint(ui, rect);

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            if ui.button(t!("common.back")).clicked() {
                actions.push(UiAction::Navigate(View::MainMenu));
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(t!("drawing.save")).clicked() {
                    if let Err(e) = session.save_drawing(&self.surface, exporter) {
                        actions.push(UiAction::Alert(alert_for(&e)));
                    }
                }
                if ui.button(t!("drawing.download")).clicked() {
                    match session.download_drawing(&self.surface, exporter) {
                        Ok(file) => actions.push(UiAction::Download(file)),
                        Err(e) => actions.push(UiAction::Alert(alert_for(&e))),
                    }
                }
            });
        });

        actions
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let brush = self.surface.brush();
        ui.horizontal_wrapped(|ui| {
            ui.label(t!("drawing.color"));
            for color in PALETTE {
                if swatch(ui, color, brush.color == color).clicked() {
                    self.surface.set_brush(color, brush.width);
                }
            }
            if ui.selectable_label(brush.color == ERASER, t!("drawing.eraser")).clicked() {
                self.surface.set_brush(ERASER, brush.width);
            }

            ui.separator();
            ui.label(t!("drawing.width"));
            let mut width = brush.width;
            if ui.add(egui::Slider::new(&mut width, MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH)).changed() {
                self.surface.set_brush(brush.color, width);
            }

            ui.separator();
            if ui.button(t!("drawing.clear")).clicked() {
                self.surface.clear();
                self.dirty = true;
            }
        });
    }

    /// Route this frame's raw events to the tracker.  A disabled view (an
    /// alert is open on top of it) ends any open gesture and draws nothing.
    fn feed(&mut self, events: &[egui::Event], host: &EguiHost, accepting: bool) {
        if !accepting {
            if self.tracker.is_tracking() {
                self.tracker.handle(&PointerInput::MouseLeave, &mut self.surface, host);
            }
            self.input = InputTranslator::default();
            return;
        }
        for event in events {
            if let Some(input) = self.input.translate(event, host.rect) {
                let outcome = self.tracker.handle(&input, &mut self.surface, host);
                self.dirty |= outcome.drew;
            }
        }
    }

    /// Allocate on first show, reallocate when the region or ratio changes.
    fn sync_surface(&mut self, host: &EguiHost) {
        let result = if !self.surface.is_available() {
            self.surface.initialize(host)
        } else if let Some(rect) = host.bounding_rect()
            && !self.surface.matches(rect, host.ratio)
        {
            self.surface.handle_resize(host)
        } else {
            return;
        };
        if let Err(e) = result {
            log_warn!("Drawing: surface not ready: {}", e);
        }
        self.dirty = true;
    }

    fn paint(&mut self, ui: &mut egui::Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        let Some(ctx) = self.surface.context() else {
            painter.rect_filled(rect, 4.0, Color32::from_gray(230));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                t!("drawing.unavailable"),
                egui::FontId::proportional(16.0),
                Color32::DARK_GRAY,
            );
            return;
        };

        if self.dirty || self.texture.is_none() {
            let pixels = ctx.pixels();
            let size = [pixels.width() as usize, pixels.height() as usize];
            let image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
            match &mut self.texture {
                Some(tex) => tex.set(image, TextureOptions::LINEAR),
                None => self.texture = Some(ui.ctx().load_texture("drawing_surface", image, TextureOptions::LINEAR)),
            }
            self.dirty = false;
        }

        if let Some(tex) = &self.texture {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(tex.id(), rect, uv, Color32::WHITE);
        }
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, Color32::from_gray(200)));
    }
}

fn swatch(ui: &mut egui::Ui, color: Rgb, selected: bool) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(Vec2::splat(24.0), Sense::click());
    let p = ui.painter();
    p.circle_filled(rect.center(), 11.0, to_color32(color));
    if selected {
        p.circle_stroke(rect.center(), 12.0, egui::Stroke::new(2.0, Color32::from_rgb(0x3b, 0x82, 0xf6)));
    }
    response.on_hover_text(color.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(200.0, 100.0))
    }

    #[test]
    fn host_reports_egui_rect_and_ratio() {
        let host = EguiHost { rect: region(), ratio: 2.0 };
        assert_eq!(host.bounding_rect(), Some(DisplayRect::new(100.0, 50.0, 200.0, 100.0)));
        assert_eq!(host.device_pixel_ratio(), 2.0);
        assert!(EguiHost { rect: Rect::NOTHING, ratio: 1.0 }.bounding_rect().is_none());
    }

    #[test]
    fn mouse_gesture_must_start_inside() {
        let mut input = InputTranslator::default();
        assert_eq!(input.pointer_button(Pos2::new(10.0, 10.0), true, region()), None);
        assert_eq!(input.pointer_moved(Pos2::new(150.0, 60.0), region()), None);

        assert_eq!(
            input.pointer_button(Pos2::new(150.0, 60.0), true, region()),
            Some(PointerInput::MouseDown { x: 150.0, y: 60.0 })
        );
        assert_eq!(
            input.pointer_moved(Pos2::new(160.0, 70.0), region()),
            Some(PointerInput::MouseMove { x: 160.0, y: 70.0 })
        );
        assert_eq!(input.pointer_moved(Pos2::new(500.0, 70.0), region()), Some(PointerInput::MouseLeave));
        assert_eq!(input.pointer_button(Pos2::new(500.0, 70.0), false, region()), None);
    }

    #[test]
    fn touches_report_every_active_point_in_order() {
        let mut input = InputTranslator::default();
        let start = input.touch(TouchId(7), TouchPhase::Start, Pos2::new(120.0, 60.0), region());
        assert!(matches!(start, Some(PointerInput::TouchStart { ref touches, cancelable: true }) if touches.len() == 1));

        let second = input.touch(TouchId(9), TouchPhase::Start, Pos2::new(900.0, 900.0), region());
        let Some(PointerInput::TouchStart { touches, .. }) = second else { panic!("expected touch start") };
        assert_eq!(touches[0], ClientPoint::new(120.0, 60.0));
        assert_eq!(touches.len(), 2);

        // Synthesized mouse events are ignored while fingers are down.
        assert_eq!(input.pointer_button(Pos2::new(120.0, 60.0), true, region()), None);

        assert_eq!(input.touch(TouchId(7), TouchPhase::End, Pos2::new(120.0, 60.0), region()), Some(PointerInput::TouchEnd));
        assert_eq!(
            input.touch(TouchId(9), TouchPhase::Cancel, Pos2::new(900.0, 900.0), region()),
            Some(PointerInput::TouchCancel)
        );
        assert_eq!(input.touch(TouchId(9), TouchPhase::Move, Pos2::new(1.0, 1.0), region()), None);
    }

    #[test]
    fn touch_starting_outside_is_not_a_gesture() {
        let mut input = InputTranslator::default();
        assert_eq!(input.touch(TouchId(1), TouchPhase::Start, Pos2::new(0.0, 0.0), region()), None);
        assert_eq!(input.touch(TouchId(1), TouchPhase::Move, Pos2::new(150.0, 60.0), region()), None);
        assert_eq!(input.touch(TouchId(1), TouchPhase::End, Pos2::new(150.0, 60.0), region()), None);
    }

    #[test]
    fn translated_events_draw_at_surface_coordinates() {
        let rect = region();
        let host = EguiHost { rect, ratio: 2.0 };
        let mut view = DrawingView::new(&AppSettings::default());
        view.sync_surface(&host);
        assert_eq!(view.surface.device_size(), (400, 200));

        view.feed(&press_and_drag(), &host, true);
        // Display (50, 10) inside the region → device (100, 20).
        let pixels = view.surface.context().unwrap().pixels();
        assert_eq!(*pixels.get_pixel(100, 20), Rgb::INK.to_rgba());
    }

    fn press_and_drag() -> [egui::Event; 2] {
        [
            egui::Event::PointerButton {
                pos: Pos2::new(110.0, 60.0),
                button: egui::PointerButton::Primary,
                pressed: true,
                modifiers: egui::Modifiers::NONE,
            },
            egui::Event::PointerMoved(Pos2::new(190.0, 60.0)),
        ]
    }

    #[test]
    fn disabled_view_ignores_input_and_ends_gesture() {
        let rect = region();
        let host = EguiHost { rect, ratio: 1.0 };
        let mut view = DrawingView::new(&AppSettings::default());
        view.sync_surface(&host);

        // Clicking through an alert drawn over the surface.
        view.feed(&press_and_drag(), &host, false);
        assert!(!view.tracker.is_tracking());
        let white = crate::surface::BACKGROUND.to_rgba();
        assert!(view.surface.context().unwrap().pixels().pixels().all(|p| *p == white));

        // A gesture in progress when the alert opens is closed.
        view.feed(&press_and_drag()[..1], &host, true);
        assert!(view.tracker.is_tracking());
        view.feed(&[], &host, false);
        assert!(!view.tracker.is_tracking());
        view.feed(&[egui::Event::PointerMoved(Pos2::new(150.0, 80.0))], &host, true);
        assert!(view.surface.context().unwrap().pixels().pixels().all(|p| *p == white));
    }
}
