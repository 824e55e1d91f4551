// ============================================================================
// STROKE TRACKER — pointer / touch gestures into committed path segments
// ============================================================================
//
// Two states: Idle and Tracking.  Event positions arrive in client
// coordinates and are turned into display-space surface coordinates by
// subtracting the surface's bounding-box origin.  The context already carries
// the device pixel ratio, so the ratio is never applied here.

use serde::{Deserialize, Serialize};

use crate::context::DrawContext;
use crate::surface::{SurfaceHost, SurfaceManager};

/// A position in client (viewport) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientPoint {
    pub x: f32,
    pub y: f32,
}

impl ClientPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Platform input, normalized to the events the tracker understands.
///
/// Touch events carry the list of currently active touches; only the first
/// one is ever used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerInput {
    MouseDown { x: f32, y: f32 },
    MouseMove { x: f32, y: f32 },
    MouseUp,
    MouseLeave,
    TouchStart {
        touches: Vec<ClientPoint>,
        #[serde(default = "default_cancelable")]
        cancelable: bool,
    },
    TouchMove {
        touches: Vec<ClientPoint>,
        #[serde(default = "default_cancelable")]
        cancelable: bool,
    },
    TouchEnd,
    TouchCancel,
}

fn default_cancelable() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackerState {
    Idle,
    /// `last` is the most recent display-space point of the open path.
    Tracking { last: (f32, f32) },
}

/// What the host should do with the platform event after dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Suppress the platform default (page scrolling for touches).
    pub prevent_default: bool,
    /// A segment was committed to the surface.
    pub drew: bool,
}

#[derive(Debug)]
pub struct StrokeTracker {
    state: TrackerState,
}

impl Default for StrokeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeTracker {
    pub fn new() -> Self {
        Self { state: TrackerState::Idle }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking { .. })
    }

    /// Feed one input event.  `host` supplies the surface's current bounding
    /// box for the client → surface conversion.
    pub fn handle<C: DrawContext>(
        &mut self,
        event: &PointerInput,
        surface: &mut SurfaceManager<C>,
        host: &dyn SurfaceHost,
    ) -> EventOutcome {
        match event {
            PointerInput::MouseDown { x, y } => {
                self.start(ClientPoint::new(*x, *y), surface, host);
                EventOutcome::default()
            }
            PointerInput::MouseMove { x, y } => EventOutcome {
                prevent_default: false,
                drew: self.extend(ClientPoint::new(*x, *y), surface, host),
            },
            PointerInput::TouchStart { touches, cancelable } => {
                if let Some(first) = touches.first() {
                    self.start(*first, surface, host);
                }
                EventOutcome { prevent_default: *cancelable, drew: false }
            }
            PointerInput::TouchMove { touches, cancelable } => {
                let prevent_default = *cancelable && self.is_tracking();
                let drew = match touches.first() {
                    Some(first) => self.extend(*first, surface, host),
                    None => false,
                };
                EventOutcome { prevent_default, drew }
            }
            PointerInput::MouseUp
            | PointerInput::MouseLeave
            | PointerInput::TouchEnd
            | PointerInput::TouchCancel => {
                self.finish(surface);
                EventOutcome::default()
            }
        }
    }

    /// Idle → Tracking.  A fresh down while already tracking restarts the path.
    fn start<C: DrawContext>(
        &mut self,
        at: ClientPoint,
        surface: &mut SurfaceManager<C>,
        host: &dyn SurfaceHost,
    ) {
        let Some(local) = to_local(at, host) else { return };
        let Some(ctx) = surface.context_mut() else { return };
        ctx.begin_path(local.0, local.1);
        self.state = TrackerState::Tracking { last: local };
    }

    /// Tracking → Tracking, committing one segment.  No-op while Idle.
    fn extend<C: DrawContext>(
        &mut self,
        at: ClientPoint,
        surface: &mut SurfaceManager<C>,
        host: &dyn SurfaceHost,
    ) -> bool {
        let TrackerState::Tracking { .. } = self.state else { return false };
        let Some(local) = to_local(at, host) else { return false };
        let Some(ctx) = surface.context_mut() else { return false };
        ctx.line_to(local.0, local.1);
        ctx.stroke();
        self.state = TrackerState::Tracking { last: local };
        true
    }

    /// Any → Idle.
    fn finish<C: DrawContext>(&mut self, surface: &mut SurfaceManager<C>) {
        if !self.is_tracking() {
            return;
        }
        if let Some(ctx) = surface.context_mut() {
            ctx.close_path();
        }
        self.state = TrackerState::Idle;
    }
}

/// Client coordinates → display-space surface coordinates.
pub fn to_local(at: ClientPoint, host: &dyn SurfaceHost) -> Option<(f32, f32)> {
    let rect = host.bounding_rect()?;
    Some((at.x - rect.left, at.y - rect.top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::recording::{Call, RecordingContext};
    use crate::surface::StaticHost;

    fn recording_surface(host: &StaticHost) -> SurfaceManager<RecordingContext> {
        let mut surface = SurfaceManager::new(Some(RecordingContext::new()));
        surface.initialize(host).unwrap();
        surface
    }

    fn path_calls(surface: &SurfaceManager<RecordingContext>) -> Vec<Call> {
        surface.context().unwrap().path_calls()
    }

    #[test]
    fn gesture_strokes_every_point_in_order() {
        let host = StaticHost::new(300.0, 400.0, 1.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::MouseDown { x: 1.0, y: 1.0 }, &mut surface, &host);
        for (x, y) in [(2.0, 3.0), (5.0, 8.0), (13.0, 21.0)] {
            let outcome = tracker.handle(&PointerInput::MouseMove { x, y }, &mut surface, &host);
            assert!(outcome.drew);
        }
        tracker.handle(&PointerInput::MouseUp, &mut surface, &host);

        assert_eq!(
            path_calls(&surface),
            vec![
                Call::BeginPath(1.0, 1.0),
                Call::LineTo(2.0, 3.0),
                Call::Stroke,
                Call::LineTo(5.0, 8.0),
                Call::Stroke,
                Call::LineTo(13.0, 21.0),
                Call::Stroke,
                Call::ClosePath,
            ]
        );
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn gesture_inks_every_segment_on_pixels() {
        let host = StaticHost::at(5.0, 5.0, 100.0, 20.0, 1.0);
        let mut surface = SurfaceManager::pixel();
        surface.initialize(&host).unwrap();
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::MouseDown { x: 15.0, y: 15.0 }, &mut surface, &host);
        for x in [35.0, 65.0, 95.0] {
            tracker.handle(&PointerInput::MouseMove { x, y: 15.0 }, &mut surface, &host);
        }
        tracker.handle(&PointerInput::MouseUp, &mut surface, &host);

        let pixels = surface.context().unwrap().pixels();
        let ink = surface.brush().color.to_rgba();
        // One sample inside each committed segment, in surface coordinates.
        for x in [20, 45, 75] {
            assert_eq!(*pixels.get_pixel(x, 10), ink, "x = {x}");
        }
        assert_eq!(*pixels.get_pixel(45, 19), crate::surface::BACKGROUND.to_rgba());
    }

    #[test]
    fn moves_while_idle_draw_nothing() {
        let host = StaticHost::new(100.0, 100.0, 1.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();

        let outcome = tracker.handle(&PointerInput::MouseMove { x: 4.0, y: 4.0 }, &mut surface, &host);
        assert!(!outcome.drew);

        tracker.handle(&PointerInput::MouseDown { x: 1.0, y: 1.0 }, &mut surface, &host);
        tracker.handle(&PointerInput::MouseLeave, &mut surface, &host);
        tracker.handle(&PointerInput::MouseMove { x: 9.0, y: 9.0 }, &mut surface, &host);

        assert_eq!(path_calls(&surface), vec![Call::BeginPath(1.0, 1.0), Call::ClosePath]);
    }

    #[test]
    fn high_density_strokes_stay_in_display_space() {
        let host = StaticHost::new(300.0, 400.0, 2.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();
        assert_eq!(surface.device_size(), (600, 800));

        tracker.handle(&PointerInput::MouseDown { x: 10.0, y: 10.0 }, &mut surface, &host);
        tracker.handle(&PointerInput::MouseMove { x: 50.0, y: 50.0 }, &mut surface, &host);

        let calls = path_calls(&surface);
        assert_eq!(calls[0], Call::BeginPath(10.0, 10.0));
        assert_eq!(calls[1], Call::LineTo(50.0, 50.0));
    }

    #[test]
    fn client_coordinates_are_offset_by_surface_origin() {
        let host = StaticHost::at(120.0, 80.0, 300.0, 200.0, 2.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::MouseDown { x: 130.0, y: 90.0 }, &mut surface, &host);
        tracker.handle(&PointerInput::MouseMove { x: 170.0, y: 130.0 }, &mut surface, &host);

        let calls = path_calls(&surface);
        assert_eq!(calls[0], Call::BeginPath(10.0, 10.0));
        assert_eq!(calls[1], Call::LineTo(50.0, 50.0));
    }

    #[test]
    fn only_first_touch_is_tracked() {
        let host = StaticHost::new(200.0, 200.0, 1.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();

        let start = PointerInput::TouchStart {
            touches: vec![ClientPoint::new(10.0, 10.0), ClientPoint::new(150.0, 150.0)],
            cancelable: true,
        };
        let outcome = tracker.handle(&start, &mut surface, &host);
        assert!(outcome.prevent_default);

        let moved = PointerInput::TouchMove {
            touches: vec![ClientPoint::new(20.0, 30.0), ClientPoint::new(160.0, 170.0)],
            cancelable: true,
        };
        let outcome = tracker.handle(&moved, &mut surface, &host);
        assert!(outcome.prevent_default && outcome.drew);
        tracker.handle(&PointerInput::TouchEnd, &mut surface, &host);

        assert_eq!(
            path_calls(&surface),
            vec![Call::BeginPath(10.0, 10.0), Call::LineTo(20.0, 30.0), Call::Stroke, Call::ClosePath]
        );
    }

    #[test]
    fn empty_touch_list_is_a_no_op() {
        let host = StaticHost::new(200.0, 200.0, 1.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::TouchStart { touches: vec![], cancelable: true }, &mut surface, &host);
        assert_eq!(tracker.state(), TrackerState::Idle);

        tracker.handle(
            &PointerInput::TouchStart { touches: vec![ClientPoint::new(1.0, 1.0)], cancelable: true },
            &mut surface,
            &host,
        );
        let outcome = tracker.handle(&PointerInput::TouchMove { touches: vec![], cancelable: true }, &mut surface, &host);
        assert!(!outcome.drew);
        assert!(tracker.is_tracking());
        assert_eq!(path_calls(&surface), vec![Call::BeginPath(1.0, 1.0)]);
    }

    #[test]
    fn scrolling_is_suppressed_only_for_cancelable_active_moves() {
        let host = StaticHost::new(200.0, 200.0, 1.0);
        let mut surface = recording_surface(&host);
        let mut tracker = StrokeTracker::new();
        let moved = |cancelable| PointerInput::TouchMove { touches: vec![ClientPoint::new(5.0, 5.0)], cancelable };

        assert!(!tracker.handle(&moved(true), &mut surface, &host).prevent_default);
        tracker.handle(
            &PointerInput::TouchStart { touches: vec![ClientPoint::new(1.0, 1.0)], cancelable: true },
            &mut surface,
            &host,
        );
        assert!(!tracker.handle(&moved(false), &mut surface, &host).prevent_default);
        assert!(tracker.handle(&moved(true), &mut surface, &host).prevent_default);
    }

    #[test]
    fn unavailable_surface_accepts_no_strokes() {
        let host = StaticHost::new(100.0, 100.0, 1.0);
        let mut surface: SurfaceManager<RecordingContext> = SurfaceManager::new(None);
        let _ = surface.initialize(&host);
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::MouseDown { x: 1.0, y: 1.0 }, &mut surface, &host);
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn pixel_stroke_lands_at_scaled_position() {
        let host = StaticHost::new(100.0, 100.0, 2.0);
        let mut surface = SurfaceManager::pixel();
        surface.initialize(&host).unwrap();
        let mut tracker = StrokeTracker::new();

        tracker.handle(&PointerInput::MouseDown { x: 10.0, y: 10.0 }, &mut surface, &host);
        tracker.handle(&PointerInput::MouseMove { x: 50.0, y: 50.0 }, &mut surface, &host);
        tracker.handle(&PointerInput::MouseUp, &mut surface, &host);

        let pixels = surface.context().unwrap().pixels();
        let ink = surface.brush().color.to_rgba();
        // Display (30, 30) is device (60, 60), on the diagonal.
        assert_eq!(pixels.get_pixel(60, 60), &ink);
        assert_ne!(pixels.get_pixel(150, 150), &ink);
    }

    #[test]
    fn input_events_deserialize_from_json() {
        let events: Vec<PointerInput> = serde_json::from_str(
            r#"[{"kind":"mouse_down","x":1,"y":2},{"kind":"touch_move","touches":[{"x":3,"y":4}]},{"kind":"touch_end"}]"#,
        )
        .unwrap();
        assert_eq!(events[0], PointerInput::MouseDown { x: 1.0, y: 2.0 });
        assert_eq!(
            events[1],
            PointerInput::TouchMove { touches: vec![ClientPoint::new(3.0, 4.0)], cancelable: true }
        );
        assert_eq!(events[2], PointerInput::TouchEnd);
    }
}
