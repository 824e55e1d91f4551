// ============================================================================
// SURFACE MANAGER — backing buffer sized to display × device pixel ratio
// ============================================================================

use image::RgbaImage;
use image::imageops::{self, FilterType};
use thiserror::Error;

use crate::context::{DrawContext, LineCap, PixelContext, Rgb, StrokeStyle};

/// Smallest and largest brush width offered to the user.
pub const MIN_BRUSH_WIDTH: u32 = 1;
pub const MAX_BRUSH_WIDTH: u32 = 50;
pub const DEFAULT_BRUSH_WIDTH: u32 = 5;

/// Background fill used for initialization and `clear()`.
pub const BACKGROUND: Rgb = Rgb::WHITE;

/// Fixed color palette offered by the drawing view.
pub const PALETTE: [Rgb; 7] = [
    Rgb::new(0x11, 0x18, 0x27),
    Rgb::new(0xef, 0x44, 0x44),
    Rgb::new(0x3b, 0x82, 0xf6),
    Rgb::new(0x22, 0xc5, 0x5e),
    Rgb::new(0xf9, 0x73, 0x16),
    Rgb::new(0xea, 0xb3, 0x08),
    Rgb::new(0xa8, 0x55, 0xf7),
];

/// Color selected by the eraser control.
pub const ERASER: Rgb = BACKGROUND;

/// Largest backing store side, in device pixels.
pub const MAX_DEVICE_SIDE: u32 = 16_384;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host has no measurable element or no 2D context.
    #[error("drawing surface unavailable")]
    SurfaceUnavailable,
    #[error("surface of {width}x{height} device pixels exceeds the {max} pixel limit", max = MAX_DEVICE_SIDE)]
    TooLarge { width: u32, height: u32 },
}

/// Bounding box of the surface element in display space (client coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }
}

/// Where the surface is mounted: reports the element's bounding box and the
/// display's device pixel ratio at the time of the call.
pub trait SurfaceHost {
    fn bounding_rect(&self) -> Option<DisplayRect>;
    fn device_pixel_ratio(&self) -> f32;
}

/// A host with a fixed rectangle and ratio (headless rendering and tests).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticHost {
    pub rect: DisplayRect,
    pub ratio: f32,
}

impl StaticHost {
    pub fn new(width: f32, height: f32, ratio: f32) -> Self {
        Self { rect: DisplayRect::new(0.0, 0.0, width, height), ratio }
    }

    pub fn at(left: f32, top: f32, width: f32, height: f32, ratio: f32) -> Self {
        Self { rect: DisplayRect::new(left, top, width, height), ratio }
    }
}

impl SurfaceHost for StaticHost {
    fn bounding_rect(&self) -> Option<DisplayRect> {
        Some(self.rect)
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.ratio
    }
}

/// What happens to drawn pixels when the backing store is reallocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Reallocation wipes the drawing back to the background fill.
    #[default]
    Clear,
    /// The previous pixels are copied back at the top-left corner.
    Preserve,
}

/// Current brush settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Brush {
    pub color: Rgb,
    pub width: u32,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: PALETTE[0], width: DEFAULT_BRUSH_WIDTH }
    }
}

impl Brush {
    /// Build a brush, clamping `width` into the supported range.
    pub fn new(color: Rgb, width: u32) -> Self {
        Self { color, width: width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH) }
    }

    fn stroke_style(self) -> StrokeStyle {
        StrokeStyle { color: self.color, width: self.width as f32, cap: LineCap::Round }
    }
}

/// Owns the drawing context and keeps it consistent with the host's size and
/// pixel ratio.  While unavailable, every drawing request is a no-op.
pub struct SurfaceManager<C: DrawContext> {
    context: Option<C>,
    available: bool,
    size: (f32, f32),
    ratio: f32,
    brush: Brush,
    resize_policy: ResizePolicy,
}

impl SurfaceManager<PixelContext> {
    /// Surface backed by the CPU raster context.
    pub fn pixel() -> Self {
        Self::new(Some(PixelContext::new()))
    }
}

impl<C: DrawContext> SurfaceManager<C> {
    /// `context` is `None` when the host could not provide a 2D context.
    pub fn new(context: Option<C>) -> Self {
        Self {
            context,
            available: false,
            size: (0.0, 0.0),
            ratio: 1.0,
            brush: Brush::default(),
            resize_policy: ResizePolicy::default(),
        }
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    pub fn with_brush(mut self, brush: Brush) -> Self {
        self.brush = Brush::new(brush.color, brush.width);
        self
    }

    /// Size the backing store from `host`, apply the ratio scale and the
    /// brush, and fill with the background color.
    pub fn initialize(&mut self, host: &dyn SurfaceHost) -> Result<(), SurfaceError> {
        self.available = false;
        let Some(rect) = host.bounding_rect() else {
            log_warn!("Surface: host has no bounding box, drawing disabled");
            return Err(SurfaceError::SurfaceUnavailable);
        };
        if self.context.is_none() {
            log_warn!("Surface: no 2D context, drawing disabled");
            return Err(SurfaceError::SurfaceUnavailable);
        }
        let ratio = sanitize_ratio(host.device_pixel_ratio());
        check_device_size(rect, ratio)?;

        self.reallocate(rect, ratio, None);
        self.available = true;
        let (w, h) = self.device_size();
        log_info!(
            "Surface: initialized {}x{} display at ratio {} -> {}x{} device",
            rect.width, rect.height, self.ratio, w, h
        );
        Ok(())
    }

    /// Re-read the host and reallocate at the new device size.  Under
    /// `ResizePolicy::Clear` the drawing is lost; under `Preserve` it is
    /// rescaled by the ratio change and copied back at the top-left.
    pub fn handle_resize(&mut self, host: &dyn SurfaceHost) -> Result<(), SurfaceError> {
        if !self.available {
            return self.initialize(host);
        }
        let Some(rect) = host.bounding_rect() else {
            self.available = false;
            log_warn!("Surface: host lost its bounding box on resize");
            return Err(SurfaceError::SurfaceUnavailable);
        };
        let ratio = sanitize_ratio(host.device_pixel_ratio());
        if let Err(e) = check_device_size(rect, ratio) {
            self.available = false;
            return Err(e);
        }
        // Kept pixels follow the ratio change so the drawing keeps its display size.
        let keep = match (self.resize_policy, self.context.as_ref()) {
            (ResizePolicy::Preserve, Some(ctx)) => Some(rescale(ctx.snapshot(), ratio / self.ratio)),
            _ => None,
        };
        self.reallocate(rect, ratio, keep);
        let (w, h) = self.device_size();
        log_info!("Surface: resized to {}x{} device ({:?})", w, h, self.resize_policy);
        Ok(())
    }

    /// True when `rect` and `ratio` would give the same backing store as now.
    pub fn matches(&self, rect: DisplayRect, ratio: f32) -> bool {
        self.available
            && self.size == (rect.width, rect.height)
            && self.ratio == sanitize_ratio(ratio)
    }

    fn reallocate(&mut self, rect: DisplayRect, ratio: f32, keep: Option<RgbaImage>) {
        let Some(ctx) = self.context.as_mut() else { return };
        let (dw, dh) = device_dimensions(rect.width, rect.height, ratio);
        ctx.allocate(dw, dh);
        ctx.set_scale(ratio);
        ctx.set_stroke_style(self.brush.stroke_style());
        ctx.fill_rect(0.0, 0.0, rect.width, rect.height, BACKGROUND);
        if let Some(previous) = keep {
            ctx.draw_image(&previous);
        }
        self.size = (rect.width.max(0.0), rect.height.max(0.0));
        self.ratio = ratio;
    }

    /// Update the brush for subsequent strokes.  Width is clamped to 1–50.
    pub fn set_brush(&mut self, color: Rgb, width: u32) {
        self.brush = Brush::new(color, width);
        if self.available
            && let Some(ctx) = self.context.as_mut()
        {
            ctx.set_stroke_style(self.brush.stroke_style());
        }
    }

    /// Fill the whole display-space area with the background color.
    pub fn clear(&mut self) {
        if !self.available {
            return;
        }
        let (w, h) = self.size;
        if let Some(ctx) = self.context.as_mut() {
            ctx.fill_rect(0.0, 0.0, w, h, BACKGROUND);
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Display-space size of the surface.
    pub fn display_size(&self) -> (f32, f32) {
        self.size
    }

    /// Backing store size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        self.context.as_ref().map(|c| c.device_size()).unwrap_or((0, 0))
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize_policy
    }

    /// Read-only context access (exporting).  `None` while unavailable.
    pub fn context(&self) -> Option<&C> {
        if self.available { self.context.as_ref() } else { None }
    }

    /// Mutable context access (stroking).  `None` while unavailable.
    pub fn context_mut(&mut self) -> Option<&mut C> {
        if self.available { self.context.as_mut() } else { None }
    }
}

/// Device pixel dimensions for a display size, truncated like a canvas
/// width assignment and never below one pixel.
pub fn device_dimensions(width: f32, height: f32, ratio: f32) -> (u32, u32) {
    let dw = (width.max(0.0) * ratio) as u32;
    let dh = (height.max(0.0) * ratio) as u32;
    (dw.max(1), dh.max(1))
}

fn check_device_size(rect: DisplayRect, ratio: f32) -> Result<(), SurfaceError> {
    let (width, height) = device_dimensions(rect.width, rect.height, ratio);
    if width > MAX_DEVICE_SIDE || height > MAX_DEVICE_SIDE {
        log_warn!("Surface: refusing {}x{} device backing store", width, height);
        return Err(SurfaceError::TooLarge { width, height });
    }
    Ok(())
}

fn rescale(image: RgbaImage, factor: f32) -> RgbaImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return image;
    }
    let width = ((image.width() as f32 * factor).round() as u32).clamp(1, MAX_DEVICE_SIDE);
    let height = ((image.height() as f32 * factor).round() as u32).clamp(1, MAX_DEVICE_SIDE);
    imageops::resize(&image, width, height, FilterType::Triangle)
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
}
