// ============================================================================
// DRAWING CONTEXT — the 2D context capability the surface draws through
// ============================================================================
//
// All path and fill coordinates handed to a `DrawContext` are display-space
// units.  The context multiplies them by its current scale to reach device
// pixels, so callers never apply the device pixel ratio themselves.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;

/// Opaque 8-bit sRGB color, written as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hex color {0:?} (expected #rrggbb)")]
pub struct ColorParseError(pub String);

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const INK: Rgb = Rgb::new(0x11, 0x18, 0x27);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional, case-insensitive).
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorParseError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
}

/// Stroke configuration applied to subsequent `stroke()` calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgb,
    /// Line width in display-space units.
    pub width: f32,
    pub cap: LineCap,
}

impl Default for StrokeStyle {
    /// Matches a freshly reset 2D context: black, 1 unit wide, butt caps.
    fn default() -> Self {
        Self {
            color: Rgb::new(0, 0, 0),
            width: 1.0,
            cap: LineCap::Butt,
        }
    }
}

/// The drawing operations the surface needs from a 2D context.
///
/// `allocate` behaves like assigning a canvas element's width/height: the
/// backing store is replaced by a transparent buffer and the transform and
/// stroke style are reset, so the caller must reapply both.
pub trait DrawContext {
    fn allocate(&mut self, device_width: u32, device_height: u32);
    fn device_size(&self) -> (u32, u32);
    /// Set the uniform display→device scale.
    fn set_scale(&mut self, scale: f32);
    fn scale(&self) -> f32;
    fn set_stroke_style(&mut self, style: StrokeStyle);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);
    /// Start a new path at `(x, y)` (beginPath + moveTo).
    fn begin_path(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    /// Commit path segments added since the previous `stroke()` with the
    /// current style.  Earlier segments keep the style they were drawn with.
    fn stroke(&mut self);
    fn close_path(&mut self);
    /// Copy `image` onto the backing store at device origin, unscaled.
    fn draw_image(&mut self, image: &RgbaImage);
    /// Copy of the backing store at device resolution.
    fn snapshot(&self) -> RgbaImage;
}

// ============================================================================
// PIXEL CONTEXT — CPU raster implementation
// ============================================================================

/// Software 2D context over a flat RGBA buffer.
pub struct PixelContext {
    pixels: RgbaImage,
    scale: f32,
    style: StrokeStyle,
    /// Display-space points of the current path.
    path: Vec<(f32, f32)>,
    /// Number of leading path points whose segments are already committed.
    stroked: usize,
}

impl Default for PixelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelContext {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(1, 1),
            scale: 1.0,
            style: StrokeStyle::default(),
            path: Vec::new(),
            stroked: 0,
        }
    }

    /// Borrow the live backing store.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Rasterize the pending segments as round- or butt-capped capsules.
    ///
    /// Coverage is the minimum distance from each device pixel centre to any
    /// pending segment, so joints inside one call never double-blend.
    fn rasterize_pending(&mut self) {
        if self.path.len() < 2 || self.stroked >= self.path.len() {
            return;
        }
        let start = self.stroked.max(1);
        let s = self.scale;
        let segments: Vec<((f32, f32), (f32, f32))> = (start..self.path.len())
            .map(|i| {
                let (ax, ay) = self.path[i - 1];
                let (bx, by) = self.path[i];
                ((ax * s, ay * s), (bx * s, by * s))
            })
            .collect();

        let radius = (self.style.width * s * 0.5).max(0.5);
        let cap = self.style.cap;
        let (w, h) = self.pixels.dimensions();

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &((ax, ay), (bx, by)) in &segments {
            min_x = min_x.min(ax.min(bx));
            min_y = min_y.min(ay.min(by));
            max_x = max_x.max(ax.max(bx));
            max_y = max_y.max(ay.max(by));
        }
        let pad = radius + 1.0;
        let x0 = (min_x - pad).floor().max(0.0) as u32;
        let y0 = (min_y - pad).floor().max(0.0) as u32;
        let x1 = ((max_x + pad).ceil().max(0.0) as u32).min(w);
        let y1 = ((max_y + pad).ceil().max(0.0) as u32).min(h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let src = self.style.color;
        for py in y0..y1 {
            for px in x0..x1 {
                let cx = px as f32 + 0.5;
                let cy = py as f32 + 0.5;
                let mut dist = f32::MAX;
                for &(a, b) in &segments {
                    dist = dist.min(segment_distance(cx, cy, a, b, cap));
                }
                let alpha = edge_alpha(dist, radius);
                if alpha > 0.0 {
                    blend_over(self.pixels.get_pixel_mut(px, py), src, alpha);
                }
            }
        }
    }
}

impl DrawContext for PixelContext {
    fn allocate(&mut self, device_width: u32, device_height: u32) {
        self.pixels = RgbaImage::new(device_width, device_height);
        self.scale = 1.0;
        self.style = StrokeStyle::default();
        self.path.clear();
        self.stroked = 0;
    }

    fn device_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let (w, h) = self.pixels.dimensions();
        let s = self.scale;
        let x0 = ((x * s).round().max(0.0) as u32).min(w);
        let y0 = ((y * s).round().max(0.0) as u32).min(h);
        let x1 = (((x + width) * s).round().max(0.0) as u32).min(w);
        let y1 = (((y + height) * s).round().max(0.0) as u32).min(h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let fill = color.to_rgba().0;
        let row_bytes = w as usize * 4;
        let span = x0 as usize * 4..x1 as usize * 4;
        let buf: &mut [u8] = &mut self.pixels;
        buf.par_chunks_mut(row_bytes)
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|row| {
                for px in row[span.clone()].chunks_exact_mut(4) {
                    px.copy_from_slice(&fill);
                }
            });
    }

    fn begin_path(&mut self, x: f32, y: f32) {
        self.path.clear();
        self.path.push((x, y));
        self.stroked = 0;
    }

    /// On an empty path this acts as a move-to.
    fn line_to(&mut self, x: f32, y: f32) {
        self.path.push((x, y));
    }

    fn stroke(&mut self) {
        self.rasterize_pending();
        self.stroked = self.path.len();
    }

    fn close_path(&mut self) {
        self.path.clear();
        self.stroked = 0;
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        let (w, h) = self.pixels.dimensions();
        let cw = image.width().min(w);
        let ch = image.height().min(h);
        for y in 0..ch {
            for x in 0..cw {
                self.pixels.put_pixel(x, y, *image.get_pixel(x, y));
            }
        }
    }

    fn snapshot(&self) -> RgbaImage {
        self.pixels.clone()
    }
}

/// Distance from `(px, py)` to segment `a`–`b` in device pixels.  Butt caps
/// report infinity past the segment ends.
fn segment_distance(px: f32, py: f32, a: (f32, f32), b: (f32, f32), cap: LineCap) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((px - a.0) * dx + (py - a.1) * dy) / len_sq
    };
    if cap == LineCap::Butt && len_sq > f32::EPSILON && !(0.0..=1.0).contains(&t) {
        return f32::MAX;
    }
    let t = t.clamp(0.0, 1.0);
    let qx = a.0 + dx * t - px;
    let qy = a.1 + dy * t - py;
    (qx * qx + qy * qy).sqrt()
}

/// Smoothstep coverage over a one-pixel band centred on the stroke edge.
fn edge_alpha(dist: f32, radius: f32) -> f32 {
    let inner = radius - 0.5;
    let outer = radius + 0.5;
    if dist <= inner {
        return 1.0;
    }
    if dist >= outer {
        return 0.0;
    }
    let x = 1.0 - (dist - inner) / (outer - inner);
    x * x * (3.0 - 2.0 * x)
}

/// Source-over blend of an opaque color with the given coverage.
fn blend_over(dst: &mut Rgba<u8>, src: Rgb, alpha: f32) {
    if alpha >= 1.0 {
        *dst = src.to_rgba();
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = alpha + da * (1.0 - alpha);
    if out_a <= 0.0 {
        return;
    }
    let mix = |s: u8, d: u8| {
        let v = (s as f32 * alpha + d as f32 * da * (1.0 - alpha)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(src.r, dst[0]),
        mix(src.g, dst[1]),
        mix(src.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

// ============================================================================
// RECORDING CONTEXT — test double that logs every call
// ============================================================================

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Allocate(u32, u32),
        SetScale(f32),
        SetStrokeStyle(StrokeStyle),
        FillRect(f32, f32, f32, f32, Rgb),
        BeginPath(f32, f32),
        LineTo(f32, f32),
        Stroke,
        ClosePath,
        DrawImage(u32, u32),
    }

    /// Records calls and tracks just enough state to answer queries.
    #[derive(Default)]
    pub struct RecordingContext {
        pub calls: Vec<Call>,
        size: (u32, u32),
        scale: f32,
    }

    impl RecordingContext {
        pub fn new() -> Self {
            Self { calls: Vec::new(), size: (0, 0), scale: 1.0 }
        }

        /// Only the path calls (begin/line/stroke/close), in order.
        pub fn path_calls(&self) -> Vec<Call> {
            self.calls
                .iter()
                .filter(|c| {
                    matches!(c, Call::BeginPath(..) | Call::LineTo(..) | Call::Stroke | Call::ClosePath)
                })
                .cloned()
                .collect()
        }
    }

    impl DrawContext for RecordingContext {
        fn allocate(&mut self, device_width: u32, device_height: u32) {
            self.size = (device_width, device_height);
            self.scale = 1.0;
            self.calls.push(Call::Allocate(device_width, device_height));
        }
        fn device_size(&self) -> (u32, u32) {
            self.size
        }
        fn set_scale(&mut self, scale: f32) {
            self.scale = scale;
            self.calls.push(Call::SetScale(scale));
        }
        fn scale(&self) -> f32 {
            self.scale
        }
        fn set_stroke_style(&mut self, style: StrokeStyle) {
            self.calls.push(Call::SetStrokeStyle(style));
        }
        fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
            self.calls.push(Call::FillRect(x, y, width, height, color));
        }
        fn begin_path(&mut self, x: f32, y: f32) {
            self.calls.push(Call::BeginPath(x, y));
        }
        fn line_to(&mut self, x: f32, y: f32) {
            self.calls.push(Call::LineTo(x, y));
        }
        fn stroke(&mut self) {
            self.calls.push(Call::Stroke);
        }
        fn close_path(&mut self) {
            self.calls.push(Call::ClosePath);
        }
        fn draw_image(&mut self, image: &RgbaImage) {
            self.calls.push(Call::DrawImage(image.width(), image.height()));
        }
        fn snapshot(&self) -> RgbaImage {
            RgbaImage::new(self.size.0, self.size.1)
        }
    }
}
