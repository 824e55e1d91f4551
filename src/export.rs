// ============================================================================
// EXPORTER — encode the surface's backing store as PNG / JPEG
// ============================================================================
//
// Exports read the backing store at device resolution and never touch the
// live buffer: captions are drawn onto a scratch copy.

use std::io::Cursor;

use ab_glyph::FontArc;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, RgbaImage};
use thiserror::Error;

use crate::caption::{draw_caption, load_caption_font, CaptionStyle};
use crate::context::DrawContext;
use crate::surface::{SurfaceError, SurfaceManager};

/// JPEG quality used when the caller passes none (browser default).
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;
/// JPEG quality used for downloads.
pub const DOWNLOAD_JPEG_QUALITY: f32 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Parse a user-supplied format name or file extension.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("image encoding failed: {0}")]
    Encode(#[from] ImageError),
}

/// An encoded raster image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Payload bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

/// Encodes surfaces; holds the caption font once it has been loaded.
pub struct Exporter {
    font: Option<FontArc>,
}

impl Exporter {
    /// Exporter with an explicit caption font (`None` disables captions).
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Exporter using a bold system face of `family` for captions.
    pub fn with_system_font(family: &str) -> Self {
        let font = load_caption_font(family);
        if font.is_none() {
            log_warn!("Export: no system font for captions (family {:?}), captions disabled", family);
        }
        Self { font }
    }

    pub fn has_caption_font(&self) -> bool {
        self.font.is_some()
    }

    /// Encode the full backing store.  `quality` (0.0–1.0) applies to JPEG.
    pub fn export_image<C: DrawContext>(
        &self,
        surface: &SurfaceManager<C>,
        format: ImageFormat,
        quality: Option<f32>,
    ) -> Result<EncodedImage, ExportError> {
        let ctx = surface.context().ok_or(SurfaceError::SurfaceUnavailable)?;
        encode(&ctx.snapshot(), format, quality)
    }

    /// Encode a copy of the backing store with `title` drawn at the top-left,
    /// inset and sized for the surface's pixel ratio.
    pub fn export_with_caption<C: DrawContext>(
        &self,
        surface: &SurfaceManager<C>,
        title: &str,
        format: ImageFormat,
        quality: Option<f32>,
    ) -> Result<EncodedImage, ExportError> {
        let ctx = surface.context().ok_or(SurfaceError::SurfaceUnavailable)?;
        let mut scratch = ctx.snapshot();
        match &self.font {
            Some(font) => draw_caption(&mut scratch, font, title, CaptionStyle::for_ratio(surface.ratio())),
            None => log_warn!("Export: caption {:?} skipped, no font loaded", title),
        }
        encode(&scratch, format, quality)
    }
}

/// Encode an RGBA image in memory.  JPEG drops the alpha channel.
pub fn encode(image: &RgbaImage, format: ImageFormat, quality: Option<f32>) -> Result<EncodedImage, ExportError> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => {
            let encoder = PngEncoder::new(&mut bytes);
            encoder.write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        ImageFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut cursor = Cursor::new(&mut bytes);
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, jpeg_quality(quality));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
    }
    Ok(EncodedImage { format, width: image.width(), height: image.height(), bytes })
}

/// Map a 0.0–1.0 quality to the encoder's 1–100 scale.  Out-of-range or
/// missing values use the default.
fn jpeg_quality(quality: Option<f32>) -> u8 {
    let q = match quality {
        Some(q) if (0.0..=1.0).contains(&q) => q,
        _ => DEFAULT_JPEG_QUALITY,
    };
    ((q * 100.0).round() as u8).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Rgb;
    use crate::stroke::{PointerInput, StrokeTracker};
    use crate::surface::{StaticHost, BACKGROUND};

    fn drawn_surface(host: &StaticHost) -> SurfaceManager<crate::context::PixelContext> {
        let mut surface = SurfaceManager::pixel();
        surface.initialize(host).unwrap();
        let mut tracker = StrokeTracker::new();
        tracker.handle(&PointerInput::MouseDown { x: 10.0, y: 10.0 }, &mut surface, host);
        tracker.handle(&PointerInput::MouseMove { x: 60.0, y: 40.0 }, &mut surface, host);
        tracker.handle(&PointerInput::MouseUp, &mut surface, host);
        surface
    }

    #[test]
    fn cleared_surface_exports_uniform_background_at_device_size() {
        let host = StaticHost::new(80.0, 50.0, 2.0);
        let mut surface = drawn_surface(&host);
        surface.clear();

        let png = Exporter::new(None).export_image(&surface, ImageFormat::Png, None).unwrap();
        assert_eq!((png.width, png.height), (160, 100));

        let decoded = image::load_from_memory(&png.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (160, 100));
        assert!(decoded.pixels().all(|p| *p == BACKGROUND.to_rgba()));
    }

    #[test]
    fn caption_export_leaves_live_buffer_untouched() {
        let host = StaticHost::new(200.0, 120.0, 2.0);
        let surface = drawn_surface(&host);
        let exporter = Exporter::new(crate::caption::test_font());

        let before = exporter.export_image(&surface, ImageFormat::Png, None).unwrap();
        let captioned = exporter.export_with_caption(&surface, "Suwon Hwaseong", ImageFormat::Png, None).unwrap();
        let after = exporter.export_image(&surface, ImageFormat::Png, None).unwrap();

        assert_eq!(before.bytes, after.bytes);
        assert_eq!((captioned.width, captioned.height), (400, 240));
        if exporter.has_caption_font() {
            assert_ne!(captioned.bytes, before.bytes);
        }
    }

    #[test]
    fn captioned_jpeg_differs_from_plain_jpeg() {
        let exporter = Exporter::new(crate::caption::test_font());
        if !exporter.has_caption_font() {
            return;
        }
        let host = StaticHost::new(300.0, 120.0, 1.0);
        let mut surface = SurfaceManager::pixel();
        surface.initialize(&host).unwrap();

        let quality = Some(DOWNLOAD_JPEG_QUALITY);
        let plain = exporter.export_image(&surface, ImageFormat::Jpeg, quality).unwrap();
        let captioned = exporter.export_with_caption(&surface, "Title", ImageFormat::Jpeg, quality).unwrap();
        assert_ne!(plain.bytes, captioned.bytes);
    }

    #[test]
    fn unavailable_surface_cannot_export() {
        let surface: SurfaceManager<crate::context::PixelContext> = SurfaceManager::new(None);
        let err = Exporter::new(None).export_image(&surface, ImageFormat::Png, None).unwrap_err();
        assert!(matches!(err, ExportError::Surface(SurfaceError::SurfaceUnavailable)));
    }

    #[test]
    fn jpeg_export_decodes_to_same_size() {
        let host = StaticHost::new(64.0, 32.0, 1.5);
        let surface = drawn_surface(&host);
        let jpeg = Exporter::new(None).export_image(&surface, ImageFormat::Jpeg, Some(0.8)).unwrap();
        assert_eq!(jpeg.format, ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (96, 48));
    }

    #[test]
    fn data_uri_carries_mime_and_base64_payload() {
        let image = RgbaImage::from_pixel(2, 2, Rgb::WHITE.to_rgba());
        let png = encode(&image, ImageFormat::Png, None).unwrap();
        let uri = png.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));

        let jpeg = encode(&image, ImageFormat::Jpeg, None).unwrap();
        assert!(jpeg.to_data_uri().starts_with("data:image/jpeg;base64,/9j/"));

        assert_eq!(decode_data_uri(&uri), Some(png.bytes));
        assert_eq!(decode_data_uri("data:text/plain,hello"), None);
        assert_eq!(decode_data_uri("hello"), None);
    }

    #[test]
    fn quality_maps_to_encoder_scale() {
        assert_eq!(jpeg_quality(Some(0.95)), 95);
        assert_eq!(jpeg_quality(None), 92);
        assert_eq!(jpeg_quality(Some(3.0)), 92);
        assert_eq!(jpeg_quality(Some(0.0)), 1);
    }

    #[test]
    fn formats_parse_from_names_and_extensions() {
        assert_eq!(ImageFormat::parse("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse(".jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse("gif"), None);
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }
}
