// ============================================================================
// CAPTION — single-line title rasterization for exported images
// ============================================================================

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::context::Rgb;

/// Caption placement and styling in device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptionStyle {
    pub font_size: f32,
    /// Distance of the text box from the left and top edges.
    pub inset: f32,
    pub color: Rgb,
}

impl CaptionStyle {
    /// Caption at 32 display units, inset 20, scaled to device pixels.
    pub fn for_ratio(ratio: f32) -> Self {
        Self { font_size: 32.0 * ratio, inset: 20.0 * ratio, color: Rgb::INK }
    }
}

/// Lay out one line left-aligned at x = 0 with the baseline at `ascent`.
/// Returns `(glyphs, total_width)`.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();

    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x, ascent));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }
    (glyphs, cursor_x)
}

/// Draw `text` onto `image` with its top-left text box corner at
/// `(style.inset, style.inset)`.  Glyphs past the right edge are clipped.
pub fn draw_caption(image: &mut RgbaImage, font: &FontArc, text: &str, style: CaptionStyle) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || text.is_empty() {
        return;
    }
    let (glyphs, _) = layout_line(font, text, style.font_size);

    // Max-combined coverage so overlapping glyph edges never stack.
    let mut coverage = vec![0.0f32; w as usize * h as usize];
    for &(glyph_id, gx, gy) in &glyphs {
        let glyph = glyph_id.with_scale_and_position(
            style.font_size,
            point(style.inset + gx, style.inset + gy),
        );
        let Some(outlined) = font.outline_glyph(glyph) else { continue };
        let bounds = outlined.px_bounds();
        outlined.draw(|px, py, cov| {
            let x = bounds.min.x as i32 + px as i32;
            let y = bounds.min.y as i32 + py as i32;
            if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                let idx = y as usize * w as usize + x as usize;
                coverage[idx] = coverage[idx].max(cov.clamp(0.0, 1.0));
            }
        });
    }

    let color = style.color;
    for (i, pixel) in image.pixels_mut().enumerate() {
        let a = coverage[i];
        if a > 0.001 {
            *pixel = blend(*pixel, color, a);
        }
    }
}

fn blend(dst: Rgba<u8>, src: Rgb, a: f32) -> Rgba<u8> {
    let mix = |s: u8, d: u8| (s as f32 * a + d as f32 * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
    let da = dst[3] as f32 / 255.0;
    Rgba([
        mix(src.r, dst[0]),
        mix(src.g, dst[1]),
        mix(src.b, dst[2]),
        ((a + da * (1.0 - a)) * 255.0).round() as u8,
    ])
}

/// System families that cover Hangul, tried before the generic sans-serif.
pub const HANGUL_FAMILIES: &[&str] = &[
    "Noto Sans CJK KR",
    "Noto Sans KR",
    "NanumGothic",
    "Malgun Gothic",
    "Apple SD Gothic Neo",
];

/// Load a bold face of `family` from the system, falling back to a Hangul
/// family and then the platform's default sans-serif.  Returns `None` when no
/// usable font exists.
pub fn load_caption_font(family: &str) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight::BOLD;

    let source = SystemSource::new();
    let mut families = Vec::new();
    if !family.trim().is_empty() {
        families.push(FamilyName::Title(family.trim().to_string()));
    }
    families.extend(HANGUL_FAMILIES.iter().map(|f| FamilyName::Title(f.to_string())));
    families.push(FamilyName::SansSerif);

    let handle = source.select_best_match(&families, &props).ok()?;
    let font = handle.load().ok()?;
    let bytes: Vec<u8> = (*font.copy_font_data()?).clone();
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            log_warn!("Caption: system font could not be parsed: {}", e);
            None
        }
    }
}

/// System caption font for tests.  Reports on stderr when none is
/// installed so font-dependent assertions are visibly skipped.
#[cfg(test)]
pub(crate) fn test_font() -> Option<FontArc> {
    let font = load_caption_font("");
    if font.is_none() {
        eprintln!("note: no system caption font installed, caption drawing not exercised");
    }
    font
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "needs a system font; run with --ignored on a desktop machine"]
    fn system_caption_font_is_found() {
        assert!(load_caption_font("").is_some());
    }

    #[test]
    fn style_scales_with_ratio() {
        let style = CaptionStyle::for_ratio(2.0);
        assert_eq!(style.font_size, 64.0);
        assert_eq!(style.inset, 40.0);
        assert_eq!(style.color, Rgb::INK);
    }

    #[test]
    fn caption_paints_near_top_left() {
        let Some(font) = test_font() else { return };
        let white = Rgba([255, 255, 255, 255]);
        let mut image = RgbaImage::from_pixel(400, 120, white);
        draw_caption(&mut image, &font, "Gyeongbokgung", CaptionStyle::for_ratio(1.0));

        let inked: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != white)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(x, y)| x >= 18 && y >= 18));
        assert!(inked.iter().all(|&(_, y)| y < 20 + 40));
    }

    #[test]
    fn layout_advances_left_to_right() {
        let Some(font) = test_font() else { return };
        let (glyphs, width) = layout_line(&font, "abc", 32.0);
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs[0].1 < glyphs[1].1 && glyphs[1].1 < glyphs[2].1);
        assert!(width > glyphs[2].1);
    }
}
