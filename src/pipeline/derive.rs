//! Image derivation (spec §4.5 step 4): thumbnail, preview, orientation
//! correction, optional per-preset style variants, optional watermark.
//! Follows the long-edge resize convention used elsewhere in the pack
//! (`DynamicImage::resize` with `Lanczos3`), generalized from a fixed-size
//! variant table to the spec's "long edge cap" semantics.

use crate::cache::album_cache::AlbumPolicy;
use ab_glyph::{FontRef, PxScale};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageEncoder, Rgba};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("encode error: {0}")]
    Encode(String),
}

pub struct DecodedPhoto {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    pub rotation: i32,
    pub captured_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Decodes `bytes`, reads EXIF orientation/`DateTimeOriginal`, and rotates
/// the pixel buffer so every downstream derivative is already upright
/// (spec: "derivatives emitted already corrected").
pub fn decode(bytes: &[u8]) -> Result<DecodedPhoto, DeriveError> {
    let img = image::load_from_memory(bytes)?;
    let (rotation, captured_at) = read_exif(bytes);
    let img = apply_rotation(img, rotation);
    let (width, height) = img.dimensions();
    Ok(DecodedPhoto {
        image: img,
        width,
        height,
        rotation,
        captured_at,
    })
}

fn read_exif(bytes: &[u8]) -> (i32, Option<chrono::DateTime<chrono::Utc>>) {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return (0, None);
    };

    let rotation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .map(orientation_to_rotation)
        .unwrap_or(0);

    let captured_at = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .and_then(|f| match &f.value {
            exif::Value::Ascii(ascii) => ascii.first().map(|bytes| String::from_utf8_lossy(bytes).to_string()),
            _ => None,
        })
        .and_then(|raw| chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S").ok())
        .map(|naive| naive.and_utc());

    (rotation, captured_at)
}

/// Maps the EXIF orientation tag to one of the four rotations the `photos`
/// row stores (spec: `rotation ∈ {0, 90, 180, 270}`). Mirrored orientations
/// (2, 4, 5, 7) are treated as their nearest non-mirrored rotation since the
/// core has no `flipped` column.
fn orientation_to_rotation(tag: u32) -> i32 {
    match tag {
        3 | 4 => 180,
        6 | 5 => 90,
        8 | 7 => 270,
        _ => 0,
    }
}

fn apply_rotation(img: DynamicImage, rotation: i32) -> DynamicImage {
    match rotation {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    }
}

/// Resizes so the long edge is at most `max_edge`, preserving aspect ratio
/// (never upscales, mirroring the pack's `resize` long-edge convention).
#[must_use]
pub fn resize_long_edge(img: &DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_edge {
        return img.clone();
    }
    if w >= h {
        img.resize(max_edge, u32::MAX, FilterType::Lanczos3)
    } else {
        img.resize(u32::MAX, max_edge, FilterType::Lanczos3)
    }
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, DeriveError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
        .map_err(|e| DeriveError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Applied after rotation, before JPEG encode (spec §4.5 step 4). `font`
/// backs text watermarks; its bytes are loaded once at worker startup from
/// the configured font path (see `common::settings`) rather than bundled
/// into the binary, since watermark typography is a deployment concern.
/// `image_overlay` backs `"image"`-type watermarks; the caller fetches it
/// from storage per `watermark_config.image_key` since this module has no
/// storage access of its own (`pipeline::process_photo::load_image_overlay`).
/// Either input being absent for its matching `watermark_type` is a no-op,
/// not a failure — watermarking is cosmetic and must never fail a photo's
/// processing (spec §4.5: derivation errors here are not in the retry table).
#[must_use]
pub fn apply_watermark(
    img: DynamicImage,
    policy: &AlbumPolicy,
    font: Option<&FontRef>,
    image_overlay: Option<&DynamicImage>,
) -> DynamicImage {
    if !policy.watermark_enabled {
        return img;
    }
    match policy.watermark_type.as_str() {
        "text" => match font {
            Some(font) => apply_text_watermark(img, policy, font),
            None => img,
        },
        "image" => match image_overlay {
            Some(overlay) => apply_image_watermark(img, policy, overlay),
            None => img,
        },
        _ => img,
    }
}

fn apply_text_watermark(mut img: DynamicImage, policy: &AlbumPolicy, font: &FontRef) -> DynamicImage {
    let text = policy
        .watermark_config
        .as_ref()
        .and_then(|c| c.get("text"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if text.is_empty() {
        return img;
    }

    let scale = PxScale::from((img.height() as f32 / 20.0).max(12.0));
    let (x, y) = watermark_position(&img, policy, 200, 40);
    imageproc_draw_text(&mut img, text, x, y, scale, font);
    img
}

/// Composites a pre-fetched overlay image (e.g. a logo) onto `img` at the
/// placement `watermark_config` names, alpha-blending through the overlay's
/// own alpha channel via `image::imageops::overlay`.
fn apply_image_watermark(
    mut img: DynamicImage,
    policy: &AlbumPolicy,
    overlay: &DynamicImage,
) -> DynamicImage {
    let (overlay_w, overlay_h) = overlay.dimensions();
    let (x, y) = watermark_position(&img, policy, overlay_w, overlay_h);
    image::imageops::overlay(&mut img, overlay, i64::from(x), i64::from(y));
    img
}

fn watermark_position(
    img: &DynamicImage,
    policy: &AlbumPolicy,
    mark_w: u32,
    mark_h: u32,
) -> (i32, i32) {
    let placement = policy
        .watermark_config
        .as_ref()
        .and_then(|c| c.get("placement"))
        .and_then(|v| v.as_str())
        .unwrap_or("bottom-right");
    let (w, h) = img.dimensions();
    let margin = 16i32;
    match placement {
        "top-left" => (margin, margin),
        "top-right" => (w as i32 - mark_w as i32 - margin, margin),
        "bottom-left" => (margin, h as i32 - mark_h as i32 - margin),
        _ => (w as i32 - mark_w as i32 - margin, h as i32 - mark_h as i32 - margin),
    }
}

/// Rasterizes `text` directly onto `img`'s pixel buffer using `ab_glyph`'s
/// outline rendering — the "pre-rasterized glyph layer" composited before
/// re-encode that the spec calls for, without pulling in a full canvas/DOM
/// dependency.
fn imageproc_draw_text(
    img: &mut DynamicImage,
    text: &str,
    x: i32,
    y: i32,
    scale: PxScale,
    font: &FontRef,
) {
    use ab_glyph::{Font, ScaleFont};
    let mut rgba = img.to_rgba8();
    let scaled = font.as_scaled(scale);
    let mut cursor_x = x as f32;
    let baseline_y = y as f32 + scaled.ascent();

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px >= 0 && py >= 0 && (px as u32) < rgba.width() && (py as u32) < rgba.height() {
                    let existing = *rgba.get_pixel(px as u32, py as u32);
                    rgba.put_pixel(px as u32, py as u32, blend_white(existing, coverage));
                }
            });
        }
        cursor_x += scaled.h_advance(glyph_id);
    }
    *img = DynamicImage::ImageRgba8(rgba);
}

/// Alpha-composites opaque white over `existing` by `coverage` (ab_glyph's
/// per-pixel glyph coverage, 0.0-1.0), rather than overwriting the pixel
/// outright — a coverage of 0 (outside every stroke, including the full
/// rectangle `outline.draw` iterates) must leave the background untouched,
/// and partial coverage at stroke edges must anti-alias instead of leaving
/// a hard white block.
fn blend_white(existing: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let coverage = coverage.clamp(0.0, 1.0);
    let lerp = |c: u8| (f32::from(c) + (255.0 - f32::from(c)) * coverage).round() as u8;
    Rgba([lerp(existing[0]), lerp(existing[1]), lerp(existing[2]), existing[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_never_upscales() {
        let img = DynamicImage::new_rgb8(100, 50);
        let resized = resize_long_edge(&img, 400);
        assert_eq!(resized.dimensions(), (100, 50));
    }

    #[test]
    fn resize_caps_long_edge_landscape() {
        let img = DynamicImage::new_rgb8(2000, 1000);
        let resized = resize_long_edge(&img, 400);
        assert_eq!(resized.width(), 400);
        assert!(resized.height() <= 200);
    }

    #[test]
    fn orientation_six_is_ninety_degrees() {
        assert_eq!(orientation_to_rotation(6), 90);
        assert_eq!(orientation_to_rotation(1), 0);
        assert_eq!(orientation_to_rotation(3), 180);
        assert_eq!(orientation_to_rotation(8), 270);
    }

    /// Regression for a prior bug where every pixel `outline.draw` visited —
    /// including the fully-transparent corners of its bounding rectangle —
    /// was overwritten with opaque white instead of blended, turning text
    /// watermarks into solid white rectangles.
    #[test]
    fn zero_coverage_leaves_the_background_pixel_untouched() {
        let background = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_white(background, 0.0), background);
    }

    #[test]
    fn full_coverage_is_opaque_white_over_the_original_alpha() {
        let background = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_white(background, 1.0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn partial_coverage_lerps_toward_white_instead_of_hard_cutting() {
        let background = Rgba([0, 0, 0, 255]);
        let blended = blend_white(background, 0.5);
        assert_eq!(blended, Rgba([128, 128, 128, 255]));
        assert!(blended[0] > 0 && blended[0] < 255, "half coverage must anti-alias, not snap to either extreme");
    }
}
