use std::path::Path;

#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext_lower = ext.to_ascii_lowercase();
            matches!(
                ext_lower.as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff"
            )
        })
}

#[must_use]
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Extracts a lowercase extension from a filename, defaulting to `jpg` when
/// none is present (matches the teacher's `split_media_paths` leniency for
/// stray uploads rather than rejecting them outright).
#[must_use]
pub fn guess_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string())
}

#[must_use]
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .unwrap_or(mime::IMAGE_JPEG)
        .to_string()
}
