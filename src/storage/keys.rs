//! Deterministic key builders (spec §4.5 step 5). Centralized here so the
//! ingest path, the pipeline, and tests agree on exactly one layout.

use uuid::Uuid;

#[must_use]
pub fn raw_key(album_id: Uuid, photo_id: Uuid, extension: &str) -> String {
    format!("raw/{album_id}/{photo_id}.{extension}")
}

#[must_use]
pub fn thumb_key(album_id: Uuid, photo_id: Uuid) -> String {
    format!("processed/thumbs/{album_id}/{photo_id}.jpg")
}

#[must_use]
pub fn preview_key(album_id: Uuid, photo_id: Uuid) -> String {
    format!("processed/previews/{album_id}/{photo_id}.jpg")
}

#[must_use]
pub fn styled_key(preset: &str, album_id: Uuid, photo_id: Uuid) -> String {
    format!("processed/styles/{preset}/{album_id}/{photo_id}.jpg")
}

/// Joins a CDN-fronted public base URL with a storage key, for handing keys
/// to `cdn::purge::CdnPurger` (which purges URLs, not keys).
#[must_use]
pub fn to_public_url(public_base: &str, key: &str) -> String {
    format!("{}/{key}", public_base.trim_end_matches('/'))
}

/// All derivative keys a completed photo may have, for CDN purge on delete
/// (spec §4.7, S6: "a purge request is made for thumb, preview, and (if
/// present) style URLs"). Keys that were never produced (still `None`, or no
/// styled variants) are simply absent rather than guessed.
#[must_use]
pub fn derivative_keys(photo: &crate::models::photos::Model) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(k) = &photo.thumb_key {
        keys.push(k.clone());
    }
    if let Some(k) = &photo.preview_key {
        keys.push(k.clone());
    }
    if let Some(serde_json::Value::Object(variants)) = &photo.variant_keys {
        for value in variants.values() {
            if let Some(k) = value.as_str() {
                keys.push(k.to_string());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_spec() {
        let album = Uuid::nil();
        let photo = Uuid::nil();
        assert_eq!(raw_key(album, photo, "jpg"), format!("raw/{album}/{photo}.jpg"));
        assert_eq!(
            thumb_key(album, photo),
            format!("processed/thumbs/{album}/{photo}.jpg")
        );
        assert_eq!(
            preview_key(album, photo),
            format!("processed/previews/{album}/{photo}.jpg")
        );
        assert_eq!(
            styled_key("sepia", album, photo),
            format!("processed/styles/sepia/{album}/{photo}.jpg")
        );
    }

    /// Snapshot of the full derivative-key layout (spec §6.1) for one fixed
    /// photo, so a future change to the path scheme shows up as a diff here
    /// instead of only failing deep inside a pipeline integration test.
    #[test]
    fn derivative_key_layout_snapshot() {
        let album = Uuid::nil();
        let photo = Uuid::nil();
        let layout = [
            raw_key(album, photo, "jpg"),
            thumb_key(album, photo),
            preview_key(album, photo),
            styled_key("sepia", album, photo),
        ]
        .join(" | ");
        insta::assert_snapshot!(layout, @"raw/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000.jpg | processed/thumbs/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000.jpg | processed/previews/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000.jpg | processed/styles/sepia/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000.jpg");
    }
}
