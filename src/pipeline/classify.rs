//! Retry/terminal classification (spec §4.5 table): keeps the decision in
//! one place so `process_photo` doesn't re-derive it per error site.

use crate::common::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Retry,
    Terminal,
}

#[must_use]
pub fn classify_download_error(err: &CoreError) -> Outcome {
    match err {
        CoreError::NotFound(_) => Outcome::Terminal,
        _ => Outcome::Retry,
    }
}

#[must_use]
pub fn classify_decode_error(attempts: i32, max_attempts: i32) -> Outcome {
    if attempts >= max_attempts {
        Outcome::Terminal
    } else {
        Outcome::Retry
    }
}

/// Encode errors are always retried (spec §4.5 table): a successful decode
/// means the source is fine, so an encode failure is assumed transient
/// (disk pressure, encoder panic caught upstream, ...) rather than a
/// property of the input.
#[must_use]
pub fn classify_encode_error() -> Outcome {
    Outcome::Retry
}
