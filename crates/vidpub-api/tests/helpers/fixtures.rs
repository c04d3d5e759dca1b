//! Upload bodies.
//!
//! The fake ffmpeg treats `-` separated segments as boxes and moves `moov` to the front,
//! so a "fast-start" file is easy to recognize.

use axum_test::multipart::{MultipartForm, Part};

pub const MP4_BODY: &[u8] = b"ftyp-mdat-moov";
pub const MP4_FAST_START: &[u8] = b"moov-ftyp-mdat";

/// JPEG start-of-image marker followed by a distinguishing payload
pub fn jpeg(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend_from_slice(payload);
    data
}

pub fn png() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

pub fn gif() -> Vec<u8> {
    b"GIF89a".to_vec()
}

pub fn video_form(data: &[u8], mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "video",
        Part::bytes(data.to_vec())
            .file_name("clip.mp4")
            .mime_type(mime_type),
    )
}

pub fn thumbnail_form(data: Vec<u8>, mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "thumbnail",
        Part::bytes(data).file_name("thumb").mime_type(mime_type),
    )
}
