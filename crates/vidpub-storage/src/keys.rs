//! Storage key generation for published videos.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use vidpub_core::constants::{KEY_RANDOM_BYTES, VIDEO_EXTENSION};
use vidpub_core::{AspectClass, StorageKey};

/// Generate a fresh key `{orientation}/{random}.mp4` for a video of the given aspect class.
///
/// No existence check is made; 256 random bits make collisions negligible.
pub fn generate_key(aspect: AspectClass) -> StorageKey {
    let mut random = [0u8; KEY_RANDOM_BYTES];
    rand::rng().fill_bytes(&mut random);
    let id = URL_SAFE_NO_PAD.encode(random);

    StorageKey::from_generated(format!(
        "{}{}{}",
        aspect.key_prefix(),
        id,
        VIDEO_EXTENSION
    ))
}
