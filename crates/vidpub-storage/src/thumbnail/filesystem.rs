use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;
use vidpub_core::constants::ASSETS_ROUTE;
use vidpub_core::{ThumbnailBackend, ThumbnailEntry};

use super::{allowed_thumbnail_type, ThumbnailError, ThumbnailSink, ALLOWED_EXTENSIONS};

const SHARD_COUNT: usize = 16;

/// Thumbnails as `{video_id}.{ext}` files under the assets root, served statically.
pub struct FilesystemThumbnailSink {
    assets_root: PathBuf,
    public_base_url: String,
    /// Serializes stores and loads per video id.
    write_locks: Vec<Mutex<()>>,
}

impl FilesystemThumbnailSink {
    pub fn new(assets_root: PathBuf, public_base_url: String) -> Self {
        Self {
            assets_root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            write_locks: (0..SHARD_COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    fn write_lock(&self, video_id: &Uuid) -> &Mutex<()> {
        &self.write_locks[(video_id.as_u128() % SHARD_COUNT as u128) as usize]
    }

    fn file_name(video_id: Uuid, extension: &str) -> String {
        format!("{}.{}", video_id, extension)
    }
}

#[async_trait]
impl ThumbnailSink for FilesystemThumbnailSink {
    #[tracing::instrument(skip(self, data), fields(thumbnail.size_bytes = data.len()))]
    async fn store(
        &self,
        video_id: Uuid,
        data: Vec<u8>,
        media_type: &str,
    ) -> Result<String, ThumbnailError> {
        let (_, extension) = allowed_thumbnail_type(media_type)?;
        let file_name = Self::file_name(video_id, extension);
        let target = self.assets_root.join(&file_name);

        fs::create_dir_all(&self.assets_root).await?;

        // Held until the other extension is removed, so mixed-type writers cannot
        // delete each other's files.
        let _guard = self.write_lock(&video_id).lock().await;

        let partial = self
            .assets_root
            .join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&partial, &data).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        // A video has at most one thumbnail file.
        for stale in ["jpg", "png"].into_iter().filter(|ext| *ext != extension) {
            let stale_path = self.assets_root.join(Self::file_name(video_id, stale));
            match fs::remove_file(&stale_path).await {
                Ok(()) => tracing::debug!(path = %stale_path.display(), "Removed replaced thumbnail"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(video_id = %video_id, path = %target.display(), "Thumbnail stored");

        Ok(format!(
            "{}{}/{}",
            self.public_base_url, ASSETS_ROUTE, file_name
        ))
    }

    async fn load(&self, video_id: Uuid) -> Result<Option<ThumbnailEntry>, ThumbnailError> {
        let _guard = self.write_lock(&video_id).lock().await;
        for extension in ALLOWED_EXTENSIONS {
            let path = self.assets_root.join(Self::file_name(video_id, extension));
            match fs::read(&path).await {
                Ok(data) => {
                    let media_type = mime_guess::from_ext(extension)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string();
                    return Ok(Some(ThumbnailEntry {
                        video_id,
                        media_type,
                        data,
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    fn backend(&self) -> ThumbnailBackend {
        ThumbnailBackend::Filesystem
    }
}
