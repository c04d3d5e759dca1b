//! Read-time resolution of persisted video references into client URLs.

use std::sync::Arc;
use std::time::Duration;

use vidpub_core::constants::DEFAULT_SIGNED_URL_TTL_SECS;
use vidpub_core::models::reference::cdn_url;
use vidpub_core::{MediaReference, UrlStrategy};

use crate::Storage;

/// Turns a stored `MediaReference` into the URL handed to clients.
///
/// Signed URLs are minted on every call and never persisted.
#[derive(Clone)]
pub struct ReferenceResolver {
    storage: Arc<dyn Storage>,
    strategy: UrlStrategy,
}

impl ReferenceResolver {
    pub fn new(storage: Arc<dyn Storage>, strategy: UrlStrategy) -> Self {
        Self { storage, strategy }
    }

    pub fn strategy(&self) -> &UrlStrategy {
        &self.strategy
    }

    /// Reference to persist for an object just published under `key`.
    pub fn reference_for(&self, key: &str) -> MediaReference {
        MediaReference::published(&self.strategy, self.storage.bucket(), key)
    }

    fn signed_ttl(&self) -> Duration {
        match self.strategy {
            UrlStrategy::Signed { ttl } => ttl,
            _ => Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
        }
    }

    /// Resolve a reference. Anything that cannot be resolved reads as "no video".
    pub async fn resolve(&self, reference: &MediaReference) -> Option<String> {
        match reference {
            MediaReference::Direct { url } => Some(url.clone()),
            MediaReference::CdnKey { key } => match &self.strategy {
                UrlStrategy::Cdn { cdn_host } => Some(cdn_url(cdn_host, key)),
                // Strategy changed since publish; the object is still in our bucket.
                _ => self.presign(key).await,
            },
            MediaReference::Signed { bucket, key } => {
                if bucket != self.storage.bucket() {
                    tracing::warn!(
                        bucket = %bucket,
                        configured_bucket = %self.storage.bucket(),
                        key = %key,
                        "Video reference points at a foreign bucket"
                    );
                    return None;
                }
                self.presign(key).await
            }
        }
    }

    /// Resolve an optional reference, see [`ReferenceResolver::resolve`].
    pub async fn resolve_opt(&self, reference: Option<&MediaReference>) -> Option<String> {
        match reference {
            Some(reference) => self.resolve(reference).await,
            None => None,
        }
    }

    async fn presign(&self, key: &str) -> Option<String> {
        match self.storage.get_presigned_url(key, self.signed_ttl()).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Failed to presign video URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StorageBackend, StorageError, StorageResult};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vidpub_core::StorageKey;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct PresignOnly {
        presigned: AtomicUsize,
    }

    #[async_trait]
    impl Storage for PresignOnly {
        fn bucket(&self) -> &str {
            "videos"
        }

        async fn upload_file(
            &self,
            _: &StorageKey,
            _: &Path,
            _: &str,
            _: &CancellationToken,
        ) -> StorageResult<u64> {
            Ok(0)
        }

        async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn delete(&self, _: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn get_presigned_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
            if key.starts_with("broken/") {
                return Err(StorageError::BackendError("signer unavailable".to_string()));
            }
            let n = self.presigned.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                "https://videos.example.com/{}?ttl={}&n={}",
                key,
                ttl.as_secs(),
                n
            ))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    fn signed_resolver() -> ReferenceResolver {
        ReferenceResolver::new(
            Arc::new(PresignOnly::default()),
            UrlStrategy::Signed {
                ttl: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn test_signed_reference_is_presigned_on_every_read() {
        let resolver = signed_resolver();
        let reference = resolver.reference_for("landscape/a.mp4");
        assert_eq!(
            reference,
            MediaReference::Signed {
                bucket: "videos".to_string(),
                key: "landscape/a.mp4".to_string()
            }
        );

        let first = resolver.resolve(&reference).await.unwrap();
        let second = resolver.resolve(&reference).await.unwrap();
        assert!(first.contains("ttl=60"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_foreign_bucket_reads_as_no_video() {
        let resolver = signed_resolver();
        let reference = MediaReference::Signed {
            bucket: "someone-else".to_string(),
            key: "landscape/a.mp4".to_string(),
        };
        assert_eq!(resolver.resolve(&reference).await, None);
    }

    #[tokio::test]
    async fn test_presign_failure_reads_as_no_video() {
        let resolver = signed_resolver();
        let reference = resolver.reference_for("broken/a.mp4");
        assert_eq!(resolver.resolve(&reference).await, None);
        assert_eq!(resolver.resolve_opt(None).await, None);
    }

    #[tokio::test]
    async fn test_direct_and_cdn_references() {
        let direct = ReferenceResolver::new(
            Arc::new(PresignOnly::default()),
            UrlStrategy::Direct {
                storage_host: "s3.us-east-1.amazonaws.com".to_string(),
            },
        );
        let reference = direct.reference_for("portrait/b.mp4");
        assert_eq!(
            direct.resolve(&reference).await.as_deref(),
            Some("https://videos.s3.us-east-1.amazonaws.com/portrait/b.mp4")
        );

        let cdn = ReferenceResolver::new(
            Arc::new(PresignOnly::default()),
            UrlStrategy::Cdn {
                cdn_host: "d111.cloudfront.net".to_string(),
            },
        );
        let reference = cdn.reference_for("portrait/b.mp4");
        assert_eq!(
            cdn.resolve(&reference).await.as_deref(),
            Some("https://d111.cloudfront.net/portrait/b.mp4")
        );

        // A CDN key read under the signed strategy falls back to presigning.
        let signed = signed_resolver();
        let url = signed.resolve(&reference).await.unwrap();
        assert!(url.starts_with("https://videos.example.com/portrait/b.mp4"));
    }
}
