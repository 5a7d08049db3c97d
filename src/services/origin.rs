/// Asset origins: where purchased image bytes are fetched from
///
/// Bodies are handed back as streams so a download never holds a whole
/// image in memory. Dropping the stream (client went away) drops the
/// underlying file handle or HTTP connection.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use actix_web::web::Bytes;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::io::AsyncReadExt;

use crate::models::ImageAsset;

const CHUNK_SIZE: usize = 64 * 1024;

pub type ByteStream = BoxStream<'static, Result<Bytes, OriginError>>;

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("asset object not found: {0}")]
    Missing(String),

    #[error("storage location rejected: {0}")]
    InvalidLocation(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// An opened asset, ready to stream
pub struct AssetBody {
    /// Known size in bytes, when the origin reports one
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl AssetBody {
    /// Drain the stream; only for small bodies and tests
    pub async fn collect(self) -> Result<Vec<u8>, OriginError> {
        self.stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

#[async_trait]
pub trait AssetOrigin: Send + Sync {
    async fn open(&self, asset: &ImageAsset) -> Result<AssetBody, OriginError>;
}

fn is_remote(location: &str) -> bool {
    location.starts_with("https://") || location.starts_with("http://")
}

/// Remote origin (object storage / CDN) over HTTP
#[derive(Clone, Default)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetOrigin for HttpOrigin {
    async fn open(&self, asset: &ImageAsset) -> Result<AssetBody, OriginError> {
        if !is_remote(&asset.storage_location) {
            return Err(OriginError::InvalidLocation(asset.storage_location.clone()));
        }

        let response = self.client.get(&asset.storage_location).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OriginError::Missing(asset.asset_id.clone()));
        }
        if !status.is_success() {
            return Err(OriginError::UpstreamStatus(status.as_u16()));
        }

        Ok(AssetBody {
            content_length: response.content_length(),
            stream: response.bytes_stream().map_err(OriginError::from).boxed(),
        })
    }
}

/// Files under a local asset root
#[derive(Clone)]
pub struct LocalOrigin {
    root: PathBuf,
}

impl LocalOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a stored location below the root; absolute paths and `..`
    /// components are refused.
    pub fn resolve(&self, location: &str) -> Result<PathBuf, OriginError> {
        let relative = Path::new(location);
        let contained = !location.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !contained {
            return Err(OriginError::InvalidLocation(location.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetOrigin for LocalOrigin {
    async fn open(&self, asset: &ImageAsset) -> Result<AssetBody, OriginError> {
        let path = self.resolve(&asset.storage_location)?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OriginError::Missing(asset.asset_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let content_length = file.metadata().await?.len();

        let stream = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        })
        .map_err(OriginError::from)
        .boxed();

        Ok(AssetBody {
            content_length: Some(content_length),
            stream,
        })
    }
}

/// Production origin: remote URLs over HTTP, everything else from disk
pub struct StorageOrigin {
    http: HttpOrigin,
    local: LocalOrigin,
}

impl StorageOrigin {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            http: HttpOrigin::default(),
            local: LocalOrigin::new(asset_root),
        }
    }
}

#[async_trait]
impl AssetOrigin for StorageOrigin {
    async fn open(&self, asset: &ImageAsset) -> Result<AssetBody, OriginError> {
        if is_remote(&asset.storage_location) {
            self.http.open(asset).await
        } else {
            self.local.open(asset).await
        }
    }
}

/// In-memory objects keyed by storage location, for tests
#[derive(Default)]
pub struct InMemoryOrigin {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: impl Into<String>, bytes: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(location.into(), bytes.into());
        }
    }
}

#[async_trait]
impl AssetOrigin for InMemoryOrigin {
    async fn open(&self, asset: &ImageAsset) -> Result<AssetBody, OriginError> {
        let bytes = self
            .objects
            .read()
            .map_err(|_| OriginError::Io(std::io::Error::other("lock poisoned")))?
            .get(&asset.storage_location)
            .cloned()
            .ok_or_else(|| OriginError::Missing(asset.asset_id.clone()))?;

        let content_length = Some(bytes.len() as u64);
        let chunks: Vec<Result<Bytes, OriginError>> = bytes
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(AssetBody {
            content_length,
            stream: stream::iter(chunks).boxed(),
        })
    }
}
