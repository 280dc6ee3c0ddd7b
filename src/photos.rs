use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// ImageType
///
/// The three image content types this system accepts, matched case-insensitively
/// against the `Content-Type` header. Everything else is rejected before any byte
/// touches disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
}

impl ImageType {
    /// Parses an incoming `Content-Type` header value. Only the exact three accepted
    /// types match; parameters (e.g. `; charset=...`) are not tolerated.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("image/png") {
            Some(ImageType::Png)
        } else if value.eq_ignore_ascii_case("image/jpeg") {
            Some(ImageType::Jpeg)
        } else if value.eq_ignore_ascii_case("image/gif") {
            Some(ImageType::Gif)
        } else {
            None
        }
    }

    /// Recovers the image type from a stored filename's extension, for serving the
    /// right `Content-Type` on retrieval.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        if ext.eq_ignore_ascii_case("png") {
            Some(ImageType::Png)
        } else if ext.eq_ignore_ascii_case("jpeg") || ext.eq_ignore_ascii_case("jpg") {
            Some(ImageType::Jpeg)
        } else if ext.eq_ignore_ascii_case("gif") {
            Some(ImageType::Gif)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpeg",
            ImageType::Gif => "gif",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Gif => "image/gif",
        }
    }
}

/// Derives the flat storage filename for an entity's photo, e.g. `petition_12.jpeg`.
pub fn derive_filename(entity: &str, id: i64, image: ImageType) -> String {
    format!("{}_{}.{}", entity, id, image.extension())
}

/// Strips path components from a stored filename so a corrupted database value can
/// never escape the photo directory.
fn sanitize_filename(filename: &str) -> String {
    filename
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .next_back()
        .unwrap_or_default()
        .to_string()
}

// 1. PhotoStore Contract

/// PhotoStore
///
/// Abstract contract for photo binary storage. The concrete implementation is the
/// local filesystem (FsPhotoStore); MemoryPhotoStore stands in during tests so the
/// handler logic can be exercised without touching disk.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Reads a stored photo. `Ok(None)` means the filename has no backing file,
    /// which callers translate to 404.
    async fn read(&self, filename: &str) -> io::Result<Option<Vec<u8>>>;

    /// Writes (or overwrites) a photo under the given filename.
    async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<()>;

    /// Removes a stored photo. Removing a file that is already gone is not an
    /// error; the reference is stale either way.
    async fn remove(&self, filename: &str) -> io::Result<()>;
}

/// PhotoState
///
/// The concrete type used to share photo storage access across the application state.
pub type PhotoState = Arc<dyn PhotoStore>;

// 2. The Real Implementation (Local Filesystem)

/// FsPhotoStore
///
/// Stores photos as flat files under the configured directory. There is no
/// content-addressing or locking; the derived filename is the sole key.
pub struct FsPhotoStore {
    dir: PathBuf,
}

impl FsPhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the photo directory if it does not exist yet. Safe to call at startup.
    pub async fn ensure_dir_exists(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(sanitize_filename(filename))
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn read(&self, filename: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(filename)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.path_for(filename), bytes).await
    }

    async fn remove(&self, filename: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(filename)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// 3. The Mock Implementation (For Tests)

/// MemoryPhotoStore
///
/// In-memory PhotoStore used by the integration tests. Keeps the handler logic
/// fully exercisable without a writable filesystem.
#[derive(Default)]
pub struct MemoryPhotoStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: reports whether a file currently exists in the store.
    pub fn contains(&self, filename: &str) -> bool {
        self.files.lock().unwrap().contains_key(filename)
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn read(&self, filename: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(filename).cloned())
    }

    async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, filename: &str) -> io::Result<()> {
        self.files.lock().unwrap().remove(filename);
        Ok(())
    }
}
