//! Storage backends for downloaded attachments.
//!
//! The downloader never touches a concrete filesystem directly: it writes
//! through a [`Destination`] and re-opens, renames or removes by path through
//! the [`AttachmentStore`] that produced it. [`LocalFileStore`] is backed by
//! `tokio::fs`; [`MemoryStore`] keeps everything in a concurrent map and is
//! what the tests use.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::io::{AsyncRead, AsyncWrite};

/// Writable half of a stored attachment.
pub type StoreWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Readable half of a stored attachment.
pub type StoreReader = Box<dyn AsyncRead + Send + Unpin>;

/// A place attachments can be written to and read back from by path.
#[async_trait]
pub trait AttachmentStore: Send + Sync + fmt::Debug {
    /// Creates a new, empty entry at `path`.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] if `path` is taken.
    async fn create_new(&self, path: &Path) -> io::Result<StoreWriter>;

    /// Opens an existing entry for reading.
    async fn open(&self, path: &Path) -> io::Result<StoreReader>;

    /// Moves an entry without replacing anything.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] if `to` is taken, leaving
    /// both entries untouched.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes an entry.
    async fn remove(&self, path: &Path) -> io::Result<()>;

    /// Makes sure entries can be created under `dir`.
    async fn ensure_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// A named, writable destination handed out by an
/// [`AttachmentCreator`](super::AttachmentCreator).
pub struct Destination {
    store: Arc<dyn AttachmentStore>,
    path: PathBuf,
    writer: StoreWriter,
}

impl Destination {
    /// Creates a fresh entry at `path` in `store`.
    ///
    /// # Errors
    ///
    /// Propagates the store's creation error.
    pub async fn create(store: Arc<dyn AttachmentStore>, path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let writer = store.create_new(&path).await?;
        Ok(Self {
            store,
            path,
            writer,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AttachmentStore> {
        &self.store
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn AttachmentStore>, PathBuf, StoreWriter) {
        (self.store, self.path, self.writer)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("store", &self.store)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Attachment store on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttachmentStore for LocalFileStore {
    async fn create_new(&self, path: &Path) -> io::Result<StoreWriter> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        Ok(Box::new(file))
    }

    async fn open(&self, path: &Path) -> io::Result<StoreReader> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        // link then unlink: never replaces an existing `to`
        tokio::fs::hard_link(from, to).await?;
        tokio::fs::remove_file(from).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }
}

/// Attachment store held entirely in memory.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<DashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the bytes stored at `path`.
    #[must_use]
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Paths currently stored, in no particular order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no attachment stored at {}", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("attachment already stored at {}", path.display()),
    )
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn create_new(&self, path: &Path) -> io::Result<StoreWriter> {
        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(_) => Err(already_exists(path)),
            Entry::Vacant(vacant) => {
                vacant.insert(Vec::new());
                Ok(Box::new(MemoryWriter {
                    files: Arc::clone(&self.files),
                    path: path.to_path_buf(),
                }))
            }
        }
    }

    async fn open(&self, path: &Path) -> io::Result<StoreReader> {
        let bytes = self.read(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if !self.files.contains_key(from) {
            return Err(not_found(from));
        }
        match self.files.entry(to.to_path_buf()) {
            Entry::Occupied(_) => Err(already_exists(to)),
            Entry::Vacant(vacant) => {
                // reserve `to`; the shard guard must be released before touching `from`
                drop(vacant.insert(Vec::new()));
                match self.files.remove(from) {
                    Some((_, bytes)) => {
                        self.files.insert(to.to_path_buf(), bytes);
                        Ok(())
                    }
                    None => {
                        self.files.remove(to);
                        Err(not_found(from))
                    }
                }
            }
        }
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

/// Appends straight into the shared map so readers see bytes once written.
struct MemoryWriter {
    files: Arc<DashMap<PathBuf, Vec<u8>>>,
    path: PathBuf,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.files.get_mut(&self.path) {
            Some(mut entry) => {
                entry.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(not_found(&self.path))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_memory_store_write_then_read_back() {
        let store = MemoryStore::new();
        let path = Path::new("doc.bin");
        let mut writer = store.create_new(path).await.unwrap();
        writer.write_all(b"hello ").await.unwrap();
        writer.write_all(b"world").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut reader = store.open(path).await.unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "hello world");
    }

    #[tokio::test]
    async fn test_memory_store_create_new_rejects_existing() {
        let store = MemoryStore::new();
        let path = Path::new("taken");
        let _writer = store.create_new(path).await.unwrap();
        let err = store.create_new(path).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_memory_store_rename_and_remove() {
        let store = MemoryStore::new();
        let mut writer = store.create_new(Path::new("a.tmp")).await.unwrap();
        writer.write_all(b"x").await.unwrap();
        drop(writer);

        store
            .rename(Path::new("a.tmp"), Path::new("a.pdf"))
            .await
            .unwrap();
        assert!(!store.contains(Path::new("a.tmp")));
        assert_eq!(store.read(Path::new("a.pdf")).unwrap(), b"x");

        store.remove(Path::new("a.pdf")).await.unwrap();
        assert!(store.is_empty());
        let err = store.remove(Path::new("a.pdf")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_store_rename_never_replaces() {
        let store = MemoryStore::new();
        let mut first = store.create_new(Path::new("a.tmp")).await.unwrap();
        first.write_all(b"mine").await.unwrap();
        let mut second = store.create_new(Path::new("a.pdf")).await.unwrap();
        second.write_all(b"theirs").await.unwrap();

        let err = store
            .rename(Path::new("a.tmp"), Path::new("a.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(store.read(Path::new("a.tmp")).unwrap(), b"mine");
        assert_eq!(store.read(Path::new("a.pdf")).unwrap(), b"theirs");
    }

    #[tokio::test]
    async fn test_memory_store_rename_missing_source() {
        let store = MemoryStore::new();
        let err = store
            .rename(Path::new("gone.tmp"), Path::new("gone.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_contents() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let _writer = store.create_new(Path::new("shared")).await.unwrap();
        assert!(clone.contains(Path::new("shared")));
        assert_eq!(clone.len(), 1);
    }

    #[tokio::test]
    async fn test_local_file_store_round_trip() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let store = LocalFileStore::new();
        let path = temp_dir.path().join("file.tmp");

        let mut writer = store.create_new(&path).await.unwrap();
        writer.write_all(b"local bytes").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        let renamed = temp_dir.path().join("file.txt");
        store.rename(&path, &renamed).await.unwrap();
        assert!(!path.exists());

        let mut reader = store.open(&renamed).await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"local bytes");
        drop(reader);

        store.remove(&renamed).await.unwrap();
        assert!(!renamed.exists());
    }

    #[tokio::test]
    async fn test_local_file_store_rename_never_replaces() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let from = temp_dir.path().join("x.bin");
        let to = temp_dir.path().join("x.pdf");
        std::fs::write(&from, b"mine").unwrap();
        std::fs::write(&to, b"theirs").unwrap();

        let err = LocalFileStore::new().rename(&from, &to).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&from).unwrap(), b"mine");
        assert_eq!(std::fs::read(&to).unwrap(), b"theirs");
    }

    #[tokio::test]
    async fn test_local_file_store_create_new_rejects_existing() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("exists.bin");
        std::fs::write(&path, b"already here").unwrap();

        let err = LocalFileStore::new().create_new(&path).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }
}
