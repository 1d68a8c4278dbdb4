//! Static file fallback for requests no route claimed.

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use crate::http::exchange::Exchange;
use crate::http::mime::mime_for_path;
use crate::http::response::StatusCode;
use crate::server::file_cache::FileCache;

/// Body of every 404 produced by the static fallback.
pub const NOT_FOUND_PAGE: &str = "<html><body><h1>404</h1><p>The page you asked for is not here.</p></body></html>";

const FORBIDDEN_PAGE: &str = "<b>403, that path leads outside the web root.</b>";

/// Result of resolving a request path against the static root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticOutcome {
    Found {
        path: PathBuf,
        content: Bytes,
        mime: &'static str,
    },
    /// The path resolved outside the root.
    Forbidden,
    NotFound,
}

pub struct StaticFiles {
    root: Option<PathBuf>,
    cache: FileCache,
}

impl StaticFiles {
    /// Serves files under `root`, which must exist.
    pub fn new(root: &Path, cache: FileCache) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        Ok(Self {
            root: Some(root),
            cache,
        })
    }

    /// A fallback that answers every request with the 404 page.
    pub fn disabled() -> Self {
        Self {
            root: None,
            cache: FileCache::new(),
        }
    }

    /// Canonical root, if static serving is enabled.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Resolves a request path to file contents, consulting the cache first.
    pub async fn resolve(&self, url: &str) -> io::Result<StaticOutcome> {
        let Some(root) = self.root.as_deref() else {
            return Ok(StaticOutcome::NotFound);
        };

        let url = if url.trim().is_empty() || url == "/" {
            "/index.html"
        } else {
            url
        };

        let Some(candidate) = candidate_path(root, url) else {
            return Ok(StaticOutcome::Forbidden);
        };

        let mut path = match canonical_within(root, &candidate).await? {
            Resolved::Inside(path) => path,
            Resolved::Outside => return Ok(StaticOutcome::Forbidden),
            Resolved::Missing => return Ok(StaticOutcome::NotFound),
        };

        let Some(is_dir) = is_directory(&path).await? else {
            return Ok(StaticOutcome::NotFound);
        };
        if is_dir {
            path = match canonical_within(root, &path.join("index.html")).await? {
                Resolved::Inside(path) => path,
                Resolved::Outside => return Ok(StaticOutcome::Forbidden),
                Resolved::Missing => return Ok(StaticOutcome::NotFound),
            };
        }

        let mime = mime_for_path(&path);

        if let Some(content) = self.cache.get(&path) {
            return Ok(StaticOutcome::Found { path, content, mime });
        }

        let content = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StaticOutcome::NotFound),
            Err(e) => return Err(e),
        };

        self.cache.insert(path.clone(), content.clone());
        tracing::debug!(path = ?path, bytes = content.len(), "Cached static file");

        Ok(StaticOutcome::Found { path, content, mime })
    }

    /// Writes the static response for this exchange: the file, 403 or 404.
    pub async fn serve(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        let outcome = self.resolve(&exchange.request().path).await?;

        match outcome {
            StaticOutcome::Found { content, mime, .. } => {
                exchange.write_success(content.to_vec(), Some(mime))?;
            }
            StaticOutcome::Forbidden => {
                tracing::warn!(path = %exchange.request().path, "Traversal attempt rejected");
                exchange.write_response(StatusCode::Forbidden, FORBIDDEN_PAGE, None)?;
            }
            StaticOutcome::NotFound => {
                exchange.write_response(StatusCode::NotFound, NOT_FOUND_PAGE, Some("text/html"))?;
            }
        }

        Ok(())
    }
}

/// Joins `url` onto `root` lexically. Returns `None` if a `..` would climb
/// above the root.
pub fn candidate_path(root: &Path, url: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();

    for component in Path::new(url).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::ParentDir => {
                if path == root {
                    return None;
                }
                path.pop();
            }
            Component::RootDir | Component::CurDir => {}
            Component::Prefix(_) => return None,
        }
    }

    Some(path)
}

enum Resolved {
    Inside(PathBuf),
    Outside,
    Missing,
}

/// Canonicalizes `path` and checks it is still under `root`, so a symlink
/// cannot lead out of the tree.
async fn canonical_within(root: &Path, path: &Path) -> io::Result<Resolved> {
    match tokio::fs::canonicalize(path).await {
        Ok(canonical) if canonical.starts_with(root) => Ok(Resolved::Inside(canonical)),
        Ok(_) => Ok(Resolved::Outside),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Resolved::Missing),
        // A path component that is a regular file.
        Err(e) if e.kind() == io::ErrorKind::NotADirectory => Ok(Resolved::Missing),
        Err(e) => Err(e),
    }
}

/// Whether `path` is a directory; `None` once it no longer exists.
async fn is_directory(path: &Path) -> io::Result<Option<bool>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.is_dir())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
