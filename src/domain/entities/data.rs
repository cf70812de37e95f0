//! Request payloads understood by mappers and fetchers.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Url;

use super::Bitmap;

/// The thing a request asks to load, before or after mapping.
#[derive(Clone)]
pub enum RequestData {
    /// Free-form text, usually a URL or a path.
    Text(String),
    /// A parsed URI.
    Uri(Url),
    /// A local file.
    Path(PathBuf),
    /// An integer resource identifier.
    ResourceId(u32),
    /// Encoded image bytes held in memory.
    Bytes(Bytes),
    /// An already decoded bitmap supplied by the caller.
    Bitmap(Bitmap),
}

impl RequestData {
    /// Short name of the variant, for logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Uri(_) => "uri",
            Self::Path(_) => "path",
            Self::ResourceId(_) => "resource",
            Self::Bytes(_) => "bytes",
            Self::Bitmap(_) => "bitmap",
        }
    }
}

impl std::fmt::Debug for RequestData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Uri(u) => f.debug_tuple("Uri").field(&u.as_str()).finish(),
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::ResourceId(id) => f.debug_tuple("ResourceId").field(id).finish(),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Bitmap(b) => f.debug_tuple("Bitmap").field(b).finish(),
        }
    }
}

impl std::fmt::Display for RequestData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Uri(u) => write!(f, "{u}"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::ResourceId(id) => write!(f, "resource #{id}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Bitmap(b) => write!(f, "<bitmap {}x{}>", b.width(), b.height()),
        }
    }
}

impl From<&str> for RequestData {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RequestData {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Url> for RequestData {
    fn from(url: Url) -> Self {
        Self::Uri(url)
    }
}

impl From<PathBuf> for RequestData {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<u32> for RequestData {
    fn from(id: u32) -> Self {
        Self::ResourceId(id)
    }
}

impl From<Bytes> for RequestData {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Bitmap> for RequestData {
    fn from(bitmap: Bitmap) -> Self {
        Self::Bitmap(bitmap)
    }
}
