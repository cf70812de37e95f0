//! Text, resource id and `file://` mappers.

use std::path::PathBuf;

use reqwest::Url;

use crate::domain::entities::RequestData;
use crate::domain::ports::Mapper;

/// Parses text into a URI when it has a known scheme, else a path.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMapper;

impl Mapper for TextMapper {
    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::Text(_))
    }

    fn map(&self, data: &RequestData) -> RequestData {
        let RequestData::Text(text) = data else {
            return data.clone();
        };
        match Url::parse(text) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => RequestData::Uri(url),
            _ => RequestData::Path(PathBuf::from(text)),
        }
    }
}

/// Resolves integer resource ids to files in a resource directory.
///
/// Resource `7` maps to the first of `7.png`, `7.jpg`, `7.jpeg`, `7.webp`
/// that exists, as a `file://` URI.
#[derive(Debug, Clone)]
pub struct ResourceIdMapper {
    dir: PathBuf,
}

const RESOURCE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

impl ResourceIdMapper {
    /// Creates a mapper rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, id: u32) -> PathBuf {
        RESOURCE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{id}.{ext}")))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| self.dir.join(id.to_string()))
    }
}

impl Mapper for ResourceIdMapper {
    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::ResourceId(_))
    }

    fn map(&self, data: &RequestData) -> RequestData {
        let RequestData::ResourceId(id) = data else {
            return data.clone();
        };
        let path = self.resolve(*id);
        Url::from_file_path(&path).map_or(RequestData::Path(path), RequestData::Uri)
    }
}

/// Turns local `file://` URIs into paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUriMapper;

impl Mapper for FileUriMapper {
    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::Uri(url) if url.scheme() == "file" && url.to_file_path().is_ok())
    }

    fn map(&self, data: &RequestData) -> RequestData {
        match data {
            RequestData::Uri(url) => url
                .to_file_path()
                .map_or_else(|()| data.clone(), RequestData::Path),
            _ => data.clone(),
        }
    }
}
