//! Size-aware CDN URL rewriting.

use reqwest::Url;

use crate::domain::entities::{RequestData, Size};
use crate::domain::ports::MeasuredMapper;

/// Query keys this mapper owns; existing values for them are replaced.
const SIZE_PARAMS: [&str; 5] = ["format", "width", "height", "size", "quality"];

/// Rewrites URLs on known CDN hosts to request the resolved size.
/// This significantly reduces bandwidth usage and RAM consumption.
#[derive(Debug, Clone)]
pub struct CdnSizeMapper {
    hosts: Vec<String>,
}

impl CdnSizeMapper {
    /// Creates a mapper for the given hosts.
    #[must_use]
    pub const fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    fn url_of(&self, data: &RequestData) -> Option<Url> {
        let url = match data {
            RequestData::Uri(url) => url.clone(),
            RequestData::Text(text) => Url::parse(text).ok()?,
            _ => return None,
        };
        let host = url.host_str()?;
        self.hosts
            .iter()
            .any(|h| h == host)
            .then_some(url)
    }
}

/// Adds format and size parameters to `url`, preserving unrelated ones.
#[must_use]
pub fn optimize_cdn_url(url: &Url, width: u32, height: u32) -> Url {
    let preserved: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !SIZE_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut optimized = url.clone();
    optimized
        .query_pairs_mut()
        .clear()
        .append_pair("format", "webp")
        .append_pair("width", &width.to_string())
        .append_pair("height", &height.to_string())
        .extend_pairs(preserved);
    optimized
}

impl MeasuredMapper for CdnSizeMapper {
    fn handles(&self, data: &RequestData) -> bool {
        self.url_of(data).is_some()
    }

    fn map(&self, data: &RequestData, size: Size) -> RequestData {
        let Some(url) = self.url_of(data) else {
            return data.clone();
        };
        match size {
            Size::Pixels { width, height } => RequestData::Uri(optimize_cdn_url(&url, width, height)),
            Size::Original => RequestData::Uri(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CdnSizeMapper {
        CdnSizeMapper::new(vec![
            "cdn.discordapp.com".to_string(),
            "media.discordapp.net".to_string(),
        ])
    }

    fn text(url: &str) -> RequestData {
        RequestData::Text(url.to_string())
    }

    fn mapped_url(data: &RequestData, size: Size) -> String {
        match mapper().map(data, size) {
            RequestData::Uri(url) => url.to_string(),
            other => panic!("expected uri, got {other:?}"),
        }
    }

    #[test]
    fn test_optimize_basic_url() {
        let url = mapped_url(
            &text("https://cdn.discordapp.com/attachments/123/456/image.png"),
            Size::pixels(800, 600),
        );

        assert!(url.contains("format=webp"));
        assert!(url.contains("width=800"));
        assert!(url.contains("height=600"));
    }

    #[test]
    fn test_optimize_with_existing_params() {
        let url = mapped_url(
            &text("https://cdn.discordapp.com/attachments/123/456/image.png?ex=abc123&width=10"),
            Size::pixels(400, 300),
        );

        assert!(url.contains("ex=abc123"));
        assert!(url.contains("width=400"));
        assert!(!url.contains("width=10&"));
        assert!(!url.ends_with("width=10"));
    }

    #[test]
    fn test_other_hosts_unclaimed() {
        assert!(!mapper().handles(&text("https://example.com/image.png")));
        assert!(!mapper().handles(&text("not a url")));
        assert!(mapper().handles(&text("https://media.discordapp.net/attachments/1/2/img.png")));
    }

    #[test]
    fn test_original_size_keeps_url() {
        let url = mapped_url(
            &text("https://cdn.discordapp.com/attachments/1/2/img.png"),
            Size::Original,
        );
        assert_eq!(url, "https://cdn.discordapp.com/attachments/1/2/img.png");
    }
}
