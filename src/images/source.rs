//! Classification of image cell values.

use serde::Serialize;

use crate::error::{FormGridError, Result};

/// Where an image cell's value points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    /// `http://` or `https://`
    Network,
    /// `file://` or an absolute path
    LocalFile,
    /// Platform content URI (`content://`)
    ContentUri,
    /// Named resource in the embedding application
    Resource,
}

/// A parsed image cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub kind: SourceKind,
    pub uri: String,
}

impl SourceKind {
    pub fn classify(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Network
        } else if value.starts_with("file://") || value.starts_with('/') {
            Self::LocalFile
        } else if value.starts_with("content://") {
            Self::ContentUri
        } else {
            Self::Resource
        }
    }
}

impl ImageSource {
    /// Classify `value`, rejecting values no provider could resolve.
    pub fn parse(value: &str) -> Result<Self> {
        let uri = value.trim();
        let kind = SourceKind::classify(uri);
        let malformed = |reason: &str| FormGridError::ImageSourceMalformed {
            source_uri: value.to_string(),
            reason: reason.to_string(),
        };

        if uri.is_empty() {
            return Err(malformed("empty source"));
        }
        if uri.chars().any(char::is_whitespace) {
            return Err(malformed("whitespace in source"));
        }
        let rest = match kind {
            SourceKind::Network => uri.split_once("://").map_or("", |(_, rest)| rest),
            SourceKind::LocalFile => uri.strip_prefix("file://").unwrap_or(uri),
            SourceKind::ContentUri => uri.strip_prefix("content://").unwrap_or_default(),
            SourceKind::Resource => uri,
        };
        let host_or_path = rest.split('/').next().unwrap_or_default();
        match kind {
            SourceKind::Network | SourceKind::ContentUri if host_or_path.is_empty() => {
                Err(malformed("missing authority"))
            }
            SourceKind::LocalFile if rest.is_empty() => Err(malformed("missing path")),
            _ => Ok(Self {
                kind,
                uri: uri.to_string(),
            }),
        }
    }

    /// Filesystem path for local sources.
    pub fn local_path(&self) -> Option<&str> {
        match self.kind {
            SourceKind::LocalFile => Some(self.uri.strip_prefix("file://").unwrap_or(&self.uri)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://example.com/a.png", SourceKind::Network ; "https")]
    #[test_case("http://example.com/a.png", SourceKind::Network ; "http")]
    #[test_case("file:///sdcard/a.png", SourceKind::LocalFile ; "file uri")]
    #[test_case("/data/a.png", SourceKind::LocalFile ; "absolute path")]
    #[test_case("content://media/external/1", SourceKind::ContentUri ; "content uri")]
    #[test_case("ic_stamp", SourceKind::Resource ; "resource name")]
    fn classifies(value: &str, expected: SourceKind) {
        assert_eq!(ImageSource::parse(value).unwrap().kind, expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("http://" ; "no host")]
    #[test_case("content:///x" ; "no authority")]
    #[test_case("file://" ; "no path")]
    #[test_case("https://exa mple.com" ; "inner space")]
    fn rejects_malformed(value: &str) {
        let err = ImageSource::parse(value).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn local_path_strips_scheme() {
        let src = ImageSource::parse("file:///tmp/a.png").unwrap();
        assert_eq!(src.local_path(), Some("/tmp/a.png"));
        let src = ImageSource::parse("/tmp/b.png").unwrap();
        assert_eq!(src.local_path(), Some("/tmp/b.png"));
    }
}
