//! Supported content types and ignored archive paths.

use std::collections::BTreeSet;
use std::path::Path;

/// Image extensions handled by the default decoder set.
const DEFAULT_EXTENSIONS: &[&str] = &[
    "ani", "bmp", "gif", "ico", "icns", "jpe", "jpeg", "jpg", "pbm", "pgm", "png", "pnm", "ppm",
    "qif", "svg", "svgz", "tga", "tif", "tiff", "webp", "xbm", "xpm",
];

/// Path components that mark archiver metadata rather than content.
const IGNORED_COMPONENTS: &[&str] = &["__MACOSX"];

/// Predicate deciding which files and archive members are displayable.
///
/// Matching is done on the lowercased extension of the last path
/// component, so `Scan.JPG` and `sub/dir/page.jpg` both match `jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedTypes {
    extensions: BTreeSet<String>,
}

impl SupportedTypes {
    /// Build a predicate from an explicit extension list (with or without leading dots).
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_supported(&self, name: impl AsRef<Path>) -> bool {
        name.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for SupportedTypes {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS)
    }
}

/// Whether an archive member lives under an ignored directory such as `__MACOSX/`.
pub fn is_ignored_member(name: &str) -> bool {
    name.split(['/', '\\'])
        .any(|component| IGNORED_COMPONENTS.contains(&component))
}
