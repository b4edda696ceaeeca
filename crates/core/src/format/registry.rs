use std::path::Path;

use crate::format::movie_format::{ContainerFormat, MovieFormat};

/// Maps resource suffixes to container formats.
///
/// Populated once at process start and consulted by the host to pick an
/// adapter for a path; the first registered format claiming the suffix
/// wins.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ContainerFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// A registry with every format this crate ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MovieFormat));
        registry
    }

    pub fn register(&mut self, format: Box<dyn ContainerFormat>) {
        self.formats.push(format);
    }

    /// The format claiming `path`, if any.
    pub fn format_for_path(&self, path: &Path) -> Option<&dyn ContainerFormat> {
        self.formats
            .iter()
            .find(|f| f.handles(path))
            .map(|f| f.as_ref())
    }

    pub fn formats(&self) -> impl Iterator<Item = &dyn ContainerFormat> {
        self.formats.iter().map(|f| f.as_ref())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::movie_format::MOVIE_SUFFIXES;
    use rstest::rstest;

    #[rstest]
    #[case("formatTest.avi")]
    #[case("formatTest.mov")]
    #[case("formatTest.mp4")]
    #[case("formatTest.flv")]
    #[case("formatTest.mpg")]
    #[case("formatTest.ogv")]
    fn test_lookup_selects_movie_format(#[case] path: &str) {
        let registry = FormatRegistry::with_defaults();
        let format = registry.format_for_path(Path::new(path)).unwrap();
        assert_eq!(format.name(), "Movies (FFmpeg)");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FormatRegistry::with_defaults();
        assert!(registry.format_for_path(Path::new("clip.MPG")).is_some());
    }

    #[test]
    fn test_lookup_misses_unknown_suffixes() {
        let registry = FormatRegistry::with_defaults();
        assert!(registry.format_for_path(Path::new("image.tiff")).is_none());
        assert!(registry.format_for_path(Path::new("noext")).is_none());
    }

    #[test]
    fn test_empty_registry_matches_nothing() {
        let registry = FormatRegistry::new();
        for suffix in MOVIE_SUFFIXES {
            let name = format!("clip.{suffix}");
            assert!(registry.format_for_path(Path::new(&name)).is_none());
        }
    }

    #[test]
    fn test_default_formats_cover_every_suffix() {
        let registry = FormatRegistry::with_defaults();
        for suffix in MOVIE_SUFFIXES {
            let name = format!("clip.{suffix}");
            assert!(
                registry.format_for_path(Path::new(&name)).is_some(),
                "no format claims .{suffix}"
            );
        }
    }
}
