//! Base image discovery and retrieval.
//!
//! - `discovery` - turn a mirror template into a concrete image URL
//! - `download` - validate once, then fetch with bounded retry

pub mod discovery;
pub mod download;

pub use discovery::{extract_images, extract_versions, resolve_download_url};
pub use download::{download, RetryPolicy};

/// Last non-empty path segment of a URL, without query or fragment.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, path) = path.split_once('/')?;
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("http://os.archlinuxarm.org/os/ArchLinuxARM-aarch64-latest.tar.gz")
                .as_deref(),
            Some("ArchLinuxARM-aarch64-latest.tar.gz")
        );
        assert_eq!(
            file_name_from_url("https://example.org/a/b.raw.xz?mirror=1").as_deref(),
            Some("b.raw.xz")
        );
    }

    #[test]
    fn test_file_name_from_directory_url() {
        assert_eq!(file_name_from_url("https://example.org/releases/"), None);
        assert_eq!(file_name_from_url("https://example.org"), None);
    }
}
