//! Media URL helpers.
//!
//! Uploaded files are stored by the upload collaborator and referenced by
//! relative paths such as `/uploads/videos/abc.mp4`. Responses expose them
//! as absolute URLs under the server's public base URL.

use url::Url;

/// Resolve a stored media path against the public base URL.
///
/// Values that already carry a scheme (`http://`, `https://`) are returned
/// unchanged. Paths are joined onto `base_url` whether or not they start
/// with a slash. If `base_url` cannot be parsed the path is returned as-is.
#[must_use]
pub fn absolutize_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let Ok(mut base) = Url::parse(base_url) else {
        return path.to_string();
    };

    let relative = path.trim_start_matches('/');
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    base.join(relative)
        .map_or_else(|_| path.to_string(), |u| u.to_string())
}
