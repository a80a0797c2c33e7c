//! Some useful tools for the project.
//!
//! Usually, you don't need to use this module directly.
//! [`crate::nekos`] and [`crate::otaku`] will automatically use these tools.

use reqwest::Url;

/// Append path segments to a base url, whether or not it ends with a `/`.
pub(crate) trait PushSegment {
    fn push_segment(&mut self, segment: &str);
}

impl PushSegment for Url {
    /// Does nothing for cannot-be-a-base urls, see [`ensure_base`].
    fn push_segment(&mut self, segment: &str) {
        if let Ok(mut segments) = self.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
    }
}

/// Parse `base_url`, refusing urls that can not carry a path (e.g. `mailto:`).
pub(crate) fn ensure_base(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(anyhow::anyhow!("`{base_url}` can not be used as a base url"));
    }
    Ok(url)
}
