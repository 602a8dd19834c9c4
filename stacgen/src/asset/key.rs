//! Reserved asset keys.

/// Asset key that marks a rendered preview image.
pub const PREVIEW_ASSET_KEY: &str = "rendered_preview";

/// Whether an asset key names the rendered preview.
///
/// Comparison ignores case and the file extension, so `Rendered_Preview.png`
/// matches too.
pub fn is_preview_key(key: &str) -> bool {
    let stem = key.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(key);
    key.eq_ignore_ascii_case(PREVIEW_ASSET_KEY) || stem.eq_ignore_ascii_case(PREVIEW_ASSET_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_key_matching() {
        assert!(is_preview_key("rendered_preview"));
        assert!(is_preview_key("RENDERED_PREVIEW"));
        assert!(is_preview_key("Rendered_Preview.png"));
        assert!(!is_preview_key("preview"));
        assert!(!is_preview_key("rendered_preview_2.png"));
    }
}
