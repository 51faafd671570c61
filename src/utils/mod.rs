//! Utility functions and helpers.

pub mod http;
pub mod text;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{base}{href}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.edu/timeschd/AUT2013/").unwrap();
        assert_eq!(
            resolve_url(&base, "cse.html"),
            "https://example.edu/timeschd/AUT2013/cse.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.edu/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.edu/x.html"),
            "https://other.edu/x.html"
        );
    }
}
