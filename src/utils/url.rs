//! URL utilities for building backend endpoints and display links.

use reqwest::Url;

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use starchat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete backend URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use starchat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/chat/stream"),
///     "http://localhost:8000/chat/stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Turns a server-relative path such as `/imagery/a.png` into a link a
/// terminal user can open. Absolute URLs and other strings pass through.
///
/// Rooted paths resolve against the origin of `base_url`, the way a browser
/// resolves them against the page that served the chat client.
///
/// ```
/// use starchat::utils::url::resolve_display_url;
///
/// assert_eq!(
///     resolve_display_url("http://localhost:8000/api", "/imagery/a.png"),
///     "http://localhost:8000/imagery/a.png"
/// );
/// assert_eq!(
///     resolve_display_url("http://localhost:8000", "https://cdn.example.com/b.png"),
///     "https://cdn.example.com/b.png"
/// );
/// ```
pub fn resolve_display_url(base_url: &str, src: &str) -> String {
    if !src.starts_with('/') || src.starts_with("//") {
        return src.to_string();
    }
    Url::parse(base_url)
        .and_then(|base| base.join(src))
        .map(String::from)
        .unwrap_or_else(|_| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8000"),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8000/"),
            "http://localhost:8000"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:8000", "auth/verify"),
            "http://localhost:8000/auth/verify"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000/gateway/", "/upload-image"),
            "http://localhost:8000/gateway/upload-image"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000///", "///chat"),
            "http://localhost:8000/chat"
        );
    }

    #[test]
    fn test_resolve_display_url() {
        assert_eq!(
            resolve_display_url("https://rag.example.com", "/imagery/x.png"),
            "https://rag.example.com/imagery/x.png"
        );
        assert_eq!(
            resolve_display_url("https://rag.example.com/v1/", "/imagery/x.png"),
            "https://rag.example.com/imagery/x.png"
        );
        assert_eq!(
            resolve_display_url("https://rag.example.com", "//cdn.example.com/x.png"),
            "//cdn.example.com/x.png"
        );
        assert_eq!(
            resolve_display_url("not a url", "/imagery/x.png"),
            "/imagery/x.png"
        );
        assert_eq!(
            resolve_display_url("https://rag.example.com", "relative.png"),
            "relative.png"
        );
    }

    #[test]
    fn resolve_display_url_ignores_base_query_and_fragment() {
        assert_eq!(
            resolve_display_url("http://localhost:8000?tenant=a", "/imagery/a.png"),
            "http://localhost:8000/imagery/a.png"
        );
        assert_eq!(
            resolve_display_url("http://localhost:8000#chat", "/imagery/a.png"),
            "http://localhost:8000/imagery/a.png"
        );
        assert_eq!(
            resolve_display_url("http://localhost:8000/v1?x=1", "/imagery/a.png?size=small"),
            "http://localhost:8000/imagery/a.png?size=small"
        );
    }
}
