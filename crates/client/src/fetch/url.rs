//! URL resolution for consistent cache keys.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a site path or absolute URL against the site origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references (`/css/style.css`, `pages/a.html`) onto `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Any scheme is accepted; deciding what to intercept is the worker's job.
pub fn resolve(input: &str, origin: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_resolve_site_path() {
        let url = resolve("/css/style.css", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/css/style.css");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve("pages/index.html", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pages/index.html");
    }

    #[test]
    fn test_resolve_absolute_keeps_host() {
        let url = resolve("https://api.nasa.gov/planetary/apod?api_key=DEMO_KEY", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("api.nasa.gov"));
        assert_eq!(url.query(), Some("api_key=DEMO_KEY"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve("https://API.NASA.GOV/planetary", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("api.nasa.gov"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve("/pages/planets.html#mars", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/pages/planets.html");
    }

    #[test]
    fn test_resolve_keeps_foreign_scheme() {
        let url = resolve("chrome-extension://abcdef/popup.html", &origin()).unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &origin()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /index.html  ", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/index.html");
    }
}
