use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_ledger::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the site identifier used to name a site's ledger
///
/// The identifier is the host, plus the port when one is explicit, with every
/// character outside `[a-z0-9.-]` replaced by `_`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_ledger::url::site_id;
///
/// let url = Url::parse("https://Cafe.Test/menu").unwrap();
/// assert_eq!(site_id(&url), Some("cafe.test".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(site_id(&url), Some("127.0.0.1_8080".to_string()));
/// ```
pub fn site_id(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    let raw = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };

    Some(
        raw.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
    )
}

/// Resolves a site argument given either as a site identifier or as any URL
/// on the site
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::resolve_site_id;
///
/// assert_eq!(resolve_site_id("https://cafe.test/menu"), "cafe.test");
/// assert_eq!(resolve_site_id("cafe.test"), "cafe.test");
/// ```
pub fn resolve_site_id(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        if let Some(id) = Url::parse(trimmed).ok().as_ref().and_then(site_id) {
            return id;
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_no_host() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert_eq!(extract_domain(&url), None);
    }

    #[test]
    fn test_site_id_plain_host() {
        let url = Url::parse("https://www.partnerscoffee.com/").unwrap();
        assert_eq!(site_id(&url), Some("www.partnerscoffee.com".to_string()));
    }

    #[test]
    fn test_site_id_with_port() {
        let url = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(site_id(&url), Some("localhost_3000".to_string()));
    }

    #[test]
    fn test_site_id_ipv6() {
        let url = Url::parse("http://[::1]:8080/").unwrap();
        assert_eq!(site_id(&url), Some("___1__8080".to_string()));
    }

    #[test]
    fn test_resolve_site_id() {
        assert_eq!(resolve_site_id("http://127.0.0.1:4000/menu?x=1"), "127.0.0.1_4000");
        assert_eq!(resolve_site_id(" cafe.test "), "cafe.test");
        assert_eq!(resolve_site_id("localhost_3000"), "localhost_3000");
    }
}
