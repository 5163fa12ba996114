/// Checks whether a candidate host belongs to the seed site
///
/// With `include_subdomains` off only an exact match counts. With it on,
/// any subdomain of the seed host also matches ("menu.cafe.test" for
/// "cafe.test"), but a host that merely ends with the same characters
/// ("notcafe.test") does not.
///
/// Both hosts are expected in lowercase.
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::host_matches;
///
/// assert!(host_matches("example.com", "example.com", false));
/// assert!(!host_matches("example.com", "cdn.example.com", false));
/// assert!(host_matches("example.com", "cdn.example.com", true));
/// assert!(!host_matches("example.com", "myexample.com", true));
/// ```
pub fn host_matches(seed_host: &str, candidate: &str, include_subdomains: bool) -> bool {
    if seed_host.is_empty() {
        return false;
    }
    if candidate == seed_host {
        return true;
    }
    include_subdomains
        && candidate.len() > seed_host.len()
        && candidate.ends_with(seed_host)
        && candidate.as_bytes()[candidate.len() - seed_host.len() - 1] == b'.'
}
