use crate::extractor::markup::refresh_target;
use crate::extractor::{ExtractError, PageContext};
use reqwest::header::{CONTENT_LOCATION, LINK, LOCATION, REFRESH};

/// URLs carried by response headers: `Link`, `Location`, `Content-Location`
/// and `Refresh`
pub(super) fn headers(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    for value in page.headers.get_all(LINK) {
        if let Ok(value) = value.to_str() {
            found.extend(link_header_targets(value));
        }
    }

    for name in [LOCATION, CONTENT_LOCATION] {
        for value in page.headers.get_all(&name) {
            if let Ok(value) = value.to_str() {
                found.push(value.to_string());
            }
        }
    }

    for value in page.headers.get_all(REFRESH) {
        if let Some(target) = value.to_str().ok().and_then(refresh_target) {
            found.push(target.to_string());
        }
    }

    Ok(found)
}

/// Splits an RFC 8288 `Link` value into its `<...>` targets
fn link_header_targets(value: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                targets.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    targets
}
