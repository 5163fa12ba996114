//! Strategies that read URLs straight out of element attributes and
//! structured-data blocks.

use crate::extractor::{selector, ExtractError, PageContext};
use serde_json::Value;

/// `rel` values on `<link>` that point at another rendition of a page
const PAGE_LINK_RELS: &[&str] = &["canonical", "alternate", "next", "prev", "previous"];

/// `property`/`name` values on `<meta>` whose content is a page URL
const META_URL_PROPERTIES: &[&str] = &["og:url", "twitter:url", "og:see_also"];

/// Data attributes commonly used by script-driven navigation
const DATA_ATTRIBUTES: &[&str] = &["data-href", "data-url", "data-link", "data-src"];

/// Microdata properties that carry a link
const MICRODATA_URL_PROPS: &[&str] = &[
    "url",
    "sameas",
    "mainentityofpage",
    "menu",
    "hasmenu",
    "contenturl",
    "item",
    "significantlink",
    "relatedlink",
];

/// JSON-LD keys whose string values are URLs
const JSON_LD_URL_KEYS: &[&str] = &[
    "url",
    "@id",
    "sameAs",
    "mainEntityOfPage",
    "item",
    "contentUrl",
    "target",
    "hasMenu",
    "menu",
    "significantLink",
    "relatedLink",
];

/// `<a href>` and `<area href>`
pub(super) fn anchors(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let anchors = selector("a[href], area[href]")?;
    Ok(page
        .document
        .select(&anchors)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect())
}

/// Meta refresh, URL-bearing meta properties and page-level `<link>` relations
pub(super) fn meta(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    let metas = selector("meta[content]")?;
    for element in page.document.select(&metas) {
        let el = element.value();
        let content = match el.attr("content") {
            Some(content) => content,
            None => continue,
        };

        let is_refresh = el
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if is_refresh {
            if let Some(target) = refresh_target(content) {
                found.push(target.to_string());
            }
            continue;
        }

        let key = el.attr("property").or_else(|| el.attr("name"));
        if key.is_some_and(|k| {
            META_URL_PROPERTIES
                .iter()
                .any(|p| p.eq_ignore_ascii_case(k.trim()))
        }) {
            found.push(content.to_string());
        }
    }

    let links = selector("link[href][rel]")?;
    for element in page.document.select(&links) {
        let el = element.value();
        let rel = el.attr("rel").unwrap_or_default().to_ascii_lowercase();
        let is_page_link = rel
            .split_ascii_whitespace()
            .any(|r| PAGE_LINK_RELS.contains(&r));
        if is_page_link {
            if let Some(href) = el.attr("href") {
                found.push(href.to_string());
            }
        }
    }

    Ok(found)
}

/// `<form action>`
pub(super) fn forms(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let forms = selector("form[action]")?;
    Ok(page
        .document
        .select(&forms)
        .filter_map(|element| element.value().attr("action"))
        .map(str::to_string)
        .collect())
}

/// Navigation targets stashed in `data-*` attributes
pub(super) fn data_attributes(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();
    for attribute in DATA_ATTRIBUTES {
        let with_attribute = selector(&format!("[{}]", attribute))?;
        for element in page.document.select(&with_attribute) {
            if let Some(value) = element.value().attr(attribute) {
                found.push(value.to_string());
            }
        }
    }
    Ok(found)
}

/// Microdata `itemprop` links and `itemid` identifiers
pub(super) fn microdata(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    let props = selector("[itemprop]")?;
    for element in page.document.select(&props) {
        let el = element.value();
        let names = el.attr("itemprop").unwrap_or_default().to_ascii_lowercase();
        let is_url_prop = names
            .split_ascii_whitespace()
            .any(|name| MICRODATA_URL_PROPS.contains(&name));
        if !is_url_prop {
            continue;
        }
        if let Some(value) = el.attr("href").or_else(|| el.attr("content")) {
            found.push(value.to_string());
        }
    }

    let ids = selector("[itemid]")?;
    for element in page.document.select(&ids) {
        if let Some(id) = element.value().attr("itemid") {
            found.push(id.to_string());
        }
    }

    Ok(found)
}

/// URL-valued keys inside `<script type="application/ld+json">` blocks
///
/// Each block is parsed on its own so one malformed block does not hide the
/// others. The strategy only fails when every block on the page is malformed.
pub(super) fn json_ld(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let blocks = selector("script[type]")?;
    let mut found = Vec::new();
    let mut parsed_any = false;
    let mut last_error = None;

    for element in page.document.select(&blocks) {
        let is_ld = element
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if !is_ld {
            continue;
        }

        let body: String = element.text().collect();
        match serde_json::from_str::<Value>(body.trim()) {
            Ok(value) => {
                parsed_any = true;
                collect_json_urls(&value, None, &mut found);
            }
            Err(e) => {
                tracing::debug!("Skipping malformed JSON-LD block on {}: {}", page.page_url, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !parsed_any => Err(ExtractError::JsonLd(e)),
        _ => Ok(found),
    }
}

/// Walks a JSON-LD value, collecting strings under URL keys and any
/// absolute http(s) string elsewhere
fn collect_json_urls(value: &Value, key: Option<&str>, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            // URL templates such as SearchAction targets are not pages
            if s.contains('{') {
                return;
            }
            let under_url_key = key.is_some_and(|k| JSON_LD_URL_KEYS.contains(&k));
            if under_url_key || is_absolute_http(s) {
                found.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_json_urls(item, key, found);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                collect_json_urls(v, Some(k.as_str()), found);
            }
        }
        _ => {}
    }
}

fn is_absolute_http(s: &str) -> bool {
    let lower = s.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Pulls the target out of a refresh value such as `5; url='/next'`
pub(super) fn refresh_target(content: &str) -> Option<&str> {
    let lower = content.to_ascii_lowercase();
    let start = lower.find("url")?;
    let rest = content[start + 3..].trim_start();
    let rest = rest.strip_prefix('=')?.trim();
    let rest = rest.trim_matches(|c| c == '\'' || c == '"').trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
