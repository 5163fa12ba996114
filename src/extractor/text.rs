//! Strategies that scan free text (scripts, stylesheets, comments) for URLs.
//!
//! These are pattern heuristics over static text. Links only produced by
//! executing script are out of reach, so misses here are expected.

use crate::extractor::{selector, ExtractError, PageContext};
use regex::Regex;
use scraper::{ElementRef, Node};
use std::sync::LazyLock;

/// Quoted strings naming a server-rendered page
static PAGE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']([^"'\s]+\.(?:html?|php|aspx?|jsp)(?:[?#][^"'\s]*)?)["']"#)
        .expect("page file pattern is valid")
});

/// `location = "..."`, `location.href = "..."`, `window.location = "..."`
static LOCATION_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)location(?:\.href)?\s*=\s*["']([^"']+)["']"#)
        .expect("location pattern is valid")
});

/// `location.assign("...")` and `location.replace("...")`
static LOCATION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)location\.(?:assign|replace)\(\s*["']([^"']+)["']"#)
        .expect("location call pattern is valid")
});

/// Object keys such as `href: "..."` or `"url": "..."`
static LINK_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?\b(?:href|url|link)["']?\s*:\s*["']([^"']+)["']"#)
        .expect("link key pattern is valid")
});

/// Quoted absolute http(s) URLs
static QUOTED_ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["'](https?://[^"'\s<>]+)["']"#).expect("absolute pattern is valid")
});

/// Quoted root-relative paths such as `"/menu/drinks"`
static QUOTED_ROOT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](/[A-Za-z0-9_\-~%./?=&+]*)["']"#).expect("root path pattern is valid")
});

/// `url(...)` references in CSS
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*["']?([^"')\s]+)["']?\s*\)"#).expect("css url pattern is valid")
});

/// `@import "..."` rules
static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s+["']([^"']+)["']"#).expect("css import pattern is valid")
});

/// Attribute assignments left in commented-out markup
static COMMENT_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:href|src|action)\s*=\s*["']([^"']+)["']"#)
        .expect("comment attribute pattern is valid")
});

/// Bare absolute URLs in prose
static BARE_ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s"'<>()]+"#).expect("bare url pattern is valid")
});

/// URL-looking strings in inline scripts, `on*` event handlers and
/// `javascript:` hrefs
pub(super) fn scripts(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    let inline = selector("script:not([src])")?;
    for element in page.document.select(&inline) {
        let is_json_ld = element
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if is_json_ld {
            continue;
        }
        let code: String = element.text().collect();
        scan_script(&code, &mut found);
    }

    for node in page.document.tree.root().descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            for (name, value) in element.value().attrs() {
                let is_handler = name.len() > 2
                    && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"));
                if is_handler {
                    scan_script(value, &mut found);
                } else if name.eq_ignore_ascii_case("href") {
                    if let Some(code) = javascript_body(value) {
                        scan_script(code, &mut found);
                    }
                }
            }
        }
    }

    Ok(found)
}

/// The code after a `javascript:` scheme, if `href` has one
fn javascript_body(href: &str) -> Option<&str> {
    let href = href.trim_start();
    let scheme = href.get(..11)?;
    scheme
        .eq_ignore_ascii_case("javascript:")
        .then(|| &href[11..])
}

fn scan_script(code: &str, found: &mut Vec<String>) {
    for pattern in [
        &*PAGE_FILE,
        &*LOCATION_ASSIGN,
        &*LOCATION_CALL,
        &*LINK_KEY,
        &*QUOTED_ABSOLUTE,
        &*QUOTED_ROOT_PATH,
    ] {
        found.extend(
            pattern
                .captures_iter(code)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }
}

/// `url(...)` and `@import` targets in `<style>` blocks and `style` attributes
pub(super) fn css(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    let blocks = selector("style")?;
    for element in page.document.select(&blocks) {
        let sheet: String = element.text().collect();
        scan_css(&sheet, &mut found);
    }

    let styled = selector("[style]")?;
    for element in page.document.select(&styled) {
        if let Some(style) = element.value().attr("style") {
            scan_css(style, &mut found);
        }
    }

    Ok(found)
}

fn scan_css(sheet: &str, found: &mut Vec<String>) {
    for pattern in [&*CSS_URL, &*CSS_IMPORT] {
        found.extend(
            pattern
                .captures_iter(sheet)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }
}

/// Links inside HTML comments
pub(super) fn comments(page: &PageContext<'_>) -> Result<Vec<String>, ExtractError> {
    let mut found = Vec::new();

    for node in page.document.tree.root().descendants() {
        if let Node::Comment(comment) = node.value() {
            let text: &str = comment;
            found.extend(
                COMMENT_ATTRIBUTE
                    .captures_iter(text)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string()),
            );
            found.extend(BARE_ABSOLUTE.find_iter(text).map(|m| m.as_str().to_string()));
        }
    }

    Ok(found)
}
