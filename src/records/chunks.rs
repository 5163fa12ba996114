use scraper::Html;

/// Elements whose text never reaches the record extractor
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "nav", "footer", "header"];

/// Reduces an HTML page to its readable text
///
/// Text inside scripts, styles and page chrome (navigation, header, footer)
/// is dropped. Runs of whitespace collapse to a single space.
///
/// # Examples
///
/// ```
/// use crawl_ledger::records::page_text;
///
/// let html = "<nav>Home | Menu</nav><h1>Flat   White</h1><script>x()</script><p>Oat milk</p>";
/// assert_eq!(page_text(html), "Flat White Oat milk");
/// ```
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        for word in fragment.split_whitespace() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
    }

    text
}

/// Lazy iterator over bounded chunks of page text
///
/// Each chunk holds at most `max_chars` characters and, where possible, ends
/// at a whitespace boundary. The iterator borrows the text, yields each part
/// exactly once, and cannot be rewound.
#[derive(Debug)]
pub struct TextChunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> TextChunks<'a> {
    /// Splits `text` into chunks of at most `max_chars` characters
    ///
    /// A `max_chars` of zero is treated as one.
    pub fn new(text: &'a str, max_chars: usize) -> Self {
        Self {
            rest: text,
            max_chars: max_chars.max(1),
        }
    }
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            self.rest = "";
            return None;
        }

        let end = match rest.char_indices().nth(self.max_chars) {
            None => rest.len(),
            Some((limit, _)) => rest[..limit]
                .rfind(char::is_whitespace)
                .filter(|&i| i > 0)
                .unwrap_or(limit),
        };

        let (chunk, tail) = rest.split_at(end);
        self.rest = tail;
        Some(chunk.trim_end())
    }
}
