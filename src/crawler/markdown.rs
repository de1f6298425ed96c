//! HTML to markdown conversion
//!
//! A depth-first walk over the parsed DOM that keeps the structure the
//! chunking engine looks for: ATX headings, fenced code blocks, pipe tables
//! and list items each start on their own line.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Elements whose subtrees never carry readable content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Converts an HTML document to markdown, prefixed with its source URL
///
/// Falls back to plain text extraction when the walk yields nothing.
///
/// # Example
///
/// ```
/// use crawl_digest::crawler::html_to_markdown;
///
/// let md = html_to_markdown("<h2>Install</h2><p>Run it.</p>", "https://example.com/");
/// assert!(md.starts_with("<!-- Source: https://example.com/ -->"));
/// assert!(md.contains("## Install"));
/// ```
pub fn html_to_markdown(html: &str, url: &str) -> String {
    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        debug!("{} recoverable HTML parse errors in {}", document.errors.len(), url);
    }

    let mut out = String::new();
    let root = body_or_root(&document);
    collect(root, &mut out);
    let mut body = tidy(&out);

    if body.is_empty() {
        body = plain_text(&document);
    }

    if body.is_empty() {
        format!("<!-- Source: {} -->", url)
    } else {
        format!("<!-- Source: {} -->\n\n{}", url, body)
    }
}

/// Markdown body without the leading source marker
pub fn strip_source_marker(markdown: &str) -> &str {
    match markdown.strip_prefix("<!-- Source: ") {
        Some(rest) => rest
            .split_once("-->")
            .map_or("", |(_, body)| body.trim_start()),
        None => markdown,
    }
}

/// Plain text of a document, one text node per line
pub fn plain_text(document: &Html) -> String {
    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        if let Node::Text(text) = node.value() {
            let in_skipped = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| SKIPPED_TAGS.contains(&el.value().name()));
            let text = text.trim();
            if !text.is_empty() && !in_skipped {
                lines.push(text.to_string());
            }
        }
    }
    lines.join("\n")
}

fn body_or_root(document: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element())
}

fn collect(element: ElementRef, out: &mut String) {
    let tag = element.value().name();
    if SKIPPED_TAGS.contains(&tag) {
        return;
    }

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: usize = tag[1..].parse().unwrap_or(1);
            let text = inline_text(element);
            if !text.is_empty() {
                out.push_str(&format!("\n\n{} {}\n\n", "#".repeat(level), text));
            }
        }
        "pre" => {
            let text: String = element.text().collect();
            let text = text.trim_matches('\n');
            if !text.trim().is_empty() {
                let lang = code_language(element).unwrap_or_default();
                out.push_str(&format!("\n\n```{}\n{}\n```\n\n", lang, text));
            }
        }
        "code" => {
            let text: String = element.text().collect();
            if !text.trim().is_empty() {
                out.push_str(&format!("`{}` ", text.trim()));
            }
        }
        "table" => table(element, out),
        "ul" | "ol" => list(element, tag == "ol", out),
        "a" => {
            let href = element.value().attr("href").unwrap_or_default().trim();
            let text = inline_text(element);
            if text.is_empty() {
                return;
            }
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                out.push_str(&text);
            } else {
                out.push_str(&format!("[{}]({})", text, href));
            }
            out.push(' ');
        }
        "strong" | "b" => wrap_inline(element, "**", out),
        "em" | "i" => wrap_inline(element, "*", out),
        "br" => out.push('\n'),
        "hr" => out.push_str("\n\n---\n\n"),
        "p" | "div" | "section" | "article" | "main" | "blockquote" | "header" | "footer"
        | "nav" | "aside" => {
            out.push_str("\n\n");
            children(element, out);
            out.push_str("\n\n");
        }
        _ => children(element, out),
    }
}

fn children(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !t.is_empty() {
                    out.push_str(&t);
                    out.push(' ');
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn wrap_inline(element: ElementRef, marker: &str, out: &mut String) {
    let text = inline_text(element);
    if !text.is_empty() {
        out.push_str(&format!("{}{}{} ", marker, text, marker));
    }
}

fn inline_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Language from a `language-*`/`lang-*` class on the element or its first `code` child
fn code_language(element: ElementRef) -> Option<String> {
    let from_class = |el: ElementRef| {
        el.value().attr("class").and_then(|classes| {
            classes.split_whitespace().find_map(|cls| {
                cls.strip_prefix("language-")
                    .or_else(|| cls.strip_prefix("lang-"))
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_string)
            })
        })
    };

    from_class(element).or_else(|| {
        Selector::parse("code")
            .ok()
            .and_then(|selector| element.select(&selector).next())
            .and_then(from_class)
    })
}

fn list(element: ElementRef, ordered: bool, out: &mut String) {
    out.push_str("\n\n");
    let items = element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li");

    for (index, item) in items.enumerate() {
        let mut text = String::new();
        children(item, &mut text);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        if ordered {
            out.push_str(&format!("{}. {}\n", index + 1, text));
        } else {
            out.push_str(&format!("- {}\n", text));
        }
    }
    out.push('\n');
}

fn table(element: ElementRef, out: &mut String) {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return;
    };

    let rows: Vec<Vec<String>> = element
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| inline_text(cell).replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }

    out.push_str("\n\n");
    for (i, row) in rows.iter().enumerate() {
        out.push('|');
        for j in 0..columns {
            out.push_str(&format!(" {} |", row.get(j).map(String::as_str).unwrap_or("")));
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            for _ in 0..columns {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Trims line ends and collapses runs of blank lines outside code fences
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in raw.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let line = if in_fence { line } else { line.trim() };
        if line.trim().is_empty() && !in_fence {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/doc";

    #[test]
    fn test_source_marker_and_headings() {
        let md = html_to_markdown("<h1>Title</h1><h3>Sub <em>part</em></h3>", URL);
        assert!(md.starts_with("<!-- Source: https://example.com/doc -->\n\n"));
        assert!(md.contains("\n# Title\n"));
        assert!(md.ends_with("\n### Sub part"));
    }

    #[test]
    fn test_scripts_and_styles_dropped() {
        let md = html_to_markdown(
            "<html><head><style>p{}</style></head><body><script>alert(1)</script><p>Visible</p><noscript>hidden</noscript></body></html>",
            URL,
        );
        assert!(md.contains("Visible"));
        assert!(!md.contains("alert"));
        assert!(!md.contains("hidden"));
        assert!(!md.contains("p{}"));
    }

    #[test]
    fn test_code_block_with_language() {
        let md = html_to_markdown(
            r#"<pre><code class="language-rust">fn main() {
    println!("hi");
}</code></pre>"#,
            URL,
        );
        assert!(md.contains("```rust\nfn main() {\n    println!(\"hi\");\n}\n```"));
    }

    #[test]
    fn test_inline_code_and_links() {
        let md = html_to_markdown(
            r#"<p>Call <code>run()</code> or see <a href="/docs">the docs</a>.</p>"#,
            URL,
        );
        assert!(md.contains("`run()`"));
        assert!(md.contains("[the docs](/docs)"));
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown(
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol>",
            URL,
        );
        assert!(md.contains("- one\n- two"));
        assert!(md.contains("1. first\n2. second"));
    }

    #[test]
    fn test_table() {
        let md = html_to_markdown(
            "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>3</td></tr></table>",
            URL,
        );
        assert!(md.contains("| Name | Age |\n| --- | --- |\n| Ann | 3 |"));
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let md = html_to_markdown("<div><div><p>a</p></div></div><p>b</p>", URL);
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn test_empty_document() {
        let md = html_to_markdown("<html><body></body></html>", URL);
        assert_eq!(md, "<!-- Source: https://example.com/doc -->");
        assert_eq!(strip_source_marker(&md), "");
    }

    #[test]
    fn test_plain_text_skips_scripts() {
        let document = Html::parse_document("<p>one</p><script>x()</script><p>two</p>");
        assert_eq!(plain_text(&document), "one\ntwo");
    }
}
