//! HTML to Markdown extraction.
//!
//! Walks the document tree and emits a small Markdown subset: headings,
//! paragraphs, list items and inline links. Chrome elements (navigation,
//! scripts, headers, footers) are skipped.

use scraper::{ElementRef, Html, Selector};

use super::ContentExtractor;
use crate::error::{AppError, Result};
use crate::models::PageContent;

pub struct DefaultExtractor;

impl ContentExtractor for DefaultExtractor {
    fn extract(&self, url: &str, html: &str) -> Result<PageContent> {
        let document = Html::parse_document(html);

        let title = select_first(&document, "title")
            .map(|el| collapse(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        // Prefer the main content region when the page marks one up.
        let root = select_first(&document, "main, article, [role=main]")
            .or_else(|| select_first(&document, "body"));

        let mut blocks = Vec::new();
        if let Some(root) = root {
            walk(root, &mut blocks);
        }

        if blocks.is_empty() {
            return Err(AppError::parse(format!("no extractable content in {url}")));
        }

        Ok(PageContent::new(blocks.join("\n\n"), title, url))
    }
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn walk(element: ElementRef, blocks: &mut Vec<String>) {
    for child in element.children() {
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        match child.value().name() {
            "script" | "style" | "nav" | "header" | "footer" | "aside" | "noscript" => {}
            name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = inline_text(child);
                if !text.is_empty() {
                    blocks.push(format!("{} {}", "#".repeat(level), text));
                }
            }
            "p" => {
                let text = inline_text(child);
                if !text.is_empty() {
                    blocks.push(text);
                }
            }
            "ul" | "ol" => {
                for item in child.children().filter_map(ElementRef::wrap) {
                    if item.value().name() == "li" {
                        let text = inline_text(item);
                        if !text.is_empty() {
                            blocks.push(format!("- {text}"));
                        }
                    }
                }
            }
            _ => walk(child, blocks),
        }
    }
}

/// Inline rendering: text nodes plus `[text](href)` for anchors.
fn inline_text(element: ElementRef) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            if el.value().name() == "a" {
                let label = collapse(&el.text().collect::<String>());
                match el.attr("href") {
                    Some(href) if !label.is_empty() => {
                        out.push_str(&format!("[{label}]({href})"));
                    }
                    _ => out.push_str(&label),
                }
            } else {
                out.push_str(&inline_text(el));
            }
        }
    }
    collapse(&out)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
