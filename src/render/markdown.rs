//! Markdown to sanitized HTML.
//!
//! Message text is untrusted. The renderer only lets through the structural tags pulldown-cmark
//! emits for plain markdown. Raw HTML is shown as escaped text, images collapse to their alt
//! text, and link targets outside an allow-list of schemes become `#`.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:"];

/// Renders markdown to HTML that carries no script-bearing constructs
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let events = Parser::new_ext(text, options).filter_map(sanitize_event);

    let mut output = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}

fn sanitize_event(event: Event<'_>) -> Option<Event<'_>> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Image { .. } | Tag::HtmlBlock | Tag::MetadataBlock(_)) => None,
        Event::End(TagEnd::Image | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_)) => None,
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_url(dest_url),
            title,
            id,
        })),
        other => Some(other),
    }
}

fn sanitize_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("#") }
}

/// Allows http(s), mailto and scheme-less (relative or fragment) URLs
pub fn is_safe_url(url: &str) -> bool {
    let trimmed: String = url.trim().chars().filter(|c| !c.is_whitespace() && !c.is_control()).collect();
    let lower = trimmed.to_ascii_lowercase();

    if SAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return true;
    }

    // A colon before any path, query or fragment delimiter means a scheme
    match lower.find([':', '/', '?', '#']) {
        Some(pos) => lower.as_bytes()[pos] != b':',
        None => true,
    }
}

/// Escapes text for HTML element content and double-quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
