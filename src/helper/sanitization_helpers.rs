use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};
use std::collections::HashSet;

/// Renders post content written in Markdown to HTML safe for direct output.
/// Script-capable markup and attributes are removed; links get `nofollow ugc`.
pub fn render_markdown(markdown_input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown_input, options);
    let mut unsafe_html = String::new();
    html::push_html(&mut unsafe_html, parser);

    let safe_tags: HashSet<&str> = [
        "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "p", "br", "a", "ul", "ol", "li",
        "blockquote", "code", "pre", "hr", "img", "table", "thead", "tbody", "tr", "th", "td", "s", "del",
        "input",
    ]
    .into_iter()
    .collect();
    let generic_attributes: HashSet<&str> = ["src", "href", "alt", "title", "type", "checked", "disabled"]
        .into_iter()
        .collect();

    Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("nofollow ugc"))
        .clean(&unsafe_html)
        .to_string()
}

/// Strips all HTML tags from input (for titles, excerpts and comments) and
/// returns plain text. Templates escape it again on output.
pub fn strip_all_html(input: &str) -> String {
    let cleaned = Builder::new().tags(HashSet::new()).clean(input).to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}
