//! Markdown to HTML transform.
//!
//! Rendering is two passes: pulldown-cmark produces HTML, then the HTML is
//! parsed into an html5ever DOM that a single visitor rewrites in place.
//! Only the children of `<body>` are serialized back out.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    Attribute, LocalName, ParseOpts, QualName, local_name, namespace_url, ns, parse_document,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use pulldown_cmark::{Options, Parser, html};

use crate::paths;

/// Class prefix of highlighted code blocks.
const HIGHLIGHT_PREFIX: &str = "highlight highlight-";

/// Elements removed from rendered pages.
const UNSAFE_ELEMENTS: &[&str] = &["script", "iframe", "object", "embed"];

/// Error returned when a page cannot be transformed.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Markdown source is not UTF-8.
    #[error("Markdown is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// HTML could not be read into a DOM.
    #[error("Failed to parse HTML: {0}")]
    Parse(#[source] io::Error),
    /// DOM could not be written back to HTML.
    #[error("Failed to serialize HTML: {0}")]
    Serialize(#[source] io::Error),
    /// Parsed document has no `<body>` element.
    #[error("Parsed document has no body")]
    MissingBody,
}

/// Render a Markdown page of `route` to its stored HTML fragment.
///
/// Relative Markdown links and image sources are resolved against `/{route}`.
pub fn render_markdown(route: &str, markdown: &[u8]) -> Result<String, TransformError> {
    let text = std::str::from_utf8(markdown)?;
    let root = paths::join(&["/", route]);
    rewrite_html(&root, &markdown_to_html(text))
}

/// Render GitHub-flavored Markdown to HTML.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markdown, options);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Rewrite an HTML document and return the serialized children of its body.
///
/// `root` is the published prefix that relative links resolve against.
pub fn rewrite_html(root: &str, document: &str) -> Result<String, TransformError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut document.as_bytes())
        .map_err(TransformError::Parse)?;

    Rewriter { root }.visit(&dom.document);

    let body = find_element(&dom.document, "body").ok_or(TransformError::MissingBody)?;
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..SerializeOpts::default()
    };

    let mut out = Vec::with_capacity(document.len());
    serialize(&mut out, &SerializableHandle::from(body), opts).map_err(TransformError::Serialize)?;
    String::from_utf8(out)
        .map_err(|e| TransformError::Serialize(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Depth-first DOM visitor applying the page rewrites.
struct Rewriter<'a> {
    root: &'a str,
}

impl Rewriter<'_> {
    fn visit(&self, node: &Handle) {
        if let NodeData::Element { name, attrs, .. } = &node.data {
            let mut attrs = attrs.borrow_mut();
            attrs.retain(is_safe_attribute);

            match &*name.local {
                "a" => self.rewrite_link(&mut attrs),
                "img" => self.rewrite_image(&mut attrs),
                "code" => {
                    if attrs.is_empty() {
                        attrs.push(attribute("class", "language-default"));
                    }
                }
                "table" => add_class(&mut attrs, "table"),
                "div" => {
                    let lang = class_of(&attrs)
                        .and_then(|class| class.strip_prefix(HIGHLIGHT_PREFIX))
                        .map(str::to_lowercase);
                    if let Some(lang) = lang {
                        highlight_code_block(node, &lang);
                    }
                }
                _ => {}
            }
        }

        node.children.borrow_mut().retain(|child| !is_unsafe_element(child));
        let children = node.children.borrow().clone();
        for child in &children {
            self.visit(child);
        }
    }

    fn rewrite_link(&self, attrs: &mut [Attribute]) {
        for attr in attrs.iter_mut().filter(|a| a.name.local == local_name!("href")) {
            let href = &*attr.value;
            if !href.contains('#') && paths::is_markdown(href) && !paths::is_remote_url(href) {
                attr.value = StrTendril::from_slice(&paths::to_html_path(&[self.root, href]));
            }
        }
    }

    fn rewrite_image(&self, attrs: &mut [Attribute]) {
        for attr in attrs.iter_mut().filter(|a| a.name.local == local_name!("src")) {
            let src = &*attr.value;
            if !paths::is_remote_url(src) {
                attr.value = StrTendril::from_slice(&paths::to_html_path(&[self.root, src]));
            }
        }
    }
}

/// Wrap the text of a highlighted block's `pre` in a `code` element.
fn highlight_code_block(div: &Handle, lang: &str) {
    let Some(pre) = div.children.borrow().first().cloned() else {
        return;
    };
    if !matches!(pre.data, NodeData::Element { .. }) {
        return;
    }

    let code = element("code", vec![attribute("class", &format!("language-{lang}"))]);
    if let Some(first) = pre.children.borrow().first() {
        let text = Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(&text_content(first))),
        });
        text.parent.set(Some(Rc::downgrade(&code)));
        code.children.borrow_mut().push(text);
    }
    code.parent.set(Some(Rc::downgrade(&pre)));
    *pre.children.borrow_mut() = vec![code];
}

fn text_content(node: &Handle) -> String {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().to_string(),
        _ => node.children.borrow().iter().map(text_content).collect(),
    }
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data
        && &*name.local == tag
    {
        return Some(Rc::clone(node));
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn element(tag: &str, attrs: Vec<Attribute>) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

fn class_of(attrs: &[Attribute]) -> Option<&str> {
    attrs
        .iter()
        .find(|a| a.name.local == local_name!("class"))
        .map(|a| &*a.value)
}

/// Append `class` to the element's class list, creating it if absent.
fn add_class(attrs: &mut Vec<Attribute>, class: &str) {
    match attrs.iter_mut().find(|a| a.name.local == local_name!("class")) {
        Some(existing) => {
            let value = format!("{} {class}", &*existing.value);
            existing.value = StrTendril::from_slice(value.trim_start());
        }
        None => attrs.push(attribute("class", class)),
    }
}

fn is_unsafe_element(node: &Handle) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => UNSAFE_ELEMENTS.contains(&&*name.local),
        _ => false,
    }
}

/// Event handlers and `javascript:` URLs are dropped.
fn is_safe_attribute(attr: &Attribute) -> bool {
    let name = &*attr.name.local;
    if name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on")) {
        return false;
    }
    if name == "href" || name == "src" {
        let value = attr.value.trim_start();
        let scheme = value.get(..11).unwrap_or(value);
        return !scheme.eq_ignore_ascii_case("javascript:");
    }
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rewrite(html: &str) -> String {
        rewrite_html("/test", html).unwrap()
    }

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html("# Hello, world!\nThis is only a test.");
        assert_eq!(html, "<h1>Hello, world!</h1>\n<p>This is only a test.</p>\n");
    }

    #[test]
    fn test_rewrite_strips_document_wrapper() {
        let html = rewrite("<h1>Hello, world!</h1><p>This is only a test.</p>");
        assert_eq!(html, "<h1>Hello, world!</h1><p>This is only a test.</p>");
    }

    #[test]
    fn test_rewrite_anchor_to_html_page() {
        assert_eq!(
            rewrite(r#"<a href="anchor/page.md">Test</a>"#),
            r#"<a href="/test/anchor/page.html">Test</a>"#
        );
    }

    #[test]
    fn test_rewrite_anchor_skips_fragments_remote_and_non_markdown() {
        for given in [
            r#"<a href="page.md#install">Test</a>"#,
            r#"<a href="https://example.com/page.md">Test</a>"#,
            r#"<a href="page.html">Test</a>"#,
        ] {
            assert_eq!(rewrite(given), given);
        }
    }

    #[test]
    fn test_rewrite_image_source() {
        assert_eq!(
            rewrite(r#"<img src="image/pic.png">"#),
            r#"<img src="/test/image/pic.png">"#
        );
    }

    #[test]
    fn test_rewrite_image_keeps_remote_source() {
        let given = r#"<img src="http://somesite.com/image/pic.png">"#;
        assert_eq!(rewrite(given), given);
    }

    #[test]
    fn test_table_gets_class() {
        assert_eq!(rewrite("<table></table>"), r#"<table class="table"></table>"#);
        assert_eq!(
            rewrite(r#"<table class="wide"></table>"#),
            r#"<table class="wide table"></table>"#
        );
    }

    #[test]
    fn test_bare_code_gets_default_language() {
        assert_eq!(
            rewrite("<code>{ if else then }</code>"),
            r#"<code class="language-default">{ if else then }</code>"#
        );
        let given = r#"<code class="language-rust">fn main() {}</code>"#;
        assert_eq!(rewrite(given), given);
    }

    #[test]
    fn test_highlight_div_wraps_pre_text_in_code() {
        assert_eq!(
            rewrite(r#"<div class="highlight highlight-default"><pre>{if else then}</pre><div>"#),
            r#"<div class="highlight highlight-default"><pre><code class="language-default">{if else then}</code></pre><div></div></div>"#
        );
        assert_eq!(
            rewrite(r#"<div class="highlight highlight-Go"><pre>x := 1</pre></div>"#),
            r#"<div class="highlight highlight-Go"><pre><code class="language-go">x := 1</code></pre></div>"#
        );
    }

    #[test]
    fn test_sanitizes_scripts_and_handlers() {
        assert_eq!(
            rewrite(r#"<p onclick="x()">Hi<script>alert(1)</script></p><iframe src="a"></iframe>"#),
            "<p>Hi</p>"
        );
        assert_eq!(
            rewrite(r#"<a href="javascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
    }

    #[test]
    fn test_render_markdown_end_to_end() {
        let markdown = "# Guide\n\nSee [setup](setup/README.md) and ![logo](img/logo.png).\n\n\
                        | a | b |\n|---|---|\n| 1 | 2 |\n\n```\nplain\n```\n";
        let html = render_markdown("guide", markdown.as_bytes()).unwrap();

        assert!(html.starts_with("<h1>Guide</h1>"));
        assert!(html.contains(r#"<a href="/guide/setup/index.html">setup</a>"#));
        assert!(html.contains(r#"<img src="/guide/img/logo.png" alt="logo">"#));
        assert!(html.contains(r#"<table class="table">"#));
        assert!(html.contains(r#"<pre><code class="language-default">plain"#));
        assert!(!html.contains("<body>"));
    }

    #[test]
    fn test_render_markdown_rejects_invalid_utf8() {
        let err = render_markdown("guide", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, TransformError::Utf8(_)));
    }
}
