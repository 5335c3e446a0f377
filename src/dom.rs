//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! We support the controlled subset the content assembler emits plus what
//! record text commonly carries:
//! - Block: html, head, body, title, div, p, h1-h6, ul, ol, li, table, tr, td, th
//! - Inline: span, a, strong, em, b, i
//! - Void: img, br, hr, meta, link
//!
//! Anything else is kept as [`Tag::Unknown`] so its text still counts.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Title,
    Body,
    Div,
    P,
    /// Heading level 1..=6.
    H(u8),
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Span,
    Img,
    Br,
    Hr,
    /// Catch-all for unknown tags – kept so their text is not lost.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "title" => Tag::Title,
            "body" => Tag::Body,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H(1),
            "h2" => Tag::H(2),
            "h3" => Tag::H(3),
            "h4" => Tag::H(4),
            "h5" => Tag::H(5),
            "h6" => Tag::H(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "img" => Tag::Img,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            _ => Tag::Unknown(lower),
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Img | Tag::Br | Tag::Hr => true,
            Tag::Unknown(name) => matches!(
                name.as_str(),
                "meta" | "link" | "input" | "source" | "wbr" | "col" | "area" | "base"
            ),
            _ => false,
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Tag::H(level) => Some(*level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

impl DomNode {
    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => {
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    /// Pixel value of an inline style property, e.g. `width:300px` → 300.
    pub fn style_px(&self, property: &str) -> Option<f32> {
        self.inline_style()?.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            if !key.trim().eq_ignore_ascii_case(property) {
                return None;
            }
            value.trim().strip_suffix("px")?.trim().parse().ok()
        })
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Direct element children carrying `tag`.
    pub fn child_elements<'a>(&'a self, tag: &'a Tag) -> impl Iterator<Item = &'a ElementNode> {
        self.children
            .iter()
            .filter_map(DomNode::as_element)
            .filter(move |e| &e.tag == tag)
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of top-level DOM nodes.
///
/// A closing tag always closes the innermost open element. Stray closing
/// tags at the top level are skipped.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let mut nodes = Vec::new();
    loop {
        nodes.extend(parser.parse_nodes());
        if parser.eof() {
            break;
        }
        parser.skip_closing_tag();
    }
    nodes
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_between_tags();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // doctype / processing instruction
            self.skip_past(">");
            return None;
        }
        let opens_tag = self.starts_with("<")
            && self.input[self.pos + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
        if opens_tag {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        self.advance();
        while !self.eof() && !self.starts_with("<") {
            self.advance();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(); // '<'
        let tag = Tag::from_name(&self.parse_name());
        let mut elem = ElementNode::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Unparseable attribute character; drop it.
                self.advance();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance();
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        elem.children = self.parse_nodes();
        if self.starts_with("</") {
            self.skip_closing_tag();
        }
        DomNode::Element(elem)
    }

    fn skip_closing_tag(&mut self) {
        self.skip_past(">");
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(); // '='
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance();
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance();
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance();
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.advance();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Skip runs of pure whitespace that sit between tags.
    fn skip_whitespace_between_tags(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    /// Advance past the next occurrence of `end`, or to EOF.
    fn skip_past(&mut self, end: &str) {
        match self.input[self.pos..].find(end) {
            Some(i) => self.pos += i + end.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(c) = self.input[self.pos..].chars().next() {
            self.pos += c.len_utf8();
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        nodes
            .iter()
            .find_map(DomNode::as_element)
            .expect("expected an element")
    }

    #[test]
    fn parse_heading_levels() {
        for level in 1..=6u8 {
            let html = format!("<h{level}>Title</h{level}>");
            let nodes = parse_html(&html);
            assert_eq!(first_element(&nodes).tag.heading_level(), Some(level));
        }
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let nodes = parse_html(r#"<img src="a.png"><br><p>After</p><hr><p>End</p>"#);
        let tags: Vec<Tag> = nodes
            .iter()
            .filter_map(DomNode::as_element)
            .map(|e| e.tag.clone())
            .collect();
        assert_eq!(tags, vec![Tag::Img, Tag::Br, Tag::P, Tag::Hr, Tag::P]);
    }

    #[test]
    fn parse_img_attributes_and_style() {
        let nodes =
            parse_html(r#"<img src="https://x.test/a.png" alt="Screenshot" style="width:300px;height:auto;">"#);
        let img = first_element(&nodes);
        assert_eq!(img.src(), Some("https://x.test/a.png"));
        assert_eq!(img.attr("alt"), Some("Screenshot"));
        assert_eq!(img.style_px("width"), Some(300.0));
        assert_eq!(img.style_px("height"), None);
    }

    #[test]
    fn text_content_spans_descendants_and_decodes_entities() {
        let nodes = parse_html("<p>Fish &amp; <span>Chips</span> &lt;3</p>");
        assert_eq!(first_element(&nodes).text_content(), "Fish & Chips <3");
    }

    #[test]
    fn escaped_markup_stays_text() {
        let nodes = parse_html("<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 1);
        assert_eq!(p.text_content(), "<script>alert(1)</script>");
    }

    #[test]
    fn stray_closing_tag_does_not_stop_parsing() {
        let nodes = parse_html("<p>One</p></div><p>Two</p>");
        let count = nodes.iter().filter_map(DomNode::as_element).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_html("<p>a < b</p>");
        assert_eq!(first_element(&nodes).text_content(), "a < b");
    }

    #[test]
    fn body_children_unwraps_document_shell() {
        let html = "<!DOCTYPE html><html><head><title>T</title></head><body><h1>X</h1><p>Y</p></body></html>";
        let nodes = parse_html(html);
        let body = body_children(&nodes);
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn child_elements_filters_direct_children() {
        let nodes = parse_html("<ul><li>A</li><li>B<ul><li>C</li></ul></li></ul>");
        let ul = first_element(&nodes);
        let items: Vec<String> = ul.child_elements(&Tag::Li).map(|li| li.text_content()).collect();
        assert_eq!(items, vec!["A", "BC"]);
    }
}
