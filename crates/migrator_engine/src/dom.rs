//! Owned, mutable HTML fragment tree.
//!
//! `scraper` parses; rewriting happens on this plain value tree so each step
//! can take and restructure nodes freely, then [`Fragment::to_html`] serializes.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DomNode {
    Element(ElementNode),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_child(DomNode::Text(text.to_string()))
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or replace an attribute, keeping the position of an existing one.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Flattened text content: all descendant text concatenated, `<br>` read as
    /// a space, whitespace runs collapsed and the ends trimmed.
    pub fn flat_text(&self) -> String {
        let mut raw = String::new();
        collect_text(&self.children, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn into_node(self) -> DomNode {
        DomNode::Element(self)
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(text) => out.push_str(text),
            DomNode::Element(el) if el.is("br") => out.push(' '),
            DomNode::Element(el) => collect_text(&el.children, out),
            DomNode::Comment(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Fragment {
    pub children: Vec<DomNode>,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        // Fragment parsing wraps the content in a synthetic <html> element.
        let children = parsed
            .root_element()
            .children()
            .filter_map(convert_node)
            .collect();
        Self { children }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, false, &mut out);
        }
        out
    }
}

fn convert_node(node: NodeRef<'_, Node>) -> Option<DomNode> {
    match node.value() {
        Node::Text(text) => Some(DomNode::Text(text.to_string())),
        Node::Comment(comment) => Some(DomNode::Comment(comment.to_string())),
        Node::Element(element) => Some(DomNode::Element(ElementNode {
            name: element.name().to_string(),
            attrs: element
                .attrs()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            children: node.children().filter_map(convert_node).collect(),
        })),
        _ => None,
    }
}

fn write_node(node: &DomNode, raw_text: bool, out: &mut String) {
    match node {
        DomNode::Text(text) if raw_text => out.push_str(text),
        DomNode::Text(text) => escape_text(text, out),
        DomNode::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        DomNode::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            // Sorted, matching the order the parser reports them in.
            let mut attrs: Vec<_> = el.attrs.iter().collect();
            attrs.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
            for child in &el.children {
                write_node(child, raw, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
