use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{DomNode, ElementNode, Fragment};
use crate::filename::{media_filename, reference_path};
use crate::slug::slugify_heading;

/// WordPress block markers such as `<!-- wp:paragraph -->` / `<!-- /wp:paragraph -->`.
static CMS_BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*/?wp:[^>]*-->").expect("valid block comment pattern"));

/// "1. ", "2 - ", "3) ", "4: " at the start of a heading.
static ENUMERATION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*[.\-):]\s*").expect("valid enumeration pattern"));

const PARAGRAPH_STYLE: &str = "font-size:14px;";
const SUBHEADING_STYLE: &str = "font-size:18px;";
const HEADING_STYLE: &str = "font-size: 24px; color:#000000;";
const TOC_STYLE: &str =
    "background-color: #f9f9f9; padding: 16px; border-radius: 8px; margin-bottom: 20px;";
const TOC_LIST_STYLE: &str = "padding-left: 20px; margin-top: 8px; line-height: 1.8;";
const TOC_LABEL: &str = "Table of Contents";

/// How hyperlinks are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkMode {
    /// Keep the anchor, replacing `href` with its URL path.
    #[default]
    RewriteHref,
    /// Drop the anchor wrapper, keeping its content padded with spaces.
    Unwrap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub link_mode: LinkMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub anchor_id: String,
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Rewrites article bodies into the publishing format.
///
/// Output is a pure function of the input and options, and re-applying the
/// transform to its own output yields the same bytes.
#[derive(Debug, Clone, Default)]
pub struct HtmlTransformer {
    options: TransformOptions,
}

impl HtmlTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> TransformOptions {
        self.options
    }

    pub fn transform(&self, html: &str) -> String {
        self.transform_with_toc(html).html
    }

    pub fn transform_with_toc(&self, html: &str) -> TransformOutput {
        if html.trim().is_empty() {
            return TransformOutput {
                html: html.to_string(),
                toc: Vec::new(),
            };
        }

        let stripped = strip_cms_comments(html);
        let mut fragment = Fragment::parse(&stripped);
        remove_generated_toc(&mut fragment);

        replace_nbsp(&mut fragment.children);
        for_each_element(&mut fragment.children, &mut |el| {
            if el.is("h2") || el.is("h3") || el.is("p") {
                el.children = unwrap_named(std::mem::take(&mut el.children), "strong");
            }
        });
        for_each_element(&mut fragment.children, &mut |el| {
            if el.is("p") {
                wrap_flat_text(el, "span", Some(PARAGRAPH_STYLE));
            }
        });
        let toc = anchor_headings(&mut fragment.children);
        for_each_element(&mut fragment.children, &mut |el| {
            if el.is("h3") {
                wrap_flat_text(el, "span", Some(SUBHEADING_STYLE));
            }
        });
        for_each_element(&mut fragment.children, &mut localize_image);
        match self.options.link_mode {
            LinkMode::RewriteHref => for_each_element(&mut fragment.children, &mut rewrite_href),
            LinkMode::Unwrap => {
                fragment.children = unwrap_links(std::mem::take(&mut fragment.children));
            }
        }

        if !toc.is_empty() {
            fragment.children.insert(0, build_toc(&toc));
        }

        TransformOutput {
            html: fragment.to_html(),
            toc,
        }
    }
}

pub fn strip_cms_comments(html: &str) -> String {
    CMS_BLOCK_COMMENT.replace_all(html, "").into_owned()
}

/// Heading text without a leading enumeration such as "1. " or "2) ".
pub fn strip_enumeration(text: &str) -> &str {
    match ENUMERATION_PREFIX.find(text) {
        Some(prefix) => &text[prefix.end()..],
        None => text,
    }
}

/// Pre-order visit of every element.
fn for_each_element(nodes: &mut [DomNode], f: &mut dyn FnMut(&mut ElementNode)) {
    for node in nodes {
        if let DomNode::Element(el) = node {
            f(el);
            for_each_element(&mut el.children, f);
        }
    }
}

fn replace_nbsp(nodes: &mut [DomNode]) {
    for node in nodes {
        match node {
            DomNode::Text(text) if text.contains('\u{a0}') => {
                *text = text.replace('\u{a0}', " ");
            }
            DomNode::Element(el) => replace_nbsp(&mut el.children),
            _ => {}
        }
    }
}

/// Remove every `tag` element below `nodes`, splicing its children in place.
fn unwrap_named(nodes: Vec<DomNode>, tag: &str) -> Vec<DomNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            DomNode::Element(el) if el.is(tag) => out.extend(unwrap_named(el.children, tag)),
            DomNode::Element(mut el) => {
                el.children = unwrap_named(el.children, tag);
                out.push(DomNode::Element(el));
            }
            other => out.push(other),
        }
    }
    out
}

/// Replace the element's content with its flattened text inside a single wrapper.
fn wrap_flat_text(el: &mut ElementNode, wrapper: &str, style: Option<&str>) {
    let text = el.flat_text();
    let mut inner = ElementNode::new(wrapper);
    if let Some(style) = style {
        inner.set_attr("style", style);
    }
    el.children = vec![inner.with_text(&text).into_node()];
}

fn anchor_headings(nodes: &mut [DomNode]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut used = HashSet::new();
    for_each_element(nodes, &mut |el| {
        if !el.is("h2") {
            return;
        }
        let text = el.flat_text();
        let display_text = strip_enumeration(&text).to_string();
        let mut base = slugify_heading(&display_text);
        if base.is_empty() {
            base = format!("section-{}", toc.len() + 1);
        }
        let anchor_id = unique_anchor(base, &mut used);

        wrap_flat_text(el, "b", None);
        el.set_attr("id", &anchor_id);
        el.set_attr("style", HEADING_STYLE);
        toc.push(TocEntry {
            anchor_id,
            display_text,
        });
    });
    toc
}

/// First occurrence keeps `base`; later ones get `-2`, `-3`, ...
fn unique_anchor(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn localize_image(el: &mut ElementNode) {
    if !el.is("img") {
        return;
    }
    let filename = el.attr("src").and_then(media_filename);
    if let Some(filename) = filename {
        el.set_attr("src", &filename);
    }
}

fn rewrite_href(el: &mut ElementNode) {
    if !el.is("a") {
        return;
    }
    let path = el.attr("href").and_then(reference_path);
    if let Some(path) = path.filter(|p| !p.is_empty()) {
        el.set_attr("href", &path);
    }
}

/// Replace each anchor with its content, padded by spaces so adjacent words
/// do not run together.
fn unwrap_links(nodes: Vec<DomNode>) -> Vec<DomNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            DomNode::Element(el) if el.is("a") => {
                out.push(DomNode::Text(" ".to_string()));
                out.extend(unwrap_links(el.children));
                out.push(DomNode::Text(" ".to_string()));
            }
            DomNode::Element(mut el) => {
                el.children = unwrap_links(el.children);
                out.push(DomNode::Element(el));
            }
            other => out.push(other),
        }
    }
    out
}

fn build_toc(entries: &[TocEntry]) -> DomNode {
    let mut list = ElementNode::new("ol").with_attr("style", TOC_LIST_STYLE);
    for entry in entries {
        let link = ElementNode::new("a")
            .with_attr("href", &format!("#{}", entry.anchor_id))
            .with_text(&entry.display_text);
        list = list.with_child(ElementNode::new("li").with_child(link.into_node()).into_node());
    }
    ElementNode::new("div")
        .with_attr("style", TOC_STYLE)
        .with_child(ElementNode::new("strong").with_text(TOC_LABEL).into_node())
        .with_child(list.into_node())
        .into_node()
}

/// Drop a table of contents produced by an earlier run so it is rebuilt, not stacked.
fn remove_generated_toc(fragment: &mut Fragment) {
    let first = fragment.children.iter().position(|node| match node {
        DomNode::Text(text) => !text.trim().is_empty(),
        _ => true,
    });
    let Some(pos) = first else {
        return;
    };
    let generated = match &fragment.children[pos] {
        DomNode::Element(el) => {
            let labelled = matches!(
                el.children.first(),
                Some(DomNode::Element(label)) if label.is("strong") && label.flat_text() == TOC_LABEL
            );
            el.is("div") && el.attr("style") == Some(TOC_STYLE) && labelled
        }
        _ => false,
    };
    if generated {
        fragment.children.remove(pos);
    }
}
