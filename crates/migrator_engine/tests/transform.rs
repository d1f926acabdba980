use migrator_engine::{extract_plain_text, HtmlTransformer, LinkMode, TocEntry, TransformOptions};
use pretty_assertions::assert_eq;

const TOC_OPEN: &str = r#"<div style="background-color: #f9f9f9; padding: 16px; border-radius: 8px; margin-bottom: 20px;"><strong>Table of Contents</strong><ol style="padding-left: 20px; margin-top: 8px; line-height: 1.8;">"#;
const H2_STYLE: &str = "font-size: 24px; color:#000000;";

fn transformer(link_mode: LinkMode) -> HtmlTransformer {
    HtmlTransformer::new(TransformOptions { link_mode })
}

#[test]
fn numbered_heading_gets_anchor_and_toc() {
    let html = "<h2>1. Getting Started</h2><p>Hello <strong>world</strong></p>";
    let output = HtmlTransformer::default().transform_with_toc(html);

    assert_eq!(
        output.toc,
        vec![TocEntry {
            anchor_id: "getting-started".to_string(),
            display_text: "Getting Started".to_string(),
        }]
    );
    let expected = format!(
        "{TOC_OPEN}<li><a href=\"#getting-started\">Getting Started</a></li></ol></div>\
         <h2 id=\"getting-started\" style=\"{H2_STYLE}\"><b>1. Getting Started</b></h2>\
         <p><span style=\"font-size:14px;\">Hello world</span></p>"
    );
    assert_eq!(output.html, expected);
}

#[test]
fn two_headings_share_one_toc() {
    let html = "<h2>Intro</h2><p>a</p><h2>2) Details</h2><p>b</p>";
    let output = HtmlTransformer::default().transform_with_toc(html);

    let ids: Vec<_> = output.toc.iter().map(|e| e.anchor_id.as_str()).collect();
    assert_eq!(ids, vec!["intro", "details"]);
    assert_eq!(output.html.matches("Table of Contents").count(), 1);
    assert!(output.html.starts_with(TOC_OPEN));
    assert!(output
        .html
        .contains(r##"<li><a href="#intro">Intro</a></li><li><a href="#details">Details</a></li>"##));
}

#[test]
fn duplicate_headings_get_distinct_anchors() {
    let html = "<h2>Tips</h2><h2>Tips</h2><h2>Tips</h2>";
    let output = HtmlTransformer::default().transform_with_toc(html);

    let ids: Vec<_> = output.toc.iter().map(|e| e.anchor_id.as_str()).collect();
    assert_eq!(ids, vec!["tips", "tips-2", "tips-3"]);
    assert!(output.html.contains(r#"<h2 id="tips-3""#));
}

#[test]
fn heading_without_slug_characters_uses_section_id() {
    let output = HtmlTransformer::default().transform_with_toc("<h2>\u{2605}\u{2605}</h2>");
    assert_eq!(output.toc[0].anchor_id, "section-1");
}

#[test]
fn transform_is_idempotent() {
    let html = concat!(
        "<!-- wp:heading --><h2 title=\"t\">1. Getting <strong>Started</strong></h2><!-- /wp:heading -->",
        "<p>Intro&nbsp;text with <a href=\"https://site.example/docs/page?x=1\">a link</a></p>",
        "<h3>Sub <strong>part</strong></h3>",
        "<img alt=\"pic\" src=\"https://cdn.example.com/u/2024/photo.jpg?w=300\">",
        "<h2>Getting Started</h2>",
    );
    for mode in [LinkMode::RewriteHref, LinkMode::Unwrap] {
        let t = transformer(mode);
        let once = t.transform(html);
        let twice = t.transform(&once);
        assert_eq!(twice, once, "mode {mode:?}");
        assert_eq!(once.matches("Table of Contents").count(), 1);
    }
}

#[test]
fn cms_comments_and_nbsp_are_removed() {
    let html = "<!-- wp:paragraph --><p>one\u{a0}two</p><!-- /wp:paragraph -->";
    let output = HtmlTransformer::default().transform(html);
    assert_eq!(output, r#"<p><span style="font-size:14px;">one two</span></p>"#);
}

#[test]
fn subheadings_are_restyled() {
    let output = HtmlTransformer::default().transform("<h3><strong>Step</strong> one</h3>");
    assert_eq!(output, r#"<h3><span style="font-size:18px;">Step one</span></h3>"#);
}

#[test]
fn image_sources_become_local_filenames() {
    let html = concat!(
        r#"<div><img src="https://cdn.example.com/a/b/photo.jpg?w=300"></div>"#,
        r#"<div><img src="https://cdn.example.com/dir/"></div>"#,
    );
    let output = HtmlTransformer::default().transform(html);
    assert_eq!(
        output,
        concat!(
            r#"<div><img src="photo.jpg"></div>"#,
            r#"<div><img src="https://cdn.example.com/dir/"></div>"#,
        )
    );
}

#[test]
fn rewrite_mode_keeps_link_with_relative_path() {
    let html = r##"<div><a href="https://site.example/blog/post?id=7#c">Read</a> <a href="#top">Top</a></div>"##;
    let output = transformer(LinkMode::RewriteHref).transform(html);
    assert_eq!(
        output,
        r##"<div><a href="/blog/post">Read</a> <a href="#top">Top</a></div>"##
    );
}

#[test]
fn rewrite_mode_drops_host_of_protocol_relative_link() {
    let html = r#"<div><a href="//site.example/blog/post?x=1">x</a></div>"#;
    let output = transformer(LinkMode::RewriteHref).transform(html);
    assert_eq!(output, r#"<div><a href="/blog/post">x</a></div>"#);
}

#[test]
fn unwrap_mode_drops_anchor_keeping_text() {
    let html = r#"<div>see<a href="https://site.example/x">this</a>now</div>"#;
    let output = transformer(LinkMode::Unwrap).transform(html);
    assert_eq!(output, "<div>see this now</div>");
}

#[test]
fn empty_body_passes_through() {
    let t = HtmlTransformer::default();
    assert_eq!(t.transform(""), "");
    assert_eq!(t.transform("  \n"), "  \n");
    assert!(t.transform_with_toc("<p>x</p>").toc.is_empty());
}

#[test]
fn plain_text_joins_paragraphs() {
    let html = "<p>First <em>para</em></p><p>Second\u{a0}one</p>";
    assert_eq!(extract_plain_text(html), "First para\n\nSecond one");
    assert_eq!(extract_plain_text("just <b>text</b>"), "just text");
    assert_eq!(extract_plain_text(""), "");
}
