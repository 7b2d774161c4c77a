//! Integration tests for page breaking, page sides and named pages.

use quire_layout::layout::EdgeSizes;
use quire_layout::{
    BoxDescription, Error, LayoutOptions, MonospaceShaper, Page, PageSetup, PageSummary,
    build_box_tree, layout_document,
};
use serde_json::{Value, json};

fn setup(width: f32, height: f32) -> PageSetup {
    PageSetup {
        width,
        height,
        margin: EdgeSizes::default(),
        ..PageSetup::default()
    }
}

fn lay_out(document: Value, page: PageSetup) -> Vec<Page> {
    let description: BoxDescription = serde_json::from_value(document).unwrap();
    let root = build_box_tree(&description).unwrap();
    let options = LayoutOptions {
        page,
        max_pages: Some(20),
    };
    layout_document(root, &MonospaceShaper, options)
        .unwrap()
        .collect()
}

fn block(tag: &str, height: f32) -> Value {
    json!({ "tag": tag, "style": { "display": "block", "height": height } })
}

/// Tags of the root's direct children on `page`.
fn tags(page: &Page) -> Vec<String> {
    page.content
        .as_ref()
        .map(|root| {
            root.children
                .iter()
                .filter_map(|child| child.element_tag.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_blocks_flow_onto_the_next_page() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            block("a", 30.0),
            block("b", 30.0),
            block("c", 30.0),
            block("d", 30.0),
            block("e", 30.0),
        ],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(pages.len(), 2);
    assert_eq!(tags(&pages[0]), vec!["a", "b", "c"]);
    assert_eq!(tags(&pages[1]), vec!["d", "e"]);

    let second = pages[1].content.as_ref().unwrap();
    assert_eq!(second.children[0].border_box().y, 0.0);
}

#[test]
fn test_page_area_offsets_content() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [block("a", 10.0)],
    });
    let page = PageSetup {
        margin: EdgeSizes {
            top: 20.0,
            right: 10.0,
            bottom: 20.0,
            left: 30.0,
        },
        ..setup(200.0, 100.0)
    };
    let pages = lay_out(document, page);
    let root = pages[0].content.as_ref().unwrap();
    let child = root.children[0].border_box();
    assert_eq!((child.x, child.y), (30.0, 20.0));
    assert_eq!(child.width, 160.0);
}

#[test]
fn test_forced_break_starts_a_new_page() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            block("a", 10.0),
            { "tag": "b", "style": { "display": "block", "height": 10, "break-before": "page" } },
            block("c", 10.0),
        ],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(pages.len(), 2);
    assert_eq!(tags(&pages[0]), vec!["a"]);
    assert_eq!(tags(&pages[1]), vec!["b", "c"]);
}

#[test]
fn test_right_break_inserts_a_blank_left_page() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            block("a", 10.0),
            { "tag": "b", "style": { "display": "block", "height": 10, "break-before": "right" } },
        ],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(pages.len(), 3);
    assert!(pages[1].blank);
    assert!(pages[1].content.is_none());
    assert_eq!(tags(&pages[2]), vec!["b"]);
    assert_eq!(pages[2].number, 3);
}

#[test]
fn test_left_break_on_a_left_page_needs_no_blank() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            block("a", 10.0),
            { "tag": "b", "style": { "display": "block", "height": 10, "break-before": "left" } },
        ],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|page| !page.blank));
}

#[test]
fn test_named_page_change_forces_a_break() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            block("a", 10.0),
            { "tag": "b", "style": { "display": "block", "height": 10, "page": "wide" } },
        ],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].name, None);
    assert_eq!(pages[1].name.as_deref(), Some("wide"));
}

#[test]
fn test_max_pages_stops_layout() {
    let children: Vec<Value> = (0..10).map(|i| block(&format!("p{i}"), 60.0)).collect();
    let document = json!({ "tag": "body", "style": { "display": "block" }, "children": children });
    let description: BoxDescription = serde_json::from_value(document).unwrap();
    let options = LayoutOptions {
        page: setup(200.0, 100.0),
        max_pages: Some(3),
    };
    let root = build_box_tree(&description).unwrap();
    let pages: Vec<Page> = layout_document(root, &MonospaceShaper, options)
        .unwrap()
        .collect();
    assert_eq!(pages.len(), 3);
}

#[test]
fn test_tall_block_still_makes_progress() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [block("tall", 250.0), block("after", 10.0)],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    assert_eq!(tags(&pages[0]), vec!["tall"]);
    assert_eq!(tags(pages.last().unwrap()), vec!["after"]);
}

#[test]
fn test_empty_page_area_is_rejected() {
    let description =
        BoxDescription::element("body", quire_layout::ComputedStyle::default(), Vec::new());
    let root = build_box_tree(&description).unwrap();
    let options = LayoutOptions {
        page: PageSetup {
            margin: EdgeSizes {
                top: 60.0,
                right: 0.0,
                bottom: 60.0,
                left: 0.0,
            },
            ..setup(200.0, 100.0)
        },
        max_pages: None,
    };
    let result = layout_document(root, &MonospaceShaper, options);
    assert!(matches!(result, Err(Error::InvalidPageSetup(_))));
}

#[test]
fn test_page_summary_serializes() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [block("a", 10.0)],
    });
    let pages = lay_out(document, setup(200.0, 100.0));
    let summary = serde_json::to_value(pages[0].summary()).unwrap();
    assert_eq!(summary["number"], 1);
    assert_eq!(summary["side"], "right");
    assert_eq!(summary["content"]["children"][0]["label"], "Block<a>");
}

#[test]
fn test_nested_blocks_resume_without_gaps_or_repeats() {
    let section = |items: std::ops::Range<usize>| {
        let children: Vec<Value> = items.map(|i| block(&format!("item{i}"), 30.0)).collect();
        json!({ "tag": "section", "style": { "display": "block" }, "children": children })
    };
    let document = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [section(0..4), section(4..8)],
    });
    let pages = lay_out(document, setup(100.0, 100.0));
    assert_eq!(pages.len(), 3);
    let mut seen = Vec::new();
    for page in &pages {
        let Some(root) = &page.content else { continue };
        let mut items: Vec<(f32, String)> = root
            .descendants()
            .filter_map(|b| {
                let tag = b.element_tag.as_deref()?;
                tag.starts_with("item")
                    .then(|| (b.border_box().y, tag.to_owned()))
            })
            .collect();
        items.sort_by(|a, b| a.0.total_cmp(&b.0));
        seen.extend(items.into_iter().map(|(_, tag)| tag));
    }
    let expected: Vec<String> = (0..8).map(|i| format!("item{i}")).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_laying_out_twice_gives_the_same_pages() {
    let document = json!({
        "tag": "body",
        "style": { "display": "block", "font-size": 10 },
        "children": [
            block("a", 40.0),
            {
                "tag": "f",
                "style": { "display": "block", "float": "left", "width": 30, "height": 30 },
            },
            {
                "tag": "p",
                "style": { "display": "block", "font-size": 10 },
                "children": [{ "text": "some words to wrap around the float" }],
            },
            block("b", 80.0),
        ],
    });
    let summaries = || -> Vec<PageSummary> {
        lay_out(document.clone(), setup(120.0, 100.0))
            .iter()
            .map(Page::summary)
            .collect()
    };
    let first = summaries();
    assert!(first.len() > 1);
    assert_eq!(first, summaries());
}
