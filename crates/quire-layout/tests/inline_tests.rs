//! Integration tests for line breaking, alignment and footnotes.
//!
//! Text is shaped with [`MonospaceShaper`]: at 'font-size: 10' every
//! character is 6px wide and lines are 12px tall.

use quire_layout::layout::EdgeSizes;
use quire_layout::{
    BoxDescription, LayoutBox, LayoutOptions, MonospaceShaper, Page, PageSetup, build_box_tree,
    layout_document,
};
use serde_json::{Value, json};

fn lay_out(body: Value, width: f32, height: f32) -> Vec<Page> {
    let description: BoxDescription = serde_json::from_value(body).unwrap();
    let root = build_box_tree(&description).unwrap();
    let options = LayoutOptions {
        page: PageSetup {
            width,
            height,
            margin: EdgeSizes::default(),
            ..PageSetup::default()
        },
        max_pages: Some(10),
    };
    layout_document(root, &MonospaceShaper, options)
        .unwrap()
        .collect()
}

fn paragraph(style: Value, children: Value) -> Value {
    let mut style = style;
    style["display"] = json!("block");
    style["font-size"] = json!(10);
    json!({ "tag": "p", "style": style, "children": children })
}

fn lines(page: &Page) -> Vec<&LayoutBox> {
    page.content
        .as_ref()
        .map(|root| root.descendants().filter(|b| b.is_line()).collect())
        .unwrap_or_default()
}

fn texts(line: &LayoutBox) -> String {
    line.descendants()
        .filter_map(LayoutBox::text_content)
        .collect()
}

#[test]
fn test_text_wraps_at_spaces() {
    let pages = lay_out(
        paragraph(json!({}), json!([{ "text": "aaaa bbbb cccc" }])),
        60.0,
        100.0,
    );
    let lines = lines(&pages[0]);
    assert_eq!(lines.len(), 2);
    assert_eq!(texts(lines[0]).trim_end(), "aaaa bbbb");
    assert_eq!(texts(lines[1]), "cccc");
    assert_eq!(lines[1].border_box().y, 12.0);
}

#[test]
fn test_inline_boxes_split_across_lines() {
    let pages = lay_out(
        paragraph(
            json!({}),
            json!([
                { "text": "aaaa " },
                {
                    "tag": "em",
                    "style": { "font-size": 10 },
                    "children": [{ "text": "bbbb cccc" }],
                },
            ]),
        ),
        60.0,
        100.0,
    );
    let lines = lines(&pages[0]);
    assert_eq!(lines.len(), 2);
    // Both lines hold a fragment of the <em>.
    for line in lines {
        assert!(
            line.descendants()
                .any(|b| b.element_tag.as_deref() == Some("em"))
        );
    }
}

#[test]
fn test_center_alignment() {
    let pages = lay_out(
        paragraph(json!({ "text-align": "center" }), json!([{ "text": "aa" }])),
        60.0,
        100.0,
    );
    let line = lines(&pages[0])[0];
    let text = line.descendants()
        .find(|b| b.text_content().is_some())
        .unwrap();
    assert_eq!(text.border_box().x, 24.0);
}

#[test]
fn test_preserved_newlines_force_breaks() {
    let pages = lay_out(
        paragraph(json!({ "white-space": "pre" }), json!([{ "text": "a\nb\nc" }])),
        200.0,
        100.0,
    );
    let lines = lines(&pages[0]);
    assert_eq!(lines.len(), 3);
    assert_eq!(texts(lines[2]), "c");
}

#[test]
fn test_float_shortens_the_lines_beside_it() {
    let body = json!({
        "tag": "body",
        "style": { "display": "block", "font-size": 10 },
        "children": [
            {
                "tag": "f",
                "style": { "display": "block", "float": "left", "width": 50, "height": 20 },
            },
            { "tag": "p", "style": { "display": "block" }, "children": [{ "text": "aa" }] },
        ],
    });
    let pages = lay_out(body, 200.0, 100.0);
    let line = lines(&pages[0])[0];
    let text = line.descendants()
        .find(|b| b.text_content().is_some())
        .unwrap();
    assert_eq!(text.border_box().x, 50.0);
}

#[test]
fn test_atomic_inline_takes_its_width_on_the_line() {
    let pages = lay_out(
        paragraph(
            json!({}),
            json!([
                {
                    "tag": "img",
                    "style": { "display": "inline" },
                    "image": { "width": 30, "height": 30 },
                },
                { "text": "aa" },
            ]),
        ),
        200.0,
        100.0,
    );
    let line = lines(&pages[0])[0];
    let text = line.descendants()
        .find(|b| b.text_content().is_some())
        .unwrap();
    assert_eq!(text.border_box().x, 30.0);
}

#[test]
fn test_lines_break_across_pages_keeping_orphans_and_widows() {
    let words = ["aaaa"; 10].join(" ");
    let pages = lay_out(
        paragraph(json!({}), json!([{ "text": words }])),
        30.0,
        50.0,
    );
    let counts: Vec<usize> = pages.iter().map(|page| lines(page).len()).collect();
    assert_eq!(counts.iter().sum::<usize>(), 10);
    assert!(counts.iter().all(|&count| count >= 2), "{counts:?}");
    assert_eq!(counts[0], 4);
}

#[test]
fn test_footnote_goes_to_the_bottom_of_the_page() {
    let pages = lay_out(
        paragraph(
            json!({}),
            json!([
                { "text": "text" },
                {
                    "tag": "note",
                    "style": { "display": "inline", "float": "footnote", "font-size": 10 },
                    "children": [{ "text": "note" }],
                },
            ]),
        ),
        200.0,
        100.0,
    );
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].footnotes.len(), 1);
    let note = pages[0].footnotes[0].border_box();
    assert_eq!(note.y + note.height, 100.0);
}

#[test]
fn test_three_lines_move_together_when_only_two_fit() {
    let body = json!({
        "tag": "body",
        "style": { "display": "block" },
        "children": [
            { "tag": "top", "style": { "display": "block", "height": 26 } },
            paragraph(json!({ "orphans": 2, "widows": 2 }), json!([{ "text": "aaaa aaaa aaaa" }])),
        ],
    });
    let pages = lay_out(body, 30.0, 50.0);
    assert_eq!(pages.len(), 2);
    assert!(lines(&pages[0]).is_empty());
    assert_eq!(lines(&pages[1]).len(), 3);
}
