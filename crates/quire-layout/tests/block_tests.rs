//! Integration tests for block layout: widths, margins, floats and
//! positioned boxes.

use quire_layout::layout::{EdgeSizes, Rect};
use quire_layout::{
    BoxDescription, LayoutBox, LayoutOptions, MonospaceShaper, Page, PageSetup, build_box_tree,
    layout_document,
};
use serde_json::{Value, json};

fn lay_out(children: Value) -> Vec<Page> {
    let document = json!({
        "tag": "body",
        "style": { "display": "block", "font-size": 10 },
        "children": children,
    });
    let description: BoxDescription = serde_json::from_value(document).unwrap();
    let root = build_box_tree(&description).unwrap();
    let options = LayoutOptions {
        page: PageSetup {
            width: 200.0,
            height: 100.0,
            margin: EdgeSizes::default(),
            ..PageSetup::default()
        },
        max_pages: Some(10),
    };
    layout_document(root, &MonospaceShaper, options)
        .unwrap()
        .collect()
}

/// Border box of the first box with `tag` on the first page.
fn border_box(pages: &[Page], tag: &str) -> Rect {
    find(pages, tag).border_box()
}

fn find<'p>(pages: &'p [Page], tag: &str) -> &'p LayoutBox {
    pages[0]
        .content
        .as_ref()
        .and_then(|root| {
            root.descendants()
                .find(|b| b.element_tag.as_deref() == Some(tag))
        })
        .unwrap_or_else(|| panic!("no box <{tag}>"))
}

#[test]
fn test_sibling_margins_collapse_to_the_largest() {
    let pages = lay_out(json!([
        { "tag": "a", "style": { "display": "block", "height": 10, "margin-bottom": 20 } },
        { "tag": "b", "style": { "display": "block", "height": 10, "margin-top": 30 } },
    ]));
    assert_eq!(border_box(&pages, "b").y, 40.0);
}

#[test]
fn test_negative_margin_is_deducted() {
    let pages = lay_out(json!([
        { "tag": "a", "style": { "display": "block", "height": 10, "margin-bottom": 20 } },
        { "tag": "b", "style": { "display": "block", "height": 10, "margin-top": -5 } },
    ]));
    assert_eq!(border_box(&pages, "b").y, 25.0);
}

#[test]
fn test_first_child_margin_collapses_through_parent() {
    let pages = lay_out(json!([
        { "tag": "a", "style": { "display": "block", "height": 10 } },
        {
            "tag": "section",
            "style": { "display": "block", "margin-top": 10 },
            "children": [{
                "tag": "b",
                "style": { "display": "block", "height": 10, "margin-top": 25 },
            }],
        },
    ]));
    // max(10, 25) below the first block.
    assert_eq!(border_box(&pages, "b").y, 35.0);
}

#[test]
fn test_padding_separates_parent_and_child_margins() {
    let pages = lay_out(json!([{
        "tag": "section",
        "style": { "display": "block", "padding-top": 5 },
        "children": [{
            "tag": "b",
            "style": { "display": "block", "height": 10, "margin-top": 15 },
        }],
    }]));
    assert_eq!(border_box(&pages, "b").y, 20.0);
}

#[test]
fn test_auto_margins_center_a_fixed_width() {
    let pages = lay_out(json!([{
        "tag": "a",
        "style": {
            "display": "block",
            "width": 100,
            "height": 10,
            "margin-left": "auto",
            "margin-right": "auto",
        },
    }]));
    let a = border_box(&pages, "a");
    assert_eq!((a.x, a.width), (50.0, 100.0));
}

#[test]
fn test_auto_margins_are_zero_when_the_box_is_too_wide() {
    let pages = lay_out(json!([{
        "tag": "a",
        "style": {
            "display": "block",
            "width": 300,
            "height": 10,
            "margin-left": "auto",
            "margin-right": "auto",
        },
    }]));
    let a = border_box(&pages, "a");
    assert_eq!((a.x, a.width), (0.0, 300.0));
}

#[test]
fn test_percentage_width_and_max_width() {
    let pages = lay_out(json!([
        { "tag": "half", "style": { "display": "block", "width": "50%", "height": 10 } },
        {
            "tag": "capped",
            "style": { "display": "block", "width": 300, "max-width": 150, "height": 10 },
        },
    ]));
    assert_eq!(border_box(&pages, "half").width, 100.0);
    assert_eq!(border_box(&pages, "capped").width, 150.0);
}

#[test]
fn test_border_box_sizing_includes_padding() {
    let pages = lay_out(json!([{
        "tag": "a",
        "style": {
            "display": "block",
            "box-sizing": "border-box",
            "width": 100,
            "padding-left": 10,
            "height": 10,
        },
    }]));
    let a = find(&pages, "a");
    assert_eq!(a.border_box().width, 100.0);
    assert_eq!(a.content_width(), 90.0);
}

#[test]
fn test_clear_moves_below_the_float() {
    let pages = lay_out(json!([
        { "tag": "f", "style": { "display": "block", "float": "left", "width": 50, "height": 30 } },
        { "tag": "c", "style": { "display": "block", "clear": "left", "height": 10 } },
    ]));
    assert_eq!(border_box(&pages, "f").x, 0.0);
    assert_eq!(border_box(&pages, "c").y, 30.0);
}

#[test]
fn test_right_float_sits_at_the_right_edge() {
    let pages = lay_out(json!([
        {
            "tag": "f",
            "style": { "display": "block", "float": "right", "width": 50, "height": 30 },
        },
    ]));
    assert_eq!(border_box(&pages, "f").x, 150.0);
}

#[test]
fn test_absolute_box_uses_its_offsets() {
    let pages = lay_out(json!([
        { "tag": "a", "style": { "display": "block", "height": 10 } },
        {
            "tag": "abs",
            "style": {
                "display": "block",
                "position": "absolute",
                "top": 10,
                "left": 20,
                "width": 30,
                "height": 30,
            },
        },
    ]));
    let abs = border_box(&pages, "abs");
    assert_eq!(
        (abs.x, abs.y, abs.width, abs.height),
        (20.0, 10.0, 30.0, 30.0)
    );
    // Out of flow: the next sibling would not move.
    assert_eq!(border_box(&pages, "a").y, 0.0);
}

#[test]
fn test_absolute_box_inside_relative_parent() {
    let pages = lay_out(json!([
        { "tag": "a", "style": { "display": "block", "height": 40 } },
        {
            "tag": "rel",
            "style": { "display": "block", "position": "relative", "height": 20 },
            "children": [{
                "tag": "abs",
                "style": {
                    "display": "block",
                    "position": "absolute",
                    "top": 5,
                    "left": 5,
                    "width": 10,
                    "height": 10,
                },
            }],
        },
    ]));
    let abs = border_box(&pages, "abs");
    assert_eq!((abs.x, abs.y), (5.0, 45.0));
}

#[test]
fn test_relative_offset_moves_the_box_only() {
    let pages = lay_out(json!([
        {
            "tag": "rel",
            "style": {
                "display": "block",
                "position": "relative",
                "top": 5,
                "left": 7,
                "height": 10,
            },
        },
        { "tag": "next", "style": { "display": "block", "height": 10 } },
    ]));
    let rel = border_box(&pages, "rel");
    assert_eq!((rel.x, rel.y), (7.0, 5.0));
    assert_eq!(border_box(&pages, "next").y, 10.0);
}

#[test]
fn test_fixed_boxes_are_listed_on_the_page() {
    let pages = lay_out(json!([
        {
            "tag": "fixed",
            "style": {
                "display": "block",
                "position": "fixed",
                "bottom": 0,
                "right": 0,
                "width": 20,
                "height": 20,
            },
        },
    ]));
    let fixed = find(&pages, "fixed");
    assert!(pages[0].fixed.contains(&fixed.id));
    let border = fixed.border_box();
    assert_eq!((border.x, border.y), (180.0, 80.0));
}

#[test]
fn test_flex_row_distributes_free_space() {
    let pages = lay_out(json!([{
        "tag": "row",
        "style": { "display": "flex" },
        "children": [
            {
                "tag": "one",
                "style": { "display": "block", "flex-basis": 0, "flex-grow": 1, "height": 10 },
            },
            {
                "tag": "three",
                "style": { "display": "block", "flex-basis": 0, "flex-grow": 3, "height": 20 },
            },
        ],
    }]));
    let one = border_box(&pages, "one");
    let three = border_box(&pages, "three");
    assert_eq!((one.width, three.width), (50.0, 150.0));
    assert_eq!(three.x, 50.0);
    assert_eq!(border_box(&pages, "row").height, 20.0);
}

#[test]
fn test_columns_balance_their_content() {
    let blocks: Vec<Value> = (0..4)
        .map(|i| json!({ "tag": format!("b{i}"), "style": { "display": "block", "height": 10 } }))
        .collect();
    let pages = lay_out(json!([{
        "tag": "multicol",
        "style": { "display": "block", "column-count": 2, "column-gap": 0 },
        "children": blocks,
    }]));
    let multicol = find(&pages, "multicol");
    assert_eq!(multicol.border_box().height, 20.0);
    assert_eq!(multicol.children.len(), 2);
    let third = border_box(&pages, "b2");
    assert_eq!((third.x, third.y), (100.0, 0.0));
}
