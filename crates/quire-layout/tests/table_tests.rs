//! Integration tests for table layout and table pagination.

use quire_common::warning::was_warned;
use quire_layout::layout::EdgeSizes;
use quire_layout::{
    BoxDescription, LayoutBox, LayoutOptions, MonospaceShaper, Page, PageSetup, build_box_tree,
    layout_document,
};
use serde_json::{Value, json};

fn lay_out(table: Value, height: f32) -> Vec<Page> {
    let document = json!({ "tag": "body", "style": { "display": "block" }, "children": [table] });
    let description: BoxDescription = serde_json::from_value(document).unwrap();
    let root = build_box_tree(&description).unwrap();
    let options = LayoutOptions {
        page: PageSetup {
            width: 200.0,
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

fn cell(text: &str) -> Value {
    json!({
        "tag": "td",
        "style": { "display": "table-cell", "font-size": 10 },
        "children": [{ "text": text }],
    })
}

fn row(cells: Vec<Value>) -> Value {
    json!({ "tag": "tr", "style": { "display": "table-row" }, "children": cells })
}

fn cells(page: &Page) -> Vec<&LayoutBox> {
    page.content
        .as_ref()
        .map(|root| root.descendants().filter(|b| b.is_cell()).collect())
        .unwrap_or_default()
}

#[test]
fn test_auto_table_shrinks_to_its_content() {
    let table = json!({
        "tag": "table",
        "style": { "display": "table" },
        "children": [row(vec![cell("aa"), cell("bbbb")])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].border_box().x, 0.0);
    assert_eq!(cells[0].border_box().width, 12.0);
    assert_eq!(cells[1].border_box().x, 12.0);
    assert_eq!(cells[1].border_box().width, 24.0);
}

#[test]
fn test_fixed_table_splits_its_width_evenly() {
    let table = json!({
        "tag": "table",
        "style": { "display": "table", "table-layout": "fixed", "width": 100 },
        "children": [row(vec![cell("a"), cell("b")])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    assert_eq!(cells[0].border_box().width, 50.0);
    assert_eq!(cells[1].border_box().x, 50.0);
}

#[test]
fn test_colspan_covers_both_columns() {
    let wide = json!({
        "tag": "td",
        "style": { "display": "table-cell", "font-size": 10 },
        "colspan": 2,
        "children": [{ "text": "x" }],
    });
    let table = json!({
        "tag": "table",
        "style": { "display": "table", "table-layout": "fixed", "width": 100 },
        "children": [row(vec![cell("a"), cell("b")]), row(vec![wide])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[2].border_box().width, 100.0);
    assert_eq!(
        cells[2].border_box().y,
        cells[0].border_box().y + cells[0].border_box().height
    );
}

#[test]
fn test_border_spacing_separates_cells() {
    let table = json!({
        "tag": "table",
        "style": {
            "display": "table",
            "table-layout": "fixed",
            "width": 100,
            "border-spacing": [10, 0],
        },
        "children": [row(vec![cell("a"), cell("b")])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    // 100 - 3 * 10 spacing, split in two.
    assert_eq!(cells[0].border_box().x, 10.0);
    assert_eq!(cells[0].border_box().width, 35.0);
    assert_eq!(cells[1].border_box().x, 55.0);
}

#[test]
fn test_header_repeats_on_every_page() {
    let tall_row = |tag: &str| {
        json!({
            "tag": tag,
            "style": { "display": "table-row" },
            "children": [{ "tag": "td", "style": { "display": "table-cell", "height": 20 } }],
        })
    };
    let body_rows: Vec<Value> = (0..8).map(|i| tall_row(&format!("r{i}"))).collect();
    let table = json!({
        "tag": "table",
        "style": { "display": "table", "width": 100 },
        "children": [
            { "tag": "tbody", "style": { "display": "table-row-group" }, "children": body_rows },
            {
                "tag": "thead",
                "style": { "display": "table-header-group" },
                "children": [tall_row("h")],
            },
        ],
    });
    let pages = lay_out(table, 110.0);
    assert_eq!(pages.len(), 2);
    for page in &pages {
        let root = page.content.as_ref().unwrap();
        let table = root
            .descendants()
            .find(|b| b.label() == "Table<table>")
            .unwrap();
        assert_eq!(table.children[0].element_tag.as_deref(), Some("thead"));
    }
    let body_rows: usize = pages
        .iter()
        .filter_map(|page| page.content.as_ref())
        .map(|root| {
            root.descendants()
                .filter(|b| {
                    b.is_row() && b.element_tag.as_deref().is_some_and(|tag| tag.starts_with('r'))
                })
                .count()
        })
        .sum();
    assert_eq!(body_rows, 8);
}

#[test]
fn test_caption_sits_above_the_table() {
    let table = json!({
        "tag": "table",
        "style": { "display": "table" },
        "children": [
            row(vec![cell("aa")]),
            {
                "tag": "caption",
                "style": { "display": "table-caption", "font-size": 10 },
                "children": [{ "text": "title" }],
            },
        ],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    // One 12px line of caption above the row.
    assert_eq!(cells[0].border_box().y, 12.0);
}

#[test]
fn test_fixed_table_spreads_extra_width_over_set_columns() {
    let sized = |text: &str| {
        json!({
            "tag": "td",
            "style": { "display": "table-cell", "font-size": 10, "width": 20 },
            "children": [{ "text": text }],
        })
    };
    let table = json!({
        "tag": "table",
        "style": {
            "display": "table",
            "table-layout": "fixed",
            "width": 100,
            "border-spacing": [4, 0],
        },
        "children": [row(vec![sized("a"), sized("b")])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    let widths: Vec<f32> = cells.iter().map(|cell| cell.border_box().width).collect();
    assert_eq!(widths, vec![44.0, 44.0]);
    // Columns plus three gaps fill the declared width.
    assert_eq!(widths.iter().sum::<f32>() + 3.0 * 4.0, 100.0);
    assert_eq!(cells[1].border_box().x, 52.0);
}

#[test]
fn test_cells_past_the_last_column_are_dropped() {
    let table = json!({
        "tag": "table",
        "style": { "display": "table", "table-layout": "fixed", "width": 100 },
        "children": [row(vec![cell("a"), cell("b")]), row(vec![cell("c"), cell("d"), cell("e")])],
    });
    let pages = lay_out(table, 100.0);
    let cells = cells(&pages[0]);
    assert_eq!(cells.len(), 4);
    assert!(
        cells
            .iter()
            .all(|cell| cell.descendants().all(|b| b.text_content() != Some("e")))
    );
    assert!(was_warned(
        "table",
        "row has more cells than the table has columns, 1 cell(s) ignored"
    ));
}
