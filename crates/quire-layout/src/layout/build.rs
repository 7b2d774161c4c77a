//! Box tree construction.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! Documents come in as a tree of [`BoxDescription`]s: one node per element
//! with its computed style, or a bare text run. [`build_box_tree`] turns
//! that tree into the [`LayoutBox`] tree layout works on, generating the
//! anonymous boxes CSS requires along the way:
//!
//! - inline content of a block container goes into a single line box, and
//!   inline runs mixed with block-level siblings are wrapped in anonymous
//!   block boxes ([§ 9.2.1.1](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level));
//! - tables get a wrapper box holding the captions, and missing rows, row
//!   groups and cells are generated ([§ 17.2.1](https://www.w3.org/TR/CSS2/tables.html#anonymous-boxes));
//! - inline content of a flex container is wrapped in anonymous flex items.

use std::rc::Rc;

use log::debug;
use quire_common::warning::warn_once;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::style::{
    AutoLength, BreakValue, CaptionSide, Clear, ComputedStyle, Display, Float, OuterDisplay,
    Overflow, Position, VerticalAlign, WhiteSpace,
};

use super::boxes::{BoxKind, LayoutBox, TableRole};
use super::replaced::FixedSize;
use super::table::TableData;

/// One node of an input document.
///
/// An element node carries a `style` and `children`; a text node carries
/// only `text` and inherits from its parent element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BoxDescription {
    /// Tag of the element, kept for debugging output.
    pub tag: Option<String>,
    /// Computed style of the element.
    pub style: ComputedStyle,
    /// Text of a text node.
    pub text: Option<String>,
    /// Intrinsic size of replaced content (an image).
    pub image: Option<ImageSize>,
    /// Columns spanned by a table cell.
    pub colspan: Option<usize>,
    /// Rows spanned by a table cell, 0 meaning "to the end of the group".
    pub rowspan: Option<usize>,
    /// Columns covered by a table column or an empty column group.
    pub span: Option<usize>,
    /// Whether an inline element is a leader filling its line.
    pub leader: bool,
    /// Child nodes.
    pub children: Vec<BoxDescription>,
}

impl BoxDescription {
    /// An element node.
    #[must_use]
    pub fn element(tag: &str, style: ComputedStyle, children: Vec<Self>) -> Self {
        Self {
            tag: Some(tag.to_string()),
            style,
            children,
            ..Self::default()
        }
    }

    /// A text node.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// Intrinsic dimensions of an image, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSize {
    /// Intrinsic width.
    pub width: Option<f32>,
    /// Intrinsic height.
    pub height: Option<f32>,
}

/// Build the box tree of the document rooted at `root`.
///
/// # Errors
///
/// [`Error::InvalidDescription`] when a node is malformed (a text node
/// with children, an image with children, a zero colspan) or when the
/// root generates no box.
pub fn build_box_tree(root: &BoxDescription) -> Result<LayoutBox, Error> {
    if root.text.is_some() {
        return Err(invalid("", "the root must be an element"));
    }
    if root.style.display == Display::None {
        return Err(invalid("", "the root generates no box"));
    }
    let mut root = root.clone();
    // [§ 2.7](https://www.w3.org/TR/css-display-3/#transformations)
    // "The root element's display type is always blockified."
    root.style.display = blockified(root.style.display);
    let Some(tree) = element_box(&root, None, "")? else {
        return Err(invalid("", "the root generates no box"));
    };
    debug!(
        "[build] box tree {} with {} children",
        tree.label(),
        tree.children.len()
    );
    Ok(tree)
}

fn invalid(path: &str, reason: &str) -> Error {
    Error::InvalidDescription {
        path: if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        },
        reason: reason.to_string(),
    }
}

/// [§ 2.7 Automatic Box Type Transformations](https://www.w3.org/TR/css-display-3/#transformations)
const fn blockified(display: Display) -> Display {
    match display {
        Display::Inline | Display::InlineBlock => Display::Block,
        Display::InlineTable => Display::Table,
        Display::InlineFlex => Display::Flex,
        Display::InlineGrid => Display::Grid,
        other => other,
    }
}

/// Style of an element after the transformations layout relies on.
fn used_style(description: &BoxDescription, inherited_page: Option<&str>) -> ComputedStyle {
    let mut style = description.style.clone();
    // [§ 9.7](https://www.w3.org/TR/CSS2/visuren.html#dis-pos-flo)
    // Floated, absolutely positioned and footnote boxes are blockified.
    if style.is_out_of_flow() {
        style.display = blockified(style.display);
    }
    if matches!(style.display, Display::Grid | Display::InlineGrid) {
        warn_once(
            "display",
            "grid layout is not supported, grid containers are laid out as flow roots",
        );
        style.display = if style.display == Display::Grid {
            Display::FlowRoot
        } else {
            Display::InlineBlock
        };
    }
    // [§ 3.1](https://www.w3.org/TR/css-page-3/#using-named-pages)
    // 'page: auto' uses the page of the parent.
    if style.page.is_none() {
        style.page = inherited_page.map(str::to_string);
    }
    style
}

/// Build the box of an element, `None` for 'display: none'.
fn element_box(
    description: &BoxDescription,
    inherited_page: Option<&str>,
    path: &str,
) -> Result<Option<LayoutBox>, Error> {
    if description.style.display == Display::None {
        return Ok(None);
    }
    if description.image.is_some() && !description.children.is_empty() {
        return Err(invalid(path, "an image cannot have children"));
    }
    if description.colspan == Some(0) {
        return Err(invalid(path, "colspan must be at least 1"));
    }
    let style = Rc::new(used_style(description, inherited_page));

    if let Some(image) = description.image {
        let sizing = FixedSize {
            width: image.width,
            height: image.height,
        };
        let mut replaced = LayoutBox::new(BoxKind::Replaced(Rc::new(sizing)), style, Vec::new());
        replaced.element_tag.clone_from(&description.tag);
        return Ok(Some(replaced));
    }

    let children = build_children(description, &style, path)?;
    let kind = match style.display {
        Display::Inline => BoxKind::Inline,
        Display::Flex | Display::InlineFlex => BoxKind::Flex,
        Display::Table | Display::InlineTable => {
            let wrapper = wrap_table(&style, description.tag.as_deref(), children);
            return Ok(Some(wrapper));
        }
        Display::TableRowGroup => BoxKind::Table(TableRole::RowGroup {
            header: false,
            footer: false,
        }),
        Display::TableHeaderGroup => BoxKind::Table(TableRole::RowGroup {
            header: true,
            footer: false,
        }),
        Display::TableFooterGroup => BoxKind::Table(TableRole::RowGroup {
            header: false,
            footer: true,
        }),
        Display::TableRow => BoxKind::Table(TableRole::Row),
        Display::TableCell => BoxKind::Table(TableRole::Cell {
            colspan: description.colspan.unwrap_or(1),
            rowspan: description.rowspan.unwrap_or(1),
            grid_x: 0,
        }),
        Display::TableColumnGroup => BoxKind::Table(TableRole::ColumnGroup),
        Display::TableColumn => BoxKind::Table(TableRole::Column { grid_x: 0 }),
        Display::TableCaption => BoxKind::Table(TableRole::Caption),
        _ => BoxKind::BlockContainer,
    };

    let mut new_box = LayoutBox::new(kind, style, Vec::new());
    new_box.element_tag.clone_from(&description.tag);
    new_box.is_leader = description.leader && matches!(new_box.kind, BoxKind::Inline);
    let children = match &new_box.kind {
        BoxKind::Inline => inline_children(&new_box, children),
        BoxKind::Flex => flex_items(&new_box, children),
        BoxKind::Table(TableRole::RowGroup { .. }) => group_rows(&new_box, children),
        BoxKind::Table(TableRole::Row) => group_cells(&new_box, children),
        BoxKind::Table(TableRole::ColumnGroup) => {
            let columns: Vec<LayoutBox> =
                children.into_iter().filter(LayoutBox::is_column).collect();
            if columns.is_empty() {
                anonymous_columns(&new_box, description.span.unwrap_or(1))
            } else {
                columns
            }
        }
        BoxKind::Table(TableRole::Column { .. }) => Vec::new(),
        _ => block_container_children(&new_box, children),
    };
    new_box.children = children;
    new_box.reindex_children();
    Ok(Some(new_box))
}

/// Boxes of the children of `description`, before any fix-up.
fn build_children(
    description: &BoxDescription,
    style: &Rc<ComputedStyle>,
    path: &str,
) -> Result<Vec<LayoutBox>, Error> {
    let mut children = Vec::with_capacity(description.children.len());
    // Text runs take the inherited properties of their element only.
    let text_style = Rc::new(ComputedStyle::anonymous_from(style, Display::Inline));
    for (index, child) in description.children.iter().enumerate() {
        let child_path = format!("{path}/children/{index}");
        if let Some(text) = &child.text {
            if !child.children.is_empty() {
                return Err(invalid(&child_path, "a text node cannot have children"));
            }
            if child.image.is_some() {
                return Err(invalid(&child_path, "a text node cannot be an image"));
            }
            if !text.is_empty() {
                children.push(LayoutBox::text(text, Rc::clone(&text_style)));
            }
            continue;
        }
        let Some(child_box) = element_box(child, style.page.as_deref(), &child_path)? else {
            continue;
        };
        // 'span' repeats a column.
        let copies = if child_box.is_column() {
            child.span.unwrap_or(1).max(1)
        } else {
            1
        };
        for _ in 1..copies {
            let mut copy = LayoutBox::new(
                child_box.kind.clone(),
                Rc::clone(&child_box.style),
                Vec::new(),
            );
            copy.element_tag.clone_from(&child_box.element_tag);
            children.push(copy);
        }
        children.push(child_box);
    }
    Ok(children)
}

/// Whether the box takes no part in the inline/block classification.
fn is_out_of_flow(layout_box: &LayoutBox) -> bool {
    layout_box.style.is_out_of_flow()
}

/// [§ 9.2.1.1](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
///
/// "White space content that would subsequently be collapsed away
/// according to the 'white-space' property does not generate any
/// anonymous inline boxes."
fn is_collapsible_whitespace(layout_box: &LayoutBox) -> bool {
    let Some(text) = layout_box.text_content() else {
        return false;
    };
    let white_space = layout_box.style.white_space;
    let collapses_newlines = matches!(white_space, WhiteSpace::Normal | WhiteSpace::Nowrap);
    let collapses_spaces = collapses_newlines || white_space == WhiteSpace::PreLine;
    collapses_spaces
        && text
            .chars()
            .all(|c| c == ' ' || c == '\t' || (collapses_newlines && (c == '\n' || c == '\r')))
}

/// Whether an inline run holds nothing but collapsible white space and
/// out-of-flow boxes.
fn is_blank_run(run: &[LayoutBox]) -> bool {
    run.iter()
        .all(|child| is_collapsible_whitespace(child) || is_out_of_flow(child))
}

/// Whether `child` is a table part that needs a table around it.
const fn is_table_internal(child: &LayoutBox) -> bool {
    matches!(
        child.kind,
        BoxKind::Table(
            TableRole::RowGroup { .. }
                | TableRole::Row
                | TableRole::Cell { .. }
                | TableRole::ColumnGroup
                | TableRole::Column { .. }
                | TableRole::Caption
        )
    )
}

/// Children of an inline box: block-level boxes inside inline boxes are
/// not split around, they become inline-level.
fn inline_children(parent: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    wrap_table_parts(parent, children)
        .into_iter()
        .map(|mut child| {
            if child.is_block_level() && !is_out_of_flow(&child) {
                warn_once(
                    "block-in-inline",
                    "block-level boxes inside inline boxes are laid out as inline-blocks",
                );
                child.outer = OuterDisplay::Inline;
            }
            child
        })
        .collect()
}

/// STEP 1: wrap stray table parts in anonymous tables.
/// STEP 2: if every in-flow child is inline-level, put them all in a
/// line box; otherwise wrap each inline run in an anonymous block.
fn block_container_children(parent: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    // STEP 1
    let children = wrap_table_parts(parent, children);

    // STEP 2
    let has_block = children
        .iter()
        .any(|child| !is_out_of_flow(child) && child.is_block_level());
    let has_inline = children
        .iter()
        .any(|child| !is_out_of_flow(child) && !child.is_block_level());
    if !has_inline {
        return children;
    }
    if !has_block {
        if is_blank_run(&children) {
            return children
                .into_iter()
                .filter(|child| !is_collapsible_whitespace(child))
                .collect();
        }
        let line = LayoutBox::anonymous_from(parent, BoxKind::Line, OuterDisplay::Inline, children);
        return vec![line];
    }

    let mut new_children = Vec::with_capacity(children.len());
    let mut inline_run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, new_children: &mut Vec<LayoutBox>| {
        let mut run = std::mem::take(run);
        if is_blank_run(&run) {
            run.retain(|child| !is_collapsible_whitespace(child));
            new_children.extend(run);
        } else {
            let line = LayoutBox::anonymous_from(parent, BoxKind::Line, OuterDisplay::Inline, run);
            new_children.push(LayoutBox::anonymous_from(
                parent,
                BoxKind::BlockContainer,
                OuterDisplay::Block,
                vec![line],
            ));
        }
    };
    for child in children {
        if child.is_block_level() && !is_out_of_flow(&child) {
            flush(&mut inline_run, &mut new_children);
            new_children.push(child);
        } else {
            inline_run.push(child);
        }
    }
    flush(&mut inline_run, &mut new_children);
    new_children
}

/// [§ 17.2.1](https://www.w3.org/TR/CSS2/tables.html#anonymous-boxes)
///
/// "If a child C of a 'table-row' parent is not a 'table-cell', then
/// generate an anonymous 'table' box around C and all consecutive
/// siblings of C that are proper table children." The same goes for
/// table parts found in any non-table parent.
fn wrap_table_parts(parent: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    if !children.iter().any(is_table_internal) {
        return children;
    }
    let mut new_children = Vec::with_capacity(children.len());
    let mut run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, new_children: &mut Vec<LayoutBox>| {
        if run.is_empty() {
            return;
        }
        let style = ComputedStyle::anonymous_from(&parent.style, Display::Table);
        new_children.push(wrap_table(&style, None, std::mem::take(run)));
    };
    for child in children {
        if is_table_internal(&child) {
            run.push(child);
        } else if !run.is_empty() && is_collapsible_whitespace(&child) {
            // Dropped between table parts.
        } else {
            flush(&mut run, &mut new_children);
            new_children.push(child);
        }
    }
    flush(&mut run, &mut new_children);
    new_children
}

/// [§ 9.4 Flex Items](https://www.w3.org/TR/css-flexbox-1/#flex-items)
///
/// "Each in-flow child of a flex container becomes a flex item, and each
/// contiguous sequence of child text runs is wrapped in an anonymous
/// block container flex item."
fn flex_items(container: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    let children = wrap_table_parts(container, children);
    let mut items = Vec::with_capacity(children.len());
    let mut text_run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, items: &mut Vec<LayoutBox>| {
        let run = std::mem::take(run);
        if run.is_empty() || is_blank_run(&run) {
            return;
        }
        let line = LayoutBox::anonymous_from(container, BoxKind::Line, OuterDisplay::Inline, run);
        items.push(LayoutBox::anonymous_from(
            container,
            BoxKind::BlockContainer,
            OuterDisplay::Block,
            vec![line],
        ));
    };
    for mut child in children {
        if matches!(child.kind, BoxKind::Text(_)) {
            text_run.push(child);
            continue;
        }
        flush(&mut text_run, &mut items);
        if matches!(child.kind, BoxKind::Inline) {
            // "The display value of a flex item is blockified."
            let line = LayoutBox::anonymous_from(
                container,
                BoxKind::Line,
                OuterDisplay::Inline,
                vec![child],
            );
            items.push(LayoutBox::anonymous_from(
                container,
                BoxKind::BlockContainer,
                OuterDisplay::Block,
                vec![line],
            ));
        } else {
            child.outer = OuterDisplay::Block;
            items.push(child);
        }
    }
    flush(&mut text_run, &mut items);
    items
}

/// Children of a row group: consecutive non-rows go into anonymous rows.
fn group_rows(group: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    let mut rows = Vec::with_capacity(children.len());
    let mut run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, rows: &mut Vec<LayoutBox>| {
        let run = std::mem::take(run);
        if run.is_empty() || is_blank_run(&run) {
            return;
        }
        let mut row = LayoutBox::anonymous_from(
            group,
            BoxKind::Table(TableRole::Row),
            OuterDisplay::Block,
            Vec::new(),
        );
        row.children = group_cells(&row, run);
        row.reindex_children();
        rows.push(row);
    };
    for child in children {
        if child.is_row() {
            flush(&mut run, &mut rows);
            rows.push(child);
        } else if !is_column_part(&child) {
            run.push(child);
        }
    }
    flush(&mut run, &mut rows);
    rows
}

/// Children of a row: consecutive non-cells go into anonymous cells.
fn group_cells(row: &LayoutBox, children: Vec<LayoutBox>) -> Vec<LayoutBox> {
    let mut cells = Vec::with_capacity(children.len());
    let mut run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, cells: &mut Vec<LayoutBox>| {
        let run = std::mem::take(run);
        if run.is_empty() || is_blank_run(&run) {
            return;
        }
        let role = TableRole::Cell {
            colspan: 1,
            rowspan: 1,
            grid_x: 0,
        };
        let mut cell =
            LayoutBox::anonymous_from(row, BoxKind::Table(role), OuterDisplay::Block, Vec::new());
        cell.children = block_container_children(&cell, run);
        cell.reindex_children();
        cells.push(cell);
    };
    for child in children {
        if matches!(child.kind, BoxKind::Table(TableRole::Cell { .. })) {
            flush(&mut run, &mut cells);
            cells.push(child);
        } else if !is_column_part(&child) {
            run.push(child);
        }
    }
    flush(&mut run, &mut cells);
    cells
}

const fn is_column_part(child: &LayoutBox) -> bool {
    matches!(
        child.kind,
        BoxKind::Table(TableRole::ColumnGroup | TableRole::Column { .. })
    )
}

fn anonymous_columns(group: &LayoutBox, span: usize) -> Vec<LayoutBox> {
    (0..span.max(1))
        .map(|_| {
            LayoutBox::anonymous_from(
                group,
                BoxKind::Table(TableRole::Column { grid_x: 0 }),
                OuterDisplay::Block,
                Vec::new(),
            )
        })
        .collect()
}

/// [§ 17.4 Tables in the visual formatting model](https://www.w3.org/TR/CSS2/tables.html#model)
///
/// "The computed values of properties 'position', 'float', 'margin-*',
/// 'top', 'right', 'bottom', and 'left' on the table element are used on
/// the table wrapper box and not the table box; all other values of
/// non-inheritable properties are used on the table box and not the table
/// wrapper box."
fn split_table_style(style: &ComputedStyle) -> (ComputedStyle, ComputedStyle) {
    let initial = ComputedStyle::default();
    let mut wrapper = ComputedStyle::anonymous_from(style, style.display);
    let mut table = style.clone();
    table.display = Display::Table;

    wrapper.position = style.position;
    wrapper.float = style.float;
    wrapper.clear = style.clear;
    wrapper.top = style.top;
    wrapper.right = style.right;
    wrapper.bottom = style.bottom;
    wrapper.left = style.left;
    wrapper.margin_top = style.margin_top;
    wrapper.margin_right = style.margin_right;
    wrapper.margin_bottom = style.margin_bottom;
    wrapper.margin_left = style.margin_left;
    wrapper.break_before = style.break_before;
    wrapper.break_after = style.break_after;
    wrapper.break_inside = style.break_inside;
    wrapper.overflow = style.overflow;
    wrapper.vertical_align = style.vertical_align;
    wrapper.page.clone_from(&style.page);
    wrapper.z_index = style.z_index;
    wrapper.opacity = style.opacity;
    wrapper.transform = style.transform;

    table.position = Position::Static;
    table.float = Float::None;
    table.clear = Clear::None;
    table.top = AutoLength::Auto;
    table.right = AutoLength::Auto;
    table.bottom = AutoLength::Auto;
    table.left = AutoLength::Auto;
    table.margin_top = initial.margin_top;
    table.margin_right = initial.margin_right;
    table.margin_bottom = initial.margin_bottom;
    table.margin_left = initial.margin_left;
    table.break_before = BreakValue::Auto;
    table.break_after = BreakValue::Auto;
    table.overflow = Overflow::Visible;
    table.vertical_align = VerticalAlign::Baseline;
    table.z_index = None;
    table.opacity = initial.opacity;
    table.transform = false;
    (wrapper, table)
}

/// Build the wrapper of a table with `style` from the table's children.
///
/// STEP 1: sort the children into captions, column groups and row groups,
/// generating the missing row groups and column groups.
/// STEP 2: move the first header group first and the first footer group
/// last.
/// STEP 3: give columns and cells their grid position.
/// STEP 4: put captions around the table box in the wrapper.
fn wrap_table(style: &ComputedStyle, tag: Option<&str>, children: Vec<LayoutBox>) -> LayoutBox {
    let (wrapper_style, table_style) = split_table_style(style);
    let wrapper_style = Rc::new(wrapper_style);
    let table_style = Rc::new(table_style);
    let mut table = LayoutBox::new(
        BoxKind::Table(TableRole::Table(Box::default())),
        Rc::clone(&table_style),
        Vec::new(),
    );
    table.outer = OuterDisplay::Block;
    table.element_tag = tag.map(str::to_string);

    // STEP 1
    let mut captions = Vec::new();
    let mut column_groups = Vec::new();
    let mut groups = Vec::new();
    let mut run: Vec<LayoutBox> = Vec::new();
    let flush = |run: &mut Vec<LayoutBox>, groups: &mut Vec<LayoutBox>| {
        let run = std::mem::take(run);
        if run.is_empty() || is_blank_run(&run) {
            return;
        }
        let role = TableRole::RowGroup {
            header: false,
            footer: false,
        };
        let mut group = LayoutBox::anonymous_from(
            &table,
            BoxKind::Table(role),
            OuterDisplay::Block,
            Vec::new(),
        );
        group.children = group_rows(&group, run);
        group.reindex_children();
        groups.push(group);
    };
    for child in children {
        match &child.kind {
            BoxKind::Table(TableRole::Caption) => captions.push(child),
            BoxKind::Table(TableRole::ColumnGroup) => column_groups.push(child),
            BoxKind::Table(TableRole::Column { .. }) => {
                let mut group = LayoutBox::anonymous_from(
                    &table,
                    BoxKind::Table(TableRole::ColumnGroup),
                    OuterDisplay::Block,
                    Vec::new(),
                );
                group.children = vec![child];
                group.reindex_children();
                column_groups.push(group);
            }
            BoxKind::Table(TableRole::RowGroup { .. }) => {
                flush(&mut run, &mut groups);
                groups.push(child);
            }
            _ => run.push(child),
        }
    }
    flush(&mut run, &mut groups);

    // STEP 2
    // [§ 17.2](https://www.w3.org/TR/CSS2/tables.html#table-display)
    // Only the first header and footer groups repeat; later ones are
    // treated as body groups.
    let mut header = None;
    let mut footer = None;
    let mut bodies = Vec::with_capacity(groups.len());
    for mut group in groups {
        let (is_header, is_footer) = match group.kind {
            BoxKind::Table(TableRole::RowGroup { header, footer }) => (header, footer),
            _ => (false, false),
        };
        if is_header && header.is_none() {
            header = Some(group);
        } else if is_footer && footer.is_none() {
            footer = Some(group);
        } else {
            group.kind = BoxKind::Table(TableRole::RowGroup {
                header: false,
                footer: false,
            });
            bodies.push(group);
        }
    }
    let mut groups: Vec<LayoutBox> = header.into_iter().chain(bodies).chain(footer).collect();

    // STEP 3
    let mut grid_x = 0;
    for group in &mut column_groups {
        for column in &mut group.children {
            column.kind = BoxKind::Table(TableRole::Column { grid_x });
            grid_x += 1;
        }
    }
    for group in &mut groups {
        assign_cell_positions(group);
    }

    table.kind = BoxKind::Table(TableRole::Table(Box::new(TableData::new(column_groups))));
    table.children = groups;
    table.reindex_children();

    // STEP 4
    let (top, bottom): (Vec<LayoutBox>, Vec<LayoutBox>) = captions
        .into_iter()
        .partition(|caption| caption.style.caption_side == CaptionSide::Top);
    let mut wrapper = LayoutBox::new(
        BoxKind::Table(TableRole::Wrapper),
        wrapper_style,
        Vec::new(),
    );
    wrapper.element_tag = tag.map(str::to_string);
    wrapper.children = top
        .into_iter()
        .chain(std::iter::once(table))
        .chain(bottom)
        .collect();
    wrapper.reindex_children();
    wrapper
}

/// [§ 17.5 Visual layout of table contents](https://www.w3.org/TR/CSS2/tables.html#table-layout)
///
/// "Cells are placed in the first free grid column of their row, after
/// the slots taken by cells spanning down from the rows above." Rowspans
/// are clamped to the end of the group; 0 spans to the end.
fn assign_cell_positions(group: &mut LayoutBox) {
    let row_count = group.children.len();
    let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); row_count];
    for (row_index, row) in group.children.iter_mut().enumerate() {
        let mut grid_x = 0;
        for cell in &mut row.children {
            let BoxKind::Table(TableRole::Cell { colspan, rowspan, .. }) = cell.kind else {
                continue;
            };
            while occupied[row_index].get(grid_x).copied().unwrap_or(false) {
                grid_x += 1;
            }
            let remaining = row_count - row_index;
            let rowspan = if rowspan == 0 {
                remaining
            } else {
                rowspan.min(remaining)
            };
            for slots in &mut occupied[row_index + 1..row_index + rowspan] {
                if slots.len() < grid_x + colspan {
                    slots.resize(grid_x + colspan, false);
                }
                for slot in &mut slots[grid_x..grid_x + colspan] {
                    *slot = true;
                }
            }
            cell.kind = BoxKind::Table(TableRole::Cell {
                colspan,
                rowspan,
                grid_x,
            });
            grid_x += colspan;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(display: Display) -> ComputedStyle {
        ComputedStyle::with_display(display)
    }

    fn element(display: Display, children: Vec<BoxDescription>) -> BoxDescription {
        BoxDescription::element("div", styled(display), children)
    }

    fn cell(colspan: usize, rowspan: usize) -> BoxDescription {
        BoxDescription {
            colspan: Some(colspan),
            rowspan: Some(rowspan),
            ..element(Display::TableCell, vec![BoxDescription::text("x")])
        }
    }

    fn grid_positions(row: &LayoutBox) -> Vec<(usize, usize)> {
        row.children
            .iter()
            .filter_map(|cell| match cell.kind {
                BoxKind::Table(TableRole::Cell { grid_x, rowspan, .. }) => Some((grid_x, rowspan)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_inline_content_goes_into_one_line() {
        let root = element(
            Display::Block,
            vec![
                BoxDescription::text("Hello "),
                element(Display::Inline, vec![BoxDescription::text("world")]),
            ],
        );
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].is_line());
        assert_eq!(tree.children[0].children.len(), 2);
    }

    #[test]
    fn test_mixed_content_gets_anonymous_blocks() {
        let root = element(
            Display::Block,
            vec![
                BoxDescription::text("before"),
                element(Display::Block, Vec::new()),
                BoxDescription::text("after"),
            ],
        );
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children.len(), 3);
        assert!(tree.children[0].element_tag.is_none());
        assert!(tree.children[0].children[0].is_line());
        assert_eq!(tree.children[1].element_tag.as_deref(), Some("div"));
        assert!(tree.children.iter().all(LayoutBox::is_block_level));
    }

    #[test]
    fn test_whitespace_between_blocks_is_dropped() {
        let root = element(
            Display::Block,
            vec![
                element(Display::Block, Vec::new()),
                BoxDescription::text("\n  "),
                element(Display::Block, Vec::new()),
            ],
        );
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_display_none_generates_nothing() {
        let hidden = element(Display::None, vec![element(Display::Block, Vec::new())]);
        let root = element(Display::Block, vec![hidden]);
        let tree = build_box_tree(&root).unwrap();
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_root_is_blockified() {
        let tree = build_box_tree(&element(Display::Inline, Vec::new())).unwrap();
        assert!(tree.is_block_level());
    }

    #[test]
    fn test_text_with_children_is_rejected() {
        let mut text = BoxDescription::text("x");
        text.children.push(element(Display::Block, Vec::new()));
        let root = element(Display::Block, vec![element(Display::Block, vec![text])]);
        let Err(Error::InvalidDescription { path, .. }) = build_box_tree(&root) else {
            panic!("expected an invalid description");
        };
        assert_eq!(path, "/children/0/children/0");
    }

    #[test]
    fn test_named_page_is_inherited() {
        let mut root = element(Display::Block, vec![element(Display::Block, Vec::new())]);
        root.style.page = Some("wide".to_string());
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children[0].style.page.as_deref(), Some("wide"));
    }

    #[test]
    fn test_floats_are_blockified() {
        let mut float = element(Display::Inline, vec![BoxDescription::text("x")]);
        float.style.float = Float::Left;
        let root = element(Display::Block, vec![float, BoxDescription::text("text")]);
        let tree = build_box_tree(&root).unwrap();
        let line = &tree.children[0];
        assert!(line.is_line());
        assert_eq!(line.children[0].style.display, Display::Block);
        assert!(matches!(line.children[0].kind, BoxKind::BlockContainer));
    }

    #[test]
    fn test_table_wrapper_takes_margins_and_captions() {
        let mut table = element(
            Display::Table,
            vec![
                element(Display::TableRow, vec![cell(1, 1)]),
                element(Display::TableCaption, vec![BoxDescription::text("caption")]),
            ],
        );
        table.style.margin_top = AutoLength::px(20.0);
        table.style.width = AutoLength::px(200.0);
        let tree = build_box_tree(&element(Display::Block, vec![table])).unwrap();
        let wrapper = &tree.children[0];
        assert!(wrapper.is_table_wrapper());
        assert_eq!(wrapper.style.margin_top, AutoLength::px(20.0));
        assert!(matches!(
            wrapper.children[0].kind,
            BoxKind::Table(TableRole::Caption)
        ));
        let table = &wrapper.children[1];
        assert_eq!(table.style.margin_top, AutoLength::px(0.0));
        assert_eq!(table.style.width, AutoLength::px(200.0));
        // The bare row got an anonymous row group.
        assert!(matches!(
            table.children[0].kind,
            BoxKind::Table(TableRole::RowGroup { .. })
        ));
        assert!(table.children[0].children[0].is_row());
    }

    #[test]
    fn test_header_first_and_footer_last() {
        let group = |display| element(display, vec![element(Display::TableRow, vec![cell(1, 1)])]);
        let table = element(
            Display::Table,
            vec![
                group(Display::TableFooterGroup),
                group(Display::TableRowGroup),
                group(Display::TableHeaderGroup),
            ],
        );
        let tree = build_box_tree(&table).unwrap();
        let groups = &tree.children[0].children;
        assert!(matches!(
            groups[0].kind,
            BoxKind::Table(TableRole::RowGroup { header: true, .. })
        ));
        assert!(matches!(
            groups[1].kind,
            BoxKind::Table(TableRole::RowGroup {
                header: false,
                footer: false
            })
        ));
        assert!(matches!(
            groups[2].kind,
            BoxKind::Table(TableRole::RowGroup { footer: true, .. })
        ));
    }

    #[test]
    fn test_rowspans_push_later_cells_right() {
        let table = element(
            Display::Table,
            vec![
                element(Display::TableRow, vec![cell(1, 2), cell(2, 1)]),
                element(Display::TableRow, vec![cell(1, 1), cell(1, 0)]),
            ],
        );
        let tree = build_box_tree(&table).unwrap();
        let group = &tree.children[0].children[0];
        assert_eq!(grid_positions(&group.children[0]), vec![(0, 2), (1, 1)]);
        assert_eq!(grid_positions(&group.children[1]), vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_stray_cells_get_an_anonymous_table() {
        let root = element(Display::Block, vec![cell(1, 1), cell(1, 1)]);
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children.len(), 1);
        let wrapper = &tree.children[0];
        assert!(wrapper.is_table_wrapper());
        let row = &wrapper.children[0].children[0].children[0];
        assert_eq!(grid_positions(row), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_column_span_repeats_columns() {
        let column = BoxDescription {
            span: Some(2),
            ..element(Display::TableColumn, Vec::new())
        };
        let table = element(
            Display::Table,
            vec![
                element(Display::TableColumnGroup, vec![column]),
                element(Display::TableColumnGroup, Vec::new()),
            ],
        );
        let tree = build_box_tree(&table).unwrap();
        let BoxKind::Table(TableRole::Table(data)) = &tree.children[0].kind else {
            panic!("expected a table box");
        };
        let positions: Vec<usize> = data
            .column_groups
            .iter()
            .flat_map(|group| &group.children)
            .filter_map(|column| match column.kind {
                BoxKind::Table(TableRole::Column { grid_x }) => Some(grid_x),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_flex_text_is_wrapped_in_items() {
        let root = element(
            Display::Flex,
            vec![
                BoxDescription::text("loose text"),
                element(Display::InlineBlock, vec![BoxDescription::text("item")]),
            ],
        );
        let tree = build_box_tree(&root).unwrap();
        assert_eq!(tree.children.len(), 2);
        assert!(tree.children[0].children[0].is_line());
        assert!(tree.children.iter().all(LayoutBox::is_block_level));
    }

    #[test]
    fn test_grid_falls_back_to_flow_root() {
        let tree = build_box_tree(&element(Display::Grid, Vec::new())).unwrap();
        assert_eq!(tree.style.display, Display::FlowRoot);
        assert!(matches!(tree.kind, BoxKind::BlockContainer));
    }

    #[test]
    fn test_images_are_replaced_boxes() {
        let image = BoxDescription {
            image: Some(ImageSize {
                width: Some(40.0),
                height: Some(20.0),
            }),
            ..element(Display::Inline, Vec::new())
        };
        let tree = build_box_tree(&element(Display::Block, vec![image])).unwrap();
        let replaced = &tree.children[0].children[0];
        assert!(matches!(replaced.kind, BoxKind::Replaced(_)));
        assert!(replaced.is_atomic_inline());
    }

    #[test]
    fn test_description_reads_kebab_json() {
        let json = r#"{
            "tag": "p",
            "style": { "display": "block", "font-size": 12.0 },
            "children": [ { "text": "Hello" } ]
        }"#;
        let description: BoxDescription = serde_json::from_str(json).unwrap();
        assert_eq!(description.style.display, Display::Block);
        assert_eq!(description.style.font_size, 12.0);
        assert_eq!(description.children[0].text.as_deref(), Some("Hello"));
    }
}
