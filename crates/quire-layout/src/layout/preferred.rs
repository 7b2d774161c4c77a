//! Preferred widths.
//!
//! [§ 4 Intrinsic Size Determination](https://www.w3.org/TR/css-sizing-3/#intrinsic-sizes)
//!
//! "min-content inline size: The smallest size a box could take that
//! doesn't lead to overflow that could be avoided by choosing a larger
//! size."
//!
//! "max-content inline size: A box's ideal size in a given axis when given
//! infinite available space."
//!
//! Preferred widths are computed from styles and content only, on boxes
//! that have not been laid out. Percentages are treated as 'auto'.

use crate::style::{AutoLength, ComputedStyle, FlexDirection, Length};

use super::boxes::{BoxKind, LayoutBox, TableRole};
use super::context::LayoutContext;
use super::replaced::replaced_content_width;
use super::table::table_preferred_widths;

/// [§ 10.3.5](https://www.w3.org/TR/CSS2/visudet.html#float-width)
///
/// "Then the shrink-to-fit width is: min(max(preferred minimum width,
/// available width), preferred width)."
#[must_use]
pub fn shrink_to_fit(ctx: &LayoutContext<'_>, layout_box: &LayoutBox, available_width: f32) -> f32 {
    min_content_width(ctx, layout_box, false)
        .max(available_width)
        .min(max_content_width(ctx, layout_box, false))
}

/// Min-content width: break at every opportunity.
///
/// With `outer` the width includes margins, borders and padding.
#[must_use]
pub fn min_content_width(ctx: &LayoutContext<'_>, layout_box: &LayoutBox, outer: bool) -> f32 {
    match &layout_box.kind {
        BoxKind::Table(TableRole::Wrapper) => table_preferred_widths(ctx, layout_box, outer).0,
        BoxKind::Table(TableRole::Cell { .. }) => {
            table_cell_min_content_width(ctx, layout_box, outer)
        }
        BoxKind::Table(TableRole::ColumnGroup) => column_group_content_width(layout_box),
        BoxKind::Inline | BoxKind::Line | BoxKind::Text(_) => {
            inline_content_width(ctx, layout_box, outer, true)
        }
        BoxKind::Replaced(_) => adjust(layout_box, outer, replaced_content_width(layout_box)),
        BoxKind::Flex => flex_content_width(ctx, layout_box, outer, true),
        BoxKind::BlockContainer | BoxKind::Table(_) => {
            block_content_width(ctx, layout_box, outer, min_content_width)
        }
    }
}

/// Max-content width: break only at forced breaks.
#[must_use]
pub fn max_content_width(ctx: &LayoutContext<'_>, layout_box: &LayoutBox, outer: bool) -> f32 {
    match &layout_box.kind {
        BoxKind::Table(TableRole::Wrapper) => table_preferred_widths(ctx, layout_box, outer).1,
        BoxKind::Table(TableRole::ColumnGroup) => column_group_content_width(layout_box),
        BoxKind::Inline | BoxKind::Line | BoxKind::Text(_) => {
            inline_content_width(ctx, layout_box, outer, false)
        }
        BoxKind::Replaced(_) => adjust(layout_box, outer, replaced_content_width(layout_box)),
        BoxKind::Flex => flex_content_width(ctx, layout_box, outer, false),
        BoxKind::BlockContainer | BoxKind::Table(_) => {
            block_content_width(ctx, layout_box, outer, max_content_width)
        }
    }
}

/// `(min-content, max-content)` of a table cell, max never below min.
#[must_use]
pub fn table_cell_min_max_content_width(
    ctx: &LayoutContext<'_>,
    cell: &LayoutBox,
    outer: bool,
) -> (f32, f32) {
    let min = table_cell_min_content_width(ctx, cell, outer);
    let max = max_content_width(ctx, cell, outer).max(min);
    (min, max)
}

/// Cells ignore their specified width for their minimum.
fn table_cell_min_content_width(ctx: &LayoutContext<'_>, cell: &LayoutBox, outer: bool) -> f32 {
    let children = cell
        .children
        .iter()
        .filter(|child| !child.is_absolutely_positioned())
        .map(|child| min_content_width(ctx, child, true))
        .fold(0.0, f32::max);
    adjust(cell, outer, children)
}

fn column_group_content_width(group: &LayoutBox) -> f32 {
    let width = match group.style.width {
        AutoLength::Length(len) if !len.is_percentage() => len.resolve(0.0),
        _ => 0.0,
    };
    adjust(group, false, width)
}

/// "percentages on the following properties are treated instead as though
/// they were the following: width: auto"
fn block_content_width(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    outer: bool,
    children_width: fn(&LayoutContext<'_>, &LayoutBox, bool) -> f32,
) -> f32 {
    let width = match layout_box.style.width {
        AutoLength::Length(len) if !len.is_percentage() => len.resolve(0.0),
        _ => layout_box
            .children
            .iter()
            .filter(|child| !child.is_absolutely_positioned())
            .map(|child| children_width(ctx, child, true))
            .fold(0.0, f32::max),
    };
    adjust(layout_box, outer, width)
}

fn flex_content_width(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    outer: bool,
    minimum: bool,
) -> f32 {
    let item_width = |child: &LayoutBox| {
        if minimum {
            min_content_width(ctx, child, true)
        } else {
            max_content_width(ctx, child, true)
        }
    };
    let items = layout_box.children.iter().filter(|child| child.is_in_normal_flow());
    let width = match layout_box.style.flex_direction {
        FlexDirection::Row | FlexDirection::RowReverse => items.map(item_width).sum(),
        FlexDirection::Column | FlexDirection::ColumnReverse => {
            items.map(item_width).fold(0.0, f32::max)
        }
    };
    adjust(layout_box, outer, width)
}

fn inline_content_width(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    outer: bool,
    minimum: bool,
) -> f32 {
    let mut widths = inline_line_widths(ctx, layout_box, outer, true, minimum);
    if let Some(last) = widths.last_mut() {
        *last -= trailing_whitespace_size(ctx, layout_box);
    }
    adjust(layout_box, outer, widths.into_iter().fold(0.0, f32::max))
}

/// Used min/max width constraints from the style, percentages ignored.
fn min_max(layout_box: &LayoutBox, width: f32) -> f32 {
    let style = &layout_box.style;
    let min_width = match style.min_width {
        AutoLength::Length(len) if !len.is_percentage() => len.resolve(0.0),
        _ => 0.0,
    };
    let max_width = match style.max_width {
        Some(len) if !len.is_percentage() => len.resolve(0.0),
        _ => f32::INFINITY,
    };
    width.min(max_width).max(min_width)
}

/// Add horizontal margins, borders and paddings to a content width.
///
/// Percentage margins and paddings scale the result: a content width `w`
/// with `p`% of percentages needs `w / (1 - p/100)` of containing block.
#[must_use]
pub fn margin_width(layout_box: &LayoutBox, width: f32, left: bool, right: bool) -> f32 {
    let style = &layout_box.style;
    let mut width = width;
    let mut percentages = 0.0;
    let mut add = |value: Length| match value {
        Length::Px(px) => width += px,
        Length::Percent(pct) => percentages += pct,
    };
    if left {
        if let AutoLength::Length(len) = style.margin_left {
            add(len);
        }
        add(style.padding_left);
    }
    if right {
        if let AutoLength::Length(len) = style.margin_right {
            add(len);
        }
        add(style.padding_right);
    }
    if left {
        width += style.border_left.used_width();
    }
    if right {
        width += style.border_right.used_width();
    }
    if percentages < 100.0 {
        width / (1.0 - percentages / 100.0)
    } else {
        width
    }
}

fn adjust(layout_box: &LayoutBox, outer: bool, width: f32) -> f32 {
    adjust_sides(layout_box, outer, width, true, true)
}

fn adjust_sides(layout_box: &LayoutBox, outer: bool, width: f32, left: bool, right: bool) -> f32 {
    let fixed = min_max(layout_box, width);
    if outer {
        margin_width(layout_box, fixed, left, right)
    } else {
        fixed
    }
}

/// Widths of the successive lines of inline content, one per forced line
/// break (every break opportunity when `minimum`).
///
/// Atomic inlines are surrounded by break opportunities.
#[must_use]
pub fn inline_line_widths(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    outer: bool,
    is_line_start: bool,
    minimum: bool,
) -> Vec<f32> {
    if let Some(text) = layout_box.text_content() {
        return text_line_widths(ctx, text, &layout_box.style, is_line_start, minimum);
    }

    let mut text_indent = match (&layout_box.kind, layout_box.style.text_indent) {
        (BoxKind::Line, Length::Px(px)) => px,
        _ => 0.0,
    };
    let mut is_line_start = is_line_start;
    let mut widths = Vec::new();
    let mut current_line = 0.0;

    for child in &layout_box.children {
        if child.is_absolutely_positioned() {
            continue;
        }
        let lines = match &child.kind {
            BoxKind::Inline => {
                let mut lines = inline_line_widths(ctx, child, outer, is_line_start, minimum);
                let last = lines.len() - 1;
                if last == 0 {
                    lines[0] = adjust(child, outer, lines[0]);
                } else {
                    lines[0] = adjust_sides(child, outer, lines[0], true, false);
                    lines[last] = adjust_sides(child, outer, lines[last], false, true);
                }
                lines
            }
            BoxKind::Text(text) => {
                text_line_widths(ctx, text, &child.style, is_line_start, minimum)
            }
            _ if minimum => vec![0.0, min_content_width(ctx, child, true), 0.0],
            _ => vec![max_content_width(ctx, child, true)],
        };

        current_line += lines[0];
        if lines.len() > 1 {
            widths.push(current_line + text_indent);
            text_indent = 0.0;
            widths.extend_from_slice(&lines[1..lines.len() - 1]);
            current_line = lines[lines.len() - 1];
        }
        is_line_start = lines[lines.len() - 1] == 0.0;
    }
    widths.push(current_line + text_indent);
    widths
}

fn text_line_widths(
    ctx: &LayoutContext<'_>,
    text: &str,
    style: &ComputedStyle,
    is_line_start: bool,
    minimum: bool,
) -> Vec<f32> {
    let collapses = style.white_space.collapses_spaces();
    let text = if is_line_start && collapses {
        text.trim_start_matches(' ')
    } else {
        text
    };
    if minimum && text == " " {
        return vec![0.0, 0.0];
    }

    let max_width = minimum.then_some(0.0);
    let mut widths = Vec::new();
    let mut start = 0;
    loop {
        let rest = &text[start..];
        let line = ctx.shaper.split_first_line(rest, style, max_width, is_line_start);
        let width = if minimum {
            ctx.shaper.text_width(rest[..line.length].trim_end_matches(' '), style)
        } else {
            line.width
        };
        widths.push(width);
        match line.resume_index {
            Some(resume) if resume > 0 && start + resume < text.len() => start += resume,
            _ => break,
        }
    }
    if minimum && collapses && text.len() > 1 && text.ends_with(' ') {
        widths.push(0.0);
    }
    widths
}

/// Width of the collapsible spaces ending the inline content.
pub(crate) fn trailing_whitespace_size(ctx: &LayoutContext<'_>, layout_box: &LayoutBox) -> f32 {
    let mut last = layout_box;
    while let Some(child) = last.children.last() {
        if child.is_absolutely_positioned() || child.is_floated() {
            return 0.0;
        }
        last = child;
    }
    let Some(text) = last.text_content() else {
        return 0.0;
    };
    if !last.style.white_space.collapses_spaces() {
        return 0.0;
    }
    let stripped = text.trim_end_matches(' ');
    if stripped.len() == text.len() {
        return 0.0;
    }
    let trailing = &text[stripped.len()..];
    if stripped.is_empty() {
        return ctx.shaper.text_width(" ", &last.style);
    }
    ctx.shaper.text_width(trailing, &last.style)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::layout::text::MonospaceShaper;
    use crate::style::Display;

    fn style(display: Display) -> Rc<ComputedStyle> {
        Rc::new(ComputedStyle {
            font_size: 10.0,
            ..ComputedStyle::with_display(display)
        })
    }

    fn paragraph(text: &str) -> LayoutBox {
        let line = LayoutBox::new(
            BoxKind::Line,
            style(Display::Inline),
            vec![LayoutBox::text(text, style(Display::Inline))],
        );
        LayoutBox::new(BoxKind::BlockContainer, style(Display::Block), vec![line])
    }

    #[test]
    fn test_min_content_is_longest_word() {
        let ctx = LayoutContext::new(&MonospaceShaper, 1000.0);
        let block = paragraph("aa bbbb c");
        assert!((min_content_width(&ctx, &block, false) - 24.0).abs() < 0.01);
    }

    #[test]
    fn test_max_content_ignores_trailing_space() {
        let ctx = LayoutContext::new(&MonospaceShaper, 1000.0);
        let block = paragraph("aa bb ");
        assert!((max_content_width(&ctx, &block, false) - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_shrink_to_fit_clamps_available_width() {
        let ctx = LayoutContext::new(&MonospaceShaper, 1000.0);
        let block = paragraph("aa bbbb c");
        assert!((shrink_to_fit(&ctx, &block, 1000.0) - 54.0).abs() < 0.01);
        assert!((shrink_to_fit(&ctx, &block, 30.0) - 30.0).abs() < 0.01);
        assert!((shrink_to_fit(&ctx, &block, 5.0) - 24.0).abs() < 0.01);
    }

    #[test]
    fn test_margin_width_percentages_scale() {
        let mut s = ComputedStyle::with_display(Display::Block);
        s.padding_left = Length::Percent(50.0);
        let block = LayoutBox::new(BoxKind::BlockContainer, Rc::new(s), Vec::new());
        let width = margin_width(&block, 100.0, true, true);
        assert!((width - 200.0).abs() < 0.01);
    }
}
