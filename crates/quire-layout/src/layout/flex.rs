//! [CSS Flexible Box Layout Module Level 1](https://www.w3.org/TR/css-flexbox-1/)
//!
//! Single-line flex containers: no wrapping, no cross-axis alignment other
//! than the initial 'stretch'. A flex container is laid out without a page
//! bottom and fragments as one unit.

use std::mem;

use log::{debug, trace};

use super::block::{BlockLayout, block_container_layout, block_level_width, resolve_absolute_boxes};
use super::box_model::AutoOr;
use super::boxes::{BoxKind, LayoutBox};
use super::context::LayoutContext;
use super::percent::{ContainingBlock, clamp, resolve_percentages};
use super::positioned::relative_positioning;
use super::preferred::{max_content_width, min_content_width};
use super::replaced::replaced_box_width_height;
use super::table::table_wrapper_width;
use crate::style::{AutoLength, BoxSizing, FlexDirection, JustifyContent, Overflow, Position};

/// A flex item while its main size is being resolved.
#[derive(Debug, Clone)]
struct FlexItem {
    /// Index of the source child.
    index: usize,
    /// The box with its percentages resolved.
    prepared: LayoutBox,
    /// [§ 9.2 step 3](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
    base_size: f32,
    /// The base size clamped by the min and max main sizes.
    hypothetical_size: f32,
    min_main: f32,
    max_main: f32,
    grow: f32,
    shrink: f32,
    target_size: f32,
    frozen: bool,
    /// Margins, borders and padding on the main axis.
    outer_main: f32,
}

impl FlexItem {
    fn outer_target(&self) -> f32 {
        self.target_size + self.outer_main
    }
}

/// [§ 9 Flex Layout Algorithm](https://www.w3.org/TR/css-flexbox-1/#layout-algorithm)
///
/// `container` has its used width and position set; `children` are its
/// children before layout.
///
/// STEP 1: collect the in-flow children as items and find their flex base
///         sizes.
/// STEP 2: resolve the flexible lengths (§ 9.7).
/// STEP 3: lay each item out once at its target main size, in main-axis
///         order, offset by justify-content.
/// STEP 4: size the container and stretch the items on the cross axis.
pub(crate) fn flex_layout(
    ctx: &mut LayoutContext<'_>,
    mut container: LayoutBox,
    children: &[LayoutBox],
) -> LayoutBox {
    let direction = container.style.flex_direction;
    let row = matches!(direction, FlexDirection::Row | FlexDirection::RowReverse);
    let reverse = matches!(
        direction,
        FlexDirection::RowReverse | FlexDirection::ColumnReverse
    );
    let content_x = container.content_box_x();
    let content_y = container.content_box_y();
    let cb = ContainingBlock::of(&container);

    ctx.create_block_formatting_context();
    let outer_absolute = container
        .style
        .is_absolute_containing_block()
        .then(|| mem::take(&mut ctx.absolute_boxes));

    // STEP 1
    let mut placeholders = Vec::new();
    let mut items = Vec::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        // [§ 4.1](https://www.w3.org/TR/css-flexbox-1/#abspos-items)
        //
        // "An absolutely-positioned child of a flex container does not
        // participate in flex layout."
        if child.is_absolutely_positioned() {
            let mut placeholder = child.clone();
            placeholder.index = index;
            placeholder.translate(content_x - child.position_x, content_y - child.position_y);
            if child.style.position == Position::Fixed {
                ctx.fixed_boxes.push(child.id);
            } else {
                ctx.absolute_boxes.push(child.id);
            }
            placeholders.push(placeholder);
            continue;
        }
        let mut prepared = child.copy_with_children(Vec::new());
        prepared.index = index;
        resolve_percentages(&mut prepared, cb);
        items.push(flex_item(ctx, &container, prepared, child, row));
    }

    // STEP 2
    let available_main = if row {
        Some(container.content_width())
    } else {
        container.height.length()
    };
    let available = available_main.unwrap_or_else(|| {
        items
            .iter()
            .map(|item| item.hypothetical_size + item.outer_main)
            .sum()
    });
    resolve_flexible_lengths(&mut items, available);

    // STEP 3
    let used: f32 = items.iter().map(FlexItem::outer_target).sum();
    let (mut offset, gap) = justify_offsets(
        container.style.justify_content,
        available - used,
        items.len(),
    );
    let mut new_children = Vec::with_capacity(items.len() + placeholders.len());
    for item in &items {
        let main_position = if reverse {
            available - offset - item.outer_target()
        } else {
            offset
        };
        let position = if row {
            (content_x + main_position, content_y)
        } else {
            (content_x, content_y + main_position)
        };
        let new_item = item_layout(ctx, &container, item, &children[item.index], position, row);
        offset += item.outer_target() + gap;
        new_children.push(new_item);
    }

    // STEP 4
    // [§ 9.4 Cross Size Determination](https://www.w3.org/TR/css-flexbox-1/#algo-cross-line)
    if row {
        let line_cross = container.height.length().unwrap_or_else(|| {
            new_children
                .iter()
                .map(LayoutBox::margin_height)
                .fold(0.0, f32::max)
        });
        for item in &mut new_children {
            stretch(item, line_cross);
        }
        if container.height.is_auto() {
            container.height = AutoOr::Length(line_cross);
        }
    } else if container.height.is_auto() {
        container.height = AutoOr::Length(used);
    }
    let clamped = clamp(
        container.content_height(),
        container.min_height,
        container.max_height,
    );
    container.height = AutoOr::Length(clamped);

    new_children.append(&mut placeholders);
    new_children.sort_by_key(|child| child.index);
    container.children = new_children;

    if let Some(outer) = outer_absolute {
        let own = mem::replace(&mut ctx.absolute_boxes, outer);
        resolve_absolute_boxes(ctx, &mut container, &own);
    }
    let relative_cb = ContainingBlock::of(&container);
    for child in &mut container.children {
        relative_positioning(child, relative_cb);
    }
    ctx.finish_block_formatting_context(&mut container);

    debug!(
        "flex {} {:?}: {} items in {}x{}",
        container.label(),
        direction,
        items.len(),
        container.content_width(),
        container.content_height()
    );
    container
}

/// [§ 9.2 step 3](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
///
/// Determine the flex base size:
///   A. a definite 'flex-basis' is used as is;
///   B. otherwise a definite main size property ('width' or 'height');
///   C. otherwise the max-content size, or the laid-out height for
///      column containers.
fn flex_item(
    ctx: &mut LayoutContext<'_>,
    container: &LayoutBox,
    prepared: LayoutBox,
    source: &LayoutBox,
    row: bool,
) -> FlexItem {
    let style = &prepared.style;
    let (outer_main, specified_main, min_main, max_main, decoration) = if row {
        (
            prepared.margin.horizontal()
                + prepared.padding.horizontal()
                + prepared.border.horizontal(),
            prepared.width.length(),
            prepared.min_width,
            prepared.max_width,
            prepared.padding.horizontal() + prepared.border.horizontal(),
        )
    } else {
        (
            prepared.margin.vertical() + prepared.padding.vertical() + prepared.border.vertical(),
            prepared.height.length(),
            prepared.min_height,
            prepared.max_height,
            prepared.padding.vertical() + prepared.border.vertical(),
        )
    };

    let reference = if row {
        Some(container.content_width())
    } else {
        container.height.length()
    };
    let basis = match style.flex_basis {
        AutoLength::Length(len) => len.resolve_definite(reference).map(|basis| {
            if style.box_sizing == BoxSizing::BorderBox {
                (basis - decoration).max(0.0)
            } else {
                basis
            }
        }),
        AutoLength::Auto => None,
    };
    let base_size = basis.or(specified_main).unwrap_or_else(|| {
        if row {
            max_content_width(ctx, source, false)
        } else {
            content_height(ctx, container, &prepared, source)
        }
    });

    // [§ 4.5 Automatic Minimum Size of Flex Items](https://www.w3.org/TR/css-flexbox-1/#min-size-auto)
    let auto_min = row && style.min_width.is_auto() && style.overflow == Overflow::Visible;
    let min_main = if auto_min {
        let content_min = min_content_width(ctx, source, false);
        specified_main
            .map_or(content_min, |specified| specified.min(content_min))
            .min(max_main)
    } else {
        min_main
    };

    let hypothetical_size = clamp(base_size, min_main, max_main);
    trace!(
        "flex item {}: base {} hypothetical {}",
        prepared.label(),
        base_size,
        hypothetical_size
    );
    FlexItem {
        index: prepared.index,
        grow: style.flex_grow,
        shrink: style.flex_shrink,
        prepared,
        base_size,
        hypothetical_size,
        min_main,
        max_main,
        target_size: 0.0,
        frozen: false,
        outer_main,
    }
}

/// Content height of a column item laid out at the container's width,
/// leaving no trace in the layout context.
fn content_height(
    ctx: &mut LayoutContext<'_>,
    container: &LayoutBox,
    prepared: &LayoutBox,
    source: &LayoutBox,
) -> f32 {
    let mut trial = prepared.clone();
    if matches!(trial.kind, BoxKind::Replaced(_)) {
        replaced_box_width_height(&mut trial, ContainingBlock::of(container));
        return trial.content_height();
    }
    block_level_width(&mut trial, container);
    trial.position_x = container.content_box_x();
    trial.position_y = container.content_box_y();
    let checkpoint = ctx.checkpoint();
    let measured = lay_out_content(ctx, trial, source);
    ctx.rollback(checkpoint);
    measured.content_height()
}

/// Lay out one item with its resolved main size at `position`.
fn item_layout(
    ctx: &mut LayoutContext<'_>,
    container: &LayoutBox,
    item: &FlexItem,
    source: &LayoutBox,
    position: (f32, f32),
    row: bool,
) -> LayoutBox {
    let mut prepared = item.prepared.clone();
    prepared.position_x = position.0;
    prepared.position_y = position.1;
    if matches!(prepared.kind, BoxKind::Replaced(_)) {
        replaced_box_width_height(&mut prepared, ContainingBlock::of(container));
    }
    if row {
        prepared.width = AutoOr::Length(item.target_size);
    } else {
        if !matches!(prepared.kind, BoxKind::Replaced(_)) {
            block_level_width(&mut prepared, container);
        }
        prepared.height = AutoOr::Length(item.target_size);
    }
    if matches!(prepared.kind, BoxKind::Replaced(_)) {
        return prepared;
    }
    lay_out_content(ctx, prepared, source)
}

/// Lay out the children of a prepared item without a page bottom.
fn lay_out_content(
    ctx: &mut LayoutContext<'_>,
    mut prepared: LayoutBox,
    source: &LayoutBox,
) -> LayoutBox {
    if matches!(prepared.kind, BoxKind::Flex) {
        return flex_layout(ctx, prepared, &source.children);
    }
    if prepared.is_table_wrapper() {
        let cb = ContainingBlock::width_only(prepared.content_width());
        table_wrapper_width(ctx, &mut prepared, &source.children, cb);
    }

    // Flex items establish their own formatting context.
    let own_context = !prepared.establishes_formatting_context();
    if own_context {
        ctx.create_block_formatting_context();
    }
    let fallback = prepared.copy_with_children(Vec::new());
    let BlockLayout { new_box, .. } = block_container_layout(
        ctx,
        prepared,
        &source.children,
        f32::NEG_INFINITY,
        None,
        true,
        Vec::new(),
        false,
    );
    let mut new_box = new_box.unwrap_or_else(|| {
        let mut empty = fallback;
        empty.height = AutoOr::Length(0.0);
        empty
    });
    if own_context {
        ctx.finish_block_formatting_context(&mut new_box);
    }
    new_box
}

/// [§ 8.3 'align-items'](https://www.w3.org/TR/css-flexbox-1/#align-items-property)
///
/// "stretch: If the cross size property of the flex item computes to
/// auto, and neither of the cross-axis margins are auto, the flex item is
/// stretched."
fn stretch(item: &mut LayoutBox, line_cross: f32) {
    if !item.style.height.is_auto() || matches!(item.kind, BoxKind::Replaced(_)) {
        return;
    }
    if item.style.margin_top.is_auto() || item.style.margin_bottom.is_auto() {
        return;
    }
    let height =
        line_cross - item.margin.vertical() - item.padding.vertical() - item.border.vertical();
    let height = clamp(height, item.min_height, item.max_height);
    if height > item.content_height() {
        item.height = AutoOr::Length(height);
    }
}

/// [§ 9.7 Resolving Flexible Lengths](https://www.w3.org/TR/css-flexbox-1/#resolve-flexible-lengths)
///
/// Iterative freeze loop with min/max violations.
fn resolve_flexible_lengths(items: &mut [FlexItem], available_main: f32) {
    if items.is_empty() {
        return;
    }

    // STEP 1: "Determine the used flex factor."
    let sum_outer_hypothetical: f32 = items
        .iter()
        .map(|item| item.hypothetical_size + item.outer_main)
        .sum();
    let growing = sum_outer_hypothetical < available_main;

    // STEP 2: "Size inflexible items."
    for item in items.iter_mut() {
        let factor = if growing { item.grow } else { item.shrink };
        if factor == 0.0
            || (growing && item.base_size > item.hypothetical_size)
            || (!growing && item.base_size < item.hypothetical_size)
        {
            item.frozen = true;
            item.target_size = item.hypothetical_size;
        }
    }

    // STEP 3: "Calculate initial free space."
    let free_space = |items: &[FlexItem]| {
        available_main
            - items
                .iter()
                .map(|item| {
                    let size = if item.frozen {
                        item.target_size
                    } else {
                        item.base_size
                    };
                    size + item.outer_main
                })
                .sum::<f32>()
    };
    let initial_free_space = free_space(items);

    // STEP 4: loop until every item is frozen.
    while items.iter().any(|item| !item.frozen) {
        let remaining = free_space(items);
        let factor_sum: f32 = items
            .iter()
            .filter(|item| !item.frozen)
            .map(|item| if growing { item.grow } else { item.shrink })
            .sum();

        // "If the sum of the unfrozen flex items' flex factors is less than
        // one, multiply the initial free space by this sum. If the
        // magnitude of this value is less than the magnitude of the
        // remaining free space, use this as the remaining free space."
        let remaining = if factor_sum < 1.0 {
            let scaled = initial_free_space * factor_sum;
            if scaled.abs() < remaining.abs() {
                scaled
            } else {
                remaining
            }
        } else {
            remaining
        };

        if growing {
            if factor_sum > 0.0 {
                for item in items.iter_mut().filter(|item| !item.frozen) {
                    item.target_size = item.base_size + remaining * item.grow / factor_sum;
                }
            }
        } else {
            // "For every unfrozen item on the line, multiply its flex
            // shrink factor by its inner flex base size, and note this as
            // its scaled flex shrink factor."
            let scaled_sum: f32 = items
                .iter()
                .filter(|item| !item.frozen)
                .map(|item| item.shrink * item.base_size)
                .sum();
            for item in items.iter_mut().filter(|item| !item.frozen) {
                item.target_size = if scaled_sum > 0.0 {
                    remaining
                        .abs()
                        .mul_add(-(item.shrink * item.base_size / scaled_sum), item.base_size)
                } else {
                    item.base_size
                };
            }
        }

        // "Fix min/max violations."
        let mut total_violation = 0.0_f32;
        let mut violations = vec![0.0_f32; items.len()];
        for (item, violation) in items.iter_mut().zip(&mut violations) {
            if item.frozen {
                continue;
            }
            let clamped = clamp(item.target_size, item.min_main, item.max_main).max(0.0);
            *violation = clamped - item.target_size;
            total_violation += *violation;
            item.target_size = clamped;
        }

        // "Freeze over-flexed items."
        for (item, violation) in items.iter_mut().zip(violations) {
            if item.frozen {
                continue;
            }
            item.frozen = if total_violation.abs() < 0.01 {
                true
            } else if total_violation > 0.0 {
                violation > 0.0
            } else {
                violation < 0.0
            };
        }
    }
}

/// [§ 8.2 'justify-content'](https://www.w3.org/TR/css-flexbox-1/#justify-content-property)
///
/// Returns `(initial_offset, gap_between_items)`.
fn justify_offsets(justify: JustifyContent, free_space: f32, item_count: usize) -> (f32, f32) {
    if item_count == 0 {
        return (0.0, 0.0);
    }
    let count = item_count as f32;
    match justify {
        JustifyContent::FlexStart => (0.0, 0.0),
        JustifyContent::FlexEnd => (free_space, 0.0),
        JustifyContent::Center => (free_space / 2.0, 0.0),
        // "If the leftover free-space is negative or there is only a single
        // flex item on the line, this value is identical to 'flex-start'."
        JustifyContent::SpaceBetween if item_count == 1 || free_space <= 0.0 => (0.0, 0.0),
        JustifyContent::SpaceBetween => (0.0, free_space / (count - 1.0)),
        // "If the leftover free-space is negative [...] this value is
        // identical to 'center'."
        JustifyContent::SpaceAround | JustifyContent::SpaceEvenly if free_space <= 0.0 => {
            (free_space / 2.0, 0.0)
        }
        JustifyContent::SpaceAround => (free_space / count / 2.0, free_space / count),
        JustifyContent::SpaceEvenly => {
            let gap = free_space / (count + 1.0);
            (gap, gap)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::layout::text::MonospaceShaper;
    use crate::style::{ComputedStyle, Display};

    fn item(base_size: f32, grow: f32, shrink: f32) -> FlexItem {
        FlexItem {
            index: 0,
            prepared: LayoutBox::new(BoxKind::BlockContainer, Rc::default(), Vec::new()),
            base_size,
            hypothetical_size: base_size,
            min_main: 0.0,
            max_main: f32::INFINITY,
            grow,
            shrink,
            target_size: 0.0,
            frozen: false,
            outer_main: 0.0,
        }
    }

    fn targets(items: &[FlexItem]) -> Vec<f32> {
        items.iter().map(|item| item.target_size).collect()
    }

    #[test]
    fn test_grow_distributes_free_space_by_factor() {
        let mut items = vec![item(50.0, 1.0, 1.0), item(50.0, 3.0, 1.0)];
        resolve_flexible_lengths(&mut items, 300.0);
        assert_eq!(targets(&items), vec![100.0, 200.0]);
    }

    #[test]
    fn test_shrink_is_weighted_by_base_size() {
        let mut items = vec![item(100.0, 0.0, 1.0), item(300.0, 0.0, 1.0)];
        resolve_flexible_lengths(&mut items, 200.0);
        assert_eq!(targets(&items), vec![50.0, 150.0]);
    }

    #[test]
    fn test_inflexible_items_keep_their_hypothetical_size() {
        let mut items = vec![item(80.0, 0.0, 0.0), item(20.0, 1.0, 1.0)];
        resolve_flexible_lengths(&mut items, 200.0);
        assert_eq!(targets(&items), vec![80.0, 120.0]);
    }

    #[test]
    fn test_max_violation_freezes_and_redistributes() {
        let mut capped = item(0.0, 1.0, 1.0);
        capped.max_main = 50.0;
        let mut items = vec![capped, item(0.0, 1.0, 1.0)];
        resolve_flexible_lengths(&mut items, 200.0);
        assert_eq!(targets(&items), vec![50.0, 150.0]);
    }

    #[test]
    fn test_small_grow_sum_leaves_space_unused() {
        let mut items = vec![item(0.0, 0.25, 1.0)];
        resolve_flexible_lengths(&mut items, 100.0);
        assert_eq!(targets(&items), vec![25.0]);
    }

    #[test]
    fn test_justify_offsets() {
        let three_items = |justify| justify_offsets(justify, 60.0, 3);
        assert_eq!(three_items(JustifyContent::FlexEnd), (60.0, 0.0));
        assert_eq!(three_items(JustifyContent::Center), (30.0, 0.0));
        assert_eq!(three_items(JustifyContent::SpaceBetween), (0.0, 30.0));
        assert_eq!(three_items(JustifyContent::SpaceAround), (10.0, 20.0));
        assert_eq!(three_items(JustifyContent::SpaceEvenly), (15.0, 15.0));
        let single_item = justify_offsets(JustifyContent::SpaceBetween, 60.0, 1);
        assert_eq!(single_item, (0.0, 0.0));
    }

    fn flex_container(direction: FlexDirection, justify: JustifyContent) -> LayoutBox {
        let style = ComputedStyle {
            display: Display::Flex,
            flex_direction: direction,
            justify_content: justify,
            ..ComputedStyle::default()
        };
        let mut container = LayoutBox::new(BoxKind::Flex, Rc::new(style), Vec::new());
        container.width = AutoOr::Length(300.0);
        container
    }

    fn sized_child(width: f32, height: f32, grow: f32) -> LayoutBox {
        let style = ComputedStyle {
            width: AutoLength::px(width),
            height: AutoLength::px(height),
            flex_grow: grow,
            ..ComputedStyle::default()
        };
        LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new())
    }

    #[test]
    fn test_row_items_grow_and_stretch() {
        let shaper = MonospaceShaper;
        let mut ctx = LayoutContext::new(&shaper, 1000.0);
        let children = vec![sized_child(100.0, 20.0, 1.0), sized_child(100.0, 40.0, 0.0)];
        let container = flex_container(FlexDirection::Row, JustifyContent::FlexStart);
        let laid_out = flex_layout(&mut ctx, container, &children);
        assert_eq!(laid_out.content_height(), 40.0);
        assert_eq!(laid_out.children[0].content_width(), 200.0);
        assert_eq!(laid_out.children[1].position_x, 200.0);
    }

    #[test]
    fn test_row_reverse_packs_from_the_right() {
        let shaper = MonospaceShaper;
        let mut ctx = LayoutContext::new(&shaper, 1000.0);
        let children = vec![sized_child(100.0, 20.0, 0.0), sized_child(50.0, 20.0, 0.0)];
        let container = flex_container(FlexDirection::RowReverse, JustifyContent::FlexStart);
        let laid_out = flex_layout(&mut ctx, container, &children);
        assert_eq!(laid_out.children[0].position_x, 200.0);
        assert_eq!(laid_out.children[1].position_x, 150.0);
    }

    #[test]
    fn test_column_items_stack_and_size_the_container() {
        let shaper = MonospaceShaper;
        let mut ctx = LayoutContext::new(&shaper, 1000.0);
        let children = vec![sized_child(100.0, 20.0, 0.0), sized_child(100.0, 30.0, 0.0)];
        let container = flex_container(FlexDirection::Column, JustifyContent::Center);
        let laid_out = flex_layout(&mut ctx, container, &children);
        assert_eq!(laid_out.content_height(), 50.0);
        assert_eq!(laid_out.children[1].position_y, 20.0);
        assert_eq!(laid_out.children[1].content_height(), 30.0);
    }
}
