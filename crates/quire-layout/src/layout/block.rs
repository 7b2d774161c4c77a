//! Block-level layout and fragmentation.
//!
//! [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
//!
//! "In a block formatting context, boxes are laid out one after the other,
//! vertically, beginning at the top of a containing block. The vertical
//! distance between two sibling boxes is determined by the 'margin'
//! properties. Vertical margins between adjacent block-level boxes in a
//! block formatting context collapse."
//!
//! [§ 4 Rules for Breaking](https://www.w3.org/TR/css-break-3/#breaking-rules)
//!
//! Every function here lays out at most one page worth of content. When a
//! box does not fit above `bottom_space` it returns the fragment that fits
//! together with a [`SkipStack`] telling where to resume, or no fragment
//! at all when the caller has to find another break point.

use std::mem;

use log::{debug, trace};

use crate::style::{
    AutoLength, BoxDecorationBreak, BreakInside, BreakValue, Clear, Direction, MarginBreak,
    OuterDisplay, Overflow, Position,
};

use super::box_model::{AutoOr, EdgeSizes};
use super::boxes::{BoxId, BoxKind, LayoutBox, TableRole};
use super::column::columns_layout;
use super::context::{BrokenOutOfFlow, LayoutContext};
use super::flex::flex_layout;
use super::float::{avoid_collisions, clearance_at, float_layout, get_clearance};
use super::inline::LineBoxes;
use super::percent::{ContainingBlock, clamp, resolve_percentages};
use super::positioned::{absolute_layout, relative_positioning};
use super::replaced::replaced_box_width_height;
use super::skip_stack::SkipStack;
use super::table::{table_layout, table_wrapper_width};

/// What the page after a fragment should be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NextPage {
    /// The break that ended the fragment; `Auto` for unforced breaks.
    pub break_value: BreakValue,
    /// Name of the page the remaining content asks for.
    pub page: Option<String>,
}

/// Result of laying out a block-level box on the current page.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockLayout {
    /// The fragment, `None` when nothing of the box fits and the caller
    /// has to break earlier.
    pub new_box: Option<LayoutBox>,
    /// Where to resume the box on the next page.
    pub resume_at: Option<SkipStack>,
    /// Requirements for the next page.
    pub next_page: NextPage,
    /// Margins adjoining the bottom of the fragment, not yet collapsed.
    pub adjoining_margins: Vec<f32>,
    /// Whether the top and bottom margins of the box collapse through it.
    pub collapsing_through: bool,
    /// The margins passed in, extended with the margins that collapsed
    /// into the top edge of the box. `None` when clearance (or a box kind
    /// that handles no descendants' margins) broke the chain.
    pub top_margins: Option<Vec<f32>>,
    /// Whether `adjoining_margins` continues `top_margins`.
    pub bottom_joins_top: bool,
}

impl BlockLayout {
    fn placed(new_box: LayoutBox) -> Self {
        Self {
            new_box: Some(new_box),
            ..Self::default()
        }
    }

    fn aborted(page: Option<String>) -> Self {
        Self {
            next_page: NextPage {
                break_value: BreakValue::Auto,
                page,
            },
            ..Self::default()
        }
    }
}

/// [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS2/box.html#collapsing-margins)
///
/// "When two or more margins collapse, the resulting margin width is the
/// maximum of the collapsing margins' widths. In the case of negative
/// margins, the maximum of the absolute values of the negative adjoining
/// margins is deducted from the maximum of the positive adjoining margins.
/// If there are no positive margins, the maximum of the absolute values of
/// the adjoining margins is deducted from zero."
#[must_use]
pub fn collapse_margin(margins: &[f32]) -> f32 {
    let positive = margins.iter().copied().fold(0.0_f32, f32::max);
    let negative = margins.iter().copied().fold(0.0_f32, f32::min);
    positive + negative
}

/// Lay out a block-level `child` whose margin box starts at `position`.
///
/// `adjoining_margins` are the margins collapsing with the child's top
/// margin. `page_is_empty` tells whether anything was already placed on
/// the page: an empty page always accepts its first unit of content.
pub(crate) fn block_level_layout(
    ctx: &mut LayoutContext<'_>,
    child: &LayoutBox,
    position: (f32, f32),
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    page_is_empty: bool,
    mut adjoining_margins: Vec<f32>,
    discard: bool,
) -> BlockLayout {
    #[cfg(feature = "layout-trace")]
    {
        ctx.depth += 1;
        trace!(
            "{:indent$}[BLOCK] {} at ({}, {}) bottom_space={} skip={:?}",
            "",
            child.label(),
            position.0,
            position.1,
            bottom_space,
            skip_stack,
            indent = ctx.depth * 2
        );
    }

    let mut prepared = child.copy_with_children(Vec::new());
    prepared.position_x = position.0;
    prepared.position_y = position.1;
    let mut cleared = false;

    if !matches!(prepared.kind, BoxKind::Table(TableRole::Table(_))) {
        resolve_percentages(&mut prepared, ContainingBlock::of(containing_block));

        // [§ 5.5 Adjoining Margins at breaks](https://www.w3.org/TR/css-break-4/#break-margins)
        if ctx.current_page > 1 && page_is_empty {
            match prepared.style.margin_break {
                MarginBreak::Discard => prepared.margin.top = 0.0,
                MarginBreak::Auto if !ctx.forced_break => prepared.margin.top = 0.0,
                MarginBreak::Auto | MarginBreak::Keep => {}
            }
        }

        let mut margins = adjoining_margins.clone();
        margins.push(prepared.margin.top);
        let collapsed_margin = collapse_margin(&margins);
        if let Some(clearance) = get_clearance(ctx, &prepared, collapsed_margin) {
            let top_border_edge = prepared.position_y + collapsed_margin + clearance;
            prepared.position_y = top_border_edge - prepared.margin.top;
            prepared.clearance = Some(clearance);
            adjoining_margins = Vec::new();
            cleared = true;
        }
    }

    let mut layout = block_level_layout_switch(
        ctx,
        prepared,
        child,
        bottom_space,
        skip_stack,
        containing_block,
        page_is_empty,
        adjoining_margins,
        discard,
    );
    if cleared {
        layout.top_margins = None;
        layout.bottom_joins_top = false;
    }

    #[cfg(feature = "layout-trace")]
    {
        trace!(
            "{:indent$}[BLOCK] {} -> {} resume={:?}",
            "",
            child.label(),
            layout
                .new_box
                .as_ref()
                .map_or_else(
                    || "none".to_string(),
                    |b| format!("height {}", b.margin_height()),
                ),
            layout.resume_at,
            indent = ctx.depth * 2
        );
        ctx.depth -= 1;
    }
    layout
}

fn block_level_layout_switch(
    ctx: &mut LayoutContext<'_>,
    mut prepared: LayoutBox,
    source: &LayoutBox,
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    page_is_empty: bool,
    adjoining_margins: Vec<f32>,
    discard: bool,
) -> BlockLayout {
    if matches!(prepared.kind, BoxKind::Table(TableRole::Table(_))) {
        table_layout(
            ctx,
            prepared,
            &source.children,
            bottom_space,
            skip_stack,
            containing_block,
            page_is_empty,
        )
    } else if matches!(
        prepared.kind,
        BoxKind::BlockContainer | BoxKind::Table(TableRole::Wrapper | TableRole::Caption)
    ) {
        block_box_layout(
            ctx,
            prepared,
            source,
            bottom_space,
            skip_stack,
            containing_block,
            page_is_empty,
            adjoining_margins,
            discard,
        )
    } else if matches!(prepared.kind, BoxKind::Replaced(_)) {
        block_replaced_box_layout(ctx, prepared, containing_block)
    } else if matches!(prepared.kind, BoxKind::Flex) {
        block_level_width(&mut prepared, containing_block);
        BlockLayout::placed(flex_layout(ctx, prepared, &source.children))
    } else {
        unreachable!("no block-level layout for {:?}", prepared.kind)
    }
}

/// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
fn block_box_layout(
    ctx: &mut LayoutContext<'_>,
    mut prepared: LayoutBox,
    source: &LayoutBox,
    mut bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    page_is_empty: bool,
    adjoining_margins: Vec<f32>,
    discard: bool,
) -> BlockLayout {
    if prepared.style.is_multicol() {
        let layout = columns_layout(
            ctx,
            prepared.clone(),
            &source.children,
            bottom_space,
            skip_stack,
            containing_block,
            page_is_empty,
            adjoining_margins.clone(),
        );
        // Bottom decorations of a complete multicol box must fit too.
        if layout.resume_at.is_none()
            && let Some(new_box) = &layout.new_box
        {
            let decorations =
                new_box.margin.bottom + new_box.padding.bottom + new_box.border.bottom;
            let bottom = new_box.position_y + new_box.margin_height();
            if decorations > 0.0 && ctx.overflows_page(bottom_space, bottom) {
                ctx.remove_placeholders(std::slice::from_ref(new_box));
                bottom_space += decorations;
                return columns_layout(
                    ctx,
                    prepared,
                    &source.children,
                    bottom_space,
                    skip_stack,
                    containing_block,
                    page_is_empty,
                    adjoining_margins,
                );
            }
        }
        return layout;
    }

    if prepared.is_table_wrapper() {
        let cb = ContainingBlock::of(containing_block);
        table_wrapper_width(ctx, &mut prepared, &source.children, cb);
    }
    block_level_width(&mut prepared, containing_block);

    let mut layout = block_container_layout(
        ctx,
        prepared,
        &source.children,
        bottom_space,
        skip_stack,
        page_is_empty,
        adjoining_margins,
        discard,
    );
    if let Some(new_box) = &mut layout.new_box
        && new_box.is_table_wrapper()
    {
        // Table wrappers do not overlap floats.
        let (position_x, position_y, _) = avoid_collisions(ctx, new_box, containing_block, false);
        new_box.translate(
            position_x - new_box.position_x,
            position_y - new_box.position_y,
        );
    }
    layout
}

/// [§ 10.3.3](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
///
/// "The following constraints must hold among the used values of the
/// other properties: 'margin-left' + 'border-left-width' + 'padding-left'
/// + 'width' + 'padding-right' + 'border-right-width' + 'margin-right' =
/// width of containing block"
///
/// Then [§ 10.4](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths):
/// the tentative width is compared to 'max-width' and 'min-width', and the
/// rules are applied again with the clamped value as the computed width.
pub(crate) fn block_level_width(layout_box: &mut LayoutBox, containing_block: &LayoutBox) {
    let cb_width = containing_block.content_width();
    let rtl = containing_block.style.direction == Direction::Rtl;
    let saved_margin = layout_box.margin;
    let saved_width = layout_box.width;

    resolve_block_width(layout_box, cb_width, rtl);
    if layout_box.content_width() > layout_box.max_width {
        layout_box.margin = saved_margin;
        layout_box.width = AutoOr::Length(layout_box.max_width);
        resolve_block_width(layout_box, cb_width, rtl);
    }
    if layout_box.content_width() < layout_box.min_width {
        layout_box.margin = saved_margin;
        layout_box.width = AutoOr::Length(layout_box.min_width);
        resolve_block_width(layout_box, cb_width, rtl);
    }
    if saved_width.is_auto() {
        trace!(
            "{} auto width resolved to {}",
            layout_box.label(),
            layout_box.content_width()
        );
    }
}

fn resolve_block_width(layout_box: &mut LayoutBox, cb_width: f32, rtl: bool) {
    let style = &layout_box.style;
    let mut margin_left = (!style.margin_left.is_auto()).then_some(layout_box.margin.left);
    let mut margin_right = (!style.margin_right.is_auto()).then_some(layout_box.margin.right);
    let decorations = layout_box.padding.horizontal() + layout_box.border.horizontal();

    // "If 'width' is not 'auto' and 'border-left-width' + [...] (plus any
    // of 'margin-left' or 'margin-right' that are not 'auto') is larger
    // than the width of the containing block, then any 'auto' values for
    // 'margin-left' or 'margin-right' are, for the following rules,
    // treated as zero."
    let width = match layout_box.width {
        AutoOr::Length(width) => {
            let margins = margin_left.unwrap_or(0.0) + margin_right.unwrap_or(0.0);
            if decorations + width + margins > cb_width {
                margin_left = margin_left.or(Some(0.0));
                margin_right = margin_right.or(Some(0.0));
            }
            width
        }
        // "If 'width' is set to 'auto', any other 'auto' values become '0'
        // and 'width' follows from the resulting equality."
        AutoOr::Auto => {
            let left = *margin_left.get_or_insert(0.0);
            let right = *margin_right.get_or_insert(0.0);
            cb_width - decorations - left - right
        }
    };

    let margin_sum = cb_width - decorations - width;
    let (left, right) = match (margin_left, margin_right) {
        // "If both 'margin-left' and 'margin-right' are 'auto', their used
        // values are equal."
        (None, None) => (margin_sum / 2.0, margin_sum / 2.0),
        (None, Some(right)) => (margin_sum - right, right),
        (Some(left), None) => (left, margin_sum - left),
        // Over-constrained: the end margin gives way.
        (Some(_), Some(right)) if rtl => (margin_sum - right, right),
        (Some(left), Some(_)) => (left, margin_sum - left),
    };
    layout_box.width = AutoOr::Length(width);
    layout_box.margin.left = left;
    layout_box.margin.right = right;
}

/// [§ 10.3.4 Block-level, replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#block-replaced-width)
///
/// "The used value of 'width' is determined as for inline replaced
/// elements. Then the rules for non-replaced block-level elements are
/// applied to determine the margins."
fn block_replaced_box_layout(
    ctx: &LayoutContext<'_>,
    mut prepared: LayoutBox,
    containing_block: &LayoutBox,
) -> BlockLayout {
    replaced_box_width_height(&mut prepared, ContainingBlock::of(containing_block));
    resolve_block_width(
        &mut prepared,
        containing_block.content_width(),
        containing_block.style.direction == Direction::Rtl,
    );
    let (position_x, position_y, _) = avoid_collisions(ctx, &prepared, containing_block, false);
    prepared.position_x = position_x;
    prepared.position_y = position_y;
    BlockLayout::placed(prepared)
}

/// What happened to the children loop after one child.
#[derive(Debug, Default)]
struct ChildOutcome {
    abort: bool,
    stop: bool,
    resume_at: Option<SkipStack>,
}

/// Lay out the children of a block container.
///
/// `prepared` has its used box-model values and position set; `children`
/// are its children before layout.
pub(crate) fn block_container_layout(
    ctx: &mut LayoutContext<'_>,
    mut prepared: LayoutBox,
    children: &[LayoutBox],
    mut bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    page_is_empty: bool,
    adjoining_margins: Vec<f32>,
    discard: bool,
) -> BlockLayout {
    let establishes_context = prepared.establishes_formatting_context();
    if establishes_context {
        ctx.create_block_formatting_context();
    }

    let is_start = skip_stack.is_none();
    prepared.remove_decoration(!is_start, false);
    prepared.is_start = is_start;

    let mut draw_bottom_decoration =
        discard || prepared.style.box_decoration_break == BoxDecorationBreak::Clone;
    if draw_bottom_decoration {
        bottom_space += prepared.padding.bottom + prepared.border.bottom + prepared.margin.bottom;
    }

    let is_root = ctx.root_id == Some(prepared.id);
    let mut top_margins = adjoining_margins;
    top_margins.push(prepared.margin.top);

    let collapsing_with_children = prepared.border.top == 0.0
        && prepared.padding.top == 0.0
        && !establishes_context
        && !is_root;
    let mut top_resolved = false;
    let (mut adjoining_margins, mut joined, mut position_y) = if collapsing_with_children {
        (top_margins.clone(), true, prepared.position_y)
    } else {
        prepared.position_y += collapse_margin(&top_margins) - prepared.margin.top;
        (Vec::new(), false, prepared.content_box_y())
    };
    let position_x = prepared.content_box_x();

    // Absolutely positioned descendants wait for this box to be sized.
    let outer_absolute = prepared
        .style
        .is_absolute_containing_block()
        .then(|| mem::take(&mut ctx.absolute_boxes));

    let mut new_children: Vec<LayoutBox> = Vec::new();
    let mut next_page = NextPage::default();
    let (skip, mut nested_skip) = SkipStack::split(skip_stack);
    let mut resume_at = None;

    for (index, child) in children.iter().enumerate().skip(skip) {
        let child_skip = nested_skip.take();

        let outcome = if !child.is_in_normal_flow() {
            out_of_flow_layout(
                ctx,
                &prepared,
                index,
                child,
                &mut new_children,
                page_is_empty,
                (position_x, position_y + collapse_margin(&adjoining_margins)),
                bottom_space,
            )
        } else if child.is_line() {
            let outcome = linebox_layout(
                ctx,
                &mut prepared,
                index,
                child,
                &mut new_children,
                page_is_empty,
                &adjoining_margins,
                bottom_space,
                &mut position_y,
                child_skip,
                draw_bottom_decoration,
            );
            draw_bottom_decoration |= outcome.resume_at.is_none();
            adjoining_margins = Vec::new();
            joined = false;
            outcome
        } else {
            let last_in_flow = new_children.iter().rev().find(|c| c.is_in_normal_flow());

            // Between in-flow siblings: forced breaks and page name changes.
            let page_break =
                last_in_flow.map_or(BreakValue::Auto, |last| block_level_page_break(last, child));
            if let Some(last) = last_in_flow {
                let page_name_changes = end_page_name(last) != start_page_name(child);
                if page_name_changes || is_forced_break(page_break, ctx) {
                    debug!(
                        "forced break before {} (break {page_break:?}, page {:?})",
                        child.label(),
                        start_page_name(child)
                    );
                    next_page = NextPage {
                        break_value: if is_forced_break(page_break, ctx) {
                            page_break
                        } else {
                            BreakValue::Page
                        },
                        page: start_page_name(child).map(str::to_string),
                    };
                    resume_at = Some(SkipStack::leaf(index));
                    break;
                }
            }

            // Clearance on the first in-flow child separates this box's
            // top margin from the child's.
            if last_in_flow.is_none()
                && collapsing_with_children
                && child.style.clear != Clear::None
            {
                let child_margin_top = match child.style.margin_top {
                    AutoLength::Auto => 0.0,
                    AutoLength::Length(len) => len.resolve(prepared.content_width()),
                };
                let mut with_child = adjoining_margins.clone();
                with_child.push(child_margin_top);
                let hypothetical = position_y + collapse_margin(&with_child);
                if clearance_at(ctx, child.style.clear, hypothetical).is_some() {
                    prepared.position_y +=
                        collapse_margin(&adjoining_margins) - prepared.margin.top;
                    adjoining_margins = Vec::new();
                    joined = false;
                    top_resolved = true;
                    position_y = prepared.content_box_y();
                }
            }

            if !adjoining_margins.is_empty() && prepared.is_table_wrapper() {
                position_y += collapse_margin(&adjoining_margins);
                adjoining_margins = Vec::new();
                joined = false;
            }

            let page_is_empty_with_no_children =
                page_is_empty && new_children.iter().all(LayoutBox::is_absolutely_positioned);

            in_flow_layout(
                ctx,
                &prepared,
                index,
                child,
                &mut new_children,
                page_is_empty,
                page_is_empty_with_no_children,
                page_break,
                &mut InFlowState {
                    adjoining_margins: &mut adjoining_margins,
                    top_margins: &mut top_margins,
                    joined: &mut joined,
                    position_y: &mut position_y,
                    next_page: &mut next_page,
                },
                (position_x, bottom_space),
                child_skip.as_ref(),
                discard,
            )
        };

        if outcome.abort {
            debug!(
                "abandoning {} on page {}",
                prepared.label(),
                ctx.current_page
            );
            ctx.remove_placeholders(&new_children);
            if let Some(outer) = outer_absolute {
                ctx.absolute_boxes = outer;
            }
            if establishes_context {
                ctx.abandon_block_formatting_context();
            }
            return BlockLayout::aborted(start_page_name(child).map(str::to_string));
        }
        if outcome.stop {
            resume_at = outcome.resume_at;
            break;
        }
    }

    let box_is_fragmented = resume_at.is_some();
    if box_is_fragmented && avoid_break_inside(prepared.style.break_inside, ctx) && !page_is_empty {
        debug!(
            "break-inside: avoid pushes {} to the next page",
            prepared.label()
        );
        ctx.remove_placeholders(&new_children);
        if let Some(outer) = outer_absolute {
            ctx.absolute_boxes = outer;
        }
        if establishes_context {
            ctx.abandon_block_formatting_context();
        }
        return BlockLayout::aborted(None);
    }

    if collapsing_with_children && !top_resolved {
        prepared.position_y += collapse_margin(&top_margins) - prepared.margin.top;
    }

    let mut collapsing_through = false;
    let has_in_flow_child = new_children.iter().any(LayoutBox::is_in_normal_flow);
    if has_in_flow_child {
        // The bottom margin of the last child and the bottom margin of this
        // box are not adjoining when the height is fixed.
        if !prepared.height.is_auto() {
            adjoining_margins = Vec::new();
            joined = false;
        }
    } else {
        let collapsed_margin = collapse_margin(&adjoining_margins);
        let no_height = prepared.height.length().is_none_or(|height| height == 0.0);
        if no_height
            && get_clearance(ctx, &prepared, collapsed_margin).is_none()
            && prepared.min_height == 0.0
            && prepared.border.top == 0.0
            && prepared.padding.top == 0.0
            && prepared.border.bottom == 0.0
            && prepared.padding.bottom == 0.0
        {
            collapsing_through = true;
        } else {
            position_y += collapsed_margin;
            adjoining_margins = Vec::new();
            joined = false;
        }
    }

    if prepared.border.bottom != 0.0
        || prepared.padding.bottom != 0.0
        || establishes_context
        || is_root
        || prepared.is_table_wrapper()
    {
        position_y += collapse_margin(&adjoining_margins);
        adjoining_margins = Vec::new();
        joined = false;
    }

    let mut new_box = prepared.copy_with_children(new_children);
    new_box.remove_decoration(!is_start, box_is_fragmented && !discard);
    new_box.is_end = !box_is_fragmented;

    if new_box.height.is_auto() {
        if new_box.style.overflow != Overflow::Visible {
            let floats_bottom = ctx
                .excluded_shapes()
                .iter()
                .map(|shape| shape.rect.bottom())
                .fold(position_y, f32::max);
            position_y = floats_bottom;
        }
        new_box.height = AutoOr::Length(position_y - new_box.content_box_y());
    }

    if let Some(outer) = outer_absolute {
        let own = mem::replace(&mut ctx.absolute_boxes, outer);
        resolve_absolute_boxes(ctx, &mut new_box, &own);
    }

    let cb = ContainingBlock {
        width: new_box.content_width(),
        height: new_box.height.length(),
    };
    for child in &mut new_box.children {
        relative_positioning(child, cb);
    }

    if establishes_context {
        ctx.finish_block_formatting_context(&mut new_box);
    }

    if discard || !box_is_fragmented {
        let height = clamp(
            new_box.content_height(),
            new_box.min_height,
            new_box.max_height,
        );
        new_box.height = AutoOr::Length(height);
    } else if bottom_space > f32::NEG_INFINITY && new_box.style.height.is_auto() {
        // [§ 5.3 Adjusting the box model](https://www.w3.org/TR/css-break-3/#box-splitting)
        //
        // A fragmented box fills the remaining space of the page.
        let mut fill = ctx.page_bottom
            - ctx.footnote_area.height
            - bottom_space
            - new_box.position_y
            - (new_box.margin_height() - new_box.content_height());
        if draw_bottom_decoration {
            fill += prepared.padding.bottom + prepared.border.bottom + prepared.margin.bottom;
        }
        new_box.height = AutoOr::Length(new_box.content_height().max(fill));
    }

    if next_page.page.is_none() {
        next_page.page = end_page_name(&new_box).map(str::to_string);
    }

    BlockLayout {
        new_box: Some(new_box),
        resume_at,
        next_page,
        adjoining_margins,
        collapsing_through,
        top_margins: Some(top_margins),
        bottom_joins_top: joined,
    }
}

/// Replace the absolute placeholders listed in `ids` found in `root` by
/// their laid out boxes, using the padding box of `root` as containing
/// block.
pub(crate) fn resolve_absolute_boxes(
    ctx: &mut LayoutContext<'_>,
    root: &mut LayoutBox,
    ids: &[BoxId],
) {
    let containing_block = root.padding_box();
    for &id in ids {
        let Some(placeholder) = root.find_mut(id) else {
            continue;
        };
        let laid_out = absolute_layout(ctx, placeholder, containing_block);
        *placeholder = laid_out;
    }
}

/// Floats, absolutely positioned boxes and footnotes met among the
/// children of a block container.
fn out_of_flow_layout(
    ctx: &mut LayoutContext<'_>,
    parent: &LayoutBox,
    index: usize,
    child: &LayoutBox,
    new_children: &mut Vec<LayoutBox>,
    page_is_empty: bool,
    position: (f32, f32),
    bottom_space: f32,
) -> ChildOutcome {
    if child.is_absolutely_positioned() {
        // The placeholder keeps the whole box: it is laid out once its
        // containing block is known.
        let mut placeholder = child.clone();
        placeholder.index = index;
        placeholder.translate(position.0 - child.position_x, position.1 - child.position_y);
        if child.style.position == Position::Fixed {
            ctx.fixed_boxes.push(child.id);
        } else {
            ctx.absolute_boxes.push(child.id);
        }
        new_children.push(placeholder);
        return ChildOutcome::default();
    }

    if child.is_footnote() {
        let footnote = layout_footnote(ctx, child);
        let first_on_page = page_is_empty && new_children.is_empty();
        place_footnote(ctx, footnote, bottom_space, position.1, first_on_page);
        new_children.push(footnote_placeholder(child, position, index));
        return ChildOutcome::default();
    }

    let (mut new_float, float_resume_at) =
        float_layout(ctx, child, position, parent, bottom_space, None);
    let float_bottom = new_float.border_box_y() + new_float.border_height();
    if (page_is_empty && new_children.is_empty())
        || !ctx.overflows_page(bottom_space, float_bottom)
    {
        new_float.index = index;
        if let Some(resume_at) = float_resume_at {
            ctx.broken_out_of_flow.push(BrokenOutOfFlow {
                original: child.clone(),
                resume_at,
                position_x: new_float.position_x,
            });
        }
        new_children.push(new_float);
        return ChildOutcome::default();
    }

    debug!("float {} does not fit, breaking before it", child.label());
    ctx.remove_placeholders(std::slice::from_ref(&new_float));
    let page_break = new_children
        .iter()
        .rev()
        .find(|c| c.is_in_normal_flow())
        .map_or(BreakValue::Auto, |last| block_level_page_break(last, child));
    let mut resume_at = Some(SkipStack::leaf(index));
    if !new_children.is_empty()
        && avoid_page_break(page_break, ctx)
        && let Some(earlier) = find_earlier_page_break(ctx, new_children)
    {
        resume_at = Some(earlier);
    }
    ChildOutcome {
        abort: false,
        stop: true,
        resume_at,
    }
}

/// The zero-sized box left in the flow where a footnote was called.
fn footnote_placeholder(footnote: &LayoutBox, position: (f32, f32), index: usize) -> LayoutBox {
    let mut placeholder = footnote.copy_with_children(Vec::new());
    placeholder.index = index;
    placeholder.position_x = position.0;
    placeholder.position_y = position.1;
    placeholder.width = AutoOr::Length(0.0);
    placeholder.height = AutoOr::Length(0.0);
    placeholder.margin = EdgeSizes::default();
    placeholder.padding = EdgeSizes::default();
    placeholder.border = EdgeSizes::default();
    placeholder
}

/// [§ 2.2 The footnote area](https://www.w3.org/TR/css-gcpm-3/#footnote-area)
///
/// Lay out a footnote body at the footnote area width, with its top-left
/// corner at the origin. The page moves it into the area later.
pub(crate) fn layout_footnote(ctx: &mut LayoutContext<'_>, footnote: &LayoutBox) -> LayoutBox {
    let mut area = LayoutBox::anonymous_from(
        footnote,
        BoxKind::BlockContainer,
        OuterDisplay::Block,
        Vec::new(),
    );
    area.width = AutoOr::Length(ctx.footnote_width);

    let outer_absolute = mem::take(&mut ctx.absolute_boxes);
    ctx.create_block_formatting_context();
    let layout = block_level_layout(
        ctx,
        footnote,
        (0.0, 0.0),
        f32::NEG_INFINITY,
        None,
        &area,
        false,
        Vec::new(),
        false,
    );
    ctx.abandon_block_formatting_context();
    let own = mem::replace(&mut ctx.absolute_boxes, outer_absolute);

    let mut laid_out = layout.new_box.unwrap_or_else(|| {
        let mut empty = footnote.copy_with_children(Vec::new());
        empty.height = AutoOr::Length(0.0);
        empty
    });
    resolve_absolute_boxes(ctx, &mut laid_out, &own);
    laid_out
}

/// Put a laid out footnote in the footnote area if the flow content above
/// `flow_bottom` still fits, or defer it to the next page.
pub(crate) fn place_footnote(
    ctx: &mut LayoutContext<'_>,
    footnote: LayoutBox,
    bottom_space: f32,
    flow_bottom: f32,
    force: bool,
) {
    let fits = ctx.overflowed_footnotes.is_empty()
        && !ctx.overflows_page(bottom_space + footnote.margin_height(), flow_bottom);
    if fits || force {
        trace!("footnote {} on page {}", footnote.id, ctx.current_page);
        ctx.report_footnote(footnote);
    } else {
        debug!("footnote {} deferred to the next page", footnote.id);
        ctx.overflowed_footnotes.push(footnote);
    }
}

/// Lay out the lines of a block container holding inline content.
fn linebox_layout(
    ctx: &mut LayoutContext<'_>,
    parent: &mut LayoutBox,
    index: usize,
    line: &LayoutBox,
    new_children: &mut Vec<LayoutBox>,
    page_is_empty: bool,
    adjoining_margins: &[f32],
    bottom_space: f32,
    position_y: &mut f32,
    skip_stack: Option<SkipStack>,
    draw_bottom_decoration: bool,
) -> ChildOutcome {
    if !adjoining_margins.is_empty() {
        *position_y += collapse_margin(adjoining_margins);
    }
    let orphans = parent.style.orphans as usize;
    let widows = parent.style.widows as usize;
    let mut lines = LineBoxes::new(line, parent, *position_y, bottom_space, skip_stack);
    let lines_before = new_children.len();

    while let Some((mut new_line, line_resume_at)) = lines.next_line(ctx) {
        new_line.resume_at.clone_from(&line_resume_at);
        new_line.index = index;
        let mut new_position_y = new_line.position_y + new_line.content_height();

        // The last line carries the bottom padding and border of the box.
        let offset_y = if line_resume_at.is_none() && !draw_bottom_decoration {
            parent.border.bottom + parent.padding.bottom
        } else {
            0.0
        };

        let placed = new_children.len() - lines_before;
        let overflow = (placed > 0 || !page_is_empty)
            && ctx.overflows_page(bottom_space, new_position_y + offset_y);
        if overflow {
            ctx.remove_placeholders(std::slice::from_ref(&new_line));
            return break_lines(
                ctx,
                &mut lines,
                new_children,
                lines_before,
                index,
                page_is_empty,
                orphans,
                widows,
            );
        }
        if page_is_empty && placed == 0 && ctx.overflows_page(bottom_space, new_position_y) {
            // A first line taller than the page: drop the top margin so it
            // fits as well as it can.
            new_position_y -= parent.margin.top;
            new_line.translate(0.0, -parent.margin.top);
            lines.translate(-parent.margin.top);
            parent.margin.top = 0.0;
        }

        layout_line_footnotes(
            ctx,
            &mut new_line,
            bottom_space,
            new_position_y + offset_y,
            page_is_empty && placed == 0,
        );

        new_children.push(new_line);
        *position_y = new_position_y;
    }
    ChildOutcome::default()
}

/// [§ 3.3 Breaks Between Lines: orphans, widows](https://www.w3.org/TR/css-break-3/#widows-orphans)
///
/// The line after the lines already placed does not fit. Decide how many
/// lines stay on this page, or abort the whole box.
fn break_lines(
    ctx: &mut LayoutContext<'_>,
    lines: &mut LineBoxes<'_>,
    new_children: &mut Vec<LayoutBox>,
    lines_before: usize,
    index: usize,
    page_is_empty: bool,
    orphans: usize,
    widows: usize,
) -> ChildOutcome {
    let placed = new_children.len() - lines_before;
    // Lines that may move to the next page without breaking orphans.
    let Some(spare) = placed.checked_sub(orphans).or(page_is_empty.then_some(0)) else {
        debug!("{placed} line(s) left for orphans={orphans}, moving the box");
        return ChildOutcome {
            abort: true,
            ..ChildOutcome::default()
        };
    };

    // Lines needed after this one to satisfy widows; the overflowing line
    // counts as one.
    let mut needed = widows.saturating_sub(1);
    let mut lookahead = Vec::new();
    while needed > 0 {
        let Some((next, _)) = lines.next_line(ctx) else {
            break;
        };
        lookahead.push(next);
        needed -= 1;
    }
    ctx.remove_placeholders(&lookahead);

    if needed > spare && !page_is_empty {
        debug!("not enough lines for orphans={orphans} and widows={widows}, moving the box");
        return ChildOutcome {
            abort: true,
            ..ChildOutcome::default()
        };
    }
    if needed > 0 && needed <= spare {
        let keep = new_children.len() - needed;
        ctx.remove_placeholders(&new_children[keep..]);
        new_children.truncate(keep);
    }

    let last_resume = new_children
        .last()
        .filter(|_| new_children.len() > lines_before)
        .and_then(|last| last.resume_at.clone());
    ChildOutcome {
        abort: false,
        stop: true,
        resume_at: Some(SkipStack::new(index, last_resume)),
    }
}

/// Lay out the footnotes called from a line that stays on the page.
fn layout_line_footnotes(
    ctx: &mut LayoutContext<'_>,
    line: &mut LayoutBox,
    bottom_space: f32,
    flow_bottom: f32,
    force: bool,
) {
    let calls: Vec<LayoutBox> = line
        .descendants()
        .skip(1)
        .filter(|d| d.is_footnote() && !d.children.is_empty())
        .cloned()
        .collect();
    for call in calls {
        let footnote = layout_footnote(ctx, &call);
        place_footnote(ctx, footnote, bottom_space, flow_bottom, force);
        if let Some(placeholder) = line.find_mut(call.id) {
            placeholder.children.clear();
        }
    }
}

/// Mutable state of the children loop shared with [`in_flow_layout`].
struct InFlowState<'s> {
    adjoining_margins: &'s mut Vec<f32>,
    top_margins: &'s mut Vec<f32>,
    joined: &'s mut bool,
    position_y: &'s mut f32,
    next_page: &'s mut NextPage,
}

/// A block-level child in normal flow.
fn in_flow_layout(
    ctx: &mut LayoutContext<'_>,
    parent: &LayoutBox,
    index: usize,
    child: &LayoutBox,
    new_children: &mut Vec<LayoutBox>,
    page_is_empty: bool,
    page_is_empty_with_no_children: bool,
    page_break: BreakValue,
    state: &mut InFlowState<'_>,
    (position_x, mut bottom_space): (f32, f32),
    skip_stack: Option<&SkipStack>,
    discard: bool,
) -> ChildOutcome {
    let position = (position_x, *state.position_y);
    let mut layout = block_level_layout(
        ctx,
        child,
        position,
        bottom_space,
        skip_stack,
        parent,
        page_is_empty_with_no_children,
        state.adjoining_margins.clone(),
        discard,
    );
    collapse_own_top_margin(&mut layout, state.adjoining_margins);

    if let Some(new_child) = &layout.new_box
        && !layout.collapsing_through
    {
        let content_bottom = new_child.content_box_y() + new_child.content_height();
        let border_bottom = new_child.border_box_y() + new_child.border_height();
        let can_break = !(page_is_empty_with_no_children || parent.is_monolithic());
        if can_break && ctx.overflows_page(bottom_space, content_bottom) {
            // The content overflows the page: push the child to the next one.
            ctx.remove_placeholders(std::slice::from_ref(new_child));
            layout.new_box = None;
        } else if can_break && ctx.overflows_page(bottom_space, border_bottom) {
            // Only the bottom decorations overflow: make room for them.
            bottom_space += new_child.padding.bottom + new_child.border.bottom;
            ctx.remove_placeholders(std::slice::from_ref(new_child));
            layout = block_level_layout(
                ctx,
                child,
                position,
                bottom_space,
                skip_stack,
                parent,
                page_is_empty_with_no_children,
                state.adjoining_margins.clone(),
                discard,
            );
            collapse_own_top_margin(&mut layout, state.adjoining_margins);
        }
    }

    let Some(mut new_child) = layout.new_box.take() else {
        return nothing_fits(ctx, new_children, index, page_is_empty, page_break);
    };

    if !collapses_own_margins(&new_child) {
        state.adjoining_margins.push(new_child.margin.top);
        if *state.joined {
            state.top_margins.push(new_child.margin.top);
        }
    }

    if *state.joined && let Some(top) = layout.top_margins.take() {
        *state.top_margins = top;
    }

    if !layout.collapsing_through || new_child.clearance.is_some() {
        *state.position_y = new_child.border_box_y() + new_child.border_height();
    }

    *state.adjoining_margins = mem::take(&mut layout.adjoining_margins);
    state.adjoining_margins.push(new_child.margin.bottom);
    *state.joined = *state.joined && layout.bottom_joins_top;
    if *state.joined {
        state.top_margins.clone_from(state.adjoining_margins);
    }
    *state.next_page = layout.next_page;

    new_child.index = index;
    new_children.push(new_child);
    match layout.resume_at {
        Some(resume_at) => ChildOutcome {
            abort: false,
            stop: true,
            resume_at: Some(SkipStack::new(index, Some(resume_at))),
        },
        None => ChildOutcome::default(),
    }
}

/// Block containers and tables place themselves below the collapsed
/// margins; other block-level boxes are moved by their parent.
fn collapses_own_margins(layout_box: &LayoutBox) -> bool {
    layout_box.is_block_container()
        || matches!(
            layout_box.kind,
            BoxKind::Table(TableRole::Wrapper | TableRole::Table(_))
        )
}

fn collapse_own_top_margin(layout: &mut BlockLayout, adjoining_margins: &[f32]) {
    if let Some(new_child) = &mut layout.new_box
        && !collapses_own_margins(new_child)
    {
        let mut margins = adjoining_margins.to_vec();
        margins.push(new_child.margin.top);
        let offset_y = collapse_margin(&margins) - new_child.margin.top;
        new_child.translate(0.0, offset_y);
    }
}

/// The in-flow child at `index` did not fit at all.
fn nothing_fits(
    ctx: &mut LayoutContext<'_>,
    new_children: &mut Vec<LayoutBox>,
    index: usize,
    page_is_empty: bool,
    page_break: BreakValue,
) -> ChildOutcome {
    if avoid_page_break(page_break, ctx) {
        if let Some(resume_at) = find_earlier_page_break(ctx, new_children) {
            debug!("break avoided, resuming earlier at {resume_at}");
            return ChildOutcome {
                abort: false,
                stop: true,
                resume_at: Some(resume_at),
            };
        }
        if !page_is_empty {
            return ChildOutcome {
                abort: true,
                ..ChildOutcome::default()
            };
        }
    }

    // Only absolute boxes were rendered: keep them for the next page.
    if new_children.iter().all(LayoutBox::is_absolutely_positioned) {
        ctx.remove_placeholders(new_children);
        new_children.clear();
    }

    if new_children.is_empty() {
        ChildOutcome {
            abort: true,
            ..ChildOutcome::default()
        }
    } else {
        ChildOutcome {
            abort: false,
            stop: true,
            resume_at: Some(SkipStack::leaf(index)),
        }
    }
}

/// [§ 4.4 Unforced Breaks](https://www.w3.org/TR/css-break-3/#unforced-breaks)
///
/// Search `children` backwards for the latest break point that is not
/// avoided. On success the children after the break are dropped (and
/// their placeholders forgotten) and the resume position, relative to the
/// parent of `children`, is returned.
pub(crate) fn find_earlier_page_break(
    ctx: &mut LayoutContext<'_>,
    children: &mut Vec<LayoutBox>,
) -> Option<SkipStack> {
    if let Some(first) = children.first()
        && first.is_line()
    {
        // Line boxes inherit orphans and widows from their block.
        let orphans = first.style.orphans as usize;
        let widows = first.style.widows as usize;
        let keep = children.len().checked_sub(widows)?;
        if keep < orphans || keep == 0 {
            return None;
        }
        let resume_at = SkipStack::new(0, children[keep - 1].resume_at.clone());
        ctx.remove_placeholders(&children[keep..]);
        children.truncate(keep);
        return Some(resume_at);
    }

    let mut previous_in_flow: Option<usize> = None;
    for index in (0..children.len()).rev() {
        let child = &children[index];
        if child.is_in_normal_flow() {
            if let Some(next) = previous_in_flow
                && !avoid_page_break(block_level_page_break(child, &children[next]), ctx)
            {
                let resume_at = SkipStack::leaf(children[next].index);
                ctx.remove_placeholders(&children[index + 1..]);
                children.truncate(index + 1);
                return Some(resume_at);
            }
            previous_in_flow = Some(index);
        }

        let breakable_parent = match &child.kind {
            BoxKind::BlockContainer => true,
            BoxKind::Table(role) => matches!(
                role,
                TableRole::Wrapper
                    | TableRole::Table(_)
                    | TableRole::RowGroup { .. }
                    | TableRole::Caption
            ),
            _ => false,
        };
        if child.is_in_normal_flow()
            && breakable_parent
            && !avoid_break_inside(child.style.break_inside, ctx)
        {
            let mut grand_children = children[index].children.clone();
            if let Some(nested) = find_earlier_page_break(ctx, &mut grand_children) {
                let original_index = children[index].index;
                ctx.remove_placeholders(&children[index + 1..]);
                children.truncate(index + 1);
                let split = &mut children[index];
                split.children = grand_children;
                split.is_end = false;
                split.remove_decoration(false, true);
                return Some(SkipStack::new(original_index, Some(nested)));
            }
        }
    }
    None
}

/// Rank of a break value when several apply at the same break point.
const fn break_rank(value: BreakValue) -> u8 {
    match value {
        BreakValue::Auto => 0,
        BreakValue::Avoid | BreakValue::AvoidPage | BreakValue::AvoidColumn => 1,
        BreakValue::Always | BreakValue::Page | BreakValue::Column => 2,
        BreakValue::Left | BreakValue::Right | BreakValue::Recto | BreakValue::Verso => 3,
    }
}

/// Whether `layout_box` takes part in the chain of boxes whose
/// break-before/break-after values meet at a block-level break point.
fn is_block_parallel(layout_box: &LayoutBox) -> bool {
    layout_box.is_block_level()
}

/// [§ 3.1 Breaks Between Boxes](https://www.w3.org/TR/css-break-3/#break-between)
///
/// "When multiple break values apply at the same break point, forced
/// break values override avoid values, and avoid values override auto."
/// Among directional values, the last one in tree order wins.
///
/// Values come from `before`, its last descendants, `after` and its first
/// descendants, which all meet at the break point.
#[must_use]
pub(crate) fn block_level_page_break(before: &LayoutBox, after: &LayoutBox) -> BreakValue {
    let mut before_values = Vec::new();
    let mut current = Some(before);
    while let Some(layout_box) = current.filter(|b| is_block_parallel(b)) {
        before_values.push(layout_box.style.break_after);
        current = layout_box.children.last();
    }
    before_values.reverse();

    let mut after_values = Vec::new();
    let mut current = Some(after);
    while let Some(layout_box) = current.filter(|b| is_block_parallel(b)) {
        after_values.push(layout_box.style.break_before);
        current = layout_box.children.first();
    }

    before_values
        .into_iter()
        .chain(after_values)
        .fold(BreakValue::Auto, |result, value| {
            if value.is_directional() || break_rank(value) > break_rank(result) {
                value
            } else {
                result
            }
        })
}

/// Whether a break value forces a break in the current fragmentation
/// context. Column breaks only force breaks between columns.
#[must_use]
pub(crate) fn is_forced_break(value: BreakValue, ctx: &LayoutContext<'_>) -> bool {
    match value {
        BreakValue::Column => ctx.in_column,
        value => value.is_forced(),
    }
}

/// Whether a break value avoids a break in the current fragmentation
/// context.
#[must_use]
pub(crate) fn avoid_page_break(value: BreakValue, ctx: &LayoutContext<'_>) -> bool {
    match value {
        BreakValue::Avoid | BreakValue::AvoidPage => true,
        BreakValue::AvoidColumn => ctx.in_column,
        _ => false,
    }
}

/// Same as [`avoid_page_break`] for `break-inside`.
#[must_use]
pub(crate) fn avoid_break_inside(value: BreakInside, ctx: &LayoutContext<'_>) -> bool {
    match value {
        BreakInside::Avoid | BreakInside::AvoidPage => true,
        BreakInside::AvoidColumn => ctx.in_column,
        BreakInside::Auto => false,
    }
}

/// [§ 3.1 Using named pages](https://www.w3.org/TR/css-page-3/#using-named-pages)
///
/// Start page value: the one of the first in-flow block-level child, or
/// the box's own.
#[must_use]
pub(crate) fn start_page_name(layout_box: &LayoutBox) -> Option<&str> {
    layout_box
        .children
        .iter()
        .find(|child| child.is_in_normal_flow() && child.is_block_level())
        .map_or_else(|| layout_box.style.page.as_deref(), start_page_name)
}

/// End page value: the one of the last in-flow block-level child, or the
/// box's own.
#[must_use]
pub(crate) fn end_page_name(layout_box: &LayoutBox) -> Option<&str> {
    layout_box
        .children
        .iter()
        .rev()
        .find(|child| child.is_in_normal_flow() && child.is_block_level())
        .map_or_else(|| layout_box.style.page.as_deref(), end_page_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_margin_of_zeros_is_zero() {
        assert_eq!(collapse_margin(&[]), 0.0);
        assert_eq!(collapse_margin(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_collapse_margin_mixed_signs() {
        assert_eq!(collapse_margin(&[3.0, -5.0, 2.0]), -2.0);
        assert_eq!(collapse_margin(&[10.0, -20.0, 5.0]), -10.0);
        assert_eq!(collapse_margin(&[-4.0, -7.0]), -7.0);
    }

    #[test]
    fn test_break_rank_order() {
        assert!(break_rank(BreakValue::Auto) < break_rank(BreakValue::Avoid));
        assert!(break_rank(BreakValue::Avoid) < break_rank(BreakValue::Page));
        assert!(break_rank(BreakValue::Page) < break_rank(BreakValue::Recto));
    }
}
