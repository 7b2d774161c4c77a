//! [CSS Multi-column Layout Module Level 1](https://www.w3.org/TR/css-multicol-1/)
//!
//! Columns are anonymous block formatting context roots sharing the
//! children of the multi-column box. Balancing re-lays the columns out at
//! growing heights until the content fits; `column-span` is not supported
//! and spanning children stay inside the columns.

use std::mem;
use std::rc::Rc;

use log::{debug, trace};

use crate::style::{ColumnFill, ComputedStyle, Direction, Display};

use super::block::{
    BlockLayout, NextPage, block_container_layout, block_level_width, collapse_margin,
    resolve_absolute_boxes,
};
use super::box_model::AutoOr;
use super::boxes::{BoxKind, LayoutBox};
use super::context::LayoutContext;
use super::percent::clamp;
use super::skip_stack::SkipStack;

/// Column count and used column width.
///
/// [§ 3.4 The pseudo-algorithm](https://www.w3.org/TR/css-multicol-1/#pseudo-algorithm)
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn column_geometry(
    available: f32,
    column_width: Option<f32>,
    column_count: Option<u32>,
    gap: f32,
) -> (u32, f32) {
    match (column_width, column_count) {
        (None, Some(count)) => {
            let count = count.max(1);
            let width = (available - (count - 1) as f32 * gap).max(0.0) / count as f32;
            (count, width)
        }
        (Some(width), count) => {
            let fitting = (((available + gap) / (width + gap)).floor() as u32).max(1);
            let count = count.map_or(fitting, |count| count.min(fitting).max(1));
            (count, (available + gap) / count as f32 - gap)
        }
        (None, None) => (1, available),
    }
}

/// An empty column at `position`, `width` wide.
fn column_box(multicol: &LayoutBox, width: f32, position: (f32, f32)) -> LayoutBox {
    let style = ComputedStyle::anonymous_from(&multicol.style, Display::FlowRoot);
    let mut column = LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new());
    column.width = AutoOr::Length(width);
    column.position_x = position.0;
    column.position_y = position.1;
    column
}

/// The bottom space that ends the page `height` below `top`.
fn bottom_space_at(ctx: &LayoutContext<'_>, top: f32, height: f32) -> f32 {
    ctx.page_bottom - ctx.footnote_area.height - top - height
}

/// Geometry shared by the layout passes of one multi-column box.
struct Columns<'c> {
    multicol: &'c LayoutBox,
    children: &'c [LayoutBox],
    count: u32,
    width: f32,
    gap: f32,
}

impl Columns<'_> {
    fn position(&self, index: u32) -> (f32, f32) {
        let multicol = self.multicol;
        let offset = index as f32 * (self.width + self.gap);
        let x = if multicol.style.direction == Direction::Rtl {
            multicol.content_box_x() + multicol.content_width() - offset - self.width
        } else {
            multicol.content_box_x() + offset
        };
        (x, multicol.content_box_y())
    }

    fn lay_out(
        &self,
        ctx: &mut LayoutContext<'_>,
        index: u32,
        bottom_space: f32,
        skip_stack: Option<&SkipStack>,
        page_is_empty: bool,
    ) -> BlockLayout {
        let column = column_box(self.multicol, self.width, self.position(index));
        block_container_layout(
            ctx,
            column,
            self.children,
            bottom_space,
            skip_stack,
            page_is_empty,
            Vec::new(),
            false,
        )
    }

    /// Height of the whole content laid out in a single column.
    fn content_height(
        &self,
        ctx: &mut LayoutContext<'_>,
        skip_stack: Option<&SkipStack>,
        page_is_empty: bool,
    ) -> f32 {
        let checkpoint = ctx.checkpoint();
        let layout = self.lay_out(ctx, 0, f32::NEG_INFINITY, skip_stack, page_is_empty);
        let height = layout.new_box.map_or(0.0, |column| {
            ctx.remove_placeholders(std::slice::from_ref(&column));
            column.margin_height()
        });
        ctx.rollback(checkpoint);
        height
    }

    /// Lay every column out at `height` and report how much more height
    /// the first content left over would need.
    fn trial_fill(
        &self,
        ctx: &mut LayoutContext<'_>,
        height: f32,
        skip_stack: Option<&SkipStack>,
        page_is_empty: bool,
    ) -> TrialFill {
        let checkpoint = ctx.checkpoint();
        let top = self.multicol.content_box_y();
        let bottom_space = bottom_space_at(ctx, top, height);
        let mut trial = TrialFill {
            lost_space: f32::INFINITY,
            ..TrialFill::default()
        };
        let mut column_skip = skip_stack.cloned();
        for index in 0..self.count {
            let layout = self.lay_out(
                ctx,
                index,
                bottom_space,
                column_skip.as_ref(),
                page_is_empty || index > 0,
            );
            let Some(column) = layout.new_box else {
                trial.break_page = true;
                break;
            };
            column_skip = layout.resume_at;

            let last_in_flow = column
                .children
                .iter()
                .rev()
                .find(|child| child.is_in_normal_flow());
            let (empty_space, next_box_height) = match (last_in_flow, &column_skip) {
                (Some(last), Some(resume_at)) => {
                    let consumed = last.position_y + last.margin_height() - top;
                    (height - consumed, self.next_box_height(ctx, resume_at))
                }
                (Some(last), None) => {
                    (height - (last.position_y + last.margin_height() - top), 0.0)
                }
                (None, _) => (0.0, 0.0),
            };
            // Rounding errors below one pixel are ignored: each iteration
            // adds at least that much.
            if next_box_height - empty_space > 1.0 {
                trial.lost_space = trial.lost_space.min(next_box_height - empty_space);
            }
            ctx.remove_placeholders(std::slice::from_ref(&column));
            if column_skip.is_none() {
                break;
            }
        }
        trial.rendered_all = column_skip.is_none() && !trial.break_page;
        ctx.rollback(checkpoint);
        trial
    }

    /// Height of the first in-flow box left over at `resume_at`.
    fn next_box_height(&self, ctx: &mut LayoutContext<'_>, resume_at: &SkipStack) -> f32 {
        let layout = self.lay_out(ctx, 0, f32::INFINITY, Some(resume_at), true);
        layout.new_box.map_or(0.0, |column| {
            ctx.remove_placeholders(std::slice::from_ref(&column));
            column
                .children
                .iter()
                .find(|child| child.is_in_normal_flow())
                .map_or(0.0, LayoutBox::margin_height)
        })
    }
}

#[derive(Debug, Default)]
struct TrialFill {
    lost_space: f32,
    rendered_all: bool,
    break_page: bool,
}

/// [§ 8 Column breaks](https://www.w3.org/TR/css-multicol-1/#column-breaks)
///
/// Lay out a multi-column box whose margin box starts at its position.
///
/// STEP 1: collapse the top margin and resolve the width, then the column
///         count and width.
/// STEP 2: find the column height. Balanced columns start at the content
///         height divided by the count and grow by the smallest lost space
///         until the content fits or the height reaches its ceiling.
/// STEP 3: lay the columns out at that height.
pub(crate) fn columns_layout(
    ctx: &mut LayoutContext<'_>,
    mut prepared: LayoutBox,
    children: &[LayoutBox],
    mut bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    page_is_empty: bool,
    adjoining_margins: Vec<f32>,
) -> BlockLayout {
    let was_in_column = mem::replace(&mut ctx.in_column, true);
    let style = Rc::clone(&prepared.style);

    // STEP 1
    if skip_stack.is_some() {
        prepared.remove_decoration(true, false);
    }
    let mut top_margins = adjoining_margins;
    top_margins.push(prepared.margin.top);
    prepared.position_y += collapse_margin(&top_margins) - prepared.margin.top;
    block_level_width(&mut prepared, containing_block);

    let known_height = prepared.height.length();
    let top = prepared.content_box_y();
    if let Some(height) = known_height {
        bottom_space = bottom_space.max(bottom_space_at(ctx, top, height));
    }
    let gap = style.used_column_gap();
    let (count, width) = column_geometry(
        prepared.content_width(),
        style.column_width,
        style.column_count,
        gap,
    );

    ctx.create_block_formatting_context();
    let outer_absolute = style
        .is_absolute_containing_block()
        .then(|| mem::take(&mut ctx.absolute_boxes));

    // STEP 2
    let columns = Columns {
        multicol: &prepared,
        children,
        count,
        width,
        gap,
    };
    let ceiling = bottom_space_at(ctx, top, 0.0) - bottom_space;
    let ceiling = known_height
        .map_or(ceiling, |height| ceiling.min(height))
        .min(prepared.max_height);
    let total = columns.content_height(ctx, skip_stack, page_is_empty);
    let mut height = if style.column_fill == ColumnFill::Auto && ceiling.is_finite() {
        ceiling
    } else {
        (total / count as f32).min(ceiling)
    };
    if style.column_fill == ColumnFill::Balance || !ceiling.is_finite() {
        let limit = ceiling.min(total);
        let mut last_loop = height >= limit;
        let mut iterations = 0_u32;
        loop {
            iterations += 1;
            let trial = columns.trial_fill(ctx, height, skip_stack, page_is_empty);
            trace!(
                "column balancing {} #{iterations}: height {height} lost {}",
                prepared.label(),
                trial.lost_space
            );
            if last_loop || trial.break_page || trial.rendered_all {
                break;
            }
            height += if trial.lost_space.is_finite() {
                trial.lost_space
            } else {
                1.0
            };
            if height >= limit {
                height = limit;
                last_loop = true;
            }
        }
        debug!(
            "balanced {} in {iterations} passes at {height}",
            prepared.label()
        );
    }

    // STEP 3
    let column_bottom_space = bottom_space.max(bottom_space_at(ctx, top, height));
    let mut new_columns = Vec::new();
    let mut column_skip = skip_stack.cloned();
    let mut next_page = NextPage::default();
    let mut index = 0;
    loop {
        // A declaration constraining the height creates additional columns
        // in the inline direction.
        if index == count && known_height.is_none() {
            break;
        }
        let layout = columns.lay_out(
            ctx,
            index,
            column_bottom_space,
            column_skip.as_ref(),
            page_is_empty || index > 0,
        );
        let Some(column) = layout.new_box else {
            break;
        };
        next_page = layout.next_page;
        column_skip = layout.resume_at;
        new_columns.push(column);
        if column_skip.is_none() {
            break;
        }
        index += 1;
    }

    if !children.is_empty() && new_columns.is_empty() {
        debug!("no column of {} fits on the page", prepared.label());
        if let Some(outer) = outer_absolute {
            ctx.absolute_boxes = outer;
        }
        ctx.abandon_block_formatting_context();
        ctx.in_column = was_in_column;
        return BlockLayout::default();
    }

    let column_height = new_columns
        .iter()
        .map(LayoutBox::margin_height)
        .fold(0.0, f32::max);
    for column in &mut new_columns {
        column.height = AutoOr::Length(column_height);
    }
    let resume_at = column_skip;
    let mut new_box = prepared.copy_with_children(new_columns);
    let content_height = known_height.unwrap_or(column_height);
    let used_height = clamp(content_height, new_box.min_height, new_box.max_height);
    new_box.height = AutoOr::Length(used_height);
    if resume_at.is_some() {
        new_box.remove_decoration(false, true);
    }
    new_box.is_start = skip_stack.is_none();
    new_box.is_end = resume_at.is_none();

    if let Some(outer) = outer_absolute {
        let own = mem::replace(&mut ctx.absolute_boxes, outer);
        resolve_absolute_boxes(ctx, &mut new_box, &own);
    }
    ctx.finish_block_formatting_context(&mut new_box);
    ctx.in_column = was_in_column;

    BlockLayout {
        new_box: Some(new_box),
        resume_at,
        next_page,
        adjoining_margins: Vec::new(),
        collapsing_through: false,
        top_margins: Some(top_margins),
        bottom_joins_top: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::text::MonospaceShaper;
    use crate::style::AutoLength;

    #[test]
    fn test_count_only_splits_the_width() {
        assert_eq!(column_geometry(210.0, None, Some(2), 10.0), (2, 100.0));
    }

    #[test]
    fn test_width_only_fits_as_many_columns_as_possible() {
        assert_eq!(column_geometry(320.0, Some(100.0), None, 10.0), (3, 100.0));
        // Leftover width widens the columns that fit.
        assert_eq!(column_geometry(350.0, Some(100.0), None, 10.0), (3, 110.0));
        assert_eq!(column_geometry(50.0, Some(100.0), None, 10.0), (1, 50.0));
    }

    #[test]
    fn test_count_is_a_maximum_when_width_is_set() {
        assert_eq!(column_geometry(430.0, Some(100.0), Some(3), 10.0).0, 3);
        assert_eq!(column_geometry(430.0, Some(100.0), Some(8), 10.0).0, 4);
    }

    fn block(height: f32) -> LayoutBox {
        let style = ComputedStyle {
            height: AutoLength::px(height),
            ..ComputedStyle::default()
        };
        LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new())
    }

    fn multicol(count: u32) -> (LayoutBox, LayoutBox) {
        let style = ComputedStyle {
            column_count: Some(count),
            column_gap: Some(10.0),
            ..ComputedStyle::default()
        };
        let prepared = LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new());
        let mut containing_block =
            LayoutBox::new(BoxKind::BlockContainer, Rc::default(), Vec::new());
        containing_block.width = AutoOr::Length(210.0);
        (prepared, containing_block)
    }

    #[test]
    fn test_columns_are_balanced() {
        let shaper = MonospaceShaper;
        let mut ctx = LayoutContext::new(&shaper, 1000.0);
        let children: Vec<_> = (0..4).map(|_| block(10.0)).collect();
        let (prepared, containing_block) = multicol(2);
        let layout = columns_layout(
            &mut ctx,
            prepared,
            &children,
            f32::NEG_INFINITY,
            None,
            &containing_block,
            true,
            Vec::new(),
        );
        let new_box = layout.new_box.expect("multicol box");
        assert!(layout.resume_at.is_none());
        assert_eq!(new_box.children.len(), 2);
        assert_eq!(new_box.content_height(), 20.0);
        assert_eq!(new_box.children[0].children.len(), 2);
        assert_eq!(new_box.children[1].position_x, 110.0);
        assert!(!ctx.in_column);
    }

    #[test]
    fn test_columns_fragment_at_the_page_bottom() {
        let shaper = MonospaceShaper;
        let mut ctx = LayoutContext::new(&shaper, 20.0);
        let children: Vec<_> = (0..6).map(|_| block(10.0)).collect();
        let (prepared, containing_block) = multicol(2);
        let layout = columns_layout(
            &mut ctx,
            prepared,
            &children,
            0.0,
            None,
            &containing_block,
            true,
            Vec::new(),
        );
        let new_box = layout.new_box.expect("multicol box");
        assert_eq!(new_box.content_height(), 20.0);
        assert_eq!(layout.resume_at.map(|stack| stack.index()), Some(4));
    }
}
