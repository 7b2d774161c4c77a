//! CSS Float Layout.
//!
//! [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
//!
//! "A float is a box that is shifted to the left or right on the current line.
//! The most interesting characteristic of a float is that content may flow along
//! its side (or be prohibited from doing so by the 'clear' property)."
//!
//! "A floated box is shifted to the left or right until its outer edge touches
//! the containing block edge or the outer edge of another float."
//!
//! Placed floats are recorded as [`ExcludedShape`]s in the
//! [`LayoutContext`]; everything here reads or appends to that list.

use log::trace;

use crate::style::{Clear, Float};

use super::block::{BlockLayout, block_container_layout};
use super::box_model::AutoOr;
use super::boxes::{BoxKind, LayoutBox};
use super::context::{ExcludedShape, LayoutContext};
use super::flex::flex_layout;
use super::percent::{ContainingBlock, clamp, resolve_percentages};
use super::preferred::shrink_to_fit;
use super::replaced::replaced_box_width_height;
use super::skip_stack::SkipStack;
use super::table::table_wrapper_width;

/// [§ 9.5.1 Positioning the float](https://www.w3.org/TR/CSS2/visuren.html#float-position)
///
/// Horizontal band free of floats at the box's vertical position, as
/// `(position_x, position_y, available_width)`.
///
/// With `outer` the band must hold the box's margin box and the returned
/// position is the margin box's. Without it (line boxes, table wrappers,
/// block replaced boxes) the band holds the border box while the box's own
/// margins stay inside the containing block.
///
/// When the box does not fit next to the floats it collides with, it moves
/// down to the highest bottom edge among them and tries again. It never
/// moves up.
#[must_use]
pub fn avoid_collisions(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    containing_block: &LayoutBox,
    outer: bool,
) -> (f32, f32, f32) {
    let shapes = ctx.excluded_shapes();
    let mut position_y = if outer {
        layout_box.position_y
    } else {
        layout_box.border_box_y()
    };
    let (box_width, box_height) = if outer {
        (layout_box.margin_width(), layout_box.margin_height())
    } else {
        (layout_box.border_width(), layout_box.border_height())
    };

    if layout_box.border_height() == 0.0 && layout_box.is_floated() {
        return (
            containing_block.content_box_x(),
            layout_box.position_y,
            containing_block.content_width(),
        );
    }

    let (max_left_bound, max_right_bound) = loop {
        let colliding: Vec<&ExcludedShape> = shapes
            .iter()
            .filter(|shape| collides(shape, position_y, box_height))
            .collect();

        let mut max_left_bound = containing_block.content_box_x();
        let mut max_right_bound =
            containing_block.content_box_x() + containing_block.content_width();
        if !outer {
            max_left_bound += layout_box.margin.left;
            max_right_bound -= layout_box.margin.right;
        }
        for shape in &colliding {
            match shape.side {
                Float::Left => max_left_bound = max_left_bound.max(shape.rect.right()),
                Float::Right => max_right_bound = max_right_bound.min(shape.rect.x),
                Float::None | Float::Footnote => {}
            }
        }

        if !colliding.is_empty() && box_width > max_right_bound - max_left_bound {
            let lowest = colliding
                .iter()
                .map(|shape| shape.rect.bottom())
                .fold(f32::INFINITY, f32::min);
            if lowest > position_y {
                position_y = lowest;
                continue;
            }
        }
        break (max_left_bound, max_right_bound);
    };

    let mut position_x = max_left_bound;
    let available_width = max_right_bound - max_left_bound;
    if !outer {
        position_x -= layout_box.margin.left;
        position_y -= layout_box.margin.top;
    }
    (position_x, position_y, available_width)
}

/// Strict vertical overlap between a shape and `[top, top + height]`.
fn collides(shape: &ExcludedShape, top: f32, height: f32) -> bool {
    let shape_top = shape.rect.y;
    let shape_bottom = shape.rect.bottom();
    let bottom = top + height;
    (shape_top < top && top < shape_bottom)
        || (shape_top < bottom && bottom < shape_bottom)
        || (shape_top >= top && shape_bottom <= bottom)
}

/// [§ 9.5.2 Controlling flow next to floats: the 'clear' property](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
///
/// "Computing the clearance of an element on which 'clear' is set is done
/// by first determining the hypothetical position of the element's top
/// border edge within its parent block. [...] If this hypothetical
/// position of the element's top border edge is not past the relevant
/// floats, then clearance is introduced."
///
/// The hypothetical position is `position_y + collapsed_margin`. Returns
/// the clearance when some relevant float ends below it.
#[must_use]
pub fn get_clearance(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    collapsed_margin: f32,
) -> Option<f32> {
    clearance_at(
        ctx,
        layout_box.style.clear,
        layout_box.position_y + collapsed_margin,
    )
}

/// Clearance needed by a box with `clear` whose top border edge would sit
/// at `hypothetical`.
#[must_use]
pub fn clearance_at(ctx: &LayoutContext<'_>, clear: Clear, hypothetical: f32) -> Option<f32> {
    if clear == Clear::None {
        return None;
    }
    ctx.excluded_shapes()
        .iter()
        .filter(|shape| clears(clear, shape.side))
        .map(|shape| shape.rect.bottom())
        .filter(|bottom| hypothetical < *bottom)
        .map(|bottom| bottom - hypothetical)
        .reduce(f32::max)
}

const fn clears(clear: Clear, side: Float) -> bool {
    matches!(
        (clear, side),
        (Clear::Both, Float::Left | Float::Right)
            | (Clear::Left, Float::Left)
            | (Clear::Right, Float::Right)
    )
}

/// [§ 9.5.1 Positioning the float](https://www.w3.org/TR/CSS2/visuren.html#float-position)
///
/// Rules 4 to 9: the float's top may not be higher than the top of any
/// earlier float, it sits in the first band wide enough to hold it, and a
/// right float hugs the right edge of that band.
pub fn find_float_position(
    ctx: &LayoutContext<'_>,
    float: &mut LayoutBox,
    containing_block: &LayoutBox,
) {
    if let Some(last) = ctx.excluded_shapes().last()
        && float.position_y < last.rect.y
    {
        float.translate(0.0, last.rect.y - float.position_y);
    }

    let (mut position_x, position_y, available_width) =
        avoid_collisions(ctx, float, containing_block, true);
    if float.style.float == Float::Right {
        position_x += available_width - float.margin_width();
    }
    float.translate(position_x - float.position_x, position_y - float.position_y);
}

/// [§ 10.3.5 Floating, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#float-width)
///
/// "If 'width' is computed as 'auto', the used value is the
/// 'shrink-to-fit' width."
///
/// `source` is the box before layout, whose content is measured.
pub fn float_width(
    ctx: &LayoutContext<'_>,
    float: &mut LayoutBox,
    source: &LayoutBox,
    containing_block: ContainingBlock,
) {
    if !float.width.is_auto() {
        return;
    }
    let available = containing_block.width
        - float.margin.horizontal()
        - float.padding.horizontal()
        - float.border.horizontal();
    let width = shrink_to_fit(ctx, source, available);
    float.width = AutoOr::Length(clamp(width, float.min_width, float.max_width));
}

/// Lay out a float found at `position` (its static position) inside
/// `containing_block`, place it, and register it as an excluded shape.
///
/// Returns the placed fragment and, when its content did not fit above
/// `bottom_space`, where to resume it on the next page.
pub fn float_layout(
    ctx: &mut LayoutContext<'_>,
    float: &LayoutBox,
    position: (f32, f32),
    containing_block: &LayoutBox,
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
) -> (LayoutBox, Option<SkipStack>) {
    let cb = ContainingBlock::of(containing_block);
    let mut new_float = float.copy_with_children(Vec::new());
    new_float.position_x = position.0;
    new_float.position_y = position.1;
    resolve_percentages(&mut new_float, cb);

    if let Some(clearance) = get_clearance(ctx, &new_float, 0.0) {
        new_float.position_y += clearance;
    }

    if matches!(new_float.kind, BoxKind::Replaced(_)) {
        replaced_box_width_height(&mut new_float, cb);
    } else {
        float_width(ctx, &mut new_float, float, cb);
    }
    if new_float.is_table_wrapper() {
        table_wrapper_width(ctx, &mut new_float, &float.children, cb);
    }

    let (mut new_float, resume_at) = match new_float.kind {
        BoxKind::Replaced(_) => (new_float, None),
        BoxKind::Flex => (flex_layout(ctx, new_float, &float.children), None),
        _ => {
            let fallback = new_float.copy_with_children(Vec::new());
            let BlockLayout { new_box, resume_at, .. } = block_container_layout(
                ctx,
                new_float,
                &float.children,
                bottom_space,
                skip_stack,
                true,
                Vec::new(),
                false,
            );
            match new_box {
                Some(new_box) => (new_box, resume_at),
                None => {
                    let mut empty = fallback;
                    empty.height = AutoOr::Length(0.0);
                    (empty, None)
                }
            }
        }
    };

    find_float_position(ctx, &mut new_float, containing_block);
    trace!(
        "float {} placed at ({}, {}) width {}",
        new_float.label(),
        new_float.position_x,
        new_float.position_y,
        new_float.margin_width()
    );
    ctx.add_excluded_shape(&new_float);
    (new_float, resume_at)
}
