//! CSS Positioned Layout.
//!
//! [§ 9.3 Positioning schemes](https://www.w3.org/TR/CSS2/visuren.html#positioning-scheme)
//!
//! "In the absolute positioning model, a box is removed from the normal
//! flow entirely and assigned a position with respect to a containing
//! block."
//!
//! Absolutely positioned boxes leave a placeholder in the flow at their
//! static position. Once the containing block is sized, the placeholder is
//! replaced by the box laid out here. Positioned boxes are never
//! fragmented: their content is laid out without a page bottom.

use log::debug;

use crate::style::{Direction, Position};

use super::block::{BlockLayout, block_container_layout};
use super::box_model::{AutoOr, Rect};
use super::boxes::{BoxKind, LayoutBox};
use super::context::LayoutContext;
use super::flex::flex_layout;
use super::percent::{ContainingBlock, Offsets, clamp, resolve_offsets, resolve_percentages};
use super::preferred::shrink_to_fit;
use super::replaced::replaced_box_width_height;
use super::table::table_wrapper_width;

/// Where a box ends up relative to its static position once its size is
/// known.
#[derive(Debug, Clone, Copy, Default)]
struct Translation {
    x: f32,
    y: f32,
    /// Subtract the laid out content width from `x`.
    minus_width: bool,
    /// Subtract the laid out content height from `y`.
    minus_height: bool,
}

/// [§ 10.3.7 Absolutely positioned, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-width)
///
/// "The constraint that determines the used values for these elements is:
/// 'left' + 'margin-left' + 'border-left-width' + 'padding-left' + 'width'
/// + 'padding-right' + 'border-right-width' + 'margin-right' + 'right' =
/// width of containing block"
///
/// `source` is the box before layout, measured for shrink-to-fit widths.
/// Returns the horizontal translation from the static position.
fn absolute_width(
    ctx: &LayoutContext<'_>,
    layout_box: &mut LayoutBox,
    source: &LayoutBox,
    offsets: Offsets,
    containing_block: Rect,
) -> (f32, bool) {
    let style = &layout_box.style;
    let ltr = style.direction == Direction::Ltr;
    let margin_left_auto = style.margin_left.is_auto();
    let margin_right_auto = style.margin_right.is_auto();
    let paddings_borders = layout_box.padding.horizontal() + layout_box.border.horizontal();
    let default_translate = containing_block.x - layout_box.position_x;
    let cb_width = containing_block.width;

    match (offsets.left, layout_box.width, offsets.right) {
        // "If all three of 'left', 'width', and 'right' are 'auto': First
        // set any 'auto' values for 'margin-left' and 'margin-right' to 0.
        // Then, if the 'direction' property of the element establishing the
        // static-position containing block is 'ltr' set 'left' to the
        // static position and apply rule number three below."
        (AutoOr::Auto, AutoOr::Auto, AutoOr::Auto) => {
            let available = cb_width - paddings_borders - layout_box.margin.horizontal();
            layout_box.width = AutoOr::Length(shrink_to_fit(ctx, source, available));
            if ltr {
                (0.0, false)
            } else {
                (default_translate + available, true)
            }
        }
        // "If none of the three is 'auto': If both 'margin-left' and
        // 'margin-right' are 'auto', solve the equation under the extra
        // constraint that the two margins get equal values, unless this
        // would make them negative [...]. If one of 'margin-left' or
        // 'margin-right' is 'auto', solve the equation for that value. If
        // the values are over-constrained, ignore the value for 'left' (in
        // case the 'direction' property of the containing block is 'rtl')
        // or 'right' (in case 'direction' is 'ltr') and solve for that
        // value."
        (AutoOr::Length(left), AutoOr::Length(width), AutoOr::Length(right)) => {
            let for_margins = cb_width - (left + right + paddings_borders + width);
            let margin = &mut layout_box.margin;
            match (margin_left_auto, margin_right_auto) {
                (true, true) => {
                    if for_margins >= 0.0 {
                        margin.left = for_margins / 2.0;
                        margin.right = for_margins / 2.0;
                    } else if ltr {
                        margin.left = 0.0;
                        margin.right = for_margins;
                    } else {
                        margin.left = for_margins;
                        margin.right = 0.0;
                    }
                }
                (true, false) => margin.left = for_margins - margin.right,
                (false, true) => margin.right = for_margins - margin.left,
                (false, false) => {
                    if ltr {
                        margin.right = for_margins - margin.left;
                    } else {
                        margin.left = for_margins - margin.right;
                    }
                }
            }
            (left + default_translate, false)
        }
        // "Otherwise, set 'auto' values for 'margin-left' and
        // 'margin-right' to 0, and pick the one of the following six rules
        // that applies."
        (left, width, right) => {
            let spacing = paddings_borders + layout_box.margin.horizontal();
            match (left, width, right) {
                // 1. "'left' and 'width' are 'auto' and 'right' is not
                // 'auto', then the width is shrink-to-fit. Then solve for
                // 'left'"
                (AutoOr::Auto, AutoOr::Auto, AutoOr::Length(right)) => {
                    let available = cb_width - spacing - right;
                    layout_box.width = AutoOr::Length(shrink_to_fit(ctx, source, available));
                    (cb_width - right - spacing + default_translate, true)
                }
                // 2. "'left' and 'right' are 'auto' and 'width' is not
                // 'auto', then [...] set 'left' to the static position"
                (AutoOr::Auto, AutoOr::Length(_), AutoOr::Auto) => (0.0, false),
                // 3. "'width' and 'right' are 'auto' and 'left' is not
                // 'auto', then the width is shrink-to-fit. Then solve for
                // 'right'"
                (AutoOr::Length(left), AutoOr::Auto, AutoOr::Auto) => {
                    let available = cb_width - spacing - left;
                    layout_box.width = AutoOr::Length(shrink_to_fit(ctx, source, available));
                    (left + default_translate, false)
                }
                // 4. "'left' is 'auto', 'width' and 'right' are not 'auto',
                // then solve for 'left'"
                (AutoOr::Auto, AutoOr::Length(width), AutoOr::Length(right)) => {
                    let translate = cb_width + default_translate - right - spacing - width;
                    (translate, false)
                }
                // 5. "'width' is 'auto', 'left' and 'right' are not 'auto',
                // then solve for 'width'"
                (AutoOr::Length(left), AutoOr::Auto, AutoOr::Length(right)) => {
                    layout_box.width = AutoOr::Length((cb_width - right - left - spacing).max(0.0));
                    (left + default_translate, false)
                }
                // 6. "'right' is 'auto', 'left' and 'width' are not 'auto',
                // then solve for 'right'"
                (AutoOr::Length(left), AutoOr::Length(_), AutoOr::Auto) => {
                    (left + default_translate, false)
                }
                (AutoOr::Auto, AutoOr::Auto, AutoOr::Auto)
                | (AutoOr::Length(_), AutoOr::Length(_), AutoOr::Length(_)) => {
                    unreachable!("handled by the outer match")
                }
            }
        }
    }
}

/// [§ 10.6.4 Absolutely positioned, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-height)
///
/// "'top' + 'margin-top' + 'border-top-width' + 'padding-top' + 'height' +
/// 'padding-bottom' + 'border-bottom-width' + 'margin-bottom' + 'bottom' =
/// height of containing block"
///
/// Auto heights are left to content layout. Returns the vertical
/// translation from the static position.
fn absolute_height(
    layout_box: &mut LayoutBox,
    offsets: Offsets,
    containing_block: Rect,
) -> (f32, bool) {
    let style = &layout_box.style;
    let margin_top_auto = style.margin_top.is_auto();
    let margin_bottom_auto = style.margin_bottom.is_auto();
    let paddings_borders = layout_box.padding.vertical() + layout_box.border.vertical();
    let default_translate = containing_block.y - layout_box.position_y;
    let cb_height = containing_block.height;

    match (offsets.top, layout_box.height, offsets.bottom) {
        // "If all three of 'top', 'height', and 'bottom' are auto, set
        // 'top' to the static position"
        (AutoOr::Auto, AutoOr::Auto, AutoOr::Auto) => (0.0, false),
        (AutoOr::Length(top), AutoOr::Length(height), AutoOr::Length(bottom)) => {
            let for_margins = cb_height - (top + bottom + paddings_borders + height);
            let margin = &mut layout_box.margin;
            match (margin_top_auto, margin_bottom_auto) {
                (true, true) => {
                    margin.top = for_margins / 2.0;
                    margin.bottom = for_margins / 2.0;
                }
                (true, false) => margin.top = for_margins - margin.bottom,
                // Over-constrained: 'bottom' is ignored.
                (false, _) => margin.bottom = for_margins - margin.top,
            }
            (top + default_translate, false)
        }
        (top, height, bottom) => {
            let spacing = paddings_borders + layout_box.margin.vertical();
            match (top, height, bottom) {
                (AutoOr::Auto, AutoOr::Auto, AutoOr::Length(bottom)) => {
                    (cb_height - bottom - spacing + default_translate, true)
                }
                (AutoOr::Auto, AutoOr::Length(_), AutoOr::Auto) => (0.0, false),
                (AutoOr::Length(top), AutoOr::Auto, AutoOr::Auto)
                | (AutoOr::Length(top), AutoOr::Length(_), AutoOr::Auto) => {
                    (top + default_translate, false)
                }
                (AutoOr::Auto, AutoOr::Length(height), AutoOr::Length(bottom)) => {
                    let translate = cb_height + default_translate - bottom - spacing - height;
                    (translate, false)
                }
                (AutoOr::Length(top), AutoOr::Auto, AutoOr::Length(bottom)) => {
                    let height = (cb_height - bottom - top - spacing).max(0.0);
                    layout_box.height = AutoOr::Length(height);
                    (top + default_translate, false)
                }
                (AutoOr::Auto, AutoOr::Auto, AutoOr::Auto)
                | (AutoOr::Length(_), AutoOr::Length(_), AutoOr::Length(_)) => {
                    unreachable!("handled by the outer match")
                }
            }
        }
    }
}

/// [§ 10.3.8 Absolutely positioned, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#abs-replaced-width)
///
/// The used width and height come from the replaced element rules; the
/// offsets and auto margins absorb the rest of the containing block.
fn absolute_replaced(
    layout_box: &mut LayoutBox,
    offsets: Offsets,
    containing_block: Rect,
) -> Translation {
    replaced_box_width_height(
        layout_box,
        ContainingBlock {
            width: containing_block.width,
            height: Some(containing_block.height),
        },
    );
    let ltr = layout_box.style.direction == Direction::Ltr;

    // Horizontal axis.
    let x = match (offsets.left, offsets.right) {
        (AutoOr::Auto, AutoOr::Auto) => layout_box.position_x,
        (AutoOr::Length(left), AutoOr::Auto) => containing_block.x + left,
        (AutoOr::Auto, AutoOr::Length(right)) => {
            containing_block.right() - right - layout_box.margin_width()
        }
        (AutoOr::Length(left), AutoOr::Length(right)) => {
            let remaining = containing_block.width - left - right - layout_box.border_width();
            let style = &layout_box.style;
            let margin = &mut layout_box.margin;
            match (style.margin_left.is_auto(), style.margin_right.is_auto()) {
                (true, true) => {
                    if remaining >= 0.0 || !ltr {
                        margin.left = remaining / 2.0;
                        margin.right = remaining / 2.0;
                    } else {
                        margin.left = 0.0;
                        margin.right = remaining;
                    }
                }
                (true, false) => margin.left = remaining - margin.right,
                (false, true) => margin.right = remaining - margin.left,
                (false, false) if ltr => margin.right = remaining - margin.left,
                (false, false) => margin.left = remaining - margin.right,
            }
            if ltr {
                containing_block.x + left
            } else {
                containing_block.right() - right - layout_box.margin_width()
            }
        }
    };

    // Vertical axis.
    let y = match (offsets.top, offsets.bottom) {
        (AutoOr::Auto, AutoOr::Auto) => layout_box.position_y,
        (AutoOr::Length(top), AutoOr::Auto) => containing_block.y + top,
        (AutoOr::Auto, AutoOr::Length(bottom)) => {
            containing_block.bottom() - bottom - layout_box.margin_height()
        }
        (AutoOr::Length(top), AutoOr::Length(bottom)) => {
            let remaining = containing_block.height - top - bottom - layout_box.border_height();
            let style = &layout_box.style;
            let margin = &mut layout_box.margin;
            match (style.margin_top.is_auto(), style.margin_bottom.is_auto()) {
                (true, true) => {
                    margin.top = remaining / 2.0;
                    margin.bottom = remaining / 2.0;
                }
                (true, false) => margin.top = remaining - margin.bottom,
                (false, _) => margin.bottom = remaining - margin.top,
            }
            containing_block.y + top
        }
    };

    Translation {
        x: x - layout_box.position_x,
        y: y - layout_box.position_y,
        ..Translation::default()
    }
}

/// [§ 10.3.7](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-width)
///
/// Lay out the absolutely positioned box held by `placeholder` against
/// `containing_block`, the padding box of its containing block (the page
/// area for fixed boxes).
///
/// STEP 1: resolve percentages and offsets against the containing block.
/// STEP 2: solve the horizontal then the vertical constraint equation.
/// STEP 3: lay the content out with no page bottom.
/// STEP 4: move the box from its static position to its final one.
pub(crate) fn absolute_layout(
    ctx: &mut LayoutContext<'_>,
    placeholder: &LayoutBox,
    containing_block: Rect,
) -> LayoutBox {
    let cb = ContainingBlock {
        width: containing_block.width,
        height: Some(containing_block.height),
    };
    let mut prepared = placeholder.copy_with_children(Vec::new());
    resolve_percentages(&mut prepared, cb);
    let offsets = resolve_offsets(&prepared.style, cb.width, cb.height);

    if matches!(prepared.kind, BoxKind::Replaced(_)) {
        let translation = absolute_replaced(&mut prepared, offsets, containing_block);
        prepared.translate(translation.x, translation.y);
        return prepared;
    }

    let (x, minus_width) = absolute_width(
        ctx,
        &mut prepared,
        placeholder,
        offsets,
        containing_block,
    );
    if let AutoOr::Length(width) = prepared.width {
        prepared.width = AutoOr::Length(clamp(width, prepared.min_width, prepared.max_width));
    }
    let (y, minus_height) = absolute_height(&mut prepared, offsets, containing_block);
    let translation = Translation {
        x,
        y,
        minus_width,
        minus_height,
    };

    if prepared.is_table_wrapper() {
        table_wrapper_width(ctx, &mut prepared, &placeholder.children, cb);
    }

    let mut new_box = if matches!(prepared.kind, BoxKind::Flex) {
        flex_layout(ctx, prepared, &placeholder.children)
    } else {
        let fallback = prepared.copy_with_children(Vec::new());
        let BlockLayout { new_box, .. } = block_container_layout(
            ctx,
            prepared,
            &placeholder.children,
            f32::NEG_INFINITY,
            None,
            true,
            Vec::new(),
            false,
        );
        new_box.unwrap_or_else(|| {
            let mut empty = fallback;
            empty.height = AutoOr::Length(0.0);
            empty
        })
    };

    let mut dx = translation.x;
    let mut dy = translation.y;
    if translation.minus_width {
        dx -= new_box.content_width();
    }
    if translation.minus_height {
        dy -= new_box.content_height();
    }
    new_box.translate(dx, dy);
    debug!(
        "positioned {} at ({}, {}) size {}x{}",
        new_box.label(),
        new_box.position_x,
        new_box.position_y,
        new_box.border_width(),
        new_box.border_height()
    );
    new_box
}

/// [§ 9.4.3 Relative positioning](https://www.w3.org/TR/CSS2/visuren.html#relative-positioning)
///
/// "Once a box has been laid out according to the normal flow or floated,
/// it may be shifted relative to this position."
///
/// "If neither 'left' nor 'right' is 'auto', the position is
/// over-constrained, and one of them has to be ignored. If the 'direction'
/// property of the containing block is 'ltr', the value of 'left' wins and
/// 'right' becomes -'left'."
///
/// Inline boxes and line boxes pass the shift on to their relatively
/// positioned children.
pub(crate) fn relative_positioning(layout_box: &mut LayoutBox, containing_block: ContainingBlock) {
    if layout_box.style.position == Position::Relative {
        let offsets = resolve_offsets(
            &layout_box.style,
            containing_block.width,
            containing_block.height,
        );
        let dx = match (offsets.left, offsets.right) {
            (AutoOr::Length(left), AutoOr::Length(right)) => {
                if layout_box.style.direction == Direction::Ltr {
                    left
                } else {
                    -right
                }
            }
            (AutoOr::Length(left), AutoOr::Auto) => left,
            (AutoOr::Auto, AutoOr::Length(right)) => -right,
            (AutoOr::Auto, AutoOr::Auto) => 0.0,
        };
        let dy = match (offsets.top, offsets.bottom) {
            (AutoOr::Length(top), _) => top,
            (AutoOr::Auto, AutoOr::Length(bottom)) => -bottom,
            (AutoOr::Auto, AutoOr::Auto) => 0.0,
        };
        layout_box.translate(dx, dy);
    }

    if matches!(layout_box.kind, BoxKind::Inline | BoxKind::Line) {
        for child in &mut layout_box.children {
            relative_positioning(child, containing_block);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::layout::text::MonospaceShaper;
    use crate::style::{AutoLength, ComputedStyle, Display, Length};

    use super::*;

    fn positioned(style: ComputedStyle) -> LayoutBox {
        LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new())
    }

    fn absolute_style() -> ComputedStyle {
        ComputedStyle {
            position: Position::Absolute,
            ..ComputedStyle::with_display(Display::Block)
        }
    }

    #[test]
    fn test_relative_offsets_move_the_box() {
        let mut layout_box = positioned(ComputedStyle {
            position: Position::Relative,
            left: AutoLength::Length(Length::Px(10.0)),
            bottom: AutoLength::Length(Length::Px(5.0)),
            ..ComputedStyle::with_display(Display::Block)
        });
        relative_positioning(&mut layout_box, ContainingBlock::width_only(100.0));
        assert_eq!(layout_box.position_x, 10.0);
        assert_eq!(layout_box.position_y, -5.0);
    }

    #[test]
    fn test_left_wins_when_over_constrained() {
        let mut layout_box = positioned(ComputedStyle {
            position: Position::Relative,
            left: AutoLength::Length(Length::Percent(10.0)),
            right: AutoLength::Length(Length::Px(30.0)),
            ..ComputedStyle::with_display(Display::Block)
        });
        relative_positioning(&mut layout_box, ContainingBlock::width_only(200.0));
        assert_eq!(layout_box.position_x, 20.0);
    }

    #[test]
    fn test_centered_margins_with_all_offsets() {
        let mut layout_box = positioned(ComputedStyle {
            left: AutoLength::Length(Length::Px(0.0)),
            right: AutoLength::Length(Length::Px(0.0)),
            width: AutoLength::Length(Length::Px(60.0)),
            margin_left: AutoLength::Auto,
            margin_right: AutoLength::Auto,
            ..absolute_style()
        });
        let cb = Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        resolve_percentages(
            &mut layout_box,
            ContainingBlock {
                width: 100.0,
                height: Some(100.0),
            },
        );
        let offsets = resolve_offsets(&layout_box.style, 100.0, Some(100.0));
        let source = layout_box.clone();
        let ctx = LayoutContext::new(&MonospaceShaper, 100.0);
        let (x, minus_width) = absolute_width(&ctx, &mut layout_box, &source, offsets, cb);
        assert_eq!(x, 0.0);
        assert!(!minus_width);
        assert_eq!(layout_box.margin.left, 20.0);
        assert_eq!(layout_box.margin.right, 20.0);
    }

    #[test]
    fn test_right_offset_anchors_the_box() {
        let mut layout_box = positioned(ComputedStyle {
            right: AutoLength::Length(Length::Px(10.0)),
            width: AutoLength::Length(Length::Px(30.0)),
            ..absolute_style()
        });
        let cb = Rect {
            x: 50.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        resolve_percentages(&mut layout_box, ContainingBlock::width_only(100.0));
        let offsets = resolve_offsets(&layout_box.style, 100.0, Some(100.0));
        let source = layout_box.clone();
        let ctx = LayoutContext::new(&MonospaceShaper, 100.0);
        let (x, _) = absolute_width(&ctx, &mut layout_box, &source, offsets, cb);
        // Margin box from 110 to 140, the right edge 10px inside 150.
        assert_eq!(layout_box.position_x + x, 110.0);
    }
}
