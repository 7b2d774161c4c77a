//! Resolution of computed lengths into used values.
//!
//! [§ 6.1 Used Values](https://www.w3.org/TR/css-cascade-4/#used)
//!
//! "The used value is the result of taking the computed value and
//! completing any remaining calculations to make it the absolute
//! theoretical value used in the layout of the document."

use std::rc::Rc;

use crate::style::{AutoLength, BoxSizing, ComputedStyle};

use super::box_model::{AutoOr, EdgeSizes};
use super::boxes::LayoutBox;

/// Size of a containing block. The height is `None` when it depends on
/// content and is therefore not yet known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainingBlock {
    /// Content width of the containing block.
    pub width: f32,
    /// Content height, when definite.
    pub height: Option<f32>,
}

impl ContainingBlock {
    /// A containing block of definite width and indefinite height.
    #[must_use]
    pub const fn width_only(width: f32) -> Self {
        Self {
            width,
            height: None,
        }
    }

    /// The containing block formed by the content box of `parent`.
    #[must_use]
    pub const fn of(parent: &LayoutBox) -> Self {
        Self {
            width: parent.content_width(),
            height: parent.height.length(),
        }
    }
}

fn resolve_auto(value: AutoLength, reference: Option<f32>) -> AutoOr {
    match value {
        AutoLength::Auto => AutoOr::Auto,
        AutoLength::Length(len) => len.resolve_definite(reference).into(),
    }
}

/// [§ 10 Visual formatting model details](https://www.w3.org/TR/CSS2/visudet.html)
///
/// Fill `layout_box`'s used margins, paddings, borders, sizes and min/max
/// constraints from its style, resolving percentages against
/// `containing_block`.
///
/// Margin and padding percentages refer to the containing block's width on
/// all four sides. Height percentages against an indefinite containing
/// block height compute to 'auto'.
pub fn resolve_percentages(layout_box: &mut LayoutBox, containing_block: ContainingBlock) {
    let style = Rc::clone(&layout_box.style);
    let cb_width = containing_block.width;
    let cb_height = containing_block.height;

    let margin = |value: AutoLength| match value {
        AutoLength::Auto => 0.0,
        AutoLength::Length(len) => len.resolve(cb_width),
    };
    layout_box.margin = EdgeSizes {
        top: margin(style.margin_top),
        right: margin(style.margin_right),
        bottom: margin(style.margin_bottom),
        left: margin(style.margin_left),
    };
    layout_box.padding = EdgeSizes {
        top: style.padding_top.resolve(cb_width),
        right: style.padding_right.resolve(cb_width),
        bottom: style.padding_bottom.resolve(cb_width),
        left: style.padding_left.resolve(cb_width),
    };
    layout_box.border = EdgeSizes {
        top: style.border_top.used_width(),
        right: style.border_right.used_width(),
        bottom: style.border_bottom.used_width(),
        left: style.border_left.used_width(),
    };

    layout_box.width = resolve_auto(style.width, Some(cb_width));
    layout_box.height = resolve_auto(style.height, cb_height);

    layout_box.min_width = match style.min_width {
        AutoLength::Auto => 0.0,
        AutoLength::Length(len) => len.resolve(cb_width),
    };
    layout_box.max_width = style
        .max_width
        .map_or(f32::INFINITY, |len| len.resolve(cb_width));
    layout_box.min_height = match style.min_height {
        AutoLength::Auto => 0.0,
        AutoLength::Length(len) => len.resolve_definite(cb_height).unwrap_or(0.0),
    };
    layout_box.max_height = style
        .max_height
        .and_then(|len| len.resolve_definite(cb_height))
        .unwrap_or(f32::INFINITY);

    // [§ 3.2 box-sizing](https://www.w3.org/TR/css-sizing-3/#box-sizing)
    //
    // "border-box: ... the content width and height are calculated by
    // subtracting the border and padding widths of the respective sides
    // from the specified width and height properties."
    if style.box_sizing == BoxSizing::BorderBox {
        let horizontal = layout_box.padding.horizontal() + layout_box.border.horizontal();
        let vertical = layout_box.padding.vertical() + layout_box.border.vertical();
        if let AutoOr::Length(width) = layout_box.width {
            layout_box.width = AutoOr::Length((width - horizontal).max(0.0));
        }
        if let AutoOr::Length(height) = layout_box.height {
            layout_box.height = AutoOr::Length((height - vertical).max(0.0));
        }
        layout_box.min_width = (layout_box.min_width - horizontal).max(0.0);
        layout_box.max_width = (layout_box.max_width - horizontal).max(0.0);
        layout_box.min_height = (layout_box.min_height - vertical).max(0.0);
        layout_box.max_height = (layout_box.max_height - vertical).max(0.0);
    }
}

/// Box offsets (`top`, `right`, `bottom`, `left`) with percentages
/// resolved.
///
/// [§ 9.3.2 Box offsets](https://www.w3.org/TR/CSS2/visuren.html#position-props)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offsets {
    /// 'top'
    pub top: AutoOr,
    /// 'right'
    pub right: AutoOr,
    /// 'bottom'
    pub bottom: AutoOr,
    /// 'left'
    pub left: AutoOr,
}

/// Resolve box offsets: horizontal ones against the containing block
/// width, vertical ones against its height.
#[must_use]
pub fn resolve_offsets(style: &ComputedStyle, width: f32, height: Option<f32>) -> Offsets {
    Offsets {
        top: resolve_auto(style.top, height),
        right: resolve_auto(style.right, Some(width)),
        bottom: resolve_auto(style.bottom, height),
        left: resolve_auto(style.left, Some(width)),
    }
}

/// Clamp a size between the used min and max. When min exceeds max, min
/// wins.
///
/// [§ 10.4 Minimum and maximum widths](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths)
#[must_use]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}
