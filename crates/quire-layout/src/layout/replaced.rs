//! Replaced elements.
//!
//! [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
//! [§ 10.6.2 Inline replaced elements, block-level replaced elements...](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-height)
//! [§ 5.2 CSS Object Sizing](https://www.w3.org/TR/css-images-3/#sizing)

use std::fmt;

use crate::style::AutoLength;

use super::box_model::AutoOr;
use super::boxes::LayoutBox;
use super::percent::ContainingBlock;

/// "If an element's width is 'auto' and none of the rules apply, then the
/// used value of 'width' becomes 300px."
pub const DEFAULT_WIDTH: f32 = 300.0;
/// "If 'height' and 'width' both have computed values of 'auto' ... the
/// used value of 'height' must be set to the height of the largest
/// rectangle that has a 2:1 ratio, has a height not greater than 150px."
pub const DEFAULT_HEIGHT: f32 = 150.0;

/// Intrinsic dimensions of replaced content (images and the like).
///
/// [§ 5.1 Object-Sizing Terminology](https://www.w3.org/TR/css-images-3/#sizing-terms)
pub trait IntrinsicSizing: fmt::Debug {
    /// `(width, height)` in pixels; either may be missing.
    fn intrinsic_size(&self, font_size: f32) -> (Option<f32>, Option<f32>);

    /// Width divided by height, when the content has one.
    fn intrinsic_ratio(&self) -> Option<f32>;
}

/// Replaced content with fixed intrinsic dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSize {
    /// Intrinsic width.
    pub width: Option<f32>,
    /// Intrinsic height.
    pub height: Option<f32>,
}

impl IntrinsicSizing for FixedSize {
    fn intrinsic_size(&self, _font_size: f32) -> (Option<f32>, Option<f32>) {
        (self.width, self.height)
    }

    fn intrinsic_ratio(&self) -> Option<f32> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if height > 0.0 => Some(width / height),
            _ => None,
        }
    }
}

/// [§ 5.3.1 Contain constraint](https://www.w3.org/TR/css-images-3/#contain-constraint)
///
/// Largest rectangle with the object's ratio that fits the constraint.
#[must_use]
pub fn contain_constraint_sizing(width: f32, height: f32, ratio: Option<f32>) -> (f32, f32) {
    let Some(ratio) = ratio else {
        return (width, height);
    };
    if height > 0.0 && width / height > ratio {
        (height * ratio, height)
    } else {
        (width, width / ratio)
    }
}

/// [§ 5.2 Default Sizing Algorithm](https://www.w3.org/TR/css-images-3/#default-sizing)
#[must_use]
pub fn default_sizing(
    intrinsic: (Option<f32>, Option<f32>),
    ratio: Option<f32>,
    specified: (Option<f32>, Option<f32>),
    default: (f32, f32),
) -> (f32, f32) {
    let (intrinsic_width, intrinsic_height) = intrinsic;
    match specified {
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => {
            let height = ratio
                .map(|r| width / r)
                .or(intrinsic_height)
                .unwrap_or(default.1);
            (width, height)
        }
        (None, Some(height)) => {
            let width = ratio
                .map(|r| height * r)
                .or(intrinsic_width)
                .unwrap_or(default.0);
            (width, height)
        }
        (None, None) if intrinsic_width.is_some() || intrinsic_height.is_some() => {
            default_sizing(intrinsic, ratio, intrinsic, default)
        }
        (None, None) => contain_constraint_sizing(default.0, default.1, ratio),
    }
}

fn sizing_of(layout_box: &LayoutBox) -> Option<&dyn IntrinsicSizing> {
    match &layout_box.kind {
        super::boxes::BoxKind::Replaced(content) => Some(content.as_ref()),
        _ => None,
    }
}

/// [§ 10.4 table](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths)
///
/// Constraint violations for replaced elements with both 'width' and
/// 'height' computed as 'auto', resolved so the ratio is preserved.
fn min_max_auto_replaced(layout_box: &mut LayoutBox) {
    let width = layout_box.content_width();
    let height = layout_box.content_height();
    let min_width = layout_box.min_width;
    let min_height = layout_box.min_height;
    let max_width = layout_box.max_width.max(min_width);
    let max_height = layout_box.max_height.max(min_height);

    let (new_width, new_height) = if width > max_width && height > max_height {
        if max_width / width <= max_height / height {
            (max_width, (min_height).max(max_width * height / width))
        } else {
            ((min_width).max(max_height * width / height), max_height)
        }
    } else if width < min_width && height < min_height {
        if min_width / width <= min_height / height {
            ((max_width).min(min_height * width / height), min_height)
        } else {
            (min_width, (max_height).min(min_width * height / width))
        }
    } else if width < min_width && height > max_height {
        (min_width, max_height)
    } else if width > max_width && height < min_height {
        (max_width, min_height)
    } else if width > max_width {
        (max_width, (min_height).max(max_width * height / width))
    } else if width < min_width {
        (min_width, (max_height).min(min_width * height / width))
    } else if height > max_height {
        ((min_width).max(max_height * width / height), max_height)
    } else if height < min_height {
        ((max_width).min(min_height * width / height), min_height)
    } else {
        (width, height)
    };
    layout_box.width = AutoOr::Length(new_width);
    layout_box.height = AutoOr::Length(new_height);
}

/// Used width and height of a replaced box, after percentages have been
/// resolved. Margins are not touched.
pub fn replaced_box_width_height(layout_box: &mut LayoutBox, _containing_block: ContainingBlock) {
    let Some(content) = sizing_of(layout_box) else {
        return;
    };
    let intrinsic = content.intrinsic_size(layout_box.style.font_size);
    let ratio = content.intrinsic_ratio();
    let both_auto = layout_box.width.is_auto() && layout_box.height.is_auto();
    let (width, height) = default_sizing(
        intrinsic,
        ratio,
        (layout_box.width.length(), layout_box.height.length()),
        (DEFAULT_WIDTH, DEFAULT_HEIGHT),
    );
    layout_box.width = AutoOr::Length(width);
    layout_box.height = AutoOr::Length(height);
    if both_auto {
        min_max_auto_replaced(layout_box);
    } else {
        let clamped_width = width.min(layout_box.max_width).max(layout_box.min_width);
        let clamped_height = height.min(layout_box.max_height).max(layout_box.min_height);
        layout_box.width = AutoOr::Length(clamped_width);
        layout_box.height = AutoOr::Length(clamped_height);
    }
}

/// Width contributed by a replaced box to min/max-content sizing.
///
/// Percentage widths (and percentage max-widths) contribute zero.
#[must_use]
pub fn replaced_content_width(layout_box: &LayoutBox) -> f32 {
    let style = &layout_box.style;
    match style.width {
        AutoLength::Length(len) if len.is_percentage() => 0.0,
        AutoLength::Length(len) => len.resolve(0.0),
        AutoLength::Auto => {
            if style.max_width.is_some_and(|len| len.is_percentage()) {
                return 0.0;
            }
            let Some(content) = sizing_of(layout_box) else {
                return 0.0;
            };
            let height = match style.height {
                AutoLength::Length(len) if !len.is_percentage() => Some(len.resolve(0.0)),
                _ => None,
            };
            default_sizing(
                content.intrinsic_size(style.font_size),
                content.intrinsic_ratio(),
                (None, height),
                (DEFAULT_WIDTH, DEFAULT_HEIGHT),
            )
            .0
        }
    }
}
