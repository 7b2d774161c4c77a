//! CSS length values as handed to layout.
//!
//! [CSS Values and Units Level 4](https://www.w3.org/TR/css-values-4/)
//!
//! The cascade is an external collaborator: by the time a style reaches the
//! layout engine, every absolute or font-relative unit has been converted to
//! pixels. Only percentages (which need a containing block) and `auto`
//! survive into layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// [§ 4.1 Lengths](https://www.w3.org/TR/css-values-4/#lengths)
///
/// "Lengths refer to distance measurements and are denoted by `<length>` in
/// the property definitions."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr")]
pub enum Length {
    /// [§ 6.1 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
    /// "1px = 1/96th of 1in"
    Px(f32),
    /// [§ 4.3 Percentages](https://www.w3.org/TR/css-values-4/#percentages)
    /// "Percentages are always relative to another quantity."
    Percent(f32),
}

impl Length {
    /// A zero pixel length.
    pub const ZERO: Self = Self::Px(0.0);

    /// Resolve against a containing block dimension.
    ///
    /// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
    ///
    /// Margin and padding percentages resolve against the containing block
    /// **width**, even for top/bottom; callers pick the right reference.
    #[must_use]
    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => pct * reference / 100.0,
        }
    }

    /// Resolve when the reference may be unknown (`None`).
    ///
    /// Percentages against an indefinite size behave as `None`.
    #[must_use]
    pub fn resolve_definite(self, reference: Option<f32>) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            Self::Percent(pct) => reference.map(|r| pct * r / 100.0),
        }
    }

    /// Returns true for a percentage value.
    #[must_use]
    pub const fn is_percentage(self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::ZERO
    }
}

/// [§ 4.4 Automatic values](https://www.w3.org/TR/CSS2/cascade.html#value-def-auto)
///
/// "Some properties can take the keyword 'auto' as a value. This keyword
/// allows the user agent to compute the value based on other properties."
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr")]
pub enum AutoLength {
    /// The value is 'auto' and will be resolved during layout.
    #[default]
    Auto,
    /// A specific length value.
    Length(Length),
}

impl AutoLength {
    /// Shorthand for a pixel length.
    #[must_use]
    pub const fn px(value: f32) -> Self {
        Self::Length(Length::Px(value))
    }

    /// Shorthand for a percentage.
    #[must_use]
    pub const fn percent(value: f32) -> Self {
        Self::Length(Length::Percent(value))
    }

    /// Check if the value is 'auto'.
    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// The pixel value when this is an absolute length.
    #[must_use]
    pub const fn as_px(&self) -> Option<f32> {
        match self {
            Self::Length(Length::Px(px)) => Some(*px),
            _ => None,
        }
    }
}

/// [§ 10.8 'line-height'](https://www.w3.org/TR/CSS2/visudet.html#propdef-line-height)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr")]
pub enum LineHeight {
    /// "Tells user agents to set the used value to a 'reasonable' value
    /// based on the font of the element."
    #[default]
    Normal,
    /// "The used value of the property is this number multiplied by the
    /// element's font size."
    Number(f32),
    /// "The specified length is used in the calculation of the line box
    /// height."
    Length(Length),
}

impl LineHeight {
    /// Used line height for a font size. `normal` is 1.2 em, the upper end
    /// of the range CSS 2 recommends.
    #[must_use]
    pub fn resolve(self, font_size: f32) -> f32 {
        match self {
            Self::Normal => font_size * 1.2,
            Self::Number(n) => font_size * n,
            Self::Length(len) => len.resolve(font_size),
        }
    }
}

/// Untagged wire shape used to decode lengths from JSON (`12`, `"12px"`,
/// `"50%"`, `"auto"`, `"normal"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Number(f32),
    Text(String),
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |digits: &str| {
            digits
                .trim()
                .parse::<f32>()
                .map_err(|_| Error::InvalidValue(s.to_string()))
        };
        if let Some(pct) = s.strip_suffix('%') {
            Ok(Self::Percent(parse(pct)?))
        } else if let Some(px) = s.strip_suffix("px") {
            Ok(Self::Px(parse(px)?))
        } else {
            Ok(Self::Px(parse(s)?))
        }
    }
}

impl FromStr for AutoLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Length)
        }
    }
}

impl TryFrom<ValueRepr> for Length {
    type Error = Error;

    fn try_from(value: ValueRepr) -> Result<Self, Self::Error> {
        match value {
            ValueRepr::Number(n) => Ok(Self::Px(n)),
            ValueRepr::Text(text) => text.parse(),
        }
    }
}

impl TryFrom<ValueRepr> for AutoLength {
    type Error = Error;

    fn try_from(value: ValueRepr) -> Result<Self, Self::Error> {
        match value {
            ValueRepr::Number(n) => Ok(Self::px(n)),
            ValueRepr::Text(text) => text.parse(),
        }
    }
}

impl TryFrom<ValueRepr> for LineHeight {
    type Error = Error;

    fn try_from(value: ValueRepr) -> Result<Self, Self::Error> {
        match value {
            ValueRepr::Number(n) => Ok(Self::Number(n)),
            ValueRepr::Text(text) if text.trim().eq_ignore_ascii_case("normal") => {
                Ok(Self::Normal)
            }
            ValueRepr::Text(text) => text.parse().map(Self::Length),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(px) => write!(f, "{px}px"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

impl fmt::Display for AutoLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Length(len) => len.fmt(f),
        }
    }
}
