//! Computed style consumed by layout.
//!
//! [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
//! "The computed value is the result of resolving the specified value..."
//!
//! Unlike a cascade-side style, every property here already holds its
//! computed value (initial or inherited values filled in), so layout never
//! has to ask "was this set?".

mod display;
mod values;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use display::{Display, InnerDisplay, OuterDisplay};
pub use values::{AutoLength, Length, LineHeight};

use crate::Error;

/// [§ 9.3.1 Choosing a positioning scheme: 'position' property](https://www.w3.org/TR/CSS2/visuren.html#choose-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// "The box is a normal box, laid out according to the normal flow."
    #[default]
    Static,
    /// "The box's position is calculated according to the normal flow. Then
    /// the box is offset relative to its normal position."
    Relative,
    /// "The box's position (and possibly size) is specified with the 'top',
    /// 'right', 'bottom', and 'left' properties."
    Absolute,
    /// "The box's position is calculated according to the 'absolute' model,
    /// but in addition, the box is fixed with respect to some reference."
    Fixed,
}

/// [§ 9.5.1 Positioning the float: the 'float' property](https://www.w3.org/TR/CSS2/visuren.html#float-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Float {
    /// "The box is not floated."
    #[default]
    None,
    /// "The element generates a block box that is floated to the left."
    Left,
    /// "The element generates a block box that is floated to the right."
    Right,
    /// [§ 2 Footnote elements](https://www.w3.org/TR/css-gcpm-3/#footnote-element)
    ///
    /// The element is moved to the footnote area of the current page.
    Footnote,
}

/// [§ 9.5.2 Controlling flow next to floats: the 'clear' property](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Clear {
    /// "No constraint on the box's position with respect to floats."
    #[default]
    None,
    /// Below any left-floating boxes.
    Left,
    /// Below any right-floating boxes.
    Right,
    /// Below any floating boxes.
    Both,
}

/// [§ 3.1 Breaks Between Boxes](https://www.w3.org/TR/css-break-3/#break-between)
///
/// Values of `break-before` and `break-after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakValue {
    /// "Neither force nor forbid a break before/after the principal box."
    #[default]
    Auto,
    /// "Avoid a break before/after the principal box."
    Avoid,
    /// "Avoid a page break before/after the principal box."
    AvoidPage,
    /// "Avoid a column break before/after the principal box."
    AvoidColumn,
    /// "Always force a break before/after the principal box."
    Always,
    /// "Always force a page break before/after the principal box."
    Page,
    /// "Always force a column break before/after the principal box."
    Column,
    /// Force one or two page breaks so that the next page is a left page.
    Left,
    /// Force one or two page breaks so that the next page is a right page.
    Right,
    /// Next page is a recto page (right in left-to-right progression).
    Recto,
    /// Next page is a verso page (left in left-to-right progression).
    Verso,
}

impl BreakValue {
    /// True for values that force a break.
    #[must_use]
    pub const fn is_forced(self) -> bool {
        matches!(
            self,
            Self::Always
                | Self::Page
                | Self::Column
                | Self::Left
                | Self::Right
                | Self::Recto
                | Self::Verso
        )
    }

    /// True for the `avoid*` family.
    #[must_use]
    pub const fn is_avoid(self) -> bool {
        matches!(self, Self::Avoid | Self::AvoidPage | Self::AvoidColumn)
    }

    /// True for values that pick the side of the next page.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        matches!(self, Self::Left | Self::Right | Self::Recto | Self::Verso)
    }
}

/// [§ 3.2 Breaks Within Boxes](https://www.w3.org/TR/css-break-3/#break-within)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakInside {
    /// "Impose no additional breaking constraints within the box."
    #[default]
    Auto,
    /// "Avoid breaks within the box."
    Avoid,
    /// "Avoid a page break within the box."
    AvoidPage,
    /// "Avoid a column break within the box."
    AvoidColumn,
}

impl BreakInside {
    /// True for the `avoid*` family.
    #[must_use]
    pub const fn is_avoid(self) -> bool {
        !matches!(self, Self::Auto)
    }
}

/// [§ 11.1.1 Overflow: the 'overflow' property](https://www.w3.org/TR/CSS2/visufx.html#overflow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overflow {
    /// "This value indicates that content is not clipped."
    #[default]
    Visible,
    /// "This value indicates that the content is clipped."
    Hidden,
    /// Clipped, with a scrolling mechanism.
    Scroll,
    /// User agent dependent.
    Auto,
    /// Clipped, without establishing a scroll container.
    Clip,
}

/// [§ 16.2 Alignment: the 'text-align' property](https://www.w3.org/TR/CSS2/text.html#alignment-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    /// Aligned to the start edge of the line box.
    #[default]
    Start,
    /// Aligned to the end edge of the line box.
    End,
    /// Aligned to the left edge.
    Left,
    /// Aligned to the right edge.
    Right,
    /// Centered within the line box.
    Center,
    /// Stretched to fill the line box.
    Justify,
}

/// [§ 6.3 Last Line Alignment](https://www.w3.org/TR/css-text-3/#text-align-last-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlignLast {
    /// "Content on the affected line is aligned per text-align-all unless
    /// text-align-all is set to justify, in which case it is start-aligned."
    #[default]
    Auto,
    /// Start edge.
    Start,
    /// End edge.
    End,
    /// Left edge.
    Left,
    /// Right edge.
    Right,
    /// Centered.
    Center,
    /// Justified.
    Justify,
}

/// [§ 3 White Space and Wrapping: the white-space property](https://www.w3.org/TR/css-text-3/#white-space-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhiteSpace {
    /// Collapse white space, wrap lines.
    #[default]
    Normal,
    /// Preserve white space, do not wrap.
    Pre,
    /// Collapse white space, do not wrap.
    Nowrap,
    /// Preserve white space, wrap lines.
    PreWrap,
    /// Preserve segment breaks only, wrap lines.
    PreLine,
    /// Like `pre-wrap`, preserved spaces take up room and may break.
    BreakSpaces,
}

impl WhiteSpace {
    /// Whether spaces and tabs are collapsed.
    #[must_use]
    pub const fn collapses_spaces(self) -> bool {
        matches!(self, Self::Normal | Self::Nowrap | Self::PreLine)
    }

    /// Whether segment breaks (newlines) are preserved as forced breaks.
    #[must_use]
    pub const fn preserves_newlines(self) -> bool {
        matches!(
            self,
            Self::Pre | Self::PreWrap | Self::PreLine | Self::BreakSpaces
        )
    }

    /// Whether soft wrap opportunities are honored.
    #[must_use]
    pub const fn wraps(self) -> bool {
        !matches!(self, Self::Pre | Self::Nowrap)
    }
}

/// [§ 10.8.1 Leading and half-leading: 'vertical-align'](https://www.w3.org/TR/CSS2/visudet.html#propdef-vertical-align)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlign {
    /// "Align the baseline of the box with the baseline of the parent box."
    #[default]
    Baseline,
    /// "Align the vertical midpoint of the box with the baseline of the
    /// parent box plus half the x-height of the parent."
    Middle,
    /// "Lower the baseline of the box to the proper position for subscripts
    /// of the parent's box."
    Sub,
    /// "Raise the baseline of the box to the proper position for
    /// superscripts of the parent's box."
    Super,
    /// "Align the top of the box with the top of the parent's content area."
    TextTop,
    /// "Align the bottom of the box with the bottom of the parent's content
    /// area."
    TextBottom,
    /// "Align the top of the aligned subtree with the top of the line box."
    Top,
    /// "Align the bottom of the aligned subtree with the bottom of the line
    /// box."
    Bottom,
    /// "Raise (positive value) or lower (negative value) the box by this
    /// distance." Percentages refer to the line height.
    Length(Length),
}

/// [§ 17.6 Borders](https://www.w3.org/TR/CSS2/tables.html#borders)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorderCollapse {
    /// "The separated borders model."
    #[default]
    Separate,
    /// "The collapsing borders model."
    Collapse,
}

/// [§ 17.5.2 Table width algorithms: the 'table-layout' property](https://www.w3.org/TR/CSS2/tables.html#width-layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableLayout {
    /// "Use any automatic table layout algorithm."
    #[default]
    Auto,
    /// "Use the fixed table layout algorithm."
    Fixed,
}

/// [§ 17.4.1 Caption position and alignment](https://www.w3.org/TR/CSS2/tables.html#caption-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionSide {
    /// Caption box above the table box.
    #[default]
    Top,
    /// Caption box below the table box.
    Bottom,
}

/// [§ 2.1 Specifying the direction of text](https://www.w3.org/TR/css-writing-modes-3/#direction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left.
    Rtl,
}

/// [§ 4.3 Border Style: the border-style properties](https://www.w3.org/TR/css-backgrounds-3/#border-style)
///
/// Declared in the order used to rank styles when collapsed borders
/// conflict: later variants win over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorderStyle {
    /// "No border."
    #[default]
    None,
    /// Inset.
    Inset,
    /// Groove.
    Groove,
    /// Outset.
    Outset,
    /// Ridge.
    Ridge,
    /// Dotted.
    Dotted,
    /// Dashed.
    Dashed,
    /// Solid.
    Solid,
    /// Double.
    Double,
    /// "Same as 'none', except in terms of border conflict resolution for
    /// table elements."
    Hidden,
}

/// [§ 5.5 Adjoining Margins at breaks](https://www.w3.org/TR/css-break-4/#break-margins)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginBreak {
    /// "When an unforced break occurs between block-level boxes, any margins
    /// adjoining the break truncate to zero."
    #[default]
    Auto,
    /// "Margins are not truncated at fragmentation breaks."
    Keep,
    /// "Margins adjoining a fragmentation break are always truncated."
    Discard,
}

/// [§ 5.4 Fragmented Borders and Backgrounds](https://www.w3.org/TR/css-break-3/#break-decoration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxDecorationBreak {
    /// "The effect is as though the element were rendered with no breaks
    /// present, and then sliced by the breaks afterward."
    #[default]
    Slice,
    /// "Each box fragment is independently wrapped with the border, padding,
    /// and margin."
    Clone,
}

/// [§ 7.1 column-fill](https://www.w3.org/TR/css-multicol-1/#cf)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnFill {
    /// "Balance content equally between columns, as far as possible."
    #[default]
    Balance,
    /// "Fills columns sequentially."
    Auto,
}

/// [§ 5.1 'flex-direction'](https://www.w3.org/TR/css-flexbox-1/#flex-direction-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    /// Main axis is the inline axis.
    #[default]
    Row,
    /// Same as row, reversed.
    RowReverse,
    /// Main axis is the block axis.
    Column,
    /// Same as column, reversed.
    ColumnReverse,
}

/// [§ 8.2 'justify-content'](https://www.w3.org/TR/css-flexbox-1/#justify-content-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JustifyContent {
    /// "Flex items are packed toward the start of the line."
    #[default]
    FlexStart,
    /// "Flex items are packed toward the end of the line."
    FlexEnd,
    /// "Flex items are packed toward the center of the line."
    Center,
    /// "Flex items are evenly distributed in the line."
    SpaceBetween,
    /// "Flex items are evenly distributed in the line, with half-size spaces
    /// on either end."
    SpaceAround,
    /// Equal space between and around items.
    SpaceEvenly,
}

/// [§ 3.2 box-sizing](https://www.w3.org/TR/css-sizing-3/#box-sizing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxSizing {
    /// Sizing properties refer to the content box.
    #[default]
    ContentBox,
    /// Sizing properties refer to the border box.
    BorderBox,
}

/// [§ 4.1 The RGB functions](https://www.w3.org/TR/css-color-4/#rgb-functions)
///
/// Decoded from `#rgb`, `#rrggbb` or `#rrggbbaa` in JSON styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque black, the initial `color`.
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let invalid = || Error::InvalidValue(value.clone());
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut out = [0_u8; 3];
                for (slot, c) in out.iter_mut().zip(hex.chars()) {
                    let doubled: String = [c, c].iter().collect();
                    *slot = channel(&doubled)?;
                }
                Ok(Self {
                    r: out[0],
                    g: out[1],
                    b: out[2],
                    a: 255,
                })
            }
            6 | 8 if hex.is_ascii() => Ok(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: if hex.len() == 8 {
                    channel(&hex[6..8])?
                } else {
                    255
                },
            }),
            _ => Err(invalid()),
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

/// One side's border: width in pixels, style and color.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Border {
    /// [§ 4.4 Line Thickness: the border-width properties](https://www.w3.org/TR/css-backgrounds-3/#border-width)
    pub width: f32,
    /// [§ 4.3 Line Patterns: the border-style properties](https://www.w3.org/TR/css-backgrounds-3/#border-style)
    pub style: BorderStyle,
    /// [§ 4.1 Line Colors: the border-color properties](https://www.w3.org/TR/css-backgrounds-3/#border-color)
    pub color: Color,
}

impl Border {
    /// [§ 4.4](https://www.w3.org/TR/css-backgrounds-3/#border-width)
    ///
    /// "If border-style is none or hidden, the used width is 0."
    #[must_use]
    pub fn used_width(&self) -> f32 {
        match self.style {
            BorderStyle::None | BorderStyle::Hidden => 0.0,
            _ => self.width,
        }
    }
}

/// Computed styles for one box.
///
/// [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
///
/// Field names follow the CSS property names; JSON uses the kebab-case
/// property spelling (`"margin-top": "10px"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComputedStyle {
    /// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
    pub display: Display,
    /// 'position'
    pub position: Position,
    /// 'float'
    pub float: Float,
    /// 'clear'
    pub clear: Clear,

    /// [§ 9.3.2 Box offsets](https://www.w3.org/TR/CSS2/visuren.html#position-props)
    pub top: AutoLength,
    /// Box offset from the right edge of the containing block.
    pub right: AutoLength,
    /// Box offset from the bottom edge of the containing block.
    pub bottom: AutoLength,
    /// Box offset from the left edge of the containing block.
    pub left: AutoLength,

    /// [§ 10.2 'width'](https://www.w3.org/TR/CSS2/visudet.html#the-width-property)
    ///
    /// "This property specifies the content width of boxes."
    pub width: AutoLength,
    /// [§ 10.5 'height'](https://www.w3.org/TR/CSS2/visudet.html#the-height-property)
    pub height: AutoLength,
    /// [§ 10.4 'min-width'](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths)
    ///
    /// `auto` behaves as zero outside of flex items.
    pub min_width: AutoLength,
    /// 'max-width'; `None` is the keyword `none`.
    pub max_width: Option<Length>,
    /// 'min-height'
    pub min_height: AutoLength,
    /// 'max-height'; `None` is the keyword `none`.
    pub max_height: Option<Length>,
    /// 'box-sizing'
    pub box_sizing: BoxSizing,

    /// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
    pub margin_top: AutoLength,
    /// 'margin-right'
    pub margin_right: AutoLength,
    /// 'margin-bottom'
    pub margin_bottom: AutoLength,
    /// 'margin-left'
    pub margin_left: AutoLength,

    /// [§ 8.4 Padding properties](https://www.w3.org/TR/CSS2/box.html#padding-properties)
    pub padding_top: Length,
    /// 'padding-right'
    pub padding_right: Length,
    /// 'padding-bottom'
    pub padding_bottom: Length,
    /// 'padding-left'
    pub padding_left: Length,

    /// 'border-top-*'
    pub border_top: Border,
    /// 'border-right-*'
    pub border_right: Border,
    /// 'border-bottom-*'
    pub border_bottom: Border,
    /// 'border-left-*'
    pub border_left: Border,

    /// 'overflow'
    pub overflow: Overflow,

    /// [§ 3.1 'break-before'](https://www.w3.org/TR/css-break-3/#break-between)
    pub break_before: BreakValue,
    /// 'break-after'
    pub break_after: BreakValue,
    /// 'break-inside'
    pub break_inside: BreakInside,
    /// [§ 3.3 Breaks Between Lines: orphans, widows](https://www.w3.org/TR/css-break-3/#widows-orphans)
    pub orphans: u32,
    /// 'widows'
    pub widows: u32,
    /// 'margin-break'
    pub margin_break: MarginBreak,
    /// 'box-decoration-break'
    pub box_decoration_break: BoxDecorationBreak,
    /// [§ 3.1 Page type selector: the 'page' property](https://www.w3.org/TR/css-page-3/#using-named-pages)
    ///
    /// `None` is `auto`.
    pub page: Option<String>,

    /// [§ 3.5 'font-size'](https://www.w3.org/TR/css-fonts-4/#font-size-prop), in pixels.
    pub font_size: f32,
    /// 'line-height'
    pub line_height: LineHeight,
    /// 'white-space'
    pub white_space: WhiteSpace,
    /// 'text-align'
    pub text_align: TextAlign,
    /// 'text-align-last'
    pub text_align_last: TextAlignLast,
    /// [§ 8.1 'text-indent'](https://www.w3.org/TR/css-text-3/#text-indent-property)
    pub text_indent: Length,
    /// 'word-spacing', in pixels.
    pub word_spacing: f32,
    /// 'letter-spacing', in pixels.
    pub letter_spacing: f32,
    /// 'direction'
    pub direction: Direction,
    /// 'vertical-align'
    pub vertical_align: VerticalAlign,
    /// The content language, used for break opportunities.
    pub lang: Option<String>,

    /// [§ 17.6.1 'border-collapse'](https://www.w3.org/TR/CSS2/tables.html#separated-borders)
    pub border_collapse: BorderCollapse,
    /// 'border-spacing' as (horizontal, vertical) pixels.
    pub border_spacing: (f32, f32),
    /// 'table-layout'
    pub table_layout: TableLayout,
    /// 'caption-side'
    pub caption_side: CaptionSide,

    /// [§ 3 The number and width of columns](https://www.w3.org/TR/css-multicol-1/#the-number-and-width-of-columns)
    ///
    /// `None` is `auto`.
    pub column_count: Option<u32>,
    /// 'column-width'; `None` is `auto`.
    pub column_width: Option<f32>,
    /// 'column-gap'; `None` is `normal` (1em).
    pub column_gap: Option<f32>,
    /// 'column-fill'
    pub column_fill: ColumnFill,

    /// 'flex-direction'
    pub flex_direction: FlexDirection,
    /// 'flex-grow'
    pub flex_grow: f32,
    /// 'flex-shrink'
    pub flex_shrink: f32,
    /// 'flex-basis'; `auto` defers to 'width'/'height'.
    pub flex_basis: AutoLength,
    /// 'justify-content'
    pub justify_content: JustifyContent,

    /// 'z-index'; `None` is `auto`. Painting order only.
    pub z_index: Option<i32>,
    /// 'opacity'. Painting only.
    pub opacity: f32,
    /// Whether 'transform' is something other than `none`. A transformed
    /// box is a containing block for absolutely positioned descendants.
    pub transform: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Inline,
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            top: AutoLength::Auto,
            right: AutoLength::Auto,
            bottom: AutoLength::Auto,
            left: AutoLength::Auto,
            width: AutoLength::Auto,
            height: AutoLength::Auto,
            min_width: AutoLength::Auto,
            max_width: None,
            min_height: AutoLength::Auto,
            max_height: None,
            box_sizing: BoxSizing::ContentBox,
            margin_top: AutoLength::px(0.0),
            margin_right: AutoLength::px(0.0),
            margin_bottom: AutoLength::px(0.0),
            margin_left: AutoLength::px(0.0),
            padding_top: Length::ZERO,
            padding_right: Length::ZERO,
            padding_bottom: Length::ZERO,
            padding_left: Length::ZERO,
            border_top: Border::default(),
            border_right: Border::default(),
            border_bottom: Border::default(),
            border_left: Border::default(),
            overflow: Overflow::Visible,
            break_before: BreakValue::Auto,
            break_after: BreakValue::Auto,
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
            margin_break: MarginBreak::Auto,
            box_decoration_break: BoxDecorationBreak::Slice,
            page: None,
            font_size: 16.0,
            line_height: LineHeight::Normal,
            white_space: WhiteSpace::Normal,
            text_align: TextAlign::Start,
            text_align_last: TextAlignLast::Auto,
            text_indent: Length::ZERO,
            word_spacing: 0.0,
            letter_spacing: 0.0,
            direction: Direction::Ltr,
            vertical_align: VerticalAlign::Baseline,
            lang: None,
            border_collapse: BorderCollapse::Separate,
            border_spacing: (0.0, 0.0),
            table_layout: TableLayout::Auto,
            caption_side: CaptionSide::Top,
            column_count: None,
            column_width: None,
            column_gap: None,
            column_fill: ColumnFill::Balance,
            flex_direction: FlexDirection::Row,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: AutoLength::Auto,
            justify_content: JustifyContent::FlexStart,
            z_index: None,
            opacity: 1.0,
            transform: false,
        }
    }
}

impl ComputedStyle {
    /// A style with the given display and initial values everywhere else.
    #[must_use]
    pub fn with_display(display: Display) -> Self {
        Self {
            display,
            ..Self::default()
        }
    }

    /// [§ 7 Inheritance](https://www.w3.org/TR/css-cascade-4/#inheriting)
    ///
    /// Style of an anonymous box generated inside a box with `parent` style:
    /// inherited properties come from the parent, everything else takes its
    /// initial value.
    #[must_use]
    pub fn anonymous_from(parent: &Self, display: Display) -> Self {
        Self {
            display,
            font_size: parent.font_size,
            line_height: parent.line_height,
            white_space: parent.white_space,
            text_align: parent.text_align,
            text_align_last: parent.text_align_last,
            text_indent: parent.text_indent,
            word_spacing: parent.word_spacing,
            letter_spacing: parent.letter_spacing,
            direction: parent.direction,
            lang: parent.lang.clone(),
            orphans: parent.orphans,
            widows: parent.widows,
            border_collapse: parent.border_collapse,
            border_spacing: parent.border_spacing,
            caption_side: parent.caption_side,
            ..Self::default()
        }
    }

    /// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
    ///
    /// "Floats, absolutely positioned elements, block containers (such as
    /// inline-blocks, table-cells, and table-captions) that are not block
    /// boxes, and block boxes with 'overflow' other than 'visible' (except
    /// when that value has been propagated to the viewport) establish new
    /// block formatting contexts for their contents."
    #[must_use]
    pub fn establishes_formatting_context(&self) -> bool {
        self.is_floated()
            || self.is_absolutely_positioned()
            || self.overflow != Overflow::Visible
            || matches!(
                self.display,
                Display::InlineBlock
                    | Display::FlowRoot
                    | Display::TableCell
                    | Display::TableCaption
                    | Display::Flex
                    | Display::InlineFlex
                    | Display::Grid
                    | Display::InlineGrid
                    | Display::Table
                    | Display::InlineTable
            )
            || self.column_count.is_some()
            || self.column_width.is_some()
    }

    /// `float: left | right`. Footnotes are handled separately.
    #[must_use]
    pub const fn is_floated(&self) -> bool {
        matches!(self.float, Float::Left | Float::Right)
    }

    /// `position: absolute | fixed`
    #[must_use]
    pub const fn is_absolutely_positioned(&self) -> bool {
        matches!(self.position, Position::Absolute | Position::Fixed)
    }

    /// Whether the box is taken out of normal flow.
    #[must_use]
    pub const fn is_out_of_flow(&self) -> bool {
        self.is_floated()
            || self.is_absolutely_positioned()
            || matches!(self.float, Float::Footnote)
    }

    /// [§ 10.1 Definition of "containing block"](https://www.w3.org/TR/CSS2/visudet.html#containing-block-details)
    ///
    /// Whether this box is the containing block of absolutely positioned
    /// descendants.
    #[must_use]
    pub const fn is_absolute_containing_block(&self) -> bool {
        !matches!(self.position, Position::Static) || self.transform
    }

    /// Whether this box is a multi-column container.
    #[must_use]
    pub const fn is_multicol(&self) -> bool {
        self.column_count.is_some() || self.column_width.is_some()
    }

    /// The used `column-gap` in pixels.
    #[must_use]
    pub fn used_column_gap(&self) -> f32 {
        self.column_gap.unwrap_or(self.font_size)
    }

    /// The used `line-height` in pixels.
    #[must_use]
    pub fn used_line_height(&self) -> f32 {
        self.line_height.resolve(self.font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_forms() {
        let short = Color::try_from("#f00".to_string()).expect("valid color");
        assert_eq!((short.r, short.g, short.b, short.a), (255, 0, 0, 255));
        let long = Color::try_from("#00ff0080".to_string()).expect("valid color");
        assert_eq!((long.g, long.a), (255, 128));
        assert!(Color::try_from("red".to_string()).is_err());
    }

    #[test]
    fn test_anonymous_style_inherits_only_inherited_properties() {
        let parent = ComputedStyle {
            font_size: 20.0,
            margin_top: AutoLength::px(30.0),
            ..ComputedStyle::with_display(Display::Block)
        };
        let anon = ComputedStyle::anonymous_from(&parent, Display::Block);
        assert_eq!(anon.font_size, 20.0);
        assert_eq!(anon.margin_top, AutoLength::px(0.0));
    }

    #[test]
    fn test_hidden_border_has_no_used_width() {
        let border = Border {
            width: 4.0,
            style: BorderStyle::Hidden,
            color: Color::BLACK,
        };
        assert_eq!(border.used_width(), 0.0);
    }
}
