//! Text shaping service.
//!
//! [§ 5 Line Breaking and Word Boundaries](https://www.w3.org/TR/css-text-3/#line-breaking)
//!
//! Layout never measures glyphs itself. It asks a [`TextShaper`] for "the
//! first line of this text that fits in this width" and works with the
//! returned byte offsets and metrics.

use crate::style::ComputedStyle;

/// Result of shaping the first line of a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedLine {
    /// Number of bytes of the input that belong to this line.
    pub length: usize,
    /// Byte offset where the next line starts, `None` when the text is
    /// exhausted.
    pub resume_index: Option<usize>,
    /// Advance width of the line's `length` bytes.
    pub width: f32,
    /// Height of the line (its used line height).
    pub height: f32,
    /// Distance from the top of the line to the baseline.
    pub baseline: f32,
    /// The line ended at a preserved newline.
    pub forced_break: bool,
}

/// Text measurement and line-breaking service consumed by inline layout.
pub trait TextShaper {
    /// Shape the first line of `text`.
    ///
    /// With `max_width` set, the line ends at the last break opportunity
    /// whose content fits; trailing spaces hang and are not counted against
    /// the width. If nothing fits, the line ends at the first opportunity
    /// (the caller decides whether to overflow). `None` breaks only at
    /// forced breaks. `is_line_start` tells whether the text begins a line,
    /// for shapers that treat leading spaces specially.
    fn split_first_line(
        &self,
        text: &str,
        style: &ComputedStyle,
        max_width: Option<f32>,
        is_line_start: bool,
    ) -> ShapedLine;

    /// Whether `text` has a soft wrap opportunity between two of its
    /// characters. `None` when the text is too short to tell.
    fn can_break_text(&self, text: &str, lang: Option<&str>) -> Option<bool>;

    /// Advance width of `text` on a single line.
    fn text_width(&self, text: &str, style: &ComputedStyle) -> f32;

    /// [§ 10.8.1 Leading and half-leading](https://www.w3.org/TR/CSS2/visudet.html#leading)
    ///
    /// The strut of `style`: `(line_height, baseline)`, the baseline being
    /// measured from the top of the line.
    fn strut(&self, style: &ComputedStyle) -> (f32, f32);
}

/// Fixed-advance metrics for deterministic layout.
///
/// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
///
/// "CSS assumes that every font has font metrics that specify a
/// characteristic height above the baseline and a depth below it."
///
/// Every character advances 0.6 em, the ascent is 0.8 em and the descent
/// 0.2 em. Soft wraps happen after spaces and after hyphens; ideographs
/// (and the U+2E80 stand-in for atomic inlines) break on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceShaper;

const CHAR_WIDTH_RATIO: f32 = 0.6;
const ASCENT_RATIO: f32 = 0.8;

fn is_ideographic(c: char) -> bool {
    c >= '\u{2E80}'
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\u{00A0}' | '\t')
}

/// [§ 5.1 Line Breaking Details](https://www.w3.org/TR/css-text-3/#line-break-details)
///
/// Soft wrap opportunity between `before` and `after`. No-break spaces
/// never allow a break after them.
fn is_break_between(before: char, after: char) -> bool {
    !is_space(after)
        && ((before == ' ' || before == '\t')
            || before == '-'
            || is_ideographic(before)
            || is_ideographic(after))
}

impl MonospaceShaper {
    fn advance(c: char, style: &ComputedStyle) -> f32 {
        let mut advance = style.font_size * CHAR_WIDTH_RATIO + style.letter_spacing;
        if c == ' ' || c == '\u{00A0}' {
            advance += style.word_spacing;
        }
        advance
    }
}

impl TextShaper for MonospaceShaper {
    fn split_first_line(
        &self,
        text: &str,
        style: &ComputedStyle,
        max_width: Option<f32>,
        _is_line_start: bool,
    ) -> ShapedLine {
        let (height, baseline) = self.strut(style);
        let wraps = style.white_space.wraps();
        let newlines = style.white_space.preserves_newlines();
        let fits = |content: f32| max_width.is_none_or(|max| content <= max + 0.001);
        let soft = |length: usize, width: f32| ShapedLine {
            length,
            resume_index: Some(length),
            width,
            height,
            baseline,
            forced_break: false,
        };

        // `width` covers text[..offset]; `content_width` stops at the last
        // non-space character since trailing spaces hang.
        let mut width = 0.0_f32;
        let mut content_width = 0.0_f32;
        let mut best: Option<(usize, f32)> = None;
        let mut previous: Option<char> = None;

        for (offset, c) in text.char_indices() {
            if newlines && c == '\n' {
                if !fits(content_width)
                    && let Some((length, line_width)) = best
                {
                    return soft(length, line_width);
                }
                let resume = offset + 1;
                return ShapedLine {
                    length: offset,
                    resume_index: (resume < text.len()).then_some(resume),
                    width,
                    height,
                    baseline,
                    forced_break: true,
                };
            }

            if wraps
                && let Some(prev) = previous
                && is_break_between(prev, c)
                && max_width.is_some()
            {
                if !fits(content_width) {
                    let (length, line_width) = best.unwrap_or((offset, width));
                    return soft(length, line_width);
                }
                best = Some((offset, width));
            }

            width += Self::advance(c, style);
            if !is_space(c) {
                content_width = width;
            }
            previous = Some(c);
        }

        if !fits(content_width)
            && let Some((length, line_width)) = best
        {
            return soft(length, line_width);
        }
        ShapedLine {
            length: text.len(),
            resume_index: None,
            width,
            height,
            baseline,
            forced_break: false,
        }
    }

    fn can_break_text(&self, text: &str, _lang: Option<&str>) -> Option<bool> {
        let mut chars = text.chars();
        let mut previous = chars.next()?;
        let mut seen_two = false;
        for c in chars {
            seen_two = true;
            if is_break_between(previous, c) {
                return Some(true);
            }
            previous = c;
        }
        seen_two.then_some(false)
    }

    fn text_width(&self, text: &str, style: &ComputedStyle) -> f32 {
        text.chars().map(|c| Self::advance(c, style)).sum()
    }

    fn strut(&self, style: &ComputedStyle) -> (f32, f32) {
        let line_height = style.used_line_height();
        let half_leading = (line_height - style.font_size) / 2.0;
        (line_height, half_leading + style.font_size * ASCENT_RATIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(font_size: f32) -> ComputedStyle {
        ComputedStyle {
            font_size,
            ..ComputedStyle::default()
        }
    }

    #[test]
    fn test_split_at_last_fitting_space() {
        let line = MonospaceShaper.split_first_line(
            "aaaaaaaaaa bbbbbbbbbbbbbb",
            &style(10.0),
            Some(100.0),
            true,
        );
        assert_eq!(line.length, 11);
        assert_eq!(line.resume_index, Some(11));
        assert!((line.width - 66.0).abs() < 0.01);
    }

    #[test]
    fn test_unconstrained_takes_everything() {
        let line = MonospaceShaper.split_first_line("abc def", &style(10.0), None, true);
        assert_eq!(line.length, 7);
        assert_eq!(line.resume_index, None);
    }

    #[test]
    fn test_can_break_text() {
        assert_eq!(MonospaceShaper.can_break_text("a b", None), Some(true));
        assert_eq!(MonospaceShaper.can_break_text("ab", None), Some(false));
        assert_eq!(MonospaceShaper.can_break_text("a", None), None);
    }
}
