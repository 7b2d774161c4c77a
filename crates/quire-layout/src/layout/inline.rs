//! Inline formatting contexts and line breaking.
//!
//! [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
//!
//! "In an inline formatting context, boxes are laid out horizontally, one
//! after the other, beginning at the top of a containing block."
//!
//! "When an inline box exceeds the width of a line box, it is split into
//! several boxes and these boxes are distributed across several line
//! boxes."
//!
//! A block container holding inline content has a single [`BoxKind::Line`]
//! child whose children are the inline-level boxes. [`LineBoxes`] cuts
//! that content into successive line fragments, each carrying the skip
//! stack where the next line starts.

use std::rc::Rc;

use log::trace;

use crate::style::{
    BoxDecorationBreak, Direction, Float, OuterDisplay, Overflow, Position, TextAlign,
    TextAlignLast, VerticalAlign, WhiteSpace,
};

use super::block::block_container_layout;
use super::box_model::{AutoOr, EdgeSizes};
use super::boxes::{BoxId, BoxKind, LayoutBox, TableRole};
use super::context::{BrokenOutOfFlow, EPSILON, LayoutContext};
use super::flex::flex_layout;
use super::float::{avoid_collisions, float_layout, float_width};
use super::percent::{ContainingBlock, resolve_percentages};
use super::preferred::{margin_width, min_content_width, shrink_to_fit, trailing_whitespace_size};
use super::replaced::replaced_box_width_height;
use super::skip_stack::SkipStack;
use super::table::table_wrapper_width;

/// Successive line boxes of one block container.
///
/// Lines are produced on demand, so a caller checking widows can look a
/// few lines ahead without laying out the rest of the paragraph.
pub(crate) struct LineBoxes<'b> {
    line: &'b LayoutBox,
    containing_block: LayoutBox,
    position_y: f32,
    bottom_space: f32,
    skip_stack: Option<SkipStack>,
    text_indent: f32,
    /// Floats already placed by earlier lines.
    placed_floats: Vec<BoxId>,
    done: bool,
}

impl<'b> LineBoxes<'b> {
    /// Lines of `line` inside `containing_block`, the first one starting
    /// at `position_y` (or where `skip_stack` says when resuming).
    pub(crate) fn new(
        line: &'b LayoutBox,
        containing_block: &LayoutBox,
        position_y: f32,
        bottom_space: f32,
        skip_stack: Option<SkipStack>,
    ) -> Self {
        // [§ 8.1 'text-indent'](https://www.w3.org/TR/css-text-3/#text-indent-property)
        //
        // "Since the 'text-indent' property only affects the first formatted
        // line of an element, it is not applied after a break."
        let text_indent = if skip_stack.is_none() {
            let width = containing_block.content_width();
            line.style.text_indent.resolve(width)
        } else {
            0.0
        };
        Self {
            line,
            containing_block: containing_block.copy_with_children(Vec::new()),
            position_y,
            bottom_space,
            skip_stack,
            text_indent,
            placed_floats: Vec::new(),
            done: false,
        }
    }

    /// The next line and where the line after it starts, `None` when the
    /// content is exhausted.
    pub(crate) fn next_line(
        &mut self,
        ctx: &mut LayoutContext<'_>,
    ) -> Option<(LayoutBox, Option<SkipStack>)> {
        if self.done {
            return None;
        }
        let Some((line, resume_at)) = self.next_linebox(ctx) else {
            self.done = true;
            return None;
        };
        self.position_y = line.position_y + line.content_height();
        self.text_indent = 0.0;
        match &resume_at {
            Some(resume_at) => self.skip_stack = Some(resume_at.clone()),
            None => self.done = true,
        }
        trace!(
            "line at y={} height={} width={} resume={:?}",
            line.position_y,
            line.content_height(),
            line.content_width(),
            resume_at
        );
        Some((line, resume_at))
    }

    /// Shift the lines still to come.
    pub(crate) fn translate(&mut self, dy: f32) {
        self.position_y += dy;
    }

    fn next_linebox(
        &mut self,
        ctx: &mut LayoutContext<'_>,
    ) -> Option<(LayoutBox, Option<SkipStack>)> {
        // STEP 1: Skip the collapsible spaces starting the line.
        // [§ 4.1.3 Phase II](https://www.w3.org/TR/css-text-3/#white-space-phase-2)
        //
        // "A sequence of collapsible spaces at the beginning of a line is
        // removed."
        let skip_stack = match skip_first_whitespace(self.line, self.skip_stack.as_ref()) {
            Leading::Exhausted => return None,
            Leading::Resume(skip_stack) => skip_stack,
        };

        let cb = &self.containing_block;
        let rtl = cb.style.direction == Direction::Rtl;
        let mut linebox = self.line.copy_with_children(Vec::new());
        linebox.position_x = cb.content_box_x();
        linebox.position_y = self.position_y;
        linebox.margin = EdgeSizes::default();
        linebox.padding = EdgeSizes::default();
        linebox.border = EdgeSizes::default();

        // STEP 2: Find the band next to the floats.
        // [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
        //
        // "The border box of a table, a block-level replaced element, or an
        // element in the normal flow that establishes a new block formatting
        // context [...] must not overlap the margin box of any floats."
        //
        // Line boxes are shortened instead; they need at least the width of
        // their first unbreakable piece of content.
        if ctx.excluded_shapes().is_empty() {
            linebox.width = AutoOr::Length(0.0);
            linebox.height = AutoOr::Length(0.0);
        } else {
            let first_piece = first_segment_width(ctx, self.line, skip_stack.as_ref())
                .unwrap_or(0.0);
            linebox.width = AutoOr::Length(first_piece);
            linebox.height = AutoOr::Length(ctx.shaper.strut(&linebox.style).0);
        }
        let (mut position_x, mut position_y, mut available_width) =
            avoid_collisions(ctx, &linebox, cb, false);
        let mut candidate_height = linebox.content_height();
        let checkpoint = ctx.checkpoint();
        let shapes_before_line = ctx.excluded_shapes_len();

        // STEP 3: Fill the line, then grow it until its height is stable.
        //
        // A line taller than expected may collide with floats the shorter
        // candidate did not reach; lay it out again in the new band.
        let (mut line, resume_at, state, band_width) = loop {
            let original_x = position_x;
            let original_y = position_y;
            let original_width = linebox.content_width();
            linebox.position_x = position_x;
            linebox.position_y = position_y;
            let (start_x, max_x) = if rtl {
                (position_x, position_x + available_width - self.text_indent)
            } else {
                (position_x + self.text_indent, position_x + available_width)
            };

            let mut state = LineState::new(&self.placed_floats);
            let split = split_inline_box(
                ctx,
                &linebox,
                &self.line.children,
                start_x,
                max_x,
                self.bottom_space,
                skip_stack.as_ref(),
                cb,
                &mut state,
            );
            let mut line = split.new_box;
            let resume_at = split.resume_at;
            linebox.width = line.width;
            linebox.height = line.height;

            if is_phantom_linebox(&line) && !split.preserved_line_break {
                // [§ 9.4.2](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
                //
                // "Line boxes that contain no text, no preserved white
                // space, no inline elements with non-zero margins, padding,
                // or borders or other in-flow content [...] must be treated
                // as zero-height line boxes."
                line.height = AutoOr::Length(0.0);
                line.baseline = Some(0.0);
                line.position_y = position_y;
                break (line, resume_at, state, available_width);
            }

            remove_last_whitespace(ctx, &mut line);

            let (_, _, new_available_width) = avoid_collisions(ctx, &linebox, cb, false);
            let last = resume_at.is_none() || split.preserved_line_break;
            let offset_x = text_align(&mut line, new_available_width, last);

            let (bottom, top) = line_box_verticality(&mut line);
            line.baseline = Some(-top);
            line.position_y = top;
            line.height = AutoOr::Length(bottom - top);
            line.margin = EdgeSizes::default();
            translate_ignoring_floats(&mut line, offset_x, position_y - top);
            line.position_y = position_y;

            if line.content_height() <= candidate_height + EPSILON {
                break (line, resume_at, state, new_available_width);
            }
            candidate_height = line.content_height();

            let new_shapes = ctx.split_off_excluded_shapes(shapes_before_line);
            let (new_x, new_y, new_width) = avoid_collisions(ctx, &line, cb, false);
            let unchanged = if rtl {
                (new_x + line.content_width() - (original_x + original_width)).abs() < EPSILON
                    && (new_y - original_y).abs() < EPSILON
            } else {
                (new_x - original_x).abs() < EPSILON && (new_y - original_y).abs() < EPSILON
            };
            if unchanged {
                ctx.restore_excluded_shapes(new_shapes);
                break (line, resume_at, state, new_available_width);
            }
            trace!("line taller than its band, retrying at y={new_y}");
            ctx.rollback(checkpoint);
            position_x = new_x;
            position_y = new_y;
            available_width = new_width;
        };

        ctx.prune_since(checkpoint, &line);

        // STEP 4: Static positions of the absolutely positioned boxes.
        //
        // [§ 10.3.7](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-width)
        // "the static position for 'left' is the distance from the left edge
        // of the containing block to the left margin edge of a hypothetical
        // box that would have been the first box of the element if its
        // 'position' property had been 'static'"
        let line_bottom = line.position_y + line.content_height();
        for id in &state.placeholders {
            let (line_x, line_y) = (line.position_x, line.position_y);
            if let Some(placeholder) = line.find_mut(*id) {
                if placeholder.style.display.outer() == OuterDisplay::Inline {
                    placeholder.translate(0.0, line_y - placeholder.position_y);
                } else {
                    placeholder.translate(
                        line_x - placeholder.position_x,
                        line_bottom - placeholder.position_y,
                    );
                }
            }
        }

        // STEP 5: Floats that did not fit on the line go below it.
        let mut seen: Vec<BoxId> = Vec::new();
        for (float, float_x) in state.waiting_floats {
            if seen.contains(&float.id) || self.placed_floats.contains(&float.id) {
                continue;
            }
            seen.push(float.id);
            let (mut new_float, float_resume_at) = float_layout(
                ctx,
                &float,
                (float_x, line_bottom),
                cb,
                self.bottom_space,
                None,
            );
            new_float.index = float.index;
            if let Some(resume_at) = float_resume_at {
                ctx.broken_out_of_flow.push(BrokenOutOfFlow {
                    original: float.clone(),
                    resume_at,
                    position_x: new_float.position_x,
                });
            }
            line.children.push(new_float);
        }

        let floats = line.descendants().skip(1).filter(|d| d.is_floated());
        self.placed_floats.extend(floats.map(|d| d.id));

        handle_leader(&mut line, band_width);
        Some((line, resume_at))
    }
}

/// Where the collapsible spaces at a line start end.
enum Leading {
    /// Nothing but spaces left.
    Exhausted,
    /// Resume there.
    Resume(Option<SkipStack>),
}

fn skip_first_whitespace(layout_box: &LayoutBox, skip_stack: Option<&SkipStack>) -> Leading {
    let (mut index, nested) = SkipStack::split(skip_stack);
    match &layout_box.kind {
        BoxKind::Text(text) => {
            if index >= text.len() {
                return Leading::Exhausted;
            }
            if layout_box.style.white_space.collapses_spaces() {
                let rest = &text[index..];
                index += rest.len() - rest.trim_start_matches(' ').len();
            }
            Leading::Resume((index > 0).then(|| SkipStack::leaf(index)))
        }
        BoxKind::Line | BoxKind::Inline => {
            if index == 0 && layout_box.children.is_empty() {
                return Leading::Resume(None);
            }
            let Some(child) = layout_box.children.get(index) else {
                return Leading::Exhausted;
            };
            let mut result = skip_first_whitespace(child, nested.as_ref());
            while matches!(result, Leading::Exhausted) {
                index += 1;
                let Some(child) = layout_box.children.get(index) else {
                    return Leading::Exhausted;
                };
                result = skip_first_whitespace(child, None);
            }
            match result {
                Leading::Resume(nested) if index > 0 || nested.is_some() => {
                    Leading::Resume(Some(SkipStack::new(index, nested)))
                }
                _ => Leading::Resume(None),
            }
        }
        _ => Leading::Resume(None),
    }
}

/// Width of the first piece of content that cannot be broken, starting at
/// `skip_stack`.
fn first_segment_width(
    ctx: &LayoutContext<'_>,
    layout_box: &LayoutBox,
    skip_stack: Option<&SkipStack>,
) -> Option<f32> {
    match &layout_box.kind {
        BoxKind::Text(text) => {
            let skip = skip_stack.map_or(0, SkipStack::index);
            let rest = text.get(skip..)?.trim_start_matches(' ');
            if rest.is_empty() {
                return None;
            }
            let shaped = ctx
                .shaper
                .split_first_line(rest, &layout_box.style, Some(0.0), true);
            let piece = rest.get(..shaped.length).unwrap_or(rest);
            let piece = piece.trim_end_matches(' ');
            Some(ctx.shaper.text_width(piece, &layout_box.style))
        }
        BoxKind::Line | BoxKind::Inline => {
            let (skip, mut nested) = SkipStack::split(skip_stack);
            layout_box
                .children
                .iter()
                .skip(skip)
                .filter(|child| child.is_in_normal_flow())
                .find_map(|child| first_segment_width(ctx, child, nested.take().as_ref()))
        }
        _ => Some(min_content_width(ctx, layout_box, true)),
    }
}

// ----- splitting -----

/// Break opportunity information at one end of a piece of inline content.
///
/// [§ 5.1 Line Breaking Details](https://www.w3.org/TR/css-text-3/#line-break-details)
#[derive(Debug, Clone, Copy, PartialEq)]
enum Edge {
    /// No content.
    Unknown,
    /// Ends (or starts) with this character.
    Char(char),
    /// Always allows a break (atomic inline, leader start).
    BreakAllowed,
    /// Never allows a break (leader end).
    NoBreak,
}

/// Bookkeeping shared by every box of the line being built.
struct LineState<'p> {
    /// Absolutely positioned boxes met on the line.
    placeholders: Vec<BoxId>,
    /// Floats deferred below the line, with their static x.
    waiting_floats: Vec<(LayoutBox, f32)>,
    /// Number of direct children already put on the line.
    line_children: usize,
    /// Width of left floats placed inside nested inline boxes, by which
    /// the line's earlier children must move.
    pending_shift: f32,
    placed_floats: &'p [BoxId],
}

impl<'p> LineState<'p> {
    fn new(placed_floats: &'p [BoxId]) -> Self {
        Self {
            placeholders: Vec::new(),
            waiting_floats: Vec::new(),
            line_children: 0,
            pending_shift: 0.0,
            placed_floats,
        }
    }
}

/// Result of splitting one inline-level box.
struct InlineSplit<T> {
    new_box: T,
    resume_at: Option<SkipStack>,
    preserved_line_break: bool,
    first: Edge,
    last: Edge,
    /// Margin widths of the floats placed directly in the box, `(left,
    /// right)`.
    float_widths: (f32, f32),
}

/// A fragment on the line and the index of the box it was cut from.
struct Placed {
    index: usize,
    fragment: LayoutBox,
}

/// Lay out the children of a line or inline box from `position_x`, until
/// they reach `max_x`.
fn split_inline_box(
    ctx: &mut LayoutContext<'_>,
    inline: &LayoutBox,
    source_children: &[LayoutBox],
    position_x: f32,
    max_x: f32,
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    state: &mut LineState<'_>,
) -> InlineSplit<LayoutBox> {
    let is_line = inline.is_line();
    let is_start = skip_stack.is_none();
    let rtl = inline.style.direction == Direction::Rtl;
    let clone = inline.style.box_decoration_break == BoxDecorationBreak::Clone;
    let left_spacing = inline.margin.left + inline.border.left + inline.padding.left;
    let right_spacing = inline.margin.right + inline.border.right + inline.padding.right;

    // The start side decorations come before the content on the first
    // fragment only.
    let leading_spacing = if !rtl && (is_start || clone) {
        left_spacing
    } else {
        0.0
    };
    let initial_position_x = position_x;
    let content_box_left = position_x + leading_spacing;
    let mut position_x = content_box_left;
    let mut max_x = max_x;

    let mut children: Vec<Placed> = Vec::new();
    let mut waiting: Vec<Placed> = Vec::new();
    let mut preserved_line_break = false;
    let mut first_letter = Edge::Unknown;
    let mut last_letter = Edge::Unknown;
    let mut float_widths = (0.0_f32, 0.0_f32);
    let mut resume_at = None;
    let mut completed = true;

    let (skip, mut nested) = SkipStack::split(skip_stack);
    for (index, child) in source_children.iter().enumerate().skip(skip) {
        let child_skip = nested.take();

        if child.is_absolutely_positioned() {
            let mut placeholder = child.clone();
            placeholder.index = index;
            placeholder.translate(
                position_x - child.position_x,
                inline.position_y - child.position_y,
            );
            if child.style.position == Position::Fixed {
                ctx.fixed_boxes.push(child.id);
            } else {
                ctx.absolute_boxes.push(child.id);
            }
            state.placeholders.push(child.id);
            waiting.push(Placed {
                index,
                fragment: placeholder,
            });
            continue;
        }

        if child.is_footnote() {
            // The call stays on the line with its body; the block lays the
            // body out once the line is kept.
            let mut call = child.clone();
            call.index = index;
            call.position_x = position_x;
            call.position_y = inline.position_y;
            call.width = AutoOr::Length(0.0);
            call.height = AutoOr::Length(0.0);
            call.margin = EdgeSizes::default();
            call.padding = EdgeSizes::default();
            call.border = EdgeSizes::default();
            waiting.push(Placed {
                index,
                fragment: call,
            });
            continue;
        }

        if child.is_floated() {
            if state.placed_floats.contains(&child.id) {
                continue;
            }
            let cb_width = containing_block.content_width();
            let available = (cb_width - margin_width(child, 0.0, true, true)).max(0.0);
            let mut width = margin_width(child, shrink_to_fit(ctx, child, available), true, true);

            // The trailing spaces of the line hang: they leave room for
            // the float.
            if let Some(last_in_flow) = children
                .iter()
                .chain(waiting.iter())
                .rev()
                .map(|placed| &placed.fragment)
                .find(|fragment| !fragment.is_floated())
            {
                width -= trailing_whitespace_size(ctx, last_in_flow);
            }

            if width > max_x - position_x + EPSILON || !state.waiting_floats.is_empty() {
                trace!("float {} deferred below the line", child.label());
                let mut deferred = child.clone();
                deferred.index = index;
                state.waiting_floats.push((deferred, position_x));
                continue;
            }

            let (mut new_float, float_resume_at) = float_layout(
                ctx,
                child,
                (position_x, inline.position_y),
                containing_block,
                bottom_space,
                None,
            );
            new_float.index = index;
            if let Some(resume_at) = float_resume_at {
                ctx.broken_out_of_flow.push(BrokenOutOfFlow {
                    original: child.clone(),
                    resume_at,
                    position_x: new_float.position_x,
                });
            }

            let dx = new_float.margin_width().max(0.0);
            let is_left = child.style.float == Float::Left;
            if is_left {
                float_widths.0 += dx;
                if is_line {
                    position_x += dx;
                }
            } else {
                float_widths.1 += dx;
                max_x -= dx;
            }
            if is_left != rtl {
                if is_line {
                    shift_in_flow(&mut children, &mut waiting, dx);
                } else {
                    state.pending_shift += dx;
                }
            }
            waiting.push(Placed {
                index,
                fragment: new_float,
            });
            continue;
        }

        let last_child = index + 1 == source_children.len();
        let child_max_x = if last_child && !rtl {
            max_x - right_spacing
        } else {
            max_x
        };
        let floats_before = state.waiting_floats.len();
        let split = split_inline_level(
            ctx,
            child,
            (position_x, inline.position_y),
            child_max_x,
            bottom_space,
            child_skip.as_ref(),
            containing_block,
            state,
        );
        if is_line && state.pending_shift != 0.0 {
            let shift = std::mem::take(&mut state.pending_shift);
            shift_in_flow(&mut children, &mut waiting, shift);
        }
        if rtl {
            max_x -= split.float_widths.0;
        } else {
            max_x -= split.float_widths.1;
        }
        preserved_line_break |= split.preserved_line_break;

        if can_break_between(
            ctx,
            last_letter,
            split.first,
            inline.style.white_space,
            inline.style.lang.as_deref(),
        ) {
            children.append(&mut waiting);
        }
        if first_letter == Edge::Unknown {
            first_letter = split.first;
        }
        last_letter = split.last;

        let mut child_resume_at = split.resume_at;
        if let Some(new_child) = split.new_box {
            if is_line {
                state.line_children += 1;
            }
            let trailing_whitespace = new_child
                .text_content()
                .and_then(|text| text.chars().last())
                .is_some_and(is_space_separator);
            let new_position_x = new_child.position_x + new_child.margin_width();

            if new_position_x > max_x + EPSILON && !trailing_whitespace {
                let dropped_floats = state.waiting_floats.split_off(floats_before);
                // Too wide: break inside the waiting children, starting
                // from the end.
                if let Some((kept, rebroken)) = break_waiting_children(
                    ctx,
                    &waiting,
                    source_children,
                    skip_stack,
                    bottom_space,
                    containing_block,
                    state,
                ) {
                    let broken_index = waiting[kept].index;
                    children.extend(waiting.drain(..kept));
                    waiting.clear();
                    if let Some(fragment) = rebroken.new_box {
                        children.push(Placed {
                            index: broken_index,
                            fragment,
                        });
                    }
                    resume_at = Some(SkipStack::new(broken_index, rebroken.resume_at));
                    position_x = line_end(&children, content_box_left);
                    completed = false;
                    break;
                }
                if let Some(last) = children.last() {
                    // Nothing to break in the waiting children: they go to
                    // the next line with this child.
                    resume_at = Some(SkipStack::leaf(last.index + 1));
                    waiting.clear();
                    position_x = line_end(&children, content_box_left);
                    completed = false;
                    break;
                }
                state.waiting_floats.extend(dropped_floats);
            }

            position_x = new_position_x;
            waiting.push(Placed {
                index,
                fragment: new_child,
            });
        }

        if let Some(nested_resume) = child_resume_at.take() {
            children.append(&mut waiting);
            resume_at = Some(SkipStack::new(index, Some(nested_resume)));
            completed = false;
            break;
        }
    }
    if completed {
        children.append(&mut waiting);
    }

    // [§ 2.4.2 Reordering](https://www.w3.org/TR/css-writing-modes-3/#text-direction)
    if rtl && children.len() > 1 {
        let mut in_flow: Vec<&mut LayoutBox> = children
            .iter_mut()
            .map(|placed| &mut placed.fragment)
            .filter(|fragment| fragment.is_in_normal_flow())
            .collect();
        if let Some(start) = in_flow.first().map(|first| first.position_x) {
            let mut x = start;
            for fragment in in_flow.iter_mut().rev() {
                let dx = x - fragment.position_x;
                fragment.translate(dx, 0.0);
                x += fragment.margin_width();
            }
        }
    }

    let is_end = resume_at.is_none();
    let fragments = children.into_iter().map(|placed| placed.fragment).collect();
    let mut new_box = inline.copy_with_children(fragments);
    new_box.is_start = is_start;
    new_box.is_end = is_end;

    if is_line {
        let width = new_box
            .children
            .iter()
            .rev()
            .find(|child| child.is_in_normal_flow())
            .map_or(0.0, |last| {
                last.position_x + last.margin_width() - new_box.position_x
            });
        new_box.width = AutoOr::Length(width);
    } else {
        new_box.position_x = initial_position_x;
        new_box.remove_inline_decoration(!is_start, !is_end);
        if rtl && (is_end || clone) {
            for child in &mut new_box.children {
                child.translate(left_spacing, 0.0);
            }
        }
        new_box.width = AutoOr::Length(position_x - content_box_left);
        translate_ignoring_floats(&mut new_box, float_widths.0, 0.0);
    }

    // [§ 10.8.1 Leading and half-leading](https://www.w3.org/TR/CSS2/visudet.html#leading)
    //
    // "The height of the inline box encloses all glyphs and their
    // half-leading on each side and is thus exactly 'line-height'."
    let (line_height, baseline) = ctx.shaper.strut(&inline.style);
    let font_size = inline.style.font_size;
    let half_leading = (line_height - font_size) / 2.0;
    new_box.height = AutoOr::Length(font_size);
    new_box.margin.top = half_leading - new_box.border.top - new_box.padding.top;
    new_box.margin.bottom = half_leading - new_box.border.bottom - new_box.padding.bottom;
    new_box.baseline = Some(baseline);

    let (first, last) = if inline.is_leader {
        (Edge::BreakAllowed, Edge::NoBreak)
    } else {
        (first_letter, last_letter)
    };
    InlineSplit {
        new_box,
        resume_at,
        preserved_line_break,
        first,
        last,
        float_widths,
    }
}

/// Right edge of the last in-flow fragment.
fn line_end(children: &[Placed], start: f32) -> f32 {
    children
        .iter()
        .rev()
        .map(|placed| &placed.fragment)
        .find(|fragment| fragment.is_in_normal_flow())
        .map_or(start, |last| last.position_x + last.margin_width())
}

fn shift_in_flow(children: &mut [Placed], waiting: &mut [Placed], dx: f32) {
    for placed in children.iter_mut().chain(waiting.iter_mut()) {
        if placed.fragment.is_in_normal_flow() {
            placed.fragment.translate(dx, 0.0);
        }
    }
}

/// Find the last waiting child that can break before its end. Returns its
/// position in `waiting` and the new, shorter fragment.
fn break_waiting_children(
    ctx: &mut LayoutContext<'_>,
    waiting: &[Placed],
    source_children: &[LayoutBox],
    skip_stack: Option<&SkipStack>,
    bottom_space: f32,
    containing_block: &LayoutBox,
    state: &mut LineState<'_>,
) -> Option<(usize, InlineSplit<Option<LayoutBox>>)> {
    for (position, placed) in waiting.iter().enumerate().rev() {
        let fragment = &placed.fragment;
        if !fragment.is_in_normal_flow() || !can_break_inside(ctx, fragment) {
            continue;
        }
        let source = &source_children[placed.index];
        let child_skip = skip_stack
            .filter(|stack| stack.index() == placed.index)
            .and_then(SkipStack::nested);

        // Shrink the allowed width one pixel at a time until the fragment
        // breaks.
        let start = fragment.position_x;
        let mut limit = fragment.position_x + fragment.margin_width() - 1.0;
        while limit > start {
            let floats_before = state.waiting_floats.len();
            let placeholders_before = state.placeholders.len();
            let attempt = split_inline_level(
                ctx,
                source,
                (start, fragment.position_y),
                limit,
                bottom_space,
                child_skip,
                containing_block,
                state,
            );
            if attempt.resume_at.is_some() {
                return Some((position, attempt));
            }
            state.waiting_floats.truncate(floats_before);
            state.placeholders.truncate(placeholders_before);
            limit -= 1.0;
        }
    }
    None
}

/// Lay out one inline-level child at `position`, stopping at `max_x`.
fn split_inline_level(
    ctx: &mut LayoutContext<'_>,
    child: &LayoutBox,
    position: (f32, f32),
    max_x: f32,
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    state: &mut LineState<'_>,
) -> InlineSplit<Option<LayoutBox>> {
    match &child.kind {
        BoxKind::Text(text) => {
            let skip = skip_stack.map_or(0, SkipStack::index);
            let is_line_start = state.line_children == 0;
            let (new_box, resume_index, preserved_line_break) = split_text_box(
                ctx,
                child,
                text,
                position,
                max_x - position.0,
                skip,
                is_line_start,
            );
            let rest = text.get(skip..).unwrap_or_default();
            let first = rest.chars().next().map_or(Edge::Unknown, Edge::Char);
            let last = match resume_index {
                None => text.chars().last(),
                Some(resume) => text.get(..resume).and_then(|before| before.chars().last()),
            }
            .map_or(Edge::Unknown, Edge::Char);
            let (first, last) = if rest.is_empty() {
                (Edge::Unknown, Edge::Unknown)
            } else {
                (first, last)
            };
            InlineSplit {
                new_box,
                resume_at: resume_index.map(SkipStack::leaf),
                preserved_line_break,
                first,
                last,
                float_widths: (0.0, 0.0),
            }
        }
        BoxKind::Inline => {
            let mut prepared = child.copy_with_children(Vec::new());
            resolve_percentages(&mut prepared, ContainingBlock::of(containing_block));
            prepared.position_x = position.0;
            prepared.position_y = position.1;
            let split = split_inline_box(
                ctx,
                &prepared,
                &child.children,
                position.0,
                max_x,
                bottom_space,
                skip_stack,
                containing_block,
                state,
            );
            InlineSplit {
                new_box: Some(split.new_box),
                resume_at: split.resume_at,
                preserved_line_break: split.preserved_line_break,
                first: split.first,
                last: split.last,
                float_widths: split.float_widths,
            }
        }
        _ if child.is_atomic_inline() => {
            // [§ 5.1](https://www.w3.org/TR/css-text-3/#line-break-details)
            //
            // "For soft wrap opportunities defined by the boundary between
            // two characters or atomic inlines, the white-space property on
            // the nearest common ancestor of the two characters controls
            // breaking." Atomic inlines break like ideographs.
            let new_box = atomic_box(ctx, child, position, containing_block);
            InlineSplit {
                new_box: Some(new_box),
                resume_at: None,
                preserved_line_break: false,
                first: Edge::Char('\u{2E80}'),
                last: Edge::Char('\u{2E80}'),
                float_widths: (0.0, 0.0),
            }
        }
        _ => unreachable!("{} has no inline layout", child.label()),
    }
}

/// Cut the first line of `text` from byte `skip`, at most
/// `available_width` wide.
///
/// Returns the fragment (`None` when nothing was consumed), the byte
/// offset where the next line starts, and whether the line ended at a
/// preserved newline.
fn split_text_box(
    ctx: &LayoutContext<'_>,
    text_box: &LayoutBox,
    text: &str,
    position: (f32, f32),
    available_width: f32,
    skip: usize,
    is_line_start: bool,
) -> (Option<LayoutBox>, Option<usize>, bool) {
    let style = &text_box.style;
    let Some(rest) = text.get(skip..) else {
        return (None, None, false);
    };
    if style.font_size == 0.0 || rest.is_empty() {
        return (None, None, false);
    }
    let shaped = ctx
        .shaper
        .split_first_line(rest, style, Some(available_width), is_line_start);
    let resume_index = shaped
        .resume_index
        .filter(|&resume| resume > 0)
        .map(|resume| resume + skip);

    let new_box = (shaped.length > 0).then(|| {
        let (line_height, baseline) = ctx.shaper.strut(style);
        let half_leading = (line_height - style.font_size) / 2.0;
        let mut fragment = text_box.copy_with_children(Vec::new());
        fragment.kind = BoxKind::Text(Rc::from(rest.get(..shaped.length).unwrap_or(rest)));
        fragment.position_x = position.0;
        fragment.position_y = position.1;
        fragment.width = AutoOr::Length(shaped.width);
        // "The height of the content area should be based on the font"
        fragment.height = AutoOr::Length(style.font_size);
        fragment.margin = EdgeSizes {
            top: half_leading,
            bottom: half_leading,
            ..EdgeSizes::default()
        };
        fragment.padding = EdgeSizes::default();
        fragment.border = EdgeSizes::default();
        fragment.baseline = Some(baseline);
        fragment.is_start = skip == 0;
        fragment.is_end = resume_index.is_none();
        fragment.justification_spacing = 0.0;
        fragment
    });
    let forced_break = shaped.forced_break && resume_index.is_some();
    (new_box, resume_index, forced_break)
}

/// [§ 10.3.9 'Inline-block', non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#inlineblock-width)
///
/// Lay out an atomic inline as a unit: inline-blocks and inline tables at
/// their shrink-to-fit width, replaced boxes at their used size.
fn atomic_box(
    ctx: &mut LayoutContext<'_>,
    child: &LayoutBox,
    position: (f32, f32),
    containing_block: &LayoutBox,
) -> LayoutBox {
    let cb = ContainingBlock::of(containing_block);
    let mut new_box = child.copy_with_children(Vec::new());
    resolve_percentages(&mut new_box, cb);
    new_box.position_x = position.0;
    new_box.position_y = position.1;

    match &child.kind {
        BoxKind::Replaced(_) => {
            replaced_box_width_height(&mut new_box, cb);
            new_box.baseline = Some(new_box.margin_height());
            new_box
        }
        BoxKind::Flex => {
            float_width(ctx, &mut new_box, child, cb);
            let mut laid_out = flex_layout(ctx, new_box, &child.children);
            let top = laid_out.position_y;
            let height = laid_out.margin_height();
            let baseline = find_in_flow_baseline(&laid_out, false).map_or(height, |y| y - top);
            laid_out.baseline = Some(baseline);
            laid_out
        }
        _ => {
            if child.is_table_wrapper() {
                table_wrapper_width(ctx, &mut new_box, &child.children, cb);
            }
            float_width(ctx, &mut new_box, child, cb);
            let mut fallback = new_box.copy_with_children(Vec::new());
            let layout = block_container_layout(
                ctx,
                new_box,
                &child.children,
                f32::NEG_INFINITY,
                None,
                true,
                Vec::new(),
                false,
            );
            let mut laid_out = layout.new_box.unwrap_or_else(|| {
                fallback.height = AutoOr::Length(0.0);
                fallback
            });
            laid_out.baseline = Some(inline_block_baseline(&laid_out));
            laid_out
        }
    }
}

/// [§ 10.8.1](https://www.w3.org/TR/CSS2/visudet.html#propdef-vertical-align)
///
/// "The baseline of an 'inline-block' is the baseline of its last line
/// box in the normal flow, unless it has either no in-flow line boxes or
/// if its 'overflow' property has a computed value other than 'visible',
/// in which case the baseline is the bottom margin edge."
///
/// Measured from the margin-box top.
fn inline_block_baseline(layout_box: &LayoutBox) -> f32 {
    if layout_box.is_table_wrapper() {
        let first_row = layout_box
            .children
            .iter()
            .find(|child| matches!(child.kind, BoxKind::Table(TableRole::Table(_))))
            .and_then(|table| table.children.first())
            .and_then(|group| group.children.first());
        if let Some(row) = first_row {
            return row.position_y + row.baseline.unwrap_or(0.0) - layout_box.position_y;
        }
    } else if layout_box.style.overflow == Overflow::Visible
        && let Some(baseline) = find_in_flow_baseline(layout_box, true)
    {
        return baseline - layout_box.position_y;
    }
    layout_box.margin_height()
}

/// Page y of the first (or last) baseline among the in-flow line boxes
/// and table rows of `layout_box`.
pub(crate) fn find_in_flow_baseline(layout_box: &LayoutBox, last: bool) -> Option<f32> {
    if layout_box.is_line() || layout_box.is_row() {
        return layout_box
            .baseline
            .map(|baseline| layout_box.position_y + baseline);
    }
    if matches!(layout_box.kind, BoxKind::Table(TableRole::Caption)) {
        return None;
    }
    let in_flow = |child: &&LayoutBox| child.is_in_normal_flow();
    if last {
        layout_box
            .children
            .iter()
            .rev()
            .filter(in_flow)
            .find_map(|child| find_in_flow_baseline(child, true))
    } else {
        layout_box
            .children
            .iter()
            .filter(in_flow)
            .find_map(|child| find_in_flow_baseline(child, false))
    }
}

// ----- breaking helpers -----

fn is_space_separator(c: char) -> bool {
    matches!(
        c,
        ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Whether a break is allowed between content ending with `last` and
/// content starting with `first`.
fn can_break_between(
    ctx: &LayoutContext<'_>,
    last: Edge,
    first: Edge,
    white_space: WhiteSpace,
    lang: Option<&str>,
) -> bool {
    let last = match last {
        Edge::BreakAllowed => Edge::Char(' '),
        Edge::NoBreak => Edge::Char('\u{00A0}'),
        other => {
            if !white_space.wraps() {
                return false;
            }
            other
        }
    };
    match (last, first) {
        (_, Edge::BreakAllowed) => !matches!(last, Edge::Unknown),
        (Edge::Char(before), Edge::Char(after)) => ctx
            .shaper
            .can_break_text(&format!("{before}{after}"), lang)
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether a laid out fragment has a break opportunity inside.
fn can_break_inside(ctx: &LayoutContext<'_>, fragment: &LayoutBox) -> bool {
    if !fragment.style.white_space.wraps() {
        return false;
    }
    match &fragment.kind {
        BoxKind::Text(text) => ctx
            .shaper
            .can_break_text(text, fragment.style.lang.as_deref())
            .unwrap_or(false),
        BoxKind::Line | BoxKind::Inline => fragment
            .children
            .iter()
            .any(|child| can_break_inside(ctx, child)),
        _ => false,
    }
}

/// [§ 9.4.2](https://www.w3.org/TR/CSS2/visuren.html#phantom-line-box)
fn is_phantom_linebox(line: &LayoutBox) -> bool {
    line.children.iter().all(|child| match child.kind {
        BoxKind::Inline => {
            let style = &child.style;
            let margins = [
                style.margin_top,
                style.margin_right,
                style.margin_bottom,
                style.margin_left,
            ];
            let paddings = [
                style.padding_top,
                style.padding_right,
                style.padding_bottom,
                style.padding_left,
            ];
            let borders = [
                &style.border_top,
                &style.border_right,
                &style.border_bottom,
                &style.border_left,
            ];
            is_phantom_linebox(child)
                && margins
                    .iter()
                    .all(|margin| margin.as_px().is_none_or(|px| px == 0.0))
                && paddings.iter().all(|padding| padding.resolve(0.0) == 0.0)
                && borders.iter().all(|border| border.used_width() == 0.0)
        }
        _ => !child.is_in_normal_flow(),
    })
}

// ----- finishing the line -----

/// [§ 4.1.3 Phase II](https://www.w3.org/TR/css-text-3/#white-space-phase-2)
///
/// "A sequence of collapsible spaces at the end of a line is removed."
///
/// Re-measure the last text of the line without its trailing spaces and
/// shrink its inline ancestors by the difference.
fn remove_last_whitespace(ctx: &LayoutContext<'_>, line: &mut LayoutBox) {
    let mut path = Vec::new();
    let mut node: &LayoutBox = line;
    while matches!(node.kind, BoxKind::Line | BoxKind::Inline) {
        let Some(last) = node.children.last() else {
            return;
        };
        path.push(node.children.len() - 1);
        node = last;
    }
    let BoxKind::Text(text) = &node.kind else {
        return;
    };
    if !node.style.white_space.collapses_spaces() {
        return;
    }
    let stripped = text.trim_end_matches(' ');
    if stripped.len() == text.len() {
        return;
    }
    let new_width = ctx.shaper.text_width(stripped, &node.style);
    let space_width = node.content_width() - new_width;
    let new_text: Rc<str> = Rc::from(stripped);
    let rtl = line.style.direction == Direction::Rtl;

    let mut node = line;
    for index in path {
        node.width = AutoOr::Length(node.content_width() - space_width);
        if rtl {
            node.position_x -= space_width;
        }
        node = &mut node.children[index];
    }
    node.kind = BoxKind::Text(new_text);
    node.width = AutoOr::Length(new_width);
    if rtl {
        node.position_x -= space_width;
    }
}

/// [§ 7.1 Text Alignment](https://www.w3.org/TR/css-text-3/#text-align-property)
///
/// Horizontal offset of the line inside a band of `available_width`.
/// Justified lines are stretched in place and not offset.
fn text_align(line: &mut LayoutBox, available_width: f32, last: bool) -> f32 {
    let width = line.content_width();
    if width >= available_width {
        return 0.0;
    }
    let style = Rc::clone(&line.style);
    let rtl = style.direction == Direction::Rtl;

    // "text-align-last: auto: The content is aligned as for text-align,
    // except that if text-align is justify, the content is aligned as for
    // start."
    let align = if last {
        match style.text_align_last {
            TextAlignLast::Auto if style.text_align == TextAlign::Justify => TextAlign::Start,
            TextAlignLast::Auto => style.text_align,
            TextAlignLast::Start => TextAlign::Start,
            TextAlignLast::End => TextAlign::End,
            TextAlignLast::Left => TextAlign::Left,
            TextAlignLast::Right => TextAlign::Right,
            TextAlignLast::Center => TextAlign::Center,
            TextAlignLast::Justify => TextAlign::Justify,
        }
    } else {
        style.text_align
    };

    let offset = available_width - width;
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Right => offset,
        TextAlign::Start if rtl => offset,
        TextAlign::End if !rtl => offset,
        TextAlign::Start | TextAlign::End => 0.0,
        TextAlign::Center => offset / 2.0,
        TextAlign::Justify => {
            let spaces = count_expandable_spaces(line);
            if spaces > 0 && style.white_space.collapses_spaces() {
                justify_line(line, offset, spaces);
                0.0
            } else if rtl {
                offset
            } else {
                0.0
            }
        }
    }
}

/// [§ 7.3 Justification](https://www.w3.org/TR/css-text-3/#justify-algos)
///
/// Spread `extra_width` over the spaces and no-break spaces of the line.
fn justify_line(line: &mut LayoutBox, extra_width: f32, spaces: usize) {
    let spacing = extra_width / spaces as f32;
    trace!("justifying line with {spaces} spaces, {spacing}px each");
    let _ = add_word_spacing(line, spacing, 0.0);
}

fn count_expandable_spaces(layout_box: &LayoutBox) -> usize {
    match &layout_box.kind {
        BoxKind::Text(text) => text
            .chars()
            .filter(|c| matches!(c, ' ' | '\u{00A0}'))
            .count(),
        BoxKind::Line | BoxKind::Inline => layout_box
            .children
            .iter()
            .filter(|child| child.is_in_normal_flow())
            .map(count_expandable_spaces)
            .sum(),
        _ => 0,
    }
}

/// Widen the text boxes by `spacing` per expandable space, moving what
/// follows. Returns the accumulated advance.
fn add_word_spacing(layout_box: &mut LayoutBox, spacing: f32, x_advance: f32) -> f32 {
    match &layout_box.kind {
        BoxKind::Text(_) => {
            let spaces = count_expandable_spaces(layout_box);
            layout_box.justification_spacing = spacing;
            layout_box.position_x += x_advance;
            let extra = spacing * spaces as f32;
            layout_box.width = AutoOr::Length(layout_box.content_width() + extra);
            x_advance + extra
        }
        BoxKind::Line | BoxKind::Inline => {
            layout_box.position_x += x_advance;
            let before = x_advance;
            let mut x_advance = x_advance;
            for child in &mut layout_box.children {
                if child.is_in_normal_flow() {
                    x_advance = add_word_spacing(child, spacing, x_advance);
                }
            }
            layout_box.width = AutoOr::Length(layout_box.content_width() + x_advance - before);
            x_advance
        }
        _ => {
            layout_box.translate(x_advance, 0.0);
            x_advance
        }
    }
}

/// Move a line or inline box, leaving the floats it contains where they
/// were placed.
fn translate_ignoring_floats(layout_box: &mut LayoutBox, dx: f32, dy: f32) {
    layout_box.position_x += dx;
    layout_box.position_y += dy;
    for child in &mut layout_box.children {
        if child.is_floated() {
            continue;
        }
        if matches!(child.kind, BoxKind::Line | BoxKind::Inline) {
            translate_ignoring_floats(child, dx, dy);
        } else {
            child.translate(dx, dy);
        }
    }
}

// ----- vertical alignment -----

/// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
///
/// Place the boxes of the line vertically with the line's baseline at
/// y = 0. Returns `(max_y, min_y)`, the extent of the margin boxes.
///
/// 'top' and 'bottom' aligned subtrees depend on that extent and are
/// placed in a second pass.
fn line_box_verticality(line: &mut LayoutBox) -> (f32, f32) {
    let mut top_bottom: Vec<BoxId> = Vec::new();
    let (mut max_y, min_y) = aligned_subtree_verticality(line, &mut top_bottom, 0.0);

    let mut subtrees = Vec::new();
    let mut next = 0;
    while let Some(&id) = top_bottom.get(next) {
        next += 1;
        let Some(subtree) = line.find_mut(id) else {
            continue;
        };
        let align = subtree.style.vertical_align;
        let (sub_max, sub_min) = aligned_subtree_verticality(subtree, &mut top_bottom, 0.0);
        subtrees.push((id, align, sub_max, sub_min));
    }

    if let Some(highest) = subtrees
        .iter()
        .map(|(_, _, sub_max, sub_min)| sub_max - sub_min)
        .reduce(f32::max)
    {
        max_y = max_y.max(min_y + highest);
    }
    for (id, align, sub_max, sub_min) in subtrees {
        let dy = if align == VerticalAlign::Top {
            min_y - sub_min
        } else {
            max_y - sub_max
        };
        if let Some(subtree) = line.find_mut(id) {
            subtree.translate(0.0, dy);
        }
    }
    (max_y, min_y)
}

fn aligned_subtree_verticality(
    layout_box: &mut LayoutBox,
    top_bottom: &mut Vec<BoxId>,
    baseline_y: f32,
) -> (f32, f32) {
    let (max_y, min_y) = inline_box_verticality(layout_box, top_bottom, baseline_y);
    let top = baseline_y - layout_box.baseline.unwrap_or(0.0);
    let bottom = top + layout_box.margin_height();
    let max_y = max_y.map_or(bottom, |max_y| max_y.max(bottom));
    let min_y = min_y.map_or(top, |min_y| min_y.min(top));
    (max_y, min_y)
}

/// [§ 10.8.1 'vertical-align'](https://www.w3.org/TR/CSS2/visudet.html#propdef-vertical-align)
///
/// Place the children of an inline box whose baseline is at `baseline_y`.
fn inline_box_verticality(
    layout_box: &mut LayoutBox,
    top_bottom: &mut Vec<BoxId>,
    baseline_y: f32,
) -> (Option<f32>, Option<f32>) {
    if !matches!(layout_box.kind, BoxKind::Line | BoxKind::Inline) {
        return (None, None);
    }
    let font_size = layout_box.style.font_size;
    let parent_baseline = layout_box.baseline.unwrap_or(0.0);
    let content_top = layout_box.margin.top + layout_box.border.top + layout_box.padding.top;
    let content_height = layout_box.content_height();

    let mut max_y: Option<f32> = None;
    let mut min_y: Option<f32> = None;
    for child in &mut layout_box.children {
        if !child.is_in_normal_flow() {
            continue;
        }
        let child_baseline = child.baseline.unwrap_or_else(|| child.margin_height());
        let align = child.style.vertical_align;
        let child_baseline_y = match align {
            VerticalAlign::Baseline => baseline_y,
            // "Align the vertical midpoint of the box with the baseline of
            // the parent box plus half the x-height of the parent."
            VerticalAlign::Middle => {
                let one_ex = font_size * 0.5;
                baseline_y - (one_ex + child.margin_height()) / 2.0 + child_baseline
            }
            VerticalAlign::TextTop => baseline_y - parent_baseline + content_top + child_baseline,
            VerticalAlign::TextBottom => {
                let offset = content_top + content_height - child.margin_height();
                baseline_y - parent_baseline + offset + child_baseline
            }
            VerticalAlign::Top | VerticalAlign::Bottom => 0.0,
            VerticalAlign::Super => baseline_y - child.style.font_size * 0.5,
            VerticalAlign::Sub => baseline_y + child.style.font_size * 0.5,
            VerticalAlign::Length(length) => {
                baseline_y - length.resolve(child.style.used_line_height())
            }
        };

        let top = child_baseline_y - child_baseline;
        if matches!(child.kind, BoxKind::Inline) {
            child.position_y = top;
        } else {
            child.translate(0.0, top - child.position_y);
        }

        if matches!(align, VerticalAlign::Top | VerticalAlign::Bottom) {
            top_bottom.push(child.id);
            continue;
        }

        let bottom = top + child.margin_height();
        min_y = Some(min_y.map_or(top, |min_y| min_y.min(top)));
        max_y = Some(max_y.map_or(bottom, |max_y| max_y.max(bottom)));
        if matches!(child.kind, BoxKind::Inline) {
            let (children_max, children_min) =
                inline_box_verticality(child, top_bottom, child_baseline_y);
            if let Some(children_min) = children_min {
                min_y = Some(min_y.map_or(children_min, |min_y| min_y.min(children_min)));
            }
            if let Some(children_max) = children_max {
                max_y = Some(max_y.map_or(children_max, |max_y| max_y.max(children_max)));
            }
        }
    }
    (max_y, min_y)
}

// ----- leaders -----

/// [§ 4 Leaders](https://www.w3.org/TR/css-gcpm-3/#leaders)
///
/// "A leader is a repeating pattern used to visually connect content
/// across horizontal spaces."
///
/// Repeat the leader's text so that the line fills `band_width`, moving
/// the content after the leader to the end of the line. Copies sit on a
/// grid anchored at the line's end so leaders of successive lines align.
fn handle_leader(line: &mut LayoutBox, band_width: f32) {
    let Some(path) = leader_path(line) else {
        return;
    };
    let used: f32 = line
        .children
        .iter()
        .filter(|child| child.is_in_normal_flow())
        .map(LayoutBox::margin_width)
        .sum();
    let extra_width = band_width - used;
    if extra_width <= 0.0 {
        return;
    }
    let line_end = line.position_x + band_width;

    let mut node: &mut LayoutBox = line;
    for &index in &path {
        node.width = AutoOr::Length(node.content_width() + extra_width);
        // Everything after the leader at this level moves to the end.
        for sibling in node.children.iter_mut().skip(index + 1) {
            sibling.translate(extra_width, 0.0);
        }
        node = &mut node.children[index];
    }

    let leader = node;
    let Some(pattern) = leader
        .children
        .iter()
        .find(|child| child.text_content().is_some())
        .cloned()
    else {
        return;
    };
    let pattern_width = pattern.content_width();
    if pattern_width <= 0.0 {
        return;
    }
    let available = leader.content_width() + extra_width;
    let start = leader.content_box_x();

    let mut copies = Vec::new();
    let mut x = line_end - pattern_width;
    while x >= start - EPSILON {
        if x + pattern_width <= start + available + EPSILON {
            let mut copy = pattern.copy_with_children(Vec::new());
            if !copies.is_empty() {
                copy.id = BoxId::fresh();
            }
            copy.translate(x - copy.position_x, 0.0);
            copies.push(copy);
        }
        x -= pattern_width;
    }
    copies.reverse();
    trace!("leader filled with {} copies", copies.len());
    leader.children = copies;
    leader.width = AutoOr::Length(available);
}

/// Child indices from the line down to its first leader.
fn leader_path(layout_box: &LayoutBox) -> Option<Vec<usize>> {
    for (index, child) in layout_box.children.iter().enumerate() {
        if child.is_leader {
            return Some(vec![index]);
        }
        if matches!(child.kind, BoxKind::Inline)
            && let Some(mut rest) = leader_path(child)
        {
            rest.insert(0, index);
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::text::MonospaceShaper;
    use crate::style::{ComputedStyle, Display};

    fn style(display: Display) -> Rc<ComputedStyle> {
        Rc::new(ComputedStyle {
            font_size: 10.0,
            ..ComputedStyle::with_display(display)
        })
    }

    fn block(width: f32, children: Vec<LayoutBox>) -> LayoutBox {
        let mut block = LayoutBox::new(BoxKind::BlockContainer, style(Display::Block), children);
        block.width = AutoOr::Length(width);
        block.height = AutoOr::Length(0.0);
        block
    }

    fn line(children: Vec<LayoutBox>) -> LayoutBox {
        LayoutBox::new(BoxKind::Line, style(Display::Inline), children)
    }

    #[test]
    fn test_skip_first_whitespace_moves_past_spaces() {
        let line = line(vec![LayoutBox::text("   abc", style(Display::Inline))]);
        let Leading::Resume(Some(stack)) = skip_first_whitespace(&line, None) else {
            panic!("expected a resume position");
        };
        assert_eq!(stack.path(), vec![0, 3]);
    }

    #[test]
    fn test_skip_first_whitespace_at_text_end_moves_to_next_child() {
        let line = line(vec![
            LayoutBox::text("ab", style(Display::Inline)),
            LayoutBox::text(" cd", style(Display::Inline)),
        ]);
        let resume = SkipStack::new(0, Some(SkipStack::leaf(2)));
        let Leading::Resume(Some(stack)) = skip_first_whitespace(&line, Some(&resume)) else {
            panic!("expected a resume position");
        };
        assert_eq!(stack.path(), vec![1, 1]);
    }

    #[test]
    fn test_lines_split_at_spaces() {
        let mut ctx = LayoutContext::new(&MonospaceShaper, f32::INFINITY);
        let text = LayoutBox::text("aaaa bbbb cccc", style(Display::Inline));
        let source = line(vec![text]);
        let parent = block(60.0, Vec::new());
        let mut lines = LineBoxes::new(&source, &parent, 0.0, 0.0, None);
        let mut texts = Vec::new();
        while let Some((line, _)) = lines.next_line(&mut ctx) {
            let text = line.children[0].text_content().unwrap_or_default();
            texts.push(text.to_string());
        }
        assert_eq!(texts, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_center_alignment_offsets_line() {
        let mut ctx = LayoutContext::new(&MonospaceShaper, f32::INFINITY);
        let centered = Rc::new(ComputedStyle {
            font_size: 10.0,
            text_align: TextAlign::Center,
            ..ComputedStyle::with_display(Display::Inline)
        });
        let text = LayoutBox::text("ab", Rc::clone(&centered));
        let source = LayoutBox::new(BoxKind::Line, centered, vec![text]);
        let parent = block(100.0, Vec::new());
        let mut lines = LineBoxes::new(&source, &parent, 0.0, 0.0, None);
        let (line, resume_at) = lines.next_line(&mut ctx).expect("one line");
        assert!(resume_at.is_none());
        assert!((line.children[0].position_x - 44.0).abs() < 0.01);
    }

    #[test]
    fn test_count_expandable_spaces() {
        let text = LayoutBox::text("a b\u{a0}c", style(Display::Inline));
        assert_eq!(count_expandable_spaces(&text), 2);
    }
}
