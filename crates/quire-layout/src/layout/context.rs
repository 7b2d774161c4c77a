//! Mutable state threaded through one document's layout.
//!
//! Everything that crosses box boundaries during layout lives here instead
//! of on the boxes: the excluded shapes of the active block formatting
//! contexts, absolutely positioned boxes waiting for their containing
//! block, fixed boxes waiting for the page, floats that broke across a
//! page, and footnotes. Every entry is keyed by [`BoxId`], so discarding a
//! speculative fragment is a matter of removing the ids it contains (see
//! [`LayoutContext::remove_placeholders`]).

use std::collections::HashSet;

use log::trace;

use crate::style::Float;

use super::box_model::{AutoOr, Rect};
use super::boxes::{BoxId, LayoutBox};
use super::skip_stack::SkipStack;
use super::text::TextShaper;

/// Floats closer than this are considered touching.
pub(crate) const EPSILON: f32 = 1e-3;

/// A float already placed in the current block formatting context.
///
/// [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcludedShape {
    /// The float that produced the shape.
    pub id: BoxId,
    /// `Float::Left` or `Float::Right`.
    pub side: Float,
    /// The float's margin box.
    pub rect: Rect,
}

impl ExcludedShape {
    /// Shape of a placed float.
    #[must_use]
    pub fn of(float: &LayoutBox) -> Self {
        Self {
            id: float.id,
            side: float.style.float,
            rect: float.margin_box(),
        }
    }
}

/// A float or absolutely positioned box whose layout did not finish on the
/// page it started on.
#[derive(Debug, Clone)]
pub struct BrokenOutOfFlow {
    /// The box as it was before layout.
    pub original: LayoutBox,
    /// Where to resume it.
    pub resume_at: SkipStack,
    /// Horizontal position of the fragment on its first page.
    pub position_x: f32,
}

/// The page area reserved for footnotes.
///
/// [§ 2.2 The footnote area](https://www.w3.org/TR/css-gcpm-3/#footnote-area)
#[derive(Debug, Clone, Default)]
pub struct FootnoteArea {
    /// Laid out footnotes of the current page, top to bottom.
    pub footnotes: Vec<LayoutBox>,
    /// Total margin height of the footnotes.
    pub height: f32,
}

/// Shared mutable layout state.
pub struct LayoutContext<'a> {
    /// Text measurement service.
    pub shaper: &'a dyn TextShaper,
    excluded_shapes: Vec<ExcludedShape>,
    excluded_shapes_stack: Vec<Vec<ExcludedShape>>,
    /// Absolutely positioned boxes whose containing block is still being
    /// laid out. Containing blocks swap in a fresh list while they lay out
    /// their children.
    pub(crate) absolute_boxes: Vec<BoxId>,
    /// Fixed boxes found on the current page.
    pub(crate) fixed_boxes: Vec<BoxId>,
    /// Out-of-flow boxes to continue on the next page.
    pub(crate) broken_out_of_flow: Vec<BrokenOutOfFlow>,
    /// Footnotes of the current page.
    pub(crate) footnote_area: FootnoteArea,
    /// Footnotes that did not fit and move to the next page.
    pub(crate) overflowed_footnotes: Vec<LayoutBox>,
    /// Bottom edge of the page content area.
    pub(crate) page_bottom: f32,
    /// Width available to footnotes.
    pub(crate) footnote_width: f32,
    /// 1-based number of the page being laid out.
    pub current_page: usize,
    /// Whether layout currently happens inside a column box.
    pub(crate) in_column: bool,
    /// Whether the current page starts after a forced break.
    pub forced_break: bool,
    /// The box generated by the root element.
    pub(crate) root_id: Option<BoxId>,
    #[cfg(feature = "layout-trace")]
    pub(crate) depth: usize,
}

impl<'a> LayoutContext<'a> {
    /// A context for a page whose content area ends at `page_bottom`.
    #[must_use]
    pub fn new(shaper: &'a dyn TextShaper, page_bottom: f32) -> Self {
        Self {
            shaper,
            excluded_shapes: Vec::new(),
            excluded_shapes_stack: Vec::new(),
            absolute_boxes: Vec::new(),
            fixed_boxes: Vec::new(),
            broken_out_of_flow: Vec::new(),
            footnote_area: FootnoteArea::default(),
            overflowed_footnotes: Vec::new(),
            page_bottom,
            footnote_width: 0.0,
            current_page: 1,
            in_column: false,
            forced_break: false,
            root_id: None,
            #[cfg(feature = "layout-trace")]
            depth: 0,
        }
    }

    // ----- excluded shapes -----

    /// Shapes of the current block formatting context.
    #[must_use]
    pub fn excluded_shapes(&self) -> &[ExcludedShape] {
        &self.excluded_shapes
    }

    /// Register a placed float.
    pub fn add_excluded_shape(&mut self, float: &LayoutBox) {
        trace!("excluded shape {} at {:?}", float.id, float.margin_box());
        self.excluded_shapes.push(ExcludedShape::of(float));
    }

    /// Number of shapes in the current context, for later truncation.
    #[must_use]
    pub fn excluded_shapes_len(&self) -> usize {
        self.excluded_shapes.len()
    }

    /// Drop shapes registered after a checkpoint.
    pub fn truncate_excluded_shapes(&mut self, len: usize) {
        self.excluded_shapes.truncate(len);
    }

    /// Detach the shapes registered after the first `len` ones.
    pub(crate) fn split_off_excluded_shapes(&mut self, len: usize) -> Vec<ExcludedShape> {
        let len = len.min(self.excluded_shapes.len());
        self.excluded_shapes.split_off(len)
    }

    /// Re-append shapes detached by [`Self::split_off_excluded_shapes`].
    pub(crate) fn restore_excluded_shapes(&mut self, shapes: Vec<ExcludedShape>) {
        self.excluded_shapes.extend(shapes);
    }

    /// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
    ///
    /// Start a new block formatting context: floats outside of it no longer
    /// affect its content.
    pub fn create_block_formatting_context(&mut self) {
        let outer = std::mem::take(&mut self.excluded_shapes);
        self.excluded_shapes_stack.push(outer);
    }

    /// [§ 10.6.7 'Auto' heights for block formatting context roots](https://www.w3.org/TR/CSS2/visudet.html#root-height)
    ///
    /// "If the element has any floating descendants whose bottom margin edge
    /// is below the element's bottom content edge, then the height is
    /// increased to include those edges."
    ///
    /// Then restore the enclosing context's shapes.
    pub fn finish_block_formatting_context(&mut self, root: &mut LayoutBox) {
        if root.style.height.is_auto() && !self.excluded_shapes.is_empty() {
            let box_bottom = root.content_box_y() + root.content_height();
            let max_bottom = self
                .excluded_shapes
                .iter()
                .map(|shape| shape.rect.bottom())
                .fold(box_bottom, f32::max);
            root.height = AutoOr::Length(root.content_height() + max_bottom - box_bottom);
        }
        self.excluded_shapes = self.excluded_shapes_stack.pop().unwrap_or_default();
    }

    /// Discard the current context without touching any box.
    pub fn abandon_block_formatting_context(&mut self) {
        self.excluded_shapes = self.excluded_shapes_stack.pop().unwrap_or_default();
    }

    // ----- pagination -----

    /// Whether content reaching `position_y` overflows the page when
    /// `bottom_space` must stay free below it.
    #[must_use]
    pub fn overflows_page(&self, bottom_space: f32, position_y: f32) -> bool {
        let limit = self.page_bottom - self.footnote_area.height - bottom_space;
        overflows(limit, position_y)
    }

    // ----- footnotes -----

    /// Add an already laid out footnote to the footnote area, shrinking
    /// the space left to the flow.
    pub fn report_footnote(&mut self, footnote: LayoutBox) {
        self.footnote_area.height += footnote.margin_height();
        self.footnote_area.footnotes.push(footnote);
    }

    /// Remove a footnote from the area.
    pub fn unreport_footnote(&mut self, id: BoxId) {
        if let Some(position) = self.footnote_area.footnotes.iter().position(|f| f.id == id) {
            let removed = self.footnote_area.footnotes.remove(position);
            self.footnote_area.height -= removed.margin_height();
        }
    }

    /// Whether a footnote is already in the area.
    #[must_use]
    pub fn has_footnote(&self, id: BoxId) -> bool {
        self.footnote_area.footnotes.iter().any(|f| f.id == id)
    }

    // ----- rollback -----

    /// Current length of every registration list.
    #[must_use]
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            absolute: self.absolute_boxes.len(),
            fixed: self.fixed_boxes.len(),
            shapes: self.excluded_shapes.len(),
            broken: self.broken_out_of_flow.len(),
        }
    }

    /// Forget everything registered since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.absolute_boxes.truncate(checkpoint.absolute);
        self.fixed_boxes.truncate(checkpoint.fixed);
        self.excluded_shapes.truncate(checkpoint.shapes);
        self.broken_out_of_flow.truncate(checkpoint.broken);
    }

    /// Keep the registrations made since `checkpoint` only for boxes that
    /// ended up in `kept`, once each (the last registration wins).
    ///
    /// Inline layout may lay the same content out several times before it
    /// settles on a line; this drops what the abandoned attempts left.
    pub(crate) fn prune_since(&mut self, checkpoint: Checkpoint, kept: &LayoutBox) {
        let mut ids = Vec::new();
        kept.collect_ids(&mut ids);
        ids.sort_unstable();
        let present = |id: &BoxId| ids.binary_search(id).is_ok();

        prune_tail(
            &mut self.absolute_boxes,
            checkpoint.absolute,
            |id| *id,
            present,
        );
        prune_tail(&mut self.fixed_boxes, checkpoint.fixed, |id| *id, present);
        prune_tail(
            &mut self.excluded_shapes,
            checkpoint.shapes,
            |shape| shape.id,
            present,
        );
        prune_tail(
            &mut self.broken_out_of_flow,
            checkpoint.broken,
            |broken| broken.original.id,
            present,
        );
    }

    /// Forget everything registered by the boxes of a discarded fragment.
    ///
    /// Absolute and fixed placeholders, excluded shapes, footnotes and
    /// broken out-of-flow entries inside `boxes` are removed, so that the
    /// next layout attempt starts from the state before the discarded one.
    pub fn remove_placeholders(&mut self, boxes: &[LayoutBox]) {
        let mut ids = Vec::new();
        for discarded in boxes {
            discarded.collect_ids(&mut ids);
        }
        if ids.is_empty() {
            return;
        }
        ids.sort_unstable();
        let gone = |id: &BoxId| ids.binary_search(id).is_ok();
        self.absolute_boxes.retain(|id| !gone(id));
        self.fixed_boxes.retain(|id| !gone(id));
        self.excluded_shapes.retain(|shape| !gone(&shape.id));
        self.broken_out_of_flow
            .retain(|broken| !gone(&broken.original.id));
        let removed: Vec<BoxId> = self
            .footnote_area
            .footnotes
            .iter()
            .map(|f| f.id)
            .filter(|id| gone(id))
            .collect();
        for id in removed {
            self.unreport_footnote(id);
        }
        self.overflowed_footnotes.retain(|f| !gone(&f.id));
    }
}

/// Lengths of the registration lists of a [`LayoutContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    absolute: usize,
    fixed: usize,
    shapes: usize,
    broken: usize,
}

/// Deduplicate `list[from..]` by id, keeping the last entry of each id
/// that `keep` accepts.
fn prune_tail<T>(
    list: &mut Vec<T>,
    from: usize,
    id_of: impl Fn(&T) -> BoxId,
    keep: impl Fn(&BoxId) -> bool,
) {
    let from = from.min(list.len());
    let tail = list.split_off(from);
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = tail
        .into_iter()
        .rev()
        .filter(|entry| {
            let id = id_of(entry);
            keep(&id) && seen.insert(id)
        })
        .collect();
    kept.reverse();
    list.extend(kept);
}

/// `position_y > bottom` with a relative tolerance.
#[must_use]
pub(crate) fn overflows(bottom: f32, position_y: f32) -> bool {
    position_y > bottom + EPSILON.max(bottom.abs() * 1e-6)
}
