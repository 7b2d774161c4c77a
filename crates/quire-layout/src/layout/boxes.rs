//! The box tree.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! A single [`LayoutBox`] type covers every kind of box. What the box is
//! (block container, inline, line, text, replaced, table part, flex
//! container) lives in [`BoxKind`]; how it participates in its parent's
//! flow lives in [`OuterDisplay`]. Layout functions dispatch by matching on
//! the pair.
//!
//! Fragments are values: laying out a box never mutates the input tree,
//! it produces a new box with a new children list. Speculative results can
//! therefore be dropped without undoing anything on the boxes themselves.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::style::{BoxDecorationBreak, ComputedStyle, Display, OuterDisplay};

use super::box_model::{AutoOr, EdgeSizes, Rect};
use super::replaced::IntrinsicSizing;
use super::skip_stack::SkipStack;
use super::table::TableData;

/// Stable identity of a box across all of its fragments.
///
/// Fragment copies keep the id of the box they were cut from, so the
/// layout context can refer to a box (pending absolute placeholder,
/// excluded float, footnote) without holding a reference into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(u32);

static NEXT_BOX_ID: AtomicU32 = AtomicU32::new(1);

impl BoxId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_BOX_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
///
/// The role a box plays inside a table.
#[derive(Debug, Clone)]
pub enum TableRole {
    /// [§ 17.4 Tables in the visual formatting model](https://www.w3.org/TR/CSS2/tables.html#model)
    ///
    /// "The table wrapper box establishes a block formatting context, and
    /// contains the table box and the caption boxes."
    Wrapper,
    /// The table grid box. Row groups are its children; column groups
    /// live in the payload.
    Table(Box<TableData>),
    /// A row group. Header and footer groups repeat on every fragment.
    RowGroup {
        /// `display: table-header-group`
        header: bool,
        /// `display: table-footer-group`
        footer: bool,
    },
    /// A table row.
    Row,
    /// A table cell, a block container.
    Cell {
        /// Number of columns spanned (at least 1).
        colspan: usize,
        /// Number of rows spanned (at least 1, 0 means "to the end of the
        /// row group").
        rowspan: usize,
        /// First grid column occupied by the cell.
        grid_x: usize,
    },
    /// A column group.
    ColumnGroup,
    /// A column.
    Column {
        /// Grid column index.
        grid_x: usize,
    },
    /// A table caption, a block container.
    Caption,
}

/// What a box is.
#[derive(Debug, Clone)]
pub enum BoxKind {
    /// [§ 9.2.1 Block-level elements and block boxes](https://www.w3.org/TR/CSS2/visuren.html#block-boxes)
    ///
    /// A block container: contains either only block-level boxes or only
    /// line boxes. Block-level when `outer` is block, an inline-block when
    /// it is inline.
    BlockContainer,
    /// [§ 9.2.2 Inline-level elements and inline boxes](https://www.w3.org/TR/CSS2/visuren.html#inline-boxes)
    Inline,
    /// [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
    ///
    /// "The rectangular area that contains the boxes that form a line is
    /// called a line box."
    Line,
    /// A run of text.
    Text(Rc<str>),
    /// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
    Replaced(Rc<dyn IntrinsicSizing>),
    /// [§ 9 Flex Layout Algorithm](https://www.w3.org/TR/css-flexbox-1/#layout-algorithm)
    Flex,
    /// Any table part.
    Table(TableRole),
}

/// A box in the formatting structure, with its used values.
///
/// Before layout, `width`/`height` follow the style and may be
/// [`AutoOr::Auto`]; after a fragment is laid out both are lengths.
/// Positions are page coordinates of the margin box's top-left corner.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Identity shared by all fragments of the box.
    pub id: BoxId,
    /// Position of the box in its original parent's children.
    pub index: usize,
    /// What the box is.
    pub kind: BoxKind,
    /// How the box participates in its parent's flow.
    pub outer: OuterDisplay,
    /// Tag of the generating element, `None` for anonymous boxes.
    pub element_tag: Option<String>,
    /// Computed style, shared between fragments.
    pub style: Rc<ComputedStyle>,
    /// Child boxes.
    pub children: Vec<LayoutBox>,

    /// X of the margin box's left edge.
    pub position_x: f32,
    /// Y of the margin box's top edge.
    pub position_y: f32,
    /// [§ 10.2 'width'](https://www.w3.org/TR/CSS2/visudet.html#the-width-property), content box.
    pub width: AutoOr,
    /// [§ 10.5 'height'](https://www.w3.org/TR/CSS2/visudet.html#the-height-property), content box.
    pub height: AutoOr,
    /// Used margins. 'auto' margins resolve to zero here; the width and
    /// position equations consult the style to tell them apart.
    pub margin: EdgeSizes,
    /// Used padding.
    pub padding: EdgeSizes,
    /// Used border widths.
    pub border: EdgeSizes,
    /// Used 'min-width'.
    pub min_width: f32,
    /// Used 'max-width' (infinite for 'none').
    pub max_width: f32,
    /// Used 'min-height'.
    pub min_height: f32,
    /// Used 'max-height' (infinite for 'none').
    pub max_height: f32,

    /// Distance from the margin-box top to the first baseline, when the
    /// box has one.
    pub baseline: Option<f32>,
    /// [§ 9.5.2](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
    /// Clearance introduced above the border box.
    pub clearance: Option<f32>,
    /// Whether this fragment holds the start of the box.
    pub is_start: bool,
    /// Whether this fragment holds the end of the box.
    pub is_end: bool,
    /// For line boxes: where the next line starts inside the block's
    /// inline content.
    pub resume_at: Option<SkipStack>,
    /// An inline box whose content is repeated to fill the line.
    pub is_leader: bool,
    /// Extra space added to each expandable space of a text box by
    /// justification.
    pub justification_spacing: f32,
}

impl LayoutBox {
    /// A fresh box with style-independent used values zeroed.
    #[must_use]
    pub fn new(kind: BoxKind, style: Rc<ComputedStyle>, children: Vec<Self>) -> Self {
        let outer = style.display.outer();
        let mut new = Self {
            id: BoxId::fresh(),
            index: 0,
            kind,
            outer,
            element_tag: None,
            style,
            children,
            position_x: 0.0,
            position_y: 0.0,
            width: AutoOr::Auto,
            height: AutoOr::Auto,
            margin: EdgeSizes::default(),
            padding: EdgeSizes::default(),
            border: EdgeSizes::default(),
            min_width: 0.0,
            max_width: f32::INFINITY,
            min_height: 0.0,
            max_height: f32::INFINITY,
            baseline: None,
            clearance: None,
            is_start: true,
            is_end: true,
            resume_at: None,
            is_leader: false,
            justification_spacing: 0.0,
        };
        new.reindex_children();
        new
    }

    /// An anonymous box of `kind` inheriting from `parent`.
    #[must_use]
    pub fn anonymous_from(
        parent: &Self,
        kind: BoxKind,
        outer: OuterDisplay,
        children: Vec<Self>,
    ) -> Self {
        let display = match (&kind, outer) {
            (BoxKind::Line | BoxKind::Text(_) | BoxKind::Inline, _) => Display::Inline,
            (_, OuterDisplay::Inline) => Display::InlineBlock,
            _ => Display::Block,
        };
        let style = Rc::new(ComputedStyle::anonymous_from(&parent.style, display));
        let mut anon = Self::new(kind, style, children);
        anon.outer = outer;
        anon
    }

    /// A text box sharing `parent`'s style.
    #[must_use]
    pub fn text(text: &str, style: Rc<ComputedStyle>) -> Self {
        let mut new = Self::new(BoxKind::Text(Rc::from(text)), style, Vec::new());
        new.outer = OuterDisplay::Inline;
        new
    }

    /// Set each child's `index` to its position in `children`.
    pub fn reindex_children(&mut self) {
        for (index, child) in self.children.iter_mut().enumerate() {
            child.index = index;
        }
    }

    /// Shallow copy with a new children list. The copy keeps the id.
    #[must_use]
    pub fn copy_with_children(&self, children: Vec<Self>) -> Self {
        Self {
            id: self.id,
            index: self.index,
            kind: self.kind.clone(),
            outer: self.outer,
            element_tag: self.element_tag.clone(),
            style: Rc::clone(&self.style),
            children,
            position_x: self.position_x,
            position_y: self.position_y,
            width: self.width,
            height: self.height,
            margin: self.margin,
            padding: self.padding,
            border: self.border,
            min_width: self.min_width,
            max_width: self.max_width,
            min_height: self.min_height,
            max_height: self.max_height,
            baseline: self.baseline,
            clearance: self.clearance,
            is_start: self.is_start,
            is_end: self.is_end,
            resume_at: self.resume_at.clone(),
            is_leader: self.is_leader,
            justification_spacing: self.justification_spacing,
        }
    }

    /// Text of a text box.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            BoxKind::Text(text) => Some(text),
            _ => None,
        }
    }

    // ----- kind predicates -----

    /// Block-level box (participates in a block formatting context).
    #[must_use]
    pub fn is_block_level(&self) -> bool {
        self.outer == OuterDisplay::Block
            && !matches!(
                self.kind,
                BoxKind::Line | BoxKind::Text(_) | BoxKind::Inline
            )
    }

    /// Block container: block box, inline-block, cell or caption.
    #[must_use]
    pub const fn is_block_container(&self) -> bool {
        matches!(
            self.kind,
            BoxKind::BlockContainer | BoxKind::Table(TableRole::Cell { .. } | TableRole::Caption)
        )
    }

    /// Line box.
    #[must_use]
    pub const fn is_line(&self) -> bool {
        matches!(self.kind, BoxKind::Line)
    }

    /// [§ 9.2.2](https://www.w3.org/TR/CSS2/visuren.html#inline-boxes)
    ///
    /// "Inline-level boxes that are not inline boxes (such as replaced
    /// inline-level elements, inline-block elements, and inline-table
    /// elements) are called atomic inline-level boxes because they
    /// participate in their inline formatting context as a single opaque
    /// box."
    #[must_use]
    pub fn is_atomic_inline(&self) -> bool {
        self.outer == OuterDisplay::Inline
            && matches!(
                self.kind,
                BoxKind::BlockContainer
                    | BoxKind::Replaced(_)
                    | BoxKind::Flex
                    | BoxKind::Table(TableRole::Wrapper)
            )
    }

    /// Whether the box is a table wrapper.
    #[must_use]
    pub const fn is_table_wrapper(&self) -> bool {
        matches!(self.kind, BoxKind::Table(TableRole::Wrapper))
    }

    /// Whether the box is a table row.
    #[must_use]
    pub const fn is_row(&self) -> bool {
        matches!(self.kind, BoxKind::Table(TableRole::Row))
    }

    /// Whether the box is a table column.
    #[must_use]
    pub const fn is_column(&self) -> bool {
        matches!(self.kind, BoxKind::Table(TableRole::Column { .. }))
    }

    /// Whether the box is a table cell.
    #[must_use]
    pub const fn is_cell(&self) -> bool {
        matches!(self.kind, BoxKind::Table(TableRole::Cell { .. }))
    }

    /// Whether the box is a float (`left`/`right`).
    #[must_use]
    pub fn is_floated(&self) -> bool {
        self.style.is_floated()
    }

    /// Whether the box is a footnote.
    #[must_use]
    pub fn is_footnote(&self) -> bool {
        self.style.float == crate::style::Float::Footnote
    }

    /// Whether the box is absolutely positioned (`absolute`/`fixed`).
    #[must_use]
    pub fn is_absolutely_positioned(&self) -> bool {
        self.style.is_absolutely_positioned()
    }

    /// [§ 9.3 Positioning schemes](https://www.w3.org/TR/CSS2/visuren.html#positioning-scheme)
    ///
    /// In flow: neither floated, absolutely positioned, nor a footnote.
    #[must_use]
    pub fn is_in_normal_flow(&self) -> bool {
        !self.style.is_out_of_flow()
    }

    /// Whether the box establishes a block formatting context for its
    /// children.
    #[must_use]
    pub fn establishes_formatting_context(&self) -> bool {
        self.style.establishes_formatting_context()
            || self.is_atomic_inline()
            || matches!(
                self.kind,
                BoxKind::Table(TableRole::Cell { .. } | TableRole::Caption)
            )
    }

    /// Whether the box should fragment in the block direction.
    #[must_use]
    pub fn is_monolithic(&self) -> bool {
        matches!(self.kind, BoxKind::Replaced(_) | BoxKind::Flex)
    }

    // ----- geometry -----

    /// Width of the content box; zero while still 'auto'.
    #[must_use]
    pub const fn content_width(&self) -> f32 {
        self.width.px()
    }

    /// Height of the content box; zero while still 'auto'.
    #[must_use]
    pub const fn content_height(&self) -> f32 {
        self.height.px()
    }

    /// Padding width: content plus left and right padding.
    #[must_use]
    pub fn padding_width(&self) -> f32 {
        self.content_width() + self.padding.horizontal()
    }

    /// Padding height.
    #[must_use]
    pub fn padding_height(&self) -> f32 {
        self.content_height() + self.padding.vertical()
    }

    /// Border-box width.
    #[must_use]
    pub fn border_width(&self) -> f32 {
        self.padding_width() + self.border.horizontal()
    }

    /// Border-box height.
    #[must_use]
    pub fn border_height(&self) -> f32 {
        self.padding_height() + self.border.vertical()
    }

    /// Margin-box width.
    #[must_use]
    pub fn margin_width(&self) -> f32 {
        self.border_width() + self.margin.horizontal()
    }

    /// Margin-box height.
    #[must_use]
    pub fn margin_height(&self) -> f32 {
        self.border_height() + self.margin.vertical()
    }

    /// X of the border box.
    #[must_use]
    pub fn border_box_x(&self) -> f32 {
        self.position_x + self.margin.left
    }

    /// Y of the border box.
    #[must_use]
    pub fn border_box_y(&self) -> f32 {
        self.position_y + self.margin.top
    }

    /// X of the padding box.
    #[must_use]
    pub fn padding_box_x(&self) -> f32 {
        self.border_box_x() + self.border.left
    }

    /// Y of the padding box.
    #[must_use]
    pub fn padding_box_y(&self) -> f32 {
        self.border_box_y() + self.border.top
    }

    /// X of the content box.
    #[must_use]
    pub fn content_box_x(&self) -> f32 {
        self.padding_box_x() + self.padding.left
    }

    /// Y of the content box.
    #[must_use]
    pub fn content_box_y(&self) -> f32 {
        self.padding_box_y() + self.padding.top
    }

    /// The margin box.
    #[must_use]
    pub fn margin_box(&self) -> Rect {
        Rect {
            x: self.position_x,
            y: self.position_y,
            width: self.margin_width(),
            height: self.margin_height(),
        }
    }

    /// The border box.
    #[must_use]
    pub fn border_box(&self) -> Rect {
        Rect {
            x: self.border_box_x(),
            y: self.border_box_y(),
            width: self.border_width(),
            height: self.border_height(),
        }
    }

    /// The padding box, the containing block of absolutely positioned
    /// descendants.
    #[must_use]
    pub fn padding_box(&self) -> Rect {
        Rect {
            x: self.padding_box_x(),
            y: self.padding_box_y(),
            width: self.padding_width(),
            height: self.padding_height(),
        }
    }

    /// The content box.
    #[must_use]
    pub fn content_box(&self) -> Rect {
        Rect {
            x: self.content_box_x(),
            y: self.content_box_y(),
            width: self.content_width(),
            height: self.content_height(),
        }
    }

    /// Move the box and all of its descendants.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.position_x += dx;
        self.position_y += dy;
        if let BoxKind::Table(TableRole::Table(data)) = &mut self.kind {
            data.translate_columns(dx, dy);
        }
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    /// [§ 5.4 Fragmented Borders and Backgrounds](https://www.w3.org/TR/css-break-3/#break-decoration)
    ///
    /// Drop the block-start or block-end decorations of a fragment unless
    /// `box-decoration-break: clone`.
    pub fn remove_decoration(&mut self, start: bool, end: bool) {
        if self.style.box_decoration_break == BoxDecorationBreak::Clone {
            return;
        }
        if start {
            self.margin.top = 0.0;
            self.padding.top = 0.0;
            self.border.top = 0.0;
        }
        if end {
            self.margin.bottom = 0.0;
            self.padding.bottom = 0.0;
            self.border.bottom = 0.0;
        }
    }

    /// Inline-direction counterpart of [`Self::remove_decoration`], used
    /// for inline boxes split across lines.
    pub fn remove_inline_decoration(&mut self, start: bool, end: bool) {
        if self.style.box_decoration_break == BoxDecorationBreak::Clone {
            return;
        }
        let rtl = self.style.direction == crate::style::Direction::Rtl;
        let (drop_left, drop_right) = if rtl { (end, start) } else { (start, end) };
        if drop_left {
            self.margin.left = 0.0;
            self.padding.left = 0.0;
            self.border.left = 0.0;
        }
        if drop_right {
            self.margin.right = 0.0;
            self.padding.right = 0.0;
            self.border.right = 0.0;
        }
    }

    /// Depth-first search for a descendant (or self) by id.
    #[must_use]
    pub fn find(&self, id: BoxId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable depth-first search for a descendant (or self) by id.
    pub fn find_mut(&mut self, id: BoxId) -> Option<&mut Self> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    /// All ids in this subtree, self included.
    pub fn collect_ids(&self, out: &mut Vec<BoxId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Iterate the subtree depth-first, self first.
    pub fn descendants(&self) -> impl Iterator<Item = &Self> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Short label used by debug output: tag or kind.
    #[must_use]
    pub fn label(&self) -> String {
        let kind = match &self.kind {
            BoxKind::BlockContainer if self.outer == OuterDisplay::Inline => "InlineBlock",
            BoxKind::BlockContainer => "Block",
            BoxKind::Inline => "Inline",
            BoxKind::Line => "Line",
            BoxKind::Text(_) => "Text",
            BoxKind::Replaced(_) => "Replaced",
            BoxKind::Flex => "Flex",
            BoxKind::Table(role) => match role {
                TableRole::Wrapper => "TableWrapper",
                TableRole::Table(_) => "Table",
                TableRole::RowGroup { .. } => "RowGroup",
                TableRole::Row => "Row",
                TableRole::Cell { .. } => "Cell",
                TableRole::ColumnGroup => "ColumnGroup",
                TableRole::Column { .. } => "Column",
                TableRole::Caption => "Caption",
            },
        };
        match &self.element_tag {
            Some(tag) => format!("{kind}<{tag}>"),
            None => kind.to_string(),
        }
    }
}
