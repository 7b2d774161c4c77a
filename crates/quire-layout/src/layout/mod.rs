//! CSS Layout Engine
//!
//! This module lays out a box tree onto a sequence of pages.
//!
//! # Relevant Specifications
//!
//! - [CSS 2.1 Visual Formatting Model](https://www.w3.org/TR/CSS2/visuren.html)
//! - [CSS 2.1 Visual Formatting Model Details](https://www.w3.org/TR/CSS2/visudet.html)
//! - [CSS 2.1 Tables](https://www.w3.org/TR/CSS2/tables.html)
//! - [CSS Fragmentation Module Level 3](https://www.w3.org/TR/css-break-3/)
//! - [CSS Paged Media Module Level 3](https://www.w3.org/TR/css-page-3/)
//! - [CSS Multi-column Layout Module Level 1](https://www.w3.org/TR/css-multicol-1/)
//! - [CSS Flexible Box Layout Module Level 1](https://www.w3.org/TR/css-flexbox-1/)
//!
//! # Module Structure
//!
//! - [`boxes`] - The box tree: box kinds, identities and geometry
//! - [`box_model`] - Rectangles, edge sizes and 'auto' values
//! - [`build`] - Box tree construction from document descriptions
//! - [`page`] - Page setup and the page iterator
//! - [`skip_stack`] - Resume positions of fragmented boxes
//! - [`text`] - The text shaping interface
//! - [`replaced`] - Intrinsic sizing of replaced content
//! - [`table`] - Table payloads and collapsed borders
//! - `block` - Block formatting contexts, margins and page breaks
//! - `inline` - Line boxes, line breaking and alignment
//! - `float` - Float placement and clearance
//! - `positioned` - Absolute, fixed and relative positioning
//! - `column` - Multi-column layout and balancing
//! - `flex` - Single-line flex layout
//! - `preferred` - Min-content and max-content widths
//! - `percent` - Percentage resolution against containing blocks
//! - `context` - State shared across one page's layout

mod block;
pub mod box_model;
pub mod boxes;
pub mod build;
mod column;
mod context;
mod flex;
mod float;
mod inline;
pub mod page;
mod percent;
mod positioned;
mod preferred;
pub mod replaced;
pub mod skip_stack;
pub mod table;
pub mod text;

// Re-exports for convenience
pub use block::collapse_margin;
pub use box_model::{AutoOr, EdgeSizes, Rect};
pub use boxes::{BoxId, BoxKind, LayoutBox, TableRole};
pub use build::{BoxDescription, ImageSize, build_box_tree};
pub use page::{
    FragmentSummary, LayoutOptions, Page, PageSetup, PageSide, PageSummary, Pages, layout_document,
};
pub use replaced::{FixedSize, IntrinsicSizing};
pub use skip_stack::SkipStack;
pub use text::{MonospaceShaper, ShapedLine, TextShaper};
