//! Paginated CSS layout for the quire engine.
//!
//! # Scope
//!
//! This crate implements:
//! - **Box Generation** ([§ 9.2](https://www.w3.org/TR/CSS2/visuren.html#box-gen))
//!   - Box trees built from JSON document descriptions
//!   - Anonymous block, line, table and flex item boxes
//!
//! - **Block Layout** ([§ 9.4.1](https://www.w3.org/TR/CSS2/visuren.html#block-formatting))
//!   - Margin collapsing, clearance and floats
//!   - Absolute, fixed and relative positioning
//!
//! - **Inline Layout** ([§ 9.4.2](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting))
//!   - Line breaking through a pluggable [`TextShaper`]
//!   - Alignment, justification and vertical alignment
//!
//! - **Tables** ([§ 17](https://www.w3.org/TR/CSS2/tables.html)), **multi-column
//!   layout** ([CSS Multi-column Layout](https://www.w3.org/TR/css-multicol-1/)) and
//!   single-line **flex layout** ([CSS Flexbox](https://www.w3.org/TR/css-flexbox-1/))
//!
//! - **Fragmentation** ([CSS Fragmentation](https://www.w3.org/TR/css-break-3/))
//!   - Forced and unforced page breaks, orphans and widows
//!   - Named pages, left and right pages, footnotes
//!
//! # Not Yet Implemented
//!
//! - Style computation (styles arrive computed)
//! - Grid layout (grid containers are laid out as flow roots)
//! - Multi-line flex containers
//! - Painting

/// Box tree and layout algorithms per [CSS 2.1 Visual Formatting Model](https://www.w3.org/TR/CSS2/visuren.html).
pub mod layout;
/// Computed styles per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod style;

use thiserror::Error;

// Re-exports for convenience
pub use layout::{
    BoxDescription, BoxId, BoxKind, LayoutBox, LayoutOptions, MonospaceShaper, Page, PageSetup,
    PageSide, PageSummary, Pages, TextShaper, build_box_tree, layout_document,
};
pub use style::ComputedStyle;

/// Errors reported before layout starts.
///
/// Layout itself never fails: content that does not fit overflows and
/// unsupported features degrade with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A CSS value that could not be parsed.
    #[error("invalid CSS value: {0}")]
    InvalidValue(String),
    /// Page dimensions that leave no room for content.
    #[error("invalid page setup: {0}")]
    InvalidPageSetup(String),
    /// A malformed node in a document description.
    #[error("invalid document at {path}: {reason}")]
    InvalidDescription {
        /// JSON path of the node, `/children/2/children/0` style.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
}
