//! The `display` property.
//!
//! [§ 2 Box Layout Modes: the display property](https://www.w3.org/TR/css-display-3/#the-display-properties)

use serde::{Deserialize, Serialize};

/// [§ 2.1 Outer Display Roles](https://www.w3.org/TR/css-display-3/#outer-role)
///
/// "The `<display-outside>` keywords specify the element's outer display type,
/// which is essentially its principal box's role in flow layout."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OuterDisplay {
    /// "The element generates a block-level box when placed in flow layout."
    Block,
    /// "The element generates an inline-level box when placed in flow layout."
    Inline,
}

/// [§ 2.2 Inner Display Layout Models](https://www.w3.org/TR/css-display-3/#inner-model)
///
/// "The `<display-inside>` keywords specify the element's inner display type,
/// which defines the type of formatting context that lays out its contents."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerDisplay {
    /// Block-and-inline flow.
    Flow,
    /// Flow layout that always establishes a new block formatting context.
    FlowRoot,
    /// Table layout (or one of the internal table roles).
    Table,
    /// Flex layout.
    Flex,
    /// Grid layout.
    Grid,
}

/// Computed value of `display`, as one keyword.
///
/// The keyword form keeps JSON style descriptions readable; layout asks for
/// the outer and inner halves through [`Display::outer`] and
/// [`Display::inner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// `display: block`
    Block,
    /// `display: inline`
    #[default]
    Inline,
    /// `display: inline-block`
    InlineBlock,
    /// `display: flow-root`
    FlowRoot,
    /// `display: list-item`, laid out as a block (markers are not generated).
    ListItem,
    /// `display: table`
    Table,
    /// `display: inline-table`
    InlineTable,
    /// `display: table-row-group`
    TableRowGroup,
    /// `display: table-header-group`
    TableHeaderGroup,
    /// `display: table-footer-group`
    TableFooterGroup,
    /// `display: table-row`
    TableRow,
    /// `display: table-cell`
    TableCell,
    /// `display: table-column-group`
    TableColumnGroup,
    /// `display: table-column`
    TableColumn,
    /// `display: table-caption`
    TableCaption,
    /// `display: flex`
    Flex,
    /// `display: inline-flex`
    InlineFlex,
    /// `display: grid`
    Grid,
    /// `display: inline-grid`
    InlineGrid,
    /// [§ 2.6 display: none](https://www.w3.org/TR/css-display-3/#valdef-display-none)
    ///
    /// "The element and its descendants generate no boxes or text runs."
    None,
}

impl Display {
    /// The outer display type of the principal box.
    #[must_use]
    pub const fn outer(self) -> OuterDisplay {
        match self {
            Self::Inline
            | Self::InlineBlock
            | Self::InlineTable
            | Self::InlineFlex
            | Self::InlineGrid => OuterDisplay::Inline,
            _ => OuterDisplay::Block,
        }
    }

    /// The inner display type of the principal box.
    #[must_use]
    pub const fn inner(self) -> InnerDisplay {
        match self {
            Self::InlineBlock | Self::FlowRoot => InnerDisplay::FlowRoot,
            Self::Table
            | Self::InlineTable
            | Self::TableRowGroup
            | Self::TableHeaderGroup
            | Self::TableFooterGroup
            | Self::TableRow
            | Self::TableColumnGroup
            | Self::TableColumn => InnerDisplay::Table,
            Self::Flex | Self::InlineFlex => InnerDisplay::Flex,
            Self::Grid | Self::InlineGrid => InnerDisplay::Grid,
            _ => InnerDisplay::Flow,
        }
    }

    /// [§ 2.4 Layout-Internal Display Types](https://www.w3.org/TR/css-display-3/#layout-specific-display)
    #[must_use]
    pub const fn is_table_internal(self) -> bool {
        matches!(
            self,
            Self::TableRowGroup
                | Self::TableHeaderGroup
                | Self::TableFooterGroup
                | Self::TableRow
                | Self::TableCell
                | Self::TableColumnGroup
                | Self::TableColumn
                | Self::TableCaption
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_block_is_inline_flow_root() {
        assert_eq!(Display::InlineBlock.outer(), OuterDisplay::Inline);
        assert_eq!(Display::InlineBlock.inner(), InnerDisplay::FlowRoot);
    }

    #[test]
    fn test_table_cell_is_internal() {
        assert!(Display::TableCell.is_table_internal());
        assert!(!Display::Table.is_table_internal());
    }
}
