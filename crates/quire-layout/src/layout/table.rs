//! CSS Table Layout.
//!
//! [§ 17 Tables](https://www.w3.org/TR/CSS2/tables.html)
//!
//! "The table wrapper box establishes a block formatting context, and
//! contains the table box and the caption boxes."
//!
//! The wrapper is laid out as a regular block container: captions are
//! block boxes and the table box is dispatched here. Column widths come
//! from [§ 17.5.2 Table width algorithms](https://www.w3.org/TR/CSS2/tables.html#width-layout);
//! rows are placed one after the other and never split, so a table breaks
//! between rows only. Header and footer groups are repeated on every
//! fragment when there is room for them.

use std::ops::Range;

use log::trace;
use quire_common::warning::warn_once;

use crate::style::{
    AutoLength, Border, BorderCollapse, BorderStyle, ComputedStyle, Direction, Length, TableLayout,
    VerticalAlign,
};

use super::block::{
    BlockLayout, NextPage, avoid_break_inside, avoid_page_break, block_container_layout,
    block_level_page_break, find_earlier_page_break, is_forced_break,
};
use super::box_model::{AutoOr, EdgeSizes};
use super::boxes::{BoxKind, LayoutBox, TableRole};
use super::context::LayoutContext;
use super::percent::{ContainingBlock, resolve_percentages};
use super::preferred::{
    margin_width, max_content_width, min_content_width, table_cell_min_max_content_width,
};
use super::skip_stack::SkipStack;

/// Payload of the table grid box.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    /// Column groups with their columns. They take no part in the flow;
    /// layout gives them the geometry of the grid columns they cover.
    pub column_groups: Vec<LayoutBox>,
    /// Used width of each grid column, set by layout.
    pub column_widths: Vec<f32>,
    /// Left edge of each grid column, set by layout.
    pub column_positions: Vec<f32>,
    /// Resolved borders in the collapsing border model.
    pub collapsed_borders: Option<CollapsedBorders>,
}

impl TableData {
    /// A table payload holding `column_groups`, before layout.
    #[must_use]
    pub fn new(column_groups: Vec<LayoutBox>) -> Self {
        Self {
            column_groups,
            ..Self::default()
        }
    }

    pub(crate) fn translate_columns(&mut self, dx: f32, dy: f32) {
        for position in &mut self.column_positions {
            *position += dx;
        }
        for group in &mut self.column_groups {
            group.translate(dx, dy);
        }
    }

    fn columns(&self) -> impl Iterator<Item = (&LayoutBox, &LayoutBox)> + '_ {
        self.column_groups
            .iter()
            .flat_map(|group| group.children.iter().map(move |column| (column, group)))
    }
}

/// [§ 17.6.2 The collapsing border model](https://www.w3.org/TR/CSS2/tables.html#collapsing-borders)
///
/// The winning border of every grid line segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapsedBorders {
    /// Horizontal grid lines from top to bottom, `rows + 1` of them, each
    /// holding one segment per column.
    pub horizontal: Vec<Vec<Border>>,
    /// Vertical grid lines from left to right, `columns + 1` of them, each
    /// holding one segment per row.
    pub vertical: Vec<Vec<Border>>,
}

impl CollapsedBorders {
    /// Half of the widest segment on each side of a cell: "the row's or
    /// cell's borders extend half way into the grid line".
    #[must_use]
    pub fn cell_edges(
        &self,
        row: usize,
        grid_x: usize,
        colspan: usize,
        rowspan: usize,
    ) -> EdgeSizes {
        let widest = |line: Option<&Vec<Border>>, range: Range<usize>| {
            line.and_then(|segments| segments.get(range))
                .map_or(0.0, widest_segment)
        };
        let columns = grid_x..grid_x + colspan;
        let rows = row..row + rowspan;
        EdgeSizes {
            top: widest(self.horizontal.get(row), columns.clone()) / 2.0,
            bottom: widest(self.horizontal.get(row + rowspan), columns) / 2.0,
            left: widest(self.vertical.get(grid_x), rows.clone()) / 2.0,
            right: widest(self.vertical.get(grid_x + colspan), rows) / 2.0,
        }
    }

    /// "the width of the table includes half the table border": the
    /// table's own border is half of its widest outer segment per side.
    #[must_use]
    pub fn table_edges(&self) -> EdgeSizes {
        let widest = |line: Option<&Vec<Border>>| line.map_or(0.0, |line| widest_segment(line));
        EdgeSizes {
            top: widest(self.horizontal.first()) / 2.0,
            bottom: widest(self.horizontal.last()) / 2.0,
            left: widest(self.vertical.first()) / 2.0,
            right: widest(self.vertical.last()) / 2.0,
        }
    }
}

/// Where a border comes from, weakest first. "If border styles differ
/// only in color, then a style set on a cell wins over one on a row, which
/// wins over a row group, column, column group and, lastly, table."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    Table,
    ColumnGroup,
    Column,
    RowGroup,
    Row,
    Cell,
}

/// Conflict resolution between two borders on the same segment.
fn beats(candidate: (Border, Origin), current: (Border, Origin)) -> bool {
    if current.0.style == BorderStyle::Hidden {
        return false;
    }
    if candidate.0.style == BorderStyle::Hidden {
        return true;
    }
    let (candidate_width, current_width) = (candidate.0.used_width(), current.0.used_width());
    if candidate_width != current_width {
        return candidate_width > current_width;
    }
    if candidate.0.style != current.0.style {
        return candidate.0.style > current.0.style;
    }
    candidate.1 > current.1
}

/// One cell of the table grid.
struct GridCell<'t> {
    cell: &'t LayoutBox,
    /// Row index across all row groups.
    row: usize,
    grid_x: usize,
    colspan: usize,
    /// Rows spanned, clamped to the end of the row group.
    rowspan: usize,
}

/// Rows, columns and cells of a table before layout.
struct Grid<'t> {
    /// Index of the first row of each row group.
    group_offsets: Vec<usize>,
    rows: usize,
    columns: usize,
    cells: Vec<GridCell<'t>>,
}

impl<'t> Grid<'t> {
    /// The grid of `table`, whose row groups are `groups`.
    fn of(table: &LayoutBox, groups: &'t [LayoutBox]) -> Self {
        let mut group_offsets = Vec::with_capacity(groups.len());
        let mut rows = 0;
        let mut columns = 0;
        let mut cells = Vec::new();
        for group in groups {
            group_offsets.push(rows);
            let group_rows = group.children.len();
            for (row_index, row) in group.children.iter().enumerate() {
                for cell in &row.children {
                    if let BoxKind::Table(TableRole::Cell {
                        colspan,
                        rowspan,
                        grid_x,
                    }) = cell.kind
                    {
                        let remaining = group_rows - row_index;
                        let rowspan = if rowspan == 0 {
                            remaining
                        } else {
                            rowspan.min(remaining)
                        };
                        let colspan = colspan.max(1);
                        columns = columns.max(grid_x + colspan);
                        cells.push(GridCell {
                            cell,
                            row: rows + row_index,
                            grid_x,
                            colspan,
                            rowspan,
                        });
                    }
                }
            }
            rows += group_rows;
        }
        if let BoxKind::Table(TableRole::Table(data)) = &table.kind {
            for (column, _) in data.columns() {
                if let BoxKind::Table(TableRole::Column { grid_x }) = column.kind {
                    columns = columns.max(grid_x + 1);
                }
            }
        }
        Self {
            group_offsets,
            rows,
            columns,
            cells,
        }
    }
}

/// [§ 17.6.2.1 Border conflict resolution](https://www.w3.org/TR/CSS2/tables.html#border-conflict-resolution)
fn collapse_borders(table: &LayoutBox, groups: &[LayoutBox], grid: &Grid<'_>) -> CollapsedBorders {
    let initial = (Border::default(), Origin::Table);
    let mut horizontal = vec![vec![initial; grid.columns]; grid.rows + 1];
    let mut vertical = vec![vec![initial; grid.rows]; grid.columns + 1];

    let mut set_horizontal = |line: usize, columns: Range<usize>, border: Border, origin: Origin| {
        for x in columns {
            let segment = &mut horizontal[line][x];
            if beats((border, origin), *segment) {
                *segment = (border, origin);
            }
        }
    };
    let mut set_vertical = |line: usize, rows: Range<usize>, border: Border, origin: Origin| {
        for y in rows {
            let segment = &mut vertical[line][y];
            if beats((border, origin), *segment) {
                *segment = (border, origin);
            }
        }
    };

    let mut apply = |style: &ComputedStyle,
                     rows: Range<usize>,
                     columns: Range<usize>,
                     origin: Origin| {
        if rows.is_empty() || columns.is_empty() {
            return;
        }
        set_horizontal(rows.start, columns.clone(), style.border_top, origin);
        set_horizontal(rows.end, columns.clone(), style.border_bottom, origin);
        set_vertical(columns.start, rows.clone(), style.border_left, origin);
        set_vertical(columns.end, rows, style.border_right, origin);
    };

    for grid_cell in &grid.cells {
        let columns = grid_cell.grid_x..(grid_cell.grid_x + grid_cell.colspan).min(grid.columns);
        apply(
            grid_cell.cell.style.as_ref(),
            grid_cell.row..grid_cell.row + grid_cell.rowspan,
            columns,
            Origin::Cell,
        );
    }
    for (group_index, group) in groups.iter().enumerate() {
        let first_row = grid.group_offsets[group_index];
        for (row_index, row) in group.children.iter().enumerate() {
            let row_index = first_row + row_index;
            apply(
                row.style.as_ref(),
                row_index..row_index + 1,
                0..grid.columns,
                Origin::Row,
            );
        }
        apply(
            group.style.as_ref(),
            first_row..first_row + group.children.len(),
            0..grid.columns,
            Origin::RowGroup,
        );
    }
    if let BoxKind::Table(TableRole::Table(data)) = &table.kind {
        for group in &data.column_groups {
            let (first, last) = group
                .children
                .iter()
                .filter_map(|column| match column.kind {
                    BoxKind::Table(TableRole::Column { grid_x }) => Some(grid_x),
                    _ => None,
                })
                .fold((usize::MAX, 0), |(first, last), x| {
                    (first.min(x), last.max(x))
                });
            for column in &group.children {
                if let BoxKind::Table(TableRole::Column { grid_x }) = column.kind
                    && grid_x < grid.columns
                {
                    apply(
                        column.style.as_ref(),
                        0..grid.rows,
                        grid_x..grid_x + 1,
                        Origin::Column,
                    );
                }
            }
            if first <= last {
                apply(
                    group.style.as_ref(),
                    0..grid.rows,
                    first..(last + 1).min(grid.columns),
                    Origin::ColumnGroup,
                );
            }
        }
    }
    apply(
        table.style.as_ref(),
        0..grid.rows,
        0..grid.columns,
        Origin::Table,
    );

    let strip = |lines: Vec<Vec<(Border, Origin)>>| {
        lines
            .into_iter()
            .map(|line| line.into_iter().map(|(border, _)| border).collect())
            .collect()
    };
    CollapsedBorders {
        horizontal: strip(horizontal),
        vertical: strip(vertical),
    }
}

fn collapsed_borders(
    table: &LayoutBox,
    groups: &[LayoutBox],
    grid: &Grid<'_>,
) -> Option<CollapsedBorders> {
    (table.style.border_collapse == BorderCollapse::Collapse)
        .then(|| collapse_borders(table, groups, grid))
}

/// Width of the widest segment of a grid line.
fn widest_segment(segments: &[Border]) -> f32 {
    segments.iter().map(Border::used_width).fold(0.0, f32::max)
}

/// Horizontal padding and border of the table box, in either model.
fn table_decoration_width(table: &LayoutBox, borders: Option<&CollapsedBorders>) -> f32 {
    match borders {
        Some(borders) => borders.table_edges().horizontal(),
        None => {
            let style = &table.style;
            style.padding_left.resolve(0.0)
                + style.padding_right.resolve(0.0)
                + style.border_left.used_width()
                + style.border_right.used_width()
        }
    }
}

fn horizontal_spacing(table: &LayoutBox, borders: Option<&CollapsedBorders>) -> f32 {
    if borders.is_some() {
        0.0
    } else {
        table.style.border_spacing.0
    }
}

fn vertical_spacing(table: &LayoutBox, borders: Option<&CollapsedBorders>) -> f32 {
    if borders.is_some() {
        0.0
    } else {
        table.style.border_spacing.1
    }
}

/// Total horizontal border spacing of `columns` columns.
fn total_spacing(spacing: f32, columns: usize) -> f32 {
    if columns == 0 {
        0.0
    } else {
        spacing * (columns + 1) as f32
    }
}

/// Per-column constraints of the automatic table layout.
#[derive(Debug, Default)]
struct ColumnPreferences {
    min: Vec<f32>,
    max: Vec<f32>,
    /// Percentage widths, 0 when none.
    percentages: Vec<f32>,
    /// Columns with a fixed width from a column box or a cell.
    constrained: Vec<bool>,
    /// Columns holding at least one cell.
    occupied: Vec<bool>,
    /// Total horizontal border spacing.
    spacing: f32,
    table_min: f32,
    table_max: f32,
}

/// Grow `targets` so that they sum to at least `required`, in proportion
/// to `weights` (evenly when all weights are 0).
fn distribute(targets: &mut [f32], weights: &[f32], required: f32) {
    let shortfall = required - targets.iter().sum::<f32>();
    if shortfall <= 0.0 || targets.is_empty() {
        return;
    }
    let total: f32 = weights.iter().sum();
    let count = targets.len() as f32;
    for (target, weight) in targets.iter_mut().zip(weights) {
        *target += if total > 0.0 {
            shortfall * weight / total
        } else {
            shortfall / count
        };
    }
}

/// [§ 17.5.2.2 Automatic table layout](https://www.w3.org/TR/CSS2/tables.html#auto-table-layout)
///
/// Column minimum and maximum widths from cells and column boxes. Cells
/// spanning several columns are handled after single-column cells, the
/// narrowest spans first, and only grow the columns they span.
fn column_preferences(
    ctx: &LayoutContext<'_>,
    table: &LayoutBox,
    grid: &Grid<'_>,
    borders: Option<&CollapsedBorders>,
) -> ColumnPreferences {
    let columns = grid.columns;
    let spacing_x = horizontal_spacing(table, borders);
    let mut min = vec![0.0_f32; columns];
    let mut max = vec![0.0_f32; columns];
    let mut percentages = vec![0.0_f32; columns];
    let mut constrained = vec![false; columns];
    let mut occupied = vec![false; columns];

    if let BoxKind::Table(TableRole::Table(data)) = &table.kind {
        for (column, group) in data.columns() {
            let BoxKind::Table(TableRole::Column { grid_x }) = column.kind else {
                continue;
            };
            if grid_x >= columns {
                continue;
            }
            for style in [&group.style, &column.style] {
                match style.width {
                    AutoLength::Length(Length::Px(width)) => {
                        max[grid_x] = max[grid_x].max(width);
                        constrained[grid_x] = true;
                    }
                    AutoLength::Length(Length::Percent(percentage)) => {
                        percentages[grid_x] = percentages[grid_x].max(percentage);
                    }
                    AutoLength::Auto => {}
                }
            }
        }
    }

    let cell_widths = |grid_cell: &GridCell<'_>| {
        let (mut low, mut high) = table_cell_min_max_content_width(ctx, grid_cell.cell, true);
        if let Some(borders) = borders {
            let style = &grid_cell.cell.style;
            let collapsed = borders
                .cell_edges(
                    grid_cell.row,
                    grid_cell.grid_x,
                    grid_cell.colspan,
                    grid_cell.rowspan,
                )
                .horizontal();
            let delta =
                collapsed - style.border_left.used_width() - style.border_right.used_width();
            low += delta;
            high += delta;
        }
        (low, high)
    };

    for grid_cell in grid.cells.iter().filter(|grid_cell| grid_cell.colspan == 1) {
        let x = grid_cell.grid_x;
        let (low, high) = cell_widths(grid_cell);
        min[x] = min[x].max(low);
        max[x] = max[x].max(high);
        occupied[x] = true;
        match grid_cell.cell.style.width {
            AutoLength::Length(Length::Px(_)) => constrained[x] = true,
            AutoLength::Length(Length::Percent(percentage)) => {
                percentages[x] = percentages[x].max(percentage);
            }
            AutoLength::Auto => {}
        }
    }

    let mut spanning: Vec<&GridCell<'_>> = grid
        .cells
        .iter()
        .filter(|grid_cell| grid_cell.colspan > 1)
        .collect();
    spanning.sort_by_key(|grid_cell| grid_cell.colspan);
    for grid_cell in spanning {
        let range = grid_cell.grid_x..(grid_cell.grid_x + grid_cell.colspan).min(columns);
        for x in range.clone() {
            occupied[x] = true;
        }
        let inner_spacing = spacing_x * (range.len().saturating_sub(1)) as f32;
        let (low, high) = cell_widths(grid_cell);
        let weights = max[range.clone()].to_vec();
        distribute(&mut min[range.clone()], &weights, low - inner_spacing);
        distribute(&mut max[range.clone()], &weights, high - inner_spacing);

        if let AutoLength::Length(Length::Percent(percentage)) = grid_cell.cell.style.width {
            let assigned: f32 = percentages[range.clone()].iter().sum();
            let free: Vec<usize> = range.clone().filter(|x| percentages[*x] == 0.0).collect();
            if assigned < percentage && !free.is_empty() {
                let free_max: f32 = free.iter().map(|x| max[*x]).sum();
                for x in &free {
                    percentages[*x] = if free_max > 0.0 {
                        (percentage - assigned) * max[*x] / free_max
                    } else {
                        (percentage - assigned) / free.len() as f32
                    };
                }
            }
        }
    }

    for (high, low) in max.iter_mut().zip(&min) {
        *high = high.max(*low);
    }

    let spacing = total_spacing(spacing_x, columns);
    let table_min = min.iter().sum::<f32>() + spacing;
    let mut table_max = max.iter().sum::<f32>() + spacing;

    // A column of p% with max-content w needs a table of at least w/p.
    let percentage_total: f32 = percentages.iter().sum::<f32>().min(100.0);
    for (percentage, max) in percentages.iter().zip(&max) {
        if *percentage > 0.0 {
            table_max = table_max.max(max * 100.0 / percentage + spacing);
        }
    }
    if percentage_total > 0.0 && percentage_total < 100.0 {
        let others: f32 = percentages
            .iter()
            .zip(&max)
            .filter(|(percentage, _)| **percentage == 0.0)
            .map(|(_, max)| max)
            .sum();
        table_max = table_max.max(others * 100.0 / (100.0 - percentage_total) + spacing);
    }

    ColumnPreferences {
        min,
        max,
        percentages,
        constrained,
        occupied,
        spacing,
        table_min,
        table_max,
    }
}

/// The table box's min-content and max-content widths, content box plus
/// border spacing.
fn table_content_widths(prefs: &ColumnPreferences, table: &LayoutBox) -> (f32, f32) {
    match table.style.width {
        AutoLength::Length(Length::Px(width)) => {
            let width = width.max(prefs.table_min);
            (width, width)
        }
        _ => (prefs.table_min, prefs.table_max),
    }
}

/// Preferred widths of a table wrapper: the table's border box, widened by
/// the captions.
#[must_use]
pub(crate) fn table_preferred_widths(
    ctx: &LayoutContext<'_>,
    wrapper: &LayoutBox,
    outer: bool,
) -> (f32, f32) {
    let (mut min, mut max) = (0.0_f32, 0.0_f32);
    if let Some(table) = wrapper
        .children
        .iter()
        .find(|child| matches!(child.kind, BoxKind::Table(TableRole::Table(_))))
    {
        let grid = Grid::of(table, &table.children);
        let borders = collapsed_borders(table, &table.children, &grid);
        let prefs = column_preferences(ctx, table, &grid, borders.as_ref());
        let (table_min, table_max) = table_content_widths(&prefs, table);
        let decoration = table_decoration_width(table, borders.as_ref());
        min = table_min + decoration;
        max = table_max + decoration;
    }
    for caption in wrapper
        .children
        .iter()
        .filter(|child| matches!(child.kind, BoxKind::Table(TableRole::Caption)))
    {
        min = min.max(min_content_width(ctx, caption, true));
        max = max.max(max_content_width(ctx, caption, true));
    }
    max = max.max(min);
    if outer {
        (
            margin_width(wrapper, min, true, true),
            margin_width(wrapper, max, true, true),
        )
    } else {
        (min, max)
    }
}

/// Used column widths and the table's content width (spacing included).
#[derive(Debug, Default)]
struct ColumnWidths {
    widths: Vec<f32>,
    table_width: f32,
}

/// [§ 17.5.2.1 Fixed table layout](https://www.w3.org/TR/CSS2/tables.html#fixed-table-layout)
///
/// "In the fixed table layout algorithm, the width of each column is
/// determined as follows:
/// 1. A column element with a value other than 'auto' for the 'width'
///    property sets the width for that column.
/// 2. Otherwise, a cell in the first row with a value other than 'auto'
///    for the 'width' property determines the width for that column. If
///    the cell spans more than one column, the width is divided over the
///    columns.
/// 3. Any remaining columns equally divide the remaining horizontal table
///    space (minus borders or cell spacing)."
fn fixed_column_widths(
    table: &LayoutBox,
    groups: &[LayoutBox],
    table_width: f32,
    borders: Option<&CollapsedBorders>,
) -> ColumnWidths {
    let first_row = groups
        .iter()
        .flat_map(|group| group.children.first())
        .next();
    let first_row_cells: Vec<(&LayoutBox, usize)> = first_row
        .map(|row| {
            row.children
                .iter()
                .filter_map(|cell| match cell.kind {
                    BoxKind::Table(TableRole::Cell { colspan, .. }) => Some((cell, colspan.max(1))),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let columns_from_cells: usize = first_row_cells.iter().map(|(_, colspan)| colspan).sum();
    let column_boxes: Vec<(&LayoutBox, &LayoutBox)> = match &table.kind {
        BoxKind::Table(TableRole::Table(data)) => data.columns().collect(),
        _ => Vec::new(),
    };
    let column_count = column_boxes
        .iter()
        .filter_map(|(column, _)| match column.kind {
            BoxKind::Table(TableRole::Column { grid_x }) => Some(grid_x + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        .max(columns_from_cells);

    let spacing_x = horizontal_spacing(table, borders);
    let mut widths: Vec<Option<f32>> = vec![None; column_count];

    for (column, _) in &column_boxes {
        if let BoxKind::Table(TableRole::Column { grid_x }) = column.kind
            && let AutoLength::Length(width) = column.style.width
        {
            widths[grid_x] = Some(width.resolve(table_width));
        }
    }

    let mut grid_x = 0;
    for (cell, colspan) in first_row_cells {
        if let AutoLength::Length(width) = cell.style.width {
            let style = &cell.style;
            let (border_left, border_right) = match borders {
                Some(borders) => {
                    let edges = borders.cell_edges(0, grid_x, colspan, 1);
                    (edges.left, edges.right)
                }
                None => (
                    style.border_left.used_width(),
                    style.border_right.used_width(),
                ),
            };
            let border_width = width.resolve(table_width)
                + style.padding_left.resolve(table_width)
                + style.padding_right.resolve(table_width)
                + border_left
                + border_right;
            let spanned = grid_x..(grid_x + colspan).min(column_count);
            let unset = spanned.clone().filter(|x| widths[*x].is_none()).count();
            if unset == colspan {
                let share = (border_width - spacing_x * (colspan - 1) as f32) / colspan as f32;
                for x in spanned {
                    widths[x] = Some(share.max(0.0));
                }
            }
        }
        grid_x += colspan;
    }

    let spacing = total_spacing(spacing_x, column_count);
    let fixed: f32 = widths.iter().flatten().sum();
    let unset = widths.iter().filter(|width| width.is_none()).count();
    let remaining = (table_width - spacing - fixed).max(0.0);
    // With every column set, a wider table spreads its extra space over all columns.
    let extra = if unset == 0 && column_count > 0 {
        remaining / column_count as f32
    } else {
        0.0
    };
    let unset_width = remaining / unset.max(1) as f32;
    let widths: Vec<f32> = widths
        .into_iter()
        .map(|width| width.map_or(unset_width, |width| width + extra))
        .collect();
    let used = widths.iter().sum::<f32>() + spacing;
    ColumnWidths {
        table_width: table_width.max(used),
        widths,
    }
}

/// [§ 17.5.2.2 Automatic table layout](https://www.w3.org/TR/CSS2/tables.html#auto-table-layout)
///
/// Interpolation between four guesses of the column widths, following
/// <https://dbaron.org/css/intrinsic/#distributetocols>:
/// every column at its minimum; percentage columns at their percentage
/// and the others at the minimum; constrained columns at their maximum;
/// every column at its maximum. The first guess wider than the assignable
/// width gives the interval to interpolate in. Past the last guess the
/// excess goes, in order of preference, to unconstrained columns with
/// content, to any unconstrained column, to constrained columns with
/// content, to percentage columns, to columns with content, or to all.
fn auto_column_widths(prefs: &ColumnPreferences, assignable: f32) -> ColumnWidths {
    let columns = prefs.min.len();
    if columns == 0 {
        return ColumnWidths {
            widths: Vec::new(),
            table_width: assignable,
        };
    }
    let assignable = assignable - prefs.spacing;

    let min_guess = prefs.min.clone();
    let percentage_guess: Vec<f32> = (0..columns)
        .map(|x| {
            if prefs.percentages[x] > 0.0 {
                prefs.min[x].max(prefs.percentages[x] / 100.0 * assignable)
            } else {
                prefs.min[x]
            }
        })
        .collect();
    let constrained_guess: Vec<f32> = (0..columns)
        .map(|x| {
            if prefs.percentages[x] == 0.0 && prefs.constrained[x] {
                prefs.max[x].max(percentage_guess[x])
            } else {
                percentage_guess[x]
            }
        })
        .collect();
    let max_guess: Vec<f32> = (0..columns)
        .map(|x| {
            if prefs.percentages[x] > 0.0 {
                percentage_guess[x]
            } else {
                prefs.max[x].max(constrained_guess[x])
            }
        })
        .collect();
    let guesses = [min_guess, percentage_guess, constrained_guess, max_guess];
    let sums: Vec<f32> = guesses.iter().map(|guess| guess.iter().sum()).collect();

    let widths = match sums.iter().position(|sum| *sum > assignable) {
        Some(0) => guesses[0].clone(),
        Some(upper) => {
            let (lower_guess, upper_guess) = (&guesses[upper - 1], &guesses[upper]);
            let (lower_sum, upper_sum) = (sums[upper - 1], sums[upper]);
            let ratio = if upper_sum > lower_sum {
                (assignable - lower_sum) / (upper_sum - lower_sum)
            } else {
                0.0
            };
            lower_guess
                .iter()
                .zip(upper_guess)
                .map(|(lower, upper)| lower + (upper - lower) * ratio)
                .collect()
        }
        None => {
            let mut widths = guesses[3].clone();
            let excess = assignable - sums[3];
            let groups: [fn(&ColumnPreferences, usize) -> bool; 6] = [
                |p, x| !p.constrained[x] && p.percentages[x] == 0.0 && p.max[x] > 0.0,
                |p, x| !p.constrained[x] && p.percentages[x] == 0.0,
                |p, x| p.constrained[x] && p.percentages[x] == 0.0 && p.max[x] > 0.0,
                |p, x| p.percentages[x] > 0.0,
                |p, x| p.occupied[x],
                |_, _| true,
            ];
            if excess > 0.0
                && let Some(selected) = groups.iter().find_map(|keep| {
                    let selected: Vec<usize> = (0..columns).filter(|x| keep(prefs, *x)).collect();
                    (!selected.is_empty()).then_some(selected)
                })
            {
                let weights: Vec<f32> = selected.iter().map(|x| widths[*x]).collect();
                let total: f32 = weights.iter().sum();
                for (x, weight) in selected.iter().zip(&weights) {
                    widths[*x] += if total > 0.0 {
                        excess * weight / total
                    } else {
                        excess / selected.len() as f32
                    };
                }
            }
            widths
        }
    };

    let table_width = widths.iter().sum::<f32>() + prefs.spacing;
    ColumnWidths { widths, table_width }
}

/// Column widths of `table`, an auto width being bounded by `available`.
fn column_widths(
    ctx: &LayoutContext<'_>,
    table: &LayoutBox,
    groups: &[LayoutBox],
    grid: &Grid<'_>,
    borders: Option<&CollapsedBorders>,
    available: f32,
) -> ColumnWidths {
    let specified = table.width.length();
    if table.style.table_layout == TableLayout::Fixed
        && let Some(width) = specified
    {
        return fixed_column_widths(table, groups, width, borders);
    }

    let prefs = column_preferences(ctx, table, grid, borders);
    let assignable = match specified {
        Some(width) => width.max(prefs.table_min),
        None => available.min(prefs.table_max).max(prefs.table_min),
    };
    auto_column_widths(&prefs, assignable)
}

/// Give the table box its collapsed edges and resolve its percentages.
fn prepare_table(
    table: &mut LayoutBox,
    borders: Option<&CollapsedBorders>,
    containing_block: ContainingBlock,
) {
    resolve_percentages(table, containing_block);
    table.margin = EdgeSizes::default();
    if let Some(borders) = borders {
        table.padding = EdgeSizes::default();
        table.border = borders.table_edges();
    }
}

/// [§ 17.4 Tables in the visual formatting model](https://www.w3.org/TR/CSS2/tables.html#model)
///
/// "The computed values of properties 'position', 'float', 'margin-*',
/// 'top', 'right', 'bottom', and 'left' on the table element are used on
/// the table wrapper box and not the table box."
///
/// The wrapper's width is the table's border-box width.
pub(crate) fn table_wrapper_width(
    ctx: &LayoutContext<'_>,
    wrapper: &mut LayoutBox,
    children: &[LayoutBox],
    containing_block: ContainingBlock,
) {
    let Some(source) = children
        .iter()
        .find(|child| matches!(child.kind, BoxKind::Table(TableRole::Table(_))))
    else {
        return;
    };
    let grid = Grid::of(source, &source.children);
    let borders = collapsed_borders(source, &source.children, &grid);
    let mut table = source.copy_with_children(Vec::new());
    prepare_table(&mut table, borders.as_ref(), containing_block);

    let decoration = table.padding.horizontal() + table.border.horizontal();
    let available = containing_block.width - wrapper.margin.horizontal() - decoration;
    let widths = column_widths(
        ctx,
        &table,
        &source.children,
        &grid,
        borders.as_ref(),
        available,
    );
    wrapper.width = AutoOr::Length(widths.table_width + decoration);
}

/// Geometry shared by the row groups of one table fragment.
struct TableFrame<'t> {
    groups: &'t [LayoutBox],
    group_offsets: Vec<usize>,
    borders: Option<CollapsedBorders>,
    column_widths: Vec<f32>,
    column_positions: Vec<f32>,
    rows_x: f32,
    rows_width: f32,
    spacing_x: f32,
    spacing_y: f32,
    containing_block: ContainingBlock,
}

/// A laid out row group, or nothing when it did not fit.
#[derive(Default)]
struct GroupLayout {
    new_group: Option<LayoutBox>,
    resume_at: Option<SkipStack>,
    next_page: NextPage,
}

/// A cell whose height is settled by the row it ends in.
struct PendingCell {
    /// Index of the cell's row in the group fragment.
    slot: usize,
    /// Index of the cell in its laid out row.
    cell: usize,
    end_row: usize,
    content_height: f32,
    computed_height: Option<f32>,
}

/// Body groups of a fragment: `(groups, resume_at, next_page, end_y)`.
type BodyLayout = (Vec<LayoutBox>, Option<SkipStack>, NextPage, f32);

const fn is_header(group: &LayoutBox) -> bool {
    matches!(
        group.kind,
        BoxKind::Table(TableRole::RowGroup { header: true, .. })
    )
}

const fn is_footer(group: &LayoutBox) -> bool {
    matches!(
        group.kind,
        BoxKind::Table(TableRole::RowGroup { footer: true, .. })
    )
}

/// Rows, row groups and cells have no padding nor border in the
/// collapsing model, and never margins.
fn clear_decorations(layout_box: &mut LayoutBox, collapse: bool) {
    layout_box.margin = EdgeSizes::default();
    if collapse {
        layout_box.padding = EdgeSizes::default();
        layout_box.border = EdgeSizes::default();
    }
}

/// Baseline of a cell from its margin-box top: the first line box or
/// in-flow table row in it, or the bottom of its content box.
fn cell_baseline(cell: &LayoutBox) -> f32 {
    fn first_baseline(layout_box: &LayoutBox) -> Option<f32> {
        for child in layout_box
            .children
            .iter()
            .filter(|child| child.is_in_normal_flow())
        {
            if child.is_line() || child.is_row() {
                if let Some(baseline) = child.baseline {
                    return Some(child.position_y + baseline);
                }
            } else if child.is_block_container()
                && let Some(baseline) = first_baseline(child)
            {
                return Some(baseline);
            }
        }
        None
    }
    first_baseline(cell).map_or_else(
        || cell.content_box_y() + cell.content_height() - cell.position_y,
        |baseline| baseline - cell.position_y,
    )
}

/// Push the content of a cell down by growing its top padding.
fn add_top_padding(cell: &mut LayoutBox, extra: f32) {
    if extra == 0.0 {
        return;
    }
    cell.padding.top += extra;
    for child in &mut cell.children {
        child.translate(0.0, extra);
    }
}

impl TableFrame<'_> {
    const fn collapse(&self) -> bool {
        self.borders.is_some()
    }

    /// Lay out the cells of `source_row`, returning the row and the cells
    /// it starts as `(cell index, last row, content height, computed
    /// height)`.
    fn row_layout(
        &self,
        ctx: &mut LayoutContext<'_>,
        source_row: &LayoutBox,
        group_index: usize,
        row_index: usize,
        position_y: f32,
        last_row: usize,
    ) -> (LayoutBox, Vec<(usize, usize, f32, Option<f32>)>) {
        let mut row = source_row.copy_with_children(Vec::new());
        row.index = row_index;
        resolve_percentages(&mut row, self.containing_block);
        clear_decorations(&mut row, self.collapse());
        row.position_x = self.rows_x;
        row.position_y = position_y;
        row.width = AutoOr::Length(self.rows_width);
        row.baseline = None;

        let columns = self.column_widths.len();
        let rtl = row.style.direction == Direction::Rtl;
        let mut new_cells = Vec::new();
        let mut started = Vec::new();

        for (cell_index, source_cell) in source_row.children.iter().enumerate() {
            let BoxKind::Table(TableRole::Cell {
                colspan,
                rowspan,
                grid_x,
            }) = source_cell.kind
            else {
                continue;
            };
            if grid_x >= columns {
                let ignored = source_row.children.len() - cell_index;
                warn_once(
                    "table",
                    &format!(
                        "row has more cells than the table has columns, {ignored} cell(s) ignored"
                    ),
                );
                break;
            }
            let colspan = colspan.clamp(1, columns - grid_x);
            let end_row = if rowspan == 0 {
                last_row
            } else {
                (row_index + rowspan - 1).min(last_row)
            };

            let mut cell = source_cell.copy_with_children(Vec::new());
            cell.index = cell_index;
            resolve_percentages(&mut cell, self.containing_block);
            cell.margin = EdgeSizes::default();
            if let Some(borders) = &self.borders {
                let global_row = self.group_offsets[group_index] + row_index;
                let rowspan = end_row - row_index + 1;
                cell.border = borders.cell_edges(global_row, grid_x, colspan, rowspan);
            }
            let last_column = grid_x + colspan - 1;
            cell.position_x = if rtl {
                self.column_positions[last_column]
            } else {
                self.column_positions[grid_x]
            };
            cell.position_y = position_y;
            let spanned = self.column_widths[grid_x..=last_column].iter().sum::<f32>()
                + self.spacing_x * (colspan - 1) as f32;
            let inner = spanned - cell.padding.horizontal() - cell.border.horizontal();
            cell.width = AutoOr::Length(inner.max(0.0));
            let computed_height = cell.height.length();
            cell.height = AutoOr::Auto;

            let fallback = cell.copy_with_children(Vec::new());
            let layout = block_container_layout(
                ctx,
                cell,
                &source_cell.children,
                f32::NEG_INFINITY,
                None,
                true,
                Vec::new(),
                false,
            );
            let mut new_cell = layout.new_box.unwrap_or_else(|| {
                let mut empty = fallback;
                empty.height = AutoOr::Length(0.0);
                empty
            });
            let content_height = new_cell.content_height();
            if let Some(height) = computed_height {
                new_cell.height = AutoOr::Length(content_height.max(height));
            }
            started.push((new_cells.len(), end_row, content_height, computed_height));
            new_cells.push(new_cell);
        }

        (row.copy_with_children(new_cells), started)
    }

    /// [§ 17.5.3 Table height algorithms](https://www.w3.org/TR/CSS2/tables.html#height-layout)
    ///
    /// Lay out the rows of a group from `skip_stack` until one overflows
    /// the page. Rows are never split.
    fn group_layout(
        &self,
        ctx: &mut LayoutContext<'_>,
        group_index: usize,
        position_y: f32,
        bottom_space: f32,
        page_is_empty: bool,
        skip_stack: Option<&SkipStack>,
    ) -> GroupLayout {
        let source = &self.groups[group_index];
        let mut group = source.copy_with_children(Vec::new());
        group.index = group_index;
        resolve_percentages(&mut group, self.containing_block);
        clear_decorations(&mut group, self.collapse());
        group.position_x = self.rows_x;
        group.position_y = position_y;
        group.width = AutoOr::Length(self.rows_width);

        let original_page_is_empty = page_is_empty;
        let mut page_is_empty = page_is_empty;
        let mut position_y = position_y;
        let mut new_rows: Vec<LayoutBox> = Vec::new();
        let mut pending: Vec<PendingCell> = Vec::new();
        let mut resume_at = None;
        let mut next_page = NextPage::default();
        let skip = skip_stack.map_or(0, SkipStack::index);
        let last_row = source.children.len().saturating_sub(1);

        for (row_index, source_row) in source.children.iter().enumerate().skip(skip) {
            if let Some(previous) = new_rows.last() {
                let page_break = block_level_page_break(previous, source_row);
                if is_forced_break(page_break, ctx) {
                    next_page.break_value = page_break;
                    resume_at = Some(SkipStack::leaf(row_index));
                    break;
                }
            }

            let (mut row, started) = self.row_layout(
                ctx,
                source_row,
                group_index,
                row_index,
                position_y,
                last_row,
            );
            let slot = new_rows.len();
            pending.extend(
                started
                    .into_iter()
                    .map(|(cell, end_row, content_height, computed_height)| PendingCell {
                        slot,
                        cell,
                        end_row,
                        content_height,
                        computed_height,
                    }),
            );

            // [§ 17.5.3](https://www.w3.org/TR/CSS2/tables.html#height-layout)
            // "The baseline of a cell is the baseline of the first in-flow
            // line box in the cell [...]. The cells are aligned on their
            // baseline in the row."
            let baseline_cells: Vec<usize> = row
                .children
                .iter()
                .enumerate()
                .filter(|(_, cell)| {
                    !matches!(
                        cell.style.vertical_align,
                        VerticalAlign::Top | VerticalAlign::Middle | VerticalAlign::Bottom
                    )
                })
                .map(|(index, _)| index)
                .collect();
            if !baseline_cells.is_empty() {
                let baselines: Vec<f32> = baseline_cells
                    .iter()
                    .map(|index| cell_baseline(&row.children[*index]))
                    .collect();
                let row_baseline = baselines.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                for (index, baseline) in baseline_cells.iter().zip(baselines) {
                    add_top_padding(&mut row.children[*index], row_baseline - baseline);
                }
                row.baseline = Some(row_baseline);
            }

            let cell_bottom = |slot: usize, cell: usize| {
                let cell = if slot == new_rows.len() {
                    &row.children[cell]
                } else {
                    &new_rows[slot].children[cell]
                };
                cell.position_y + cell.border_height()
            };
            let ending_bottom = pending
                .iter()
                .filter(|entry| entry.end_row == row_index)
                .map(|entry| cell_bottom(entry.slot, entry.cell))
                .fold(position_y, f32::max);
            let content_height = ending_bottom - position_y;
            let row_height = match row.height.length() {
                Some(height) => height.max(content_height),
                None => content_height,
            };
            row.height = AutoOr::Length(row_height);
            let row_bottom = position_y + row_height;
            let next_position_y = row_bottom + self.spacing_y;

            if !page_is_empty && ctx.overflows_page(bottom_space, next_position_y) {
                ctx.remove_placeholders(&row.children);
                pending.retain(|entry| entry.slot < new_rows.len());
                if let Some(previous) = new_rows.last() {
                    let page_break = block_level_page_break(previous, source_row);
                    if !avoid_page_break(page_break, ctx) {
                        resume_at = Some(SkipStack::leaf(row_index));
                        break;
                    }
                    if let Some(earlier) = find_earlier_page_break(ctx, &mut new_rows) {
                        let kept = new_rows.len();
                        pending.retain(|entry| entry.slot < kept);
                        resume_at = Some(earlier);
                        break;
                    }
                }
                if original_page_is_empty {
                    resume_at = Some(SkipStack::leaf(row_index));
                    break;
                }
                ctx.remove_placeholders(&new_rows);
                return GroupLayout {
                    next_page,
                    ..GroupLayout::default()
                };
            }

            // Cells ending here stretch to the bottom of the row.
            new_rows.push(row);
            let (ending, waiting): (Vec<PendingCell>, Vec<PendingCell>) = pending
                .into_iter()
                .partition(|entry| entry.end_row == row_index);
            pending = waiting;
            for entry in ending {
                let cell = &mut new_rows[entry.slot].children[entry.cell];
                stretch_cell(cell, row_bottom, &entry);
            }

            position_y = next_position_y;
            page_is_empty = false;
        }

        // Cells spanning past the fragment end with it.
        if !pending.is_empty() && !new_rows.is_empty() {
            let row_bottom = new_rows
                .last()
                .map_or(position_y, |row| row.position_y + row.content_height());
            for entry in pending {
                let cell = &mut new_rows[entry.slot].children[entry.cell];
                stretch_cell(cell, row_bottom, &entry);
            }
        }

        if resume_at.is_some()
            && !original_page_is_empty
            && (avoid_break_inside(group.style.break_inside, ctx) || new_rows.is_empty())
        {
            ctx.remove_placeholders(&new_rows);
            return GroupLayout {
                next_page,
                ..GroupLayout::default()
            };
        }

        for row in &mut new_rows {
            if row.baseline.is_none() {
                row.baseline = Some(row.content_height());
            }
        }
        let spacing = if new_rows.is_empty() {
            0.0
        } else {
            self.spacing_y
        };
        let mut group = group.copy_with_children(new_rows);
        group.height = AutoOr::Length((position_y - group.position_y - spacing).max(0.0));
        group.is_start = skip_stack.is_none();
        group.is_end = resume_at.is_none();
        GroupLayout {
            new_group: Some(group),
            resume_at,
            next_page,
        }
    }

    /// Body groups from `skip_stack` until the page is full, `None` when
    /// not even the first one fits.
    fn body_groups_layout(
        &self,
        ctx: &mut LayoutContext<'_>,
        skip_stack: Option<&SkipStack>,
        position_y: f32,
        bottom_space: f32,
        page_is_empty: bool,
    ) -> Option<BodyLayout> {
        let (skip, nested) = SkipStack::split(skip_stack);
        let mut page_is_empty = page_is_empty;
        let mut position_y = position_y;
        let mut new_groups: Vec<LayoutBox> = Vec::new();
        let mut resume_at = None;
        let mut next_page = NextPage::default();
        let mut nested = nested;

        for (index, source) in self.groups.iter().enumerate().skip(skip) {
            if is_header(source) || is_footer(source) {
                continue;
            }
            if let Some(previous) = new_groups.last() {
                let page_break = block_level_page_break(previous, source);
                if is_forced_break(page_break, ctx) {
                    next_page.break_value = page_break;
                    resume_at = Some(SkipStack::leaf(index));
                    break;
                }
            }

            let layout = self.group_layout(
                ctx,
                index,
                position_y,
                bottom_space,
                page_is_empty,
                nested.take().as_ref(),
            );
            next_page = layout.next_page;
            let Some(new_group) = layout.new_group else {
                let previous = new_groups.last()?;
                let page_break = block_level_page_break(previous, source);
                if avoid_page_break(page_break, ctx)
                    && let Some(earlier) = find_earlier_page_break(ctx, &mut new_groups)
                {
                    resume_at = Some(earlier);
                    break;
                }
                resume_at = Some(SkipStack::leaf(index));
                break;
            };

            position_y = new_group.position_y + new_group.content_height() + self.spacing_y;
            new_groups.push(new_group);
            page_is_empty = false;
            if let Some(inner) = layout.resume_at {
                resume_at = Some(SkipStack::new(index, Some(inner)));
                break;
            }
        }

        Some((new_groups, resume_at, next_page, position_y))
    }
}

/// Give an ending cell the height of its rows and align its content.
fn stretch_cell(cell: &mut LayoutBox, row_bottom: f32, entry: &PendingCell) {
    let PendingCell {
        content_height,
        computed_height,
        ..
    } = *entry;
    let decoration = cell.padding.vertical() + cell.border.vertical();
    let cell_height = (row_bottom - cell.position_y - decoration).max(0.0);
    let used_height = cell.height.length().unwrap_or(content_height);
    let extra = (cell_height - used_height).max(0.0);
    if let Some(computed) = computed_height
        && computed > content_height
    {
        // Content is aligned inside the computed height first.
        let shift = match cell.style.vertical_align {
            VerticalAlign::Middle => (computed - content_height) / 2.0,
            VerticalAlign::Bottom => computed - content_height,
            _ => 0.0,
        };
        for child in &mut cell.children {
            child.translate(0.0, shift);
        }
    }
    let top = match cell.style.vertical_align {
        VerticalAlign::Middle => extra / 2.0,
        VerticalAlign::Bottom => extra,
        _ => 0.0,
    };
    add_top_padding(cell, top);
    cell.padding.bottom += extra - top;
    cell.height = AutoOr::Length(used_height);
}

/// Header, body and footer of a fragment.
struct GroupsLayout {
    header: Option<LayoutBox>,
    body: Option<Vec<LayoutBox>>,
    footer: Option<LayoutBox>,
    end_y: f32,
    resume_at: Option<SkipStack>,
    next_page: NextPage,
}

/// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
///
/// "Print user agents may repeat header rows on each page spanning a
/// table." The body is laid out between the header and the footer; when
/// no body row fits with them, the footer is dropped first, then the
/// header.
fn all_groups_layout(
    ctx: &mut LayoutContext<'_>,
    frame: &TableFrame<'_>,
    skip_stack: Option<&SkipStack>,
    position_y: f32,
    bottom_space: f32,
    page_is_empty: bool,
) -> GroupsLayout {
    let groups = frame.groups;
    let rows_exist = groups
        .iter()
        .any(|group| !is_header(group) && !is_footer(group));
    let avoid_breaks = {
        let skip = skip_stack.map_or(0, SkipStack::index);
        groups
            .iter()
            .skip(skip)
            .find(|group| !is_header(group) && !is_footer(group))
            .is_some_and(|group| avoid_break_inside(group.style.break_inside, ctx))
    };

    let repeated = |ctx: &mut LayoutContext<'_>, index: Option<usize>| {
        let layout = frame.group_layout(ctx, index?, position_y, bottom_space, false, None);
        match (layout.new_group, layout.resume_at) {
            (Some(group), None) => {
                let height = group.content_height() + frame.spacing_y;
                Some((group, height))
            }
            (Some(partial), Some(_)) => {
                ctx.remove_placeholders(std::slice::from_ref(&partial));
                None
            }
            (None, _) => None,
        }
    };
    let header_index = groups.first().filter(|group| is_header(group)).map(|_| 0);
    let footer_index = groups
        .last()
        .filter(|group| is_footer(group))
        .map(|_| groups.len() - 1)
        .filter(|index| Some(*index) != header_index);
    let mut header = repeated(ctx, header_index);
    let mut footer = repeated(ctx, footer_index);

    let drop_group = |ctx: &mut LayoutContext<'_>, group: Option<(LayoutBox, f32)>| {
        if let Some((group, _)) = group {
            ctx.remove_placeholders(std::slice::from_ref(&group));
        }
    };

    while header.is_some() || footer.is_some() {
        let header_height = header.as_ref().map_or(0.0, |(_, height)| *height);
        let footer_height = footer.as_ref().map_or(0.0, |(_, height)| *height);
        let checkpoint = ctx.checkpoint();
        let body = frame.body_groups_layout(
            ctx,
            skip_stack,
            position_y + header_height,
            bottom_space + footer_height,
            avoid_breaks,
        );
        let has_rows = body.as_ref().is_some_and(|(groups, ..)| !groups.is_empty());
        if has_rows || !rows_exist || !page_is_empty {
            return match body {
                Some((groups, resume_at, next_page, end_y)) => GroupsLayout {
                    header: header.map(|(group, _)| group),
                    body: Some(groups),
                    footer: footer.map(|(group, _)| group),
                    end_y,
                    resume_at,
                    next_page,
                },
                None => GroupsLayout {
                    header: header.map(|(group, _)| group),
                    body: None,
                    footer: footer.map(|(group, _)| group),
                    end_y: position_y,
                    resume_at: None,
                    next_page: NextPage::default(),
                },
            };
        }
        if let Some((groups, ..)) = &body {
            ctx.remove_placeholders(groups);
        }
        ctx.rollback(checkpoint);
        if header.is_some() && footer.is_some() {
            drop_group(ctx, footer.take());
        } else if header.is_some() {
            drop_group(ctx, header.take());
        } else {
            drop_group(ctx, footer.take());
        }
    }

    match frame.body_groups_layout(ctx, skip_stack, position_y, bottom_space, page_is_empty) {
        Some((groups, resume_at, next_page, end_y)) => GroupsLayout {
            header: None,
            body: Some(groups),
            footer: None,
            end_y,
            resume_at,
            next_page,
        },
        None => GroupsLayout {
            header: None,
            body: None,
            footer: None,
            end_y: position_y,
            resume_at: None,
            next_page: NextPage::default(),
        },
    }
}

/// [§ 17.5 Visual layout of table contents](https://www.w3.org/TR/CSS2/tables.html#table-layout)
///
/// Lay out the table box `prepared` inside its wrapper `containing_block`.
/// `children` are the row groups of the source table.
pub(crate) fn table_layout(
    ctx: &mut LayoutContext<'_>,
    prepared: LayoutBox,
    children: &[LayoutBox],
    bottom_space: f32,
    skip_stack: Option<&SkipStack>,
    containing_block: &LayoutBox,
    page_is_empty: bool,
) -> BlockLayout {
    let grid = Grid::of(&prepared, children);
    let borders = collapsed_borders(&prepared, children, &grid);
    let cb = ContainingBlock::of(containing_block);

    let mut table = prepared;
    prepare_table(&mut table, borders.as_ref(), cb);
    let decoration = table.padding.horizontal() + table.border.horizontal();
    let content_width = containing_block.content_width() - decoration;
    table.width = AutoOr::Length(content_width);
    let widths = column_widths(
        ctx,
        &table,
        children,
        &grid,
        borders.as_ref(),
        content_width,
    );
    table.width = AutoOr::Length(widths.table_width);

    let has_header = children.first().is_some_and(is_header);
    table.remove_decoration(skip_stack.is_some() && !has_header, false);

    let spacing_x = horizontal_spacing(&table, borders.as_ref());
    let spacing_y = vertical_spacing(&table, borders.as_ref());
    let rtl = table.style.direction == Direction::Rtl;
    let mut column_positions = Vec::with_capacity(widths.widths.len());
    if rtl {
        let mut position_x = table.content_box_x() + widths.table_width;
        for width in &widths.widths {
            position_x -= spacing_x + width;
            column_positions.push(position_x);
        }
    } else {
        let mut position_x = table.content_box_x();
        for width in &widths.widths {
            position_x += spacing_x;
            column_positions.push(position_x);
            position_x += width;
        }
    }

    let rows_x = table.content_box_x() + spacing_x;
    let rows_width = (widths.table_width - 2.0 * spacing_x).max(0.0);
    let table_cb = {
        let mut measure = table.copy_with_children(Vec::new());
        measure.height = AutoOr::Auto;
        ContainingBlock::of(&measure)
    };

    let frame = TableFrame {
        groups: children,
        group_offsets: grid.group_offsets.clone(),
        borders: borders.clone(),
        column_widths: widths.widths.clone(),
        column_positions: column_positions.clone(),
        rows_x,
        rows_width,
        spacing_x,
        spacing_y,
        containing_block: table_cb,
    };

    let mut position_y = table.content_box_y();
    if skip_stack.is_none() {
        position_y += spacing_y;
    }
    let initial_position_y = position_y;

    let GroupsLayout {
        header,
        body,
        footer,
        end_y,
        resume_at,
        next_page,
    } = all_groups_layout(
        ctx,
        &frame,
        skip_stack,
        position_y,
        bottom_space,
        page_is_empty,
    );

    let Some(body) = body else {
        ctx.remove_placeholders(&header.into_iter().chain(footer).collect::<Vec<_>>());
        return BlockLayout {
            next_page,
            ..BlockLayout::default()
        };
    };

    if resume_at.is_some() && !page_is_empty && avoid_break_inside(table.style.break_inside, ctx) {
        ctx.remove_placeholders(&body);
        ctx.remove_placeholders(&header.into_iter().chain(footer).collect::<Vec<_>>());
        return BlockLayout::default();
    }

    let footer_kept = footer.is_some();
    let mut new_groups = Vec::with_capacity(body.len() + 2);
    let mut end_y = end_y;
    if let Some(header) = header {
        new_groups.push(header);
    }
    new_groups.extend(body);
    if let Some(mut footer) = footer {
        let dy = end_y - footer.position_y;
        footer.translate(0.0, dy);
        end_y = footer.position_y + footer.content_height() + spacing_y;
        new_groups.push(footer);
    }

    let content_height = end_y - table.content_box_y();
    table.height = AutoOr::Length(match table.height.length() {
        Some(height) => height.max(content_height),
        None => content_height,
    });
    if resume_at.is_some() && !footer_kept {
        table.remove_decoration(false, true);
    }
    let columns_height = (end_y - initial_position_y - spacing_y).max(0.0);
    let column_count = widths.widths.len();

    let mut data = match &table.kind {
        BoxKind::Table(TableRole::Table(data)) => (**data).clone(),
        _ => TableData::default(),
    };
    for group in &mut data.column_groups {
        position_column_group(
            group,
            &widths.widths,
            &column_positions,
            initial_position_y,
            columns_height,
        );
    }
    data.column_widths = widths.widths;
    data.column_positions = column_positions;
    data.collapsed_borders = borders;
    table.kind = BoxKind::Table(TableRole::Table(Box::new(data)));

    let mut new_table = table.copy_with_children(new_groups);
    new_table.is_start = skip_stack.is_none();
    new_table.is_end = resume_at.is_none();
    new_table.baseline = new_table
        .children
        .iter()
        .flat_map(|group| group.children.first())
        .next()
        .and_then(|row| {
            row.baseline
                .map(|baseline| row.position_y + baseline - new_table.position_y)
        });

    trace!(
        "table {} laid out with {column_count} columns, height {}",
        new_table.label(),
        new_table.content_height()
    );

    BlockLayout {
        new_box: Some(new_table),
        resume_at,
        next_page,
        ..BlockLayout::default()
    }
}

/// Give a column group and its columns the geometry of their grid columns.
fn position_column_group(
    group: &mut LayoutBox,
    widths: &[f32],
    positions: &[f32],
    position_y: f32,
    height: f32,
) {
    let (mut left, mut right) = (f32::INFINITY, f32::NEG_INFINITY);
    for column in &mut group.children {
        column.position_y = position_y;
        column.height = AutoOr::Length(height);
        match column.kind {
            BoxKind::Table(TableRole::Column { grid_x }) if grid_x < widths.len() => {
                column.position_x = positions[grid_x];
                column.width = AutoOr::Length(widths[grid_x]);
                left = left.min(positions[grid_x]);
                right = right.max(positions[grid_x] + widths[grid_x]);
            }
            _ => column.width = AutoOr::Length(0.0),
        }
    }
    group.position_y = position_y;
    group.height = AutoOr::Length(height);
    if left <= right {
        group.position_x = left;
        group.width = AutoOr::Length(right - left);
    } else {
        group.width = AutoOr::Length(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(min: &[f32], max: &[f32]) -> ColumnPreferences {
        let columns = min.len();
        ColumnPreferences {
            min: min.to_vec(),
            max: max.to_vec(),
            percentages: vec![0.0; columns],
            constrained: vec![false; columns],
            occupied: vec![true; columns],
            spacing: 0.0,
            table_min: min.iter().sum(),
            table_max: max.iter().sum(),
        }
    }

    #[test]
    fn test_distribute_grows_in_proportion() {
        let mut targets = [10.0, 10.0];
        distribute(&mut targets, &[1.0, 3.0], 60.0);
        assert_eq!(targets, [20.0, 40.0]);
    }

    #[test]
    fn test_distribute_never_shrinks() {
        let mut targets = [30.0, 30.0];
        distribute(&mut targets, &[1.0, 1.0], 20.0);
        assert_eq!(targets, [30.0, 30.0]);
    }

    #[test]
    fn test_auto_widths_interpolate_between_min_and_max() {
        let widths = auto_column_widths(&prefs(&[10.0, 10.0], &[30.0, 50.0]), 50.0);
        // Half way from (10, 10) to (30, 50).
        assert_eq!(widths.widths, vec![20.0, 30.0]);
        assert_eq!(widths.table_width, 50.0);
    }

    #[test]
    fn test_auto_widths_distribute_excess_over_max() {
        let widths = auto_column_widths(&prefs(&[10.0, 10.0], &[20.0, 60.0]), 160.0);
        assert_eq!(widths.widths, vec![40.0, 120.0]);
    }

    #[test]
    fn test_auto_widths_never_go_below_minimum() {
        let widths = auto_column_widths(&prefs(&[40.0, 40.0], &[50.0, 50.0]), 50.0);
        assert_eq!(widths.widths, vec![40.0, 40.0]);
        assert_eq!(widths.table_width, 80.0);
    }

    #[test]
    fn test_hidden_border_wins_conflicts() {
        let hidden = Border {
            style: BorderStyle::Hidden,
            ..Border::default()
        };
        let thick = Border {
            width: 10.0,
            style: BorderStyle::Solid,
            ..Border::default()
        };
        assert!(beats((hidden, Origin::Table), (thick, Origin::Cell)));
        assert!(!beats((thick, Origin::Cell), (hidden, Origin::Table)));
    }

    #[test]
    fn test_wider_then_stronger_style_then_origin() {
        let solid = |width| Border {
            width,
            style: BorderStyle::Solid,
            ..Border::default()
        };
        let dashed = Border {
            width: 2.0,
            style: BorderStyle::Dashed,
            ..Border::default()
        };
        let (thick, thin) = (solid(3.0), solid(2.0));
        assert!(beats((thick, Origin::Table), (thin, Origin::Cell)));
        assert!(beats((thin, Origin::Table), (dashed, Origin::Cell)));
        assert!(beats((thin, Origin::Cell), (thin, Origin::Row)));
        assert!(!beats((thin, Origin::Row), (thin, Origin::Row)));
    }

    #[test]
    fn test_collapsed_cell_edges_take_half_the_widest_segment() {
        let solid = |width| Border {
            width,
            style: BorderStyle::Solid,
            ..Border::default()
        };
        let borders = CollapsedBorders {
            horizontal: vec![vec![solid(2.0), solid(4.0)], vec![solid(6.0), solid(2.0)]],
            vertical: vec![vec![solid(8.0)], vec![solid(2.0)], vec![solid(0.0)]],
        };
        let edges = borders.cell_edges(0, 0, 2, 1);
        assert_eq!(edges.top, 2.0);
        assert_eq!(edges.bottom, 3.0);
        assert_eq!(edges.left, 4.0);
        assert_eq!(edges.right, 0.0);
        let table = borders.table_edges();
        assert_eq!(table.left, 4.0);
        assert_eq!(table.top, 2.0);
    }
}
