//! Classification of a finished lock grid into a cable recommendation.

use crate::grid::LockGrid;
use crate::range::POSITIONS;

/// Consecutive fully locked cells that make a run.
pub const RUN_LENGTH: usize = 4;
/// Rows with a horizontal run needed for enough EQ margin.
pub const MIN_SUFFICIENT_ROWS: usize = 3;
/// Vertical runs needed for a usable rectangle.
pub const MIN_RECTANGLES: usize = 1;

/// The recommendation derived from a lock grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub sufficient_eq_lines: bool,
    pub rectangle_available: bool,
    pub cable_suitable: bool,
}

/// Structural metrics of a lock grid and the verdict they imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// EQ rows holding at least [`RUN_LENGTH`] consecutive full locks.
    pub sufficient_row_count: usize,
    /// Vertical full-lock runs reaching [`RUN_LENGTH`] rows, one per run.
    pub rectangle_count: usize,
    pub verdict: Verdict,
}

fn is_full_lock(ratio: f64) -> bool {
    ratio == 1.0
}

/// Scans the grid row by row for horizontal and vertical full-lock runs.
pub fn evaluate(grid: &LockGrid) -> Evaluation {
    let mut sufficient_row_count = 0;
    let mut rectangle_count = 0;
    let mut column_runs = [0usize; POSITIONS];

    for row in grid.rows() {
        let mut run = 0;
        let mut has_run = false;

        for (strobe, &ratio) in row.iter().enumerate() {
            if is_full_lock(ratio) {
                run += 1;
                if run == RUN_LENGTH {
                    has_run = true;
                }
                // a full lock continues the column run only below another one
                column_runs[strobe] += 1;
                if column_runs[strobe] == RUN_LENGTH {
                    rectangle_count += 1;
                }
            } else {
                run = 0;
                column_runs[strobe] = 0;
            }
        }

        if has_run {
            sufficient_row_count += 1;
        }
    }

    let sufficient_eq_lines = sufficient_row_count >= MIN_SUFFICIENT_ROWS;
    let rectangle_available = rectangle_count >= MIN_RECTANGLES;
    Evaluation {
        sufficient_row_count,
        rectangle_count,
        verdict: Verdict {
            sufficient_eq_lines,
            rectangle_available,
            cable_suitable: sufficient_eq_lines && rectangle_available,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(usize, usize)]) -> LockGrid {
        let mut grid = LockGrid::new();
        for &(eq, strobe) in cells {
            grid.set(eq, strobe, 1.0);
        }
        grid
    }

    fn block(eq: usize, strobe: usize, height: usize, width: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for r in eq..eq + height {
            for c in strobe..strobe + width {
                cells.push((r, c));
            }
        }
        cells
    }

    #[test]
    fn empty_grid_is_not_suitable() {
        let eval = evaluate(&LockGrid::new());
        assert_eq!(eval.sufficient_row_count, 0);
        assert_eq!(eval.rectangle_count, 0);
        assert!(!eval.verdict.cable_suitable);
    }

    #[test]
    fn staggered_rows_give_lines_but_no_rectangle() {
        let mut cells = block(2, 0, 1, 4);
        cells.extend(block(6, 5, 1, 4));
        cells.extend(block(10, 10, 1, 4));
        let eval = evaluate(&grid_with(&cells));

        assert_eq!(eval.sufficient_row_count, 3);
        assert_eq!(eval.rectangle_count, 0);
        assert!(eval.verdict.sufficient_eq_lines);
        assert!(!eval.verdict.rectangle_available);
        assert!(!eval.verdict.cable_suitable);
    }

    #[test]
    fn four_by_four_block_is_suitable() {
        let eval = evaluate(&grid_with(&block(5, 6, 4, 4)));
        assert_eq!(eval.sufficient_row_count, 4);
        assert!(eval.rectangle_count >= 1);
        assert_eq!(
            eval.verdict,
            Verdict {
                sufficient_eq_lines: true,
                rectangle_available: true,
                cable_suitable: true
            }
        );
    }

    #[test]
    fn long_runs_count_once_per_row_and_column() {
        let eval = evaluate(&grid_with(&block(0, 0, 15, 15)));
        assert_eq!(eval.sufficient_row_count, 15);
        assert_eq!(eval.rectangle_count, 15);
    }

    #[test]
    fn three_wide_runs_do_not_qualify() {
        let eval = evaluate(&grid_with(&block(0, 0, 15, 3)));
        assert_eq!(eval.sufficient_row_count, 0);
        assert_eq!(eval.rectangle_count, 3);
        assert!(!eval.verdict.cable_suitable);
    }

    #[test]
    fn interrupted_row_run_restarts() {
        let mut cells = block(4, 0, 1, 3);
        cells.extend(block(4, 4, 1, 3));
        let eval = evaluate(&grid_with(&cells));
        assert_eq!(eval.sufficient_row_count, 0);
    }

    #[test]
    fn row_run_does_not_carry_over_row_end() {
        // last two cells of row 3 and first two of row 4
        let eval = evaluate(&grid_with(&[(3, 13), (3, 14), (4, 0), (4, 1)]));
        assert_eq!(eval.sufficient_row_count, 0);
    }

    #[test]
    fn partial_lock_breaks_runs() {
        let mut grid = grid_with(&block(0, 0, 4, 4));
        grid.set(2, 2, 0.99);
        let eval = evaluate(&grid);
        assert_eq!(eval.sufficient_row_count, 3);
        assert_eq!(eval.rectangle_count, 3);
    }

    #[test]
    fn vertical_run_restarts_after_gap() {
        let mut cells = block(0, 7, 3, 1);
        cells.extend(block(4, 7, 3, 1));
        let eval = evaluate(&grid_with(&cells));
        assert_eq!(eval.rectangle_count, 0);
    }
}
