//! # Terminal output
//!
//! The live status map drawn while the sweep runs, the final lock table and
//! the verdict banner.
//!
//! The live map goes straight to any [`Write`] with `crossterm` styling, one
//! symbol per cell as soon as it is measured. The final table is a `ratatui`
//! widget, drawn into an inline viewport below the map.

use std::io::{self, Write};

use crossterm::style::Stylize;
use ratatui::backend::Backend;
use ratatui::layout::Constraint;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Cell, Row, Table};
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::evaluate::{Evaluation, MIN_RECTANGLES, MIN_SUFFICIENT_ROWS, RUN_LENGTH};
use crate::grid::{display_ratio, LockGrid};
use crate::range::{PositionRange, POSITIONS};
use crate::sweep::SweepObserver;

const RULE: &str = "###########################################################";

/// Lines taken by the lock table: title, header and one per EQ row.
pub const LOCK_TABLE_HEIGHT: u16 = POSITIONS as u16 + 2;

const LABEL_WIDTH: u16 = 6;
const CELL_WIDTH: u16 = 4;

/// Width of the lock table in columns.
pub const LOCK_TABLE_WIDTH: u16 = LABEL_WIDTH + CELL_WIDTH * POSITIONS as u16;

/// How a lock ratio is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Locked,
    Unlocked,
    Partial,
}

impl CellState {
    pub fn of(ratio: f64) -> Self {
        if ratio == 1.0 {
            CellState::Locked
        } else if ratio == 0.0 {
            CellState::Unlocked
        } else {
            CellState::Partial
        }
    }

    fn color(self) -> Color {
        match self {
            CellState::Locked => Color::Green,
            CellState::Unlocked => Color::Red,
            CellState::Partial => Color::Yellow,
        }
    }
}

/// Prints the status map while the sweep is running.
///
/// Observer callbacks cannot fail, so the first write error is kept and
/// handed back by [`LiveMap::finish`].
pub struct LiveMap<W: Write> {
    out: W,
    colored: bool,
    strobe_range: PositionRange,
    eq_range: PositionRange,
    error: Option<io::Error>,
}

impl<W: Write> LiveMap<W> {
    pub fn new(out: W, colored: bool, strobe_range: PositionRange, eq_range: PositionRange) -> Self {
        Self {
            out,
            colored,
            strobe_range,
            eq_range,
            error: None,
        }
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if self.error.is_none() {
            if let Err(err) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
                self.error = Some(err);
            }
        }
    }

    fn row_label(&mut self, eq: usize) {
        self.emit(format_args!("\n{:>5}  ", eq));
    }

    /// Prints the column header and the labels of rows above the swept range.
    pub fn begin(&mut self) {
        self.emit(format_args!(
            "\n################## MARGIN ANALYSIS STATUS #################\n"
        ));
        self.emit(format_args!(" EQ\\SP"));
        for strobe in 0..POSITIONS {
            self.emit(format_args!("{:>3}", strobe));
        }
        for eq in 0..self.eq_range.begin() as usize {
            self.row_label(eq);
        }
    }

    /// Prints the labels of rows below the swept range and returns the writer.
    pub fn finish(mut self) -> io::Result<W> {
        for eq in self.eq_range.end() as usize + 1..POSITIONS {
            self.row_label(eq);
        }
        self.emit(format_args!("\n\n"));
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }
}

impl<W: Write> SweepObserver for LiveMap<W> {
    fn row_started(&mut self, eq: usize) {
        self.row_label(eq);
        for _ in 0..self.strobe_range.begin() {
            self.emit(format_args!("   "));
        }
    }

    fn cell_measured(&mut self, _eq: usize, _strobe: usize, ratio: f64) {
        let state = CellState::of(ratio);
        if self.colored {
            let symbol = match state {
                CellState::Locked => "▇▇".green(),
                CellState::Unlocked => "▇▇".red(),
                CellState::Partial => "▇▇".yellow(),
            };
            self.emit(format_args!("{} ", symbol));
        } else {
            let symbol = match state {
                CellState::Locked => "██",
                CellState::Unlocked => "--",
                CellState::Partial => "▒▒",
            };
            self.emit(format_args!("{} ", symbol));
        }
    }
}

/// Whole minutes of an estimated run time, as announced before the sweep.
///
/// Halves round to the even minute.
pub fn estimate_minutes(seconds: f64) -> u64 {
    (seconds.trunc() / 60.0).round_ties_even() as u64
}

/// The final lock table, one row per EQ position, display rounded.
pub fn lock_table(grid: &LockGrid, colored: bool) -> Table<'static> {
    let header = Row::new(
        std::iter::once(Cell::from("EQ\\SP"))
            .chain((0..POSITIONS).map(|strobe| Cell::from(format!("{:>3}", strobe)))),
    );

    let rows = grid.rows().enumerate().map(|(eq, row)| {
        let cells = row.iter().map(|&ratio| {
            let cell = Cell::from(format!("{:>3.1}", display_ratio(ratio)));
            if colored {
                cell.style(Style::default().fg(CellState::of(ratio).color()))
            } else {
                cell
            }
        });
        Row::new(std::iter::once(Cell::from(format!("{:>4}", eq))).chain(cells))
    });

    let widths = std::iter::once(Constraint::Length(LABEL_WIDTH))
        .chain(std::iter::repeat(Constraint::Length(CELL_WIDTH)).take(POSITIONS));

    Table::new(rows, widths)
        .header(header)
        .column_spacing(0)
        .block(Block::default().title("Lock result:"))
}

/// Draws the lock table into `terminal`.
pub fn draw_lock_table<B: Backend>(
    terminal: &mut Terminal<B>,
    grid: &LockGrid,
    colored: bool,
) -> io::Result<()> {
    let table = lock_table(grid, colored);
    terminal.draw(|frame| {
        let area = frame.size();
        frame.render_widget(table, area);
    })?;
    Ok(())
}

/// Draws the lock table inline below the current cursor position.
pub fn show_lock_table<B: Backend>(backend: B, grid: &LockGrid, colored: bool) -> io::Result<()> {
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(LOCK_TABLE_HEIGHT),
        },
    )?;
    draw_lock_table(&mut terminal, grid, colored)
}

/// Plain text form of the lock table for output that is not a terminal.
pub fn format_lock_table(grid: &LockGrid) -> String {
    let mut text = String::from("Lock result:\n");
    for row in grid.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|&ratio| format!("{:.1}", display_ratio(ratio)))
            .collect();
        text.push_str(&cells.join(" "));
        text.push('\n');
    }
    text
}

/// Prints the evaluation counts and the recommendation banner.
pub fn write_verdict<W: Write>(out: &mut W, evaluation: &Evaluation, colored: bool) -> io::Result<()> {
    let verdict = evaluation.verdict;
    if verdict.sufficient_eq_lines {
        writeln!(
            out,
            "EQ-Result is at least {}  --> here: {}",
            MIN_SUFFICIENT_ROWS, evaluation.sufficient_row_count
        )?;
    } else {
        writeln!(out, "EQ-Result is NOT sufficient!")?;
        writeln!(out, "Fewer than {} EQ levels", MIN_SUFFICIENT_ROWS)?;
    }
    if verdict.rectangle_available {
        writeln!(
            out,
            "{}-high full-lock column available  --> here: {}",
            RUN_LENGTH, evaluation.rectangle_count
        )?;
    } else {
        writeln!(
            out,
            "NO {}-high full-lock column! (at least {} needed)",
            RUN_LENGTH, MIN_RECTANGLES
        )?;
    }

    writeln!(out, "\n{}", RULE)?;
    let (message, fill) = if verdict.cable_suitable {
        ("RECOMMENDED: Coax-cable is suitable!", "##########")
    } else {
        ("NOT RECOMMENDED: Coax-cable is NOT suitable!", "######")
    };
    if colored {
        let styled = if verdict.cable_suitable {
            message.green()
        } else {
            message.red()
        };
        writeln!(out, "{} {} {}", fill, styled, fill)?;
    } else {
        writeln!(out, "{} {} {}", fill, message, fill)?;
    }
    writeln!(out, "{}", RULE)?;
    Ok(())
}
