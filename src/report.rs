//! The comma separated lock result file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::info;

use crate::evaluate::Evaluation;
use crate::grid::LockGrid;
use crate::input::MarginSettings;
use crate::range::POSITIONS;

/// Where the report goes unless told otherwise.
pub const DEFAULT_REPORT_PATH: &str = "./ma_lock_result.txt";

/// One finished run, ready to be written out.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub timestamp: NaiveDateTime,
    pub settings: &'a MarginSettings,
    pub grid: &'a LockGrid,
    pub evaluation: &'a Evaluation,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

impl RunReport<'_> {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "date: {}", self.timestamp.format("%d.%m.%Y"))?;
        writeln!(out, "time: {}", self.timestamp.format("%H:%M:%S"))?;
        writeln!(out, ",,,,,,,,LOCK-RESULT,,,,,,,,")?;
        writeln!(out, ",,,,,,,,SP,,,,,,,,")?;

        write!(out, "EQ")?;
        for strobe in 0..POSITIONS {
            write!(out, ",{}", strobe)?;
        }
        writeln!(out)?;

        for (eq, row) in self.grid.rows().enumerate() {
            write!(out, "{:>2},", eq)?;
            for ratio in row {
                write!(out, "{:.1},", ratio)?;
            }
            writeln!(out)?;
        }

        let verdict = self.evaluation.verdict;
        writeln!(out, "sufficient EQ lines:,{},", verdict.sufficient_eq_lines)?;
        writeln!(out, "rectangle available:,{},", verdict.rectangle_available)?;
        writeln!(
            out,
            "Coax-cable suitable:,{},",
            if verdict.cable_suitable { "TRUE" } else { "FALSE" }
        )?;

        let settings = self.settings;
        let config = &settings.config;
        let minutes = config.estimated_seconds(settings.strobe_range, settings.eq_range) / 60.0;
        writeln!(out)?;
        writeln!(out, "Parameter")?;
        writeln!(out, "Digital Reset:,{},", yes_no(settings.digital_reset))?;
        writeln!(out, "dwell time:,{},s,", config.dwell_time)?;
        writeln!(out, "lock runs:,{},times,", config.lock_run_count)?;
        writeln!(out, "lock time:,{},s,", config.lock_time)?;
        writeln!(out, "Strobe Position Begin:,{},", settings.strobe_range.begin())?;
        writeln!(out, "Strobe Position End:,{},", settings.strobe_range.end())?;
        writeln!(out, "EQ Position Begin:,{},", settings.eq_range.begin())?;
        writeln!(out, "EQ Position End:,{},", settings.eq_range.end())?;
        writeln!(out, "Clock Base Delay:,{},", yes_no(config.clock_base_delay))?;
        writeln!(out, "Data Base Delay:,{},", yes_no(config.data_base_delay))?;
        writeln!(out, "Remaining Time:,{:.1},minute(s),", minutes)?;
        Ok(())
    }

    /// Writes the report to `path`, replacing any previous file.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        info!("lock result written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate;
    use crate::range::PositionRange;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap()
    }

    fn render(settings: &MarginSettings, grid: &LockGrid) -> String {
        let evaluation = evaluate(grid);
        let report = RunReport {
            timestamp: timestamp(),
            settings,
            grid,
            evaluation: &evaluation,
        };
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_and_rows() {
        let mut grid = LockGrid::new();
        grid.set(0, 3, 0.67);
        grid.set(12, 14, 1.0);
        let text = render(&MarginSettings::default(), &grid);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date: 16.10.2026");
        assert_eq!(lines[1], "time: 09:05:03");
        assert_eq!(lines[2], ",,,,,,,,LOCK-RESULT,,,,,,,,");
        assert_eq!(lines[3], ",,,,,,,,SP,,,,,,,,");
        assert_eq!(lines[4], "EQ,0,1,2,3,4,5,6,7,8,9,10,11,12,13,14");
        assert_eq!(
            lines[5],
            " 0,0.0,0.0,0.0,0.7,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,"
        );
        assert!(lines[17].starts_with("12,"));
        assert!(lines[17].ends_with(",1.0,"));
        assert!(lines[19].starts_with("14,"));
    }

    #[test]
    fn verdict_lines_follow_rows() {
        let mut grid = LockGrid::new();
        for eq in 4..8 {
            for strobe in 5..9 {
                grid.set(eq, strobe, 1.0);
            }
        }
        let text = render(&MarginSettings::default(), &grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[20], "sufficient EQ lines:,true,");
        assert_eq!(lines[21], "rectangle available:,true,");
        assert_eq!(lines[22], "Coax-cable suitable:,TRUE,");
        assert_eq!(lines[23], "");
        assert_eq!(lines[24], "Parameter");
    }

    #[test]
    fn parameter_block() {
        let mut settings = MarginSettings {
            digital_reset: true,
            strobe_range: PositionRange::new(2, 11).unwrap(),
            eq_range: PositionRange::new(0, 5).unwrap(),
            ..Default::default()
        };
        settings.config.data_base_delay = true;
        let text = render(&settings, &LockGrid::new());

        assert!(text.contains("Coax-cable suitable:,FALSE,\n"));
        assert!(text.contains("Digital Reset:,yes,\n"));
        assert!(text.contains("dwell time:,0.9,s,\n"));
        assert!(text.contains("lock runs:,10,times,\n"));
        assert!(text.contains("lock time:,0.1,s,\n"));
        assert!(text.contains("Strobe Position Begin:,2,\nStrobe Position End:,11,\n"));
        assert!(text.contains("EQ Position Begin:,0,\nEQ Position End:,5,\n"));
        assert!(text.contains("Clock Base Delay:,no,\nData Base Delay:,yes,\n"));
        // 60 cells * 3.9 s
        assert!(text.ends_with("Remaining Time:,3.9,minute(s),\n"));
    }

    #[test]
    fn save_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock.txt");
        let grid = LockGrid::new();
        let evaluation = evaluate(&grid);
        let settings = MarginSettings::default();
        RunReport {
            timestamp: timestamp(),
            settings: &settings,
            grid: &grid,
            evaluation: &evaluation,
        }
        .save(&path)
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date: 16.10.2026\n"));
    }
}
