//! The strobe/EQ sweep.
//!
//! Every EQ row is selected once, then every strobe column of that row is
//! programmed, settled and sampled `lock_run_count` times. The whole run is
//! sequential: the device needs the dwell time after each register change
//! and the lock time between status reads.

use tracing::{debug, info};

use crate::device::Deserializer;
use crate::error::{BusError, ConfigError, SweepError};
use crate::grid::{lock_ratio, LockGrid};
use crate::mapper::{map_eq, map_strobe, EqFields, StrobeFields, StrobeStep};
use crate::range::{PositionRange, SweepConfig};
use crate::registers::{LockSample, RegisterBus, SampleOutcome};

/// Receives results while the sweep is running.
pub trait SweepObserver {
    fn row_started(&mut self, _eq: usize) {}

    fn cell_measured(&mut self, _eq: usize, _strobe: usize, _ratio: f64) {}

    fn row_finished(&mut self, _eq: usize) {}
}

impl SweepObserver for () {}

/// Everything needed to run one sweep, fixed before the first register write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPlan {
    pub strobe_range: PositionRange,
    pub eq_range: PositionRange,
    pub config: SweepConfig,
    pub strobe: StrobeFields,
    pub eq: EqFields,
}

impl SweepPlan {
    pub fn new(
        strobe_range: PositionRange,
        eq_range: PositionRange,
        config: SweepConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            strobe_range,
            eq_range,
            config,
            strobe: map_strobe(strobe_range, config.clock_base_delay, config.data_base_delay),
            eq: map_eq(eq_range),
        })
    }

    pub fn estimated_seconds(&self) -> f64 {
        self.config
            .estimated_seconds(self.strobe_range, self.eq_range)
    }
}

/// Counts of one cell's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellTally {
    pub locked: u32,
    pub discarded: u32,
}

/// Programs one strobe setting and samples the lock status.
pub fn measure_cell<B: RegisterBus>(
    device: &mut Deserializer<B>,
    config: &SweepConfig,
    step: StrobeStep,
) -> Result<CellTally, BusError> {
    let lock_interval = config.lock_interval();

    device.set_strobe(step.clock, step.data)?;
    device.soft_reset()?;
    device.delay(config.dwell());

    // drop flags latched while the link was settling
    device.read_status1()?;
    device.read_status2()?;

    let mut tally = CellTally::default();
    for _ in 0..config.lock_run_count {
        let status1 = device.read_status1()?;
        device.delay(lock_interval);
        let status2 = device.read_status2()?;
        device.delay(lock_interval);

        match (LockSample { status1, status2 }).classify() {
            SampleOutcome::Locked => tally.locked += 1,
            SampleOutcome::Unlocked => {}
            SampleOutcome::Error => {
                tally.discarded += 1;
                device.clear_parity_errors()?;
            }
        }
        device.delay(lock_interval);
    }
    Ok(tally)
}

/// Runs the full sweep and returns the 15 × 15 lock grid.
///
/// A bus failure aborts the sweep; no partial grid is returned.
pub fn run_sweep<B, O>(
    device: &mut Deserializer<B>,
    plan: &SweepPlan,
    observer: &mut O,
) -> Result<LockGrid, SweepError>
where
    B: RegisterBus,
    O: SweepObserver + ?Sized,
{
    let mut grid = LockGrid::new();
    let columns = plan.strobe.columns();
    let rows = plan.eq.rows();
    info!(
        "sweeping {} EQ rows x {} strobe columns",
        rows.len(),
        columns.len()
    );

    for row in rows {
        let eq = row.position;
        device
            .set_eq_selectors(row.selector1, row.selector2)
            .map_err(|source| SweepError::EqSelect { eq, source })?;
        observer.row_started(eq);

        for &step in &columns {
            let tally = measure_cell(device, &plan.config, step).map_err(|source| {
                SweepError::Cell {
                    eq,
                    strobe: step.position,
                    source,
                }
            })?;
            let ratio = lock_ratio(tally.locked, plan.config.lock_run_count);
            debug!(
                "eq {:2} strobe {:2} (clk {:2}, data {:2}): {}/{} locked, {} discarded -> {:.2}",
                eq,
                step.position,
                step.clock,
                step.data,
                tally.locked,
                plan.config.lock_run_count,
                tally.discarded,
                ratio
            );
            grid.set(eq, step.position, ratio);
            observer.cell_measured(eq, step.position, ratio);
        }

        observer.row_finished(eq);
        info!("EQ row {} done", eq);
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays a fixed sequence of status reads and records every access.
    #[derive(Default)]
    struct ScriptedBus {
        status: VecDeque<u8>,
        default_status: u8,
        log: Vec<Access>,
        fail_on_write: Option<u8>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Access {
        Read(u8),
        Write(u8, u8),
        Delay(Duration),
    }

    impl RegisterBus for ScriptedBus {
        fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
            self.log.push(Access::Read(register));
            match register {
                REG_RX_PORT_STS1 | REG_RX_PORT_STS2 => {
                    Ok(self.status.pop_front().unwrap_or(self.default_status))
                }
                _ => Ok(0),
            }
        }

        fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError> {
            if self.fail_on_write == Some(register) {
                return Err(BusError::Transfer {
                    register,
                    reason: "NACK".into(),
                });
            }
            self.log.push(Access::Write(register, value));
            Ok(())
        }

        fn delay(&mut self, duration: Duration) {
            self.log.push(Access::Delay(duration));
        }
    }

    fn config(runs: u32) -> SweepConfig {
        SweepConfig {
            dwell_time: 0.5,
            lock_run_count: runs,
            lock_time: 0.1,
            ..Default::default()
        }
    }

    fn range(begin: u8, end: u8) -> PositionRange {
        PositionRange::new(begin, end).unwrap()
    }

    #[test]
    fn cell_access_sequence() {
        let mut device = Deserializer::new(ScriptedBus {
            default_status: 0x01,
            ..Default::default()
        });
        let step = StrobeStep {
            position: 0,
            clock: 7,
            data: 0,
        };
        let tally = measure_cell(&mut device, &config(1), step).unwrap();
        assert_eq!(tally, CellTally { locked: 1, discarded: 0 });

        let lock = Duration::from_secs_f64(0.1);
        assert_eq!(
            device.into_inner().log,
            vec![
                Access::Write(REG_IND_ACC_DATA, 0x07),
                Access::Write(REG_RESET, RESET_DIGITAL),
                Access::Delay(Duration::from_secs_f64(0.5)),
                Access::Read(REG_RX_PORT_STS1),
                Access::Read(REG_RX_PORT_STS2),
                Access::Read(REG_RX_PORT_STS1),
                Access::Delay(lock),
                Access::Read(REG_RX_PORT_STS2),
                Access::Delay(lock),
                Access::Delay(lock),
            ]
        );
    }

    #[test]
    fn error_samples_clear_parity_and_are_not_counted() {
        // two clearing reads, then (sts1, sts2) pairs
        let status = [0, 0, 0x01, 0x00, 0x05, 0x00, 0x01, 0x20, 0x00, 0x00];
        let mut device = Deserializer::new(ScriptedBus {
            status: status.into_iter().collect(),
            ..Default::default()
        });
        let step = StrobeStep {
            position: 8,
            clock: 0,
            data: 1,
        };
        let tally = measure_cell(&mut device, &config(4), step).unwrap();
        assert_eq!(tally, CellTally { locked: 1, discarded: 2 });

        let parity_reads = device
            .into_inner()
            .log
            .iter()
            .filter(|a| **a == Access::Read(REG_RX_PAR_ERR_LO))
            .count();
        assert_eq!(parity_reads, 2);
    }

    #[test]
    fn full_sweep_fills_grid_and_eq_register() {
        let plan = SweepPlan::new(PositionRange::FULL, PositionRange::FULL, config(1)).unwrap();
        let mut device = Deserializer::new(ScriptedBus {
            default_status: 0x01,
            ..Default::default()
        });
        let grid = run_sweep(&mut device, &plan, &mut ()).unwrap();
        assert!(grid.rows().all(|row| row.iter().all(|&r| r == 1.0)));

        let eq_writes: Vec<u8> = device
            .into_inner()
            .log
            .iter()
            .filter_map(|a| match a {
                Access::Write(REG_ADAPTIVE_EQ_BYPASS, v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(
            eq_writes,
            vec![1, 33, 65, 97, 129, 161, 193, 225, 227, 229, 231, 233, 235, 237, 239]
        );
    }

    #[test]
    fn partial_ranges_leave_zeros_outside() {
        let plan = SweepPlan::new(range(5, 9), range(6, 8), config(2)).unwrap();
        let mut device = Deserializer::new(ScriptedBus {
            default_status: 0x01,
            ..Default::default()
        });
        let grid = run_sweep(&mut device, &plan, &mut ()).unwrap();
        for eq in 0..15 {
            for strobe in 0..15 {
                let inside = (6..=8).contains(&eq) && (5..=9).contains(&strobe);
                assert_eq!(grid.get(eq, strobe), if inside { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn identical_reads_give_identical_grids() {
        let plan = SweepPlan::new(range(0, 14), range(3, 10), config(3)).unwrap();
        let script: Vec<u8> = (0..4000u32).map(|i| [0x01, 0x00, 0x04, 0x01][(i % 4) as usize]).collect();

        let run = || {
            let mut device = Deserializer::new(ScriptedBus {
                status: script.iter().copied().collect(),
                ..Default::default()
            });
            run_sweep(&mut device, &plan, &mut ()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn observer_sees_rows_in_order() {
        #[derive(Default)]
        struct Recorder {
            rows: Vec<usize>,
            cells: usize,
        }
        impl SweepObserver for Recorder {
            fn row_started(&mut self, eq: usize) {
                self.rows.push(eq);
            }
            fn cell_measured(&mut self, _eq: usize, _strobe: usize, _ratio: f64) {
                self.cells += 1;
            }
        }

        let plan = SweepPlan::new(range(6, 9), range(5, 10), config(1)).unwrap();
        let mut device = Deserializer::new(ScriptedBus::default());
        let mut recorder = Recorder::default();
        run_sweep(&mut device, &plan, &mut recorder).unwrap();
        assert_eq!(recorder.rows, vec![5, 6, 7, 8, 9, 10]);
        assert_eq!(recorder.cells, 24);
    }

    #[test]
    fn transport_failure_aborts_sweep() {
        let plan = SweepPlan::new(PositionRange::FULL, PositionRange::FULL, config(1)).unwrap();
        let mut device = Deserializer::new(ScriptedBus {
            fail_on_write: Some(REG_IND_ACC_DATA),
            ..Default::default()
        });
        let err = run_sweep(&mut device, &plan, &mut ()).unwrap_err();
        assert!(matches!(err, SweepError::Cell { eq: 0, strobe: 0, .. }));
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn discarded_samples_are_not_logged_at_warn() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_writer(move || writer.clone())
            .finish();

        // locked but with a parity error on every read
        let plan = SweepPlan::new(range(0, 3), range(0, 1), config(2)).unwrap();
        let mut device = Deserializer::new(ScriptedBus {
            default_status: 0x05,
            ..Default::default()
        });
        let grid = tracing::subscriber::with_default(subscriber, || {
            run_sweep(&mut device, &plan, &mut ()).unwrap()
        });

        assert!(grid.rows().all(|row| row.iter().all(|&r| r == 0.0)));
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_lock_runs_rejected_before_sweep() {
        let err = SweepPlan::new(PositionRange::FULL, PositionRange::FULL, config(0)).unwrap_err();
        assert_eq!(err, ConfigError::ZeroLockRuns);
    }
}
