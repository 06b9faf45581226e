use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use margin::device::Deserializer;
use margin::evaluate::evaluate;
use margin::grid::LockGrid;
use margin::input::{parse_yes_no, MarginSettings, Preset, Prompter};
use margin::range::PositionRange;
use margin::registers::RegisterBus;
use margin::render::{
    estimate_minutes, format_lock_table, show_lock_table, write_verdict, LiveMap,
};
use margin::report::{RunReport, DEFAULT_REPORT_PATH};
use margin::sim::SimulatedDevice;
use margin::sweep::{run_sweep, SweepPlan};
use ratatui::backend::CrosstermBackend;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Receive margin analysis for DS90UB954 FPD-Link III deserializers
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// I2C bus number of the deserializer (asked for when missing)
    #[arg(short, long)]
    bus: Option<u8>,

    /// Receive port the camera is connected to (0 or 1)
    #[arg(short, long)]
    port: Option<u8>,

    /// Run against the simulated deserializer instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Seed of the simulated deserializer
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Let the simulated deserializer take real time
    #[arg(long, requires = "simulate")]
    realtime: bool,

    /// Print the devices found on the bus and exit
    #[arg(long, conflicts_with = "simulate")]
    scan: bool,

    /// Full reset including registers before the test (y/n)
    #[arg(long, value_parser = flag_value)]
    digital_reset: Option<bool>,

    /// Colored status map (y/n)
    #[arg(long, value_parser = flag_value)]
    color: Option<bool>,

    /// Dwell time after each strobe change, in milliseconds
    #[arg(long)]
    dwell_ms: Option<f64>,

    /// Status samples per grid cell
    #[arg(long)]
    lock_runs: Option<u32>,

    /// Time between status reads, in milliseconds
    #[arg(long)]
    lock_ms: Option<f64>,

    /// Strobe positions to sweep, as BEGIN-END
    #[arg(long, value_parser = range_value)]
    strobe: Option<PositionRange>,

    /// EQ positions to sweep, as BEGIN-END
    #[arg(long, value_parser = range_value)]
    eq: Option<PositionRange>,

    /// Use the +8 clock delay bank (y/n)
    #[arg(long, value_parser = flag_value)]
    clock_base_delay: Option<bool>,

    /// Use the +8 data delay bank (y/n)
    #[arg(long, value_parser = flag_value)]
    data_base_delay: Option<bool>,

    /// Lock result file
    #[arg(short, long, default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    /// Use defaults for everything not given on the command line
    #[arg(long)]
    defaults: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn preset(&self) -> Preset {
        Preset {
            colored: self.color,
            digital_reset: self.digital_reset,
            dwell_ms: self.dwell_ms,
            lock_runs: self.lock_runs,
            lock_ms: self.lock_ms,
            strobe_range: self.strobe,
            eq_range: self.eq,
            clock_base_delay: self.clock_base_delay,
            data_base_delay: self.data_base_delay,
        }
    }
}

fn flag_value(value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => parse_yes_no(value).ok_or_else(|| format!("expected yes or no, got '{}'", value)),
    }
}

fn range_value(value: &str) -> Result<PositionRange, String> {
    let (begin, end) = value
        .split_once('-')
        .ok_or_else(|| format!("expected BEGIN-END, got '{}'", value))?;
    let begin = begin.trim().parse::<u8>().map_err(|e| e.to_string())?;
    let end = end.trim().parse::<u8>().map_err(|e| e.to_string())?;
    PositionRange::new(begin, end).map_err(|e| e.to_string())
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

// The main entry point for the command-line margin analysis.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stdout belongs to the map.
    tracing_subscriber::fmt()
        .with_env_filter(log_level(cli.verbose))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let started = Local::now().naive_local();
    println!("###########################################################");
    println!("##################### MARGIN ANALYSIS #####################");
    println!("###########################################################");
    println!("date: {}", started.format("%d.%m.%Y"));
    println!("time: {}", started.format("%H:%M:%S"));
    println!();

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

    if cli.simulate {
        info!("using simulated deserializer, seed {}", cli.seed);
        let sim = SimulatedDevice::new(cli.seed).realtime(cli.realtime);
        let mut device = Deserializer::new(sim);
        device.identify().context("simulated device failed its identity check")?;
        return run_session(&cli, &mut prompter, device, started);
    }

    run_hardware(&cli, &mut prompter, started)
}

// Finds the bus carrying the deserializer, asking until one answers.
#[cfg(target_os = "linux")]
fn run_hardware<R: BufRead, W: Write>(
    cli: &Cli,
    prompter: &mut Prompter<R, W>,
    started: NaiveDateTime,
) -> Result<()> {
    use margin::i2c::{available_buses, format_scan_table, open_bus, scan, I2cRegisters};
    use margin::registers::DEVICE_ADDRESS;

    loop {
        let bus = match cli.bus {
            Some(bus) => bus,
            None => {
                let buses: Vec<String> = available_buses().iter().map(u8::to_string).collect();
                if !buses.is_empty() {
                    prompter.say(&format!("Available I2C buses: {}", buses.join(", ")))?;
                }
                let answer = prompter.ask("Which I2C bus is the deserializer connected to?")?;
                match answer.parse::<u8>() {
                    Ok(bus) => bus,
                    Err(_) => {
                        prompter.say("\tIncorrect input, please insert an integer value!")?;
                        continue;
                    }
                }
            }
        };

        let i2c = match open_bus(bus) {
            Ok(i2c) => i2c,
            Err(err) if cli.bus.is_none() => {
                prompter.say(&format!("\t{}, please try again!", err))?;
                continue;
            }
            Err(err) => return Err(err).context("cannot open the I2C bus"),
        };

        if cli.scan {
            let mut i2c = i2c;
            print!("{}", format_scan_table(&scan(&mut i2c)));
            return Ok(());
        }

        let mut device = Deserializer::new(I2cRegisters::new(i2c, DEVICE_ADDRESS));
        match device.identify() {
            Ok(()) => {
                prompter.say("\tBUS-check: OK")?;
                return run_session(cli, prompter, device, started);
            }
            Err(err) if cli.bus.is_none() => {
                prompter.say(&format!("\t{}, please try again!", err))?;
            }
            Err(err) => return Err(err).context(format!("no deserializer on I2C bus {}", bus)),
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn run_hardware<R: BufRead, W: Write>(
    _cli: &Cli,
    _prompter: &mut Prompter<R, W>,
    _started: NaiveDateTime,
) -> Result<()> {
    anyhow::bail!("I2C access needs the Linux i2c-dev interface, try --simulate")
}

// With --defaults nothing is asked; a missing port means port 0.
fn session_settings<R: BufRead, W: Write>(
    cli: &Cli,
    prompter: &mut Prompter<R, W>,
) -> Result<(u8, MarginSettings)> {
    let port = match cli.port {
        Some(port) => port,
        None if cli.defaults => 0,
        None => prompter.port()?,
    };
    prompter.say(&format!("\tTesting on port {}", port))?;

    let preset = cli.preset();
    let settings = if cli.defaults {
        preset.with_defaults()?
    } else {
        preset.resolve(prompter)?
    };
    Ok((port, settings))
}

// Runs the sweep with the live map on `out`. The device is restored when
// either the sweep or the map fails.
fn sweep_with_map<B: RegisterBus, W: Write>(
    device: &mut Deserializer<B>,
    plan: &SweepPlan,
    out: W,
    colored: bool,
) -> Result<LockGrid> {
    let mut map = LiveMap::new(out, colored, plan.strobe_range, plan.eq_range);
    map.begin();
    let outcome = run_sweep(device, plan, &mut map)
        .context("margin sweep aborted")
        .and_then(|grid| {
            map.finish().context("failed to print the status map")?;
            Ok(grid)
        });
    if outcome.is_err() {
        if let Err(restore_err) = device.restore() {
            warn!("could not restore the deserializer: {}", restore_err);
        }
    }
    outcome
}

// Collects the parameters, sweeps, and reports.
fn run_session<B: RegisterBus, R: BufRead, W: Write>(
    cli: &Cli,
    prompter: &mut Prompter<R, W>,
    mut device: Deserializer<B>,
    started: NaiveDateTime,
) -> Result<()> {
    let (port, settings) = session_settings(cli, prompter)?;
    let plan = settings.plan()?;

    device
        .prepare(port, settings.digital_reset)
        .context("failed to prepare the deserializer")?;

    println!(
        "\nREMAINING TIME: The test will take about {} minute(s)",
        estimate_minutes(plan.estimated_seconds())
    );

    let grid = sweep_with_map(&mut device, &plan, io::stdout().lock(), settings.colored)?;
    let evaluation = evaluate(&grid);

    let mut stdout = io::stdout();
    if stdout.is_terminal() {
        show_lock_table(CrosstermBackend::new(io::stdout()), &grid, settings.colored)?;
        println!();
    } else {
        print!("{}", format_lock_table(&grid));
    }
    writeln!(stdout)?;
    write_verdict(&mut stdout, &evaluation, settings.colored)?;

    device
        .restore()
        .context("failed to restore the deserializer")?;

    RunReport {
        timestamp: started,
        settings: &settings,
        grid: &grid,
        evaluation: &evaluation,
    }
    .save(&cli.output)
    .with_context(|| format!("failed to write {}", cli.output.display()))?;
    println!("\nLock result saved to {}", cli.output.display());
    Ok(())
}
