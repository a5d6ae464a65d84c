//! Headless driver: load a dataset, fit a viewport and report the chosen
//! level of detail.
//!
//! Usage: charter <data-file> [--resolution R] [--label L] [--symbol S]
//!                [--from T --to T] [--watch MINUTES] [--save PATH]

use std::env;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use charter::{Chart, ChartDescriptor, ChartEvent, ChartSettings, PlotArea, SourceRef};
use charter_config::Config;
use charter_core::{Bounds, Resolution};
use charter_data::csv::parse_datetime;

const EVENT_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct Args {
    data_file: String,
    resolution: Option<String>,
    label: Option<String>,
    symbol: Option<String>,
    from: Option<String>,
    to: Option<String>,
    watch_minutes: Option<u64>,
    save: Option<String>,
}

fn usage(program: &str) {
    eprintln!("Usage: {} <data-file> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --resolution R   Native resolution of the data (default from config)");
    eprintln!("  --label L        Chart label (default from config)");
    eprintln!("  --symbol S       Exchange symbol, enables --watch for .json data");
    eprintln!("  --from T --to T  Viewport as epoch seconds or date-time");
    eprintln!("  --watch MINUTES  Poll Binance for new candles for this long");
    eprintln!("  --save PATH      Write the chart descriptor as JSON");
    eprintln!();
    eprintln!(
        "Example: {} btc_1m.json --symbol BTCUSDT --from 2024-01-01 --to 2024-02-01",
        program
    );
}

fn parse_args() -> Option<Args> {
    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("charter");
    let Some(data_file) = argv.get(1).filter(|a| !a.starts_with("--")) else {
        usage(program);
        return None;
    };

    let mut args = Args {
        data_file: data_file.clone(),
        ..Args::default()
    };
    let mut i = 2;
    while i < argv.len() {
        let value = argv.get(i + 1).cloned();
        match (argv[i].as_str(), value) {
            ("--resolution", Some(v)) => args.resolution = Some(v),
            ("--label", Some(v)) => args.label = Some(v),
            ("--symbol", Some(v)) => args.symbol = Some(v),
            ("--from", Some(v)) => args.from = Some(v),
            ("--to", Some(v)) => args.to = Some(v),
            ("--watch", Some(v)) => args.watch_minutes = v.parse().ok(),
            ("--save", Some(v)) => args.save = Some(v),
            (other, _) => {
                eprintln!("Unknown or incomplete option: {}", other);
                usage(program);
                return None;
            }
        }
        i += 2;
    }
    Some(args)
}

fn parse_time(flag: &str, value: &str) -> Result<i64> {
    parse_datetime(value).with_context(|| format!("{} {}: not a timestamp or date", flag, value))
}

fn print_state(chart: &Chart) {
    let state = chart.state();
    let slice = chart.render_slice();
    println!(
        "{}: {} candles at {} (auto resample {})",
        chart.label(),
        slice.candles.len(),
        state.active_resolution(),
        if chart.auto_resample() { "on" } else { "off" }
    );
    if let (Some(first), Some(last)) = (slice.candles.first(), slice.candles.last()) {
        println!("  window {} .. {}", first.time, last.time);
    }
}

fn run() -> Result<()> {
    env_logger::init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let config = Config::try_load_default().context("loading configuration")?;
    let settings = ChartSettings::from_config(&config)?;

    let resolution: Resolution = args
        .resolution
        .as_deref()
        .unwrap_or(config.general.default_resolution.as_str())
        .parse()?;
    let label = args
        .label
        .clone()
        .unwrap_or_else(|| config.general.default_label.clone());
    let source = SourceRef::from_path(&args.data_file, args.symbol.clone());
    let descriptor = ChartDescriptor::new(label.as_str(), resolution, source);

    let chart = Chart::reconstruct(descriptor, &settings)
        .with_context(|| format!("building chart from {}", args.data_file))?;
    let absolute = chart.state().absolute_bounds();

    let mut area = PlotArea::new();
    area.add_chart(chart);

    let interval = match (&args.from, &args.to) {
        (None, None) => absolute,
        (from, to) => {
            let start = match from {
                Some(v) => parse_time("--from", v)?,
                None => absolute.start,
            };
            let end = match to {
                Some(v) => parse_time("--to", v)?,
                None => absolute.end,
            };
            if start >= end {
                bail!("empty viewport: {} >= {}", start, end);
            }
            Bounds::new(start, end)
        }
    };
    area.on_viewport_abrupt(interval)?;

    let chart = area.chart_mut(&label)?;
    print_state(chart);

    if let Some(path) = &args.save {
        let json = chart.describe().to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path))?;
        println!("Saved descriptor to {}", path);
    }

    if let Some(minutes) = args.watch_minutes {
        let runtime = tokio::runtime::Runtime::new()?;
        chart.start_binance_updates(runtime.handle(), &config.live)?;

        let deadline = Instant::now() + Duration::from_secs(minutes * 60);
        while Instant::now() < deadline {
            match chart.wait_event(EVENT_POLL) {
                Some(ChartEvent::Updated {
                    added,
                    replaced,
                    last_time,
                }) => {
                    println!("update: {} new, {} replaced, last {:?}", added, replaced, last_time);
                    print_state(chart);
                }
                Some(ChartEvent::UpdateFailed(e)) => eprintln!("update failed: {}", e),
                Some(event) => log::debug!("{:?}", event),
                None => {}
            }
        }
        chart.shutdown();
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
