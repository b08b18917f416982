//! Extract surface flow summaries from a sequence of frames, or from a periodically refreshed
//! snapshot.

use clap::*;
use log::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use surflow::prelude::v1::{Result, *};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

/// Flat record written for every analysed pair or live cycle.
#[derive(Serialize)]
struct Row {
    index: usize,
    average_speed: f32,
    flow_magnitude: f32,
    dominant_direction: &'static str,
    moving_cells: usize,
}

impl Row {
    fn new(index: usize, summary: &FlowSummary) -> Self {
        Self {
            index,
            average_speed: summary.average_speed,
            flow_magnitude: summary.flow_magnitude,
            dominant_direction: summary.dominant_direction.label(),
            moving_cells: summary.moving_cells,
        }
    }
}

#[derive(Serialize)]
struct SequenceOutput<'a> {
    pairs: &'a [PairAnalysis],
    report: SequenceReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("surflow-extract")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Estimates river surface flow between consecutive frames")
        .arg(
            Arg::new("frames")
                .help("Frame images in display order")
                .takes_value(true)
                .multiple_values(true)
                .required_unless_present_any(["live", "list-props"]),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON file with the estimation configuration"),
        )
        .arg(Arg::new("grid").long("grid").short('g').takes_value(true))
        .arg(Arg::new("window").long("window").short('w').takes_value(true))
        .arg(Arg::new("factor").long("factor").takes_value(true))
        .arg(Arg::new("max-speed").long("max-speed").takes_value(true))
        .arg(Arg::new("epsilon").long("epsilon").takes_value(true))
        .arg(
            Arg::new("set")
                .long("set")
                .short('s')
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Set a named property, e.g. \"Grid size=12\""),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .takes_value(true)
                .possible_values(["json", "csv"])
                .default_value("json"),
        )
        .arg(
            Arg::new("overlay")
                .long("overlay")
                .short('o')
                .takes_value(true)
                .help("Directory to write flow overlays to"),
        )
        .arg(
            Arg::new("live")
                .long("live")
                .takes_value(true)
                .conflicts_with("frames")
                .help("Snapshot file to re-read on every live cycle"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(Arg::new("cycles").long("cycles").takes_value(true))
        .arg(Arg::new("list-props").long("list-props"))
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => FlowConfig::default(),
    };

    if let Some(v) = matches.value_of("grid") {
        config.grid_size = v.parse()?;
    }
    if let Some(v) = matches.value_of("window") {
        config.window_size = v.parse()?;
    }
    if let Some(v) = matches.value_of("factor") {
        config.calibration_factor = v.parse()?;
    }
    if let Some(v) = matches.value_of("max-speed") {
        config.max_speed = v.parse()?;
    }
    if let Some(v) = matches.value_of("epsilon") {
        config.ill_conditioned_epsilon = v.parse()?;
    }

    for assignment in matches.values_of("set").into_iter().flatten() {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected <Property>=<value>, got {}", assignment))?;
        config.set_prop(name.trim(), value)?;
    }

    if matches.is_present("list-props") {
        for (name, prop) in config.props() {
            println!("{name}: {prop}");
        }
        return Ok(());
    }

    config.validate()?;
    debug!("Using {:?}", config);

    let format = match matches.value_of("format") {
        Some("csv") => Format::Csv,
        _ => Format::Json,
    };

    if let Some(snapshot) = matches.value_of("live") {
        let secs: f64 = matches.value_of("interval").unwrap_or("5").parse()?;

        if !secs.is_finite() || secs <= 0.0 {
            return Err(anyhow!("Interval must be a positive number of seconds"));
        }

        let cycles = matches
            .value_of("cycles")
            .map(str::parse::<usize>)
            .transpose()?;

        let live = LiveConfig {
            interval: Duration::from_secs_f64(secs),
        };

        return run_live(PathBuf::from(snapshot), config, live, cycles, format);
    }

    let step: usize = matches.value_of("step").unwrap_or("1").parse()?;

    let frames = matches
        .values_of("frames")
        .into_iter()
        .flatten()
        .map(load_frame)
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} frames", frames.len());

    let pairs: Vec<PairAnalysis> = match matches.value_of("overlay") {
        Some(dir) => {
            let flows = analyse_sequence_flows(&frames, step, &config)?;
            write_overlays(Path::new(dir), &frames, &flows)?;
            flows.iter().map(PairFlow::summary).collect()
        }
        None => analyse_sequence(&frames, step, &config)?,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        Format::Json => {
            let output = SequenceOutput {
                pairs: &pairs,
                report: SequenceReport::from_pairs(&pairs),
            };
            serde_json::to_writer_pretty(&mut out, &output)?;
            writeln!(out)?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for pair in &pairs {
                writer.serialize(Row::new(pair.index, &pair.summary))?;
            }
            writer.flush()?;
        }
    }

    Ok(())
}

fn load_frame(path: &str) -> Result<Frame> {
    let img = image::open(path).map_err(|e| anyhow!("Unable to load {}: {}", path, e))?;
    Ok(Frame::try_from(&img.to_rgb8())?)
}

fn write_overlays(dir: &Path, frames: &[Frame], flows: &[PairFlow]) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let style = OverlayStyle::default();

    for flow in flows {
        let current = &frames[flow.index + 1];
        let path = dir.join(format!("{:06}.png", flow.index));

        render_overlay(current, &flow.analysis.field, &style).save(&path)?;
        trace!("Wrote {}", path.display());
    }

    Ok(())
}

fn run_live(
    snapshot: PathBuf,
    config: FlowConfig,
    live: LiveConfig,
    cycles: Option<usize>,
    format: Format,
) -> Result<()> {
    let source = move || -> Result<Frame> { load_frame(&snapshot.to_string_lossy()) };

    let estimator = LucasKanadeEstimator::new(config)?;
    let mut analysis = LiveAnalysis::spawn(source, estimator, live);
    let wait = live.interval * 2 + Duration::from_secs(1);

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    let mut received = 0;

    while cycles.map(|c| received < c).unwrap_or(true) {
        let update = match analysis.recv_timeout(wait) {
            Some(update) => update,
            None if analysis.is_running() => continue,
            None => break,
        };

        match format {
            Format::Json => println!("{}", serde_json::to_string(&update)?),
            Format::Csv => {
                writer.serialize(Row::new(update.cycle, &update.summary))?;
                writer.flush()?;
            }
        }

        received += 1;
    }

    analysis.stop();

    Ok(())
}
