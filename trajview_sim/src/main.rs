//! TrajView Playback Simulator CLI
//!
//! Run deterministic playback scenarios, or replay a recording headlessly.

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use trajview_core::{format_clock, EventList, StoreChange, Trajectory, ViewMode};
use trajview_sim::scenarios::ScenarioId;
use trajview_sim::{
    demo_events, RerunLogger, ScenarioMetrics, ScenarioResult, ScenarioRunner,
    SimConfig, SimExport, SimFrame, SimWorld,
};

/// Export every Nth frame (10 FPS at 60 Hz)
const EXPORT_INTERVAL: u64 = 6;

/// Plays `world` to the end, exporting and visualizing along the way.
fn run_session(
    mut world: SimWorld,
    scenario: ScenarioId,
    export_path: Option<&str>,
    logger: &RerunLogger,
) -> ScenarioResult {
    let seed = world.config.seed;
    let mode = world.config.view_mode;
    let duration = world.store.duration();
    let mut export = SimExport::new(scenario.name(), seed);
    let mut metrics = ScenarioMetrics::default();

    if let Some(trajectory) = world.store.trajectory() {
        logger.log_route(trajectory);
    }

    world.store.play();
    while world.store.is_playing() {
        let (frame, advance) = match world.tick() {
            Ok(step) => step,
            Err(e) => {
                error!("Frame source failed: {}", e);
                break;
            }
        };
        metrics.max_frame_delta_ms = metrics.max_frame_delta_ms.max(frame.delta_ms());
        if advance.reached_end {
            metrics.auto_stops += 1;
        }

        for change in world.store.drain_changes() {
            if let StoreChange::SelectionChanged { selected } = change {
                metrics.selection_changes += 1;
                let message = match world.store.selected_event() {
                    Some(event) => format!("{} [{}] {}", format_clock(event.time), event.id, event.label),
                    None => "selection cleared".to_string(),
                };
                debug!("  {} -> {:?}", format_clock(world.store.current_time()), selected);
                logger.log_event("timeline/selection", &message);
            }
        }

        if frame.index % EXPORT_INTERVAL == 0 || advance.reached_end {
            let captured = SimFrame::capture(&world.store, world.time(), mode);
            logger.set_time(captured.time_ms);
            if let Some(pose) = &captured.pose {
                logger.log_pose(pose);
            }
            logger.log_speed(captured.speed);
            export.add_frame(captured);
        }
    }

    let final_time = world.store.current_time();
    let passed = final_time == duration && metrics.auto_stops == 1;
    let failure_reason = if passed {
        None
    } else {
        Some(format!(
            "Stopped at {} of {} after {} auto-stops",
            format_clock(final_time),
            format_clock(duration),
            metrics.auto_stops
        ))
    };

    export.finalize(passed, failure_reason.clone());
    if let Some(path) = export_path {
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {:?}", e);
        } else {
            info!("Exported {} frames to {}", export.frames.len(), path);
        }
    }

    ScenarioResult {
        scenario,
        seed,
        passed,
        total_frames: world.frame_count(),
        final_time_ms: final_time,
        final_selection: world.store.selected_event_id().map(str::to_owned),
        failure_reason,
        metrics,
    }
}

/// TrajView deterministic playback CLI
#[derive(Parser, Debug)]
#[command(name = "trajview-sim")]
#[command(about = "Run deterministic playback tests for TrajView", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (full_playback, scrub_storm, event_jumps, speed_sweep,
    /// frame_jitter, reload_mid_play, follow_camera, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulated render rate in Hz
    #[arg(long, default_value = "60")]
    frame_rate: u32,

    /// Standard deviation of frame jitter in ms
    #[arg(long, default_value = "0")]
    jitter_ms: f64,

    /// Replay this trajectory recording (JSON) instead of the demo route
    #[arg(short, long)]
    trajectory: Option<PathBuf>,

    /// Timeline events (JSON) to load alongside the recording
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Playback speed multiplier for replays
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Start a replay at this playback time (ms)
    #[arg(long)]
    start_at: Option<u64>,

    /// Camera mode for exported poses (free, chase, first_person)
    #[arg(long, default_value = "free")]
    view: ViewMode,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export playback frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Stream playback to a Rerun viewer
    #[arg(long)]
    visualize: bool,
}

/// Builds a world around the recording named on the command line.
fn load_recording(args: &Args, config: SimConfig) -> Result<SimWorld, String> {
    let trajectory = match &args.trajectory {
        Some(path) => Trajectory::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => config
            .route_generator()
            .trajectory()
            .map_err(|e| e.to_string())?,
    };
    let events = match &args.events {
        Some(path) => EventList::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None if args.trajectory.is_some() => EventList::empty(),
        None => demo_events(),
    };

    info!(
        "Recording '{}': {} samples, {} events, {}",
        trajectory.name(),
        trajectory.len(),
        events.len(),
        format_clock(trajectory.duration())
    );

    let mut world = SimWorld::with_recording(config, trajectory, events);
    world.store.set_speed(args.speed);

    if let Some(start) = args.start_at {
        if let Err(e) = world.store.clock().validate_time(start) {
            warn!("{}; clamping", e);
        }
        world.store.set_current_time(start);
    }
    Ok(world)
}

/// `RUST_LOG` directives win; otherwise `--verbose` picks DEBUG over INFO.
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(level.into()))
}

fn print_summary(args: &Args, results: &[ScenarioResult]) -> bool {
    let total = results.len();
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.total_frames,
                    "final_time_ms": r.final_time_ms,
                    "selected_event": r.final_selection,
                    "selection_changes": r.metrics.selection_changes,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);

            // List failed seeds
            for result in &failed {
                error!("  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    failed.is_empty()
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let directives = std::env::var("RUST_LOG").ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(args.verbose, directives.as_deref()))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    if !args.json {
        info!("TrajView Playback Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let config = SimConfig::default()
        .with_seed(base_seed)
        .with_frame_rate(args.frame_rate)
        .with_jitter_ms(args.jitter_ms)
        .with_view_mode(args.view);

    let logger = if args.visualize {
        RerunLogger::new("trajview_sim")
    } else {
        RerunLogger::disabled()
    };

    // Replay mode: a recording (or the demo route) played straight through
    if args.trajectory.is_some() || args.export.is_some() || args.visualize {
        let world = match load_recording(&args, config) {
            Ok(world) => world,
            Err(e) => {
                error!("Failed to load recording: {}", e);
                std::process::exit(1);
            }
        };

        let result = run_session(world, ScenarioId::FullPlayback, args.export.as_deref(), &logger);
        if !args.json {
            info!("Replayed {} frames, {} selection changes, ended at {} on {:?}",
                result.total_frames,
                result.metrics.selection_changes,
                format_clock(result.final_time_ms),
                result.final_selection
            );
        }
        if !print_summary(&args, &[result]) {
            std::process::exit(1);
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(1);
            }
        }
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_frame_rate(args.frame_rate)
            .with_jitter_ms(args.jitter_ms);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!("✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            all_results.push(result);
        }
    }

    // Exit with proper code for CI
    if !print_summary(&args, &all_results) {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbose_flag() {
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, Some("  ")).to_string(), "debug");
    }

    #[test]
    fn test_log_filter_prefers_rust_log() {
        let filter = log_filter(false, Some("trajview_core=trace")).to_string();
        assert!(filter.contains("trajview_core=trace"), "{}", filter);
    }

    #[test]
    fn test_replay_uses_scenario_route() {
        let args = Args::parse_from(["trajview-sim", "--seed", "9"]);
        let config = SimConfig::default().with_seed(9);

        let replay = load_recording(&args, config.clone()).unwrap();
        let scenario = SimWorld::new(config).unwrap();

        assert_eq!(
            replay.store.trajectory().map(|t| t.samples().to_vec()),
            scenario.store.trajectory().map(|t| t.samples().to_vec())
        );
        assert_eq!(replay.store.events().len(), 4);
    }
}
