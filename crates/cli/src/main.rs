//! markcorr CLI - weighted mark-correlation analysis of point patterns

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use markcorr_algorithms::approximation::grid_approximation;
use markcorr_algorithms::distance::{distance_provider, DistanceMode, DistanceProvider, TableDistances};
use markcorr_algorithms::statistics::{
    m_function, simulate_envelope_with_progress, Envelope, EnvelopeKind, EnvelopeParams, EnvelopeRecord,
    IndividualValues, MParams, MRecord, Normalization, NullModel,
};
use markcorr_core::io::{read_point_set, read_tabulated_pattern, write_json, write_point_set, write_tabulated_pattern};
use markcorr_core::{Marks, PointSet, RadiusSequence, TabulatedPattern, TypeSummary, Window};
use markcorr_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "markcorr")]
#[command(author, version, about = "Weighted mark-correlation function M for point patterns", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a point pattern or distance table
    Info {
        /// Input JSON file
        input: PathBuf,
        /// Input is a distance table rather than located points
        #[arg(long)]
        from_table: bool,
    },
    /// Aggregate a point pattern on a regular grid
    Grid {
        /// Input point pattern
        input: PathBuf,
        /// Output point pattern
        output: PathBuf,
        /// Number of cells along each side of the grid
        #[arg(short, long)]
        partitions: usize,
    },
    /// Write the pairwise distance table of a point pattern
    Tabulate {
        /// Input point pattern
        input: PathBuf,
        /// Output distance table
        output: PathBuf,
    },
    /// Compute M, optionally with a confidence envelope
    Mfunction {
        /// Input JSON file
        input: PathBuf,
        /// Input is a distance table rather than located points
        #[arg(long)]
        from_table: bool,
        /// Reference point type
        #[arg(short, long, default_value = "Case")]
        reference: String,
        /// Neighbor point type
        #[arg(short, long, default_value = "Control")]
        neighbor: String,
        /// Global share definition: pattern-share, exclude-self
        #[arg(long, default_value = "pattern-share")]
        normalization: String,
        /// Distance source for located points: coordinates, table
        #[arg(short, long, default_value = "coordinates")]
        distances: String,
        /// Aggregate the points on a partitions × partitions grid first
        #[arg(short, long)]
        partitions: Option<usize>,
        /// With --partitions, also compute the exact M and report the error
        #[arg(long)]
        compare: bool,
        /// Also output per-reference-point values
        #[arg(long)]
        individual: bool,
        /// Worker threads (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Output JSON file (default: print records)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        radii: RadiusArgs,

        #[command(flatten)]
        envelope: EnvelopeArgs,
    },
}

#[derive(Args)]
struct RadiusArgs {
    /// Comma-separated radii, e.g. 0,5,10
    #[arg(long)]
    radii: Option<String>,
    /// Largest radius of an evenly spaced sequence starting at 0
    #[arg(long)]
    rmax: Option<f64>,
    /// Number of intervals of the evenly spaced sequence
    #[arg(long)]
    steps: Option<usize>,
}

#[derive(Args)]
struct EnvelopeArgs {
    /// Envelope: none, pointwise, global
    #[arg(short, long, default_value = "none")]
    envelope: String,
    /// Number of simulations
    #[arg(short, long, default_value = "100")]
    simulations: usize,
    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
    /// Risk level of the envelope
    #[arg(short, long, default_value = "0.05")]
    alpha: f64,
    /// Null model: random-labeling, random-location, population-independence
    #[arg(long, default_value = "random-labeling")]
    null_model: String,
    /// Simulations per batch
    #[arg(long, default_value = "32")]
    batch_size: usize,
}

// ─── Reports ────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(untagged)]
enum Records {
    M(Vec<MRecord>),
    Envelope(Vec<EnvelopeRecord>),
}

#[derive(Serialize)]
struct EnvelopeInfo {
    kind: EnvelopeKind,
    alpha: f64,
    null_model: NullModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    critical_deviation: Option<f64>,
    simulations_requested: usize,
    simulations_completed: usize,
}

impl From<&Envelope> for EnvelopeInfo {
    fn from(env: &Envelope) -> Self {
        Self {
            kind: env.kind,
            alpha: env.alpha,
            null_model: env.null_model,
            critical_deviation: env.critical_deviation,
            simulations_requested: env.simulations_requested,
            simulations_completed: env.simulations_completed,
        }
    }
}

#[derive(Serialize)]
struct ApproximationInfo {
    partitions: usize,
    points_before: usize,
    points_after: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_abs_difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    approximate_seconds: Option<f64>,
}

#[derive(Serialize)]
struct Report {
    reference: String,
    neighbor: String,
    normalization: Normalization,
    points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    approximation: Option<ApproximationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope: Option<EnvelopeInfo>,
    records: Records,
    #[serde(skip_serializing_if = "Option::is_none")]
    individual: Option<IndividualValues>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn configure_threads(threads: Option<usize>) -> Result<ProcessingMode> {
    if let Some(n) = threads {
        anyhow::ensure!(n > 0, "--threads must be at least 1");
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to configure thread pool")?;
    }
    Ok(ProcessingMode::from_threads(threads))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar(total: usize, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(msg.to_string());
    pb
}

fn read_points(path: &PathBuf) -> Result<PointSet> {
    let pb = spinner("Reading point pattern...");
    let points = read_point_set(path).context("Failed to read point pattern")?;
    pb.finish_and_clear();
    info!("Input: {} points", points.len());
    Ok(points)
}

fn read_table(path: &PathBuf) -> Result<TabulatedPattern> {
    let pb = spinner("Reading distance table...");
    let pattern = read_tabulated_pattern(path).context("Failed to read distance table")?;
    pb.finish_and_clear();
    info!("Input: {} points (tabulated)", pattern.marks().len());
    Ok(pattern)
}

fn write_report(report: &Report, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_json(report, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_radii(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|r| {
            r.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid radius: {}", r))
        })
        .collect()
}

fn resolve_radii(args: &RadiusArgs, window: Option<&Window>) -> Result<RadiusSequence> {
    if let Some(list) = &args.radii {
        anyhow::ensure!(
            args.rmax.is_none() && args.steps.is_none(),
            "--radii cannot be combined with --rmax or --steps"
        );
        return RadiusSequence::new(parse_radii(list)?).context("Invalid radius sequence");
    }

    let radii = match (args.rmax, window, args.steps) {
        (Some(rmax), _, steps) => RadiusSequence::linear(rmax, steps.unwrap_or(markcorr_core::radius::DEFAULT_RADIUS_STEPS)),
        (None, Some(window), None) => RadiusSequence::default_for(window),
        (None, Some(window), Some(steps)) => {
            let b = window.bounds();
            RadiusSequence::linear(b.width().min(b.height()) / 4.0, steps)
        }
        (None, None, _) => anyhow::bail!("--radii or --rmax is required for a distance table"),
    };
    radii.context("Invalid radius sequence")
}

fn parse_normalization(s: &str) -> Result<Normalization> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("{}. Use pattern-share or exclude-self.", e))
}

fn parse_distances(s: &str) -> Result<DistanceMode> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("{}. Use coordinates or table.", e))
}

fn parse_envelope(s: &str) -> Result<Option<EnvelopeKind>> {
    match s.to_lowercase().as_str() {
        "none" | "no" | "off" => Ok(None),
        other => other
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}. Use none, pointwise, or global.", e)),
    }
}

fn parse_null_model(s: &str) -> Result<NullModel> {
    s.parse().map_err(|e| {
        anyhow::anyhow!(
            "{}. Use random-labeling, random-location, or population-independence.",
            e
        )
    })
}

fn print_types(types: &[TypeSummary]) {
    println!("\nTypes:");
    for t in types {
        println!("  {:<16} {:>8} points  weight {:.4}", t.label, t.count, t.weight);
    }
}

fn print_records(records: &Records) {
    match records {
        Records::M(rows) => {
            println!("{:>12} {:>12}", "radius", "M");
            for r in rows {
                println!("{:>12.4} {:>12}", r.radius, fmt_value(r.value));
            }
        }
        Records::Envelope(rows) => {
            println!("{:>12} {:>12} {:>12} {:>12}", "radius", "M", "lower", "upper");
            for r in rows {
                println!(
                    "{:>12.4} {:>12} {:>12} {:>12}",
                    r.radius,
                    fmt_value(r.observed),
                    fmt_value(r.lower),
                    fmt_value(r.upper)
                );
            }
        }
    }
}

fn fmt_value(v: Option<f64>) -> String {
    v.map_or_else(|| "NA".to_string(), |v| format!("{:.4}", v))
}

/// M and, if requested, its envelope for one pattern
fn analyze(
    provider: &dyn DistanceProvider,
    marks: &Marks,
    radii: &RadiusSequence,
    m_params: &MParams,
    envelope: &EnvelopeArgs,
    mode: ProcessingMode,
) -> Result<Report> {
    let kind = parse_envelope(&envelope.envelope)?;

    let start = Instant::now();
    let m = m_function(provider, marks, radii, m_params).context("Failed to compute M")?;
    info!("M computed at {} radii in {:.2?}", radii.len(), start.elapsed());

    let (records, envelope_info) = match kind {
        None => (Records::M(m.records()), None),
        Some(kind) => {
            let params = EnvelopeParams {
                kind,
                simulations: envelope.simulations,
                alpha: envelope.alpha,
                seed: envelope.seed,
                null_model: parse_null_model(&envelope.null_model)?,
                mode,
                batch_size: envelope.batch_size,
                cancel: None,
            };
            let pb = progress_bar(envelope.simulations, "Simulating");
            let start = Instant::now();
            let env = simulate_envelope_with_progress(provider, marks, radii, m_params, &params, |done, _| {
                pb.set_position(done as u64)
            })
            .context("Envelope simulation failed")?;
            pb.finish_and_clear();
            info!(
                "{} simulations in {:.2?}",
                env.simulations_completed,
                start.elapsed()
            );
            if env.is_partial() {
                warn!(
                    "Envelope built from {} of {} simulations",
                    env.simulations_completed, env.simulations_requested
                );
            }
            (Records::Envelope(env.records()), Some(EnvelopeInfo::from(&env)))
        }
    };

    Ok(Report {
        reference: m.reference,
        neighbor: m.neighbor,
        normalization: m.normalization,
        points: marks.len(),
        approximation: None,
        envelope: envelope_info,
        records,
        individual: m.individual,
    })
}

/// Compare M on the exact and the grid-approximated pattern
fn compare_approximation(
    exact: &PointSet,
    approximate: &PointSet,
    partitions: usize,
    mode: DistanceMode,
    radii: &RadiusSequence,
    m_params: &MParams,
) -> Result<ApproximationInfo> {
    let params = MParams {
        individual: false,
        ..m_params.clone()
    };

    let start = Instant::now();
    let m_exact = m_function(distance_provider(exact, mode).as_ref(), exact.marks(), radii, &params)
        .context("Failed to compute exact M")?;
    let exact_seconds = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let m_approx = m_function(distance_provider(approximate, mode).as_ref(), approximate.marks(), radii, &params)
        .context("Failed to compute approximate M")?;
    let approximate_seconds = start.elapsed().as_secs_f64();

    let diff = m_exact.max_abs_difference(&m_approx)?;
    println!(
        "Approximation ({0} x {0}): {1} -> {2} points",
        partitions,
        exact.len(),
        approximate.len()
    );
    println!("  Max |M_grid - M_exact|: {}", fmt_value(diff));
    println!(
        "  Exact: {:.3}s, approximate: {:.3}s",
        exact_seconds, approximate_seconds
    );

    Ok(ApproximationInfo {
        partitions,
        points_before: exact.len(),
        points_after: approximate.len(),
        max_abs_difference: diff,
        exact_seconds: Some(exact_seconds),
        approximate_seconds: Some(approximate_seconds),
    })
}

fn emit(report: &Report, output: Option<&PathBuf>, elapsed: std::time::Duration) -> Result<()> {
    match output {
        Some(path) => {
            write_report(report, path)?;
            done("M function", path, elapsed);
        }
        None => print_records(&report.records),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, from_table } => {
            println!("File: {}", input.display());
            if from_table {
                let pattern = read_table(&input)?;
                let table = pattern.table();
                let max = table.as_array().iter().copied().fold(0.0, f64::max);
                println!("Representation: distance table");
                println!("Points: {}", table.len());
                println!("Total weight: {:.4}", pattern.marks().total_weight());
                println!("Largest distance: {:.4}", max);
                print_types(&pattern.marks().summary());
            } else {
                let points = read_points(&input)?;
                let summary = points.summary();
                let bounds = points.window().bounds();
                match points.window() {
                    Window::Rectangle(_) => println!("Window: rectangle"),
                    Window::Polygon(_) => {
                        println!("Window: polygon ({} vertices)", points.window().vertices().len())
                    }
                }
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
                );
                println!("Diameter: {:.4}", bounds.diameter());
                println!("Area: {:.4}", summary.area);
                println!("Points: {}", summary.points);
                println!("Total weight: {:.4}", summary.total_weight);
                println!("Intensity: {:.6}", summary.intensity);
                print_types(&summary.types);
            }
        }

        // ── Grid ─────────────────────────────────────────────────────
        Commands::Grid {
            input,
            output,
            partitions,
        } => {
            let points = read_points(&input)?;
            let start = Instant::now();
            let grid = grid_approximation(&points, partitions).context("Grid approximation failed")?;
            let elapsed = start.elapsed();
            write_point_set(&grid, &output).context("Failed to write output")?;
            println!("{} points -> {} points", points.len(), grid.len());
            done("Grid approximation", &output, elapsed);
        }

        // ── Tabulate ─────────────────────────────────────────────────
        Commands::Tabulate { input, output } => {
            let points = read_points(&input)?;
            let start = Instant::now();
            let pattern = TabulatedPattern::from_points(&points);
            let elapsed = start.elapsed();
            let pb = spinner("Writing output...");
            write_tabulated_pattern(&pattern, &output).context("Failed to write output")?;
            pb.finish_and_clear();
            done("Distance table", &output, elapsed);
        }

        // ── M function ───────────────────────────────────────────────
        Commands::Mfunction {
            input,
            from_table,
            reference,
            neighbor,
            normalization,
            distances,
            partitions,
            compare,
            individual,
            threads,
            output,
            radii,
            envelope,
        } => {
            let mode = configure_threads(threads)?;
            info!("Threads: {}", mode.threads());
            let m_params = MParams {
                reference,
                neighbor,
                normalization: parse_normalization(&normalization)?,
                individual,
            };
            let start = Instant::now();

            if from_table {
                anyhow::ensure!(
                    partitions.is_none(),
                    "--partitions needs located points, not a distance table"
                );
                let pattern = read_table(&input)?;
                let radii = resolve_radii(&radii, None)?;
                let provider = TableDistances::new(pattern.table());
                let report = analyze(&provider, pattern.marks(), &radii, &m_params, &envelope, mode)?;
                emit(&report, output.as_ref(), start.elapsed())?;
            } else {
                let points = read_points(&input)?;
                let radii = resolve_radii(&radii, Some(points.window()))?;
                let distance_mode = parse_distances(&distances)?;

                let mut approximation = None;
                let grid = match partitions {
                    Some(p) => {
                        let grid = grid_approximation(&points, p).context("Grid approximation failed")?;
                        info!("Grid {0} x {0}: {1} -> {2} points", p, points.len(), grid.len());
                        approximation = Some(if compare {
                            compare_approximation(&points, &grid, p, distance_mode, &radii, &m_params)?
                        } else {
                            ApproximationInfo {
                                partitions: p,
                                points_before: points.len(),
                                points_after: grid.len(),
                                max_abs_difference: None,
                                exact_seconds: None,
                                approximate_seconds: None,
                            }
                        });
                        Some(grid)
                    }
                    None => {
                        if compare {
                            warn!("--compare has no effect without --partitions");
                        }
                        None
                    }
                };
                let target = grid.as_ref().unwrap_or(&points);

                let provider = distance_provider(target, distance_mode);
                let mut report = analyze(provider.as_ref(), target.marks(), &radii, &m_params, &envelope, mode)?;
                report.approximation = approximation;
                emit(&report, output.as_ref(), start.elapsed())?;
            }
        }
    }

    Ok(())
}
