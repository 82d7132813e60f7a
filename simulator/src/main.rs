use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use generator::profile::build_workbench;
use gui_bridge::bridge::GuiBridge;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surveycore::ingest::{FileUpload, CSV_MIME};
use surveycore::prelude::{SurveyParameters, SurveyTool, ToolKind, UploadKind};
use surveycore::tools::{Earthquake, EarthquakeFilter};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{WorkflowConfig, DEFAULT_DELAY_MS};
use workflow::runner::Runner;
use workflow::session::SharedHandle;

mod generator;
mod gui_bridge;
mod interpret;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Geophysics survey simulator, CSV checker and dashboard bridge")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long, global = true)]
    workflow: Option<PathBuf>,
    /// Seed every tool's random source (overrides the config)
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Pause before a simulation is published, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a synthetic dataset and write it as CSV
    Simulate(SimulateArgs),
    /// Validate a CSV file against a tool's schema and print its statistics
    Ingest(IngestArgs),
    /// Build the interpretation prompt and send it to the configured endpoint
    Interpret(InterpretArgs),
    /// Generate or load an earthquake catalogue and filter it
    Quakes(QuakeArgs),
    /// Serve the tool sessions over HTTP until Ctrl+C
    Serve {
        /// Overrides the configured bind address
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
}

#[derive(ClapArgs)]
struct SimulateArgs {
    #[arg(long)]
    tool: ToolKind,
    /// Parameter overrides as JSON, e.g. '{"electrode_count": 32}'
    #[arg(long)]
    params: Option<String>,
    #[arg(long, default_value_t = UploadKind::Survey)]
    mode: UploadKind,
    /// Write here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(ClapArgs)]
struct IngestArgs {
    #[arg(long)]
    tool: ToolKind,
    file: PathBuf,
    #[arg(long, default_value_t = UploadKind::Survey)]
    mode: UploadKind,
}

#[derive(ClapArgs)]
struct InterpretArgs {
    #[arg(long)]
    tool: ToolKind,
    /// Interpret this CSV instead of a fresh simulation
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long, default_value_t = UploadKind::Survey)]
    mode: UploadKind,
    /// Print the prompt without calling the endpoint
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(ClapArgs)]
struct QuakeArgs {
    /// Filter this catalogue instead of a generated one
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    min_magnitude: Option<f64>,
    #[arg(long)]
    max_magnitude: Option<f64>,
    #[arg(long)]
    min_depth: Option<f64>,
    #[arg(long)]
    max_depth: Option<f64>,
    /// Only events from the last N hours
    #[arg(long)]
    within_hours: Option<f64>,
}

fn mime_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Some(CSV_MIME),
        Some(_) => Some("application/octet-stream"),
        None => None,
    }
}

fn session(workbench: &generator::profile::Workbench, tool: ToolKind) -> anyhow::Result<SharedHandle> {
    workbench
        .session(tool)
        .with_context(|| format!("no session for {}", tool))
}

fn load_into(handle: &SharedHandle, file: &Path, mode: UploadKind) -> anyhow::Result<()> {
    let content = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let upload = FileUpload {
        content: Some(content.as_slice()),
        mime: mime_for(file),
        kind: mode,
    };
    let mut session = handle
        .lock()
        .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?;
    session
        .upload(upload)
        .with_context(|| format!("rejected {}", file.display()))
}

fn simulate_now(handle: &SharedHandle) -> anyhow::Result<()> {
    let mut session = handle
        .lock()
        .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?;
    let epoch = session.begin_simulation();
    session.finish_simulation(epoch);
    Ok(())
}

fn write_output(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match args.workflow.as_ref() {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::from_args(args.seed, args.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(delay) = args.delay_ms {
        config.simulation_delay_ms = delay;
    }

    let workbench = Arc::new(build_workbench(&config.tools, config.seed));

    match args.command {
        Command::Simulate(cmd) => {
            let handle = session(&workbench, cmd.tool)?;
            if let Some(params) = cmd.params.as_deref() {
                let value: serde_json::Value =
                    serde_json::from_str(params).context("parsing --params as JSON")?;
                let mut session = handle
                    .lock()
                    .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?;
                session.update_parameters(value)?;
            }
            simulate_now(&handle)?;
            let csv = handle
                .lock()
                .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?
                .export(cmd.mode)?;
            write_output(&csv, cmd.output.as_deref())?;
        }
        Command::Ingest(cmd) => {
            let handle = session(&workbench, cmd.tool)?;
            load_into(&handle, &cmd.file, cmd.mode)?;
            let snapshot = handle
                .lock()
                .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?
                .snapshot(false);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Interpret(cmd) => {
            let handle = session(&workbench, cmd.tool)?;
            match cmd.file.as_deref() {
                Some(file) => load_into(&handle, file, cmd.mode)?,
                None => simulate_now(&handle)?,
            }
            if cmd.dry_run {
                let request = handle
                    .lock()
                    .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?
                    .begin_interpretation();
                let (_, prompt) = request.context("nothing to interpret")?;
                println!("{}", prompt);
                return Ok(());
            }
            let runner = Runner::from_config(&config);
            let runtime = TokioBuilder::new_current_thread()
                .enable_all()
                .build()
                .context("creating runtime for interpretation")?;
            runtime.block_on(runner.interpret(&handle))?;
            let snapshot = handle
                .lock()
                .map_err(|_| anyhow::anyhow!("tool session lock poisoned"))?
                .snapshot(false);
            match (snapshot.interpretation, snapshot.error) {
                (Some(text), _) => println!("{}", text),
                (None, Some(error)) => anyhow::bail!(error),
                (None, None) => anyhow::bail!("no interpretation returned"),
            }
        }
        Command::Quakes(cmd) => {
            let catalogue = match cmd.file.as_deref() {
                Some(file) => {
                    let content = fs::read_to_string(file)
                        .with_context(|| format!("reading {}", file.display()))?;
                    Earthquake::ingest(&content, UploadKind::Survey)
                        .with_context(|| format!("rejected {}", file.display()))?
                }
                None => {
                    let mut rng = match config.seed {
                        Some(seed) => StdRng::seed_from_u64(seed),
                        None => StdRng::from_entropy(),
                    };
                    let params = config.tools.earthquake.normalized();
                    Earthquake::generate(&params, &mut rng)
                }
            };
            let filter = EarthquakeFilter {
                min_magnitude: cmd.min_magnitude,
                max_magnitude: cmd.max_magnitude,
                min_depth: cmd.min_depth,
                max_depth: cmd.max_depth,
                within_hours: cmd.within_hours,
            };
            let matched = filter.apply(&catalogue);
            info!("{} of {} events match", matched.len(), catalogue.len());
            print!("{}", Earthquake::export(&matched, UploadKind::Survey)?);
        }
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind);
            let runner = Runner::from_config(&config);
            let bridge = GuiBridge::new(workbench.clone(), runner);
            let runtime = TokioBuilder::new_multi_thread()
                .enable_all()
                .build()
                .context("creating runtime for the HTTP bridge")?;
            runtime.block_on(async move {
                let shutdown = async {
                    if let Err(err) = signal::ctrl_c().await {
                        log::error!("awaiting Ctrl+C: {}", err);
                    }
                };
                bridge.serve(addr, shutdown).await
            })?;
        }
    }

    Ok(())
}
