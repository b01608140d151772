// Platewatch Command Line Interface
// Runs camera streams through the plate pipeline and manages detection logs

mod console;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use console::OperatorConsole;
use platewatch_core::Scope;
use platewatch_eye::{
    CameraManager, CameraStatus, CameraStream, Collaborators, ImageSequenceSource,
    PipelineConfig, PlatePipeline, RecordCommitter, ReplayCollaborators, ReplayScript,
    StreamSummary,
};
use platewatch_storage::{
    edit_record, history, BackupLog, DetectionStore, ImageArchive, RecordEdit, SledStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "platewatch")]
#[command(about = "Platewatch - license plate detection-to-record pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a directory of frames through the pipeline
    Run {
        /// Directory of frame images, read in lexical order
        #[arg(long)]
        frames: PathBuf,

        /// Replay script with detections, OCR fragments and colors per frame
        #[arg(long)]
        script: PathBuf,

        /// Pipeline configuration (JSON, TOML or YAML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Detection store directory
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Backup log and captured image directory
        #[arg(long, default_value = "./backup")]
        backup_dir: PathBuf,

        #[arg(long)]
        user: String,

        /// Camera source name the records are scoped to
        #[arg(long)]
        camera: String,

        /// Frames per second to read (unpaced when omitted)
        #[arg(long)]
        fps: Option<f64>,
    },

    /// List detection records, newest first
    History {
        #[arg(long)]
        user: String,

        /// Only records of this camera source
        #[arg(long)]
        camera: Option<String>,

        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Output format (table, json)
        #[arg(long, short, default_value = "table")]
        format: String,
    },

    /// Edit a stored detection record
    Edit {
        #[arg(long)]
        user: String,

        #[arg(long)]
        camera: String,

        /// Plate key of the record to edit
        #[arg(long)]
        plate: String,

        #[arg(long)]
        new_plate: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        distance: Option<String>,

        #[arg(long)]
        height: Option<String>,

        #[arg(long)]
        timestamp: Option<String>,

        #[arg(long)]
        note: Option<String>,

        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Configuration file; defaults plus PLATEWATCH_* variables when omitted
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Output format (json, toml)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            frames,
            script,
            config,
            data_dir,
            backup_dir,
            user,
            camera,
            fps,
        } => {
            let config = load_config(config.as_deref())?;
            run_stream(RunOptions {
                frames,
                script,
                config,
                data_dir,
                backup_dir,
                scope: Scope::new(user, camera),
                fps,
            })
            .await?;
        }
        Commands::History {
            user,
            camera,
            data_dir,
            format,
        } => {
            show_history(&data_dir, &user, camera.as_deref(), &format).await?;
        }
        Commands::Edit {
            user,
            camera,
            plate,
            new_plate,
            color,
            distance,
            height,
            timestamp,
            note,
            data_dir,
        } => {
            let store = SledStore::open(&data_dir)?;
            let scope = Scope::new(user, camera);
            let existing = store
                .get(&scope, &plate)
                .await?
                .ok_or_else(|| anyhow!("No record {} for {}", plate, scope.camera_source))?;

            let mut edit = RecordEdit::from_record(&existing);
            if let Some(v) = new_plate {
                edit.plate_number = v;
            }
            if let Some(v) = color {
                edit.color = v;
            }
            if let Some(v) = distance {
                edit.distance_m = v;
            }
            if let Some(v) = height {
                edit.height_m = v;
            }
            if let Some(v) = timestamp {
                edit.timestamp = v;
            }
            if let Some(v) = note {
                edit.note = v;
            }

            let updated = edit_record(&store, &scope, &plate, edit).await?;
            store.flush().await?;
            println!("✅ Record saved: {}", updated.plate_number);
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        Commands::Config(cmd) => {
            handle_config_command(cmd)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => {
            let config = PipelineConfig::from_env();
            config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
            config
        }
    };
    Ok(config)
}

struct RunOptions {
    frames: PathBuf,
    script: PathBuf,
    config: PipelineConfig,
    data_dir: PathBuf,
    backup_dir: PathBuf,
    scope: Scope,
    fps: Option<f64>,
}

async fn run_stream(options: RunOptions) -> anyhow::Result<()> {
    let store = Arc::new(SledStore::open(&options.data_dir)?);
    let backup = Arc::new(BackupLog::open(&options.backup_dir)?);
    let images = Arc::new(ImageArchive::open(&options.backup_dir)?);
    let script = ReplayScript::from_file(&options.script)
        .with_context(|| format!("Failed to load replay script {:?}", options.script))?;

    let committer = RecordCommitter::new(options.scope.clone(), store.clone(), backup, Some(images));
    let pipeline = Arc::new(PlatePipeline::new(
        options.config,
        Collaborators::replay(ReplayCollaborators::new(script)),
        committer,
    )?);

    let mut camera = CameraManager::new(Box::new(ImageSequenceSource::new(&options.frames)));
    if let Some(fps) = options.fps {
        camera = camera.with_frame_rate(fps);
    }
    let camera = Arc::new(camera);
    let console = OperatorConsole::new(pipeline.clone(), camera.status());

    let stream = CameraStream::new(camera.clone(), pipeline.clone());
    stream.start()?;
    info!(
        "Streaming {:?} for {} / {}",
        options.frames, options.scope.user_id, options.scope.camera_source
    );
    console.print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let wait = stream.wait();
    tokio::pin!(wait);

    let summary = loop {
        tokio::select! {
            summary = &mut wait => break summary?,
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        let result = console.handle_line(&line).await?;
                        if !OperatorConsole::render(result) {
                            stream.request_stop();
                        }
                    }
                    None => stdin_open = false,
                }
            }
        }
    };
    pipeline.reset().await;
    store.flush().await?;

    if let CameraStatus::Failed(msg) = camera.current_status() {
        warn!("Camera {} failed: {}", camera.name(), msg);
        println!("⚠️  Camera failed: {}", msg);
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &StreamSummary) {
    println!("Frames:      {}", summary.frames);
    println!("Sampled:     {}", summary.sampled);
    println!("Readings:    {}", summary.readings);
    println!("Commits:     {}", summary.commits);
    println!("Suppressed:  {}", summary.suppressed);
    println!("Failures:    {}", summary.failures);
}

async fn show_history(
    data_dir: &Path,
    user: &str,
    camera: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let store = SledStore::open(data_dir)?;
    let records = history(&store, user, camera).await?;

    match format {
        "json" => {
            let records: Vec<_> = records.into_iter().map(|(_, record)| record).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        "table" => {
            if records.is_empty() {
                println!("No records found");
                return Ok(());
            }
            println!(
                "{:<20} {:<12} {:<12} {:>9} {:>9} {:>6}  {:<18} {}",
                "Timestamp", "Plate", "Color", "Dist (m)", "Hgt (m)", "Conf", "Camera", "Note"
            );
            for (_, r) in &records {
                println!(
                    "{:<20} {:<12} {:<12} {:>9.2} {:>9.2} {:>6.2}  {:<18} {}",
                    r.timestamp,
                    r.plate_number,
                    r.color,
                    r.distance_m,
                    r.height_m,
                    r.confidence,
                    r.camera_source,
                    r.note
                );
            }
            println!("{} record(s)", records.len());
        }
        other => return Err(anyhow!("Unknown format: {} (use table or json)", other)),
    }
    Ok(())
}

fn handle_config_command(cmd: ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show { file, format } => {
            let config = load_config(file.as_deref())?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&config)?),
                "toml" => println!("{}", toml::to_string_pretty(&config)?),
                other => return Err(anyhow!("Unknown format: {} (use json or toml)", other)),
            }
        }
        ConfigCommands::Validate { file } => match PipelineConfig::from_file(&file) {
            Ok(_) => println!("✅ {:?} is valid", file),
            Err(e) => {
                println!("❌ {:?}: {}", file, e);
                return Err(anyhow!("Invalid configuration"));
            }
        },
    }
    Ok(())
}
