use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};

use replaybot::config::{self as cfg, Settings};
use replaybot::document::{self, Exporter};
use replaybot::executor::EnigoDriver;
use replaybot::groups::{GlobalGroups, GroupResolver, LocalGroups};
use replaybot::player::{self, LoggingObserver, Player, PlayerContext, PlayerEvent};
use replaybot::utils::window;

/// ReplayBot CLI
#[derive(Debug, Parser)]
#[command(
    name = replaybot::PKG_NAME,
    version = replaybot::PKG_VERSION,
    about = "Replay recorded desktop automation scripts"
)]
struct Args {
    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Path to the JSON settings file (defaults to the per-user config dir)
    #[arg(short = 's', long = "settings", global = true)]
    settings: Option<PathBuf>,

    /// Directory of shared action groups. Overrides the settings file.
    #[arg(long = "groups-dir", global = true)]
    groups_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a script document
    Play(PlayArgs),

    /// Re-export a script with every referenced group and image embedded
    Export { input: PathBuf, output: PathBuf },

    /// Check every action and group of a script
    Validate { script: PathBuf },

    /// Manage shared action groups
    Groups {
        #[command(subcommand)]
        command: GroupsCommand,
    },

    /// Print the JSON Schema of the script document (or of the settings file)
    Schema {
        #[arg(long)]
        settings: bool,
    },
}

#[derive(Debug, clap::Args)]
struct PlayArgs {
    /// Script document (JSON)
    script: PathBuf,

    /// Number of times to run the script
    #[arg(long)]
    repeat: Option<i64>,

    /// Speed multiplier (0.1 - 10)
    #[arg(long)]
    speed: Option<f64>,

    /// Repeat until interrupted
    #[arg(long)]
    infinite: bool,

    /// Stop after this many seconds (0 = no limit)
    #[arg(long)]
    timeout: Option<f64>,

    /// Enable dry-run mode (log actions instead of simulating input)
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Title (substring) of the window relative coordinates refer to
    #[arg(long)]
    window: Option<String>,
}

#[derive(Debug, Subcommand)]
enum GroupsCommand {
    /// List shared groups
    List,
    /// Print a group as JSON
    Show { name: String },
    /// Delete a group and its file
    Delete { name: String },
    /// Import a group from a JSON file
    Import {
        file: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => cfg::load_from_path_async(path).await?,
        None => match default_settings_path() {
            Some(path) => cfg::load_or_default(path)?,
            None => Settings::default(),
        },
    };

    // --log-level beats the settings file, which beats RUST_LOG.
    let level = args
        .log_level
        .as_deref()
        .and_then(replaybot::parse_level)
        .or(settings.log_level.map(Into::into));
    replaybot::init_tracing_with(level);
    debug!(target: "replaybot::config", ?settings, "Settings loaded");

    let groups_dir = args
        .groups_dir
        .clone()
        .unwrap_or_else(|| settings.groups_dir());

    let ok = match args.command {
        Command::Play(play_args) => play(play_args, &settings, &groups_dir).await?,
        Command::Export { input, output } => {
            export(&input, &output, &settings, &groups_dir)?;
            true
        }
        Command::Validate { script } => validate(&script, &settings, &groups_dir)?,
        Command::Groups { command } => groups(command, &groups_dir)?,
        Command::Schema { settings: for_settings } => {
            let schema = if for_settings {
                cfg::generate_schema()
            } else {
                cfg::generate_document_schema()
            };
            let mut stdout = std::io::stdout().lock();
            cfg::write_schema_to_writer(&schema, &mut stdout)?;
            writeln!(stdout)?;
            true
        }
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("replaybot").join("settings.json"))
}

fn open_global(dir: &Path) -> Result<Arc<GlobalGroups>> {
    let groups = GlobalGroups::open(dir)
        .with_context(|| format!("Failed to open group directory {}", dir.display()))?;
    Ok(Arc::new(groups))
}

async fn play(args: PlayArgs, settings: &Settings, groups_dir: &Path) -> Result<bool> {
    let global = open_global(groups_dir)?;
    let local = Arc::new(LocalGroups::new());
    let imported = document::import_path(&args.script, &settings.images_dir_name, &local)
        .with_context(|| format!("Failed to load script {}", args.script.display()))?;

    for (index, action) in imported.actions.iter().enumerate() {
        if let Err(err) = action.validate() {
            warn!(target: "replaybot::player", index, error = %err, "action is invalid and will likely fail");
        }
    }

    let dry_run = args.dry_run || settings.dry_run;
    let player = Arc::new(Player::new(
        PlayerContext::new(Box::new(EnigoDriver::new(dry_run))).with_groups(local, Some(global)),
    ));
    settings.apply_to(&player);
    if let Some(repeat) = args.repeat {
        player.set_repeat_count(repeat);
    }
    if let Some(speed) = args.speed {
        player.set_speed(speed);
    }
    if args.infinite {
        player.set_infinite_loop(true);
    }
    if let Some(seconds) = args.timeout {
        player.set_timeout(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO));
    }
    if let Some(title) = &args.window {
        match window::window_offset(title) {
            Ok(Some(offset)) => player.set_window_offset(Some(offset)),
            Ok(None) => warn!(target: "replaybot::window", %title, "window not found; using absolute coordinates"),
            Err(err) => warn!(target: "replaybot::window", %title, error = %err, "window lookup failed"),
        }
    }

    let (observer, mut rx) = player::channel();
    player.add_observer(Arc::new(observer));
    player.add_observer(Arc::new(LoggingObserver));
    player.set_actions(imported.actions);

    info!(
        version = replaybot::PKG_VERSION,
        script = %args.script.display(),
        name = %imported.info.name,
        dry_run,
        "Starting playback"
    );
    if !player.play() {
        bail!("Nothing to play in {}", args.script.display());
    }

    let mut failures = 0usize;
    let success = loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(PlayerEvent::Finished { success }) => break success,
                Some(PlayerEvent::Error { .. }) => failures += 1,
                Some(_) => {}
                None => break false,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping playback");
                let stopping = Arc::clone(&player);
                let exited = tokio::task::spawn_blocking(move || {
                    stopping.stop_and_wait(Duration::from_secs(2))
                })
                .await?;
                if !exited {
                    warn!("Player did not stop within 2s");
                }
                break false;
            }
        }
    };

    let waiting = Arc::clone(&player);
    tokio::task::spawn_blocking(move || waiting.wait(Duration::from_secs(2))).await?;
    info!(success, failed_actions = failures, "Playback ended");
    Ok(success)
}

fn export(input: &Path, output: &Path, settings: &Settings, groups_dir: &Path) -> Result<()> {
    let global = open_global(groups_dir)?;
    let local = Arc::new(LocalGroups::new());
    let imported = document::import_path(input, &settings.images_dir_name, &local)
        .with_context(|| format!("Failed to load script {}", input.display()))?;
    let resolver = GroupResolver::new(local, Some(global));
    let doc = Exporter::new(&resolver)
        .with_info(imported.info)
        .export_to_path(&imported.actions, output)
        .with_context(|| format!("Failed to export to {}", output.display()))?;
    println!(
        "Exported {} actions, {} groups, {} images to {}",
        doc.actions.len(),
        doc.action_groups.len(),
        doc.embedded_images.len(),
        output.display()
    );
    Ok(())
}

fn validate(script: &Path, settings: &Settings, groups_dir: &Path) -> Result<bool> {
    let global = open_global(groups_dir)?;
    let local = Arc::new(LocalGroups::new());
    let imported = document::import_path(script, &settings.images_dir_name, &local)
        .with_context(|| format!("Failed to load script {}", script.display()))?;

    let mut ok = true;
    for (index, action) in imported.actions.iter().enumerate() {
        if let Err(err) = action.validate() {
            println!("{}", err.at(index));
            ok = false;
        }
    }
    if imported.groups_failed > 0 {
        println!("{} embedded group(s) are invalid", imported.groups_failed);
        ok = false;
    }

    let resolver = GroupResolver::new(Arc::clone(&local), Some(global));
    let mut referenced: Vec<String> = imported
        .actions
        .iter()
        .filter_map(|a| a.group_ref())
        .map(str::to_string)
        .collect();
    for group in local.all() {
        referenced.extend(group.dependencies());
    }
    referenced.sort();
    referenced.dedup();
    for name in referenced {
        if resolver.resolve(&name).is_none() {
            println!("action group not found: {name}");
            ok = false;
        }
    }

    println!(
        "{}: {} actions, {} groups: {}",
        script.display(),
        imported.actions.len(),
        imported.groups_loaded,
        if ok { "OK" } else { "INVALID" }
    );
    Ok(ok)
}

fn groups(command: GroupsCommand, groups_dir: &Path) -> Result<bool> {
    let global = open_global(groups_dir)?;
    match command {
        GroupsCommand::List => {
            for group in global.all() {
                println!(
                    "{}\t{} action(s)\t{}",
                    group.name,
                    group.action_count(),
                    group.description
                );
            }
            Ok(true)
        }
        GroupsCommand::Show { name } => match global.get(&name) {
            Some(group) => {
                println!("{}", serde_json::to_string_pretty(&group)?);
                Ok(true)
            }
            None => {
                error!(group = %name, "action group not found");
                Ok(false)
            }
        },
        GroupsCommand::Delete { name } => {
            let deleted = global.delete(&name)?;
            if !deleted {
                error!(group = %name, "action group not found");
            }
            Ok(deleted)
        }
        GroupsCommand::Import { file, overwrite } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse JSON from {}", file.display()))?;
            let group = global.import_group(data, overwrite)?;
            println!("Imported action group '{}'", group.name);
            Ok(true)
        }
    }
}
