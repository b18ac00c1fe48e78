//! Live Editor Command Line Interface
//!
//! Explore a running server's reflected objects through its reflection bridge.
//!
//! # Usage
//!
//! ```bash
//! # Dump the first player state
//! live_editor dump PalPlayerState
//!
//! # Drill by path, machine-readable
//! live_editor --format json dump PalPlayerState --index 0 --path PlayerId
//!
//! # List callable functions matching a filter
//! live_editor functions PalPlayerCharacter --filter Heal
//!
//! # Re-run auto-discovery and show the role map
//! live_editor probe --force
//!
//! # Interactive explorer
//! live_editor repl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use live_editor::bridge::{HttpBridge, ProbeResult, ReflectionBridge};
use live_editor::config::{normalize_bridge_url, parse_max_items, ExplorerConfig};
use live_editor::explorer::classify::ValueCategory;
use live_editor::explorer::render::{mode_label, CrumbCell, FunctionLine, PropertyLine, StatusTone};
use live_editor::explorer::{render, DumpMode, Explorer, ObjectPath, Panel, PanelBody};
use live_editor::{DiscoveryStatus, ExplorerError, JsonFileProbeStore, Prober};

const DEFAULT_LOG_FILTER: &str = "live_editor=info,reflection_bridge=info";

#[derive(Parser)]
#[command(name = "live_editor")]
#[command(version = "0.1.0")]
#[command(about = "Explore a live server's reflected object graph through its reflection bridge")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Reflection bridge base URL
    #[arg(long, global = true, env = "LIVE_EDITOR_URL")]
    url: Option<String>,

    /// Maximum items per dump
    #[arg(long, global = true, env = "LIVE_EDITOR_MAX_ITEMS")]
    max_items: Option<String>,

    /// Local file keeping the last good discovery result
    #[arg(long, global = true, env = "LIVE_EDITOR_PROBE_CACHE")]
    probe_cache: Option<PathBuf>,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the properties of an object
    Dump {
        /// Root class name, e.g. PalPlayerState
        class: String,

        /// Instance index within the class
        #[arg(short, long, default_value_t = 0)]
        index: u32,

        /// Dotted property path below the instance
        #[arg(short, long, default_value = "")]
        path: String,
    },

    /// List the callable functions of an object
    Functions {
        /// Root class name
        class: String,

        /// Instance index within the class
        #[arg(short, long, default_value_t = 0)]
        index: u32,

        /// Dotted property path below the instance
        #[arg(short, long, default_value = "")]
        path: String,

        /// Case-insensitive substring of the function name
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Run auto-discovery and show the resulting role map
    Probe {
        /// Re-run even if the bridge has a result cached
        #[arg(long)]
        force: bool,
    },

    /// Show the saved discovery role map
    Roles,

    /// Interactive explorer
    Repl,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ExplorerConfig::from_env()?;
    if let Some(url) = &cli.url {
        config.bridge_url = normalize_bridge_url(url).context("--url")?;
    }
    if let Some(max) = &cli.max_items {
        config.max_items = parse_max_items(max).context("--max-items")?;
    }
    if let Some(path) = cli.probe_cache {
        config.probe_cache = Some(path);
    }

    let app = App::connect(config, cli.format)?;
    match cli.command {
        Commands::Dump { class, index, path } => {
            let target = ObjectPath::parse(&class, index, &path);
            app.open(target, DumpMode::Properties).await
        }
        Commands::Functions {
            class,
            index,
            path,
            filter,
        } => {
            let target = ObjectPath::parse(&class, index, &path);
            app.open(target, DumpMode::functions(filter.as_deref())).await
        }
        Commands::Probe { force } => {
            let result = app.prober.probe(force).await?;
            app.print_roles(&result);
            Ok(())
        }
        Commands::Roles => {
            let Some(result) = app.prober.load_persisted().await else {
                bail!("No discovery result saved yet; run `live_editor probe`");
            };
            app.print_roles(&result);
            Ok(())
        }
        Commands::Repl => app.repl().await,
    }
}

// =============================================================================
// APP
// =============================================================================

struct App {
    config: ExplorerConfig,
    explorer: Explorer,
    prober: Prober,
    format: OutputFormat,
}

impl App {
    fn connect(config: ExplorerConfig, format: OutputFormat) -> Result<Self> {
        let bridge: Arc<dyn ReflectionBridge> = Arc::new(
            HttpBridge::with_timeout(&config.bridge_url, config.timeout)
                .context("failed to build bridge client")?,
        );

        let mut prober = Prober::new(bridge.clone());
        if let Some(path) = &config.probe_cache {
            prober = prober.with_store(Arc::new(JsonFileProbeStore::new(path)));
        }

        Ok(Self {
            explorer: Explorer::new(bridge, config.max_items),
            prober,
            config,
            format,
        })
    }

    /// One-shot dump: print the panel, fail the process on error.
    async fn open(&self, path: ObjectPath, mode: DumpMode) -> Result<()> {
        self.explorer.open(path, mode).await?;
        self.print_panel();
        Ok(())
    }

    fn panel(&self) -> Panel {
        render(self.explorer.view().as_ref(), &self.explorer.status())
    }

    fn print_panel(&self) {
        let panel = self.panel();
        match self.format {
            OutputFormat::Json => print_json(&panel),
            OutputFormat::Pretty => print_panel_pretty(&panel),
        }
    }

    fn print_roles(&self, result: &ProbeResult) {
        let status = self.prober.status();
        let detail = self.prober.status_detail();
        match self.format {
            OutputFormat::Json => print_json(&json!({
                "status": status,
                "summary": status.to_string(),
                "detail": detail,
                "last_failure": self.prober.last_failure().map(|e| e.to_string()),
                "result": result,
            })),
            OutputFormat::Pretty => print_roles_pretty(result, status, &detail),
        }
    }

    // ── REPL ──────────────────────────────────────────────────

    async fn repl(&self) -> Result<()> {
        self.prober.load_persisted().await;
        println!(
            "{} {} {}",
            "Live Editor".bold(),
            self.config.bridge_url.dimmed(),
            status_chip(self.prober.status(), &self.prober.status_detail())
        );
        println!("{}", "Type `help` for commands.".dimmed());
        print_presets(&self.config);

        let mut editor = DefaultEditor::new().context("failed to start line editor")?;
        loop {
            let line = match editor.readline(&self.prompt()) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e).context("failed to read input"),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Err(e) = editor.add_history_entry(line) {
                debug!(error = %e, "failed to record history entry");
            }

            match ReplCommand::parse(line) {
                Ok(ReplCommand::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(msg) => eprintln!("{}", msg.red()),
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.explorer.view() {
            Some(view) => format!("{} {}> ", mode_label(&view.mode), view.path),
            None => "live> ".to_string(),
        }
    }

    async fn execute(&self, command: ReplCommand) {
        let result = match command {
            ReplCommand::Open { class, index, path } => {
                self.explorer.submit(&class, index, &path).await
            }
            ReplCommand::Preset(n) => match self.config.preset(n) {
                Some(class) => self.explorer.submit(class, 0, "").await,
                None => {
                    eprintln!("{}", format!("No preset {n}").red());
                    print_presets(&self.config);
                    return;
                }
            },
            ReplCommand::Drill(field) => self.explorer.drill(&field).await,
            ReplCommand::Crumb(index) => self.explorer.jump(index).await,
            ReplCommand::Up => self.explorer.up().await,
            ReplCommand::Funcs(filter) => {
                self.explorer
                    .switch_mode(DumpMode::functions(filter.as_deref()))
                    .await
            }
            ReplCommand::Props => self.explorer.switch_mode(DumpMode::Properties).await,
            ReplCommand::Refresh => self.explorer.refresh().await,
            ReplCommand::Probe { force } => {
                println!("{}", DiscoveryStatus::Pending.to_string().cyan());
                match self.prober.probe(force).await {
                    Ok(result) => self.print_roles(&result),
                    Err(e) => {
                        eprintln!("{}: {}", "probe failed".red().bold(), e);
                        println!(
                            "{}",
                            status_chip(self.prober.status(), &self.prober.status_detail())
                        );
                    }
                }
                return;
            }
            ReplCommand::Roles => {
                match self.prober.cached() {
                    Some(result) => self.print_roles(&result),
                    None => println!(
                        "{}",
                        status_chip(self.prober.status(), &self.prober.status_detail())
                    ),
                }
                return;
            }
            ReplCommand::Help => {
                print_help();
                return;
            }
            ReplCommand::Quit => return,
        };

        match result {
            // Rejected before any request; the panel is unchanged.
            Err(e) if !matches!(e, ExplorerError::Bridge(_)) => {
                eprintln!("{}", e.to_string().red())
            }
            _ => self.print_panel(),
        }
    }
}

// =============================================================================
// REPL COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Open {
        class: String,
        index: u32,
        path: String,
    },
    Preset(usize),
    Drill(String),
    Crumb(usize),
    Up,
    Funcs(Option<String>),
    Props,
    Refresh,
    Probe {
        force: bool,
    },
    Roles,
    Help,
    Quit,
}

impl ReplCommand {
    fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("Empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();

        let number = |arg: Option<&&str>, what: &str| -> std::result::Result<usize, String> {
            let raw = arg.ok_or_else(|| format!("Usage: {verb} <{what}>"))?;
            raw.parse()
                .map_err(|_| format!("'{raw}' is not a valid {what}"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "open" | "o" => {
                let class = rest
                    .first()
                    .ok_or_else(|| "Usage: open <Class> [index] [path]".to_string())?;
                let index = match rest.get(1) {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| format!("'{raw}' is not a valid instance index"))?,
                    None => 0,
                };
                Ok(Self::Open {
                    class: class.to_string(),
                    index,
                    path: rest.get(2).copied().unwrap_or_default().to_string(),
                })
            }
            "preset" | "p" => Ok(Self::Preset(number(rest.first(), "preset number")?)),
            "drill" | "d" | "cd" => match rest.first() {
                Some(field) => Ok(Self::Drill(field.to_string())),
                None => Err("Usage: drill <field>".to_string()),
            },
            "crumb" | "c" => Ok(Self::Crumb(number(rest.first(), "crumb index")?)),
            "up" | ".." => Ok(Self::Up),
            "funcs" | "functions" | "f" => Ok(Self::Funcs(
                Some(rest.join(" ")).filter(|f| !f.is_empty()),
            )),
            "props" | "properties" => Ok(Self::Props),
            "refresh" | "r" => Ok(Self::Refresh),
            "probe" => Ok(Self::Probe {
                force: rest.first() == Some(&"force"),
            }),
            "roles" => Ok(Self::Roles),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{other}'. Type `help` for commands.")),
        }
    }
}

fn print_help() {
    let rows = [
        (
            "open <Class> [idx] [path]",
            "dump an object by class, index and dotted path",
        ),
        ("preset <n>", "open a preset root class"),
        ("drill <field>", "descend into a struct/object property"),
        ("crumb <i>", "jump back to breadcrumb i (0 = root)"),
        ("up", "go up one level"),
        ("funcs [filter]", "list functions at the current path"),
        ("props", "list properties at the current path"),
        ("refresh", "re-dump the current path"),
        ("probe [force]", "run auto-discovery"),
        ("roles", "show discovered role paths"),
        ("quit", "leave"),
    ];
    for (command, description) in rows {
        println!("  {:<28} {}", command.cyan(), description.dimmed());
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
    }
}

fn print_presets(config: &ExplorerConfig) {
    let presets = config
        .presets
        .iter()
        .enumerate()
        .map(|(i, class)| format!("{} {}", format!("[{}]", i + 1).cyan(), class))
        .collect::<Vec<_>>()
        .join("  ");
    if !presets.is_empty() {
        println!("Presets: {presets}");
    }
}

fn print_panel_pretty(panel: &Panel) {
    let status = match panel.tone {
        StatusTone::Idle => panel.status.dimmed(),
        StatusTone::Loading => panel.status.yellow(),
        StatusTone::Ok => panel.status.green(),
        StatusTone::Error => panel.status.red().bold(),
    };
    match &panel.fetched_at {
        Some(at) => println!("{} {}", status, format!("({at})").dimmed()),
        None => println!("{status}"),
    }

    if !panel.breadcrumb.is_empty() {
        let separator = " > ".dimmed().to_string();
        let trail = panel
            .breadcrumb
            .iter()
            .map(crumb_cell)
            .collect::<Vec<_>>()
            .join(separator.as_str());
        println!("{trail}");
    }

    if let Some(info) = &panel.info {
        println!(
            "{}",
            format!("{}  {}  {}", info.class_path, info.instances, info.shown).dimmed()
        );
    }

    match &panel.body {
        PanelBody::Ready => {}
        PanelBody::Properties(lines) => lines.iter().for_each(print_property),
        PanelBody::Functions(lines) => lines.iter().for_each(print_function),
        PanelBody::Empty(message) => println!("{}", message.italic().dimmed()),
        PanelBody::Error(message) => println!("{}", message.red()),
    }
}

fn crumb_cell(cell: &CrumbCell) -> String {
    match cell.target {
        Some(i) => format!("{}{}", format!("[{i}]").dimmed(), cell.label.cyan()),
        None => cell.label.bold().to_string(),
    }
}

fn print_property(line: &PropertyLine) {
    let value = match line.category {
        ValueCategory::Numeric => line.value.cyan(),
        ValueCategory::BoolTrue => line.value.green(),
        ValueCategory::BoolFalse => line.value.red(),
        ValueCategory::Text => line.value.yellow(),
        ValueCategory::Error => line.value.red().bold(),
        ValueCategory::Opaque => line.value.normal(),
    };
    let name = if line.drillable {
        format!("{:<32}", format!("{} >", line.name)).blue().bold()
    } else {
        format!("{:<32}", line.name).normal()
    };
    println!(
        "{} {} {} {}",
        line.offset.dimmed(),
        format!("{:<22}", line.declared_type).magenta(),
        name,
        value
    );
}

fn print_function(line: &FunctionLine) {
    let signature = if line.error {
        line.signature.red()
    } else {
        line.signature.normal()
    };
    if line.flags.is_empty() {
        println!("{signature}");
    } else {
        println!("{}  {}", signature, line.flags.dimmed());
    }
}

fn status_chip(status: DiscoveryStatus, detail: &str) -> String {
    let chip = if status.is_failure() {
        status.to_string().red().bold()
    } else {
        status.to_string().cyan().bold()
    };
    format!("{}  {}", chip, detail.dimmed())
}

fn print_roles_pretty(result: &ProbeResult, status: DiscoveryStatus, detail: &str) {
    println!("{}", status_chip(status, detail));
    if let Some(ts) = &result.timestamp {
        println!("{}", format!("Probed at {ts}").dimmed());
    }
    for (role, path) in &result.properties {
        match path.as_path() {
            Some(path) => println!("  {:<24} {}", role, path.green()),
            None => println!("  {:<24} {}", role, "NOT_FOUND".red()),
        }
    }
}
