//! FlowPilot CLI - browser-flow automation runner and scheduler

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use flowpilot::engine::{AutomationEngine, MockEngine, RobotEngine};
use flowpilot::error::FixSuggestion;
use flowpilot::flow::Browser;
use flowpilot::scheduler::FlowScheduler;
use flowpilot::status::StatusKind;
use flowpilot::store::FlowStore;
use flowpilot::{parser, FlowError, FlowExecutor};

#[derive(Parser)]
#[command(name = "flowpilot")]
#[command(about = "FlowPilot - browser-flow automation runner and scheduler")]
#[command(version)]
struct Cli {
    /// Output directory for scripts and engine artifacts
    #[arg(long, global = true, default_value = "logs")]
    output_dir: PathBuf,

    /// Flows directory
    #[arg(long, global = true, default_value = "flows")]
    flows_dir: PathBuf,

    /// Shared keyword resource referenced by compiled scripts
    #[arg(long, global = true, default_value = "resources/keywords.robot")]
    resource: PathBuf,

    /// Automation engine command (or "mock"); FLOWPILOT_ENGINE overrides
    /// the default
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Scheduler registry file
    #[arg(long, global = true, default_value = "db/scheduled_tasks.json")]
    registry: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a flow file
    Run {
        /// Path to a .json/.yaml flow file
        file: String,
    },

    /// Validate a flow file (parse only, no execution)
    Validate {
        file: String,
    },

    /// Compile a flow to a script without running it
    Compile {
        file: String,
    },

    /// Initialize a workspace (flows/, logs/, resources/)
    Init {
        /// Workspace directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Manage stored flows
    Flow {
        #[command(subcommand)]
        command: FlowCommands,
    },

    /// Manage scheduled tasks
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// List stored flows, newest first
    List,
    /// Create and save an empty flow
    New {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Show details of a stored flow
    Show {
        file: String,
    },
    /// Duplicate a stored flow
    Copy {
        file: String,
        #[arg(long)]
        new_name: Option<String>,
    },
    /// Delete a stored flow
    Delete {
        file: String,
    },
    /// Import a flow file into the store
    Import {
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Export a stored flow
    Export {
        file: String,
        dest: PathBuf,
    },
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// Add a scheduled task
    Add {
        task_id: String,
        flow_file: String,
        /// Trigger kind: cron, interval or date
        #[arg(long)]
        kind: String,
        /// Trigger params as JSON, e.g. '{"minutes": 5}'
        #[arg(long, default_value = "{}")]
        params: String,
        /// Create the task disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a scheduled task
    Remove {
        task_id: String,
    },
    /// List scheduled tasks
    List,
    /// Enable a task
    Enable {
        task_id: String,
    },
    /// Disable a task (metadata retained)
    Disable {
        task_id: String,
    },
    /// Run the scheduler in the foreground until interrupted
    Serve,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run { file } => run_flow(&cli, file).await,
        Commands::Validate { file } => validate_flow(file),
        Commands::Compile { file } => compile_flow(&cli, file),
        Commands::Init { path } => init_workspace(path),
        Commands::Flow { command } => flow_command(&cli, command),
        Commands::Schedule { command } => schedule_command(&cli, command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "Error:".red().bold());
        let suggestion = e
            .downcast_ref::<FlowError>()
            .and_then(|fe| fe.fix_suggestion());
        if let Some(suggestion) = suggestion {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

/// Resolve the engine: `--engine`, then FLOWPILOT_ENGINE, then `robot`
fn build_engine(cli: &Cli) -> Arc<dyn AutomationEngine> {
    let name = cli
        .engine
        .clone()
        .or_else(|| std::env::var("FLOWPILOT_ENGINE").ok())
        .unwrap_or_else(|| "robot".to_string());

    if name.eq_ignore_ascii_case("mock") {
        return Arc::new(MockEngine::new());
    }

    let engine = RobotEngine::new(&name);
    if !engine.check_available() {
        eprintln!(
            "{} engine '{}' did not respond to --version; the run may fail",
            "Warning:".yellow(),
            name
        );
    }
    Arc::new(engine)
}

async fn run_flow(cli: &Cli, file: &str) -> Result<()> {
    let executor = FlowExecutor::new(build_engine(cli), &cli.output_dir, &cli.resource);
    executor.status().on_status(print_status);

    let result = executor.execute_from_file(file).await?;

    println!(
        "{} {} passed, {} failed ({} total) in {:.2}s",
        if result.success { "✓".green() } else { "✗".red() },
        result.statistics.passed,
        result.statistics.failed,
        result.statistics.total,
        result.execution_time_seconds,
    );
    if let Some(log) = &result.artifacts.log {
        println!("  Log: {}", log.display());
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_flow(file: &str) -> Result<()> {
    let flow = parser::parse_from_file(file)?;
    println!("{} Flow '{}' is valid", "✓".green(), flow.flow_name);
    println!("  Browser: {}", flow.browser.as_str());
    println!("  Steps: {}", flow.steps.len());
    Ok(())
}

fn compile_flow(cli: &Cli, file: &str) -> Result<()> {
    let flow = parser::parse_from_file(file)?;
    let compiler = flowpilot::Compiler::new(&cli.output_dir, &cli.resource);
    let status = flowpilot::StatusChannel::new();
    status.on_status(print_status);

    let script = compiler.compile(&flow, &status);
    std::fs::create_dir_all(&cli.output_dir)?;
    std::fs::write(&script.path, &script.text)?;
    println!("{} Compiled to {}", "✓".green(), script.path.display());
    Ok(())
}

fn init_workspace(path: &std::path::Path) -> Result<()> {
    let result = flowpilot::init::init_workspace(path)?;
    println!(
        "{} Initialized workspace at {}",
        "✓".green(),
        result.workspace_dir
    );
    for file in result.files_created {
        println!("  created {file}");
    }
    Ok(())
}

fn flow_command(cli: &Cli, command: &FlowCommands) -> Result<()> {
    let store = FlowStore::new(&cli.flows_dir);

    match command {
        FlowCommands::List => {
            let flows = store.list_flows();
            if flows.is_empty() {
                println!("No flows in {}", cli.flows_dir.display());
                return Ok(());
            }
            for flow in flows {
                println!(
                    "{}  {} ({} steps, {})",
                    flow.file_name.cyan(),
                    flow.flow_name,
                    flow.steps_count,
                    flow.browser.as_str(),
                );
            }
        }
        FlowCommands::New { name, description } => {
            let mut flow = store.create_flow(name, description, Browser::Chrome);
            let path = store.save_flow(&mut flow, None)?;
            println!("{} Created {}", "✓".green(), path.display());
        }
        FlowCommands::Show { file } => {
            let info = store.flow_info(file)?;
            println!(
                "{} ({})",
                info.summary.flow_name.cyan().bold(),
                info.summary.file_path.display()
            );
            if !info.summary.description.is_empty() {
                println!("  {}", info.summary.description);
            }
            println!("  Browser: {}", info.summary.browser.as_str());
            println!("  Steps:");
            for (idx, step) in info.flow.steps.iter().enumerate() {
                println!("    {}. {}", idx + 1, step.action);
            }
        }
        FlowCommands::Copy { file, new_name } => {
            let path = store.duplicate_flow(file, new_name.as_deref())?;
            println!("{} Copied to {}", "✓".green(), path.display());
        }
        FlowCommands::Delete { file } => {
            if store.delete_flow(file) {
                println!("{} Deleted {file}", "✓".green());
            } else {
                anyhow::bail!("flow '{file}' not found");
            }
        }
        FlowCommands::Import { path, name } => {
            let dest = store.import_flow(path, name.as_deref())?;
            println!("{} Imported to {}", "✓".green(), dest.display());
        }
        FlowCommands::Export { file, dest } => {
            store.export_flow(file, dest)?;
            println!("{} Exported to {}", "✓".green(), dest.display());
        }
    }
    Ok(())
}

async fn schedule_command(cli: &Cli, command: &ScheduleCommands) -> Result<()> {
    let scheduler = FlowScheduler::new(
        build_engine(cli),
        &cli.output_dir,
        &cli.resource,
        &cli.registry,
    );

    match command {
        ScheduleCommands::Add {
            task_id,
            flow_file,
            kind,
            params,
            disabled,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(params).context("trigger params must be JSON")?;
            if scheduler.add_task(task_id, flow_file, kind, params, !disabled)? {
                println!("{} Task '{task_id}' added", "✓".green());
            } else {
                anyhow::bail!("task '{task_id}' already exists");
            }
        }
        ScheduleCommands::Remove { task_id } => {
            scheduler.remove_task(task_id);
            println!("{} Task '{task_id}' removed", "✓".green());
        }
        ScheduleCommands::List => {
            let tasks = scheduler.get_tasks();
            if tasks.is_empty() {
                println!("No scheduled tasks");
                return Ok(());
            }
            for task in tasks {
                println!(
                    "{}  {} [{}{}]  last: {}  next: {}",
                    task.task_id.cyan(),
                    task.flow_config_path,
                    task.trigger_kind,
                    if task.enabled { "" } else { ", disabled" },
                    task.last_run.as_deref().unwrap_or("-"),
                    task.next_run.as_deref().unwrap_or("-"),
                );
            }
        }
        ScheduleCommands::Enable { task_id } => {
            if !scheduler.enable_task(task_id)? {
                anyhow::bail!("task '{task_id}' not found");
            }
            println!("{} Task '{task_id}' enabled", "✓".green());
        }
        ScheduleCommands::Disable { task_id } => {
            if !scheduler.disable_task(task_id)? {
                anyhow::bail!("task '{task_id}' not found");
            }
            println!("{} Task '{task_id}' disabled", "✓".green());
        }
        ScheduleCommands::Serve => {
            scheduler.set_result_callback(|task_id, result| {
                let mark = if result.success {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "{mark} task {task_id}: {} passed, {} failed",
                    result.statistics.passed, result.statistics.failed
                );
            });
            scheduler.start();
            println!(
                "Scheduler running with {} task(s); press Ctrl-C to stop",
                scheduler.get_tasks().iter().filter(|t| t.enabled).count()
            );
            tokio::signal::ctrl_c().await?;
            scheduler.stop();
        }
    }
    Ok(())
}

fn print_status(kind: StatusKind, message: &str) {
    match kind {
        StatusKind::Info => println!("{} {message}", "→".cyan()),
        StatusKind::Success => println!("{} {message}", "✓".green()),
        StatusKind::Error => eprintln!("{} {message}", "✗".red()),
        StatusKind::Warning => eprintln!("{} {message}", "!".yellow()),
    }
}
