use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use forge_hooks::config::ForgeConfig;
use forge_hooks::hooks::dispatcher;
use forge_hooks::hooks::types::HookOutput;
use forge_hooks::state::{FileHealthBuffer, HealthStore};

#[derive(Parser)]
#[command(
    name = "forge-hooks",
    about = "Policy guards for Claude Code hook events",
    version
)]
struct Cli {
    /// Project root (default: the event's cwd, else the working directory)
    #[arg(long, global = true, env = "FORGE_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the guard chain for a hook event, reading the event JSON from stdin
    Hook {
        /// Event name (PreToolUse, pre-tool-use, pre_tool_use, ...)
        event: String,
    },

    /// Run a single guard, reading the event JSON from stdin
    Guard {
        /// Guard name (sandbox-boundary, git-hygiene, ...)
        name: String,
    },

    /// Inspect or feed the health buffer
    Health {
        #[command(subcommand)]
        subcommand: HealthSubcommand,
    },
}

#[derive(Subcommand)]
enum HealthSubcommand {
    /// Print and clear every buffered message
    Flush,
    /// Append one message
    Append { message: String },
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read hook event from stdin")?;
    Ok(buf)
}

fn print_output(output: &HookOutput) {
    if !output.is_empty() {
        println!("{}", output.stdout);
    }
}

fn run_health(root: Option<&Path>, subcommand: HealthSubcommand) -> anyhow::Result<()> {
    let root = match root {
        Some(r) => r.to_path_buf(),
        None => env::current_dir().context("cannot determine working directory")?,
    };
    let config = ForgeConfig::load(&root);
    let buffer = FileHealthBuffer::new(
        config.health_buffer_path(),
        config.settings.health_buffer_max_lines,
    );
    match subcommand {
        HealthSubcommand::Flush => {
            for line in buffer.flush()?.unwrap_or_default() {
                println!("{}", line);
            }
        }
        HealthSubcommand::Append { message } => {
            if !buffer.append(&message)? {
                eprintln!("health buffer: message dropped (empty or buffer full)");
            }
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli.root.as_deref();
    match cli.command {
        Commands::Hook { event } => {
            let stdin = read_stdin()?;
            print_output(&dispatcher::dispatch_from_cli(&event, &stdin, root)?);
        }
        Commands::Guard { name } => {
            let stdin = read_stdin()?;
            print_output(&dispatcher::guard_from_cli(&name, &stdin, root)?);
        }
        Commands::Health { subcommand } => run_health(root, subcommand)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // stdout carries the decision JSON; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FORGE_HOOKS_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Exit status is always 0; failures are reported on stderr only.
    if let Err(e) = run(cli) {
        eprintln!("forge-hooks: {e:#}");
    }
}
