// CLI module - command-line entry point

use crate::config::{app_dir, PathContext, WatchdogConfig, CONFIG_FILE_NAME};
use crate::error::Result;
use crate::logs::{init_logging, LogOptions};
use crate::process::Supervisor;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{error, info};

/// Procwatch - keeps a fixed set of programs running, restarting them whenever they exit
#[derive(Debug, Parser)]
#[command(name = "procwatch")]
#[command(version, about, long_about = None)]
#[command(after_help = "Without --config, procwatch.config.json is searched in the \
application data folder, the current directory and the executable's directory.")]
pub struct Cli {
    /// Config file to use instead of searching for procwatch.config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for procwatch.log (defaults to the application data folder)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Only log to stderr
    #[arg(long, global = true)]
    no_log_file: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start supervising every configured process (default)
    Run,

    /// Write the default config template
    #[command(alias = "defaultconfig")]
    DefaultConfig {
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// File to write (defaults to procwatch.config.json in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the config, then print the resolved processes
    Check,
}

impl Cli {
    /// Parse the process arguments and run the selected command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse_from(normalize_args(std::env::args_os()));
        cli.execute().await
    }

    async fn execute(&self) -> Result<()> {
        let ctx = PathContext::from_env()?;

        match &self.command {
            None | Some(Commands::Run) => self.run_supervisor(&ctx).await,
            Some(Commands::DefaultConfig {
                stdout,
                output,
                force,
            }) => {
                if *stdout {
                    println!("{}", WatchdogConfig::template().to_json_pretty()?);
                    return Ok(());
                }

                let path = output
                    .clone()
                    .unwrap_or_else(|| ctx.current_dir.join(CONFIG_FILE_NAME));
                WatchdogConfig::write_template(&path, *force)?;
                println!("✓ Default config written to {}", path.display());
                Ok(())
            }
            Some(Commands::Check) => {
                self.init_logging(&ctx, false)?;
                let config = WatchdogConfig::load(self.config.as_deref(), &ctx)?;

                println!("✓ Config is valid ({} process(es))", config.processes.len());
                for (index, spec) in config.processes.iter().enumerate() {
                    println!(
                        "  #{} {} {} (cwd: {}{})",
                        index,
                        spec.executable_path.display(),
                        spec.arguments,
                        spec.working_directory.display(),
                        if spec.hide_shell_window { ", hidden" } else { "" }
                    );
                }
                Ok(())
            }
        }
    }

    async fn run_supervisor(&self, ctx: &PathContext) -> Result<()> {
        self.init_logging(ctx, !self.no_log_file)?;

        let config = match WatchdogConfig::load(self.config.as_deref(), ctx) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {}. Exiting...", e);
                return Err(e);
            }
        };

        let supervisor = Supervisor::new(config.processes)?;
        supervisor.run_until_shutdown().await
    }

    fn init_logging(&self, ctx: &PathContext, with_file: bool) -> Result<()> {
        let log_dir = if with_file {
            self.log_dir.clone().or_else(|| app_dir(ctx))
        } else {
            None
        };

        let log_file = init_logging(&LogOptions {
            level: self.log_level.clone(),
            log_dir,
        })?;

        if let Some(path) = log_file {
            info!("Logging to {}", path.display());
        }
        Ok(())
    }
}

/// Accept the Windows-style help spellings `/?` and `/help`
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i > 0 && (arg == "/?" || arg == "/help") {
                OsString::from("--help")
            } else {
                arg
            }
        })
        .collect()
}
