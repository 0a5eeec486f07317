// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

use resxforge::app_config::{Config, LogLevel};
use resxforge::app_controller::{Controller, RunOptions};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for resxforge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ResxForge - translate .resx resources with a local model
///
/// Walks a resources directory, translates every base .resx file into each
/// target language through Ollama and writes `<name>.<lang>.resx` beside it.
#[derive(Parser, Debug)]
#[command(name = "resxforge")]
#[command(version)]
#[command(about = "Translate .resx UI resources through a local Ollama model")]
#[command(long_about = "ResxForge translates .resx resource files into many languages using a local Ollama model.

EXAMPLES:
    resxforge                                  # Translate everything with default config
    resxforge -l km th                         # Only Khmer and Thai
    resxforge -p Home Login                    # Only Home.resx and Login.resx
    resxforge -d Admin                         # Only the Admin sub-directory
    resxforge -m 4b                            # Use translategemma:4b
    resxforge -f --audit-leakage               # Retranslate, purge leaked cache entries
    resxforge completions bash > resxforge.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. glossary.json and echo.json in the config directory
    are reloaded while the run is in progress.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model variant (a bare size such as `4b` keeps the model family)
    #[arg(short, long)]
    model: Option<String>,

    /// Target language codes to translate (default: all configured)
    #[arg(short, long, num_args = 1..)]
    languages: Vec<String>,

    /// Base file names (without extension) to translate
    #[arg(short, long, num_args = 1..)]
    pages: Vec<String>,

    /// Sub-directories of the resources directory to process
    #[arg(short, long, num_args = 1..)]
    dirs: Vec<String>,

    /// Ignore cached translations and translate again
    #[arg(short, long)]
    force_overwrite: bool,

    /// Remove cached translations that contain Latin script
    #[arg(long)]
    audit_leakage: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "\x1B[1;31m"),
            Level::Warn => ("🚧 ", "\x1B[1;33m"),
            Level::Info => (" ", "\x1B[1;32m"),
            Level::Debug => ("🔍 ", "\x1B[1;36m"),
            Level::Trace => ("📋 ", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let (emoji, colour) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                colour, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded; the level is raised or lowered after
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "resxforge", &mut std::io::stdout());
        return Ok(());
    }

    let cli_level: Option<LogLevel> = cli.log_level.clone().map(Into::into);
    if let Some(level) = &cli_level {
        log::set_max_level(level_filter(level));
    }

    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(level) = cli_level {
        config.log_level = level;
    }
    log::set_max_level(level_filter(&config.log_level));

    let options = RunOptions {
        model: cli.model,
        languages: cli.languages,
        pages: cli.pages,
        dirs: cli.dirs,
        force_overwrite: cli.force_overwrite,
        audit_leakage: cli.audit_leakage,
    };

    let controller = Controller::with_config(config, options)?;
    match controller.run().await {
        Ok(report) => {
            if report.interrupted {
                warn!("Run interrupted; {} file(s) were written before stopping.", report.written.len());
            } else {
                info!("🏁 Done.");
            }
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
