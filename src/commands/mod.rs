use std::{fmt::Display, fs, path::PathBuf};

use clap::{command, Parser, Subcommand};
use eyre::Context;
use log::LevelFilter;
use sitelog::logging::{Bridge, ConsoleWriter, Level, Logger, Route};

use crate::config::{ConfigManager, LocalConfigManager};

mod emit;
mod history;
mod info;

#[derive(Subcommand, Debug)]
pub enum SitelogCmd {
    Emit(emit::Cmd),

    History(history::Cmd),

    Info(info::Cmd),
}

impl Display for SitelogCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SitelogCmd::Emit(cmd) => write!(f, "emit {} {}", cmd.severity, cmd.sink),
            SitelogCmd::History(_cmd) => write!(f, "history"),
            SitelogCmd::Info(_cmd) => write!(f, "info"),
        }
    }
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Write leveled, templated log lines to the console, files or SQLite.", long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    #[arg(
        global = true,
        long,
        help = "Directory holding the log file. Defaults to the sitelog data directory.",
        display_order = 0
    )]
    pub dir: Option<PathBuf>,

    #[arg(
        global = true,
        long,
        help = "Name of the log file, must end in .log.",
        display_order = 0
    )]
    pub file: Option<String>,

    #[arg(
        global = true,
        long,
        default_value_t = Level::All,
        help = "Minimum level written: all, log, info, warn, error, fatal or none.",
        display_order = 0
    )]
    pub level: Level,

    #[arg(global = true, long, help = "Template for regular lines.", display_order = 1)]
    pub format: Option<String>,

    #[arg(global = true, long, help = "Template for lines reporting an error.", display_order = 1)]
    pub error_format: Option<String>,

    #[arg(
        global = true,
        long,
        help = "Encoding of file output: utf8, utf16le, latin1 or ascii.",
        display_order = 1
    )]
    pub encoding: Option<String>,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Write verbose messages to stderr for debugging.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: SitelogCmd,
}

impl Cli {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5_u8..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn log_dir(&self, config: &impl ConfigManager) -> eyre::Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }

        let dir = PathBuf::from(config.get_log_dir()?);
        fs::create_dir_all(&dir)
            .wrap_err_with(|| format!("Failed creating log directory {}", dir.display()))?;
        Ok(dir)
    }

    /// The logger described by the global options.
    pub fn logger(&self, config: &impl ConfigManager) -> eyre::Result<Logger> {
        let mut builder = Logger::builder()
            .with_dir(self.log_dir(config)?)
            .with_level(self.level);

        if let Some(file) = &self.file {
            builder = builder.with_file(file);
        }
        if let Some(format) = &self.format {
            builder = builder.with_format(format);
        }
        if let Some(error_format) = &self.error_format {
            builder = builder.with_error_format(error_format);
        }
        if let Some(encoding) = &self.encoding {
            builder = builder.with_encoding(encoding);
        }

        builder.build().context("Invalid logger configuration")
    }

    fn setup_logging(&self, config: &LocalConfigManager) -> eyre::Result<()> {
        if self.verbose == 0 {
            return Ok(());
        }

        let diagnostics = Logger::builder()
            .with_dir(self.log_dir(config)?)
            .with_format("%{CA}%{T}%{CF} %{F}: %{R}")
            .with_console(ConsoleWriter::stderr())
            .build()
            .context("Failed setting up diagnostics")?;

        Bridge::new(diagnostics, self.log_filter(), Route::Console).init()
    }

    pub fn run(self) -> eyre::Result<()> {
        let config = LocalConfigManager::new();
        self.setup_logging(&config)?;

        log::info!("sitelog starting up");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        log::info!("running command {}", &self.cmd);
        log::trace!("log level: {}", self.log_filter());

        let result = runtime.block_on(self.invoke_sub_command(config));

        if let Err(msg) = &result {
            log::error!("failed running command {}, error={} cause={}", &self.cmd, msg, msg.root_cause());
        }

        result
    }

    async fn invoke_sub_command<T>(&self, config: T) -> eyre::Result<()>
    where
        T: ConfigManager,
    {
        match &self.cmd {
            SitelogCmd::Emit(emit) => emit.run(self, &config).await,
            SitelogCmd::History(history) => history.run(&config).await,
            SitelogCmd::Info(info) => info.run(self, &config).await,
        }
    }
}
