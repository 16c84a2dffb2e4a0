use crate::ingress::DEFAULT_PORT;
use crate::simulator::memory::DEFAULT_MEMORY_SIZE;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "tinyrv.toml";
pub const DEFAULT_PROGRAM_SIZE: usize = 10_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {CONFIG_FILE}: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("No program file specified")]
    NoFile,
}

/// Settings as they come from the command line or the config file. Anything left out falls
/// back to the other source, and then to the defaults in [`Config`].
#[derive(Parser, Deserialize, Debug, Default)]
#[command(author, version, about)]
#[clap(disable_help_flag = true)]
#[serde(default, rename_all = "kebab-case")]
pub struct OptionalConfig {
    #[clap(long, action = clap::ArgAction::HelpLong)]
    #[serde(skip)]
    help: Option<bool>,

    /// Memory size in bytes. Defaults to 40000000
    #[arg(short, long)]
    pub memory_size: Option<usize>,

    /// Maximum number of instructions a program may have. Defaults to 10000000
    #[arg(long)]
    pub program_size: Option<usize>,

    /// Stop after executing this many instructions. Runs forever if not set
    #[arg(short, long)]
    pub lifetime: Option<u64>,

    /// UDP port the GPIO input listens on. Defaults to 50000
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Don't listen for GPIO input
    #[arg(long)]
    pub no_ingress: bool,

    /// Run to completion without the debugger
    #[arg(long)]
    pub headless: bool,

    /// File with the breakpoint line numbers, as written by the compiler
    #[arg(short, long)]
    pub breakpoints: Option<PathBuf>,

    /// Sets a breakpoint on a line. May be given more than once
    #[arg(long = "break", value_name = "LINE")]
    #[serde(rename = "break")]
    pub breaks: Vec<usize>,

    /// Source listing shown next to the program lines
    #[arg(long)]
    pub listing: Option<PathBuf>,

    /// Debugger refresh interval in milliseconds. Defaults to 50
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Number of program lines the debugger shows. Defaults to 10
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Prints the final state of the machine after execution
    #[arg(long)]
    pub print_state: bool,

    /// The program file to execute
    pub file: Option<PathBuf>,
}

impl OptionalConfig {
    pub fn get_args() -> Self {
        Self::parse()
    }

    /// Reads the config file from the working directory, if there is one
    pub fn get_toml() -> Result<Self, ConfigError> {
        match std::fs::read_to_string(CONFIG_FILE) {
            Ok(config) => Self::from_toml(&config),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_toml(config: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config)?)
    }

    /// Fields set in `self` win over the ones in `rhs`
    pub fn merge(self, rhs: Self) -> Self {
        let mut breaks = self.breaks;
        breaks.extend(rhs.breaks);

        Self {
            help: self.help.or(rhs.help),
            memory_size: self.memory_size.or(rhs.memory_size),
            program_size: self.program_size.or(rhs.program_size),
            lifetime: self.lifetime.or(rhs.lifetime),
            port: self.port.or(rhs.port),
            no_ingress: self.no_ingress || rhs.no_ingress,
            headless: self.headless || rhs.headless,
            breakpoints: self.breakpoints.or(rhs.breakpoints),
            breaks,
            listing: self.listing.or(rhs.listing),
            refresh_ms: self.refresh_ms.or(rhs.refresh_ms),
            window: self.window.or(rhs.window),
            print_state: self.print_state || rhs.print_state,
            file: self.file.or(rhs.file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub memory_size: usize,
    pub program_size: usize,
    pub lifetime: Option<u64>,
    /// `None` when the ingress is disabled
    pub port: Option<u16>,
    pub headless: bool,
    pub breakpoints: Option<PathBuf>,
    pub breaks: Vec<usize>,
    pub listing: Option<PathBuf>,
    pub refresh: Duration,
    pub window: usize,
    pub print_state: bool,
    pub file: PathBuf,
}

impl TryFrom<OptionalConfig> for Config {
    type Error = ConfigError;

    fn try_from(config: OptionalConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            memory_size: config.memory_size.unwrap_or(DEFAULT_MEMORY_SIZE),
            program_size: config.program_size.unwrap_or(DEFAULT_PROGRAM_SIZE),
            lifetime: config.lifetime,
            port: (!config.no_ingress).then(|| config.port.unwrap_or(DEFAULT_PORT)),
            headless: config.headless,
            breakpoints: config.breakpoints,
            breaks: config.breaks,
            listing: config.listing,
            refresh: Duration::from_millis(config.refresh_ms.unwrap_or(50)),
            window: config.window.unwrap_or(10),
            print_state: config.print_state,
            file: config.file.ok_or(ConfigError::NoFile)?,
        })
    }
}

impl Config {
    /// Command line arguments, then `tinyrv.toml`, then defaults
    pub fn get() -> Result<Self, ConfigError> {
        OptionalConfig::get_args()
            .merge(OptionalConfig::get_toml()?)
            .try_into()
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}
