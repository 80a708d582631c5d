use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use clap::Parser;
use thiserror::Error;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Ubuntu Chromium/63.0.3239.84 Chrome/63.0.3239.84 Safari/537.36";

/// Generates a clean PDF from an article page,
/// stripping the page header, footer and comment widgets
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Download target, URL of the article
    #[arg(short, long, value_name = "string")]
    pub source: Option<String>,

    /// Output directory, defaults to "~/Downloads/" on macOS
    #[arg(short, long = "output_dir", value_name = "dir")]
    pub output_dir: Option<PathBuf>,

    /// Custom user agent, to get past anti-crawler checks
    /// (a desktop browser signature is used if not given)
    #[arg(short, long = "user_agent", value_name = "string")]
    pub user_agent: Option<String>,

    /// Log every step, including each removed selector
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("Option \"source\" required & has to be url, please provide correct -s option!")]
    InvalidSource,
    #[error("Option \"output dir\" required, please provide -o option!")]
    MissingOutputDir,
    #[error("Output has to be a directory! ({})", .0.display())]
    NotADirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, UsageError>;

/// Host operating system, as far as the output directory default is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {

    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// `~/Downloads` on macOS, nothing anywhere else
    pub fn default_output_dir(self, home: Option<&OsStr>) -> Option<PathBuf> {
        match (self, home) {
            (Platform::MacOs, Some(home)) if !home.is_empty() => {
                Some(Path::new(home).join("Downloads"))
            }
            _ => None,
        }
    }
}

/// Validated run configuration, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: Url,
    pub output_dir: PathBuf,
    pub user_agent: String,
}

impl Config {

    pub fn validate(args: &Args, platform: Platform, home: Option<&OsStr>) -> Result<Self> {

        let source = args
            .source
            .as_deref()
            .and_then(parse_source)
            .ok_or(UsageError::InvalidSource)?;

        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| platform.default_output_dir(home))
            .ok_or(UsageError::MissingOutputDir)?;

        if !output_dir.is_dir() {
            return Err(UsageError::NotADirectory(output_dir));
        }

        let user_agent = args
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self { source, output_dir, user_agent })
    }

    /// Moves the process into the output directory, the PDF is written relative to it
    pub fn enter_output_dir(&self) -> std::io::Result<()> {
        std::env::set_current_dir(&self.output_dir)
    }
}

/// Accepts absolute URLs with a scheme and a non-empty host
pub fn parse_source(source: &str) -> Option<Url> {
    let url = Url::parse(source.trim()).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
