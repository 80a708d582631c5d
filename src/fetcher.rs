//! Fetch an article, strip the page chrome and print what is left to PDF.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use futures::{FutureExt, try_join};
use thiserror::Error;
use tracing::{debug, error, info};
use crate::browser::{Browser, BrowserError, Launcher, Page, Viewport};
use crate::config::{Args, Config, Platform, UsageError};
use crate::pdf::pdf_filename;

/// Page elements removed before printing
pub const REMOVE_LIST: [&str; 5] = [
    ".layout-header-wrap",
    ".article-fixed-wrap",
    ".layout-footer-wrap",
    ".widget-operation-bottom",
    ".article-comment-block",
];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    UsageError(#[from] UsageError),
    #[error("BrowserError: {0}")]
    BrowserError(#[from] BrowserError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

pub struct Fetcher<L> {
    launcher: L,
}

impl<L: Launcher> Fetcher<L> {

    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    /// Validates the arguments then renders the article,
    /// returns the PDF path relative to the output directory
    pub async fn run(&self, args: &Args) -> Result<PathBuf> {
        info!("Process starting ...");
        let config = self.validate(args)?;
        self.process(&config).await
    }

    /// Builds the configuration and moves into the output directory
    pub fn validate(&self, args: &Args) -> Result<Config> {
        info!("Process validating ...");

        let home = std::env::var_os("HOME");
        let config = Config::validate(args, Platform::current(), home.as_deref())?;

        info!("Output dir: {}", config.output_dir.display());
        config.enter_output_dir()?;

        Ok(config)
    }

    /// The browser is closed on every path once launched.
    /// A rendering error takes precedence over a failure to close.
    pub async fn process(&self, config: &Config) -> Result<PathBuf> {

        let browser = self.launcher.launch(Viewport::DESKTOP).await?;

        let rendered = self.render(&browser, config).await;
        let closed = browser.close().await;

        let path = rendered?;
        closed?;

        Ok(path)
    }

    async fn render(&self, browser: &L::Browser, config: &Config) -> Result<PathBuf> {

        let page = browser.new_page().await?;

        try_join!(
            page.set_user_agent(&config.user_agent),
            page.set_javascript_enabled(true),
            page.set_viewport(Viewport::DESKTOP)
        )?;

        page.navigate(&config.source).await?;
        let title = page.title().await?;

        for selector in REMOVE_LIST {
            let removed = page.remove_all(selector).await?;
            debug!(selector, removed, "removed elements");
        }

        info!("{}", title);

        let path = pdf_filename(&title);
        page.export_pdf(&path).await?;
        info!("Saved {}", path.display());

        Ok(path)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Maps the outcome of a run to the process exit status,
/// logging whatever went wrong. Panics count as failures.
pub fn exit_status(outcome: std::thread::Result<Result<PathBuf>>) -> u8 {
    match outcome {
        Ok(Ok(_)) => 0,
        Ok(Err(e)) => {
            error!("{}", e);
            1
        }
        Err(panic) => {
            error!("Process panicked: {}", panic_message(panic.as_ref()));
            1
        }
    }
}

/// Drives a run to completion, catching a panic anywhere inside it
pub async fn run_to_exit_status<F>(run: F) -> u8
where
    F: Future<Output = Result<PathBuf>>,
{
    exit_status(AssertUnwindSafe(run).catch_unwind().await)
}
