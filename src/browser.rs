use headless_chrome;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Emulation, Network};
use anyhow;
use thiserror::Error;
use tracing::debug;
use url::Url;
use crate::pdf::{a4_print_options, write_atomically};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("ChromeError: {0}")]
    ChromeError(#[from] anyhow::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Network did not go idle within {0:?}")]
    NavigationTimeout(Duration),
}
pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport { width: 1920, height: 1080 };
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// When a loaded page counts as settled: no request in flight
/// for `quiet_window`, checked every `poll_interval`, for at most `timeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdle {
    pub quiet_window: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Requests the page has started but not yet finished or failed.
/// The quiet period starts when the last one ends.
#[derive(Debug)]
struct NetworkActivity {
    in_flight: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl NetworkActivity {

    fn new(now: Instant) -> Self {
        Self { in_flight: HashSet::new(), quiet_since: Some(now) }
    }

    fn reset(&mut self, now: Instant) {
        self.in_flight.clear();
        self.quiet_since = Some(now);
    }

    /// Redirects reuse the request id, so a request is only counted once
    fn request_started(&mut self, request_id: &str) {
        self.in_flight.insert(request_id.to_string());
        self.quiet_since = None;
    }

    fn request_ended(&mut self, request_id: &str, now: Instant) {
        if self.in_flight.remove(request_id) && self.in_flight.is_empty() {
            self.quiet_since = Some(now);
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn is_idle(&self, quiet_window: Duration, now: Instant) -> bool {
        self.quiet_since
            .is_some_and(|since| now.saturating_duration_since(since) >= quiet_window)
    }

    fn on_event(&mut self, event: &Event, now: Instant) {
        match event {
            Event::NetworkRequestWillBeSent(e) => self.request_started(&e.params.request_id),
            Event::NetworkLoadingFinished(e) => self.request_ended(&e.params.request_id, now),
            Event::NetworkLoadingFailed(e) => self.request_ended(&e.params.request_id, now),
            _ => {}
        }
    }
}

/// A single page driven by the browser engine
#[allow(async_fn_in_trait)]
pub trait Page {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;
    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()>;
    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;
    /// Returns once the page is loaded and the network went idle
    async fn navigate(&self, url: &Url) -> Result<()>;
    async fn title(&self) -> Result<String>;
    /// Detaches every element matching `selector`, returns how many were removed
    async fn remove_all(&self, selector: &str) -> Result<usize>;
    /// Prints the page on A4 paper
    async fn export_pdf(&self, path: &Path) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait Browser {
    type Page: Page;
    async fn new_page(&self) -> Result<Self::Page>;
    async fn close(self) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait Launcher {
    type Browser: Browser;
    async fn launch(&self, viewport: Viewport) -> Result<Self::Browser>;
}

/// Launches a local headless Chrome/Chromium
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher {
    pub network_idle: NetworkIdle,
}

pub struct ChromeBrowser {
    inner: headless_chrome::Browser,
    network_idle: NetworkIdle,
}

pub struct ChromePage {
    tab: Arc<headless_chrome::Tab>,
    activity: Arc<Mutex<NetworkActivity>>,
    network_idle: NetworkIdle,
}

impl Launcher for ChromeLauncher {
    type Browser = ChromeBrowser;

    async fn launch(&self, viewport: Viewport) -> Result<ChromeBrowser> {
        let options = headless_chrome::LaunchOptions {
            headless: true,
            window_size: Some((viewport.width, viewport.height)),
            ..Default::default()
        };
        let inner = headless_chrome::Browser::new(options)?;
        debug!("browser launched");
        Ok(ChromeBrowser { inner, network_idle: self.network_idle })
    }
}

impl Browser for ChromeBrowser {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage> {
        let tab = self.inner.new_tab()?;
        ChromePage::watch_network(tab, self.network_idle)
    }

    /// Dropping the handle kills the browser process
    async fn close(self) -> Result<()> {
        drop(self.inner);
        debug!("browser closed");
        Ok(())
    }
}

impl ChromePage {

    /// Subscribes to the tab's network events before anything is loaded
    fn watch_network(tab: Arc<headless_chrome::Tab>, network_idle: NetworkIdle) -> Result<Self> {
        let activity = Arc::new(Mutex::new(NetworkActivity::new(Instant::now())));

        let listener_activity = Arc::clone(&activity);
        tab.add_event_listener(Arc::new(move |event: &Event| {
            listener_activity
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_event(event, Instant::now());
        }))?;

        tab.call_method(Network::Enable {
            max_total_buffer_size: None,
            max_resource_buffer_size: None,
            max_post_data_size: None,
            report_direct_socket_traffic: None,
            enable_durable_messages: None,
        })?;

        Ok(Self { tab, activity, network_idle })
    }

    fn activity(&self) -> MutexGuard<'_, NetworkActivity> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        let started = Instant::now();

        loop {
            let idle = self.activity().is_idle(self.network_idle.quiet_window, Instant::now());
            if idle {
                debug!("network idle");
                return Ok(());
            }
            if started.elapsed() >= self.network_idle.timeout {
                let in_flight = self.activity().in_flight();
                debug!(in_flight, "network still busy");
                return Err(BrowserError::NavigationTimeout(self.network_idle.timeout));
            }
            tokio::time::sleep(self.network_idle.poll_interval).await;
        }
    }

    /// Desktop page viewport, same as a plain 1x window of that size
    fn device_metrics(viewport: Viewport) -> Emulation::SetDeviceMetricsOverride {
        Emulation::SetDeviceMetricsOverride {
            width: viewport.width,
            height: viewport.height,
            device_scale_factor: 1.0,
            mobile: false,
            scale: None,
            screen_width: None,
            screen_height: None,
            position_x: None,
            position_y: None,
            dont_set_visible_size: None,
            screen_orientation: None,
            viewport: None,
            display_feature: None,
            device_posture: None,
        }
    }

    fn removal_script(selector: &str) -> Result<String> {
        let selector = serde_json::to_string(selector)?;
        Ok(format!(
            "(() => {{ const elements = document.querySelectorAll({selector}); \
             elements.forEach(el => el.parentNode && el.parentNode.removeChild(el)); \
             return elements.length; }})()"
        ))
    }
}

impl Page for ChromePage {

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.tab.set_user_agent(user_agent, None, None)?;
        Ok(())
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()> {
        self.tab
            .call_method(Emulation::SetScriptExecutionDisabled { value: !enabled })?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.tab.call_method(Self::device_metrics(viewport))?;
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<()> {
        self.activity().reset(Instant::now());
        self.tab.navigate_to(url.as_str())?.wait_until_navigated()?;
        self.wait_for_network_idle().await
    }

    async fn title(&self) -> Result<String> {
        Ok(self.tab.get_title()?)
    }

    async fn remove_all(&self, selector: &str) -> Result<usize> {
        let removed = self
            .tab
            .evaluate(&Self::removal_script(selector)?, false)?
            .value
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(removed as usize)
    }

    async fn export_pdf(&self, path: &Path) -> Result<()> {
        let pdf = self.tab.print_to_pdf(Some(a4_print_options()))?;
        write_atomically(path, &pdf)?;
        Ok(())
    }
}
