//! Lazily-initialized per-engine browser slots.
//!
//! Lazy launch is memoized per engine through `tokio::sync::OnceCell`:
//! concurrent first callers await the same in-flight launch rather than
//! each spawning a browser process. A failed launch leaves the slot empty
//! so the next caller retries; a crashed-but-cached browser is not
//! detected here and will surface as an error on its next use.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::{BrowserEngine, BrowserPoolConfig};

/// Shared handle to a pooled browser process.
pub type BrowserHandle = Arc<Mutex<Browser>>;

/// One lazily-initialized slot per engine, generic so launch policy can be
/// exercised in tests without real browser processes.
#[derive(Debug, Default)]
pub struct EngineSlots<T> {
    firefox: OnceCell<T>,
    chromium: OnceCell<T>,
}

impl<T: Clone> EngineSlots<T> {
    pub fn new() -> Self {
        Self {
            firefox: OnceCell::new(),
            chromium: OnceCell::new(),
        }
    }

    fn cell(&self, engine: BrowserEngine) -> &OnceCell<T> {
        match engine {
            BrowserEngine::Firefox => &self.firefox,
            BrowserEngine::Chromium => &self.chromium,
        }
    }

    /// Return the cached value for `engine`, launching it through `launch`
    /// if absent. Concurrent callers share a single launch attempt.
    pub async fn get_or_launch<F, Fut>(&self, engine: BrowserEngine, launch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = self.cell(engine).get_or_try_init(launch).await?;
        Ok(value.clone())
    }

    /// Remove and return the cached value for `engine`, if any.
    pub fn take(&mut self, engine: BrowserEngine) -> Option<T> {
        match engine {
            BrowserEngine::Firefox => self.firefox.take(),
            BrowserEngine::Chromium => self.chromium.take(),
        }
    }

    /// Whether a value is cached for `engine`.
    pub fn contains(&self, engine: BrowserEngine) -> bool {
        self.cell(engine).initialized()
    }
}

/// Process-wide pool of at most one Firefox and one Chromium instance.
pub struct BrowserPool {
    config: BrowserPoolConfig,
    slots: EngineSlots<BrowserHandle>,
}

impl BrowserPool {
    /// Create an empty pool; no browser processes are started.
    pub fn new(config: BrowserPoolConfig) -> Self {
        Self {
            config,
            slots: EngineSlots::new(),
        }
    }

    pub fn config(&self) -> &BrowserPoolConfig {
        &self.config
    }

    /// Eagerly launch both engines. Intended for process startup.
    pub async fn initialize(&self) -> Result<()> {
        self.get(BrowserEngine::Firefox).await?;
        self.get(BrowserEngine::Chromium).await?;
        Ok(())
    }

    /// Get the pooled instance for `engine`, launching it on first use.
    pub async fn get(&self, engine: BrowserEngine) -> Result<BrowserHandle> {
        let config = self.config.clone();
        self.slots
            .get_or_launch(engine, || async move { launch_engine(engine, &config).await })
            .await
    }

    /// Terminate both browser instances. Graceful shutdown only.
    pub async fn shutdown(&mut self) {
        for engine in [BrowserEngine::Firefox, BrowserEngine::Chromium] {
            if let Some(handle) = self.slots.take(engine) {
                let mut browser = handle.lock().await;
                if let Err(e) = browser.close().await {
                    warn!("Failed to close {} cleanly: {}", engine, e);
                }
                let _ = browser.wait().await;
                info!("Closed {} instance", engine);
            }
        }
    }
}

/// Find an engine executable: config override, well-known paths, then $PATH.
fn find_executable(engine: BrowserEngine, config: &BrowserPoolConfig) -> Result<String> {
    if let Some(path) = config.executable_override(engine) {
        return Ok(path.to_string());
    }

    for path in engine.executable_candidates() {
        if std::path::Path::new(path).exists() {
            debug!("Found {} at: {}", engine, path);
            return Ok((*path).to_string());
        }
    }

    for cmd in engine.path_commands() {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("Found {} in PATH: {}", engine, path);
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!(
        "{} executable not found; install it or set the executable path in config",
        engine
    ))
}

/// Launch a headless engine over CDP and spawn its event handler loop.
async fn launch_engine(engine: BrowserEngine, config: &BrowserPoolConfig) -> Result<BrowserHandle> {
    let executable = find_executable(engine, config)?;

    info!(
        "Launching {} (headless={}) from {}",
        engine, config.headless, executable
    );

    let mut builder = BrowserConfig::builder().chrome_executable(&executable);

    // with_head means NOT headless
    if !config.headless {
        builder = builder.with_head();
    }

    builder = builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-background-networking")
        .arg("--no-sandbox")
        .arg("--disable-gpu");

    for arg in &config.extra_args {
        builder = builder.arg(arg.as_str());
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build {} config: {}", engine, e))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .with_context(|| format!("Failed to launch {}", engine))?;

    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok(Arc::new(Mutex::new(browser)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sequential_gets_return_cached_instance() {
        let slots: EngineSlots<usize> = EngineSlots::new();
        let launches = AtomicUsize::new(0);

        let first = slots
            .get_or_launch(BrowserEngine::Chromium, || async {
                launches.fetch_add(1, Ordering::SeqCst);
                Ok(7usize)
            })
            .await
            .unwrap();
        let second = slots
            .get_or_launch(BrowserEngine::Chromium, || async {
                launches.fetch_add(1, Ordering::SeqCst);
                Ok(99usize)
            })
            .await
            .unwrap();

        assert_eq!(first, 7);
        assert_eq!(second, 7);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_launch() {
        let slots: Arc<EngineSlots<usize>> = Arc::new(EngineSlots::new());
        let launches = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let slots = Arc::clone(&slots);
            let launches = Arc::clone(&launches);
            tasks.push(tokio::spawn(async move {
                slots
                    .get_or_launch(BrowserEngine::Firefox, || async move {
                        launches.fetch_add(1, Ordering::SeqCst);
                        // Hold the launch open so other callers pile up on it
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(42usize)
                    })
                    .await
                    .unwrap()
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engines_are_independent_slots() {
        let slots: EngineSlots<&'static str> = EngineSlots::new();

        let ff = slots
            .get_or_launch(BrowserEngine::Firefox, || async { Ok("ff") })
            .await
            .unwrap();
        let cr = slots
            .get_or_launch(BrowserEngine::Chromium, || async { Ok("cr") })
            .await
            .unwrap();

        assert_eq!(ff, "ff");
        assert_eq!(cr, "cr");
        assert!(slots.contains(BrowserEngine::Firefox));
        assert!(slots.contains(BrowserEngine::Chromium));
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_slot_empty_for_retry() {
        let slots: EngineSlots<usize> = EngineSlots::new();

        let err = slots
            .get_or_launch(BrowserEngine::Chromium, || async {
                Err(anyhow::anyhow!("no executable"))
            })
            .await;
        assert!(err.is_err());
        assert!(!slots.contains(BrowserEngine::Chromium));

        let ok = slots
            .get_or_launch(BrowserEngine::Chromium, || async { Ok(1usize) })
            .await
            .unwrap();
        assert_eq!(ok, 1);
    }
}
