use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::traits::{BrowserDriver, ElementInfo, WaitState};
use crate::utils::binary_resolver;

/// Bridge script run by the Node sidecar.
const BRIDGE_SOURCE: &str = include_str!("bridge.js");

/// Outer guard against a hung bridge; `waitFor` carries its own timeout.
const BRIDGE_TIMEOUT_MS: u64 = 60_000;

/// Browser engines the bridge can launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => bail!("Unknown browser: {} (expected chromium, firefox, or webkit)", other),
        }
    }
}

/// Options for starting the bridge.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub browser: Browser,
    pub headless: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Drives a real browser through Playwright, hosted in a long-lived Node
/// sidecar speaking line-delimited JSON over stdin/stdout.
///
/// The sidecar owns the browser, context, and page; this side owns the
/// request ids and the child process. Requests are sequential, so responses
/// come back in order; stale ids left over from a timed-out request are
/// skipped.
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    // Holds the bridge script on disk for the child's lifetime.
    _workdir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Spawn the Node sidecar and launch a browser in it.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let node = binary_resolver::find_node()?;
        let workdir = tempfile::tempdir().context("Failed to create bridge workdir")?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SOURCE)
            .with_context(|| format!("Failed to write bridge script: {}", script_path.display()))?;

        debug!(
            "Starting Playwright bridge: {} {}",
            node.display(),
            script_path.display()
        );

        let mut child = Command::new(&node)
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn node at {}", node.display()))?;

        let stdin = child.stdin.take().context("Bridge stdin unavailable")?;
        let stdout = child.stdout.take().context("Bridge stdout unavailable")?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            _workdir: workdir,
        };

        driver
            .call(
                "launch",
                json!({
                    "browser": options.browser.as_str(),
                    "headless": options.headless,
                }),
            )
            .await
            .context("Failed to launch browser through the bridge")?;

        Ok(driver)
    }

    async fn call(&mut self, cmd: &str, params: Value) -> Result<Value> {
        self.request(cmd, params, Duration::from_millis(BRIDGE_TIMEOUT_MS))
            .await
    }

    async fn request(&mut self, cmd: &str, params: Value, deadline: Duration) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let line = serde_json::to_string(&json!({ "id": id, "cmd": cmd, "params": params }))?;

        debug!("bridge -> {}", line);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        loop {
            let line = tokio::time::timeout(deadline, self.stdout.next_line())
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "Bridge did not answer '{}' within {}ms",
                        cmd,
                        deadline.as_millis()
                    )
                })??
                .ok_or_else(|| anyhow::anyhow!("Bridge closed its stdout during '{}'", cmd))?;

            debug!("bridge <- {}", line);
            let response: BridgeResponse = serde_json::from_str(&line)
                .with_context(|| format!("Malformed bridge response: {}", line))?;

            if response.id != id {
                // Stale answer from an earlier timed-out request.
                continue;
            }
            if response.ok {
                return Ok(response.value);
            }
            bail!(
                "Bridge command '{}' failed: {}",
                cmd,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    fn name(&self) -> &str {
        "playwright"
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.call("navigate", json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let value = self.call("currentUrl", json!({})).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("Bridge returned a non-string URL: {}", value))
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.call("setViewport", json!({ "width": width, "height": height }))
            .await?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        self.call("fill", json!({ "selector": selector, "text": text }))
            .await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.call("click", json!({ "selector": selector })).await?;
        Ok(())
    }

    async fn press(&mut self, key: &str) -> Result<()> {
        self.call("press", json!({ "key": key })).await?;
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Option<ElementInfo>> {
        let value = self.call("query", json!({ "selector": selector })).await?;
        if value.is_null() {
            return Ok(None);
        }
        let info: ElementInfo =
            serde_json::from_value(value).context("Malformed element info from bridge")?;
        Ok(Some(info))
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.call("evaluate", json!({ "script": script })).await
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout_ms: u64,
    ) -> Result<bool> {
        let deadline =
            Duration::from_millis(timeout_ms.saturating_add(5_000).max(BRIDGE_TIMEOUT_MS));
        let value = self
            .request(
                "waitFor",
                json!({
                    "selector": selector,
                    "state": state.as_str(),
                    "timeoutMs": timeout_ms,
                }),
                deadline,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn reset(&mut self) -> Result<()> {
        self.call("reset", json!({})).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.call("close", json!({})).await {
            Ok(_) => {
                let _ =
                    tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
            }
            Err(err) => {
                warn!("Bridge close failed, killing sidecar: {}", err);
                let _ = self.child.kill().await;
            }
        }
        Ok(())
    }
}
