//! Explorer configuration
//!
//! Read from `LIVE_EDITOR_*` environment variables. The binary loads `.env`
//! first and lets CLI flags override individual fields.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8212";
pub const DEFAULT_MAX_ITEMS: u32 = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ROOT_TYPE: &str = "PalPlayerState";
pub const DEFAULT_PRESETS: [&str; 4] = [
    "PalPlayerState",
    "PalPlayerCharacter",
    "PalPlayerController",
    "PalGameStateInGame",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Base URL of the reflection bridge, without a trailing slash.
    pub bridge_url: String,
    /// Item cap sent with every dump.
    pub max_items: u32,
    pub timeout: Duration,
    /// Local copy of the last good probe result.
    pub probe_cache: Option<PathBuf>,
    /// Class the explorer opens first.
    pub root_type: String,
    /// Quick-pick root classes.
    pub presets: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            bridge_url: DEFAULT_URL.to_string(),
            max_items: DEFAULT_MAX_ITEMS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            probe_cache: None,
            root_type: DEFAULT_ROOT_TYPE.to_string(),
            presets: DEFAULT_PRESETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExplorerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get("LIVE_EDITOR_URL") {
            config.bridge_url = normalize_bridge_url(&url).context("LIVE_EDITOR_URL")?;
        }
        if let Some(max) = get("LIVE_EDITOR_MAX_ITEMS") {
            config.max_items = parse_max_items(&max).context("LIVE_EDITOR_MAX_ITEMS")?;
        }
        if let Some(secs) = get("LIVE_EDITOR_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("LIVE_EDITOR_TIMEOUT_SECS: '{secs}' is not a number"))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = get("LIVE_EDITOR_PROBE_CACHE") {
            config.probe_cache = Some(PathBuf::from(path));
        }
        if let Some(root) = get("LIVE_EDITOR_ROOT_TYPE") {
            config.root_type = root;
        }
        if let Some(presets) = get("LIVE_EDITOR_PRESETS") {
            config.presets = presets
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Preset by 1-based position, as listed to the operator.
    pub fn preset(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.presets.get(i))
            .map(String::as_str)
    }
}

/// Validate an absolute `http`/`https` URL and strip the trailing slash.
pub fn normalize_bridge_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid bridge URL '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        other => Err(anyhow!("unsupported scheme '{other}' in bridge URL '{raw}'")),
    }
}

/// A positive item cap.
pub fn parse_max_items(raw: &str) -> Result<u32> {
    let max: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{raw}' is not a number"))?;
    if max <= 0 {
        bail!("max items must be positive, got {max}");
    }
    u32::try_from(max).with_context(|| format!("max items {max} is too large"))
}
