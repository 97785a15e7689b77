// Configuration: defaults, then environment (a `.env` file is loaded by the
// binary before this runs), then command-line overrides.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::api::{DEFAULT_MODEL, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_URL};

#[derive(Clone)]
pub struct AppConfig {
    pub queue_url: String,
    pub model: String,
    pub poll_interval: Duration,
    /// Initial key, if one was found. Never persisted.
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            api_key: None,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("queue_url", &self.queue_url)
            .field("model", &self.model)
            .field("poll_interval", &self.poll_interval)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `FAL_KEY` (or `FAL_API_KEY`), `FAL_QUEUE_URL`, `FAL_MODEL` and
    /// `FAL_POLL_INTERVAL_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup.
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let api_key = non_empty(lookup("FAL_KEY")).or_else(|| non_empty(lookup("FAL_API_KEY")));
        let queue_url = non_empty(lookup("FAL_QUEUE_URL"))
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.queue_url);
        let model = non_empty(lookup("FAL_MODEL")).unwrap_or(defaults.model);
        let poll_interval = non_empty(lookup("FAL_POLL_INTERVAL_MS"))
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        AppConfig {
            queue_url,
            model,
            poll_interval,
            api_key,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.queue_url, "https://queue.fal.run");
        assert_eq!(cfg.model, "fal-ai/stable-diffusion-v35-large");
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("FAL_KEY", " abc "),
            ("FAL_QUEUE_URL", "http://localhost:9000/"),
            ("FAL_MODEL", "fal-ai/flux/dev"),
            ("FAL_POLL_INTERVAL_MS", "50"),
        ]));
        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.queue_url, "http://localhost:9000");
        assert_eq!(cfg.model, "fal-ai/flux/dev");
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn blank_key_falls_back_to_alternate_name() {
        let cfg = AppConfig::from_lookup(lookup(&[("FAL_KEY", "  "), ("FAL_API_KEY", "xyz")]));
        assert_eq!(cfg.api_key.as_deref(), Some("xyz"));
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = AppConfig::from_lookup(lookup(&[("FAL_KEY", "very-secret")]));
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("very-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn bad_interval_keeps_default() {
        let cfg = AppConfig::from_lookup(lookup(&[("FAL_POLL_INTERVAL_MS", "soon")]));
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn builders_override() {
        let cfg = AppConfig::new()
            .with_model("fal-ai/other")
            .with_queue_url("http://q/");
        assert_eq!(cfg.model, "fal-ai/other");
        assert_eq!(cfg.queue_url, "http://q");
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
    }
}
