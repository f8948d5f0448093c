use std::fs;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "opsboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub es_url: Option<String>,
    pub es_api_key: Option<String>,
    pub force_mock: bool,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            es_url: None,
            es_api_key: None,
            force_mock: false,
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    es_url: Option<String>,
    es_api_key: Option<String>,
    force_mock: Option<bool>,
    request_timeout_seconds: Option<u64>,
}

impl Settings {
    /// Live mode needs a backend URL and no forced mock mode.
    pub fn is_live(&self) -> bool {
        !self.force_mock && self.es_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings =
            toml::from_str(raw).context("failed to parse settings file")?;
        if let Some(v) = file_cfg.es_url {
            self.es_url = Some(v);
        }
        if let Some(v) = file_cfg.es_api_key {
            self.es_api_key = Some(v);
        }
        if let Some(v) = file_cfg.force_mock {
            self.force_mock = v;
        }
        if let Some(v) = file_cfg.request_timeout_seconds {
            self.request_timeout_seconds = v;
        }
        Ok(())
    }

    /// Plain names first, `APP__`-prefixed names win when both are set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| lookup(&format!("APP__{name}")).or_else(|| lookup(name));

        if let Some(v) = read("ES_URL") {
            self.es_url = Some(v);
        }
        if let Some(v) = read("ES_API_KEY") {
            self.es_api_key = Some(v);
        }
        if let Some(v) = read("FORCE_MOCK") {
            self.force_mock = v.trim().eq_ignore_ascii_case("true") || v.trim() == "1";
        }
        if let Some(v) = read("ES_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.request_timeout_seconds = parsed;
            }
        }
    }

    /// Validated backend base URL, `None` when running on fixtures.
    pub fn backend_url(&self) -> anyhow::Result<Option<Url>> {
        if !self.is_live() {
            return Ok(None);
        }
        let raw = self.es_url.as_deref().unwrap_or_default().trim();
        let url = Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!(
                "backend url must start with http:// or https://, got '{raw}'"
            ));
        }
        Ok(Some(url))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        if let Err(error) = settings.apply_file(&raw) {
            tracing::warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
        }
    }
    settings.apply_env(|name| std::env::var(name).ok());

    settings
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_run_on_fixtures() {
        let settings = Settings::default();
        assert!(!settings.is_live());
        assert_eq!(settings.backend_url().expect("url"), None);
    }

    #[test]
    fn env_overrides_file_and_prefixed_name_wins() {
        let mut settings = Settings::default();
        settings
            .apply_file("es_url = \"http://file:9200\"\nrequest_timeout_seconds = 3\n")
            .expect("parse");
        settings.apply_env(env(&[
            ("ES_URL", "http://plain:9200"),
            ("APP__ES_URL", "http://prefixed:9200"),
            ("ES_API_KEY", "secret"),
        ]));

        assert_eq!(settings.es_url.as_deref(), Some("http://prefixed:9200"));
        assert_eq!(settings.es_api_key.as_deref(), Some("secret"));
        assert_eq!(settings.request_timeout_seconds, 3);
        assert!(settings.is_live());
    }

    #[test]
    fn force_mock_disables_live_mode() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("ES_URL", "http://es:9200"), ("FORCE_MOCK", "true")]));
        assert!(!settings.is_live());
        assert_eq!(settings.backend_url().expect("url"), None);
    }

    #[test]
    fn rejects_non_http_backend_url() {
        let settings = Settings {
            es_url: Some("ftp://es:21".into()),
            ..Settings::default()
        };
        assert!(settings.backend_url().is_err());
    }

    #[test]
    fn unparsable_timeout_keeps_default() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("ES_REQUEST_TIMEOUT_SECONDS", "soon")]));
        assert_eq!(settings.request_timeout_seconds, 10);
    }
}
