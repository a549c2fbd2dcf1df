//! Runtime configuration and API key storage
//!
//! Settings come from `.env` and the process environment. API keys can
//! later be replaced from the dashboard sidebar through [`KeyStore`].

use crate::error::DashboardError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const DEFAULT_PORT: u16 = 8501;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TEMPERATURE: f32 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Gemini,
    Groq,
}

impl Backend {
    pub fn default_model(self) -> &'static str {
        match self {
            Backend::Gemini => "gemini-1.5-pro",
            Backend::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Environment variable holding the LLM key for this backend
    pub fn key_var(self) -> &'static str {
        match self {
            Backend::Gemini => "GOOGLE_API_KEY",
            Backend::Groq => "GROQ_API_KEY",
        }
    }

    /// Label used in the missing-keys warning and the sidebar
    pub fn key_label(self) -> &'static str {
        match self {
            Backend::Gemini => "Google",
            Backend::Groq => "Groq",
        }
    }

    /// Theme the variant ships with when `UI_THEME` is unset
    pub fn default_theme(self) -> Theme {
        match self {
            Backend::Gemini => Theme::Brutalist,
            Backend::Groq => Theme::Terminal,
        }
    }
}

impl FromStr for Backend {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Backend::Gemini),
            "groq" => Ok(Backend::Groq),
            other => Err(DashboardError::ConfigError(format!(
                "unknown LLM_BACKEND '{}', expected gemini or groq",
                other
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Gemini => "gemini",
            Backend::Groq => "groq",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Brutalist,
    Terminal,
}

impl FromStr for Theme {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "brutalist" | "neo-brutalism" => Ok(Theme::Brutalist),
            "terminal" | "dark" => Ok(Theme::Terminal),
            other => Err(DashboardError::ConfigError(format!(
                "unknown UI_THEME '{}', expected brutalist or terminal",
                other
            ))),
        }
    }
}

/// Model parameters for a single run
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: Backend,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            model: backend.default_model().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Process-wide settings read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub theme: Theme,
    pub llm: LlmConfig,
    pub keys: ApiKeys,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let backend = match env::var("LLM_BACKEND") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => Backend::Gemini,
        };

        let theme = match env::var("UI_THEME") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => backend.default_theme(),
        };

        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .ok()
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|e| DashboardError::ConfigError(format!("invalid PORT '{}': {}", p, e)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let mut llm = LlmConfig::new(backend);
        if let Some(model) = non_empty_var("LLM_MODEL") {
            llm.model = model;
        }
        if let Some(secs) = non_empty_var("LLM_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|e| {
                DashboardError::ConfigError(format!("invalid LLM_TIMEOUT_SECS: {}", e))
            })?;
            llm.timeout = Duration::from_secs(secs);
        }
        if let Some(temp) = non_empty_var("LLM_TEMPERATURE") {
            llm.temperature = temp.parse().map_err(|e| {
                DashboardError::ConfigError(format!("invalid LLM_TEMPERATURE: {}", e))
            })?;
        }

        Ok(Self {
            port,
            theme,
            keys: ApiKeys::from_env(backend),
            llm,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// The three secrets a run needs
#[derive(Clone)]
pub struct ApiKeys {
    pub backend: Backend,
    pub llm: String,
    pub fmp: String,
    pub finnhub: String,
}

impl ApiKeys {
    pub fn new(backend: Backend, llm: String, fmp: String, finnhub: String) -> Self {
        Self {
            backend,
            llm,
            fmp,
            finnhub,
        }
    }

    pub fn from_env(backend: Backend) -> Self {
        Self::new(
            backend,
            non_empty_var(backend.key_var()).unwrap_or_default(),
            non_empty_var("FMP_API_KEY").unwrap_or_default(),
            non_empty_var("FINNHUB_API_KEY").unwrap_or_default(),
        )
    }

    /// Labels of the keys that are still blank, in sidebar order
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.llm.trim().is_empty() {
            missing.push(self.backend.key_label().to_string());
        }
        if self.fmp.trim().is_empty() {
            missing.push("FMP".to_string());
        }
        if self.finnhub.trim().is_empty() {
            missing.push("Finnhub".to_string());
        }
        missing
    }

    pub fn ensure_complete(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DashboardError::MissingKeys(missing))
        }
    }

    /// Overwrite only the fields that were actually submitted
    pub fn merge(&mut self, update: KeyUpdate) {
        for (slot, value) in [
            (&mut self.llm, update.llm),
            (&mut self.fmp, update.fmp),
            (&mut self.finnhub, update.finnhub),
        ] {
            if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("llm", &fingerprint(&self.llm))
            .field("fmp", &fingerprint(&self.fmp))
            .field("finnhub", &fingerprint(&self.finnhub))
            .finish()
    }
}

/// Sidebar form submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyUpdate {
    #[serde(default)]
    pub llm: Option<String>,
    #[serde(default)]
    pub fmp: Option<String>,
    #[serde(default)]
    pub finnhub: Option<String>,
}

/// Shared, request-mutable key storage
#[derive(Clone)]
pub struct KeyStore {
    inner: Arc<RwLock<ApiKeys>>,
}

impl KeyStore {
    pub fn new(keys: ApiKeys) -> Self {
        Self {
            inner: Arc::new(RwLock::new(keys)),
        }
    }

    pub async fn snapshot(&self) -> ApiKeys {
        self.inner.read().await.clone()
    }

    pub async fn update(&self, update: KeyUpdate) -> ApiKeys {
        let mut keys = self.inner.write().await;
        keys.merge(update);
        tracing::info!(keys = ?*keys, "API keys updated from sidebar");
        keys.clone()
    }
}

/// Short SHA-256 prefix so keys can be told apart in logs without leaking them
pub fn fingerprint(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(llm: &str, fmp: &str, finnhub: &str) -> ApiKeys {
        ApiKeys::new(Backend::Gemini, llm.into(), fmp.into(), finnhub.into())
    }

    #[test]
    fn test_missing_keys_order() {
        assert_eq!(keys("", "", "").missing(), vec!["Google", "FMP", "Finnhub"]);
        assert_eq!(keys("g", "", "f").missing(), vec!["FMP"]);
        assert!(keys("g", "m", "f").missing().is_empty());

        let groq = ApiKeys::new(Backend::Groq, String::new(), "m".into(), "f".into());
        assert_eq!(groq.missing(), vec!["Groq"]);
    }

    #[test]
    fn test_merge_ignores_blank_fields() {
        let mut k = keys("old-llm", "old-fmp", "");
        k.merge(KeyUpdate {
            llm: Some("  ".into()),
            fmp: None,
            finnhub: Some("new-finnhub".into()),
        });
        assert_eq!(k.llm, "old-llm");
        assert_eq!(k.fmp, "old-fmp");
        assert_eq!(k.finnhub, "new-finnhub");
        assert!(k.ensure_complete().is_ok());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let k = keys("super-secret", "", "x");
        let printed = format!("{:?}", k);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<unset>"));
        assert_eq!(fingerprint("super-secret").len(), 8);
    }

    #[test]
    fn test_backend_and_theme_parsing() {
        assert_eq!("GROQ".parse::<Backend>().ok(), Some(Backend::Groq));
        assert_eq!("google".parse::<Backend>().ok(), Some(Backend::Gemini));
        assert!("openai".parse::<Backend>().is_err());
        assert_eq!("dark".parse::<Theme>().ok(), Some(Theme::Terminal));
        assert_eq!(Backend::Groq.default_theme(), Theme::Terminal);
    }

    #[tokio::test]
    async fn test_key_store_update() {
        let store = KeyStore::new(keys("", "", ""));
        let updated = store
            .update(KeyUpdate {
                llm: Some("g".into()),
                fmp: Some("m".into()),
                finnhub: None,
            })
            .await;
        assert_eq!(updated.missing(), vec!["Finnhub"]);
        assert_eq!(store.snapshot().await.llm, "g");
    }

    #[test]
    fn test_key_store_clones_share_state() {
        let store = KeyStore::new(keys("", "", ""));
        let handle = store.clone();
        tokio_test::block_on(handle.update(KeyUpdate {
            finnhub: Some(" f ".into()),
            ..KeyUpdate::default()
        }));
        assert_eq!(tokio_test::block_on(store.snapshot()).finnhub, "f");
    }
}
