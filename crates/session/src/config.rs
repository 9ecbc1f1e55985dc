use std::time::Duration;
use uast_dev_mappings::Language;

pub const DEFAULT_PARSE_DEBOUNCE: Duration = Duration::from_millis(1_000);
pub const DEFAULT_QUERY_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_LANGUAGE: &str = "go";

const MIN_DEBOUNCE: Duration = Duration::from_millis(10);
const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub parse_debounce: Duration,
    pub query_debounce: Duration,
    /// Replaced by a preferred language once the catalog loads, if the catalog lacks it.
    pub initial_language: Language,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parse_debounce: DEFAULT_PARSE_DEBOUNCE,
            query_debounce: DEFAULT_QUERY_DEBOUNCE,
            initial_language: Language::from(DEFAULT_LANGUAGE),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `UAST_DEV_PARSE_DEBOUNCE_MS`, `UAST_DEV_QUERY_DEBOUNCE_MS` and
    /// `UAST_DEV_LANGUAGE`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            parse_debounce: debounce_from_env("UAST_DEV_PARSE_DEBOUNCE_MS")
                .unwrap_or(defaults.parse_debounce),
            query_debounce: debounce_from_env("UAST_DEV_QUERY_DEBOUNCE_MS")
                .unwrap_or(defaults.query_debounce),
            initial_language: std::env::var("UAST_DEV_LANGUAGE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(Language::from)
                .unwrap_or(defaults.initial_language),
        }
    }

    #[must_use]
    pub fn with_parse_debounce(mut self, debounce: Duration) -> Self {
        self.parse_debounce = clamp_debounce(debounce);
        self
    }

    #[must_use]
    pub fn with_query_debounce(mut self, debounce: Duration) -> Self {
        self.query_debounce = clamp_debounce(debounce);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<Language>) -> Self {
        self.initial_language = language.into();
        self
    }
}

fn debounce_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .map(clamp_debounce)
}

fn clamp_debounce(debounce: Duration) -> Duration {
    debounce.clamp(MIN_DEBOUNCE, MAX_DEBOUNCE)
}
