use std::time::Duration;

/// Engine tunables. Every field can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base that relative endpoints (e.g. `/filters/options`) are joined onto.
    pub base_url: Option<String>,
    /// Page declaration consumed by the binary.
    pub page_path: String,
    pub search_facet: String,
    pub search_limit: usize,
    pub refresh_debounce_ms: u64,
    pub date_debounce_ms: u64,
    pub search_debounce_ms: u64,
    /// Per-request ceiling; 0 disables it.
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            page_path: "./filters.json".to_string(),
            search_facet: "meterid".to_string(),
            search_limit: 200,
            refresh_debounce_ms: 350,
            date_debounce_ms: 200,
            search_debounce_ms: 250,
            request_timeout_ms: 20_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: std::env::var("FILTER_BASE_URL").ok().filter(|v| !v.trim().is_empty()),
            page_path: std::env::var("FILTER_PAGE").unwrap_or(d.page_path),
            search_facet: std::env::var("SEARCH_FACET").unwrap_or(d.search_facet),
            search_limit: std::env::var("SEARCH_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.search_limit),
            refresh_debounce_ms: std::env::var("REFRESH_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.refresh_debounce_ms),
            date_debounce_ms: std::env::var("DATE_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.date_debounce_ms),
            search_debounce_ms: std::env::var("SEARCH_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.search_debounce_ms),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.request_timeout_ms),
        }
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn date_debounce(&self) -> Duration {
        Duration::from_millis(self.date_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Search endpoint path convention: `/options/<facet>`.
    pub fn search_endpoint(&self) -> String {
        format!("/options/{}", self.search_facet)
    }
}
