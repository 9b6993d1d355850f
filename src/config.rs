use std::env;

/// One credential per provider, read from the environment. A missing key is
/// a startup warning, not a startup failure: calls to that provider fail at
/// request time instead.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub groq: Option<String>,
    pub xai: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        ProviderCredentials {
            groq: read_key("GROQ_API_KEY"),
            xai: read_key("XAI_API_KEY"),
            gemini: read_key("GEMINI_API_KEY"),
            openrouter: read_key("OPENROUTER_API_KEY"),
        }
    }

    pub fn warn_missing(&self) {
        let keys = [
            ("GROQ_API_KEY", &self.groq),
            ("XAI_API_KEY", &self.xai),
            ("GEMINI_API_KEY", &self.gemini),
            ("OPENROUTER_API_KEY", &self.openrouter),
        ];
        for (name, value) in keys {
            match value {
                Some(_) => log::info!("{} loaded", name),
                None => log::warn!(
                    "{} is not set; requests to this provider will fail",
                    name
                ),
            }
        }
    }
}

fn read_key(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Upstream call timeout in seconds
    pub timeout: u64,
    /// Seconds between store statistics log lines
    pub log_interval: u64,
    /// Messages kept per session before the oldest are trimmed
    pub max_history: usize,
    pub credentials: ProviderCredentials,
}
