use serde::Deserialize;

/// Application configuration loaded from environment variables
///
/// Every upstream key is optional: a provider without a key is simply not
/// registered, which mirrors how the listings degrade when a source is down.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL; caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TMDB v3 API key
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// OMDb API key (IMDb ratings)
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// Watchmode API key
    #[serde(default)]
    pub watchmode_api_key: Option<String>,

    #[serde(default = "default_watchmode_api_url")]
    pub watchmode_api_url: String,

    /// Streaming Availability API key (RapidAPI)
    #[serde(default)]
    pub streaming_api_key: Option<String>,

    #[serde(default = "default_streaming_api_url")]
    pub streaming_api_url: String,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Region used for watch-provider lookups
    #[serde(default = "default_region")]
    pub region: String,

    /// Number of TMDB list pages fetched per listing
    #[serde(default = "default_tmdb_pages")]
    pub tmdb_pages: u32,

    /// Maximum number of TBA items sent to the LLM per listing
    #[serde(default = "default_ai_enhance_limit")]
    pub ai_enhance_limit: usize,

    /// Pause between consecutive LLM guesses, in milliseconds
    #[serde(default = "default_ai_delay_ms")]
    pub ai_delay_ms: u64,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Optional JSON file with hand-confirmed release announcements
    #[serde(default)]
    pub curated_releases_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_omdb_api_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_watchmode_api_url() -> String {
    "https://api.watchmode.com".to_string()
}

fn default_streaming_api_url() -> String {
    "https://streaming-availability.p.rapidapi.com".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_tmdb_pages() -> u32 {
    5
}

fn default_ai_enhance_limit() -> usize {
    15
}

fn default_ai_delay_ms() -> u64 {
    200
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Region code in the lower-case form some APIs expect
    pub fn country(&self) -> String {
        self.region.to_lowercase()
    }
}
