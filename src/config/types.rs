use serde::Deserialize;

/// Main configuration structure for Sumi-Glean
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub render: RenderConfig,
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Plain HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Network timeout for a single request (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("sumi-glean/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Navigation budget for one page, excluding the post-load settle time
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Launch the browser without its sandbox (needed in most containers)
    #[serde(rename = "no-sandbox")]
    pub no_sandbox: bool,

    /// Explicit browser executable; auto-detected when unset
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 30,
            no_sandbox: true,
            chrome_path: None,
        }
    }
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Number of pages fetched concurrently within one job
    pub workers: u32,

    /// Depth ceiling for crawl mode when the job does not set one
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Consecutive fetch failures tolerated before the job fails (0 = unlimited)
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,

    /// Pause between consecutive fetch batches of one job (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Wall-clock budget for a whole job (seconds, 0 = unlimited)
    #[serde(rename = "job-deadline-secs")]
    pub job_deadline_secs: u64,

    /// Nesting limit when expanding sitemap indexes
    #[serde(rename = "sitemap-max-depth")]
    pub sitemap_max_depth: u32,

    /// Capacity of the progress channel
    #[serde(rename = "progress-buffer")]
    pub progress_buffer: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_depth: 10,
            max_consecutive_failures: 10,
            request_delay_ms: 1000,
            job_deadline_secs: 600,
            sitemap_max_depth: 3,
            progress_buffer: 64,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the downloadable JSON artifacts
    #[serde(rename = "download-dir")]
    pub download_dir: String,

    /// Prefix of the download handle returned to callers
    #[serde(rename = "download-url-prefix")]
    pub download_url_prefix: String,

    /// Optional SQLite archive of every finished job
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: "downloads".to_string(),
            download_url_prefix: "/download".to_string(),
            database_path: None,
        }
    }
}
