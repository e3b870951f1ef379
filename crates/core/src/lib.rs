pub mod chat;
pub mod classify;
pub mod domain;
pub mod ingest;
pub mod recommend;
pub mod resolve;
pub mod returns;

pub mod config {
    const DEFAULT_AMFI_NAV_URL: &str = "https://www.amfiindia.com/spages/NAVAll.txt";
    const DEFAULT_AMFI_CACHE_PATH: &str = "data/amfi_nav_cache.txt";
    const DEFAULT_SCHEME_HISTORY_BASE_URL: &str = "https://api.mfapi.in/mf";
    const DEFAULT_FUND_PROFILES_PATH: &str = "data/fund_profiles.csv";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub amfi_nav_url: String,
        pub amfi_cache_path: String,
        pub scheme_history_base_url: String,
        pub fund_profiles_path: String,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                amfi_nav_url: env_or("AMFI_NAV_URL", DEFAULT_AMFI_NAV_URL),
                amfi_cache_path: env_or("AMFI_CACHE_PATH", DEFAULT_AMFI_CACHE_PATH),
                scheme_history_base_url: env_or(
                    "SCHEME_HISTORY_BASE_URL",
                    DEFAULT_SCHEME_HISTORY_BASE_URL,
                ),
                fund_profiles_path: env_or("FUND_PROFILES_PATH", DEFAULT_FUND_PROFILES_PATH),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }

    fn env_or(name: &str, default: &str) -> String {
        std::env::var(name)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}
