use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for fetching issuer key sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound for the whole key set request.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("shcdec/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Reads `SHC_FETCH_TIMEOUT` (whole seconds). Unset or unparsable values
    /// keep the default.
    pub fn from_env() -> Self {
        let timeout = std::env::var("SHC_FETCH_TIMEOUT")
            .ok()
            .and_then(|v| parse_timeout(&v));
        match timeout {
            Some(timeout) => Config::default().with_timeout(timeout),
            None => Config::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_timeout(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[test]
fn parse_timeout_test() {
    assert_eq!(parse_timeout("30"), Some(Duration::from_secs(30)));
    assert_eq!(parse_timeout(" 5\n"), Some(Duration::from_secs(5)));
    assert_eq!(parse_timeout("0"), None);
    assert_eq!(parse_timeout("-1"), None);
    assert_eq!(parse_timeout("soon"), None);
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert!(config.user_agent.starts_with("shcdec/"));
    assert_eq!(
        config.with_timeout(Duration::from_millis(250)).timeout,
        Duration::from_millis(250)
    );
}
