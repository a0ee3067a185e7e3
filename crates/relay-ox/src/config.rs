use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_APOD_URL: &str = "https://api.nasa.gov/planetary/apod";

/// Process configuration, resolved once at startup from flags and the
/// environment and then handed to the components that need it.
#[derive(Debug, Clone, Parser)]
#[command(name = "relay-ox")]
#[command(about = "Streams Claude's answers about an image to the browser")]
pub struct RelayConfig {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Anthropic API key
    #[arg(long, env = "CLAUDE_KEY", hide_env_values = true)]
    pub anthropic_key: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com")]
    pub anthropic_base_url: String,

    #[arg(long, env = "CLAUDE_MODEL", default_value_t = anthropic_ox::Model::default().to_string())]
    pub model: String,

    /// Upper bound on the length of one answer, in tokens
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value_t = 1024)]
    pub max_output_tokens: u32,

    /// Cut off answers that stream for longer than this; unbounded if unset
    #[arg(long, env = "MAX_STREAM_SECS")]
    pub max_stream_secs: Option<u64>,

    /// NASA API key for the image of the day
    #[arg(long, env = "NASA_API_KEY", hide_env_values = true)]
    pub nasa_api_key: String,

    #[arg(long, env = "APOD_URL", default_value = DEFAULT_APOD_URL)]
    pub apod_url: String,
}

impl RelayConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn stream_limit(&self) -> Option<Duration> {
        self.max_stream_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_keys_are_given() {
        let config = RelayConfig::try_parse_from([
            "relay-ox",
            "--anthropic-key",
            "sk-test",
            "--nasa-api-key",
            "DEMO_KEY",
        ])
        .unwrap();

        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.apod_url, DEFAULT_APOD_URL);
        assert_eq!(config.stream_limit(), None);
    }

    #[test]
    fn stream_limit_is_in_seconds() {
        let config = RelayConfig::try_parse_from([
            "relay-ox",
            "--anthropic-key",
            "sk-test",
            "--nasa-api-key",
            "DEMO_KEY",
            "--port",
            "8080",
            "--max-stream-secs",
            "90",
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.stream_limit(), Some(Duration::from_secs(90)));
    }
}
