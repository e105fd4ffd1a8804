//! Configuration and CLI argument handling

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::relay::RelaySettings;

/// Smallest tick period accepted; anything shorter is raised to this.
pub const MIN_TICK_MS: u64 = 50;

/// Which relay strategy drives the completion side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelayBackend {
    /// No hardware attached, actuator calls are only logged
    None,
    /// Kernel pin files under /sys/class/gpio
    Sysfs,
    /// libgpiod command line tools
    Gpioset,
    /// Remote relay service reached over HTTP
    Http,
}

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "shared-countdown")]
#[command(about = "A shared countdown timer broadcast to every viewer in real time")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Countdown duration used when a start request carries none
    #[arg(long, env = "DEFAULT_DURATION_MS", default_value = "45000")]
    pub default_duration_ms: u64,

    /// Ticker period in milliseconds
    #[arg(long, env = "TICK_MS", default_value = "1000")]
    pub tick_ms: u64,

    /// Relay backend to drive when the countdown completes
    #[arg(long, env = "RELAY_BACKEND", value_enum, default_value = "none")]
    pub relay: RelayBackend,

    /// BCM pin number of the relay
    #[arg(long, env = "RELAY_PIN", default_value = "17")]
    pub relay_pin: u32,

    /// Drive the pin low to switch the relay on
    #[arg(long, env = "RELAY_ACTIVE_LOW")]
    pub relay_active_low: bool,

    /// How long the relay stays on after completion (0 keeps it on)
    #[arg(long, env = "RELAY_DURATION_MS", default_value = "10000")]
    pub relay_duration_ms: u64,

    /// Base URL of the remote relay service
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3001")]
    pub relay_url: String,

    /// Upper bound on a single relay call
    #[arg(long, env = "RELAY_TIMEOUT_MS", default_value = "2000")]
    pub relay_timeout_ms: u64,

    /// GPIO chip used by the gpioset backend
    #[arg(long, env = "GPIO_CHIP", default_value = "gpiochip0")]
    pub gpio_chip: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments and environment
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(MIN_TICK_MS))
    }

    /// Collect the relay options into the settings the backends consume
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            backend: self.relay,
            pin: self.relay_pin,
            active_high: !self.relay_active_low,
            url: self.relay_url.trim_end_matches('/').to_string(),
            chip: self.gpio_chip.clone(),
            timeout: Duration::from_millis(self.relay_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = Config::try_parse_from(["shared-countdown"]).unwrap();
        assert_eq!(config.default_duration_ms, 45_000);
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert_eq!(config.relay, RelayBackend::None);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn address_joins_host_and_port() {
        let config =
            Config::try_parse_from(["shared-countdown", "--host", "127.0.0.1", "-p", "8080"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn tick_period_has_a_floor() {
        let config = Config::try_parse_from(["shared-countdown", "--tick-ms", "1"]).unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(MIN_TICK_MS));
    }

    #[test]
    fn relay_settings_follow_flags() {
        let config = Config::try_parse_from([
            "shared-countdown",
            "--relay",
            "http",
            "--relay-active-low",
            "--relay-url",
            "http://pi.local:3001/",
        ])
        .unwrap();
        let relay = config.relay_settings();
        assert_eq!(relay.backend, RelayBackend::Http);
        assert!(!relay.active_high);
        assert_eq!(relay.url, "http://pi.local:3001");
    }
}
