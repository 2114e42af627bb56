//! Command-line configuration

use crate::client::DEFAULT_API_BASE;
use crate::credentials::TOKEN_URL;
use crate::feed::{DEFAULT_FEED_URL, DEFAULT_STATION, FEED_POLL_INTERVAL};
use crate::schedule::DeviceWaitInterrupt;
use crate::speaker::{SPEAKER_POLL_INTERVAL, SPEAKER_PORT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Mirror a now-playing source onto a Spotify player
#[derive(Parser, Debug, Clone)]
#[command(name = "nowplaying-sync", version, about)]
pub struct Config {
    /// Spotify access token (skips the saved refresh token)
    #[arg(long, env = "SPOTIFY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Saved client id/secret/refresh token
    #[arg(
        long,
        env = "SPOTIFY_CREDENTIALS",
        global = true,
        default_value = "spotify_credentials.json"
    )]
    pub credentials: PathBuf,

    /// Web API base URL
    #[arg(long, env = "SPOTIFY_API_BASE", global = true, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Accounts service token endpoint
    #[arg(long, global = true, hide = true, default_value = TOKEN_URL)]
    pub token_url: String,

    #[command(subcommand)]
    pub source: SourceConfig,
}

/// Which now-playing source to follow
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Follow a radio station's recently-played feed
    Radio {
        /// Station id in the playlist feed
        #[arg(long, default_value_t = DEFAULT_STATION)]
        station: u32,

        /// Playlist search endpoint
        #[arg(long, default_value = DEFAULT_FEED_URL)]
        feed_url: String,

        /// Seconds between polls
        #[arg(
            long,
            default_value_t = FEED_POLL_INTERVAL.as_secs(),
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,
    },

    /// Follow the playback state of a network speaker
    Speaker {
        /// Speaker IP address or hostname
        #[arg(long)]
        host: String,

        /// UPnP control port
        #[arg(long, default_value_t = SPEAKER_PORT)]
        port: u16,

        /// Display name for status lines
        #[arg(long)]
        name: Option<String>,

        /// Seconds between polls
        #[arg(
            long,
            default_value_t = SPEAKER_POLL_INTERVAL.as_secs(),
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,
    },
}

impl SourceConfig {
    /// Delay between polls
    pub fn interval(&self) -> Duration {
        match self {
            SourceConfig::Radio { interval, .. } | SourceConfig::Speaker { interval, .. } => {
                Duration::from_secs(*interval)
            }
        }
    }

    /// Interrupt policy during device waits
    ///
    /// The feed tracker keeps running and just skips the cycle; the speaker
    /// tracker stops altogether.
    pub fn device_wait_interrupt(&self) -> DeviceWaitInterrupt {
        match self {
            SourceConfig::Radio { .. } => DeviceWaitInterrupt::SkipCycle,
            SourceConfig::Speaker { .. } => DeviceWaitInterrupt::Terminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn radio_defaults() {
        let config = Config::try_parse_from(["nowplaying-sync", "radio", "--token", "abc"]).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.source.interval(), FEED_POLL_INTERVAL);
        assert_eq!(config.source.device_wait_interrupt(), DeviceWaitInterrupt::SkipCycle);
        match config.source {
            SourceConfig::Radio { station, feed_url, .. } => {
                assert_eq!(station, 3);
                assert_eq!(feed_url, DEFAULT_FEED_URL);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn speaker_requires_host() {
        assert!(Config::try_parse_from(["nowplaying-sync", "speaker"]).is_err());

        let config = Config::try_parse_from([
            "nowplaying-sync",
            "speaker",
            "--host",
            "192.168.1.20",
            "--name",
            "Kitchen",
        ])
        .unwrap();
        assert_eq!(config.source.interval(), SPEAKER_POLL_INTERVAL);
        assert_eq!(config.source.device_wait_interrupt(), DeviceWaitInterrupt::Terminate);
        assert_eq!(
            config.source,
            SourceConfig::Speaker {
                host: "192.168.1.20".to_string(),
                port: 1400,
                name: Some("Kitchen".to_string()),
                interval: SPEAKER_POLL_INTERVAL.as_secs(),
            }
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Config::try_parse_from(["nowplaying-sync", "radio", "--interval", "0"]).is_err());
    }
}
