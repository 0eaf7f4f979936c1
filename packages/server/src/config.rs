//! Server and room configuration.
//!
//! Command-line flags fall back to `EDGEROOMS_*` environment variables and then
//! to the built-in defaults.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;

use crate::infrastructure::completion::{
    OpenAiConfig,
    openai::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL},
};

/// Base URL used when only an API key is configured
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";

/// Flag combinations that parse but cannot run
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A connection must survive one missed sweep before it is evicted
    #[error(
        "heartbeat interval ({heartbeat_secs}s) must be shorter than the stale threshold ({stale_secs}s)"
    )]
    HeartbeatNotShorterThanStale { heartbeat_secs: u64, stale_secs: u64 },
}

/// Per-room tuning shared by every room coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Interval between heartbeat sweeps
    pub heartbeat_interval: Duration,
    /// Connections silent for longer than this are evicted
    pub stale_after: Duration,
    /// Delay between the first pinned-memory change and its flush
    pub memory_debounce: Duration,
    /// Maximum number of chat entries kept per room
    pub history_capacity: usize,
    /// History is persisted after this many appended entries
    pub history_flush_every: usize,
    /// Number of recent chat entries included in AI prompts
    pub ai_context_entries: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(45),
            memory_debounce: Duration::from_secs(1),
            history_capacity: 50,
            history_flush_every: 5,
            ai_context_entries: 20,
        }
    }
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory for the file store; in-memory store when `None`
    pub data_dir: Option<PathBuf>,
    /// Completion endpoint; AI features answer "not configured" when `None`
    pub ai: Option<OpenAiConfig>,
    pub log_level: String,
    pub room: RoomConfig,
}

#[derive(Parser, Debug)]
#[command(name = "edgerooms-server")]
#[command(about = "Per-room real-time collaboration server", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "EDGEROOMS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "EDGEROOMS_PORT", default_value = "8080")]
    port: u16,

    /// Directory where room state is stored as JSON files (in-memory if omitted)
    #[arg(long, env = "EDGEROOMS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible completion API
    #[arg(long, env = "EDGEROOMS_AI_BASE_URL")]
    ai_base_url: Option<String>,

    /// Model name sent to the completion API
    #[arg(long, env = "EDGEROOMS_AI_MODEL", default_value = DEFAULT_MODEL)]
    ai_model: String,

    /// Bearer token for the completion API
    #[arg(long, env = "EDGEROOMS_AI_API_KEY", hide_env_values = true)]
    ai_api_key: Option<String>,

    /// Maximum output tokens per completion
    #[arg(long, env = "EDGEROOMS_AI_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    ai_max_tokens: u32,

    /// Seconds between heartbeat sweeps
    #[arg(long, env = "EDGEROOMS_HEARTBEAT_SECS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_secs: u64,

    /// Seconds of silence after which a connection is evicted
    #[arg(long, env = "EDGEROOMS_STALE_SECS", default_value_t = 45,
          value_parser = clap::value_parser!(u64).range(1..))]
    stale_secs: u64,

    /// Milliseconds to wait before persisting pinned memory changes
    #[arg(long, env = "EDGEROOMS_MEMORY_DEBOUNCE_MS", default_value_t = 1000)]
    memory_debounce_ms: u64,

    /// Number of chat entries kept per room
    #[arg(long, env = "EDGEROOMS_HISTORY_CAPACITY", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..))]
    history_capacity: u64,

    /// Persist history after this many new entries
    #[arg(long, env = "EDGEROOMS_HISTORY_FLUSH_EVERY", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    history_flush_every: u64,

    /// Recent chat entries included in AI prompts
    #[arg(long, env = "EDGEROOMS_AI_CONTEXT_ENTRIES", default_value_t = 20)]
    ai_context_entries: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "EDGEROOMS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    /// Default log level, needed before the rest of the flags are resolved
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Resolve flags into the server configuration
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        if self.heartbeat_secs >= self.stale_secs {
            return Err(ConfigError::HeartbeatNotShorterThanStale {
                heartbeat_secs: self.heartbeat_secs,
                stale_secs: self.stale_secs,
            });
        }

        let ai = match (self.ai_base_url, self.ai_api_key) {
            (None, None) => None,
            (base_url, api_key) => Some(OpenAiConfig {
                base_url: base_url.unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
                model: self.ai_model,
                api_key,
                max_tokens: self.ai_max_tokens,
            }),
        };

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            data_dir: self.data_dir,
            ai,
            log_level: self.log_level,
            room: RoomConfig {
                heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
                stale_after: Duration::from_secs(self.stale_secs),
                memory_debounce: Duration::from_millis(self.memory_debounce_ms),
                history_capacity: self.history_capacity as usize,
                history_flush_every: self.history_flush_every as usize,
                ai_context_entries: self.ai_context_entries as usize,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_room_config_default() {
        // テスト項目: 引数なしの場合、既定のルーム設定になる
        // given (前提条件):
        let args = Args::try_parse_from(["edgerooms-server"]).unwrap();

        // when (操作):
        let config = args.into_config().unwrap();

        // then (期待する結果):
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.room, RoomConfig::default());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_api_key_alone_enables_default_endpoint() {
        // テスト項目: API キーのみ指定した場合は既定のエンドポイントが使われる
        // given (前提条件):
        let args =
            Args::try_parse_from(["edgerooms-server", "--ai-api-key", "sk-test"]).unwrap();

        // when (操作):
        let config = args.into_config().unwrap();

        // then (期待する結果):
        let ai = config.ai.unwrap();
        assert_eq!(ai.base_url, DEFAULT_AI_BASE_URL);
        assert_eq!(ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(ai.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_heartbeat_must_be_shorter_than_stale_threshold() {
        // テスト項目: ハートビート間隔が失効閾値以上の設定は拒否される
        // given (前提条件):
        let longer = Args::try_parse_from([
            "edgerooms-server",
            "--heartbeat-secs",
            "60",
            "--stale-secs",
            "45",
        ])
        .unwrap();
        let equal = Args::try_parse_from([
            "edgerooms-server",
            "--heartbeat-secs",
            "45",
            "--stale-secs",
            "45",
        ])
        .unwrap();
        let shorter = Args::try_parse_from([
            "edgerooms-server",
            "--heartbeat-secs",
            "10",
            "--stale-secs",
            "15",
        ])
        .unwrap();

        // when (操作):
        let longer = longer.into_config();
        let equal = equal.into_config();
        let shorter = shorter.into_config();

        // then (期待する結果):
        assert_eq!(
            longer.err(),
            Some(ConfigError::HeartbeatNotShorterThanStale {
                heartbeat_secs: 60,
                stale_secs: 45
            })
        );
        assert!(equal.is_err());
        let room = shorter.unwrap().room;
        assert_eq!(room.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(room.stale_after, Duration::from_secs(15));
    }

    #[test]
    fn test_zero_flush_threshold_is_rejected() {
        // テスト項目: 0 のフラッシュ閾値は拒否される
        // given (前提条件):
        let argv = ["edgerooms-server", "--history-flush-every", "0"];

        // when (操作):
        let result = Args::try_parse_from(argv);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
