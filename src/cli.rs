//! Command-line interface for chatrelay
//!
//! Provides argument parsing and subcommand handling for the chatrelay binary.

use clap::{Parser, Subcommand};

/// Thin HTTP relay between chat clients and a hosted LLM completion API
#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Thin HTTP relay between chat clients and a hosted LLM completion API")]
#[command(
    long_about = "chatrelay accepts chat conversations over HTTP, forwards them to a hosted \
    completion API with a server-side credential and returns the reply in a stable shape, \
    optionally with synthesized speech."
)]
pub struct Cli {
    /// Path to configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# chatrelay Configuration
# ========================
#
# Every setting below shows its default. Delete what you do not need to change.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# Timeout in seconds for each outbound call (chat and speech), 1-300
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# COMPLETION SERVICE
# ─────────────────────────────────────────────────────────────────────────────

[upstream]
# Wire contract:
#   - "responses": POST {base_url}/responses
#   - "chat_completions": POST {base_url}/chat/completions
api = "responses"
base_url = "https://api.openai.com/v1"
model = "gpt-4.1"
temperature = 0.7
max_output_tokens = 1000

# Environment variable holding the bearer credential (read once at startup)
api_key_env = "OPENAI_API_KEY"

# Echo the untouched upstream reply as `_raw` for debugging
include_raw = true

# ─────────────────────────────────────────────────────────────────────────────
# SPEECH SYNTHESIS
# ─────────────────────────────────────────────────────────────────────────────

[speech]
# Honour `wantTTS` in requests
enabled = true
model = "tts-1"
voice = "alloy"
format = "mp3"

# Longest reply prefix (in characters) sent for synthesis
max_chars = 800

# ─────────────────────────────────────────────────────────────────────────────
# STRESS POLICY
# ─────────────────────────────────────────────────────────────────────────────

[policy]
# stressLevel values strictly above this append the suffix to a trailing
# system message
stress_threshold = 80.0
intensify_suffix = " The candidate is panicking. Press them harder."

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["chatrelay"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["chatrelay", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["chatrelay", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_is_valid_config() {
        let config: Config = generate_config_template()
            .parse()
            .expect("template should be a valid configuration");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.model, "gpt-4.1");
        assert_eq!(config.speech.max_chars, 800);
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        for section in [
            "[server]",
            "[upstream]",
            "[speech]",
            "[policy]",
            "[observability]",
        ] {
            assert!(template.contains(section), "missing {}", section);
        }
    }
}
