//! touchpilot: vision-driven HID automation agent, entry point.
//!
//! # Usage
//!
//! ```text
//! touchpilot [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML config file [default: platform config dir]
//!   --objective <TEXT>     Goal handed to the decision producer
//!   --transport <KIND>     gadget | bridge | gatt
//!   --max-cycles <N>       Stop after N cycles (0 = unlimited)
//!   --frames <PATH>        Image file or directory to replay as frames
//!   --script <PATH>        Script of recorded decision replies
//!   --print-config         Print the effective configuration and exit
//! ```
//!
//! # Environment variable overrides
//!
//! Every option can also be set through the environment.  CLI args take
//! precedence when both are present; both take precedence over the file.
//!
//! | Variable                | Option          |
//! |-------------------------|-----------------|
//! | `TOUCHPILOT_CONFIG`     | `--config`      |
//! | `TOUCHPILOT_OBJECTIVE`  | `--objective`   |
//! | `TOUCHPILOT_TRANSPORT`  | `--transport`   |
//! | `TOUCHPILOT_MAX_CYCLES` | `--max-cycles`  |
//! | `TOUCHPILOT_FRAMES`     | `--frames`      |
//! | `TOUCHPILOT_SCRIPT`     | `--script`      |
//!
//! `RUST_LOG` overrides the configured `log_level`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchpilot_agent::application::retry::RetryError;
use touchpilot_agent::application::sequencer::{ActionSequencer, SequencerError};
use touchpilot_agent::infrastructure::capture::{CaptureSession, ImageFileSource};
use touchpilot_agent::infrastructure::decision::ScriptedDecisionProducer;
use touchpilot_agent::infrastructure::storage::config::{load_config, load_config_from, AppConfig};
use touchpilot_agent::infrastructure::transport::build_sink;
use touchpilot_core::TransportFamily;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drives a touch-screen device from screen captures and model decisions.
#[derive(Debug, Parser)]
#[command(
    name = "touchpilot",
    about = "Vision-driven HID automation agent for touch-screen devices",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// When omitted, `touchpilot/config.toml` in the platform config directory
    /// is used if it exists; otherwise built-in defaults apply.
    #[arg(long, env = "TOUCHPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Goal handed to the decision producer every cycle.
    #[arg(long, env = "TOUCHPILOT_OBJECTIVE")]
    objective: Option<String>,

    /// Transport family: `gadget`, `bridge` or `gatt`.
    #[arg(long, env = "TOUCHPILOT_TRANSPORT")]
    transport: Option<TransportFamily>,

    /// Stop after this many cycles; `0` runs until `done` or Ctrl-C.
    #[arg(long, env = "TOUCHPILOT_MAX_CYCLES")]
    max_cycles: Option<u64>,

    /// Image file or directory replayed as captured frames.
    #[arg(long, env = "TOUCHPILOT_FRAMES")]
    frames: Option<PathBuf>,

    /// Script of recorded decision replies, one per line.
    #[arg(long, env = "TOUCHPILOT_SCRIPT")]
    script: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Loads the config file and applies the CLI overrides on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `--config` file cannot be read, or if
    /// any config file is malformed.
    fn into_app_config(self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => load_config().context("failed to load config from the platform config dir")?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(self, config: &mut AppConfig) {
        if let Some(objective) = self.objective {
            config.agent.objective = objective;
        }
        if let Some(kind) = self.transport {
            config.transport.kind = kind;
        }
        if let Some(max_cycles) = self.max_cycles {
            config.agent.max_cycles = max_cycles;
        }
        if let Some(frames) = self.frames {
            config.capture.source = frames;
        }
        if let Some(script) = self.script {
            config.decision.script = script;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the config file.
/// 2. `tracing_subscriber` is initialised from `RUST_LOG`, falling back to the
///    configured `log_level`.
/// 3. The frame source, decision script and transport sink are built.
/// 4. A Ctrl+C handler clears the shared `running` flag.
/// 5. The transport is connected within the startup budget (fatal on failure)
///    and the sequencer runs until `done`, the cycle limit or Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let print_config = cli.print_config;
    let config = cli.into_app_config()?;

    if print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.agent.log_level)),
        )
        .init();

    info!(
        "touchpilot starting: transport={}, destination={}x{}",
        config.transport.kind, config.destination.width, config.destination.height
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let source = ImageFileSource::open(&config.capture.source).with_context(|| {
        format!("failed to open frame source {}", config.capture.source.display())
    })?;
    let producer = ScriptedDecisionProducer::from_file(&config.decision.script)?;
    let sink = build_sink(config.transport.kind, &config.transport);

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping after the current cycle");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Session ───────────────────────────────────────────────────────────────
    let mut sequencer = ActionSequencer::new(
        config.sequencer_config(),
        CaptureSession::new(Box::new(source)),
        Box::new(producer),
        sink,
    )
    .with_running_flag(running);

    match sequencer.start().await {
        Ok(()) => {}
        Err(SequencerError::Startup(RetryError::Cancelled { attempts })) => {
            info!("touchpilot stopped before the transport came up ({attempts} attempt(s))");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("{} transport did not come up", config.transport.kind))
        }
    }
    let summary = sequencer.run().await;

    info!(
        "touchpilot stopped: {} cycle(s), {} action(s) sent, {} failure(s)",
        summary.cycles, summary.actions_sent, summary.failures
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> Cli {
        Cli {
            config: None,
            objective: None,
            transport: None,
            max_cycles: None,
            frames: None,
            script: None,
            print_config: false,
        }
    }

    #[test]
    fn test_cli_transport_parses_family_names() {
        let cli = Cli::parse_from(["touchpilot", "--transport", "gatt"]);
        assert_eq!(cli.transport, Some(TransportFamily::Gatt));

        let cli = Cli::parse_from(["touchpilot", "--transport", "bridge"]);
        assert_eq!(cli.transport, Some(TransportFamily::LineBridge));
    }

    #[test]
    fn test_cli_rejects_unknown_transport() {
        let result = Cli::try_parse_from(["touchpilot", "--transport", "serial"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_max_cycles_and_print_config() {
        let cli = Cli::parse_from(["touchpilot", "--max-cycles", "7", "--print-config"]);
        assert_eq!(cli.max_cycles, Some(7));
        assert!(cli.print_config);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        // Arrange
        let mut config = AppConfig::default();
        let cli = Cli {
            objective: Some("Open Settings".into()),
            transport: Some(TransportFamily::Gatt),
            max_cycles: Some(3),
            frames: Some(PathBuf::from("shots")),
            ..no_overrides()
        };

        // Act
        cli.apply_overrides(&mut config);

        // Assert
        assert_eq!(config.agent.objective, "Open Settings");
        assert_eq!(config.transport.kind, TransportFamily::Gatt);
        assert_eq!(config.agent.max_cycles, 3);
        assert_eq!(config.capture.source, PathBuf::from("shots"));
        assert_eq!(config.decision.script, AppConfig::default().decision.script);
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let mut config = AppConfig::default();
        config.agent.objective = "from file".into();

        no_overrides().apply_overrides(&mut config);

        assert_eq!(config.agent.objective, "from file");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/touchpilot/config.toml")),
            ..no_overrides()
        };
        assert!(cli.into_app_config().is_err());
    }
}
