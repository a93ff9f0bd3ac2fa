//! Decision producer boundary.
//!
//! A decision producer looks at the cropped device screen and the session
//! objective and answers with the next [`Decision`].  In production that is a
//! vision-language model behind an HTTP API; prompting and invoking it is
//! outside this crate.  The agent only depends on [`DecisionProducer`].
//!
//! # Scripted producer
//!
//! [`ScriptedDecisionProducer`] replays raw model replies from a text file,
//! one reply per line.  Blank lines and lines starting with `#` are skipped.
//! Each reply goes through the same [`decode_reply`] path a live model reply
//! would, so fenced or prose-wrapped replies behave identically:
//!
//! ~~~text
//! # open Notes, then type
//! {"type":"tap","x":0.25,"y":0.75,"explanation":"Notes icon"}
//! ```json {"type":"type","text":"hello"} ```
//! {"type":"done"}
//! ~~~
//!
//! When the script runs out the producer answers `done`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use touchpilot_core::{decode_reply, Action, Decision, DecodeError, EncodedFrame};
use tracing::debug;

/// Errors a decision producer can return.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The reply could not be turned into an action.
    #[error("undecodable reply: {0}")]
    Decode(#[from] DecodeError),

    /// The script file could not be read.
    #[error("failed to read decision script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can pick the next action for a screen.
#[async_trait]
pub trait DecisionProducer: Send {
    /// Decides the next action for `frame`, working towards `objective`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] if no usable decision was produced.  The
    /// sequencer treats this as "do nothing this cycle".
    async fn decide(&mut self, frame: &EncodedFrame, objective: &str) -> Result<Decision, DecisionError>;
}

/// Replays pre-recorded model replies.
#[derive(Debug, Default)]
pub struct ScriptedDecisionProducer {
    replies: VecDeque<String>,
}

impl ScriptedDecisionProducer {
    /// Loads replies from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Io`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, DecisionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DecisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_script(&text))
    }

    /// Parses a script: one reply per line, `#` comments and blanks skipped.
    pub fn from_script(script: &str) -> Self {
        Self::from_replies(
            script
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl DecisionProducer for ScriptedDecisionProducer {
    async fn decide(&mut self, frame: &EncodedFrame, objective: &str) -> Result<Decision, DecisionError> {
        debug!(
            width = frame.extent.width,
            height = frame.extent.height,
            bytes = frame.bytes.len(),
            objective,
            "scripted decision requested"
        );
        match self.replies.pop_front() {
            Some(reply) => Ok(decode_reply(&reply)?),
            None => Ok(Decision::new(Action::Done).with_explanation("script exhausted")),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
