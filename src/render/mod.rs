//! The rendering pipeline: one immutable request in, one terminal outcome out.
//!
//! A request flows through four stages: scratch artifacts are materialized,
//! the Mermaid CLI argument list is composed, the renderer runs as a child
//! process under a time budget, and the result is classified into the closed
//! [`RenderOutcome`] set. Scratch artifacts are released on every exit path.

mod artifact;
mod command;
mod invoke;

pub use artifact::ScratchSpace;

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use clap::ValueEnum;
use thiserror::Error;
use tracing::{info, warn};

use self::invoke::{Invocation, InvokeError};

/// Substrings in renderer diagnostics that indicate the tool itself is absent
/// rather than the diagram being invalid.
const TOOL_ABSENT_SIGNATURES: [&str; 2] = ["ENOENT", "command not found"];
const GENERIC_FAILURE: &str = "unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// Infer the format from an output path extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    Default,
    Dark,
    Forest,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Forest => "forest",
        }
    }
}

/// The complete, immutable description of one rendering operation. Built once
/// per invocation and passed explicitly through the pipeline; no component
/// reads ambient state.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: String,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Resolution scale factor; only meaningful for PNG, harmless otherwise.
    pub scale: u32,
    pub theme: Theme,
    /// Transparent background; only affects PNG and SVG output.
    pub transparent: bool,
}

/// The closed set of terminal results of one rendering operation.
#[derive(Debug)]
pub enum RenderOutcome {
    Success {
        output: PathBuf,
    },
    ToolMissing,
    TimedOut,
    Failed {
        diagnostics: String,
    },
    /// Reserved for front ends that can abandon an in-flight render; the
    /// synchronous pipeline never produces it.
    Cancelled,
}

/// Failures that occur before the renderer is ever invoked.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("diagram source is empty")]
    EmptySource,
    #[error("failed to stage renderer input: {0}")]
    Io(#[from] io::Error),
}

/// Drives the Mermaid CLI for one request at a time.
#[derive(Debug, Clone)]
pub struct DiagramRenderer {
    cli_path: PathBuf,
    timeout: Duration,
    scratch: ScratchSpace,
}

impl DiagramRenderer {
    pub fn new(cli_path: PathBuf, timeout: Duration, scratch: ScratchSpace) -> Self {
        Self {
            cli_path,
            timeout,
            scratch,
        }
    }

    /// Run one request through the pipeline. Ephemeral inputs are created
    /// immediately before the invocation and removed on every exit path,
    /// including early errors.
    pub fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, RenderError> {
        if request.source.trim().is_empty() {
            return Err(RenderError::EmptySource);
        }

        let started_at = Instant::now();
        let source = self.scratch.acquire_source(&request.source)?;
        let style = match request.theme {
            Theme::Dark => Some(self.scratch.acquire_style(command::DARK_THEME_CSS)?),
            _ => None,
        };

        let args = command::build_args(
            request,
            source.path(),
            style.as_ref().map(|artifact| artifact.path()),
        );

        let cli_started_at = Instant::now();
        let invocation = invoke::run(&self.cli_path, &args, self.timeout);
        let cli_elapsed_ms = cli_started_at.elapsed().as_millis() as u64;

        let outcome = classify(invocation, &request.output);

        source.release();
        if let Some(style) = style {
            style.release();
        }

        log_outcome(
            &outcome,
            started_at.elapsed().as_millis() as u64,
            cli_elapsed_ms,
        );
        Ok(outcome)
    }
}

/// Map the invoker result onto the closed outcome set. Exit 0 is success;
/// a non-zero exit carries the renderer's own diagnostics, falling back to a
/// generic sentinel when stderr is empty. A tool-absent stderr signature and
/// a failed spawn both map to [`RenderOutcome::ToolMissing`].
fn classify(invocation: Result<Invocation, InvokeError>, output: &Path) -> RenderOutcome {
    match invocation {
        Ok(done) if done.status.success() => RenderOutcome::Success {
            output: output.to_path_buf(),
        },
        Ok(done) => {
            if TOOL_ABSENT_SIGNATURES
                .iter()
                .any(|signature| done.stderr.contains(signature))
            {
                return RenderOutcome::ToolMissing;
            }
            if done.stderr.trim().is_empty() {
                RenderOutcome::Failed {
                    diagnostics: GENERIC_FAILURE.to_string(),
                }
            } else {
                RenderOutcome::Failed {
                    diagnostics: done.stderr,
                }
            }
        }
        Err(InvokeError::NotFound(_)) => RenderOutcome::ToolMissing,
        Err(InvokeError::TimedOut { .. }) => RenderOutcome::TimedOut,
        Err(InvokeError::Io(err)) => RenderOutcome::Failed {
            diagnostics: err.to_string(),
        },
    }
}

fn log_outcome(outcome: &RenderOutcome, elapsed_ms: u64, cli_elapsed_ms: u64) {
    match outcome {
        RenderOutcome::Success { output } => info!(
            target = "tratto::render",
            op = "render",
            result = "success",
            elapsed_ms,
            cli_elapsed_ms,
            output = %output.display(),
            "Diagram rendered"
        ),
        RenderOutcome::ToolMissing => warn!(
            target = "tratto::render",
            op = "render",
            result = "tool_missing",
            elapsed_ms,
            cli_elapsed_ms,
            "Mermaid CLI could not be found"
        ),
        RenderOutcome::TimedOut => warn!(
            target = "tratto::render",
            op = "render",
            result = "timed_out",
            elapsed_ms,
            cli_elapsed_ms,
            "Renderer exceeded its time budget and was terminated"
        ),
        RenderOutcome::Failed { diagnostics } => warn!(
            target = "tratto::render",
            op = "render",
            result = "error",
            elapsed_ms,
            cli_elapsed_ms,
            stderr = %diagnostics,
            "Renderer invocation failed"
        ),
        RenderOutcome::Cancelled => warn!(
            target = "tratto::render",
            op = "render",
            result = "cancelled",
            elapsed_ms,
            cli_elapsed_ms,
            "Render request was cancelled"
        ),
    }
}
