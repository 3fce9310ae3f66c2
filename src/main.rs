use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
};

use thiserror::Error;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use tratto::{
    config::{self, CliArgs},
    render::{
        DiagramRenderer, OutputFormat, RenderError, RenderOutcome, RenderRequest, ScratchSpace,
    },
    telemetry,
};

const INSTALL_HINT: &str = "Mermaid CLI not found. Install it with:\n  npm install -g @mermaid-js/mermaid-cli";

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_TOOL_MISSING: u8 = 2;
const EXIT_TIMED_OUT: u8 = 3;
const EXIT_USAGE: u8 = 4;

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::LoadError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("failed to read diagram source from `{}`: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "cannot determine the output format from `{}`; pass --format",
        .path.display()
    )]
    UnknownFormat { path: PathBuf },
    #[error(transparent)]
    Render(#[from] RenderError),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            report_run_error(&error);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run() -> Result<u8, RunError> {
    let (args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let source = read_source(&args.input)?;
    let request = RenderRequest {
        source,
        output: args.output.clone(),
        format: resolve_format(&args)?,
        scale: args.scale,
        theme: args.theme,
        transparent: args.transparent,
    };

    info!(
        target = "tratto::main",
        input = %args.input.display(),
        output = %request.output.display(),
        format = request.format.as_str(),
        theme = request.theme.as_str(),
        "Generating diagram"
    );

    let renderer = DiagramRenderer::new(
        settings.renderer.cli_path,
        settings.renderer.timeout,
        ScratchSpace::new(settings.renderer.scratch_dir),
    );

    let outcome = renderer.render(&request)?;
    Ok(report_outcome(&outcome))
}

fn resolve_format(args: &CliArgs) -> Result<OutputFormat, RunError> {
    if let Some(format) = args.format {
        return Ok(format);
    }
    OutputFormat::from_extension(&args.output).ok_or_else(|| RunError::UnknownFormat {
        path: args.output.clone(),
    })
}

fn read_source(input: &Path) -> Result<String, RunError> {
    let read = |path: &Path| -> io::Result<String> {
        if path == Path::new("-") {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        } else {
            fs::read_to_string(path)
        }
    };

    read(input).map_err(|source| RunError::ReadInput {
        path: input.to_path_buf(),
        source,
    })
}

fn report_outcome(outcome: &RenderOutcome) -> u8 {
    match outcome {
        RenderOutcome::Success { output } => {
            println!("{}", output.display());
            EXIT_SUCCESS
        }
        RenderOutcome::ToolMissing => {
            eprintln!("{INSTALL_HINT}");
            EXIT_TOOL_MISSING
        }
        RenderOutcome::TimedOut => {
            eprintln!("Rendering timed out; the renderer was terminated.");
            EXIT_TIMED_OUT
        }
        RenderOutcome::Failed { diagnostics } => {
            eprintln!("Rendering failed:\n{diagnostics}");
            EXIT_FAILED
        }
        RenderOutcome::Cancelled => {
            eprintln!("Rendering was cancelled before completion.");
            EXIT_FAILED
        }
    }
}

fn report_run_error(error: &RunError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "tratto failed");
    } else {
        let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
        let dispatch = Dispatch::new(subscriber);
        dispatcher::with_default(&dispatch, || {
            error!(error = %error, "tratto failed");
        });
    }
    eprintln!("{error}");
}
