//! tratto — render Mermaid diagram text to an image via the Mermaid CLI.
//!
//! The crate is a thin, synchronous pipeline: a [`render::RenderRequest`] is
//! staged into ephemeral input files, translated into an `mmdc` invocation,
//! executed under a fixed time budget, and classified into the closed
//! [`render::RenderOutcome`] set.

pub mod config;
pub mod render;
pub mod telemetry;
