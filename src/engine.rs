//! The formatting engine under test.
//!
//! The harness never formats anything itself. It talks to an engine through [`Formatter`], which
//! is either implemented in-process or backed by an external program via [`CommandEngine`].

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::options::OptionSet;

/// The engine rejected its input, or could not be reached at all
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(fmtspec::engine))]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub formatted: String,
    /// Where the cursor ends up in `formatted`, if one was requested
    pub cursor_offset: Option<usize>,
}

pub trait Formatter {
    fn format_with_cursor(&self, text: &str, options: &OptionSet)
        -> Result<Formatted, EngineError>;

    /// Parse `text` into a tree stripped of everything formatting is allowed to change
    fn parse(&self, text: &str, options: &OptionSet) -> Result<Value, EngineError>;
}

/// Which of two interchangeable builds of the engine a run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineBuild {
    #[default]
    Local,
    Standalone,
}

impl EngineBuild {
    pub fn select<'a, F: ?Sized>(self, local: &'a F, standalone: &'a F) -> &'a F {
        match self {
            EngineBuild::Local => local,
            EngineBuild::Standalone => standalone,
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    text: &'a str,
    options: &'a OptionSet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatResponse {
    formatted: String,
    #[serde(default)]
    cursor_offset: Option<i64>,
}

/// An engine run as a child process, once per request.
///
/// The program is invoked as `<program> [args] format` or `<program> [args] parse` with a JSON
/// request `{"text": ..., "options": {...}}` on stdin. On success it prints a JSON response on
/// stdout; on failure it exits non-zero with the error message on stderr.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandEngine {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn request(&self, mode: &str, text: &str, options: &OptionSet) -> Result<Vec<u8>, EngineError> {
        let request = serde_json::to_vec(&Request { text, options })
            .map_err(|err| EngineError::new(format!("failed to encode request: {err}")))?;
        trace!(program = %self.program.display(), mode, "Spawning engine");

        let mut proc = Command::new(&self.program)
            .args(&self.args)
            .arg(mode)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                EngineError::new(format!("failed to run {}: {err}", self.program.display()))
            })?;
        if let Some(mut stdin) = proc.stdin.take() {
            stdin
                .write_all(&request)
                .map_err(|err| EngineError::new(format!("failed to send request: {err}")))?;
        }
        let output = proc
            .wait_with_output()
            .map_err(|err| EngineError::new(format!("engine did not finish: {err}")))?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(EngineError::new(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ))
        }
    }
}

impl Formatter for CommandEngine {
    fn format_with_cursor(
        &self,
        text: &str,
        options: &OptionSet,
    ) -> Result<Formatted, EngineError> {
        let stdout = self.request("format", text, options)?;
        let response: FormatResponse = serde_json::from_slice(&stdout)
            .map_err(|err| EngineError::new(format!("malformed format response: {err}")))?;
        Ok(Formatted {
            formatted: response.formatted,
            cursor_offset: response
                .cursor_offset
                .and_then(|offset| usize::try_from(offset).ok()),
        })
    }

    fn parse(&self, text: &str, options: &OptionSet) -> Result<Value, EngineError> {
        let stdout = self.request("parse", text, options)?;
        serde_json::from_slice(&stdout)
            .map_err(|err| EngineError::new(format!("malformed parse response: {err}")))
    }
}
