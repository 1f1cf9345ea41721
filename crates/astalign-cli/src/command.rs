//! Parsers implemented by external programs.

use std::io::Write;
use std::process::{Command, Stdio};

use astalign::{ParserError, SourceParser, SyntaxError};
use serde_json::Value;
use tracing::{debug, warn};

/// Runs `program args...` per parse, feeding the source on stdin and reading
/// a JSON tree from stdout.
///
/// Only a non-zero exit with a diagnostic on stderr is a syntax error. A
/// program that cannot be started, exits silently or prints something other
/// than a JSON tree is a parser failure.
#[derive(Debug, Clone)]
pub struct CommandParser {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandParser {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }
}

impl SourceParser for CommandParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, source: &str) -> Result<Value, ParserError> {
        debug!(parser = %self.name, program = %self.program, "spawning parser");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                warn!(parser = %self.name, program = %self.program, %err, "failed to spawn parser");
                ParserError::failure(format!("failed to run `{}`: {err}", self.program))
            })?;

        // Write on a separate thread so a chatty child cannot fill its stdout
        // pipe while we are still blocked on its stdin.
        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(mut stdin) = stdin {
                    // A child that exits without reading stdin is not an error here.
                    let _ = stdin.write_all(source.as_bytes());
                }
            });
            child.wait_with_output()
        })
        .map_err(|err| ParserError::failure(format!("failed to wait for `{}`: {err}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(if message.is_empty() {
                ParserError::failure(format!("`{}` exited with {} and no diagnostic", self.program, output.status))
            } else {
                SyntaxError::new(message).into()
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| {
            ParserError::failure(format!("`{}` did not print a JSON tree: {err}", self.program))
        })
    }
}
