//! Line-oriented command console driving the dashboard.

use std::io::{BufRead, Write};

use tracing::error;

use visitlog_core::visit::VisitRecord;

use crate::confirm::PromptConfirm;
use crate::error::DashboardError;
use crate::state::DashboardState;

pub const HELP: &str = "Commands: delete <id> | clear | refresh | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Delete(String),
    Clear,
    Refresh,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("too many arguments to {verb:?}. {HELP}"));
        }

        let verb_lc = verb.to_ascii_lowercase();
        let command = match (verb_lc.as_str(), arg) {
            ("delete" | "rm", Some(id)) => Self::Delete(id.to_string()),
            ("delete" | "rm", None) => return Err("usage: delete <id>".to_string()),
            ("clear", None) => Self::Clear,
            ("refresh" | "r", None) => Self::Refresh,
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit" | "q", None) => Self::Quit,
            ("clear" | "refresh" | "r" | "help" | "?" | "quit" | "exit" | "q", Some(_)) => {
                return Err(format!("{verb} takes no arguments"));
            }
            _ => return Err(format!("unknown command {verb:?}. {HELP}")),
        };
        Ok(Some(command))
    }
}

/// Read commands from `input` until `quit` or EOF.
///
/// Confirmation prompts for `delete` and `clear` consume the next input line.
/// A failed store write is reported on `output` and the console keeps going.
pub fn run_console<R: BufRead, W: Write>(
    state: &DashboardState,
    mut input: R,
    mut output: W,
) -> Result<(), DashboardError> {
    writeln!(output, "{HELP}")?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(output, "{message}")?;
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => writeln!(output, "{HELP}")?,
            Command::Refresh => {
                state.refresh();
            }
            Command::Delete(id) => {
                let outcome = {
                    let mut confirm = PromptConfirm::new(&mut input, &mut output);
                    state.request_delete(&id, &mut confirm)
                };
                report(&mut output, outcome, |visits| {
                    format!("Deleted {id}. {} visits remain.", visits.len())
                })?;
            }
            Command::Clear => {
                let outcome = {
                    let mut confirm = PromptConfirm::new(&mut input, &mut output);
                    state.request_clear(&mut confirm)
                };
                report(&mut output, outcome, |_| {
                    "All visitor data cleared.".to_string()
                })?;
            }
        }
        output.flush()?;
    }
    Ok(())
}

fn report<W: Write>(
    output: &mut W,
    outcome: Result<Option<Vec<VisitRecord>>, DashboardError>,
    done: impl FnOnce(&[VisitRecord]) -> String,
) -> Result<(), DashboardError> {
    match outcome {
        Ok(Some(visits)) => writeln!(output, "{}", done(&visits))?,
        Ok(None) => writeln!(output, "Cancelled.")?,
        Err(e) => {
            error!(error = %e, "Dashboard command failed");
            writeln!(output, "Command failed: {e}")?;
        }
    }
    Ok(())
}
