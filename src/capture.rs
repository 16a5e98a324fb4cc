// Session capture splitter
//
// Splits a terminal session log into per-device, per-command output. A
// device section starts at a `<hostname>#terminal length 0` prompt (or at a
// prompt for a different hostname); each `show`/`dir` prompt starts a new
// command whose output runs until the next prompt.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{AuditError, AuditResult};

static PROMPT_REGEX: OnceLock<Regex> = OnceLock::new();

fn prompt_regex() -> &'static Regex {
    PROMPT_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<host>[\w.\-/]+)#\s*(?P<command>.*?)\s*$").expect("Invalid Regex")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapture {
    pub hostname: String,
    /// Commands as typed with their output, without the prompt line, in the
    /// order they were run
    pub commands: Vec<(String, String)>,
}

impl DeviceCapture {
    fn new(hostname: &str) -> Self {
        DeviceCapture {
            hostname: hostname.to_string(),
            commands: Vec::new(),
        }
    }

    /// Output of `show ip route` (IOS) or `show route` (ASA), abbreviations included
    pub fn route_output(&self) -> Option<&str> {
        self.find_output(is_route_command)
    }

    /// Output of `show running-config`
    pub fn running_config(&self) -> Option<&str> {
        self.find_output(is_running_config_command)
    }

    /// The most recent output of a matching command
    fn find_output(&self, predicate: fn(&str) -> bool) -> Option<&str> {
        self.commands
            .iter()
            .rev()
            .find(|(command, _)| predicate(command))
            .map(|(_, output)| output.as_str())
    }
}

/// Split a session log into captures, in the order devices first appear
pub fn split_session_log(text: &str) -> Vec<DeviceCapture> {
    let mut captures: Vec<DeviceCapture> = Vec::new();
    let mut capturing = false;

    for line in text.lines() {
        if let Some(caps) = prompt_regex().captures(line) {
            let host = &caps["host"];
            let typed = &caps["command"];

            let starts_device = is_terminal_length_zero(typed)
                || captures.last().is_none_or(|current| current.hostname != host);
            if starts_device {
                captures.push(DeviceCapture::new(host));
            }

            capturing = is_captured_command(typed);
            if capturing {
                if let Some(current) = captures.last_mut() {
                    current.commands.push((typed.to_string(), String::new()));
                }
            }
            continue;
        }

        if !capturing {
            continue;
        }
        let Some((_, output)) = captures.last_mut().and_then(|c| c.commands.last_mut()) else {
            continue;
        };
        output.push_str(line);
        output.push('\n');
    }

    captures
}

/// Read and split a session log from disk
pub async fn read_session_log(path: &Path) -> AuditResult<Vec<DeviceCapture>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AuditError::Capture(format!("{}: {}", path.display(), e)))?;
    let captures = split_session_log(&text);
    tracing::info!(
        "Loaded {} device capture(s) from {}",
        captures.len(),
        path.display()
    );
    Ok(captures)
}

fn is_terminal_length_zero(command: &str) -> bool {
    let words: Vec<&str> = command.split_whitespace().collect();
    matches!(words.as_slice(), [term, len, "0"]
        if abbreviates(term, "terminal", 4) && abbreviates(len, "length", 3))
}

fn is_captured_command(command: &str) -> bool {
    let first = command.split_whitespace().next().unwrap_or("");
    abbreviates(first, "show", 2) || abbreviates(first, "dir", 3)
}

fn is_route_command(command: &str) -> bool {
    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        [show, "ip", route] => abbreviates(show, "show", 2) && abbreviates(route, "route", 2),
        [show, route] => abbreviates(show, "show", 2) && abbreviates(route, "route", 2),
        _ => false,
    }
}

fn is_running_config_command(command: &str) -> bool {
    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        [show, run] => abbreviates(show, "show", 2) && abbreviates(run, "running-config", 3),
        _ => false,
    }
}

/// `word` is `keyword` or an IOS-style abbreviation of at least `min` characters
fn abbreviates(word: &str, keyword: &str, min: usize) -> bool {
    word.len() >= min && keyword.starts_with(word)
}
