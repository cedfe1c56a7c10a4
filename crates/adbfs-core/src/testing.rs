//! Test doubles for the command channel.
//!
//! The protocol, cache and session logic are all exercised against a
//! scripted executor so no test needs a connected device.

use crate::device::CommandRunner;
use std::sync::Mutex;

/// A [`CommandRunner`] that answers from a script and logs every command.
///
/// Responses are registered as substring patterns; the first registered
/// pattern contained in the executed command wins. Unmatched commands
/// return no output, which is exactly how an unreachable device looks.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<Vec<(String, Vec<String>)>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers output lines for commands containing `pattern`.
    pub fn on(&self, pattern: &str, lines: &[&str]) {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), lines.iter().map(|s| (*s).to_string()).collect()));
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many executed commands contained `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.contains(pattern))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> std::io::Result<Vec<String>> {
        self.log.lock().unwrap().push(command.to_string());
        let responses = self.responses.lock().unwrap();
        for (pattern, lines) in responses.iter() {
            if command.contains(pattern.as_str()) {
                return Ok(lines.clone());
            }
        }
        Ok(Vec::new())
    }
}
