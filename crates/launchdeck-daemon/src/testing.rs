//! Scripted command runner for exercising the bridge without launchd.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::DaemonError;
use crate::launchd::{CommandOutput, CommandRunner};

/// Records every invocation and answers from a table of canned outputs.
///
/// A response applies to any invocation whose arguments start with the
/// registered prefix; earlier registrations win. Unmatched invocations
/// succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<Vec<(Vec<String>, CommandOutput)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer invocations starting with `prefix` with `output`.
    pub fn respond(&self, prefix: &[&str], output: CommandOutput) {
        self.responses
            .lock()
            .push((prefix.iter().map(|s| s.to_string()).collect(), output));
    }

    /// Arguments of every invocation so far, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Number of invocations whose first argument is `verb`.
    pub fn count(&self, verb: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some(verb))
            .count()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput, DaemonError> {
        self.calls.lock().push(args.to_vec());
        let responses = self.responses.lock();
        let output = responses
            .iter()
            .find(|(prefix, _)| args.starts_with(prefix))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""));
        Ok(output)
    }
}
