use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{Context, anyhow};
use tracing::{debug, trace};

/// Tactile feedback emitted on day taps and month changes.
///
/// Implementations must return promptly; [`fire`] never waits on the effect
/// and drops any error it reports.
pub trait Feedback {
    fn selection(&self) -> anyhow::Result<()>;
}

/// Fires `feedback` and swallows failures.
pub fn fire(feedback: &dyn Feedback) {
    if let Err(err) = feedback.selection() {
        debug!(error = %err, "selection feedback failed; ignoring");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn selection(&self) -> anyhow::Result<()> {
        trace!("selection feedback");
        Ok(())
    }
}

/// Spawns an external command (a haptics bridge, a sound player) and lets it
/// run detached.
#[derive(Debug, Clone)]
pub struct CommandFeedback {
    program: String,
    args: Vec<String>,
}

impl CommandFeedback {
    /// Splits `command_line` on whitespace; the first word is the program.
    pub fn parse(command_line: &str) -> anyhow::Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| anyhow!("feedback command cannot be empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl CommandFeedback {
    /// Starts the command and hands the child to a thread that waits on it,
    /// so the caller never blocks and no zombie is left behind.
    fn spawn_reaped(&self) -> anyhow::Result<JoinHandle<Option<ExitStatus>>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn feedback command {}", self.program))?;
        let pid = child.id();
        trace!(pid, program = %self.program, "spawned feedback command");

        let program = self.program.clone();
        thread::Builder::new()
            .name("feedback-reaper".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => {
                    trace!(pid, %program, %status, "feedback command exited");
                    Some(status)
                }
                Err(err) => {
                    debug!(pid, %program, error = %err, "failed to wait for feedback command");
                    None
                }
            })
            .context("failed to start feedback reaper thread")
    }
}

impl Feedback for CommandFeedback {
    fn selection(&self) -> anyhow::Result<()> {
        self.spawn_reaped().map(drop)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::Feedback;

    /// Counts calls; optionally fails every one of them.
    #[derive(Debug, Default)]
    pub struct CountingFeedback {
        pub calls: Cell<usize>,
        pub fail: bool,
    }

    impl Feedback for CountingFeedback {
        fn selection(&self) -> anyhow::Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(anyhow!("no haptics engine"))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingFeedback;
    use super::{CommandFeedback, Feedback, fire};

    #[test]
    fn fire_swallows_failures() {
        let feedback = CountingFeedback {
            fail: true,
            ..CountingFeedback::default()
        };
        fire(&feedback);
        fire(&feedback);
        assert_eq!(feedback.calls.get(), 2);
    }

    #[test]
    fn command_feedback_requires_a_program() {
        assert!(CommandFeedback::parse("   ").is_err());
        let parsed = CommandFeedback::parse("paplay /tmp/tick.wav").expect("parse");
        assert_eq!(parsed.program, "paplay");
        assert_eq!(parsed.args, vec!["/tmp/tick.wav".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn spawned_command_is_waited_on() {
        let feedback = CommandFeedback::parse("false").expect("parse");
        let reaper = feedback.spawn_reaped().expect("spawn");
        let status = reaper.join().expect("join").expect("status");
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn selection_does_not_wait_for_the_command() {
        let feedback = CommandFeedback::parse("sleep 5").expect("parse");
        let started = std::time::Instant::now();
        feedback.selection().expect("selection");
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn missing_program_is_swallowed_by_fire() {
        let feedback =
            CommandFeedback::parse("daybook-definitely-missing-binary").expect("parse");
        fire(&feedback);
    }
}
