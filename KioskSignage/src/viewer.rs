//! External viewer processes (video player, PDF viewer) launched for the
//! mounted item.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

const URL_PLACEHOLDER: &str = "{url}";
const STOP_GRACE: Duration = Duration::from_millis(200);
const STOP_POLL: Duration = Duration::from_millis(20);

/// A command template with `{url}` substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ViewerCommand {
    /// Splits `template` on whitespace and substitutes `{url}`. Without a
    /// placeholder the URL is appended as the last argument.
    pub fn from_template(template: &str, url: &str) -> Result<Self> {
        let mut parts = template.split_whitespace();
        let Some(program) = parts.next() else {
            bail!("empty viewer command");
        };

        let mut substituted = false;
        let mut args: Vec<String> = parts
            .map(|part| {
                if part.contains(URL_PLACEHOLDER) {
                    substituted = true;
                    part.replace(URL_PLACEHOLDER, url)
                } else {
                    part.to_string()
                }
            })
            .collect();
        if !substituted {
            args.push(url.to_string());
        }

        Ok(Self {
            program: program.to_string(),
            args,
        })
    }
}

/// A running viewer. Dropping it stops the process.
pub struct ExternalViewer {
    program: String,
    child: Option<Child>,
}

impl ExternalViewer {
    pub fn spawn(command: &ViewerCommand) -> Result<Self> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start viewer '{}'", command.program))?;

        info!(program = %command.program, pid = child.id(), "Viewer started");
        Ok(Self {
            program: command.program.clone(),
            child: Some(child),
        })
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Asks the viewer to exit, then kills it once the grace period is over.
    /// Returns once the process is gone.
    ///
    /// Runs on the caller's thread: the event loop is blocked for at most
    /// `STOP_GRACE` plus the final `wait` on a killed process.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        debug!(program = %self.program, pid, "Stopping viewer");

        #[cfg(unix)]
        {
            let _ = Command::new("kill")
                .arg("-TERM")
                .arg(pid.to_string())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }

        let mut waited = Duration::ZERO;
        while waited < STOP_GRACE {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(program = %self.program, pid, %status, "Viewer exited");
                    return;
                }
                Ok(None) => {
                    thread::sleep(STOP_POLL);
                    waited += STOP_POLL;
                }
                Err(err) => {
                    warn!(program = %self.program, pid, error = %err, "Cannot poll viewer");
                    break;
                }
            }
        }

        warn!(program = %self.program, pid, "Viewer still running, killing it");
        if let Err(err) = child.kill() {
            warn!(program = %self.program, pid, error = %err, "Failed to kill viewer");
        }
        let _ = child.wait();
    }
}

impl Drop for ExternalViewer {
    fn drop(&mut self) {
        self.stop();
    }
}
