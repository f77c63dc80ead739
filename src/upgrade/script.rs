//! Relaunch scripts for replacing the running executable.
//!
//! A running executable cannot replace itself on Windows. The updater instead
//! writes a small script that waits for the process to exit, deletes the old
//! binary, renames the downloaded one into place and starts it again. The
//! script is started detached and the updater exits immediately after.
//!
//! Scripts are rendered from a list of [`ScriptStep`]s as a `.bat` file on
//! Windows and a POSIX shell script elsewhere. Starting them goes through the
//! [`ScriptLauncher`] trait; [`DetachedLauncher`] is the real implementation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while writing or starting a relaunch script.
#[derive(Debug, Error)]
pub enum ScriptLaunchError {
    /// The script file could not be created or written.
    #[error("failed to write relaunch script in {}: {source}", dir.display())]
    Write {
        /// Directory the script was written to
        dir: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The script interpreter could not be started.
    #[error("failed to start relaunch script {}: {source}", script.display())]
    Spawn {
        /// Script path
        script: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Script dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// Windows batch file run by `cmd.exe`
    Batch,
    /// POSIX shell script run by `/bin/sh`
    Shell,
}

impl ScriptFlavor {
    /// Dialect of the current platform.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(windows) { Self::Batch } else { Self::Shell }
    }

    /// File extension including the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Batch => ".bat",
            Self::Shell => ".sh",
        }
    }
}

/// One instruction of a relaunch script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Wait for the given number of seconds.
    Delay(u64),
    /// Delete a file.
    Delete(PathBuf),
    /// Rename a file within its directory.
    Rename {
        /// Current path
        from: PathBuf,
        /// New path, in the same directory
        to: PathBuf,
    },
    /// Start a program without waiting for it.
    Launch(PathBuf),
    /// End the script.
    Exit,
}

/// An ordered list of steps that replaces and relaunches an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchScript {
    steps: Vec<ScriptStep>,
}

impl RelaunchScript {
    /// Builds the replacement sequence: delay, delete `current_exe`, delay,
    /// rename `new_binary` to `current_exe`, delay, launch, exit.
    #[must_use]
    pub fn replace_executable(current_exe: &Path, new_binary: &Path, delay_secs: u64) -> Self {
        Self {
            steps: vec![
                ScriptStep::Delay(delay_secs),
                ScriptStep::Delete(current_exe.to_path_buf()),
                ScriptStep::Delay(delay_secs),
                ScriptStep::Rename {
                    from: new_binary.to_path_buf(),
                    to: current_exe.to_path_buf(),
                },
                ScriptStep::Delay(delay_secs),
                ScriptStep::Launch(current_exe.to_path_buf()),
                ScriptStep::Exit,
            ],
        }
    }

    /// The steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Renders the script text.
    #[must_use]
    pub fn render(&self, flavor: ScriptFlavor) -> String {
        match flavor {
            ScriptFlavor::Batch => self.render_batch(),
            ScriptFlavor::Shell => self.render_shell(),
        }
    }

    fn render_batch(&self) -> String {
        let mut lines = vec!["@echo off".to_string()];
        for step in &self.steps {
            lines.push(match step {
                ScriptStep::Delay(secs) => format!("timeout /t {secs} /nobreak > nul"),
                ScriptStep::Delete(path) => format!("del \"{}\"", path.display()),
                ScriptStep::Rename {
                    from,
                    to,
                } => {
                    let name = to.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    format!("ren \"{}\" \"{}\"", from.display(), name)
                }
                ScriptStep::Launch(path) => format!("start \"\" \"{}\"", path.display()),
                ScriptStep::Exit => "exit".to_string(),
            });
        }
        lines.join("\r\n") + "\r\n"
    }

    fn render_shell(&self) -> String {
        let mut lines = vec!["#!/bin/sh".to_string()];
        for step in &self.steps {
            lines.push(match step {
                ScriptStep::Delay(secs) => format!("sleep {secs}"),
                ScriptStep::Delete(path) => format!("rm -f {}", shell_quote(path)),
                ScriptStep::Rename {
                    from,
                    to,
                } => format!(
                    "mv -f {} {} && chmod +x {}",
                    shell_quote(from),
                    shell_quote(to),
                    shell_quote(to)
                ),
                ScriptStep::Launch(path) => format!("{} &", shell_quote(path)),
                ScriptStep::Exit => "exit 0".to_string(),
            });
        }
        lines.join("\n") + "\n"
    }

    /// Writes the script into `dir` under a unique name and returns its path.
    ///
    /// The file is kept on disk; the script runs after this process is gone.
    pub fn write(&self, flavor: ScriptFlavor, dir: &Path) -> Result<PathBuf, ScriptLaunchError> {
        let write_err = |source| ScriptLaunchError::Write {
            dir: dir.to_path_buf(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix("skin-updater-relaunch-")
            .suffix(flavor.extension())
            .tempfile_in(dir)
            .map_err(write_err)?;
        file.write_all(self.render(flavor).as_bytes()).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        let (_, path) = file.keep().map_err(|e| write_err(e.error))?;
        debug!("Wrote relaunch script {}", path.display());
        Ok(path)
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Starts a relaunch script.
pub trait ScriptLauncher: Send + Sync {
    /// Starts `script` without waiting for it to finish.
    fn launch(&self, script: &Path) -> Result<(), ScriptLaunchError>;
}

impl<T: ScriptLauncher + ?Sized> ScriptLauncher for &T {
    fn launch(&self, script: &Path) -> Result<(), ScriptLaunchError> {
        (**self).launch(script)
    }
}

/// Starts scripts as detached processes that outlive the updater.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedLauncher;

impl ScriptLauncher for DetachedLauncher {
    fn launch(&self, script: &Path) -> Result<(), ScriptLaunchError> {
        let mut command = detached_command(script);
        command.stdin(Stdio::null());
        command.spawn().map_err(|source| ScriptLaunchError::Spawn {
            script: script.to_path_buf(),
            source,
        })?;
        info!("Started relaunch script {}", script.display());
        Ok(())
    }
}

#[cfg(windows)]
fn detached_command(script: &Path) -> Command {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    let mut command = Command::new("cmd");
    command.arg("/C").arg(script).creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    command
}

#[cfg(unix)]
fn detached_command(script: &Path) -> Command {
    use std::os::unix::process::CommandExt;

    let mut command = Command::new("/bin/sh");
    command.arg(script).process_group(0);
    command
}
