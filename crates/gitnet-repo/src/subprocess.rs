//! Invokes the `git` binary and captures its output.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{RepoError, Result};

/// Builder for a single `git` invocation inside a repository directory.
///
/// Output is always captured; a non-zero exit status becomes
/// [`RepoError::Command`] carrying the trimmed stderr.
#[derive(Debug, Clone)]
pub struct GitCommand {
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl GitCommand {
    /// Create a builder running in `working_dir`.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Run the command and return its raw stdout.
    pub fn output(&self) -> Result<Vec<u8>> {
        let output = Command::new("git")
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| RepoError::Spawn {
                command: self.rendered(),
                source,
            })?;

        if !output.status.success() {
            return Err(RepoError::Command {
                command: self.rendered(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run the command and return stdout decoded as UTF-8, lossily.
    pub fn output_utf8(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.output()?).into_owned())
    }

    /// The command line for error messages.
    fn rendered(&self) -> String {
        let mut rendered = String::from("git");
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}
