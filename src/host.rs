use color_eyre::eyre::Context;
use std::{
    fmt::Display, fs, fs::File, io, path::Path, process::{Command, Stdio}
};
use tracing::{debug, instrument};

/// A single external program invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub elevated: bool
}

impl CommandSpec {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self { program: program.into(), args: Vec::new(), elevated: false }
    }

    #[inline]
    #[must_use]
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[inline]
    #[must_use]
    pub const fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.elevated {
            write!(f, "sudo ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String
}

impl CommandOutput {
    /// Both streams, trimmed, for reporting back to the user.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_owned(),
            (true, false) => stderr.to_owned(),
            (false, false) => format!("{stdout}\n{stderr}")
        }
    }
}

/// Everything the prober and dispatcher need from the machine they run on.
pub trait Host {
    fn command_exists(&self, program: &str) -> bool;
    fn path_exists(&self, path: &Path) -> bool;
    fn run(&self, command: &CommandSpec) -> io::Result<CommandOutput>;
    fn fetch(&self, url: &str, dest: &Path) -> color_eyre::Result<()>;
    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

impl<H: Host> Host for &H {
    fn command_exists(&self, program: &str) -> bool {
        (**self).command_exists(program)
    }

    fn path_exists(&self, path: &Path) -> bool {
        (**self).path_exists(path)
    }

    fn run(&self, command: &CommandSpec) -> io::Result<CommandOutput> {
        (**self).run(command)
    }

    fn fetch(&self, url: &str, dest: &Path) -> color_eyre::Result<()> {
        (**self).fetch(url, dest)
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).write_file(path, contents)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        (**self).remove_dir(path)
    }
}

pub struct LiveHost;

impl LiveHost {
    fn build(&self, spec: &CommandSpec) -> Command {
        if spec.elevated && self.command_exists("sudo") {
            let mut cmd = Command::new("sudo");
            cmd.arg(&spec.program).args(&spec.args);
            cmd
        } else {
            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args);
            cmd
        }
    }
}

impl Host for LiveHost {
    fn command_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[instrument(skip(self), fields(command = %command), level = "debug")]
    fn run(&self, command: &CommandSpec) -> io::Result<CommandOutput> {
        // sudo asks for the password on the tty, so stdin stays attached
        let output = self.build(command).stdin(Stdio::inherit()).output()?;

        let ret = CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned()
        };

        debug!(code = ?ret.code, "Command finished");
        Ok(ret)
    }

    #[instrument(skip(self), level = "debug")]
    fn fetch(&self, url: &str, dest: &Path) -> color_eyre::Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).wrap_err("Failed to create download directory")?;
        }

        let mut body = ureq::get(url)
            .call()
            .wrap_err_with(|| format!("Failed to request {url}"))?
            .into_body();

        let mut file = File::create(dest).wrap_err("Failed to create download file")?;
        io::copy(&mut body.as_reader(), &mut file)
            .wrap_err_with(|| format!("Failed to write {}", dest.display()))?;

        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        if path.exists() { fs::remove_dir_all(path) } else { Ok(()) }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_command_displays_with_sudo() {
        let cmd = CommandSpec::new("apt-get").args(["install", "-y", "firefox"]).elevated();
        assert_eq!(cmd.to_string(), "sudo apt-get install -y firefox");
    }

    #[test]
    fn plain_command_displays_without_sudo() {
        let cmd = CommandSpec::new("snap").arg("list");
        assert_eq!(cmd.to_string(), "snap list");
    }

    #[test]
    fn combined_output_joins_both_streams() {
        let out = CommandOutput {
            code: Some(100),
            success: false,
            stdout: String::from("Reading package lists...\n"),
            stderr: String::from("E: Unable to locate package\n")
        };
        assert_eq!(out.combined(), "Reading package lists...\nE: Unable to locate package");
        assert_eq!(CommandOutput::default().combined(), "");
    }

    #[test]
    fn unelevated_live_command_runs_program_directly() {
        let cmd = LiveHost.build(&CommandSpec::new("echo").arg("ok"));
        assert_eq!(cmd.get_program(), "echo");
    }
}
