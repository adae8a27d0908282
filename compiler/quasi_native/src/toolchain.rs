//! C compiler driver.

use std::env;
use std::path::Path;
use std::process::Command;

use crate::BuildError;

/// Environment variables naming the compiler, in priority order.
const COMPILER_VARS: &[&str] = &["QUASI_CC", "CC"];

/// Compilers probed when no variable is set.
const CANDIDATES: &[&str] = &["cc", "gcc", "clang"];

/// Flags every artifact is built with, before the configured extras.
const BASE_FLAGS: &[&str] = &["-O2", "-std=gnu11", "-fPIC", "-shared"];

/// A C compiler invocation prefix, such as `cc` or `ccache gcc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    program: String,
    args: Vec<String>,
}

impl Toolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command prefix. `None` when blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// `$QUASI_CC`, else `$CC`, else the first of `cc`, `gcc`, `clang` that
    /// answers `--version`.
    pub fn detect() -> Result<Self, BuildError> {
        for var in COMPILER_VARS {
            if let Some(toolchain) = env::var(var).ok().as_deref().and_then(Self::from_command_line)
            {
                tracing::debug!(var, compiler = %toolchain.program, "compiler from environment");
                return Ok(toolchain);
            }
        }
        CANDIDATES
            .iter()
            .copied()
            .find(|program| responds(program))
            .map(Self::new)
            .ok_or(BuildError::CompilerNotFound)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `<program> <args> -O2 -std=gnu11 -fPIC -shared -o <output> <source> <extra>`.
    pub fn command(&self, source: &Path, output: &Path, extra: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(BASE_FLAGS)
            .arg("-o")
            .arg(output)
            .arg(source)
            .args(extra);
        cmd
    }

    /// Compile `source` into the shared object `output`.
    ///
    /// A nonzero exit or any `error:` line fails the build with the
    /// compiler's stderr; warnings alone are logged.
    pub fn compile(&self, source: &Path, output: &Path, extra: &[String]) -> Result<(), BuildError> {
        let mut cmd = self.command(source, output, extra);
        tracing::debug!(command = ?cmd, "compiling quote");
        let out = cmd.output().map_err(|source| BuildError::Spawn {
            compiler: self.program.clone(),
            source,
        })?;
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stderr = stderr.trim_end();

        if !out.status.success() || has_errors(stderr) {
            let diagnostics = if stderr.is_empty() {
                format!("{} exited with {}", self.program, out.status)
            } else {
                stderr.to_owned()
            };
            return Err(BuildError::Compilation {
                compiler: self.program.clone(),
                diagnostics,
            });
        }
        if !stderr.is_empty() {
            tracing::warn!(compiler = %self.program, "{stderr}");
        }
        Ok(())
    }
}

fn responds(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

fn has_errors(stderr: &str) -> bool {
    stderr.lines().any(|line| line.contains("error:"))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
