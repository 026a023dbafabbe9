use crate::errors::ToolError;
use std::process::Command;

/// What an external tool left behind after running to completion.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Anything that can run an external tool to completion. The build phases
/// only ever talk to tools through this trait, so tests can drive them with
/// fakes instead of spawning real executables.
pub trait Runner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError>;
}

/// The real thing: spawns the program synchronously with captured output.
pub struct System;

impl Runner for System {
    fn run(&mut self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ToolError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run the given program and treat any non-zero exit as an error carrying the
/// captured streams.
pub fn run_checked(
    runner: &mut dyn Runner,
    program: &str,
    args: &[String],
) -> Result<ToolOutput, ToolError> {
    let output = runner.run(program, args)?;
    if output.success() {
        Ok(output)
    } else {
        Err(ToolError::Failed {
            program: program.to_string(),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
