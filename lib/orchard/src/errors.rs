use std::fmt;
use std::io;

/// Failure of a single external tool invocation.
#[derive(Debug)]
pub enum ToolError {
    /// The executable could not be spawned at all.
    Spawn { program: String, source: io::Error },

    /// The tool ran but exited with a non-zero status. The captured streams
    /// are kept around so the caller can surface the tool's own diagnostics.
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl std::error::Error for ToolError {}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ToolError::Spawn { program, source } => {
                write!(f, "could not run '{}': {}", program, source)
            }
            ToolError::Failed {
                program,
                code,
                stdout,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "'{}' exited with status {}", program, code)?,
                    None => write!(f, "'{}' was terminated by a signal", program)?,
                }
                if !stdout.trim().is_empty() {
                    write!(f, ": {}", stdout.trim())?;
                }
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
        }
    }
}

/// Failure of one of the build phases that drive external tools.
#[derive(Debug)]
pub enum StepError {
    /// A tool invocation failed while processing `subject`.
    Tool { subject: String, source: ToolError },

    /// A plain filesystem operation failed.
    Io { path: String, source: io::Error },

    /// A packed image has to be generated but the optional packer tool was
    /// not found during the pre-flight check.
    MissingPacker { output: String },
}

impl std::error::Error for StepError {}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepError::Tool { subject, source } => write!(f, "{}: {}", subject, source),
            StepError::Io { path, source } => write!(f, "{}: {}", path, source),
            StepError::MissingPacker { output } => write!(
                f,
                "cannot generate '{}': the image packer is not available",
                output
            ),
        }
    }
}

/// Failure while composing the system image out of its segments.
#[derive(Debug)]
pub enum ComposeError {
    /// A segment's target address lies below the base address of the image.
    BelowBase {
        name: String,
        address: u16,
        base: u16,
    },

    /// A segment would end past the end of the template buffer.
    PastEnd {
        name: String,
        address: u16,
        len: usize,
        size: usize,
    },

    /// Two segments cover a common byte range and the strict policy is on.
    Overlap { name: String, other: String },

    Io { path: String, source: io::Error },
}

impl std::error::Error for ComposeError {}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComposeError::BelowBase {
                name,
                address,
                base,
            } => write!(
                f,
                "segment '{}' at ${:04X} lies below the image base ${:04X}",
                name, address, base
            ),
            ComposeError::PastEnd {
                name,
                address,
                len,
                size,
            } => write!(
                f,
                "segment '{}' at ${:04X} ({} bytes) ends past the image template ({} bytes)",
                name, address, len, size
            ),
            ComposeError::Overlap { name, other } => write!(
                f,
                "segment '{}' overlaps the range already covered by '{}'",
                name, other
            ),
            ComposeError::Io { path, source } => write!(f, "{}: {}", path, source),
        }
    }
}

/// One or more required tools were not found during the pre-flight check.
#[derive(Debug)]
pub struct MissingTools {
    pub paths: Vec<String>,
}

impl std::error::Error for MissingTools {}

impl fmt::Display for MissingTools {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "required build tools could not be found: {}",
            self.paths.join(", ")
        )
    }
}
