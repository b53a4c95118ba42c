use crate::{EngineConfig, EngineError, Result};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub output: PathBuf,
    pub stdout: String,
}

/// The external text <-> binary converter.
///
/// Conversions never touch an in-memory document: they read and write files,
/// and dropping the returned future cancels the conversion.
pub trait Converter {
    fn to_binary(&self, text: &Path, out: &Path) -> impl Future<Output = Result<ConversionOutput>> + Send;
    fn to_text(&self, binary: &Path, out: &Path) -> impl Future<Output = Result<ConversionOutput>> + Send;
}

/// Runs a converter executable as `<program> [args..] -i <from> -o <to> <input> <output>`.
///
/// A non-zero exit status, or anything written to stderr, is an
/// [`EngineError::ExternalToolFailure`] carrying stderr verbatim. Failed runs
/// are not retried.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ProcessConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ProcessConverter { program: program.into(), leading_args: Vec::new() }
    }

    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        config.converter_path.as_ref().map(|path| Self::new(path.clone()))
    }

    /// Arguments placed before the conversion arguments.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn tool_name(&self) -> String {
        self.program.file_stem().map_or_else(|| self.program.display().to_string(), |s| s.to_string_lossy().into_owned())
    }

    async fn run(&self, from: &str, to: &str, input: &Path, output: &Path) -> Result<ConversionOutput> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(["-i", from, "-o", to])
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("running {} ({from} -> {to}) on {}", self.tool_name(), input.display());
        let result = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&result.stderr).trim_end().to_string();

        if !result.status.success() || !stderr.is_empty() {
            return Err(EngineError::ExternalToolFailure { tool: self.tool_name(), status: result.status.code(), stderr });
        }
        log::info!("converted {} -> {}", input.display(), output.display());
        Ok(ConversionOutput { output: output.to_path_buf(), stdout })
    }
}

impl Converter for ProcessConverter {
    fn to_binary(&self, text: &Path, out: &Path) -> impl Future<Output = Result<ConversionOutput>> + Send {
        self.run("text", "bin", text, out)
    }

    fn to_text(&self, binary: &Path, out: &Path) -> impl Future<Output = Result<ConversionOutput>> + Send {
        self.run("bin", "text", binary, out)
    }
}
