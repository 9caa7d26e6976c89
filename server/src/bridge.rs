use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{process::Command, task::JoinHandle};
use tracing::{info, warn};

use crate::error::{ExploreError, Result};

const PATH_PLACEHOLDER: &str = "{path}";

/// Program plus arguments; `{path}` arguments receive the file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Parses a whitespace-separated command line. No shell quoting.
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty command template"))?;

        Ok(CommandTemplate {
            program,
            args: words.collect(),
        })
    }

    /// Arguments with the path substituted; appended if no placeholder.
    pub fn argv(&self, path: &Path) -> Vec<String> {
        let shown = path.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(PATH_PLACEHOLDER, &shown))
            .collect();

        if !self.args.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
            args.push(shown.into_owned());
        }
        args
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    Converter,
    Streamer,
    Opener,
}

/// The three helper programs files can be handed to.
#[derive(Debug, Clone)]
pub struct Helpers {
    /// Document to HTML, output returned to the client.
    pub converter: CommandTemplate,
    /// Custom media streamer, fire-and-forget.
    pub streamer: CommandTemplate,
    /// Desktop opener, fire-and-forget.
    pub opener: CommandTemplate,
}

impl Helpers {
    pub fn template(&self, kind: HelperKind) -> &CommandTemplate {
        match kind {
            HelperKind::Converter => &self.converter,
            HelperKind::Streamer => &self.streamer,
            HelperKind::Opener => &self.opener,
        }
    }
}

/// Runs the helper to completion. Non-zero exit or any stderr output is
/// a failure; stdout is returned otherwise.
pub async fn run(template: &CommandTemplate, path: &Path) -> Result<String> {
    let output = Command::new(&template.program)
        .args(template.argv(path))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            ExploreError::ExecutionFailed(format!("cannot spawn `{}`: {}", template.program, e))
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        return Err(ExploreError::ExecutionFailed(format!(
            "`{}` exited with {}: {}",
            template.program,
            output.status,
            stderr.trim()
        )));
    }
    if !stderr.trim().is_empty() {
        return Err(ExploreError::ExecutionFailed(format!(
            "`{}` wrote to stderr: {}",
            template.program,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs the helper on its own task. The outcome is only logged.
pub fn launch_detached(template: CommandTemplate, path: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        match run(&template, &path).await {
            Ok(_) => info!("`{}` finished for {}", template.program, path.display()),
            Err(e) => warn!("detached helper failed for {}: {}", path.display(), e),
        }
    })
}
