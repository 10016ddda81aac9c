//! Shared test infrastructure for integration tests.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const SAMPLE_DOCUMENT: &str = "\
Customer Portal

We need a web portal where customers can log in with SSO, view invoices and
export reports. Integrations with the billing system are expected. Timeline is
tight and the team is small.
";

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
}

/// LM command string that runs the mock script through `sh`.
pub fn mock_lm_command() -> String {
    let script = manifest_dir().join("tests/fixtures/mock-lm.sh");
    format!("sh {}", shell_words::quote(&script.display().to_string()))
}

/// Isolated working directory with a sample document and an empty user
/// config directory, so no real config file or credential leaks in.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("brief.md"), SAMPLE_DOCUMENT)?;
        std::fs::create_dir_all(dir.path().join("config"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn document(&self) -> PathBuf {
        self.path().join("brief.md")
    }

    /// Run the analyzer binary with `args` inside the workspace.
    pub fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        let output = Command::new(env!("CARGO_BIN_EXE_scope-analyzer"))
            .args(args)
            .current_dir(self.path())
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("SCOPE_ANALYZER_LM_COMMAND")
            .env_remove("SCOPE_ANALYZER_MODEL")
            .env_remove("SCOPE_ANALYZER_LOG")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .output()?;
        Ok(output)
    }

    /// Markdown reports written under the default `reports/` directory.
    pub fn default_reports(&self) -> Vec<PathBuf> {
        let dir = self.path().join("reports");
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut reports: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        reports.sort();
        reports
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
