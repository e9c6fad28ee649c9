//! Common helpers for the modelex test suites
//!
//! Model repositories are built with [`modelex::test_utils::ModelFixture`];
//! this module adds running the `modelex` binary against one.

// Not every suite uses every helper
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

pub use modelex::test_utils::ModelFixture;

/// Captured result of one `modelex` invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Panic with both streams unless the command succeeded.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "modelex failed ({:?})\nstdout:\n{}\nstderr:\n{}",
            self.code,
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "modelex unexpectedly succeeded\nstdout:\n{}", self.stdout);
        self
    }
}

/// Run `modelex --model-root <root> <args>` with an isolated, absent config file.
pub fn run_modelex(root: &Path, args: &[&str]) -> Result<CommandOutput> {
    let binary = env!("CARGO_BIN_EXE_modelex");
    let config = root.join(".modelex-test-config.toml");
    let output = Command::new(binary)
        .arg("--model-root")
        .arg(root)
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("MODELEX_CONFIG")
        .env("NO_COLOR", "1")
        .output()
        .context("Failed to run modelex")?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}
