//! Azure CLI command execution.

use crate::config;
use colored::Colorize;
use regex::Regex;
use std::error::Error;
use std::process::Command;
use std::sync::OnceLock;

/// Splits on spaces while keeping quoted substrings together.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|"([^"]*)"\s*|([^'"\s]+)\s*"#).expect("Invalid Regex")
    })
}

/// Run `cmd` and return its stdout.
///
/// Fails on a non-zero exit status or when stdout exceeds [`config::MAX_CLI_OUTPUT`].
pub fn run(cmd: &str) -> Result<String, Box<dyn Error>> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let args = split_and_strip(cmd);
    let (program, rest) = args.split_first().ok_or("Empty command")?;

    let output = Command::new(program).args(rest).output().map_err(|e| {
        log::error!("Command execution failed: {e}");
        format!("Failed to execute {program}: {e}")
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::trace!(
            "code={code:?}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            stderr = stderr.red()
        );
        log::warn!("{} to run {}", "failed".on_red(), cmd.on_blue());
        return Err(format!("ERROR running {program}: {stderr}").into());
    }

    if output.stdout.len() > config::MAX_CLI_OUTPUT {
        return Err(format!(
            "Response too large: {} bytes from {program}",
            output.stdout.len()
        )
        .into());
    }
    log::debug!("Success {program}: {} bytes", output.stdout.len());

    Ok(String::from_utf8(output.stdout).map_err(|e| format!("Invalid UTF-8: {e}"))?)
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .collect()
}
