// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External command templating and execution.
//!
//! Command lines are split into arguments once, when the template is parsed,
//! and placeholders are substituted per argument afterwards. No shell is
//! involved, so substituted values can never introduce extra arguments.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::CommandError;
use crate::types::Pairing;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z][A-Za-z0-9_]*)\}")
        .unwrap_or_else(|_| unreachable!("placeholder pattern is valid"))
});

/// Values substituted into a [`CommandTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Creates an empty set of variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the variables describing a pairing.
    ///
    /// Sets `nodeId`, `name`, `address`, `port`, and `transport`. Fields the
    /// pairing does not carry are set to the empty string.
    #[must_use]
    pub fn for_pairing(pairing: &Pairing) -> Self {
        Self::new()
            .with(
                "nodeId",
                pairing.node_id.map(|id| id.to_string()).unwrap_or_default(),
            )
            .with("name", pairing.name.as_str())
            .with("address", pairing.address().unwrap_or_default())
            .with(
                "port",
                pairing.port().map(|p| p.to_string()).unwrap_or_default(),
            )
            .with("transport", pairing.transport_name())
    }

    /// Sets a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns the value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// A parsed command line with `{placeholder}` substitution.
///
/// # Examples
///
/// ```
/// use accessory_watch::protocol::{CommandTemplate, TemplateVars};
///
/// let template = CommandTemplate::parse(r#"chip-tool read "{name}" {nodeId}"#).unwrap();
/// let argv = template
///     .render(&TemplateVars::new().with("name", "Living Room").with("nodeId", "7"))
///     .unwrap();
/// assert_eq!(argv, ["chip-tool", "read", "Living Room", "7"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Parses a command line.
    ///
    /// Arguments are separated by whitespace; double quotes group an argument
    /// and `\"` inside quotes is a literal quote.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Template`] on an unterminated quote and
    /// [`CommandError::Empty`] if the line has no arguments.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let args = split_args(line)?;
        if args.is_empty() {
            return Err(CommandError::Empty);
        }
        Ok(Self {
            raw: line.to_string(),
            args,
        })
    }

    /// Returns the template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitutes placeholders and returns the argument vector.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Template`] if a placeholder has no value.
    pub fn render(&self, vars: &TemplateVars) -> Result<Vec<String>, CommandError> {
        self.args.iter().map(|arg| substitute(arg, vars)).collect()
    }
}

fn substitute(arg: &str, vars: &TemplateVars) -> Result<String, CommandError> {
    let mut out = String::with_capacity(arg.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(arg) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = vars
            .get(name.as_str())
            .ok_or_else(|| CommandError::Template(format!("unknown placeholder {{{}}}", name.as_str())))?;
        out.push_str(&arg[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&arg[last..]);
    Ok(out)
}

fn split_args(line: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_arg = true;
            }
            '\\' if quoted => match chars.next() {
                Some('"') => current.push('"'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            c if c.is_whitespace() && !quoted => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if quoted {
        return Err(CommandError::Template(format!("unterminated quote in {line:?}")));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Executes external commands.
///
/// Implementations must enforce `timeout` and report a failed exit status as
/// [`CommandError::NonZeroExit`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `argv` and returns its captured output.
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, CommandError>;
}

/// Runs a command through `runner` with a hard upper bound.
///
/// The timeout is also passed to the runner, but a runner that never
/// completes is still cut off here.
///
/// # Errors
///
/// Returns [`CommandError::Timeout`] if `timeout` elapses first, otherwise
/// the runner's own result.
pub async fn run_bounded(
    runner: &dyn CommandRunner,
    argv: &[String],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    tokio::time::timeout(timeout, runner.run(argv, timeout))
        .await
        .map_err(|_| CommandError::Timeout(timeout_millis(timeout)))?
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// The child is killed if the timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        tracing::debug!(program = %program, args = args.len(), "Running external command");

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout(timeout_millis(timeout)))?
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(CommandError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn split_plain_and_quoted() {
        let template = CommandTemplate::parse(r#"tool  --label "a b"   c"#).unwrap();
        assert_eq!(template.render(&TemplateVars::new()).unwrap(), argv(&["tool", "--label", "a b", "c"]));
    }

    #[test]
    fn split_escaped_quote_and_empty_arg() {
        let template = CommandTemplate::parse(r#"echo "say \"hi\"" """#).unwrap();
        assert_eq!(
            template.render(&TemplateVars::new()).unwrap(),
            argv(&["echo", r#"say "hi""#, ""])
        );
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let err = CommandTemplate::parse(r#"tool "open"#).unwrap_err();
        assert!(matches!(err, CommandError::Template(_)));
    }

    #[test]
    fn blank_line_is_empty() {
        assert!(matches!(CommandTemplate::parse("   ").unwrap_err(), CommandError::Empty));
    }

    #[test]
    fn substitution_keeps_values_in_one_argument() {
        let template = CommandTemplate::parse("query --node={nodeId} {name}").unwrap();
        let vars = TemplateVars::new().with("nodeId", "42").with("name", "Hall way; rm -rf");

        assert_eq!(
            template.render(&vars).unwrap(),
            argv(&["query", "--node=42", "Hall way; rm -rf"])
        );
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let template = CommandTemplate::parse("query {bogus}").unwrap();
        let err = template.render(&TemplateVars::new()).unwrap_err();
        assert!(err.to_string().contains("{bogus}"));
    }

    #[test]
    fn literal_braces_are_kept() {
        let template = CommandTemplate::parse("tool {1,2} {").unwrap();
        assert_eq!(template.render(&TemplateVars::new()).unwrap(), argv(&["tool", "{1,2}", "{"]));
    }

    #[test]
    fn vars_for_pairing() {
        let poll = Pairing::poll("p", "Vacuum", 9);
        let vars = TemplateVars::for_pairing(&poll);
        assert_eq!(vars.get("nodeId"), Some("9"));
        assert_eq!(vars.get("address"), Some(""));
        assert_eq!(vars.get("transport"), Some("ip"));

        let push = Pairing::push("h", "Hub", "10.0.0.9", 51826);
        let vars = TemplateVars::for_pairing(&push);
        assert_eq!(vars.get("address"), Some("10.0.0.9"));
        assert_eq!(vars.get("port"), Some("51826"));
        assert_eq!(vars.get("nodeId"), Some(""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_captures_stdout() {
        let output = ProcessRunner
            .run(&argv(&["sh", "-c", "echo hello"]), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reports_exit_status() {
        let err = ProcessRunner
            .run(&argv(&["sh", "-c", "echo boom >&2; exit 3"]), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            CommandError::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_enforces_timeout() {
        let err = ProcessRunner
            .run(&argv(&["sleep", "5"]), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout(100)));
    }

    struct StuckRunner;

    #[async_trait]
    impl CommandRunner for StuckRunner {
        async fn run(&self, _argv: &[String], _timeout: Duration) -> Result<CommandOutput, CommandError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_bounded_cuts_off_stuck_runner() {
        let err = run_bounded(&StuckRunner, &argv(&["query"]), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout(2000)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_bounded_passes_output_through() {
        let output = run_bounded(&ProcessRunner, &argv(&["sh", "-c", "echo ok"]), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "ok");
    }

    #[tokio::test]
    async fn process_runner_reports_spawn_failure() {
        let err = ProcessRunner
            .run(&argv(&["/nonexistent/definitely-not-here"]), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
