//! The `invoke` and `tools` front-ends.
//!
//! Rendering is separated from printing: [`invoke`] returns a [`CliOutput`]
//! and `main` writes it out and exits with its code.

pub mod format;

use crate::error::ToolkitError;
use crate::tools::args::parse_cli_args;
use crate::tools::dispatch::Dispatcher;
use serde_json::{Value, json};

/// What one CLI run prints and how it exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOutput {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: i32,
}

impl CliOutput {
    fn out(text: String) -> Self {
        Self {
            stdout: Some(text),
            ..Self::default()
        }
    }

    fn fail(text: String) -> Self {
        Self {
            stderr: Some(text),
            exit_code: 1,
            ..Self::default()
        }
    }

    /// Print to the process streams.
    pub fn emit(&self) {
        if let Some(text) = &self.stdout {
            println!("{}", text);
        }
        if let Some(text) = &self.stderr {
            eprintln!("{}", text);
        }
    }
}

fn error_json(e: &ToolkitError) -> String {
    json!({ "error": e.to_string() }).to_string()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Run `invoke <tool> [--key value]...`.
///
/// Exit 0 for help, success and domain failures (the latter print
/// `{"error": ...}` on stdout). Exit 1 for unknown tools, bad arguments and
/// unexpected errors, all reported on stderr.
pub async fn invoke(dispatcher: &Dispatcher, tool: Option<&str>, tokens: &[String]) -> CliOutput {
    let name = match tool {
        None | Some("help") => return CliOutput::out(dispatcher.registry().usage()),
        Some(name) => name,
    };

    let raw = match parse_cli_args(tokens) {
        Ok(raw) => raw,
        Err(e) => return CliOutput::fail(error_json(&e)),
    };

    match dispatcher.dispatch(name, raw).await {
        Ok(outcome) => CliOutput::out(pretty(&outcome.to_value())),
        Err(ToolkitError::UnknownTool { name }) => CliOutput::fail(format!(
            "Unknown command: {}\n\n{}",
            name,
            dispatcher.registry().usage()
        )),
        Err(e) => CliOutput::fail(error_json(&e)),
    }
}

/// Run `tools`: a table of every registered tool.
pub fn list_tools(dispatcher: &Dispatcher) -> CliOutput {
    CliOutput::out(format::tools_table(dispatcher.registry()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::MUTATION_DISABLED_MESSAGE;
    use crate::tools::context::ToolContext;
    use crate::tools::registry::ToolRegistry;
    use std::sync::Arc;

    fn dispatcher(readonly: bool) -> Dispatcher {
        let mut config = Config::default_config();
        config.readonly = readonly;
        let ctx = ToolContext::from_config(&config).unwrap();
        Dispatcher::new(Arc::new(ToolRegistry::standard().unwrap()), Arc::new(ctx))
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn stdout_json(output: &CliOutput) -> Value {
        serde_json::from_str(output.stdout.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_help_and_no_command() {
        let d = dispatcher(false);
        for tool in [None, Some("help")] {
            let output = invoke(&d, tool, &[]).await;
            assert_eq!(output.exit_code, 0);
            assert!(output.stdout.unwrap().starts_with("Usage: leg-toolkit invoke"));
            assert!(output.stderr.is_none());
        }
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let output = invoke(&dispatcher(false), Some("drop_everything"), &[]).await;
        assert_eq!(output.exit_code, 1);
        assert!(output.stdout.is_none());
        let stderr = output.stderr.unwrap();
        assert!(stderr.starts_with("Unknown command: drop_everything"));
        assert!(stderr.contains("search_registrations"));
    }

    #[tokio::test]
    async fn test_missing_parameter_goes_to_stderr() {
        let output = invoke(&dispatcher(false), Some("get_registration"), &[]).await;
        assert_eq!(output.exit_code, 1);
        let err: Value = serde_json::from_str(&output.stderr.unwrap()).unwrap();
        assert!(err["error"].as_str().unwrap().contains("building_id"));
    }

    #[tokio::test]
    async fn test_malformed_arguments() {
        let output = invoke(&dispatcher(false), Some("get_stats"), &tokens(&["stray"])).await;
        assert_eq!(output.exit_code, 1);
        assert!(output.stderr.unwrap().contains("expected --key value pairs"));
    }

    #[tokio::test]
    async fn test_success_is_pretty_json() {
        let args = tokens(&[
            "--population",
            "60000",
            "--solar_potential_pct",
            "80",
            "--has_leghub",
            "--smart_meter_rollout_pct",
            "100",
        ]);
        let output = invoke(&dispatcher(false), Some("score_vnb"), &args).await;
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.as_deref().unwrap().contains("\n  \"score\": 95"));
        assert_eq!(stdout_json(&output)["tier"], "hot");
    }

    #[tokio::test]
    async fn test_domain_failure_exits_zero() {
        let args = tokens(&["--building_id", "b-1", "--note", "called"]);
        let output = invoke(&dispatcher(true), Some("add_note"), &args).await;
        assert_eq!(output.exit_code, 0);
        assert_eq!(
            stdout_json(&output),
            json!({ "error": MUTATION_DISABLED_MESSAGE })
        );
    }

    #[tokio::test]
    async fn test_unexpected_error_exits_one() {
        let output = invoke(&dispatcher(false), Some("get_stats"), &[]).await;
        assert_eq!(output.exit_code, 1);
        assert!(output.stderr.unwrap().contains("DATABASE_URL"));
    }

    #[test]
    fn test_list_tools() {
        let output = list_tools(&dispatcher(false));
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.unwrap().contains("| generate_leg_document "));
    }
}
