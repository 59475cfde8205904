//! Plain-text rendering for the `tools` listing.

use crate::tools::registry::{ToolRegistry, ToolSpec};
use crate::tools::schema::{ParamSpec, Presence};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

/// `--name` for required, `[--name]` for optional and `[--name=default]`
/// for defaulted parameters.
pub fn param_flag(param: &ParamSpec) -> String {
    match &param.presence {
        Presence::Required => format!("--{}", param.name),
        Presence::Optional => format!("[--{}]", param.name),
        Presence::Default(value) => format!("[--{}={}]", param.name, plain(value)),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tool_row(spec: &ToolSpec) -> [String; 3] {
    let mode = if spec.mutating { "write" } else { "read" };
    let params = if spec.params.is_empty() {
        "-".to_string()
    } else {
        spec.params.iter().map(param_flag).collect::<Vec<_>>().join(" ")
    };
    [spec.name.to_string(), mode.to_string(), params]
}

/// ASCII table of every registered tool, its mode and its parameters.
pub fn tools_table(registry: &ToolRegistry) -> String {
    let headers = ["tool", "mode", "parameters"];
    let rows: Vec<[String; 3]> = registry.iter().map(tool_row).collect();
    format_as_table(&headers, &rows)
}

/// Render rows under `headers`, padding by display width so umlauts and
/// other wide text keep columns aligned.
pub fn format_as_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    output.push_str(&line(headers.iter().copied(), &widths));
    output.push_str(&separator);
    for row in rows {
        output.push_str(&line(row.iter().map(String::as_str), &widths));
    }
    output.push_str(&separator);

    let noun = if rows.len() == 1 { "tool" } else { "tools" };
    output.push_str(&format!("{} {}\n", rows.len(), noun));
    output
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, w)| format!("| {}{} ", cell, " ".repeat(w - cell.width())))
        .collect::<String>()
        + "|\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_flags() {
        assert_eq!(param_flag(&ParamSpec::text("query")), "--query");
        assert_eq!(param_flag(&ParamSpec::text("notes").optional()), "[--notes]");
        assert_eq!(
            param_flag(&ParamSpec::integer("limit").default(50)),
            "[--limit=50]"
        );
        assert_eq!(
            param_flag(&ParamSpec::text("kanton").default("ZH")),
            "[--kanton=ZH]"
        );
    }

    #[test]
    fn test_table_alignment_with_umlauts() {
        let rows = [
            ["Zürich".to_string(), "1".to_string()],
            ["Baden".to_string(), "42".to_string()],
        ];
        let table = format_as_table(&["name", "n"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+--------+----+");
        assert_eq!(lines[1], "| name   | n  |");
        assert_eq!(lines[3], "| Zürich | 1  |");
        assert_eq!(lines[4], "| Baden  | 42 |");
        assert_eq!(lines[6], "2 tools");
    }

    #[test]
    fn test_tools_table_lists_registry() {
        let registry = ToolRegistry::standard().unwrap();
        let table = tools_table(&registry);
        assert!(table.contains("| upsert_tenant "));
        assert!(table.contains("--territory --config"));
        assert!(table.ends_with("44 tools\n"));
    }
}
