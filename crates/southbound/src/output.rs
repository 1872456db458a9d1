//! Output formatting: protobuf text, JSON, YAML.
//!
//! gNMI responses render as text format by default; structured formats go
//! through serde. The device list uses `tabled` in text mode.

use std::io::{self, Write};

use serde::Serialize;
use southbound_gnmi::ToText;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render one gNMI response in the chosen format.
pub fn render_message<M>(format: OutputFormat, message: &M) -> Result<String, CliError>
where
    M: ToText + Serialize,
{
    match format {
        OutputFormat::Text => Ok(southbound_gnmi::text::to_text_pretty(message)),
        OutputFormat::Json => render_json(message, false),
        OutputFormat::Yaml => render_yaml(message),
    }
}

/// Render one response of a stream. JSON is compact so each response stays
/// on its own line; YAML responses are separate documents.
pub fn render_streamed<M>(format: OutputFormat, message: &M) -> Result<String, CliError>
where
    M: ToText + Serialize,
{
    match format {
        OutputFormat::Text => Ok(southbound_gnmi::text::to_text_pretty(message)),
        OutputFormat::Json => render_json(message, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", render_yaml(message)?)),
    }
}

/// Render a list of rows: a table in text mode, the rows themselves otherwise.
pub fn render_list<T>(format: OutputFormat, rows: &[T]) -> Result<String, CliError>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Text => Ok(Table::new(rows).with(Style::rounded()).to_string()),
        OutputFormat::Json => render_json(rows, false),
        OutputFormat::Yaml => render_yaml(rows),
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
