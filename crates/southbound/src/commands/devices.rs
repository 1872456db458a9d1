//! Devices command handler.

use serde::Serialize;
use southbound_config::{Config, DeviceEntry};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Session")]
    session: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "TLS")]
    tls: &'static str,
}

impl DeviceRow {
    fn new(name: &str, entry: &DeviceEntry) -> Self {
        let id = entry.id.clone().unwrap_or_else(|| name.to_string());
        Self {
            name: name.to_string(),
            address: entry.address.clone(),
            session: format!("{id}:{}", entry.version),
            target: entry.target.clone().unwrap_or_else(|| id.clone()),
            tls: tls_mode(entry),
        }
    }
}

fn tls_mode(entry: &DeviceEntry) -> &'static str {
    if entry.plain {
        "plain"
    } else if entry.insecure {
        "insecure"
    } else if entry.cert.is_some() && entry.key.is_some() {
        "mutual"
    } else if entry.username.is_some() {
        "credentials"
    } else {
        "default"
    }
}

/// List the inventory. Reads the config only; no device is contacted.
pub fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<DeviceRow> = config
        .devices
        .iter()
        .map(|(name, entry)| DeviceRow::new(name, entry))
        .collect();
    output::print_output(&output::render_list(global.output, &rows)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_defaults_follow_the_table_name() {
        let entry = DeviceEntry {
            address: "leaf1:10161".into(),
            version: "1.0.0".into(),
            cert: Some("client.crt".into()),
            key: Some("client.key".into()),
            ..DeviceEntry::default()
        };
        let row = DeviceRow::new("leaf1", &entry);
        assert_eq!(row.session, "leaf1:1.0.0");
        assert_eq!(row.target, "leaf1");
        assert_eq!(row.tls, "mutual");
    }

    #[test]
    fn plain_wins_over_other_settings() {
        let entry = DeviceEntry {
            plain: true,
            insecure: true,
            username: Some("admin".into()),
            ..DeviceEntry::default()
        };
        assert_eq!(tls_mode(&entry), "plain");
    }
}
