#![allow(clippy::unwrap_used)]
// Inventory loading from TOML files and the environment.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use southbound_config::{ConfigError, load_config};
use southbound_core::TlsPolicy;

const INVENTORY: &str = r#"
[defaults]
timeout = 5

[devices.leaf1]
address = "leaf1.lab:10161"
version = "2.1.0"
ca_cert = "/etc/southbound/onfca.crt"
cert = "/etc/southbound/client1.crt"
key = "/etc/southbound/client1.key"

[devices.spine1]
id = "spine-1"
address = "localhost:10162"
target = "spine"
plain = true
timeout = 30
"#;

fn write_inventory(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// Loads run inside a Jail so environment overrides set by other tests
// cannot leak in.

#[test]
fn loads_devices_from_an_explicit_file() {
    Jail::expect_with(|_| {
        check_inventory();
        Ok(())
    });
}

fn check_inventory() {
    let file = write_inventory(INVENTORY);
    let config = load_config(Some(file.path())).unwrap();

    assert_eq!(
        config.devices.keys().cloned().collect::<Vec<_>>(),
        vec!["leaf1".to_string(), "spine1".to_string()]
    );
    assert_eq!(config.tls_policy(), TlsPolicy::Lenient);

    let leaf = config.device("leaf1").unwrap();
    assert_eq!(leaf.key().to_string(), "leaf1:2.1.0");
    assert_eq!(leaf.address, "leaf1.lab:10161");
    assert_eq!(leaf.timeout, Some(Duration::from_secs(5)));
    assert_eq!(leaf.tls.cert, Some(PathBuf::from("/etc/southbound/client1.crt")));
    assert!(!leaf.tls.plain);

    let spine = config.device("spine1").unwrap();
    assert_eq!(spine.id, "spine-1");
    assert_eq!(spine.target, "spine");
    assert_eq!(spine.version, "1.0.0");
    assert_eq!(spine.timeout, Some(Duration::from_secs(30)));
    assert!(spine.tls.plain);
}

#[test]
fn unknown_device_lists_configured_ones() {
    Jail::expect_with(|_| {
        let file = write_inventory(INVENTORY);
        let config = load_config(Some(file.path())).unwrap();

        let err = config.device("leaf9").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDevice { .. }));
        assert_eq!(
            err.to_string(),
            "device 'leaf9' is not configured (known: leaf1, spine1)"
        );
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = load_config(Some(std::path::Path::new("/nonexistent/devices.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_toml_is_a_figment_error() {
    let file = write_inventory("[devices.leaf1\naddress = ");
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)));
}

#[test]
fn environment_overrides_the_file() {
    Jail::expect_with(|jail| {
        jail.create_file("devices.toml", INVENTORY)?;
        jail.set_env("SOUTHBOUND_DEFAULTS__STRICT_TLS", "true");
        jail.set_env("SOUTHBOUND_DEVICES__LEAF1__ADDRESS", "10.0.0.1:10161");

        let config = load_config(Some(&jail.directory().join("devices.toml"))).unwrap();
        assert_eq!(config.tls_policy(), TlsPolicy::Strict);
        assert_eq!(config.device("leaf1").unwrap().address, "10.0.0.1:10161");
        Ok(())
    });
}

#[test]
fn password_comes_from_the_named_variable() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "devices.toml",
            r#"
            [devices.leaf1]
            address = "leaf1:10161"
            username = "admin"
            password = "plaintext"
            password_env = "LEAF1_SECRET"
            "#,
        )?;
        jail.set_env("LEAF1_SECRET", "from-env");

        let config = load_config(Some(&jail.directory().join("devices.toml"))).unwrap();
        let creds = config.device("leaf1").unwrap().credentials.unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(secrecy::ExposeSecret::expose_secret(&creds.password), "from-env");
        Ok(())
    });
}
