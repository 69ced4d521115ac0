// Command outcomes: the binary exits non-zero exactly when `execute` returns
// an error, so these cover what operators and scripts observe.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use credvault::audit::{AuditLog, SqliteAuditSink};
use credvault::cli::{execute, Cli};
use credvault::config::Config;
use credvault::VaultError;

fn config_with_key(master_key: Option<String>) -> Config {
    let mut config = Config::default();
    config.security.master_key = master_key;
    config
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn test_security_test_succeeds_with_valid_key() {
    let config = config_with_key(Some(STANDARD.encode([b'A'; 32])));
    let cli = parse(&["credvault", "security", "test"]);
    assert!(execute(cli.command, &config).is_ok());
}

#[test]
fn test_security_test_fails_without_key() {
    let cli = parse(&["credvault", "security", "test"]);
    assert!(matches!(
        execute(cli.command, &config_with_key(None)),
        Err(VaultError::Configuration(_))
    ));

    let cli = parse(&["credvault", "security", "test"]);
    assert!(matches!(
        execute(cli.command, &config_with_key(Some("   ".into()))),
        Err(VaultError::Configuration(_))
    ));
}

#[test]
fn test_security_test_fails_on_unusable_key() {
    let short = config_with_key(Some(STANDARD.encode([1u8; 16])));
    let cli = parse(&["credvault", "security", "test"]);
    assert!(matches!(
        execute(cli.command, &short),
        Err(VaultError::Configuration(_))
    ));

    let garbled = config_with_key(Some("not base64!!".into()));
    let cli = parse(&["credvault", "security", "test"]);
    assert!(matches!(
        execute(cli.command, &garbled),
        Err(VaultError::KeyFormat)
    ));
}

#[test]
fn test_generators_need_no_master_key() {
    let config = config_with_key(None);
    let cli = parse(&["credvault", "security", "generate-key"]);
    assert!(execute(cli.command, &config).is_ok());
    let cli = parse(&["credvault", "security", "generate-salt"]);
    assert!(execute(cli.command, &config).is_ok());
}

#[test]
fn test_audit_show_reads_configured_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("audit.db");
    AuditLog::new(Box::new(SqliteAuditSink::open(&db).unwrap()))
        .log_decrypt(1, 7, false, Some("decryption failed".into()))
        .unwrap();

    let mut config = config_with_key(None);
    config.audit.sqlite_path = Some(db);
    let cli = parse(&["credvault", "audit", "show", "--credential", "7"]);
    assert!(execute(cli.command, &config).is_ok());

    let cli = parse(&["credvault", "audit", "show", "--credential", "7"]);
    assert!(matches!(
        execute(cli.command, &config_with_key(None)),
        Err(VaultError::Configuration(_))
    ));
}
