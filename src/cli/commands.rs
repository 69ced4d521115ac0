// credvault: command handlers
//
// One function per subcommand. Configuration is loaded once by the caller and
// passed in; only the commands that build a vault require a master key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::audit::SqliteAuditSink;
use crate::config::Config;
use crate::error::VaultError;
use crate::{generate_master_key, selftest, CredentialVault};

use super::{AuditCommand, Commands, SecurityCommand};

/// Execute the parsed CLI command against `config`.
///
/// Any error means the command failed; the binary exits non-zero on it.
pub fn execute(command: Commands, config: &Config) -> Result<(), VaultError> {
    match command {
        Commands::Security { action } => match action {
            SecurityCommand::Test => cmd_security_test(config),
            SecurityCommand::GenerateKey => cmd_generate_key(),
            SecurityCommand::GenerateSalt => cmd_generate_salt(),
        },
        // Reading the trail needs no master key.
        Commands::Audit { action } => match action {
            AuditCommand::Show { credential } => cmd_audit_show(config, credential),
        },
    }
}

fn cmd_security_test(config: &Config) -> Result<(), VaultError> {
    config.validate()?;
    let vault = CredentialVault::from_config(&config.security)?;
    selftest::run(&vault)?;

    println!("encrypt - decrypt round-trip passed");
    println!("different salts produce different ciphertexts");
    Ok(())
}

fn cmd_generate_key() -> Result<(), VaultError> {
    let key = generate_master_key()?;
    println!("{}", key.to_base64().as_str());
    Ok(())
}

fn cmd_generate_salt() -> Result<(), VaultError> {
    let salt = CredentialVault::generate_salt()?;
    println!("{}", STANDARD.encode(salt));
    Ok(())
}

fn cmd_audit_show(config: &Config, credential_id: i64) -> Result<(), VaultError> {
    let path = config.audit.sqlite_path.as_ref().ok_or_else(|| {
        VaultError::Configuration("audit.sqlite_path is required to read the audit trail".into())
    })?;
    let sink = SqliteAuditSink::open(path)?;
    let records = sink.records_for_credential(credential_id)?;

    if records.is_empty() {
        println!("No audit records for credential {}", credential_id);
        return Ok(());
    }

    println!("Audit trail for credential {}", credential_id);
    println!("{:-<80}", "");
    for record in &records {
        let entry = &record.entry;
        println!(
            "{}  user={:<6} {:<8} {:<4} ip={} {}",
            record.accessed_at.to_rfc3339(),
            entry.user_id,
            entry.action.as_str(),
            if entry.success { "ok" } else { "FAIL" },
            entry.ip_address.as_deref().unwrap_or("-"),
            entry.error_message.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}
