use crate::{api, auth::GateConfig, store::Datastore};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::info;
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub login_url: String,
    pub db_ping_attempts: u32,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(self.dsn.expose_secret()))
            .field("login_url", &self.login_url)
            .field("db_ping_attempts", &self.db_ping_attempts)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = Datastore::connect(args.dsn.expose_secret(), args.db_ping_attempts)
        .await
        .context("Could not connect to the Shimmie2 database")?;

    let gate_config = GateConfig::new().with_login_url(args.login_url);

    api::new(args.port, store, gate_config).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("login_url", args.login_url.clone()),
        ("db_ping_attempts", args.db_ping_attempts.to_string()),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
