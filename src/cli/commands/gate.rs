use crate::auth::DEFAULT_LOGIN_URL;
use clap::{Arg, ArgMatches, Command};

pub const ARG_LOGIN_URL: &str = "login-url";
pub const ARG_DB_PING_ATTEMPTS: &str = "db-ping-attempts";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_URL)
                .long(ARG_LOGIN_URL)
                .help("Where requests without a valid Shimmie2 session are redirected")
                .env("SHIMMIE_LOGIN_URL")
                .default_value(DEFAULT_LOGIN_URL),
        )
        .arg(
            Arg::new(ARG_DB_PING_ATTEMPTS)
                .long(ARG_DB_PING_ATTEMPTS)
                .help("How many times to ping the database on startup, one second apart")
                .env("SHIMMIE_DB_PING_ATTEMPTS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub login_url: String,
    pub db_ping_attempts: u32,
}

impl Options {
    /// Parse gate and database arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // an empty SHIMMIE_LOGIN_URL falls back to the default
        let login_url = matches
            .get_one::<String>(ARG_LOGIN_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());

        let db_ping_attempts = matches
            .get_one::<u32>(ARG_DB_PING_ATTEMPTS)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DB_PING_ATTEMPTS}"))?;

        Ok(Self {
            login_url,
            db_ping_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("SHIMMIE_LOGIN_URL", None::<&str>),
                ("SHIMMIE_DB_PING_ATTEMPTS", None::<&str>),
            ],
            || {
                let matches = with_args(Command::new("shimmie")).get_matches_from(vec!["shimmie"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.login_url, DEFAULT_LOGIN_URL);
                assert_eq!(options.db_ping_attempts, 10);
                Ok(())
            },
        )
    }

    #[test]
    fn test_empty_login_url_uses_default() -> anyhow::Result<()> {
        temp_env::with_vars([("SHIMMIE_LOGIN_URL", Some(""))], || {
            let matches = with_args(Command::new("shimmie")).get_matches_from(vec!["shimmie"]);
            let options = Options::parse(&matches)?;
            assert_eq!(options.login_url, DEFAULT_LOGIN_URL);
            Ok(())
        })
    }

    #[test]
    fn test_flags() -> anyhow::Result<()> {
        let matches = with_args(Command::new("shimmie")).get_matches_from(vec![
            "shimmie",
            "--login-url",
            "https://booru.example/user_admin/login",
            "--db-ping-attempts",
            "3",
        ]);
        let options = Options::parse(&matches)?;
        assert_eq!(options.login_url, "https://booru.example/user_admin/login");
        assert_eq!(options.db_ping_attempts, 3);
        Ok(())
    }

    #[test]
    fn test_zero_ping_attempts_rejected() {
        let result = with_args(Command::new("shimmie")).try_get_matches_from(vec![
            "shimmie",
            "--db-ping-attempts",
            "0",
        ]);
        assert!(result.is_err());
    }
}
