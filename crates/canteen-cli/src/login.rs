//! # Login arguments
//!
//! Credentials shared by every subcommand. The password is only taken
//! from the environment so it never shows up in shell history.

use anyhow::{Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use canteen_client::{CanteenClient, CanteenConfig, Credentials};

/// Student credentials.
#[derive(Args)]
pub struct LoginArgs {
    /// Seven-digit student number.
    #[arg(short, long, env = "CANTEEN_USERNAME", global = true)]
    pub username: Option<String>,

    /// Portal password.
    #[arg(long, env = "CANTEEN_PASSWORD", hide = true, hide_env_values = true, global = true)]
    pub password: Option<Zeroizing<String>>,
}

// Redacts the password, like `Credentials`.
impl std::fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginArgs")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl LoginArgs {
    fn credentials(&self) -> Result<Credentials> {
        let username = self
            .username
            .as_deref()
            .context("no student number: pass --username or set CANTEEN_USERNAME")?;
        let password = self
            .password
            .as_ref()
            .map(|p| p.as_str())
            .context("no password: set CANTEEN_PASSWORD")?;
        Ok(Credentials::new(username, password)?)
    }
}

/// Build a client from the environment and log in.
pub async fn connect(args: &LoginArgs) -> Result<CanteenClient> {
    let credentials = args.credentials()?;
    let config = CanteenConfig::from_env().context("invalid portal configuration")?;
    let mut client = CanteenClient::new(config).context("failed to build HTTP client")?;

    let profile = client
        .login(&credentials)
        .await
        .with_context(|| format!("login as {} failed", credentials.username()))?;
    tracing::info!(user = %profile.display_name, balance = %profile.balance, "logged in");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_username_is_reported() {
        let args = LoginArgs {
            username: None,
            password: Some(Zeroizing::new("pw".into())),
        };
        let err = args.credentials().unwrap_err();
        assert!(err.to_string().contains("CANTEEN_USERNAME"));
    }

    #[test]
    fn missing_password_is_reported() {
        let args = LoginArgs {
            username: Some("2015001".into()),
            password: None,
        };
        let err = args.credentials().unwrap_err();
        assert!(err.to_string().contains("CANTEEN_PASSWORD"));
    }

    #[test]
    fn malformed_student_number_is_rejected() {
        let args = LoginArgs {
            username: Some("12ab".into()),
            password: Some(Zeroizing::new("pw".into())),
        };
        assert!(args.credentials().is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let args = LoginArgs {
            username: Some("2015001".into()),
            password: Some(Zeroizing::new("hunter2".into())),
        };
        let debug = format!("{args:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("2015001"));
        assert_eq!(args.credentials().unwrap().password(), "hunter2");
    }
}
