//! Ambient status light, switched by shelling out to a vendor CLI.
//!
//! The light is a Yeelight bulb driven through `miiocli`:
//!
//! ```text
//! <cli_path> yeelight --ip <ip> --token <token> on|off
//! ```

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use zeroize::Zeroizing;

use crate::relay::{Notice, Notifier, NotifyError};

pub struct LightSwitch {
    cli_path: PathBuf,
    ip: String,
    token: Zeroizing<String>,
}

impl LightSwitch {
    pub fn new(cli_path: impl Into<PathBuf>, ip: impl Into<String>, token: Zeroizing<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            ip: ip.into(),
            token,
        }
    }

    /// Arguments passed to the CLI for the requested state.
    pub fn args(&self, on: bool) -> Vec<String> {
        vec![
            "yeelight".into(),
            "--ip".into(),
            self.ip.clone(),
            "--token".into(),
            self.token.to_string(),
            if on { "on" } else { "off" }.into(),
        ]
    }
}

impl fmt::Debug for LightSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightSwitch")
            .field("cli_path", &self.cli_path)
            .field("ip", &self.ip)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Notifier for LightSwitch {
    fn name(&self) -> &str {
        "light"
    }

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        let Notice::Light(on) = *notice else {
            return Ok(());
        };
        let status = Command::new(&self.cli_path)
            .args(self.args(on))
            .kill_on_drop(true)
            .status()
            .await?;
        if !status.success() {
            return Err(NotifyError::Exit(status.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch(cli: &str) -> LightSwitch {
        LightSwitch::new(cli, "192.168.1.2", Zeroizing::new("abc123".into()))
    }

    #[test]
    fn args_follow_cli_convention() {
        assert_eq!(
            switch("/opt/bin/miiocli").args(true),
            ["yeelight", "--ip", "192.168.1.2", "--token", "abc123", "on"]
        );
        assert_eq!(switch("/opt/bin/miiocli").args(false).last().unwrap(), "off");
    }

    #[test]
    fn debug_redacts_token() {
        assert!(!format!("{:?}", switch("miiocli")).contains("abc123"));
    }

    #[tokio::test]
    async fn chat_notices_are_ignored() {
        let light = switch("/nonexistent/miiocli");
        assert!(light.notify(&Notice::Chat("hi".into())).await.is_ok());
    }

    #[tokio::test]
    async fn missing_cli_is_reported() {
        let light = switch("/nonexistent/miiocli");
        let result = light.notify(&Notice::Light(true)).await;
        assert!(matches!(result, Err(NotifyError::Spawn(_))));
    }
}
