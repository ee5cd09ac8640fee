// # Command Reloader
//
// Runs an external command to apply a rewritten zone file, by default
// `systemctl restart bind9`. A non-zero exit status fails the run.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::DnsReloader;

/// Reloads the DNS service by running a command
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
}

impl CommandReloader {
    /// Create from an argv list (program first)
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::config("Reload command cannot be empty"))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl DnsReloader for CommandReloader {
    async fn reload(&self) -> Result<()> {
        tracing::debug!("Running reload command: {}", self.describe());

        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::reload(format!("Failed to run `{}`: {}", self.describe(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::reload(format!(
                "`{}` exited with {}: {}",
                self.describe(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandReloader::new(&[]).is_err());
    }

    #[test]
    fn describe_joins_argv() {
        let reloader = CommandReloader::new(&argv(&["systemctl", "restart", "bind9"])).unwrap();
        assert_eq!(reloader.describe(), "systemctl restart bind9");
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let reloader = CommandReloader::new(&argv(&["true"])).unwrap();
        tokio_test::assert_ok!(tokio_test::block_on(reloader.reload()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_reload_error() {
        let reloader = CommandReloader::new(&argv(&["sh", "-c", "echo zone broken >&2; exit 3"])).unwrap();
        let err = reloader.reload().await.unwrap_err();

        assert!(matches!(err, Error::Reload(_)));
        assert!(err.to_string().contains("zone broken"));
    }

    #[tokio::test]
    async fn missing_program_is_a_reload_error() {
        let reloader = CommandReloader::new(&argv(&["/nonexistent/reload-dns"])).unwrap();
        let err = tokio_test::assert_err!(reloader.reload().await);
        assert!(matches!(err, Error::Reload(_)));
    }
}
