//! Firmware service restart after new configuration lands on disk

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{ConfigResult, ConfiguratorError};

/// Upper bound for the restart command
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg_attr(test, mockall::automock)]
pub trait FirmwareService: Send + Sync {
    fn restart(&self) -> BoxFuture<'static, ConfigResult<()>>;
}

/// Restarts the firmware by running a shell command
#[derive(Debug, Clone)]
pub struct CommandFirmwareService {
    command: String,
    timeout: Duration,
}

impl CommandFirmwareService {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: RESTART_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FirmwareService for CommandFirmwareService {
    fn restart(&self) -> BoxFuture<'static, ConfigResult<()>> {
        let command = self.command.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            debug!("Running restart command: {}", command);
            // The shell is killed when the timeout drops the pending output future
            let output = tokio::time::timeout(
                timeout,
                Command::new("sh")
                    .arg("-c")
                    .arg(&command)
                    .kill_on_drop(true)
                    .output(),
            )
            .await
            .map_err(|_| {
                ConfiguratorError::Configuration(format!(
                    "Restart command timed out after {}ms: {}",
                    timeout.as_millis(),
                    command
                ))
            })?
            .map_err(|e| ConfiguratorError::io("sh", e))?;

            if !output.status.success() {
                return Err(ConfiguratorError::Configuration(format!(
                    "Restart command '{}' failed: {}",
                    command,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            info!("Firmware service restarted");
            Ok(())
        })
    }
}

/// Used when no restart command is configured
#[derive(Debug, Clone, Default)]
pub struct NoopFirmwareService;

impl FirmwareService for NoopFirmwareService {
    fn restart(&self) -> BoxFuture<'static, ConfigResult<()>> {
        Box::pin(async {
            debug!("No restart command configured, skipping firmware restart");
            Ok(())
        })
    }
}
