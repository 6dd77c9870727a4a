//! Container listing and lifecycle control through the runtime CLI
//!
//! [`ContainerId`] and [`ContainerAction`] are the only way to name a container
//! or an action; both are validated on construction, so nothing unchecked can
//! reach [`ContainerController`]. Commands are built as argument vectors.

use crate::config::RuntimeConfig;
use crate::error::{ContainerError, ValidationError};
use crate::execution::{CommandRunner, Invocation};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

const LIST_FORMAT: &str = "{{.ID}}|{{.Names}}|{{.Image}}|{{.State}}|{{.Status}}";
const IMAGE_FORMAT: &str = "{{.Config.Image}}";
const SHORT_ID_LEN: usize = 12;
const FULL_ID_LEN: usize = 64;

pub const RECREATE_MESSAGE: &str = "Container removed. Recreate via docker-compose or Portainer.";

/// A container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    #[serde(rename = "status")]
    pub status_text: String,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Container id: exactly 12 or 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::MissingId);
        }
        let valid_len = raw.len() == SHORT_ID_LEN || raw.len() == FULL_ID_LEN;
        let valid_chars = raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if valid_len && valid_chars {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
    Recreate,
    Logs,
}

impl ContainerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Recreate => "recreate",
            Self::Logs => "logs",
        }
    }

    /// Actions that map one-to-one onto `runtime <action> <id>`.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Start | Self::Stop | Self::Restart)
    }
}

impl FromStr for ContainerAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "recreate" => Ok(Self::Recreate),
            "logs" => Ok(Self::Logs),
            other => Err(ValidationError::InvalidAction(other.to_string())),
        }
    }
}

/// A validated request; can only be built through [`ContainerController::validate_action`]
/// or [`ContainerActionRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerActionRequest {
    pub action: ContainerAction,
    pub container_id: ContainerId,
}

impl ContainerActionRequest {
    pub fn new(action: ContainerAction, raw_id: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            action,
            container_id: ContainerId::parse(raw_id)?,
        })
    }
}

/// Result of a recreate: the container is gone, its image is freshly pulled.
#[derive(Debug, Clone, Serialize)]
pub struct RecreateOutcome {
    pub success: bool,
    pub message: String,
    pub image: String,
}

/// Drives the container runtime CLI.
#[derive(Clone)]
pub struct ContainerController {
    config: RuntimeConfig,
    runner: Arc<dyn CommandRunner>,
}

impl ContainerController {
    pub fn new(config: RuntimeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn runtime_binary(&self) -> &str {
        &self.config.binary
    }

    /// All containers, running first then by name. Empty when the runtime
    /// cannot be queried.
    pub async fn list(&self) -> Vec<Container> {
        let invocation = self.invocation(["ps", "-a", "--format", LIST_FORMAT], self.config.list_timeout());
        match self.runner.run(invocation).await {
            Ok(output) => parse_listing(&output.stdout),
            Err(e) => {
                warn!("Failed to list containers: {}", e);
                Vec::new()
            }
        }
    }

    /// Accepts only `start`, `stop` and `restart` with a well-formed id.
    pub fn validate_action(action: &str, id: &str) -> Result<ContainerActionRequest, ValidationError> {
        let action: ContainerAction = action.parse()?;
        if !action.is_lifecycle() {
            return Err(ValidationError::InvalidAction(action.as_str().to_string()));
        }
        ContainerActionRequest::new(action, id)
    }

    /// `runtime <action> <id>`.
    pub async fn execute(&self, request: &ContainerActionRequest) -> Result<(), ContainerError> {
        if !request.action.is_lifecycle() {
            return Err(ValidationError::InvalidAction(request.action.as_str().to_string()).into());
        }
        let id = request.container_id.as_str();
        info!("Container {}: {}", request.action.as_str(), id);

        self.run_checked([request.action.as_str(), id], self.config.action_timeout())
            .await?;
        Ok(())
    }

    /// Last lines of combined stdout/stderr.
    pub async fn logs(&self, id: &ContainerId) -> Result<String, ContainerError> {
        let tail = self.config.log_tail_lines.to_string();
        let output = self
            .run_checked(["logs", "--tail", tail.as_str(), id.as_str()], self.config.logs_timeout())
            .await?;
        Ok(output.combined())
    }

    /// Inspect the image, pull it, stop and remove the container.
    ///
    /// The container is not started again from its old definition; the caller
    /// redeploys through its own orchestration, as the returned message says.
    pub async fn recreate(&self, id: &ContainerId) -> Result<RecreateOutcome, ContainerError> {
        info!("Recreating container {}", id);

        let inspect = self
            .run_checked(
                ["inspect", "--format", IMAGE_FORMAT, id.as_str()],
                self.config.inspect_timeout(),
            )
            .await?;
        let image = parse_image_reference(&inspect.stdout)?;

        self.run_checked(["pull", image.as_str()], self.config.pull_timeout())
            .await?;
        self.run_checked(["stop", id.as_str()], self.config.action_timeout())
            .await?;
        self.run_checked(["rm", id.as_str()], self.config.remove_timeout())
            .await?;

        info!(image = %image, "Container {} removed after pull", id);
        Ok(RecreateOutcome {
            success: true,
            message: RECREATE_MESSAGE.to_string(),
            image,
        })
    }

    fn invocation<const N: usize>(&self, args: [&str; N], timeout: std::time::Duration) -> Invocation {
        Invocation::new(self.config.binary.clone(), args, timeout)
    }

    async fn run_checked<const N: usize>(
        &self,
        args: [&str; N],
        timeout: std::time::Duration,
    ) -> Result<crate::execution::CommandOutput, ContainerError> {
        let invocation = self.invocation(args, timeout);
        self.runner.run(invocation.clone()).await.map_err(|e| {
            error!(command = %invocation, "Runtime command failed: {}", e);
            ContainerError::from(e)
        })
    }
}

/// Lines of `ID|Names|Image|State|Status`.
pub fn parse_listing(output: &str) -> Vec<Container> {
    let mut containers: Vec<Container> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.splitn(5, '|');
            let mut next = || {
                parts
                    .next()
                    .filter(|v| !v.is_empty())
                    .unwrap_or("unknown")
                    .to_string()
            };
            let id: String = next().chars().take(SHORT_ID_LEN).collect();
            Container {
                id,
                name: next(),
                image: next(),
                state: next(),
                status_text: next(),
            }
        })
        .collect();

    containers.sort_by(|a, b| {
        b.is_running()
            .cmp(&a.is_running())
            .then_with(|| a.name.cmp(&b.name))
    });
    containers
}

/// Image reference printed by inspect; must be usable as a single argv element.
pub fn parse_image_reference(output: &str) -> Result<String, ContainerError> {
    let image = output.trim().trim_matches('\'');
    if image.is_empty()
        || image.starts_with('-')
        || image.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ContainerError::UnexpectedOutput(format!(
            "invalid image reference {image:?}"
        )));
    }
    Ok(image.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_action() {
        assert!(ContainerController::validate_action("restart", "a1b2c3d4e5f6").is_ok());
        assert_eq!(
            ContainerController::validate_action("stop", "not-hex!"),
            Err(ValidationError::InvalidId)
        );
        assert_eq!(
            ContainerController::validate_action("stop", "a1b2c3d4e5f6a"),
            Err(ValidationError::InvalidId)
        );
        assert_eq!(
            ContainerController::validate_action("delete", "a1b2c3d4e5f6"),
            Err(ValidationError::InvalidAction("delete".into()))
        );
        assert!(matches!(
            ContainerController::validate_action("logs", "a1b2c3d4e5f6"),
            Err(ValidationError::InvalidAction(_))
        ));
        assert_eq!(
            ContainerController::validate_action("start", ""),
            Err(ValidationError::MissingId)
        );
    }

    #[test]
    fn test_container_id_formats() {
        assert!(ContainerId::parse(&"f".repeat(64)).is_ok());
        assert!(ContainerId::parse(&"f".repeat(63)).is_err());
        assert!(ContainerId::parse("A1B2C3D4E5F6").is_err());
        assert!(ContainerId::parse("a1b2c3d4e5f;").is_err());
        assert!(ContainerId::parse("a1b2c3 d4e5f").is_err());
        assert!(ContainerId::parse("zzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_parse_listing_orders_running_first() {
        let out = "\
1111111111112222|web|nginx:latest|exited|Exited (0) 2 hours ago
333333333333|db|postgres:16|running|Up 3 days
444444444444|api|app:1|running|Up 1 hour
555555555555|cache||created|
";
        let containers = parse_listing(out);
        let names: Vec<&str> = containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["api", "db", "cache", "web"]);
        assert_eq!(containers[3].id, "111111111111");
        assert_eq!(containers[2].image, "unknown");
        assert_eq!(containers[2].status_text, "unknown");
    }

    #[test]
    fn test_parse_image_reference() {
        assert_eq!(parse_image_reference("nginx:1.27\n").unwrap(), "nginx:1.27");
        assert_eq!(parse_image_reference("'ghcr.io/a/b:1'\n").unwrap(), "ghcr.io/a/b:1");
        assert!(parse_image_reference("").is_err());
        assert!(parse_image_reference("--help").is_err());
        assert!(parse_image_reference("nginx; rm -rf /").is_err());
    }

    #[test]
    fn test_container_json_shape() {
        let c = &parse_listing("333333333333|db|postgres:16|running|Up 3 days")[0];
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(json["status"], "Up 3 days");
        assert_eq!(json["state"], "running");
    }
}
