use hostdeck_agent::{
    ContainerController, ContainerError, ContainerId, ExecError, RuntimeConfig,
};
use hostdeck_devkit::{Reply, ScriptedRunner};
use std::sync::Arc;
use std::time::Duration;

const ID: &str = "a1b2c3d4e5f6";

fn controller(runner: &ScriptedRunner) -> ContainerController {
    ContainerController::new(RuntimeConfig::default(), Arc::new(runner.clone()))
}

#[tokio::test]
async fn test_list_sorted_and_truncated() {
    let runner = ScriptedRunner::new().on(
        ["ps"],
        Reply::stdout(
            "0123456789abcdef0123|zeta|busybox|exited|Exited (1) 1 day ago\n\
             a1b2c3d4e5f6|alpha|nginx:latest|running|Up 2 hours\n",
        ),
    );
    let containers = controller(&runner).list().await;

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].name, "alpha");
    assert_eq!(containers[1].id, "0123456789ab");

    let call = &runner.calls()[0];
    assert_eq!(call.program, "docker");
    assert_eq!(
        call.args,
        vec!["ps", "-a", "--format", "{{.ID}}|{{.Names}}|{{.Image}}|{{.State}}|{{.Status}}"]
    );
    assert_eq!(call.timeout, Duration::from_secs(10));
}

#[tokio::test]
async fn test_list_failure_is_empty() {
    let runner = ScriptedRunner::new().on(["ps"], Reply::Timeout);
    assert!(controller(&runner).list().await.is_empty());
}

#[tokio::test]
async fn test_execute_uses_argv_and_timeout() {
    let runner = ScriptedRunner::new().on(["restart"], Reply::stdout(format!("{ID}\n")));
    let request = ContainerController::validate_action("restart", ID).unwrap();

    controller(&runner).execute(&request).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec!["restart", ID]);
    assert_eq!(calls[0].timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn test_execute_failure_surfaces() {
    let runner = ScriptedRunner::new().on(["stop"], Reply::failure(1, "No such container"));
    let request = ContainerController::validate_action("stop", ID).unwrap();

    let err = controller(&runner).execute(&request).await.unwrap_err();
    assert!(matches!(err, ContainerError::Command(ExecError::Failed { .. })));
    // no retry
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_logs_tail_combined() {
    let runner = ScriptedRunner::new().on(
        ["logs"],
        Reply::Success {
            stdout: "listening on :80\n".into(),
            stderr: "warn: slow request\n".into(),
        },
    );
    let id = ContainerId::parse(ID).unwrap();
    let logs = controller(&runner).logs(&id).await.unwrap();

    assert_eq!(logs, "listening on :80\nwarn: slow request\n");
    let call = &runner.calls()[0];
    assert_eq!(call.args, vec!["logs", "--tail", "30", ID]);
    assert_eq!(call.timeout, Duration::from_secs(10));
}

#[tokio::test]
async fn test_recreate_sequence() {
    let runner = ScriptedRunner::new()
        .on(["inspect"], Reply::stdout("ghcr.io/acme/app:2.1\n"))
        .on(["pull"], Reply::stdout("Status: Downloaded newer image\n"))
        .on(["stop"], Reply::stdout(ID))
        .on(["rm"], Reply::stdout(ID));
    let id = ContainerId::parse(ID).unwrap();

    let outcome = controller(&runner).recreate(&id).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.image, "ghcr.io/acme/app:2.1");
    assert!(outcome.message.contains("Recreate via"));

    assert_eq!(
        runner.command_lines(),
        vec![
            format!("inspect --format {{{{.Config.Image}}}} {ID}"),
            "pull ghcr.io/acme/app:2.1".to_string(),
            format!("stop {ID}"),
            format!("rm {ID}"),
        ]
    );
    let timeouts: Vec<u64> = runner.calls().iter().map(|c| c.timeout.as_secs()).collect();
    assert_eq!(timeouts, vec![10, 120, 30, 10]);
}

#[tokio::test]
async fn test_recreate_stops_at_first_failure() {
    let runner = ScriptedRunner::new()
        .on(["inspect"], Reply::stdout("nginx:latest\n"))
        .on(["pull"], Reply::failure(1, "manifest unknown"));
    let id = ContainerId::parse(ID).unwrap();

    assert!(controller(&runner).recreate(&id).await.is_err());
    assert_eq!(runner.command_lines(), vec![
        format!("inspect --format {{{{.Config.Image}}}} {ID}"),
        "pull nginx:latest".to_string(),
    ]);
}

#[tokio::test]
async fn test_recreate_rejects_option_like_image() {
    let runner = ScriptedRunner::new().on(["inspect"], Reply::stdout("--privileged\n"));
    let id = ContainerId::parse(ID).unwrap();

    let err = controller(&runner).recreate(&id).await.unwrap_err();
    assert!(matches!(err, ContainerError::UnexpectedOutput(_)));
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_custom_runtime_binary() {
    let runner = ScriptedRunner::new().on(["start"], Reply::stdout(""));
    let config = RuntimeConfig {
        binary: "podman".into(),
        ..Default::default()
    };
    let controller = ContainerController::new(config, Arc::new(runner.clone()));
    let request = ContainerController::validate_action("start", ID).unwrap();
    controller.execute(&request).await.unwrap();
    assert_eq!(runner.calls()[0].program, "podman");
}
