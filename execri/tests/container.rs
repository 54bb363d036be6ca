//! Integration tests for container lifecycle and liveness refresh.

use execri::RuntimeEngine;
use execri::executor::Invocation;
use execri_shared::ExecriError;
use execri_shared::generated as pb;
use execri_test_utils::{
    TEST_NODE, TestNode, container_config, is_check, is_start, is_stop, labels, sandbox_config,
};

async fn ready_sandbox(engine: &mut RuntimeEngine) -> String {
    engine
        .run_sandbox(sandbox_config("web", "default", "uid1", 0))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_container_writes_init_script() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    node.executor.clear_calls();

    let mut config = container_config("app", 0, "busybox:1.36");
    config.envs = vec![
        pb::KeyValue {
            key: "PATH".into(),
            value: "/usr/bin:/bin".into(),
        },
        pb::KeyValue {
            key: "GREETING".into(),
            value: "say \"hi\"".into(),
        },
    ];
    config.mounts = vec![pb::Mount {
        container_path: "/data".into(),
        host_path: "/srv/data".into(),
        ..Default::default()
    }];

    let cid = engine.create_container(&sb, config).unwrap();
    assert_eq!(cid, format!("{}_app_0", sb));

    let path = engine.init_script_path(&sb, &cid);
    assert_eq!(
        path,
        node.root()
            .join("nodes")
            .join(TEST_NODE)
            .join("pods")
            .join(&sb)
            .join(format!("{}.sh", cid))
    );

    let script = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        script,
        "#!/usr/bin/env bash\n\n\
         export \"PATH\"=\"/usr/bin:/bin\"\n\
         export \"GREETING\"=\"say \\\"hi\\\"\"\n\
         mount -o bind \"/srv/data\" \"/data\"\n"
    );

    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerCreated as i32);
    assert_eq!(status.image_ref, "busybox:1.36");
    assert_eq!(status.started_at, 0);
    assert_eq!(status.mounts.len(), 1);

    // Creation and reads of non-running containers never touch the executor
    assert!(node.executor.calls().is_empty());
}

#[tokio::test]
async fn test_recreate_container_truncates_script() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;

    let mut config = container_config("app", 0, "busybox");
    config.envs = vec![pb::KeyValue {
        key: "A".into(),
        value: "a much longer value than the next one".into(),
    }];
    let cid = engine.create_container(&sb, config).unwrap();

    let cid2 = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    assert_eq!(cid, cid2);
    assert_eq!(engine.containers().len(), 1);

    let script = std::fs::read_to_string(engine.init_script_path(&sb, &cid)).unwrap();
    assert_eq!(script, "#!/usr/bin/env bash\n\n");
}

#[tokio::test]
async fn test_create_container_rejects_bad_input() {
    let node = TestNode::new();
    let mut engine = node.engine();

    assert!(matches!(
        engine.create_container("../escape", container_config("app", 0, "busybox")),
        Err(ExecriError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.create_container("", container_config("app", 0, "busybox")),
        Err(ExecriError::InvalidArgument(_))
    ));

    // The container name becomes part of the script path
    let sb = ready_sandbox(&mut engine).await;
    for name in ["x/../../../../../escaped", "a/b", ".."] {
        assert!(matches!(
            engine.create_container(&sb, container_config(name, 0, "busybox")),
            Err(ExecriError::InvalidArgument(_))
        ));
    }
    assert!(!node.root().join("escaped_0.sh").exists());

    let no_metadata = pb::ContainerConfig::default();
    assert!(matches!(
        engine.create_container("sb", no_metadata),
        Err(ExecriError::InvalidArgument(_))
    ));
    assert!(engine.containers().is_empty());
}

#[tokio::test]
async fn test_start_container_in_missing_sandbox() {
    let node = TestNode::new();
    let mut engine = node.engine();

    // The sandbox is only resolved on start
    let cid = engine
        .create_container("ghost", container_config("app", 0, "busybox"))
        .unwrap();

    let err = engine.start_container(&cid).await.unwrap_err();
    assert!(matches!(err, ExecriError::NotFound(_)));
    assert!(err.to_string().contains("ghost"));

    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerCreated as i32);
    assert!(node.executor.calls_matching(is_start).is_empty());
}

#[tokio::test]
async fn test_start_unknown_container() {
    let node = TestNode::new();
    let mut engine = node.engine();

    assert!(matches!(
        engine.start_container("nope").await,
        Err(ExecriError::NotFound(_))
    ));
    assert!(matches!(
        engine.stop_container("nope").await,
        Err(ExecriError::NotFound(_))
    ));
    assert!(matches!(
        engine.container_status("nope").await,
        Err(ExecriError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_start_container_runs_executor() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox:latest"))
        .unwrap();

    engine.start_container(&cid).await.unwrap();

    assert_eq!(
        node.executor.calls_matching(is_start),
        vec![Invocation::StartContainer {
            node: TEST_NODE.into(),
            sandbox_id: sb.clone(),
            hostname: "web".into(),
            container_id: cid.clone(),
            image_ref: "busybox:latest".into(),
        }]
    );

    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerRunning as i32);
    assert!(status.started_at > 0);
    assert_eq!(status.finished_at, 0);
}

#[tokio::test]
async fn test_start_failure_leaves_container_created() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    node.executor.fail_next(is_start);

    assert!(matches!(
        engine.start_container(&cid).await,
        Err(ExecriError::Executor(_))
    ));
    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerCreated as i32);

    // A retry succeeds once the executor recovers
    engine.start_container(&cid).await.unwrap();
    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerRunning as i32);
}

#[tokio::test]
async fn test_stop_container() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    engine.start_container(&cid).await.unwrap();

    engine.stop_container(&cid).await.unwrap();

    assert_eq!(
        node.executor.calls_matching(is_stop),
        vec![Invocation::StopContainer {
            node: TEST_NODE.into(),
            sandbox_id: sb.clone(),
            container_id: cid.clone(),
        }]
    );
    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerExited as i32);
    assert!(status.finished_at > 0);
}

#[tokio::test]
async fn test_stop_failure_still_marks_exited() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    engine.start_container(&cid).await.unwrap();
    node.executor.fail_next(is_stop);

    assert!(matches!(
        engine.stop_container(&cid).await,
        Err(ExecriError::Executor(_))
    ));
    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerExited as i32);
}

#[tokio::test]
async fn test_liveness_failure_marks_exited_on_next_read() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    engine.start_container(&cid).await.unwrap();

    let first = engine.list_containers(None).await;
    assert_eq!(first[0].state, pb::ContainerState::ContainerRunning as i32);

    node.executor.fail_next(is_check);
    let second = engine.list_containers(None).await;
    assert_eq!(second[0].state, pb::ContainerState::ContainerExited as i32);

    let status = engine.container_status(&cid).await.unwrap();
    assert_eq!(status.state, pb::ContainerState::ContainerExited as i32);
    assert!(status.finished_at > 0);

    // Two probes while running, none once exited
    assert_eq!(
        node.executor.calls_matching(is_check),
        vec![
            Invocation::CheckContainer {
                node: TEST_NODE.into(),
                sandbox_id: sb.clone(),
                container_id: cid.clone(),
            };
            2
        ]
    );
}

#[tokio::test]
async fn test_list_filters_see_refreshed_state() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();
    engine.start_container(&cid).await.unwrap();

    let state_filter = |state: pb::ContainerState| pb::ContainerFilter {
        state: Some(pb::ContainerStateValue {
            state: state as i32,
        }),
        ..Default::default()
    };

    // The failing check runs inside this call, before the filter applies
    node.executor.fail_next(is_check);
    let running = engine
        .list_containers(Some(&state_filter(pb::ContainerState::ContainerRunning)))
        .await;
    assert!(running.is_empty());

    let exited = engine
        .list_containers(Some(&state_filter(pb::ContainerState::ContainerExited)))
        .await;
    assert_eq!(exited.len(), 1);
    assert_eq!(exited[0].id, cid);
}

#[tokio::test]
async fn test_refresh_containers_counts_exits() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    for name in ["a", "b", "c"] {
        let cid = engine
            .create_container(&sb, container_config(name, 0, "busybox"))
            .unwrap();
        if name != "c" {
            engine.start_container(&cid).await.unwrap();
        }
    }

    node.executor.fail_when(|inv| {
        matches!(inv, Invocation::CheckContainer { container_id, .. } if container_id.ends_with("_a_0"))
    });
    assert_eq!(engine.refresh_containers().await, 1);
    // Already exited; not probed again
    assert_eq!(engine.refresh_containers().await, 0);
}

#[tokio::test]
async fn test_remove_container_is_idempotent() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();

    engine.remove_container(&cid);
    engine.remove_container(&cid);
    engine.remove_container("never-existed");

    assert!(engine.containers().is_empty());
    assert!(matches!(
        engine.container_status(&cid).await,
        Err(ExecriError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_removing_sandbox_keeps_its_containers() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let sb = ready_sandbox(&mut engine).await;
    let cid = engine
        .create_container(&sb, container_config("app", 0, "busybox"))
        .unwrap();

    engine.remove_sandbox(&sb).await.unwrap();

    assert!(engine.containers().contains(&cid));
    assert!(matches!(
        engine.start_container(&cid).await,
        Err(ExecriError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_containers_filters() {
    let node = TestNode::new();
    let mut engine = node.engine();
    let web = ready_sandbox(&mut engine).await;
    let db = engine
        .run_sandbox(sandbox_config("db", "default", "uid2", 0))
        .await
        .unwrap();

    let mut app = container_config("app", 0, "busybox");
    app.labels = labels(&[("role", "server")]);
    let app = engine.create_container(&web, app).unwrap();
    engine.start_container(&app).await.unwrap();

    let mut sidecar = container_config("sidecar", 0, "busybox");
    sidecar.labels = labels(&[("role", "proxy")]);
    let sidecar = engine.create_container(&web, sidecar).unwrap();

    let store = engine
        .create_container(&db, container_config("store", 0, "postgres"))
        .unwrap();

    assert_eq!(engine.list_containers(None).await.len(), 3);

    let in_web = pb::ContainerFilter {
        pod_sandbox_id: web.clone(),
        ..Default::default()
    };
    let ids: Vec<String> = engine
        .list_containers(Some(&in_web))
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![app.clone(), sidecar.clone()]);

    let running = pb::ContainerFilter {
        state: Some(pb::ContainerStateValue {
            state: pb::ContainerState::ContainerRunning as i32,
        }),
        ..Default::default()
    };
    let items = engine.list_containers(Some(&running)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, app);

    let proxies = pb::ContainerFilter {
        label_selector: labels(&[("role", "proxy")]),
        ..Default::default()
    };
    let items = engine.list_containers(Some(&proxies)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, sidecar);

    let by_id = pb::ContainerFilter {
        id: store.clone(),
        ..Default::default()
    };
    let items = engine.list_containers(Some(&by_id)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].pod_sandbox_id, db);
}
