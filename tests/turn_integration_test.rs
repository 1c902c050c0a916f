//! 对话轮集成测试：Mock 模型 + 真实 ShellRunner

use std::sync::Arc;
use std::time::Duration;

use cmdgate::core::Orchestrator;
use cmdgate::llm::{LlmError, MockModelClient, ModelReply};
use cmdgate::memory::{Role, SessionMemory};
use cmdgate::tools::{RawToolCall, SecurityFilter, ShellRunner};

fn orchestrator(model: Arc<MockModelClient>, dir: &std::path::Path) -> Orchestrator {
    Orchestrator::new(
        model,
        Arc::new(ShellRunner::with_timeout_secs(10)),
        Arc::new(SessionMemory::new(20)),
    )
    .with_filter(SecurityFilter::default())
    .with_working_dir(dir)
}

#[cfg(unix)]
#[tokio::test]
async fn test_listing_goes_through_shell_and_back_to_model() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report.txt"), "x").unwrap();

    let model = Arc::new(
        MockModelClient::new()
            .then_reply(ModelReply::tool_call(RawToolCall::execute_command("ls")))
            .then_reply(ModelReply::text("目录里有 report.txt")),
    );
    let orch = orchestrator(model.clone(), dir.path());

    let reply = orch.handle_turn(7, "列出当前目录").await;
    assert_eq!(reply, "目录里有 report.txt");

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].prompt.contains("report.txt"));

    let history = orch.memory().get_history(7).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text, "列出当前目录");
    assert_eq!(history[1].role, Role::Model);
    assert_eq!(history[1].text, "目录里有 report.txt");
}

#[tokio::test]
async fn test_denied_command_never_reaches_shell() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("keep.txt");
    std::fs::write(&victim, "x").unwrap();

    let model = Arc::new(
        MockModelClient::new()
            .then_reply(ModelReply::tool_call(RawToolCall::execute_command("rm keep.txt")))
            .then_reply(ModelReply::text("这个操作被拒绝了")),
    );
    let orch = orchestrator(model.clone(), dir.path());

    let reply = orch.handle_turn(1, "删掉 keep.txt").await;
    assert_eq!(reply, "这个操作被拒绝了");
    assert!(victim.exists());

    let calls = model.calls();
    assert!(calls[1].prompt.contains("[安全拒绝]"));
    assert!(calls[1].prompt.contains("\"rm\""));
}

#[tokio::test]
async fn test_upstream_failure_returns_fallback_and_keeps_memory() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(
        MockModelClient::new()
            .then_reply(ModelReply::text("第一轮"))
            .then_fail(LlmError::Api("503".to_string())),
    );
    let orch = orchestrator(model, dir.path()).with_fallback_message("出错了");

    assert_eq!(orch.handle_turn(3, "你好").await, "第一轮");
    assert_eq!(orch.handle_turn(3, "再来").await, "出错了");

    let history = orch.memory().get_history(3).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text, "第一轮");
}

#[tokio::test]
async fn test_same_session_turns_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(
        MockModelClient::new()
            .with_delay(Duration::from_millis(50))
            .then_reply(ModelReply::text("回复一"))
            .then_reply(ModelReply::text("回复二")),
    );
    let orch = Arc::new(orchestrator(model.clone(), dir.path()));

    let a = tokio::spawn({
        let orch = orch.clone();
        async move { orch.handle_turn(9, "问题一").await }
    });
    let b = tokio::spawn({
        let orch = orch.clone();
        async move { orch.handle_turn(9, "问题二").await }
    });
    a.await.unwrap();
    b.await.unwrap();

    // 后一轮看到的历史必须是前一轮完整写入的一对
    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].history.is_empty());
    assert_eq!(calls[1].history.len(), 2);
    assert_eq!(calls[1].history[0].text, calls[0].prompt);

    let history = orch.memory().get_history(9).await;
    assert_eq!(history.len(), 4);
    let roles: Vec<Role> = history.iter().map(|e| e.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(
        MockModelClient::new()
            .then_reply(ModelReply::text("甲"))
            .then_reply(ModelReply::text("乙")),
    );
    let orch = orchestrator(model.clone(), dir.path());

    orch.handle_turn(100, "A 的问题").await;
    orch.handle_turn(200, "B 的问题").await;

    assert!(model.calls()[1].history.is_empty());
    assert_eq!(orch.memory().get_history(100).await.len(), 2);
    assert_eq!(orch.memory().get_history(200).await.len(), 2);
}
