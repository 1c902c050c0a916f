//! 指令执行器
//!
//! 在工作目录下通过 sh -c / cmd /C 执行指令，捕获 stdout/stderr；带超时，超时后子进程被放弃并杀掉。
//! 所有失败都转为 CommandOutcome 返回，不向调用方抛错；每次执行输出一行 JSON 审计日志。
//! 本层不做安全过滤，调用方须先经过 SecurityFilter。

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

/// 超时失败时的固定消息
pub const TIMEOUT_MESSAGE: &str = "timeout";

/// stdout 为空时回给模型的占位文本
pub const EMPTY_OUTPUT_PLACEHOLDER: &str = "(指令执行成功，但无输出内容)";

/// 单次指令执行（或拒绝）的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 进程正常退出
    Accepted { stdout: String, stderr: String },
    /// 被安全过滤拦截，未执行
    Rejected { keyword: String },
    /// 启动失败、非零退出或超时
    Failed { message: String },
}

impl CommandOutcome {
    fn label(&self) -> &'static str {
        match self {
            CommandOutcome::Accepted { .. } => "ok",
            CommandOutcome::Rejected { .. } => "rejected",
            CommandOutcome::Failed { message } if message == TIMEOUT_MESSAGE => "timeout",
            CommandOutcome::Failed { .. } => "error",
        }
    }

    /// 转为回传给模型的文本
    pub fn to_text(&self) -> String {
        match self {
            CommandOutcome::Accepted { stdout, stderr } if !stderr.is_empty() => {
                format!("[标准错误输出]:\n{stderr}\n[标准输出]:\n{stdout}")
            }
            CommandOutcome::Accepted { stdout, .. } if stdout.is_empty() => {
                EMPTY_OUTPUT_PLACEHOLDER.to_string()
            }
            CommandOutcome::Accepted { stdout, .. } => stdout.clone(),
            CommandOutcome::Rejected { keyword } => format!(
                "[安全拒绝]: 检测到危险指令关键字 \"{keyword}\"，系统拒绝执行此操作。"
            ),
            CommandOutcome::Failed { message } => format!("执行失败: {message}"),
        }
    }
}

/// 指令执行 trait：生产实现为 ShellRunner，测试可替换
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path) -> CommandOutcome;
}

/// 通过系统 shell 执行指令
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self::new(Duration::from_secs(timeout_secs))
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, working_dir: &Path) -> CommandOutcome {
        let start = Instant::now();
        let mut cmd = Self::shell_command(command);
        cmd.current_dir(working_dir).kill_on_drop(true);

        let outcome = match timeout(self.timeout, cmd.output()).await {
            Err(_) => CommandOutcome::Failed {
                message: TIMEOUT_MESSAGE.to_string(),
            },
            Ok(Err(e)) => CommandOutcome::Failed {
                message: format!("无法启动指令: {e}"),
            },
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.success() {
                    CommandOutcome::Accepted { stdout, stderr }
                } else {
                    let status = match output.status.code() {
                        Some(code) => format!("退出码 {code}"),
                        None => "被信号终止".to_string(),
                    };
                    CommandOutcome::Failed {
                        message: format!("{status}\nstderr: {}", stderr.trim()),
                    }
                }
            }
        };

        let audit = serde_json::json!({
            "event": "command_audit",
            "command": preview(command),
            "cwd": working_dir.display().to_string(),
            "outcome": outcome.label(),
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "command");

        outcome
    }
}

fn preview(command: &str) -> String {
    if command.chars().count() > 200 {
        format!("{}...", command.chars().take(200).collect::<String>())
    } else {
        command.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_text_prefers_labeled_stderr() {
        let outcome = CommandOutcome::Accepted {
            stdout: "out".into(),
            stderr: "warn".into(),
        };
        assert_eq!(outcome.to_text(), "[标准错误输出]:\nwarn\n[标准输出]:\nout");
    }

    #[test]
    fn test_empty_stdout_placeholder() {
        let outcome = CommandOutcome::Accepted {
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(outcome.to_text(), EMPTY_OUTPUT_PLACEHOLDER);
    }

    #[test]
    fn test_rejected_text_names_keyword() {
        let outcome = CommandOutcome::Rejected {
            keyword: "rm".into(),
        };
        assert!(outcome.to_text().contains("\"rm\""));
        assert!(outcome.to_text().starts_with("[安全拒绝]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "").unwrap();
        let runner = ShellRunner::with_timeout_secs(10);
        let outcome = runner.run("ls", dir.path()).await;
        match outcome {
            CommandOutcome::Accepted { stdout, stderr } => {
                assert!(stdout.contains("hello.txt"));
                assert!(stderr.is_empty());
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_non_zero_exit_is_failure() {
        let runner = ShellRunner::with_timeout_secs(10);
        let outcome = runner.run("echo boom 1>&2; exit 3", Path::new(".")).await;
        match outcome {
            CommandOutcome::Failed { message } => {
                assert!(message.contains('3'));
                assert!(message.contains("boom"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let runner = ShellRunner::new(Duration::from_millis(200));
        let start = Instant::now();
        let outcome = runner.run("sleep 5", Path::new(".")).await;
        assert_eq!(
            outcome,
            CommandOutcome::Failed {
                message: TIMEOUT_MESSAGE.to_string()
            }
        );
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_working_dir_is_failure() {
        let runner = ShellRunner::with_timeout_secs(10);
        let outcome = runner
            .run("echo hi", Path::new("./definitely/not/here"))
            .await;
        assert!(matches!(outcome, CommandOutcome::Failed { .. }));
    }
}
