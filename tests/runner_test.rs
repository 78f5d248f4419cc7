mod support;

use cert_renewer::error::ExecutionCause;
use cert_renewer::runner::{CommandRunner, CommandSpec, SystemRunner};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_output_before_timeout_reaches_log() {
    let (log, _guard) = support::capture_logs();
    let runner = SystemRunner::new(Duration::from_millis(300));
    let spec = CommandSpec::new("sh").args(["-c", "echo diag-$((40+2)); sleep 5"]);

    let started = Instant::now();
    let err = runner.run(&spec).await.unwrap_err();

    assert!(matches!(err.cause, ExecutionCause::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(4));
    let text = log.contents();
    assert!(text.contains("diag-42"), "output lost on timeout: {}", text);
    assert!(text.contains("exceeded"));
}

#[tokio::test]
async fn test_stdout_and_stderr_are_logged_per_line() {
    let (log, _guard) = support::capture_logs();
    let runner = SystemRunner::default();
    let spec = CommandSpec::new("sh").args(["-c", "echo first; echo second >&2; exit 1"]);

    let err = runner.run(&spec).await.unwrap_err();

    assert!(matches!(err.cause, ExecutionCause::ExitStatus(_)));
    let text = log.contents();
    let first = text.lines().find(|l| l.contains("first")).unwrap();
    let second = text.lines().find(|l| l.contains("second")).unwrap();
    assert!(first.contains("INFO") && first.contains("process"));
    assert!(second.contains("INFO") && second.contains("process"));
}
