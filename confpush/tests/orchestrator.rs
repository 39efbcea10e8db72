mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{BrokenRenderer, FakeDevice, FakeFactory, StaticRenderer, count_backups, device};
use confpush::{BackupPolicy, BackupWriter, DeviceError, DeviceOrchestrator, Outcome};

const BODY: &str = "ntp server 10.1.1.1\nlogging host 10.9.9.9";

#[tokio::test]
async fn connect_failure_writes_no_backup_and_pushes_nothing() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([("r1", FakeDevice::unreachable())]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Failed(DeviceError::Connection(_))));
    assert_eq!(count_backups(backups.path()), 0);
    assert_eq!(stats.config_set_calls(), 0);
    assert_eq!(stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unchanged_device_is_not_touched() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([(
        "r1",
        FakeDevice::with_config(&format!("hostname r1\n{BODY}")),
    )]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::NoChangeNeeded));
    assert_eq!(stats.config_set_calls(), 0);
    assert_eq!(
        std::fs::read_to_string(backups.path().join("r1_backup.cfg")).unwrap(),
        format!("hostname r1\n{BODY}")
    );
}

#[tokio::test]
async fn drift_pushes_desired_lines_without_blanks() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([(
        "r1",
        FakeDevice::with_config("hostname r1\nntp server 10.1.1.2\nlogging host 10.9.9.9"),
    )]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator = DeviceOrchestrator::new(
        factory,
        StaticRenderer::new("ntp server 10.1.1.1\n\nlogging host 10.9.9.9\n"),
        BackupWriter::new(backups.path()),
    );

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Applied));
    assert_eq!(
        stats.pushed_to("r1").unwrap(),
        vec!["hostname r1", "ntp server 10.1.1.1", "logging host 10.9.9.9"]
    );
    assert_eq!(stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn best_effort_backup_failure_still_applies() {
    let missing = tempfile::tempdir().unwrap().path().join("gone");
    let factory = FakeFactory::new([("r1", FakeDevice::with_config("hostname r1"))]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(&missing));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Applied));
    assert_eq!(stats.config_set_calls(), 1);
}

#[tokio::test]
async fn best_effort_backup_failure_without_drift() {
    let missing = tempfile::tempdir().unwrap().path().join("gone");
    let factory = FakeFactory::new([(
        "r1",
        FakeDevice::with_config(&format!("hostname r1\n{BODY}")),
    )]);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(&missing));

    assert!(matches!(
        orchestrator.run(&device("r1")).await,
        Outcome::NoChangeNeeded
    ));
}

#[tokio::test]
async fn required_backup_failure_stops_before_push() {
    let missing = tempfile::tempdir().unwrap().path().join("gone");
    let factory = FakeFactory::new([("r1", FakeDevice::with_config("hostname r1"))]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(&missing))
            .with_backup_policy(BackupPolicy::Required);

    let outcome = orchestrator.run(&device("r1")).await;

    match outcome {
        Outcome::Failed(err) => assert_eq!(err.kind(), "BackupIOError"),
        other => panic!("expected backup failure, got {other}"),
    }
    assert_eq!(stats.config_set_calls(), 0);
    assert_eq!(stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn render_failure_still_closes_session() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([("r1", FakeDevice::with_config("hostname r1"))]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, Arc::new(BrokenRenderer), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Failed(DeviceError::Render(_))));
    assert_eq!(stats.config_set_calls(), 0);
    assert_eq!(stats.closes.load(Ordering::SeqCst), 1);
    // the backup precedes rendering
    assert_eq!(count_backups(backups.path()), 1);
}

#[tokio::test]
async fn fetch_failure_is_a_command_error() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([(
        "r1",
        FakeDevice {
            fetch_fails: true,
            ..FakeDevice::default()
        },
    )]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Failed(DeviceError::Command(_))));
    assert_eq!(count_backups(backups.path()), 0);
    assert_eq!(stats.config_set_calls(), 0);
}

#[tokio::test]
async fn push_failure_is_a_command_error() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([(
        "r1",
        FakeDevice {
            running_config: "hostname r1".into(),
            push_fails: true,
            ..FakeDevice::default()
        },
    )]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Failed(DeviceError::Command(_))));
    let events = stats.events.lock().unwrap().clone();
    assert_eq!(events, vec!["r1:fetch", "r1:push", "r1:close"]);
}

#[tokio::test]
async fn backup_is_written_before_push() {
    let backups = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new([("r1", FakeDevice::with_config("hostname r1"))])
        .watching_backups(backups.path());
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::Applied));
    let events = stats.events.lock().unwrap().clone();
    assert_eq!(events, vec!["r1:fetch", "r1:backup", "r1:push", "r1:close"]);
}

#[tokio::test]
async fn backup_keeps_lines_ignored_by_the_comparison() {
    let backups = tempfile::tempdir().unwrap();
    let running = format!("! Last configuration change at 09:14:02 UTC\nhostname r1\n{BODY}");
    let factory = FakeFactory::new([("r1", FakeDevice::with_config(&running))]);
    let stats = Arc::clone(&factory.stats);
    let orchestrator =
        DeviceOrchestrator::new(factory, StaticRenderer::new(BODY), BackupWriter::new(backups.path()));

    let outcome = orchestrator.run(&device("r1")).await;

    assert!(matches!(outcome, Outcome::NoChangeNeeded));
    assert_eq!(stats.config_set_calls(), 0);
    assert_eq!(
        std::fs::read_to_string(backups.path().join("r1_backup.cfg")).unwrap(),
        running
    );
}
