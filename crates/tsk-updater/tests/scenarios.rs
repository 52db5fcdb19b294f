//! End-to-end update runs against a temporary installation root.

mod common;

use common::{FakeFetcher, FakeRelease, Fixture, FaultyFs, Op, Package};
use tsk_updater::{
    InstanceLock, Phase, RunOutcome, SelfBinary, UpdateError, UpdateService, UpdateStatus,
};

#[test]
fn test_fresh_install() {
    let fixture = Fixture::new();
    let package = Package::new()
        .app("TechnicalSketcher.exe", "app v1.0")
        .app("resources/fonts.dat", "fonts");

    let report = fixture.service("v1.0", package).run();

    assert_eq!(report.outcome, RunOutcome::UpdatedSuccessfully);
    assert_eq!(fixture.read("latest/TechnicalSketcher.exe"), "app v1.0");
    assert_eq!(fixture.read("latest/resources/fonts.dat"), "fonts");
    assert_eq!(fixture.read("version"), "v1.0\n");
    assert!(!fixture.exists("outdated"));
    assert!(!fixture.exists("update"));
    assert_eq!(report.installed_version, None);
}

#[test]
fn test_upgrade_with_binary_swap() {
    let fixture = Fixture::new();
    fixture.install(
        "v1.0",
        &[("TechnicalSketcher.exe", "app v1.0"), ("old-plugin.dll", "plugin")],
    );
    let package = Package::new()
        .app("TechnicalSketcher.exe", "app v1.1")
        .binaries("v1.1");

    let report = fixture.service("v1.1", package).run();

    assert_eq!(report.outcome, RunOutcome::UpdatedSuccessfully);
    let latest = fixture.snapshot_of("latest");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest["TechnicalSketcher.exe"], b"app v1.1");
    assert_eq!(fixture.read("updater.exe"), "updater v1.1");
    assert_eq!(fixture.read("uninstall.exe"), "uninstall v1.1");
    assert!(!fixture.exists("updater_outdated.exe"));
    assert!(!fixture.exists("uninstall_outdated.exe"));
    assert!(!fixture.exists("outdated"));
    assert_eq!(fixture.read("version"), "v1.1\n");

    let phases: Vec<Phase> = report.phases.iter().map(|p| p.phase).collect();
    let position = |phase| phases.iter().position(|p| *p == phase).unwrap();
    assert!(position(Phase::Rotate) < position(Phase::ApplyPayload));
    assert!(position(Phase::SwapBinaries) < position(Phase::Commit));
    assert!(position(Phase::Commit) < position(Phase::Marker));
}

#[test]
fn test_payload_failure_rolls_back() {
    let fixture = Fixture::new();
    fixture.install(
        "v1.0",
        &[("TechnicalSketcher.exe", "app v1.0"), ("readme.txt", "v1.0")],
    );
    let before = fixture.snapshot_of("latest");
    let package = Package::new()
        .app("TechnicalSketcher.exe", "app v1.1")
        .app("readme.txt", "v1.1")
        .binaries("v1.1");
    // First entry moves, the second one fails.
    let fs_ops = FaultyFs::default().fail(Op::Rename, fixture.layout().staged_app(), 1);

    let report = fixture
        .service("v1.1", package)
        .with_file_system(Box::new(fs_ops))
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdateFailedRolledBack);
    assert!(matches!(report.error, Some(UpdateError::PayloadApply(_))));
    assert_eq!(fixture.snapshot_of("latest"), before);
    assert_eq!(fixture.read("version"), "v1.0\n");
    assert_eq!(fixture.read("updater.exe"), "updater v1.0");
    assert!(!fixture.exists("outdated"));
    assert!(!fixture.exists("update"));
    assert!(
        report
            .failed_phases()
            .any(|p| p.phase == Phase::ApplyPayload)
    );
}

#[test]
fn test_release_without_application_files_rolls_back() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let before = fixture.snapshot_of("latest");

    let report = fixture
        .service("v1.1", Package::new().binaries("v1.1"))
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdateFailedRolledBack);
    assert!(matches!(report.error, Some(UpdateError::PayloadApply(_))));
    assert_eq!(fixture.snapshot_of("latest"), before);
    assert_eq!(fixture.read("updater.exe"), "updater v1.0");
    assert_eq!(fixture.read("uninstall.exe"), "uninstall v1.0");
    assert_eq!(fixture.read("version"), "v1.0\n");
    assert!(!fixture.exists("outdated"));
    assert!(!fixture.exists("update"));
}

#[test]
fn test_empty_application_subtree_commits_empty_payload() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);

    let report = fixture
        .service("v1.1", Package::new().empty_app().binaries("v1.1"))
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdatedSuccessfully);
    assert_eq!(fixture.read("version"), "v1.1\n");
    assert!(fixture.exists("latest"));
    assert!(fixture.snapshot_of("latest").is_empty());
    assert_eq!(fixture.read("updater.exe"), "updater v1.1");
    assert!(!fixture.exists("outdated"));
    assert!(report.phases.iter().all(|p| p.success));

    // The next run has nothing to heal and leaves the empty payload alone.
    let again = fixture
        .service("v1.1", Package::new().app("TechnicalSketcher.exe", "app v1.1"))
        .run();
    assert_eq!(again.outcome, RunOutcome::UpToDate);
    assert!(fixture.snapshot_of("latest").is_empty());
}

#[test]
fn test_stale_backup_survives_failed_swap() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    fixture.write("uninstall_outdated.exe", "uninstall v0.9");
    let layout = fixture.layout();
    // The leftover backup cannot be deleted up front, and the new updater
    // cannot be moved in.
    let fs_ops = FaultyFs::default()
        .fail(Op::RemoveFile, fixture.root(), 0)
        .fail(Op::Rename, layout.update(), 0);

    let report = fixture
        .service(
            "v1.1",
            Package::new()
                .app("TechnicalSketcher.exe", "app v1.1")
                .binaries("v1.1"),
        )
        .with_file_system(Box::new(fs_ops))
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdateFailedRolledBack);
    assert!(matches!(report.error, Some(UpdateError::BinarySwap(_))));
    assert_eq!(fixture.read("updater.exe"), "updater v1.0");
    assert_eq!(fixture.read("uninstall.exe"), "uninstall v1.0");
    assert_eq!(fixture.read("latest/TechnicalSketcher.exe"), "app v1.0");
    assert_eq!(fixture.read("version"), "v1.0\n");
}

#[test]
fn test_lock_held_mutates_nothing() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let _held = InstanceLock::acquire(&fixture.layout().lock_file()).unwrap();
    let before = fixture.snapshot();
    let fetcher = FakeFetcher::default();
    let package = Package::new().app("TechnicalSketcher.exe", "app v1.1");
    let service = UpdateService::with_collaborators(
        &fixture.config,
        Box::new(FakeRelease::new("v1.1")),
        Box::new(fetcher.clone()),
        Box::new(package),
    );

    let report = service.run();

    assert_eq!(report.outcome, RunOutcome::AnotherInstanceRunning);
    assert!(matches!(
        report.error,
        Some(UpdateError::LockContention { .. })
    ));
    assert_eq!(fetcher.calls.get(), 0);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_up_to_date_skips_everything() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let before = fixture.snapshot_of("latest");
    let fetcher = FakeFetcher::default();
    let package = Package::new().app("TechnicalSketcher.exe", "app v1.1");
    let service = UpdateService::with_collaborators(
        &fixture.config,
        Box::new(FakeRelease::new("v1.0")),
        Box::new(fetcher.clone()),
        Box::new(package.clone()),
    );

    let report = service.run();

    assert_eq!(report.outcome, RunOutcome::UpToDate);
    assert_eq!(fetcher.calls.get(), 0);
    assert!(!package.extracted.get());
    assert_eq!(fixture.snapshot_of("latest"), before);
    assert!(!fixture.exists("outdated"));
}

#[test]
fn test_fetch_failure_aborts_without_changes() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let before = fixture.snapshot_of("latest");
    let service = UpdateService::with_collaborators(
        &fixture.config,
        Box::new(FakeRelease::new("v1.1")),
        Box::new(FakeFetcher {
            fail: true,
            ..FakeFetcher::default()
        }),
        Box::new(Package::new().app("TechnicalSketcher.exe", "app v1.1")),
    );

    let report = service.run();

    assert_eq!(report.outcome, RunOutcome::UpdateAborted);
    assert!(matches!(report.error, Some(UpdateError::Fetch(_))));
    assert_eq!(fixture.snapshot_of("latest"), before);
    assert_eq!(fixture.read("version"), "v1.0\n");
}

#[test]
fn test_failed_recovery_is_unrecoverable() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let layout = fixture.layout();
    let fs_ops = FaultyFs::default()
        .fail(Op::Rename, layout.staged_app(), 0)
        .fail(Op::RemoveDirAll, layout.latest(), 0);

    let report = fixture
        .service(
            "v1.1",
            Package::new().app("TechnicalSketcher.exe", "app v1.1"),
        )
        .with_file_system(Box::new(fs_ops))
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdateFailedUnrecoverable);
    assert_eq!(report.outcome.exit_code(), 2);
    let error = report.error.unwrap();
    assert!(error.is_fatal());
    assert!(error.to_string().contains("manual inspection"));
    assert_eq!(fixture.read("outdated/TechnicalSketcher.exe"), "app v1.0");
    assert!(fixture.exists("update"));
    assert_eq!(fixture.read("version"), "v1.0\n");
}

#[test]
fn test_interrupted_rotation_healed_on_next_run() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[]);
    // A run that died right after Phase A.
    fixture.write("outdated/TechnicalSketcher.exe", "app v1.0");
    std::fs::create_dir_all(fixture.layout().latest()).unwrap();

    let report = fixture
        .service(
            "v1.0",
            Package::new().app("TechnicalSketcher.exe", "app v1.1"),
        )
        .run();

    assert_eq!(report.outcome, RunOutcome::UpToDate);
    assert_eq!(fixture.read("latest/TechnicalSketcher.exe"), "app v1.0");
    assert!(!fixture.exists("outdated"));
    assert!(report.phases.iter().any(|p| p.phase == Phase::Prepare));
}

#[test]
fn test_status_file_records_last_run() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);
    let service = fixture.service(
        "v1.1",
        Package::new().app("TechnicalSketcher.exe", "app v1.1"),
    );

    service.run();

    let status = UpdateStatus::read(&fixture.layout().status_file())
        .unwrap()
        .unwrap();
    assert!(status.success);
    assert_eq!(status.outcome, RunOutcome::UpdatedSuccessfully);
    assert_eq!(status.version.as_deref(), Some("v1.1"));
    assert_eq!(status.previous_version.as_deref(), Some("v1.0"));
    assert_eq!(service.installed_version().unwrap().as_deref(), Some("v1.1"));
}

#[test]
fn test_binaries_unchanged_when_only_app_staged() {
    let fixture = Fixture::new();
    fixture.install("v1.0", &[("TechnicalSketcher.exe", "app v1.0")]);

    let report = fixture
        .service(
            "v1.1",
            Package::new().app("TechnicalSketcher.exe", "app v1.1"),
        )
        .run();

    assert_eq!(report.outcome, RunOutcome::UpdatedSuccessfully);
    for binary in SelfBinary::ALL {
        assert!(fixture.layout().live_binary(binary).exists());
        assert!(!fixture.layout().backup_binary(binary).exists());
    }
    assert_eq!(fixture.read("updater.exe"), "updater v1.0");
}
