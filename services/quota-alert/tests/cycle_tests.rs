use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use disk_quota_alert::{
    AddressBook, AlertCoordinator, AlertError, AlertMessage, Notifier, NotifyError, QuotaState,
    QuotaStore, QuotaUsage, ReportCommand, UserQuotaRecord,
};
use tempfile::{tempdir, TempDir};

#[derive(Debug, Clone)]
struct SentAlert {
    user: String,
    address: Option<String>,
    subject: String,
    body: String,
}

/// Records every delivery; users in `failing` get a transport error.
#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentAlert>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingNotifier {
    fn fail_for(&self, user: &str) {
        self.failing.lock().unwrap().insert(user.to_string());
    }

    fn recover(&self, user: &str) {
        self.failing.lock().unwrap().remove(user);
    }

    fn sent(&self) -> Vec<SentAlert> {
        self.sent.lock().unwrap().clone()
    }

    fn sent_to(&self, user: &str) -> usize {
        self.sent().iter().filter(|alert| alert.user == user).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        user: &str,
        address: Option<&str>,
        message: &AlertMessage,
    ) -> Result<(), NotifyError> {
        if self.failing.lock().unwrap().contains(user) {
            return Err(NotifyError::SmtpDelivery("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentAlert {
            user: user.to_string(),
            address: address.map(str::to_string),
            subject: message.subject.clone(),
            body: message.body.clone(),
        });
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    store: QuotaStore,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().expect("failed to create temp dir");
        let store = QuotaStore::open(&dir.path().join("quotastat.db")).expect("store should open");
        Self {
            dir,
            store,
            notifier: RecordingNotifier::default(),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("quotastat.db")
    }

    fn coordinator(&self) -> AlertCoordinator<'_, RecordingNotifier> {
        let addresses = AddressBook::parse("bob,bob@example.org\n");
        AlertCoordinator::new(&self.store, self.notifier.clone(), addresses, "storage01")
    }

    fn record(&self, user: &str) -> UserQuotaRecord {
        self.store
            .query_all()
            .unwrap()
            .into_iter()
            .find(|record| record.user == user)
            .unwrap_or_else(|| panic!("{user} should be stored"))
    }
}

fn usage(user: &str, used: u64) -> QuotaUsage {
    QuotaUsage::new(user, used, 1000, 2000)
}

#[tokio::test]
async fn test_normal_user_is_not_alerted() {
    let fx = Fixture::new();

    let summary = fx
        .coordinator()
        .run_cycle(vec![usage("alice", 900)])
        .await
        .unwrap();

    assert_eq!(summary.snapshot_size, 1);
    assert_eq!(summary.worklist_size, 0);
    assert!(fx.notifier.sent().is_empty());
    assert_eq!(fx.record("alice").state(), QuotaState::Normal);
    assert_eq!(fx.record("alice").alert_level(), QuotaState::Normal);
}

#[tokio::test]
async fn test_soft_exceeded_user_is_alerted_once() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    let first = coordinator.run_cycle(vec![usage("bob", 1500)]).await.unwrap();
    assert_eq!(first.notified, 1);
    assert_eq!(fx.record("bob").state(), QuotaState::SoftExceeded);
    assert_eq!(fx.record("bob").alert_level(), QuotaState::SoftExceeded);

    let second = coordinator.run_cycle(vec![usage("bob", 1500)]).await.unwrap();
    assert_eq!(second.worklist_size, 0);
    assert_eq!(second.notified, 0);
    assert!(fx.store.users_needing_alert().unwrap().is_empty());

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address.as_deref(), Some("bob@example.org"));
    assert_eq!(sent[0].subject, "Disk Limit Exceeded on storage01");
    assert!(sent[0].body.contains("Limit triggered: soft limit"));
}

#[tokio::test]
async fn test_user_back_under_quota_has_alert_reset() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator.run_cycle(vec![usage("bob", 1500)]).await.unwrap();
    let summary = coordinator.run_cycle(vec![usage("bob", 500)]).await.unwrap();

    assert_eq!(summary.reset, 1);
    assert_eq!(fx.record("bob").state(), QuotaState::Normal);
    assert_eq!(fx.record("bob").alert_level(), QuotaState::Normal);
    assert_eq!(fx.notifier.sent_to("bob"), 1);
}

#[tokio::test]
async fn test_failed_notification_is_retried_next_cycle() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();
    fx.notifier.fail_for("carol");

    let summary = coordinator.run_cycle(vec![usage("carol", 2500)]).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.notified, 0);
    assert_eq!(fx.record("carol").state(), QuotaState::HardExceeded);
    assert_eq!(fx.record("carol").alert_level(), QuotaState::Normal);

    let worklist = fx.store.users_needing_alert().unwrap();
    assert_eq!(worklist.len(), 1);
    assert_eq!(worklist[0].user, "carol");

    fx.notifier.recover("carol");
    let summary = coordinator.run_cycle(vec![usage("carol", 2500)]).await.unwrap();
    assert_eq!(summary.notified, 1);
    assert_eq!(fx.record("carol").alert_level(), QuotaState::HardExceeded);

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address, None);
    assert!(sent[0].body.contains("Limit triggered: hard limit"));
}

#[tokio::test]
async fn test_failure_for_one_user_does_not_stop_others() {
    let fx = Fixture::new();
    fx.notifier.fail_for("bob");

    let summary = fx
        .coordinator()
        .run_cycle(vec![usage("bob", 1500), usage("carol", 2500)])
        .await
        .unwrap();

    assert_eq!(summary.worklist_size, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(fx.record("bob").alert_level(), QuotaState::Normal);
    assert_eq!(fx.record("carol").alert_level(), QuotaState::HardExceeded);
}

#[tokio::test]
async fn test_persistent_hard_exceedance_is_alerted_once() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    for _ in 0..5 {
        coordinator.run_cycle(vec![usage("carol", 2500)]).await.unwrap();
    }

    assert_eq!(fx.notifier.sent_to("carol"), 1);
}

#[tokio::test]
async fn test_re_exceedance_after_reset_is_alerted_again() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator.run_cycle(vec![usage("carol", 2500)]).await.unwrap();
    coordinator.run_cycle(vec![usage("carol", 100)]).await.unwrap();
    assert_eq!(fx.record("carol").alert_level(), QuotaState::Normal);

    coordinator.run_cycle(vec![usage("carol", 1200)]).await.unwrap();
    coordinator.run_cycle(vec![usage("carol", 1200)]).await.unwrap();

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].body.contains("Limit triggered: soft limit"));
    assert_eq!(fx.record("carol").alert_level(), QuotaState::SoftExceeded);
}

#[tokio::test]
async fn test_escalation_from_soft_to_hard_is_alerted() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator.run_cycle(vec![usage("bob", 1500)]).await.unwrap();
    coordinator.run_cycle(vec![usage("bob", 2100)]).await.unwrap();

    assert_eq!(fx.notifier.sent_to("bob"), 2);
    assert_eq!(fx.record("bob").alert_level(), QuotaState::HardExceeded);
}

#[tokio::test]
async fn test_de_escalation_keeps_alert_level_within_state() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator.run_cycle(vec![usage("carol", 2500)]).await.unwrap();
    let summary = coordinator.run_cycle(vec![usage("carol", 1500)]).await.unwrap();

    assert_eq!(summary.notified, 0);
    let record = fx.record("carol");
    assert_eq!(record.state(), QuotaState::SoftExceeded);
    assert_eq!(record.alert_level(), QuotaState::SoftExceeded);
    assert_eq!(fx.notifier.sent_to("carol"), 1);
}

#[tokio::test]
async fn test_users_missing_from_snapshot_keep_their_row() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator
        .run_cycle(vec![usage("alice", 900), usage("carol", 2500)])
        .await
        .unwrap();
    coordinator.run_cycle(vec![usage("alice", 900)]).await.unwrap();

    let carol = fx.record("carol");
    assert_eq!(carol.state(), QuotaState::HardExceeded);
    assert_eq!(carol.alert_level(), QuotaState::HardExceeded);
    assert_eq!(fx.notifier.sent_to("carol"), 1);
}

#[tokio::test]
async fn test_alert_markers_survive_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quotastat.db");
    let notifier = RecordingNotifier::default();

    {
        let store = QuotaStore::open(&path).unwrap();
        AlertCoordinator::new(&store, notifier.clone(), AddressBook::default(), "storage01")
            .run_cycle(vec![usage("bob", 1500)])
            .await
            .unwrap();
    }

    let store = QuotaStore::open(&path).unwrap();
    let summary = AlertCoordinator::new(&store, notifier.clone(), AddressBook::default(), "storage01")
        .run_cycle(vec![usage("bob", 1500)])
        .await
        .unwrap();

    assert_eq!(summary.notified, 0);
    assert_eq!(notifier.sent_to("bob"), 1);
}

#[tokio::test]
async fn test_every_row_ends_with_alert_within_state() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();
    fx.notifier.fail_for("dave");

    let cycles = [
        vec![usage("alice", 900), usage("bob", 1500), usage("carol", 2500), usage("dave", 2000)],
        vec![usage("alice", 1000), usage("bob", 2500), usage("carol", 500), usage("dave", 1999)],
        vec![usage("alice", 0), usage("bob", 1000), usage("carol", 1000), usage("dave", 0)],
    ];

    for snapshot in cycles {
        coordinator.run_cycle(snapshot).await.unwrap();
        for record in fx.store.query_all().unwrap() {
            assert!(
                record.alert_level() <= record.state(),
                "{} has alert {} above state {}",
                record.user,
                record.alert_level(),
                record.state()
            );
        }
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_from_report_command() {
    let fx = Fixture::new();
    let source = ReportCommand::new(vec![
        "printf".to_string(),
        "alice -- 900 1000 2000 1 0 0\\nbob +- 1500 1000 2000 1 0 0\\n".to_string(),
    ])
    .unwrap();

    let summary = fx.coordinator().run_from(&source).await.unwrap();

    assert_eq!(summary.snapshot_size, 2);
    assert_eq!(summary.notified, 1);
    assert_eq!(fx.notifier.sent_to("bob"), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_report_aborts_before_any_write() {
    let fx = Fixture::new();
    let source = ReportCommand::new(vec!["false".to_string()]).unwrap();

    let err = fx.coordinator().run_from(&source).await.unwrap_err();

    assert!(matches!(err, AlertError::Report(_)));
    assert!(fx.store.query_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_aborts_before_reset() {
    let fx = Fixture::new();
    let coordinator = fx.coordinator();

    coordinator.run_cycle(vec![usage("bob", 2500)]).await.unwrap();
    assert_eq!(fx.record("bob").alert_level(), QuotaState::HardExceeded);

    let conn = rusqlite::Connection::open(fx.db_path()).unwrap();
    conn.execute_batch(
        r#"
        CREATE TRIGGER reject_carol_alert BEFORE UPDATE OF alert ON userquota
        WHEN NEW.user = 'carol'
        BEGIN
            SELECT RAISE(ABORT, 'disk full');
        END;
        "#,
    )
    .unwrap();

    let err = coordinator
        .run_cycle(vec![usage("bob", 500), usage("carol", 2500)])
        .await
        .unwrap_err();

    assert!(matches!(err, AlertError::Storage(_)));
    let bob = fx.record("bob");
    assert_eq!(bob.state(), QuotaState::Normal);
    assert_eq!(bob.alert_level(), QuotaState::HardExceeded);
    assert_eq!(fx.record("carol").alert_level(), QuotaState::Normal);
    assert_eq!(fx.notifier.sent_to("carol"), 1);
}
