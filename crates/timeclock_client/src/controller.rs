//! The clock in/out state machine.
//!
//! ```text
//!        clock_in
//!   Out ─────────▶ In
//!    ▲             │
//!    └─────────────┘
//!        clock_out
//! ```
//!
//! A toggle writes optimistically, then asks the server to create the
//! record. Success confirms and persists; any failure rolls back. Only
//! one toggle may be in flight at a time.

use crate::error::{ClientError, ClientResult};
use crate::location::LocationProvider;
use crate::records::RecordStore;
use crate::session::Session;
use crate::transport::{ApiRequest, TransportClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use timeclock_protocol::{ClockRecord, ClockStatus, CreateRecordRequest, CreateRecordResponse, Location};
use tracing::{info, warn};

/// Releases the single-flight flag when dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates session, record store and transport for one clock action.
pub struct ClockController {
    session: Arc<Session>,
    records: Arc<RecordStore>,
    transport: Arc<TransportClient>,
    locator: Arc<dyn LocationProvider>,
    in_flight: AtomicBool,
    location_timeout: Duration,
}

impl ClockController {
    /// Creates a controller.
    pub fn new(
        session: Arc<Session>,
        records: Arc<RecordStore>,
        transport: Arc<TransportClient>,
        locator: Arc<dyn LocationProvider>,
        location_timeout: Duration,
    ) -> Self {
        Self {
            session,
            records,
            transport,
            locator,
            in_flight: AtomicBool::new(false),
            location_timeout,
        }
    }

    /// Current state of the machine.
    pub fn state(&self) -> ClockStatus {
        self.records.status()
    }

    /// Returns true while a toggle is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Performs the clock action opposite to the current status.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotAuthenticated`] without a session; nothing is sent
    /// - [`ClientError::OperationInProgress`] while another toggle runs
    /// - [`ClientError::ClockActionFailed`] when the create request fails;
    ///   the optimistic record is rolled back and nothing is persisted
    pub async fn toggle(&self) -> ClientResult<ClockRecord> {
        if !self.session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let _flight = self.acquire()?;

        let location = self.capture_location().await;
        let user = match self.session.user() {
            Some(user) if self.session.is_authenticated() => user,
            _ => return Err(ClientError::NotAuthenticated),
        };

        let action = self.records.status().next_action();
        let pending = self.records.begin_optimistic_write(action, location, &user.id);

        let outcome = match ApiRequest::post("/clock/records")
            .with_json(&CreateRecordRequest::from(pending.record()))
        {
            Ok(request) => {
                self.transport
                    .send_json::<CreateRecordResponse>(request)
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(created) => {
                let Some(record) = self.records.confirm(&pending, created.id) else {
                    warn!(action = %action, "session ended while the clock action was in flight");
                    return Err(ClientError::NotAuthenticated);
                };
                self.records.persist()?;
                info!(id = %record.id, action = %action, "clock action confirmed");
                Ok(record)
            }
            Err(cause) => {
                self.records.rollback(&pending);
                warn!(action = %action, error = %cause, "clock action failed, rolled back");
                Err(ClientError::ClockActionFailed { cause })
            }
        }
    }

    fn acquire(&self) -> ClientResult<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::OperationInProgress)?;
        Ok(FlightGuard(&self.in_flight))
    }

    async fn capture_location(&self) -> Option<Location> {
        match tokio::time::timeout(self.location_timeout, self.locator.current_location()).await {
            Ok(location) => location,
            Err(_) => {
                warn!(timeout = ?self.location_timeout, "location capture timed out");
                None
            }
        }
    }
}

impl std::fmt::Debug for ClockController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockController")
            .field("state", &self.state())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RequestError, TransportFailure};
    use crate::location::FixedLocation;
    use crate::test_support::{harness, harness_with_location, sign_in, signed_in, Harness};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use timeclock_protocol::{ClockAction, RecordId, SyncState};
    use timeclock_storage::{keys, KeyValueStore};

    fn created(h: &Harness, id: &str) {
        h.mock.push_json(201, json!({ "id": id }));
    }

    #[tokio::test]
    async fn toggles_alternate_between_in_and_out() {
        let h = signed_in();
        let controller = h.ctx.controller();
        assert_eq!(controller.state(), ClockStatus::Out);

        for n in 1..=5 {
            created(&h, &format!("r{n}"));
            let record = controller.toggle().await.unwrap();

            let expected = if n % 2 == 1 { ClockAction::ClockIn } else { ClockAction::ClockOut };
            assert_eq!(record.action, expected);
            assert_eq!(h.ctx.records().head().unwrap().action, expected);
            assert_eq!(controller.state(), expected.resulting_status());
        }
        assert_eq!(controller.state(), ClockStatus::In);
        assert_eq!(h.ctx.records().len(), 5);
    }

    #[tokio::test]
    async fn success_confirms_and_persists() {
        let h = signed_in();
        created(&h, "srv-1");

        let record = h.ctx.controller().toggle().await.unwrap();
        assert_eq!(record.id, RecordId::Server("srv-1".into()));
        assert_eq!(record.sync_state, SyncState::Confirmed);
        assert_eq!(record.user_id, "u-1");

        let sent = &h.mock.requests()[0];
        assert!(sent.url.ends_with("/clock/records"));
        let body = sent.json_body().unwrap();
        assert_eq!(body["action"], "clock_in");
        assert_eq!(body["userId"], "u-1");
        assert_eq!(body["date"], record.date.as_str());
        assert!(body["location"].is_null());

        let persisted = h.store.get(keys::CURRENT_STATUS).unwrap();
        assert_eq!(persisted.as_deref(), Some("\"in\""));
        assert!(h.store.contains(keys::CLOCK_RECORDS).unwrap());
    }

    #[tokio::test]
    async fn numeric_server_ids_are_accepted() {
        let h = signed_in();
        h.mock.push_json(201, json!({ "id": 42, "action": "clock_in" }));

        let record = h.ctx.controller().toggle().await.unwrap();
        assert_eq!(record.id, RecordId::Server("42".into()));
    }

    #[tokio::test]
    async fn failure_rolls_back_exactly() {
        let h = signed_in();
        let before_records = h.ctx.records().records();
        let before_store = h.store.snapshot();
        h.mock.push_json(500, json!({ "message": "Server error" }));

        let err = h.ctx.controller().toggle().await.unwrap_err();
        match err {
            ClientError::ClockActionFailed { cause } => assert_eq!(cause.status(), Some(500)),
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(h.ctx.controller().state(), ClockStatus::Out);
        assert_eq!(h.ctx.records().records(), before_records);
        assert_eq!(h.store.snapshot(), before_store);
    }

    #[tokio::test]
    async fn consecutive_failures_restore_original_status() {
        let h = signed_in();
        created(&h, "r1");
        h.ctx.controller().toggle().await.unwrap();
        let before = h.ctx.records().records();

        h.mock.push_failure(TransportFailure::Connect("refused".into()));
        h.mock.push_json(503, json!({}));
        for _ in 0..2 {
            let err = h.ctx.controller().toggle().await.unwrap_err();
            assert!(matches!(err, ClientError::ClockActionFailed { .. }));
            assert_eq!(h.ctx.controller().state(), ClockStatus::In);
        }

        assert_eq!(h.ctx.records().records(), before);
        let sent: Vec<_> = h.mock.requests().iter().map(|r| r.json_body().unwrap()["action"].clone()).collect();
        assert_eq!(sent, vec![json!("clock_in"), json!("clock_out"), json!("clock_out")]);
    }

    #[tokio::test]
    async fn transport_failure_is_distinct_from_http_failure() {
        let h = signed_in();
        h.mock.push_failure(TransportFailure::Connect("refused".into()));

        let err = h.ctx.controller().toggle().await.unwrap_err();
        let cause = err.request_error().unwrap();
        assert!(cause.is_transport());
        assert_eq!(cause.status(), None);
    }

    #[tokio::test]
    async fn not_authenticated_sends_nothing() {
        let h = harness();

        let err = h.ctx.controller().toggle().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert_eq!(h.mock.request_count(), 0);
        assert!(h.ctx.records().is_empty());
        assert!(!h.ctx.controller().is_busy());
    }

    #[tokio::test]
    async fn concurrent_toggle_is_rejected() {
        let h = signed_in();
        let controller = h.ctx.controller();
        h.mock.pause();
        created(&h, "r1");

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.toggle().await }
        });
        h.mock.wait_for_requests(1).await;
        assert!(controller.is_busy());

        let err = controller.toggle().await.unwrap_err();
        assert!(matches!(err, ClientError::OperationInProgress));
        assert_eq!(h.ctx.records().len(), 1);
        assert_eq!(h.mock.request_count(), 1);

        h.mock.resume();
        let record = first.await.unwrap().unwrap();
        assert_eq!(record.action, ClockAction::ClockIn);
        assert!(!controller.is_busy());
        assert_eq!(h.ctx.records().len(), 1);
    }

    #[tokio::test]
    async fn lock_is_released_after_failure() {
        let h = signed_in();
        h.mock.push_json(500, json!({}));
        created(&h, "r1");

        assert!(h.ctx.controller().toggle().await.is_err());
        assert!(!h.ctx.controller().is_busy());
        let record = h.ctx.controller().toggle().await.unwrap();
        assert_eq!(record.action, ClockAction::ClockIn);
    }

    #[tokio::test]
    async fn unauthorized_toggle_invalidates_session() {
        let h = signed_in();
        h.mock.push_json(401, json!({ "message": "token expired" }));

        let err = h.ctx.controller().toggle().await.unwrap_err();
        assert!(err.request_error().unwrap().is_unauthorized());

        assert!(!h.ctx.session().is_authenticated());
        assert!(h.ctx.records().is_empty());
        assert_eq!(h.ctx.controller().state(), ClockStatus::Out);
        assert!(h.store.is_empty());
        assert_eq!(h.navigator.login_routes(), 1);
        assert_eq!(h.ctx.session().invalidation_count(), 1);
    }

    #[tokio::test]
    async fn invalidation_during_flight_discards_result() {
        let h = signed_in();
        let controller = h.ctx.controller();
        h.mock.pause();
        created(&h, "r1");

        let toggle = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.toggle().await }
        });
        h.mock.wait_for_requests(1).await;
        h.ctx.session().invalidate().unwrap();
        h.mock.resume();

        let err = toggle.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(h.ctx.records().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn location_is_attached_when_available() {
        let location = Location {
            latitude: 31.23,
            longitude: 121.47,
            accuracy: 15.0,
        };
        let h = harness_with_location(Arc::new(FixedLocation(location)));
        sign_in(&h);
        created(&h, "r1");

        let record = h.ctx.controller().toggle().await.unwrap();
        assert_eq!(record.location, Some(location));
        let body = h.mock.requests()[0].json_body().unwrap();
        assert_eq!(body["location"]["latitude"], json!(31.23));
    }

    struct StalledLocation;

    #[async_trait]
    impl LocationProvider for StalledLocation {
        async fn current_location(&self) -> Option<Location> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_location_does_not_block_the_action() {
        let h = harness_with_location(Arc::new(StalledLocation));
        sign_in(&h);
        created(&h, "r1");

        let record = h.ctx.controller().toggle().await.unwrap();
        assert_eq!(record.location, None);
        assert_eq!(record.action, ClockAction::ClockIn);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_treated_as_transport_failure() {
        let h = signed_in();
        h.mock.pause();
        created(&h, "r1");

        let err = h.ctx.controller().toggle().await.unwrap_err();
        match err {
            ClientError::ClockActionFailed {
                cause: RequestError::Transport(TransportFailure::Timeout(after)),
            } => assert_eq!(after, Duration::from_secs(10)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.ctx.records().is_empty());
        assert!(!h.ctx.controller().is_busy());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn status_tracks_successful_toggles(outcomes in prop::collection::vec(any::<bool>(), 0..12)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let h = signed_in();
                let mut successes = 0usize;
                for (i, ok) in outcomes.iter().enumerate() {
                    if *ok {
                        created(&h, &format!("r{i}"));
                        h.ctx.controller().toggle().await.unwrap();
                        successes += 1;
                    } else {
                        h.mock.push_json(502, json!({}));
                        h.ctx.controller().toggle().await.unwrap_err();
                    }
                }

                let expected = if successes % 2 == 1 { ClockStatus::In } else { ClockStatus::Out };
                assert_eq!(h.ctx.controller().state(), expected);
                assert_eq!(h.ctx.records().len(), successes);
            });
        }
    }
}
