//! Shared fixtures for unit tests.

use crate::config::ClientConfig;
use crate::context::AppContext;
use crate::guard::RecordingNavigator;
use crate::http::MockHttpClient;
use crate::location::{LocationProvider, NoLocation};
use std::sync::Arc;
use timeclock_protocol::{Role, User};
use timeclock_storage::{keys, set_json, InMemoryStore};

pub(crate) const TOKEN: &str = "tok-4f2a";

pub(crate) struct Harness {
    pub mock: Arc<MockHttpClient>,
    pub store: Arc<InMemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub ctx: AppContext,
}

pub(crate) fn harness() -> Harness {
    harness_with_location(Arc::new(NoLocation))
}

pub(crate) fn harness_with_location(locator: Arc<dyn LocationProvider>) -> Harness {
    let mock = Arc::new(MockHttpClient::new());
    let store = Arc::new(InMemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let ctx = AppContext::builder(
        ClientConfig::new("https://clock.test/api/v1"),
        mock.clone(),
        store.clone(),
    )
    .location_provider(locator)
    .navigator(navigator.clone())
    .build();

    Harness {
        mock,
        store,
        navigator,
        ctx,
    }
}

pub(crate) fn seed_session(store: &InMemoryStore, token: &str, user: &User) {
    set_json(store, keys::AUTH_TOKEN, token).unwrap();
    set_json(store, keys::USER_INFO, user).unwrap();
}

pub(crate) fn sign_in_as(h: &Harness, role: Role) {
    seed_session(&h.store, TOKEN, &User::new("u-1", role));
    assert!(h.ctx.session().restore().unwrap());
}

pub(crate) fn sign_in(h: &Harness) {
    sign_in_as(h, Role::Employee);
}

pub(crate) fn signed_in_as(role: Role) -> Harness {
    let h = harness();
    sign_in_as(&h, role);
    h
}

pub(crate) fn signed_in() -> Harness {
    signed_in_as(Role::Employee)
}
