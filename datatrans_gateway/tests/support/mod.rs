#![allow(dead_code)]
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
};

use datatrans_gateway::{
    test_utils::{prepare_test_env, test_config, MemoryStore},
    DatatransApiError,
    DatatransGateway,
    DatatransTransport,
    EventHandlers,
    EventHooks,
    RawResponse,
    TransactionEvent,
};
use log::*;
use tokio::task::JoinHandle;

pub const CHARGE_SUCCESS: &str = include_str!("../../src/test_assets/charge_success.xml");
pub const CHARGE_DECLINED: &str = include_str!("../../src/test_assets/charge_declined.xml");
pub const REFUND_SUCCESS: &str = include_str!("../../src/test_assets/refund_success.xml");
pub const ALIAS_SUCCESS: &str = include_str!("../../src/test_assets/notification_alias_success.xml");
pub const ALIAS_DECLINED: &str = include_str!("../../src/test_assets/notification_alias_declined.xml");
pub const ALIAS_WRONG_SIGN2: &str = include_str!("../../src/test_assets/notification_alias_wrong_sign2.xml");
pub const PAYMENT_SUCCESS: &str = include_str!("../../src/test_assets/notification_payment_success.xml");
pub const PAYMENT_DECLINED: &str = include_str!("../../src/test_assets/notification_payment_declined.xml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authorize,
    Process,
}

/// Answers every request with the same canned response, and remembers what it was sent.
#[derive(Clone)]
pub struct StubTransport {
    response: Result<RawResponse, DatatransApiError>,
    requests: Arc<Mutex<Vec<(Endpoint, String)>>>,
}

impl StubTransport {
    pub fn new(status: u16, body: &str) -> Self {
        Self { response: Ok(RawResponse::new(status, body)), requests: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing(error: DatatransApiError) -> Self {
        Self { response: Err(error), requests: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn requests(&self) -> Vec<(Endpoint, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn record(&self, endpoint: Endpoint, xml: String) -> Result<RawResponse, DatatransApiError> {
        debug!("Stub transport received a request for {endpoint:?}: {xml}");
        self.requests.lock().unwrap().push((endpoint, xml));
        self.response.clone()
    }
}

impl DatatransTransport for StubTransport {
    async fn authorize(&self, xml: String) -> Result<RawResponse, DatatransApiError> {
        self.record(Endpoint::Authorize, xml)
    }

    async fn process(&self, xml: String) -> Result<RawResponse, DatatransApiError> {
        self.record(Endpoint::Process, xml)
    }
}

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub fn counting_hook(hook: HookCalled) -> impl Fn(TransactionEvent) -> HookFuture + Send + Sync + 'static {
    move |event: TransactionEvent| -> HookFuture {
        info!("🪝️ {:?} #{}: {}", event.channel, event.id, event.record);
        hook.called();
        Box::pin(async {})
    }
}

/// One counter per event channel
#[derive(Default, Clone)]
pub struct ChannelCounts {
    pub alias_registration_done: HookCalled,
    pub payment_done: HookCalled,
    pub alias_payment_done: HookCalled,
    pub refund_done: HookCalled,
}

impl ChannelCounts {
    /// Counts for alias registrations, form payments, alias payments and refunds, in that order
    pub fn counts(&self) -> [i32; 4] {
        [
            self.alias_registration_done.count(),
            self.payment_done.count(),
            self.alias_payment_done.count(),
            self.refund_done.count(),
        ]
    }
}

pub struct TestGateway {
    pub gateway: DatatransGateway<MemoryStore, StubTransport>,
    pub store: MemoryStore,
    pub transport: StubTransport,
    pub counts: ChannelCounts,
    handlers: Vec<JoinHandle<()>>,
}

impl TestGateway {
    pub fn new(transport: StubTransport) -> Self {
        prepare_test_env();
        let counts = ChannelCounts::default();
        let mut hooks = EventHooks::default();
        hooks
            .on_alias_registration_done(counting_hook(counts.alias_registration_done.clone()))
            .on_payment_done(counting_hook(counts.payment_done.clone()))
            .on_alias_payment_done(counting_hook(counts.alias_payment_done.clone()))
            .on_refund_done(counting_hook(counts.refund_done.clone()));
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        let handlers = handlers.start_handlers();
        let store = MemoryStore::new();
        let gateway = DatatransGateway::new(test_config(), store.clone(), transport.clone(), producers);
        Self { gateway, store, transport, counts, handlers }
    }

    /// Drops the gateway and waits until every hook has run. Returns the per-channel hook counts.
    pub async fn shut_down(self) -> [i32; 4] {
        let Self { gateway, counts, handlers, .. } = self;
        drop(gateway);
        for handle in handlers {
            handle.await.expect("An event handler panicked");
        }
        counts.counts()
    }
}
