//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use biomatch::gateway::{HandlerState, create_router_with_state};
use biomatch::{
    BiometricTemplate, DescriptorComparator, FallbackConfig, HttpAuditSink, HttpTemplateStore,
    MatchOptions, Modality, RemoteComparator, RemoteComparatorConfig, SamplePayload,
    SubjectProfile, Verifier,
};

use super::stubs::{AuditStub, ComparatorStub, StoreStub, serve};

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
const TEST_STORE_API_KEY: &str = "test-store-key";
const TEST_WAKE_DELAY: Duration = Duration::from_millis(20);
const TEST_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const TEST_HEALTH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

pub fn fingerprint_template(id: &str, subject_id: &str, name: &str, image: &[u8]) -> BiometricTemplate {
    BiometricTemplate::new(
        id,
        SubjectProfile::new(subject_id, name),
        Modality::Fingerprint,
        SamplePayload::Image(image.to_vec()),
    )
}

pub fn face_template(id: &str, subject_id: &str, name: &str, first: f32) -> BiometricTemplate {
    BiometricTemplate::new(
        id,
        SubjectProfile::new(subject_id, name),
        Modality::Face,
        SamplePayload::Descriptor(descriptor(first)),
    )
}

pub fn descriptor(first: f32) -> Vec<f32> {
    let mut v = vec![0.0; 128];
    v[0] = first;
    v
}

/// Five enrolled fingerprints plus two faces. `stu-3` is the intended match
/// for [`ROSTER_PROBE`].
pub fn roster() -> Vec<BiometricTemplate> {
    vec![
        fingerprint_template("fp-1", "stu-1", "Dorothy Vaughan", b"arch-0001-aaaa"),
        fingerprint_template("fp-2", "stu-2", "Mary Jackson", b"loop-0002-bbbb"),
        fingerprint_template("fp-3", "stu-3", "Katherine Johnson", b"whorl-0003-cccc"),
        fingerprint_template("fp-4", "stu-4", "Christine Darden", b"whorl-0004-dddd"),
        fingerprint_template("fp-5", "stu-5", "Annie Easley", b"tented-0005-eeee"),
        face_template("face-1", "stu-1", "Dorothy Vaughan", 0.2),
        face_template("face-2", "stu-2", "Mary Jackson", 0.9),
    ]
}

/// A fresh capture of `fp-3` that is not byte-identical to it.
pub const ROSTER_PROBE: &[u8] = b"whorl-0003-ccXX";

/// The three collaborating services a verifier talks to.
pub struct StubServices {
    pub store: Arc<StoreStub>,
    pub comparator: Arc<ComparatorStub>,
    pub audit: Arc<AuditStub>,
    pub store_addr: SocketAddr,
    pub comparator_addr: SocketAddr,
    pub audit_addr: SocketAddr,
}

impl StubServices {
    pub async fn start(
        templates: Vec<BiometricTemplate>,
        comparator: Arc<ComparatorStub>,
    ) -> Result<Self, ServerStartupError> {
        let store = StoreStub::new(templates);
        let audit = AuditStub::new();

        let store_addr = serve(store.router()).await?;
        let comparator_addr = serve(comparator.router()).await?;
        let audit_addr = serve(audit.router()).await?;

        Ok(Self {
            store,
            comparator,
            audit,
            store_addr,
            comparator_addr,
            audit_addr,
        })
    }

    pub fn store_url(&self) -> String {
        format!("http://{}", self.store_addr)
    }

    pub fn comparator_url(&self) -> String {
        format!("http://{}", self.comparator_addr)
    }

    pub fn audit_url(&self) -> String {
        format!("http://{}/attendance", self.audit_addr)
    }

    fn store_client(&self) -> Result<Arc<HttpTemplateStore>, ServerStartupError> {
        HttpTemplateStore::new(&self.store_url(), Some(TEST_STORE_API_KEY.to_string()))
            .map(Arc::new)
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))
    }

    fn audit_sink(&self) -> Result<Arc<HttpAuditSink>, ServerStartupError> {
        HttpAuditSink::new(self.audit_url())
            .map(Arc::new)
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))
    }

    /// Fingerprint verifier wired to the stubs over HTTP.
    pub fn fingerprint_verifier(&self) -> Result<Verifier, ServerStartupError> {
        let remote = RemoteComparator::new(
            RemoteComparatorConfig::new(self.comparator_url(), Modality::Fingerprint)
                .with_timeouts(TEST_CALL_TIMEOUT, TEST_CALL_TIMEOUT)
                .with_health_timeout(TEST_HEALTH_TIMEOUT),
        )
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

        Ok(Verifier::new(self.store_client()?, Arc::new(remote))
            .with_options(MatchOptions::default().with_call_timeout(TEST_CALL_TIMEOUT))
            .with_fallback(
                FallbackConfig::default()
                    .with_wake_delay(TEST_WAKE_DELAY)
                    .with_batch_timeout(TEST_CALL_TIMEOUT),
            )
            .with_audit(self.audit_sink()?))
    }

    /// Face verifier using in-process descriptor distance.
    pub fn face_verifier(&self) -> Result<Verifier, ServerStartupError> {
        Ok(
            Verifier::new(self.store_client()?, Arc::new(DescriptorComparator::default()))
                .with_audit(self.audit_sink()?),
        )
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub stubs: StubServices,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Spawns the biomatch gateway in front of stub services.
///
/// Everything crosses real sockets: the gateway reaches the store, the
/// fingerprint comparison service and the attendance endpoint over HTTP.
/// Faces are compared in-process.
///
/// ```ignore
/// let server = spawn_test_server(roster(), ComparatorStub::cold(1)).await?;
/// let client = TestClient::new(server.url());
/// let reply = client.verify_fingerprint(ROSTER_PROBE, Some("lec-1")).await?;
/// ```
pub async fn spawn_test_server(
    templates: Vec<BiometricTemplate>,
    comparator: Arc<ComparatorStub>,
) -> Result<TestServer, ServerStartupError> {
    let stubs = StubServices::start(templates, comparator).await?;

    let state = HandlerState::new(
        Arc::new(stubs.face_verifier()?),
        Arc::new(stubs.fingerprint_verifier()?),
    );
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        stubs,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}

pub fn store_api_key() -> &'static str {
    TEST_STORE_API_KEY
}
