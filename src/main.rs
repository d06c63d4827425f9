//! Biomatch HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use biomatch::audit::{AuditSink, HttpAuditSink};
use biomatch::biometric::Modality;
use biomatch::compare::{
    DescriptorComparator, PairComparator, RemoteComparator, RemoteComparatorConfig,
    refresh_readiness,
};
use biomatch::config::Config;
use biomatch::constants::LIVENESS_CHECK_INTERVAL;
use biomatch::gateway::{HandlerState, create_router_with_state};
use biomatch::store::{HttpTemplateStore, TemplateStore};
use biomatch::verifier::Verifier;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        face_transport = if config.face_service_url.is_some() { "remote" } else { "local" },
        "Biomatch starting"
    );

    let store: Arc<dyn TemplateStore> = Arc::new(HttpTemplateStore::new(
        &config.store_url,
        config.store_api_key.clone(),
    )?);

    let face_comparator: Arc<dyn PairComparator> = match &config.face_service_url {
        Some(url) => Arc::new(remote_comparator(&config, url, Modality::Face)?),
        None => Arc::new(DescriptorComparator::new(
            config.face_distance_threshold,
            config.descriptor_dim,
        )),
    };
    let fingerprint_comparator: Arc<dyn PairComparator> = Arc::new(remote_comparator(
        &config,
        &config.fingerprint_service_url,
        Modality::Fingerprint,
    )?);

    let audit: Option<Arc<dyn AuditSink>> = match &config.audit_url {
        Some(url) => Some(Arc::new(HttpAuditSink::new(url.clone())?)),
        None => {
            tracing::info!("No BIOMATCH_AUDIT_URL configured, audit records disabled");
            None
        }
    };

    let face = build_verifier(&config, store.clone(), face_comparator, audit.clone())
        .with_policy(config.face_policy());
    let fingerprint = build_verifier(&config, store, fingerprint_comparator, audit)
        .with_policy(config.fingerprint_policy());

    spawn_liveness(&fingerprint);
    spawn_liveness(&face);

    let state = HandlerState::new(Arc::new(face), Arc::new(fingerprint));
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Biomatch shutdown complete");
    Ok(())
}

fn remote_comparator(
    config: &Config,
    url: &str,
    modality: Modality,
) -> anyhow::Result<RemoteComparator> {
    let remote_config = RemoteComparatorConfig::new(url, modality)
        .with_timeouts(config.compare_timeout, config.batch_timeout);
    Ok(RemoteComparator::new(remote_config)?)
}

fn build_verifier(
    config: &Config,
    store: Arc<dyn TemplateStore>,
    comparator: Arc<dyn PairComparator>,
    audit: Option<Arc<dyn AuditSink>>,
) -> Verifier {
    let verifier = Verifier::new(store, comparator)
        .with_options(config.match_options())
        .with_fallback(config.fallback_config());
    match audit {
        Some(sink) => verifier.with_audit(sink),
        None => verifier,
    }
}

/// Wakes the comparator in the background, then keeps checking it so a
/// service that went to sleep is reinitialized before the next request.
fn spawn_liveness(verifier: &Verifier) {
    let comparator = Arc::clone(verifier.comparator());
    tokio::spawn(async move {
        let modality = comparator.modality();
        match comparator.ensure_ready().await {
            Ok(()) => tracing::info!(%modality, "Comparator ready"),
            Err(e) => tracing::warn!(%modality, error = %e, "Comparator not ready yet"),
        }

        let mut interval = tokio::time::interval(LIVENESS_CHECK_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let was_ready = comparator.is_ready();
            match refresh_readiness(comparator.as_ref()).await {
                Ok(()) if !was_ready => tracing::info!(%modality, "Comparator ready again"),
                Ok(()) => {}
                Err(e) => tracing::warn!(%modality, error = %e, "Comparator liveness check failed"),
            }
        }
    });
}

fn run_health_check() -> i32 {
    let port = std::env::var("BIOMATCH_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
