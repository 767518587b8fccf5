use std::sync::Arc;

use bulkmail::config::{DispatchConfig, RegistryConfig, SchedulerConfig, SegmentsConfig};
use bulkmail::dispatch::{BatchDispatcher, DispatcherDeps, HrefRewriter, HttpConsentRegistry};
use bulkmail::http::{ApiState, api_routes};
use bulkmail::scheduler::spawn_scheduler;
use bulkmail::segments::HttpSegmentDirectory;
use bulkmail::store::{LibSqlStore, Store};
use bulkmail::transport::TenantTransportFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let port: u16 = std::env::var("BULKMAIL_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let registry_config = RegistryConfig::from_env().unwrap_or_else(|| {
        eprintln!("Error: CONSENT_API_URL not set");
        eprintln!("  export CONSENT_API_URL=https://registry.example/api");
        eprintln!("  export CONSENT_API_KEY=...");
        std::process::exit(1);
    });

    let segments_config = SegmentsConfig::from_env().unwrap_or_else(|| {
        eprintln!("Error: SEGMENT_API_URL not set");
        eprintln!("  export SEGMENT_API_URL=https://segments.example/api/members");
        std::process::exit(1);
    });

    let dispatch_config = DispatchConfig::from_env();
    let scheduler_config = SchedulerConfig::from_env();

    eprintln!("📬 bulkmail v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/campaigns", port);
    eprintln!("   Click redirect: http://0.0.0.0:{}/l/:id", port);
    eprintln!(
        "   Chunk size: {}, log batch size: {}",
        dispatch_config.chunk_size, dispatch_config.log_batch_size
    );

    // ── Database ────────────────────────────────────────────────────────
    let db_path =
        std::env::var("BULKMAIL_DB_PATH").unwrap_or_else(|_| "./data/bulkmail.db".to_string());

    let db_path_ref = std::path::Path::new(&db_path);
    let store: Arc<dyn Store> = Arc::new(
        LibSqlStore::new_local(db_path_ref)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );
    eprintln!("   Database: {}", db_path);

    // ── Dispatcher ──────────────────────────────────────────────────────
    let dispatcher = Arc::new(BatchDispatcher::new(
        dispatch_config.clone(),
        DispatcherDeps {
            store: Arc::clone(&store),
            segments: Arc::new(HttpSegmentDirectory::new(segments_config)),
            registry: Arc::new(HttpConsentRegistry::new(registry_config)),
            rewriter: Arc::new(HrefRewriter::new(dispatch_config.click_base_url.clone())),
            transports: Arc::new(TenantTransportFactory),
        },
    ));

    // ── Scheduler ───────────────────────────────────────────────────────
    if scheduler_config.enabled {
        eprintln!(
            "   Scheduler: enabled (sweep every {}s)",
            scheduler_config.interval.as_secs()
        );
        let _ = spawn_scheduler(
            scheduler_config,
            Arc::clone(&store),
            Arc::clone(&dispatcher),
        );
    } else {
        eprintln!("   Scheduler: disabled");
    }

    // ── HTTP server ─────────────────────────────────────────────────────
    let app = api_routes(ApiState {
        store,
        dispatcher,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port, "API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
