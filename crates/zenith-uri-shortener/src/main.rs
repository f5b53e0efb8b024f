//! CLI entry point for the demo URI-shortening service. Wires an in-memory
//! link store behind its own HTTP/2 listener, then starts the real
//! pipeline (executor + router + load shedder + data-service client)
//! pointed at it.

mod config_loader;
mod domain;
mod linkstore;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use zenith_dataservice::{ServiceResolver, StaticResolver};
use zenith_transport_http2::{Http2Client, Http2ClientRegistry};

use domain::{InMemoryLinkRepository, LinkRepository, RandomCodeGenerator};

const LINK_STORE_ADDR: &str = "127.0.0.1:9500";

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = config_loader::load(config_path.as_deref())?;

    let provider = if let Some(endpoint) = &config.bootstrap.observability.otlp_endpoint {
        zenith_otel::otlp_provider(endpoint, &config.bootstrap.service.name)?
    } else {
        zenith_otel::console_provider()
    };
    tracing::info!(
        service = %config.bootstrap.service.name,
        environment = %config.bootstrap.service.environment,
        "starting zenith-uri-shortener"
    );

    let repository: Arc<dyn LinkRepository> = Arc::new(InMemoryLinkRepository::new(Box::new(RandomCodeGenerator)));
    let link_store_addr: SocketAddr = LINK_STORE_ADDR.parse()?;
    let link_store = linkstore::spawn(link_store_addr, repository)?;
    tracing::info!(%link_store_addr, "link store listening");

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", link_store_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::with_timeouts(
        Duration::from_millis(config.bootstrap.dataservice.client.connect_timeout_ms),
        Duration::from_millis(config.bootstrap.dataservice.client.request_timeout_ms),
    ));

    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &provider)?;
    pipeline.start()?;
    tracing::info!(addr = %pipeline.local_addr(), "pipeline listening");

    // This demo binary has no signal handling of its own; it runs until
    // killed, relying on `Pipeline`'s and `Http2Server`'s `Drop` impls to
    // unwind the shutdown order (ingress, then executor, then sessions).
    let _ = &link_store;
    loop {
        std::thread::park();
    }
}
