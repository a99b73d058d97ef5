//! HVAC Proxy - serialized access to a single thermostat.
//!
//! ## Quick Start
//!
//! ```bash
//! # Defaults: port 3000, thermostat at localhost:8080
//! hvac-proxy
//!
//! # Custom configuration
//! HVAC_BACKEND_URL=http://192.168.1.50 HVAC_AUTH_TOKEN=s3cret HVAC_PORT=9000 hvac-proxy
//! ```
//!
//! Every request under `/api/proxy/*` is forwarded to the device one at a
//! time, in arrival order, with the prefix stripped:
//!
//! ```bash
//! curl http://localhost:3000/api/proxy/read
//! curl -X PUT -d '{"value":22}' http://localhost:3000/api/proxy/set/3
//! ```

use hvac_proxy::{run_server, ServerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hvac_proxy=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    run_server(ServerConfig::from_env()).await
}
