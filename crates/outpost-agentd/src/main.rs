use anyhow::Context;
use tracing::{error, info};

use outpost_agentd::{AgentConfig, launch};
use outpost_api::{AuthKey, ControlApi, ControlServer, Upstream, serve_interior};
use outpost_core::MessageRouter;
use outpost_observe::logger_init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config + logger
    let path = AgentConfig::path_from_env();
    let cfg = AgentConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;
    logger_init(&cfg.logging)?;
    info!(config = %path.display(), "configuration loaded");

    // 2) Router shared by the control channel and the interior endpoint
    let router = MessageRouter::new();

    // 3) Control channel (bind and TLS failures are fatal)
    let control = cfg.control_config();
    let upstream = Upstream::new(control.upstream_addr.clone())?;
    let app = ControlApi::new(AuthKey::new(&cfg.auth_key)?, router.clone(), upstream).router();
    let server = ControlServer::bind(&control, app)
        .await
        .context("starting control channel")?;
    tokio::spawn(server.serve());

    // 4) Interior status endpoint
    let interior_addr = cfg.interior_addr;
    let interior_router = router.clone();
    tokio::spawn(async move {
        if let Err(e) = serve_interior(interior_addr, interior_router).await {
            error!(error = %e, "interior endpoint stopped");
        }
    });

    // 5) Supervised processes
    launch(&cfg.processes).await.context("starting processes")?;
    info!("all processes started");

    // 6) Keep running
    std::future::pending::<()>().await;
    Ok(())
}
