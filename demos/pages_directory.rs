//! Serves the files under `demos/pages` as routes.
//!
//! ```text
//! cargo run --example pages_directory
//! curl http://127.0.0.1:8080/users/42
//! ```

use microroute::{Flow, HttpServer, ServerConfig};
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::from_env().with_pages_dir("demos/pages");
    let mut server = HttpServer::new(config);

    // Handlers registered before the pages win over pages at the same path
    server.get("/health", |_req| async { Ok(Flow::reply("ok")) })?;

    let handle = server.start().await?;
    info!("Serving pages on http://{addr}", addr = handle.local_addr());

    tokio::signal::ctrl_c().await?;
    handle.stop().await;

    Ok(())
}
