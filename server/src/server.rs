use std::net::SocketAddr;

use tracing::info;

/// Bind `0.0.0.0:{port}` and serve the router until the process exits
pub async fn run_server(routes: axum::Router, port: u16) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, routes).await?;

    Ok(())
}
