use server::{AppState, Server, config::ServerConfig, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = ServerConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    Server::serve(AppState::new(pool, config), listener).await?;
    Ok(())
}
