use aegisfs_common::Config;
use aegisfs_mds::state::MdsState;

const DEFAULT_ADDR: &str = "127.0.0.1:9000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::load()?;
    std::fs::create_dir_all(&cfg.log_dir)?;

    let state = MdsState::open(&cfg)?;
    tracing::info!(root = %cfg.root_dir.display(), "MDS recovered from journal");

    aegisfs_mds::server::serve(DEFAULT_ADDR, state).await?;
    Ok(())
}
