use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use vidpub_api::setup;
use vidpub_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let (state, app) = setup::initialize_app(config).await?;
    setup::server::start_server(&state.config, app).await
}
