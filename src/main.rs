use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        upstream = %settings.proxy.upstream_origin,
        "bookshelf-app bootstrap starting"
    );

    bookshelf_app::server::run(&settings).await
}
