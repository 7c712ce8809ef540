//! Server bootstrap shared by the `bookshelf-app` binary and `bookshelf serve`.

use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Register modules, run their lifecycle around the HTTP server, and stop
/// them in reverse order once the server has shut down.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    crate::register_all(&mut registry, settings)?;

    let ctx = InitCtx { settings };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, settings).await;

    registry.stop_all().await?;
    served
}
