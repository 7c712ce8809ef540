use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_http::proxy::Proxy;
use bookshelf_kernel::{settings::Settings, InitCtx, Module};

/// Forwards everything under `/<prefix>` to the backend origin
pub struct ProxyModule {
    proxy: Proxy,
}

impl ProxyModule {
    pub fn new(proxy: Proxy) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl Module for ProxyModule {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn mount_path(&self) -> String {
        format!("/{}", self.proxy.prefix())
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            upstream = %self.proxy.origin(),
            "proxy module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        self.proxy.router()
    }
}

/// Create the proxy module from settings
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let proxy = Proxy::from_settings(&settings.proxy)?;
    Ok(Arc::new(ProxyModule::new(proxy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::ProxySettings;

    #[test]
    fn mounts_under_configured_prefix() {
        let settings = Settings {
            proxy: ProxySettings {
                prefix: "backend".into(),
                ..ProxySettings::default()
            },
            ..Settings::default()
        };
        let module = create_module(&settings).unwrap();
        assert_eq!(module.name(), "proxy");
        assert_eq!(module.mount_path(), "/backend");
    }

    #[test]
    fn invalid_allow_list_fails_registration() {
        let settings = Settings {
            proxy: ProxySettings {
                allowed_headers: Some(vec!["not a header".into()]),
                ..ProxySettings::default()
            },
            ..Settings::default()
        };
        assert!(create_module(&settings).is_err());
    }
}
