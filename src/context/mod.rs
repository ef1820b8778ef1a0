//! Application context owning the named config registry and the service container.

use crate::config::ConfigRegistry;
use crate::container::Container;

/// Dependency-injection root, created once by the application entry point
/// and passed to whatever needs configuration or services.
///
/// ## Example
///
/// ```no_run
/// use dragon_loader::{AppContext, LoadMode};
///
/// let mut ctx = AppContext::builder().build();
///
/// let app = ctx.configs_mut().load_config("config/app.yaml", Some("app"), LoadMode::Fresh)?;
/// if let Some(services) = app.borrow().get("services") {
///     ctx.container().load_from_value(services)?;
/// }
/// # Ok::<(), dragon_loader::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct AppContext {
    configs: ConfigRegistry,
    container: Container,
}

impl AppContext {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut ConfigRegistry {
        &mut self.configs
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

/// Builder for constructing an [`AppContext`].
///
/// Parts not supplied start out empty.
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder {
    configs: Option<ConfigRegistry>,
    container: Option<Container>,
}

impl AppContextBuilder {
    pub fn with_registry(mut self, configs: ConfigRegistry) -> Self {
        self.configs = Some(configs);
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    pub fn build(self) -> AppContext {
        AppContext {
            configs: self.configs.unwrap_or_default(),
            container: self.container.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadMode;
    use crate::container::{ClassDef, Param};
    use serde_json::json;
    use std::io::Write;

    #[derive(Debug)]
    struct Greeter {
        greeting: String,
    }

    #[test]
    fn test_defaults_are_empty() {
        let ctx = AppContext::builder().build();
        assert_eq!(ctx.configs().names().count(), 0);
        assert!(!ctx.container().is_class_registered("anything"));
    }

    #[test]
    fn test_contexts_do_not_share_state() {
        let first = AppContext::builder().build();
        let second = AppContext::builder().build();

        first.container().set_value("svc", 1_u8, true);
        assert!(first.container().is_class_registered("svc"));
        assert!(!second.container().is_class_registered("svc"));
    }

    #[test]
    fn test_services_wired_from_loaded_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            "{}",
            json!({
                "services": {
                    "greeter": {
                        "class": "App\\Greeter",
                        "singleton": true,
                        "params": { "greeting": "hello" }
                    }
                }
            })
        )
        .unwrap();

        let container = Container::new();
        container.define(
            ClassDef::concrete("App\\Greeter", |args| {
                Ok(Greeter {
                    greeting: args.str("greeting")?.to_string(),
                })
            })
            .param(Param::new("greeting").builtin("string")),
        );

        let mut ctx = AppContext::builder().with_container(container).build();
        let app = ctx
            .configs_mut()
            .load_config(file.path(), Some("app"), LoadMode::Fresh)
            .unwrap();
        let services = app.borrow().get("services").cloned().unwrap();
        ctx.container().load_from_value(&services).unwrap();

        let greeter = ctx.container().get_as::<Greeter>("greeter").unwrap();
        assert_eq!(greeter.greeting, "hello");
        assert!(ctx.configs().get_config("app").is_some());
    }
}
