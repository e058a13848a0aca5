//! Static plugin registration and discovery.
//!
//! Plugins register themselves at link time: each platform crate contributes
//! a [`PluginDescriptor`] to the [`PLUGIN_REGISTRY`] distributed slice.
//! Discovery is a lookup over this registry — there is no runtime module
//! introspection and no dependency on initialization order.
//!
//! ```rust,ignore
//! use chatrelay_core::{PLUGIN_REGISTRY, PluginDescriptor};
//! use chatrelay_core::linkme::distributed_slice;
//!
//! #[distributed_slice(PLUGIN_REGISTRY)]
//! static IRC_PLUGIN: PluginDescriptor = PluginDescriptor {
//!     slug: "irc",
//!     build: IrcPlugin::from_context,
//! };
//! ```

use std::collections::{BTreeMap, HashSet};

use linkme::distributed_slice;
use tracing::info;

use crate::error::{PluginResult, RegistryError};
use crate::plugin::{BoxedPlugin, EventSink};

/// Everything a plugin receives at construction time.
pub struct PluginContext {
    /// The slug the plugin was selected under.
    pub slug: &'static str,
    /// The plugin's own section of the configuration, opaque to the runtime.
    pub config: toml::Value,
    /// Sink for submitting normalized events to the router.
    pub events: EventSink,
}

/// Factory function that builds a live plugin from its context.
pub type BuildFn = fn(PluginContext) -> PluginResult<BoxedPlugin>;

/// A static, `Copy` descriptor that identifies and instantiates a plugin.
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    /// Stable identifier; must be unique across the process and match the
    /// plugin's key under `[plugins]` in the configuration.
    pub slug: &'static str,
    /// Factory that creates the live [`Plugin`](crate::Plugin) instance.
    pub build: BuildFn,
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("slug", &self.slug)
            .finish_non_exhaustive()
    }
}

/// Registry of plugin descriptors contributed by platform crates.
#[distributed_slice]
pub static PLUGIN_REGISTRY: [PluginDescriptor];

/// Discovered set of available plugin implementations.
#[derive(Debug)]
pub struct PluginRegistry {
    descriptors: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    /// Collects every descriptor registered in [`PLUGIN_REGISTRY`].
    ///
    /// Fails fast if two implementations declare the same slug.
    pub fn discover() -> Result<Self, RegistryError> {
        Self::from_descriptors(PLUGIN_REGISTRY.iter().copied())
    }

    /// Builds a registry from an explicit descriptor set.
    ///
    /// Duplicate slugs are a configuration error, never a silent pick.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = PluginDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.slug) {
                return Err(RegistryError::DuplicateSlug(descriptor.slug.to_string()));
            }
        }
        Ok(Self { descriptors })
    }

    /// Filters the discovered plugins to those with a configuration section.
    ///
    /// A discovered plugin absent from the configuration is expected, not an
    /// error: it is noted at info level and excluded.
    pub fn select(&self, plugin_config: &BTreeMap<String, toml::Value>) -> Vec<PluginDescriptor> {
        self.descriptors
            .iter()
            .filter(|descriptor| {
                if plugin_config.contains_key(descriptor.slug) {
                    true
                } else {
                    info!(plugin = descriptor.slug, "not loading unconfigured plugin");
                    false
                }
            })
            .copied()
            .collect()
    }

    /// Returns the slugs of all discovered plugins.
    pub fn slugs(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.slug).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;

    fn refuse(ctx: PluginContext) -> PluginResult<BoxedPlugin> {
        Err(PluginError::config(ctx.slug, "test descriptor"))
    }

    fn descriptor(slug: &'static str) -> PluginDescriptor {
        PluginDescriptor {
            slug,
            build: refuse,
        }
    }

    #[test]
    fn duplicate_slugs_fail_discovery() {
        let err =
            PluginRegistry::from_descriptors([descriptor("irc"), descriptor("irc")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSlug("irc".to_string()));
    }

    #[test]
    fn select_excludes_unconfigured_plugins() {
        let registry =
            PluginRegistry::from_descriptors([descriptor("irc"), descriptor("matrix")]).unwrap();

        let mut config = BTreeMap::new();
        config.insert("irc".to_string(), toml::Value::Table(Default::default()));

        let selected = registry.select(&config);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].slug, "irc");
    }

    #[test]
    fn select_with_empty_config_selects_nothing() {
        let registry = PluginRegistry::from_descriptors([descriptor("irc")]).unwrap();
        assert!(registry.select(&BTreeMap::new()).is_empty());
    }
}
