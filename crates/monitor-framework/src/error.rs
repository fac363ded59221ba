//! Module-boundary error types for the Plugin Loader and Dispatcher.

use monitor_core::PluginId;
use thiserror::Error;

/// Raised by [`crate::dispatcher::Dispatcher`] while bringing a script to
/// `Ready`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("plugin {0} is already loaded")]
    AlreadyLoaded(PluginId),

    #[error("plugin {0} is not loaded")]
    NotLoaded(PluginId),

    #[error("script error loading {plugin}: {source}")]
    Script {
        plugin: PluginId,
        #[source]
        source: monitor_script::ScriptError,
    },

    #[error("on_load of {0} returned a falsy value")]
    OnLoadRejected(PluginId),

    #[error("on_load of {plugin} raised: {message}")]
    OnLoadFailed { plugin: PluginId, message: String },
}

pub type LoadResult<T> = Result<T, LoadError>;
