//! Errors surfaced while loading or driving a script.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("plugin script at {0} did not return a table")]
    NotATable(PathBuf),

    #[error("coroutine yielded a non-string request tag")]
    MalformedYield,
}

pub type ScriptResult<T> = Result<T, ScriptError>;
