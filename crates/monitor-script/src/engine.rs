//! The Script Engine: loading a script file and evaluating its
//! module return value into a plugin table.
//!
//! Each plugin gets its own `mlua::Lua` instance — a fresh evaluation
//! environment — rather than sharing one VM with isolated
//! globals, since `mlua` doesn't offer per-script global isolation within a
//! single `Lua`. This also gives plugin unload a trivial implementation:
//! dropping `LoadedScript` tears down its interpreter and everything it
//! allocated.

use crate::error::{ScriptError, ScriptResult};
use crate::stdlib;
use mlua::{Lua, Table, Value as LuaValue};
use monitor_core::{PluginEntryKind, classify_entry_name};
use std::path::{Path, PathBuf};

/// A script that has been read, evaluated, and whose module table has been
/// extracted, but whose `on_load` (if any) has not yet run.
pub struct LoadedScript {
    pub lua: Lua,
    pub table: Table,
    pub path: PathBuf,
}

impl LoadedScript {
    /// Enumerates the table's string-keyed function entries and classifies
    /// each one. Non-function entries (plain data the script
    /// exports) are ignored.
    pub fn entries(&self) -> ScriptResult<Vec<(String, PluginEntryKind)>> {
        let mut out = Vec::new();
        for pair in self.table.clone().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let name = match key {
                LuaValue::String(s) => {
                    let bytes = s.as_bytes().to_vec();
                    match String::from_utf8(bytes) {
                        Ok(name) => name,
                        Err(_) => continue,
                    }
                }
                _ => continue,
            };
            if !matches!(value, LuaValue::Function(_)) {
                continue;
            }
            out.push((name.clone(), classify_entry_name(&name)));
        }
        Ok(out)
    }

    pub fn function(&self, name: &str) -> ScriptResult<Option<mlua::Function>> {
        match self.table.get::<LuaValue>(name)? {
            LuaValue::Function(f) => Ok(Some(f)),
            _ => Ok(None),
        }
    }
}

/// Stateless factory that loads plugin scripts. Kept as a unit struct (no
/// fields) so call sites read `ScriptEngine::load(path)`, matching the
/// other Rust-native loaders in this workspace's style.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptEngine;

impl ScriptEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reads `path`, evaluates it under a fresh Lua VM with the `scope`/
    /// `shell` stubs preloaded, and extracts its returned plugin table.
    pub fn load(&self, path: &Path) -> ScriptResult<LoadedScript> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let lua = Lua::new();
        stdlib::install(&lua)?;

        let chunk_name = path.display().to_string();
        let value: LuaValue = lua.load(&source).set_name(chunk_name).eval()?;

        let table = match value {
            LuaValue::Table(t) => t,
            _ => return Err(ScriptError::NotATable(path.to_path_buf())),
        };

        Ok(LoadedScript {
            lua,
            table,
            path: path.to_path_buf(),
        })
    }
}
