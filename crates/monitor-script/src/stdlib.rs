//! Installs the `scope` and `shell` host API stubs into a freshly
//! created [`mlua::Lua`] instance, via `package.preload` the same way any
//! other Lua module would be made `require`-able.
//!
//! The stub bodies themselves are plain Lua (embedded at compile time) — see
//! `src/lua/scope.lua` and `src/lua/shell.lua`. No Rust closures are
//! involved here: every impure stub performs its own `coroutine.yield`,
//! which only works from genuine Lua code running on the coroutine being
//! resumed, not from an `mlua::Function::Rust` callback.

use crate::error::ScriptResult;
use mlua::Lua;

const SCOPE_SRC: &str = include_str!("lua/scope.lua");
const SHELL_SRC: &str = include_str!("lua/shell.lua");

pub fn install(lua: &Lua) -> ScriptResult<()> {
    let package: mlua::Table = lua.globals().get("package")?;
    let preload: mlua::Table = package.get("preload")?;

    let scope_loader = lua.load(SCOPE_SRC).set_name("scope.lua").into_function()?;
    preload.set("scope", scope_loader)?;

    let shell_loader = lua.load(SHELL_SRC).set_name("shell.lua").into_function()?;
    preload.set("shell", shell_loader)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_module_is_requirable() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let ok: bool = lua
            .load("local scope = require('scope'); return type(scope.fmt.to_str) == 'function'")
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn shell_module_is_requirable() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let ok: bool = lua
            .load("local Shell = require('shell'); return type(Shell.new) == 'function'")
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn fmt_to_str_and_to_bytes_are_pure_round_trips() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let result: bool = lua
            .load(
                r#"
                local scope = require('scope')
                local bytes = scope.fmt.to_bytes("hi")
                local s = scope.fmt.to_str(bytes)
                return s == "hi" and bytes[1] == 104 and bytes[2] == 105
                "#,
            )
            .eval()
            .unwrap();
        assert!(result);
    }

    #[test]
    fn fmt_to_str_handles_nil() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let s: String = lua
            .load("return require('scope').fmt.to_str(nil)")
            .eval()
            .unwrap();
        assert_eq!(s, "nil");
    }

    #[test]
    fn sys_parse_args_applies_defaults_and_coercion() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let (a, b): (f64, bool) = lua
            .load(
                r#"
                local scope = require('scope')
                return scope.sys.parse_args({
                    { arg = "42", ty = "number" },
                    { arg = nil, ty = "boolean", default = true },
                })
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(a, 42.0);
        assert!(b);
    }

    #[test]
    fn sys_parse_args_raises_ordinal_message_on_missing_required_arg() {
        let lua = Lua::new();
        install(&lua).unwrap();
        let err = lua
            .load("return require('scope').sys.parse_args({ { arg = nil } })")
            .eval::<mlua::Value>()
            .unwrap_err();
        assert!(err.to_string().contains("1st argument must not be empty"));
    }
}
