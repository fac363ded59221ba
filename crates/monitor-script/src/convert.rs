//! Conversions between `mlua::Value` and the host-neutral
//! [`monitor_core::Value`].
//!
//! The host's request/reply handlers never touch `mlua` types directly —
//! they work entirely in terms of [`monitor_core::Value`], so the
//! conversions funnel through this one module.

use mlua::{Lua, Value as LuaValue, Variadic};
use monitor_core::Value;
use std::collections::BTreeMap;

/// Converts a yielded Lua value into the host-neutral form.
///
/// Tables are ambiguous in isolation (a byte array and a small record are
/// both Lua tables); this resolves the ambiguity structurally: a table
/// whose keys are exactly `1..=n` becomes [`Value::List`], anything with
/// string keys becomes [`Value::Record`]. Handlers that expect a byte array
/// use [`Value::list_as_bytes`] on the result.
pub fn lua_to_value(value: &LuaValue) -> Value {
    match value {
        LuaValue::Nil => Value::Nil,
        LuaValue::Boolean(b) => Value::Bool(*b),
        LuaValue::Integer(i) => Value::Number(*i as f64),
        LuaValue::Number(n) => Value::Number(*n),
        LuaValue::String(s) => {
            let bytes: Vec<u8> = s.as_bytes().to_vec();
            match String::from_utf8(bytes) {
                Ok(s) => Value::Str(s),
                Err(e) => Value::Bytes(e.into_bytes()),
            }
        }
        LuaValue::Table(t) => {
            let len = t.raw_len() as usize;
            if len > 0 {
                let mut items = Vec::with_capacity(len);
                let mut is_pure_array = true;
                for i in 1..=(len as i64) {
                    match t.raw_get::<LuaValue>(i) {
                        Ok(v) => items.push(lua_to_value(&v)),
                        Err(_) => {
                            is_pure_array = false;
                            break;
                        }
                    }
                }
                if is_pure_array {
                    return Value::List(items);
                }
            }

            let mut record = BTreeMap::new();
            for pair in t.clone().pairs::<LuaValue, LuaValue>() {
                let (k, v) = match pair {
                    Ok(kv) => kv,
                    Err(_) => continue,
                };
                if let LuaValue::String(key) = k {
                    if let Ok(key) = key.to_str() {
                        record.insert(key.to_string(), lua_to_value(&v));
                    }
                }
            }
            Value::Record(record)
        }
        _ => Value::Nil,
    }
}

/// Converts a host-neutral value into an `mlua::Value` for resuming a
/// coroutine with a reply.
pub fn value_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Nil => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Number(n) => LuaValue::Number(*n),
        Value::Str(s) => LuaValue::String(lua.create_string(s)?),
        Value::Bytes(bytes) => {
            let table = lua.create_table()?;
            for (i, b) in bytes.iter().enumerate() {
                table.raw_set(i + 1, *b as i64)?;
            }
            LuaValue::Table(table)
        }
        Value::List(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, value_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        Value::Record(map) => {
            let table = lua.create_table()?;
            for (k, v) in map {
                table.raw_set(k.as_str(), value_to_lua(lua, v)?)?;
            }
            LuaValue::Table(table)
        }
    })
}

/// Converts an argument list into an `mlua` multi-value for resuming a
/// coroutine, with the reply status string always first.
pub fn reply_to_lua_args(
    lua: &Lua,
    status: &str,
    results: &[Value],
) -> mlua::Result<Variadic<LuaValue>> {
    let mut out = Variadic::new();
    out.push(LuaValue::String(lua.create_string(status)?));
    for r in results {
        out.push(value_to_lua(lua, r)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_byte_array_table() {
        let lua = Lua::new();
        let original = Value::Bytes(vec![1, 2, 255]);
        let lua_val = value_to_lua(&lua, &original).unwrap();
        let back = lua_to_value(&lua_val);
        assert_eq!(back.list_as_bytes(), Some(vec![1, 2, 255]));
    }

    #[test]
    fn record_round_trip_preserves_keys() {
        let lua = Lua::new();
        let mut map = BTreeMap::new();
        map.insert("timeout_ms".to_string(), Value::Number(200.0));
        let original = Value::Record(map);
        let lua_val = value_to_lua(&lua, &original).unwrap();
        let back = lua_to_value(&lua_val);
        match back {
            Value::Record(m) => assert_eq!(m.get("timeout_ms"), Some(&Value::Number(200.0))),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn string_values_stay_strings() {
        let lua = Lua::new();
        let lua_val = value_to_lua(&lua, &Value::Str("AT\r".into())).unwrap();
        assert_eq!(lua_to_value(&lua_val), Value::Str("AT\r".into()));
    }
}
