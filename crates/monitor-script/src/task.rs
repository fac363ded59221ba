//! Driving a single plugin coroutine through the yield/resume protocol.
//!
//! A [`TaskCoroutine`] wraps one `mlua::Thread` bound to one entry function
//! (a lifecycle hook, event callback, or user command). The Dispatcher owns
//! these; it calls [`TaskCoroutine::start`] once and then
//! [`TaskCoroutine::resume_with_reply`] each time the Resource Broker or
//! host-call handler produces a [`HostReply`] for the request the coroutine
//! is blocked on.

use crate::convert::{lua_to_value, reply_to_lua_args};
use crate::error::{ScriptError, ScriptResult};
use mlua::{Thread, ThreadStatus, Value as LuaValue, Variadic};
use monitor_core::{HostReply, HostRequest, Value};

/// What happened after resuming a coroutine one step.
#[derive(Debug)]
pub enum Resumption {
    /// The coroutine called `coroutine.yield(tag, ...)` and is now
    /// suspended waiting for a reply.
    Yielded(HostRequest),
    /// The coroutine ran to completion (or was never resumable, e.g. a
    /// pure function with no yields) and returned these values.
    Finished(Vec<Value>),
}

pub struct TaskCoroutine {
    lua: mlua::Lua,
    thread: Thread,
}

impl TaskCoroutine {
    /// Wraps `func` as a fresh coroutine, not yet started. `lua` must be the
    /// same instance `func` was loaded under.
    pub fn new(lua: &mlua::Lua, func: mlua::Function) -> ScriptResult<Self> {
        let thread = lua.create_thread(func)?;
        Ok(Self {
            lua: lua.clone(),
            thread,
        })
    }

    /// Starts the coroutine with the given initial arguments (the event
    /// payload, or the user command's positional args).
    pub fn start(&self, args: Vec<Value>) -> ScriptResult<Resumption> {
        let lua_args = args
            .iter()
            .map(|v| crate::convert::value_to_lua(&self.lua, v))
            .collect::<mlua::Result<Variadic<LuaValue>>>()?;
        self.drive(self.thread.resume::<Variadic<LuaValue>>(lua_args)?)
    }

    /// Resumes a coroutine that is blocked on a host request, handing back
    /// the reply's wire shape: status string first, then results.
    pub fn resume_with_reply(&self, reply: &HostReply) -> ScriptResult<Resumption> {
        let args = reply_to_lua_args(&self.lua, reply.status.as_wire_str(), &reply.results)?;
        self.drive(self.thread.resume::<Variadic<LuaValue>>(args)?)
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.thread.status(), ThreadStatus::Resumable)
    }

    fn drive(&self, values: Variadic<LuaValue>) -> ScriptResult<Resumption> {
        if matches!(self.thread.status(), ThreadStatus::Resumable) {
            let tag = match values.first() {
                Some(LuaValue::String(s)) => {
                    let bytes = s.as_bytes().to_vec();
                    String::from_utf8(bytes).map_err(|_| ScriptError::MalformedYield)?
                }
                _ => return Err(ScriptError::MalformedYield),
            };
            let args = values.iter().skip(1).map(lua_to_value).collect();
            Ok(Resumption::Yielded(HostRequest::new(tag, args)))
        } else {
            let results = values.iter().map(lua_to_value).collect();
            Ok(Resumption::Finished(results))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib;
    use mlua::Lua;

    fn thread_for(lua: &Lua, src: &str) -> TaskCoroutine {
        let func: mlua::Function = lua.load(src).eval().unwrap();
        TaskCoroutine::new(lua, func).unwrap()
    }

    #[test]
    fn a_pure_function_finishes_without_yielding() {
        let lua = Lua::new();
        stdlib::install(&lua).unwrap();
        let task = thread_for(&lua, "return function(x) return x + 1 end");
        match task.start(vec![Value::Number(41.0)]).unwrap() {
            Resumption::Finished(results) => assert_eq!(results, vec![Value::Number(42.0)]),
            other => panic!("expected Finished, got {other:?}"),
        }
        assert!(task.is_finished());
    }

    #[test]
    fn a_yielding_function_suspends_with_the_request_and_resumes_on_reply() {
        let lua = Lua::new();
        stdlib::install(&lua).unwrap();
        let task = thread_for(
            &lua,
            r#"
            return function(msg)
                local status, echoed = coroutine.yield("serial.send", msg)
                return status, echoed
            end
            "#,
        );

        let request = match task.start(vec![Value::Str("AT\r".into())]).unwrap() {
            Resumption::Yielded(req) => req,
            other => panic!("expected Yielded, got {other:?}"),
        };
        assert_eq!(request.tag, "serial.send");
        assert_eq!(request.arg(0), Some(&Value::Str("AT\r".into())));
        assert!(!task.is_finished());

        let reply = HostReply::ok(vec![Value::Str("AT\r".into())]);
        match task.resume_with_reply(&reply).unwrap() {
            Resumption::Finished(results) => {
                assert_eq!(
                    results,
                    vec![Value::Str("ok".into()), Value::Str("AT\r".into())]
                );
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert!(task.is_finished());
    }
}
