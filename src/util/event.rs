//! A small named-binding event emitter. Records fire `set:<field>`, `sync`,
//! `error` and `destroy`; collections fire `reset`, `add` and `error`. The
//! payload is always a JSON `Value`.
//!
//! Bindings live behind an RwLock so an evented object can be bound/triggered
//! from any thread. Callbacks run *after* the lock is released, so a callback
//! is free to bind, unbind or trigger on the same emitter.

use ::std::sync::{Arc, RwLock};
use ::std::collections::HashMap;

use ::jedi::Value;

/// Defines what type of binding we have
#[derive(Clone, Copy, PartialEq)]
enum BindType {
    Every,
    Once,
}

/// Holds information about a callback.
pub struct Callback {
    cb: Arc<dyn Fn(&Value) + Send + Sync + 'static>,
    binding: BindType,
    name: String,
}

/// An alias to make returning the bindings object easier
pub type Bindings = RwLock<HashMap<String, Vec<Callback>>>;

/// A standalone set of event bindings. Embed one in anything that wants to
/// implement `Emitter`.
pub struct EventEmitter {
    bindings: Bindings,
}

impl EventEmitter {
    pub fn new() -> EventEmitter {
        EventEmitter { bindings: RwLock::new(HashMap::new()) }
    }
}

impl Default for EventEmitter {
    fn default() -> EventEmitter {
        EventEmitter::new()
    }
}

/// Bind/unbind/trigger. The only thing an implementor provides is access to
/// its bindings.
pub trait Emitter {
    fn bindings(&self) -> &Bindings;

    /// Binds a callback to an event name. The same event/bind name pair
    /// *replaces* an existing binding.
    fn do_bind(&self, event_name: &str, cb: Callback) {
        self.unbind(event_name, cb.name.as_str());
        let mut guard = lockw!(self.bindings());
        guard.entry(String::from(event_name))
            .or_insert_with(|| Vec::with_capacity(3))
            .push(cb);
    }

    /// Bind a callback to an event name. The binding takes a name, which makes
    /// it easy to unbind later (by name).
    fn bind<F>(&self, event_name: &str, cb: F, bind_name: &str)
        where F: Fn(&Value) + Send + Sync + 'static
    {
        self.do_bind(event_name, Callback {
            cb: Arc::new(cb),
            binding: BindType::Every,
            name: String::from(bind_name),
        });
    }

    /// Bind a one-time callback to an event name.
    fn bind_once<F>(&self, event_name: &str, cb: F, bind_name: &str)
        where F: Fn(&Value) + Send + Sync + 'static
    {
        self.do_bind(event_name, Callback {
            cb: Arc::new(cb),
            binding: BindType::Once,
            name: String::from(bind_name),
        });
    }

    /// Unbind a named listener. Returns whether anything was removed.
    fn unbind(&self, event_name: &str, bind_name: &str) -> bool {
        let mut guard = lockw!(self.bindings());
        match guard.get_mut(event_name) {
            Some(callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|x| x.name != bind_name);
                before != callbacks.len()
            }
            None => false,
        }
    }

    /// Trigger an event. Any function bound to the event name gets fired, with
    /// `data` passed as the only argument.
    fn trigger(&self, event_name: &str, data: &Value) {
        let fire = {
            let mut guard = lockw!(self.bindings());
            match guard.get_mut(event_name) {
                Some(callbacks) => {
                    let fire = callbacks.iter()
                        .map(|x| x.cb.clone())
                        .collect::<Vec<_>>();
                    callbacks.retain(|x| x.binding != BindType::Once);
                    fire
                }
                None => return,
            }
        };
        for cb in fire {
            (*cb)(data);
        }
    }
}

impl Emitter for EventEmitter {
    fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}
