//! JSON (and a bit of YAML) plumbing shared by the forcesync crates.
//!
//! Mostly thin wrappers around serde_json plus key-path helpers, so config
//! lookups and sObject attribute bags can be poked at without a pile of
//! `match` blocks everywhere.

#[macro_use]
extern crate quick_error;
extern crate serde;
#[cfg_attr(test, macro_use)]
extern crate serde_json;
extern crate serde_yaml;

use ::std::error::Error;
use ::std::convert::From;

pub use ::serde_json::Value;
pub use ::serde_json::Map;
pub use ::serde::de::{Deserialize, DeserializeOwned};
pub use ::serde::ser::Serialize;

quick_error! {
    #[derive(Debug)]
    pub enum JSONError {
        Boxed(err: Box<dyn Error + Send + Sync>) {
            description("boxed error")
            display("json: error: {}", err)
        }
        Parse(err: serde_json::Error) {
            cause(err)
            description("parse error")
            display("json: parse error: {}", err)
        }
        Stringify(err: serde_json::Error) {
            cause(err)
            description("stringify error")
            display("json: stringify error: {}", err)
        }
        Yaml(err: serde_yaml::Error) {
            cause(err)
            description("yaml error")
            display("json: yaml error: {}", err)
        }
        DeadEnd {
            description("dead end")
            display("json: lookup dead end")
        }
        NotFound(key: String) {
            description("key not found")
            display("json: key not found: {}", key)
        }
        InvalidKey(key: String) {
            description("invalid key")
            display("json: invalid key for object: {}", key)
        }
    }
}

pub type JResult<T> = Result<T, JSONError>;

impl From<::std::io::Error> for JSONError {
    fn from(err: ::std::io::Error) -> JSONError {
        JSONError::Boxed(Box::new(err))
    }
}

impl From<serde_yaml::Error> for JSONError {
    fn from(err: serde_yaml::Error) -> JSONError {
        JSONError::Yaml(err)
    }
}

/// Make an empty JSON object
pub fn obj() -> Value {
    Value::Object(Map::new())
}

/// Parse a JSON string into anything deserializable
pub fn parse<T: DeserializeOwned>(string: &str) -> JResult<T> {
    serde_json::from_str(string).map_err(JSONError::Parse)
}

/// Parse a YAML string into a JSON Value
pub fn parse_yaml(string: &str) -> JResult<Value> {
    Ok(serde_yaml::from_str(string)?)
}

/// Turn a serializable object into a JSON string
pub fn stringify<T: Serialize>(obj: &T) -> JResult<String> {
    serde_json::to_string(obj).map_err(JSONError::Stringify)
}

/// Turn a serializable object into a Value
pub fn to_val<T: Serialize>(obj: &T) -> JResult<Value> {
    serde_json::to_value(obj).map_err(JSONError::Stringify)
}

/// Turn a Value into anything deserializable
pub fn from_val<T: DeserializeOwned>(val: Value) -> JResult<T> {
    serde_json::from_value(val).map_err(JSONError::Parse)
}

/// Walk a JSON structure along a key path, returning a reference to whatever
/// lives at the end. Array elements are addressed by their stringified index.
pub fn walk<'a>(keys: &[&str], data: &'a Value) -> JResult<&'a Value> {
    let (key, rest) = match keys.split_first() {
        Some(x) => x,
        None => return Ok(data),
    };
    let next = match *data {
        Value::Object(ref obj) => obj.get(*key),
        Value::Array(ref arr) => {
            let idx = key.parse::<usize>()
                .map_err(|_| JSONError::InvalidKey(String::from(*key)))?;
            arr.get(idx)
        }
        _ => return Err(JSONError::DeadEnd),
    };
    match next {
        Some(val) => walk(rest, val),
        None => Err(JSONError::NotFound(String::from(*key))),
    }
}

/// Same as `walk()` but hands back a mutable reference.
pub fn walk_mut<'a>(keys: &[&str], data: &'a mut Value) -> JResult<&'a mut Value> {
    let (key, rest) = match keys.split_first() {
        Some(x) => x,
        None => return Ok(data),
    };
    let next = match *data {
        Value::Object(ref mut obj) => obj.get_mut(*key),
        Value::Array(ref mut arr) => {
            let idx = key.parse::<usize>()
                .map_err(|_| JSONError::InvalidKey(String::from(*key)))?;
            arr.get_mut(idx)
        }
        _ => return Err(JSONError::DeadEnd),
    };
    match next {
        Some(val) => walk_mut(rest, val),
        None => Err(JSONError::NotFound(String::from(*key))),
    }
}

/// Like `walk()`, but deserializes the found value into T.
pub fn get<T: DeserializeOwned>(keys: &[&str], value: &Value) -> JResult<T> {
    let found = walk(keys, value)?;
    serde_json::from_value(found.clone())
        .map_err(|e| JSONError::NotFound(format!("get: {:?}: {}", keys, e)))
}

/// `get()` with every error flattened into None. Good for "is this key path
/// here?" one-offs.
pub fn get_opt<T: DeserializeOwned>(keys: &[&str], value: &Value) -> Option<T> {
    get(keys, value).ok()
}

/// Set a value at the end of a key path. Every container along the path must
/// already exist.
pub fn set<T: Serialize>(keys: &[&str], container: &mut Value, to: &T) -> JResult<()> {
    let (last, butlast) = match keys.split_last() {
        Some(x) => x,
        None => return Err(JSONError::InvalidKey(String::from("set: no keys given"))),
    };
    let val = to_val(to)?;
    match *walk_mut(butlast, container)? {
        Value::Object(ref mut obj) => {
            obj.insert(String::from(*last), val);
            Ok(())
        }
        Value::Array(ref mut arr) => {
            let idx = last.parse::<usize>()
                .map_err(|_| JSONError::InvalidKey(String::from(*last)))?;
            match arr.get_mut(idx) {
                Some(slot) => {
                    *slot = val;
                    Ok(())
                }
                None => Err(JSONError::NotFound(String::from(*last))),
            }
        }
        _ => Err(JSONError::DeadEnd),
    }
}

/// Remove whatever lives at the end of a key path. Missing paths are not an
/// error.
pub fn remove(keys: &[&str], container: &mut Value) -> JResult<()> {
    let (last, butlast) = match keys.split_last() {
        Some(x) => x,
        None => return Ok(()),
    };
    match walk_mut(butlast, container) {
        Ok(&mut Value::Object(ref mut obj)) => {
            obj.remove(*last);
        }
        Ok(&mut Value::Array(ref mut arr)) => {
            let idx = last.parse::<usize>()
                .map_err(|_| JSONError::InvalidKey(String::from(*last)))?;
            if idx < arr.len() {
                arr.remove(idx);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Copy the listed keys out of an object. Keys the object doesn't have are
/// skipped rather than nulled.
pub fn pick<'a, I>(obj: &Map<String, Value>, keys: I) -> Map<String, Value>
    where I: IntoIterator<Item = &'a String>
{
    let mut out = Map::new();
    for key in keys {
        if let Some(val) = obj.get(key) {
            out.insert(key.clone(), val.clone());
        }
    }
    out
}

/// Deep-merge `from` into `into`. Objects merge key by key, everything else
/// (arrays included) is replaced wholesale.
pub fn merge(into: &mut Value, from: &Value) {
    match (into, from) {
        (&mut Value::Object(ref mut dest), &Value::Object(ref src)) => {
            for (key, val) in src {
                match dest.get_mut(key) {
                    Some(existing) => merge(existing, val),
                    None => {
                        dest.insert(key.clone(), val.clone());
                    }
                }
            }
        }
        (dest, src) => {
            *dest = src.clone();
        }
    }
}
