//! App-wide configuration. Loaded from a YAML file on first touch, and can be
//! layered over at runtime with `merge()`.

extern crate jedi;
#[macro_use]
extern crate lazy_static;
#[cfg(test)]
extern crate serde_json;

use ::std::env;
use ::std::fs;
use ::std::sync::RwLock;

use ::jedi::{JSONError, Value, Serialize, DeserializeOwned};

pub type CResult<T> = Result<T, JSONError>;

lazy_static! {
    /// holds our parsed config. a missing config file just means an empty
    /// config; callers that need a key will find out soon enough.
    static ref CONFIG: RwLock<Value> = {
        let data = match read_config(&default_location()) {
            Ok(x) => x,
            Err(_) => jedi::obj(),
        };
        RwLock::new(data)
    };
}

/// Where we look for config when nobody tells us otherwise
fn default_location() -> String {
    match env::var("FORCESYNC_CONFIG_FILE") {
        Ok(x) => x,
        Err(_) => String::from("config.yaml"),
    }
}

/// Read and parse a YAML config file
fn read_config(location: &str) -> CResult<Value> {
    let contents = fs::read_to_string(location)?;
    let data = jedi::parse_yaml(&contents)?;
    match data {
        Value::Null => Ok(jedi::obj()),
        x => Ok(x),
    }
}

fn poisoned() -> JSONError {
    JSONError::NotFound(String::from("config: lock poisoned"))
}

/// Replace the loaded config with the contents of the given file (or the
/// default location if None).
pub fn load_config(location: Option<String>) -> CResult<()> {
    let location = location.unwrap_or_else(default_location);
    let data = read_config(&location)?;
    let mut guard = (*CONFIG).write().map_err(|_| poisoned())?;
    *guard = data;
    Ok(())
}

/// Grab a value out of our config
pub fn get<T: DeserializeOwned>(keys: &[&str]) -> CResult<T> {
    let guard = (*CONFIG).read().map_err(|_| poisoned())?;
    jedi::get(keys, &guard)
}

/// Grab a value out of our config, or None if it's not there (or is the wrong
/// type)
pub fn get_opt<T: DeserializeOwned>(keys: &[&str]) -> Option<T> {
    get(keys).ok()
}

/// Set a value into the config. Parent objects must exist.
pub fn set<T: Serialize>(keys: &[&str], val: &T) -> CResult<()> {
    let mut guard = (*CONFIG).write().map_err(|_| poisoned())?;
    jedi::set(keys, &mut guard, val)
}

/// Deep-merge a runtime config object over whatever we loaded from disk.
pub fn merge(data: &Value) -> CResult<()> {
    let mut guard = (*CONFIG).write().map_err(|_| poisoned())?;
    jedi::merge(&mut guard, data);
    Ok(())
}
