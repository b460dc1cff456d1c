//! forcesync binds Salesforce records to the REST API.
//!
//! Records keep track of which fields changed since their last save, so
//! updates only send what's different. Collections run SOQL queries and follow
//! the server's continuation urls until every page is in. Everything that
//! talks to Salesforce takes an explicit `Connection`.

extern crate config;
extern crate fern;
extern crate jedi;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate log_panics;
#[macro_use]
extern crate quick_error;
extern crate regex;
extern crate reqwest;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[cfg(test)]
#[macro_use]
extern crate serde_json;
extern crate time;
extern crate url;

#[macro_use]
pub mod error;
#[macro_use]
mod util;
pub mod api;
pub mod oauth2;
pub mod connection;
pub mod dirty;
pub mod models;

use ::jedi::Value;

use crate::error::FResult;

pub use crate::api::{HttpRequest, HttpResponse, HttpTransport, Method, SyncAction, Transport};
pub use crate::connection::Connection;
pub use crate::dirty::{DirtyFields, ID_FIELD};
pub use crate::error::FError;
pub use crate::models::collection::{Collection, FetchOptions};
pub use crate::models::record::{spawn_save, Record, SetOptions};
pub use crate::oauth2::OAuth2;
pub use crate::util::event::{Emitter, EventEmitter};

/// Init config and logging. `config_str` is a JSON object; if it has a
/// `config_file` key, that file is loaded first, then everything else in the
/// object is merged over it.
pub fn init(config_str: &str) -> FResult<()> {
    let mut runtime_config: Value = match jedi::parse(config_str) {
        Ok(x) => x,
        Err(e) => {
            println!("forcesync: problem parsing runtime config: {}", e);
            jedi::obj()
        }
    };
    let config_location: Option<String> = jedi::get_opt(&["config_file"], &runtime_config);
    if config_location.is_some() {
        config::load_config(config_location)?;
    }
    jedi::remove(&["config_file"], &mut runtime_config)?;
    if let Value::Object(_) = runtime_config {
        config::merge(&runtime_config)?;
    }
    util::logger::setup_logger()?;
    log_panics::init();
    info!("forcesync::init() -- ready");
    Ok(())
}
