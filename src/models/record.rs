//! A Record is one sObject: a bag of field values keyed by API name, with `Id`
//! as the identity field.
//!
//! All mutation goes through `set()`/`set_multi()` (or their `_with`
//! variants). That's how the record knows which fields are dirty, so don't go
//! around it. Once a record has an `Id`, every tracked set marks the field
//! dirty and the next `save()` sends just those fields as a PATCH.
//!
//! Record state sits behind a lock, so a record can be shared between threads
//! and mutated while a save is in flight. The lock is never held across a
//! network call.

use ::std::sync::{Arc, RwLock};
use ::std::thread;

use ::jedi::{self, DeserializeOwned, Map, Value};

use crate::api::SyncAction;
use crate::connection::Connection;
use crate::dirty::{self, DirtyFields, ID_FIELD};
use crate::error::{FError, FResult};
use crate::util::event::{Bindings, Emitter, EventEmitter};

/// Options for setting data into a record
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Whether the set counts as a change for the next partial update
    pub track: bool,
}

impl SetOptions {
    /// Set without marking anything dirty (used when applying server data)
    pub fn untracked() -> Self {
        SetOptions { track: false }
    }
}

impl Default for SetOptions {
    fn default() -> Self {
        SetOptions { track: true }
    }
}

/// Clean up a server response so it can be merged into a record: `id` becomes
/// `Id`, and the envelope fields (`attributes`, `success`, `errors`) go away.
/// Returns the cleaned object and the sObject type from `attributes`, if any.
pub fn parse(resp: Value) -> FResult<(Map<String, Value>, Option<String>)> {
    let mut obj = match resp {
        Value::Object(x) => x,
        Value::Null => return Ok((Map::new(), None)),
        _ => return Err(FError::BadValue(String::from("record::parse() -- response was not an object"))),
    };
    if let Some(id) = obj.remove("id") {
        obj.insert(String::from(ID_FIELD), id);
    }
    let sobject = obj.remove("attributes")
        .and_then(|attr| jedi::get_opt::<String>(&["type"], &attr));
    obj.remove("success");
    if let Some(errors) = obj.remove("errors") {
        match errors {
            Value::Array(ref x) if !x.is_empty() => {
                warn!("record::parse() -- server reported errors: {}", errors);
            }
            _ => {}
        }
    }
    Ok((obj, sobject))
}

/// The lockable guts of a record
struct RecordState {
    sobject: Option<String>,
    data: Map<String, Value>,
    dirty: DirtyFields,
}

impl RecordState {
    fn id(&self) -> Option<String> {
        match self.data.get(ID_FIELD) {
            Some(Value::String(x)) if !x.is_empty() => Some(x.clone()),
            Some(Value::Null) | None => None,
            Some(Value::String(_)) => None,
            Some(x) => Some(x.to_string()),
        }
    }

    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

/// One Salesforce record
pub struct Record {
    /// If set, the fields to ask for on fetch (and to SELECT in collection
    /// WHERE queries)
    fields: Option<Vec<String>>,
    state: RwLock<RecordState>,
    emitter: EventEmitter,
}

impl Record {
    /// Create a blank (new) record of the given sObject type
    pub fn new(sobject: &str) -> Record {
        Record::build(Some(String::from(sobject)))
    }

    /// Create a blank record that will learn its type from the server
    pub fn untyped() -> Record {
        Record::build(None)
    }

    fn build(sobject: Option<String>) -> Record {
        Record {
            fields: None,
            state: RwLock::new(RecordState {
                sobject: sobject,
                data: Map::new(),
                dirty: DirtyFields::new(),
            }),
            emitter: EventEmitter::new(),
        }
    }

    /// Restrict fetches to the given fields
    pub fn with_fields(mut self, fields: &[&str]) -> Record {
        self.fields = Some(fields.iter().map(|x| String::from(*x)).collect());
        self
    }

    /// Load initial data (untracked). Passing an `Id` here gives you an
    /// existing record.
    pub fn with_data(self, data: Value) -> FResult<Record> {
        self.set_multi_with(data, SetOptions::untracked())?;
        Ok(self)
    }

    /// Shorthand for `Record::new(sobject).with_data(data)`
    pub fn from_data(sobject: &str, data: Value) -> FResult<Record> {
        Record::new(sobject).with_data(data)
    }

    /// Build a record out of a raw server response (query results, mostly)
    pub fn from_response(resp: Value, sobject: Option<&str>, fields: Option<&Vec<String>>) -> FResult<Record> {
        let (data, found_type) = parse(resp)?;
        let mut record = Record::build(found_type.or_else(|| sobject.map(String::from)));
        record.fields = fields.cloned();
        record.apply(data, SetOptions::untracked());
        Ok(record)
    }

    /// Get this record's Id, if it has one
    pub fn id(&self) -> Option<String> {
        lockr!(self.state).id()
    }

    /// Whether the server has assigned this record an Id yet
    pub fn is_new(&self) -> bool {
        lockr!(self.state).is_new()
    }

    /// Get this record's sObject type (Account, Opportunity, etc)
    pub fn sobject(&self) -> Option<String> {
        lockr!(self.state).sobject.clone()
    }

    pub fn fields(&self) -> Option<&Vec<String>> {
        self.fields.as_ref()
    }

    /// Grab a copy of all our data
    pub fn data(&self) -> Value {
        Value::Object(lockr!(self.state).data.clone())
    }

    /// Get a value from this record's data
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        let guard = lockr!(self.state);
        guard.data.get(field)
            .and_then(|x| jedi::from_val(x.clone()).ok())
    }

    /// The fields that will go out in the next partial update
    pub fn pending_changes(&self) -> Vec<String> {
        lockr!(self.state).dirty.fields()
    }

    /// Set a single field (tracked)
    pub fn set(&self, field: &str, value: Value) {
        self.set_with(field, value, SetOptions::default());
    }

    /// Set a single field
    pub fn set_with(&self, field: &str, value: Value, options: SetOptions) {
        let mut data = Map::new();
        data.insert(String::from(field), value);
        self.apply(data, options);
    }

    /// Set every key in a JSON object into this record (tracked)
    pub fn set_multi(&self, data: Value) -> FResult<()> {
        self.set_multi_with(data, SetOptions::default())
    }

    /// Set every key in a JSON object into this record
    pub fn set_multi_with(&self, data: Value, options: SetOptions) -> FResult<()> {
        match data {
            Value::Object(x) => {
                self.apply(x, options);
                Ok(())
            }
            _ => Err(FError::BadValue(String::from("Record.set_multi() -- `data` value given was not an object type"))),
        }
    }

    /// The one place record data actually changes. Dirty marking happens under
    /// the same lock as the write; events fire after it's released.
    fn apply(&self, data: Map<String, Value>, options: SetOptions) {
        let mut events: Vec<(String, Value)> = Vec::with_capacity(data.len());
        {
            let mut guard = lockw!(self.state);
            if options.track && !guard.is_new() {
                guard.dirty.mark(data.keys().map(|x| x.as_str()));
            }
            for (key, val) in data {
                events.push((key.clone(), val.clone()));
                guard.data.insert(key, val);
            }
        }
        for (key, val) in events {
            self.trigger(&format!("set:{}", key), &val);
        }
    }

    /// Merge a server response into this record without marking anything
    /// dirty. Also picks up our sObject type if we didn't know it.
    fn apply_response(&self, resp: Value) -> FResult<()> {
        let (data, found_type) = parse(resp)?;
        if let Some(ty) = found_type {
            let mut guard = lockw!(self.state);
            if guard.sobject.is_none() {
                guard.sobject = Some(ty);
            }
        }
        self.apply(data, SetOptions::untracked());
        Ok(())
    }

    fn sobject_or_else(&self) -> FResult<String> {
        match self.sobject() {
            Some(x) => Ok(x),
            None => Err(FError::Config(String::from("Record -- sObject type is not set"))),
        }
    }

    fn id_or_else(&self) -> FResult<String> {
        match self.id() {
            Some(x) => Ok(x),
            None => Err(FError::Config(String::from("Record -- record has no Id"))),
        }
    }

    /// Let anyone listening know a sync failed
    fn fail<T>(&self, err: FError) -> FResult<T> {
        self.trigger("error", &Value::String(format!("{}", err)));
        Err(err)
    }

    /// Save this record. New records get POSTed in full and pick up their Id
    /// from the response. Existing records PATCH only their dirty fields; if
    /// that fails, the fields are marked dirty again so the next save retries
    /// them.
    pub fn save(&self, conn: &Connection) -> FResult<()> {
        let sobject = self.sobject_or_else()?;
        let (action, url, payload, snapshot) = {
            let mut guard = lockw!(self.state);
            match guard.id() {
                None => {
                    let mut payload = guard.data.clone();
                    payload.remove(ID_FIELD);
                    let url = conn.resource_url(&format!("/sobjects/{}/", sobject));
                    (SyncAction::Create, url, payload, None)
                }
                Some(id) => {
                    let snapshot = guard.dirty.take();
                    let payload = dirty::build_payload(&guard.data, &snapshot);
                    let url = conn.resource_url(&format!("/sobjects/{}/{}", sobject, id));
                    (SyncAction::Update, url, payload, Some(snapshot))
                }
            }
        };
        debug!("Record.save() -- {:?} {} ({} fields)", action, sobject, payload.len());
        match conn.call(action.method(), &url, Some(&Value::Object(payload))) {
            Ok(resp) => {
                self.apply_response(resp)?;
                self.trigger("sync", &self.data());
                Ok(())
            }
            Err(e) => {
                if let Some(snapshot) = snapshot {
                    let mut guard = lockw!(self.state);
                    guard.dirty.restore(snapshot);
                }
                self.fail(e)
            }
        }
    }

    /// Set some fields (tracked) and then save
    pub fn save_attrs(&self, conn: &Connection, attrs: Value) -> FResult<()> {
        self.set_multi(attrs)?;
        self.save(conn)
    }

    /// Pull this record's data down from the server. Nothing fetched counts as
    /// a change.
    pub fn fetch(&self, conn: &Connection) -> FResult<()> {
        let sobject = self.sobject_or_else()?;
        let id = self.id_or_else()?;
        let fields = match self.fields {
            Some(ref x) => format!("?fields={}", x.join(",")),
            None => String::new(),
        };
        let url = conn.resource_url(&format!("/sobjects/{}/{}{}", sobject, id, fields));
        match conn.call(SyncAction::Read.method(), &url, None) {
            Ok(resp) => {
                self.apply_response(resp)?;
                self.trigger("sync", &self.data());
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Delete this record on the server. A record that was never saved has
    /// nothing to delete, so we return false without a request.
    pub fn destroy(&self, conn: &Connection) -> FResult<bool> {
        if self.is_new() {
            self.trigger("destroy", &self.data());
            return Ok(false);
        }
        let sobject = self.sobject_or_else()?;
        let id = self.id_or_else()?;
        let url = conn.resource_url(&format!("/sobjects/{}/{}", sobject, id));
        match conn.call(SyncAction::Delete.method(), &url, None) {
            Ok(_) => {
                self.trigger("destroy", &self.data());
                Ok(true)
            }
            Err(e) => self.fail(e),
        }
    }
}

impl Emitter for Record {
    fn bindings(&self) -> &Bindings {
        self.emitter.bindings()
    }
}

/// Save a record on its own thread and hand the result to `cb` when it's done.
/// The record stays usable (and settable) from other threads in the meantime.
pub fn spawn_save<F>(record: Arc<Record>, conn: Arc<Connection>, cb: F) -> FResult<thread::JoinHandle<()>>
    where F: FnOnce(FResult<()>) + Send + 'static
{
    let handle = thread::Builder::new().name(String::from("forcesync:save")).spawn(move || {
        let res = record.save(conn.as_ref());
        cb(res);
    })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> Record {
        Record::new("Opportunity")
            .with_data(json!({"Id": "001", "Name": "Acme", "Amount": 100, "Stage": "Open"}))
            .unwrap()
    }

    #[test]
    fn new_records_dont_track() {
        let record = Record::new("Account");
        assert!(record.is_new());
        record.set("Name", json!("Acme"));
        record.set_multi(json!({"Industry": "Energy", "Rating": "Hot"})).unwrap();
        assert!(record.pending_changes().is_empty());
        assert_eq!(record.get::<String>("Name").unwrap(), "Acme");
    }

    #[test]
    fn existing_records_track() {
        let record = existing();
        assert!(!record.is_new());
        assert_eq!(record.id().unwrap(), "001");
        assert!(record.pending_changes().is_empty());
        record.set("Name", json!("Acme Corp"));
        record.set("Amount", json!(150));
        record.set("Name", json!("Acme Inc"));
        assert_eq!(record.pending_changes(), vec!["Amount", "Name"]);
    }

    #[test]
    fn from_data_is_untracked() {
        let record = Record::from_data("Contact", json!({"Id": "003", "LastName": "Smith"})).unwrap();
        assert_eq!(record.sobject().unwrap(), "Contact");
        assert!(!record.is_new());
        assert!(record.pending_changes().is_empty());
        assert_eq!(record.data(), json!({"Id": "003", "LastName": "Smith"}));
        assert!(Record::from_data("Contact", json!("Smith")).is_err());
    }

    #[test]
    fn untracked_sets() {
        let record = existing();
        record.set_with("Stage", json!("Closed Won"), SetOptions::untracked());
        record.set_multi_with(json!({"Amount": 1}), SetOptions::untracked()).unwrap();
        assert!(record.pending_changes().is_empty());
        assert_eq!(record.get::<i64>("Amount"), Some(1));
    }

    #[test]
    fn id_is_never_dirty() {
        let record = existing();
        record.set("Id", json!("002"));
        assert!(record.pending_changes().is_empty());
        assert_eq!(record.id().unwrap(), "002");
    }

    #[test]
    fn bad_set_multi() {
        let record = existing();
        assert!(record.set_multi(json!(["Name"])).is_err());
    }

    #[test]
    fn set_events() {
        use ::std::sync::Mutex;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let record = existing();
        record.bind("set:Name", move |val| { seen2.lock().unwrap().push(val.clone()); }, "test");
        record.set("Name", json!("Globex"));
        record.set("Amount", json!(5));
        assert_eq!(*seen.lock().unwrap(), vec![json!("Globex")]);
    }

    #[test]
    fn parses_responses() {
        let (data, ty) = parse(json!({
            "attributes": {"type": "Account", "url": "/services/data/v42.0/sobjects/Account/001"},
            "id": "001",
            "success": true,
            "errors": [],
            "Name": "Acme",
        })).unwrap();
        assert_eq!(ty.unwrap(), "Account");
        assert_eq!(Value::Object(data), json!({"Id": "001", "Name": "Acme"}));

        let (data, ty) = parse(Value::Null).unwrap();
        assert!(data.is_empty());
        assert!(ty.is_none());
        assert!(parse(json!("nope")).is_err());
    }

    #[test]
    fn from_response_learns_type() {
        let record = Record::from_response(json!({"attributes": {"type": "Contact"}, "Id": "003", "LastName": "Smith"}), Some("Account"), None).unwrap();
        assert_eq!(record.sobject().unwrap(), "Contact");
        assert_eq!(record.id().unwrap(), "003");
        assert!(record.pending_changes().is_empty());

        let record = Record::from_response(json!({"Id": "001"}), Some("Account"), None).unwrap();
        assert_eq!(record.sobject().unwrap(), "Account");
    }
}
