//! A Collection is a list of records backed by a SOQL query. Fetching runs the
//! query and keeps following `nextRecordsUrl` until the server says it's done,
//! and only then swaps in the results and fires a single `reset` (or `add`).

use ::std::sync::{Arc, RwLock};

use ::jedi::{self, Value};
use ::regex::Regex;

use crate::api::SyncAction;
use crate::connection::Connection;
use crate::error::{FError, FResult};
use crate::models::record::Record;
use crate::util::event::{Bindings, Emitter, EventEmitter};

lazy_static! {
    /// Queries that start with WHERE get a SELECT ... FROM tacked on for them
    static ref RE_WHERE: Regex = Regex::new(r"(?i)^\s*where\b").expect("collection::RE_WHERE -- bad regex");
}

/// One page of query results
#[derive(Deserialize, Debug)]
struct QueryPage {
    #[serde(default)]
    records: Vec<Value>,
    #[serde(rename = "nextRecordsUrl", default)]
    next_records_url: Option<String>,
}

/// Options for fetching a collection
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Append the results to what we already have instead of replacing it
    pub add: bool,
}

/// A query-backed list of records
pub struct Collection {
    sobject: Option<String>,
    fields: Option<Vec<String>>,
    query: RwLock<Option<String>>,
    records: RwLock<Vec<Arc<Record>>>,
    emitter: EventEmitter,
}

impl Collection {
    /// Create a collection of the given sObject type
    pub fn new(sobject: &str) -> Collection {
        Collection::build(Some(String::from(sobject)))
    }

    /// Create a collection with no type. Full SELECT queries still work, and
    /// records pick up their type from the results.
    pub fn untyped() -> Collection {
        Collection::build(None)
    }

    fn build(sobject: Option<String>) -> Collection {
        Collection {
            sobject: sobject,
            fields: None,
            query: RwLock::new(None),
            records: RwLock::new(Vec::new()),
            emitter: EventEmitter::new(),
        }
    }

    /// Set the fields we SELECT for WHERE queries (also handed to each record)
    pub fn with_fields(mut self, fields: &[&str]) -> Collection {
        self.fields = Some(fields.iter().map(|x| String::from(*x)).collect());
        self
    }

    /// Set the query
    pub fn with_query(self, query: &str) -> Collection {
        self.set_query(query);
        self
    }

    /// Set the query. Either a full SOQL statement or just a WHERE clause.
    pub fn set_query(&self, query: &str) {
        let mut guard = lockw!(self.query);
        *guard = Some(String::from(query));
    }

    pub fn query(&self) -> Option<String> {
        lockr!(self.query).clone()
    }

    /// Turn our query into a full SOQL statement
    pub fn build_query(&self) -> FResult<String> {
        let query = match self.query() {
            Some(x) => x,
            None => return Err(FError::Config(String::from("Collection.query is required"))),
        };
        if !RE_WHERE.is_match(&query) {
            return Ok(query);
        }
        let fields = match self.fields {
            Some(ref x) if !x.is_empty() => x,
            _ => return Err(FError::Config(String::from("with WHERE queries, Collection fields need to be set"))),
        };
        let sobject = match self.sobject {
            Some(ref x) => x,
            None => return Err(FError::Config(String::from("with WHERE queries, Collection sObject type needs to be set"))),
        };
        Ok(format!("SELECT {} FROM {} {}", fields.join(","), sobject, query.trim()))
    }

    /// Run our query, following continuation urls until the server runs out
    /// of pages, then replace (or add to) our records in one shot.
    pub fn fetch(&self, conn: &Connection, options: FetchOptions) -> FResult<()> {
        let query = self.build_query()?;
        let encoded: String = ::url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let mut url = conn.resource_url(&format!("/query/?q={}", encoded));
        let mut received: Vec<Value> = Vec::new();
        let mut pages = 0;
        loop {
            let page: QueryPage = match self.fetch_page(conn, &url) {
                Ok(x) => x,
                Err(e) => {
                    self.trigger("error", &Value::String(format!("{}", e)));
                    return Err(e);
                }
            };
            pages += 1;
            received.extend(page.records);
            match page.next_records_url {
                Some(next) => url = format!("{}{}", conn.instance_url(), next),
                None => break,
            }
        }
        debug!("Collection.fetch() -- got {} records in {} page(s)", received.len(), pages);

        let records = match self.build_records(received) {
            Ok(x) => x,
            Err(e) => {
                self.trigger("error", &Value::String(format!("{}", e)));
                return Err(e);
            }
        };
        let event_data = Value::Array(records.iter().map(|x| x.data()).collect());
        {
            let mut guard = lockw!(self.records);
            if options.add {
                guard.extend(records);
            } else {
                *guard = records;
            }
        }
        self.trigger(if options.add { "add" } else { "reset" }, &event_data);
        Ok(())
    }

    fn build_records(&self, received: Vec<Value>) -> FResult<Vec<Arc<Record>>> {
        let sobject = self.sobject.as_ref().map(|x| x.as_str());
        let mut records = Vec::with_capacity(received.len());
        for resp in received {
            records.push(Arc::new(Record::from_response(resp, sobject, self.fields.as_ref())?));
        }
        Ok(records)
    }

    fn fetch_page(&self, conn: &Connection, url: &str) -> FResult<QueryPage> {
        let resp = conn.call(SyncAction::Read.method(), url, None)?;
        Ok(jedi::from_val(resp)?)
    }

    /// Grab all our records
    pub fn records(&self) -> Vec<Arc<Record>> {
        lockr!(self.records).clone()
    }

    /// Find a record by Id
    pub fn get(&self, id: &str) -> Option<Arc<Record>> {
        lockr!(self.records).iter()
            .find(|x| x.id().as_ref().map(|x| x.as_str()) == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        lockr!(self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lockr!(self.records).is_empty()
    }
}

impl Emitter for Collection {
    fn bindings(&self) -> &Bindings {
        self.emitter.bindings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queries_pass_through() {
        let col = Collection::untyped().with_query("SELECT Id FROM Account");
        assert_eq!(col.build_query().unwrap(), "SELECT Id FROM Account");
    }

    #[test]
    fn where_queries_expand() {
        let col = Collection::new("Account")
            .with_fields(&["Id", "Name"])
            .with_query("where Industry = 'Energy'");
        assert_eq!(col.build_query().unwrap(), "SELECT Id,Name FROM Account where Industry = 'Energy'");

        let col = Collection::new("Account")
            .with_fields(&["Id"])
            .with_query("  WHERE Name != null");
        assert_eq!(col.build_query().unwrap(), "SELECT Id FROM Account WHERE Name != null");
    }

    #[test]
    fn wherever_is_not_where() {
        let col = Collection::untyped().with_query("whereabouts");
        assert_eq!(col.build_query().unwrap(), "whereabouts");
    }

    #[test]
    fn config_errors() {
        match Collection::new("Account").build_query() {
            Err(FError::Config(_)) => {}
            x => panic!("unexpected: {:?}", x),
        }
        match Collection::new("Account").with_query("WHERE Name = 'x'").build_query() {
            Err(FError::Config(ref x)) => assert!(x.contains("fields")),
            x => panic!("unexpected: {:?}", x),
        }
        match Collection::untyped().with_fields(&["Id"]).with_query("WHERE Name = 'x'").build_query() {
            Err(FError::Config(ref x)) => assert!(x.contains("type")),
            x => panic!("unexpected: {:?}", x),
        }
    }
}
