//! The Api layer knows how to put a request on the wire and get a response
//! back, nothing more. Authentication, URL building and retries all live in
//! `Connection`, which drives a `Transport`.
//!
//! `HttpTransport` is the real thing (reqwest). Tests swap in their own
//! `Transport` that answers from a script.

use ::std::fmt;
use ::std::time::Duration;

use ::jedi::{self, Value};
use ::reqwest::blocking::Client;

use crate::error::{FError, FResult};

/// The HTTP methods the REST API cares about
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a sync operation is trying to do to a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncAction {
    Create,
    Update,
    Delete,
    Read,
}

impl SyncAction {
    /// Map a sync action onto the HTTP method the REST API expects for it
    pub fn method(&self) -> Method {
        match *self {
            SyncAction::Create => Method::Post,
            SyncAction::Update => Method::Patch,
            SyncAction::Delete => Method::Delete,
            SyncAction::Read => Method::Get,
        }
    }
}

/// A struct used for building API requests
#[derive(Debug, Clone)]
pub struct ApiReq {
    headers: Vec<(String, String)>,
    data: Option<Value>,
    form: Option<Vec<(String, String)>>,
}

impl ApiReq {
    /// Create a new builder
    pub fn new() -> Self {
        ApiReq {
            headers: Vec::new(),
            data: None,
            form: None,
        }
    }

    /// Set a header, replacing any previous value under the same name
    pub fn header(mut self, name: &str, val: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((String::from(name), String::from(val)));
        self
    }

    /// Set this request's JSON body
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Send this request as `application/x-www-form-urlencoded` instead of
    /// JSON
    pub fn form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }

    /// Finalize this builder into a request against the given url
    pub fn build(self, method: Method, url: &str) -> FResult<HttpRequest> {
        let ApiReq { mut headers, data, form } = self;
        let has_ctype = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("Content-Type"));
        let body = match (form, data) {
            (Some(form), _) => {
                if !has_ctype {
                    headers.push((String::from("Content-Type"), String::from("application/x-www-form-urlencoded")));
                }
                Some(::url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(form.iter())
                    .finish())
            }
            (None, Some(data)) => {
                if !has_ctype {
                    headers.push((String::from("Content-Type"), String::from("application/json")));
                }
                Some(jedi::stringify(&data)?)
            }
            (None, None) => None,
        };
        Ok(HttpRequest {
            method: method,
            url: String::from(url),
            headers: headers,
            body: body,
        })
    }
}

impl Default for ApiReq {
    fn default() -> Self {
        ApiReq::new()
    }
}

/// A fully-built request, ready for a `Transport`
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Grab a header value (case-insensitive name match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body of this request as JSON (Null if there is no body)
    pub fn json(&self) -> FResult<Value> {
        match self.body {
            Some(ref body) => Ok(jedi::parse(body)?),
            None => Ok(Value::Null),
        }
    }
}

/// Whatever came back from the server
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: &str) -> Self {
        HttpResponse {
            status: status,
            body: String::from(body),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parse the body as JSON. Empty bodies (`204 No Content` on PATCH and
    /// DELETE) come back as Null.
    pub fn json(&self) -> FResult<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(jedi::parse(&self.body)?)
    }
}

/// Sends a request and hands back the raw response. Non-2xx statuses are *not*
/// errors at this level; only failing to talk to the server at all is.
pub trait Transport: Send + Sync {
    fn send(&self, req: &HttpRequest) -> FResult<HttpResponse>;
}

/// The reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout (seconds)
    pub fn new(timeout: u64) -> FResult<HttpTransport> {
        let client = Client::builder()
            .timeout(Duration::new(timeout, 0))
            .build()?;
        Ok(HttpTransport { client: client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, req: &HttpRequest) -> FResult<HttpResponse> {
        let method = match req.method {
            Method::Get => ::reqwest::Method::GET,
            Method::Post => ::reqwest::Method::POST,
            Method::Patch => ::reqwest::Method::PATCH,
            Method::Delete => ::reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, req.url.as_str());
        for (name, val) in &req.headers {
            builder = builder.header(name.as_str(), val.as_str());
        }
        if let Some(ref body) = req.body {
            builder = builder.body(body.clone());
        }
        let res = builder.send().map_err(|e| {
            error!("api::send() -- {} {}: {}", req.method, req.url, e);
            toferr!(e)
        })?;
        let status = res.status().as_u16();
        let body = res.text()?;
        Ok(HttpResponse { status: status, body: body })
    }
}

/// Turn a non-success response into an error, pass successes through
pub fn check_status(res: HttpResponse) -> FResult<HttpResponse> {
    if res.is_success() {
        Ok(res)
    } else {
        Err(FError::Api(res.status, res.body))
    }
}
