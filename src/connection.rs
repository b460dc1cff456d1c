//! The Connection is our session with a Salesforce org: where it lives, which
//! API version we speak, and the tokens we authenticate with.
//!
//! Every persistence call takes a Connection explicitly. It owns the transport
//! and handles the one piece of auth logic we have: on a 401, refresh the
//! access token (if we can) and retry the original request exactly once.

use ::std::sync::RwLock;

use ::config;
use ::jedi::Value;

use crate::api::{ApiReq, HttpRequest, HttpResponse, HttpTransport, Method, Transport};
use crate::error::{FError, FResult};
use crate::oauth2::OAuth2;

/// The API version we talk when nobody says otherwise
pub const DEFAULT_VERSION: &'static str = "42.0";

/// Mutable auth state. Lives behind a lock so a refresh on one thread is seen
/// by all the others.
struct AuthState {
    instance_url: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Our session object. Responsible for making outbound calls to Salesforce.
pub struct Connection {
    transport: Box<dyn Transport>,
    version: String,
    proxy_url: Option<String>,
    oauth2: Option<OAuth2>,
    auth: RwLock<AuthState>,
}

impl Connection {
    /// Create a connection to the given instance over the given transport
    pub fn new<T>(transport: T, instance_url: &str) -> Connection
        where T: Transport + 'static
    {
        Connection {
            transport: Box::new(transport),
            version: String::from(DEFAULT_VERSION),
            proxy_url: None,
            oauth2: None,
            auth: RwLock::new(AuthState {
                instance_url: String::from(instance_url.trim_end_matches('/')),
                access_token: None,
                refresh_token: None,
            }),
        }
    }

    /// Build a connection (over HTTP) from our app config. Reads the
    /// `salesforce` section, plus `api.timeout`.
    pub fn from_config() -> FResult<Connection> {
        let instance_url: String = config::get(&["salesforce", "instance_url"])
            .map_err(|_| FError::Config(String::from("salesforce.instance_url is required")))?;
        let timeout: u64 = config::get_opt(&["api", "timeout"]).unwrap_or(30);
        let mut conn = Connection::new(HttpTransport::new(timeout)?, &instance_url);
        if let Some(version) = config::get_opt::<String>(&["salesforce", "version"]) {
            conn = conn.version(&version);
        }
        if let Some(token) = config::get_opt::<String>(&["salesforce", "access_token"]) {
            conn = conn.access_token(&token);
        }
        if let Some(token) = config::get_opt::<String>(&["salesforce", "refresh_token"]) {
            conn = conn.refresh_token(&token);
        }
        if let Some(proxy) = config::get_opt::<String>(&["salesforce", "proxy_url"]) {
            conn = conn.proxy_url(&proxy);
        }
        if let Some(client_id) = config::get_opt::<String>(&["salesforce", "client_id"]) {
            let login_url = config::get_opt::<String>(&["salesforce", "login_url"])
                .unwrap_or_else(|| String::from("https://login.salesforce.com"));
            let secret = config::get_opt::<String>(&["salesforce", "client_secret"]);
            conn = conn.oauth2(OAuth2::new(&login_url, &client_id, secret.as_ref().map(|x| x.as_str())));
        }
        Ok(conn)
    }

    /// Set the API version (ie "42.0")
    pub fn version(mut self, version: &str) -> Self {
        self.version = String::from(version.trim_start_matches('v'));
        self
    }

    /// Route all requests through a proxy. The real URL goes along in the
    /// `SalesforceProxy-Endpoint` header.
    pub fn proxy_url(mut self, proxy_url: &str) -> Self {
        self.proxy_url = Some(String::from(proxy_url));
        self
    }

    /// Set the OAuth client used to refresh tokens
    pub fn oauth2(mut self, oauth2: OAuth2) -> Self {
        self.oauth2 = Some(oauth2);
        self
    }

    pub fn access_token(self, token: &str) -> Self {
        {
            let mut guard = lockw!(self.auth);
            guard.access_token = Some(String::from(token));
        }
        self
    }

    pub fn refresh_token(self, token: &str) -> Self {
        {
            let mut guard = lockw!(self.auth);
            guard.refresh_token = Some(String::from(token));
        }
        self
    }

    /// Get the API version we're using
    pub fn get_version(&self) -> &str {
        &self.version
    }

    /// Get the current access token
    pub fn get_access_token(&self) -> Option<String> {
        lockr!(self.auth).access_token.clone()
    }

    /// Get the instance url (can change after a token refresh)
    pub fn instance_url(&self) -> String {
        lockr!(self.auth).instance_url.clone()
    }

    /// The REST root for our API version, ie
    /// `https://na1.salesforce.com/services/data/v42.0`
    pub fn service_url(&self) -> String {
        format!("{}/services/data/v{}", self.instance_url(), self.version)
    }

    /// Build a full url for a resource relative to the service root
    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}{}", self.service_url(), resource)
    }

    /// Whether a 401 is something we can do anything about
    fn can_refresh(&self) -> bool {
        self.oauth2.is_some() && lockr!(self.auth).refresh_token.is_some()
    }

    /// Grab a new access token using our refresh token
    fn refresh(&self) -> FResult<()> {
        let oauth2 = match self.oauth2 {
            Some(ref x) => x,
            None => return Err(FError::MissingData(String::from("Connection.refresh() -- no oauth2 client"))),
        };
        let refresh_token = match lockr!(self.auth).refresh_token.clone() {
            Some(x) => x,
            None => return Err(FError::MissingData(String::from("Connection.refresh() -- no refresh token"))),
        };
        let token = oauth2.refresh_token(self.transport.as_ref(), &refresh_token)?;
        let mut guard = lockw!(self.auth);
        guard.access_token = Some(token.access_token);
        if let Some(instance_url) = token.instance_url {
            guard.instance_url = String::from(instance_url.trim_end_matches('/'));
        }
        if let Some(refresh_token) = token.refresh_token {
            guard.refresh_token = Some(refresh_token);
        }
        Ok(())
    }

    /// Sign and address a request. Goes to the proxy if we have one.
    fn build_request(&self, method: Method, url: &str, data: Option<&Value>) -> FResult<HttpRequest> {
        let mut builder = ApiReq::new()
            .header("Content-Type", "application/json")
            .header("X-User-Agent", &format!("forcesync/{}", self.version));
        if let Some(token) = self.get_access_token() {
            builder = builder.header("Authorization", &format!("OAuth {}", token));
        }
        if let Some(data) = data {
            builder = builder.data(data.clone());
        }
        match self.proxy_url {
            Some(ref proxy) => {
                builder
                    .header("SalesforceProxy-Endpoint", url)
                    .build(method, proxy)
            }
            None => builder.build(method, url),
        }
    }

    /// Send one signed request, no retries
    fn send(&self, method: Method, url: &str, data: Option<&Value>) -> FResult<HttpResponse> {
        let req = self.build_request(method, url, data)?;
        self.transport.send(&req)
    }

    /// Point a url at our current instance. Urls built before a refresh moved
    /// us to another instance get their host swapped; anything else is left
    /// alone.
    fn rebase_url(&self, url: &str, old_instance: &str) -> String {
        let instance_url = self.instance_url();
        if old_instance != instance_url && url.starts_with(old_instance) {
            format!("{}{}", instance_url, &url[old_instance.len()..])
        } else {
            String::from(url)
        }
    }

    /// Send out an API request. Non-2xx responses become `FError::Api`. A 401
    /// gets one token refresh and one retry (against the new instance if the
    /// refresh moved us); a second 401 is `FError::Unauthorized`.
    pub fn call(&self, method: Method, url: &str, data: Option<&Value>) -> FResult<Value> {
        debug!("connection::call() -- req: {} {}", method, url);
        let mut res = self.send(method, url, data)?;
        if res.status == 401 {
            if !self.can_refresh() {
                return Err(FError::Unauthorized(res.body));
            }
            info!("connection::call() -- 401 on {} {}, refreshing token", method, url);
            let old_instance = self.instance_url();
            self.refresh()?;
            let url = self.rebase_url(url, &old_instance);
            res = self.send(method, &url, data)?;
            if res.status == 401 {
                warn!("connection::call() -- still 401 after refresh: {} {}", method, url);
                return Err(FError::Unauthorized(res.body));
            }
        }
        info!("connection::call() -- res({}): {} {} {}", res.body.len(), res.status, method, url);
        trace!("  connection::call() -- body: {}", res.body);
        if !res.is_success() {
            return Err(FError::Api(res.status, res.body));
        }
        res.json()
    }

    /// Convenience function for conn.call(GET)
    pub fn get(&self, url: &str) -> FResult<Value> {
        self.call(Method::Get, url, None)
    }

    /// Convenience function for conn.call(POST)
    pub fn post(&self, url: &str, data: &Value) -> FResult<Value> {
        self.call(Method::Post, url, Some(data))
    }

    /// Convenience function for conn.call(PATCH)
    pub fn patch(&self, url: &str, data: &Value) -> FResult<Value> {
        self.call(Method::Patch, url, Some(data))
    }

    /// Convenience function for conn.call(DELETE)
    pub fn delete(&self, url: &str) -> FResult<Value> {
        self.call(Method::Delete, url, None)
    }
}
