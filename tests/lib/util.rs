extern crate forcesync;
extern crate jedi;
#[macro_use]
extern crate serde_json;

use ::std::collections::VecDeque;
use ::std::sync::{Arc, Mutex};

use ::forcesync::{Connection, HttpRequest, HttpResponse, OAuth2, Transport};
use ::forcesync::error::FResult;
#[allow(unused_imports)]
use ::jedi::Value;

#[allow(dead_code)]
pub const INSTANCE_URL: &'static str = "https://na1.salesforce.com";
#[allow(dead_code)]
pub const SERVICE_URL: &'static str = "https://na1.salesforce.com/services/data/v42.0";

type Hook = Box<dyn Fn(&HttpRequest) + Send + Sync>;

struct MockInner {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    hook: Mutex<Option<Hook>>,
}

/// A scripted Salesforce. Answers requests in order from a queue of canned
/// responses and remembers everything it was sent. Clones share state, so
/// hand one to a Connection and keep one for assertions.
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

#[allow(dead_code)]
impl Mock {
    pub fn new() -> Mock {
        Mock {
            inner: Arc::new(MockInner {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                hook: Mutex::new(None),
            }),
        }
    }

    /// Queue up a response
    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.inner.responses.lock().unwrap().push_back(HttpResponse::new(status, body));
        self
    }

    /// Queue up a JSON response
    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(status, &jedi::stringify(&body).unwrap())
    }

    /// Run something every time a request comes in, before it's answered.
    /// This is how tests poke at records while a request is "in flight".
    pub fn on_send<F>(&self, hook: F)
        where F: Fn(&HttpRequest) + Send + Sync + 'static
    {
        *self.inner.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Everything we've been sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// A connection to our fake org, talking through this mock
    pub fn connection(&self) -> Connection {
        Connection::new(self.clone(), INSTANCE_URL)
            .version("42.0")
            .access_token("00Dtoken")
    }

    /// Same as `connection()` but able to refresh its token
    pub fn refreshing_connection(&self) -> Connection {
        self.connection()
            .refresh_token("5Aep")
            .oauth2(OAuth2::new("https://login.salesforce.com", "3MVG9", Some("s3cret")))
    }
}

impl Transport for Mock {
    fn send(&self, req: &HttpRequest) -> FResult<HttpResponse> {
        self.inner.requests.lock().unwrap().push(req.clone());
        if let Some(ref hook) = *self.inner.hook.lock().unwrap() {
            hook(req);
        }
        match self.inner.responses.lock().unwrap().pop_front() {
            Some(res) => Ok(res),
            None => Ok(HttpResponse::new(500, r#"[{"errorCode":"NO_SCRIPTED_RESPONSE"}]"#)),
        }
    }
}
