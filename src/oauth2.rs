//! OAuth2 token refresh. We only ever do the `refresh_token` grant; getting
//! the first token is the app's business.

use ::jedi;

use crate::api::{self, ApiReq, Method, Transport};
use crate::error::FResult;

/// What the token endpoint gives back. Salesforce sends more than this
/// (signature, issued_at, scope...) but we only care about these.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Holds the connected app's client credentials and where to send them.
#[derive(Debug, Clone)]
pub struct OAuth2 {
    pub login_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl OAuth2 {
    pub fn new(login_url: &str, client_id: &str, client_secret: Option<&str>) -> Self {
        OAuth2 {
            login_url: String::from(login_url.trim_end_matches('/')),
            client_id: String::from(client_id),
            client_secret: client_secret.map(String::from),
        }
    }

    /// The token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/services/oauth2/token", self.login_url)
    }

    /// Trade a refresh token for a fresh access token
    pub fn refresh_token(&self, transport: &dyn Transport, refresh_token: &str) -> FResult<TokenResponse> {
        debug!("oauth2::refresh_token() -- refreshing via {}", self.login_url);
        let mut form = vec![
            (String::from("grant_type"), String::from("refresh_token")),
            (String::from("client_id"), self.client_id.clone()),
        ];
        if let Some(ref secret) = self.client_secret {
            form.push((String::from("client_secret"), secret.clone()));
        }
        form.push((String::from("refresh_token"), String::from(refresh_token)));
        let req = ApiReq::new()
            .form(form)
            .build(Method::Post, &self.token_url())?;
        let res = api::check_status(transport.send(&req)?)?;
        let token: TokenResponse = jedi::parse(&res.body)?;
        info!("oauth2::refresh_token() -- got new access token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::sync::Mutex;
    use crate::api::{HttpRequest, HttpResponse};
    use crate::error::FError;

    struct TokenServer {
        status: u16,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for TokenServer {
        fn send(&self, req: &HttpRequest) -> FResult<HttpResponse> {
            self.seen.lock().unwrap().push(req.clone());
            if self.status == 200 {
                Ok(HttpResponse::new(200, r#"{"access_token":"00Dnew","instance_url":"https://na2.salesforce.com","token_type":"Bearer"}"#))
            } else {
                Ok(HttpResponse::new(self.status, r#"{"error":"invalid_grant"}"#))
            }
        }
    }

    #[test]
    fn refreshes() {
        let server = TokenServer { status: 200, seen: Mutex::new(Vec::new()) };
        let oauth = OAuth2::new("https://login.salesforce.com/", "3MVG9", Some("s3cret"));
        let token = oauth.refresh_token(&server, "5Aep").unwrap();
        assert_eq!(token.access_token, "00Dnew");
        assert_eq!(token.instance_url.as_ref().map(|x| x.as_str()), Some("https://na2.salesforce.com"));

        let seen = server.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::Post);
        assert_eq!(seen[0].url, "https://login.salesforce.com/services/oauth2/token");
        assert_eq!(seen[0].body.as_ref().unwrap(), "grant_type=refresh_token&client_id=3MVG9&client_secret=s3cret&refresh_token=5Aep");
        assert!(seen[0].header("Authorization").is_none());
    }

    #[test]
    fn bad_grant() {
        let server = TokenServer { status: 400, seen: Mutex::new(Vec::new()) };
        let oauth = OAuth2::new("https://login.salesforce.com", "3MVG9", None);
        match oauth.refresh_token(&server, "expired") {
            Err(FError::Api(400, _)) => {}
            x => panic!("unexpected: {:?}", x),
        }
    }
}
