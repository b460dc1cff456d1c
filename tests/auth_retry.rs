include!("./lib/util.rs");

#[cfg(test)]
mod tests {
    use super::*;

    use ::forcesync::{FError, Method, Record};

    const EXPIRED: &'static str = r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#;

    #[test]
    fn refreshes_once_and_retries() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"access_token": "00Dfresh", "instance_url": INSTANCE_URL}));
        mock.respond_json(200, json!({"Id": "001", "Name": "Acme"}));

        let res = conn.get(&format!("{}/sobjects/Account/001", SERVICE_URL)).unwrap();
        assert_eq!(res, json!({"Id": "001", "Name": "Acme"}));

        let reqs = mock.requests();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].header("Authorization"), Some("OAuth 00Dtoken"));
        assert_eq!(reqs[1].method, Method::Post);
        assert_eq!(reqs[1].url, "https://login.salesforce.com/services/oauth2/token");
        assert!(reqs[1].body.as_ref().unwrap().contains("refresh_token=5Aep"));
        assert_eq!(reqs[2].url, reqs[0].url);
        assert_eq!(reqs[2].header("Authorization"), Some("OAuth 00Dfresh"));
        assert_eq!(conn.get_access_token(), Some(String::from("00Dfresh")));
    }

    #[test]
    fn second_401_is_terminal() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"access_token": "00Dfresh"}));
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"should": "never be requested"}));

        match conn.get(&format!("{}/sobjects/Account/001", SERVICE_URL)) {
            Err(FError::Unauthorized(ref body)) => assert!(body.contains("INVALID_SESSION_ID")),
            x => panic!("unexpected: {:?}", x),
        }
        let reqs = mock.requests();
        assert_eq!(reqs.len(), 3);
        let token_reqs = reqs.iter().filter(|x| x.url.contains("/oauth2/token")).count();
        assert_eq!(token_reqs, 1);
    }

    #[test]
    fn failed_refresh_surfaces() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        mock.respond(401, EXPIRED);
        mock.respond(400, r#"{"error":"invalid_grant","error_description":"expired access/refresh token"}"#);
        match conn.get(&format!("{}/sobjects/Account/001", SERVICE_URL)) {
            Err(FError::Api(400, _)) => {}
            x => panic!("unexpected: {:?}", x),
        }
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn unauthorized_save_keeps_changes() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        let record = Record::new("Account")
            .with_data(json!({"Id": "001", "Name": "Acme"}))
            .unwrap();
        record.set("Name", json!("Acme Corp"));
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"access_token": "00Dfresh"}));
        mock.respond(401, EXPIRED);
        match record.save(&conn) {
            Err(e) => assert_eq!(e.status(), Some(401)),
            Ok(_) => panic!("save should have failed"),
        }
        assert_eq!(record.pending_changes(), vec!["Name"]);
    }

    #[test]
    fn refresh_moves_instance() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"access_token": "00Dfresh", "instance_url": "https://na9.salesforce.com"}));
        mock.respond(204, "");
        conn.delete(&format!("{}/sobjects/Account/001", SERVICE_URL)).unwrap();
        assert_eq!(conn.service_url(), "https://na9.salesforce.com/services/data/v42.0");

        let reqs = mock.requests();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].url, format!("{}/sobjects/Account/001", SERVICE_URL));
        assert_eq!(reqs[2].method, Method::Delete);
        assert_eq!(reqs[2].url, "https://na9.salesforce.com/services/data/v42.0/sobjects/Account/001");
    }

    #[test]
    fn foreign_urls_are_not_rebased() {
        let mock = Mock::new();
        let conn = mock.refreshing_connection();
        mock.respond(401, EXPIRED);
        mock.respond_json(200, json!({"access_token": "00Dfresh", "instance_url": "https://na9.salesforce.com"}));
        mock.respond_json(200, json!({}));
        conn.get("https://files.example.com/blob/1").unwrap();
        assert_eq!(mock.requests()[2].url, "https://files.example.com/blob/1");
    }
}
