//! # Authentication and Account Flows
//!
//! Login over cookie and bearer token, account administration and client
//! identifier (CID) assignment.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_cookie_session_round_trip() {
        let portal = TestPortal::new();

        let login = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }).to_string(),
            ))
            .unwrap();
        let (status, headers, _) = portal.call(login).await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let me = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = portal.call(me).await;
        assert_eq!(status, StatusCode::OK);
        let user: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(user["email"], ADMIN_EMAIL);
        assert_eq!(user["role"], "admin");
        assert!(user.get("password_hash").is_none());

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = portal.call(logout).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(headers[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_bad_credentials_and_missing_token_are_unauthorized() {
        let portal = TestPortal::new();

        let (status, body) = portal.login(ADMIN_EMAIL, "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");

        let (status, _) = portal.login("nobody@siteledger.test", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = portal.send(Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = portal.get("/api/bills", "not-a-jwt").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_clients_receive_sequential_cids() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;

        let first = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let second = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        assert_eq!(first.body["cid"], "CID0001");
        assert_eq!(second.body["cid"], "CID0002");
        assert!(staff.body["cid"].is_null());

        let (status, page) = portal.get("/api/users?role=client", &admin.token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn test_account_administration_is_admin_only() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, _) = portal
            .post(
                "/api/users",
                &staff.token,
                json!({
                    "name": "Sneaky",
                    "email": "sneaky@site.test",
                    "password": PASSWORD,
                    "role": "admin",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = portal
            .get(&format!("/api/users/{}", staff.id), &client.token)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, own) = portal
            .get(&format!("/api/users/{}", client.id), &client.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(own["cid"], "CID0001");

        let (status, body) = portal
            .post(
                "/api/users",
                &admin.token,
                json!({
                    "name": "Weak",
                    "email": "weak@site.test",
                    "password": "short",
                    "role": "staff",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    #[tokio::test]
    async fn test_deactivated_account_loses_access() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, user) = portal
            .send(
                Method::PUT,
                &format!("/api/users/{}", client.id),
                Some(&admin.token),
                Some(json!({ "active": false })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["active"], false);

        let (status, _) = portal.get("/api/auth/me", &client.token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = portal.login("acme@site.test", PASSWORD).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_password_change_and_reset() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;

        let (status, _) = portal
            .send(
                Method::PUT,
                "/api/auth/password",
                Some(&staff.token),
                Some(json!({ "current_password": "wrong-password", "new_password": "brand-new-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = portal
            .send(
                Method::PUT,
                "/api/auth/password",
                Some(&staff.token),
                Some(json!({ "current_password": PASSWORD, "new_password": "brand-new-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(portal.login("sam@site.test", "brand-new-pass").await.0, StatusCode::OK);

        let (status, _) = portal
            .post(
                &format!("/api/users/{}/password", staff.id),
                &admin.token,
                json!({ "new_password": "reset-by-admin" }),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(portal.login("sam@site.test", "reset-by-admin").await.0, StatusCode::OK);
        assert_eq!(
            portal.login("sam@site.test", "brand-new-pass").await.0,
            StatusCode::UNAUTHORIZED
        );
    }
}
