//! # End-to-End Flows
//!
//! Every test builds a fresh [`TestPortal`]: an in-memory container, a
//! bootstrapped admin and the full gateway router. Requests go through
//! `tower::ServiceExt::oneshot`, so the middleware stack runs exactly as it
//! does behind a socket.

pub mod agreement_flows;
pub mod auth_flows;
pub mod billing_flows;
pub mod dfs_flows;
pub mod portal_flows;

#[cfg(test)]
pub(crate) use harness::*;

#[cfg(test)]
mod harness {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use portal_runtime::container::config::AdminAccount;
    use portal_runtime::{PortalConfig, PortalContainer};
    use serde_json::{json, Value};
    use sl_08_api_gateway::build_router;
    use tower::ServiceExt;

    pub const ADMIN_EMAIL: &str = "admin@siteledger.test";
    pub const ADMIN_PASSWORD: &str = "admin-password";
    pub const PASSWORD: &str = "member-password";

    const BOUNDARY: &str = "sl-test-boundary";

    /// A complete portal behind its HTTP router.
    pub struct TestPortal {
        pub container: PortalContainer,
        router: Router,
    }

    /// A logged-in account.
    pub struct Member {
        pub id: String,
        pub token: String,
        pub body: Value,
    }

    impl TestPortal {
        pub fn new() -> Self {
            let container = PortalContainer::in_memory(PortalConfig {
                admin: Some(AdminAccount {
                    name: "Administrator".into(),
                    email: ADMIN_EMAIL.into(),
                    password: ADMIN_PASSWORD.into(),
                }),
                ..PortalConfig::default()
            });
            container.bootstrap_admin().expect("bootstrap admin");
            let router = build_router(container.app_state(), &container.config.gateway_config());
            Self { container, router }
        }

        pub async fn call(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("read body");
            (status, headers, bytes.to_vec())
        }

        pub async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .expect("valid request");
            let (status, _, bytes) = self.call(request).await;
            (status, parse(&bytes))
        }

        pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
            self.send(Method::GET, uri, Some(token), None).await
        }

        pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
            self.send(Method::POST, uri, Some(token), Some(body)).await
        }

        pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
            self.send(Method::DELETE, uri, Some(token), None).await.0
        }

        /// POST a multipart form with text fields and one file part.
        pub async fn upload(
            &self,
            uri: &str,
            token: &str,
            fields: &[(&str, &str)],
            file: (&str, &[u8]),
        ) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields, file)))
                .expect("valid request");
            let (status, _, bytes) = self.call(request).await;
            (status, parse(&bytes))
        }

        pub async fn download(&self, uri: &str, token: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
            let request = Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("valid request");
            self.call(request).await
        }

        pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
            self.send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await
        }

        pub async fn admin(&self) -> Member {
            let (status, session) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
            assert_eq!(status, StatusCode::OK, "admin login: {session}");
            member_from_session(session)
        }

        /// Create an account through the admin API and log it in.
        pub async fn member(&self, admin: &Member, name: &str, email: &str, role: &str) -> Member {
            let (status, user) = self
                .post(
                    "/api/users",
                    &admin.token,
                    json!({
                        "name": name,
                        "email": email,
                        "password": PASSWORD,
                        "role": role,
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "create {email}: {user}");

            let (status, session) = self.login(email, PASSWORD).await;
            assert_eq!(status, StatusCode::OK, "login {email}: {session}");
            member_from_session(session)
        }
    }

    fn member_from_session(session: Value) -> Member {
        Member {
            id: session["user"]["id"].as_str().expect("user id").to_string(),
            token: session["token"].as_str().expect("token").to_string(),
            body: session["user"].clone(),
        }
    }

    fn parse(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }

    fn multipart_body(fields: &[(&str, &str)], (file_name, bytes): (&str, &[u8])) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
