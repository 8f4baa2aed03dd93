//! # Portal-Wide Flows
//!
//! Event-driven notifications with the runtime's handlers running, the
//! role-scoped dashboard and the unauthenticated system endpoints.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use portal_runtime::spawn_event_handlers;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Poll until the member's unread count reaches `expected`.
    async fn wait_for_unread(portal: &TestPortal, member: &Member, expected: u64) {
        let mut unread = 0;
        for _ in 0..100 {
            let (_, body) = portal.get("/api/notifications/unread-count", &member.token).await;
            unread = body["unread"].as_u64().unwrap_or(0);
            if unread >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(unread, expected);
    }

    #[tokio::test]
    async fn test_events_reach_inboxes() {
        let portal = TestPortal::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handlers = spawn_event_handlers(&portal.container, &shutdown_rx);

        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (_, bill) = portal
            .post(
                "/api/bills",
                &client.token,
                json!({ "title": "Shuttering", "work_description": "Level 2 slab", "amount": 88_000 }),
            )
            .await;
        wait_for_unread(&portal, &admin, 1).await;
        wait_for_unread(&portal, &staff, 1).await;

        let (_, page) = portal.get("/api/notifications", &staff.token).await;
        assert_eq!(page["items"][0]["kind"], "bill");
        let bill_id = bill["id"].as_str().unwrap();
        assert_eq!(page["items"][0]["link"], format!("/bills/{bill_id}"));

        let note_id = page["items"][0]["id"].as_str().unwrap();
        let (status, note) = portal
            .post(&format!("/api/notifications/{note_id}/read"), &staff.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(note["read"], true);
        wait_for_unread(&portal, &staff, 0).await;

        // Someone else's notification id is invisible.
        let (status, _) = portal
            .post(&format!("/api/notifications/{note_id}/read"), &admin.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        portal
            .post(
                &format!("/api/bills/{bill_id}/review"),
                &staff.token,
                json!({ "decision": "approve" }),
            )
            .await;
        wait_for_unread(&portal, &client, 1).await;

        let (status, updated) = portal
            .post("/api/notifications/read-all", &admin.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["updated"], 1);

        shutdown_tx.send(true).unwrap();
        for handle in handlers {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_role() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let acme = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let bolt = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        let announcement = json!({
            "role": "client",
            "title": "Site closed",
            "message": "No work on Friday",
        });
        let (status, _) = portal
            .post("/api/notifications/broadcast", &staff.token, announcement.clone())
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, delivered) = portal
            .post("/api/notifications/broadcast", &admin.token, announcement)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(delivered["delivered"], 2);

        wait_for_unread(&portal, &acme, 1).await;
        wait_for_unread(&portal, &bolt, 1).await;
        wait_for_unread(&portal, &staff, 0).await;

        let (_, page) = portal.get("/api/notifications?unread=true", &acme.token).await;
        assert_eq!(page["items"][0]["kind"], "announcement");
        let id = page["items"][0]["id"].as_str().unwrap();
        assert_eq!(
            portal.delete(&format!("/api/notifications/{id}"), &acme.token).await,
            StatusCode::NO_CONTENT
        );
        wait_for_unread(&portal, &acme, 0).await;
    }

    #[tokio::test]
    async fn test_dashboard_is_role_scoped() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let acme = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let bolt = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        for (member, amount) in [(&acme, 10_000), (&acme, 5_000), (&bolt, 70_000)] {
            let (status, _) = portal
                .post(
                    "/api/bills",
                    &member.token,
                    json!({ "title": "Works", "work_description": "Site works", "amount": amount }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, dashboard) = portal.get("/api/dashboard", &acme.token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["role"], "client");
        assert_eq!(dashboard["cid"], "CID0001");
        assert!(dashboard.get("users").is_none());
        assert!(dashboard.get("inbox").is_none());
        assert_eq!(dashboard["bills"]["total"]["count"], 2);
        assert_eq!(dashboard["bills"]["total"]["amount"], 15_000);

        let (_, dashboard) = portal.get("/api/dashboard", &admin.token).await;
        assert_eq!(dashboard["role"], "admin");
        assert_eq!(dashboard["users"]["clients"], 2);
        assert_eq!(dashboard["users"]["admins"], 1);
        assert_eq!(dashboard["bills"]["total"]["count"], 3);
        assert_eq!(dashboard["bills"]["pending"]["amount"], 85_000);
        assert_eq!(dashboard["inbox"], 0);
    }

    #[tokio::test]
    async fn test_system_endpoints() {
        let portal = TestPortal::new();

        let (status, health) = portal.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let (status, headers, _) = portal.call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let (status, body) = portal.send(Method::GET, "/api/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }
}
