//! # Document Forwarding Flows
//!
//! Upload → forward → decide, with the custody trail checked after every
//! hop. Documents are visible only to the people they passed through and to
//! admins.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};

    const DRAWING: &[u8] = b"%PDF-1.7 structural drawing rev B";

    async fn upload_drawing(portal: &TestPortal, member: &Member) -> Value {
        let (status, document) = portal
            .upload(
                "/api/dfs",
                &member.token,
                &[("title", "Structural drawing"), ("category", "drawings")],
                ("drawing.pdf", DRAWING),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{document}");
        document
    }

    #[tokio::test]
    async fn test_custody_chain_from_upload_to_approval() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let engineer = portal.member(&admin, "Eve", "eve@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let document = upload_drawing(&portal, &client).await;
        assert_eq!(document["status"], "pending");
        assert_eq!(document["current_owner"], client.id.as_str());
        assert_eq!(document["file"]["size"], DRAWING.len());
        let id = document["id"].as_str().unwrap().to_string();

        let (status, forwarded) = portal
            .post(
                &format!("/api/dfs/{id}/forward"),
                &client.token,
                json!({ "to": staff.id, "note": "Please check the rebar schedule" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{forwarded}");
        assert_eq!(forwarded["status"], "in_review");
        assert_eq!(forwarded["current_owner"], staff.id.as_str());

        let (_, inbox) = portal.get("/api/dfs/inbox", &staff.token).await;
        assert_eq!(inbox["total"], 1);

        // Custody moved, so the uploader can no longer act on it.
        let (status, _) = portal
            .post(
                &format!("/api/dfs/{id}/status"),
                &client.token,
                json!({ "status": "approved" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = portal
            .post(
                &format!("/api/dfs/{id}/forward"),
                &staff.token,
                json!({ "to": engineer.id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, approved) = portal
            .post(
                &format!("/api/dfs/{id}/status"),
                &engineer.token,
                json!({ "status": "approved", "note": "Cleared for site" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");

        let (status, _) = portal
            .post(
                &format!("/api/dfs/{id}/status"),
                &engineer.token,
                json!({ "status": "rejected" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, trail) = portal.get(&format!("/api/dfs/{id}/trail"), &client.token).await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<&str> = trail
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, ["uploaded", "forwarded", "forwarded", "status_changed"]);
        for (seq, entry) in trail.as_array().unwrap().iter().enumerate() {
            assert_eq!(entry["seq"], seq);
        }
        assert_eq!(trail[1]["from"], client.id.as_str());
        assert_eq!(trail[1]["to"], staff.id.as_str());
        assert_eq!(trail[2]["from"], staff.id.as_str());

        let (_, involved) = portal.get("/api/dfs/involved", &staff.token).await;
        assert_eq!(involved["total"], 1);
        let (_, uploaded) = portal.get("/api/dfs/uploaded", &client.token).await;
        assert_eq!(uploaded["total"], 1);
    }

    #[tokio::test]
    async fn test_forward_rejects_invalid_recipients() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let acme = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let bolt = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        let document = upload_drawing(&portal, &acme).await;
        let id = document["id"].as_str().unwrap();
        let forward = format!("/api/dfs/{id}/forward");

        let (status, body) = portal.post(&forward, &acme.token, json!({ "to": bolt.id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid");

        let (status, _) = portal.post(&forward, &acme.token, json!({ "to": acme.id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Bolt was never part of the chain and cannot see the document.
        let (status, _) = portal.post(&forward, &bolt.token, json!({ "to": staff.id })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = portal.get(&format!("/api/dfs/{id}"), &bolt.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, unchanged) = portal.get(&format!("/api/dfs/{id}"), &acme.token).await;
        assert_eq!(unchanged["status"], "pending");
        assert_eq!(unchanged["trail"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_download_is_verified_and_scoped() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let document = upload_drawing(&portal, &client).await;
        let id = document["id"].as_str().unwrap();

        let (status, headers, bytes) = portal
            .download(&format!("/api/dfs/{id}/file"), &client.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, DRAWING);
        assert_eq!(
            headers["x-content-sha256"].to_str().unwrap(),
            document["file"]["sha256"].as_str().unwrap()
        );
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("drawing.pdf"));

        let (status, _, _) = portal
            .download(&format!("/api/dfs/{id}/file"), &staff.token)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = portal
            .download(&format!("/api/dfs/{id}/file"), &admin.token)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_listing_every_document_is_admin_only() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        upload_drawing(&portal, &client).await;
        upload_drawing(&portal, &staff).await;

        let (status, _) = portal.get("/api/dfs", &staff.token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = portal.get("/api/dfs", &client.token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, page) = portal.get("/api/dfs", &admin.token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
        let (_, page) = portal.get("/api/dfs?status=in_review", &admin.token).await;
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn test_upload_requires_title_and_file() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, _) = portal
            .upload("/api/dfs", &client.token, &[], ("drawing.pdf", DRAWING))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = portal
            .upload(
                "/api/dfs",
                &client.token,
                &[("title", "Empty")],
                ("empty.pdf", &[][..]),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_uploader_delete_window_closes_after_forward() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let draft = upload_drawing(&portal, &client).await;
        let draft_id = draft["id"].as_str().unwrap();
        assert_eq!(
            portal.delete(&format!("/api/dfs/{draft_id}"), &client.token).await,
            StatusCode::NO_CONTENT
        );

        let sent = upload_drawing(&portal, &client).await;
        let sent_id = sent["id"].as_str().unwrap();
        portal
            .post(
                &format!("/api/dfs/{sent_id}/forward"),
                &client.token,
                json!({ "to": staff.id }),
            )
            .await;
        assert_eq!(
            portal.delete(&format!("/api/dfs/{sent_id}"), &client.token).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            portal.delete(&format!("/api/dfs/{sent_id}"), &admin.token).await,
            StatusCode::NO_CONTENT
        );
        let (status, _) = portal.get(&format!("/api/dfs/{sent_id}"), &staff.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
