//! # Agreement Flows
//!
//! Staff issue an agreement file to one client; the client opens it and
//! signs or rejects. Once decided it can no longer change.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    const CONTRACT: &[u8] = b"%PDF-1.7 works contract";

    async fn issue(portal: &TestPortal, issuer: &Member, client: &Member, title: &str) -> Value {
        let (status, agreement) = portal
            .upload(
                "/api/agreements",
                &issuer.token,
                &[("client_id", client.id.as_str()), ("title", title)],
                ("contract.pdf", CONTRACT),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{agreement}");
        agreement
    }

    #[tokio::test]
    async fn test_issue_view_and_sign() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let agreement = issue(&portal, &staff, &client, "Phase 1 works contract").await;
        assert_eq!(agreement["status"], "sent");
        assert_eq!(agreement["cid"], "CID0001");
        let id = agreement["id"].as_str().unwrap().to_string();

        // Staff reading it does not count as the client viewing it.
        let (_, seen_by_staff) = portal.get(&format!("/api/agreements/{id}"), &staff.token).await;
        assert_eq!(seen_by_staff["status"], "sent");

        let (status, opened) = portal.get(&format!("/api/agreements/{id}"), &client.token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened["status"], "viewed");
        assert!(!opened["viewed_at"].is_null());

        let (status, _) = portal
            .post(
                &format!("/api/agreements/{id}/sign"),
                &client.token,
                json!({ "signer_name": "  " }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, signed) = portal
            .post(
                &format!("/api/agreements/{id}/sign"),
                &client.token,
                json!({ "signer_name": "A. Contractor" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(signed["status"], "signed");
        assert_eq!(signed["signature"]["signer_name"], "A. Contractor");

        let (status, _) = portal
            .post(
                &format!("/api/agreements/{id}/reject"),
                &client.token,
                json!({ "reason": "Changed my mind" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let status = portal.delete(&format!("/api/agreements/{id}"), &admin.token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, bytes) = portal
            .download(&format!("/api/agreements/{id}/file"), &client.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, CONTRACT);
    }

    #[tokio::test]
    async fn test_reject_withdraw_and_isolation() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let acme = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let bolt = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        let first = issue(&portal, &staff, &acme, "Maintenance contract").await;
        let first_id = first["id"].as_str().unwrap();

        let (status, _) = portal.get(&format!("/api/agreements/{first_id}"), &bolt.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, page) = portal.get("/api/agreements", &bolt.token).await;
        assert_eq!(page["total"], 0);

        let (status, _) = portal
            .post(
                &format!("/api/agreements/{first_id}/reject"),
                &acme.token,
                json!({ "reason": "" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, rejected) = portal
            .post(
                &format!("/api/agreements/{first_id}/reject"),
                &acme.token,
                json!({ "reason": "Rates do not match the quote" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rejected["status"], "rejected");
        assert_eq!(rejected["rejection_reason"], "Rates do not match the quote");

        let second = issue(&portal, &staff, &acme, "Revised maintenance contract").await;
        let second_id = second["id"].as_str().unwrap();
        let (status, withdrawn) = portal
            .post(&format!("/api/agreements/{second_id}/withdraw"), &staff.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(withdrawn["status"], "withdrawn");

        let (status, _) = portal
            .post(
                &format!("/api/agreements/{second_id}/sign"),
                &acme.token,
                json!({ "signer_name": "Acme" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, page) = portal.get("/api/agreements?status=rejected", &admin.token).await;
        assert_eq!(page["total"], 1);
        assert_eq!(
            portal.delete(&format!("/api/agreements/{second_id}"), &admin.token).await,
            StatusCode::NO_CONTENT
        );
    }

    #[tokio::test]
    async fn test_only_staff_issue_and_only_to_clients() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, _) = portal
            .upload(
                "/api/agreements",
                &client.token,
                &[("client_id", client.id.as_str()), ("title", "Self-issued")],
                ("contract.pdf", CONTRACT),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = portal
            .upload(
                "/api/agreements",
                &admin.token,
                &[("client_id", staff.id.as_str()), ("title", "Wrong party")],
                ("contract.pdf", CONTRACT),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = portal
            .upload(
                "/api/agreements",
                &admin.token,
                &[("client_id", "not-a-uuid"), ("title", "Broken")],
                ("contract.pdf", CONTRACT),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
