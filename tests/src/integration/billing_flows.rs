//! # Billing and Payment Request Flows
//!
//! A client's bill moves pending → approved → paid through staff review and
//! admin settlement. Payment requests follow the same review shape. Records
//! of one client never show up for another.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::{header, Method, StatusCode};
    use serde_json::{json, Value};

    fn bill(title: &str, amount: u64) -> Value {
        json!({
            "title": title,
            "work_description": "Excavation and footing for block A",
            "site": "Plot 7",
            "amount": amount,
        })
    }

    #[tokio::test]
    async fn test_bill_review_and_settlement() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, submitted) = portal
            .post("/api/bills", &client.token, bill("Foundation works", 12_500_000))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{submitted}");
        assert_eq!(submitted["status"], "pending");
        assert_eq!(submitted["cid"], "CID0001");
        assert_eq!(submitted["bill_number"], "BILL-000001");
        let id = submitted["id"].as_str().unwrap().to_string();

        let (status, body) = portal
            .post(
                &format!("/api/bills/{id}/review"),
                &staff.token,
                json!({ "decision": "reject" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid");

        let (status, _) = portal
            .post(
                &format!("/api/bills/{id}/review"),
                &client.token,
                json!({ "decision": "approve" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, reviewed) = portal
            .post(
                &format!("/api/bills/{id}/review"),
                &staff.token,
                json!({ "decision": "approve", "remarks": "Measured on site" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["status"], "approved");
        assert_eq!(reviewed["reviewed_by"], staff.id.as_str());
        assert_eq!(reviewed["remarks"], "Measured on site");

        let (status, _) = portal
            .post(
                &format!("/api/bills/{id}/review"),
                &staff.token,
                json!({ "decision": "reject", "remarks": "Too late" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Once reviewed, the client can no longer edit or withdraw the bill.
        let (status, body) = portal
            .send(
                Method::PUT,
                &format!("/api/bills/{id}"),
                Some(&client.token),
                Some(json!({ "amount": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");
        assert_eq!(
            portal.delete(&format!("/api/bills/{id}"), &client.token).await,
            StatusCode::CONFLICT
        );

        let (status, _) = portal
            .post(&format!("/api/bills/{id}/paid"), &staff.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, paid) = portal
            .post(&format!("/api/bills/{id}/paid"), &admin.token, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["status"], "paid");
        assert!(!paid["paid_at"].is_null());
    }

    #[tokio::test]
    async fn test_bills_are_isolated_per_client() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let acme = portal.member(&admin, "Acme", "acme@site.test", "client").await;
        let bolt = portal.member(&admin, "Bolt", "bolt@site.test", "client").await;

        let (_, acme_bill) = portal
            .post("/api/bills", &acme.token, bill("Roofing", 400_000))
            .await;
        portal
            .post("/api/bills", &bolt.token, bill("Plumbing", 90_000))
            .await;
        let acme_bill_id = acme_bill["id"].as_str().unwrap();

        let (status, body) = portal
            .get(&format!("/api/bills/{acme_bill_id}"), &bolt.token)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");

        let (_, page) = portal.get("/api/bills", &bolt.token).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["title"], "Plumbing");

        let (_, page) = portal.get("/api/bills", &admin.token).await;
        assert_eq!(page["total"], 2);

        let (_, page) = portal.get("/api/bills?cid=CID0001", &admin.token).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["title"], "Roofing");

        let status = portal
            .delete(&format!("/api/bills/{acme_bill_id}"), &bolt.token)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bill_validation_and_staff_cannot_submit() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (status, _) = portal
            .post("/api/bills", &staff.token, bill("Scaffolding", 1_000))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = portal
            .post("/api/bills", &client.token, bill("Zero", 0))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = portal
            .post("/api/bills", &client.token, bill("   ", 1_000))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bill_attachment_upload_and_download() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let (_, submitted) = portal
            .post("/api/bills", &client.token, bill("Drainage", 75_000))
            .await;
        let id = submitted["id"].as_str().unwrap();

        let (status, updated) = portal
            .upload(
                &format!("/api/bills/{id}/attachment"),
                &client.token,
                &[],
                ("invoice.pdf", &b"%PDF-1.7 invoice"[..]),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["attachment"]["file_name"], "invoice.pdf");

        let (status, headers, bytes) = portal
            .download(&format!("/api/bills/{id}/attachment"), &admin.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"%PDF-1.7 invoice");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("invoice.pdf"));
    }

    #[tokio::test]
    async fn test_payment_request_lifecycle() {
        let portal = TestPortal::new();
        let admin = portal.admin().await;
        let staff = portal.member(&admin, "Sam", "sam@site.test", "staff").await;
        let client = portal.member(&admin, "Acme", "acme@site.test", "client").await;

        let request = json!({ "kind": "advance", "amount": 250_000, "purpose": "Cement stock" });
        let (status, _) = portal.post("/api/payments", &staff.token, request.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = portal.post("/api/payments", &client.token, request).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, decided) = portal
            .post(
                &format!("/api/payments/{id}/decision"),
                &staff.token,
                json!({ "decision": "approve", "note": "Release next week" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["status"], "approved");

        let status = portal
            .delete(&format!("/api/payments/{id}"), &client.token)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, second) = portal
            .post(
                "/api/payments",
                &client.token,
                json!({ "kind": "reimbursement", "amount": 1_200, "purpose": "Site fuel" }),
            )
            .await;
        let second_id = second["id"].as_str().unwrap();
        let status = portal
            .delete(&format!("/api/payments/{second_id}"), &client.token)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, page) = portal.get("/api/payments?status=approved", &admin.token).await;
        assert_eq!(page["total"], 1);
        let (_, page) = portal.get("/api/payments", &client.token).await;
        assert_eq!(page["total"], 1);
    }
}
