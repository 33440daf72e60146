//! End-to-end redemption flow through the storefront.

#![allow(clippy::unwrap_used)]

use eventconnect_core::flow::gate::GATE_UNAVAILABLE;
use eventconnect_core::flow::verification::{CODE_SENT, CODE_VERIFIED};
use eventconnect_core::types::business_card::CARD_SAVED;
use eventconnect_integration_tests::{
    MockBackend, PDF_BYTES, VALID_EVENT_CODE, VALID_OTP, client, location, spawn_storefront,
    spawn_storefront_at, unreachable_url,
};
use reqwest::StatusCode;
use url::Url;

/// The pass out of a `/verify?pass=...` redirect.
fn pass_from(location: &str) -> String {
    let url = Url::parse("http://storefront").unwrap().join(location).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "pass")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

/// The one-shot download link on the confirmation page.
fn download_link(html: &str) -> String {
    let start = html.find("/card/pdf/").unwrap();
    let rest = &html[start..];
    let end = rest.find('"').unwrap();
    rest[..end].to_owned()
}

/// Redeem the valid event code and return the pass.
async fn redeemed(http: &reqwest::Client, base: &str) -> String {
    let response = http
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", VALID_EVENT_CODE)])
        .send()
        .await
        .unwrap();
    pass_from(&location(&response))
}

/// Redeem, request a code for `a@b.com` and verify it.
async fn verified(http: &reqwest::Client, base: &str) -> String {
    let pass = redeemed(http, base).await;
    http.post(format!("{base}/verify/email"))
        .form(&[("pass", pass.as_str()), ("email", "a@b.com")])
        .send()
        .await
        .unwrap();
    let html = http
        .post(format!("{base}/verify/code"))
        .form(&[("pass", pass.as_str()), ("code", VALID_OTP)])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(CODE_VERIFIED));
    pass
}

/// A complete card form with the given phone number.
fn card_form<'a>(pass: &'a str, phone: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("pass", pass),
        ("fullName", "Ada Lovelace"),
        ("title", "Engineer"),
        ("phone", phone),
        ("companyName", "Analytical Co"),
        ("website", ""),
        ("address", "12 Engine Row"),
    ]
}

#[tokio::test]
async fn test_full_redemption_flow() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();

    // Gate
    let response = http
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", VALID_EVENT_CODE)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("/verify?pass="));
    let pass = pass_from(&target);

    // Email step
    let html = http
        .post(format!("{base}/verify/email"))
        .form(&[("pass", pass.as_str()), ("email", "a@b.com")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(CODE_SENT));
    assert!(html.contains("Resend code in"));

    // Code step
    let html = http
        .post(format!("{base}/verify/code"))
        .form(&[("pass", pass.as_str()), ("code", VALID_OTP)])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(CODE_VERIFIED));
    assert!(html.contains("value=\"a@b.com\""));

    // Card
    let response = http
        .post(format!("{base}/card"))
        .form(&[
            ("pass", pass.as_str()),
            ("fullName", "Ada Lovelace"),
            ("title", "Engineer"),
            ("phone", "1234567890"),
            ("companyName", "Analytical Co"),
            ("website", ""),
            ("address", "12 Engine Row"),
            ("certName", "PMP"),
            ("certIssuer", "PMI"),
            ("certYear", "2020"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains(CARD_SAVED));

    let saved = backend.journal.matching("POST", "/api/business-cards");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].body["email"], "a@b.com");
    assert_eq!(saved[0].body["redeemCode"], VALID_EVENT_CODE);
    assert_eq!(saved[0].body["certifications"][0]["name"], "PMP");

    // The PDF can be fetched exactly once.
    let link = download_link(&html);
    let response = http.get(format!("{base}{link}")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert!(
        response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("business-card-SUMMIT24.pdf")
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), PDF_BYTES);

    let response = http.get(format!("{base}{link}")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The flow is closed, so its pass now leads back to the gate.
    let response = http
        .get(format!("{base}/verify"))
        .query(&[("pass", pass.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?expired=true");
}

#[tokio::test]
async fn test_gate_rejects_unknown_code() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;

    let response = client()
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", "NOPE99")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Invalid event code"));
    assert_eq!(
        backend.journal.matching("POST", "/api/admin/validate-coupon").len(),
        1
    );
}

#[tokio::test]
async fn test_wrong_code_keeps_visitor_on_code_step() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();

    let response = http
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", VALID_EVENT_CODE)])
        .send()
        .await
        .unwrap();
    let pass = pass_from(&location(&response));

    http.post(format!("{base}/verify/email"))
        .form(&[("pass", pass.as_str()), ("email", "a@b.com")])
        .send()
        .await
        .unwrap();

    let html = http
        .post(format!("{base}/verify/code"))
        .form(&[("pass", pass.as_str()), ("code", "000000")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!html.contains(CODE_VERIFIED));
    assert!(!html.contains("name=\"fullName\""));

    // No card can be saved for an unverified flow.
    http.post(format!("{base}/card"))
        .form(&[("pass", pass.as_str()), ("fullName", "Ada Lovelace")])
        .send()
        .await
        .unwrap();
    assert!(backend.journal.matching("POST", "/api/business-cards").is_empty());
}

#[tokio::test]
async fn test_forged_pass_goes_back_to_gate() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;

    let response = client()
        .get(format!("{base}/verify?pass=forged.token"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?expired=true");
}

#[tokio::test]
async fn test_rejected_code_issues_no_pass() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;

    let response = client()
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", "NOPE99")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("location").is_none());
    assert!(!response.text().await.unwrap().contains("pass="));
    assert!(backend.journal.matching("POST", "/api/tokens/generate").is_empty());
}

#[tokio::test]
async fn test_gate_reports_unreachable_backend() {
    let base = spawn_storefront_at(unreachable_url().await).await;

    let response = client()
        .post(format!("{base}/redeem"))
        .form(&[("eventCode", VALID_EVENT_CODE)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("location").is_none());
    let html = response.text().await.unwrap();
    assert!(html.contains(GATE_UNAVAILABLE));
    assert!(!html.contains("Invalid event code"));
}

#[tokio::test]
async fn test_resend_refused_during_cooldown() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();
    let pass = redeemed(&http, &base).await;

    http.post(format!("{base}/verify/email"))
        .form(&[("pass", pass.as_str()), ("email", "a@b.com")])
        .send()
        .await
        .unwrap();

    let html = http
        .post(format!("{base}/verify/resend"))
        .form(&[("pass", pass.as_str())])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Resend code in"));
    assert_eq!(backend.journal.matching("POST", "/api/tokens/generate").len(), 1);
}

#[tokio::test]
async fn test_back_returns_to_email_step() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();
    let pass = redeemed(&http, &base).await;

    let html = http
        .post(format!("{base}/verify/email"))
        .form(&[("pass", pass.as_str()), ("email", "a@b.com")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("name=\"code\""));

    let html = http
        .post(format!("{base}/verify/back"))
        .form(&[("pass", pass.as_str())])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("name=\"email\""));
    assert!(!html.contains("name=\"code\""));
    assert!(!html.contains("Resend code"));

    // A code for the abandoned address no longer verifies anything.
    let html = http
        .post(format!("{base}/verify/code"))
        .form(&[("pass", pass.as_str()), ("code", VALID_OTP)])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!html.contains(CODE_VERIFIED));
    assert!(backend.journal.matching("POST", "/api/tokens/verify").is_empty());
}

#[tokio::test]
async fn test_short_phone_blocks_save() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();
    let pass = verified(&http, &base).await;

    let html = http
        .post(format!("{base}/card"))
        .form(&card_form(&pass, "12345"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Invalid phone number"));
    assert!(html.contains("value=\"12345\""));
    assert!(backend.journal.matching("POST", "/api/business-cards").is_empty());

    let html = http
        .post(format!("{base}/card"))
        .form(&card_form(&pass, "1234567890"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(CARD_SAVED));
    let saved = backend.journal.matching("POST", "/api/business-cards");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].body["phone"], "1234567890");
}

#[tokio::test]
async fn test_one_pass_saves_one_card() {
    let backend = MockBackend::start().await;
    let base = spawn_storefront(&backend).await;
    let http = client();
    let pass = verified(&http, &base).await;

    let form = card_form(&pass, "1234567890");
    let (first, second) = tokio::join!(
        http.post(format!("{base}/card")).form(&form).send(),
        http.post(format!("{base}/card")).form(&form).send(),
    );
    let pages = [
        first.unwrap().text().await.unwrap(),
        second.unwrap().text().await.unwrap(),
    ];

    assert_eq!(backend.journal.matching("POST", "/api/business-cards").len(), 1);
    assert_eq!(pages.iter().filter(|html| html.contains(CARD_SAVED)).count(), 1);
}
