//! TicketValidationClient against a mock central authentication service.

mod common;

use std::time::Duration;

use cas_proxy_client::services::cas::{
    TicketValidationClient, TicketValidator, ValidationError, ValidationRequest,
};
use common::{CasMock, SERVICE, TIMEOUT, failure_xml, fetcher, success_xml};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn request(cas: &CasMock, ticket: &str) -> ValidationRequest {
    ValidationRequest {
        endpoint: cas.validate_url(),
        ticket: ticket.to_string(),
        service: SERVICE.to_string(),
        renew: false,
        proxy_callback_url: None,
        timeout: TIMEOUT,
    }
}

#[tokio::test]
async fn two_line_yes_yields_receipt_for_queried_endpoint() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-1", "yes\nalice\n", 1).await;

    let client = TicketValidationClient::new(fetcher());
    let receipt = client.validate(&request(&cas, "ST-1")).await.unwrap();

    assert_eq!(receipt.username(), "alice");
    assert_eq!(receipt.validation_endpoint(), cas.validate_url());
    assert!(receipt.proxy_chain().is_empty());
    assert!(!receipt.primary_authentication());
}

#[tokio::test]
async fn two_line_no_is_failure() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-2", "no\n\n", 1).await;

    let client = TicketValidationClient::new(fetcher());
    let err = client.validate(&request(&cas, "ST-2")).await.unwrap_err();

    assert!(matches!(err, ValidationError::Rejected { .. }));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn sends_service_renew_and_callback() {
    let cas = CasMock::start().await;
    Mock::given(method("GET"))
        .and(path(common::VALIDATE_PATH))
        .and(query_param("ticket", "ST-3"))
        .and(query_param("service", SERVICE))
        .and(query_param("renew", "true"))
        .and(query_param("pgtUrl", "https://app.example/cas/proxy-callback"))
        .respond_with(ResponseTemplate::new(200).set_body_string(success_xml(
            "alice",
            Some("PGTIOU-3"),
            &[],
        )))
        .expect(1)
        .mount(&cas.server)
        .await;

    let client = TicketValidationClient::new(fetcher());
    let receipt = client
        .validate(&ValidationRequest {
            renew: true,
            proxy_callback_url: Some("https://app.example/cas/proxy-callback".into()),
            ..request(&cas, "ST-3")
        })
        .await
        .unwrap();

    assert!(receipt.primary_authentication());
    assert_eq!(receipt.pgt_iou(), Some("PGTIOU-3"));
}

#[tokio::test]
async fn structured_success_keeps_proxy_order() {
    let cas = CasMock::start().await;
    cas.on_validate(
        "PT-4",
        success_xml("alice", None, &["https://b.example/cb", "https://a.example/cb"]),
        1,
    )
    .await;

    let client = TicketValidationClient::new(fetcher());
    let receipt = client.validate(&request(&cas, "PT-4")).await.unwrap();

    assert_eq!(
        receipt.proxy_chain(),
        ["https://b.example/cb".to_string(), "https://a.example/cb".to_string()]
    );
    assert_eq!(receipt.proxying_service(), Some("https://b.example/cb"));
}

#[tokio::test]
async fn structured_failure_carries_code() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-5", failure_xml("INVALID_TICKET"), 1).await;

    let client = TicketValidationClient::new(fetcher());
    let err = client.validate(&request(&cas, "ST-5")).await.unwrap_err();

    match err {
        ValidationError::Rejected { code, .. } => assert_eq!(code.as_deref(), Some("INVALID_TICKET")),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_is_transport_failure() {
    let cas = CasMock::start().await;
    cas.on_validate_status("ST-6", 500).await;

    let client = TicketValidationClient::new(fetcher());
    let err = client.validate(&request(&cas, "ST-6")).await.unwrap_err();

    assert!(matches!(err, ValidationError::Status(500)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn slow_server_is_timeout_not_unauthenticated() {
    let cas = CasMock::start().await;
    Mock::given(method("GET"))
        .and(path(common::VALIDATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("yes\nalice\n")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&cas.server)
        .await;

    let client = TicketValidationClient::new(fetcher());
    let err = client
        .validate(&ValidationRequest {
            timeout: Duration::from_millis(100),
            ..request(&cas, "ST-7")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ValidationError::Timeout(_)), "got {err:?}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn unreachable_server_is_transport_failure() {
    let cas = CasMock::start().await;
    let endpoint = cas.validate_url();
    drop(cas);

    let client = TicketValidationClient::new(fetcher());
    let err = client
        .validate(&ValidationRequest {
            endpoint,
            ticket: "ST-8".into(),
            service: SERVICE.into(),
            renew: false,
            proxy_callback_url: None,
            timeout: TIMEOUT,
        })
        .await
        .unwrap_err();

    assert!(err.is_transport(), "got {err:?}");
}

#[tokio::test]
async fn html_error_page_is_malformed() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-9", "Service temporarily unavailable", 1).await;

    let client = TicketValidationClient::new(fetcher());
    let err = client.validate(&request(&cas, "ST-9")).await.unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
}

#[tokio::test]
async fn renewed_yet_proxied_response_is_rejected() {
    let cas = CasMock::start().await;
    cas.on_validate("PT-10", success_xml("alice", None, &["https://p.example/cb"]), 1)
        .await;

    let client = TicketValidationClient::new(fetcher());
    let err = client
        .validate(&ValidationRequest {
            renew: true,
            ..request(&cas, "PT-10")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::Inconsistent(_)));
}
