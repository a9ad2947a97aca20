//! HTTP transport integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rustmws_client::{FORM_CONTENT_TYPE, MwsClient, MwsError, MwsResult, ParsedPage, RawResponse, xml};
    use rustmws_core::operations::{GET_ORDERS_SERVICE_STATUS, LIST_ORDERS};
    use rustmws_core::{EngineConfig, keys};
    use tokio_util::sync::CancellationToken;

    use crate::{
        CannedResponse, TestServer, closed_endpoint, error_body, fixed_now, orders_page,
        test_config, us_store,
    };

    fn client_for(endpoint: String) -> MwsClient {
        let config = EngineConfig {
            stores: vec![us_store(Some(endpoint))],
            ..test_config("HmacSHA256")
        };
        MwsClient::new(config).unwrap().with_clock(fixed_now)
    }

    fn parse_orders(response: &RawResponse) -> MwsResult<ParsedPage<String>> {
        Ok(ParsedPage::new(
            xml::element_texts(&response.body, "AmazonOrderId")?,
            xml::next_token(&response.body)?,
        ))
    }

    #[tokio::test]
    async fn test_should_post_signed_form_body() {
        let server = TestServer::start(vec![
            CannedResponse::ok("<GetServiceStatusResponse><Status>GREEN</Status></GetServiceStatusResponse>")
                .header("x-mws-request-id", "req-42")
                .header("x-mws-quota-max", "2.0")
                .header("x-mws-quota-remaining", "1.0")
                .header("x-mws-quota-resetsOn", "2024-01-01T00:05:00.000Z"),
        ])
        .await
        .unwrap();
        let client = client_for(server.endpoint());
        let mut request = client.request("us", GET_ORDERS_SERVICE_STATUS).unwrap();

        let response = request.execute().await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            xml::element_text(&response.body, "Status").unwrap().as_deref(),
            Some("GREEN")
        );
        assert_eq!(response.metadata.request_id.as_deref(), Some("req-42"));
        assert_eq!(response.metadata.quota_remaining, Some(1.0));
        assert_eq!(
            response.metadata.quota_resets_on.as_deref(),
            Some("2024-01-01T00:05:00.000Z")
        );

        let received = server.requests();
        assert_eq!(received.len(), 1);
        let call = &received[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.path, "/Orders/2013-09-01");
        assert_eq!(call.content_type.as_deref(), Some(FORM_CONTENT_TYPE));
        assert_eq!(call.user_agent.as_deref(), Some("rustmws-it/1.0 (Language=Rust)"));
        assert!(call.signature_valid);
        assert_eq!(call.field(keys::ACTION), Some("GetServiceStatus"));
        assert_eq!(call.field(keys::SELLER_ID), Some("M1"));
        assert_eq!(call.field(keys::TIMESTAMP), Some("2024-01-01T00:00:00Z"));
        assert_eq!(call.form.last().map(|(k, _)| k.as_str()), Some(keys::SIGNATURE));
        assert!(call.body.contains("Timestamp=2024-01-01T00%3A00%3A00Z"));
    }

    #[tokio::test]
    async fn test_should_paginate_over_http() {
        let server = TestServer::start(vec![
            CannedResponse::ok(orders_page(&["order-A"], Some("T1"))),
            CannedResponse::ok(orders_page(&["order-B"], None)),
        ])
        .await
        .unwrap();
        let client = client_for(server.endpoint());
        let mut request = client
            .request("us", LIST_ORDERS)
            .unwrap()
            .param("CreatedAfter", "2023-12-01T00:00:00Z");

        let result = request.paginate(parse_orders).await.unwrap();
        assert_eq!(result.items, vec!["order-A", "order-B"]);

        let received = server.requests();
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|r| r.signature_valid));
        assert_eq!(received[1].field(keys::ACTION), Some("ListOrdersByNextToken"));
        assert_eq!(received[1].field("CreatedAfter"), None);
    }

    #[tokio::test]
    async fn test_should_map_server_error_to_remote_request() {
        let server = TestServer::start(vec![CannedResponse::status(
            500,
            error_body("InternalError", "We encountered an internal error"),
        )])
        .await
        .unwrap();
        let client = client_for(server.endpoint());
        let mut request = client.request("us", GET_ORDERS_SERVICE_STATUS).unwrap();

        let err = request.execute().await.unwrap_err();
        let MwsError::RemoteRequest { status, body, fault } = err else {
            panic!("expected a remote request error");
        };
        assert_eq!(status, 500);
        assert!(body.contains("InternalError"));
        let fault = fault.unwrap();
        assert_eq!(fault.code, "InternalError");
        assert_eq!(fault.request_id.as_deref(), Some("it-error"));
    }

    #[tokio::test]
    async fn test_should_reject_request_signed_with_wrong_secret() {
        let server = TestServer::start(vec![CannedResponse::ok("<Ok/>")]).await.unwrap();
        let mut store = us_store(Some(server.endpoint()));
        store.secret_key = "WRONG".to_owned();
        let config = EngineConfig {
            stores: vec![store],
            ..test_config("HmacSHA1")
        };
        let client = MwsClient::new(config).unwrap();
        let mut request = client.request("us", GET_ORDERS_SERVICE_STATUS).unwrap();

        let err = request.execute().await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(
            err.fault().map(|f| f.code.as_str()),
            Some("SignatureDoesNotMatch")
        );
        assert!(!server.requests()[0].signature_valid);
    }

    #[tokio::test]
    async fn test_should_surface_transport_error() {
        let client = client_for(closed_endpoint().await.unwrap());
        let mut request = client.request("us", GET_ORDERS_SERVICE_STATUS).unwrap();

        let err = request.execute().await.unwrap_err();
        assert!(matches!(err, MwsError::Transport(_)));
    }

    #[tokio::test]
    async fn test_should_cancel_in_flight_call() {
        let server = TestServer::start(vec![
            CannedResponse::ok("<Ok/>").delayed(Duration::from_secs(30)),
        ])
        .await
        .unwrap();
        let client = client_for(server.endpoint());
        let cancel = CancellationToken::new();
        let mut request = client
            .request("us", GET_ORDERS_SERVICE_STATUS)
            .unwrap()
            .with_cancellation(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = request.execute().await.unwrap_err();
        assert!(matches!(err, MwsError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
