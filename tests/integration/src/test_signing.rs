//! Signing integration tests.

#[cfg(test)]
mod tests {
    use rustmws_auth::{SignatureAlgorithm, sign};
    use rustmws_client::{MockFixture, MockHarness, MwsClient};
    use rustmws_core::operations::LIST_ORDERS;
    use rustmws_core::keys;

    use crate::{fixed_now, orders_page, test_config};

    #[test]
    fn test_should_match_known_sha1_signature() {
        let signature = sign(
            "POST",
            "mws.amazonservices.com",
            "/Orders/2013-09-01",
            [
                ("Action", "ListOrders"),
                ("Timestamp", "2024-01-01T00:00:00Z"),
                ("AWSAccessKeyId", "AK1"),
            ],
            "SEC1",
            SignatureAlgorithm::HmacSha1,
        )
        .unwrap();
        assert_eq!(signature, "1PAKLZ39k7CF4CHh4u3uk3S7DOM=");
    }

    #[tokio::test]
    async fn test_should_sign_identically_with_unchanged_timestamp() {
        let client = MwsClient::new(test_config("HmacSHA1"))
            .unwrap()
            .with_clock(fixed_now);
        let harness = MockHarness::new().with(MockFixture::inline("page", orders_page(&[], None)));
        let mut request = client
            .request("us", LIST_ORDERS)
            .unwrap()
            .param(keys::ACTION, "ListOrders")
            .with_mock(harness);

        request.execute().await.unwrap();
        request.execute().await.unwrap();
        request.set("CreatedAfter", "2023-12-01T00:00:00Z");
        request.execute().await.unwrap();

        let sent = request.mock_harness().unwrap().requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].parameter(keys::SIGNATURE_METHOD), Some("HmacSHA1"));
        assert_eq!(sent[0].parameter(keys::TIMESTAMP), Some("2024-01-01T00:00:00Z"));
        assert_eq!(sent[0].signature, sent[1].signature);
        assert_ne!(sent[1].signature, sent[2].signature);
    }

    #[tokio::test]
    async fn test_should_produce_signature_the_signer_verifies() {
        let client = MwsClient::new(test_config("HmacSHA256"))
            .unwrap()
            .with_clock(fixed_now);
        let harness = MockHarness::new().with(MockFixture::inline("page", orders_page(&[], None)));
        let mut request = client
            .request("us", LIST_ORDERS)
            .unwrap()
            .param("CreatedAfter", "2023-12-01T00:00:00Z")
            .with_mock(harness);
        request.set_default_marketplace("MarketplaceId.Id.1");
        request.execute().await.unwrap();

        let sent = &request.mock_harness().unwrap().requests()[0];
        assert_eq!(sent.signature, "MJyEVfcrTkm5TekbMp+69lPQjwDSSMItB8W+AxRTadU=");
        assert!(
            rustmws_auth::verify(
                sent.method,
                &sent.host,
                &sent.path,
                sent.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                crate::US_SECRET,
                SignatureAlgorithm::HmacSha256,
                &sent.signature,
            )
            .unwrap()
        );
    }
}
