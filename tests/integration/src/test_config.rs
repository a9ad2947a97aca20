//! Configuration integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rustmws_client::{MockFixture, MockHarness, MwsClient, MwsError};
    use rustmws_core::operations::GET_REPORT_LIST;
    use rustmws_core::{EngineConfig, ThrottleCategory, ThrottleScope, keys};

    use crate::{fixed_now, init_tracing};

    const CONFIG: &str = r#"{
        "stores": [
            {
                "name": "us",
                "merchantId": "M1",
                "accessKeyId": "AK1",
                "secretKey": "SEC1",
                "marketplaceId": "ATVPDKIKX0DER"
            },
            {
                "name": "uk",
                "merchantId": "M2",
                "accessKeyId": "AK2",
                "secretKey": "SEC2",
                "marketplaceId": "A1F83G8C2ARO7P",
                "endpoint": "https://mws-eu.amazonservices.com/",
                "authToken": "amzn.mws.4ea38b7b"
            }
        ],
        "signatureAlgorithm": "HmacSHA1",
        "throttleScope": "shared",
        "throttleOverrides": {
            "report-list": { "maxTokens": 1, "refillWindowSeconds": 90 }
        }
    }"#;

    #[tokio::test]
    async fn test_should_build_client_from_config_file() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mws.json");
        std::fs::write(&path, CONFIG).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.throttle_scope, ThrottleScope::Shared);
        let client = MwsClient::new(config).unwrap().with_clock(fixed_now);

        let mut request = client
            .request("uk", GET_REPORT_LIST)
            .unwrap()
            .with_mock(MockHarness::new().with(MockFixture::inline("reports", "<GetReportListResponse/>")));
        request.execute().await.unwrap();

        let sent = &request.mock_harness().unwrap().requests()[0];
        assert_eq!(sent.host, "mws-eu.amazonservices.com");
        assert_eq!(sent.path, "/");
        assert_eq!(sent.parameter(keys::MERCHANT), Some("M2"));
        assert_eq!(sent.parameter(keys::AUTH_TOKEN), Some("amzn.mws.4ea38b7b"));
        assert_eq!(sent.parameter(keys::SIGNATURE_METHOD), Some("HmacSHA1"));
        assert_eq!(sent.parameter(keys::VERSION), Some("2009-01-01"));
        assert_eq!(
            client
                .shared_throttle()
                .tokens_remaining(ThrottleCategory::ReportList)
                .await,
            0
        );
    }

    #[test]
    fn test_should_build_client_from_environment() {
        init_tracing();
        let env = HashMap::from([
            ("MWS_STORE", "main"),
            ("MWS_MERCHANT_ID", "M9"),
            ("MWS_ACCESS_KEY_ID", "AK9"),
            ("MWS_SECRET_KEY", "SEC9"),
            ("MWS_MARKETPLACE_ID", "A2EUQ1WTGCTBG2"),
            ("MWS_ENDPOINT", "https://mws.amazonservices.ca"),
        ]);
        let config =
            EngineConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned())).unwrap();
        let client = MwsClient::new(config).unwrap();

        let credential = client.credential("main").unwrap();
        assert_eq!(credential.merchant_id, "M9");
        assert_eq!(credential.endpoint, "https://mws.amazonservices.ca");
        assert!(matches!(
            client.credential("other"),
            Err(MwsError::Configuration(msg)) if msg == "store not found: other"
        ));
    }

    #[test]
    fn test_should_reject_invalid_configuration() {
        init_tracing();
        let invalid = CONFIG.replace("\"maxTokens\": 1", "\"maxTokens\": 0");
        assert!(EngineConfig::from_json_str(&invalid).is_err());

        let unsupported = CONFIG.replace("HmacSHA1", "HmacSHA512");
        let config = EngineConfig::from_json_str(&unsupported).unwrap();
        assert!(matches!(
            MwsClient::new(config),
            Err(MwsError::UnsupportedAlgorithm(name)) if name == "HmacSHA512"
        ));
    }
}
