use crate::error::ApiError;
use async_trait::async_trait;
use configuration::SourceConfig;
use core_types::FundDocument;

pub mod error;

/// The abstract source of NAV documents.
/// The loader depends on this trait only, so tests and alternative feeds can be
/// swapped in for the HTTP client.
#[async_trait]
pub trait NavSource: Send + Sync {
    /// Fetches the full NAV history of one scheme.
    async fn fetch_scheme(&self, scheme_code: i64) -> Result<FundDocument, ApiError>;
}

/// HTTP client for mfapi.in style endpoints (`GET {base_url}/{scheme_code}`).
#[derive(Clone)]
pub struct MfApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl MfApiClient {
    pub fn new(config: &SourceConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn scheme_url(&self, scheme_code: i64) -> String {
        format!("{}/{}", self.base_url, scheme_code)
    }
}

#[async_trait]
impl NavSource for MfApiClient {
    async fn fetch_scheme(&self, scheme_code: i64) -> Result<FundDocument, ApiError> {
        let url = self.scheme_url(scheme_code);
        tracing::debug!(%url, "Fetching NAV history");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let document: FundDocument = serde_json::from_str(&body)?;

        tracing::info!(
            scheme_code = document.meta.scheme_code,
            records = document.data.len(),
            "Fetched NAV history"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MfApiClient {
        let config = SourceConfig {
            base_url: format!("{}/mf/", server.uri()),
            ..SourceConfig::default()
        };
        MfApiClient::new(&config).unwrap()
    }

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "meta": {
                "fund_house": "Axis Mutual Fund",
                "scheme_type": "Open Ended Schemes",
                "scheme_category": "Equity Scheme - Large Cap Fund",
                "scheme_code": 120465,
                "scheme_name": "Axis Bluechip Fund - Direct Plan - Growth"
            },
            "data": [
                {"date": "02-01-2023", "nav": "10.75"},
                {"date": "01-01-2023", "nav": "10.5000"}
            ],
            "status": "SUCCESS"
        })
    }

    #[tokio::test]
    async fn fetches_and_decodes_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/120465"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let document = client_for(&server).fetch_scheme(120465).await.unwrap();
        assert_eq!(document.meta.fund_house, "Axis Mutual Fund");
        assert_eq!(document.data.len(), 2);
        assert_eq!(document.data[1].nav, "10.5000");
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_scheme(1).await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_json_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"meta\": "))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_scheme(2).await.unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
