use crate::config::Config;
use crate::contracts::{
    CampaignMailer, ComplaintEligibility, OptoutKeyResponse, OptoutPageResponse, OptoutType,
    SimpleTokenResponse, SubmitOptoutRequest,
};
use crate::error::{ResolveError, TransportError};
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Remote operations of the opt-out API.
#[async_trait]
pub trait OptoutApi: Send + Sync {
    /// Resolve an opt-out key into its campaign mailer.
    async fn verify_key(&self, key: &str) -> Result<CampaignMailer, ResolveError>;

    /// Fetch the raw page customisation of a campaign.
    async fn fetch_page_data(
        &self,
        campaign_id: u64,
        optout_type: OptoutType,
    ) -> Result<OptoutPageResponse, TransportError>;

    async fn submit_optout(
        &self,
        campaign_id: u64,
        request: &SubmitOptoutRequest,
    ) -> Result<(), TransportError>;

    async fn check_complaint_eligibility(
        &self,
        campaign_id: u64,
        email: &str,
    ) -> Result<ComplaintEligibility, TransportError>;

    async fn simple_token(&self) -> Result<String, TransportError>;
}

/// [`OptoutApi`] over HTTP. Every request reads the base URL, bearer token and
/// cache flag from the shared [`Session`].
pub struct HttpOptoutApi {
    client: Client,
    session: Arc<Session>,
}

impl HttpOptoutApi {
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.api.user_agent.as_str())
            .build()?;

        Ok(Self { client, session })
    }

    pub fn with_client(client: Client, session: Arc<Session>) -> Self {
        Self { client, session }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.endpoint().base_url(), path)
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder;
        if self.session.no_cache() {
            builder = builder.query(&[("noCache", "1")]);
        }
        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let response = self.prepare(builder).send().await.map_err(|e| {
            error!("Request error: {e}");
            TransportError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.is_server_error() {
            error!("{} responded with {}", response.url(), status);
        } else {
            debug!("{} responded with {}", response.url(), status);
        }
        Err(TransportError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, TransportError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl OptoutApi for HttpOptoutApi {
    async fn verify_key(&self, key: &str) -> Result<CampaignMailer, ResolveError> {
        let request = self
            .client
            .post(self.url("/auth/legacy/optout-key"))
            .json(&serde_json::json!({ "key": key }));

        let response: OptoutKeyResponse = self.json(request).await?;
        Ok(CampaignMailer::from_response(response, key))
    }

    async fn fetch_page_data(
        &self,
        campaign_id: u64,
        optout_type: OptoutType,
    ) -> Result<OptoutPageResponse, TransportError> {
        debug!("Fetching {optout_type} page data for campaign {campaign_id}");
        let request = self
            .client
            .get(self.url(&format!("/campaigns/{campaign_id}/optout-page")));
        self.json(request).await
    }

    async fn submit_optout(
        &self,
        campaign_id: u64,
        request: &SubmitOptoutRequest,
    ) -> Result<(), TransportError> {
        let builder = self
            .client
            .post(self.url(&format!("/campaigns/{campaign_id}/optout-emails")))
            .json(request);
        self.send(builder).await?;
        Ok(())
    }

    async fn check_complaint_eligibility(
        &self,
        campaign_id: u64,
        email: &str,
    ) -> Result<ComplaintEligibility, TransportError> {
        let request = self
            .client
            .get(self.url(&format!(
                "/campaigns/{campaign_id}/complaints/eligibility"
            )))
            .query(&[("email", email)]);
        self.json(request).await
    }

    async fn simple_token(&self) -> Result<String, TransportError> {
        let request = self.client.get(self.url("/legacy/simple-token"));
        let response: SimpleTokenResponse = self.json(request).await?;
        Ok(response.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ApiEndpoint;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(primary: &str, fallback: &str) -> (HttpOptoutApi, Arc<Session>) {
        let session = Arc::new(Session::new(ApiEndpoint::new(primary, fallback)));
        let api = HttpOptoutApi::new(&Config::default(), session.clone()).unwrap();
        (api, session)
    }

    fn key_response() -> serde_json::Value {
        serde_json::json!({
            "token": "jwt-123",
            "campaign_id": 11,
            "mailer_id": 22,
            "cma_id": 33,
            "optout_ad_ratio": 0.5,
            "optout_ad_redirect_url": "https://ads.example.com",
            "source_client_id": 44,
            "optout_type": "email"
        })
    }

    #[tokio::test]
    async fn test_verify_key_maps_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/legacy/optout-key"))
            .and(body_json(serde_json::json!({ "key": "o-abc-123-456" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(key_response()))
            .expect(1)
            .mount(&server)
            .await;

        let (api, _) = api_for(&server.uri(), "http://127.0.0.1:9");
        let mailer = api.verify_key("o-abc-123-456").await.unwrap();

        assert_eq!(mailer.token, "jwt-123");
        assert_eq!(mailer.campaign_id, 11);
        assert_eq!(mailer.optout_ad_redirect_url.as_deref(), Some("https://ads.example.com"));
        assert_eq!(mailer.legacy_key, "o-abc-123-456");
    }

    #[tokio::test]
    async fn test_verify_key_classifies_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/legacy/optout-key"))
            .and(body_json(serde_json::json!({ "key": "o-gone-1-2" })))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/legacy/optout-key"))
            .and(body_json(serde_json::json!({ "key": "o-down-1-2" })))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (api, _) = api_for(&server.uri(), "http://127.0.0.1:9");

        assert!(matches!(
            api.verify_key("o-gone-1-2").await,
            Err(ResolveError::NotFound(_))
        ));
        assert!(matches!(
            api.verify_key("o-down-1-2").await,
            Err(ResolveError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_requests_carry_session_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/campaigns/11/optout-emails"))
            .and(header("authorization", "Bearer jwt-123"))
            .and(query_param("noCache", "1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let (api, session) = api_for(&server.uri(), "http://127.0.0.1:9");
        session.set_access_token("jwt-123");
        session.set_no_cache(true);

        let request = SubmitOptoutRequest {
            mailer_id: 22,
            email: Some("user@example.com".to_string()),
            sms: None,
            cma_id: 33,
            preference: vec![],
            source_client_id: 44,
            was_redirected_to_ads: false,
        };
        api.submit_optout(11, &request).await.unwrap();
    }

    #[tokio::test]
    async fn test_fallback_endpoint_receives_calls() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/legacy/simple-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "abc"})))
            .expect(1)
            .mount(&fallback)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&primary)
            .await;

        let (api, session) = api_for(&primary.uri(), &fallback.uri());
        session.endpoint().engage_fallback();

        assert_eq!(api.simple_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_complaint_eligibility() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/campaigns/5/complaints/eligibility"))
            .and(query_param("email", "user@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "eligible": false,
                "reason": "Email address not found"
            })))
            .mount(&server)
            .await;

        let (api, _) = api_for(&server.uri(), "http://127.0.0.1:9");
        let eligibility = api
            .check_complaint_eligibility(5, "user@example.com")
            .await
            .unwrap();

        assert!(!eligibility.eligible);
        assert_eq!(eligibility.reason.as_deref(), Some("Email address not found"));
        assert_eq!(eligibility.token, None);
    }

    #[tokio::test]
    async fn test_page_data_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/campaigns/9/optout-page"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (api, _) = api_for(&server.uri(), "http://127.0.0.1:9");
        let err = api.fetch_page_data(9, OptoutType::Email).await.unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert!(err.is_client_error());
    }
}
