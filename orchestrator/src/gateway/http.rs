use async_trait::async_trait;
use callops_protocol::{
    AgentConfiguration, CallId, CallRecord, CallSessionRequest, CallSessionTicket,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::CallGateway;
use crate::{
    config::GatewayConfig,
    error::{GatewayError, GatewayResult},
};

/// [`CallGateway`] backed by the backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Reuse an existing client, e.g. one with custom TLS settings.
    pub fn with_client(client: Client, base_url: Url) -> GatewayResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> GatewayResult<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl CallGateway for HttpGateway {
    async fn create_call_session(
        &self,
        request: &CallSessionRequest,
    ) -> GatewayResult<CallSessionTicket> {
        let url = self.endpoint(&["calls", "trigger"])?;
        debug!(%url, driver = %request.driver_name, load = %request.load_number, "POST");
        let response = self.client.post(url).json(request).send().await?;
        decode(response).await
    }

    async fn get_call_record(&self, id: &CallId) -> GatewayResult<CallRecord> {
        self.get_json(&["calls", id.as_str()]).await
    }

    async fn list_call_records(&self) -> GatewayResult<Vec<CallRecord>> {
        self.get_json(&["calls"]).await
    }

    async fn list_configurations(&self) -> GatewayResult<Vec<AgentConfiguration>> {
        self.get_json(&["configurations"]).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let detail = error_detail(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
        return Err(GatewayError::status(status.as_u16(), detail));
    }

    serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Pull an operator-facing reason out of an error body: `detail` first, then `message`.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let pick = |key: &str| match value.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };
    pick("detail").or_else(|| pick("message"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&GatewayConfig {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let gw = gateway("http://localhost:8000");
        assert_eq!(
            gw.endpoint(&["calls", "abc"]).unwrap().as_str(),
            "http://localhost:8000/api/calls/abc"
        );

        let gw = gateway("http://backend/prefix/");
        assert_eq!(
            gw.endpoint(&["configurations"]).unwrap().as_str(),
            "http://backend/prefix/api/configurations"
        );
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let gw = gateway("http://localhost:8000");
        assert_eq!(
            gw.endpoint(&["calls", "a/b"]).unwrap().as_str(),
            "http://localhost:8000/api/calls/a%2Fb"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let err = HttpGateway::new(&GatewayConfig {
            base_url: "mailto:ops@example.com".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUrl(_)));
    }

    #[test]
    fn test_error_detail_precedence() {
        assert_eq!(
            error_detail(br#"{"detail": "Configuration not found", "message": "x"}"#).as_deref(),
            Some("Configuration not found")
        );
        assert_eq!(
            error_detail(br#"{"message": "Retell unavailable"}"#).as_deref(),
            Some("Retell unavailable")
        );
        assert_eq!(
            error_detail(br#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#)
                .as_deref(),
            Some(r#"[{"loc":["body"],"msg":"field required"}]"#)
        );
        assert_eq!(error_detail(b"<html>Bad Gateway</html>"), None);
        assert_eq!(error_detail(br#"{"detail": null}"#), None);
    }
}
