use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{GraphStore, Query, StoreError};

const DQL_CONTENT_TYPE: &str = "application/dql";

pub struct DgraphHttpStore {
    agent: ureq::Agent,
    query_url: String,
}

#[derive(Debug, Deserialize)]
struct DgraphResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<DgraphError>,
}

#[derive(Debug, Deserialize)]
struct DgraphError {
    #[serde(default)]
    message: String,
}

impl DgraphHttpStore {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            query_url: format!("{}/query", endpoint.trim().trim_end_matches('/')),
        }
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

impl GraphStore for DgraphHttpStore {
    fn query_raw(&self, query: &Query) -> Result<Vec<u8>, StoreError> {
        let text = query.render();
        tracing::debug!(url = %self.query_url, query = %text, "sending DQL query");

        let mut response = self
            .agent
            .post(&self.query_url)
            .header("Content-Type", DQL_CONTENT_TYPE)
            .send(text.as_str())?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_vec()?;

        extract_data(status, &body)
    }
}

fn extract_data(status: u16, body: &[u8]) -> Result<Vec<u8>, StoreError> {
    let success = (200..300).contains(&status);
    let parsed: DgraphResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(_) if !success => {
            return Err(StoreError::Remote(format!(
                "status {status}: {}",
                String::from_utf8_lossy(body).trim()
            )));
        }
        Err(err) => return Err(err.into()),
    };

    if !parsed.errors.is_empty() {
        let messages = parsed
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StoreError::Remote(messages));
    }
    if !success {
        return Err(StoreError::Remote(format!("status {status}")));
    }

    let data = parsed.data.unwrap_or_else(|| Value::Object(Default::default()));
    Ok(serde_json::to_vec(&data)?)
}
