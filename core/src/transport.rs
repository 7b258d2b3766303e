//! Default blocking transport backed by `ureq`.

use crate::error::BoxError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Executes `HttpRequest`s with a shared `ureq::Agent`.
///
/// Response bodies are read as bytes and never decoded here.
///
/// The agent has ureq's status-code-as-error behavior disabled, so 4xx/5xx
/// responses come back as data and the client decides what they mean. No
/// retry or timeout policy is added here; configure one on the agent and
/// pass it to `UreqTransport::with_agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let url = request.full_url();

        let mut response = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(&url), &request.headers).call()?,
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(&url), &request.headers);
                match request.body.as_deref() {
                    Some(body) => builder.send(body)?,
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}
