//! Talking to the remote aggregator.
//!
//! The aggregator is a dumb append sink with a counter: `POST` appends one record, `GET` returns
//! `{ "totalRSVPs": n }`. Writes are one-way. The transport the aggregator was built for does not
//! expose the response to the sender, so [`Aggregator::publish`] only reports whether the request
//! could be sent at all, never whether it was accepted.
use std::time::Duration;

use crate::data_model::RsvpRecord;

/// Receipt for a one-way send. Carries no information about what the aggregator did with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("could not send RSVP to the aggregator: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("no aggregator endpoint is configured")]
    NotConfigured,
}

#[derive(Debug, thiserror::Error)]
pub enum CountUnavailable {
    #[error("could not reach the aggregator: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("aggregator answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed count response: {source}. Body: {body}")]
    Malformed {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("no aggregator endpoint is configured")]
    NotConfigured,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid aggregator endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Remote end of the sync protocol.
pub trait Aggregator {
    /// Send one record. Fire-and-forget: `Ok` only means the request left this device.
    fn publish(
        &self,
        record: &RsvpRecord,
    ) -> impl Future<Output = Result<Dispatched, PublishError>>;

    /// Read the host-side total. Callers treat an error as "no update", never as zero.
    fn fetch_count(&self) -> impl Future<Output = Result<u64, CountUnavailable>>;
}

#[derive(Debug, serde::Deserialize)]
struct CountResponse {
    #[serde(rename = "totalRSVPs")]
    total_rsvps: u64,
}

#[derive(Debug, Clone)]
pub struct HttpAggregator {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpAggregator {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client, endpoint })
    }
}

/// No aggregator at all. Records still commit locally; every send and every poll fails.
impl<A: Aggregator> Aggregator for Option<A> {
    async fn publish(&self, record: &RsvpRecord) -> Result<Dispatched, PublishError> {
        match self {
            Some(aggregator) => aggregator.publish(record).await,
            None => Err(PublishError::NotConfigured),
        }
    }

    async fn fetch_count(&self) -> Result<u64, CountUnavailable> {
        match self {
            Some(aggregator) => aggregator.fetch_count().await,
            None => Err(CountUnavailable::NotConfigured),
        }
    }
}

impl Aggregator for HttpAggregator {
    async fn publish(&self, record: &RsvpRecord) -> Result<Dispatched, PublishError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .map_err(PublishError::Transport)?;

        // status and body are not part of the protocol
        drop(response);

        log::info!("Sent RSVP for `{}` to the aggregator", record.key);
        Ok(Dispatched)
    }

    async fn fetch_count(&self) -> Result<u64, CountUnavailable> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(CountUnavailable::Transport)?;

        if !response.status().is_success() {
            return Err(CountUnavailable::Status(response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(CountUnavailable::Transport)?;

        let parsed: CountResponse = serde_json::from_str(&body)
            .map_err(|source| CountUnavailable::Malformed { source, body })?;

        Ok(parsed.total_rsvps)
    }
}
