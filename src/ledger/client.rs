//! GraphQL client for the chain indexer API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::LedgerError;
use super::types::{CoinBalance, RawEvent};

/// Request timeout for a single indexer query.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

const EVENTS_QUERY: &str = r"
query Events($event_type: String!, $offset: Int!, $limit: Int!) {
  events(
    where: { indexed_type: { _eq: $event_type } }
    offset: $offset
    limit: $limit
    order_by: { transaction_version: asc }
  ) {
    data
    transaction_version
  }
}";

const BALANCES_QUERY: &str = r"
query CoinBalances($coin_type: String!, $offset: Int!, $limit: Int!) {
  current_coin_balances(
    where: { coin_type: { _eq: $coin_type }, amount: { _gt: 0 } }
    order_by: { amount: desc }
    offset: $offset
    limit: $limit
  ) {
    amount
    owner_address
  }
}";

/// GraphQL request body.
#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

/// One error entry of a GraphQL response.
#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Events query result shape.
#[derive(Debug, Deserialize)]
struct EventsData<T> {
    events: Vec<RawEvent<T>>,
}

/// Balances query result shape.
#[derive(Debug, Deserialize)]
struct BalancesData {
    current_coin_balances: Vec<CoinBalance>,
}

/// Client for the chain's hosted GraphQL indexer.
///
/// Safe to share across tasks; the underlying `reqwest::Client` pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl LedgerClient {
    /// Creates a new client against the given GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the HTTP client cannot be created.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(LedgerError::Request)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Fetches a batch of events of one fully-qualified type, ordered
    /// ascending by transaction version.
    ///
    /// `offset` is the number of events of this type already consumed; an
    /// empty result means the stream is exhausted for now and is success.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] on transport, status, or decode failure.
    pub async fn fetch_events<T: DeserializeOwned>(
        &self,
        event_type: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RawEvent<T>>, LedgerError> {
        let data: EventsData<T> = self
            .query(
                EVENTS_QUERY,
                json!({
                    "event_type": event_type,
                    "offset": offset,
                    "limit": limit,
                }),
            )
            .await?;

        Ok(data.events)
    }

    /// Fetches one page of the authoritative holder index for a token,
    /// ordered by balance descending. Zero-balance rows are filtered
    /// server-side.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] on transport, status, or decode failure.
    pub async fn fetch_balances(
        &self,
        coin_type: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CoinBalance>, LedgerError> {
        let data: BalancesData = self
            .query(
                BALANCES_QUERY,
                json!({
                    "coin_type": coin_type,
                    "offset": offset,
                    "limit": limit,
                }),
            )
            .await?;

        Ok(data.current_coin_balances)
    }

    /// Executes one GraphQL query and unwraps the response envelope.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::Deserialization(e.to_string()))?;

        let envelope: GraphqlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Deserialization(e.to_string()))?;

        if let Some(error) = envelope.errors.into_iter().next() {
            return Err(LedgerError::Graphql(error.message));
        }

        envelope
            .data
            .ok_or_else(|| LedgerError::Graphql("response carried no data".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ledger::types::PoolCompletedEvent;

    #[test]
    fn test_client_new() {
        let client = LedgerClient::new("https://api.testnet.aptoslabs.com/v1/graphql");
        assert!(client.is_ok());
    }

    #[test]
    fn test_events_envelope_decode() {
        let body = r#"{
            "data": {
                "events": [
                    {
                        "data": {"lp": "0x1", "token_address": "0x2", "ts": "1714003300000"},
                        "transaction_version": "100"
                    }
                ]
            }
        }"#;

        let envelope: GraphqlResponse<EventsData<PoolCompletedEvent>> =
            serde_json::from_str(body).unwrap();
        let events = envelope.data.unwrap().events;
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().unwrap().transaction_version, 100);
    }

    #[test]
    fn test_error_envelope_decode() {
        let body = r#"{"errors": [{"message": "unknown field"}]}"#;

        let envelope: GraphqlResponse<BalancesData> = serde_json::from_str(body).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.errors.len(), 1);
        assert_eq!(envelope.errors.first().unwrap().message, "unknown field");
    }

    #[test]
    fn test_balances_envelope_decode() {
        let body = r#"{
            "data": {
                "current_coin_balances": [
                    {"amount": "900", "owner_address": "0xc0ffee"},
                    {"amount": "100", "owner_address": "0xb0b"}
                ]
            }
        }"#;

        let envelope: GraphqlResponse<BalancesData> = serde_json::from_str(body).unwrap();
        let balances = envelope.data.unwrap().current_coin_balances;
        assert_eq!(balances.len(), 2);
        assert_eq!(balances.first().unwrap().owner_address, "0xc0ffee");
    }
}
