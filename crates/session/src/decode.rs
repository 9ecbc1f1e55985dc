use crate::error::SessionError;
use crate::state::{QueryState, TreeState, UastTree};
use std::sync::Arc;
use uast_dev_protocol::{ParseResponse, QueryResponse, ServiceReply, TransportError};

pub(crate) fn decode_parse(result: Result<ParseResponse, TransportError>) -> TreeState {
    let response = match result {
        Ok(response) => response,
        Err(err) => return TreeState::Error(err.into()),
    };
    match response.reply() {
        ServiceReply::Payload(raw) => match serde_json::from_str(raw) {
            Ok(value) => TreeState::Tree(Arc::new(UastTree {
                json: raw.to_string(),
                value,
            })),
            Err(err) => TreeState::Error(SessionError::malformed(format!(
                "Error parsing UAST: {err}"
            ))),
        },
        ServiceReply::Error(message) => TreeState::Error(SessionError::ServiceReported {
            message: message.to_string(),
        }),
        ServiceReply::Empty => TreeState::Error(SessionError::malformed(
            "No UAST data received from server",
        )),
    }
}

pub(crate) fn decode_query(result: Result<QueryResponse, TransportError>) -> QueryState {
    let response = match result {
        Ok(response) => response,
        Err(err) => return QueryState::Error(err.into()),
    };
    match response.reply() {
        ServiceReply::Payload(raw) => match serde_json::from_str(raw) {
            Ok(value) => QueryState::Results(Arc::new(value)),
            Err(err) => QueryState::Error(SessionError::malformed(format!(
                "Error parsing query results: {err}"
            ))),
        },
        ServiceReply::Error(message) => QueryState::Error(SessionError::ServiceReported {
            message: message.to_string(),
        }),
        ServiceReply::Empty => QueryState::Error(SessionError::malformed(
            "No query results received from server",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_payload_keeps_raw_text() {
        let raw = "{\n  \"type\": \"File\"\n}";
        let state = decode_parse(Ok(ParseResponse {
            tree: raw.to_string(),
            error: None,
        }));
        let tree = state.tree().unwrap();
        assert_eq!(tree.json, raw);
        assert_eq!(tree.value, json!({"type": "File"}));
    }

    #[test]
    fn undecodable_tree_is_malformed() {
        let state = decode_parse(Ok(ParseResponse {
            tree: "{not json".to_string(),
            error: None,
        }));
        assert!(matches!(
            state.error(),
            Some(SessionError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn service_error_is_kept_verbatim() {
        let state = decode_query(Ok(QueryResponse {
            result: String::new(),
            error: Some("Query error: unexpected token".to_string()),
        }));
        assert_eq!(
            state.error(),
            Some(&SessionError::ServiceReported {
                message: "Query error: unexpected token".to_string()
            })
        );
    }

    #[test]
    fn transport_failure_is_retryable() {
        let state = decode_query(Err(TransportError::new("connection refused")));
        assert!(state.error().unwrap().is_retryable());
        let state = decode_parse(Err(TransportError::new("connection refused")));
        assert!(state.error().unwrap().is_retryable());
    }

    #[test]
    fn empty_parse_response_is_malformed() {
        let state = decode_parse(Ok(ParseResponse::default()));
        assert_eq!(
            state.error(),
            Some(&SessionError::malformed("No UAST data received from server"))
        );
    }
}
