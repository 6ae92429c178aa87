//! Core layer: pure interpretation of negotiation answers.

use hoist_fs::validate_destination;

use crate::data::{NegotiationResponse, TransferDecision};
use crate::error::{Result, TransferError};

/// Turn a raw negotiation response into a decision.
///
/// - `200 OK`: the authority already has the artifact
/// - any other 2xx: it accepted the question but holds nothing, upload
/// - 3xx carrying a local location: place the file there directly
/// - 3xx without one: upload
/// - anything else: the channel is unreliable, abort
pub fn decide(response: &NegotiationResponse) -> Result<TransferDecision> {
    match response.status {
        200 => Ok(TransferDecision::AlreadyPresent),
        201..=299 => Ok(TransferDecision::NetworkRequired),
        300..=399 => match response.local_location.as_deref() {
            Some(raw) => validate_destination(raw)
                .map(TransferDecision::LocalDestination)
                .map_err(|e| TransferError::Negotiation(e.to_string())),
            None => Ok(TransferDecision::NetworkRequired),
        },
        status => Err(TransferError::Negotiation(match response.message.as_deref() {
            Some(message) if !message.is_empty() => format!("status {status}: {message}"),
            _ => format!("status {status}"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_means_present() {
        assert_eq!(
            decide(&NegotiationResponse::new(200)).unwrap(),
            TransferDecision::AlreadyPresent
        );
    }

    #[test]
    fn other_success_means_upload() {
        assert_eq!(
            decide(&NegotiationResponse::new(204)).unwrap(),
            TransferDecision::NetworkRequired
        );
    }

    #[cfg(unix)]
    #[test]
    fn redirect_with_location_is_local() {
        let response = NegotiationResponse::new(307).with_local_location("/models/blobs/sha256-1");
        assert_eq!(
            decide(&response).unwrap(),
            TransferDecision::LocalDestination("/models/blobs/sha256-1".into())
        );
    }

    #[test]
    fn redirect_without_location_is_upload() {
        assert_eq!(
            decide(&NegotiationResponse::new(307)).unwrap(),
            TransferDecision::NetworkRequired
        );
    }

    #[test]
    fn relative_location_is_rejected() {
        let response = NegotiationResponse::new(307).with_local_location("blobs/sha256-1");
        assert!(matches!(decide(&response), Err(TransferError::Negotiation(_))));
    }

    #[test]
    fn client_and_server_errors_are_fatal() {
        for status in [400, 401, 404, 500, 503] {
            let response = NegotiationResponse::new(status).with_message("nope");
            match decide(&response) {
                Err(TransferError::Negotiation(msg)) => assert!(msg.contains("nope")),
                other => panic!("status {status}: unexpected {other:?}"),
            }
        }
    }
}
