use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use thiserror::Error;
use tracing::Instrument;

use crate::app_state::AppState;
use crate::rules::{MatchDecision, PING_EVENT};
use crate::signature;
use crate::webhook_payloads::github::{GithubHookPayload, GithubPushWebhookPayload};

const HEADER_EVENT: &str = "x-github-event";
const HEADER_DELIVERY: &str = "x-github-delivery";
const HEADER_SIGNATURE: &str = "x-hub-signature";
const HEADER_SIGNATURE_256: &str = "x-hub-signature-256";

const PUSH_EVENT: &str = "push";

/// Body of every 400 we send. Details stay in our logs.
const REJECTION_MESSAGE: &str = "This delivery was not accepted";

#[derive(Debug, Error)]
pub enum WebhookRejection {
    #[error("could not read request body: {0}")]
    BodyRead(#[from] BytesRejection),

    #[error("signature mismatch")]
    InvalidSignature,

    #[error("no rule for {event} on {repository} with ref {reference}")]
    Discarded {
        event: String,
        repository: String,
        reference: String,
    },
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": REJECTION_MESSAGE })),
        )
            .into_response()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub async fn webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, WebhookRejection> {
    let event = header(&headers, HEADER_EVENT).unwrap_or_default().to_string();
    let delivery = header(&headers, HEADER_DELIVERY).unwrap_or_default().to_string();

    let span = tracing::info_span!("webhook", %event, %delivery);
    handle_delivery(&state, &headers, &event, body)
        .instrument(span)
        .await
}

async fn handle_delivery(
    state: &AppState,
    headers: &HeaderMap,
    event: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, WebhookRejection> {
    let payload = body.map_err(|e| {
        tracing::error!("Could not read request body: {e}");
        WebhookRejection::from(e)
    })?;

    let signature_header = header(headers, HEADER_SIGNATURE_256)
        .or_else(|| header(headers, HEADER_SIGNATURE))
        .unwrap_or_default();

    if !signature::verify(&state.secret, &payload, signature_header) {
        tracing::warn!(
            "Mismatch between expected ({}) and received ({:?}) signature",
            signature::expected_signature_header(&state.secret, &payload, signature_header)
                .unwrap_or_default(),
            signature_header
        );
        return Err(WebhookRejection::InvalidSignature);
    }

    if event == PING_EVENT {
        tracing::debug!("Ping received");
        return Ok(StatusCode::OK);
    }

    let hook = GithubHookPayload::decode(&payload);
    let repository = hook.repository.full_name.as_str();
    let reference = hook.reference.as_str();

    match state.rules.decide(event, repository, reference) {
        MatchDecision::Ping => Ok(StatusCode::OK),
        MatchDecision::Matched(rule) => {
            if event == PUSH_EVENT {
                let push = GithubPushWebhookPayload::decode(&payload);
                tracing::info!(
                    "{event} by {} detected on {repository} with ref {reference} with the following commits:",
                    push.pusher.name
                );
                for commit in &push.commits {
                    tracing::info!("\t{commit}");
                }
            }

            match state.dispatcher.dispatch(rule) {
                Ok(dispatched) => {
                    tracing::info!(
                        dispatch_id = %dispatched.id,
                        pid = dispatched.pid,
                        "Started {} {:?}",
                        dispatched.program,
                        dispatched.args
                    );
                }
                Err(e) => {
                    tracing::error!("{e}");
                }
            }

            Ok(StatusCode::OK)
        }
        MatchDecision::Discarded => {
            // verbose mode answers 400 so the discard shows in GitHub's delivery log
            if state.verbose {
                let rejection = WebhookRejection::Discarded {
                    event: event.to_string(),
                    repository: repository.to_string(),
                    reference: reference.to_string(),
                };
                tracing::info!("Discarding: {rejection}");
                return Err(rejection);
            }

            tracing::debug!("No rule for {event} on {repository} with ref {reference}");
            Ok(StatusCode::OK)
        }
    }
}
