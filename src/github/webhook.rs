use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::github::server::ServerStateRef;
use crate::github::{GithubRepoName, PullRequestNumber};
use crate::labeler::PullRequestEvent;

/// Upper bound on the size of a webhook payload that we are willing to buffer.
const MAX_WEBHOOK_BODY_SIZE: usize = 25 * 1024 * 1024;

#[derive(serde::Deserialize, Debug)]
struct WebhookUser {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookRepository {
    name: String,
    owner: WebhookUser,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookBranch {
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookLabel {
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct PullRequestInner {
    number: u64,
    head: WebhookBranch,
    base: WebhookBranch,
    #[serde(default)]
    labels: Vec<WebhookLabel>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest<'a> {
    action: &'a str,
    pull_request: PullRequestInner,
    sender: WebhookUser,
    repository: WebhookRepository,
}

/// axum extractor for GitHub webhook events.
#[derive(Debug)]
pub struct GitHubWebhook(pub PullRequestEvent);

/// Extracts a webhook event from a HTTP request.
#[async_trait]
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = StatusCode;

    async fn from_request(
        request: Request,
        state: &ServerStateRef,
    ) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                StatusCode::BAD_REQUEST
            })?;

        // Verify that the request is valid
        if !verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(StatusCode::BAD_REQUEST);
        }

        let Some(event_type) = parts.headers.get("x-github-event") else {
            tracing::error!("x-github-event header not found");
            return Err(StatusCode::BAD_REQUEST);
        };

        // Parse webhook content
        match parse_webhook_event(event_type.as_bytes(), &body) {
            Ok(Some(event)) => Ok(GitHubWebhook(event)),
            Ok(None) => Err(StatusCode::OK),
            Err(error) => {
                tracing::error!("Cannot parse webhook event: {error:?}");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }
}

/// Parses a GitHub event payload of the given type.
/// Returns `None` for events that do not concern pull requests.
pub fn parse_webhook_event(
    event_type: &[u8],
    body: &[u8],
) -> anyhow::Result<Option<PullRequestEvent>> {
    match event_type {
        b"pull_request" | b"pull_request_target" => {
            let payload: WebhookPullRequest = serde_json::from_slice(body)?;
            Ok(Some(parse_pull_request(payload)))
        }
        _ => {
            tracing::debug!(
                "Ignoring unknown event type {:?}",
                String::from_utf8_lossy(event_type)
            );
            Ok(None)
        }
    }
}

fn parse_pull_request(payload: WebhookPullRequest) -> PullRequestEvent {
    PullRequestEvent {
        repository: GithubRepoName::new(
            &payload.repository.owner.login,
            &payload.repository.name,
        ),
        action: payload.action.to_string(),
        pr_number: PullRequestNumber(payload.pull_request.number),
        sender: payload.sender.login,
        head_branch: payload.pull_request.head.ref_field,
        base_branch: payload.pull_request.base.ref_field,
        existing_labels: payload
            .pull_request
            .labels
            .into_iter()
            .map(|label| label.name)
            .collect(),
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> bool {
    let Some(signature) = headers.get("x-hub-signature-256").map(|v| v.as_bytes()) else {
        return false;
    };
    let Some(signature) = signature
        .strip_prefix(b"sha256=")
        .and_then(|v| hex::decode(v).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}
