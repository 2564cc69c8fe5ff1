//! The one GraphQL mutation the REST API has no equivalent for

use crate::error::{GatewayError, Result};
use crate::gateway::{Gateway, RequestOptions};
use serde_json::{json, Value};

/// GraphQL endpoint relative to the API base
pub const GRAPHQL_ENDPOINT: &str = "/graphql";

const MARK_READY_FOR_REVIEW: &str = "mutation($id: ID!) { \
     markPullRequestReadyForReview(input: {pullRequestId: $id}) { \
     pullRequest { isDraft } } }";

/// Run `markPullRequestReadyForReview` for a pull request node
pub async fn mark_ready_for_review(gateway: &Gateway, node_id: &str) -> Result<Value> {
    let body = json!({
        "query": MARK_READY_FOR_REVIEW,
        "variables": { "id": node_id },
    });
    let response: Value = gateway
        .request(GRAPHQL_ENDPOINT, RequestOptions::post(body))
        .await?;
    check_errors(response)
}

/// GraphQL reports failures with a 200 and an `errors` array
fn check_errors(response: Value) -> Result<Value> {
    let messages: Vec<&str> = response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        Ok(response)
    } else {
        Err(GatewayError::GraphQl(messages.join("; ")))
    }
}
