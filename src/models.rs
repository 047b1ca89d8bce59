use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Stored Records ---

/// Poll
///
/// A poll row as returned by the external store. The store assigns `id` and
/// `created_at`; this service only ever writes validated question/options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    /// Ordered option labels, 2 to 10 entries.
    pub options: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Id of the admin who created the poll.
    pub created_by: Uuid,
}

/// NewPoll
///
/// Insert payload sent to the store. `created_by` comes from the resolved
/// identity, never from the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    pub created_by: Uuid,
}

// --- Request Payloads (sanitized) ---

/// CreatePollRequest
///
/// Body of `POST /api/admin/polls` after validation: question trimmed and
/// 5..=300 characters, 2..=10 options of 1..=100 characters each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatePollRequest {
    #[schema(example = "Favorite color?")]
    pub question: String,
    #[schema(example = json!(["Red", "Blue"]))]
    pub options: Vec<String>,
}

/// UpdatePollRequest
///
/// Partial update for `PUT /api/admin/polls/{id}`. Absent fields are left
/// untouched and are omitted when the payload is forwarded to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePollRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl UpdatePollRequest {
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.options.is_none()
    }
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PollResponse {
    pub poll: Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PollListResponse {
    pub polls: Vec<Poll>,
}
