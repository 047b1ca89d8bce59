use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewPoll, Poll, UpdatePollRequest};

/// StoreError
///
/// Anything that went wrong talking to the poll store. Handlers never look
/// inside; every variant becomes the same 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("poll {0} not found")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// PollRepository
///
/// The persistence contract the handlers rely on. Every method is exactly one
/// round trip to the backing store; there are no retries.
#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError>;
    async fn create_poll(&self, poll: NewPoll) -> Result<Poll, StoreError>;
    /// Applies a partial update. An empty update reads the poll back unchanged.
    async fn update_poll(&self, id: Uuid, changes: UpdatePollRequest) -> Result<Poll, StoreError>;
    /// Deleting an id that does not exist is not an error.
    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError>;
}

pub type RepositoryState = Arc<dyn PollRepository>;

// --- PostgREST ---

/// Columns requested on every read/return.
const POLL_COLUMNS: &str = "id,question,options,created_at,created_by";
/// Asks PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgrestRepository
///
/// Talks to the hosted data API (`/rest/v1/polls`) with the server-side key.
/// Filters are PostgREST query parameters (`id=eq.<uuid>`).
pub struct PostgrestRepository {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl PostgrestRepository {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/rest/v1/polls", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn single(&self, method: Method) -> RequestBuilder {
        self.request(method)
            .query(&[("select", POLL_COLUMNS)])
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
    }
}

async fn checked(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    Ok(checked(response).await?.json::<T>().await?)
}

#[async_trait]
impl PollRepository for PostgrestRepository {
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", POLL_COLUMNS)])
            .send()
            .await?;
        read(response).await
    }

    async fn create_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let response = self.single(Method::POST).json(&poll).send().await?;
        read(response).await
    }

    async fn update_poll(&self, id: Uuid, changes: UpdatePollRequest) -> Result<Poll, StoreError> {
        let filter = [("id", format!("eq.{id}"))];

        // PostgREST rejects an empty PATCH body, so a no-op update is a plain read.
        let request = if changes.is_empty() {
            self.single(Method::GET).query(&filter)
        } else {
            self.single(Method::PATCH).query(&filter).json(&changes)
        };

        read(request.send().await?).await
    }

    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }
}

// --- In-Memory ---

/// InMemoryRepository
///
/// Process-local store used for local development without a hosted backend
/// and as the test double for the handlers. Counts every call so tests can
/// assert that rejected requests never reached the store.
#[derive(Default)]
pub struct InMemoryRepository {
    polls: RwLock<Vec<Poll>>,
    calls: AtomicUsize,
    /// When true, every operation fails with [`StoreError::Unavailable`].
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_polls(polls: Vec<Poll>) -> Self {
        Self {
            polls: RwLock::new(polls),
            ..Self::default()
        }
    }

    /// Number of store operations attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<Poll> {
        self.polls.read().await.clone()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PollRepository for InMemoryRepository {
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        self.enter()?;
        Ok(self.polls.read().await.clone())
    }

    async fn create_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        self.enter()?;
        let created = Poll {
            id: Uuid::new_v4(),
            question: poll.question,
            options: poll.options,
            created_at: Utc::now(),
            created_by: poll.created_by,
        };
        self.polls.write().await.push(created.clone());
        Ok(created)
    }

    async fn update_poll(&self, id: Uuid, changes: UpdatePollRequest) -> Result<Poll, StoreError> {
        self.enter()?;
        let mut polls = self.polls.write().await;
        let poll = polls
            .iter_mut()
            .find(|poll| poll.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(question) = changes.question {
            poll.question = question;
        }
        if let Some(options) = changes.options {
            poll.options = options;
        }
        Ok(poll.clone())
    }

    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError> {
        self.enter()?;
        self.polls.write().await.retain(|poll| poll.id != id);
        Ok(())
    }
}
