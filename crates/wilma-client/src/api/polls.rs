//! Voting endpoints (`/api/Voting`).

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Service};
use crate::polls::{NewPoll, OptionId, Poll, PollId, VoteBackend};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteBody {
    option_id: OptionId,
}

#[derive(Debug, Clone)]
pub struct PollsApi {
    gateway: Arc<Gateway>,
}

impl PollsApi {
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Poll>, ClientError> {
        let polls: Vec<Poll> = self
            .gateway
            .send_json(Service::Core, ApiRequest::get("/api/Voting"))
            .await?;
        debug!(count = polls.len(), "Polls fetched");
        Ok(polls)
    }

    pub async fn get(&self, poll_id: PollId) -> Result<Poll, ClientError> {
        self.gateway
            .send_json(Service::Core, ApiRequest::get(format!("/api/Voting/{poll_id}")))
            .await
    }

    pub async fn vote(&self, poll_id: PollId, option_id: OptionId) -> Result<(), ClientError> {
        self.gateway
            .send(ApiRequest::post(format!("/api/Voting/vote/{poll_id}")).json(&VoteBody { option_id })?)
            .await?;
        Ok(())
    }

    pub async fn create(&self, draft: &NewPoll) -> Result<Poll, ClientError> {
        self.gateway
            .send_json(Service::Core, ApiRequest::post("/api/Voting/create").json(draft)?)
            .await
    }

    pub async fn delete(&self, poll_id: PollId) -> Result<(), ClientError> {
        self.gateway
            .send(ApiRequest::delete(format!("/api/Voting/{poll_id}")))
            .await?;
        Ok(())
    }
}

impl VoteBackend for PollsApi {
    async fn list_polls(&self) -> Result<Vec<Poll>, ClientError> {
        self.list().await
    }

    async fn submit_vote(&self, poll_id: PollId, option_id: OptionId) -> Result<(), ClientError> {
        self.vote(poll_id, option_id).await
    }

    async fn create_poll(&self, draft: &NewPoll) -> Result<Poll, ClientError> {
        self.create(draft).await
    }

    async fn delete_poll(&self, poll_id: PollId) -> Result<(), ClientError> {
        self.delete(poll_id).await
    }
}
