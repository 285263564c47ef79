//! Canned reasoning answers for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use factcheck_core::ReasoningError;

use crate::llm::{ReasoningClient, ReasoningRequest};

pub struct ScriptedClient {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedClient {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<ReasoningRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        self.prompts.lock().unwrap().push(request.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ReasoningError::request("script exhausted", false))
    }
}
