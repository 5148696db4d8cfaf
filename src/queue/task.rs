//! Queued task records and the attempt ceiling.

use crate::generation::{GenerationOptions, GenerationRequest};
use serde::{Deserialize, Serialize};

/// Failed drain attempts after which a task is dropped.
pub const MAX_TASK_ATTEMPTS: u32 = 3;

/// A deferred generation request, as persisted in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub with_research: bool,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub attempts: u32,
}

impl QueuedTask {
    /// Reconstruct the request this task was created from.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(self.topic.clone())
            .with_research(self.with_research)
            .with_options(self.options.clone())
    }
}

/// Task payload before the queue assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub topic: String,
    pub with_research: bool,
    pub options: GenerationOptions,
}

impl NewTask {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            with_research: false,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_research(mut self, enabled: bool) -> Self {
        self.with_research = enabled;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn into_task(self) -> QueuedTask {
        QueuedTask {
            id: uuid::Uuid::new_v4().to_string(),
            topic: self.topic,
            with_research: self.with_research,
            options: self.options,
            attempts: 0,
        }
    }
}

impl From<GenerationRequest> for NewTask {
    fn from(request: GenerationRequest) -> Self {
        Self {
            topic: request.topic,
            with_research: request.with_research,
            options: request.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Tone;

    #[test]
    fn test_new_task_gets_fresh_id_and_zero_attempts() {
        let a = NewTask::new("remote work tips").into_task();
        let b = NewTask::new("remote work tips").into_task();
        assert_ne!(a.id, b.id);
        assert_eq!(a.attempts, 0);
        assert!(!a.with_research);
    }

    #[test]
    fn test_request_reconstruction_keeps_options() {
        let opts = GenerationOptions::default().with_tone(Tone::Casual);
        let task = NewTask::new("rust").with_research(true).with_options(opts.clone()).into_task();
        let req = task.to_request();
        assert_eq!(req.topic, "rust");
        assert!(req.with_research);
        assert_eq!(req.options, opts);
    }

    #[test]
    fn test_persisted_task_without_optional_fields() {
        let task: QueuedTask = serde_json::from_str(r#"{"id": "t1", "topic": "x"}"#).unwrap();
        assert_eq!(task.attempts, 0);
        assert_eq!(task.options, GenerationOptions::default());
    }
}
