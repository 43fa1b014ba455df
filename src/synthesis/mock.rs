use super::{
    AvatarSynthesisClient, JobHandle, JobList, PollOutcome, SynthesisError, SynthesisRequest,
};
use async_trait::async_trait;
use mockall::mock;
use std::collections::VecDeque;
use std::sync::Mutex;

mock! {
    pub AvatarClient {}

    #[async_trait]
    impl AvatarSynthesisClient for AvatarClient {
        async fn submit(&self, request: &SynthesisRequest) -> Result<JobHandle, SynthesisError>;
        async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, SynthesisError>;
        async fn list(&self, skip: u32, top: u32) -> Result<JobList, SynthesisError>;
    }
}

/// Poll responses handed out in order, one per call.
pub fn poll_script(
    responses: Vec<Result<PollOutcome, SynthesisError>>,
) -> impl FnMut(&JobHandle) -> Result<PollOutcome, SynthesisError> + Send + 'static {
    let responses = Mutex::new(VecDeque::from(responses));
    move |_| {
        responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PollOutcome::Failed))
    }
}
