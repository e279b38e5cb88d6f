//! Scripted collaborators shared by unit tests.

use crate::client::OptoutApi;
use crate::contracts::{
    CampaignMailer, ComplaintEligibility, OptoutPageResponse, OptoutType, SubmitOptoutRequest,
};
use crate::error::{ResolveError, TransportError};
use crate::events::{EventContext, EventSink};
use crate::session::{ApiEndpoint, Session};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

pub fn session() -> Arc<Session> {
    Arc::new(Session::new(ApiEndpoint::new(
        "https://api.test",
        "https://fallback.test",
    )))
}

pub fn mailer(optout_type: OptoutType) -> CampaignMailer {
    CampaignMailer {
        token: "jwt-token".to_string(),
        campaign_id: 101,
        mailer_id: 202,
        cma_id: 303,
        jailed_advertiser_id: None,
        optout_ad_ratio: 0.0,
        optout_ad_redirect_url: None,
        source_client_id: 404,
        target_client_id: None,
        optout_type,
        legacy_key: "o-crlc-h92-abc123".to_string(),
    }
}

pub fn status(status: u16) -> TransportError {
    TransportError::Status {
        status,
        url: "https://api.test".to_string(),
    }
}

#[derive(Default)]
struct Script {
    verify_key: VecDeque<Result<CampaignMailer, ResolveError>>,
    page_data: VecDeque<Result<OptoutPageResponse, TransportError>>,
    submit: VecDeque<Result<(), TransportError>>,
    eligibility: VecDeque<Result<ComplaintEligibility, TransportError>>,
    token: VecDeque<Result<String, TransportError>>,
}

#[derive(Default)]
pub struct Calls {
    pub verify_key: Vec<String>,
    /// Whether the fallback endpoint was engaged when each key call was made.
    pub verify_key_fallback: Vec<bool>,
    pub page_data: Vec<(u64, OptoutType)>,
    pub submit: Vec<(u64, SubmitOptoutRequest)>,
    pub eligibility: Vec<(u64, String)>,
    pub token: usize,
}

/// [`OptoutApi`] answering from per-operation queues. Once a queue is down to
/// its last entry that entry repeats.
pub struct FakeApi {
    session: Arc<Session>,
    script: Mutex<Script>,
    calls: Mutex<Calls>,
}

fn next<T: Clone>(queue: &mut VecDeque<T>, fallback: T) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(fallback)
    } else {
        queue.front().cloned().unwrap_or(fallback)
    }
}

impl FakeApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn verify_key_returns(self, result: Result<CampaignMailer, ResolveError>) -> Self {
        self.script.lock().unwrap().verify_key.push_back(result);
        self
    }

    pub fn page_data_returns(self, result: Result<OptoutPageResponse, TransportError>) -> Self {
        self.script.lock().unwrap().page_data.push_back(result);
        self
    }

    pub fn submit_returns(self, result: Result<(), TransportError>) -> Self {
        self.script.lock().unwrap().submit.push_back(result);
        self
    }

    pub fn eligibility_returns(self, result: Result<ComplaintEligibility, TransportError>) -> Self {
        self.script.lock().unwrap().eligibility.push_back(result);
        self
    }

    pub fn token_returns(self, result: Result<String, TransportError>) -> Self {
        self.script.lock().unwrap().token.push_back(result);
        self
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl OptoutApi for FakeApi {
    async fn verify_key(&self, key: &str) -> Result<CampaignMailer, ResolveError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.verify_key.push(key.to_string());
            calls
                .verify_key_fallback
                .push(self.session.endpoint().is_fallback_engaged());
        }
        next(
            &mut self.script.lock().unwrap().verify_key,
            Err(ResolveError::Unavailable("unscripted".to_string())),
        )
    }

    async fn fetch_page_data(
        &self,
        campaign_id: u64,
        optout_type: OptoutType,
    ) -> Result<OptoutPageResponse, TransportError> {
        self.calls().page_data.push((campaign_id, optout_type));
        next(
            &mut self.script.lock().unwrap().page_data,
            Ok(OptoutPageResponse::default()),
        )
    }

    async fn submit_optout(
        &self,
        campaign_id: u64,
        request: &SubmitOptoutRequest,
    ) -> Result<(), TransportError> {
        self.calls().submit.push((campaign_id, request.clone()));
        next(&mut self.script.lock().unwrap().submit, Ok(()))
    }

    async fn check_complaint_eligibility(
        &self,
        campaign_id: u64,
        email: &str,
    ) -> Result<ComplaintEligibility, TransportError> {
        self.calls()
            .eligibility
            .push((campaign_id, email.to_string()));
        next(&mut self.script.lock().unwrap().eligibility, Err(status(500)))
    }

    async fn simple_token(&self) -> Result<String, TransportError> {
        self.calls().token += 1;
        next(&mut self.script.lock().unwrap().token, Err(status(500)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    pub message: String,
    pub context_name: String,
    pub context: EventContext,
}

/// [`EventSink`] that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<CapturedMessage>>,
    pub exceptions: Mutex<Vec<String>>,
    pub contexts: Mutex<Vec<(String, EventContext)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<CapturedMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.lock().unwrap().len()
    }

    pub fn contexts(&self) -> Vec<(String, EventContext)> {
        self.contexts.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn capture_message(&self, message: &str, context_name: &str, context: EventContext) {
        self.messages.lock().unwrap().push(CapturedMessage {
            message: message.to_string(),
            context_name: context_name.to_string(),
            context,
        });
    }

    fn capture_exception(&self, error: &dyn fmt::Display) {
        self.exceptions.lock().unwrap().push(error.to_string());
    }

    fn set_context(&self, name: &str, context: EventContext) {
        self.contexts
            .lock()
            .unwrap()
            .push((name.to_string(), context));
    }
}
