use crate::client::OptoutApi;
use crate::config::Config;
use crate::contracts::CampaignMailer;
use crate::error::ResolveError;
use crate::events::EventSink;
use crate::retry::{retry, RetryPolicy};
use crate::session::Session;
use log::{info, warn};
use std::sync::Arc;

/// Resolves opt-out keys, retrying transient failures and switching the
/// session to the fallback API host once the primary looks unreachable.
pub struct CampaignResolver {
    api: Arc<dyn OptoutApi>,
    session: Arc<Session>,
    events: Arc<dyn EventSink>,
    primary_retries: u32,
    fallback_attempts: u32,
    backoff: RetryPolicy,
}

impl CampaignResolver {
    pub fn new(
        api: Arc<dyn OptoutApi>,
        session: Arc<Session>,
        events: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            session,
            events,
            primary_retries: config.api.request_retries,
            fallback_attempts: config.api.fallback_attempts,
            backoff: RetryPolicy::from_config(config, 0),
        }
    }

    /// Replace the backoff timing. The attempt count is unaffected.
    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.primary_retries
            .saturating_add(self.fallback_attempts)
            .max(1)
    }

    pub async fn resolve_campaign(&self, key: &str) -> Result<CampaignMailer, ResolveError> {
        self.events
            .set_context("api_fallback", event_context! { "fallback" => false });

        let policy = RetryPolicy {
            retries: self.total_attempts() - 1,
            ..self.backoff.clone()
        };

        let result = retry(
            &policy,
            |attempt| {
                if attempt > self.primary_retries {
                    self.session.endpoint().engage_fallback();
                    self.events
                        .set_context("api_fallback", event_context! { "fallback" => true });
                }
                self.api.verify_key(key)
            },
            ResolveError::is_retryable,
            |err, attempt| warn!("Opt-out key resolution attempt {attempt} failed: {err}"),
        )
        .await;

        match result {
            Ok(mut mailer) => {
                mailer.legacy_key = key.to_string();
                self.session.set_access_token(mailer.token.clone());
                info!(
                    "Resolved opt-out key {key} to campaign {} mailer {}",
                    mailer.campaign_id, mailer.mailer_id
                );
                Ok(mailer)
            }
            Err(err) => {
                warn!("Opt-out key {key} could not be resolved: {err}");
                Err(err)
            }
        }
    }
}
