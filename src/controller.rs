use crate::client::OptoutApi;
use crate::config::Config;
use crate::contracts::{CampaignMailer, OptoutType, SubmitOptoutRequest};
use crate::decision::{should_show_ad, FeedbackPolicy};
use crate::error::{FatalError, ResolveError, TransportError};
use crate::events::EventSink;
use crate::orchestrator::CampaignResolver;
use crate::page_data::{default_page_data, PageData};
use crate::retry::{retry, RetryPolicy};
use crate::session::Session;
use crate::validate::{validate_email, validate_international_phone};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Where the controller is in loading the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    ResolvingCampaign,
    ResolvingPage,
    Ready,
}

/// What happens after an opt-out is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Redirect to (or embed) an advertisement.
    pub show_ad: bool,
    /// Offer the creative feedback form. Never set together with `show_ad`.
    pub collect_feedback: bool,
}

/// An opt-out handed to [`LandingController::submit`] together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub email: String,
    pub sms: String,
    pub outcome: SubmissionOutcome,
}

/// Data shared by every page of a visit. Either field may be seeded up front,
/// in which case the matching stage does no network work.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub campaign_mailer: Option<CampaignMailer>,
    pub page_data: Option<PageData>,
}

#[derive(Debug, Clone, Default)]
struct StageStatus {
    loading: bool,
    has_loaded: bool,
    error: Option<FatalError>,
}

/// Loads campaign and page data for an opt-out key and submits opt-outs.
///
/// Loading failures either surface as a [`FatalError`] or degrade to the basic
/// email form. Submission failures never reach the caller; they are retried
/// and then captured to the event sink.
pub struct LandingController {
    key: String,
    api: Arc<dyn OptoutApi>,
    events: Arc<dyn EventSink>,
    resolver: CampaignResolver,
    state: AppState,
    stage: LoadState,
    campaign: StageStatus,
    page: StageStatus,
    submitting: bool,
    page_policy: RetryPolicy,
    submit_policy: RetryPolicy,
    feedback: FeedbackPolicy,
    accepted_sms_countries: Vec<String>,
    rng: StdRng,
}

impl LandingController {
    pub fn new(
        key: impl Into<String>,
        api: Arc<dyn OptoutApi>,
        session: Arc<Session>,
        events: Arc<dyn EventSink>,
        config: &Config,
    ) -> Self {
        let resolver = CampaignResolver::new(api.clone(), session, events.clone(), config);
        let retries = config.api.request_retries;

        Self {
            key: key.into(),
            api,
            events,
            resolver,
            state: AppState::default(),
            stage: LoadState::Idle,
            campaign: StageStatus::default(),
            page: StageStatus::default(),
            submitting: false,
            page_policy: RetryPolicy::from_config(config, retries),
            submit_policy: RetryPolicy::from_config(config, retries),
            feedback: FeedbackPolicy::from_config(&config.feedback),
            accepted_sms_countries: config.sms.accepted_country_codes.clone(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = state;
        self
    }

    /// Use `backoff` timing for every retry loop, keeping configured counts.
    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.page_policy = RetryPolicy {
            retries: self.page_policy.retries,
            ..backoff.clone()
        };
        self.submit_policy = RetryPolicy {
            retries: self.submit_policy.retries,
            ..backoff.clone()
        };
        self.resolver = self.resolver.with_backoff(backoff);
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load_state(&self) -> LoadState {
        self.stage
    }

    pub fn loading(&self) -> bool {
        self.campaign.loading || self.page.loading
    }

    pub fn has_loaded(&self) -> bool {
        self.campaign.has_loaded && self.page.has_loaded
    }

    /// Campaign errors take precedence over page data errors.
    pub fn fatal_error(&self) -> Option<FatalError> {
        self.campaign.error.or(self.page.error)
    }

    pub fn submitting(&self) -> bool {
        self.submitting
    }

    pub fn campaign_mailer(&self) -> Option<&CampaignMailer> {
        self.state.campaign_mailer.as_ref()
    }

    pub fn page_data(&self) -> Option<&PageData> {
        self.state.page_data.as_ref()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Email is assumed when no campaign mailer could be loaded.
    pub fn optout_type(&self) -> OptoutType {
        self.state
            .campaign_mailer
            .as_ref()
            .map(|m| m.optout_type)
            .unwrap_or_default()
    }

    /// Run both loading stages in order.
    pub async fn load(&mut self) {
        self.resolve_campaign_stage().await;
        self.resolve_page_stage().await;
        if self.has_loaded() {
            self.stage = LoadState::Ready;
        }
    }

    async fn resolve_campaign_stage(&mut self) {
        if self.state.campaign_mailer.is_some() {
            self.campaign.has_loaded = true;
            return;
        }

        self.stage = LoadState::ResolvingCampaign;
        self.campaign.loading = true;

        match self.resolver.resolve_campaign(&self.key).await {
            Ok(mailer) => self.state.campaign_mailer = Some(mailer),
            Err(ResolveError::NotFound(err)) => {
                info!("Opt-out key {} not found: {err}", self.key);
                self.campaign.error = Some(FatalError::NotFound);
            }
            Err(ResolveError::Unavailable(reason)) => {
                warn!(
                    "Falling back to basic opt-out form for key {}: {reason}",
                    self.key
                );
            }
        }

        self.campaign.loading = false;
        self.campaign.has_loaded = true;
    }

    async fn resolve_page_stage(&mut self) {
        if self.state.page_data.is_some() {
            self.page.has_loaded = true;
            return;
        }

        // Depends on the campaign mailer having either loaded or failed.
        if !self.campaign.has_loaded {
            return;
        }

        let Some((campaign_id, optout_type)) = self
            .state
            .campaign_mailer
            .as_ref()
            .map(|m| (m.campaign_id, m.optout_type))
        else {
            self.state.page_data = Some(default_page_data(OptoutType::Email));
            self.page.has_loaded = true;
            return;
        };

        self.stage = LoadState::ResolvingPage;
        self.page.loading = true;

        let api = Arc::clone(&self.api);
        let result = retry(
            &self.page_policy,
            |_| api.fetch_page_data(campaign_id, optout_type),
            |err: &TransportError| !err.is_client_error(),
            |err: &TransportError, attempt| {
                warn!("Page data attempt {attempt} for campaign {campaign_id} failed: {err}")
            },
        )
        .await;

        match result {
            Ok(response) => {
                self.state.page_data = Some(PageData::resolve(response, optout_type));
            }
            Err(err) if err.is_client_error() => {
                info!("Page data for campaign {campaign_id} is inactive: {err}");
                self.page.error = Some(FatalError::LinkInactive);
            }
            Err(err) => {
                warn!("Using default page data for campaign {campaign_id}: {err}");
                self.state.page_data = Some(default_page_data(optout_type));
            }
        }

        self.page.loading = false;
        self.page.has_loaded = true;
    }

    /// Submit an opt-out supplied through the landing URL.
    ///
    /// Does nothing until loading finished without a fatal error. Invalid
    /// values are discarded; when a campaign mailer exists the discard is
    /// captured with its context.
    pub async fn one_click(&mut self, value: Option<&str>) -> Option<Submission> {
        let value = value.filter(|v| !v.is_empty())?;
        if !self.has_loaded() || self.fatal_error().is_some() {
            return None;
        }

        let optout_type = self.optout_type();
        let valid = match optout_type {
            OptoutType::Email => validate_email(value),
            OptoutType::Sms => validate_international_phone(value, &self.accepted_sms_countries),
        };

        if valid {
            let (email, sms) = match optout_type {
                OptoutType::Email => (value, ""),
                OptoutType::Sms => ("", value),
            };
            let outcome = self.submit(email, sms, &[]).await;
            return Some(Submission {
                email: email.to_string(),
                sms: sms.to_string(),
                outcome,
            });
        }

        if let Some(mailer) = &self.state.campaign_mailer {
            info!("Discarding invalid one-click opt-out for campaign {}", mailer.campaign_id);
            self.events.capture_message(
                "Invalid one-click opt-out discarded",
                "discarded one-click opt-out",
                event_context! {
                    "oneClickOptout" => value,
                    "key" => mailer.legacy_key,
                    "campaignId" => mailer.campaign_id,
                    "mailerId" => mailer.mailer_id,
                    "cmaId" => mailer.cma_id,
                    "sourceClientId" => mailer.source_client_id,
                    "optoutType" => mailer.optout_type,
                },
            );
        }

        None
    }

    /// Submit an opt-out. From the caller's point of view this always
    /// succeeds.
    pub async fn submit(&mut self, email: &str, sms: &str, preference: &[u32]) -> SubmissionOutcome {
        self.submitting = true;
        let outcome = self.submit_inner(email, sms, preference).await;
        self.submitting = false;
        outcome
    }

    async fn submit_inner(&mut self, email: &str, sms: &str, preference: &[u32]) -> SubmissionOutcome {
        let Some(mailer) = self.state.campaign_mailer.clone() else {
            // Without a campaign mailer the submission contract can't be met.
            self.capture_failed_submission("Opt-out key failed to load", email, sms, None);
            return SubmissionOutcome::default();
        };

        let show_ad = should_show_ad(mailer.optout_ad_ratio, &mut self.rng);
        let request = SubmitOptoutRequest {
            mailer_id: mailer.mailer_id,
            email: (mailer.optout_type == OptoutType::Email).then(|| email.to_string()),
            sms: (mailer.optout_type == OptoutType::Sms).then(|| sms.to_string()),
            cma_id: mailer.cma_id,
            preference: preference.to_vec(),
            source_client_id: mailer.source_client_id,
            was_redirected_to_ads: show_ad,
        };

        let api = Arc::clone(&self.api);
        let events = Arc::clone(&self.events);
        let result = retry(
            &self.submit_policy,
            |_| api.submit_optout(mailer.campaign_id, &request),
            |_: &TransportError| true,
            |err: &TransportError, attempt| {
                debug!("Opt-out submission attempt {attempt} failed: {err}");
                events.capture_exception(err);
            },
        )
        .await;

        match result {
            Ok(()) => info!(
                "Opt-out submitted for campaign {} mailer {}",
                mailer.campaign_id, mailer.mailer_id
            ),
            Err(err) => {
                error!("Opt-out submission failed: {err}");
                self.events.capture_exception(&err);
                self.capture_failed_submission(
                    "opt-out submission failed to complete request",
                    email,
                    sms,
                    Some(&mailer),
                );
            }
        }

        let collect_feedback = !show_ad
            && mailer.optout_type == OptoutType::Email
            && self.feedback.is_eligible(email, &mut self.rng);

        SubmissionOutcome {
            show_ad,
            collect_feedback,
        }
    }

    /// Last resort record of an attempted opt-out. With a campaign mailer the
    /// context holds everything needed to replay it.
    fn capture_failed_submission(
        &self,
        message: &str,
        email: &str,
        sms: &str,
        mailer: Option<&CampaignMailer>,
    ) {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        self.events.capture_message(
            &format!("Opt-Out Collection - {message}"),
            "attempted optout",
            event_context! {
                "emailOptout" => non_empty(email),
                "smsOptout" => non_empty(sms),
                "key" => self.key,
                "campaignId" => mailer.map(|m| m.campaign_id),
                "mailerId" => mailer.map(|m| m.mailer_id),
                "cmaId" => mailer.map(|m| m.cma_id),
            },
        );
    }
}
