use crate::client::{HttpOptoutApi, OptoutApi};
use crate::config::Config;
use crate::confirmation::ConfirmationView;
use crate::controller::{LandingController, Submission};
use crate::error::TransportError;
use crate::events::{EventSink, LogEventSink};
use crate::feedback::{check_complaint, complaint_available, creative_feedback_address, ComplaintOutcome};
use crate::landing::{split_path_and_query, FormErrors, LandingQuery, LandingView, Route};
use crate::retry::RetryPolicy;
use crate::session::{ApiEndpoint, Session};
use log::{debug, info};
use std::sync::Arc;

/// What a visit or submission leaves on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    NotFound,
    /// A fatal loading error, carrying the user-facing message.
    Error(String),
    Form(LandingView),
    Confirmation(ConfirmationView),
}

/// One visitor's walk through the opt-out pages.
pub struct OptoutApp {
    config: Config,
    api: Arc<dyn OptoutApi>,
    session: Arc<Session>,
    events: Arc<dyn EventSink>,
    controller: Option<LandingController>,
    submission: Option<Submission>,
    backoff: Option<RetryPolicy>,
}

impl OptoutApp {
    pub fn new(
        config: Config,
        api: Arc<dyn OptoutApi>,
        session: Arc<Session>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            api,
            session,
            events,
            controller: None,
            submission: None,
            backoff: None,
        }
    }

    /// Wire the HTTP client and log sink from configuration.
    pub fn from_config(config: Config) -> Result<Self, TransportError> {
        let session = Arc::new(Session::new(ApiEndpoint::new(
            config.api.url.clone(),
            config.api.fallback_url.clone(),
        )));
        let api = Arc::new(HttpOptoutApi::new(&config, session.clone())?);
        Ok(Self::new(config, api, session, Arc::new(LogEventSink::new())))
    }

    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn controller(&self) -> Option<&LandingController> {
        self.controller.as_ref()
    }

    pub async fn visit(&mut self, path_and_query: &str) -> Screen {
        let (path, query) = split_path_and_query(path_and_query);
        let query = LandingQuery::parse(query);
        if query.no_cache {
            self.session.set_no_cache(true);
        }

        match Route::parse(path) {
            Route::Landing { key } => self.visit_landing(key, query.email.as_deref()).await,
            Route::Confirmation => self.confirmation(),
            Route::NotFound => {
                debug!("No route for {path}");
                Screen::NotFound
            }
        }
    }

    async fn visit_landing(&mut self, key: String, one_click: Option<&str>) -> Screen {
        let reuse = self.controller.as_ref().map_or(false, |c| c.key() == key);
        if !reuse {
            let mut controller = LandingController::new(
                key,
                self.api.clone(),
                self.session.clone(),
                self.events.clone(),
                &self.config,
            );
            if let Some(backoff) = &self.backoff {
                controller = controller.with_backoff(backoff.clone());
            }
            self.controller = Some(controller);
        }
        let Some(controller) = self.controller.as_mut() else {
            return Screen::NotFound;
        };

        if !controller.has_loaded() {
            controller.load().await;
        }
        if let Some(error) = controller.fatal_error() {
            return Screen::Error(error.to_string());
        }

        if let Some(submission) = controller.one_click(one_click).await {
            info!("One-click opt-out submitted");
            self.submission = Some(submission);
            return self.confirmation();
        }

        match self.landing_view() {
            Some(view) => Screen::Form(view),
            None => Screen::NotFound,
        }
    }

    fn landing_view(&self) -> Option<LandingView> {
        let controller = self.controller.as_ref()?;
        let page_data = controller.page_data()?;
        let mut view = LandingView::build(
            controller.campaign_mailer(),
            page_data,
            &self.config.sms.accepted_country_codes,
        );
        view.submitting = controller.submitting();
        Some(view)
    }

    fn confirmation(&self) -> Screen {
        let controller = self.controller.as_ref();
        let view = ConfirmationView::build(
            self.submission.as_ref(),
            controller.and_then(|c| c.campaign_mailer()),
            controller.and_then(|c| c.page_data()),
        );
        match view {
            ConfirmationView::NotFound => Screen::NotFound,
            view => Screen::Confirmation(view),
        }
    }

    /// Submit the manual landing form. Validation failures are returned for
    /// display and nothing is sent.
    pub async fn submit(
        &mut self,
        email: &str,
        sms: &str,
        preference: &[u32],
    ) -> Result<Screen, FormErrors> {
        let Some(view) = self.landing_view() else {
            return Ok(Screen::NotFound);
        };
        view.form().validate(email, sms, preference)?;

        let Some(controller) = self.controller.as_mut() else {
            return Ok(Screen::NotFound);
        };
        if let Some(error) = controller.fatal_error() {
            return Ok(Screen::Error(error.to_string()));
        }

        let outcome = controller.submit(email, sms, preference).await;
        self.submission = Some(Submission {
            email: email.to_string(),
            sms: sms.to_string(),
            outcome,
        });
        Ok(self.confirmation())
    }

    /// Forwarding address for the feedback widget, when the last submission
    /// asked for feedback.
    pub async fn feedback_address(&self) -> Option<String> {
        if !self.submission.as_ref()?.outcome.collect_feedback {
            return None;
        }
        let mailer = self.controller.as_ref()?.campaign_mailer();
        creative_feedback_address(self.api.as_ref(), mailer).await
    }

    /// Run the complaint check for `email`. `None` when complaints are not
    /// offered for the current campaign.
    pub async fn complaint(&self, email: &str) -> Option<ComplaintOutcome> {
        let mailer = self.controller.as_ref()?.campaign_mailer();
        if !complaint_available(mailer) {
            return None;
        }
        Some(check_complaint(self.api.as_ref(), mailer?, email).await)
    }
}
