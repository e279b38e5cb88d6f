use crate::client::OptoutApi;
use crate::contracts::{CampaignMailer, OptoutType};
use crate::validate::validate_email;
use log::{error, info};

pub fn feedback_forward_email(token: &str, legacy_key: &str) -> String {
    format!("clb_{token}_{legacy_key}@optout-feedback.com")
}

/// Only the first `@` is obfuscated.
pub fn complaint_forward_email(token: &str, email: &str, legacy_key: &str) -> String {
    let email = email.replacen('@', "{a}", 1);
    format!("{token}_{email}_{legacy_key}@optout-complaint.com")
}

/// Address the user can forward the marketing email to. `None` hides the
/// feedback widget.
pub async fn creative_feedback_address(
    api: &dyn OptoutApi,
    mailer: Option<&CampaignMailer>,
) -> Option<String> {
    let mailer = mailer?;
    match api.simple_token().await {
        Ok(token) => Some(feedback_forward_email(&token, &mailer.legacy_key)),
        Err(e) => {
            error!("Failed to fetch feedback token: {e}");
            None
        }
    }
}

/// Complaints are offered for email campaigns only.
pub fn complaint_available(mailer: Option<&CampaignMailer>) -> bool {
    mailer.map_or(false, |m| m.optout_type == OptoutType::Email)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintOutcome {
    InvalidEmail,
    Ineligible { reason: Option<String> },
    /// Forwarding needs a token; without one the check stops at step one.
    Eligible { forward_address: Option<String> },
    /// The eligibility check itself failed.
    Unavailable,
}

impl ComplaintOutcome {
    pub fn message(&self, email: &str) -> String {
        match self {
            ComplaintOutcome::InvalidEmail => "Please enter a valid email address.".to_string(),
            ComplaintOutcome::Ineligible { reason } => reason.clone().unwrap_or_default(),
            ComplaintOutcome::Eligible { .. } => format!(
                "The email address {email} is found. Please proceed to the next step."
            ),
            ComplaintOutcome::Unavailable => String::new(),
        }
    }
}

/// Two step complaint flow: validate and check the address, then hand out a
/// forwarding address when the backend issued a token.
pub async fn check_complaint(
    api: &dyn OptoutApi,
    mailer: &CampaignMailer,
    email: &str,
) -> ComplaintOutcome {
    if !validate_email(email) {
        return ComplaintOutcome::InvalidEmail;
    }

    let eligibility = match api
        .check_complaint_eligibility(mailer.campaign_id, email)
        .await
    {
        Ok(eligibility) => eligibility,
        Err(e) => {
            error!("Complaint eligibility check failed: {e}");
            return ComplaintOutcome::Unavailable;
        }
    };

    if !eligibility.eligible {
        info!(
            "Complaint for campaign {} not eligible: {:?}",
            mailer.campaign_id, eligibility.reason
        );
        return ComplaintOutcome::Ineligible {
            reason: eligibility.reason,
        };
    }

    ComplaintOutcome::Eligible {
        forward_address: eligibility
            .token
            .map(|token| complaint_forward_email(&token, email, &mailer.legacy_key)),
    }
}
