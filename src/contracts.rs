use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel an opt-out campaign collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptoutType {
    #[default]
    Email,
    Sms,
}

impl fmt::Display for OptoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptoutType::Email => write!(f, "email"),
            OptoutType::Sms => write!(f, "sms"),
        }
    }
}

/// Wire response of the opt-out key resolution call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptoutKeyResponse {
    pub token: String,
    pub campaign_id: u64,
    pub mailer_id: u64,
    pub cma_id: u64,
    #[serde(default)]
    pub jailed_advertiser_id: Option<u64>,
    #[serde(default)]
    pub optout_ad_ratio: f64,
    #[serde(default)]
    pub optout_ad_redirect_url: Option<String>,
    pub source_client_id: u64,
    #[serde(default)]
    pub target_client_id: Option<u64>,
    #[serde(default)]
    pub optout_type: Option<OptoutType>,
}

/// Resolved identity of an opt-out campaign: campaign, mailer, client routing
/// and ad redirection details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMailer {
    pub token: String,
    pub campaign_id: u64,
    pub mailer_id: u64,
    pub cma_id: u64,
    pub jailed_advertiser_id: Option<u64>,
    pub optout_ad_ratio: f64,
    pub optout_ad_redirect_url: Option<String>,
    pub source_client_id: u64,
    /// Only present for sub-mailer access keys.
    pub target_client_id: Option<u64>,
    pub optout_type: OptoutType,
    /// Key used to resolve this mailer.
    pub legacy_key: String,
}

impl CampaignMailer {
    pub fn from_response(response: OptoutKeyResponse, key: &str) -> Self {
        Self {
            token: response.token,
            campaign_id: response.campaign_id,
            mailer_id: response.mailer_id,
            cma_id: response.cma_id,
            jailed_advertiser_id: response.jailed_advertiser_id,
            optout_ad_ratio: response.optout_ad_ratio,
            optout_ad_redirect_url: response.optout_ad_redirect_url,
            source_client_id: response.source_client_id,
            target_client_id: response.target_client_id,
            optout_type: response.optout_type.unwrap_or_default(),
            legacy_key: key.to_string(),
        }
    }
}

/// Named CSS rule strings applied to page regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(
        rename = "footer-a",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub footer_a: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceOption {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectResponse {
    pub url: Option<String>,
    pub append_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationResponse {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandingResponse {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "contentBelowEmail")]
    pub content_below_email: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyResponse {
    pub url: Option<String>,
    pub content: Option<String>,
}

/// Wire response of the page customisation call. Most fields may be null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptoutPageResponse {
    #[serde(default)]
    pub style: Option<StyleResult>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub redirect: RedirectResponse,
    #[serde(default)]
    pub confirmation: ConfirmationResponse,
    #[serde(default)]
    pub landing: LandingResponse,
    #[serde(default)]
    pub privacy: PrivacyResponse,
    #[serde(default)]
    pub preference: Option<Vec<PreferenceOption>>,
}

/// Body of the opt-out submission call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOptoutRequest {
    pub mailer_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<String>,
    pub cma_id: u64,
    pub preference: Vec<u32>,
    pub source_client_id: u64,
    pub was_redirected_to_ads: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintEligibility {
    pub eligible: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SimpleTokenResponse {
    pub token: String,
}
