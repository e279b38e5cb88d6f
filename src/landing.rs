use crate::contracts::{CampaignMailer, OptoutType, PreferenceOption};
use crate::feedback::complaint_available;
use crate::page_data::{css_to_rules, PageData};
use crate::validate::{validate_email, validate_international_phone, validate_preference};
use lazy_static::lazy_static;
use regex::Regex;
use url::form_urlencoded;

lazy_static! {
    static ref OPTOUT_KEY: Regex = Regex::new(r"^o-[a-zA-Z]+-\w+-\w+$").unwrap();
}

/// Relative logos live in the legacy image store.
const LOGO_STORAGE_PATH: &str = "http://www.optout-imgs.net/optouts/";

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const INVALID_PHONE_MESSAGE: &str = "Please enter a valid US/UK phone number.";
pub const MISSING_PREFERENCE_MESSAGE: &str = "Please select a list to unsubscribe from";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing { key: String },
    Confirmation,
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let segment = path.trim_start_matches('/').trim_end_matches('/');
        if segment == "confirmation" {
            Route::Confirmation
        } else if OPTOUT_KEY.is_match(segment) {
            Route::Landing {
                key: segment.to_string(),
            }
        } else {
            Route::NotFound
        }
    }
}

/// Flags read from the landing URL's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingQuery {
    /// One-click opt-out value.
    pub email: Option<String>,
    pub no_cache: bool,
}

impl LandingQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = LandingQuery::default();
        for (name, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match name.as_ref() {
                "email" if parsed.email.is_none() => parsed.email = Some(value.into_owned()),
                "noCache" => parsed.no_cache |= !value.is_empty(),
                _ => {}
            }
        }
        parsed
    }
}

/// Split `/path?query` into its parts.
pub fn split_path_and_query(input: &str) -> (&str, &str) {
    input.split_once('?').unwrap_or((input, ""))
}

pub fn logo_url(logo: &str) -> String {
    if logo.starts_with("data:") || logo.starts_with("http:") || logo.starts_with("https:") {
        logo.to_string()
    } else {
        format!("{LOGO_STORAGE_PATH}{logo}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Email,
    Sms { accepted_countries: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivacyLink {
    /// External privacy page.
    External(String),
    /// Statement shown in place.
    Statement(String),
    Hidden,
}

/// Parsed page styles, one rule list per region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionStyles {
    pub header: Vec<(String, String)>,
    pub container: Vec<(String, String)>,
    pub body: Vec<(String, String)>,
    pub content: Vec<(String, String)>,
    pub footer: Vec<(String, String)>,
    pub footer_link: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingView {
    pub title: Option<String>,
    pub content_above: Option<String>,
    pub content_below: Option<String>,
    pub input: InputKind,
    /// Email campaigns only.
    pub preference_options: Vec<PreferenceOption>,
    pub logo: Option<String>,
    pub privacy: PrivacyLink,
    pub complaint_link: bool,
    pub styles: RegionStyles,
    pub submitting: bool,
}

impl LandingView {
    pub fn build(
        mailer: Option<&CampaignMailer>,
        page_data: &PageData,
        accepted_sms_countries: &[String],
    ) -> Self {
        let optout_type = mailer.map(|m| m.optout_type).unwrap_or_default();
        let landing = &page_data.landing;
        let below = landing.content_below_email.unwrap_or(false);
        let content = landing.content.clone().filter(|c| !c.is_empty());

        let input = match optout_type {
            OptoutType::Email => InputKind::Email,
            OptoutType::Sms => InputKind::Sms {
                accepted_countries: accepted_sms_countries.to_vec(),
            },
        };
        let preference_options = match optout_type {
            OptoutType::Email => page_data.preference_options().to_vec(),
            OptoutType::Sms => Vec::new(),
        };

        let privacy = match (&page_data.privacy.url, &page_data.privacy.content) {
            (Some(url), _) if !url.is_empty() => PrivacyLink::External(url.clone()),
            (_, Some(content)) if !content.is_empty() => PrivacyLink::Statement(content.clone()),
            _ => PrivacyLink::Hidden,
        };

        let style = &page_data.style;
        LandingView {
            title: landing.title.clone(),
            content_above: content.clone().filter(|_| !below),
            content_below: content.filter(|_| below),
            input,
            preference_options,
            logo: page_data.logo.as_deref().filter(|l| !l.is_empty()).map(logo_url),
            privacy,
            complaint_link: complaint_available(mailer),
            styles: RegionStyles {
                header: css_to_rules(style.header.as_deref()),
                container: css_to_rules(style.container.as_deref()),
                body: css_to_rules(style.body.as_deref()),
                content: css_to_rules(style.content.as_deref()),
                footer: css_to_rules(style.footer.as_deref()),
                footer_link: css_to_rules(style.footer_a.as_deref()),
            },
            submitting: false,
        }
    }

    pub fn optout_type(&self) -> OptoutType {
        match self.input {
            InputKind::Email => OptoutType::Email,
            InputKind::Sms { .. } => OptoutType::Sms,
        }
    }

    /// Ids selected by "Unsubscribe from all lists".
    pub fn all_preferences(&self) -> Vec<u32> {
        self.preference_options.iter().map(|o| o.id).collect()
    }

    pub fn form(&self) -> LandingForm {
        let accepted_sms_countries = match &self.input {
            InputKind::Sms { accepted_countries } => accepted_countries.clone(),
            InputKind::Email => Vec::new(),
        };
        LandingForm {
            optout_type: self.optout_type(),
            accepted_sms_countries,
            preference_options: self.preference_options.clone(),
        }
    }
}

/// Field errors of a rejected landing form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub email: Option<&'static str>,
    pub sms: Option<&'static str>,
    pub preference: Option<&'static str>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.sms.is_none() && self.preference.is_none()
    }

    pub fn messages(&self) -> Vec<&'static str> {
        [self.email, self.sms, self.preference]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Manual opt-out form. Only the field matching the campaign type is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingForm {
    optout_type: OptoutType,
    accepted_sms_countries: Vec<String>,
    preference_options: Vec<PreferenceOption>,
}

impl LandingForm {
    pub fn validate(&self, email: &str, sms: &str, preference: &[u32]) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        match self.optout_type {
            OptoutType::Email => {
                if !validate_email(email) {
                    errors.email = Some(INVALID_EMAIL_MESSAGE);
                }
                if !validate_preference(preference, &self.preference_options) {
                    errors.preference = Some(MISSING_PREFERENCE_MESSAGE);
                }
            }
            OptoutType::Sms => {
                if !validate_international_phone(sms, &self.accepted_sms_countries) {
                    errors.sms = Some(INVALID_PHONE_MESSAGE);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
