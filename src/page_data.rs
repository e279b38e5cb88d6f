use crate::contracts::{OptoutPageResponse, OptoutType, PreferenceOption, StyleResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIRMATION_TITLE: &str = "We are sorry to see you go.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedirectData {
    pub url: Option<String>,
    pub append_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationData {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandingData {
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_below_email: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivacyData {
    pub url: Option<String>,
    pub content: Option<String>,
}

/// Content and styling of the landing and confirmation pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    pub style: StyleResult,
    pub logo: Option<String>,
    pub redirect: RedirectData,
    pub confirmation: ConfirmationData,
    pub landing: LandingData,
    pub privacy: PrivacyData,
    pub preference: Option<Vec<PreferenceOption>>,
}

/// Page data used when some or all of the customisation could not be fetched.
pub fn default_page_data(optout_type: OptoutType) -> PageData {
    let subject = match optout_type {
        OptoutType::Email => "an email address",
        OptoutType::Sms => "a phone number",
    };

    PageData {
        landing: LandingData {
            title: Some(format!(
                "Please specify {subject} that you would like removed."
            )),
            content: None,
            content_below_email: Some(false),
        },
        confirmation: ConfirmationData {
            title: Some(DEFAULT_CONFIRMATION_TITLE.to_string()),
            content: None,
        },
        ..PageData::default()
    }
}

impl PageData {
    /// Convert a remote response, with nulls treated as absent.
    pub fn from_response(response: OptoutPageResponse) -> Self {
        Self {
            style: response.style.unwrap_or_default(),
            logo: response.logo,
            redirect: RedirectData {
                url: response.redirect.url,
                append_email: response.redirect.append_email,
            },
            confirmation: ConfirmationData {
                title: response.confirmation.title,
                content: response.confirmation.content,
            },
            landing: LandingData {
                title: response.landing.title,
                content: response.landing.content,
                content_below_email: response.landing.content_below_email,
            },
            privacy: PrivacyData {
                url: response.privacy.url,
                content: response.privacy.content,
            },
            preference: response.preference,
        }
    }

    /// Overlay `other` on `self`. Present values in `other` win, absent values
    /// keep what `self` has.
    pub fn merge(self, other: PageData) -> PageData {
        PageData {
            style: StyleResult {
                header: other.style.header.or(self.style.header),
                container: other.style.container.or(self.style.container),
                body: other.style.body.or(self.style.body),
                content: other.style.content.or(self.style.content),
                footer: other.style.footer.or(self.style.footer),
                footer_a: other.style.footer_a.or(self.style.footer_a),
            },
            logo: other.logo.or(self.logo),
            redirect: RedirectData {
                url: other.redirect.url.or(self.redirect.url),
                append_email: other.redirect.append_email.or(self.redirect.append_email),
            },
            confirmation: ConfirmationData {
                title: other.confirmation.title.or(self.confirmation.title),
                content: other.confirmation.content.or(self.confirmation.content),
            },
            landing: LandingData {
                title: other.landing.title.or(self.landing.title),
                content: other.landing.content.or(self.landing.content),
                content_below_email: other
                    .landing
                    .content_below_email
                    .or(self.landing.content_below_email),
            },
            privacy: PrivacyData {
                url: other.privacy.url.or(self.privacy.url),
                content: other.privacy.content.or(self.privacy.content),
            },
            preference: other.preference.or(self.preference),
        }
    }

    /// Defaults for `optout_type` with the remote response merged on top.
    pub fn resolve(response: OptoutPageResponse, optout_type: OptoutType) -> PageData {
        default_page_data(optout_type).merge(PageData::from_response(response))
    }

    pub fn preference_options(&self) -> &[PreferenceOption] {
        self.preference.as_deref().unwrap_or(&[])
    }
}

/// Parse a semicolon separated CSS declaration list into `(property, value)`
/// pairs with camel-cased property names. Malformed declarations are skipped.
pub fn css_to_rules(css: Option<&str>) -> Vec<(String, String)> {
    let Some(css) = css else {
        return Vec::new();
    };

    let mut rules: Vec<(String, String)> = Vec::new();
    for declaration in css.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = to_camel_case(name.trim());
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        // Later declarations override earlier ones.
        if let Some(existing) = rules.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value;
        } else {
            rules.push((name, value));
        }
    }
    rules
}

/// `font-size` → `fontSize`, `-webkit-box` → `webkitBox`.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' || c.is_whitespace() {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else if out.is_empty() {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
