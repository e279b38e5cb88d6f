use crate::contracts::CampaignMailer;
use crate::controller::Submission;
use crate::page_data::PageData;
use crate::validate::format_international_phone;
use url::form_urlencoded;

const AD_EMBED_URL: &str = "https://www.commissionsoup.com/api/offers/v2.ashx?c=19695&thm=213";

/// Ad site URL with tracking parameters, or `None` when the campaign has no
/// redirect configured.
pub fn ad_redirect_url(mailer: &CampaignMailer) -> Option<String> {
    let base = mailer
        .optout_ad_redirect_url
        .as_deref()
        .filter(|url| !url.is_empty())?;

    let mut params = form_urlencoded::Serializer::new(String::new());
    params
        .append_pair("utm_source", "live")
        .append_pair("utm_medium", "traffic")
        .append_pair("utm_campaign", "one")
        .append_pair("sc", &mailer.source_client_id.to_string());
    // Sub-mailer keys only.
    if let Some(target) = mailer.target_client_id {
        params.append_pair("tc", &target.to_string());
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    Some(format!("{base}{separator}{}", params.finish()))
}

/// Embedded ad shown when no redirect is configured.
pub fn advertisement_url(mailer: &CampaignMailer) -> String {
    format!(
        "{AD_EMBED_URL}&s={}&s2={}&s3={}&s4={}&s5=1",
        mailer.source_client_id,
        mailer
            .jailed_advertiser_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        mailer.campaign_id,
        mailer.mailer_id
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationView {
    /// Reached without a submission.
    NotFound,
    /// Leave for the advertiser's site.
    Redirect { url: String },
    Content {
        title: Option<String>,
        /// The opted-out email, or the formatted phone number.
        unsubscribed: String,
        content: Option<String>,
        collect_feedback: bool,
        advertisement: Option<String>,
    },
}

impl ConfirmationView {
    pub fn build(
        submission: Option<&Submission>,
        mailer: Option<&CampaignMailer>,
        page_data: Option<&PageData>,
    ) -> Self {
        let Some(submission) = submission.filter(|s| !s.email.is_empty() || !s.sms.is_empty())
        else {
            return ConfirmationView::NotFound;
        };
        let outcome = submission.outcome;

        if outcome.show_ad {
            if let Some(url) = mailer.and_then(ad_redirect_url) {
                return ConfirmationView::Redirect { url };
            }
        }

        let unsubscribed = if submission.email.is_empty() {
            format_international_phone(&submission.sms)
        } else {
            submission.email.clone()
        };

        ConfirmationView::Content {
            title: page_data.and_then(|p| p.confirmation.title.clone()),
            unsubscribed,
            content: page_data.and_then(|p| p.confirmation.content.clone()),
            collect_feedback: outcome.collect_feedback,
            advertisement: mailer
                .filter(|_| outcome.show_ad)
                .map(advertisement_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OptoutType;
    use crate::controller::SubmissionOutcome;
    use crate::page_data::{default_page_data, DEFAULT_CONFIRMATION_TITLE};
    use crate::testing;

    fn submission(email: &str, sms: &str, show_ad: bool, collect_feedback: bool) -> Submission {
        Submission {
            email: email.to_string(),
            sms: sms.to_string(),
            outcome: SubmissionOutcome {
                show_ad,
                collect_feedback,
            },
        }
    }

    #[test]
    fn test_ad_redirect_url_params() {
        let mut mailer = testing::mailer(OptoutType::Email);
        assert_eq!(ad_redirect_url(&mailer), None);

        mailer.optout_ad_redirect_url = Some("https://ads.example.com/landing".to_string());
        assert_eq!(
            ad_redirect_url(&mailer).unwrap(),
            "https://ads.example.com/landing?utm_source=live&utm_medium=traffic&utm_campaign=one&sc=404"
        );

        mailer.optout_ad_redirect_url = Some("https://ads.example.com/?ref=abc".to_string());
        mailer.target_client_id = Some(505);
        assert_eq!(
            ad_redirect_url(&mailer).unwrap(),
            "https://ads.example.com/?ref=abc&utm_source=live&utm_medium=traffic&utm_campaign=one&sc=404&tc=505"
        );
    }

    #[test]
    fn test_advertisement_url() {
        let mut mailer = testing::mailer(OptoutType::Email);
        mailer.jailed_advertiser_id = Some(9);
        assert_eq!(
            advertisement_url(&mailer),
            "https://www.commissionsoup.com/api/offers/v2.ashx?c=19695&thm=213&s=404&s2=9&s3=101&s4=202&s5=1"
        );
    }

    #[test]
    fn test_not_found_without_submission() {
        let mailer = testing::mailer(OptoutType::Email);
        assert_eq!(
            ConfirmationView::build(None, Some(&mailer), None),
            ConfirmationView::NotFound
        );
        assert_eq!(
            ConfirmationView::build(Some(&submission("", "", false, false)), Some(&mailer), None),
            ConfirmationView::NotFound
        );
    }

    #[test]
    fn test_redirects_to_configured_ad() {
        let mut mailer = testing::mailer(OptoutType::Email);
        mailer.optout_ad_redirect_url = Some("https://ads.example.com".to_string());

        let view = ConfirmationView::build(
            Some(&submission("user@example.com", "", true, false)),
            Some(&mailer),
            None,
        );
        assert!(matches!(view, ConfirmationView::Redirect { url } if url.starts_with("https://ads.example.com?utm_source=live")));
    }

    #[test]
    fn test_embedded_ad_without_redirect() {
        let mailer = testing::mailer(OptoutType::Email);
        let page_data = default_page_data(OptoutType::Email);

        let view = ConfirmationView::build(
            Some(&submission("user@example.com", "", true, false)),
            Some(&mailer),
            Some(&page_data),
        );

        match view {
            ConfirmationView::Content {
                title,
                unsubscribed,
                collect_feedback,
                advertisement,
                ..
            } => {
                assert_eq!(title.as_deref(), Some(DEFAULT_CONFIRMATION_TITLE));
                assert_eq!(unsubscribed, "user@example.com");
                assert!(!collect_feedback);
                assert!(advertisement.unwrap().contains("&s3=101&s4=202"));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn test_sms_content_formats_phone() {
        let mailer = testing::mailer(OptoutType::Sms);
        let mut page_data = default_page_data(OptoutType::Sms);
        page_data.confirmation.content = Some("<p>Done</p>".to_string());

        let view = ConfirmationView::build(
            Some(&submission("", "18083443434", false, false)),
            Some(&mailer),
            Some(&page_data),
        );

        assert_eq!(
            view,
            ConfirmationView::Content {
                title: Some(DEFAULT_CONFIRMATION_TITLE.to_string()),
                unsubscribed: "+1 808 344 3434".to_string(),
                content: Some("<p>Done</p>".to_string()),
                collect_feedback: false,
                advertisement: None,
            }
        );
    }
}
