use crate::contracts::PreferenceOption;
use lazy_static::lazy_static;
use regex::Regex;

/// Longest address the backend storage accepts.
const MAX_EMAIL_LENGTH: usize = 200;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r#"^(([a-zA-Z0-9!#$%&'*+/=?^_{|}~-]+(\.[a-zA-Z0-9!#$%&'*+/=?^_{|}~-]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#
    )
    .unwrap();
    static ref NUMBERING_PLANS: Vec<NumberingPlan> = PLANS
        .iter()
        .map(|&(country, calling_code, pattern, groups)| NumberingPlan {
            country,
            calling_code,
            national: Regex::new(pattern).unwrap(),
            groups,
        })
        .collect();
}

struct NumberingPlan {
    country: &'static str,
    calling_code: &'static str,
    national: Regex,
    groups: &'static [usize],
}

/// (country, calling code, national number pattern, display grouping)
const PLANS: &[(&str, &str, &str, &[usize])] = &[
    // N11 codes are service numbers, never area codes.
    ("US", "1", r"^[2-9](?:[02-9]\d|1[02-9])[2-9]\d{6}$", &[3, 3, 4]),
    ("GB", "44", r"^(?:7\d{9}|[1-3]\d{8,9}|8\d{9})$", &[4, 6]),
    ("AU", "61", r"^[2-478]\d{8}$", &[3, 3, 3]),
    ("NZ", "64", r"^(?:2\d{7,9}|[3-9]\d{7})$", &[2, 3, 4]),
    ("IE", "353", r"^(?:8[35-9]\d{7}|[1-9]\d{7,8})$", &[2, 3, 4]),
    ("DE", "49", r"^[1-9]\d{6,11}$", &[3, 8]),
    ("FR", "33", r"^[1-9]\d{8}$", &[1, 2, 2, 2, 2]),
    ("IN", "91", r"^[6-9]\d{9}$", &[5, 5]),
    ("ZA", "27", r"^[1-8]\d{8}$", &[2, 3, 4]),
];

/// Area codes that place a +1 number in Canada rather than the US.
const CANADIAN_AREA_CODES: &[&str] = &[
    "204", "226", "236", "249", "250", "263", "289", "306", "343", "354", "365", "367", "368",
    "382", "403", "416", "418", "428", "431", "437", "438", "450", "468", "474", "506", "514",
    "519", "548", "579", "581", "584", "587", "604", "613", "639", "647", "672", "683", "705",
    "709", "742", "753", "778", "780", "782", "807", "819", "825", "867", "873", "879", "902",
    "905",
];

/// +1 area codes assigned to countries and territories other than the US.
const NANP_REGIONS: &[(&str, &str)] = &[
    ("242", "BS"),
    ("246", "BB"),
    ("264", "AI"),
    ("268", "AG"),
    ("284", "VG"),
    ("340", "VI"),
    ("345", "KY"),
    ("441", "BM"),
    ("473", "GD"),
    ("649", "TC"),
    ("658", "JM"),
    ("664", "MS"),
    ("670", "MP"),
    ("671", "GU"),
    ("684", "AS"),
    ("721", "SX"),
    ("758", "LC"),
    ("767", "DM"),
    ("784", "VC"),
    ("787", "PR"),
    ("809", "DO"),
    ("829", "DO"),
    ("849", "DO"),
    ("868", "TT"),
    ("869", "KN"),
    ("876", "JM"),
    ("939", "PR"),
];

/// Region of a +1 number from its area code.
fn nanp_region(area_code: &str) -> &'static str {
    if CANADIAN_AREA_CODES.contains(&area_code) {
        return "CA";
    }
    NANP_REGIONS
        .iter()
        .find(|(code, _)| *code == area_code)
        .map_or("US", |&(_, region)| region)
}

/// A phone number split into its calling code and national number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPhone {
    pub country: &'static str,
    pub calling_code: &'static str,
    pub national: String,
}

pub fn validate_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_PATTERN.is_match(email)
}

/// Parse an international number (optionally `+` prefixed, may contain
/// spaces, dashes, dots or parentheses).
pub fn parse_international_phone(phone: &str) -> Option<ParsedPhone> {
    let trimmed = phone.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut digits = String::with_capacity(without_plus.len());
    for c in without_plus.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    // Calling codes are prefix-free, try the longest first.
    for len in (1..=3).rev() {
        if digits.len() <= len {
            continue;
        }
        let (code, national) = digits.split_at(len);
        let Some(plan) = NUMBERING_PLANS.iter().find(|p| p.calling_code == code) else {
            continue;
        };
        if !plan.national.is_match(national) {
            return None;
        }
        let country = if plan.calling_code == "1" {
            nanp_region(&national[..3])
        } else {
            plan.country
        };
        return Some(ParsedPhone {
            country,
            calling_code: plan.calling_code,
            national: national.to_string(),
        });
    }

    None
}

/// Validate an international phone number, optionally limited to the given
/// ISO country codes (case-insensitive). An empty list accepts any country.
pub fn validate_international_phone(phone: &str, accepted_country_codes: &[String]) -> bool {
    let Some(parsed) = parse_international_phone(phone) else {
        return false;
    };

    accepted_country_codes.is_empty()
        || accepted_country_codes
            .iter()
            .any(|code| code.eq_ignore_ascii_case(parsed.country))
}

/// Format as `+<calling code> <groups>`, or return the trimmed input when the
/// number can't be parsed.
pub fn format_international_phone(phone: &str) -> String {
    let Some(parsed) = parse_international_phone(phone) else {
        return phone.trim().to_string();
    };
    let groups = NUMBERING_PLANS
        .iter()
        .find(|p| p.calling_code == parsed.calling_code)
        .map(|p| p.groups)
        .unwrap_or(&[]);

    let mut formatted = format!("+{}", parsed.calling_code);
    let mut rest = parsed.national.as_str();
    for (i, size) in groups.iter().enumerate() {
        if rest.is_empty() {
            break;
        }
        // The last group takes whatever is left.
        let take = if i + 1 == groups.len() {
            rest.len()
        } else {
            (*size).min(rest.len())
        };
        let (group, remaining) = rest.split_at(take);
        formatted.push(' ');
        formatted.push_str(group);
        rest = remaining;
    }
    if !rest.is_empty() {
        formatted.push(' ');
        formatted.push_str(rest);
    }

    formatted
}

/// When preference options exist at least one must be selected.
pub fn validate_preference(preference: &[u32], options: &[PreferenceOption]) -> bool {
    options.is_empty() || !preference.is_empty()
}
