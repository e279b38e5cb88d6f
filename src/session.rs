use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Primary and fallback API hosts with a one-way switch between them.
///
/// Once the fallback is engaged it stays engaged for the rest of the session.
#[derive(Debug)]
pub struct ApiEndpoint {
    primary: String,
    fallback: String,
    fallback_engaged: AtomicBool,
}

impl ApiEndpoint {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
            fallback_engaged: AtomicBool::new(false),
        }
    }

    pub fn base_url(&self) -> &str {
        if self.is_fallback_engaged() {
            &self.fallback
        } else {
            &self.primary
        }
    }

    pub fn is_fallback_engaged(&self) -> bool {
        self.fallback_engaged.load(Ordering::SeqCst)
    }

    /// Returns true when this call performed the switch.
    pub fn engage_fallback(&self) -> bool {
        let switched = !self.fallback_engaged.swap(true, Ordering::SeqCst);
        if switched {
            warn!(
                "Primary API {} unreachable, switching to fallback {} for this session",
                display_host(&self.primary),
                self.fallback
            );
        }
        switched
    }
}

fn display_host(url: &str) -> &str {
    if url.is_empty() {
        "(same origin)"
    } else {
        url
    }
}

/// Per-visit state read by every outgoing API call.
#[derive(Debug)]
pub struct Session {
    endpoint: ApiEndpoint,
    access_token: RwLock<Option<String>>,
    no_cache: AtomicBool,
}

impl Session {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self {
            endpoint,
            access_token: RwLock::new(None),
            no_cache: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// Bearer credential returned by key resolution.
    pub fn access_token(&self) -> Option<String> {
        match self.access_token.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        match self.access_token.write() {
            Ok(mut slot) => *slot = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
        info!("Session access token updated");
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache.load(Ordering::SeqCst)
    }

    pub fn set_no_cache(&self, no_cache: bool) {
        self.no_cache.store(no_cache, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_one_way() {
        let endpoint = ApiEndpoint::new("https://api.example.com", "https://fallback.example.com");
        assert_eq!(endpoint.base_url(), "https://api.example.com");
        assert!(!endpoint.is_fallback_engaged());

        assert!(endpoint.engage_fallback());
        assert!(!endpoint.engage_fallback());
        assert_eq!(endpoint.base_url(), "https://fallback.example.com");
        assert!(endpoint.is_fallback_engaged());
    }

    #[test]
    fn test_session_flags() {
        let session = Session::new(ApiEndpoint::new("", "https://fallback.example.com"));
        assert_eq!(session.access_token(), None);
        assert!(!session.no_cache());

        session.set_access_token("jwt-token");
        session.set_no_cache(true);

        assert_eq!(session.access_token().as_deref(), Some("jwt-token"));
        assert!(session.no_cache());
    }
}
