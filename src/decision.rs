use crate::config::FeedbackConfig;
use rand::Rng;

/// Bernoulli draw against the campaign's ad ratio. Not deterministic.
pub fn should_show_ad<R: Rng>(ratio: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < ratio
}

/// Decides whether an opted-out address is asked to forward the creative.
#[derive(Debug, Clone)]
pub struct FeedbackPolicy {
    ratio: f64,
    domains: Vec<String>,
    always_collect: String,
    never_collect: String,
}

impl FeedbackPolicy {
    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self {
            ratio: config.collection_ratio,
            domains: config.domains.iter().map(|d| d.to_lowercase()).collect(),
            always_collect: config.always_collect.clone(),
            never_collect: config.never_collect.clone(),
        }
    }

    /// Addresses outside the recognised providers never collect. The two
    /// reserved local parts are deterministic, everything else is a draw.
    pub fn is_eligible<R: Rng>(&self, email: &str, rng: &mut R) -> bool {
        let Some((name, domain)) = email.split_once('@') else {
            return false;
        };
        let domain = domain.to_lowercase();
        if !self.domains.iter().any(|d| domain.starts_with(d.as_str())) {
            return false;
        }
        if name == self.always_collect {
            return true;
        }
        if name == self.never_collect {
            return false;
        }

        rng.gen::<f64>() < self.ratio
    }
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self::from_config(&FeedbackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ad_ratio_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(!should_show_ad(0.0, &mut rng));
            assert!(should_show_ad(1.0, &mut rng));
        }
    }

    #[test]
    fn test_ad_ratio_is_roughly_respected() {
        let mut rng = StdRng::seed_from_u64(42);
        let shown = (0..10_000).filter(|_| should_show_ad(0.3, &mut rng)).count();
        assert!((2_500..3_500).contains(&shown), "shown {shown} times");
    }

    #[test]
    fn test_reserved_test_accounts() {
        let policy = FeedbackPolicy::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(policy.is_eligible("testclb@gmail.com", &mut rng));
            assert!(policy.is_eligible("testclb@Yahoo.co.uk", &mut rng));
            assert!(!policy.is_eligible("testnotclb@gmail.com", &mut rng));
        }
    }

    #[test]
    fn test_unrecognised_domains_never_collect() {
        let policy = FeedbackPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(!policy.is_eligible("testclb@example.com", &mut rng));
            assert!(!policy.is_eligible("someone@mygmail.com", &mut rng));
            assert!(!policy.is_eligible("not-an-email", &mut rng));
        }
    }

    #[test]
    fn test_collection_ratio_draw() {
        let mut config = FeedbackConfig::default();
        config.collection_ratio = 0.0;
        let never = FeedbackPolicy::from_config(&config);
        config.collection_ratio = 1.0;
        let always = FeedbackPolicy::from_config(&config);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..100 {
            assert!(!never.is_eligible("jane@hotmail.com", &mut rng));
            assert!(always.is_eligible("jane@hotmail.com", &mut rng));
        }
    }
}
