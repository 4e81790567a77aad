use crate::config::types::{CrawlOptions, CrawlProfile};
use crate::url::canonicalize;
use crate::ConfigError;

/// Validates a crawl options bag
pub fn validate_options(options: &CrawlOptions) -> Result<(), ConfigError> {
    if options.max_workers < 1 || options.max_workers > 10 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 10, got {}",
            options.max_workers
        )));
    }

    if let Some(limit) = options.page_limit_per_seed {
        if limit == 0 {
            return Err(ConfigError::Validation(format!(
                "page-limit-per-seed must be >= 1, got {}",
                limit
            )));
        }
    }

    if options.max_external_hops < 1 || options.max_external_hops > 5 {
        return Err(ConfigError::Validation(format!(
            "max-external-hops must be between 1 and 5, got {}",
            options.max_external_hops
        )));
    }

    if options.render_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "render-timeout-ms must be >= 100ms, got {}ms",
            options.render_timeout_ms
        )));
    }

    Ok(())
}

/// Validates a full crawl profile
pub fn validate_profile(profile: &CrawlProfile) -> Result<(), ConfigError> {
    if profile.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "profile must list at least one seed URL".to_string(),
        ));
    }

    // Every listed seed must canonicalize; a profile is authored by hand
    // and a typo should fail loudly rather than be silently skipped.
    for seed in &profile.seeds {
        canonicalize(seed).map_err(|e| ConfigError::InvalidSeed(format!("{}: {}", seed, e)))?;
    }

    if profile.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    validate_options(&profile.options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(validate_options(&CrawlOptions::default()).is_ok());
    }

    #[test]
    fn test_worker_bounds() {
        let mut options = CrawlOptions {
            max_workers: 0,
            ..Default::default()
        };
        assert!(validate_options(&options).is_err());
        options.max_workers = 11;
        assert!(validate_options(&options).is_err());
        options.max_workers = 10;
        assert!(validate_options(&options).is_ok());
    }

    #[test]
    fn test_hop_bounds() {
        let options = CrawlOptions {
            max_external_hops: 6,
            ..Default::default()
        };
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let options = CrawlOptions {
            page_limit_per_seed: Some(0),
            ..Default::default()
        };
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn test_profile_requires_seeds() {
        let profile = CrawlProfile {
            seeds: vec![],
            database_path: "./x.db".to_string(),
            options: CrawlOptions::default(),
        };
        assert!(validate_profile(&profile).is_err());
    }

    #[test]
    fn test_profile_rejects_bad_seed() {
        let profile = CrawlProfile {
            seeds: vec!["not a url".to_string()],
            database_path: "./x.db".to_string(),
            options: CrawlOptions::default(),
        };
        assert!(matches!(
            validate_profile(&profile).unwrap_err(),
            ConfigError::InvalidSeed(_)
        ));
    }
}
