use crate::config::types::CrawlProfile;
use crate::config::validation::validate_profile;
use crate::ConfigError;
use std::path::Path;

/// Loads and validates a crawl profile from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the TOML profile file
///
/// # Returns
///
/// * `Ok(CrawlProfile)` - Successfully loaded and validated profile
/// * `Err(ConfigError)` - Failed to read, parse, or validate the profile
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use driftnet::config::load_profile;
///
/// let profile = load_profile(Path::new("crawl.toml")).unwrap();
/// println!("Seeds: {:?}", profile.seeds);
/// ```
pub fn load_profile(path: &Path) -> Result<CrawlProfile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let profile: CrawlProfile = toml::from_str(&content)?;
    validate_profile(&profile)?;
    Ok(profile)
}
