use crate::components::{HtmlTableParser, HttpMethod};
use crate::config::types::{
    Config, CrawlerConfig, CrawlerRole, OutputConfig, ParserConfig, ParserKind, TargetConfig,
    UserAgentConfig,
};
use crate::{ConfigError, UrlError};
use ::url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_target_config(&config.target)?;
    validate_parser_config(&config.parser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    HttpMethod::dispatch(&config.method)
        .map_err(|e| ConfigError::Validation(format!("method: {}", e)))?;

    if config.retry < 1 {
        return Err(ConfigError::Validation(format!(
            "retry must be >= 1 (total attempts), got {}",
            config.retry
        )));
    }

    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    // The sequential role never takes the guard
    if config.role != CrawlerRole::Simple && !config.lock && config.sema_value == 0 {
        return Err(ConfigError::Validation(format!(
            "sema-value must be > 0 when lock is false for the {} role",
            config.role
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the target without expanding it
///
/// The rule parameters are checked up front by the lazy URL iterator; only
/// the first URL is generated, and it must parse and use http or https.
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let target_error = |e: UrlError| ConfigError::InvalidUrl(format!("target: {}", e));
    let generator = config.generator().map_err(target_error)?;
    let first = generator
        .iter()
        .map(|mut urls| urls.next())
        .map_err(target_error)?;

    let Some(first) = first else {
        return Err(ConfigError::Validation(format!(
            "target '{}' expands to no URLs",
            config.url
        )));
    };

    let url = Url::parse(&first)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", first, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "Target URL '{}' must use HTTP or HTTPS",
            first
        )));
    }

    Ok(())
}

fn validate_parser_config(config: &ParserConfig) -> Result<(), ConfigError> {
    if config.kind == ParserKind::HtmlTable {
        HtmlTableParser::new(&config.selector)
            .map_err(|e| ConfigError::Validation(format!("parser selector: {}", e)))?;
    }

    if config.field.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "parser field cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.destination.trim().is_empty() {
        return Err(ConfigError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
