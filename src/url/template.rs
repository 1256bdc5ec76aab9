//! Placeholder detection in URL templates

use super::Placeholder;
use crate::{UrlError, UrlResult};

/// A base URL with its single placeholder identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    base: String,
    placeholder: Placeholder,
}

impl UrlTemplate {
    /// Parses a template
    ///
    /// The same placeholder may appear more than once; every occurrence is
    /// substituted with the same value.
    ///
    /// # Errors
    ///
    /// * [`UrlError::EmptyBase`] - `base` is empty
    /// * [`UrlError::MissingPlaceholder`] - no recognized placeholder
    /// * [`UrlError::MultiplePlaceholders`] - two or more different placeholders
    pub fn parse(base: &str) -> UrlResult<Self> {
        if base.trim().is_empty() {
            return Err(UrlError::EmptyBase);
        }

        let found: Vec<Placeholder> = Placeholder::ALL
            .into_iter()
            .filter(|placeholder| base.contains(placeholder.token()))
            .collect();

        match found.as_slice() {
            [] => Err(UrlError::MissingPlaceholder(base.to_string())),
            [placeholder] => Ok(Self {
                base: base.to_string(),
                placeholder: *placeholder,
            }),
            many => Err(UrlError::MultiplePlaceholders(
                many.iter().map(|p| p.token().to_string()).collect(),
            )),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Substitutes `value` for the placeholder
    pub fn fill(&self, value: &str) -> String {
        self.base.replace(self.placeholder.token(), value)
    }
}
