//! Symbol validation utilities.
//!
//! Symbols are the partition key for everything downstream (windows,
//! subscriptions, storage rows), so malformed input is rejected at the edge.

use thiserror::Error;

/// Errors from symbol validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolValidationError {
    /// Symbol is empty
    #[error("symbol cannot be empty")]
    Empty,

    /// Symbol is too long
    #[error("symbol '{symbol}' exceeds maximum length of {max} characters")]
    TooLong { symbol: String, max: usize },

    /// Symbol contains invalid characters
    #[error("symbol '{symbol}' contains invalid characters")]
    InvalidCharacters { symbol: String },

    /// Symbol is not uppercase
    #[error("symbol '{symbol}' must be uppercase")]
    NotUppercase { symbol: String },
}

/// Configuration for symbol validation.
#[derive(Debug, Clone)]
pub struct SymbolValidatorConfig {
    /// Maximum symbol length in bytes (default: 16)
    pub max_length: usize,
    /// Whether to require uppercase (default: true)
    pub require_uppercase: bool,
    /// Whether to allow '.' and '-' in addition to alphanumerics
    /// (share-class tickers like BRK.B; default: true)
    pub allow_punctuation: bool,
}

impl Default for SymbolValidatorConfig {
    fn default() -> Self {
        Self {
            max_length: 16,
            require_uppercase: true,
            allow_punctuation: true,
        }
    }
}

/// Symbol validator with configurable rules.
///
/// Provides both validation-only and normalize-and-validate operations.
///
/// # Example
///
/// ```
/// use ticker_common::validation::SymbolValidator;
///
/// let validator = SymbolValidator::new();
/// assert!(validator.validate("AAPL").is_ok());
/// assert!(validator.validate("aapl").is_err()); // Not uppercase
///
/// // Normalize input (converts to uppercase)
/// assert_eq!(validator.normalize("aapl").unwrap(), "AAPL");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SymbolValidator {
    config: SymbolValidatorConfig,
}

impl SymbolValidator {
    /// Create a validator with default rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom rules.
    pub fn with_config(config: SymbolValidatorConfig) -> Self {
        Self { config }
    }

    fn is_valid_char(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || (self.config.allow_punctuation && (c == '.' || c == '-'))
    }

    /// Validate a symbol without modifying it.
    pub fn validate(&self, symbol: &str) -> Result<(), SymbolValidationError> {
        if symbol.is_empty() {
            return Err(SymbolValidationError::Empty);
        }

        if symbol.len() > self.config.max_length {
            return Err(SymbolValidationError::TooLong {
                symbol: symbol.to_string(),
                max: self.config.max_length,
            });
        }

        if !symbol.chars().all(|c| self.is_valid_char(c)) {
            return Err(SymbolValidationError::InvalidCharacters {
                symbol: symbol.to_string(),
            });
        }

        if self.config.require_uppercase && symbol.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(SymbolValidationError::NotUppercase {
                symbol: symbol.to_string(),
            });
        }

        Ok(())
    }

    /// Uppercase, trim and validate a symbol, returning the normalized form.
    pub fn normalize(&self, symbol: &str) -> Result<String, SymbolValidationError> {
        let normalized = symbol.trim().to_ascii_uppercase();
        self.validate(&normalized)?;
        Ok(normalized)
    }
}
