//! Configuration options for ETON encoding.
//!
//! - [`EncodeOptions`]: audit lines, symbolization thresholds and dictionary form
//! - [`DictionaryFormat`]: line (`%Symbol`) or JSON-object (`%Symbol:JSON`) dictionary
//!
//! ## Examples
//!
//! ```rust
//! use eton::{DictionaryFormat, EncodeOptions};
//!
//! // Symbolize every string, no audit lines, JSON dictionary
//! let options = EncodeOptions::new()
//!     .with_audit(false)
//!     .with_threshold(0)
//!     .with_dictionary_format(DictionaryFormat::Json);
//! assert_eq!(options.threshold, 0);
//! ```

use crate::symbols::SymbolPolicy;
use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Default minimum text length (in characters) for a value to be symbolized.
pub const DEFAULT_THRESHOLD: usize = 1000;

/// Default magnitude below which numbers stay literal.
pub const DEFAULT_NUMERIC_THRESHOLD: f64 = 1000.0;

/// Wire form of the dictionary block.
///
/// `Lines` is the flat form recommended for tabular data, `Json` the
/// object form recommended for nested data. `Auto` picks one with
/// [`crate::detect_recommended_format`].
///
/// # Examples
///
/// ```rust
/// use eton::DictionaryFormat;
///
/// assert_eq!("json".parse::<DictionaryFormat>().unwrap(), DictionaryFormat::Json);
/// assert_eq!("csv".parse::<DictionaryFormat>().unwrap(), DictionaryFormat::Lines);
/// assert_eq!(DictionaryFormat::Lines.to_string(), "lines");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DictionaryFormat {
    #[default]
    Auto,
    Lines,
    Json,
}

impl DictionaryFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DictionaryFormat::Auto => "auto",
            DictionaryFormat::Lines => "lines",
            DictionaryFormat::Json => "json",
        }
    }
}

impl fmt::Display for DictionaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DictionaryFormat::Auto),
            "lines" | "csv" | "flat" => Ok(DictionaryFormat::Lines),
            "json" | "nested" => Ok(DictionaryFormat::Json),
            other => Err(Error::custom(format!(
                "unknown dictionary format '{}' (expected auto, lines or json)",
                other
            ))),
        }
    }
}

/// Options for the batch encoder, `dumps` and the stream encoder.
///
/// Defaults: audit lines on, threshold 1000, numeric threshold 1000,
/// automatic dictionary form. The stream encoder never writes audit lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeOptions {
    /// Emit a raw `!` audit line after every data line.
    pub audit: bool,
    /// Strings (and large numbers) whose text has at least this many
    /// characters are replaced by a token.
    pub threshold: usize,
    /// Numbers whose magnitude is strictly below this stay literal.
    pub numeric_threshold: f64,
    pub dictionary_format: DictionaryFormat,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            audit: true,
            threshold: DEFAULT_THRESHOLD,
            numeric_threshold: DEFAULT_NUMERIC_THRESHOLD,
            dictionary_format: DictionaryFormat::default(),
        }
    }
}

impl EncodeOptions {
    /// Creates default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eton::EncodeOptions;
    ///
    /// let options = EncodeOptions::new();
    /// assert!(options.audit);
    /// assert_eq!(options.threshold, 1000);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the minimum text length for symbolization. `0` symbolizes every
    /// string, including the empty one.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_numeric_threshold(mut self, numeric_threshold: f64) -> Self {
        self.numeric_threshold = numeric_threshold;
        self
    }

    #[must_use]
    pub fn with_dictionary_format(mut self, format: DictionaryFormat) -> Self {
        self.dictionary_format = format;
        self
    }

    /// The symbolization policy these options describe.
    #[must_use]
    pub fn policy(&self) -> SymbolPolicy {
        SymbolPolicy {
            threshold: self.threshold,
            numeric_threshold: self.numeric_threshold,
        }
    }
}
