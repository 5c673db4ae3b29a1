//! Grid configuration.
//!
//! [`GridOptions`] is consumed once at construction. It can be built in
//! code or loaded from TOML/JSON (feature `options-config`, on by default):
//!
//! ```toml
//! column = 12
//! float = false
//! max_row = 0
//! min_row = 0
//! one_column_dom_sort = false
//! ```
//!
//! Every field has a default, so an empty document yields
//! `GridOptions::default()`.

use serde::{Deserialize, Serialize};

/// Default number of columns.
pub const DEFAULT_COLUMN: u16 = 12;

/// Construction-time configuration for a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Number of horizontal cells (> 0).
    pub column: u16,
    /// Float mode: nodes keep their position instead of rising.
    pub float: bool,
    /// Maximum rows; 0 means unbounded.
    pub max_row: u16,
    /// Minimum reported row count; does not constrain placement.
    pub min_row: u16,
    /// One-column mode keeps insertion order instead of sorting by `(y, x)`.
    pub one_column_dom_sort: bool,
    /// New nodes default to `no_move`.
    pub disable_drag: bool,
    /// New nodes default to `no_resize`.
    pub disable_resize: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            column: DEFAULT_COLUMN,
            float: false,
            max_row: 0,
            min_row: 0,
            one_column_dom_sort: false,
            disable_drag: false,
            disable_resize: false,
        }
    }
}

impl GridOptions {
    #[must_use]
    pub fn column(mut self, column: u16) -> Self {
        self.column = column;
        self
    }

    #[must_use]
    pub fn float(mut self, float: bool) -> Self {
        self.float = float;
        self
    }

    #[must_use]
    pub fn max_row(mut self, max_row: u16) -> Self {
        self.max_row = max_row;
        self
    }

    #[must_use]
    pub fn min_row(mut self, min_row: u16) -> Self {
        self.min_row = min_row;
        self
    }

    /// Fix the grid height: `min_row = max_row = rows`.
    #[must_use]
    pub fn fixed_rows(mut self, rows: u16) -> Self {
        self.min_row = rows;
        self.max_row = rows;
        self
    }

    #[must_use]
    pub fn one_column_dom_sort(mut self, enabled: bool) -> Self {
        self.one_column_dom_sort = enabled;
        self
    }

    #[must_use]
    pub fn disable_drag(mut self, disabled: bool) -> Self {
        self.disable_drag = disabled;
        self
    }

    #[must_use]
    pub fn disable_resize(mut self, disabled: bool) -> Self {
        self.disable_resize = disabled;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "options-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, GridOptionsError> {
        let options: Self = toml::from_str(s).map_err(GridOptionsError::Toml)?;
        options.checked()
    }

    /// Load from a JSON string.
    #[cfg(feature = "options-config")]
    pub fn from_json_str(s: &str) -> Result<Self, GridOptionsError> {
        let options: Self = serde_json::from_str(s).map_err(GridOptionsError::Json)?;
        options.checked()
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the options
    /// are valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.column == 0 {
            errors.push("column must be > 0".to_string());
        }

        if self.max_row > 0 && self.min_row > self.max_row {
            errors.push(format!(
                "min_row ({}) must not exceed max_row ({})",
                self.min_row, self.max_row
            ));
        }

        errors
    }

    /// `Ok(self)` when [`validate`](Self::validate) reports nothing.
    pub fn checked(self) -> Result<Self, GridOptionsError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(GridOptionsError::Validation(errors))
        }
    }
}

/// Errors from loading or validating [`GridOptions`].
#[derive(Debug, thiserror::Error)]
pub enum GridOptionsError {
    #[cfg(feature = "options-config")]
    #[error("TOML parse error: {0}")]
    Toml(toml::de::Error),
    #[cfg(feature = "options-config")]
    #[error("JSON parse error: {0}")]
    Json(serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = GridOptions::default();
        assert_eq!(options.column, 12);
        assert!(!options.float);
        assert_eq!(options.max_row, 0);
        assert_eq!(options.min_row, 0);
        assert!(options.validate().is_empty());
    }

    #[test]
    fn validate_catches_zero_column() {
        let errors = GridOptions::default().column(0).validate();
        assert!(errors.iter().any(|e| e.contains("column")));
    }

    #[test]
    fn validate_catches_min_row_above_max_row() {
        let errors = GridOptions::default().max_row(4).min_row(6).validate();
        assert!(errors.iter().any(|e| e.contains("min_row")));
        assert!(GridOptions::default().min_row(6).validate().is_empty());
    }

    #[test]
    fn fixed_rows_sets_both_limits() {
        let options = GridOptions::default().fixed_rows(8);
        assert_eq!((options.min_row, options.max_row), (8, 8));
    }

    #[cfg(feature = "options-config")]
    #[test]
    fn toml_partial_document_keeps_defaults() {
        let options = GridOptions::from_toml_str("column = 6\nfloat = true\n").expect("parse");
        assert_eq!(options.column, 6);
        assert!(options.float);
        assert_eq!(options.max_row, 0);
    }

    #[cfg(feature = "options-config")]
    #[test]
    fn json_round_trip() {
        let options = GridOptions::default().max_row(10).one_column_dom_sort(true);
        let json = serde_json::to_string(&options).expect("serialize");
        assert_eq!(GridOptions::from_json_str(&json).expect("parse"), options);
    }

    #[cfg(feature = "options-config")]
    #[test]
    fn loading_rejects_invalid_values() {
        let err = GridOptions::from_json_str(r#"{"column": 0}"#).expect_err("column 0");
        assert!(matches!(err, GridOptionsError::Validation(_)));
        let err = GridOptions::from_toml_str("column = \"wide\"").expect_err("bad type");
        assert!(matches!(err, GridOptionsError::Toml(_)));
    }
}
