use serde::{Deserialize, Serialize};

/// Bin label that legacy data uses to mean "no classification".
///
/// A stored bin with this exact label is treated the same as a missing fact.
pub const NONE_LABEL: &str = "None";

/// The outcome of classifying one object name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// The object name exactly as it was requested.
    pub object_name: String,
    /// The bin the object belongs in. Open-ended; not checked against a vocabulary.
    pub bin_type: String,
}

impl Classification {
    /// Create a classification result.
    pub fn new(object_name: impl Into<String>, bin_type: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            bin_type: bin_type.into(),
        }
    }
}

/// Returns the bin label if it carries real data, `None` if it is missing or
/// equals [`NONE_LABEL`].
pub fn known_bin(bin: Option<String>) -> Option<String> {
    bin.filter(|b| b != NONE_LABEL)
}

/// Label used for a bin in prompt context lines; absent bins render as `None`.
pub fn display_bin(bin: Option<&str>) -> &str {
    bin.unwrap_or(NONE_LABEL)
}
