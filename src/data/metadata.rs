use crate::error::MetadataError;

/// Placeholder for a field the token does not carry.
pub const NA: &str = "NA";

/// The six fields encoded in a metadata token such as
/// `20240131_MLSM980_O63x_TPSFo_S100nm_B3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaFields {
    pub date: String,
    pub microscope: String,
    pub objective: String,
    pub test: String,
    pub bead_size: String,
    pub bead_number: String,
}

impl MetaFields {
    /// Fields in fixed order: date, microscope, objective, test, bead size, bead number.
    pub fn as_array(&self) -> [&str; 6] {
        [
            &self.date,
            &self.microscope,
            &self.objective,
            &self.test,
            &self.bead_size,
            &self.bead_number,
        ]
    }
}

/// Split a metadata token into its fields.
///
/// The date is the leading eight characters when they are all digits. Every
/// other field is the text after the *last* occurrence of its marker up to the
/// next underscore, so an `_S` hidden inside an objective name still resolves
/// to the real bead-size segment further right. Missing fields become `"NA"`.
pub fn parse_meta_token(token: &str) -> Result<MetaFields, MetadataError> {
    if token.is_empty() {
        return Err(MetadataError::EmptyToken);
    }

    let head: String = token.chars().take(8).collect();
    let date = if head.len() == 8 && head.chars().all(|c| c.is_ascii_digit()) {
        head
    } else {
        NA.to_string()
    };

    let fields = MetaFields {
        date,
        microscope: after_last_marker(token, "_M"),
        objective: after_last_marker(token, "_O"),
        test: after_last_marker(token, "_T"),
        bead_size: after_last_marker(token, "_S"),
        bead_number: after_last_marker(token, "_B"),
    };

    if fields.as_array().iter().all(|f| *f == NA) {
        return Err(MetadataError::Unusable(token.to_string()));
    }
    Ok(fields)
}

fn after_last_marker(token: &str, marker: &str) -> String {
    match token.rsplit_once(marker) {
        Some((_, tail)) => tail.split('_').next().unwrap_or_default().to_string(),
        None => NA.to_string(),
    }
}

/// `"NA"` and empty fields read as missing.
pub fn optional_field(value: &str) -> Option<String> {
    if value.is_empty() || value == NA {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_token_in_fixed_order() {
        let meta = parse_meta_token("20240131_MLSM980_O63x_TPSFo_S100nm_B3").unwrap();
        assert_eq!(
            meta.as_array(),
            ["20240131", "LSM980", "63x", "PSFo", "100nm", "3"]
        );
    }

    #[test]
    fn missing_markers_become_na() {
        let meta = parse_meta_token("2024ab31_MLSM980_TChromDual").unwrap();
        assert_eq!(meta.date, NA);
        assert_eq!(meta.objective, NA);
        assert_eq!(meta.bead_size, NA);
        assert_eq!(meta.test, "ChromDual");
    }

    #[test]
    fn uses_last_marker_occurrence() {
        // "_S" also appears inside the objective segment.
        let meta = parse_meta_token("20240131_MA_O63x_Sil_TPSFo_S200nm_B12").unwrap();
        assert_eq!(meta.bead_size, "200nm");
        assert_eq!(meta.objective, "63x");
        assert_eq!(meta.bead_number, "12");
    }

    #[test]
    fn marker_at_end_yields_empty_segment() {
        let meta = parse_meta_token("20240131_MA_O_TPSFo_S1_B").unwrap();
        assert_eq!(meta.objective, "");
        assert_eq!(meta.bead_number, "");
    }

    #[test]
    fn short_and_non_ascii_tokens_do_not_panic() {
        assert_eq!(parse_meta_token(""), Err(MetadataError::EmptyToken));
        assert!(parse_meta_token("ü").is_err());
        let meta = parse_meta_token("2024013ü_MX").unwrap();
        assert_eq!(meta.date, NA);
        assert_eq!(meta.microscope, "X");
    }

    #[test]
    fn optional_field_maps_na_to_none() {
        assert_eq!(optional_field("NA"), None);
        assert_eq!(optional_field(""), None);
        assert_eq!(optional_field("3"), Some("3".to_string()));
    }
}
