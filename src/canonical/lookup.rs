//! Optional code-to-description reference tables.
//!
//! Enrichment is best-effort: an absent or unreadable lookup file means
//! the raw code is used verbatim as its own description, never a failure.

use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub struct CodeLookup {
    map: HashMap<String, String>,
}

impl CodeLookup {
    /// Load a two-column reference CSV, keyed by `code_col`. Returns
    /// `None` when the file is missing or unreadable.
    pub fn load(path: Option<&Path>, code_col: &str, desc_col: &str) -> Option<Self> {
        let path = path?;
        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
            Ok(r) => r,
            Err(e) => {
                warn!("lookup {} unreadable, using raw codes: {e}", path.display());
                return None;
            }
        };
        let headers = match reader.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                warn!("lookup {} has no header, using raw codes: {e}", path.display());
                return None;
            }
        };
        let code_idx = column_index(&headers, code_col)?;
        let desc_idx = column_index(&headers, desc_col)?;

        let mut map = HashMap::new();
        for record in reader.records().flatten() {
            let code = record.get(code_idx).map(str::trim).unwrap_or("");
            let desc = record.get(desc_idx).map(str::trim).unwrap_or("");
            if !code.is_empty() && !desc.is_empty() {
                map.insert(code.to_string(), desc.to_string());
            }
        }
        info!("loaded lookup {}: {} codes", path.display(), map.len());
        Some(Self { map })
    }

    pub fn describe(&self, code: &str) -> String {
        self.map
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// Description for `code` through an optional lookup table. With no table
/// the code stands in for itself.
pub fn describe(lookup: Option<&CodeLookup>, code: &str) -> String {
    match lookup {
        Some(l) => l.describe(code),
        None => code.to_string(),
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn absent_file_falls_back_to_raw_codes() {
        let lookup = CodeLookup::load(None, "CALL_TYPE", "DESCRIPTION");
        assert!(lookup.is_none());
        assert_eq!(describe(lookup.as_ref(), "459A"), "459A");
    }

    #[test]
    fn present_file_enriches_known_codes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call_type_desc.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "CALL_TYPE,DESCRIPTION").unwrap();
        writeln!(f, "459A,AUDIBLE BURGLARY ALARM").unwrap();
        writeln!(f, "415,DISTURBANCE").unwrap();
        drop(f);

        let lookup = CodeLookup::load(Some(&path), "CALL_TYPE", "DESCRIPTION").unwrap();
        assert_eq!(lookup.describe("459A"), "AUDIBLE BURGLARY ALARM");
        assert_eq!(lookup.describe("999Z"), "999Z");
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispo_code_desc.csv");
        std::fs::write(&path, "dispo_code,description\nK,REPORT TAKEN\n").unwrap();
        let lookup = CodeLookup::load(Some(&path), "DISPO_CODE", "DESCRIPTION").unwrap();
        assert_eq!(lookup.describe("K"), "REPORT TAKEN");
    }
}
