//! Versioned keyword catalog.
//!
//! Every keyword list the validator consults lives here as data: the five
//! rigorous-gate categories, the thresholds they are compared against, the
//! looser OCR document gate, and the vocabulary used for corpus statistics.
//! The built-in catalog is embedded from `terms/catalog.json`; deployments can
//! point at their own file without recompiling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::CoreError;

const BUILTIN_CATALOG: &str = include_str!("../terms/catalog.json");

/// Full keyword catalog, deserialized from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermCatalog {
    /// Catalog revision. Bump when lists or thresholds change.
    pub version: u32,
    pub rigorous: RigorousTerms,
    pub thresholds: Thresholds,
    pub ocr_gate: OcrGateTerms,
    pub corpus: CorpusTerms,
}

/// The five keyword categories of the rigorous gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigorousTerms {
    pub land_property: Vec<String>,
    pub warehouse_certificate: Vec<String>,
    pub agro_technical: Vec<String>,
    pub official_documentation: Vec<String>,
    /// Any hit vetoes the document.
    pub disqualifying: Vec<String>,
}

/// Minimum counts for the rigorous gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Land terms OR warehouse terms must reach this.
    pub min_type_terms: usize,
    pub min_agro_terms: usize,
    pub min_official_terms: usize,
    /// Dates; a bare 4-digit year also satisfies the date condition.
    pub min_dates: usize,
    /// Tax IDs OR registry numbers must reach this.
    pub min_identifiers: usize,
    /// Length in characters, not bytes.
    pub min_length_chars: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_type_terms: 2,
            min_agro_terms: 1,
            min_official_terms: 1,
            min_dates: 1,
            min_identifiers: 1,
            min_length_chars: 200,
        }
    }
}

/// Lists for the OCR adapter's document-type gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrGateTerms {
    pub required: Vec<String>,
    pub min_required: usize,
    pub disqualifying: Vec<String>,
}

/// Vocabulary for the corpus statistics schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusTerms {
    pub legal_terms: Vec<String>,
    /// Short keyword subset counted by `keywords_present`.
    pub keywords: Vec<String>,
}

impl TermCatalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), version = catalog.version, "loaded term catalog");
        Ok(catalog)
    }

    /// Parse, validate, and lower-case a catalog.
    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let mut catalog: TermCatalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        catalog.normalize();
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.version == 0 {
            return Err(CoreError::InvalidCatalog("version must be >= 1".into()));
        }
        let lists: [(&str, &[String]); 8] = [
            ("rigorous.land_property", &self.rigorous.land_property),
            ("rigorous.warehouse_certificate", &self.rigorous.warehouse_certificate),
            ("rigorous.agro_technical", &self.rigorous.agro_technical),
            ("rigorous.official_documentation", &self.rigorous.official_documentation),
            ("rigorous.disqualifying", &self.rigorous.disqualifying),
            ("ocr_gate.required", &self.ocr_gate.required),
            ("corpus.legal_terms", &self.corpus.legal_terms),
            ("corpus.keywords", &self.corpus.keywords),
        ];
        for (name, list) in lists {
            if list.is_empty() {
                return Err(CoreError::InvalidCatalog(format!("{name} is empty")));
            }
            if list.iter().any(|t| t.trim().is_empty()) {
                return Err(CoreError::InvalidCatalog(format!("{name} has a blank term")));
            }
        }
        if self.ocr_gate.min_required > self.ocr_gate.required.len() {
            return Err(CoreError::InvalidCatalog(format!(
                "ocr_gate.min_required ({}) exceeds the required list ({})",
                self.ocr_gate.min_required,
                self.ocr_gate.required.len()
            )));
        }
        Ok(())
    }

    /// Matching is done against lower-cased text, so terms are stored lower-cased.
    fn normalize(&mut self) {
        for list in [
            &mut self.rigorous.land_property,
            &mut self.rigorous.warehouse_certificate,
            &mut self.rigorous.agro_technical,
            &mut self.rigorous.official_documentation,
            &mut self.rigorous.disqualifying,
            &mut self.ocr_gate.required,
            &mut self.ocr_gate.disqualifying,
            &mut self.corpus.legal_terms,
            &mut self.corpus.keywords,
        ] {
            for term in list.iter_mut() {
                *term = term.to_lowercase();
            }
        }
    }
}

/// Number of distinct terms from `terms` that occur anywhere in `lowered`.
///
/// `lowered` must already be lower-cased. Each term counts at most once.
pub fn count_present(terms: &[String], lowered: &str) -> usize {
    terms.iter().filter(|t| lowered.contains(t.as_str())).count()
}

/// Terms from `terms` that occur in `lowered`, in catalog order.
pub fn matched<'a>(terms: &'a [String], lowered: &str) -> Vec<&'a str> {
    terms
        .iter()
        .filter(|t| lowered.contains(t.as_str()))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = TermCatalog::builtin().unwrap();
        assert!(catalog.version >= 1);
        assert_eq!(catalog.thresholds, Thresholds::default());
        assert_eq!(catalog.rigorous.land_property.len(), 9);
        assert_eq!(catalog.rigorous.warehouse_certificate.len(), 8);
        assert_eq!(catalog.ocr_gate.min_required, 2);
        assert_eq!(catalog.corpus.keywords.len(), 5);
    }

    #[test]
    fn builtin_disqualifying_includes_resume_vocabulary() {
        let catalog = TermCatalog::builtin().unwrap();
        let disq = &catalog.rigorous.disqualifying;
        assert!(disq.iter().any(|t| t == "currículo"));
        assert!(disq.iter().any(|t| t == "formação acadêmica"));
    }

    #[test]
    fn terms_are_lowercased_on_load() {
        let mut raw: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        raw["rigorous"]["land_property"] = serde_json::json!(["ESCRITURA", "Fazenda"]);
        let catalog = TermCatalog::from_json_str(&raw.to_string()).unwrap();
        assert_eq!(catalog.rigorous.land_property, vec!["escritura", "fazenda"]);
    }

    #[test]
    fn rejects_version_zero() {
        let mut raw: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        raw["version"] = serde_json::json!(0);
        let err = TermCatalog::from_json_str(&raw.to_string()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCatalog(_)));
    }

    #[test]
    fn rejects_empty_list() {
        let mut raw: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        raw["rigorous"]["agro_technical"] = serde_json::json!([]);
        let err = TermCatalog::from_json_str(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("agro_technical"));
    }

    #[test]
    fn rejects_gate_minimum_above_list_length() {
        let mut raw: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        raw["ocr_gate"]["min_required"] = serde_json::json!(99);
        assert!(TermCatalog::from_json_str(&raw.to_string()).is_err());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("terms.json");
        std::fs::write(&path, BUILTIN_CATALOG).unwrap();
        let catalog = TermCatalog::load(&path).unwrap();
        assert_eq!(catalog.version, 1);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = TermCatalog::load(Path::new("/nonexistent/terms.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/terms.json"));
    }

    #[test]
    fn count_present_counts_each_term_once() {
        let terms = vec!["soja".to_string(), "milho".to_string(), "trigo".to_string()];
        assert_eq!(count_present(&terms, "soja soja soja e milho"), 2);
        assert_eq!(count_present(&terms, ""), 0);
    }

    #[test]
    fn substring_matching_is_not_word_bounded() {
        // "aves" inside "chaves" counts, same as a plain substring test.
        let terms = vec!["aves".to_string()];
        assert_eq!(count_present(&terms, "entrega das chaves"), 1);
    }
}
