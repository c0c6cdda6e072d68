//! Document-type gate applied to OCR text, and the structured hints shown by
//! `agrodoc check`.
//!
//! The gate is deliberately looser than the rigorous feature gate: it only
//! asks whether the text looks like a property document at all.

use std::fmt;

use agrodoc_core::TermCatalog;
use agrodoc_core::terms::{count_present, matched};
use regex::Regex;
use serde::Serialize;

use crate::OcrError;

/// Why the gate turned a text away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooFewTerms { found: usize, needed: usize },
    Disqualified(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "no text extracted"),
            Rejection::TooFewTerms { found, needed } => write!(
                f,
                "not a property document: {found} of {needed} required terms found"
            ),
            Rejection::Disqualified(term) => {
                write!(f, "not a property document: contains \"{term}\"")
            }
        }
    }
}

/// Kind of property document, from the first matching keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Escritura,
    Certidao,
    Unknown,
}

/// Loose hints pulled out of a text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredInfo {
    pub dates: Vec<String>,
    pub numbers: Vec<String>,
    pub legal_terms: Vec<String>,
    pub document_type: DocumentKind,
}

pub struct DocumentGate {
    required: Vec<String>,
    min_required: usize,
    disqualifying: Vec<String>,
    legal_terms: Vec<String>,
    slash_date: Regex,
    number: Regex,
}

impl DocumentGate {
    pub fn from_catalog(catalog: &TermCatalog) -> Result<Self, OcrError> {
        Ok(Self {
            required: catalog.ocr_gate.required.clone(),
            min_required: catalog.ocr_gate.min_required,
            disqualifying: catalog.ocr_gate.disqualifying.clone(),
            legal_terms: catalog.corpus.legal_terms.clone(),
            slash_date: Regex::new(r"\d{1,2}/\d{1,2}/\d{4}")?,
            number: Regex::new(r"\d+")?,
        })
    }

    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::Empty);
        }
        let lowered = text.to_lowercase();
        if let Some(term) = matched(&self.disqualifying, &lowered).first() {
            return Err(Rejection::Disqualified((*term).to_string()));
        }
        let found = count_present(&self.required, &lowered);
        if found < self.min_required {
            return Err(Rejection::TooFewTerms {
                found,
                needed: self.min_required,
            });
        }
        Ok(())
    }

    pub fn structured_info(&self, text: &str) -> StructuredInfo {
        let lowered = text.to_lowercase();
        let document_type = if lowered.contains("escritura") {
            DocumentKind::Escritura
        } else if lowered.contains("certidão") {
            DocumentKind::Certidao
        } else {
            DocumentKind::Unknown
        };
        StructuredInfo {
            dates: self
                .slash_date
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            numbers: self
                .number
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            legal_terms: matched(&self.legal_terms, &lowered)
                .into_iter()
                .map(str::to_string)
                .collect(),
            document_type,
        }
    }
}
