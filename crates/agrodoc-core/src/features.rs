//! Rigorous keyword/regex analysis of document text.
//!
//! [`FeatureExtractor::assess`] produces two things from the same pass over
//! the text: the nine-value inference vector fed to the classifier, and the
//! rigorous verdict that vetoes the classifier. The verdict is
//!
//! ```text
//! (land >= 2 OR warehouse >= 2)
//!   AND disqualifying == 0
//!   AND agro >= 1 AND official >= 1
//!   AND (dates >= 1 OR a 4-digit year)
//!   AND (tax ids >= 1 OR registry numbers >= 1)
//!   AND chars >= 200
//! ```
//!
//! with the thresholds taken from the [`TermCatalog`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{CORPUS_FEATURES, INFERENCE_FEATURES};
use crate::terms::{TermCatalog, count_present};
use crate::CoreError;

/// Length of both feature vectors.
pub const FEATURE_COUNT: usize = 9;

/// Upper bound for the two normalized size features.
const SIZE_CAP: f64 = 10.0;

/// Inference feature vector (schema A), named fields in positional order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InferenceFeatures {
    /// Land-property + warehouse-certificate term count.
    pub type_terms: f64,
    pub agro_terms: f64,
    /// Disqualifying term count times -10.
    pub disqualifying_penalty: f64,
    pub dates: f64,
    /// Tax IDs + registry numbers.
    pub identifiers: f64,
    pub money_mentions: f64,
    pub area_measures: f64,
    /// `min(chars / 1000, 10)`
    pub length_norm: f64,
    /// `min(words / 100, 10)`
    pub words_norm: f64,
}

impl InferenceFeatures {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.type_terms,
            self.agro_terms,
            self.disqualifying_penalty,
            self.dates,
            self.identifiers,
            self.money_mentions,
            self.area_measures,
            self.length_norm,
            self.words_norm,
        ]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    pub fn names() -> &'static [&'static str; FEATURE_COUNT] {
        &INFERENCE_FEATURES
    }
}

/// Corpus statistics vector (schema B).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusStatistics {
    pub legal_terms_count: i64,
    /// 0 or 1.
    pub has_dates: i64,
    pub text_length: i64,
    pub number_count: i64,
    pub special_chars_count: i64,
    pub legal_density: f64,
    pub keywords_present: i64,
    /// 0 or 1.
    pub has_coordinates: i64,
    pub uppercase_ratio: f64,
}

impl CorpusStatistics {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.legal_terms_count as f64,
            self.has_dates as f64,
            self.text_length as f64,
            self.number_count as f64,
            self.special_chars_count as f64,
            self.legal_density,
            self.keywords_present as f64,
            self.has_coordinates as f64,
            self.uppercase_ratio,
        ]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    pub fn names() -> &'static [&'static str; FEATURE_COUNT] {
        &CORPUS_FEATURES
    }
}

/// Every count and condition behind a rigorous verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigorousReport {
    pub land_terms: usize,
    pub warehouse_terms: usize,
    pub agro_terms: usize,
    pub official_terms: usize,
    pub disqualifying_terms: usize,
    pub dates: usize,
    pub has_year: bool,
    pub tax_ids: usize,
    pub registry_numbers: usize,
    pub money_mentions: usize,
    pub area_measures: usize,
    pub coordinates: usize,
    pub char_count: usize,
    pub word_count: usize,
    pub document_type_ok: bool,
    pub has_disqualifying: bool,
    pub technical_ok: bool,
    pub verdict: bool,
}

/// Result of [`FeatureExtractor::assess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub features: InferenceFeatures,
    pub report: RigorousReport,
}

impl Assessment {
    pub fn is_valid(&self) -> bool {
        self.report.verdict
    }
}

struct Patterns {
    dates: Regex,
    year: Regex,
    tax_id: Regex,
    money: Regex,
    area: Regex,
    coordinates: Regex,
    registry: Regex,
    // corpus statistics
    slash_date: Regex,
    month_name: Regex,
    number: Regex,
    special_char: Regex,
    degree_coordinates: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, CoreError> {
        Ok(Self {
            // Long form ("10 de março de 2020") or numeric (10/03/2020, 10-03-20).
            dates: Regex::new(
                r"\d{1,2}\s*de\s*\w+\s*de\s*\d{4}|\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}",
            )?,
            year: Regex::new(r"\d{4}")?,
            // CPF 123.456.789-00 or CNPJ 12.345.678/0001-90.
            tax_id: Regex::new(r"\d{3}\.\d{3}\.\d{3}-\d{2}|\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}")?,
            money: Regex::new(r"r\$\s*[\d.,]+|reais|valor|preço")?,
            area: Regex::new(
                r"\d+\s*(?:hectares?|ha|m²|metros?|alqueires?|toneladas?|sacas?)",
            )?,
            coordinates: Regex::new(r"-?\d+\.\d+.*-?\d+\.\d+")?,
            registry: Regex::new(r"(?:matrícula|registro|protocolo)\s*n?[ºo°]?\s*[\d\-.]+")?,
            slash_date: Regex::new(r"\d{1,2}/\d{1,2}/\d{4}")?,
            month_name: Regex::new(
                r"janeiro|fevereiro|março|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro",
            )?,
            number: Regex::new(r"\d+")?,
            special_char: Regex::new(r"[#@$%&*|]")?,
            degree_coordinates: Regex::new(
                r"-?\d{1,2}\.\d+°\s*[NSns]?\s*(?:e\s+|,\s*)?-?\d{1,2}\.\d+°\s*[WEOweo]?",
            )?,
        })
    }
}

/// Keyword and regex feature extractor bound to one [`TermCatalog`].
pub struct FeatureExtractor {
    catalog: TermCatalog,
    patterns: Patterns,
}

impl FeatureExtractor {
    pub fn new(catalog: TermCatalog) -> Result<Self, CoreError> {
        Ok(Self {
            catalog,
            patterns: Patterns::compile()?,
        })
    }

    /// Extractor over the built-in catalog.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::new(TermCatalog::builtin()?)
    }

    pub fn catalog(&self) -> &TermCatalog {
        &self.catalog
    }

    /// Feature vector and rigorous verdict.
    pub fn extract(&self, text: &str) -> (InferenceFeatures, bool) {
        let assessment = self.assess(text);
        (assessment.features, assessment.report.verdict)
    }

    /// Full analysis: feature vector plus the breakdown behind the verdict.
    pub fn assess(&self, text: &str) -> Assessment {
        let lowered = text.to_lowercase();
        let terms = &self.catalog.rigorous;
        let th = &self.catalog.thresholds;
        let p = &self.patterns;

        let land_terms = count_present(&terms.land_property, &lowered);
        let warehouse_terms = count_present(&terms.warehouse_certificate, &lowered);
        let agro_terms = count_present(&terms.agro_technical, &lowered);
        let official_terms = count_present(&terms.official_documentation, &lowered);
        let disqualifying_terms = count_present(&terms.disqualifying, &lowered);

        let dates = p.dates.find_iter(&lowered).count();
        let has_year = p.year.is_match(text);
        let tax_ids = p.tax_id.find_iter(text).count();
        let money_mentions = p.money.find_iter(&lowered).count();
        let area_measures = p.area.find_iter(&lowered).count();
        let coordinates = p.coordinates.find_iter(text).count();
        let registry_numbers = p.registry.find_iter(&lowered).count();

        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();

        let document_type_ok =
            land_terms >= th.min_type_terms || warehouse_terms >= th.min_type_terms;
        let has_disqualifying = disqualifying_terms > 0;
        let technical_ok = agro_terms >= th.min_agro_terms
            && official_terms >= th.min_official_terms
            && (dates >= th.min_dates || has_year)
            && (tax_ids >= th.min_identifiers || registry_numbers >= th.min_identifiers)
            && char_count >= th.min_length_chars;
        let verdict = document_type_ok && !has_disqualifying && technical_ok;

        let features = InferenceFeatures {
            type_terms: (land_terms + warehouse_terms) as f64,
            agro_terms: agro_terms as f64,
            disqualifying_penalty: disqualifying_terms as f64 * -10.0,
            dates: dates as f64,
            identifiers: (tax_ids + registry_numbers) as f64,
            money_mentions: money_mentions as f64,
            area_measures: area_measures as f64,
            length_norm: (char_count as f64 / 1000.0).min(SIZE_CAP),
            words_norm: (word_count as f64 / 100.0).min(SIZE_CAP),
        };

        let report = RigorousReport {
            land_terms,
            warehouse_terms,
            agro_terms,
            official_terms,
            disqualifying_terms,
            dates,
            has_year,
            tax_ids,
            registry_numbers,
            money_mentions,
            area_measures,
            coordinates,
            char_count,
            word_count,
            document_type_ok,
            has_disqualifying,
            technical_ok,
            verdict,
        };

        debug!(
            land = land_terms,
            warehouse = warehouse_terms,
            agro = agro_terms,
            official = official_terms,
            disqualifying = disqualifying_terms,
            dates,
            has_year,
            tax_ids,
            registry = registry_numbers,
            chars = char_count,
            document_type_ok,
            technical_ok,
            verdict,
            "rigorous analysis"
        );

        Assessment { features, report }
    }

    /// Corpus statistics (schema B) for one text.
    pub fn corpus_statistics(&self, text: &str) -> CorpusStatistics {
        let lowered = text.to_lowercase();
        let corpus = &self.catalog.corpus;
        let p = &self.patterns;

        let legal_terms_count = count_present(&corpus.legal_terms, &lowered);
        let has_dates = p.slash_date.is_match(&lowered)
            || p.year.is_match(&lowered)
            || p.month_name.is_match(&lowered);
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();
        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();

        CorpusStatistics {
            legal_terms_count: legal_terms_count as i64,
            has_dates: has_dates as i64,
            text_length: char_count as i64,
            number_count: p.number.find_iter(text).count() as i64,
            special_chars_count: p.special_char.find_iter(text).count() as i64,
            legal_density: legal_terms_count as f64 / word_count.max(1) as f64,
            keywords_present: count_present(&corpus.keywords, &lowered) as i64,
            has_coordinates: p.degree_coordinates.is_match(text) as i64,
            uppercase_ratio: if char_count > 0 {
                uppercase as f64 / char_count as f64
            } else {
                0.0
            },
        }
    }
}
