//! Plain-text rendering for the CLI: rigorous breakdowns, OCR hints,
//! training reports, and dataset summaries.
//!
//! Each renderer builds a `String` so output can be checked in tests; the
//! commands print it as-is.

use std::fmt::Write;

use agrodoc_ai::{DatasetSummary, TrainingReport};
use agrodoc_core::{Prediction, RigorousReport};
use agrodoc_ocr::{OcrOutcome, StructuredInfo};

const MAX_LIST_ITEMS: usize = 10;

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    writeln!(out, "  {:<26} {}", label, value).ok();
}

fn list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let shown: Vec<&str> = items.iter().take(MAX_LIST_ITEMS).map(String::as_str).collect();
    let more = items.len().saturating_sub(MAX_LIST_ITEMS);
    if more > 0 {
        row(out, label, format!("{} (+{more} more)", shown.join(", ")));
    } else {
        row(out, label, shown.join(", "));
    }
}

// ── Rigorous gate ──

pub fn rigorous_report(report: &RigorousReport) -> String {
    let mut out = String::new();
    writeln!(out, "Keyword counts").ok();
    row(&mut out, "land_terms", report.land_terms);
    row(&mut out, "warehouse_terms", report.warehouse_terms);
    row(&mut out, "agro_terms", report.agro_terms);
    row(&mut out, "official_terms", report.official_terms);
    row(&mut out, "disqualifying_terms", report.disqualifying_terms);
    writeln!(out).ok();

    writeln!(out, "Pattern counts").ok();
    row(&mut out, "dates", report.dates);
    row(&mut out, "has_year", yes_no(report.has_year));
    row(&mut out, "tax_ids", report.tax_ids);
    row(&mut out, "registry_numbers", report.registry_numbers);
    row(&mut out, "money_mentions", report.money_mentions);
    row(&mut out, "area_measures", report.area_measures);
    row(&mut out, "coordinates", report.coordinates);
    row(&mut out, "char_count", report.char_count);
    row(&mut out, "word_count", report.word_count);
    writeln!(out).ok();

    writeln!(out, "Conditions").ok();
    row(&mut out, "document_type_ok", yes_no(report.document_type_ok));
    row(&mut out, "has_disqualifying", yes_no(report.has_disqualifying));
    row(&mut out, "technical_ok", yes_no(report.technical_ok));
    row(&mut out, "verdict", if report.verdict { "VALID" } else { "INVALID" });
    out
}

// ── OCR ──

pub fn ocr_outcome(outcome: &OcrOutcome) -> String {
    let mut out = String::new();
    writeln!(out, "OCR").ok();
    row(&mut out, "method", &outcome.method);
    row(&mut out, "success", yes_no(outcome.success));
    if let Some(err) = &outcome.error {
        row(&mut out, "error", err);
    }
    row(&mut out, "chars", outcome.text.chars().count());
    out
}

pub fn structured_info(info: &StructuredInfo) -> String {
    let mut out = String::new();
    writeln!(out, "Structured hints").ok();
    row(&mut out, "document_type", format!("{:?}", info.document_type).to_lowercase());
    list(&mut out, "dates", &info.dates);
    list(&mut out, "numbers", &info.numbers);
    list(&mut out, "legal_terms", &info.legal_terms);
    out
}

pub fn prediction(p: &Prediction) -> String {
    let mut out = String::new();
    writeln!(out, "Classifier").ok();
    row(&mut out, "label", if p.is_valid { "valid" } else { "invalid" });
    row(&mut out, "confidence", format!("{:.3}", p.confidence));
    row(&mut out, "p(invalid)", format!("{:.3}", p.probabilities.invalid));
    row(&mut out, "p(valid)", format!("{:.3}", p.probabilities.valid));
    out
}

// ── Training ──

pub fn training_report(report: &TrainingReport) -> String {
    let mut out = String::new();
    writeln!(out, "=== Training report ({} schema) ===", report.schema).ok();
    writeln!(out, "{} train / {} test rows", report.train_size, report.test_size).ok();
    writeln!(out).ok();

    writeln!(out, "Candidates").ok();
    for c in &report.candidates {
        let marker = if c.kind == report.best { "  <- best" } else { "" };
        writeln!(out, "  {:<26} {:.4}{marker}", c.kind.as_str(), c.accuracy).ok();
    }
    writeln!(out).ok();

    let cm = &report.confusion;
    writeln!(out, "Confusion matrix (rows = actual)").ok();
    writeln!(out, "  {:<12} {:>9} {:>9}", "", "invalid", "valid").ok();
    writeln!(out, "  {:<12} {:>9} {:>9}", "invalid", cm.true_negative, cm.false_positive).ok();
    writeln!(out, "  {:<12} {:>9} {:>9}", "valid", cm.false_negative, cm.true_positive).ok();
    writeln!(out).ok();

    writeln!(out, "Per class").ok();
    writeln!(
        out,
        "  {:<12} {:>9} {:>9} {:>9} {:>9}",
        "", "precision", "recall", "f1", "support"
    ).ok();
    for (name, m) in [("invalid", &report.invalid), ("valid", &report.valid)] {
        writeln!(
            out,
            "  {:<12} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            name, m.precision, m.recall, m.f1, m.support
        ).ok();
    }

    if let Some(importances) = &report.feature_importances {
        writeln!(out).ok();
        writeln!(out, "Feature importances").ok();
        for (name, value) in importances {
            row(&mut out, name, format!("{value:.4}"));
        }
    }
    out
}

pub fn dataset_summary(summary: &DatasetSummary) -> String {
    let mut out = String::new();
    writeln!(out, "Dataset").ok();
    row(&mut out, "total", summary.total);
    row(&mut out, "valid", summary.valid);
    row(&mut out, "invalid", summary.invalid);
    writeln!(out).ok();
    writeln!(out, "Document types").ok();
    for (kind, count) in &summary.document_types {
        row(&mut out, kind, count);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn summary_lists_every_type() {
        let summary = DatasetSummary {
            total: 10,
            valid: 7,
            invalid: 3,
            document_types: BTreeMap::from([
                ("escritura_publica".to_string(), 4),
                ("invalid".to_string(), 3),
                ("matricula_imovel".to_string(), 3),
            ]),
        };
        let text = dataset_summary(&summary);
        assert!(text.contains("escritura_publica"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("invalid") && l.ends_with('3')));
    }

    #[test]
    fn long_lists_are_truncated() {
        let mut out = String::new();
        let items: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        list(&mut out, "numbers", &items);
        assert!(out.contains("(+5 more)"));
        assert!(!out.contains("14"));
    }

    #[test]
    fn prediction_shows_both_probabilities() {
        let text = prediction(&Prediction::from_valid_probability(0.8));
        assert!(text.contains("valid"));
        assert!(text.contains("0.800"));
        assert!(text.contains("0.200"));
    }

    #[test]
    fn rigorous_report_renders_every_section() {
        let extractor = agrodoc_core::FeatureExtractor::builtin().unwrap();
        let assessment = extractor.assess("CURRÍCULO PROFISSIONAL com formação acadêmica");
        let text = rigorous_report(&assessment.report);
        for heading in ["Keyword counts", "Pattern counts", "Conditions"] {
            assert!(text.lines().any(|l| l == heading), "missing {heading}");
        }
        assert!(text.lines().any(|l| l.trim_start().starts_with("verdict") && l.ends_with("INVALID")));
        assert_eq!(text.lines().filter(|l| l.is_empty()).count(), 2);
    }
}
