//! Synthetic labeled corpus of Brazilian rural-property documents and
//! unrelated negatives.
//!
//! Every random choice comes from one seeded `StdRng`, so a seed and a
//! reference date fully determine the texts.

use std::collections::BTreeMap;

use agrodoc_core::{FeatureExtractor, INVALID_DOCUMENT_TYPE, SyntheticSample};
use chrono::{Datelike, Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Share of valid samples in a generated dataset.
const VALID_SHARE: f64 = 0.7;

/// Tags assigned at random to valid samples.
pub const DOCUMENT_TYPES: [&str; 6] = [
    "escritura_publica",
    "certidao_propriedade",
    "contrato_compra_venda",
    "registro_imovel",
    "planta_propriedade",
    "memorial_descritivo",
];

const LOCATIONS: [&str; 10] = [
    "São Paulo",
    "Rio de Janeiro",
    "Minas Gerais",
    "Bahia",
    "Paraná",
    "Rio Grande do Sul",
    "Goiás",
    "Mato Grosso",
    "Ceará",
    "Pernambuco",
];

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const DATE_WINDOW_DAYS: u64 = 50 * 365;

const CORRUPTED: [&str; 5] = [
    "texto ilegível ######### @@@@@@ $$$$$$",
    "doc*mento danific#do sem inf$rmaçõ&s",
    "DOCUMENTO SEM DATA 99/99/9999",
    "qualidade ruim ### não é possível ler",
    "informações incompletas: ___ ___ ___",
];

/// Counts over a generated dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub document_types: BTreeMap<String, usize>,
}

impl DatasetSummary {
    pub fn from_samples(samples: &[SyntheticSample]) -> Self {
        let valid = samples.iter().filter(|s| s.is_valid).count();
        let mut document_types = BTreeMap::new();
        for s in samples {
            *document_types.entry(s.document_type.clone()).or_insert(0) += 1;
        }
        Self {
            total: samples.len(),
            valid,
            invalid: samples.len() - valid,
            document_types,
        }
    }
}

/// Seeded generator of synthetic samples. Corpus statistics come from the
/// borrowed extractor so they match what the trainer would compute.
pub struct SyntheticGenerator<'a> {
    extractor: &'a FeatureExtractor,
    rng: StdRng,
    reference_date: NaiveDate,
}

impl<'a> SyntheticGenerator<'a> {
    pub fn new(extractor: &'a FeatureExtractor, seed: u64) -> Self {
        Self {
            extractor,
            rng: StdRng::seed_from_u64(seed),
            reference_date: Utc::now().date_naive(),
        }
    }

    /// Anchor the 50-year date window on a fixed day instead of today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// `n_samples` rows: the first `⌊0.7·n⌋` valid, the rest invalid, with
    /// ids `doc_0001` onward.
    pub fn generate_dataset(&mut self, n_samples: usize) -> Vec<SyntheticSample> {
        let n_valid = (n_samples as f64 * VALID_SHARE) as usize;
        let n_invalid = n_samples - n_valid;
        let mut samples = Vec::with_capacity(n_samples);

        info!(n_valid, "generating valid documents");
        for _ in 0..n_valid {
            let text = self.valid_text();
            let document_type = self.pick(&DOCUMENT_TYPES).to_string();
            samples.push(self.sample(samples.len(), text, true, document_type));
        }

        info!(n_invalid, "generating invalid documents");
        for _ in 0..n_invalid {
            let text = self.invalid_text();
            samples.push(self.sample(samples.len(), text, false, INVALID_DOCUMENT_TYPE.into()));
        }

        samples
    }

    fn sample(
        &self,
        index: usize,
        text: String,
        is_valid: bool,
        document_type: String,
    ) -> SyntheticSample {
        SyntheticSample {
            id: format!("doc_{:04}", index + 1),
            stats: self.extractor.corpus_statistics(&text),
            text,
            is_valid,
            document_type,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    // ── Valid documents ──

    /// One of three property-document templates, followed by a few
    /// upper-cased legal terms.
    pub fn valid_text(&mut self) -> String {
        let location = self.pick(&LOCATIONS);
        let mut text = match self.rng.random_range(0..3) {
            0 => self.public_deed(location),
            1 => self.registry_certificate(location),
            _ => self.descriptive_memorandum(location),
        };

        let extractor = self.extractor;
        let legal_terms = &extractor.catalog().corpus.legal_terms;
        let n_terms = self.rng.random_range(3..=8).min(legal_terms.len());
        let chosen: Vec<&String> = legal_terms.choose_multiple(&mut self.rng, n_terms).collect();
        for term in chosen {
            if self.rng.random::<f64>() > 0.5 {
                text.push(' ');
                text.push_str(&term.to_uppercase());
            }
        }
        text
    }

    fn random_date(&mut self) -> NaiveDate {
        let offset = self.rng.random_range(0..=DATE_WINDOW_DAYS);
        let start = self
            .reference_date
            .checked_sub_days(Days::new(DATE_WINDOW_DAYS))
            .unwrap_or(self.reference_date);
        start.checked_add_days(Days::new(offset)).unwrap_or(start)
    }

    fn public_deed(&mut self, location: &str) -> String {
        let date = self.random_date();
        let month = MONTHS[date.month0() as usize];
        let registry = self.rng.random_range(10000..=99999);
        let hectares = self.rng.random_range(10..=1000);
        format!(
            "ESCRITURA PÚBLICA DE COMPRA E VENDA. Saibam quantos este público instrumento \
             virem que no ano de {year}, aos {day} dias do mês de {month}, nesta cidade de \
             {location}, Estado de São Paulo, Brasil, perante mim, Tabelião, compareceram como \
             outorgante vendedor JOÃO DA SILVA, brasileiro, casado, proprietário rural, \
             portador da Cédula de Identidade RG nº 12.345.678-9, inscrito no CPF sob nº \
             123.456.789-00, residente e domiciliado na propriedade rural denominada 'Fazenda \
             Santa Rita', situada no município de {location}, matrícula nº {registry}, área de \
             {hectares} hectares.",
            year = date.year(),
            day = date.day(),
        )
    }

    fn registry_certificate(&mut self, location: &str) -> String {
        let district = self.rng.random_range(1..=10);
        let registry = self.rng.random_range(10000..=99999);
        let hectares = self.rng.random_range(5..=100);
        format!(
            "CERTIDÃO DE PROPRIEDADE expedida pelo Cartório de Registro de Imóveis da \
             {district}ª Circunscrição de {location}. Certifico que, revendo os livros de \
             registro desta serventia, neles consta matriculado sob o nº {registry}, um imóvel \
             rural denominado Sítio Boa Vista, com área de {hectares} hectares, situado no \
             distrito de {location}, confrontando ao Norte com propriedade de Maria Santos, ao \
             Sul com estrada municipal, ao Leste com córrego das Pedras e ao Oeste com \
             propriedade de José Oliveira."
        )
    }

    fn descriptive_memorandum(&mut self, location: &str) -> String {
        let hectares = self.rng.random_range(20..=500);
        let ares = self.rng.random_range(10..=99);
        let centiares = self.rng.random_range(10..=99);
        let registry = self.rng.random_range(10000..=99999);
        let lat = self.rng.random_range(-25.0..-20.0);
        let lon = self.rng.random_range(-50.0..-45.0);
        format!(
            "MEMORIAL DESCRITIVO da propriedade rural situada no município de {location}, \
             comarca de {location}, Estado de São Paulo, com área total de {hectares} hectares, \
             {ares} ares e {centiares} centiares, registrada sob matrícula nº {registry} no \
             Cartório de Registro de Imóveis. Inicia-se a descrição no ponto P1, situado nas \
             coordenadas geográficas {lat:.6}°S e {lon:.6}°W."
        )
    }

    // ── Invalid documents ──

    /// Résumé, unrelated prose, urban contract, academic certificate, or
    /// garbled text, chosen uniformly.
    pub fn invalid_text(&mut self) -> String {
        match self.rng.random_range(0..5) {
            0 => self.resume(),
            1 => self.unrelated_text(),
            2 => self.commercial_contract(),
            3 => self.academic_certificate(),
            _ => self.pick(&CORRUPTED).to_string(),
        }
    }

    fn resume(&mut self) -> String {
        let name = self.pick(&["João Silva", "Maria Santos", "Pedro Costa"]);
        let field = self.pick(&["Engenharia", "Administração", "Contabilidade"]);
        let degree = self.pick(&["Economia", "Gestão", "Tecnologia"]);
        format!(
            "CURRÍCULO PROFISSIONAL\n\n\
             Nome: {name}\n\
             Formação: {field}\n\n\
             EXPERIÊNCIA PROFISSIONAL:\n\
             - Analista (2020-2022)\n\
             - Coordenador (2022-2024)\n\n\
             EDUCAÇÃO:\n\
             - Graduação em {degree}\n\
             - Curso de especialização\n\n\
             HABILIDADES:\n\
             - Microsoft Office\n\
             - Gestão de equipes\n\
             - Liderança"
        )
    }

    fn unrelated_text(&mut self) -> String {
        let number = self.rng.random_range(1000..=9999);
        let day = self.rng.random_range(1..=28);
        let month = self.rng.random_range(1..=12);
        format!(
            "Texto aleatório sem contexto agrícola.\n\n\
             Este documento fala sobre assuntos urbanos e não tem relação \n\
             com propriedades rurais ou documentação de terra.\n\n\
             Apenas texto comum com números: {number}\n\
             Data: {day}/{month}/2024\n\n\
             Mais texto irrelevante para agricultura."
        )
    }

    fn commercial_contract(&mut self) -> String {
        let value = thousands(self.rng.random_range(5000..=50000));
        format!(
            "CONTRATO COMERCIAL URBANO\n\n\
             Empresa: Tech Solutions LTDA\n\
             CNPJ: 12.345.678/0001-90\n\n\
             Prestação de serviços de consultoria\n\
             Valor: R$ {value}.00\n\n\
             Local: Centro comercial - São Paulo/SP\n\
             Sem relação com atividades rurais"
        )
    }

    fn academic_certificate(&mut self) -> String {
        let course = self.pick(&["Engenharia", "Medicina", "Direito"]);
        let hours = self.rng.random_range(3000..=4000);
        let grade: f64 = self.rng.random_range(7.0..10.0);
        let day = self.rng.random_range(1..=28);
        let month = self.rng.random_range(1..=12);
        format!(
            "CERTIFICADO UNIVERSITÁRIO\n\n\
             Curso de {course}\n\
             Carga horária: {hours}h\n\
             Nota: {grade:.1}\n\n\
             Formatura: {day}/{month}/2024\n\
             Universidade Federal"
        )
    }

    fn pick<'s>(&mut self, options: &[&'s str]) -> &'s str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

/// `12345` → `12,345`.
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::builtin().unwrap()
    }

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn dataset_split_and_ids() {
        let ex = extractor();
        let samples = SyntheticGenerator::new(&ex, DEFAULT_SEED).generate_dataset(10);
        assert_eq!(samples.len(), 10);
        assert_eq!(samples.iter().filter(|s| s.is_valid).count(), 7);
        assert_eq!(samples[0].id, "doc_0001");
        assert_eq!(samples[9].id, "doc_0010");
        assert!(samples[..7].iter().all(|s| s.is_valid));
        assert!(samples[7..].iter().all(|s| s.document_type == INVALID_DOCUMENT_TYPE));
        assert!(samples[..7]
            .iter()
            .all(|s| DOCUMENT_TYPES.contains(&s.document_type.as_str())));
    }

    #[test]
    fn same_seed_same_texts() {
        let ex = extractor();
        let a = SyntheticGenerator::new(&ex, 7)
            .with_reference_date(fixed_date())
            .generate_dataset(20);
        let b = SyntheticGenerator::new(&ex, 7)
            .with_reference_date(fixed_date())
            .generate_dataset(20);
        let texts = |s: &[SyntheticSample]| s.iter().map(|x| x.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts(&a), texts(&b));

        let c = SyntheticGenerator::new(&ex, 8)
            .with_reference_date(fixed_date())
            .generate_dataset(20);
        assert_ne!(texts(&a), texts(&c));
    }

    #[test]
    fn valid_texts_look_like_property_documents() {
        let ex = extractor();
        let mut generator = SyntheticGenerator::new(&ex, DEFAULT_SEED);
        for _ in 0..30 {
            let text = generator.valid_text();
            let stats = ex.corpus_statistics(&text);
            assert!(stats.legal_terms_count >= 3, "{text}");
            assert!(stats.keywords_present >= 2, "{text}");
            assert!(stats.text_length > 300);
        }
    }

    #[test]
    fn invalid_texts_have_few_legal_terms() {
        let ex = extractor();
        let mut generator = SyntheticGenerator::new(&ex, DEFAULT_SEED);
        for _ in 0..30 {
            let text = generator.invalid_text();
            let stats = ex.corpus_statistics(&text);
            assert!(stats.keywords_present <= 1, "{text}");
        }
    }

    #[test]
    fn memorandum_coordinates_are_detected() {
        let ex = extractor();
        let mut generator = SyntheticGenerator::new(&ex, DEFAULT_SEED);
        let text = generator.descriptive_memorandum("Goiás");
        assert!(text.contains("°S e -"));
        assert_eq!(ex.corpus_statistics(&text).has_coordinates, 1);
    }

    #[test]
    fn dates_stay_in_window() {
        let ex = extractor();
        let mut generator = SyntheticGenerator::new(&ex, 3).with_reference_date(fixed_date());
        for _ in 0..200 {
            let d = generator.random_date();
            assert!(d <= fixed_date());
            assert!(d.year() >= 1975);
        }
    }

    #[test]
    fn summary_counts_types() {
        let ex = extractor();
        let samples = SyntheticGenerator::new(&ex, DEFAULT_SEED).generate_dataset(100);
        let summary = DatasetSummary::from_samples(&samples);
        assert_eq!(summary.total, 100);
        assert_eq!(summary.valid, 70);
        assert_eq!(summary.invalid, 30);
        assert_eq!(summary.document_types[INVALID_DOCUMENT_TYPE], 30);
        assert_eq!(summary.document_types.values().sum::<usize>(), 100);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(thousands(5000), "5,000");
        assert_eq!(thousands(50000), "50,000");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(123456), "123,456");
    }
}
