//! Normalization of raw backend facet buckets into connector facets.

use crate::backend::RawFacetField;
use crate::model::{Facet, Value};
use crate::vocabulary::{DocumentType, Vocabulary};
use tracing::{debug, warn};

/// The facet fields this connector knows how to translate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FacetField {
    Rights,
    PublicationType,
    DocumentLanguage,
    PublicationYear,
    DocumentType,
    /// Connector-local bookkeeping, never sent to the backend.
    Source,
    Other(String),
}

impl FacetField {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "rights" => Self::Rights,
            "publicationtype" => Self::PublicationType,
            "documentlanguage" => Self::DocumentLanguage,
            "publicationyear" => Self::PublicationYear,
            "documenttype" => Self::DocumentType,
            "source" => Self::Source,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Rights => "rights",
            Self::PublicationType => "publicationtype",
            Self::DocumentLanguage => "documentlanguage",
            Self::PublicationYear => "publicationyear",
            Self::DocumentType => "documenttype",
            Self::Source => "source",
            Self::Other(name) => name,
        }
    }
}

pub struct FacetNormalizer<'a> {
    vocabulary: &'a dyn Vocabulary,
}

impl<'a> FacetNormalizer<'a> {
    pub fn new(vocabulary: &'a dyn Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn normalize(&self, raw: &RawFacetField) -> Facet {
        let field = raw.name.to_lowercase();
        let kind = FacetField::parse(&field);
        let label = self
            .vocabulary
            .facet_label(&kind)
            .unwrap_or_else(|| field.clone());

        let values = raw
            .counts
            .iter()
            .filter_map(|bucket| {
                let (value, label) = self.translate_bucket(&kind, &bucket.name)?;
                Some(Value::new(value, label, bucket.count))
            })
            .collect();

        Facet {
            field,
            label,
            values: merge_values(values),
        }
    }

    /// `(value, label)` for one raw bucket, or `None` to drop it.
    fn translate_bucket(&self, kind: &FacetField, name: &str) -> Option<(String, String)> {
        match kind {
            FacetField::Rights => Some(labelled_or_raw(self.vocabulary.rights_label(name), name)),
            FacetField::PublicationType => Some(labelled_or_raw(
                self.vocabulary.publication_type_label(name),
                name,
            )),
            FacetField::DocumentLanguage => match self.vocabulary.language(name) {
                Some(language) => Some((language.code.to_lowercase(), language.name)),
                None => {
                    debug!(code = %name, "dropping unknown language facet value");
                    None
                }
            },
            FacetField::PublicationYear => {
                let year: String = name.chars().take(4).collect();
                Some((year.clone(), year))
            }
            FacetField::DocumentType => {
                let label = self
                    .vocabulary
                    .document_type_label(DocumentType::WithFullText);
                Some((label.clone(), label))
            }
            FacetField::Source | FacetField::Other(_) => Some((name.to_string(), name.to_string())),
        }
    }
}

fn labelled_or_raw(label: Option<String>, raw: &str) -> (String, String) {
    match label.filter(|l| !l.trim().is_empty()) {
        Some(label) => (label.clone(), label),
        None => (raw.to_string(), raw.to_string()),
    }
}

/// Collapse values whose `value` matches case-insensitively, summing counts and
/// keeping the first label. Order of first appearance is preserved.
pub fn merge_values(values: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        match merged.iter_mut().find(|v| v.same_value(&value.value)) {
            Some(existing) => existing.count += value.count,
            None => merged.push(value),
        }
    }
    merged
}

pub fn merge_facet(mut into: Facet, other: Facet) -> Facet {
    into.values.extend(other.values);
    into.values = merge_values(into.values);
    into
}

/// Merge facets sharing a field and drop facets without values.
pub fn merge_all(facets: impl IntoIterator<Item = Facet>) -> Vec<Facet> {
    let mut merged: Vec<Facet> = Vec::new();
    for facet in facets {
        if facet.values.is_empty() {
            continue;
        }
        match merged.iter().position(|f| f.is_field(&facet.field)) {
            Some(idx) => {
                let existing = merged.remove(idx);
                merged.insert(idx, merge_facet(existing, facet));
            }
            None => merged.push(facet),
        }
    }
    merged
}

/// Add the "with abstract only" bucket to the document-type facet: every hit
/// not counted as having full text.
pub fn append_abstract_only(facets: &mut [Facet], total_hits: u64, vocabulary: &dyn Vocabulary) {
    let Some(facet) = facets
        .iter_mut()
        .find(|f| f.is_field(FacetField::DocumentType.as_str()))
    else {
        return;
    };

    let counted = facet.total_count();
    if counted > total_hits {
        warn!(
            counted,
            total_hits, "document type buckets exceed total hits, clamping abstract-only count"
        );
    }

    let label = vocabulary.document_type_label(DocumentType::WithAbstractOnly);
    facet.values.push(Value::new(
        label.clone(),
        label,
        total_hits.saturating_sub(counted),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FacetCount;
    use crate::vocabulary::DefaultVocabulary;

    fn raw(name: &str, buckets: &[(&str, u64)]) -> RawFacetField {
        RawFacetField::new(
            name,
            buckets
                .iter()
                .map(|(n, c)| FacetCount::new(*n, *c))
                .collect(),
        )
    }

    #[test]
    fn field_parse_is_case_insensitive() {
        assert_eq!(FacetField::parse("documentLanguage"), FacetField::DocumentLanguage);
        assert_eq!(FacetField::parse("SOURCE"), FacetField::Source);
        assert_eq!(
            FacetField::parse("Keywords"),
            FacetField::Other("keywords".to_string())
        );
    }

    #[test]
    fn rights_map_to_labels_or_pass_through() {
        let vocab = DefaultVocabulary;
        let facet = FacetNormalizer::new(&vocab).normalize(&raw(
            "Rights",
            &[("openAccess", 10), ("CC-BY", 5), ("weird-licence", 2)],
        ));
        assert_eq!(facet.field, "rights");
        assert_eq!(facet.label, "Rights");
        // openAccess and CC-BY both resolve to open access and are merged
        assert_eq!(facet.values.len(), 2);
        assert_eq!(facet.value("Open access").unwrap().count, 15);
        let raw_value = facet.value("weird-licence").unwrap();
        assert_eq!(raw_value.label, "weird-licence");
        assert_eq!(raw_value.count, 2);
    }

    #[test]
    fn publication_types_map_to_labels() {
        let vocab = DefaultVocabulary;
        let facet = FacetNormalizer::new(&vocab).normalize(&raw(
            "publicationType",
            &[("article", 4), ("dataset", 1)],
        ));
        assert_eq!(facet.value("Research article").unwrap().count, 4);
        assert_eq!(facet.value("dataset").unwrap().label, "dataset");
    }

    #[test]
    fn unknown_languages_are_dropped() {
        let vocab = DefaultVocabulary;
        let facet = FacetNormalizer::new(&vocab).normalize(&raw(
            "documentLanguage",
            &[("eng", 7), ("en", 3), ("zz", 9), ("fra", 1)],
        ));
        assert_eq!(facet.values.len(), 2);
        let english = facet.value("en").unwrap();
        assert_eq!(english.label, "English");
        assert_eq!(english.count, 10);
        assert_eq!(facet.value("fr").unwrap().count, 1);
        assert!(facet.value("zz").is_none());
    }

    #[test]
    fn years_are_truncated_and_merged() {
        let vocab = DefaultVocabulary;
        let facet = FacetNormalizer::new(&vocab).normalize(&raw(
            "publicationYear",
            &[
                ("2020-01-01T00:00:00Z", 3),
                ("2020-06-01T00:00:00Z", 2),
                ("2019-01-01T00:00:00Z", 1),
                ("99", 1),
            ],
        ));
        assert_eq!(facet.value("2020").unwrap().count, 5);
        assert_eq!(facet.value("2019").unwrap().count, 1);
        assert_eq!(facet.value("99").unwrap().count, 1);
    }

    #[test]
    fn document_types_fold_into_full_text() {
        let vocab = DefaultVocabulary;
        let facet = FacetNormalizer::new(&vocab).normalize(&raw(
            "documentType",
            &[("fulltext", 6), ("pdf", 4)],
        ));
        assert_eq!(facet.values, vec![Value::new("has full text", "has full text", 10)]);
    }

    #[test]
    fn unknown_fields_pass_through() {
        let vocab = DefaultVocabulary;
        let facet =
            FacetNormalizer::new(&vocab).normalize(&raw("Keywords", &[("RNA", 2), ("rna", 1)]));
        assert_eq!(facet.field, "keywords");
        assert_eq!(facet.label, "keywords");
        assert_eq!(facet.values, vec![Value::new("RNA", "RNA", 3)]);
    }

    #[test]
    fn merge_all_combines_duplicate_fields() {
        let vocab = DefaultVocabulary;
        let normalizer = FacetNormalizer::new(&vocab);
        let merged = merge_all(vec![
            normalizer.normalize(&raw("rights", &[("openAccess", 1)])),
            normalizer.normalize(&raw("publicationYear", &[])),
            normalizer.normalize(&raw("RIGHTS", &[("openAccess", 2), ("closedAccess", 4)])),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value("Open access").unwrap().count, 3);
        assert_eq!(merged[0].value("Closed access").unwrap().count, 4);
    }

    #[test]
    fn abstract_only_is_the_remainder_of_total_hits() {
        let vocab = DefaultVocabulary;
        let normalizer = FacetNormalizer::new(&vocab);
        let mut facets = vec![normalizer.normalize(&raw("documentType", &[("fulltext", 30)]))];
        append_abstract_only(&mut facets, 100, &vocab);
        assert_eq!(
            facets[0].value("with abstract only").unwrap().count,
            70
        );
        assert_eq!(facets[0].total_count(), 100);
    }

    #[test]
    fn abstract_only_never_goes_negative() {
        let vocab = DefaultVocabulary;
        let normalizer = FacetNormalizer::new(&vocab);
        let mut facets = vec![normalizer.normalize(&raw("documentType", &[("fulltext", 30)]))];
        append_abstract_only(&mut facets, 10, &vocab);
        assert_eq!(facets[0].value("with abstract only").unwrap().count, 0);
    }

    #[test]
    fn abstract_only_needs_a_document_type_facet() {
        let vocab = DefaultVocabulary;
        let normalizer = FacetNormalizer::new(&vocab);
        let mut facets = vec![normalizer.normalize(&raw("rights", &[("openAccess", 30)]))];
        append_abstract_only(&mut facets, 100, &vocab);
        assert_eq!(facets[0].values.len(), 1);
    }
}
