//! Code → display label lookups for the controlled vocabularies exposed in facets.
//!
//! The backend stores rights statements, publication types and languages as raw
//! codes. The connector reports them with the labels used across OpenMinTeD
//! connectors. Everything here is a pure lookup; [`Vocabulary`] exists so callers
//! can plug in their own tables.

use crate::facets::FacetField;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RightsStatement {
    OpenAccess,
    RestrictedAccess,
    ClosedAccess,
    EmbargoedAccess,
}

impl RightsStatement {
    /// Map a raw backend code onto a rights statement.
    ///
    /// Accepts the COAR/OpenAIRE style codes (`openAccess`, `OPEN`), the
    /// `info:eu-repo/semantics/...` URIs and Creative Commons licence codes,
    /// which always imply open access.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
            .replace([' ', '_'], "");

        match normalized.as_str() {
            "openaccess" | "open" => Some(Self::OpenAccess),
            "restrictedaccess" | "restricted" => Some(Self::RestrictedAccess),
            "closedaccess" | "closed" => Some(Self::ClosedAccess),
            "embargoedaccess" | "embargoed" | "embargo" => Some(Self::EmbargoedAccess),
            other if other == "cc0" || other.starts_with("cc-") || other == "publicdomain" => {
                Some(Self::OpenAccess)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAccess => "Open access",
            Self::RestrictedAccess => "Restricted access",
            Self::ClosedAccess => "Closed access",
            Self::EmbargoedAccess => "Embargoed access",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublicationType {
    ResearchArticle,
    ReviewArticle,
    ConferencePaper,
    Book,
    BookPart,
    BachelorThesis,
    MasterThesis,
    DoctoralThesis,
    Report,
    Preprint,
    Lecture,
    Patent,
    Other,
}

impl PublicationType {
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
            .replace([' ', '_', '-'], "");

        let kind = match normalized.as_str() {
            "article" | "researcharticle" | "journalarticle" | "contributiontojournal" => {
                Self::ResearchArticle
            }
            "review" | "reviewarticle" => Self::ReviewArticle,
            "conferenceobject" | "conferencepaper" | "conferenceproceedings" => {
                Self::ConferencePaper
            }
            "book" | "monograph" => Self::Book,
            "bookpart" | "bookchapter" | "chapter" => Self::BookPart,
            "bachelorthesis" => Self::BachelorThesis,
            "masterthesis" | "mastersthesis" => Self::MasterThesis,
            "doctoralthesis" | "phdthesis" => Self::DoctoralThesis,
            "report" | "workingpaper" | "technicalreport" => Self::Report,
            "preprint" => Self::Preprint,
            "lecture" => Self::Lecture,
            "patent" => Self::Patent,
            "other" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ResearchArticle => "Research article",
            Self::ReviewArticle => "Review article",
            Self::ConferencePaper => "Conference paper",
            Self::Book => "Book",
            Self::BookPart => "Book part",
            Self::BachelorThesis => "Bachelor thesis",
            Self::MasterThesis => "Master thesis",
            Self::DoctoralThesis => "Doctoral thesis",
            Self::Report => "Report",
            Self::Preprint => "Preprint",
            Self::Lecture => "Lecture",
            Self::Patent => "Patent",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    WithFullText,
    WithAbstractOnly,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WithFullText => "has full text",
            Self::WithAbstractOnly => "with abstract only",
        }
    }
}

/// A resolved language: ISO 639-1 code plus English name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

// (iso 639-1, iso 639-2/B, iso 639-2/T, English name)
const LANGUAGES: &[(&str, &str, &str, &str)] = &[
    ("ar", "ara", "ara", "Arabic"),
    ("bg", "bul", "bul", "Bulgarian"),
    ("ca", "cat", "cat", "Catalan"),
    ("cs", "cze", "ces", "Czech"),
    ("da", "dan", "dan", "Danish"),
    ("de", "ger", "deu", "German"),
    ("el", "gre", "ell", "Greek"),
    ("en", "eng", "eng", "English"),
    ("es", "spa", "spa", "Spanish"),
    ("et", "est", "est", "Estonian"),
    ("eu", "baq", "eus", "Basque"),
    ("fi", "fin", "fin", "Finnish"),
    ("fr", "fre", "fra", "French"),
    ("ga", "gle", "gle", "Irish"),
    ("gl", "glg", "glg", "Galician"),
    ("hr", "hrv", "hrv", "Croatian"),
    ("hu", "hun", "hun", "Hungarian"),
    ("it", "ita", "ita", "Italian"),
    ("ja", "jpn", "jpn", "Japanese"),
    ("lt", "lit", "lit", "Lithuanian"),
    ("lv", "lav", "lav", "Latvian"),
    ("mt", "mlt", "mlt", "Maltese"),
    ("nl", "dut", "nld", "Dutch"),
    ("no", "nor", "nor", "Norwegian"),
    ("pl", "pol", "pol", "Polish"),
    ("pt", "por", "por", "Portuguese"),
    ("ro", "rum", "ron", "Romanian"),
    ("ru", "rus", "rus", "Russian"),
    ("sk", "slo", "slk", "Slovak"),
    ("sl", "slv", "slv", "Slovenian"),
    ("sv", "swe", "swe", "Swedish"),
    ("tr", "tur", "tur", "Turkish"),
    ("uk", "ukr", "ukr", "Ukrainian"),
    ("zh", "chi", "zho", "Chinese"),
];

/// Every accepted spelling (lowercase) → index into `LANGUAGES`.
static LANGUAGE_INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (i, (alpha2, alpha3b, alpha3t, name)) in LANGUAGES.iter().enumerate() {
        index.insert((*alpha2).to_string(), i);
        index.insert((*alpha3b).to_string(), i);
        index.insert((*alpha3t).to_string(), i);
        index.insert(name.to_lowercase(), i);
    }
    index
});

pub fn resolve_language(code: &str) -> Option<Language> {
    let key = code.trim().to_lowercase();
    // Locale-style codes such as en-GB or pt_BR resolve on their primary subtag.
    let primary = key.split(['-', '_']).next().unwrap_or_default();
    let idx = LANGUAGE_INDEX
        .get(&key)
        .or_else(|| LANGUAGE_INDEX.get(primary))?;
    let (alpha2, _, _, name) = LANGUAGES[*idx];
    Some(Language {
        code: alpha2.to_string(),
        name: name.to_string(),
    })
}

/// Lookups used by the facet normalizer.
pub trait Vocabulary: Send + Sync {
    /// Display label for a rights statement code. `None` when the code is unknown.
    fn rights_label(&self, code: &str) -> Option<String>;

    fn publication_type_label(&self, code: &str) -> Option<String>;

    fn language(&self, code: &str) -> Option<Language>;

    fn document_type_label(&self, kind: DocumentType) -> String;

    /// Human-readable facet name.
    fn facet_label(&self, field: &FacetField) -> Option<String>;
}

/// Built-in tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVocabulary;

impl Vocabulary for DefaultVocabulary {
    fn rights_label(&self, code: &str) -> Option<String> {
        RightsStatement::from_code(code).map(|r| r.label().to_string())
    }

    fn publication_type_label(&self, code: &str) -> Option<String> {
        PublicationType::from_code(code).map(|p| p.label().to_string())
    }

    fn language(&self, code: &str) -> Option<Language> {
        resolve_language(code)
    }

    fn document_type_label(&self, kind: DocumentType) -> String {
        kind.label().to_string()
    }

    fn facet_label(&self, field: &FacetField) -> Option<String> {
        let label = match field {
            FacetField::Rights => "Rights",
            FacetField::PublicationType => "Publication Type",
            FacetField::DocumentLanguage => "Language",
            FacetField::PublicationYear => "Publication Year",
            FacetField::DocumentType => "Document Type",
            FacetField::Source => "Content Source",
            FacetField::Other(_) => return None,
        };
        Some(label.to_string())
    }
}
