use core::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Standard document types the pipeline can produce.
///
/// Dispatcher output is free text, so every type carries an alias list and
/// [`DocType::normalize`] maps arbitrary spellings onto the registry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    /// Business requirements document.
    Brd,
    /// Functional requirements document.
    Frd,
    /// Non-functional requirements document.
    Nfrd,
    /// Cloud deployment / infrastructure document.
    Cloud,
    /// Security and compliance review.
    Security,
    /// API documentation.
    Api,
    /// Anything that fits no other type.
    #[default]
    Generic,
}

impl DocType {
    /// All registered document types, in registry order.
    pub const ALL: [Self; 7] = [
        Self::Brd,
        Self::Frd,
        Self::Nfrd,
        Self::Cloud,
        Self::Security,
        Self::Api,
        Self::Generic,
    ];

    /// Canonical uppercase tag, used in filenames and summaries.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Brd => "BRD",
            Self::Frd => "FRD",
            Self::Nfrd => "NFRD",
            Self::Cloud => "CLOUD",
            Self::Security => "SECURITY",
            Self::Api => "API",
            Self::Generic => "GENERIC",
        }
    }

    /// Alternative spellings accepted for this type.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Brd => &["BRD", "BUSINESS", "BUSINESS_REQUIREMENTS"],
            Self::Frd => &["FRD", "FUNCTIONAL", "FNRD", "FUNCTIONAL_REQUIREMENTS"],
            Self::Nfrd => &["NFRD", "NON-FUNCTIONAL", "NON_FUNCTIONAL", "NONFUNCTIONAL"],
            Self::Cloud => &["CLOUD", "DEPLOYMENT", "IMPLEMENTATION", "INFRASTRUCTURE"],
            Self::Security => &["SECURITY", "COMPLIANCE", "SECURITY_COMPLIANCE"],
            Self::Api => &["API", "API_DOCUMENTATION", "REST_API"],
            Self::Generic => &["GENERIC", "GENERAL", "OTHER"],
        }
    }

    /// Maps an arbitrary spelling onto the registry.
    ///
    /// The input is uppercased, trimmed, and dashes become underscores.
    /// Exact tag matches win, then a bidirectional substring check against
    /// each alias. Unrecognized input falls back to [`DocType::Generic`].
    pub fn normalize(raw: &str) -> Self {
        let clean = raw.trim().to_uppercase().replace('-', "_");
        if clean.is_empty() {
            return Self::Generic;
        }

        for doc_type in Self::ALL {
            if clean == doc_type.tag() {
                return doc_type;
            }
            for alias in doc_type.aliases() {
                if clean.contains(alias) || alias.contains(clean.as_str()) {
                    return doc_type;
                }
            }
        }

        Self::Generic
    }
}

impl Display for DocType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.tag())
    }
}
