use crate::model::property_reference;
use crate::repository::Coordinate;
use log::{debug, warn};
use std::collections::HashMap;

/// Where a resolved version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// A literal `<version>` tag.
    Literal,
    /// A `${name}` reference found in the symbol table.
    Property(String),
    /// No usable local text; taken from the effective-version lookup.
    Effective,
    /// A `${name}` reference nobody could resolve; the raw text is used as-is.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Numeric-ready version.
    pub version: String,
    /// Version text as declared (equals `version` unless symbolic).
    pub expression: String,
    pub source: ResolutionSource,
}

impl ResolvedVersion {
    pub fn is_degraded(&self) -> bool {
        self.source == ResolutionSource::Degraded
    }
}

/// Resolves a declaration's effective version.
///
/// Priority:
/// 1. No version text: the effective-version lookup, otherwise unresolvable.
/// 2. `${name}`: the symbol table, then the effective lookup, then the raw text.
/// 3. Anything else is used verbatim.
pub struct VersionResolver<'a> {
    symbols: &'a HashMap<String, String>,
    effective: &'a HashMap<String, String>,
}

impl<'a> VersionResolver<'a> {
    /// `effective` is keyed by `group:artifact`.
    pub fn new(symbols: &'a HashMap<String, String>, effective: &'a HashMap<String, String>) -> Self {
        Self { symbols, effective }
    }

    /// `None` means unresolvable: the caller skips the declaration.
    pub fn resolve(&self, coordinate: &Coordinate, raw: Option<&str>) -> Option<ResolvedVersion> {
        let raw = raw.map(str::trim).filter(|text| !text.is_empty());

        let Some(raw) = raw else {
            let effective = self.effective.get(&coordinate.key());
            if effective.is_none() {
                debug!("{coordinate} has no version tag and no managed version");
            }
            return effective.map(|version| ResolvedVersion {
                version: version.clone(),
                expression: version.clone(),
                source: ResolutionSource::Effective,
            });
        };

        if let Some(name) = property_reference(raw) {
            if let Some(value) = self.symbols.get(name) {
                return Some(ResolvedVersion {
                    version: value.trim().to_string(),
                    expression: raw.to_string(),
                    source: ResolutionSource::Property(name.to_string()),
                });
            }

            if let Some(value) = self.effective.get(&coordinate.key()) {
                debug!("{coordinate}: property '{name}' undefined, using effective version {value}");
                return Some(ResolvedVersion {
                    version: value.clone(),
                    expression: raw.to_string(),
                    source: ResolutionSource::Effective,
                });
            }

            warn!("{coordinate}: property '{name}' could not be resolved, keeping '{raw}'");
            return Some(ResolvedVersion {
                version: raw.to_string(),
                expression: raw.to_string(),
                source: ResolutionSource::Degraded,
            });
        }

        Some(ResolvedVersion {
            version: raw.to_string(),
            expression: raw.to_string(),
            source: ResolutionSource::Literal,
        })
    }
}
