use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Matches a pre-release marker as a delimited token, e.g. `-RC1`, `.alpha2`, `-M3`.
static PRE_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[._-])(?:alpha|beta|rc|cr|m|preview|ea)[._-]?\d*(?:$|[._-])")
        .expect("pre-release pattern is valid")
});

const SNAPSHOT_SUFFIXES: [&str; 2] = ["-SNAPSHOT", ".SNAPSHOT"];

/// A version string reduced to its leading numeric segments.
///
/// Parsing splits on `.`, `-` and `_` and stops at the first token that is not
/// a plain integer, so `2.0.0.RC1`, `2.0.0-SNAPSHOT` and `2.0.0` all carry the
/// segments `[2, 0, 0]`. Qualifiers do not take part in ordering.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    pub segments: Vec<u64>,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        let segments = version
            .trim()
            .split(['.', '-', '_'])
            .map_while(|part| part.parse::<u64>().ok())
            .collect();

        Version {
            original: version.to_string(),
            segments,
        }
    }

    /// Segment at `index`, with missing trailing segments read as `0`.
    pub fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u64 {
        self.segment(0)
    }

    pub fn minor(&self) -> u64 {
        self.segment(1)
    }

    pub fn is_stable(&self) -> bool {
        let upper = self.original.to_uppercase();
        if SNAPSHOT_SUFFIXES.iter().any(|suffix| upper.ends_with(suffix)) {
            return false;
        }

        !PRE_RELEASE.is_match(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Magnitude of an available upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateKind {
    UpToDate,
    Patch,
    Minor,
    Major,
    /// No latest version could be determined. Never produced by
    /// [`VersionComparator::classify`]; callers set it.
    #[default]
    Unknown,
}

impl UpdateKind {
    pub fn is_upgrade(self) -> bool {
        matches!(self, UpdateKind::Patch | UpdateKind::Minor | UpdateKind::Major)
    }

    /// Display ordering: biggest upgrades first, up-to-date last.
    pub fn sort_rank(self) -> u8 {
        match self {
            UpdateKind::Major => 0,
            UpdateKind::Minor => 1,
            UpdateKind::Patch => 2,
            UpdateKind::Unknown => 3,
            UpdateKind::UpToDate => 4,
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpdateKind::UpToDate => "up to date",
            UpdateKind::Patch => "patch",
            UpdateKind::Minor => "minor",
            UpdateKind::Major => "major",
            UpdateKind::Unknown => "-",
        };
        f.write_str(label)
    }
}

pub struct VersionComparator;

impl VersionComparator {
    pub fn compare(a: &str, b: &str) -> Ordering {
        Version::parse(a).cmp(&Version::parse(b))
    }

    pub fn is_stable(version: &str) -> bool {
        Version::parse(version).is_stable()
    }

    /// Check if version `a` is newer than version `b`
    pub fn is_newer(a: &str, b: &str) -> bool {
        Self::compare(a, b) == Ordering::Greater
    }

    /// Classify the upgrade from `current` to `latest`.
    ///
    /// A `latest` that is not numerically ahead of `current` counts as up to
    /// date, even when the strings differ.
    pub fn classify(current: &str, latest: &str) -> UpdateKind {
        if current == latest {
            return UpdateKind::UpToDate;
        }

        let current = Version::parse(current);
        let latest = Version::parse(latest);
        if current >= latest {
            return UpdateKind::UpToDate;
        }

        if latest.major() > current.major() {
            UpdateKind::Major
        } else if latest.minor() > current.minor() {
            UpdateKind::Minor
        } else {
            UpdateKind::Patch
        }
    }

    /// Keep stable versions only, newest first. An empty result is a valid outcome.
    pub fn filter_stable_descending(versions: &[String]) -> Vec<String> {
        let mut stable: Vec<Version> = versions
            .iter()
            .map(|v| Version::parse(v))
            .filter(Version::is_stable)
            .collect();

        stable.sort_by(|a, b| b.cmp(a));
        stable.into_iter().map(|v| v.original).collect()
    }

    /// Get the newest stable version from a list
    pub fn latest_stable(versions: &[String]) -> Option<String> {
        Self::filter_stable_descending(versions).into_iter().next()
    }
}
