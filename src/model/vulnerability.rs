use std::fmt;

/// Severity of a known vulnerability. Ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// CVSS v3 qualitative rating bands.
    pub fn from_cvss(score: f32) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VulnerabilityRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Never negative.
    pub cvss_score: f32,
    pub severity: Severity,
}

/// Worst severity among `vulnerabilities`, if any.
pub fn worst_severity(vulnerabilities: &[VulnerabilityRecord]) -> Option<Severity> {
    vulnerabilities.iter().map(|v| v.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vuln(id: &str, severity: Severity) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            cvss_score: 0.0,
            severity,
        }
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_cvss(0.0), Severity::Low);
        assert_eq!(Severity::from_cvss(3.9), Severity::Low);
        assert_eq!(Severity::from_cvss(4.0), Severity::Medium);
        assert_eq!(Severity::from_cvss(7.5), Severity::High);
        assert_eq!(Severity::from_cvss(9.8), Severity::Critical);
    }

    #[test]
    fn worst_of_uses_total_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(worst_severity(&[]), None);
        let list = [
            vuln("a", Severity::Medium),
            vuln("b", Severity::Critical),
            vuln("c", Severity::Low),
        ];
        assert_eq!(worst_severity(&list), Some(Severity::Critical));
    }
}
