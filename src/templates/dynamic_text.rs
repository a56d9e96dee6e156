use crate::issues::Severity;

/// Languages with a findings summary generator.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "nl"];

/// Sentence summarising how many findings were made, per severity.
///
/// `counts` lists the number of issues per severity in report order; buckets
/// with no issues are left out of the sentence. Returns `None` for languages
/// without a generator.
pub fn findings_summary(language: &str, counts: &[(Severity, usize)]) -> Option<String> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let present: Vec<(Severity, usize)> = counts.iter().copied().filter(|(_, n)| *n > 0).collect();

    let text = match language {
        "en" => english(total, &present),
        "nl" => dutch(total, &present),
        _ => return None,
    };
    Some(normalize_spaces(&text))
}

fn english(total: usize, present: &[(Severity, usize)]) -> String {
    match total {
        0 => "No issues were identified during the assessment.".to_string(),
        1 => format!(
            "During the assessment 1 issue was identified, rated {}.",
            present.first().map_or("none", |(s, _)| s.as_str())
        ),
        n => {
            let parts: Vec<String> = present
                .iter()
                .map(|(severity, count)| format!("{} {}", count, severity.as_str()))
                .collect();
            format!(
                "During the assessment {} issues were identified: {}.",
                n,
                join_list(&parts, "and")
            )
        }
    }
}

fn dutch(total: usize, present: &[(Severity, usize)]) -> String {
    match total {
        0 => "Tijdens het onderzoek zijn geen bevindingen gedaan.".to_string(),
        1 => format!(
            "Tijdens het onderzoek is 1 bevinding gedaan met risico {}.",
            present.first().map_or("geen", |(s, _)| dutch_severity(*s))
        ),
        n => {
            let parts: Vec<String> = present
                .iter()
                .map(|(severity, count)| format!("{} {}", count, dutch_severity(*severity)))
                .collect();
            format!(
                "Tijdens het onderzoek zijn {} bevindingen gedaan: {}.",
                n,
                join_list(&parts, "en")
            )
        }
    }
}

fn dutch_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "kritiek",
        Severity::High => "hoog",
        Severity::Medium => "gemiddeld",
        Severity::Low => "laag",
        Severity::None => "geen",
    }
}

/// "a", "a and b", "a, b and c"
fn join_list(parts: &[String], conjunction: &str) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), conjunction, last),
    }
}

fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(values: [usize; 5]) -> Vec<(Severity, usize)> {
        Severity::ALL.iter().copied().zip(values).collect()
    }

    #[test]
    fn test_english_no_findings() {
        assert_eq!(
            findings_summary("en", &counts([0, 0, 0, 0, 0])).unwrap(),
            "No issues were identified during the assessment."
        );
    }

    #[test]
    fn test_english_single_finding() {
        assert_eq!(
            findings_summary("en", &counts([0, 1, 0, 0, 0])).unwrap(),
            "During the assessment 1 issue was identified, rated high."
        );
    }

    #[test]
    fn test_english_multiple_findings() {
        assert_eq!(
            findings_summary("en", &counts([1, 0, 2, 3, 0])).unwrap(),
            "During the assessment 6 issues were identified: 1 critical, 2 medium and 3 low."
        );
    }

    #[test]
    fn test_dutch_multiple_findings() {
        assert_eq!(
            findings_summary("nl", &counts([0, 2, 1, 0, 0])).unwrap(),
            "Tijdens het onderzoek zijn 3 bevindingen gedaan: 2 hoog en 1 gemiddeld."
        );
    }

    #[test]
    fn test_unsupported_language() {
        assert!(findings_summary("de", &counts([1, 0, 0, 0, 0])).is_none());
    }

    #[test]
    fn test_no_double_spaces() {
        for language in SUPPORTED_LANGUAGES {
            for values in [[0, 0, 0, 0, 0], [1, 0, 0, 0, 0], [0, 0, 0, 0, 4], [3, 1, 4, 1, 5]] {
                let text = findings_summary(language, &counts(values)).unwrap();
                assert!(!text.contains("  "), "double space in {:?}", text);
                assert_eq!(text.trim(), text);
            }
        }
    }
}
