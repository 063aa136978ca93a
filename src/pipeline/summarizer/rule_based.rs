/// Keyword indicator with its canned verdict and reasoning bullet.
struct Indicator {
    /// Every term must appear.
    all_of: &'static [&'static str],
    /// At least one term must appear. Ignored when empty.
    any_of: &'static [&'static str],
    verdict: &'static str,
    reason: &'static str,
}

impl Indicator {
    fn matches(&self, text: &str) -> bool {
        self.all_of.iter().all(|t| text.contains(t))
            && (self.any_of.is_empty() || self.any_of.iter().any(|t| text.contains(t)))
    }
}

/// Indicators in priority order; the first match supplies the verdict.
const INDICATORS: &[Indicator] = &[
    Indicator {
        all_of: &["antibiotic", "anticoagulant"],
        any_of: &[],
        verdict: "Potential interaction: Antibiotics may increase the effect of anticoagulants (bleeding risk).",
        reason: "Texts mention antibiotics and anticoagulants together.",
    },
    Indicator {
        all_of: &[],
        any_of: &["cyp3a4"],
        verdict: "Potential interaction: CYP3A4-mediated interaction (one drug may change levels of the other).",
        reason: "CYP3A4 inhibitors/substrates mentioned in label text.",
    },
    Indicator {
        all_of: &[],
        any_of: &["qt", "qtc", "torsade"],
        verdict: "Potential interaction: Combined QT-prolonging risk.",
        reason: "QT prolongation terms found in extracts.",
    },
];

pub const NO_INTERACTION_VERDICT: &str = "No major interaction found based on the provided extracts.";
const NO_INTERACTION_REASON: &str = "No specific mechanism or interaction terms found in extracts.";

/// Deterministic keyword summary over the combined context. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSummarizer;

impl RuleBasedSummarizer {
    /// Verdict from the first matching indicator, with one reasoning bullet
    /// per matching indicator.
    pub fn summarize(&self, snippets: &[&str]) -> String {
        let combined = snippets.join(" ").to_lowercase();

        let matched: Vec<&Indicator> = INDICATORS.iter().filter(|i| i.matches(&combined)).collect();

        let (verdict, reasons): (&str, Vec<&str>) = match matched.first() {
            Some(first) => (first.verdict, matched.iter().map(|i| i.reason).collect()),
            None => (NO_INTERACTION_VERDICT, vec![NO_INTERACTION_REASON]),
        };

        format!("{verdict}\n\nReasoning:\n- {}", reasons.join("\n- "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(snippets: &[&str]) -> String {
        RuleBasedSummarizer.summarize(snippets)
    }

    fn verdict(answer: &str) -> &str {
        answer.lines().next().unwrap()
    }

    #[test]
    fn no_indicator_gives_explicit_negative() {
        let answer = summarize(&["Amoxicillin:\nWARNINGS:\nallergic reactions"]);
        assert_eq!(verdict(&answer), NO_INTERACTION_VERDICT);
        assert!(answer.contains("No major interaction found"));
        assert!(answer.contains("\n\nReasoning:\n- No specific mechanism"));
    }

    #[test]
    fn antibiotic_and_anticoagulant_across_snippets() {
        let answer = summarize(&["This ANTIBIOTIC is widely used.", "Patients on an Anticoagulant."]);
        assert_eq!(
            verdict(&answer),
            "Potential interaction: Antibiotics may increase the effect of anticoagulants (bleeding risk)."
        );
    }

    #[test]
    fn antibiotic_alone_is_not_enough() {
        let answer = summarize(&["antibiotic only"]);
        assert_eq!(verdict(&answer), NO_INTERACTION_VERDICT);
    }

    #[test]
    fn cyp3a4_verdict() {
        let answer = summarize(&["Strong CYP3A4 inhibitors raise exposure."]);
        assert!(verdict(&answer).contains("CYP3A4-mediated"));
    }

    #[test]
    fn qt_terms_match() {
        for text in ["prolongs the QT interval", "QTc > 500 ms", "torsades de pointes"] {
            assert!(verdict(&summarize(&[text])).contains("QT-prolonging"), "{text}");
        }
    }

    #[test]
    fn first_indicator_wins_and_all_reasons_listed() {
        let answer = summarize(&["antibiotic anticoagulant cyp3a4 qt"]);
        assert!(verdict(&answer).contains("bleeding risk"));
        assert_eq!(answer.matches("\n- ").count(), 3);
        assert!(answer.contains("- CYP3A4 inhibitors/substrates"));
        assert!(answer.contains("- QT prolongation terms"));
    }

    #[test]
    fn empty_context_still_answers() {
        let answer = summarize(&[]);
        assert_eq!(verdict(&answer), NO_INTERACTION_VERDICT);
    }

    #[test]
    fn summary_is_pure() {
        let snippets = ["cyp3a4 substrate", "openFDA reports: No allergic reactions found for X."];
        assert_eq!(summarize(&snippets), summarize(&snippets));
    }
}
