use codegraph_core::CommitKeywords;

/// The single category each commit reduces to (§4.I). Checked in priority order:
/// architectural wins over refactor, refactor over bug_fix, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Architectural,
    Refactor,
    BugFix,
    Test,
    Documentation,
    Feature,
    Unknown,
}

/// Classifies a commit message by keyword match, case-insensitive, in the fixed
/// priority order the spec names (§4.I).
pub fn classify_commit(message: &str, keywords: &CommitKeywords) -> CommitType {
    let lower = message.to_lowercase();
    let matches = |list: &[String]| list.iter().any(|kw| lower.contains(kw.as_str()));

    if matches(&keywords.architectural) {
        CommitType::Architectural
    } else if matches(&keywords.refactor) {
        CommitType::Refactor
    } else if matches(&keywords.bug_fix) {
        CommitType::BugFix
    } else if matches(&keywords.test) {
        CommitType::Test
    } else if matches(&keywords.documentation) {
        CommitType::Documentation
    } else if matches(&keywords.feature) {
        CommitType::Feature
    } else {
        CommitType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn architectural_keyword_wins_over_refactor() {
        let keywords = CommitKeywords::default();
        let kind = classify_commit("refactor the service layer architecture", &keywords);
        assert_eq!(kind, CommitType::Architectural);
    }

    #[test]
    fn bug_fix_keyword_is_detected() {
        let keywords = CommitKeywords::default();
        assert_eq!(classify_commit("fix null pointer crash", &keywords), CommitType::BugFix);
    }

    #[test]
    fn unmatched_message_is_unknown() {
        let keywords = CommitKeywords::default();
        assert_eq!(classify_commit("wip", &keywords), CommitType::Unknown);
    }
}
