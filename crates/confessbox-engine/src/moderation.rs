/// Why a piece of text was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Profane,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

/// Substring blocklist filter.
///
/// Matching is on the lowercased text and ignores word boundaries, so a short
/// entry also hits longer words containing it.
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    blocklist: Vec<String>,
}

impl ModerationFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocklist = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { blocklist }
    }

    pub fn classify(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Rejected(RejectReason::Empty);
        }

        let lowered = text.to_lowercase();
        if self.blocklist.iter().any(|w| lowered.contains(w.as_str())) {
            Verdict::Rejected(RejectReason::Profane)
        } else {
            Verdict::Accepted
        }
    }
}
