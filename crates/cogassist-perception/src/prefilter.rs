//! Cheap rule-based triage applied before any reasoning pass runs. Grounded
//! in the same skip/transactional/protected-domain decision tree used by the
//! original email filter, with a mergeable default pattern set.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Skip,
    ProcessLight,
    ProcessFull,
}

#[derive(Debug, Clone)]
pub struct FilterResult {
    pub decision: FilterDecision,
    pub confidence: f64,
    pub reason: String,
    pub patterns_matched: Vec<String>,
}

struct NamedPattern {
    name: &'static str,
    regex: Regex,
}

fn named(name: &'static str, pattern: &str) -> NamedPattern {
    NamedPattern {
        name,
        regex: Regex::new(pattern).expect("static pattern is valid regex"),
    }
}

fn default_skip_sender_patterns() -> Vec<NamedPattern> {
    vec![
        named("noreply_sender", r"no-?reply@"),
        named("notification_sender", r"notifications?@"),
        named("marketing_sender", r"(marketing|newsletter|promo)@"),
    ]
}

fn default_transactional_sender_patterns() -> Vec<NamedPattern> {
    vec![
        named("billing_sender", r"billing@"),
        named("receipts_sender", r"receipts?@"),
        named("orders_sender", r"orders?@"),
    ]
}

fn default_skip_subject_patterns() -> Vec<NamedPattern> {
    vec![
        named("unsubscribe_subject", r"unsubscribe"),
        named("newsletter_subject", r"\bnewsletter\b|\bdigest\b"),
        named("promo_subject", r"\b(sale|% off|discount code)\b"),
    ]
}

fn default_transactional_subject_patterns() -> Vec<NamedPattern> {
    vec![
        named("invoice_subject", r"\b(invoice|facture|receipt)\b"),
        named("order_subject", r"\border (confirmed|shipped|delivered)\b"),
    ]
}

fn default_protected_sender_domains() -> Vec<&'static str> {
    vec![
        "ca-paris.fr",
        "chase.com",
        "paypal.com",
        "irs.gov",
        "ssa.gov",
    ]
}

pub struct EmailFilter {
    skip_sender_patterns: Vec<NamedPattern>,
    transactional_sender_patterns: Vec<NamedPattern>,
    skip_subject_patterns: Vec<NamedPattern>,
    transactional_subject_patterns: Vec<NamedPattern>,
    protected_sender_domains: Vec<String>,
    strict_mode: bool,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self {
            skip_sender_patterns: default_skip_sender_patterns(),
            transactional_sender_patterns: default_transactional_sender_patterns(),
            skip_subject_patterns: default_skip_subject_patterns(),
            transactional_subject_patterns: default_transactional_subject_patterns(),
            protected_sender_domains: default_protected_sender_domains()
                .into_iter()
                .map(String::from)
                .collect(),
            strict_mode: false,
        }
    }
}

impl EmailFilter {
    /// Construct with extra pattern lists merged in alongside the defaults.
    pub fn with_extra_patterns(
        extra_skip_sender: Vec<(String, String)>,
        extra_transactional_sender: Vec<(String, String)>,
        strict_mode: bool,
    ) -> Result<Self, regex::Error> {
        let mut filter = Self {
            strict_mode,
            ..Self::default()
        };
        for (name, pattern) in extra_skip_sender {
            filter.skip_sender_patterns.push(NamedPattern {
                name: Box::leak(name.into_boxed_str()),
                regex: Regex::new(&pattern)?,
            });
        }
        for (name, pattern) in extra_transactional_sender {
            filter.transactional_sender_patterns.push(NamedPattern {
                name: Box::leak(name.into_boxed_str()),
                regex: Regex::new(&pattern)?,
            });
        }
        Ok(filter)
    }

    fn is_protected_sender(&self, sender_lower: &str) -> bool {
        self.protected_sender_domains
            .iter()
            .any(|domain| sender_lower.ends_with(domain))
    }

    pub fn filter(&self, sender: &str, subject: &str) -> FilterResult {
        let sender_lower = sender.to_lowercase();
        let subject_lower = subject.to_lowercase();

        let mut skip_matches = Vec::new();
        for p in self
            .skip_sender_patterns
            .iter()
            .chain(self.skip_subject_patterns.iter())
        {
            let haystack = if self.skip_sender_patterns.iter().any(|sp| sp.name == p.name) {
                &sender_lower
            } else {
                &subject_lower
            };
            if p.regex.is_match(haystack) {
                skip_matches.push(p.name.to_string());
            }
        }

        let mut transactional_matches = Vec::new();
        for p in self
            .transactional_sender_patterns
            .iter()
            .chain(self.transactional_subject_patterns.iter())
        {
            let haystack = if self
                .transactional_sender_patterns
                .iter()
                .any(|tp| tp.name == p.name)
            {
                &sender_lower
            } else {
                &subject_lower
            };
            if p.regex.is_match(haystack) {
                transactional_matches.push(p.name.to_string());
            }
        }

        let protected = self.is_protected_sender(&sender_lower);
        let skip_threshold_single = if self.strict_mode { 0.65 } else { 0.75 };
        let skip_threshold_multi = if self.strict_mode { 0.90 } else { 0.95 };
        let transactional_confidence = if self.strict_mode { 0.70 } else { 0.80 };

        if skip_matches.len() >= 2 {
            // Protected-sender override is strictly override-wins: it beats
            // even multiple skip pattern matches.
            if protected {
                return FilterResult {
                    decision: FilterDecision::ProcessLight,
                    confidence: transactional_confidence,
                    reason: "protected sender domain overrides skip patterns".into(),
                    patterns_matched: skip_matches,
                };
            }
            return FilterResult {
                decision: FilterDecision::Skip,
                confidence: skip_threshold_multi,
                reason: format!("{} skip patterns matched", skip_matches.len()),
                patterns_matched: skip_matches,
            };
        }

        if skip_matches.len() == 1 {
            if protected || !transactional_matches.is_empty() {
                let mut matched = skip_matches;
                matched.extend(transactional_matches);
                return FilterResult {
                    decision: FilterDecision::ProcessLight,
                    confidence: transactional_confidence,
                    reason: "single skip pattern overridden by protected sender or transactional match".into(),
                    patterns_matched: matched,
                };
            }
            return FilterResult {
                decision: FilterDecision::Skip,
                confidence: skip_threshold_single,
                reason: "single skip pattern matched".into(),
                patterns_matched: skip_matches,
            };
        }

        if !transactional_matches.is_empty() {
            return FilterResult {
                decision: FilterDecision::ProcessLight,
                confidence: transactional_confidence,
                reason: "transactional pattern matched".into(),
                patterns_matched: transactional_matches,
            };
        }

        FilterResult {
            decision: FilterDecision::ProcessFull,
            confidence: 1.0,
            reason: "no patterns matched".into(),
            patterns_matched: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obvious_newsletter_is_skipped_with_high_confidence() {
        let filter = EmailFilter::default();
        let result = filter.filter(
            "newsletter@mailchimp.com",
            "Weekly digest — unsubscribe",
        );
        assert_eq!(result.decision, FilterDecision::Skip);
        assert!(result.confidence >= 0.95);
        assert!(result.patterns_matched.len() >= 2);
    }

    #[test]
    fn protected_sender_overrides_skip_patterns() {
        let filter = EmailFilter::default();
        let result = filter.filter("billing@ca-paris.fr", "Votre facture #12345 — unsubscribe");
        assert_eq!(result.decision, FilterDecision::ProcessLight);
    }

    #[test]
    fn single_skip_pattern_alone_is_a_soft_skip() {
        let filter = EmailFilter::default();
        let result = filter.filter("notifications@example.com", "Account update");
        assert_eq!(result.decision, FilterDecision::Skip);
        assert!((result.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn transactional_alone_is_process_light() {
        let filter = EmailFilter::default();
        let result = filter.filter("orders@shop.example.com", "Your order shipped");
        assert_eq!(result.decision, FilterDecision::ProcessLight);
        assert!((result.confidence - 0.80).abs() < 1e-9);
    }

    #[test]
    fn no_matches_is_full_processing() {
        let filter = EmailFilter::default();
        let result = filter.filter("alice@example.com", "Can we meet tomorrow?");
        assert_eq!(result.decision, FilterDecision::ProcessFull);
        assert_eq!(result.confidence, 1.0);
        assert!(result.patterns_matched.is_empty());
    }

    #[test]
    fn protected_sender_never_skipped_regardless_of_matches() {
        let filter = EmailFilter::default();
        let result = filter.filter(
            "notifications@paypal.com",
            "Sale! unsubscribe newsletter digest",
        );
        assert_ne!(result.decision, FilterDecision::Skip);
    }
}
