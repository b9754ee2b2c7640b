//! Link, sample and routing-rule types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a cellular WAN link, e.g. `mdm-0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        LinkId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LinkId {
    fn from(s: &str) -> Self {
        LinkId(s.to_string())
    }
}

impl From<String> for LinkId {
    fn from(s: String) -> Self {
        LinkId(s)
    }
}

/// A candidate link enumerated at startup.
///
/// `rule` is the opaque reference the configuration store uses to address
/// this link's routing-priority rule (the modem's net port on Linux).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub rule: String,
}

impl Link {
    pub fn new(id: impl Into<LinkId>, rule: impl Into<String>) -> Self {
        Link {
            id: id.into(),
            rule: rule.into(),
        }
    }
}

/// One quality reading for one link at one tick. Higher is better.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub link: LinkId,
    pub quality: i64,
}

/// All samples taken in a single tick, ordered by link id.
pub type SampleSet = BTreeMap<LinkId, Sample>;

/// Routing-priority rule. Lower `priority` wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub id: String,
    pub priority: f64,
}

impl PriorityRule {
    pub fn new(id: impl Into<String>, priority: f64) -> Self {
        PriorityRule {
            id: id.into(),
            priority,
        }
    }

    /// One rule per distinct link rule, in enumeration order, at 1.0, 1.1,
    /// 1.2 and so on. The first link starts out preferred.
    pub fn seed_for(links: &[Link]) -> Vec<PriorityRule> {
        let mut rules: Vec<PriorityRule> = Vec::with_capacity(links.len());
        for link in links {
            if rules.iter().any(|r| r.id == link.rule) {
                continue;
            }
            let priority = 1.0 + rules.len() as f64 / 10.0;
            rules.push(PriorityRule::new(link.rule.clone(), priority));
        }
        rules
    }
}

/// Highest-quality sample of a tick. Ties go to the smallest link id.
pub fn best_sample(samples: &SampleSet) -> Option<&Sample> {
    samples.values().fold(None, |best: Option<&Sample>, s| match best {
        Some(b) if b.quality >= s.quality => Some(b),
        _ => Some(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, i64)]) -> SampleSet {
        entries
            .iter()
            .map(|(id, q)| {
                (
                    LinkId::from(*id),
                    Sample {
                        link: LinkId::from(*id),
                        quality: *q,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn best_sample_picks_highest_quality() {
        let samples = set(&[("mdm-0", -12), ("mdm-1", -7), ("mdm-2", -15)]);
        assert_eq!(best_sample(&samples).unwrap().link.as_str(), "mdm-1");
    }

    #[test]
    fn best_sample_tie_goes_to_smallest_id() {
        let samples = set(&[("mdm-2", -9), ("mdm-1", -9), ("mdm-3", -20)]);
        assert_eq!(best_sample(&samples).unwrap().link.as_str(), "mdm-1");
    }

    #[test]
    fn best_sample_empty_is_none() {
        assert!(best_sample(&SampleSet::new()).is_none());
    }

    #[test]
    fn seeded_rules_follow_link_order() {
        let links = vec![
            Link::new("mdm-3", "wwan3"),
            Link::new("mdm-0", "wwan0"),
            Link::new("mdm-4", "wwan3"),
        ];
        let rules = PriorityRule::seed_for(&links);
        assert_eq!(
            rules,
            vec![PriorityRule::new("wwan3", 1.0), PriorityRule::new("wwan0", 1.1)]
        );
    }

    #[test]
    fn link_id_displays_raw() {
        assert_eq!(LinkId::new("mdm-4").to_string(), "mdm-4");
    }
}
