//! Domain grouping and ranking.
//!
//! Records are folded into one `DomainGroup` per normalized root domain.
//! Groups are rebuilt from scratch on every call; nothing is mutated
//! incrementally, so switching policy back and forth is lossless.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain_utils::normalize_root;
use crate::records::{AggregationPolicy, MailRecord, SourceType};
use crate::resolver::resolve_origin;

/// Maximum number of sample records retained per group.
pub const SAMPLE_LIMIT: usize = 5;

/// All records that resolved to the same root domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DomainGroup {
    pub domain: String,
    pub count: usize,
    /// First `SAMPLE_LIMIT` records in arrival order.
    pub sample_records: Vec<MailRecord>,
    /// Source type of the first record assigned to the group. Later records
    /// never change it, so a group may hold mixed types.
    pub source_type: SourceType,
}

impl DomainGroup {
    fn new(domain: String, source_type: SourceType) -> Self {
        Self {
            domain,
            count: 0,
            sample_records: Vec::with_capacity(SAMPLE_LIMIT),
            source_type,
        }
    }

    fn push(&mut self, record: &MailRecord) {
        self.count += 1;
        if self.sample_records.len() < SAMPLE_LIMIT {
            self.sample_records.push(record.clone());
        }
    }
}

/// Fold `records` into groups keyed by root domain.
pub fn aggregate(
    records: &[MailRecord],
    policy: AggregationPolicy,
) -> BTreeMap<String, DomainGroup> {
    let mut groups: BTreeMap<String, DomainGroup> = BTreeMap::new();
    for record in records {
        let origin = resolve_origin(record, policy);
        let root = normalize_root(&origin.domain.to_lowercase());
        groups
            .entry(root.clone())
            .or_insert_with(|| DomainGroup::new(root, origin.source_type))
            .push(record);
    }
    groups
}

/// Order groups by count (desc) then domain name (asc).
pub fn rank(groups: BTreeMap<String, DomainGroup>) -> Vec<DomainGroup> {
    let mut ranked: Vec<DomainGroup> = groups.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spamco(i: usize) -> MailRecord {
        MailRecord::new(format!("user{i}@visible{i}.example"))
            .with_subject(format!("offer {i}"))
            .with_dkim(format!("m{i}.spamco.net"))
    }

    fn mixed() -> Vec<MailRecord> {
        vec![
            MailRecord::new("a@shop.example").with_dkim("d.alpha.com").with_spf("s.beta.org"),
            MailRecord::new("b@shop.example").with_dkim("none").with_spf("s.beta.org"),
            MailRecord::new("c@shop.example"),
            MailRecord::new("no-at-sign"),
            MailRecord::new("d@x.alpha.com").with_spf("alpha.com"),
            MailRecord::new("e@shop.example").with_dkim("alpha.com"),
        ]
    }

    #[test]
    fn single_dkim_record_scenario() {
        let records = vec![
            MailRecord::new("x@evil.biz")
                .with_dkim("mail.spamco.net")
                .with_spf("none"),
        ];
        let groups = aggregate(&records, AggregationPolicy::DkimPriority);
        assert_eq!(groups.len(), 1);
        let group = &groups["spamco.net"];
        assert_eq!(group.domain, "spamco.net");
        assert_eq!(group.source_type, SourceType::Dkim);
        assert_eq!(group.count, 1);
        assert_eq!(group.sample_records, records);
    }

    #[test]
    fn samples_are_capped_at_five() {
        let records: Vec<MailRecord> = (0..6).map(spamco).collect();
        let groups = aggregate(&records, AggregationPolicy::DkimPriority);
        let group = &groups["spamco.net"];
        assert_eq!(group.count, 6);
        assert_eq!(group.sample_records.len(), SAMPLE_LIMIT);
        assert_eq!(group.sample_records, records[..5].to_vec());
    }

    #[test]
    fn counts_sum_to_input_length() {
        let mut records = mixed();
        records.extend((0..12).map(spamco));
        for policy in [AggregationPolicy::DkimPriority, AggregationPolicy::SpfPriority] {
            let groups = aggregate(&records, policy);
            let total: usize = groups.values().map(|g| g.count).sum();
            assert_eq!(total, records.len());
            assert!(groups.values().all(|g| g.sample_records.len() <= SAMPLE_LIMIT));
            assert!(groups.values().all(|g| g.count >= 1));
        }
    }

    #[test]
    fn first_seen_type_labels_the_group() {
        let records = vec![
            MailRecord::new("a@alpha.com"),
            MailRecord::new("b@shop.example").with_dkim("alpha.com"),
        ];
        let groups = aggregate(&records, AggregationPolicy::DkimPriority);
        let group = &groups["alpha.com"];
        assert_eq!(group.count, 2);
        assert_eq!(group.source_type, SourceType::Sender);
    }

    #[test]
    fn policy_changes_grouping() {
        let records = mixed();
        let dkim = aggregate(&records, AggregationPolicy::DkimPriority);
        let spf = aggregate(&records, AggregationPolicy::SpfPriority);

        assert_eq!(dkim["alpha.com"].count, 3);
        assert_eq!(dkim["beta.org"].count, 1);
        assert_eq!(spf["alpha.com"].count, 2);
        assert_eq!(spf["beta.org"].count, 2);
        assert_eq!(spf["beta.org"].source_type, SourceType::Spf);
    }

    #[test]
    fn policy_round_trip_restores_groups() {
        let records = mixed();
        let before = aggregate(&records, AggregationPolicy::DkimPriority);
        let _ = aggregate(&records, AggregationPolicy::SpfPriority);
        let after = aggregate(&records, AggregationPolicy::DkimPriority);
        assert_eq!(before, after);
    }

    #[test]
    fn rank_is_idempotent_and_ordered() {
        let mut records = mixed();
        records.extend((0..3).map(spamco));
        let first = rank(aggregate(&records, AggregationPolicy::DkimPriority));
        let second = rank(aggregate(&records, AggregationPolicy::DkimPriority));
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn rank_breaks_ties_alphabetically() {
        let records = vec![
            MailRecord::new("a@zeta.com"),
            MailRecord::new("b@alpha.com"),
            MailRecord::new("c@mid.com"),
            MailRecord::new("d@mid.com"),
        ];
        let ranked = rank(aggregate(&records, AggregationPolicy::DkimPriority));
        let order: Vec<&str> = ranked.iter().map(|g| g.domain.as_str()).collect();
        assert_eq!(order, vec!["mid.com", "alpha.com", "zeta.com"]);
    }

    #[test]
    fn malformed_senders_are_grouped_not_dropped() {
        let records = vec![MailRecord::new("no-at-sign"), MailRecord::new("")];
        let groups = aggregate(&records, AggregationPolicy::DkimPriority);
        assert_eq!(groups["no-at-sign"].count, 1);
        assert_eq!(groups[""].count, 1);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate(&[], AggregationPolicy::SpfPriority).is_empty());
        assert!(rank(BTreeMap::new()).is_empty());
    }
}
