//! Pass-rate and top-sender statistics over the raw record set.
//!
//! Independent of grouping and policy: the numbers describe what the junk
//! folder contains, not how it was bucketed.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::records::MailRecord;

/// Summary metrics for a non-empty record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Stats {
    pub total: usize,
    pub dkim_pass_count: usize,
    /// Fraction in [0, 1].
    pub dkim_pass_rate: f64,
    pub spf_pass_count: usize,
    /// Fraction in [0, 1].
    pub spf_pass_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_sender: Option<TopSender>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TopSender {
    /// Lower-cased sender address.
    pub address: String,
    pub count: usize,
}

/// Compute statistics over `records`.
///
/// Callers must not pass an empty slice; the rates are undefined there.
/// Top-sender ties go to the alphabetically smallest address.
pub fn summarize(records: &[MailRecord]) -> Stats {
    debug_assert!(!records.is_empty(), "summarize called without records");

    let total = records.len();
    let dkim_pass_count = records.iter().filter(|r| r.dkim().is_some()).count();
    let spf_pass_count = records.iter().filter(|r| r.spf().is_some()).count();

    let mut sender_counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *sender_counts
            .entry(record.sender_address.to_lowercase())
            .or_insert(0) += 1;
    }
    let top_sender = sender_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(address, count)| TopSender { address, count });

    Stats {
        total,
        dkim_pass_count,
        dkim_pass_rate: dkim_pass_count as f64 / total as f64,
        spf_pass_count,
        spf_pass_rate: spf_pass_count as f64 / total as f64,
        top_sender,
    }
}
