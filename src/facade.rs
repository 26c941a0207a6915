use std::collections::BTreeSet;
use std::time::Instant;

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain_utils::suffix_mismatch;
use crate::errors::Result;
use crate::groups::{DomainGroup, aggregate, rank};
use crate::records::{AggregationPolicy, MailRecord};
use crate::resolver::resolve_origin;
use crate::sources::{MailSource, SourceKind};
use crate::stats::{Stats, summarize};

/// High-level façade providing library-consumable entry points.
///
/// Wraps the pure engine (resolve, aggregate, rank, summarize) and, for
/// callers that hold a `MailSource`, the fetch that precedes it. Nothing here
/// prints or styles.
pub struct SpamAnalyzer;

impl SpamAnalyzer {
    /// Group, rank and summarize an already fetched record set.
    ///
    /// Statistics are `None` for an empty set.
    pub fn analyze(records: &[MailRecord], policy: AggregationPolicy) -> SpamAnalysis {
        let groups = rank(aggregate(records, policy));
        let stats = (!records.is_empty()).then(|| summarize(records));
        let warnings = suffix_warnings(records, policy);
        debug!(
            records = records.len(),
            groups = groups.len(),
            %policy,
            "analysis complete"
        );
        SpamAnalysis {
            policy,
            total_records: records.len(),
            groups,
            stats,
            warnings,
        }
    }

    /// Fetch through `source`, then analyze.
    ///
    /// A fetch failure is returned as-is; no partial analysis is produced.
    pub async fn fetch_and_analyze(
        source: &dyn MailSource,
        token: &str,
        limit: usize,
        policy: AggregationPolicy,
    ) -> Result<AnalysisReport> {
        let start = Instant::now();
        let records = source.fetch_spam_records(token, limit).await?;
        let fetch_ms = start.elapsed().as_millis() as u64;
        let analysis = Self::analyze(&records, policy);
        Ok(AnalysisReport {
            source: SourceInfo {
                kind: source.kind(),
                location: source.location(),
                limit,
            },
            records,
            analysis,
            fetch_ms,
        })
    }
}

/// One warning per distinct heuristic root whose origin has a multi-label
/// public suffix. Grouping is untouched.
fn suffix_warnings(records: &[MailRecord], policy: AggregationPolicy) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut warnings = Vec::new();
    for record in records {
        let origin = resolve_origin(record, policy);
        if let Some(mismatch) = suffix_mismatch(&origin.domain)
            && seen.insert((mismatch.heuristic_root.clone(), mismatch.registrable.clone()))
        {
            warn!(
                root = %mismatch.heuristic_root,
                registrable = %mismatch.registrable,
                "two-label root differs from public suffix list"
            );
            warnings.push(mismatch.describe());
        }
    }
    warnings
}

/* ----------------------------- Public Data Model --------------------------- */

/// Normalized result produced by the façade.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SpamAnalysis {
    pub policy: AggregationPolicy,
    pub total_records: usize,
    /// Ranked, count descending.
    pub groups: Vec<DomainGroup>,
    pub stats: Option<Stats>,
    pub warnings: Vec<String>,
}

impl SpamAnalysis {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Where the records of a report came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SourceInfo {
    pub kind: SourceKind,
    pub location: String,
    pub limit: usize,
}

/// Fetch + analysis bundle.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub source: SourceInfo,
    pub records: Vec<MailRecord>,
    pub analysis: SpamAnalysis,
    pub fetch_ms: u64,
}

impl AnalysisReport {
    /// Same records, other policy; the source metadata is kept.
    pub fn toggle_policy(&mut self) {
        let policy = self.analysis.policy.toggled();
        self.analysis = SpamAnalyzer::analyze(&self.records, policy);
    }
}
