//! Structured output module for JSON and YAML serialization.
//!
//! `SpamOriginOutput` is the machine-readable counterpart of the styled
//! report: ranked origin groups, authentication statistics and warnings,
//! or an error block when the fetch failed (never partial groups).

use anyhow::Result;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::SpamOriginError;
use crate::facade::SourceInfo;
use crate::output::ReportView;
use crate::records::{AggregationPolicy, MailRecord, SourceType};
use crate::sources::SourceKind;
use crate::stats::Stats;

/// Root structure for all spamorigin output in structured formats
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SpamOriginOutput {
    /// Tool version and metadata
    pub metadata: OutputMetadata,

    /// What was analyzed and how
    pub input: InputInfo,

    /// Origin groups, ranked by message count
    pub groups: Vec<GroupEntry>,

    /// Authentication statistics (absent when there were no records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Stats>,

    /// Non-fatal diagnostics
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Success status and result summary
    pub result: ResultSummary,
}

/// Tool metadata and versioning information
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct OutputMetadata {
    pub tool_name: String,
    pub version: String,
    /// Timestamp when the report was generated
    pub generated_at: DateTime<Utc>,
    /// Version of this document layout
    pub schema_version: String,
}

/// Information about what was analyzed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct InputInfo {
    pub source: SourceKind,
    /// URL, file or directory records were read from
    pub location: String,
    /// Requested record limit
    pub limit: usize,
    pub policy: AggregationPolicy,
    /// Signed-in account (only with `--whoami`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AccountInfo {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One ranked origin group
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct GroupEntry {
    /// 1-based position in the ranking
    pub rank: usize,
    pub domain: String,
    pub count: usize,
    pub source_type: SourceType,
    /// Up to `samples_shown` sample messages (at most 5), arrival order
    pub samples: Vec<SampleMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SampleMessage {
    pub sender_name: String,
    pub sender_address: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_date: Option<DateTime<Utc>>,
}

impl From<&MailRecord> for SampleMessage {
    fn from(record: &MailRecord) -> Self {
        Self {
            sender_name: record.sender_name.clone(),
            sender_address: record.sender_address.clone(),
            subject: record.subject.clone(),
            received_date: record.received_date,
        }
    }
}

/// Result summary and status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ResultSummary {
    /// False when the fetch failed
    pub success: bool,
    pub total_records: usize,
    pub total_groups: usize,
    /// Groups present in `groups` after `max_groups`
    pub groups_shown: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Fetch failure details
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ErrorInfo {
    /// input, auth, network, parse or internal
    pub category: String,
    pub message: String,
}

impl SpamOriginOutput {
    /// Create an empty document for `source` / `policy`
    pub fn new(source: &SourceInfo, policy: AggregationPolicy) -> Self {
        Self {
            metadata: OutputMetadata {
                tool_name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
                schema_version: "1.0.0".to_string(),
            },
            input: InputInfo {
                source: source.kind,
                location: source.location.clone(),
                limit: source.limit,
                policy,
                account: None,
            },
            groups: Vec::new(),
            statistics: None,
            warnings: Vec::new(),
            result: ResultSummary {
                success: true,
                total_records: 0,
                total_groups: 0,
                groups_shown: 0,
                error: None,
            },
        }
    }

    /// Build from a completed run
    pub fn from_view(view: &ReportView<'_>) -> Self {
        let analysis = view.analysis;
        let mut out = Self::new(view.source, analysis.policy);

        out.input.account = view.profile.map(|p| AccountInfo {
            display_name: p.display_name.clone(),
            address: p.primary_address().map(str::to_string),
        });

        out.groups = view
            .visible_groups()
            .iter()
            .enumerate()
            .map(|(i, group)| GroupEntry {
                rank: i + 1,
                domain: group.domain.clone(),
                count: group.count,
                source_type: group.source_type,
                samples: view.samples(group).iter().map(SampleMessage::from).collect(),
            })
            .collect();

        if view.options.show_stats {
            out.statistics = analysis.stats.clone();
        }
        out.warnings = analysis.warnings.clone();

        out.result.total_records = analysis.total_records;
        out.result.total_groups = analysis.groups.len();
        out.result.groups_shown = out.groups.len();
        out
    }

    /// Error state: no groups, no statistics
    pub fn from_error(
        source: &SourceInfo,
        policy: AggregationPolicy,
        error: &SpamOriginError,
    ) -> Self {
        let mut out = Self::new(source, policy);
        out.result.success = false;
        out.result.error = Some(ErrorInfo {
            category: error.category().to_string(),
            message: error.to_string(),
        });
        out
    }

    /// Generate JSON schema for this output format
    pub fn generate_json_schema() -> Result<String> {
        let schema = schemars::schema_for!(SpamOriginOutput);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
