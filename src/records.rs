//! Core data model shared by the origin engine and its collaborators.
//!
//! `MailRecord` is the immutable unit of input handed over by a mail source.
//! `SourceType` labels which header field an origin was derived from and
//! `AggregationPolicy` selects the DKIM/SPF tie-break order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata of a single junk-folder message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct MailRecord {
    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub sender_name: String,

    /// Visible "From" address. The domain part is the last-resort origin.
    #[serde(default)]
    pub sender_address: String,

    /// Domain from `smtp.mailfrom=` (or `smtp.helo=`) in Authentication-Results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spf_domain: Option<String>,

    /// Domain from `header.d=` in Authentication-Results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dkim_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_date: Option<DateTime<Utc>>,
}

impl MailRecord {
    pub fn new(sender_address: impl Into<String>) -> Self {
        Self {
            sender_address: sender_address.into(),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    pub fn with_spf(mut self, domain: impl Into<String>) -> Self {
        self.spf_domain = Some(domain.into());
        self
    }

    pub fn with_dkim(mut self, domain: impl Into<String>) -> Self {
        self.dkim_domain = Some(domain.into());
        self
    }

    pub fn with_received_date(mut self, date: DateTime<Utc>) -> Self {
        self.received_date = Some(date);
        self
    }

    /// DKIM domain if it counts as present.
    pub fn dkim(&self) -> Option<&str> {
        self.dkim_domain.as_deref().filter(|d| is_present(Some(d)))
    }

    /// SPF domain if it counts as present.
    pub fn spf(&self) -> Option<&str> {
        self.spf_domain.as_deref().filter(|d| is_present(Some(d)))
    }
}

/// An authentication field is present when it is set, non-empty and not the
/// literal `none` (any case).
pub fn is_present(field: Option<&str>) -> bool {
    match field {
        Some(value) => !value.is_empty() && !value.eq_ignore_ascii_case("none"),
        None => false,
    }
}

/// Which field an origin domain was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SourceType {
    #[serde(rename = "DKIM")]
    Dkim,
    #[serde(rename = "SPF")]
    Spf,
    /// Reserved. HELO-derived domains are currently reported as `Spf`.
    #[serde(rename = "HELO")]
    Helo,
    #[serde(rename = "Sender")]
    Sender,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Dkim => "DKIM",
            SourceType::Spf => "SPF",
            SourceType::Helo => "HELO",
            SourceType::Sender => "Sender",
        }
    }

    /// Whether the label comes from an authenticated header rather than the
    /// spoofable visible sender.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SourceType::Sender)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tie-break order used when both DKIM and SPF are present.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    #[default]
    #[value(alias = "dkim")]
    DkimPriority,
    #[value(alias = "spf")]
    SpfPriority,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::DkimPriority => "dkim-priority",
            AggregationPolicy::SpfPriority => "spf-priority",
        }
    }

    /// The other policy; handy for "toggle" style callers.
    pub fn toggled(&self) -> Self {
        match self {
            AggregationPolicy::DkimPriority => AggregationPolicy::SpfPriority,
            AggregationPolicy::SpfPriority => AggregationPolicy::DkimPriority,
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dkim-priority" | "dkim" => Ok(AggregationPolicy::DkimPriority),
            "spf-priority" | "spf" => Ok(AggregationPolicy::SpfPriority),
            other => Err(format!(
                "unknown policy '{other}' (expected dkim-priority or spf-priority)"
            )),
        }
    }
}
