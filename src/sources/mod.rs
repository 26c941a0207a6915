//! Pluggable mail and identity collaborators.
//!
//! The origin engine never performs I/O. Everything it analyzes arrives
//! through a `MailSource`, and the optional account banner through an
//! `IdentityService`. Both are async one-shot calls made by the application
//! before the synchronous engine runs.
//!
//! Implementations:
//!   - `GraphClient`: Microsoft Graph junk folder + `/me` profile
//!   - `JsonFileSource`: a JSON array of records exported earlier
//!   - `EmlDirectorySource`: a directory of raw `.eml` messages
//!
//! A source either returns the whole record set or an error; callers never
//! see a partially fetched set.

use std::fmt;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::records::MailRecord;

pub mod graph;
pub mod local;

pub use graph::GraphClient;
pub use local::{EmlDirectorySource, JsonFileSource};

/// Where records came from, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Graph,
    JsonFile,
    EmlDirectory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Graph => "Microsoft Graph",
            SourceKind::JsonFile => "JSON file",
            SourceKind::EmlDirectory => "EML directory",
        };
        f.write_str(s)
    }
}

/// Account profile returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Best address to show next to the display name.
    pub fn primary_address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

/// Mail fetch collaborator: token + limit -> records.
#[async_trait]
pub trait MailSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Human-readable location (URL, file or directory).
    fn location(&self) -> String;

    /// Fetch at most `limit` junk-folder records.
    async fn fetch_spam_records(&self, token: &str, limit: usize) -> Result<Vec<MailRecord>>;
}

/// Identity collaborator: token -> profile.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> Result<UserProfile>;
}
