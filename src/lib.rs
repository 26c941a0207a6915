//! Spamorigin Library
//!
//! Groups junk-folder mail by the domain that actually sent it. Each message
//! is attributed to its DKIM signing domain, its SPF domain or, failing both,
//! the visible sender domain; records are then bucketed by root domain,
//! ranked by volume and summarized with authentication pass rates.
//!
//! - `records`, `resolver`, `groups`, `stats`, `domain_utils`: the pure engine
//! - `sources`: Microsoft Graph, JSON file and `.eml` directory collaborators
//! - `facade`: one-call analysis for embedding
//!
//! # Example
//!
//! ```rust
//! use spamorigin::{AggregationPolicy, MailRecord, SpamAnalyzer};
//!
//! let records = vec![
//!     MailRecord::new("promo@a.com").with_dkim("mail.spammer.net"),
//!     MailRecord::new("y@spammer.net"),
//! ];
//! let analysis = SpamAnalyzer::analyze(&records, AggregationPolicy::DkimPriority);
//! assert_eq!(analysis.groups[0].domain, "spammer.net");
//! assert_eq!(analysis.groups[0].count, 2);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod domain_utils;
pub mod errors;
pub mod facade;
pub mod groups;
pub mod headers;
pub mod output;
pub mod records;
pub mod resolver;
pub mod retry;
pub mod sources;
pub mod stats;
pub mod structured_output;
pub mod styled_output;

// Re-export commonly used types and functions for convenience
pub use domain_utils::normalize_root;
pub use errors::{Result, SpamOriginError};
pub use facade::{AnalysisReport, SpamAnalysis, SpamAnalyzer};
pub use groups::{DomainGroup, SAMPLE_LIMIT, aggregate, rank};
pub use records::{AggregationPolicy, MailRecord, SourceType, is_present};
pub use resolver::{Origin, resolve_origin};
pub use sources::{IdentityService, MailSource, UserProfile};
pub use stats::{Stats, TopSender, summarize};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
