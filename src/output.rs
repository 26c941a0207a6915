//! Output formatting for spamorigin results.
//!
//! Plain, script-friendly renderers: tab-separated text and CSV. The colored
//! terminal view lives in `styled_output`, JSON / YAML in `structured_output`.

use std::io;

use crate::config::OutputConfig;
use crate::facade::{SourceInfo, SpamAnalysis};
use crate::groups::DomainGroup;
use crate::records::MailRecord;
use crate::sources::UserProfile;

/// Everything a renderer needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct ReportView<'a> {
    pub source: &'a SourceInfo,
    pub analysis: &'a SpamAnalysis,
    pub profile: Option<&'a UserProfile>,
    pub options: &'a OutputConfig,
}

impl<'a> ReportView<'a> {
    /// Groups after applying `max_groups` (0 = all).
    pub fn visible_groups(&self) -> &'a [DomainGroup] {
        let groups = &self.analysis.groups;
        match self.options.max_groups {
            0 => groups,
            max => &groups[..groups.len().min(max)],
        }
    }

    /// How many groups `max_groups` cut off.
    pub fn hidden_groups(&self) -> usize {
        self.analysis.groups.len() - self.visible_groups().len()
    }

    /// Sample records to show for `group`.
    pub fn samples<'g>(&self, group: &'g DomainGroup) -> &'g [MailRecord] {
        let n = group
            .sample_records
            .len()
            .min(self.options.effective_samples());
        &group.sample_records[..n]
    }
}

/// Plain output layouts
#[derive(Debug, Clone)]
pub enum OutputFormat {
    /// Tab-separated text
    Text {
        /// Include sample lines under each group
        show_samples: bool,
    },

    /// CSV format
    Csv {
        /// Include header row
        include_header: bool,
    },
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text { show_samples: true }
    }
}

/// Output formatter trait - dyn-compatible so the CLI can pick at runtime
pub trait OutputFormatter {
    /// Format the report to a string
    fn format_report(&self, view: &ReportView<'_>) -> io::Result<String>;
}

/// Tab-separated text formatter
pub struct TextFormatter {
    show_samples: bool,
}

impl TextFormatter {
    pub fn new(show_samples: bool) -> Self {
        Self { show_samples }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_report(&self, view: &ReportView<'_>) -> io::Result<String> {
        let mut output = String::new();
        let analysis = view.analysis;

        if let Some(profile) = view.profile {
            output.push_str(&format!("# account\t{}", profile.display_name));
            if let Some(addr) = profile.primary_address() {
                output.push_str(&format!(" <{addr}>"));
            }
            output.push('\n');
        }
        output.push_str(&format!(
            "# source\t{}\t{}\n# policy\t{}\n# records\t{}\n",
            view.source.kind, view.source.location, analysis.policy, analysis.total_records
        ));

        if analysis.is_empty() {
            output.push_str("No junk messages found\n");
            return Ok(output);
        }

        for (i, group) in view.visible_groups().iter().enumerate() {
            output.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                i + 1,
                group.domain,
                group.count,
                group.source_type
            ));
            if self.show_samples {
                for record in view.samples(group) {
                    output.push_str(&format!(
                        "\t{}\t{}\t{}\n",
                        record.sender_name, record.sender_address, record.subject
                    ));
                }
            }
        }
        let hidden = view.hidden_groups();
        if hidden > 0 {
            output.push_str(&format!("# {hidden} more group(s) not shown\n"));
        }

        if view.options.show_stats
            && let Some(stats) = &analysis.stats
        {
            output.push_str(&format!(
                "# stats\ttotal={}\tdkim_pass={} ({})\tspf_pass={} ({})\n",
                stats.total,
                stats.dkim_pass_count,
                percent(stats.dkim_pass_rate),
                stats.spf_pass_count,
                percent(stats.spf_pass_rate)
            ));
            if let Some(top) = &stats.top_sender {
                output.push_str(&format!("# top_sender\t{}\t{}\n", top.address, top.count));
            }
        }

        for warning in &analysis.warnings {
            output.push_str(&format!("# warning\t{warning}\n"));
        }

        Ok(output)
    }
}

/// CSV formatter: one row per visible group
pub struct CsvFormatter {
    include_header: bool,
}

impl CsvFormatter {
    pub fn new(include_header: bool) -> Self {
        Self { include_header }
    }
}

impl OutputFormatter for CsvFormatter {
    fn format_report(&self, view: &ReportView<'_>) -> io::Result<String> {
        let mut output = String::new();

        if self.include_header {
            output.push_str("rank,domain,count,source_type,sample_senders\n");
        }

        for (i, group) in view.visible_groups().iter().enumerate() {
            let senders: Vec<&str> = view
                .samples(group)
                .iter()
                .map(|r| r.sender_address.as_str())
                .collect();
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                i + 1,
                csv_field(&group.domain),
                group.count,
                group.source_type,
                csv_field(&senders.join(";"))
            ));
        }

        Ok(output)
    }
}

/// Quote a CSV field when it contains separators, quotes or newlines.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Fraction in [0, 1] as a one-decimal percentage.
pub fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Create a formatter based on the output format
pub fn create_formatter(format: &OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text { show_samples } => Box::new(TextFormatter::new(*show_samples)),
        OutputFormat::Csv { include_header } => Box::new(CsvFormatter::new(*include_header)),
    }
}
