//! Styled output formatting for spamorigin using anstyle.
//!
//! Colored terminal report: a header naming the source and policy, ranked
//! origin groups with a source-type badge and sample lines, the statistics
//! block and any warnings. Colors are dropped when stdout is not a TTY or
//! `NO_COLOR` is set.

use anstyle::{AnsiColor, Color, Style};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use crate::errors::SpamOriginError;
use crate::groups::DomainGroup;
use crate::output::{ReportView, percent};
use crate::records::SourceType;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Style definitions for different UI elements
pub struct Styles {
    pub header: Style,
    pub subheader: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub muted: Style,
    pub bold: Style,
    pub domain: Style,
    pub email: Style,
    pub badge_dkim: Style,
    pub badge_spf: Style,
    pub badge_sender: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            header: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            subheader: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
            success: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
            warning: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            error: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
            info: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            bold: Style::new().bold(),
            domain: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Magenta))),
            email: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Green)))
                .underline(),
            badge_dkim: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
            badge_spf: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
            badge_sender: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        }
    }
}

/// Styled output formatter for origin reports
pub struct StyledFormatter {
    styles: Styles,
    use_colors: bool,
}

impl StyledFormatter {
    /// Create a new styled formatter
    pub fn new() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: Self::should_use_colors(),
        }
    }

    /// Create a formatter without colors (for non-interactive use)
    pub fn without_colors() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: false,
        }
    }

    /// Determine if colors should be used based on environment
    fn should_use_colors() -> bool {
        atty::is(atty::Stream::Stdout) && std::env::var("NO_COLOR").is_err()
    }

    /// Apply style to text if colors are enabled
    fn styled(&self, text: &str, style: &Style) -> String {
        if self.use_colors {
            format!("{}{}{}", style.render(), text, style.render_reset())
        } else {
            text.to_string()
        }
    }

    /// Format a full report
    pub fn format_report(&self, view: &ReportView<'_>) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        self.write_header(&mut output, view)?;
        self.write_groups(&mut output, view)?;
        if view.options.show_stats {
            self.write_stats(&mut output, view)?;
        }
        self.write_warnings(&mut output, &view.analysis.warnings)?;
        self.write_footer(&mut output)?;

        Ok(output)
    }

    /// Format the error state shown when the fetch failed
    pub fn format_error(&self, error: &SpamOriginError) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        writeln!(output)?;
        writeln!(
            output,
            "  {} {}",
            self.styled("✖", &self.styles.error),
            self.styled("Could not load junk mail", &self.styles.error)
        )?;
        writeln!(
            output,
            "    {} {}",
            self.styled("└─", &self.styles.muted),
            error
        )?;
        if matches!(error, SpamOriginError::Auth { .. }) {
            writeln!(
                output,
                "    {}",
                self.styled(
                    "Sign in again and pass a fresh token with --token or SPAMORIGIN_TOKEN",
                    &self.styles.muted
                )
            )?;
        }
        Ok(output)
    }

    /// Write the main header with source and policy
    fn write_header(&self, output: &mut String, view: &ReportView<'_>) -> std::fmt::Result {
        writeln!(output)?;
        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;

        let title = format!(
            "📬 Spam Origins ({} message{})",
            view.analysis.total_records,
            if view.analysis.total_records == 1 { "" } else { "s" }
        );
        writeln!(output, "  {}", self.styled(&title, &self.styles.header))?;

        if let Some(profile) = view.profile {
            let who = match profile.primary_address() {
                Some(addr) => format!("{} <{}>", profile.display_name, addr),
                None => profile.display_name.clone(),
            };
            writeln!(
                output,
                "  {} Account: {}",
                self.styled("👤", &self.styles.info),
                self.styled(&who, &self.styles.bold)
            )?;
        }

        writeln!(
            output,
            "  {} Source: {} ({})",
            self.styled("📂", &self.styles.info),
            self.styled(&view.source.kind.to_string(), &self.styles.bold),
            self.styled(&view.source.location, &self.styles.muted)
        )?;
        writeln!(
            output,
            "  {} Policy: {}",
            self.styled("⚖️", &self.styles.info),
            self.styled(view.analysis.policy.as_str(), &self.styles.bold)
        )?;

        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;
        Ok(())
    }

    /// Write ranked groups section
    fn write_groups(&self, output: &mut String, view: &ReportView<'_>) -> std::fmt::Result {
        if view.analysis.is_empty() {
            writeln!(output)?;
            writeln!(
                output,
                "  {} {}",
                self.styled("✓", &self.styles.success),
                self.styled("Junk folder is empty", &self.styles.success)
            )?;
            return Ok(());
        }

        writeln!(output)?;
        writeln!(
            output,
            "  {}",
            self.styled("🎯 Origin Domains", &self.styles.subheader)
        )?;
        writeln!(output)?;

        let groups = view.visible_groups();
        for (i, group) in groups.iter().enumerate() {
            writeln!(
                output,
                "    {} {} {} {}",
                self.styled(&format!("{:>2}.", i + 1), &self.styles.muted),
                self.styled(&group.domain, &self.styles.domain),
                self.badge(group.source_type),
                self.styled(&count_label(group), &self.styles.bold)
            )?;

            let samples = view.samples(group);
            for (j, record) in samples.iter().enumerate() {
                let branch = if j + 1 == samples.len() { "└─" } else { "├─" };
                writeln!(
                    output,
                    "        {} {} {}",
                    self.styled(branch, &self.styles.muted),
                    self.styled(&record.sender_address, &self.styles.email),
                    self.styled(&format!("\"{}\"", record.subject), &self.styles.muted)
                )?;
            }

            let unshown = group.count - samples.len();
            if unshown > 0 && !samples.is_empty() {
                writeln!(
                    output,
                    "           {}",
                    self.styled(&format!("… and {unshown} more"), &self.styles.muted)
                )?;
            }

            if i + 1 < groups.len() {
                writeln!(output)?;
            }
        }

        let hidden = view.hidden_groups();
        if hidden > 0 {
            writeln!(output)?;
            writeln!(
                output,
                "    {}",
                self.styled(
                    &format!("{hidden} more domain(s) not shown (raise --max-groups)"),
                    &self.styles.muted
                )
            )?;
        }

        Ok(())
    }

    /// Source-type badge: authenticated types in color, sender in warning tone
    fn badge(&self, source_type: SourceType) -> String {
        let style = match source_type {
            SourceType::Dkim => &self.styles.badge_dkim,
            SourceType::Spf | SourceType::Helo => &self.styles.badge_spf,
            SourceType::Sender => &self.styles.badge_sender,
        };
        self.styled(&format!("[{source_type}]"), style)
    }

    /// Write the statistics block
    fn write_stats(&self, output: &mut String, view: &ReportView<'_>) -> std::fmt::Result {
        let Some(stats) = &view.analysis.stats else {
            return Ok(());
        };

        writeln!(output)?;
        writeln!(
            output,
            "  {}",
            self.styled("📊 Statistics", &self.styles.subheader)
        )?;
        writeln!(
            output,
            "    {} Total messages: {}",
            self.styled("├─", &self.styles.muted),
            self.styled(&stats.total.to_string(), &self.styles.bold)
        )?;
        writeln!(
            output,
            "    {} DKIM present:   {} ({})",
            self.styled("├─", &self.styles.muted),
            self.styled(&percent(stats.dkim_pass_rate), &self.styles.bold),
            stats.dkim_pass_count
        )?;
        writeln!(
            output,
            "    {} SPF present:    {} ({})",
            self.styled("├─", &self.styles.muted),
            self.styled(&percent(stats.spf_pass_rate), &self.styles.bold),
            stats.spf_pass_count
        )?;
        let top = match &stats.top_sender {
            Some(top) => format!(
                "{} ({})",
                self.styled(&top.address, &self.styles.email),
                top.count
            ),
            None => self.styled("n/a", &self.styles.muted),
        };
        writeln!(
            output,
            "    {} Top sender:     {}",
            self.styled("└─", &self.styles.muted),
            top
        )?;
        Ok(())
    }

    fn write_warnings(&self, output: &mut String, warnings: &[String]) -> std::fmt::Result {
        if warnings.is_empty() {
            return Ok(());
        }
        writeln!(output)?;
        for warning in warnings {
            writeln!(
                output,
                "  {} {}",
                self.styled("⚠️", &self.styles.warning),
                self.styled(warning, &self.styles.warning)
            )?;
        }
        Ok(())
    }

    fn write_footer(&self, output: &mut String) -> std::fmt::Result {
        writeln!(output)?;
        writeln!(
            output,
            "  {}",
            self.styled(
                "💡 DKIM/SPF domains are authenticated; [Sender] groups rely on the visible From address",
                &self.styles.muted
            )
        )?;
        writeln!(output)?;
        Ok(())
    }

    /// Print a report directly to stdout
    pub fn print_report(&self, view: &ReportView<'_>) -> io::Result<()> {
        let text = self.format_report(view).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

impl Default for StyledFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn count_label(group: &DomainGroup) -> String {
    if group.count == 1 {
        "1 message".to_string()
    } else {
        format!("{} messages", group.count)
    }
}
