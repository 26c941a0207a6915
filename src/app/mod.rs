//! High-level application orchestration layer.
//!
//! This module provides the CLI-facing `App` façade. Major steps in
//! `App::run`:
//!   1. Schema generation early-exit
//!   2. Config load / validation (defaults, file, environment, flags)
//!   3. Collaborator selection (Graph, JSON file or `.eml` directory)
//!   4. Fetch + analysis, concurrently with the optional profile lookup
//!   5. Structured output (JSON/YAML) or styled / plain / CSV rendering
//!
//! A failed fetch renders an error state and exits with `EXIT_FETCH_FAILURE`;
//! there are never partial groups. A failed profile lookup only adds a
//! warning.

use tracing::{debug, info, warn};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::errors::{Result, SpamOriginError};
use crate::facade::{AnalysisReport, SourceInfo, SpamAnalyzer};
use crate::output::{self, ReportView};
use crate::sources::{
    EmlDirectorySource, GraphClient, IdentityService, JsonFileSource, MailSource, UserProfile,
};
use crate::structured_output::SpamOriginOutput;
use crate::styled_output::StyledFormatter;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FETCH_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// The collaborators selected for this run.
enum Collaborators {
    Graph(GraphClient),
    Local(Box<dyn MailSource>),
}

impl Collaborators {
    fn source(&self) -> &dyn MailSource {
        match self {
            Collaborators::Graph(graph) => graph,
            Collaborators::Local(source) => source.as_ref(),
        }
    }

    fn identity(&self) -> Option<&dyn IdentityService> {
        match self {
            Collaborators::Graph(graph) => Some(graph),
            Collaborators::Local(_) => None,
        }
    }
}

/// Application façade.
pub struct App;

impl App {
    /// Execute the end-to-end workflow.
    ///
    /// Returns: intended process exit code (0 = success, 1 = fetch failure,
    /// 2 = configuration error).
    pub async fn run(cli: &Cli) -> Result<i32> {
        if Self::maybe_print_schema(cli)? {
            return Ok(EXIT_OK);
        }

        let config = match Config::load(cli) {
            Ok(config) => config,
            Err(e) => return Ok(Self::config_failure(cli, &e.into())),
        };
        debug!(?config, "effective configuration");

        let token = cli.token.clone().unwrap_or_default();
        let collaborators = match Self::select_collaborators(cli, &config, &token) {
            Ok(c) => c,
            Err(e) => return Ok(Self::config_failure(cli, &e)),
        };

        let source = collaborators.source();
        info!(source = %source.kind(), location = %source.location(), "fetching junk mail");

        let fetch = SpamAnalyzer::fetch_and_analyze(
            source,
            &token,
            config.fetch.limit,
            config.analysis.policy,
        );
        if cli.whoami && !cli.uses_graph() {
            warn!("--whoami needs Microsoft Graph; ignored for local sources");
        }
        let (report, profile) = match collaborators.identity().filter(|_| cli.whoami) {
            Some(identity) => {
                let (report, profile) = tokio::join!(fetch, identity.fetch_profile(&token));
                (report, Some(profile))
            }
            None => (fetch.await, None),
        };

        let mut report = match report {
            Ok(report) => report,
            Err(e) => {
                let info = SourceInfo {
                    kind: source.kind(),
                    location: source.location(),
                    limit: config.fetch.limit,
                };
                Self::render_failure(cli, &config, &info, &e)?;
                return Ok(EXIT_FETCH_FAILURE);
            }
        };
        info!(
            records = report.records.len(),
            groups = report.analysis.groups.len(),
            fetch_ms = report.fetch_ms,
            "analysis ready"
        );

        let profile = Self::settle_profile(&mut report, profile);
        let view = ReportView {
            source: &report.source,
            analysis: &report.analysis,
            profile: profile.as_ref(),
            options: &config.output,
        };
        Self::render(cli, &view)?;

        Ok(EXIT_OK)
    }

    /// `--generate-schema`: print and stop.
    fn maybe_print_schema(cli: &Cli) -> Result<bool> {
        if !cli.generate_schema {
            return Ok(false);
        }
        let schema = SpamOriginOutput::generate_json_schema()
            .map_err(|e| SpamOriginError::internal(format!("schema generation failed: {e}")))?;
        println!("{schema}");
        Ok(true)
    }

    fn config_failure(cli: &Cli, error: &SpamOriginError) -> i32 {
        warn!("{error}");
        if cli.error_enabled() {
            eprintln!("{error}");
        }
        EXIT_CONFIG_ERROR
    }

    fn select_collaborators(cli: &Cli, config: &Config, token: &str) -> Result<Collaborators> {
        if let Some(path) = &cli.records {
            return Ok(Collaborators::Local(Box::new(JsonFileSource::new(path))));
        }
        if let Some(dir) = &cli.eml_dir {
            return Ok(Collaborators::Local(Box::new(EmlDirectorySource::new(dir))));
        }
        if token.trim().is_empty() {
            return Err(SpamOriginError::configuration(
                "a Microsoft Graph token is required (--token or SPAMORIGIN_TOKEN), \
                 or use --records / --eml-dir",
            ));
        }
        Ok(Collaborators::Graph(GraphClient::from_config(&config.fetch)?))
    }

    /// Keep the profile on success; turn a failure into a report warning.
    fn settle_profile(
        report: &mut AnalysisReport,
        profile: Option<Result<UserProfile>>,
    ) -> Option<UserProfile> {
        match profile? {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("profile lookup failed: {e}");
                report
                    .analysis
                    .warnings
                    .push(format!("Could not load account profile: {e}"));
                None
            }
        }
    }

    fn render_failure(
        cli: &Cli,
        config: &Config,
        source: &SourceInfo,
        error: &SpamOriginError,
    ) -> Result<()> {
        warn!(category = %error.category(), "fetch failed: {error}");
        if cli.is_structured_output() {
            let doc = SpamOriginOutput::from_error(source, config.analysis.policy, error);
            return Self::print_structured(cli.format, &doc);
        }
        match cli.format {
            OutputFormat::Styled => {
                let formatter = Self::styled_formatter(cli);
                match formatter.format_error(error) {
                    Ok(text) => eprint!("{text}"),
                    Err(_) => eprintln!("Error: {error}"),
                }
            }
            _ => eprintln!("Error: {error}"),
        }
        Ok(())
    }

    fn render(cli: &Cli, view: &ReportView<'_>) -> Result<()> {
        match cli.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let doc = SpamOriginOutput::from_view(view);
                Self::print_structured(cli.format, &doc)
            }
            OutputFormat::Styled => {
                if let Err(e) = Self::styled_formatter(cli).print_report(view) {
                    warn!("styled output failed, falling back to plain text: {e}");
                    Self::print_plain(&output::OutputFormat::default(), view)?;
                }
                Ok(())
            }
            OutputFormat::Plain => Self::print_plain(&output::OutputFormat::default(), view),
            OutputFormat::Csv => Self::print_plain(
                &output::OutputFormat::Csv {
                    include_header: true,
                },
                view,
            ),
        }
    }

    fn styled_formatter(cli: &Cli) -> StyledFormatter {
        if cli.no_color {
            StyledFormatter::without_colors()
        } else {
            StyledFormatter::new()
        }
    }

    fn print_plain(format: &output::OutputFormat, view: &ReportView<'_>) -> Result<()> {
        let formatter = output::create_formatter(format);
        let text = formatter
            .format_report(view)
            .map_err(|e| SpamOriginError::internal(format!("Output formatting failed: {e}")))?;
        print!("{text}");
        Ok(())
    }

    fn print_structured(format: OutputFormat, doc: &SpamOriginOutput) -> Result<()> {
        let text = match format {
            OutputFormat::Yaml => doc.to_yaml(),
            _ => doc.to_json(),
        }
        .map_err(|e| SpamOriginError::internal(format!("structured output failed: {e}")))?;
        println!("{}", text.trim_end());
        Ok(())
    }
}
