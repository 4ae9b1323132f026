//! refcheck - OpenStack interop guideline compliance CLI
//!
//! ## Commands
//!
//! - `report`: Evaluate a test run against a guideline
//! - `test-list`: Print the tests a target requires
//! - `targets`: Show the programs a guideline defines
//! - `versions`: List guideline files in a directory, newest first

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use refcheck_core::{
    build_test_list, compare, evaluate_gate, render_diff_md, render_report_md, render_test_list,
    sort_versions, version_label, write_report_json, ComplianceArtifact, ComplianceReport,
    Evaluator, EvaluatorConfig, GateRule, GateRuleSet, GuidelineDocument, ReportDiff, ResultSet,
    Status, StatusSelection, Target, TestListOptions,
};

#[derive(Parser)]
#[command(name = "refcheck")]
#[command(author = "RefStack Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate OpenStack test results against interop guidelines", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "REFCHECK_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a result set against a guideline for a target program
    Report {
        /// Guideline JSON file
        #[arg(short, long)]
        guideline: PathBuf,

        /// Result set JSON file ({"results": [...]})
        #[arg(short, long)]
        results: PathBuf,

        /// Earlier result set to compare against
        #[arg(short, long)]
        previous: Option<PathBuf>,

        /// Target program: "platform" or a component name
        #[arg(short, long, default_value = "platform", env = "REFCHECK_TARGET")]
        target: Target,

        /// Fail when a component lists an undefined capability
        #[arg(long, env = "REFCHECK_STRICT")]
        strict: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum required pass percentage
        #[arg(long)]
        min_required_pass: Option<f64>,

        /// Minimum required pass percentage excluding flagged tests
        #[arg(long)]
        min_non_flag_pass: Option<f64>,

        /// Fail if any required, non-flagged test did not pass
        #[arg(long)]
        no_required_failures: bool,
    },

    /// Print the tests belonging to a target's capabilities
    TestList {
        /// Guideline JSON file
        #[arg(short, long)]
        guideline: PathBuf,

        /// Target program: "platform" or a component name
        #[arg(short, long, default_value = "platform", env = "REFCHECK_TARGET")]
        target: Target,

        /// Statuses to include (comma-separated: required,advisory,deprecated,removed)
        #[arg(short, long, default_value = "required")]
        status: StatusSelection,

        /// Leave out test aliases
        #[arg(long)]
        no_aliases: bool,

        /// Leave out tests flagged by the working group
        #[arg(long)]
        hide_flagged: bool,

        /// Write the list to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the platform components and component targets of a guideline
    Targets {
        /// Guideline JSON file
        #[arg(short, long)]
        guideline: PathBuf,
    },

    /// List guideline files in a directory, newest first
    Versions {
        /// Directory holding guideline JSON files
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    refcheck_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Report {
            guideline,
            results,
            previous,
            target,
            strict,
            format,
            output,
            min_required_pass,
            min_non_flag_pass,
            no_required_failures,
        } => {
            let config = if strict {
                EvaluatorConfig::strict()
            } else {
                EvaluatorConfig::default()
            };
            let rules = gate_rules(min_required_pass, min_non_flag_pass, no_required_failures);
            let inputs = ReportInputs {
                guideline: &guideline,
                results: &results,
                previous: previous.as_deref(),
            };
            cmd_report(inputs, &target, config, &rules, format, output.as_deref()).await
        }
        Commands::TestList {
            guideline,
            target,
            status,
            no_aliases,
            hide_flagged,
            output,
        } => {
            let options = TestListOptions {
                include_aliases: !no_aliases,
                include_flagged: !hide_flagged,
            };
            cmd_test_list(&guideline, &target, &status, options, output.as_deref()).await
        }
        Commands::Targets { guideline } => cmd_targets(&guideline).await,
        Commands::Versions { dir } => cmd_versions(&dir).await,
    }
}

fn gate_rules(
    min_required_pass: Option<f64>,
    min_non_flag_pass: Option<f64>,
    no_required_failures: bool,
) -> GateRuleSet {
    let mut rules = GateRuleSet::default();
    if let Some(percent) = min_required_pass {
        rules = rules.with_rule(GateRule::MinRequiredPassPercent { percent });
    }
    if let Some(percent) = min_non_flag_pass {
        rules = rules.with_rule(GateRule::MinNonFlagRequiredPassPercent { percent });
    }
    if no_required_failures {
        rules = rules.with_rule(GateRule::NoRequiredFailures);
    }
    rules
}

/// Read a guideline, keeping the raw JSON alongside the decoded document.
async fn read_guideline(path: &Path) -> Result<(serde_json::Value, GuidelineDocument)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read guideline file: {:?}", path))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse guideline: {:?}", path))?;
    let doc = GuidelineDocument::from_value(value.clone())
        .with_context(|| format!("Failed to load guideline: {:?}", path))?;
    Ok((value, doc))
}

async fn load_guideline(path: &Path) -> Result<GuidelineDocument> {
    Ok(read_guideline(path).await?.1)
}

async fn load_results(path: &Path) -> Result<ResultSet> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read results file: {:?}", path))?;
    ResultSet::from_json_str(&raw).with_context(|| format!("Failed to parse results: {:?}", path))
}

async fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write to {:?}", path))?;
            info!(path = ?path, "output written");
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Input files for `report`.
#[derive(Clone, Copy)]
struct ReportInputs<'a> {
    guideline: &'a Path,
    results: &'a Path,
    previous: Option<&'a Path>,
}

/// Evaluate a result set and print the report in the requested format.
async fn cmd_report(
    inputs: ReportInputs<'_>,
    target: &Target,
    config: EvaluatorConfig,
    rules: &GateRuleSet,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let (raw_guideline, doc) = read_guideline(inputs.guideline).await?;
    let results = load_results(inputs.results).await?;
    let evaluator = Evaluator::new(config);

    let report = evaluator
        .evaluate(&doc, &results, target)
        .context("Evaluation failed")?;

    let diff = match inputs.previous {
        Some(path) => {
            let previous = load_results(path).await?;
            let previous_report = evaluator
                .evaluate(&doc, &previous, target)
                .context("Evaluation of previous run failed")?;
            Some(compare(&report, &previous_report).with_runs(&results, &previous))
        }
        None => None,
    };

    let verdict = (!rules.is_empty()).then(|| evaluate_gate(rules, &report));

    match format {
        OutputFormat::Json => {
            let mut artifact =
                ComplianceArtifact::new(&raw_guideline, &results, report, verdict.clone())?;
            if let Some(diff) = diff {
                artifact = artifact.with_diff(diff);
            }
            match output {
                Some(path) => write_report_json(path, &artifact)?,
                None => println!("{}", serde_json::to_string_pretty(&artifact)?),
            }
        }
        OutputFormat::Text => {
            let mut text = render_text(&report);
            if let Some(diff) = &diff {
                text.push_str(&render_diff_text(diff));
            }
            emit(output, &text).await?
        }
        OutputFormat::Markdown => {
            let mut md = render_report_md(&report);
            if let Some(diff) = &diff {
                md.push_str(&render_diff_md(diff));
            }
            emit(output, &md).await?
        }
    }

    if let Some(verdict) = verdict {
        for v in &verdict.violations {
            eprintln!("gate violation: {}", v.reason);
        }
        if !verdict.passed() {
            anyhow::bail!(
                "Compliance gate failed with {} violation(s)",
                verdict.violations.len()
            );
        }
    }
    Ok(())
}

fn percent_text(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a (no applicable tests)".to_string())
}

fn render_text(report: &ComplianceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} (schema {})\n",
        report.target.display_name(),
        report.schema
    ));
    out.push_str(&format!(
        "Required pass rate:                  {}\n",
        percent_text(report.required_pass_percent)
    ));
    out.push_str(&format!(
        "Required pass rate (flagged removed): {}\n",
        percent_text(report.non_flag_required_pass_percent)
    ));
    for status in Status::ALL {
        let bucket = report.bucket(status);
        if bucket.capabilities.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n[{}] {} capabilities, {}/{} tests passed, flagged {} passed / {} not passed\n",
            status,
            bucket.capabilities.len(),
            bucket.passed_count,
            bucket.count,
            bucket.flag_pass_count,
            bucket.flag_fail_count
        ));
        for cap in &bucket.capabilities {
            out.push_str(&format!(
                "  {:<50} {}/{}\n",
                cap.id,
                cap.passed_tests.len(),
                cap.total_tests()
            ));
            for test in &cap.not_passed_tests {
                let marker = if cap.not_passed_flagged.contains(test) {
                    " (flagged)"
                } else {
                    ""
                };
                out.push_str(&format!("    - {}{}\n", test, marker));
            }
        }
    }
    if !report.other_tests.is_empty() {
        out.push_str(&format!(
            "\n{} passed tests are not part of any capability\n",
            report.other_tests.len()
        ));
    }
    out
}

fn render_diff_text(diff: &ReportDiff) -> String {
    let mut out = format!(
        "\nCompared with previous run: {} fixed, {} broken\n",
        diff.fixed_tests.len(),
        diff.broken_tests.len()
    );
    if diff.same_cloud == Some(false) {
        out.push_str("  (runs come from different clouds)\n");
    }
    for cap in &diff.capabilities {
        for test in &cap.fixed_tests {
            out.push_str(&format!("  + {} [{}]\n", test, cap.id));
        }
        for test in &cap.broken_tests {
            out.push_str(&format!("  - {} [{}]\n", test, cap.id));
        }
    }
    out
}

/// Print the sorted test list for a target.
async fn cmd_test_list(
    guideline_path: &Path,
    target: &Target,
    statuses: &StatusSelection,
    options: TestListOptions,
    output: Option<&Path>,
) -> Result<()> {
    let doc = load_guideline(guideline_path).await?;
    let tests = build_test_list(&doc, target, statuses, options)
        .context("Failed to build test list")?;
    info!(program = %target, tests = tests.len(), "test list built");
    emit(output, &render_test_list(&tests)).await
}

fn target_lines(doc: &GuidelineDocument) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {}",
        Target::Platform,
        Target::Platform.display_name()
    )];
    for component in doc.platform_components() {
        lines.push(format!("  requires {}", component));
    }
    for component in doc.components.keys() {
        let target = Target::from(component.as_str());
        lines.push(format!("{}: {}", target, target.display_name()));
    }
    lines
}

/// Show the programs a guideline can be evaluated for.
async fn cmd_targets(guideline_path: &Path) -> Result<()> {
    let doc = load_guideline(guideline_path).await?;
    for line in target_lines(&doc) {
        println!("{}", line);
    }
    Ok(())
}

/// Guideline file names in `dir`, newest first.
async fn guideline_versions(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(sort_versions(names))
}

/// List guideline files in a directory, newest first.
async fn cmd_versions(dir: &Path) -> Result<()> {
    let versions = guideline_versions(dir).await?;
    if versions.is_empty() {
        println!("No guideline files found in {:?}", dir);
    }
    for file in &versions {
        println!("{}", version_label(file));
    }
    Ok(())
}
