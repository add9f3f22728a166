//! Colored console output for inspection results.

use crate::types::{Finding, FormatTag, ItemReport, RiskLevel};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Console output handler with colors and formatting.
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
    quiet: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool, quiet: bool) -> Self {
        Self { verbose, json_mode, quiet }
    }

    /// Print scan progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if self.json_mode || !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print info message.
    pub fn print_info(&self, message: &str) {
        if self.json_mode || self.quiet {
            return;
        }

        println!("{} {}", "[*]".bright_blue(), message);
    }

    /// Print the outcome of inspecting one item.
    pub fn print_report(&self, report: &ItemReport) {
        if self.json_mode {
            return;
        }

        let high_risk = report.high_risk_count();
        if self.quiet && high_risk == 0 {
            return;
        }

        let format = report
            .format
            .as_ref()
            .map(FormatTag::to_string)
            .unwrap_or_else(|| "no manifest".to_string());

        println!(
            "{} {} {}",
            "[*]".bright_blue(),
            report.url.bright_white(),
            format!("({}, {} dependencies)", format, report.dependencies_found).dimmed()
        );

        for finding in &report.findings {
            if finding.risk_level == RiskLevel::High || self.verbose {
                self.print_finding(finding);
            }
        }
    }

    /// Print a finding.
    pub fn print_finding(&self, finding: &Finding) {
        if self.json_mode {
            return;
        }

        let risk = match finding.risk_level {
            RiskLevel::High => "HIGH".red().bold(),
            RiskLevel::Low => "LOW".dimmed(),
        };

        let status = if finding.verdict.registries.is_empty() {
            "no registry consulted".yellow()
        } else if finding.verdict.confusable {
            "NOT FOUND IN PUBLIC REGISTRIES".red().bold()
        } else {
            "exists".green()
        };

        println!();
        println!(
            "{} {} [{}]",
            "===".bright_cyan(),
            finding.dependency.bright_white().bold(),
            risk
        );
        println!("    |-- Status: {}", status);
        for (registry, exists) in &finding.verdict.registries {
            println!("    |-- {}: {}", registry.name(), if *exists { "found" } else { "missing" });
        }
        println!("    |-- Format: {}", finding.format);
        println!("    +-- Source: {}", finding.source_url.dimmed());
    }

    /// Print the overall summary.
    pub fn print_summary(&self, items: usize, findings: &[Finding], duration_secs: f64) {
        if self.json_mode {
            return;
        }

        let high_risk = findings
            .iter()
            .filter(|f| f.risk_level == RiskLevel::High)
            .count();

        if self.quiet && high_risk == 0 {
            return;
        }

        println!();
        println!("{}", "=== Scan Summary ===".bright_cyan());
        println!("  Items:     {}", items);
        println!("  Duration:  {:.2}s", duration_secs);
        println!("  Findings:  {}", findings.len());

        if high_risk > 0 {
            println!(
                "  {}",
                format!("CONFUSABLE DEPENDENCIES FOUND: {}", high_risk)
                    .red()
                    .bold()
            );
        } else {
            println!(
                "  {}",
                "No confusable dependencies found.".green()
            );
        }

        println!();
    }

    /// Create a progress bar.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.json_mode || self.quiet {
            return None;
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .ok()?
            .progress_chars("#>-");

        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb.set_message(message.to_string());
        Some(pb)
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false, false)
    }
}
