//! Results output formatting

use anyhow::{Context, Result};
use phloem_core::{LatencyReport, RunOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Experiment results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub experiment: String,
    pub send_endpoint: String,
    pub receive_endpoint: String,
    pub target_rate: f64,
    pub throughput_rps: f64,
    /// Whether every reply arrived before the drain window closed
    pub drained: bool,
    pub malformed_replies: u64,
    #[serde(flatten)]
    pub report: LatencyReport,
}

impl ExperimentResults {
    pub fn from_outcome(
        experiment: String,
        send_endpoint: String,
        receive_endpoint: String,
        target_rate: f64,
        outcome: &RunOutcome,
    ) -> Self {
        Self {
            experiment,
            send_endpoint,
            receive_endpoint,
            target_rate,
            throughput_rps: outcome.report.throughput_rps(),
            drained: outcome.send.drained,
            malformed_replies: outcome.receiver.malformed,
            report: outcome.report.clone(),
        }
    }

    /// Render the human-readable report
    pub fn render_human(&self) -> String {
        let rule = "=".repeat(60);
        let r = &self.report;
        let mut out = String::new();

        out.push_str(&format!("\n{rule}\nPhloem Round-Trip Latency Results\n{rule}\n\n"));
        out.push_str("Configuration:\n");
        out.push_str(&format!("  Experiment:      {}\n", self.experiment));
        out.push_str(&format!("  Send endpoint:   {}\n", self.send_endpoint));
        out.push_str(&format!("  Reply endpoint:  {}\n", self.receive_endpoint));
        out.push_str(&format!("  Target rate:     {:.2} req/s\n\n", self.target_rate));

        out.push_str("Requests:\n");
        out.push_str(&format!("  Sent:            {}\n", r.sent));
        out.push_str(&format!("  Received:        {}\n", r.received));
        out.push_str(&format!("  Completed:       {}\n", r.completed));
        out.push_str(&format!("  Timed out:       {}\n", r.timed_out));
        if r.unmatched > 0 {
            out.push_str(&format!("  Unmatched:       {}\n", r.unmatched));
        }
        if self.malformed_replies > 0 {
            out.push_str(&format!("  Malformed:       {}\n", self.malformed_replies));
        }
        out.push_str(&format!("  Duration:        {:.3}s\n", r.duration_secs));
        out.push_str(&format!("  Rate:            {:.2} req/s\n\n", self.throughput_rps));

        out.push_str("Latency (milliseconds):\n");
        match &r.percentiles {
            Some(p) => {
                out.push_str(&format!("  Max:             {:.3}\n", p.max));
                out.push_str(&format!("  p99.9:           {:.3}\n", p.p999));
                out.push_str(&format!("  p99:             {:.3}\n", p.p99));
                out.push_str(&format!("  p90:             {:.3}\n", p.p90));
                if let (Some(min), Some(mean)) = (r.min_ms, r.mean_ms) {
                    out.push_str(&format!("  Min:             {:.3}\n", min));
                    out.push_str(&format!("  Mean:            {:.3}\n", mean));
                }
            }
            None => out.push_str("  no data (no request completed)\n"),
        }
        out.push_str(&format!("\n{rule}"));
        out
    }

    /// Print results to stdout in human-readable format
    pub fn print_human(&self) {
        println!("{}", self.render_human());
    }

    /// Write results to JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
