use anyhow::{Context as AnyhowContext, Result};
use console::style;
use scout_protocol::{Candidate, ContextOption, ReportArtifact};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// `--json` output of `search`, `report` and `run`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundOutput {
    Candidates {
        candidates: Vec<Candidate>,
    },
    Report {
        media_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

pub fn candidate_line(candidate: &Candidate) -> String {
    let mut line = format!(
        "{}  {}",
        style(&candidate.display_name).bold(),
        style(&candidate.organization_name).cyan()
    );
    if !candidate.country_name.is_empty() {
        line.push_str(&format!("  {}", candidate.country_name));
    }
    if candidate.role_label != scout_pipeline::UNKNOWN_ROLE {
        line.push_str(&format!("  [{}]", candidate.role_label));
    }
    line.push_str(&format!("  {}", style(format!("#{}", candidate.id)).dim()));
    line
}

pub fn context_line(option: &ContextOption) -> String {
    if option.season_id.is_empty() && option.tournament_id.is_empty() {
        return option.label.clone();
    }
    format!(
        "{}  {}",
        option.label,
        style(format!("{}|{}", option.season_id, option.tournament_id)).dim()
    )
}

/// Write the artifact to `out`, or hand its text back for stdout.
pub fn store_artifact(artifact: &ReportArtifact, out: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(out) = out else {
        return Ok(None);
    };
    let path = if out.is_dir() {
        out.join(format!("scout-report.{}", artifact.file_extension()))
    } else {
        out.to_path_buf()
    };
    std::fs::write(&path, &artifact.body)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(Some(path))
}

pub fn report_output(artifact: &ReportArtifact, path: Option<PathBuf>) -> RoundOutput {
    RoundOutput::Report {
        media_type: artifact.media_type.clone(),
        body: path.is_none().then(|| artifact.text_lossy()),
        path: path.map(|p| p.display().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_goes_to_directory_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ReportArtifact::json(br#"{"type":"stats"}"#.to_vec());
        let path = store_artifact(&artifact, Some(dir.path())).unwrap().unwrap();
        assert_eq!(path, dir.path().join("scout-report.json"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.body);
        assert!(store_artifact(&artifact, None).unwrap().is_none());
    }

    #[test]
    fn json_output_is_tagged() {
        let artifact = ReportArtifact::html("<p>hi</p>");
        let value = serde_json::to_value(report_output(&artifact, None)).unwrap();
        assert_eq!(value["kind"], "report");
        assert_eq!(value["media_type"], "text/html");
        assert_eq!(value["body"], "<p>hi</p>");
        assert!(value.get("path").is_none());
    }
}
