//! Tool for writing markdown reports

use analyst_core::{Error, Result as ToolResult};
use analyst_tools::{Tool, parse_params};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::error::{MarketError, Result};

pub const SAVE_REPORT: &str = "save_report";

const DEFAULT_TITLE: &str = "Financial Analysis Report";
const MAX_TITLE_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
struct ReportParams {
    content: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Filesystem-safe form of a report title
///
/// Keeps alphanumerics, `-` and `_`; spaces become `_`; anything else
/// becomes `_`. Truncated to 50 characters.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_TITLE_CHARS)
        .collect()
}

fn report_body(title: &str, content: &str, now: DateTime<Local>) -> String {
    format!(
        "# {title}\n\n**Generated:** {}\n\n---\n\n{content}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub struct SaveReportTool {
    reports_dir: PathBuf,
}

impl SaveReportTool {
    pub fn new(reports_dir: &Path) -> Self {
        Self {
            reports_dir: reports_dir.to_path_buf(),
        }
    }

    /// Target path and body for a save request
    fn plan(&self, params: &ReportParams, now: DateTime<Local>) -> Result<(PathBuf, String)> {
        if params.content.trim().is_empty() {
            return Err(MarketError::InvalidArguments("report content is empty".to_string()));
        }

        let filename = match (&params.filename, &params.title) {
            (Some(name), _) if !name.trim().is_empty() => {
                let name = name.trim();
                if Path::new(name).extension().is_some() {
                    name.to_string()
                } else {
                    format!("{name}.md")
                }
            }
            (_, title) => {
                let title = title.as_deref().unwrap_or(DEFAULT_TITLE);
                format!("{}_{}.md", sanitize_title(title), now.format("%Y%m%d_%H%M%S"))
            }
        };

        let body = match &params.title {
            Some(title) => report_body(title, &params.content, now),
            None if params.filename.is_some() => params.content.clone(),
            None => report_body(DEFAULT_TITLE, &params.content, now),
        };

        Ok((self.reports_dir.join(filename), body))
    }

    async fn save(&self, params: ReportParams) -> Result<Value> {
        let (path, body) = self.plan(&params, Local::now())?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;

        let filename = path.display().to_string();
        tracing::info!(path = %filename, "Report saved");
        Ok(json!({
            "success": true,
            "filename": filename,
            "message": format!("Report saved to {filename}"),
        }))
    }
}

#[async_trait]
impl Tool for SaveReportTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(SAVE_REPORT, params)?;
        self.save(params)
            .await
            .map_err(|e| Error::tool(SAVE_REPORT, e.to_string()))
    }

    fn name(&self) -> &str {
        SAVE_REPORT
    }

    fn description(&self) -> &str {
        "Save a markdown report to a file. Provide the report content and either a \
         title (used for the heading and a timestamped filename) or a filename."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Report body in markdown"
                },
                "title": {
                    "type": "string",
                    "description": "Report title"
                },
                "filename": {
                    "type": "string",
                    "description": "Explicit file name (e.g., 'aapl_analysis.md')"
                }
            },
            "required": ["content"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 30, 5).unwrap()
    }

    fn params(value: Value) -> ReportParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Tesla Q4: Outlook & Risks"), "Tesla_Q4__Outlook___Risks");
        assert_eq!(sanitize_title("a-b_c"), "a-b_c");
        assert_eq!(sanitize_title(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn test_plan_from_title() {
        let tool = SaveReportTool::new(Path::new("reports"));
        let (path, body) = tool
            .plan(
                &params(json!({"content": "Buy.", "title": "AAPL Review"})),
                fixed_now(),
            )
            .unwrap();

        assert_eq!(path, Path::new("reports/AAPL_Review_20250314_093005.md"));
        assert_eq!(
            body,
            "# AAPL Review\n\n**Generated:** 2025-03-14 09:30:05\n\n---\n\nBuy.\n"
        );
    }

    #[test]
    fn test_plan_from_filename_keeps_content() {
        let tool = SaveReportTool::new(Path::new("reports"));
        let (path, body) = tool
            .plan(&params(json!({"content": "raw", "filename": "nvda"})), fixed_now())
            .unwrap();
        assert_eq!(path, Path::new("reports/nvda.md"));
        assert_eq!(body, "raw");
    }

    #[test]
    fn test_plan_defaults_title() {
        let tool = SaveReportTool::new(Path::new("r"));
        let (path, body) = tool.plan(&params(json!({"content": "x"})), fixed_now()).unwrap();
        assert!(path.to_string_lossy().starts_with("r/Financial_Analysis_Report_"));
        assert!(body.starts_with("# Financial Analysis Report"));
    }

    #[test]
    fn test_empty_content_rejected() {
        let tool = SaveReportTool::new(Path::new("r"));
        assert!(tool.plan(&params(json!({"content": "  "})), fixed_now()).is_err());
    }

    #[tokio::test]
    async fn test_save_report_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveReportTool::new(&dir.path().join("reports"));

        let result = tool
            .execute(json!({"content": "## Summary\nSolid quarter.", "filename": "msft.md"}))
            .await
            .unwrap();

        let path = dir.path().join("reports/msft.md");
        assert_eq!(result["filename"], path.display().to_string());
        assert_eq!(
            result["message"],
            format!("Report saved to {}", path.display())
        );
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "## Summary\nSolid quarter."
        );
    }

    #[tokio::test]
    async fn test_unwritable_target_is_tool_error() {
        // A regular file where the reports directory should be
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let tool = SaveReportTool::new(blocker.path());

        let err = tool
            .execute(json!({"content": "x", "filename": "r.md"}))
            .await
            .unwrap_err();

        assert!(!err.is_fatal());
        assert!(matches!(err, Error::ToolInvocation { ref tool, .. } if tool == SAVE_REPORT));
    }
}
