//! Complete HTML documents for the two views.
//!
//! Pure string assembly: entry bodies arrive pre-escaped from the renderer,
//! everything else interpolated here goes through [`escape`].

use std::path::Path;

use crate::html::escape;
use crate::model::{DiffEntry, Entry, UploadSnapshot};
use crate::revision::RevisionBuildError;

pub const TIMELINE_ROUTE: &str = "/index.html";
pub const UPLOADS_ROUTE: &str = "/run_code_log.html";

const STYLESHEET: &str = include_str!("../assets/viewer.css");

const META_TOGGLE_SCRIPT: &str = r#"<script>
    (() => {
      const btn = document.getElementById("toggle-meta");
      if (!btn) return;
      let hidden = false;
      const update = () => {
        document.body.classList.toggle("meta-hidden", hidden);
        btn.textContent = hidden ? "Show meta blocks" : "Hide meta blocks";
      };
      btn.addEventListener("click", () => {
        hidden = !hidden;
        update();
      });
      update();
    })();
  </script>"#;

pub fn render_timeline_page(entries: &[Entry], source_path: &Path) -> String {
    let cards = entries
        .iter()
        .map(entry_card)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Conversation Viewer</title>
  <style>
{STYLESHEET}
  </style>
</head>
<body>
  <header>
    <div class="header-top">
      <h1>Conversation Viewer</h1>
      <div class="header-actions">
        <a href="{UPLOADS_ROUTE}" class="nav-button">View run_code uploads</a>
        <button id="toggle-meta" class="meta-toggle" type="button">Hide meta blocks</button>
      </div>
    </div>
    <p>Source: {source} · {total} entries</p>
  </header>
  <div class="container">
    {cards}
  </div>
  {META_TOGGLE_SCRIPT}
</body>
</html>
"#,
        source = escape(&source_path.display().to_string()),
        total = entries.len(),
    )
}

fn entry_card(entry: &Entry) -> String {
    format!(
        "<article class=\"entry {}\"><header><div>{}</div><small>{} · line {} · {}</small></header><div>{}</div></article>",
        entry.class_list(),
        escape(&entry.label),
        escape(&entry.timestamp),
        entry.line_no,
        escape(&entry.raw_type),
        entry.body_html
    )
}

/// The upload report. `history` is ignored when there are no uploads.
pub fn render_upload_page(
    source_path: &Path,
    upload_function: &str,
    uploads: &[UploadSnapshot],
    history: &Result<Vec<DiffEntry>, RevisionBuildError>,
) -> String {
    let summary = upload_summary(uploads, upload_function);
    let diffs = if uploads.is_empty() {
        String::new()
    } else {
        diff_section(history)
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>run_code uploads</title>
  <style>
{STYLESHEET}
  </style>
</head>
<body>
  <header>
    <div class="header-top">
      <h1>run_code uploads</h1>
      <div class="header-actions">
        <a href="{TIMELINE_ROUTE}" class="nav-button secondary">Back to entries</a>
      </div>
    </div>
    <p>Source: {source} · {total} uploads</p>
  </header>
  <div class="container">
    {summary}
    {diffs}
  </div>
</body>
</html>
"#,
        source = escape(&source_path.display().to_string()),
        total = uploads.len(),
    )
}

fn upload_summary(uploads: &[UploadSnapshot], upload_function: &str) -> String {
    if uploads.is_empty() {
        return format!(
            "<section class='panel'><h2>Captured uploads</h2><p>No calls to {} were found in this log.</p></section>",
            escape(upload_function)
        );
    }

    let rows = uploads
        .iter()
        .map(|upload| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>line {}</td><td>{}</td><td>{}</td></tr>",
                upload.index,
                escape(&upload.timestamp),
                upload.line_no,
                collapsed_text(&upload.code),
                collapsed_text(&upload.flags)
            )
        })
        .collect::<String>();

    format!(
        "<section class='panel'><h2>Captured uploads ({})</h2><table class='uploads-table'><thead><tr><th>#</th><th>Timestamp</th><th>Location</th><th>Code</th><th>Flags</th></tr></thead><tbody>{rows}</tbody></table></section>",
        uploads.len()
    )
}

fn collapsed_text(text: &str) -> String {
    if text.is_empty() {
        return "<em>empty</em>".to_string();
    }
    format!(
        "<details><summary>{} chars</summary><pre>{}</pre></details>",
        text.chars().count(),
        escape(text)
    )
}

fn diff_section(history: &Result<Vec<DiffEntry>, RevisionBuildError>) -> String {
    let body = match history {
        Ok(diffs) => diffs
            .iter()
            .map(|entry| {
                format!(
                    "<div class='diff-card'><h3>{}</h3>{}</div>",
                    escape(&entry.label),
                    render_diff(&entry.diff)
                )
            })
            .collect::<String>(),
        Err(err) => format!(
            "<div class='error-banner'>Failed to build git history: {}</div>",
            escape(&err.to_string())
        ),
    };

    format!("<section class='panel'><h2>Commit diffs</h2>{body}</section>")
}

/// Colour a unified diff line by line.
pub fn render_diff(diff_text: &str) -> String {
    if diff_text.is_empty() {
        return "<pre class=\"diff-block\"><span class=\"diff-context\">(no diff)</span></pre>"
            .to_string();
    }

    let lines = diff_text
        .lines()
        .map(|line| {
            let escaped = if line.is_empty() {
                "&nbsp;".to_string()
            } else {
                escape(line)
            };
            format!("<span class=\"{}\">{escaped}</span>", diff_line_class(line))
        })
        .collect::<String>();

    format!("<pre class=\"diff-block\">{lines}</pre>")
}

fn diff_line_class(line: &str) -> &'static str {
    if line.starts_with("@@") {
        "diff-hunk"
    } else if line.starts_with("+++ ") || line.starts_with("--- ") {
        "diff-file"
    } else if line.starts_with('+') && !line.starts_with("+++") {
        "diff-add"
    } else if line.starts_with('-') && !line.starts_with("---") {
        "diff-del"
    } else {
        "diff-context"
    }
}
