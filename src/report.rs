use anyhow::{Context, Result};
use std::path::Path;

use crate::eval::batch::{Cell, Report};

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Plain(s) => s.clone(),
        Cell::Quoted(s) => format!("\"{}\"", s.replace('"', "\"\"")),
    }
}

/// Comma-separated header plus one line per row, without a trailing newline.
pub fn to_csv(report: &Report) -> String {
    let mut lines = Vec::with_capacity(report.rows.len() + 1);
    lines.push(report.header.join(","));
    for row in &report.rows {
        lines.push(row.iter().map(render_cell).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

pub fn write_csv(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    std::fs::write(path, to_csv(report))
        .with_context(|| format!("writing report to {}", path.display()))
}
