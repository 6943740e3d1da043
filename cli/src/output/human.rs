//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::Package;
use crate::output::OutputContext;

const PACKAGE_HEADERS: [&str; 5] = ["hash", "state", "created", "type", "original prompt"];
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COLUMN_GAP: &str = "   ";

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("cf-prompt {version}");
    }

    /// Render an app's packages, newest first, marking the current one.
    pub fn render_packages(&self, app_name: &str, packages: &[Package], current: Option<&str>) {
        if packages.is_empty() {
            println!("No packages found for app '{app_name}'");
            return;
        }
        let lines = package_table(packages, current);
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                println!("{}", line.style(self.ctx.styles.header));
            } else {
                println!("{line}");
            }
        }
        if current.is_some_and(|c| packages.iter().any(|p| p.guid == c)) {
            println!();
            println!("{}", "* current droplet".style(self.ctx.styles.dim));
        }
    }
}

/// Lay out the package listing as aligned text lines, header first.
///
/// Columns are padded to their widest cell; the last column is not padded.
/// The current package's hash carries a `*` marker.
#[must_use]
pub fn package_table(packages: &[Package], current: Option<&str>) -> Vec<String> {
    let rows: Vec<[String; 5]> = packages
        .iter()
        .map(|p| {
            let marker = if current == Some(p.guid.as_str()) { "*" } else { " " };
            [
                format!("{marker}{}", p.short_id()),
                p.state.as_str().to_string(),
                p.created_at.format(CREATED_FORMAT).to_string(),
                p.kind.as_str().to_string(),
                p.prompt_preview(),
            ]
        })
        .collect();

    let header = PACKAGE_HEADERS.map(|h| {
        if h == "hash" {
            format!(" {h}")
        } else {
            h.to_string()
        }
    });
    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    std::iter::once(&header)
        .chain(rows.iter())
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{cell:<width$}", width = widths[i]));
                    line.push_str(COLUMN_GAP);
                }
            }
            line
        })
        .collect()
}
