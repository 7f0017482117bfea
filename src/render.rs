//! Figure Renderer: uniform panel styling, HTML serialization and the
//! centering post-process applied to every written chart. Pages are fully
//! self-contained: the drawing is inline SVG and the figure travels along as
//! a JSON data block.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::figure::{Figure, Layout, Margin};
use crate::svg;

pub const PANEL_COLUMNS: usize = 2;
pub const PANEL_HEIGHT: u32 = 600;
pub const PAGE_WIDTH: u32 = 1200;
pub const BACKGROUND: &str = "#fafafa";

/// Layout shared by the two-column panel charts: height grows with the number
/// of panel rows, fixed page width.
pub fn style_panels(layout: &mut Layout, panels: usize) {
    let rows = panels.div_ceil(PANEL_COLUMNS).max(1) as u32;
    layout.height = Some(PANEL_HEIGHT * rows);
    layout.width = Some(PAGE_WIDTH);
    layout.margin = Some(Margin::uniform(70));
    layout.autosize = Some(true);
    layout.showlegend = Some(true);
    layout.plot_bgcolor = Some(BACKGROUND.to_string());
}

/// Serialize a figure into a standalone HTML document.
pub fn to_html(fig: &Figure) -> Result<String> {
    let json = script_json(&serde_json::to_string(fig)?);

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let plot_id = format!("plot-{}", &digest[..16]);

    let (width, _) = svg::page_size(&fig.layout);

    Ok(TEMPLATE
        .replace("__PLOT_ID__", &plot_id)
        .replace("__WIDTH__", &width.to_string())
        .replace("__LEGEND__", &svg::legend_html(fig))
        .replace("__SVG__", &svg::figure_svg(fig))
        .replace("__FIGURE__", &json))
}

// JSON inside <script> must not close the tag early.
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Re-wrap an HTML document so its body sits in a fixed-width container
/// centered with flexbox. Anything in the input's `<head>` is kept; input
/// without a `<body>` is wrapped whole.
pub fn center_html(html: &str, width_px: u32) -> String {
    let head = between(html, "<head>", "</head>").unwrap_or("");
    let body = between(html, "<body>", "</body>").unwrap_or(html);
    CENTERED
        .replace("__HEAD__", head.trim())
        .replace("__WIDTH__", &width_px.to_string())
        .replace("__BODY__", body.trim())
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = start + text[start..].rfind(close)?;
    Some(&text[start..end])
}

/// Write a chart to `dir/file_name`, creating `dir` as needed, then read it
/// back and rewrite it centered at `width_px`. Existing files are replaced.
pub fn write_chart(dir: &Path, file_name: &str, fig: &Figure, width_px: u32) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = dir.join(file_name);

    fs::write(&path, to_html(fig)?).with_context(|| format!("cannot write {}", path.display()))?;
    let content =
        fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    fs::write(&path, center_html(&content, width_px))
        .with_context(|| format!("cannot rewrite {}", path.display()))?;

    Ok(path)
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    .chart { margin: 0 auto; }
    .legend { display: flex; flex-wrap: wrap; justify-content: center; gap: 4px 16px; font: 13px sans-serif; color: #444; padding: 8px 0; }
    .legend-title { font-weight: bold; }
    .legend-item { display: inline-flex; align-items: center; gap: 6px; }
    .swatch { display: inline-block; width: 12px; height: 12px; border-radius: 2px; }
  </style>
</head>
<body>
  <div id="__PLOT_ID__" class="chart" style="width:__WIDTH__px;">
    __SVG__
    __LEGEND__
  </div>
  <script type="application/json" id="__PLOT_ID__-figure">__FIGURE__</script>
</body>
</html>
"##;

const CENTERED: &str = r##"<!DOCTYPE html>
<html>
<head>
  __HEAD__
  <style>
    body {
      display: flex;
      justify-content: center;
      align-items: center;
      min-height: 100vh;
      margin: 0;
    }
    .chart-container {
      text-align: center;
      width: __WIDTH__px;
      height: auto;
    }
  </style>
</head>
<body>
  <div class="chart-container">
    __BODY__
  </div>
</body>
</html>
"##;
