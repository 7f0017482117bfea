//! In-memory figure description: traces plus layout, using plotly.js naming
//! and JSON shape. `svg` draws it; serde embeds it in the page as data.

use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Traces
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "lines+markers")]
    LinesMarkers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Marker {
    pub fn new(color: &str, size: f64) -> Self {
        Self {
            color: Some(color.to_string()),
            size: Some(size),
            symbol: None,
        }
    }

    pub fn color(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Self::default()
        }
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
    pub width: f64,
}

impl Line {
    pub fn new(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub mode: Mode,
    pub name: String,
    pub showlegend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
}

impl Scatter {
    pub fn new(x: Vec<f64>, y: Vec<f64>, mode: Mode, name: &str) -> Self {
        Self {
            x,
            y,
            mode,
            name: name.to_string(),
            showlegend: false,
            legendgroup: None,
            marker: None,
            line: None,
            xaxis: None,
            yaxis: None,
        }
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn line(mut self, line: Line) -> Self {
        self.line = Some(line);
        self
    }

    pub fn legend(mut self, show: bool, group: &str) -> Self {
        self.showlegend = show;
        self.legendgroup = Some(group.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub name: String,
    pub showlegend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsetgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
}

impl Bar {
    pub fn new(x: Vec<f64>, y: Vec<f64>, name: &str) -> Self {
        Self {
            x,
            y,
            name: name.to_string(),
            showlegend: false,
            legendgroup: None,
            marker: None,
            opacity: None,
            offsetgroup: None,
            xaxis: None,
            yaxis: None,
        }
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn offsetgroup(mut self, group: &str) -> Self {
        self.offsetgroup = Some(group.to_string());
        self
    }

    pub fn legend(mut self, show: bool, group: &str) -> Self {
        self.showlegend = show;
        self.legendgroup = Some(group.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(Scatter),
    Bar(Bar),
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Scatter(s) => &s.name,
            Trace::Bar(b) => &b.name,
        }
    }

    pub fn shows_legend(&self) -> bool {
        match self {
            Trace::Scatter(s) => s.showlegend,
            Trace::Bar(b) => b.showlegend,
        }
    }

    /// Pin the trace to a subplot's axes.
    pub fn place(&mut self, cell: Panel) {
        let (xaxis, yaxis) = match self {
            Trace::Scatter(s) => (&mut s.xaxis, &mut s.yaxis),
            Trace::Bar(b) => (&mut b.xaxis, &mut b.yaxis),
        };
        *xaxis = Some(cell.x_ref());
        *yaxis = Some(cell.y_ref());
    }

    pub fn axes(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Trace::Scatter(s) => (s.xaxis.as_deref(), s.yaxis.as_deref()),
            Trace::Bar(b) => (b.xaxis.as_deref(), b.yaxis.as_deref()),
        }
    }
}

impl From<Scatter> for Trace {
    fn from(s: Scatter) -> Self {
        Trace::Scatter(s)
    }
}

impl From<Bar> for Trace {
    fn from(b: Bar) -> Self {
        Trace::Bar(b)
    }
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
}

impl Title {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            x: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl Margin {
    pub fn uniform(px: u32) -> Self {
        Self {
            l: px,
            r: px,
            t: px,
            b: px,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xref: String,
    pub yref: String,
    pub xanchor: String,
    pub yanchor: String,
    pub showarrow: bool,
    pub font: Font,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickvals: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticktext: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// `xaxis`, `yaxis2`, ... keyed the way plotly.js expects them.
    #[serde(flatten)]
    pub axes: BTreeMap<String, Axis>,
}

impl Layout {
    pub fn x_axis_mut(&mut self, cell: Panel) -> &mut Axis {
        self.axes.entry(cell.x_key()).or_default()
    }

    pub fn y_axis_mut(&mut self, cell: Panel) -> &mut Axis {
        self.axes.entry(cell.y_key()).or_default()
    }

    pub fn set_axis_titles(&mut self, cell: Panel, x: &str, y: &str) {
        self.x_axis_mut(cell).title = Some(Title::new(x));
        self.y_axis_mut(cell).title = Some(Title::new(y));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trace(&mut self, trace: impl Into<Trace>) {
        self.data.push(trace.into());
    }

    /// Add a trace pinned to a subplot cell.
    pub fn add_trace_at(&mut self, trace: impl Into<Trace>, cell: Panel) {
        let mut trace = trace.into();
        trace.place(cell);
        self.data.push(trace);
    }

    /// Names that appear in the legend, in trace order.
    pub fn legend_entries(&self) -> Vec<&str> {
        self.data
            .iter()
            .filter(|t| t.shows_legend())
            .map(|t| t.name())
            .collect()
    }
}

// =============================================================================
// Subplot grid
// =============================================================================

/// One subplot position; `index` is 1-based in row-major order, matching the
/// plotly.js axis numbering (`x`, `x2`, `x3`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    pub index: usize,
    pub row: usize,
    pub col: usize,
}

impl Panel {
    fn suffix(&self) -> String {
        if self.index == 1 {
            String::new()
        } else {
            self.index.to_string()
        }
    }

    pub fn x_ref(&self) -> String {
        format!("x{}", self.suffix())
    }

    pub fn y_ref(&self) -> String {
        format!("y{}", self.suffix())
    }

    pub fn x_key(&self) -> String {
        format!("xaxis{}", self.suffix())
    }

    pub fn y_key(&self) -> String {
        format!("yaxis{}", self.suffix())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubplotGrid {
    rows: usize,
    cols: usize,
    vertical_spacing: f64,
    horizontal_spacing: f64,
    titles: Vec<String>,
}

impl SubplotGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            vertical_spacing: 0.3 / rows as f64,
            horizontal_spacing: 0.2 / cols as f64,
            titles: Vec::new(),
        }
    }

    pub fn vertical_spacing(mut self, spacing: f64) -> Self {
        self.vertical_spacing = spacing;
        self
    }

    pub fn horizontal_spacing(mut self, spacing: f64) -> Self {
        self.horizontal_spacing = spacing;
        self
    }

    pub fn titles(mut self, titles: Vec<String>) -> Self {
        self.titles = titles;
        self
    }

    /// Position of the `panel`-th panel (0-based, row-major).
    pub fn cell(&self, panel: usize) -> Panel {
        Panel {
            index: panel + 1,
            row: panel / self.cols,
            col: panel % self.cols,
        }
    }

    pub fn x_domain(&self, col: usize) -> [f64; 2] {
        let gaps = self.horizontal_spacing * (self.cols - 1) as f64;
        let width = (1.0 - gaps) / self.cols as f64;
        let start = col as f64 * (width + self.horizontal_spacing);
        [start, (start + width).min(1.0)]
    }

    /// Row 0 is the top row.
    pub fn y_domain(&self, row: usize) -> [f64; 2] {
        let gaps = self.vertical_spacing * (self.rows - 1) as f64;
        let height = (1.0 - gaps) / self.rows as f64;
        let top = 1.0 - row as f64 * (height + self.vertical_spacing);
        [(top - height).max(0.0), top]
    }

    /// Write every cell's axis domains and anchors, plus one centered title
    /// annotation per titled panel, into the layout.
    pub fn install(&self, layout: &mut Layout) {
        for panel in 0..self.rows * self.cols {
            let cell = self.cell(panel);
            let x = self.x_domain(cell.col);
            let y = self.y_domain(cell.row);
            {
                let xa = layout.x_axis_mut(cell);
                xa.domain = Some(x);
                xa.anchor = Some(cell.y_ref());
            }
            {
                let ya = layout.y_axis_mut(cell);
                ya.domain = Some(y);
                ya.anchor = Some(cell.x_ref());
            }
            if let Some(title) = self.titles.get(panel) {
                layout.annotations.push(Annotation {
                    text: title.clone(),
                    x: (x[0] + x[1]) / 2.0,
                    y: y[1],
                    xref: "paper".to_string(),
                    yref: "paper".to_string(),
                    xanchor: "center".to_string(),
                    yanchor: "bottom".to_string(),
                    showarrow: false,
                    font: Font { size: 16 },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn axis_naming_follows_plotly() {
        let grid = SubplotGrid::new(2, 2);
        let first = grid.cell(0);
        assert_eq!((first.x_ref(), first.y_key()), ("x".to_string(), "yaxis".to_string()));
        let third = grid.cell(2);
        assert_eq!((third.row, third.col), (1, 0));
        assert_eq!(third.x_ref(), "x3");
        assert_eq!(third.x_key(), "xaxis3");
    }

    #[test]
    fn domains_split_the_paper() {
        let grid = SubplotGrid::new(2, 2)
            .vertical_spacing(0.1)
            .horizontal_spacing(0.1);
        let [a, b] = grid.x_domain(0);
        assert!(close(a, 0.0) && close(b, 0.45));
        let [a, b] = grid.x_domain(1);
        assert!(close(a, 0.55) && close(b, 1.0));
        let [a, b] = grid.y_domain(0);
        assert!(close(a, 0.55) && close(b, 1.0));
        let [a, b] = grid.y_domain(1);
        assert!(close(a, 0.0) && close(b, 0.45));
    }

    #[test]
    fn install_writes_axes_and_titles() {
        let grid = SubplotGrid::new(2, 2).titles(vec!["a".into(), "b".into(), "c".into()]);
        let mut layout = Layout::default();
        grid.install(&mut layout);
        assert_eq!(layout.axes.len(), 8);
        assert_eq!(layout.annotations.len(), 3);
        assert_eq!(layout.axes["xaxis2"].anchor.as_deref(), Some("y2"));
    }

    #[test]
    fn traces_serialize_with_type_tag() {
        let mut fig = Figure::new();
        let cell = SubplotGrid::new(1, 2).cell(1);
        fig.add_trace_at(
            Scatter::new(vec![1.0], vec![2.0], Mode::LinesMarkers, "s").legend(true, "g"),
            cell,
        );
        fig.add_trace(Bar::new(vec![1.0], vec![3.0], "b").offsetgroup("0"));
        let json = serde_json::to_value(&fig).unwrap();
        assert_eq!(json["data"][0]["type"], "scatter");
        assert_eq!(json["data"][0]["mode"], "lines+markers");
        assert_eq!(json["data"][0]["xaxis"], "x2");
        assert_eq!(json["data"][1]["type"], "bar");
        assert!(json["data"][1].get("xaxis").is_none());
        assert_eq!(fig.legend_entries(), vec!["s"]);
    }
}
