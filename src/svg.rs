//! Static SVG drawing of a `Figure`: one rectangle per subplot, nice-number
//! ticks, traces, paper-positioned annotations and an HTML legend. The
//! output needs no script to display.

use std::fmt::Write;

use crate::figure::{Axis, Bar, Figure, Layout, Margin, Mode, Scatter, Trace};

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 500;
const DEFAULT_MARGIN: u32 = 80;
const DEFAULT_COLOR: &str = "#1f77b4";
const DEFAULT_MARKER: f64 = 6.0;
const GRID_COLOR: &str = "#e2e2e2";
const FRAME_COLOR: &str = "#c8c8c8";
const TEXT_COLOR: &str = "#444";
const TICK_TARGET: f64 = 6.0;
/// Share of one x slot covered by a bar group.
const BAR_FILL: f64 = 0.8;
const PAD: f64 = 0.05;

/// Page size in px: the layout's own, or the defaults for autosized figures.
pub fn page_size(layout: &Layout) -> (u32, u32) {
    (
        layout.width.unwrap_or(DEFAULT_WIDTH),
        layout.height.unwrap_or(DEFAULT_HEIGHT),
    )
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// =============================================================================
// Geometry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    lo: f64,
    hi: f64,
}

impl Range {
    fn empty() -> Self {
        Self {
            lo: f64::INFINITY,
            hi: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, v: f64) {
        if v.is_finite() {
            self.lo = self.lo.min(v);
            self.hi = self.hi.max(v);
        }
    }

    /// Widen by `pad` of the span on both sides. Degenerate ranges get a
    /// unit (or 10%) window around their single value.
    fn padded(self, pad: f64) -> Self {
        if !self.lo.is_finite() || !self.hi.is_finite() {
            return Self { lo: 0.0, hi: 1.0 };
        }
        let span = self.hi - self.lo;
        if span.abs() < 1e-12 {
            let d = if self.lo.abs() > 1e-12 {
                self.lo.abs() * 0.1
            } else {
                1.0
            };
            return Self {
                lo: self.lo - d,
                hi: self.hi + d,
            };
        }
        Self {
            lo: self.lo - span * pad,
            hi: self.hi + span * pad,
        }
    }

    fn span(&self) -> f64 {
        self.hi - self.lo
    }

    fn contains(&self, v: f64) -> bool {
        let eps = self.span().abs() * 1e-9;
        v >= self.lo - eps && v <= self.hi + eps
    }
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Data to pixel mapping for one subplot.
struct Projection {
    rect: Rect,
    x: Range,
    y: Range,
}

impl Projection {
    fn px(&self, v: f64) -> f64 {
        self.rect.x0 + (v - self.x.lo) / self.x.span() * (self.rect.x1 - self.rect.x0)
    }

    fn py(&self, v: f64) -> f64 {
        self.rect.y1 - (v - self.y.lo) / self.y.span() * (self.rect.y1 - self.rect.y0)
    }
}

/// Step of 1, 2 or 5 times a power of ten giving about `TICK_TARGET` ticks.
fn nice_step(span: f64) -> f64 {
    let raw = span / TICK_TARGET;
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let nice = if norm < 1.5 {
        1.0
    } else if norm < 3.0 {
        2.0
    } else if norm < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * mag
}

fn nice_ticks(range: Range) -> Vec<(f64, String)> {
    let step = nice_step(range.span());
    if !step.is_finite() || step <= 0.0 {
        return Vec::new();
    }
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let first = (range.lo / step).ceil() as i64;
    let last = (range.hi / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let v = i as f64 * step;
            let v = if v.abs() < step * 1e-9 { 0.0 } else { v };
            (v, format!("{:.*}", decimals, v))
        })
        .collect()
}

fn axis_ticks(axis: Option<&Axis>, range: Range) -> Vec<(f64, String)> {
    match axis.and_then(|a| a.tickvals.as_ref()) {
        Some(vals) => {
            let text = axis.and_then(|a| a.ticktext.as_ref());
            vals.iter()
                .enumerate()
                .filter(|(_, v)| range.contains(**v))
                .map(|(i, v)| {
                    let label = text
                        .and_then(|t| t.get(i).cloned())
                        .unwrap_or_else(|| format!("{}", v));
                    (*v, label)
                })
                .collect()
        }
        None => nice_ticks(range),
    }
}

/// `x3` -> `xaxis3`, `y` -> `yaxis`.
fn axis_key(axis_ref: &str) -> String {
    let (head, tail) = axis_ref.split_at(axis_ref.len().min(1));
    format!("{}axis{}", head, tail)
}

// =============================================================================
// Traces
// =============================================================================

fn trace_axes(trace: &Trace) -> (String, String) {
    let (x, y) = trace.axes();
    (x.unwrap_or("x").to_string(), y.unwrap_or("y").to_string())
}

pub fn trace_color(trace: &Trace) -> &str {
    match trace {
        Trace::Scatter(s) => {
            let marker = s.marker.as_ref().and_then(|m| m.color.as_deref());
            let line = s.line.as_ref().map(|l| l.color.as_str());
            let color = match s.mode {
                Mode::Lines => line.or(marker),
                _ => marker.or(line),
            };
            color.unwrap_or(DEFAULT_COLOR)
        }
        Trace::Bar(b) => b
            .marker
            .as_ref()
            .and_then(|m| m.color.as_deref())
            .unwrap_or(DEFAULT_COLOR),
    }
}

/// Bar placement shared by every bar trace in a subplot.
struct BarSlots {
    group_width: f64,
    groups: Vec<String>,
    grouped: bool,
}

impl BarSlots {
    fn new(bars: &[(usize, &Bar)], grouped: bool) -> Self {
        let mut xs: Vec<f64> = bars
            .iter()
            .flat_map(|(_, b)| b.x.iter().copied())
            .filter(|v| v.is_finite())
            .collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        let slot = xs
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| *d > 0.0)
            .fold(f64::INFINITY, f64::min);
        let slot = if slot.is_finite() { slot } else { 1.0 };

        let mut groups: Vec<String> = Vec::new();
        for (i, b) in bars {
            let key = group_key(*i, b);
            if !groups.contains(&key) {
                groups.push(key);
            }
        }
        Self {
            group_width: slot * BAR_FILL,
            groups,
            grouped,
        }
    }

    /// Width of one bar and its center offset from the x value.
    fn place(&self, index: usize, bar: &Bar) -> (f64, f64) {
        if !self.grouped || self.groups.len() < 2 {
            return (self.group_width, 0.0);
        }
        let key = group_key(index, bar);
        let slot = self.groups.iter().position(|g| *g == key).unwrap_or(0);
        let width = self.group_width / self.groups.len() as f64;
        (width, -self.group_width / 2.0 + (slot as f64 + 0.5) * width)
    }
}

fn group_key(index: usize, bar: &Bar) -> String {
    bar.offsetgroup
        .clone()
        .unwrap_or_else(|| format!("trace-{}", index))
}

fn draw_scatter(svg: &mut String, trace: &Trace, s: &Scatter, proj: &Projection) {
    let points: Vec<(f64, f64)> = s
        .x
        .iter()
        .zip(&s.y)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (proj.px(*x), proj.py(*y)))
        .collect();

    if matches!(s.mode, Mode::Lines | Mode::LinesMarkers) && points.len() >= 2 {
        let color = s
            .line
            .as_ref()
            .map(|l| l.color.as_str())
            .unwrap_or_else(|| trace_color(trace));
        let width = s.line.as_ref().map(|l| l.width).unwrap_or(2.0);
        let mut path = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(path, "{}{:.2},{:.2}", cmd, x, y);
        }
        let _ = write!(
            svg,
            r##"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round"/>"##,
            path,
            escape(color),
            width
        );
    }

    if matches!(s.mode, Mode::Markers | Mode::LinesMarkers) {
        let color = escape(trace_color(trace));
        let radius = s
            .marker
            .as_ref()
            .and_then(|m| m.size)
            .unwrap_or(DEFAULT_MARKER)
            / 2.0;
        for (x, y) in &points {
            let _ = write!(
                svg,
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}"/>"##,
                x, y, radius, color
            );
        }
    }
}

fn draw_bar(svg: &mut String, index: usize, b: &Bar, proj: &Projection, slots: &BarSlots) {
    let (width, offset) = slots.place(index, b);
    let color = escape(
        b.marker
            .as_ref()
            .and_then(|m| m.color.as_deref())
            .unwrap_or(DEFAULT_COLOR),
    );
    let opacity = b.opacity.unwrap_or(1.0);
    for (x, y) in b.x.iter().zip(&b.y) {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let center = x + offset;
        let left = proj.px(center - width / 2.0);
        let right = proj.px(center + width / 2.0);
        let top = proj.py(y.max(0.0));
        let bottom = proj.py(y.min(0.0));
        let _ = write!(
            svg,
            r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" opacity="{}"/>"##,
            left,
            top,
            (right - left).abs(),
            (bottom - top).abs(),
            color,
            opacity
        );
    }
}

// =============================================================================
// Subplots
// =============================================================================

/// Every `(x, y)` axis pair that has at least one trace, in trace order.
fn subplots(fig: &Figure) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for trace in &fig.data {
        let axes = trace_axes(trace);
        if !out.contains(&axes) {
            out.push(axes);
        }
    }
    out
}

fn domain(axis: Option<&Axis>) -> [f64; 2] {
    axis.and_then(|a| a.domain).unwrap_or([0.0, 1.0])
}

fn draw_subplot(svg: &mut String, fig: &Figure, paper: Rect, x_ref: &str, y_ref: &str) {
    let layout = &fig.layout;
    let x_axis = layout.axes.get(&axis_key(x_ref));
    let y_axis = layout.axes.get(&axis_key(y_ref));
    let [dx0, dx1] = domain(x_axis);
    let [dy0, dy1] = domain(y_axis);
    let paper_w = paper.x1 - paper.x0;
    let paper_h = paper.y1 - paper.y0;
    let rect = Rect {
        x0: paper.x0 + dx0 * paper_w,
        x1: paper.x0 + dx1 * paper_w,
        y0: paper.y0 + (1.0 - dy1) * paper_h,
        y1: paper.y0 + (1.0 - dy0) * paper_h,
    };

    let traces: Vec<(usize, &Trace)> = fig
        .data
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            let (x, y) = trace_axes(t);
            x == x_ref && y == y_ref
        })
        .collect();
    let bars: Vec<(usize, &Bar)> = traces
        .iter()
        .filter_map(|(i, t)| match t {
            Trace::Bar(b) => Some((*i, b)),
            Trace::Scatter(_) => None,
        })
        .collect();
    let slots = BarSlots::new(&bars, layout.barmode.as_deref() == Some("group"));

    let mut xr = Range::empty();
    let mut yr = Range::empty();
    for (_, trace) in &traces {
        match trace {
            Trace::Scatter(s) => {
                s.x.iter().for_each(|v| xr.include(*v));
                s.y.iter().for_each(|v| yr.include(*v));
            }
            Trace::Bar(b) => {
                for x in &b.x {
                    xr.include(x - slots.group_width / 2.0);
                    xr.include(x + slots.group_width / 2.0);
                }
                b.y.iter().for_each(|v| yr.include(*v));
                yr.include(0.0);
            }
        }
    }
    let x_pad = if bars.is_empty() { PAD } else { 0.0 };
    let mut yr_padded = yr.padded(PAD);
    if !bars.is_empty() && yr.lo >= 0.0 {
        yr_padded.lo = 0.0;
    }
    let proj = Projection {
        rect,
        x: xr.padded(x_pad),
        y: yr_padded,
    };

    let background = layout.plot_bgcolor.as_deref().unwrap_or("#ffffff");
    let _ = write!(
        svg,
        r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}"/>"##,
        rect.x0,
        rect.y0,
        rect.x1 - rect.x0,
        rect.y1 - rect.y0,
        escape(background),
        FRAME_COLOR
    );

    for (v, label) in axis_ticks(x_axis, proj.x) {
        let x = proj.px(v);
        let _ = write!(
            svg,
            r##"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{GRID_COLOR}"/><text x="{x:.2}" y="{:.2}" text-anchor="middle" font-size="11" fill="{TEXT_COLOR}">{}</text>"##,
            rect.y0,
            rect.y1,
            rect.y1 + 15.0,
            escape(&label)
        );
    }
    for (v, label) in axis_ticks(y_axis, proj.y) {
        let y = proj.py(v);
        let _ = write!(
            svg,
            r##"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{GRID_COLOR}"/><text x="{:.2}" y="{:.2}" text-anchor="end" font-size="11" fill="{TEXT_COLOR}">{}</text>"##,
            rect.x0,
            rect.x1,
            rect.x0 - 6.0,
            y + 4.0,
            escape(&label)
        );
    }

    if let Some(title) = x_axis.and_then(|a| a.title.as_ref()) {
        let _ = write!(
            svg,
            r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="12" fill="{TEXT_COLOR}">{}</text>"##,
            (rect.x0 + rect.x1) / 2.0,
            rect.y1 + 34.0,
            escape(&title.text)
        );
    }
    if let Some(title) = y_axis.and_then(|a| a.title.as_ref()) {
        let (x, y) = (rect.x0 - 46.0, (rect.y0 + rect.y1) / 2.0);
        let _ = write!(
            svg,
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" font-size="12" fill="{TEXT_COLOR}" transform="rotate(-90,{x:.2},{y:.2})">{}</text>"##,
            escape(&title.text)
        );
    }

    for (i, trace) in &traces {
        match trace {
            Trace::Scatter(s) => draw_scatter(svg, trace, s, &proj),
            Trace::Bar(b) => draw_bar(svg, *i, b, &proj, &slots),
        }
    }
}

// =============================================================================
// Figure
// =============================================================================

pub fn figure_svg(fig: &Figure) -> String {
    let layout = &fig.layout;
    let (width, height) = page_size(layout);
    let margin = layout.margin.unwrap_or(Margin::uniform(DEFAULT_MARGIN));
    let paper = Rect {
        x0: margin.l as f64,
        y0: margin.t as f64,
        x1: width.saturating_sub(margin.r) as f64,
        y1: height.saturating_sub(margin.b) as f64,
    };

    let mut svg = String::with_capacity(16 * 1024);
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"##
    );
    let paper_bg = layout.paper_bgcolor.as_deref().unwrap_or("#ffffff");
    let _ = write!(
        svg,
        r##"<rect width="{width}" height="{height}" fill="{}"/>"##,
        escape(paper_bg)
    );

    if let Some(title) = &layout.title {
        let _ = write!(
            svg,
            r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="18" fill="{TEXT_COLOR}">{}</text>"##,
            title.x.unwrap_or(0.5) * width as f64,
            (margin.t as f64 * 0.6).max(18.0),
            escape(&title.text)
        );
    }

    for (x_ref, y_ref) in subplots(fig) {
        draw_subplot(&mut svg, fig, paper, &x_ref, &y_ref);
    }

    let paper_w = paper.x1 - paper.x0;
    let paper_h = paper.y1 - paper.y0;
    for note in &layout.annotations {
        let anchor = match note.xanchor.as_str() {
            "left" => "start",
            "right" => "end",
            _ => "middle",
        };
        let y = paper.y0 + (1.0 - note.y) * paper_h;
        let y = if note.yanchor == "bottom" { y - 6.0 } else { y };
        let _ = write!(
            svg,
            r##"<text x="{:.2}" y="{:.2}" text-anchor="{anchor}" font-size="{}" fill="{TEXT_COLOR}">{}</text>"##,
            paper.x0 + note.x * paper_w,
            y,
            note.font.size,
            escape(&note.text)
        );
    }

    svg.push_str("</svg>");
    svg
}

/// Legend entries as HTML beneath the drawing; empty when nothing is shown.
pub fn legend_html(fig: &Figure) -> String {
    if fig.layout.showlegend == Some(false) {
        return String::new();
    }
    let entries: Vec<&Trace> = fig.data.iter().filter(|t| t.shows_legend()).collect();
    if entries.is_empty() {
        return String::new();
    }

    let mut html = String::from(r#"<div class="legend">"#);
    if let Some(legend) = &fig.layout.legend {
        let _ = write!(
            html,
            r#"<span class="legend-title">{}</span>"#,
            escape(&legend.title.text)
        );
    }
    for trace in entries {
        let _ = write!(
            html,
            r#"<span class="legend-item"><span class="swatch" style="background:{}"></span>{}</span>"#,
            escape(trace_color(trace)),
            escape(trace.name())
        );
    }
    html.push_str("</div>");
    html
}
