use crate::errors::{Result, TrafficError};
use crate::models::{ReferrerRecord, TrafficDataset, TrafficSummary};
use crate::stats::build_summary;
use crate::storage::write_atomic;
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub const CLONES_COLOR: &str = "#8A90C8";
pub const UNIQUES_COLOR: &str = "#E8B7B7";

pub struct ReportContext<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub dataset: &'a TrafficDataset,
    pub referrers: &'a [ReferrerRecord],
    /// Captured by the caller so rendering stays deterministic.
    pub generated_at: &'a str,
}

pub fn render_report(ctx: &ReportContext<'_>) -> String {
    let summary = build_summary(ctx.dataset);
    let title = format!("{}/{}", ctx.owner, ctx.repo);

    // Externally sourced text goes in last so it is never rescanned.
    REPORT_HTML
        .replace("{{CHART_DATA}}", &chart_data(ctx.dataset))
        .replace("{{DAILY_ROWS}}", &daily_rows(ctx.dataset))
        .replace("{{DAILY_COUNT}}", &ctx.dataset.len().to_string())
        .replace("{{SUMMARY}}", &summary_panel(&summary))
        .replace("{{PRIMARY_COLOR}}", CLONES_COLOR)
        .replace("{{SECONDARY_COLOR}}", UNIQUES_COLOR)
        .replace("{{GENERATED_AT}}", &html_escape(ctx.generated_at))
        .replace("{{TITLE}}", &html_escape(&title))
        .replace("{{REFERRER_ROWS}}", &referrer_rows(ctx.referrers))
}

pub async fn write_report(path: &Path, html: &str) -> Result<()> {
    write_atomic(path, html.as_bytes())
        .await
        .map_err(|source| TrafficError::Render {
            path: path.to_path_buf(),
            source,
        })?;
    info!("dashboard written to {}", path.display());
    Ok(())
}

pub fn default_report_name(owner: &str, repo: &str) -> String {
    format!("{owner}_{repo}_traffic_dashboard.html")
}

/// Series are aligned on `dates`; unreported values are `null` so the charts
/// bridge them instead of plotting zero.
fn chart_data(dataset: &TrafficDataset) -> String {
    let records: Vec<_> = dataset.records().collect();
    let data = json!({
        "dates": records.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        "clones": records.iter().map(|r| r.clones).collect::<Vec<_>>(),
        "clones_uniques": records.iter().map(|r| r.clones_uniques).collect::<Vec<_>>(),
        "views": records.iter().map(|r| r.views).collect::<Vec<_>>(),
        "views_uniques": records.iter().map(|r| r.views_uniques).collect::<Vec<_>>(),
    });
    // Keep the payload from closing the surrounding <script> element.
    data.to_string().replace("</", "<\\/")
}

fn daily_rows(dataset: &TrafficDataset) -> String {
    let mut out = String::new();
    for record in dataset.records() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            record.date,
            cell(record.clones),
            cell(record.clones_uniques),
            cell(record.views),
            cell(record.views_uniques),
        );
    }
    out
}

fn referrer_rows(referrers: &[ReferrerRecord]) -> String {
    let mut out = String::new();
    for referrer in referrers {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(&referrer.referrer),
            referrer.count,
            referrer.uniques,
        );
    }
    out
}

fn summary_panel(summary: &TrafficSummary) -> String {
    let span = match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => format!("{first} &rarr; {last}"),
        _ => "No data yet".to_string(),
    };

    format!(
        r#"<div class="stat"><span class="label">Days tracked</span><span class="value">{days}</span><span class="detail">{span}</span></div>
      <div class="stat"><span class="label">Clones</span><span class="value">{clones}</span><span class="detail">{clones_uniques} unique cloners</span></div>
      <div class="stat"><span class="label">Views</span><span class="value">{views}</span><span class="detail">{views_uniques} unique visitors</span></div>"#,
        days = summary.days,
        clones = summary.total_clones,
        clones_uniques = summary.total_clones_uniques,
        views = summary.total_views,
        views_uniques = summary.total_views_uniques,
    )
}

fn cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Traffic dashboard {{TITLE}}</title>
  <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
  <style>
    :root {
      --primary: {{PRIMARY_COLOR}};
      --secondary: {{SECONDARY_COLOR}};
      --ink: #333;
      --card: #fff;
      --shadow: 0 6px 20px rgba(0, 0, 0, 0.1);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--primary) 0%, var(--secondary) 100%);
      color: var(--ink);
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
      padding: 32px 18px 48px;
    }

    .container {
      max-width: 1200px;
      margin: auto;
      padding: 30px;
      background: var(--card);
      border-radius: 12px;
      box-shadow: var(--shadow);
      display: grid;
      gap: 32px;
    }

    header h1 {
      margin: 0;
      text-align: center;
      color: #4a4a4a;
    }

    .generated {
      margin: 8px 0 0;
      text-align: center;
      color: #666;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    .stat {
      border-radius: 12px;
      padding: 16px;
      border: 1px solid #e4e6f0;
      display: grid;
      gap: 6px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
    }

    .stat .detail {
      color: #666;
      font-size: 0.9rem;
    }

    .chart {
      width: 100%;
      min-height: 420px;
    }

    .toggle {
      cursor: pointer;
      padding: 10px;
      background: #e8eaf6;
      border-radius: 8px;
      text-align: center;
      font-weight: bold;
      user-select: none;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      margin-top: 16px;
    }

    th,
    td {
      padding: 10px;
      border-bottom: 1px solid #ddd;
    }

    th {
      background: #f1f3f8;
      text-align: left;
    }
  </style>
</head>
<body>
  <main class="container">
    <header>
      <h1>Traffic dashboard {{TITLE}}</h1>
      <p class="generated">Generated at <strong id="generated-at">{{GENERATED_AT}}</strong></p>
    </header>

    <section class="panel">
      {{SUMMARY}}
    </section>

    <section>
      <div id="clones-chart" class="chart"></div>
    </section>

    <section>
      <div id="views-chart" class="chart"></div>
    </section>

    <section>
      <div class="toggle" id="daily-toggle" role="button" aria-expanded="false" aria-controls="daily">Daily data ({{DAILY_COUNT}} days)</div>
      <div id="daily" style="display:none;">
        <table id="daily-table">
          <thead>
            <tr><th>date</th><th>clones</th><th>clones_uniques</th><th>views</th><th>views_uniques</th></tr>
          </thead>
          <tbody>
{{DAILY_ROWS}}          </tbody>
        </table>
      </div>
    </section>

    <section>
      <h2>Popular referrers</h2>
      <table id="referrers-table">
        <thead>
          <tr><th>referrer</th><th>count</th><th>uniques</th></tr>
        </thead>
        <tbody>
{{REFERRER_ROWS}}        </tbody>
      </table>
    </section>
  </main>

  <script>
    const data = {{CHART_DATA}};

    const dualAxis = (target, title, primary, secondary) => {
      const trace = (key, color, axis) => ({
        x: data.dates,
        y: data[key],
        name: key,
        type: 'scatter',
        mode: 'lines+markers',
        connectgaps: true,
        line: { shape: 'linear', color },
        yaxis: axis,
      });

      const layout = {
        title: { text: title },
        margin: { t: 40 },
        xaxis: { type: 'date' },
        yaxis: { title: { text: primary }, rangemode: 'tozero' },
        yaxis2: { title: { text: secondary }, overlaying: 'y', side: 'right', rangemode: 'tozero' },
        legend: { orientation: 'h' },
      };

      Plotly.newPlot(
        target,
        [trace(primary, '{{PRIMARY_COLOR}}', 'y'), trace(secondary, '{{SECONDARY_COLOR}}', 'y2')],
        layout,
        { responsive: true },
      );
    };

    if (window.Plotly) {
      dualAxis('clones-chart', 'Clones vs unique cloners', 'clones', 'clones_uniques');
      dualAxis('views-chart', 'Views vs unique visitors', 'views', 'views_uniques');
    }

    const toggle = document.getElementById('daily-toggle');
    const daily = document.getElementById('daily');
    toggle.addEventListener('click', () => {
      const open = daily.style.display === 'block';
      daily.style.display = open ? 'none' : 'block';
      toggle.setAttribute('aria-expanded', String(!open));
    });
  </script>
</body>
</html>
"#;
