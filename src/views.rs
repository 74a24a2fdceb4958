//! HTML pages. Everything interpolated here passes through [`escape_html`]
//! first, since filenames and error messages come from the client.

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";
const D3_JS: &str = "https://d3js.org/d3.v7.min.js";

/// Values the result page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub label: String,
    pub infected_pct: f64,
    pub original_url: String,
    pub mask_url: String,
}

impl ResultView {
    /// Label as shown to people: `Tomato_Blight` -> `Tomato Blight`.
    pub fn display_label(&self) -> String {
        self.label.replace('_', " ")
    }

    /// Percentage clamped to the gauge's 0-100 sweep.
    pub fn gauge_pct(&self) -> f64 {
        self.infected_pct.clamp(0.0, 100.0)
    }

    /// Text drawn in the middle of the gauge, one decimal place.
    pub fn gauge_text(&self) -> String {
        format!("{:.1}%", self.gauge_pct())
    }
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn upload_page(error: Option<&str>) -> String {
    let alert = match error {
        Some(message) => format!(
            r#"<div class="alert alert-danger mt-3" role="alert">{}</div>"#,
            escape_html(message)
        ),
        None => String::new(),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
  <title>Plant Disease Detection</title>
  <link href="{css}" rel="stylesheet">
</head>
<body class="bg-light">
  <div class="container py-5">
    <div class="card mx-auto" style="max-width:420px;">
      <div class="card-body text-center">
        <h3 class="card-title text-success mb-4">Plant Disease Detection</h3>
        <form method="post" enctype="multipart/form-data">
          <input class="form-control mb-3" type="file" name="image" accept=".jpg,.jpeg,.png">
          <button class="btn btn-success w-100">Lookup</button>
        </form>
        {alert}
      </div>
    </div>
    <p class="text-center text-muted mt-4">
      Made by Rameen Babar, Arisha Khan, Batool Rizvi
    </p>
  </div>
</body>
</html>
"#,
        css = BOOTSTRAP_CSS,
        alert = alert,
    )
}

pub fn result_page(view: &ResultView) -> String {
    // {:?} on f64 always yields a valid JS number literal for finite values
    let pct = format!("{:?}", view.gauge_pct());
    // JSON string literal, then escaped so it can't close the script element
    let gauge_text = serde_json::to_string(&view.gauge_text())
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c");

    format!(
        r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
  <title>Lookup Result</title>
  <link href="{css}" rel="stylesheet">
  <script src="{d3}"></script>
</head>
<body class="bg-light">
  <div class="container py-5">
    <div class="card mx-auto" style="max-width:800px;">
      <div class="card-header bg-success text-white">
        <h4 class="mb-0">Computed Infection Result</h4>
      </div>
      <div class="card-body">
        <div class="mb-4 text-center">
          <h5>Disease: <span class="text-danger">{label}</span></h5>
        </div>
        <div class="row gx-4">
          <div class="col-md-4 text-center">
            <h6>Original Leaf</h6>
            <img src="{orig_url}" class="img-fluid rounded border" alt="Input">
          </div>
          <div class="col-md-4 text-center">
            <h6>Lesion Mask</h6>
            <img src="{mask_url}" class="img-fluid rounded border" alt="Mask">
          </div>
          <div class="col-md-4 text-center">
            <h6>Infection Gauge</h6>
            <div id="gauge" data-pct="{pct}"><noscript>{gauge_plain}</noscript></div>
          </div>
        </div>
        <div class="text-center mt-4">
          <a href="/" class="btn btn-primary">Analyze Another</a>
        </div>
      </div>
    </div>
  </div>

  <script>
const pct = {pct};
const gaugeText = {gauge_text};
const width = 200, height = 120;
const twoPi = 2 * Math.PI;
const arc = d3.arc()
  .startAngle(-Math.PI / 2)
  .endAngle(-Math.PI / 2 + twoPi * pct / 100)
  .innerRadius(50)
  .outerRadius(70);

const svg = d3.select("#gauge")
  .append("svg")
    .attr("width", width).attr("height", height)
  .append("g")
    .attr("transform", `translate(${{width / 2}},${{height}})`);

svg.append("path")
    .attr("d", arc)
    .attr("fill", "tomato");

svg.append("text")
    .attr("text-anchor", "middle")
    .attr("dy", "-0.5em")
    .style("font-size", "1.2em")
    .text(gaugeText);
  </script>
</body>
</html>
"##,
        css = BOOTSTRAP_CSS,
        d3 = D3_JS,
        label = escape_html(&view.display_label()),
        orig_url = escape_html(&view.original_url),
        mask_url = escape_html(&view.mask_url),
        pct = pct,
        gauge_text = gauge_text,
        gauge_plain = escape_html(&view.gauge_text()),
    )
}
