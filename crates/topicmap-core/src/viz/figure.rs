//! Plotly-compatible figure document.

use serde::Serialize;
use std::path::Path;

use crate::error::Result;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub size: f64,
}

/// One `scatter3d` trace: all visible points sharing a cluster label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter3d {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub legendgroup: String,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
    pub z: Vec<Option<f64>>,
    /// Display field shown on hover
    pub text: Vec<Option<String>>,
    /// Row position of each point in the enriched table
    pub customdata: Vec<usize>,
    pub hovertemplate: String,
    pub marker: Marker,
}

impl Scatter3d {
    pub(crate) fn new(label: &str, hover_field: &str, marker_size: f64) -> Self {
        Self {
            kind: "scatter3d",
            mode: "markers",
            name: label.to_string(),
            legendgroup: label.to_string(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            text: Vec::new(),
            customdata: Vec::new(),
            hovertemplate: format!(
                "{}=%{{text}}<br>x=%{{x}}<br>y=%{{y}}<br>z=%{{z}}<extra>{}</extra>",
                hover_field, label
            ),
            marker: Marker { size: marker_size },
        }
    }

    pub fn len(&self) -> usize {
        self.customdata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customdata.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneAxis {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub xaxis: SceneAxis,
    pub yaxis: SceneAxis,
    pub zaxis: SceneAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub legend: Legend,
    pub scene: Scene,
}

/// Rendering artifact: traces plus layout, serialisable as Plotly JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Scatter3d>,
    pub layout: Layout,
}

impl Figure {
    /// Total number of plotted points.
    pub fn n_points(&self) -> usize {
        self.data.iter().map(Scatter3d::len).sum()
    }

    /// Table rows that were plotted, ascending.
    pub fn row_indices(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .data
            .iter()
            .flat_map(|t| t.customdata.iter().copied())
            .collect();
        rows.sort_unstable();
        rows
    }

    /// Trace names (cluster labels) in legend order.
    pub fn labels(&self) -> Vec<&str> {
        self.data.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Standalone HTML page that draws the figure with plotly.js.
    pub fn to_html(&self) -> Result<String> {
        // Keep the JSON from closing the script element early.
        let json = self.to_json()?.replace("</", "<\\/");
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<script src="{src}"></script>
</head>
<body>
<div id="topicmap" style="width:{width}px;height:{height}px;"></div>
<script>
const figure = {json};
Plotly.newPlot("topicmap", figure.data, figure.layout);
</script>
</body>
</html>
"#,
            src = PLOTLY_JS,
            width = self.layout.width,
            height = self.layout.height,
            json = json
        ))
    }

    /// Write the figure to `path`: HTML for `.html`/`.htm`, JSON otherwise.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
        let body = if is_html { self.to_html()? } else { self.to_json()? };
        std::fs::write(path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn figure() -> Figure {
        let mut trace = Scatter3d::new("0", "title", 3.0);
        trace.x.push(Some(1.0));
        trace.y.push(Some(2.0));
        trace.z.push(Some(3.0));
        trace.text.push(Some("</script> first".to_string()));
        trace.customdata.push(0);
        let axis = |name: &str| SceneAxis {
            title: Title {
                text: name.to_string(),
            },
        };
        Figure {
            data: vec![trace],
            layout: Layout {
                width: 1000,
                height: 1000,
                legend: Legend {
                    title: Title {
                        text: "body_cluster".to_string(),
                    },
                },
                scene: Scene {
                    xaxis: axis("x"),
                    yaxis: axis("y"),
                    zaxis: axis("z"),
                },
            },
        }
    }

    #[test]
    fn export_writes_html_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topics.HTML");
        figure().export(&path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(PLOTLY_JS));
        // Hover text cannot close the script element.
        assert!(!html.contains("</script> first"));
        assert!(html.contains("<\\/script> first"));
    }

    #[test]
    fn export_writes_json_otherwise() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topics.json");
        figure().export(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["data"][0]["type"], "scatter3d");
        assert_eq!(json["data"][0]["customdata"][0], 0);
        assert_eq!(json["layout"]["scene"]["zaxis"]["title"]["text"], "z");
    }

    #[test]
    fn export_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("topics.json");
        assert!(matches!(
            figure().export(&path),
            Err(crate::error::PipelineError::Io(_))
        ));
    }
}
