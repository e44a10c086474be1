//! Visualization prep and 3D scatter rendering.

mod figure;

pub use figure::{Figure, Layout, Legend, Marker, Scatter3d, Scene, SceneAxis, Title};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::NOISE_LABEL;
use crate::error::{PipelineError, Result};
use crate::merge::{axis_names, merge_coordinates};
use crate::reduce::Coordinates;
use crate::table::Table;

/// Attach reduced coordinates to the working table; the result is the
/// enriched table used for plotting.
pub fn prep_for_viz(table: Table, coordinates: &Coordinates) -> Result<Table> {
    merge_coordinates(table, coordinates)
}

/// Options for [`make_3d_scatter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Plot unassigned (`-1`) points as well
    pub unclustered: bool,
    /// Column shown on hover
    pub hover_field: String,
    pub width: u32,
    pub height: u32,
    pub marker_size: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            unclustered: false,
            hover_field: "title".to_string(),
            width: 1000,
            height: 1000,
            marker_size: 3.0,
        }
    }
}

/// Rows that a render would show. With `unclustered == false`, rows labelled
/// `"-1"` or with no label are left out. The table itself is never modified.
pub fn visible_rows(table: &Table, cluster_column: &str, unclustered: bool) -> Result<Vec<usize>> {
    let labels = table.text(cluster_column)?;
    Ok(labels
        .iter()
        .enumerate()
        .filter(|(_, label)| unclustered || !is_unassigned(label.as_deref()))
        .map(|(i, _)| i)
        .collect())
}

/// Noise and missing labels both mean "no topic".
fn is_unassigned(label: Option<&str>) -> bool {
    label.map_or(true, |l| l.parse::<i32>() == Ok(NOISE_LABEL))
}

/// Render the enriched table as a 3D scatter: coordinates to position, the
/// cluster label to a discrete color (one trace per label), the hover field
/// to inspection text.
pub fn make_3d_scatter(
    table: &Table,
    cluster_column: &str,
    options: &RenderOptions,
) -> Result<Figure> {
    let [xs, ys, zs] = resolve_axes(table)?;
    let (x, y, z) = (table.numbers(&xs)?, table.numbers(&ys)?, table.numbers(&zs)?);
    let labels = table.text(cluster_column)?;
    let hover = table.require(&options.hover_field)?;

    let rows = visible_rows(table, cluster_column, options.unclustered)?;
    debug!(
        "Rendering {} of {} rows (unclustered={})",
        rows.len(),
        table.n_rows(),
        options.unclustered
    );

    let noise = NOISE_LABEL.to_string();
    let mut traces: Vec<Scatter3d> = Vec::new();
    for row in rows {
        let label = labels[row].as_deref().unwrap_or(noise.as_str());
        let index = match traces.iter().position(|t| t.name == label) {
            Some(i) => i,
            None => {
                traces.push(Scatter3d::new(
                    label,
                    &options.hover_field,
                    options.marker_size,
                ));
                traces.len() - 1
            }
        };
        let trace = &mut traces[index];
        trace.x.push(x[row]);
        trace.y.push(y[row]);
        trace.z.push(z[row]);
        trace.text.push(hover.display(row));
        trace.customdata.push(row);
    }

    Ok(Figure {
        data: traces,
        layout: Layout {
            width: options.width,
            height: options.height,
            legend: Legend {
                title: Title {
                    text: cluster_column.to_string(),
                },
            },
            scene: Scene {
                xaxis: SceneAxis { title: Title { text: xs } },
                yaxis: SceneAxis { title: Title { text: ys } },
                zaxis: SceneAxis { title: Title { text: zs } },
            },
        },
    })
}

/// `x`/`y`/`z`, or the first three `axis_N` columns of a wider merge.
fn resolve_axes(table: &Table) -> Result<[String; 3]> {
    let candidates = [axis_names(3), axis_names(4)];
    for names in &candidates {
        if names[..3].iter().all(|n| table.contains(n)) {
            return Ok([names[0].clone(), names[1].clone(), names[2].clone()]);
        }
    }
    let missing = candidates[0]
        .iter()
        .find(|n| !table.contains(n))
        .cloned()
        .unwrap_or_default();
    Err(PipelineError::MissingColumn(missing))
}
