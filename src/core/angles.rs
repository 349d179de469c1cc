//! Coarse angle grids: parsing, detector reduction, edge gap-fill and bilinear upsampling
//! to the full pixel grid of a tile.
use ndarray::{Array2, ArrayViewMut1, Axis, Zip};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::xml::parse_number;

/// Parse `VALUES` rows (whitespace-separated numbers, `NaN` allowed) into a grid
pub fn parse_values_rows<S: AsRef<str>>(rows: &[S]) -> Result<Array2<f64>> {
    let mut values = Vec::new();
    let mut ncols = None;
    for row in rows {
        let parsed = row
            .as_ref()
            .split_whitespace()
            .map(|v| parse_number::<f64>(v, "Values_List/VALUES"))
            .collect::<Result<Vec<f64>>>()?;
        match ncols {
            None => ncols = Some(parsed.len()),
            Some(n) if n != parsed.len() => {
                return Err(Error::missing(format!(
                    "Values_List/VALUES (ragged rows: {} and {} values)",
                    n,
                    parsed.len()
                )));
            }
            Some(_) => {}
        }
        values.extend(parsed);
    }
    let ncols = ncols.unwrap_or(0);
    Array2::from_shape_vec((rows.len(), ncols), values)
        .map_err(|e| Error::Processing(format!("angle grid shape: {}", e)))
}

/// Element-wise mean over equally shaped grids, ignoring NaN entries.
/// Cells that are NaN in every grid stay NaN.
pub fn nanmean_stack(grids: &[Array2<f64>]) -> Result<Array2<f64>> {
    let first = grids
        .first()
        .ok_or_else(|| Error::Processing("no detector grids to reduce".to_string()))?;
    let shape = first.dim();
    if let Some(bad) = grids.iter().find(|g| g.dim() != shape) {
        return Err(Error::Processing(format!(
            "detector grids differ in shape: {:?} vs {:?}",
            shape,
            bad.dim()
        )));
    }

    let mut sum = Array2::<f64>::zeros(shape);
    let mut count = Array2::<u32>::zeros(shape);
    for grid in grids {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(grid)
            .for_each(|s, c, &v| {
                if !v.is_nan() {
                    *s += v;
                    *c += 1;
                }
            });
    }
    Ok(Zip::from(&sum)
        .and(&count)
        .map_collect(|&s, &c| if c == 0 { f64::NAN } else { s / c as f64 }))
}

fn fill_forward(mut lane: ArrayViewMut1<f64>) {
    let mut last = f64::NAN;
    for v in lane.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

fn fill_backward(mut lane: ArrayViewMut1<f64>) {
    let mut next = f64::NAN;
    for v in lane.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Repair missing values at swath edges.
///
/// Within each row: forward-fill, then backward-fill. Then within each column: forward-fill,
/// then backward-fill. The order matters: the column pass fills rows that had no value at all.
pub fn fill_edge_gaps(grid: &Array2<f64>) -> Array2<f64> {
    let mut out = grid.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        fill_forward(row.view_mut());
        fill_backward(row.view_mut());
    }
    for mut col in out.axis_iter_mut(Axis(1)) {
        fill_forward(col.view_mut());
        fill_backward(col.view_mut());
    }
    out
}

/// Map an output index onto the coarse axis: `i / (n_out - 1) * (n_coarse - 1)`.
/// A single output sample maps to coordinate 0.
#[inline]
fn coarse_coordinate(i: usize, n_out: usize, n_coarse: usize) -> f64 {
    if n_out <= 1 || n_coarse <= 1 {
        return 0.0;
    }
    // Multiply first so aligned samples land on exact integers
    (i * (n_coarse - 1)) as f64 / (n_out - 1) as f64
}

/// Bilinear interpolation of `grid` at fractional index `(y, x)`
pub fn bilinear_at(grid: &Array2<f64>, y: f64, x: f64) -> f64 {
    let (nrows, ncols) = grid.dim();
    if nrows == 0 || ncols == 0 {
        return f64::NAN;
    }
    let y0 = (y.floor().max(0.0) as usize).min(nrows - 1);
    let x0 = (x.floor().max(0.0) as usize).min(ncols - 1);
    let y1 = (y0 + 1).min(nrows - 1);
    let x1 = (x0 + 1).min(ncols - 1);
    let fy = (y - y0 as f64).clamp(0.0, 1.0);
    let fx = (x - x0 as f64).clamp(0.0, 1.0);

    let v00 = grid[[y0, x0]];
    // Skip neighbours that carry zero weight so an exact hit never mixes in a far value.
    let top = if fx == 0.0 {
        v00
    } else {
        v00 * (1.0 - fx) + grid[[y0, x1]] * fx
    };
    if fy == 0.0 {
        return top;
    }
    let bottom = if fx == 0.0 {
        grid[[y1, x0]]
    } else {
        grid[[y1, x0]] * (1.0 - fx) + grid[[y1, x1]] * fx
    };
    top * (1.0 - fy) + bottom * fy
}

/// Upsample a gap-filled coarse grid to `rows x cols`, evaluating cells in parallel
pub fn interpolate_to_grid(coarse: &Array2<f64>, rows: usize, cols: usize) -> Array2<f64> {
    let (crows, ccols) = coarse.dim();
    debug!(
        "Interpolating {}x{} angle grid to {}x{}",
        crows, ccols, rows, cols
    );
    let mut out = Array2::<f64>::zeros((rows, cols));
    Zip::indexed(&mut out).par_for_each(|(i, j), v| {
        let y = coarse_coordinate(i, rows, crows);
        let x = coarse_coordinate(j, cols, ccols);
        *v = bilinear_at(coarse, y, x);
    });
    out
}

/// Full pipeline from a raw coarse grid: gap-fill, then upsample
pub fn upsample_angles(coarse: &Array2<f64>, rows: usize, cols: usize) -> Array2<f64> {
    let filled = fill_edge_gaps(coarse);
    interpolate_to_grid(&filled, rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    const NAN: f64 = f64::NAN;

    #[test]
    fn parses_rows_with_nan() {
        let grid = parse_values_rows(&["1 2 NaN", " 4.5 5 6 "]).unwrap();
        assert_eq!(grid.dim(), (2, 3));
        assert!(grid[[0, 2]].is_nan());
        assert_eq!(grid[[1, 0]], 4.5);
    }

    #[test]
    fn rejects_ragged_or_non_numeric_rows() {
        assert!(matches!(parse_values_rows(&["1 2", "3"]), Err(Error::MetadataMissing(_))));
        assert!(matches!(parse_values_rows(&["1 x"]), Err(Error::MetadataMissing(_))));
    }

    #[test]
    fn nanmean_ignores_missing_detectors() {
        let a = array![[1.0, NAN], [3.0, NAN]];
        let b = array![[3.0, 5.0], [NAN, NAN]];
        let mean = nanmean_stack(&[a, b]).unwrap();
        assert_eq!(mean[[0, 0]], 2.0);
        assert_eq!(mean[[0, 1]], 5.0);
        assert_eq!(mean[[1, 0]], 3.0);
        assert!(mean[[1, 1]].is_nan());
    }

    #[test]
    fn nanmean_rejects_mismatched_shapes() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((2, 3));
        assert!(nanmean_stack(&[a, b]).is_err());
        assert!(nanmean_stack(&[]).is_err());
    }

    #[test]
    fn gap_fill_order() {
        let grid = array![
            [NAN, NAN, NAN],
            [NAN, 2.0, NAN],
            [1.0, NAN, 3.0],
        ];
        let filled = fill_edge_gaps(&grid);
        // Row pass: [NaN,NaN,NaN], [2,2,2], [1,1,3]; column pass fills the empty first row.
        assert_eq!(filled, array![[2.0, 2.0, 2.0], [2.0, 2.0, 2.0], [1.0, 1.0, 3.0]]);
    }

    #[test]
    fn gap_fill_is_idempotent() {
        let grid = array![
            [NAN, 10.0, 11.0, NAN],
            [NAN, NAN, 12.0, 13.0],
            [NAN, NAN, NAN, NAN],
            [20.0, NAN, NAN, 23.0],
        ];
        let once = fill_edge_gaps(&grid);
        assert!(once.iter().all(|v| !v.is_nan()));
        assert_eq!(fill_edge_gaps(&once), once);
    }

    #[test]
    fn all_nan_grid_stays_nan() {
        let grid = Array2::from_elem((2, 2), NAN);
        let out = upsample_angles(&grid, 3, 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn interpolation_is_exact_on_coarse_points() {
        let coarse = array![[10.0, 20.0, 30.0], [40.0, 50.0, 60.0], [70.0, 80.0, 90.0]];
        // 5 samples over 3 coarse points: even indices align with coarse nodes
        let out = interpolate_to_grid(&coarse, 5, 5);
        for ci in 0..3 {
            for cj in 0..3 {
                assert_abs_diff_eq!(out[[ci * 2, cj * 2]], coarse[[ci, cj]], epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(out[[1, 1]], 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[[0, 1]], 15.0, epsilon = 1e-12);
    }

    #[test]
    fn interpolation_has_no_nan_after_gap_fill() {
        let coarse = array![[NAN, 1.0, 2.0], [3.0, NAN, 5.0], [6.0, 7.0, NAN]];
        let out = upsample_angles(&coarse, 11, 7);
        assert_eq!(out.dim(), (11, 7));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn degenerate_outputs() {
        let coarse = array![[1.0, 2.0], [3.0, 4.0]];
        let row = interpolate_to_grid(&coarse, 1, 3);
        assert_eq!(row.dim(), (1, 3));
        assert_abs_diff_eq!(row[[0, 0]], 1.0);
        assert_abs_diff_eq!(row[[0, 1]], 1.5);
        assert_abs_diff_eq!(row[[0, 2]], 2.0);

        let col = interpolate_to_grid(&coarse, 3, 1);
        assert_abs_diff_eq!(col[[1, 0]], 2.0);

        assert_eq!(interpolate_to_grid(&coarse, 0, 4).dim(), (0, 4));
    }
}
