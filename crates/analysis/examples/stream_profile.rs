//! Build a channel profile from a synthetic valley DEM.
//!
//! Clips the DEM to its valid extent, lays a hand-built channel path
//! along the valley floor (standing in for an external flow-routing
//! builder), attaches elevation and relief attributes, and prints the
//! longitudinal profile plus a few snapped and positional reads.

use thalweg_analysis::prelude::*;

/// A 12x16 DEM with a one-cell NaN border and a V-shaped valley whose
/// floor runs along row 6, dropping eastward.
fn synthetic_valley() -> Raster<f64> {
    let mut dem: Raster<f64> = Raster::filled(12, 16, f64::NAN);
    dem.set_transform(GeoTransform::new(330_000.0, 4_250_000.0, 30.0, -30.0));
    for row in 1..11 {
        for col in 1..15 {
            let floor = 420.0 - 6.0 * col as f64;
            let cross = (row as f64 - 6.0).abs() * 14.0;
            dem.set(row, col, floor + cross).unwrap();
        }
    }
    dem
}

fn main() -> Result<()> {
    let dem = synthetic_valley();

    let clipped = crop(&dem, &CropParams::default())?;
    let grid = &clipped.grid;
    println!(
        "Clipped DEM {}x{} -> {}x{}, origin ({:.0}, {:.0})",
        dem.rows(),
        dem.cols(),
        grid.rows(),
        grid.cols(),
        grid.transform().origin_x,
        grid.transform().origin_y,
    );

    // Channel along the valley floor: cropped row 5, head in the west,
    // outlet in the east, 30 m between nodes
    let cols = grid.cols();
    let positions: Vec<usize> = (0..cols).map(|col| 5 * cols + col).collect();
    let downstream: Vec<Option<usize>> = (0..cols)
        .map(|node| if node + 1 < cols { Some(node + 1) } else { None })
        .collect();
    let distance: Vec<f64> = (0..cols)
        .map(|node| (cols - 1 - node) as f64 * 30.0)
        .collect();
    let network = StreamNetwork::new(grid, positions.clone(), downstream, distance.clone())?;

    // Relief above the grid minimum as a second attribute column
    let stats = grid.statistics();
    let floor = stats.min.unwrap_or(0.0);
    let mut relief = grid.like(0.0);
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let value = grid.get(row, col)?;
            relief.set(row, col, value - floor)?;
        }
    }
    let attrs = NodeAttributeList::from_grids(&[grid, &relief], &network)?;

    println!("\nLongitudinal profile (head at {} m):", distance[0]);
    println!("{:>10} {:>12} {:>10}", "dist [m]", "elev [m]", "relief");
    let step = 60.0;
    let samples = (distance[0] / step) as usize + 1;
    let queries: Vec<f64> = (0..samples).map(|i| i as f64 * step).collect();
    let profile = node_values(
        &network,
        &attrs,
        &NodeValuesParams {
            query: NodeQuery::ByDistance(queries.clone()),
        },
    )?;
    for (i, &d) in queries.iter().enumerate() {
        println!(
            "{:>10.1} {:>12.2} {:>10.2}",
            d,
            profile.values[(i, 0)],
            profile.values[(i, 1)],
        );
    }

    // Field sites: one next to the channel, one well outside it
    let sites = vec![(330_160.0, 4_249_810.0), (330_400.0, 4_249_650.0)];
    let snapped = node_values(
        &network,
        &attrs,
        &NodeValuesParams {
            query: NodeQuery::ByCoordinate(sites.clone()),
        },
    )?;
    println!("\nSnapped field sites:");
    for (i, &(x, y)) in sites.iter().enumerate() {
        println!(
            "  ({:.0}, {:.0}) -> elev {:.2}",
            x,
            y,
            snapped.values[(i, 0)],
        );
    }
    for diagnostic in &snapped.diagnostics {
        let QueryDiagnostic::SnapBeyondTolerance {
            worst_residual,
            tolerance,
        } = diagnostic;
        println!(
            "  warning: worst snap residual {:.1} m exceeds tolerance {:.1} m",
            worst_residual, tolerance
        );
    }

    // Snap alternatives for the first site
    let locator = NodeLocator::build(&network);
    println!("\nNearest nodes to site 1:");
    for snap in locator.k_nearest(sites[0].0, sites[0].1, 3) {
        println!(
            "  position {:>3} at ({:.0}, {:.0}), {:.1} m away",
            snap.node.position,
            snap.node.x,
            snap.node.y,
            snap.residual(),
        );
    }

    // Head and outlet read back by grid position
    let ends = node_values(
        &network,
        &attrs,
        &NodeValuesParams {
            query: NodeQuery::ByPosition(vec![positions[0], positions[cols - 1]]),
        },
    )?;
    println!(
        "\nHead elevation {:.2}, outlet elevation {:.2}",
        ends.values[(0, 0)],
        ends.values[(1, 0)],
    );

    Ok(())
}
