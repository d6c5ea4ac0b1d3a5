//! Trilinear interpolation on a Grid3D.
//!
//! Backs the level-set stopping criterion: the criterion samples a signed
//! scalar on a regular grid and the trace terminates where the interpolated
//! value turns negative.

use ndarray::Array3;
use orbit_types::state::Grid3D;

/// Trilinear interpolation of `values` (shape `[nx, ny, nz]`) at `(x, y, z)`.
/// Clamps to the grid boundary outside the domain.
pub fn interp3d(values: &Array3<f64>, grid: &Grid3D, x: f64, y: f64, z: f64) -> f64 {
    let fx = (x - grid.x[0]) / grid.dx;
    let fy = (y - grid.y[0]) / grid.dy;
    let fz = (z - grid.z[0]) / grid.dz;

    let ix0 = (fx.floor() as isize).clamp(0, (grid.nx as isize) - 2) as usize;
    let iy0 = (fy.floor() as isize).clamp(0, (grid.ny as isize) - 2) as usize;
    let iz0 = (fz.floor() as isize).clamp(0, (grid.nz as isize) - 2) as usize;

    let tx = (fx - ix0 as f64).clamp(0.0, 1.0);
    let ty = (fy - iy0 as f64).clamp(0.0, 1.0);
    let tz = (fz - iz0 as f64).clamp(0.0, 1.0);

    let mut out = 0.0;
    for (cx, wx) in [(ix0, 1.0 - tx), (ix0 + 1, tx)] {
        for (cy, wy) in [(iy0, 1.0 - ty), (iy0 + 1, ty)] {
            for (cz, wz) in [(iz0, 1.0 - tz), (iz0 + 1, tz)] {
                out += wx * wy * wz * values[[cx, cy, cz]];
            }
        }
    }
    out
}
