//! Grid survey shared by the resistivity and GPR tools: a single rectangular
//! anomaly patch planted against a uniform background.

use crate::ingest::table::{parse_table, write_table, HeaderSpec};
use crate::model::DataSet;
use crate::prelude::{Observation, SurveyResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Relative background jitter; background values stay below `base * (1 + BACKGROUND_JITTER)`.
pub const BACKGROUND_JITTER: f64 = 0.1;
/// Extra multiple of the baseline added inside the patch.
pub const ANOMALY_CONTRAST: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoint {
    pub horizontal: f64,
    pub vertical: f64,
    pub value: f64,
}

impl SpatialPoint {
    pub fn new(horizontal: f64, vertical: f64, value: f64) -> Self {
        Self {
            horizontal,
            vertical,
            value,
        }
    }
}

impl Observation for SpatialPoint {
    fn value(&self) -> f64 {
        self.value
    }

    fn placement(&self) -> (f64, f64) {
        (self.horizontal, self.vertical)
    }
}

/// Rectangle in fractional survey coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyPatch {
    pub horizontal: (f64, f64),
    pub vertical: (f64, f64),
}

/// Middle third horizontally, shallow-to-mid depth band.
pub const CENTRAL_PATCH: AnomalyPatch = AnomalyPatch {
    horizontal: (1.0 / 3.0, 2.0 / 3.0),
    vertical: (0.2, 0.6),
};

impl AnomalyPatch {
    pub fn contains(&self, horizontal: f64, vertical: f64) -> bool {
        (self.horizontal.0..=self.horizontal.1).contains(&horizontal)
            && (self.vertical.0..=self.vertical.1).contains(&vertical)
    }
}

/// Layout of a generated grid: `columns` positions by `rows` depth/time levels.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub columns: usize,
    pub rows: usize,
    pub column_step: f64,
    pub row_step: f64,
}

pub fn background_ceiling(base: f64) -> f64 {
    base * (1.0 + BACKGROUND_JITTER)
}

fn plant<R: Rng + ?Sized>(rng: &mut R, base: f64, inside: bool) -> f64 {
    let offset = if inside { ANOMALY_CONTRAST } else { 0.0 };
    base * (1.0 + offset + rng.gen_range(0.0..BACKGROUND_JITTER))
}

/// Emits `columns * rows` points, column-major; rows start one step below the surface.
pub fn planted_grid<R: Rng + ?Sized>(grid: GridSpec, base: f64, rng: &mut R) -> DataSet<SpatialPoint> {
    let last_column = grid.columns.saturating_sub(1).max(1) as f64;
    let mut points = Vec::with_capacity(grid.columns * grid.rows);
    for column in 0..grid.columns {
        let fx = column as f64 / last_column;
        for row in 1..=grid.rows {
            let fv = row as f64 / grid.rows as f64;
            let value = plant(rng, base, CENTRAL_PATCH.contains(fx, fv));
            points.push(SpatialPoint::new(
                column as f64 * grid.column_step,
                row as f64 * grid.row_step,
                value,
            ));
        }
    }
    DataSet::new(points)
}

pub fn ingest_spatial(content: &str) -> SurveyResult<DataSet<SpatialPoint>> {
    let table = parse_table(content, HeaderSpec::Positional(3))?;
    Ok(table
        .rows
        .into_iter()
        .map(|row| SpatialPoint::new(row.values[0], row.values[1], row.values[2]))
        .collect())
}

pub fn export_spatial(data: &DataSet<SpatialPoint>, header: &[&str; 3]) -> String {
    write_table(
        header,
        data.iter().map(|p| vec![p.horizontal, p.vertical, p.value]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn patch_bounds_are_inclusive() {
        assert!(CENTRAL_PATCH.contains(1.0 / 3.0, 0.2));
        assert!(CENTRAL_PATCH.contains(2.0 / 3.0, 0.6));
        assert!(!CENTRAL_PATCH.contains(0.0, 0.5));
        assert!(!CENTRAL_PATCH.contains(0.5, 0.9));
    }

    #[test]
    fn smallest_grid_still_hits_the_patch() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = GridSpec {
            columns: 4,
            rows: 2,
            column_step: 1.0,
            row_step: 1.0,
        };
        let data = planted_grid(grid, 10.0, &mut rng);
        assert_eq!(data.len(), 8);
        assert!(data.iter().any(|p| p.value > background_ceiling(10.0)));
    }

    #[test]
    fn ingest_reads_any_three_column_header() {
        let data = ingest_spatial("x,y,z\n0,0,10\n1,2,30\n").unwrap();
        assert_eq!(
            data.points(),
            &[SpatialPoint::new(0.0, 0.0, 10.0), SpatialPoint::new(1.0, 2.0, 30.0)]
        );
    }
}
