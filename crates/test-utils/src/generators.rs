//! Test data generators for gridded datasets.
//!
//! Every generator produces predictable values so a test can check what it
//! reads back without keeping the written data around.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use gridded_io::{Gpi, Image, Table, Value};

/// Creates a static table with one row per grid point.
///
/// Row `i` has `gpi = i` and `data = 100 + i`.
///
/// # Example
///
/// ```
/// use test_utils::create_static_table;
///
/// let table = create_static_table(100);
/// assert_eq!(table.len(), 100);
/// assert_eq!(table.index_name(), "gpi");
/// ```
pub fn create_static_table(rows: usize) -> Table {
    let gpis: Vec<Value> = (0..rows as i64).map(Value::Int).collect();
    let data: Vec<Value> = (0..rows as i64).map(|i| Value::Int(100 + i)).collect();
    Table::new("gpi", gpis)
        .with_column("data", data)
        .expect("generated columns have equal length")
}

/// Daily timestamps starting at midnight of `start`.
pub fn daily_dates(start: NaiveDate, count: usize) -> Vec<NaiveDateTime> {
    let midnight = start.and_hms_opt(0, 0, 0).expect("midnight is valid");
    (0..count as i64)
        .map(|day| midnight + Duration::days(day))
        .collect()
}

/// Creates a time series table indexed by daily dates from `start`.
///
/// `blocks` holds `(gpi, first_row)` pairs. Row `r` belongs to the last
/// block whose `first_row <= r`; rows before the first block get gpi 0.
/// The `data` column holds `r * 0.5`.
pub fn create_timeseries_table(start: NaiveDate, rows: usize, blocks: &[(Gpi, usize)]) -> Table {
    let dates = daily_dates(start, rows).into_iter().map(Value::Time).collect();
    let gpis = (0..rows)
        .map(|r| {
            let gpi = blocks
                .iter()
                .filter(|(_, first)| *first <= r)
                .last()
                .map(|(gpi, _)| *gpi)
                .unwrap_or(0);
            Value::Int(gpi as i64)
        })
        .collect();
    let data = (0..rows).map(|r| Value::Float(r as f64 * 0.5)).collect();

    Table::new("", dates)
        .with_column("gpi", gpis)
        .and_then(|t| t.with_column("data", data))
        .expect("generated columns have equal length")
}

/// The standard 100 day series used across the test suite.
///
/// Starts 2007-01-01. Rows 0..10 are gpi 1, 10..20 gpi 2, 20..30 gpi 3 and
/// the rest gpi 4.
pub fn create_standard_timeseries() -> Table {
    let start = NaiveDate::from_ymd_opt(2007, 1, 1).expect("valid date");
    create_timeseries_table(start, 100, &[(1, 0), (2, 10), (3, 20), (4, 30)])
}

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, in row-major order.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates an image over [`create_test_grid`] values.
pub fn create_test_image(width: usize, height: usize) -> Image {
    Image::new(create_test_grid(width, height), width, height)
        .expect("generated grid matches its shape")
}

/// Creates an image with a NaN at every `nth` position, like gaps in a
/// satellite swath.
pub fn create_image_with_gaps(width: usize, height: usize, nth: usize) -> Image {
    let mut data = create_test_grid(width, height);
    for (i, value) in data.iter_mut().enumerate() {
        if nth > 0 && i % nth == 0 {
            *value = f32::NAN;
        }
    }
    Image::new(data, width, height).expect("generated grid matches its shape")
}
