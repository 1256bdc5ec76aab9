//! Data handlers applied after parsing

use crate::Result;
use std::marker::PhantomData;

/// One table row as cell strings
pub type Row = Vec<String>;

/// Post-processes parsed content into the crawl result
pub trait DataHandler: Send + Sync {
    type Input;
    type Output;

    fn process(&self, parsed: Self::Input) -> Result<Self::Output>;
}

/// Returns parsed content unchanged
pub struct PassThrough<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PassThrough<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PassThrough<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DataHandler for PassThrough<T> {
    type Input = T;
    type Output = T;

    fn process(&self, parsed: T) -> Result<T> {
        Ok(parsed)
    }
}

/// Normalizes table rows
///
/// Cells are trimmed and numeric cells lose their thousands separators
/// (`"1,050.5"` becomes `"1050.5"`). Non-numeric cells such as dates or
/// names keep their text. With `skip_header` the first row is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowHandler {
    skip_header: bool,
}

impl RowHandler {
    pub fn new(skip_header: bool) -> Self {
        Self { skip_header }
    }
}

fn normalize_cell(cell: &str) -> String {
    let trimmed = cell.trim();
    let stripped: String = trimmed.chars().filter(|c| *c != ',').collect();

    if stripped.len() != trimmed.len() && stripped.parse::<f64>().is_ok() {
        stripped
    } else {
        trimmed.to_string()
    }
}

impl DataHandler for RowHandler {
    type Input = Vec<Row>;
    type Output = Vec<Row>;

    fn process(&self, rows: Vec<Row>) -> Result<Vec<Row>> {
        let skip = usize::from(self.skip_header);

        Ok(rows
            .into_iter()
            .skip(skip)
            .map(|row| row.iter().map(|cell| normalize_cell(cell)).collect())
            .collect())
    }
}
