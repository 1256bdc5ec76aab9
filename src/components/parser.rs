//! Response parsers
//!
//! A parser decides what a response means. [`ResponseParser::parse_content`]
//! routes a response with status exactly 200 to `handling_200_response`
//! and everything else to `handling_not_200_response`.

use super::handler::Row;
use super::http::HttpResponse;
use crate::{ConfigError, CrawlError, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Turns a transport response into parsed content
pub trait ResponseParser: Send + Sync {
    type Response;
    type Output;

    fn get_status_code(&self, response: &Self::Response) -> u16;

    fn handling_200_response(&self, response: Self::Response) -> Result<Self::Output>;

    fn handling_not_200_response(&self, response: Self::Response) -> Result<Self::Output>;

    /// Dispatches on the status code. Only 200 counts as success here;
    /// 201 or 204 go to the not-200 branch.
    fn parse_content(&self, response: Self::Response) -> Result<Self::Output> {
        if self.get_status_code(&response) == 200 {
            self.handling_200_response(response)
        } else {
            self.handling_not_200_response(response)
        }
    }
}

fn unexpected_status(response: &HttpResponse) -> CrawlError {
    CrawlError::UnexpectedStatus {
        url: response.url.clone(),
        status: response.status,
    }
}

/// Parses the response body as a JSON document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ResponseParser for JsonParser {
    type Response = HttpResponse;
    type Output = Value;

    fn get_status_code(&self, response: &HttpResponse) -> u16 {
        response.status
    }

    fn handling_200_response(&self, response: HttpResponse) -> Result<Value> {
        serde_json::from_str(&response.body).map_err(|e| CrawlError::Parse {
            url: response.url,
            message: e.to_string(),
        })
    }

    fn handling_not_200_response(&self, response: HttpResponse) -> Result<Value> {
        Err(unexpected_status(&response))
    }
}

/// Extracts table-like rows from a JSON document
///
/// `field` names the member holding the rows (a `/`-separated path is
/// accepted, e.g. `data/items`). Without a field the document itself must
/// be the array. Array rows become their cells, object rows their values,
/// scalars a single cell.
#[derive(Debug, Clone, Default)]
pub struct JsonRowsParser {
    field: Option<String>,
}

impl JsonRowsParser {
    pub fn new(field: Option<String>) -> Self {
        Self { field }
    }

    fn locate<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        match &self.field {
            None => Some(document),
            Some(field) => field
                .split('/')
                .filter(|segment| !segment.is_empty())
                .try_fold(document, |value, segment| value.get(segment)),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_row(value: &Value) -> Row {
    match value {
        Value::Array(cells) => cells.iter().map(cell_text).collect(),
        Value::Object(map) => map.values().map(cell_text).collect(),
        scalar => vec![cell_text(scalar)],
    }
}

impl ResponseParser for JsonRowsParser {
    type Response = HttpResponse;
    type Output = Vec<Row>;

    fn get_status_code(&self, response: &HttpResponse) -> u16 {
        response.status
    }

    fn handling_200_response(&self, response: HttpResponse) -> Result<Vec<Row>> {
        let url = response.url.clone();
        let document = JsonParser.handling_200_response(response)?;

        let rows = self
            .locate(&document)
            .and_then(Value::as_array)
            .ok_or_else(|| CrawlError::Parse {
                url,
                message: match &self.field {
                    Some(field) => format!("field '{}' is not an array", field),
                    None => "document is not an array".to_string(),
                },
            })?;

        Ok(rows.iter().map(json_row).collect())
    }

    fn handling_not_200_response(&self, response: HttpResponse) -> Result<Vec<Row>> {
        Err(unexpected_status(&response))
    }
}

/// Default selector for table rows
pub const DEFAULT_ROW_SELECTOR: &str = "table tr";

const CELL_SELECTOR: &str = "td, th";

/// Extracts the cells of HTML table rows
///
/// Every element matched by the row selector becomes one row holding the
/// whitespace-trimmed text of its `td`/`th` cells. Rows without cells are
/// skipped.
#[derive(Debug, Clone)]
pub struct HtmlTableParser {
    rows: Selector,
    cells: Selector,
}

impl HtmlTableParser {
    /// Creates a parser matching rows with `selector`
    ///
    /// # Errors
    ///
    /// Returns a validation error if `selector` is not valid CSS.
    pub fn new(selector: &str) -> Result<Self> {
        let rows = parse_selector(selector)?;
        let cells = parse_selector(CELL_SELECTOR)?;
        Ok(Self { rows, cells })
    }

    /// Parses an HTML document into rows
    pub fn extract_rows(&self, html: &str) -> Vec<Row> {
        let document = Html::parse_document(html);

        document
            .select(&self.rows)
            .map(|row| self.row_cells(row))
            .filter(|cells| !cells.is_empty())
            .collect()
    }

    fn row_cells(&self, row: ElementRef<'_>) -> Row {
        row.select(&self.cells)
            .map(|cell| {
                cell.text()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("invalid CSS selector '{}': {}", selector, e)).into()
    })
}

impl ResponseParser for HtmlTableParser {
    type Response = HttpResponse;
    type Output = Vec<Row>;

    fn get_status_code(&self, response: &HttpResponse) -> u16 {
        response.status
    }

    fn handling_200_response(&self, response: HttpResponse) -> Result<Vec<Row>> {
        Ok(self.extract_rows(&response.body))
    }

    fn handling_not_200_response(&self, response: HttpResponse) -> Result<Vec<Row>> {
        Err(unexpected_status(&response))
    }
}
