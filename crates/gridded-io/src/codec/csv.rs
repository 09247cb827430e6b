//! Comma separated text codec for tabular records.

use std::borrow::Cow;
use std::io::{Read, Write};

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{DatasetError, Result};
use crate::record::{Column, Table, Value};

use super::Codec;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// CSV codec.
///
/// The first row holds the key column label followed by the data column
/// names. Field types are inferred on read: integer, float, date or
/// date-time, otherwise text. Text that would be inferred as something else
/// is written quoted so it reads back as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl CsvCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for CsvCodec {
    type Item = Table;

    fn extension(&self) -> &'static str {
        "csv"
    }

    /// The key label shares the header row with the data columns, so it
    /// must not repeat one of them.
    fn check(&self, table: &Table, key_column: &str) -> Result<()> {
        if table.column_names().contains(&key_column) {
            return Err(DatasetError::schema_mismatch(format!(
                "key column '{}' is also a data column",
                key_column
            )));
        }
        Ok(())
    }

    fn serialize(&self, table: &Table, sink: &mut dyn Write, key_column: &str) -> Result<()> {
        if table.is_blank() {
            return Ok(());
        }
        self.check(table, key_column)?;

        let mut line = quote_text(key_column).into_owned();
        for name in table.column_names() {
            line.push(',');
            line.push_str(&quote_text(name));
        }
        line.push('\n');
        sink.write_all(line.as_bytes())?;

        for position in 0..table.len() {
            line.clear();
            if let Some(row) = table.row(position) {
                for (i, value) in row.into_iter().enumerate() {
                    if i > 0 {
                        line.push(',');
                    }
                    line.push_str(&format_value(value));
                }
            }
            line.push('\n');
            sink.write_all(line.as_bytes())?;
        }

        Ok(())
    }

    fn deserialize(&self, source: &mut dyn Read) -> Result<Table> {
        let mut text = String::new();
        source
            .read_to_string(&mut text)
            .map_err(|e| DatasetError::codec(format!("csv is not valid UTF-8 text: {}", e)))?;

        let mut records = split_records(&text)?.into_iter();
        let header = match records.next() {
            Some(header) => header,
            None => return Ok(Table::default()),
        };

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); header.len()];
        for (row, record) in records.enumerate() {
            if record.len() != header.len() {
                return Err(DatasetError::codec(format!(
                    "row {} has {} fields, header has {}",
                    row + 1,
                    record.len(),
                    header.len()
                )));
            }
            for (column, field) in columns.iter_mut().zip(record) {
                column.push(field.into_value());
            }
        }

        let mut names = header.into_iter().map(|f| f.text);
        let mut values = columns.into_iter();
        let mut table = Table::new(
            names.next().unwrap_or_default(),
            values.next().unwrap_or_default(),
        );
        for (name, values) in names.zip(values) {
            table.push_column(Column::new(name, values))?;
        }
        Ok(table)
    }
}

struct RawField {
    text: String,
    quoted: bool,
}

impl RawField {
    fn into_value(self) -> Value {
        if self.quoted {
            Value::Text(self.text)
        } else {
            infer(&self.text)
        }
    }
}

fn split_records(text: &str) -> Result<Vec<Vec<RawField>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            ',' => {
                record.push(RawField {
                    text: std::mem::take(&mut field),
                    quoted,
                });
                quoted = false;
            }
            '\r' => {}
            '\n' => {
                record.push(RawField {
                    text: std::mem::take(&mut field),
                    quoted,
                });
                quoted = false;
                push_record(&mut records, std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DatasetError::codec(format!(
            "unterminated quoted field at line {}",
            line
        )));
    }
    if !field.is_empty() || quoted || !record.is_empty() {
        record.push(RawField { text: field, quoted });
        push_record(&mut records, record);
    }

    Ok(records)
}

// Blank lines carry no row.
fn push_record(records: &mut Vec<Vec<RawField>>, record: Vec<RawField>) {
    let blank = record.len() == 1 && record[0].text.is_empty() && !record[0].quoted;
    if !blank {
        records.push(record);
    }
}

fn infer(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = field.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = field.parse::<f64>() {
        return Value::Float(v);
    }
    if let Ok(date) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Value::Time(midnight);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(field, format) {
            return Value::Time(t);
        }
    }
    Value::Text(field.to_string())
}

fn format_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Int(v) => Cow::Owned(v.to_string()),
        // Debug keeps the decimal point so whole floats do not read back as ints.
        Value::Float(v) => Cow::Owned(format!("{:?}", v)),
        Value::Time(t) => Cow::Owned(format_time(t)),
        Value::Text(s) => quote_text(s),
    }
}

fn format_time(t: &NaiveDateTime) -> String {
    if t.num_seconds_from_midnight() == 0 && t.nanosecond() == 0 {
        t.format("%Y-%m-%d").to_string()
    } else {
        t.format(DATETIME_FORMATS[0]).to_string()
    }
}

fn quote_text(s: &str) -> Cow<'_, str> {
    let special = s.contains([',', '"', '\n', '\r']);
    if special || !matches!(infer(s), Value::Text(_)) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}
