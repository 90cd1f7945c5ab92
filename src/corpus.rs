//! Corpus loading from ARFF data files.
//!
//! Both the background corpus and the labelled evaluation stream are stored
//! as ARFF: a header declaring the attributes, then one comma-separated row
//! per post.
//!
//! ```text
//! % comments start with %
//! @relation tweets
//! @attribute text string
//! @attribute class {0,1}
//! @data
//! 'grey skies over london #rain',1
//! "sunny at last",0
//! ```
//!
//! Values may be quoted with `'` or `"`; a backslash escapes the next
//! character inside quotes. An unquoted `?` is a missing value. The last
//! attribute is the class. Sparse rows are not supported.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    String,
    /// Nominal values in declaration order.
    Nominal(Vec<String>),
    /// Any other declared type (date, relational, ...), kept verbatim.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// One data row. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Option<String>>,
}

impl Record {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fully loaded ARFF file.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    relation: String,
    attributes: Vec<Attribute>,
    records: Vec<Record>,
}

impl Corpus {
    /// Load and parse an ARFF file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let corpus = Self::parse(BufReader::new(file))?;
        info!(
            "Loaded corpus '{}' from {} with {} records",
            corpus.relation,
            path.display(),
            corpus.records.len()
        );
        Ok(corpus)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut corpus = Corpus::default();
        let mut in_data = false;

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('%') {
                continue;
            }

            if in_data {
                corpus.records.push(corpus.parse_row(line, line_no)?);
                continue;
            }

            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((keyword, rest)) => (keyword, rest.trim()),
                None => (line, ""),
            };
            match keyword.to_ascii_lowercase().as_str() {
                "@relation" => corpus.relation = unquote(rest).to_string(),
                "@attribute" => corpus.attributes.push(parse_attribute(rest, line_no)?),
                "@data" => {
                    if corpus.attributes.is_empty() {
                        return Err(Error::corpus(line_no, "@data before any @attribute"));
                    }
                    in_data = true;
                }
                other => {
                    return Err(Error::corpus(
                        line_no,
                        format!("unexpected header line starting with '{other}'"),
                    ))
                }
            }
        }

        Ok(corpus)
    }

    fn parse_row(&self, line: &str, line_no: usize) -> Result<Record> {
        if line.starts_with('{') {
            return Err(Error::corpus(line_no, "sparse rows are not supported"));
        }
        let values = split_row(line, line_no)?;
        if values.len() != self.attributes.len() {
            return Err(Error::corpus(
                line_no,
                format!(
                    "expected {} values, found {}",
                    self.attributes.len(),
                    values.len()
                ),
            ));
        }
        Ok(Record { values })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Text of attribute `index` for every record that has one.
    pub fn texts(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().filter_map(move |r| r.value(index))
    }

    /// Whether `record` belongs to the positive class.
    ///
    /// For a nominal class the positive value is the second declared one,
    /// for a numeric class it is `1`. Missing or unparseable labels give
    /// `None`.
    pub fn class_label(&self, record: &Record) -> Option<bool> {
        let class = self.attributes.last()?;
        let value = record.value(self.attributes.len() - 1)?;
        match &class.kind {
            AttributeKind::Nominal(values) => values
                .iter()
                .position(|v| v == value)
                .map(|position| position == 1),
            _ => value.trim().parse::<f64>().ok().map(|v| v == 1.0),
        }
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_attribute(rest: &str, line_no: usize) -> Result<Attribute> {
    let (name, kind) = if let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"')
    {
        let end = rest[1..]
            .find(quote)
            .ok_or_else(|| Error::corpus(line_no, "unterminated attribute name"))?;
        (&rest[1..=end], rest[end + 2..].trim())
    } else {
        rest.split_once(char::is_whitespace)
            .map(|(name, kind)| (name, kind.trim()))
            .ok_or_else(|| Error::corpus(line_no, "attribute without a type"))?
    };

    if kind.is_empty() {
        return Err(Error::corpus(line_no, "attribute without a type"));
    }

    let kind = if let Some(values) = kind.strip_prefix('{') {
        let values = values
            .strip_suffix('}')
            .ok_or_else(|| Error::corpus(line_no, "unterminated nominal values"))?;
        AttributeKind::Nominal(
            values
                .split(',')
                .map(|v| unquote(v).to_string())
                .collect(),
        )
    } else {
        match kind.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            "string" => AttributeKind::String,
            _ => AttributeKind::Other(kind.to_string()),
        }
    };

    Ok(Attribute {
        name: name.to_string(),
        kind,
    })
}

/// Split a data row on commas, honouring quotes and escapes.
fn split_row(line: &str, line_no: usize) -> Result<Vec<Option<String>>> {
    let mut values = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err(Error::corpus(line_no, "dangling escape")),
                        },
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(Error::corpus(line_no, "unterminated quote")),
                    }
                }
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                Some(value)
            }
            _ => {
                let mut value = String::new();
                while let Some(c) = chars.next_if(|c| *c != ',') {
                    value.push(c);
                }
                let value = value.trim();
                (value != "?").then(|| value.to_string())
            }
        };
        values.push(value);

        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(c) => {
                return Err(Error::corpus(
                    line_no,
                    format!("unexpected '{c}' after quoted value"),
                ))
            }
        }
    }

    Ok(values)
}
