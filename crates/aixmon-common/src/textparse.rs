//! Parser for the line-oriented text exposition format.
//!
//! The parser walks a scrape body line by line and yields one [`Entry`] per
//! non-blank line. Metadata lines (`# TYPE`, `# HELP`, `# UNIT` and plain
//! comments) are reported as their own entry kinds so callers can skip them.
//!
//! OpenMetrics bodies differ on sample lines only: timestamps are seconds
//! with an optional fraction, and a sample may carry a trailing exemplar
//! (`# {trace_id="..."} 1.0`), which is dropped.

use crate::types::{Label, METRIC_NAME_LABEL};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported exposition content type '{0}'")]
    UnsupportedContentType(String),

    #[error("scrape body is not valid UTF-8")]
    InvalidUtf8,

    #[error("line {line}: {reason}")]
    InvalidLine { line: usize, reason: &'static str },
}

/// One parsed sample line.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Labels in exposition order, starting with `__name__`.
    pub labels: Vec<Label>,
    /// Explicit timestamp written after the value, converted to milliseconds.
    pub timestamp_ms: Option<i64>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Type { metric: String, kind: String },
    Help { metric: String, text: String },
    Unit { metric: String, unit: String },
    Comment(String),
    Series(Series),
}

impl Entry {
    /// True for every entry kind that does not carry a sample value.
    pub fn is_metadata(&self) -> bool {
        !matches!(self, Entry::Series(_))
    }
}

pub struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    openmetrics: bool,
}

impl<'a> Parser<'a> {
    /// Build a parser over a scrape body.
    ///
    /// `content_type` is the value of the response `Content-Type` header. An
    /// empty value and any `text/*` or OpenMetrics text type are accepted.
    pub fn new(body: &'a [u8], content_type: &str) -> Result<Self, ParseError> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let openmetrics = media_type == "application/openmetrics-text";
        let supported = media_type.is_empty() || media_type.starts_with("text/") || openmetrics;
        if !supported {
            return Err(ParseError::UnsupportedContentType(media_type));
        }

        let text = std::str::from_utf8(body).map_err(|_| ParseError::InvalidUtf8)?;
        Ok(Self {
            lines: text.lines().enumerate(),
            openmetrics,
        })
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Entry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, raw) = self.lines.next()?;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let parsed = if let Some(comment) = line.strip_prefix('#') {
                Ok(parse_comment(comment.trim_start()))
            } else {
                parse_series(line, self.openmetrics).map(Entry::Series)
            };
            return Some(parsed.map_err(|reason| ParseError::InvalidLine {
                line: index + 1,
                reason,
            }));
        }
    }
}

fn parse_comment(comment: &str) -> Entry {
    let mut parts = comment.splitn(3, char::is_whitespace);
    let keyword = parts.next().unwrap_or_default();
    let metric = parts.next().unwrap_or_default().to_string();
    let rest = parts.next().unwrap_or_default().trim().to_string();

    if metric.is_empty() {
        return Entry::Comment(comment.to_string());
    }
    match keyword {
        "TYPE" => Entry::Type { metric, kind: rest },
        "HELP" => Entry::Help {
            metric,
            text: unescape_help(&rest),
        },
        "UNIT" => Entry::Unit { metric, unit: rest },
        _ => Entry::Comment(comment.to_string()),
    }
}

fn unescape_help(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_series(line: &str, openmetrics: bool) -> Result<Series, &'static str> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if !is_valid_metric_name(name) {
        return Err("invalid metric name");
    }

    let mut labels = vec![Label::new(METRIC_NAME_LABEL, name)];
    let mut rest = &line[name_end..];
    if let Some(inner) = rest.strip_prefix('{') {
        rest = parse_labels(inner, &mut labels)?;
    }

    if openmetrics {
        if let Some(exemplar) = rest.find(" # ") {
            rest = &rest[..exemplar];
        }
    }

    let mut fields = rest.split_whitespace();
    let value = parse_value(fields.next().ok_or("missing sample value")?)?;
    let timestamp_ms = match fields.next() {
        Some(ts) if openmetrics => Some(parse_seconds_timestamp(ts)?),
        Some(ts) => Some(ts.parse::<i64>().map_err(|_| "invalid timestamp")?),
        None => None,
    };
    if fields.next().is_some() {
        return Err("unexpected data after timestamp");
    }

    Ok(Series {
        labels,
        timestamp_ms,
        value,
    })
}

/// Parse `name="value",...}` and return whatever follows the closing brace.
fn parse_labels<'a>(mut input: &'a str, labels: &mut Vec<Label>) -> Result<&'a str, &'static str> {
    loop {
        input = input.trim_start();
        if let Some(rest) = input.strip_prefix('}') {
            return Ok(rest);
        }

        let eq = input.find('=').ok_or("label without value")?;
        let name = input[..eq].trim();
        if !is_valid_label_name(name) {
            return Err("invalid label name");
        }
        input = input[eq + 1..]
            .trim_start()
            .strip_prefix('"')
            .ok_or("label value must be quoted")?;

        let mut value = String::new();
        let mut chars = input.char_indices();
        let end = loop {
            match chars.next() {
                Some((i, '"')) => break i,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, c @ ('\\' | '"'))) => value.push(c),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err("unterminated label value"),
                },
                Some((_, c)) => value.push(c),
                None => return Err("unterminated label value"),
            }
        };

        if labels.iter().any(|l| l.name == name) {
            return Err("duplicate label name");
        }
        labels.push(Label::new(name, value));

        input = input[end + 1..].trim_start();
        if let Some(rest) = input.strip_prefix(',') {
            input = rest;
        } else if !input.starts_with('}') {
            return Err("expected ',' or '}' after label value");
        }
    }
}

fn parse_seconds_timestamp(raw: &str) -> Result<i64, &'static str> {
    let seconds = raw.parse::<f64>().map_err(|_| "invalid timestamp")?;
    if !seconds.is_finite() {
        return Err("invalid timestamp");
    }
    Ok((seconds * 1000.0).round() as i64)
}

fn parse_value(raw: &str) -> Result<f64, &'static str> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => raw.parse::<f64>().map_err(|_| "invalid sample value"),
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
