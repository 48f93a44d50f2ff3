//! CSV tables: the raw observation table and the analysis results
//!
//! Every table has a header row and `,` separators. Undefined numbers are
//! written as `undefined`. Floats use Rust's shortest round-trip formatting,
//! so the raw and result tables read back with identical values.

use crate::error::TableError;
use crate::observation::{ApiType, Metric, Observation, ObservationSet, QueryType};
use crate::stats::{EffectSize, GroupSummary, HypothesisTestResult, NormalityVerdict};
use std::path::Path;

/// Cell text for an undefined number
pub const UNDEFINED: &str = "undefined";

pub const OBSERVATIONS_HEADER: &str =
    "query_type,api_type,response_time_ms,payload_size_bytes,trial,timestamp";

pub const NORMALITY_HEADER: &str =
    "api,query,tempo_stat,tempo_p,tempo_normal,tamanho_stat,tamanho_p,tamanho_normal";

const SIGNIFICANT: &str = "SIGNIFICATIVO";
const NOT_SIGNIFICANT: &str = "NÃO SIGNIFICATIVO";

const SUMMARY_STATS: [&str; 5] = ["mean", "std", "median", "min", "max"];

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one record, honoring quoted fields written by `escape_field`
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn format_float(value: f64) -> String {
    format!("{}", value)
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), format_float)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Non-empty data lines with their 1-based line numbers, header checked
fn data_lines<'a>(
    text: &'a str,
    header: &str,
) -> Result<impl Iterator<Item = (usize, &'a str)>, TableError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')));

    let found = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => return Err(TableError::MissingHeader),
        }
    };
    if found.trim_start_matches('\u{feff}') != header {
        return Err(TableError::Header {
            expected: header.to_string(),
            found: found.to_string(),
        });
    }

    Ok(lines.filter(|(_, line)| !line.trim().is_empty()))
}

fn parse_field<T: std::str::FromStr>(line: usize, name: &str, text: &str) -> Result<T, TableError>
where
    T::Err: std::fmt::Display,
{
    text.parse().map_err(|e| TableError::Row {
        line,
        reason: format!("{} '{}': {}", name, text, e),
    })
}

fn parse_optional(line: usize, name: &str, text: &str) -> Result<Option<f64>, TableError> {
    if text == UNDEFINED {
        Ok(None)
    } else {
        parse_field(line, name, text).map(Some)
    }
}

fn expect_columns(line: usize, fields: &[String], expected: usize) -> Result<(), TableError> {
    if fields.len() != expected {
        return Err(TableError::Row {
            line,
            reason: format!("expected {} columns, found {}", expected, fields.len()),
        });
    }
    Ok(())
}

/// Raw observation table, one row per measured request
pub fn observations_to_csv(set: &ObservationSet) -> String {
    let mut output = String::new();
    output.push_str(OBSERVATIONS_HEADER);
    output.push('\n');

    for obs in set.observations() {
        let fields = [
            obs.query_type.as_str().to_string(),
            obs.api_type.as_str().to_string(),
            format_float(obs.response_time_ms),
            obs.payload_size_bytes.to_string(),
            obs.trial.to_string(),
            escape_field(&obs.timestamp),
        ];
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output
}

/// Parse a raw observation table
pub fn parse_observations(text: &str) -> Result<ObservationSet, TableError> {
    let mut observations = Vec::new();

    for (line, record) in data_lines(text, OBSERVATIONS_HEADER)? {
        let fields = split_record(record);
        expect_columns(line, &fields, 6)?;

        let response_time_ms: f64 = parse_field(line, "response_time_ms", &fields[2])?;
        if !response_time_ms.is_finite() || response_time_ms < 0.0 {
            return Err(TableError::Row {
                line,
                reason: format!(
                    "response_time_ms must be a non-negative number, got {}",
                    fields[2]
                ),
            });
        }

        observations.push(Observation {
            query_type: parse_field(line, "query_type", &fields[0])?,
            api_type: parse_field(line, "api_type", &fields[1])?,
            response_time_ms,
            payload_size_bytes: parse_field(line, "payload_size_bytes", &fields[3])?,
            trial: parse_field(line, "trial", &fields[4])?,
            timestamp: fields[5].clone(),
        });
    }

    Ok(ObservationSet::new(observations))
}

pub fn summary_header() -> String {
    let mut columns = vec!["api_type".to_string(), "query_type".to_string()];
    for metric in Metric::ALL {
        for stat in SUMMARY_STATS {
            columns.push(format!("{}_{}", metric.column(), stat));
        }
    }
    columns.join(",")
}

/// Descriptive summary, values rounded to 2 decimals
pub fn summary_to_csv(summary: &[GroupSummary]) -> String {
    let mut output = summary_header();
    output.push('\n');

    for group in summary {
        let mut fields = vec![group.api.as_str().to_string(), group.query.as_str().to_string()];
        for metric in Metric::ALL {
            let d = group.metric(metric);
            fields.push(format_float(round2(d.mean)));
            fields.push(format_optional(d.std.map(round2)));
            fields.push(format_float(round2(d.median)));
            fields.push(format_float(round2(d.min)));
            fields.push(format_float(round2(d.max)));
        }
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output
}

/// Normality table, one row per condition with both metrics side by side
pub fn normality_to_csv(verdicts: &[NormalityVerdict]) -> String {
    let mut output = String::new();
    output.push_str(NORMALITY_HEADER);
    output.push('\n');

    let find = |api: ApiType, query: QueryType, metric: Metric| {
        verdicts
            .iter()
            .find(|v| v.api == api && v.query == query && v.metric == metric)
    };

    for api in ApiType::ALL {
        for query in QueryType::ALL {
            let (Some(time), Some(size)) = (
                find(api, query, Metric::ResponseTimeMs),
                find(api, query, Metric::PayloadSizeBytes),
            ) else {
                continue;
            };

            let mut fields = vec![api.as_str().to_string(), query.as_str().to_string()];
            for verdict in [time, size] {
                fields.push(format_optional(verdict.test.map(|t| t.statistic)));
                fields.push(format_optional(verdict.test.map(|t| t.pvalue)));
                fields.push(verdict.outcome.to_string());
            }
            output.push_str(&fields.join(","));
            output.push('\n');
        }
    }

    output
}

/// Header of the RQ table for `metric` (`diff_ms` or `diff_bytes`)
pub fn results_header(metric: Metric) -> String {
    let diff = match metric {
        Metric::ResponseTimeMs => "diff_ms",
        Metric::PayloadSizeBytes => "diff_bytes",
    };
    format!(
        "query,rest_mean,graphql_mean,{},diff_percent,p_value,cohens_d,effect_size,significativo",
        diff
    )
}

/// One row of an RQ table as persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub query: QueryType,
    pub rest_mean: f64,
    pub graphql_mean: f64,
    pub diff: f64,
    pub diff_percent: Option<f64>,
    pub p_value: f64,
    pub cohens_d: Option<f64>,
    pub effect_size: Option<EffectSize>,
    pub significant: bool,
}

impl From<&HypothesisTestResult> for ResultRow {
    fn from(r: &HypothesisTestResult) -> Self {
        Self {
            query: r.query,
            rest_mean: r.rest_mean,
            graphql_mean: r.graphql_mean,
            diff: r.diff_mean,
            diff_percent: r.diff_percent,
            p_value: r.pvalue,
            cohens_d: r.cohens_d,
            effect_size: r.effect_size,
            significant: r.significant,
        }
    }
}

/// RQ1 (time) or RQ2 (size) result table
pub fn results_to_csv(metric: Metric, results: &[HypothesisTestResult]) -> String {
    let mut output = results_header(metric);
    output.push('\n');

    for row in results.iter().map(ResultRow::from) {
        let fields = [
            row.query.as_str().to_string(),
            format_float(row.rest_mean),
            format_float(row.graphql_mean),
            format_float(row.diff),
            format_optional(row.diff_percent),
            format_float(row.p_value),
            format_optional(row.cohens_d),
            row.effect_size
                .map_or_else(|| UNDEFINED.to_string(), |e| e.as_str().to_string()),
            escape_field(if row.significant { SIGNIFICANT } else { NOT_SIGNIFICANT }),
        ];
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output
}

/// Read back an RQ table written by `results_to_csv`
pub fn parse_results(metric: Metric, text: &str) -> Result<Vec<ResultRow>, TableError> {
    let header = results_header(metric);
    let mut rows = Vec::new();

    for (line, record) in data_lines(text, &header)? {
        let fields = split_record(record);
        expect_columns(line, &fields, 9)?;

        let effect_size = match fields[7].as_str() {
            UNDEFINED => None,
            label => Some(parse_field::<EffectSize>(line, "effect_size", label)?),
        };
        let significant = match fields[8].as_str() {
            SIGNIFICANT => true,
            NOT_SIGNIFICANT => false,
            other => {
                return Err(TableError::Row {
                    line,
                    reason: format!("significativo '{}' is not a verdict", other),
                })
            }
        };

        rows.push(ResultRow {
            query: parse_field(line, "query", &fields[0])?,
            rest_mean: parse_field(line, "rest_mean", &fields[1])?,
            graphql_mean: parse_field(line, "graphql_mean", &fields[2])?,
            diff: parse_field(line, "diff", &fields[3])?,
            diff_percent: parse_optional(line, "diff_percent", &fields[4])?,
            p_value: parse_field(line, "p_value", &fields[5])?,
            cohens_d: parse_optional(line, "cohens_d", &fields[6])?,
            effect_size,
            significant,
        });
    }

    Ok(rows)
}

/// Write a table, creating missing parent directories
pub fn write_table(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
