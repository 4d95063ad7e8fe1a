use crate::core::aggregator::ResultAggregator;
use crate::domain::model::OutputFormat;
use crate::utils::error::{BatchError, Result};
use serde::Serialize;

pub const TSV_HEADER: [&str; 7] = ["#Key", "Name", "DDG", "Stability", "RI", "pH", "Temp"];

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    key: String,
    name: &'a str,
    energy_change: &'a str,
    description: &'a str,
    reliability_index: &'a str,
    ph: &'a str,
    temperature: &'a str,
}

fn rows(results: &ResultAggregator) -> impl Iterator<Item = ReportRow<'_>> {
    results.iter().map(|(key, record)| ReportRow {
        key: key.to_string(),
        name: &record.name,
        energy_change: &record.energy_change,
        description: &record.description,
        reliability_index: &record.reliability_index,
        ph: &record.ph,
        temperature: &record.temperature,
    })
}

pub fn render(results: &ResultAggregator, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Tsv => render_tsv(results),
        OutputFormat::Json => render_json(results),
    }
}

/// 每個 AggregateKey 一行，依鍵排序
pub fn render_tsv(results: &ResultAggregator) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());

    writer.write_record(TSV_HEADER)?;
    for row in rows(results) {
        writer.write_record([
            row.key.as_str(),
            row.name,
            row.energy_change,
            row.description,
            row.reliability_index,
            row.ph,
            row.temperature,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| BatchError::IoError(e.into_error()))
}

pub fn render_json(results: &ResultAggregator) -> Result<Vec<u8>> {
    let rows: Vec<ReportRow<'_>> = rows(results).collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}
