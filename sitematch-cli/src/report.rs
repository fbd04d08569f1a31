//! Rendering of comparison results for the terminal or for other tools.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use sitematch_core::{Coordinates, MatchRecord, MatchSummary, summarize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Everything a `match` run produces.
#[derive(Debug, Serialize)]
pub(crate) struct MatchReport<'a> {
    pub records: &'a [MatchRecord],
    pub summary: MatchSummary,
    // BTreeMap keeps the JSON output stable between runs
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub geocoded: BTreeMap<&'a str, Option<Coordinates>>,
}

impl<'a> MatchReport<'a> {
    pub(crate) fn new(
        records: &'a [MatchRecord],
        geocoded: &'a HashMap<String, Option<Coordinates>>,
    ) -> Self {
        Self {
            records,
            summary: summarize(records),
            geocoded: geocoded
                .iter()
                .map(|(address, coordinates)| (address.as_str(), *coordinates))
                .collect(),
        }
    }

    pub(crate) fn write(&self, out: &mut impl Write, format: OutputFormat) -> io::Result<()> {
        match format {
            OutputFormat::Table => self.write_table(out),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, self)?;
                writeln!(out)
            }
        }
    }

    fn write_table(&self, out: &mut impl Write) -> io::Result<()> {
        let sources = self.records.iter().map(|record| &record.source_address);
        let targets = self.records.iter().map(|record| &record.target_address);
        let source_width = column_width("SOURCE", sources);
        let target_width = column_width("TARGET", targets);

        writeln!(
            out,
            "{:<8} {:>5}  {:<source_width$}  {:<target_width$}  PROPERTY  TENANT",
            "TYPE", "SCORE", "SOURCE", "TARGET",
        )?;
        for record in self.records {
            writeln!(
                out,
                "{:<8} {:>5.3}  {:<source_width$}  {:<target_width$}  {:<8}  {}",
                record.match_type.to_string(),
                record.score,
                record.source_address,
                record.target_address,
                record.property_id.as_deref().unwrap_or("-"),
                record.tenant.as_deref().unwrap_or("-"),
            )?;
        }

        let summary = self.summary;
        writeln!(
            out,
            "\n{} exact, {} fuzzy, {} missing from target, {} missing from source",
            summary.exact, summary.fuzzy, summary.missing_source, summary.missing_target,
        )?;

        if !self.geocoded.is_empty() {
            writeln!(out, "\nGeocoded leftovers:")?;
            for (address, coordinates) in &self.geocoded {
                write_coordinates(out, address, *coordinates)?;
            }
        }
        Ok(())
    }
}

/// One `address<TAB>lat,lon` line, or a manual-resolution marker.
pub(crate) fn write_coordinates(
    out: &mut impl Write,
    address: &str,
    coordinates: Option<Coordinates>,
) -> io::Result<()> {
    match coordinates {
        Some(coordinates) => writeln!(out, "{address}\t{coordinates}"),
        None => writeln!(out, "{address}\tneeds manual resolution"),
    }
}

fn column_width<'s>(header: &str, values: impl Iterator<Item = &'s String>) -> usize {
    values
        .map(|value| value.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
}
