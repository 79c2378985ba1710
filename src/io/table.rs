use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::io::SegmentRow;
use crate::reference::{ReferenceRecord, ReferenceTable};

/// Cell text written for rows that carry no label.
pub const MISSING: &str = "NA";

fn is_gz(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
    let reader: Box<dyn Read> = if is_gz(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Tab-separated table held as raw text records.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(open_reader(path)?);
        let headers = rdr
            .headers()
            .with_context(|| format!("failed to read header of {path:?}"))?
            .clone();
        let mut records = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.with_context(|| format!("failed to read row {} of {path:?}", i + 1))?;
            records.push(rec);
        }
        log::info!("read {} rows x {} columns from {path:?}", records.len(), headers.len());
        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(i) => Ok(i),
            None => bail!("missing column '{name}'"),
        }
    }

    pub fn column_str(&self, name: &str) -> Result<Vec<String>> {
        let col = self.require_column(name)?;
        Ok(self
            .records
            .iter()
            .map(|r| r.get(col).unwrap_or_default().to_string())
            .collect())
    }

    /// Optional reals: empty, `NA` and `NaN` cells are `None`.
    pub fn column_opt_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.require_column(name)?;
        let mut out = Vec::with_capacity(self.records.len());
        for (i, r) in self.records.iter().enumerate() {
            let cell = r.get(col).unwrap_or_default();
            out.push(
                parse_opt_f64(cell)
                    .with_context(|| format!("column '{name}', row {}: bad number '{cell}'", i + 1))?,
            );
        }
        Ok(out)
    }

    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        let vals = self.column_opt_f64(name)?;
        let mut out = Vec::with_capacity(vals.len());
        for (i, v) in vals.into_iter().enumerate() {
            match v {
                Some(x) => out.push(x),
                None => bail!("column '{name}', row {}: missing value", i + 1),
            }
        }
        Ok(out)
    }

    /// Stack the named real columns into an `(n_rows, columns.len())` matrix.
    pub fn feature_matrix(&self, columns: &[&str]) -> Result<Array2<f64>> {
        let mut x = Array2::zeros((self.records.len(), columns.len()));
        for (j, name) in columns.iter().enumerate() {
            for (i, v) in self.column_f64(name)?.into_iter().enumerate() {
                x[(i, j)] = v;
            }
        }
        Ok(x)
    }

    /// Write the table back with one extra column appended.
    pub fn write_with_column(&self, path: &Path, name: &str, values: &[Option<String>]) -> Result<()> {
        if values.len() != self.records.len() {
            bail!(
                "label column has {} values for {} rows",
                values.len(),
                self.records.len()
            );
        }
        let file = File::create(path).with_context(|| format!("failed to create {path:?}"))?;
        let mut inner = if is_gz(path) {
            let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            self.write_records(encoder, path, name, values)?
                .finish()
                .with_context(|| format!("failed to finish gzip stream of {path:?}"))?
        } else {
            self.write_records(BufWriter::new(file), path, name, values)?
        };
        inner
            .flush()
            .with_context(|| format!("failed to flush {path:?}"))?;
        Ok(())
    }

    fn write_records<W: Write>(
        &self,
        out: W,
        path: &Path,
        name: &str,
        values: &[Option<String>],
    ) -> Result<W> {
        let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(out);
        let mut header = self.headers.clone();
        header.push_field(name);
        wtr.write_record(&header)
            .with_context(|| format!("failed to write {path:?}"))?;
        for (rec, value) in self.records.iter().zip(values) {
            let mut rec = rec.clone();
            rec.push_field(value.as_deref().unwrap_or(MISSING));
            wtr.write_record(&rec)
                .with_context(|| format!("failed to write {path:?}"))?;
        }
        wtr.into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush {path:?}: {}", e.error()))
    }
}

fn parse_opt_f64(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    Ok(Some(cell.parse::<f64>()?))
}

/// Segment rows from a table with a `sample` column and at least one of
/// `total_count` / `allelic_ratio`.
pub fn segments_from_table(table: &Table) -> Result<Vec<SegmentRow>> {
    let samples = table.column_str("sample")?;
    let n = samples.len();
    let total_count = match table.column_index("total_count") {
        Some(_) => table.column_opt_f64("total_count")?,
        None => vec![None; n],
    };
    let allelic_ratio = match table.column_index("allelic_ratio") {
        Some(_) => table.column_opt_f64("allelic_ratio")?,
        None => vec![None; n],
    };
    if table.column_index("total_count").is_none() && table.column_index("allelic_ratio").is_none() {
        bail!("segment table has neither 'total_count' nor 'allelic_ratio'");
    }
    Ok(samples
        .into_iter()
        .zip(total_count)
        .zip(allelic_ratio)
        .map(|((sample, total_count), allelic_ratio)| SegmentRow {
            sample,
            total_count,
            allelic_ratio,
        })
        .collect())
}

pub fn read_segments(path: &Path) -> Result<(Table, Vec<SegmentRow>)> {
    let table = Table::read(path)?;
    let rows = segments_from_table(&table).with_context(|| format!("in {path:?}"))?;
    Ok((table, rows))
}

pub fn read_reference(path: &Path, name: &str) -> Result<ReferenceTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let mut records = Vec::new();
    for (i, rec) in rdr.deserialize::<ReferenceRecord>().enumerate() {
        let rec = rec.with_context(|| format!("failed to parse row {} of {path:?}", i + 1))?;
        records.push(rec);
    }
    let table = ReferenceTable::from_records(name, records)?;
    log::info!("loaded {} {name} reference entries from {path:?}", table.len());
    Ok(table)
}
