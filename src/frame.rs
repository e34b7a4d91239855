use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};
use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::errors::{NovexonError, Result};
use crate::novexon_structs::{GeneModelRecord, Strand};

pub const GTF_COLUMNS: [&str; 9] = [
    "seqname",
    "source",
    "feature",
    "start",
    "end",
    "score",
    "strand",
    "frame",
    "attribute",
];

fn is_parquet(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "parquet")
}

fn read_delimited(path: &Path, has_header: bool, separator: u8) -> Result<DataFrame> {
    let parse_options = CsvParseOptions::default().with_separator(separator);
    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Reads a table with a header row: Parquet for `*.parquet`, tab-separated text otherwise.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let df = if is_parquet(path) {
        ParquetReader::new(File::open(path)?).finish()?
    } else {
        read_delimited(path, true, b'\t')?
    };
    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Comma-separated table with a header row (sample metadata sheets).
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    read_delimited(path, true, b',')
}

/// Reads a headerless tab-separated file and names its leading columns.
pub fn read_headerless(path: &Path, table: &str, names: &[&str]) -> Result<DataFrame> {
    let df = read_delimited(path, false, b'\t')?;
    rename_leading(df, table, names)
}

/// Names the first `names.len()` columns; trailing columns are dropped.
pub fn rename_leading(df: DataFrame, table: &str, names: &[&str]) -> Result<DataFrame> {
    if df.width() < names.len() {
        return Err(NovexonError::MissingColumns {
            table: table.to_string(),
            columns: names[df.width()..].iter().map(|n| n.to_string()).collect(),
        });
    }
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(names)
        .map(|(c, name)| c.clone().with_name((*name).into()))
        .collect();
    Ok(DataFrame::new(columns)?)
}

pub fn write_table(path: &Path, df: &mut DataFrame) -> Result<()> {
    let file = File::create(path)?;
    if is_parquet(path) {
        ParquetWriter::new(file).finish(df)?;
    } else {
        let mut writer = BufWriter::new(file);
        CsvWriter::new(&mut writer)
            .include_header(true)
            .with_separator(b'\t')
            .finish(df)?;
    }
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Tab-separated without a header, as BED consumers expect.
pub fn write_headerless(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    CsvWriter::new(&mut writer)
        .include_header(false)
        .with_separator(b'\t')
        .finish(df)?;
    Ok(())
}

pub fn write_lines(path: &Path, lines: impl IntoIterator<Item = String>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Typed column access on a frame whose required columns were checked up front.
pub struct FrameReader<'a> {
    table: &'a str,
    df: &'a DataFrame,
}

impl<'a> FrameReader<'a> {
    pub fn new(table: &'a str, df: &'a DataFrame, required: &[&str]) -> Result<Self> {
        let present: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !present.contains(*c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(NovexonError::MissingColumns {
                table: table.to_string(),
                columns: missing,
            });
        }
        Ok(FrameReader { table, df })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has(&self, name: &str) -> bool {
        self.df.get_column_names().iter().any(|n| n.as_str() == name)
    }

    fn null_in(&self, name: &str) -> NovexonError {
        NovexonError::invalid(&format!("{}.{}", self.table, name), "null")
    }

    pub fn opt_i64s(&self, name: &str) -> Result<Vec<Option<i64>>> {
        let col = self.df.column(name)?.cast(&DataType::Int64)?;
        Ok(col.i64()?.into_iter().collect())
    }

    pub fn i64s(&self, name: &str) -> Result<Vec<i64>> {
        self.opt_i64s(name)?
            .into_iter()
            .map(|v| v.ok_or_else(|| self.null_in(name)))
            .collect()
    }

    pub fn opt_f64s(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.df.column(name)?.cast(&DataType::Float64)?;
        Ok(col.f64()?.into_iter().collect())
    }

    /// Nulls read as NaN.
    pub fn f64s(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self
            .opt_f64s(name)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    pub fn bools(&self, name: &str) -> Result<Vec<bool>> {
        let col = self.df.column(name)?.cast(&DataType::Boolean)?;
        col.bool()?
            .into_iter()
            .map(|v| v.ok_or_else(|| self.null_in(name)))
            .collect()
    }

    pub fn opt_strings(&self, name: &str) -> Result<Vec<Option<String>>> {
        let col = self.df.column(name)?.cast(&DataType::String)?;
        Ok(col.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    pub fn strings(&self, name: &str) -> Result<Vec<String>> {
        self.opt_strings(name)?
            .into_iter()
            .map(|v| v.ok_or_else(|| self.null_in(name)))
            .collect()
    }

    pub fn parsed<T: FromStr<Err = NovexonError>>(&self, name: &str) -> Result<Vec<T>> {
        self.strings(name)?.iter().map(|s| s.parse()).collect()
    }
}

/// Collects named columns into a frame.
#[derive(Default)]
pub struct FrameBuilder {
    columns: Vec<Column>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T, P: ?Sized>(mut self, name: &str, values: T) -> Self
    where
        Series: NamedFrom<T, P>,
    {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn finish(self) -> Result<DataFrame> {
        Ok(DataFrame::new(self.columns)?)
    }
}

/// Splits `key "value"; key2 "value2";` into its fields. Unquoted values are kept as is.
pub fn parse_attributes(attribute: &str) -> FxHashMap<&str, &str> {
    attribute
        .split(';')
        .filter_map(|field| {
            let (key, value) = field.trim().split_once(' ')?;
            Some((key, value.trim().trim_matches('"')))
        })
        .collect()
}

/// Gene model rows from a nine-column GTF frame. Rows without a
/// `transcript_id` (genes, comments turned into rows) are skipped, and so are
/// unstranded (`.`) rows, which never have flanking junctions.
pub fn gtf_records(df: &DataFrame) -> Result<Vec<GeneModelRecord>> {
    let reader = FrameReader::new("gtf", df, &GTF_COLUMNS)?;
    let seqnames = reader.strings("seqname")?;
    let features = reader.strings("feature")?;
    let starts = reader.i64s("start")?;
    let ends = reader.i64s("end")?;
    let strands = reader.strings("strand")?;
    let attributes = reader.strings("attribute")?;

    let mut records = Vec::with_capacity(reader.height());
    let mut unstranded = 0;
    for i in 0..reader.height() {
        if strands[i] == "." {
            unstranded += 1;
            continue;
        }
        let attrs = parse_attributes(&attributes[i]);
        let Some(transcript_id) = attrs.get("transcript_id") else {
            continue;
        };
        let gene_id = attrs
            .get("gene_id")
            .ok_or_else(|| NovexonError::invalid("gtf.gene_id", &attributes[i]))?;
        let cov = match attrs.get("cov") {
            Some(v) => Some(
                v.parse::<f64>()
                    .map_err(|_| NovexonError::invalid("gtf.cov", v))?,
            ),
            None => None,
        };
        records.push(GeneModelRecord {
            seqname: seqnames[i].clone(),
            feature: features[i].clone(),
            start: starts[i],
            end: ends[i],
            strand: Strand::from_str(&strands[i])?,
            transcript_id: transcript_id.to_string(),
            gene_id: gene_id.to_string(),
            transcript_type: attrs
                .get("transcript_type")
                .or_else(|| attrs.get("transcript_biotype"))
                .map(|t| t.to_string()),
            cov,
        });
    }
    if unstranded > 0 {
        warn!("Skipped {} unstranded GTF rows", unstranded);
    }
    Ok(records)
}

pub fn read_gtf(path: &Path) -> Result<Vec<GeneModelRecord>> {
    let parse_options = CsvParseOptions::default()
        .with_separator(b'\t')
        .with_quote_char(None)
        .with_comment_prefix(Some("#"));
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    let df = rename_leading(df, "gtf", &GTF_COLUMNS)?;
    let records = gtf_records(&df)?;
    debug!("Parsed {} transcript rows from {}", records.len(), path.display());
    Ok(records)
}
