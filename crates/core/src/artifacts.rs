//! Loaders for the on-disk inputs: the retail transaction export used as the
//! product catalog, the precomputed similarity matrix and the trained segment
//! model. Everything is read once at startup.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::config::TextEncoding;
use crate::domain::product::ProductRecord;
use crate::errors::ArtifactError;
use crate::segment::{KMeansClassifier, StandardScaler};
use crate::similarity::SimilarityMatrix;

const DESCRIPTION_COLUMN: &str = "Description";
const STOCK_CODE_COLUMN: &str = "StockCode";

pub fn load_catalog(path: &Path, encoding: TextEncoding) -> Result<Vec<ProductRecord>, ArtifactError> {
    let bytes =
        fs::read(path).map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
    let text = decode(&bytes, encoding);
    let records = parse_catalog(text.as_bytes(), path)?;

    info!(
        event_name = "system.artifacts.catalog_loaded",
        path = %path.display(),
        record_count = records.len(),
        "catalog loaded"
    );
    Ok(records)
}

/// Reads `Description` and `StockCode` from a CSV export. Other columns are
/// ignored; rows without a description are skipped.
pub fn parse_catalog<R: Read>(reader: R, path: &Path) -> Result<Vec<ProductRecord>, ArtifactError> {
    let csv_error = |source| ArtifactError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .ok_or(ArtifactError::MissingColumn { path: path.to_path_buf(), column: name })
    };
    let description_index = column(DESCRIPTION_COLUMN)?;
    let stock_code_index = column(STOCK_CODE_COLUMN)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let description = row.get(description_index).unwrap_or_default().trim();
        if description.is_empty() {
            continue;
        }
        let stock_code = row.get(stock_code_index).unwrap_or_default().trim();
        records.push(ProductRecord::new(description, stock_code));
    }
    Ok(records)
}

pub fn load_similarity(path: &Path) -> Result<SimilarityMatrix, ArtifactError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());

    let matrix = match extension.as_deref() {
        Some("json") => {
            let raw = fs::read(path)
                .map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
            parse_similarity_json(&raw, path)?
        }
        Some("csv") => {
            let file = fs::File::open(path)
                .map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
            parse_similarity_csv(file, path)?
        }
        _ => return Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
    };

    info!(
        event_name = "system.artifacts.similarity_loaded",
        path = %path.display(),
        product_count = matrix.labels().len(),
        "similarity matrix loaded"
    );
    Ok(matrix)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SimilarityDocument {
    Labelled { labels: Vec<String>, scores: Vec<Vec<f64>> },
    /// Layout written by a data frame's split-orientation JSON export.
    Split { index: Vec<String>, columns: Vec<String>, data: Vec<Vec<f64>> },
}

pub fn parse_similarity_json(raw: &[u8], path: &Path) -> Result<SimilarityMatrix, ArtifactError> {
    let document: SimilarityDocument = serde_json::from_slice(raw)
        .map_err(|source| ArtifactError::Json { path: path.to_path_buf(), source })?;

    match document {
        SimilarityDocument::Labelled { labels, scores } => SimilarityMatrix::new(labels, scores),
        SimilarityDocument::Split { index, columns, data } => {
            if index != columns {
                return Err(ArtifactError::MalformedMatrix(
                    "row index and column labels differ".to_string(),
                ));
            }
            SimilarityMatrix::new(columns, data)
        }
    }
}

/// Square CSV matrix: the header row holds an index name followed by the
/// column labels, every following row holds its label followed by scores.
pub fn parse_similarity_csv<R: Read>(reader: R, path: &Path) -> Result<SimilarityMatrix, ArtifactError> {
    let csv_error = |source| ArtifactError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let labels: Vec<String> = headers.iter().skip(1).map(|label| label.to_string()).collect();

    let mut rows = Vec::with_capacity(labels.len());
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row_label = record.get(0).unwrap_or_default();
        match labels.get(row_index) {
            Some(expected) if expected == row_label => {}
            _ => {
                return Err(ArtifactError::MalformedMatrix(format!(
                    "row {} is labelled `{row_label}`, expected it to match column order",
                    row_index + 1
                )));
            }
        }

        let scores = record
            .iter()
            .skip(1)
            .map(|cell| {
                cell.trim().parse::<f64>().map_err(|_| {
                    ArtifactError::MalformedMatrix(format!(
                        "row `{row_label}` has non-numeric score `{cell}`"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(scores);
    }

    SimilarityMatrix::new(labels, rows)
}

#[derive(Debug, Deserialize)]
struct SegmentModelDocument {
    scaler: Option<StandardScaler>,
    #[serde(alias = "cluster_centers")]
    centroids: Vec<Vec<f64>>,
}

pub fn load_segment_model(path: &Path) -> Result<KMeansClassifier, ArtifactError> {
    let raw =
        fs::read(path).map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
    let model = parse_segment_model(&raw, path)?;

    info!(
        event_name = "system.artifacts.segment_model_loaded",
        path = %path.display(),
        cluster_count = model.cluster_count(),
        "segment model loaded"
    );
    Ok(model)
}

pub fn parse_segment_model(raw: &[u8], path: &Path) -> Result<KMeansClassifier, ArtifactError> {
    let document: SegmentModelDocument = serde_json::from_slice(raw)
        .map_err(|source| ArtifactError::Json { path: path.to_path_buf(), source })?;
    let scaler = document.scaler.unwrap_or_else(StandardScaler::identity);
    KMeansClassifier::new(scaler, document.centroids)
        .map_err(|error| ArtifactError::MalformedModel(error.to_string()))
}

fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        // Every latin1 byte is the code point of the same value.
        TextEncoding::Latin1 => bytes.iter().map(|byte| char::from(*byte)).collect(),
    }
}
