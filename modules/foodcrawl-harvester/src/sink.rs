use std::fs::{self, File};
use std::path::{Path, PathBuf};

use foodcrawl_common::{Label, Record};
use tracing::{debug, info};

use crate::error::SinkError;

pub const HEADER: [&str; 20] = [
    "ID",
    "Name",
    "Category",
    "EANs",
    "Calories",
    "Proteins",
    "Fats",
    "Carbohydrates",
    "Salt",
    "Water",
    "Sugar",
    "Calcium",
    "GI",
    "PHE",
    "Alcohol",
    "Image",
    "Vitamins",
    "VitaminsDescr",
    "Minerals",
    "MineralsDescr",
];

const MULTI_VALUE_SEPARATOR: &str = "|";

/// Destination for output batches. Only the result collector drives it, so
/// implementations need no internal locking.
pub trait BatchSink: Send {
    /// Start batch `index` (1-based). The previous batch is already closed.
    fn open_batch(&mut self, index: u32) -> Result<(), SinkError>;

    fn write_row(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush and release the open batch. A no-op when none is open.
    fn close_batch(&mut self) -> Result<(), SinkError>;
}

/// Writes each batch as `product_details_{index}.csv` under one directory.
pub struct CsvBatchSink {
    dir: PathBuf,
    current: Option<(u32, csv::Writer<File>)>,
}

impl CsvBatchSink {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SinkError::Open {
            index: 0,
            message: format!("create {}: {e}", dir.display()),
        })?;
        Ok(Self {
            dir,
            current: None,
        })
    }

    pub fn batch_path(dir: &Path, index: u32) -> PathBuf {
        dir.join(format!("product_details_{index}.csv"))
    }
}

impl BatchSink for CsvBatchSink {
    fn open_batch(&mut self, index: u32) -> Result<(), SinkError> {
        self.close_batch()?;

        let path = Self::batch_path(&self.dir, index);
        let open_err = |message: String| SinkError::Open { index, message };

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| open_err(format!("{}: {e}", path.display())))?;
        writer
            .write_record(HEADER)
            .map_err(|e| open_err(e.to_string()))?;

        debug!(batch = index, path = %path.display(), "Opened batch");
        self.current = Some((index, writer));
        Ok(())
    }

    fn write_row(&mut self, record: &Record) -> Result<(), SinkError> {
        let Some((index, writer)) = self.current.as_mut() else {
            return Err(SinkError::Write {
                index: 0,
                message: "no batch open".to_string(),
            });
        };
        writer
            .write_record(record_row(record))
            .map_err(|e| SinkError::Write {
                index: *index,
                message: e.to_string(),
            })
    }

    fn close_batch(&mut self) -> Result<(), SinkError> {
        let Some((index, mut writer)) = self.current.take() else {
            return Ok(());
        };
        writer.flush().map_err(|e| SinkError::Write {
            index,
            message: e.to_string(),
        })?;

        let path = Self::batch_path(&self.dir, index);
        info!(batch = index, path = %path.display(), "Closed batch");
        Ok(())
    }
}

/// One CSV row in `HEADER` order.
pub fn record_row(record: &Record) -> Vec<String> {
    let n = &record.nutrition;
    let (vitamins, vitamins_descr) = join_labels(&record.vitamins);
    let (minerals, minerals_descr) = join_labels(&record.minerals);

    vec![
        record.id.clone(),
        record.name.clone(),
        record.category.clone(),
        record.eans.join(MULTI_VALUE_SEPARATOR),
        n.energy.clone(),
        n.protein.clone(),
        n.fat.clone(),
        n.carbohydrate.clone(),
        n.salt.clone(),
        n.water.clone(),
        n.sugar.clone(),
        n.calcium.clone(),
        n.glycemic_index.clone(),
        n.phenylalanine.clone(),
        n.alcohol.clone(),
        record.image.clone(),
        vitamins,
        vitamins_descr,
        minerals,
        minerals_descr,
    ]
}

fn join_labels(labels: &[Label]) -> (String, String) {
    let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
    let descriptions: Vec<&str> = labels.iter().map(|l| l.description.as_str()).collect();
    (
        names.join(MULTI_VALUE_SEPARATOR),
        descriptions.join(MULTI_VALUE_SEPARATOR),
    )
}
