use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard},
    time::Instant,
};

use crate::app::AppError;

/// One CSV file held in memory, rewritten whole on every change.
#[derive(Debug)]
pub struct CsvTable<T> {
    rows: RwLock<Vec<T>>,
    path: PathBuf,
}

impl<T> CsvTable<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Err(err) = std::fs::metadata(&path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new table at {}", path.display());
                    std::fs::File::create(&path)?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(&path)?;
        let rows = csv_reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .with_context(|| format!("malformed row in {}", path.display()))?;

        log::debug!(
            "took {}ms to read {}",
            now.elapsed().as_micros() as f64 / 1000.0,
            path.display()
        );

        Ok(Self {
            rows: RwLock::new(rows),
            path,
        })
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.rows.read().unwrap()
    }

    /// Apply `f` to a copy of the rows and persist it.
    ///
    /// Rows stay untouched when `f` fails or the file cannot be written.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut rows = self.rows.write().unwrap();
        let mut next = rows.clone();

        let result = f(&mut next)?;
        self.save(&next)?;
        *rows = next;

        Ok(result)
    }

    fn save(&self, rows: &[T]) -> Result<(), AppError> {
        let temp_path = format!("{}-tmp", self.path.display());

        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        for row in rows {
            csv_wrt.serialize(row)?;
        }
        csv_wrt.flush()?;

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

pub fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}
