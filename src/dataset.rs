use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ConfDir;
use crate::index::{DatasetRow, ImageId, SimilarityIndex};

/// Store-wide metadata written next to the feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Directory the image identifiers are relative to
    pub root: PathBuf,
    /// Feature vector length
    pub dim: usize,
}

/// On-disk feature table: `features.npy`, `images.json` and `meta.json`
pub struct DatasetStore {
    conf_dir: ConfDir,
}

impl DatasetStore {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir }
    }

    pub fn exists(&self) -> bool {
        self.conf_dir.features().exists()
            && self.conf_dir.images().exists()
            && self.conf_dir.meta().exists()
    }

    /// Write all rows, replacing any existing store
    pub fn save(&self, root: impl Into<PathBuf>, rows: &[DatasetRow]) -> Result<StoreMeta> {
        let dim = rows.first().map(|row| row.features.len()).unwrap_or(0);
        if let Some(row) = rows.iter().find(|row| row.features.len() != dim) {
            return Err(anyhow!(
                "inconsistent feature length for {:?}: expected {}, got {}",
                row.id,
                dim,
                row.features.len()
            ));
        }

        fs::create_dir_all(self.conf_dir.path())
            .with_context(|| format!("failed to create {}", self.conf_dir.path().display()))?;

        let flat: Vec<f64> =
            rows.iter().flat_map(|row| row.features.iter().copied()).collect();
        let matrix = Array2::from_shape_vec((rows.len(), dim), flat)?;

        // every file is renamed into place only once all are fully written
        let features = self.conf_dir.features();
        let features_tmp = tmp_path(&features);
        write_npy(&features_tmp, &matrix)
            .with_context(|| format!("failed to write {}", features_tmp.display()))?;

        let images = self.conf_dir.images();
        let images_tmp = tmp_path(&images);
        let ids: Vec<&ImageId> = rows.iter().map(|row| &row.id).collect();
        write_json(&images_tmp, &ids, false)?;

        let meta = StoreMeta { root: root.into(), dim };
        let meta_path = self.conf_dir.meta();
        let meta_tmp = tmp_path(&meta_path);
        write_json(&meta_tmp, &meta, true)?;

        let renames = [(features_tmp, &features), (images_tmp, &images), (meta_tmp, &meta_path)];
        for (tmp, path) in renames {
            fs::rename(&tmp, path)
                .with_context(|| format!("failed to move {} into place", path.display()))?;
        }
        debug!("wrote {}x{} feature matrix to {}", rows.len(), dim, features.display());
        info!("saved {} rows to {}", rows.len(), self.conf_dir.path().display());
        Ok(meta)
    }

    /// Read all rows back in their stored order
    pub fn load(&self) -> Result<(StoreMeta, Vec<DatasetRow>)> {
        let meta: StoreMeta = read_json(self.conf_dir.meta())?;
        let ids: Vec<ImageId> = read_json(self.conf_dir.images())?;
        let features = self.conf_dir.features();
        let matrix: Array2<f64> =
            read_npy(&features).with_context(|| format!("failed to read {}", features.display()))?;

        if matrix.nrows() != ids.len() {
            return Err(anyhow!(
                "store is corrupted: {} feature rows but {} images",
                matrix.nrows(),
                ids.len()
            ));
        }
        if !ids.is_empty() && matrix.ncols() != meta.dim {
            return Err(anyhow!(
                "store is corrupted: feature length {} but metadata says {}",
                matrix.ncols(),
                meta.dim
            ));
        }

        let rows = ids
            .into_iter()
            .zip(matrix.outer_iter())
            .map(|(id, features)| DatasetRow::new(id, features.to_vec()))
            .collect::<Vec<_>>();
        debug!("loaded {} rows from {}", rows.len(), self.conf_dir.path().display());
        Ok((meta, rows))
    }

    /// Load the store straight into a searchable index
    pub fn open_index(&self) -> Result<(StoreMeta, SimilarityIndex)> {
        let (meta, rows) = self.load()?;
        Ok((meta, SimilarityIndex::from_rows(rows)?))
    }
}

/// Read a comma separated feature table: `folder_name`, `filename`, then one
/// column per feature. Rows keep the table order.
pub fn read_feature_table(path: &Path) -> Result<Vec<DatasetRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader.headers()?;
    if headers.len() < 2 || &headers[0] != "folder_name" || &headers[1] != "filename" {
        return Err(anyhow!(
            "{}: leading columns must be `folder_name,filename`",
            path.display()
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let features = record
            .iter()
            .skip(2)
            .map(|field| {
                field.trim().parse::<f64>().with_context(|| {
                    format!("{}:{}: invalid feature value {:?}", path.display(), line, field)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(DatasetRow::new(ImageId::new(&record[0], &record[1]), features));
    }
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// `features.npy` -> `features.npy.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.flush().with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> DatasetStore {
        DatasetStore::new(ConfDir::new(dir.path().join("store")))
    }

    #[test]
    fn round_trip_keeps_order() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            DatasetRow::new(ImageId::new("b", "2.png"), vec![1.0, 2.0, 3.0]),
            DatasetRow::new(ImageId::new("a", "1.png"), vec![4.0, 5.5, -6.0]),
        ];
        let store = store(&dir);
        assert!(!store.exists());
        store.save("/data/leaves", &rows).unwrap();
        assert!(store.exists());

        let (meta, loaded) = store.load().unwrap();
        assert_eq!(meta, StoreMeta { root: PathBuf::from("/data/leaves"), dim: 3 });
        assert_eq!(loaded, rows);
    }

    #[test]
    fn empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("/data", &[]).unwrap();
        let (meta, rows) = store.load().unwrap();
        assert_eq!(meta.dim, 0);
        assert!(rows.is_empty());
    }

    #[test]
    fn rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            DatasetRow::new(ImageId::new("a", "1.png"), vec![1.0]),
            DatasetRow::new(ImageId::new("a", "2.png"), vec![1.0, 2.0]),
        ];
        assert!(store(&dir).save("/data", &rows).is_err());
    }

    #[test]
    fn save_replaces_store_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let first = vec![
            DatasetRow::new(ImageId::new("a", "1.png"), vec![1.0, 2.0]),
            DatasetRow::new(ImageId::new("a", "2.png"), vec![3.0, 4.0]),
        ];
        store.save("/old", &first).unwrap();
        let second = vec![DatasetRow::new(ImageId::new("b", "1.png"), vec![5.0, 6.0, 7.0])];
        store.save("/new", &second).unwrap();

        let (meta, loaded) = store.load().unwrap();
        assert_eq!(meta, StoreMeta { root: PathBuf::from("/new"), dim: 3 });
        assert_eq!(loaded, second);

        let mut names: Vec<_> = fs::read_dir(dir.path().join("store"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["features.npy", "images.json", "meta.json"]);
    }

    #[test]
    fn failed_save_keeps_previous_store() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let rows = vec![DatasetRow::new(ImageId::new("a", "1.png"), vec![1.0])];
        store.save("/data", &rows).unwrap();
        // a directory squatting on the temp name makes the metadata write fail
        fs::create_dir(dir.path().join("store/meta.json.tmp")).unwrap();

        let other = vec![DatasetRow::new(ImageId::new("b", "2.png"), vec![2.0, 3.0])];
        assert!(store.save("/other", &other).is_err());
        let (meta, loaded) = store.load().unwrap();
        assert_eq!(meta.root, PathBuf::from("/data"));
        assert_eq!(loaded, rows);
    }

    #[test]
    fn reads_feature_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(
            &path,
            "folder_name,filename,c0,c1,c2\nApple___scab,img1.jpg,1,2.5,-3e-2\nCorn,b.png,0,0,7\n",
        )
        .unwrap();
        let rows = read_feature_table(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                DatasetRow::new(ImageId::new("Apple___scab", "img1.jpg"), vec![1.0, 2.5, -0.03]),
                DatasetRow::new(ImageId::new("Corn", "b.png"), vec![0.0, 0.0, 7.0]),
            ]
        );
    }

    #[test]
    fn feature_table_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");

        fs::write(&path, "name,file,c0\na,b,1\n").unwrap();
        let err = read_feature_table(&path).unwrap_err();
        assert!(err.to_string().contains("folder_name,filename"));

        fs::write(&path, "folder_name,filename,c0\na,b,one\n").unwrap();
        let err = read_feature_table(&path).unwrap_err();
        assert!(err.to_string().contains(":2: invalid feature value"));

        fs::write(&path, "folder_name,filename,c0,c1\na,b,1\n").unwrap();
        assert!(read_feature_table(&path).is_err());

        assert!(read_feature_table(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn detects_row_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let rows = vec![DatasetRow::new(ImageId::new("a", "1.png"), vec![1.0])];
        store.save("/data", &rows).unwrap();
        fs::write(dir.path().join("store/images.json"), "[]").unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("corrupted"));
    }
}
