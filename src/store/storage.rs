use crate::config::StoreSettings;
use crate::store::StoreError;
use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub struct ExtractStore {
    file_path: PathBuf,
}

impl ExtractStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self::new(settings.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// 检查没有其他读写者持有该文件，不等待
    fn claim_exclusive(&self, file: &File) -> Result<(), StoreError> {
        FileExt::try_lock_exclusive(file).map_err(|e| StoreError::Busy {
            path: self.file_path.display().to_string(),
            source: e,
        })
    }

    fn claim_shared(&self, file: &File) -> Result<(), StoreError> {
        FileExt::try_lock_shared(file).map_err(|e| StoreError::Busy {
            path: self.file_path.display().to_string(),
            source: e,
        })
    }

    /// 追加写入键值映射
    ///
    /// 只接受 JSON object，其他类型记录日志后忽略。
    pub fn write(&self, value: &Value) -> Result<(), StoreError> {
        let Some(map) = value.as_object() else {
            warn!("Extract store only accepts key/value mappings, got: {}", value);
            return Ok(());
        };
        if map.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;
        let line = serde_json::to_string(map)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        self.claim_exclusive(&file)?;

        writeln!(file, "{}", line)?;
        debug!("Extract store <- {}", line);

        Ok(())
    }

    /// 写入单个键值
    pub fn write_entry(&self, key: impl Into<String>, value: Value) -> Result<(), StoreError> {
        let mut map = Map::new();
        map.insert(key.into(), value);
        self.write(&Value::Object(map))
    }

    /// 读取全部键值，同一 key 以最后一次写入为准
    pub fn snapshot(&self) -> Result<Map<String, Value>, StoreError> {
        let mut entries = Map::new();
        if !self.file_path.exists() {
            return Ok(entries);
        }

        let file = File::open(&self.file_path)?;
        self.claim_shared(&file)?;

        for (index, line) in BufReader::new(&file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Map<String, Value>>(&line) {
                Ok(map) => entries.extend(map),
                Err(e) => warn!(
                    "Skipping malformed line {} in {}: {}",
                    index + 1,
                    self.file_path.display(),
                    e
                ),
            }
        }

        Ok(entries)
    }

    /// 读取 key（可选二级 key）对应的值
    pub fn read(&self, key: &str, subkey: Option<&str>) -> Result<Value, StoreError> {
        let mut entries = self.snapshot()?;

        let value = entries.remove(key).ok_or_else(|| {
            error!("Extract store has no entry for '{}'", key);
            StoreError::NotFound(key.to_string())
        })?;

        match subkey {
            None => Ok(value),
            Some(sub) => value.get(sub).cloned().ok_or_else(|| {
                error!("Extract store has no entry for '{}.{}'", key, sub);
                StoreError::NotFound(format!("{}.{}", key, sub))
            }),
        }
    }

    /// 清空存储
    pub fn clear(&self) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.file_path)?;
        self.claim_exclusive(&file)?;
        file.set_len(0)?;
        debug!("Extract store cleared: {}", self.file_path.display());
        Ok(())
    }
}
