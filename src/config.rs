// ============================================
// src/config.rs
// データ保存先ディレクトリとファイル名
// ============================================

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{Error, Result};

/// データディレクトリ内のファイル一式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    dir: PathBuf,
}

impl DataPaths {
    /// 指定があればそのディレクトリ、無ければ OS ごとのデータディレクトリ
    pub fn resolve(dir_override: Option<PathBuf>) -> Result<Self> {
        let dir = match dir_override {
            Some(dir) => dir,
            None => ProjectDirs::from("jp", "Fukumoto0141", "PINYIN_WIZ")
                .map(|proj| proj.data_dir().to_path_buf())
                .ok_or(Error::NoDataDir)?,
        };
        Self::at(dir)
    }

    /// ディレクトリを作成して使う (テストでは一時ディレクトリを渡す)
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 表の保存データ (JSON)
    pub fn store(&self) -> PathBuf {
        self.dir.join("pinyintable.json")
    }

    /// ビルダー画面の状態
    pub fn builder_state(&self) -> PathBuf {
        self.dir.join("builder_state.json")
    }

    /// 練習ゲームの設定と履歴 (バイナリ)
    pub fn practice_bin(&self) -> PathBuf {
        self.dir.join("practice.bin")
    }

    /// 練習ゲームの設定と履歴 (デバッグ用 JSON)
    pub fn practice_json(&self) -> PathBuf {
        self.dir.join("practice.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join("pinyinwiz.log")
    }
}
