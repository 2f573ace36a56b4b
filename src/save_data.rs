// ============================================
// src/save_data.rs
// 練習ゲームの設定と抽選履歴の保存 (バイナリ優先、JSON フォールバック)
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::config::DataPaths;
use crate::error::{Error, Result};
use crate::sampler::Mode;

/// 練習ゲームの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PracticeSettings {
    /// リールに画像を出す
    pub reel_images: bool,
    /// 結果に画像を出す
    pub result_images: bool,
    pub allow_invalid_combos: bool,
    pub jackpot_only: bool,
    /// ハイブリッド時にボーナス側を引く確率 (0–100)
    pub jackpot_probability: u8,
    /// リールが回る基本時間 (秒)
    pub spin_speed: f64,
    /// リールごとの停止のずれ (ミリ秒)
    pub reel_stop_delay: u32,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            reel_images: true,
            result_images: false,
            allow_invalid_combos: false,
            jackpot_only: false,
            jackpot_probability: 50,
            spin_speed: 2.0,
            reel_stop_delay: 500,
        }
    }
}

impl PracticeSettings {
    pub fn mode(&self) -> Mode {
        Mode::from_settings(self.allow_invalid_combos, self.jackpot_only)
    }

    /// 存在しない組み合わせを許可するか。切ると「ボーナスのみ」も切れる
    pub fn set_allow_invalid(&mut self, on: bool) {
        self.allow_invalid_combos = on;
        if !on {
            self.jackpot_only = false;
        }
    }

    /// 「ボーナスのみ」。入れると存在しない組み合わせの許可も入る
    pub fn set_jackpot_only(&mut self, on: bool) {
        self.jackpot_only = on;
        if on {
            self.allow_invalid_combos = true;
        }
    }

    pub fn set_jackpot_probability(&mut self, percent: i32) {
        self.jackpot_probability = percent.clamp(0, 100) as u8;
    }

    /// 確率の設定が意味を持つか (ハイブリッドのときだけ)
    pub fn probability_enabled(&self) -> bool {
        self.allow_invalid_combos && !self.jackpot_only
    }
}

/// 保存するもの一式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeData {
    pub settings: PracticeSettings,
    /// 引いた組み合わせ (`"c|t|f"`) を引いた順に
    pub history: Vec<String>,
    pub last_played: Option<DateTime<Utc>>,
}

/// bincode用の内部表現（DateTimeをi64に変換）
#[derive(Encode, Decode)]
struct PracticeSettingsBin {
    reel_images: bool,
    result_images: bool,
    allow_invalid_combos: bool,
    jackpot_only: bool,
    jackpot_probability: u8,
    spin_speed: f64,
    reel_stop_delay: u32,
}

#[derive(Encode, Decode)]
struct PracticeDataBin {
    settings: PracticeSettingsBin,
    history: Vec<String>,
    last_played_secs: Option<i64>,
}

impl From<&PracticeData> for PracticeDataBin {
    fn from(data: &PracticeData) -> Self {
        let s = &data.settings;
        Self {
            settings: PracticeSettingsBin {
                reel_images: s.reel_images,
                result_images: s.result_images,
                allow_invalid_combos: s.allow_invalid_combos,
                jackpot_only: s.jackpot_only,
                jackpot_probability: s.jackpot_probability,
                spin_speed: s.spin_speed,
                reel_stop_delay: s.reel_stop_delay,
            },
            history: data.history.clone(),
            last_played_secs: data.last_played.map(|t| t.timestamp()),
        }
    }
}

impl From<PracticeDataBin> for PracticeData {
    fn from(bin: PracticeDataBin) -> Self {
        let s = bin.settings;
        Self {
            settings: PracticeSettings {
                reel_images: s.reel_images,
                result_images: s.result_images,
                allow_invalid_combos: s.allow_invalid_combos,
                jackpot_only: s.jackpot_only,
                jackpot_probability: s.jackpot_probability.min(100),
                spin_speed: s.spin_speed,
                reel_stop_delay: s.reel_stop_delay,
            },
            history: bin.history,
            // 範囲外の時刻は記録なし扱い
            last_played: bin
                .last_played_secs
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

impl PracticeData {
    /// MARK:データをファイルに保存する (バイナリ + JSON)
    pub fn save(&self, paths: &DataPaths) -> Result<()> {
        // --- 1. バイナリ形式で保存 (本番用) ---
        let bin_path = paths.practice_bin();
        let encoded = bincode::encode_to_vec(PracticeDataBin::from(self), standard())?;
        let file = File::create(&bin_path).map_err(|e| Error::io(&bin_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&encoded)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::io(&bin_path, e))?;

        // --- 2. JSON形式で保存 (デバッグ用) ---
        let json_path = paths.practice_json();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&json_path, json).map_err(|e| Error::io(&json_path, e))?;

        debug!(entries = self.history.len(), "practice data saved");
        Ok(())
    }

    /// MARK:ファイルからデータを読み込む (バイナリ優先、JSONフォールバック)
    pub fn load(paths: &DataPaths) -> Self {
        // 1. バイナリファイルから読み込みを試行
        match read_bin(&paths.practice_bin()) {
            Ok(Some(data)) => return data,
            Ok(None) => {}
            Err(err) => warn!(%err, "practice.bin unreadable, trying JSON"),
        }

        // 2. バイナリ失敗時、JSONファイルから読み込みを試行
        match read_json(&paths.practice_json()) {
            Ok(Some(data)) => return data,
            Ok(None) => {}
            Err(err) => warn!(%err, "practice.json unreadable, using defaults"),
        }

        // どちらも失敗した場合はデフォルト
        Self::default()
    }
}

fn read_bin(path: &Path) -> Result<Option<PracticeData>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut buffer = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut buffer))
        .map_err(|e| Error::io(path, e))?;
    let (bin, _) = bincode::decode_from_slice::<PracticeDataBin, _>(&buffer, standard())?;
    Ok(Some(PracticeData::from(bin)))
}

fn read_json(path: &Path) -> Result<Option<PracticeData>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut data: PracticeData = serde_json::from_reader(BufReader::new(file))?;
    data.settings.jackpot_probability = data.settings.jackpot_probability.min(100);
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> (tempfile::TempDir, DataPaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path()).unwrap();
        (tmp, paths)
    }

    #[test]
    fn toggles_keep_modes_consistent() {
        let mut s = PracticeSettings::default();
        assert_eq!(s.mode(), Mode::Strict);

        s.set_jackpot_only(true);
        assert!(s.allow_invalid_combos);
        assert_eq!(s.mode(), Mode::BonusOnly);
        assert!(!s.probability_enabled());

        s.set_jackpot_only(false);
        assert_eq!(s.mode(), Mode::Hybrid);
        assert!(s.probability_enabled());

        s.set_jackpot_only(true);
        s.set_allow_invalid(false);
        assert!(!s.jackpot_only);
        assert_eq!(s.mode(), Mode::Strict);

        s.set_jackpot_probability(250);
        assert_eq!(s.jackpot_probability, 100);
        s.set_jackpot_probability(-3);
        assert_eq!(s.jackpot_probability, 0);
    }

    #[test]
    fn missing_files_give_defaults() {
        let (_tmp, paths) = paths();
        assert_eq!(PracticeData::load(&paths), PracticeData::default());
    }

    #[test]
    fn binary_round_trip() {
        let (_tmp, paths) = paths();
        let mut data = PracticeData::default();
        data.settings.set_jackpot_only(true);
        data.history = vec!["0|0|5".into(), "3|2|0".into()];
        data.last_played = Utc.timestamp_opt(1_700_000_000, 0).single();
        data.save(&paths).unwrap();

        assert!(paths.practice_bin().exists());
        assert!(paths.practice_json().exists());
        assert_eq!(PracticeData::load(&paths), data);
    }

    #[test]
    fn falls_back_to_json_when_binary_is_broken() {
        let (_tmp, paths) = paths();
        fs::write(paths.practice_bin(), [0xff, 0x00, 0x13]).unwrap();
        fs::write(
            paths.practice_json(),
            r#"{"settings":{"spinSpeed":3.5,"jackpotProbability":120},"history":["1|1|1"]}"#,
        )
        .unwrap();

        let data = PracticeData::load(&paths);
        assert_eq!(data.settings.spin_speed, 3.5);
        assert_eq!(data.settings.jackpot_probability, 100);
        assert!(data.settings.reel_images);
        assert_eq!(data.history, vec!["1|1|1"]);
    }
}
