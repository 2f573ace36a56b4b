// ============================================
// src/store.rs
// 表データ (pinyintable.json) の構造と読み書き、旧形式からの移行
// ============================================

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::overrides::{CellOverride, OverrideLayer};
use crate::syllable::Family;
use crate::table::{Side, Slot, Tone};

/// 現在の保存形式。`overrides` を正として `html` を再生成する形式が 2
pub const SCHEMA_VERSION: u32 = 2;

/// 1スロット分の書き出し済み表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html: String,
}

/// ビルダーの保存回数など
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderMeta {
    pub version: String,
    pub last_edited: Option<DateTime<Utc>>,
    pub save_count: u32,
}

impl Default for BuilderMeta {
    fn default() -> Self {
        Self {
            version: "0.0".to_string(),
            last_edited: None,
            save_count: 0,
        }
    }
}

impl BuilderMeta {
    /// 保存のたびに版を 0.1 上げる
    pub fn bump(&mut self, now: DateTime<Utc>) {
        let base = self.version.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0);
        let bumped = ((base * 10.0).round() + 1.0) / 10.0;
        self.version = format!("{bumped:.1}");
        self.last_edited = Some(now);
        self.save_count += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    #[serde(default = "default_families")]
    pub families: Vec<String>,
    #[serde(default = "default_tones")]
    pub tones: Vec<u8>,
    #[serde(default = "default_slots")]
    pub slots: Vec<String>,
    #[serde(default)]
    pub builder: BuilderMeta,
    /// 旧形式には無いので 0 になる
    #[serde(default)]
    pub schema: u32,
}

fn default_families() -> Vec<String> {
    Family::ALL.iter().map(|f| f.as_str().to_string()).collect()
}

fn default_tones() -> Vec<u8> {
    Tone::ALL.iter().map(|t| t.get()).collect()
}

fn default_slots() -> Vec<String> {
    Slot::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

impl StoreMeta {
    fn legacy() -> Self {
        Self {
            families: default_families(),
            tones: default_tones(),
            slots: default_slots(),
            builder: BuilderMeta::default(),
            schema: 0,
        }
    }
}

/// 韻母グループ → 声調 → スロット
pub type SlotTree<T> = BTreeMap<String, BTreeMap<String, BTreeMap<String, T>>>;

/// 保存データ全体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default = "StoreMeta::legacy")]
    pub meta: StoreMeta,
    #[serde(default)]
    pub data: SlotTree<SlotEntry>,
    /// セルの上書き (`"b|a" → CellOverride`)。`data` の html はここから作り直す
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: SlotTree<BTreeMap<String, CellOverride>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub fn title_for(family: Family, slot: Slot, tone: Tone) -> String {
    format!("{family} · {slot} · tone {tone}")
}

impl Store {
    pub fn new() -> Self {
        Self {
            meta: StoreMeta {
                schema: SCHEMA_VERSION,
                ..StoreMeta::legacy()
            },
            data: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn slot(&self, family: Family, tone: Tone, slot: Slot) -> Option<&SlotEntry> {
        self.data
            .get(family.as_str())?
            .get(&tone.to_string())?
            .get(slot.as_str())
    }

    fn slot_overrides(&self, family: Family, tone: Tone, slot: Slot) -> Option<&BTreeMap<String, CellOverride>> {
        self.overrides
            .get(family.as_str())?
            .get(&tone.to_string())?
            .get(slot.as_str())
    }

    /// ビュー 1 つ分の上書き状態を組み立てる
    pub fn layer(&self, family: Family, tone: Tone, side: Side) -> OverrideLayer {
        let mut layer = OverrideLayer::new(family, side);
        for slot in Slot::for_side(side) {
            if let Some(entries) = self.slot_overrides(family, tone, slot) {
                layer.load_slot_entries(entries);
            }
        }
        layer
    }

    /// 上書き状態を書き戻し、その面のスロットの html を作り直す
    pub fn set_layer(&mut self, tone: Tone, layer: &OverrideLayer) {
        let family = layer.family();
        for slot in Slot::for_side(layer.side()) {
            let entries = layer.slot_entries(slot);
            self.put_overrides(family, tone, slot, entries);
            self.put_slot(family, tone, slot, layer.render_slot(slot));
        }
    }

    fn put_overrides(&mut self, family: Family, tone: Tone, slot: Slot, entries: BTreeMap<String, CellOverride>) {
        let key = family.as_str().to_string();
        if entries.is_empty() {
            let Some(tones) = self.overrides.get_mut(&key) else {
                return;
            };
            if let Some(slots) = tones.get_mut(&tone.to_string()) {
                slots.remove(slot.as_str());
                if slots.is_empty() {
                    tones.remove(&tone.to_string());
                }
            }
            if tones.is_empty() {
                self.overrides.remove(&key);
            }
            return;
        }
        self.overrides
            .entry(key)
            .or_default()
            .entry(tone.to_string())
            .or_default()
            .insert(slot.as_str().to_string(), entries);
    }

    fn put_slot(&mut self, family: Family, tone: Tone, slot: Slot, html: String) {
        self.data
            .entry(family.as_str().to_string())
            .or_default()
            .entry(tone.to_string())
            .or_default()
            .insert(
                slot.as_str().to_string(),
                SlotEntry {
                    title: title_for(family, slot, tone),
                    html,
                },
            );
    }

    // MARK: 旧形式の移行

    /// 旧形式 (html だけが正) なら html からセル状態を読み戻して `overrides` を作る
    ///
    /// 移行したら `true`。既定と同じ文字列は上書きとして残さない。
    pub fn migrate(&mut self) -> bool {
        if self.meta.schema >= SCHEMA_VERSION {
            return false;
        }

        let mut migrated = 0usize;
        for family in Family::ALL {
            for tone in Tone::ALL {
                for side in Side::ALL {
                    let mut layer = OverrideLayer::new(family, side);
                    for slot in Slot::for_side(side) {
                        if let Some(entry) = self.slot(family, tone, slot) {
                            if !entry.html.trim().is_empty() {
                                layer.reconcile_from_markup(slot, &entry.html);
                            }
                        }
                    }
                    migrated += layer.len();
                    for slot in Slot::for_side(side) {
                        self.put_overrides(family, tone, slot, layer.slot_entries(slot));
                    }
                }
            }
        }

        info!(from = self.meta.schema, to = SCHEMA_VERSION, cells = migrated, "store migrated");
        self.meta.schema = SCHEMA_VERSION;
        self.normalize();
        true
    }

    /// 全グループ × 全声調 × 全スロットの html を上書き状態から作り直す
    ///
    /// 何度呼んでも結果は同じ。
    pub fn normalize(&mut self) {
        self.meta.families = default_families();
        self.meta.tones = default_tones();
        self.meta.slots = default_slots();

        for family in Family::ALL {
            for tone in Tone::ALL {
                for side in Side::ALL {
                    let layer = self.layer(family, tone, side);
                    for slot in Slot::for_side(side) {
                        self.put_slot(family, tone, slot, layer.render_slot(slot));
                    }
                }
            }
        }
        debug!("store normalized");
    }

    // MARK: ファイル入出力

    /// JSON を読んで必要なら移行する
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut store: Store = serde_json::from_str(&raw)?;
        store.migrate();
        Ok(store)
    }

    /// 起動時の読み込み。無い・壊れている場合は空の表
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }
        match Self::read(path) {
            Ok(store) => {
                info!(path = %path.display(), "store loaded");
                store
            }
            Err(err) => {
                warn!(%err, "store unreadable, starting empty");
                Self::new()
            }
        }
    }

    /// 一時ファイルに書いてから置き換える
    pub fn write(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush().map_err(|e| Error::io(path, e))?;
        }
        temp.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }

    /// ファイルを丸ごと読み込んで置き換える。失敗時は今の状態のまま
    pub fn import_file(&mut self, path: &Path) -> Result<()> {
        let store = Self::read(path)?;
        *self = store;
        info!(path = %path.display(), "store imported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syllable::{Final, Initial};

    #[test]
    fn bump_version_and_counts() {
        let mut meta = BuilderMeta::default();
        let now = Utc::now();
        meta.bump(now);
        assert_eq!(meta.version, "0.1");
        meta.bump(now);
        assert_eq!(meta.version, "0.2");
        assert_eq!(meta.save_count, 2);
        assert_eq!(meta.last_edited, Some(now));

        let mut odd = BuilderMeta {
            version: "abc".into(),
            ..BuilderMeta::default()
        };
        odd.bump(now);
        assert_eq!(odd.version, "0.1");

        let mut nine = BuilderMeta {
            version: "0.9".into(),
            ..BuilderMeta::default()
        };
        nine.bump(now);
        assert_eq!(nine.version, "1.0");
    }

    #[test]
    fn normalize_fills_every_table_slot() {
        let mut store = Store::new();
        store.normalize();
        for family in Family::ALL {
            for tone in Tone::ALL {
                for slot in Slot::TABLES {
                    let entry = store.slot(family, tone, slot).expect("slot present");
                    assert_eq!(entry.title, title_for(family, slot, tone));
                    assert!(entry.html.contains("pinyin-grid-table"));
                }
                assert!(store.slot(family, tone, Slot::C).is_none());
            }
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut store = Store::new();
        let mut layer = store.layer(Family::I, Tone::ALL[1], Side::Right);
        layer.set_override(Initial::J, Final::Iong, "custom");
        store.set_layer(Tone::ALL[1], &layer);
        store.normalize();
        let once = store.clone();
        store.normalize();
        assert_eq!(store, once);
    }

    #[test]
    fn layer_survives_set_and_reload() {
        let mut store = Store::new();
        let tone = Tone::ALL[0];
        let mut layer = store.layer(Family::A, tone, Side::Left);
        layer.set_off(Initial::B, Final::Ang, true);
        store.set_layer(tone, &layer);
        assert_eq!(store.layer(Family::A, tone, Side::Left), layer);
        assert!(store.layer(Family::A, tone, Side::Right).is_empty());

        layer.set_off(Initial::B, Final::Ang, false);
        store.set_layer(tone, &layer);
        assert!(store.overrides.is_empty());
    }

    #[test]
    fn legacy_document_is_migrated() {
        // html だけを持つ旧形式。右側にラテン文字の既定と本物の編集が混ざっている
        let tone = Tone::ALL[0];
        let mut stale = OverrideLayer::new(Family::A, Side::Left);
        stale.set_override(Initial::D, Final::An, "dan*");
        let mut legacy = Store::new();
        legacy.meta.schema = 0;
        legacy.put_slot(Family::A, tone, Slot::R2, stale.render_slot(Slot::L2));

        assert!(legacy.migrate());
        assert_eq!(legacy.meta.schema, SCHEMA_VERSION);
        let layer = legacy.layer(Family::A, tone, Side::Right);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.effective_text(Initial::D, Final::An), "dan*");
        assert_eq!(layer.effective_text(Initial::D, Final::A), "دآ");
        assert!(!legacy.migrate());
    }

    #[test]
    fn reads_document_without_meta() {
        let json = r#"{"data":{"a":{"1":{"L1":{"title":"t","html":"<table><tbody><tr><th>b</th><td></td></tr></tbody></table>"}}}}}"#;
        let mut store: Store = serde_json::from_str(json).unwrap();
        assert_eq!(store.meta.schema, 0);
        store.migrate();
        let layer = store.layer(Family::A, Tone::ALL[0], Side::Left);
        assert!(layer.is_off(Initial::B, Final::A));
        assert!(!layer.is_off(Initial::B, Final::Ai));
    }

    #[test]
    fn write_then_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pinyintable.json");
        let mut store = Store::new();
        store.normalize();
        store.write(&path).unwrap();
        assert_eq!(Store::read(&path).unwrap(), store);
    }

    #[test]
    fn failed_import_keeps_previous_store() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.json");
        fs::write(&bad, "{ nope").unwrap();

        let mut store = Store::new();
        store.meta.builder.save_count = 7;
        assert!(store.import_file(&bad).is_err());
        assert_eq!(store.meta.builder.save_count, 7);
        assert!(store.import_file(&tmp.path().join("missing.json")).is_err());
    }
}
