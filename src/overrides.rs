// ============================================
// src/overrides.rs
// セル単位の上書き (非表示 / 手入力テキスト) と既定表記の重ね合わせ
// ============================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::markup::{self, TableSpec};
use crate::syllable::{Family, Final, Initial, is_legal, latin_spelling};
use crate::table::{Side, Slot, display_spelling};

/// 1 セル分の上書き。既定のままのセルはエントリを持たない
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOverride {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub off: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CellOverride {
    fn is_default(&self) -> bool {
        !self.off && self.text.is_none()
    }
}

/// 保存用のセルキー (`"b|a"`)
pub fn cell_key(initial: Initial, fin: Final) -> String {
    format!("{}|{}", initial.as_str(), fin.as_str())
}

pub fn parse_cell_key(key: &str) -> Option<(Initial, Final)> {
    let (i, f) = key.split_once('|')?;
    Some((i.parse().ok()?, f.parse().ok()?))
}

/// 1つのビュー (韻母グループ × 声調 × 表示面) の上書き状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideLayer {
    family: Family,
    side: Side,
    cells: BTreeMap<(Initial, Final), CellOverride>,
}

impl OverrideLayer {
    pub fn new(family: Family, side: Side) -> Self {
        Self {
            family,
            side,
            cells: BTreeMap::new(),
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, initial: Initial, fin: Final) -> Option<&CellOverride> {
        self.cells.get(&(initial, fin))
    }

    /// 上書きが無いときの表記
    pub fn default_text(&self, initial: Initial, fin: Final) -> Option<String> {
        display_spelling(self.side, self.family, initial, fin)
    }

    pub fn is_off(&self, initial: Initial, fin: Final) -> bool {
        !is_legal(initial, fin) || self.get(initial, fin).is_some_and(|c| c.off)
    }

    /// セルに実際に表示する文字列。非表示・存在しない組み合わせは空
    pub fn effective_text(&self, initial: Initial, fin: Final) -> String {
        if self.is_off(initial, fin) {
            return String::new();
        }
        match self.get(initial, fin).and_then(|c| c.text.clone()) {
            Some(text) => text,
            None => self.default_text(initial, fin).unwrap_or_default(),
        }
    }

    fn update(&mut self, initial: Initial, fin: Final, f: impl FnOnce(&mut CellOverride)) {
        let entry = self.cells.entry((initial, fin)).or_default();
        f(entry);
        if entry.is_default() {
            self.cells.remove(&(initial, fin));
        }
    }

    /// 手入力テキストを設定する。既定と同じ・空文字なら上書きを消す
    ///
    /// 非表示のセルを編集すると表示に戻る。存在しない組み合わせは `false`。
    pub fn set_override(&mut self, initial: Initial, fin: Final, text: &str) -> bool {
        let Some(default) = self.default_text(initial, fin) else {
            return false;
        };
        let text = text.trim();
        let custom = (!text.is_empty() && text != default).then(|| text.to_string());
        self.update(initial, fin, |cell| {
            cell.off = false;
            cell.text = custom;
        });
        true
    }

    /// 非表示の切り替え。手入力テキストは保持したまま
    pub fn set_off(&mut self, initial: Initial, fin: Final, off: bool) -> bool {
        if !is_legal(initial, fin) {
            return false;
        }
        self.update(initial, fin, |cell| cell.off = off);
        true
    }

    pub fn toggle_off(&mut self, initial: Initial, fin: Final) -> bool {
        let now_off = !self.is_off(initial, fin);
        self.set_off(initial, fin, now_off) && now_off
    }

    /// 全セル編集モードの確定: 空なら非表示、文字があれば表示して必要なら上書き
    pub fn commit_cell_input(&mut self, initial: Initial, fin: Final, input: &str) -> bool {
        if input.trim().is_empty() {
            if !is_legal(initial, fin) {
                return false;
            }
            self.update(initial, fin, |cell| {
                cell.off = true;
                cell.text = None;
            });
            return true;
        }
        self.set_override(initial, fin, input)
    }

    /// 表示中 / 非表示のセル数 (存在する組み合わせのみ数える)
    pub fn counts(&self, rows: &[Initial]) -> (usize, usize) {
        let mut total = 0;
        let mut off = 0;
        for initial in rows {
            for fin in self.family.finals() {
                if !is_legal(*initial, *fin) {
                    continue;
                }
                total += 1;
                if self.is_off(*initial, *fin) {
                    off += 1;
                }
            }
        }
        (total - off, off)
    }

    /// スロット 1 つ分の HTML 断片
    pub fn render_slot(&self, slot: Slot) -> String {
        let spec = TableSpec {
            family: self.family,
            side: slot.side().unwrap_or(self.side),
            dir: slot.dir(),
            rows: slot.initials(),
        };
        markup::render_table(&spec, |i, f| self.effective_text(i, f))
    }

    /// 保存済みの HTML 断片からセル状態を読み戻す
    ///
    /// 既定表記 (ラテン文字・表示面の既定のどちらか) と同じ文字列は上書きとみなさない。
    /// 以前は右側にもラテン文字の既定を保存していたため、その名残を手入力扱いにしない。
    pub fn reconcile_from_markup(&mut self, slot: Slot, html: &str) {
        let rows = slot.initials();
        let cols = self.family.finals();

        for (r, texts) in markup::body_cells(html).into_iter().enumerate() {
            let Some(&initial) = rows.get(r) else { break };
            for (c, raw) in texts.into_iter().enumerate() {
                let Some(&fin) = cols.get(c) else { break };
                let Some(latin) = latin_spelling(initial, fin) else {
                    continue;
                };
                if raw.is_empty() {
                    self.set_off(initial, fin, true);
                    continue;
                }
                let display = self.default_text(initial, fin).unwrap_or_default();
                if raw == latin || raw == display {
                    continue;
                }
                self.update(initial, fin, |cell| cell.text = Some(raw));
            }
        }
    }

    /// スロット単位の保存形式 (`"b|a" → CellOverride`)
    pub fn slot_entries(&self, slot: Slot) -> BTreeMap<String, CellOverride> {
        let rows = slot.initials();
        self.cells
            .iter()
            .filter(|((i, _), _)| rows.contains(i))
            .map(|((i, f), cell)| (cell_key(*i, *f), cell.clone()))
            .collect()
    }

    /// 保存形式から読み込む。読めないキーや存在しない組み合わせは捨てる
    pub fn load_slot_entries(&mut self, entries: &BTreeMap<String, CellOverride>) {
        for (key, cell) in entries {
            let Some((initial, fin)) = parse_cell_key(key) else {
                continue;
            };
            if !is_legal(initial, fin) || !self.family.finals().contains(&fin) {
                continue;
            }
            let mut cell = cell.clone();
            // 既定と同じテキストは保存しない
            if cell.text.is_some() && cell.text == self.default_text(initial, fin) {
                cell.text = None;
            }
            self.update(initial, fin, |c| *c = cell);
        }
    }
}
