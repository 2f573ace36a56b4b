// ============================================
// src/viewer.rs
// 保存済みの表を見るための画面状態
// ============================================

use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::markup;
use crate::store::{Store, title_for};
use crate::syllable::Family;
use crate::table::{Side, Slot, Tone};

/// 列が多い表はこの列数ずつ見せる
pub const COL_SPLIT: usize = 5;

// MARK: スロット 1 枚分

/// 表示用のスロット。保存データに無ければプレースホルダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: Slot,
    pub label: String,
    pub title: String,
    pub desc: String,
    pub html: Option<String>,
}

impl SlotView {
    pub fn is_placeholder(&self) -> bool {
        self.html.is_none()
    }
}

pub fn slot_view(store: &Store, family: Family, tone: Tone, slot: Slot) -> SlotView {
    if let Some(entry) = store.slot(family, tone, slot) {
        return SlotView {
            slot,
            label: slot.as_str().to_string(),
            title: entry.title.clone(),
            desc: String::new(),
            html: Some(entry.html.clone()),
        };
    }

    if slot == Slot::C {
        return SlotView {
            slot,
            label: format!("C{tone}"),
            title: title_for(family, slot, tone),
            desc: format!("Mode button (tone {tone})"),
            html: None,
        };
    }

    SlotView {
        slot,
        label: slot.as_str().to_string(),
        title: title_for(family, slot, tone),
        desc: format!("Placeholder content for {family}-{slot}-{tone}"),
        html: None,
    }
}

// MARK: 列の切り替え

/// 横に長い表の表示範囲
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnView {
    /// 先頭 5 列
    #[default]
    First,
    /// 残り
    Rest,
    All,
}

impl ColumnView {
    pub fn needs_cycling(total: usize) -> bool {
        total > COL_SPLIT
    }

    /// 次の表示範囲。切り替えが不要な表ならそのまま
    pub fn cycled(self, total: usize) -> ColumnView {
        if !Self::needs_cycling(total) {
            return self;
        }
        match self {
            ColumnView::First => ColumnView::Rest,
            ColumnView::Rest => ColumnView::All,
            ColumnView::All => ColumnView::First,
        }
    }

    /// 見せるデータ列 (0 始まり、行見出しを除く)
    pub fn columns(self, total: usize) -> Range<usize> {
        if !Self::needs_cycling(total) {
            return 0..total;
        }
        match self {
            ColumnView::First => 0..COL_SPLIT,
            ColumnView::Rest => COL_SPLIT..total,
            ColumnView::All => 0..total,
        }
    }

    /// ページ表示用 (0, 1, 2)
    pub fn index(self) -> u8 {
        match self {
            ColumnView::First => 0,
            ColumnView::Rest => 1,
            ColumnView::All => 2,
        }
    }
}

// MARK: スワイプ

pub const SWIPE_MIN_X: f64 = 70.0;
pub const SWIPE_MAX_Y: f64 = 45.0;
pub const SWIPE_MAX_TIME: Duration = Duration::from_millis(700);

/// 横スワイプの判定。左へのスワイプで右面 (R) を出す
pub fn classify_swipe(dx: f64, dy: f64, elapsed: Duration) -> Option<Side> {
    if elapsed > SWIPE_MAX_TIME || dy.abs() > SWIPE_MAX_Y || dx.abs() < SWIPE_MIN_X {
        return None;
    }
    Some(if dx < 0.0 { Side::Right } else { Side::Left })
}

// MARK: 描画の重複防止

/// 描画中に来た描画要求は新しく始めずに今の描画に合流させる
#[derive(Debug, Default)]
pub struct RenderGate {
    in_flight: bool,
    joined: usize,
}

impl RenderGate {
    /// 描画を始めてよければ `true`。描画中なら合流扱いで `false`
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            self.joined += 1;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// 描画完了。合流した要求の数を返す
    pub fn finish(&mut self) -> usize {
        self.in_flight = false;
        std::mem::take(&mut self.joined)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

// MARK: ビューア

/// 表示中の韻母グループ・声調・面と、一度だけ読み込む表データ
pub struct Viewer {
    store: Option<Store>,
    pub family: Family,
    tone: Tone,
    pub pane: Side,
    pub columns: ColumnView,
    gate: RenderGate,
    slots: Vec<SlotView>,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewer {
    pub fn new() -> Self {
        Self {
            store: None,
            family: Family::A,
            tone: Tone::default(),
            pane: Side::Left,
            columns: ColumnView::First,
            gate: RenderGate::default(),
            slots: Vec::new(),
        }
    }

    /// 読み込み済みならそれを使う
    pub fn load_store(&mut self, path: &Path) -> &Store {
        self.store.get_or_insert_with(|| Store::load_or_default(path))
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    /// 範囲外は 1–4 に丸める
    pub fn set_tone(&mut self, tone: i64) {
        self.tone = Tone::clamped(tone);
    }

    pub fn next_family(&mut self) {
        let idx = self.family.index();
        self.family = Family::ALL[(idx + 1) % Family::ALL.len()];
        self.columns = ColumnView::First;
    }

    pub fn set_pane(&mut self, pane: Side) {
        self.pane = pane;
    }

    pub fn swipe(&mut self, dx: f64, dy: f64, elapsed: Duration) -> bool {
        match classify_swipe(dx, dy, elapsed) {
            Some(side) if side != self.pane => {
                self.pane = side;
                true
            }
            _ => false,
        }
    }

    /// 現在の表のデータ列数 (左側 L1 の見出しから数える)
    pub fn data_columns(&self) -> usize {
        self.slots
            .iter()
            .find_map(|v| v.html.as_deref().map(markup::data_column_count))
            .unwrap_or(0)
    }

    pub fn cycle_columns(&mut self) {
        self.columns = self.columns.cycled(self.data_columns());
    }

    /// 11 スロットを組み立て直す。描画中に呼ばれたら何もしない
    pub fn render(&mut self) -> bool {
        if !self.gate.begin() {
            return false;
        }
        let empty = Store::new();
        let store = self.store.as_ref().unwrap_or(&empty);
        self.slots = Slot::ALL
            .iter()
            .map(|slot| slot_view(store, self.family, self.tone, *slot))
            .collect();
        let joined = self.gate.finish();
        debug!(family = %self.family, tone = %self.tone, joined, "viewer rendered");
        true
    }

    pub fn slots(&self) -> &[SlotView] {
        &self.slots
    }

    pub fn gate_mut(&mut self) -> &mut RenderGate {
        &mut self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_for_missing_slots() {
        let store = Store::new();
        let tone = Tone::ALL[2];
        let c = slot_view(&store, Family::O, tone, Slot::C);
        assert_eq!(c.label, "C3");
        assert_eq!(c.title, "o · C · tone 3");
        assert!(c.is_placeholder());

        let r2 = slot_view(&store, Family::O, tone, Slot::R2);
        assert_eq!(r2.label, "R2");
        assert_eq!(r2.desc, "Placeholder content for o-R2-3");
    }

    #[test]
    fn stored_slots_are_used_verbatim() {
        let mut store = Store::new();
        store.normalize();
        let view = slot_view(&store, Family::A, Tone::default(), Slot::L1);
        assert!(!view.is_placeholder());
        assert_eq!(view.html.as_deref(), store.slot(Family::A, Tone::default(), Slot::L1).map(|e| e.html.as_str()));
    }

    #[test]
    fn tone_is_clamped() {
        let mut v = Viewer::new();
        v.set_tone(9);
        assert_eq!(v.tone().get(), 4);
        v.set_tone(-2);
        assert_eq!(v.tone().get(), 1);
    }

    #[test]
    fn column_views_cycle_only_for_wide_tables() {
        assert_eq!(ColumnView::First.cycled(5), ColumnView::First);
        assert_eq!(ColumnView::First.columns(5), 0..5);

        let v = ColumnView::First.cycled(10);
        assert_eq!(v, ColumnView::Rest);
        assert_eq!(v.columns(10), 5..10);
        assert_eq!(v.cycled(10).columns(10), 0..10);
        assert_eq!(v.cycled(10).cycled(10), ColumnView::First);
    }

    #[test]
    fn swipe_thresholds() {
        let quick = Duration::from_millis(300);
        assert_eq!(classify_swipe(-80.0, 10.0, quick), Some(Side::Right));
        assert_eq!(classify_swipe(90.0, -44.0, quick), Some(Side::Left));
        assert_eq!(classify_swipe(60.0, 0.0, quick), None);
        assert_eq!(classify_swipe(-80.0, 50.0, quick), None);
        assert_eq!(classify_swipe(-80.0, 0.0, Duration::from_millis(701)), None);
    }

    #[test]
    fn render_gate_joins_overlapping_requests() {
        let mut gate = RenderGate::default();
        assert!(gate.begin());
        assert!(!gate.begin());
        assert!(!gate.begin());
        assert_eq!(gate.finish(), 2);
        assert!(gate.begin());
        assert_eq!(gate.finish(), 0);
    }

    #[test]
    fn viewer_renders_all_slots_and_pages_wide_tables() {
        let mut store = Store::new();
        store.normalize();
        let mut v = Viewer::with_store(store);
        v.family = Family::I;
        assert!(v.render());
        assert_eq!(v.slots().len(), 11);
        assert_eq!(v.data_columns(), 10);
        v.cycle_columns();
        assert_eq!(v.columns, ColumnView::Rest);

        v.next_family();
        assert_eq!(v.family, Family::U);
        assert_eq!(v.columns, ColumnView::First);

        v.gate_mut().begin();
        assert!(!v.render());
    }

    #[test]
    fn swipe_switches_pane_once() {
        let mut v = Viewer::new();
        assert!(v.swipe(-100.0, 0.0, Duration::from_millis(200)));
        assert_eq!(v.pane, Side::Right);
        assert!(!v.swipe(-100.0, 0.0, Duration::from_millis(200)));
    }
}
