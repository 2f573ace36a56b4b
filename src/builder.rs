// ============================================
// src/builder.rs
// 表ビルダーの編集セッション
// ============================================

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::DataPaths;
use crate::context::{ViewAction, ViewContext};
use crate::draft::DraftWriter;
use crate::error::Result;
use crate::overrides::OverrideLayer;
use crate::store::Store;
use crate::syllable::{Final, Initial};
use crate::table::Slot;

/// 編集中のビュー・上書き状態・保存データ一式
pub struct BuilderSession {
    ctx: ViewContext,
    layer: OverrideLayer,
    store: Store,
    draft: DraftWriter,
    paths: DataPaths,
}

impl BuilderSession {
    /// 保存済みの状態と表データを読み込んで開く
    pub fn open(paths: DataPaths) -> Self {
        let ctx = ViewContext::load(&paths.builder_state());
        let store = Store::load_or_default(&paths.store());
        let layer = store.layer(ctx.family, ctx.tone, ctx.side);
        Self {
            ctx,
            layer,
            store,
            draft: DraftWriter::new(),
            paths,
        }
    }

    pub fn context(&self) -> ViewContext {
        self.ctx
    }

    pub fn layer(&self) -> &OverrideLayer {
        &self.layer
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn has_pending_draft(&self) -> bool {
        self.draft.is_pending()
    }

    /// ビューを切り替える。切り替え前に下書きを書き出す
    pub fn dispatch(&mut self, action: ViewAction) -> Result<()> {
        self.flush_draft()?;
        let next = self.ctx.apply(action);
        if next == self.ctx {
            return Ok(());
        }
        self.ctx = next;
        self.layer = self.store.layer(next.family, next.tone, next.side);
        next.save(&self.paths.builder_state())?;
        debug!(family = %next.family, tone = %next.tone, side = %next.side, edit = next.edit_mode, "view changed");
        Ok(())
    }

    // MARK: セル操作

    fn edited(&mut self, now: Instant) {
        self.store.set_layer(self.ctx.tone, &self.layer);
        self.draft.touch(now);
    }

    /// 表示 / 非表示の切り替え。存在しない組み合わせは何もしない
    pub fn toggle_cell(&mut self, initial: Initial, fin: Final, now: Instant) -> bool {
        if !crate::syllable::is_legal(initial, fin) {
            return false;
        }
        self.layer.toggle_off(initial, fin);
        self.edited(now);
        true
    }

    /// 手入力テキスト。空文字は上書きを消す
    pub fn edit_cell(&mut self, initial: Initial, fin: Final, text: &str, now: Instant) -> bool {
        let changed = self.layer.set_override(initial, fin, text);
        if changed {
            self.edited(now);
        }
        changed
    }

    pub fn clear_cell(&mut self, initial: Initial, fin: Final, now: Instant) -> bool {
        self.edit_cell(initial, fin, "", now)
    }

    /// 全セル編集モードでの確定
    pub fn commit_cell(&mut self, initial: Initial, fin: Final, input: &str, now: Instant) -> bool {
        let changed = self.layer.commit_cell_input(initial, fin, input);
        if changed {
            self.edited(now);
        }
        changed
    }

    /// イベントループから定期的に呼ぶ。書き出したら `true`
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if !self.draft.due(now) {
            return Ok(false);
        }
        self.flush_draft()
    }

    fn flush_draft(&mut self) -> Result<bool> {
        if !self.draft.flush() {
            return Ok(false);
        }
        self.store.write(&self.paths.store())?;
        debug!("draft flushed");
        Ok(true)
    }

    /// 予定を待たずに書き出す
    pub fn persist_now(&mut self) -> Result<()> {
        self.draft.flush();
        self.store.write(&self.paths.store())
    }

    // MARK: 保存・読み込み

    /// 全スロットを作り直して版を上げ、データディレクトリと `export_to` に書き出す
    pub fn save(&mut self, export_to: Option<&Path>, now: DateTime<Utc>) -> Result<()> {
        self.draft.flush();
        self.store.normalize();
        self.store.meta.builder.bump(now);
        self.store.write(&self.paths.store())?;
        if let Some(out) = export_to {
            self.store.write(out)?;
        }
        info!(
            version = %self.store.meta.builder.version,
            saves = self.store.meta.builder.save_count,
            "store saved"
        );
        Ok(())
    }

    /// ファイルから丸ごと読み込む。失敗時は今の状態のまま
    pub fn import(&mut self, path: &Path) -> Result<()> {
        self.store.import_file(path)?;
        self.draft.flush();
        self.layer = self.store.layer(self.ctx.family, self.ctx.tone, self.ctx.side);
        self.store.write(&self.paths.store())
    }

    /// 現在のビューの表示中 / 非表示セル数
    pub fn counts(&self) -> (usize, usize) {
        Slot::for_side(self.ctx.side)
            .iter()
            .map(|slot| self.layer.counts(slot.initials()))
            .fold((0, 0), |(on, off), (a, b)| (on + a, off + b))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::draft::QUIET_PERIOD;
    use crate::syllable::Family;
    use crate::table::{Side, Tone};

    fn session() -> (tempfile::TempDir, BuilderSession) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path()).unwrap();
        (tmp, BuilderSession::open(paths))
    }

    #[test]
    fn edits_are_written_after_quiet_period() {
        let (tmp, mut s) = session();
        let t0 = Instant::now();
        assert!(s.toggle_cell(Initial::B, Final::A, t0));
        assert!(!s.tick(t0).unwrap());
        assert!(!tmp.path().join("pinyintable.json").exists());

        assert!(s.tick(t0 + QUIET_PERIOD + Duration::from_millis(1)).unwrap());
        let stored = Store::read(&tmp.path().join("pinyintable.json")).unwrap();
        assert!(stored.layer(Family::A, Tone::default(), Side::Left).is_off(Initial::B, Final::A));
    }

    #[test]
    fn view_change_flushes_draft_first() {
        let (tmp, mut s) = session();
        s.edit_cell(Initial::D, Final::Ai, "dai?", Instant::now());
        s.dispatch(ViewAction::SetSide(Side::Right)).unwrap();
        assert!(!s.has_pending_draft());
        assert!(tmp.path().join("pinyintable.json").exists());
        assert!(s.layer().is_empty());

        s.dispatch(ViewAction::SetSide(Side::Left)).unwrap();
        assert_eq!(s.layer().effective_text(Initial::D, Final::Ai), "dai?");
        assert_eq!(ViewContext::load(&tmp.path().join("builder_state.json")).side, Side::Left);
    }

    #[test]
    fn illegal_cells_are_ignored() {
        let (_tmp, mut s) = session();
        let now = Instant::now();
        assert!(!s.toggle_cell(Initial::F, Final::Ai, now));
        assert!(!s.edit_cell(Initial::F, Final::Ai, "x", now));
        assert!(!s.has_pending_draft());
    }

    #[test]
    fn save_bumps_meta_and_exports() {
        let (tmp, mut s) = session();
        let out = tmp.path().join("export.json");
        s.save(Some(&out), Utc::now()).unwrap();
        s.save(None, Utc::now()).unwrap();
        assert_eq!(s.store().meta.builder.version, "0.2");
        assert_eq!(s.store().meta.builder.save_count, 2);

        let exported = Store::read(&out).unwrap();
        assert_eq!(exported.meta.builder.version, "0.1");
        assert!(exported.slot(Family::V, Tone::ALL[3], Slot::R5).is_some());
    }

    #[test]
    fn import_replaces_store_and_reloads_layer() {
        let (tmp, mut s) = session();
        let mut other = Store::new();
        let mut layer = other.layer(Family::A, Tone::default(), Side::Left);
        layer.set_off(Initial::M, Final::Ao, true);
        other.set_layer(Tone::default(), &layer);
        let file = tmp.path().join("in.json");
        other.write(&file).unwrap();

        s.import(&file).unwrap();
        assert!(s.layer().is_off(Initial::M, Final::Ao));
        assert_eq!(s.counts().1, 1);
    }

    #[test]
    fn counts_cover_whole_side() {
        let (_tmp, s) = session();
        let (on, off) = s.counts();
        assert_eq!(off, 0);
        // a グループで存在する組み合わせ (ゼロ声母を除く)
        let expected = Slot::for_side(Side::Left)
            .iter()
            .flat_map(|slot| slot.initials())
            .flat_map(|i| Family::A.finals().iter().map(move |f| (*i, *f)))
            .filter(|(i, f)| crate::syllable::is_legal(*i, *f))
            .count();
        assert_eq!(on, expected);
    }
}
