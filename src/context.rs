// ============================================
// src/context.rs
// ビルダー画面の選択状態 (韻母グループ・声調・表示面・編集モード)
// ============================================

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::syllable::Family;
use crate::table::{Side, Tone};

/// 現在のビュー。変更は `apply` で新しい値を作って行う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewContext {
    pub family: Family,
    pub tone: Tone,
    pub side: Side,
    pub edit_mode: bool,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self {
            family: Family::A,
            tone: Tone::default(),
            side: Side::Left,
            edit_mode: false,
        }
    }
}

/// ビューへの操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    SetFamily(Family),
    SetTone(Tone),
    SetSide(Side),
    NextFamily,
    PrevFamily,
    NextTone,
    ToggleSide,
    ToggleEditMode,
}

impl ViewContext {
    pub fn apply(self, action: ViewAction) -> ViewContext {
        match action {
            ViewAction::SetFamily(family) => ViewContext { family, ..self },
            ViewAction::SetTone(tone) => ViewContext { tone, ..self },
            ViewAction::SetSide(side) => ViewContext { side, ..self },
            ViewAction::NextFamily => ViewContext {
                family: cycle(&Family::ALL, self.family, 1),
                ..self
            },
            ViewAction::PrevFamily => ViewContext {
                family: cycle(&Family::ALL, self.family, Family::ALL.len() - 1),
                ..self
            },
            ViewAction::NextTone => ViewContext {
                tone: cycle(&Tone::ALL, self.tone, 1),
                ..self
            },
            ViewAction::ToggleSide => ViewContext {
                side: self.side.toggled(),
                ..self
            },
            ViewAction::ToggleEditMode => ViewContext {
                edit_mode: !self.edit_mode,
                ..self
            },
        }
    }

    /// 保存済みの状態を読む。読めなければ初期値
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(|e| Error::io(path, e))
            .and_then(|raw| serde_json::from_str(&raw).map_err(Error::from))
        {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!(%err, "builder state unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, step: usize) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + step) % all.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reducer_changes_only_the_named_field() {
        let ctx = ViewContext::default();
        let next = ctx.apply(ViewAction::SetSide(Side::Right));
        assert_eq!(next.side, Side::Right);
        assert_eq!(next.family, ctx.family);
        assert_eq!(next.tone, ctx.tone);
        assert_eq!(ctx.side, Side::Left);
    }

    #[test]
    fn cycles_wrap_around() {
        let ctx = ViewContext {
            family: Family::V,
            tone: Tone::ALL[3],
            ..ViewContext::default()
        };
        assert_eq!(ctx.apply(ViewAction::NextFamily).family, Family::A);
        assert_eq!(ctx.apply(ViewAction::PrevFamily).family, Family::U);
        assert_eq!(ctx.apply(ViewAction::NextTone).tone.get(), 1);
    }

    #[test]
    fn reads_partial_state_with_defaults() {
        let ctx: ViewContext = serde_json::from_str(r#"{"family":"ü","tone":3}"#).unwrap();
        assert_eq!(ctx.family, Family::V);
        assert_eq!(ctx.tone.get(), 3);
        assert_eq!(ctx.side, Side::Left);
        assert!(!ctx.edit_mode);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(ViewContext::load(&path), ViewContext::default());

        let ctx = ViewContext::default().apply(ViewAction::ToggleEditMode);
        ctx.save(&path).unwrap();
        assert_eq!(ViewContext::load(&path), ctx);
    }
}
