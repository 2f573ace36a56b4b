// ============================================
// src/draft.rs
// 編集中の下書き保存 (最後の編集から一定時間たったら書き出す)
// ============================================

use std::time::{Duration, Instant};

/// 最後の編集からこの時間なにも起きなければ書き出す
pub const QUIET_PERIOD: Duration = Duration::from_millis(120);

/// 書き出し予定の管理だけを行う。実際の書き込みは呼び出し側
#[derive(Debug, Clone, Default)]
pub struct DraftWriter {
    last_touch: Option<Instant>,
}

impl DraftWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 編集があった。予定を先送りする
    pub fn touch(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_touch.is_some()
    }

    /// 書き出す時刻になったか
    pub fn due(&self, now: Instant) -> bool {
        self.last_touch
            .is_some_and(|at| now.saturating_duration_since(at) >= QUIET_PERIOD)
    }

    /// 予定を消す。予定があったなら `true` (今すぐ書き出すべき)
    pub fn flush(&mut self) -> bool {
        self.last_touch.take().is_some()
    }
}
