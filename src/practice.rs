// ============================================
// src/practice.rs
// スロットゲームの 1 回分の流れ (回す → 止まる → 結果 → ボーナス演出)
// ============================================

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use crate::config::DataPaths;
use crate::error::Result;
use crate::sampler::{Combo, Draw, Sampler};
use crate::save_data::{PracticeData, PracticeSettings};
use crate::store::Store;
use crate::table::{Side, Slot};

/// ボーナス演出を自動で閉じるまでの時間
pub const JACKPOT_TIMEOUT: Duration = Duration::from_secs(6);
/// リールが動き出すまでの間
const REEL_START_DELAY: Duration = Duration::from_millis(50);
const REELS: u32 = 3;

// MARK: ボーナス演出

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Click,
    Key,
    Timeout,
}

/// ボーナス演出が開いている間は次を回せない
#[derive(Debug, Default)]
pub struct JackpotGate {
    opened_at: Option<Instant>,
}

impl JackpotGate {
    pub fn open(&mut self, now: Instant) {
        self.opened_at = Some(now);
        info!("jackpot opened");
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// 閉じる。最初の 1 回だけ `true`
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.opened_at.take().is_none() {
            return false;
        }
        info!(?reason, "jackpot closed");
        true
    }

    /// 時間切れなら閉じる
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.opened_at {
            Some(at) if now.saturating_duration_since(at) >= JACKPOT_TIMEOUT => self.close(CloseReason::Timeout),
            _ => false,
        }
    }
}

// MARK: 結果

/// 止まったリールの結果と、対応する表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinResult {
    pub combo: Combo,
    pub jackpot: bool,
    pub description: String,
    /// `L{n}` / `R{n}` の表。表データに無ければ `None`
    pub left_html: Option<String>,
    pub right_html: Option<String>,
}

impl SpinResult {
    pub fn new(draw: Draw, store: &Store) -> Self {
        let combo = draw.combo;
        let lookup = |side| {
            Slot::from_group(side, combo.slot_number())
                .and_then(|slot| store.slot(combo.family(), combo.table_tone(), slot))
                .map(|entry| entry.html.clone())
        };
        Self {
            combo,
            jackpot: draw.jackpot,
            description: combo.description(),
            left_html: lookup(Side::Left),
            right_html: lookup(Side::Right),
        }
    }

    pub fn title(&self) -> &'static str {
        if self.jackpot { "استثناء" } else { "النتيجة" }
    }
}

/// 回そうとした結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOutcome {
    /// 回り始めた。`stops_at` にすべてのリールが止まる
    Started { combo: Combo, stops_at: Instant },
    /// 回転中
    Busy,
    /// ボーナス演出中
    Locked,
    /// 引けるものが残っていない
    Exhausted,
}

struct Spinning {
    draw: Draw,
    stops_at: Instant,
}

// MARK: セッション

/// 設定・抽選器・回転中の状態
pub struct PracticeSession {
    settings: PracticeSettings,
    sampler: Sampler,
    spinning: Option<Spinning>,
    pub jackpot: JackpotGate,
    last: Option<SpinResult>,
    last_played: Option<DateTime<Utc>>,
}

impl PracticeSession {
    pub fn new(data: PracticeData) -> Self {
        Self {
            sampler: Sampler::with_history(&data.history),
            settings: data.settings,
            spinning: None,
            jackpot: JackpotGate::default(),
            last: None,
            last_played: data.last_played,
        }
    }

    pub fn load(paths: &DataPaths) -> Self {
        Self::new(PracticeData::load(paths))
    }

    pub fn save(&self, paths: &DataPaths) -> Result<()> {
        self.data().save(paths)
    }

    pub fn data(&self) -> PracticeData {
        PracticeData {
            settings: self.settings.clone(),
            history: self.sampler.history_keys(),
            last_played: self.last_played,
        }
    }

    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn last_result(&self) -> Option<&SpinResult> {
        self.last.as_ref()
    }

    pub fn dismiss_result(&mut self) {
        self.last = None;
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning.is_some()
    }

    // MARK: 設定

    pub fn set_allow_invalid(&mut self, on: bool) {
        self.settings.set_allow_invalid(on);
        self.sampler.reset_category_bags();
    }

    pub fn set_jackpot_only(&mut self, on: bool) {
        self.settings.set_jackpot_only(on);
        self.sampler.reset_category_bags();
    }

    pub fn settings_mut(&mut self) -> &mut PracticeSettings {
        &mut self.settings
    }

    // MARK: 残り数

    pub fn remaining(&self) -> usize {
        self.sampler.remaining(self.settings.mode())
    }

    pub fn total(&self) -> usize {
        Sampler::effective_total(self.settings.mode())
    }

    pub fn is_exhausted(&self) -> bool {
        self.sampler.is_exhausted(self.settings.mode())
    }

    /// リールごとの停止までの時間 (声調・子音・韻母の順)
    pub fn reel_stop_times(&self) -> [Duration; REELS as usize] {
        let base = Duration::from_secs_f64(self.settings.spin_speed.max(0.0));
        let stagger = Duration::from_millis(u64::from(self.settings.reel_stop_delay));
        [0, 1, 2].map(|i| REEL_START_DELAY + base + stagger * i)
    }

    // MARK: 回す

    pub fn spin<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> SpinOutcome {
        if self.spinning.is_some() {
            return SpinOutcome::Busy;
        }
        if self.jackpot.is_open() {
            return SpinOutcome::Locked;
        }
        let mode = self.settings.mode();
        let Some(draw) = self.sampler.draw(mode, self.settings.jackpot_probability, rng) else {
            return SpinOutcome::Exhausted;
        };

        let stops_at = now + self.reel_stop_times()[REELS as usize - 1];
        self.spinning = Some(Spinning { draw, stops_at });
        self.last = None;
        debug!(key = %draw.combo.key(), "reels spinning");
        SpinOutcome::Started {
            combo: draw.combo,
            stops_at,
        }
    }

    /// イベントループから呼ぶ。リールが止まったら結果を返す
    pub fn poll(&mut self, now: Instant, store: &Store) -> Option<&SpinResult> {
        self.jackpot.poll(now);

        let stopped = self.spinning.as_ref().is_some_and(|s| now >= s.stops_at);
        if !stopped {
            return None;
        }
        let spinning = self.spinning.take()?;
        let result = SpinResult::new(spinning.draw, store);
        self.last_played = Some(Utc::now());
        if result.jackpot {
            self.jackpot.open(now);
        }
        self.last = Some(result);
        self.last.as_ref()
    }

    /// 履歴から 1 件消す
    pub fn remove_history(&mut self, index: usize) -> Option<Combo> {
        self.sampler.remove_history(index)
    }

    /// 履歴と袋を全部消す
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::sampler::Mode;

    fn session() -> PracticeSession {
        PracticeSession::new(PracticeData::default())
    }

    #[test]
    fn gate_closes_once() {
        let t0 = Instant::now();
        let mut gate = JackpotGate::default();
        assert!(!gate.close(CloseReason::Key));
        gate.open(t0);
        assert!(!gate.poll(t0 + Duration::from_secs(1)));
        assert!(gate.close(CloseReason::Click));
        assert!(!gate.close(CloseReason::Key));

        gate.open(t0);
        assert!(gate.poll(t0 + JACKPOT_TIMEOUT));
        assert!(!gate.is_open());
    }

    #[test]
    fn reel_times_follow_settings() {
        let s = session();
        let times = s.reel_stop_times();
        assert_eq!(times[0], Duration::from_millis(2050));
        assert_eq!(times[2], Duration::from_millis(3050));
    }

    #[test]
    fn spin_guard_refuses_reentry() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = session();
        let t0 = Instant::now();
        let SpinOutcome::Started { stops_at, .. } = s.spin(t0, &mut rng) else {
            panic!("expected spin to start");
        };
        assert_eq!(s.spin(t0, &mut rng), SpinOutcome::Busy);

        let store = Store::new();
        assert!(s.poll(t0, &store).is_none());
        let result = s.poll(stops_at, &store).unwrap().clone();
        assert!(!result.jackpot);
        assert_eq!(result.title(), "النتيجة");
        assert!(!s.is_spinning());
        assert_eq!(s.sampler().history().len(), 1);
    }

    #[test]
    fn jackpot_locks_until_closed() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = session();
        s.set_jackpot_only(true);
        assert_eq!(s.settings().mode(), Mode::BonusOnly);

        let t0 = Instant::now();
        let SpinOutcome::Started { stops_at, .. } = s.spin(t0, &mut rng) else {
            panic!("expected spin to start");
        };
        let mut store = Store::new();
        store.normalize();
        let result = s.poll(stops_at, &store).unwrap().clone();
        assert!(result.jackpot);
        assert_eq!(result.title(), "استثناء");
        assert!(result.left_html.is_some() && result.right_html.is_some());

        assert_eq!(s.spin(stops_at, &mut rng), SpinOutcome::Locked);
        assert!(s.jackpot.close(CloseReason::Key));
        assert!(matches!(s.spin(stops_at, &mut rng), SpinOutcome::Started { .. }));
    }

    #[test]
    fn exhaustion_is_reported() {
        let keys: Vec<String> = (0..6u8)
            .flat_map(|c| (0..4u8).flat_map(move |t| (0..6u8).map(move |f| format!("{c}|{t}|{f}"))))
            .collect();
        let mut s = PracticeSession::new(PracticeData {
            history: keys,
            ..PracticeData::default()
        });
        let mut rng = StdRng::seed_from_u64(3);
        assert!(s.is_exhausted());
        assert_eq!(s.remaining(), 0);
        assert_eq!(s.spin(Instant::now(), &mut rng), SpinOutcome::Exhausted);

        s.remove_history(0);
        assert_eq!(s.remaining(), 1);
        s.reset();
        assert_eq!(s.remaining(), s.total());
    }

    #[test]
    fn session_data_round_trips_history() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = session();
        let t0 = Instant::now();
        s.spin(t0, &mut rng);
        s.poll(t0 + Duration::from_secs(10), &Store::new());
        let data = s.data();
        assert_eq!(data.history.len(), 1);
        assert!(data.last_played.is_some());
        let restored = PracticeSession::new(data);
        assert_eq!(restored.sampler().history(), s.sampler().history());
    }
}
