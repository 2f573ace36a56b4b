// ============================================
// src/sampler.rs
// スロットゲームの組み合わせ抽選 (袋から引いて使い切ったら補充)
// ============================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::Error;
use crate::syllable::Family;
use crate::table::Tone;

// MARK: 抽選の次元

/// 子音カテゴリ (調音位置)
pub struct Category {
    pub label: &'static str,
    pub arabic: &'static str,
    /// 表データのスロット番号 (`L{n}` / `R{n}`)
    pub slot: u8,
}

pub const CATEGORIES: [Category; 6] = [
    Category { label: "b p m f", arabic: "شفوي", slot: 1 },
    Category { label: "d t n l", arabic: "لثوي", slot: 2 },
    Category { label: "zhi chi shi ri", arabic: "مطبق", slot: 5 },
    Category { label: "j q x", arabic: "غاري", slot: 4 },
    Category { label: "g k h", arabic: "طبقي", slot: 3 },
    Category { label: "z c s", arabic: "أسناني", slot: 5 },
];

pub struct ToneLabel {
    pub arabic: &'static str,
    pub mark: &'static str,
}

pub const TONES: [ToneLabel; 4] = [
    ToneLabel { arabic: "الأولى", mark: "¯" },
    ToneLabel { arabic: "الثانية", mark: "ˊ" },
    ToneLabel { arabic: "الثالثة", mark: "ˇ" },
    ToneLabel { arabic: "الرابعة", mark: "ˋ" },
];

/// 韻母グループ。並びは `Family::ALL` と同じ
pub const FINAL_GROUPS: [&str; 6] = [
    "a وأخواتها",
    "o وأخواتها",
    "e وأخواتها",
    "i وأخواتها",
    "u وأخواتها",
    "ü وأخواتها",
];

/// カテゴリごとに組み合わせ可能な韻母グループ
const ALLOWED_GROUPS: [&[u8]; 6] = [
    &[0, 1, 2, 3, 4],
    &[0, 1, 2, 3, 4, 5],
    &[0, 1, 2, 4],
    &[3, 5],
    &[0, 1, 2, 4],
    &[0, 1, 2, 4],
];

const N_CAT: u8 = CATEGORIES.len() as u8;
const N_TONE: u8 = TONES.len() as u8;
const N_GROUP: u8 = FINAL_GROUPS.len() as u8;

const DRAW_ROUNDS: usize = 250;
const TONE_TRIES: usize = 12;

pub fn is_valid_pair(category: u8, group: u8) -> bool {
    ALLOWED_GROUPS
        .get(category as usize)
        .is_some_and(|groups| groups.contains(&group))
}

// MARK: モード

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// 存在する組み合わせだけ
    Strict,
    /// 全部。一定確率でボーナス (存在しない組み合わせ) 側から引く
    Hybrid,
    /// 存在しない組み合わせだけ
    BonusOnly,
}

impl Mode {
    pub fn from_settings(allow_invalid: bool, jackpot_only: bool) -> Mode {
        if jackpot_only {
            Mode::BonusOnly
        } else if allow_invalid {
            Mode::Hybrid
        } else {
            Mode::Strict
        }
    }

    /// このモードで引ける組み合わせか
    pub fn admits(self, category: u8, group: u8) -> bool {
        match self {
            Mode::Hybrid => true,
            Mode::Strict => is_valid_pair(category, group),
            Mode::BonusOnly => !is_valid_pair(category, group),
        }
    }
}

// MARK: 組み合わせ

/// 抽選結果 1 つ (カテゴリ・声調・韻母グループの添字)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    pub category: u8,
    pub tone: u8,
    pub group: u8,
}

impl Combo {
    pub fn new(category: u8, tone: u8, group: u8) -> Option<Combo> {
        (category < N_CAT && tone < N_TONE && group < N_GROUP).then_some(Combo { category, tone, group })
    }

    /// 履歴用のキー (`"c|t|f"`)
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.category, self.tone, self.group)
    }

    pub fn is_valid(&self) -> bool {
        is_valid_pair(self.category, self.group)
    }

    pub fn family(&self) -> Family {
        Family::ALL[self.group as usize]
    }

    pub fn table_tone(&self) -> Tone {
        Tone::ALL[self.tone as usize]
    }

    pub fn slot_number(&self) -> u8 {
        CATEGORIES[self.category as usize].slot
    }

    /// 結果の説明文
    pub fn description(&self) -> String {
        format!(
            "نهايات {} مع البدايات {} بالنغمة {}",
            FINAL_GROUPS[self.group as usize],
            CATEGORIES[self.category as usize].label,
            TONES[self.tone as usize].arabic
        )
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            CATEGORIES[self.category as usize].label,
            TONES[self.tone as usize].arabic,
            FINAL_GROUPS[self.group as usize]
        )
    }
}

impl FromStr for Combo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::UnknownToken {
            kind: "history key",
            token: s.to_string(),
        };
        let mut parts = s.split('|').map(|p| p.trim().parse::<u8>());
        let (Some(Ok(c)), Some(Ok(t)), Some(Ok(f)), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        Combo::new(c, t, f).ok_or_else(bad)
    }
}

// MARK: 袋

/// シャッフルした添字を末尾から引き、空になったら全体から作り直す
#[derive(Debug, Clone, Default)]
struct Bag {
    items: Vec<u8>,
}

impl Bag {
    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R, refill: impl FnOnce() -> Vec<u8>) -> Option<u8> {
        if self.items.is_empty() {
            self.items = refill();
            self.items.shuffle(rng);
        }
        self.items.pop()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// 1 回の抽選結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub combo: Combo,
    /// 存在しない組み合わせを引いた (ボーナス演出を出す)
    pub jackpot: bool,
}

/// 抽選器。履歴はモードに関係なく 1 本
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    history: Vec<Combo>,
    tone_bag: Bag,
    group_bag: Bag,
    category_bags: HashMap<(Mode, u8), Bag>,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの履歴から復元する。読めないキーは捨てる
    pub fn with_history<S: AsRef<str>>(keys: &[S]) -> Self {
        let history = keys
            .iter()
            .filter_map(|k| k.as_ref().parse::<Combo>().ok())
            .collect();
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &[Combo] {
        &self.history
    }

    pub fn history_keys(&self) -> Vec<String> {
        self.history.iter().map(Combo::key).collect()
    }

    fn is_used(&self, combo: &Combo) -> bool {
        self.history.contains(combo)
    }

    /// このモードで引ける組み合わせの総数
    pub fn effective_total(mode: Mode) -> usize {
        let pairs = (0..N_CAT)
            .flat_map(|c| (0..N_GROUP).map(move |g| (c, g)))
            .filter(|&(c, g)| mode.admits(c, g))
            .count();
        pairs * N_TONE as usize
    }

    /// 履歴のうちこのモードで数えるもの
    pub fn used_count(&self, mode: Mode) -> usize {
        self.history
            .iter()
            .filter(|c| mode.admits(c.category, c.group))
            .count()
    }

    pub fn remaining(&self, mode: Mode) -> usize {
        Self::effective_total(mode).saturating_sub(self.used_count(mode))
    }

    pub fn is_exhausted(&self, mode: Mode) -> bool {
        self.used_count(mode) >= Self::effective_total(mode)
    }

    fn next_category<R: Rng + ?Sized>(&mut self, mode: Mode, group: u8, rng: &mut R) -> Option<u8> {
        self.category_bags
            .entry((mode, group))
            .or_default()
            .draw(rng, || (0..N_CAT).filter(|&c| mode.admits(c, group)).collect())
    }

    /// 1 つ引いて履歴に積む。引ける組み合わせが残っていなければ `None`
    ///
    /// `bonus_probability` (0–100) はハイブリッドのときだけ使う。
    pub fn draw<R: Rng + ?Sized>(&mut self, mode: Mode, bonus_probability: u8, rng: &mut R) -> Option<Draw> {
        if self.is_exhausted(mode) {
            return None;
        }

        let combo = self.draw_from_bags(mode, bonus_probability, rng).or_else(|| self.scan(mode));
        let Some(combo) = combo else {
            info!(?mode, "sampler exhausted");
            return None;
        };

        self.history.push(combo);
        let jackpot = match mode {
            Mode::Strict => false,
            Mode::BonusOnly => true,
            Mode::Hybrid => !combo.is_valid(),
        };
        debug!(key = %combo.key(), jackpot, "combo drawn");
        Some(Draw { combo, jackpot })
    }

    fn draw_from_bags<R: Rng + ?Sized>(&mut self, mode: Mode, bonus_probability: u8, rng: &mut R) -> Option<Combo> {
        for _ in 0..DRAW_ROUNDS {
            let group = self.group_bag.draw(rng, || (0..N_GROUP).collect())?;
            let pick_mode = match mode {
                Mode::Hybrid if rng.random_range(0..100u8) < bonus_probability => Mode::BonusOnly,
                Mode::Hybrid => Mode::Strict,
                other => other,
            };
            let Some(category) = self.next_category(pick_mode, group, rng) else {
                continue;
            };
            for _ in 0..TONE_TRIES {
                let tone = self.tone_bag.draw(rng, || (0..N_TONE).collect())?;
                let combo = Combo { category, tone, group };
                if !self.is_used(&combo) {
                    return Some(combo);
                }
            }
        }
        None
    }

    /// カテゴリ・声調・韻母グループの順に最初の未使用を探す
    fn scan(&self, mode: Mode) -> Option<Combo> {
        (0..N_CAT)
            .flat_map(|c| (0..N_TONE).flat_map(move |t| (0..N_GROUP).map(move |g| Combo { category: c, tone: t, group: g })))
            .find(|combo| mode.admits(combo.category, combo.group) && !self.is_used(combo))
    }

    /// 履歴から 1 件消す (また引けるようになる)
    pub fn remove_history(&mut self, index: usize) -> Option<Combo> {
        (index < self.history.len()).then(|| self.history.remove(index))
    }

    /// 履歴と袋をすべて空にする
    pub fn reset(&mut self) {
        self.history.clear();
        self.tone_bag.clear();
        self.group_bag.clear();
        self.reset_category_bags();
        info!("sampler reset");
    }

    /// 設定変更時に呼ぶ
    pub fn reset_category_bags(&mut self) {
        self.category_bags.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn universe_sizes() {
        assert_eq!(Sampler::effective_total(Mode::Strict), 100);
        assert_eq!(Sampler::effective_total(Mode::BonusOnly), 44);
        assert_eq!(Sampler::effective_total(Mode::Hybrid), 144);
    }

    #[test]
    fn strict_draws_every_combo_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut sampler = Sampler::new();
        let mut seen = HashSet::new();
        while let Some(draw) = sampler.draw(Mode::Strict, 50, &mut rng) {
            assert!(draw.combo.is_valid());
            assert!(!draw.jackpot);
            assert!(seen.insert(draw.combo));
        }
        assert_eq!(seen.len(), 100);
        assert!(sampler.is_exhausted(Mode::Strict));
        assert_eq!(sampler.remaining(Mode::Strict), 0);
    }

    #[test]
    fn bonus_only_draws_are_jackpots() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler = Sampler::new();
        let mut count = 0;
        while let Some(draw) = sampler.draw(Mode::BonusOnly, 0, &mut rng) {
            assert!(!draw.combo.is_valid());
            assert!(draw.jackpot);
            count += 1;
        }
        assert_eq!(count, 44);
    }

    #[test]
    fn hybrid_covers_everything() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sampler = Sampler::new();
        let mut count = 0;
        while let Some(draw) = sampler.draw(Mode::Hybrid, 50, &mut rng) {
            assert_eq!(draw.jackpot, !draw.combo.is_valid());
            count += 1;
        }
        assert_eq!(count, 144);
    }

    #[test]
    fn history_survives_mode_switch() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sampler = Sampler::new();
        for _ in 0..10 {
            sampler.draw(Mode::Strict, 50, &mut rng).unwrap();
        }
        assert_eq!(sampler.used_count(Mode::Strict), 10);

        sampler.reset_category_bags();
        for _ in 0..5 {
            sampler.draw(Mode::BonusOnly, 0, &mut rng).unwrap();
        }
        assert_eq!(sampler.used_count(Mode::Strict), 10);
        assert_eq!(sampler.used_count(Mode::BonusOnly), 5);
        assert_eq!(sampler.used_count(Mode::Hybrid), 15);
        assert_eq!(sampler.remaining(Mode::Strict), 90);
    }

    #[test]
    fn scan_finds_first_unused_in_order() {
        let mut sampler = Sampler::new();
        assert_eq!(sampler.scan(Mode::Strict), Combo::new(0, 0, 0));
        sampler.history.push(Combo { category: 0, tone: 0, group: 0 });
        assert_eq!(sampler.scan(Mode::Strict), Combo::new(0, 0, 1));
        // カテゴリ 0 で存在しないのは ü だけ
        assert_eq!(sampler.scan(Mode::BonusOnly), Combo::new(0, 0, 5));
    }

    #[test]
    fn removing_history_makes_combo_drawable() {
        let keys: Vec<String> = (0..N_CAT)
            .flat_map(|c| (0..N_TONE).flat_map(move |t| (0..N_GROUP).map(move |g| (c, t, g))))
            .filter(|&(c, _, g)| is_valid_pair(c, g))
            .map(|(c, t, g)| format!("{c}|{t}|{g}"))
            .collect();
        let mut sampler = Sampler::with_history(&keys);
        assert!(sampler.is_exhausted(Mode::Strict));

        let mut rng = StdRng::seed_from_u64(1);
        assert!(sampler.draw(Mode::Strict, 50, &mut rng).is_none());
        let removed = sampler.remove_history(42).unwrap();
        let drawn = sampler.draw(Mode::Strict, 50, &mut rng).unwrap();
        assert_eq!(drawn.combo, removed);
        assert!(sampler.remove_history(500).is_none());

        sampler.reset();
        assert!(sampler.history().is_empty());
    }

    #[test]
    fn history_keys_parse_strictly() {
        assert_eq!("2|3|4".parse::<Combo>().unwrap(), Combo { category: 2, tone: 3, group: 4 });
        assert!("6|0|0".parse::<Combo>().is_err());
        assert!("1|2".parse::<Combo>().is_err());
        assert!("1|2|3|4".parse::<Combo>().is_err());
        let sampler = Sampler::with_history(&["0|0|0", "junk", "5|3|4"]);
        assert_eq!(sampler.history_keys(), vec!["0|0|0", "5|3|4"]);
    }

    #[test]
    fn description_and_slot_lookup() {
        let combo = Combo::new(2, 0, 4).unwrap();
        assert_eq!(combo.slot_number(), 5);
        assert_eq!(combo.family(), Family::U);
        assert_eq!(combo.table_tone().get(), 1);
        assert_eq!(combo.description(), "نهايات u وأخواتها مع البدايات zhi chi shi ri بالنغمة الأولى");
    }
}
