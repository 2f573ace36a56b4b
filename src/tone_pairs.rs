// ============================================
// src/tone_pairs.rs
// 声調ペア当てゲーム (カードを 4×5 のマスに置く)
// ============================================

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// 1 周で出すカードの上限 (マスの数と同じ)
pub const BAG_SIZE: usize = 20;

pub const ROWS: u8 = 4;
pub const COLS: u8 = 5;

/// 2 音節目の声調 (5 は軽声)
pub const COL_HEADERS: [&str; 5] = ["المستوية", "الصاعدة", "الصاعدة المنخضة", "الهابطة", "الساكنة"];
/// 1 音節目の声調
pub const ROW_HEADERS: [&str; 4] = ["عائلة البطاريق", "عائلة الحمير", "عائلة السناجب", "عائلة الذئاب"];

/// マスの位置 (`"行-列"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub row: u8,
    pub col: u8,
}

impl CellId {
    pub fn new(row: u8, col: u8) -> Option<CellId> {
        ((1..=ROWS).contains(&row) && (1..=COLS).contains(&col)).then_some(CellId { row, col })
    }

    /// 全マスを行順に
    pub fn all() -> impl Iterator<Item = CellId> {
        (1..=ROWS).flat_map(|row| (1..=COLS).map(move |col| CellId { row, col }))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for CellId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (r, c) = s.trim().split_once('-').ok_or_else(|| Error::InvalidCell(s.to_string()))?;
        r.parse()
            .ok()
            .zip(c.parse().ok())
            .and_then(|(row, col)| CellId::new(row, col))
            .ok_or_else(|| Error::InvalidCell(s.to_string()))
    }
}

/// 単語カード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub hanzi: String,
    pub pinyin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinyin_plain: Option<String>,
    pub correct_cell: String,
}

impl Card {
    /// カードに表示する読み (声調記号なしがあればそちら)
    pub fn reading(&self) -> &str {
        self.pinyin_plain
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.pinyin)
    }

    pub fn cell(&self) -> Result<CellId> {
        self.correct_cell.parse()
    }
}

/// カード一覧を読む。正解マスが読めないカードがあればエラー
pub fn load_deck(path: &Path) -> Result<Vec<Card>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let deck: Vec<Card> = serde_json::from_reader(BufReader::new(file))?;
    validate_deck(&deck)?;
    info!(path = %path.display(), cards = deck.len(), "deck loaded");
    Ok(deck)
}

pub fn validate_deck(deck: &[Card]) -> Result<()> {
    if deck.is_empty() {
        return Err(Error::EmptyDeck);
    }
    for card in deck {
        card.cell()?;
    }
    Ok(())
}

/// マスに置いた結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// 正解。得点を加えて次のカードへ
    Correct { points: u32 },
    /// 不正解。カードはそのまま
    Wrong,
    /// まだ始まっていない
    NoCard,
}

/// ゲームの進行
#[derive(Debug, Clone)]
pub struct ToneGame {
    deck: Vec<Card>,
    bag: Vec<usize>,
    position: usize,
    started: bool,
    pub hide_pinyin: bool,
    correct: u32,
    wrong: u32,
}

impl ToneGame {
    pub fn new(deck: Vec<Card>) -> Result<Self> {
        validate_deck(&deck)?;
        Ok(Self {
            deck,
            bag: Vec::new(),
            position: 0,
            started: false,
            hide_pinyin: false,
            correct: 0,
            wrong: 0,
        })
    }

    /// デッキ全体を混ぜ直して先頭 `BAG_SIZE` 枚を 1 周分にする
    fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.deck.len()).collect();
        order.shuffle(rng);
        order.truncate(BAG_SIZE);
        self.bag = order;
        self.position = 0;
        debug!(cards = self.bag.len(), "tone bag refilled");
    }

    /// 山札をめくる。すでにカードが出ていれば何もしない
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.started {
            return;
        }
        if self.position >= self.bag.len() {
            self.refill(rng);
        }
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn current(&self) -> Option<&Card> {
        if !self.started {
            return None;
        }
        self.bag.get(self.position).map(|&i| &self.deck[i])
    }

    /// カードを置く
    pub fn drop_on<R: Rng + ?Sized>(&mut self, cell: CellId, rng: &mut R) -> DropOutcome {
        let Some(card) = self.current() else {
            return DropOutcome::NoCard;
        };
        // 読み込み時に検証済み
        let hit = card.cell().is_ok_and(|c| c == cell);
        if !hit {
            self.wrong += 1;
            return DropOutcome::Wrong;
        }

        let points = if self.hide_pinyin { 2 } else { 1 };
        self.correct += points;
        self.position += 1;
        if self.position >= self.bag.len() {
            // 終わりなく続ける
            self.refill(rng);
        }
        DropOutcome::Correct { points }
    }

    pub fn score(&self) -> (u32, u32) {
        (self.correct, self.wrong)
    }

    /// 今の周で残っている枚数 (表示中のカードを含む)
    pub fn remaining_in_bag(&self) -> usize {
        self.bag.len().saturating_sub(self.position)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn card(hanzi: &str, cell: &str) -> Card {
        Card {
            hanzi: hanzi.to_string(),
            pinyin: format!("{hanzi}-py"),
            pinyin_plain: None,
            correct_cell: cell.to_string(),
        }
    }

    fn deck(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| {
                let id = CellId::all().nth(i % 20).unwrap();
                card(&format!("w{i}"), &id.to_string())
            })
            .collect()
    }

    #[test]
    fn cell_ids_parse_and_validate() {
        assert_eq!("3-5".parse::<CellId>().unwrap(), CellId { row: 3, col: 5 });
        assert!("0-1".parse::<CellId>().is_err());
        assert!("5-1".parse::<CellId>().is_err());
        assert!("1-6".parse::<CellId>().is_err());
        assert!("12".parse::<CellId>().is_err());
        assert_eq!(CellId::all().count(), 20);
    }

    #[test]
    fn deck_json_uses_camel_case() {
        let json = r#"[{"hanzi":"你好","pinyin":"nǐ hǎo","pinyinPlain":"ni3 hao3","correctCell":"3-3"},
                       {"hanzi":"谢谢","pinyin":"xièxie","correctCell":"4-5"}]"#;
        let deck: Vec<Card> = serde_json::from_str(json).unwrap();
        assert_eq!(deck[0].reading(), "ni3 hao3");
        assert_eq!(deck[1].reading(), "xièxie");
        assert!(validate_deck(&deck).is_ok());
    }

    #[test]
    fn invalid_decks_are_rejected() {
        assert!(matches!(ToneGame::new(Vec::new()), Err(Error::EmptyDeck)));
        assert!(matches!(ToneGame::new(vec![card("x", "9-9")]), Err(Error::InvalidCell(_))));
    }

    #[test]
    fn scoring_and_misses() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut game = ToneGame::new(deck(3)).unwrap();
        assert_eq!(game.drop_on(CellId { row: 1, col: 1 }, &mut rng), DropOutcome::NoCard);

        game.start(&mut rng);
        let current = game.current().unwrap().clone();
        let right = current.cell().unwrap();
        let wrong = CellId::all().find(|c| *c != right).unwrap();

        assert_eq!(game.drop_on(wrong, &mut rng), DropOutcome::Wrong);
        assert_eq!(game.current(), Some(&current));
        assert_eq!(game.drop_on(right, &mut rng), DropOutcome::Correct { points: 1 });
        assert_eq!(game.score(), (1, 1));

        game.hide_pinyin = true;
        let right = game.current().unwrap().cell().unwrap();
        assert_eq!(game.drop_on(right, &mut rng), DropOutcome::Correct { points: 2 });
        assert_eq!(game.score(), (3, 1));
    }

    #[test]
    fn bag_is_capped_and_refills_forever() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut game = ToneGame::new(deck(30)).unwrap();
        game.start(&mut rng);
        assert_eq!(game.remaining_in_bag(), BAG_SIZE);

        for _ in 0..(BAG_SIZE * 2 + 3) {
            let right = game.current().unwrap().cell().unwrap();
            assert!(matches!(game.drop_on(right, &mut rng), DropOutcome::Correct { .. }));
            assert!(game.current().is_some());
        }
        assert_eq!(game.remaining_in_bag(), BAG_SIZE - 3);
    }

    #[test]
    fn one_bag_has_no_repeats() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut game = ToneGame::new(deck(8)).unwrap();
        game.start(&mut rng);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..8 {
            let card = game.current().unwrap().clone();
            assert!(seen.insert(card.hanzi.clone()));
            game.drop_on(card.cell().unwrap(), &mut rng);
        }
        assert_eq!(seen.len(), 8);
    }
}
