// ============================================
// src/table.rs
// 表示面 (左: ラテン文字 / 右: アラビア文字) とスロット、セル表記の決定
// ============================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arabic;
use crate::error::Error;
use crate::syllable::{Family, Final, Initial, is_legal, latin_spelling};

/// 表示面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// ラテン文字 (ピンイン)
    #[default]
    #[serde(rename = "L")]
    Left,
    /// アラビア文字
    #[serde(rename = "R")]
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }

    pub fn toggled(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => Ok(Side::Left),
            "R" | "r" => Ok(Side::Right),
            _ => Err(Error::UnknownToken {
                kind: "side",
                token: s.to_string(),
            }),
        }
    }
}

/// 声調 (1〜4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tone(u8);

impl Tone {
    pub const ALL: [Tone; 4] = [Tone(1), Tone(2), Tone(3), Tone(4)];

    pub fn new(n: u8) -> Option<Tone> {
        (1..=4).contains(&n).then_some(Tone(n))
    }

    /// 範囲外の値は 1〜4 に丸める
    pub fn clamped(n: i64) -> Tone {
        Tone(n.clamp(1, 4) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone(1)
    }
}

impl TryFrom<u8> for Tone {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Tone::new(n).ok_or_else(|| Error::UnknownToken {
            kind: "tone",
            token: n.to_string(),
        })
    }
}

impl From<Tone> for u8 {
    fn from(t: Tone) -> u8 {
        t.0
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Tone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Tone::new)
            .ok_or_else(|| Error::UnknownToken {
                kind: "tone",
                token: s.to_string(),
            })
    }
}

/// 調音位置ごとに声母をまとめた表の単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    L1,
    L2,
    L3,
    L4,
    L5,
    C,
    R1,
    R2,
    R3,
    R4,
    R5,
}

impl Slot {
    pub const ALL: [Slot; 11] = [
        Slot::L1,
        Slot::L2,
        Slot::L3,
        Slot::L4,
        Slot::L5,
        Slot::C,
        Slot::R1,
        Slot::R2,
        Slot::R3,
        Slot::R4,
        Slot::R5,
    ];

    /// 表を持つスロット (C 以外)
    pub const TABLES: [Slot; 10] = [
        Slot::L1,
        Slot::L2,
        Slot::L3,
        Slot::L4,
        Slot::L5,
        Slot::R1,
        Slot::R2,
        Slot::R3,
        Slot::R4,
        Slot::R5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::L1 => "L1",
            Slot::L2 => "L2",
            Slot::L3 => "L3",
            Slot::L4 => "L4",
            Slot::L5 => "L5",
            Slot::C => "C",
            Slot::R1 => "R1",
            Slot::R2 => "R2",
            Slot::R3 => "R3",
            Slot::R4 => "R4",
            Slot::R5 => "R5",
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Slot::L1 | Slot::L2 | Slot::L3 | Slot::L4 | Slot::L5 => Some(Side::Left),
            Slot::R1 | Slot::R2 | Slot::R3 | Slot::R4 | Slot::R5 => Some(Side::Right),
            Slot::C => None,
        }
    }

    /// 声母グループ番号 (1〜5)
    pub fn group(self) -> Option<u8> {
        match self {
            Slot::L1 | Slot::R1 => Some(1),
            Slot::L2 | Slot::R2 => Some(2),
            Slot::L3 | Slot::R3 => Some(3),
            Slot::L4 | Slot::R4 => Some(4),
            Slot::L5 | Slot::R5 => Some(5),
            Slot::C => None,
        }
    }

    pub fn from_group(side: Side, group: u8) -> Option<Slot> {
        Slot::for_side(side).get(usize::from(group).checked_sub(1)?).copied()
    }

    pub fn for_side(side: Side) -> [Slot; 5] {
        match side {
            Side::Left => [Slot::L1, Slot::L2, Slot::L3, Slot::L4, Slot::L5],
            Side::Right => [Slot::R1, Slot::R2, Slot::R3, Slot::R4, Slot::R5],
        }
    }

    /// このスロットの行 (声母)
    pub fn initials(self) -> &'static [Initial] {
        use Initial::*;
        match self.group() {
            Some(1) => &[B, P, M, F],
            Some(2) => &[D, T, N, L],
            Some(3) => &[G, K, H],
            Some(4) => &[J, Q, X],
            Some(5) => &[Zh, Ch, Sh, R, Z, C, S],
            _ => &[],
        }
    }

    /// 表の書字方向
    pub fn dir(self) -> &'static str {
        match self.side() {
            Some(Side::Right) => "rtl",
            _ => "ltr",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| Error::UnknownToken {
                kind: "slot",
                token: s.to_string(),
            })
    }
}

// --------------------------------------------------
// セル・見出しの表記
// --------------------------------------------------

/// アラビア文字表記。参照表に無ければラテン文字表記に戻す
pub fn arabic_spelling(family: Family, initial: Initial, fin: Final) -> Option<String> {
    match arabic::cell_override(family, initial, fin) {
        Some(text) => Some(text.to_string()),
        None => latin_spelling(initial, fin),
    }
}

/// 表示面に応じたセルの既定表記。存在しない組み合わせは面に関係なく `None`
pub fn display_spelling(side: Side, family: Family, initial: Initial, fin: Final) -> Option<String> {
    if !is_legal(initial, fin) {
        return None;
    }
    match side {
        Side::Left => latin_spelling(initial, fin),
        Side::Right => arabic_spelling(family, initial, fin),
    }
}

/// 列見出し (韻母)
pub fn header_label(side: Side, family: Family, fin: Final) -> &'static str {
    match side {
        Side::Left => fin.as_str(),
        Side::Right => arabic::final_label(family, fin).unwrap_or(fin.as_str()),
    }
}

/// 行見出し (声母)
pub fn stub_label(side: Side, initial: Initial) -> &'static str {
    match side {
        Side::Left => initial.as_str(),
        Side::Right => arabic::initial_label(initial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_pairs_never_display() {
        for family in Family::ALL {
            for fin in Final::ALL {
                for initial in Initial::ALL {
                    if is_legal(initial, fin) {
                        continue;
                    }
                    for side in Side::ALL {
                        assert_eq!(display_spelling(side, family, initial, fin), None);
                    }
                }
            }
        }
    }

    #[test]
    fn right_side_prefers_reference_then_latin() {
        assert_eq!(
            display_spelling(Side::Right, Family::A, Initial::B, Final::A).as_deref(),
            Some("بآ")
        );
        // ü 表は参照データが無いのでラテン文字に戻る
        assert_eq!(
            display_spelling(Side::Right, Family::V, Initial::J, Final::Ve).as_deref(),
            Some("jue")
        );
        assert_eq!(
            display_spelling(Side::Left, Family::A, Initial::B, Final::A).as_deref(),
            Some("ba")
        );
    }

    #[test]
    fn labels_follow_side() {
        assert_eq!(header_label(Side::Left, Family::I, Final::Iou), "iou");
        assert_eq!(header_label(Side::Right, Family::I, Final::Iou), "يو");
        assert_eq!(header_label(Side::Right, Family::A, Final::Iou), "iou");
        assert_eq!(stub_label(Side::Left, Initial::Zh), "zh");
        assert_eq!(stub_label(Side::Right, Initial::Zh), "ج");
        assert_eq!(stub_label(Side::Right, Initial::Zero), "");
    }

    #[test]
    fn slots_group_initials() {
        assert_eq!(Slot::R4.initials(), Slot::L4.initials());
        assert!(Slot::C.initials().is_empty());
        assert_eq!(Slot::from_group(Side::Right, 5), Some(Slot::R5));
        assert_eq!(Slot::from_group(Side::Left, 0), None);
        assert_eq!(Slot::R2.dir(), "rtl");
        let covered: usize = Slot::for_side(Side::Left).iter().map(|s| s.initials().len()).sum();
        assert_eq!(covered, Initial::ALL.len() - 1);
    }

    #[test]
    fn tone_bounds() {
        assert_eq!(Tone::new(0), None);
        assert_eq!(Tone::clamped(9).get(), 4);
        assert_eq!(Tone::clamped(-3).get(), 1);
        assert_eq!("3".parse::<Tone>().unwrap().get(), 3);
        assert_eq!(serde_json::to_string(&Tone::ALL[1]).unwrap(), "2");
        assert!(serde_json::from_str::<Tone>("5").is_err());
    }
}
