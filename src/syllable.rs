// ============================================
// src/syllable.rs
// 声母・韻母の定義と、音節の妥当性・ラテン文字表記
// ============================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// 声母 (音節の頭子音)。`Zero` はゼロ声母 `Ø`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Initial {
    Zero,
    B,
    P,
    M,
    F,
    D,
    T,
    N,
    L,
    G,
    K,
    H,
    J,
    Q,
    X,
    Zh,
    Ch,
    Sh,
    R,
    Z,
    C,
    S,
}

impl Initial {
    /// 表の行の並び順
    pub const ALL: [Initial; 22] = [
        Initial::Zero,
        Initial::B,
        Initial::P,
        Initial::M,
        Initial::F,
        Initial::D,
        Initial::T,
        Initial::N,
        Initial::L,
        Initial::G,
        Initial::K,
        Initial::H,
        Initial::J,
        Initial::Q,
        Initial::X,
        Initial::Zh,
        Initial::Ch,
        Initial::Sh,
        Initial::R,
        Initial::Z,
        Initial::C,
        Initial::S,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Initial::Zero => "Ø",
            Initial::B => "b",
            Initial::P => "p",
            Initial::M => "m",
            Initial::F => "f",
            Initial::D => "d",
            Initial::T => "t",
            Initial::N => "n",
            Initial::L => "l",
            Initial::G => "g",
            Initial::K => "k",
            Initial::H => "h",
            Initial::J => "j",
            Initial::Q => "q",
            Initial::X => "x",
            Initial::Zh => "zh",
            Initial::Ch => "ch",
            Initial::Sh => "sh",
            Initial::R => "r",
            Initial::Z => "z",
            Initial::C => "c",
            Initial::S => "s",
        }
    }
}

impl fmt::Display for Initial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Initial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Initial::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| Error::UnknownToken {
                kind: "initial",
                token: s.to_string(),
            })
    }
}

/// 韻母のグループ (画面のページ単位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "a")]
    A,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "e")]
    E,
    #[serde(rename = "i")]
    I,
    #[serde(rename = "u")]
    U,
    #[serde(rename = "ü")]
    V,
}

impl Family {
    pub const ALL: [Family; 6] = [Family::A, Family::O, Family::E, Family::I, Family::U, Family::V];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::A => "a",
            Family::O => "o",
            Family::E => "e",
            Family::I => "i",
            Family::U => "u",
            Family::V => "ü",
        }
    }

    /// このグループに属する韻母 (列の並び順)
    pub fn finals(self) -> &'static [Final] {
        use Final::*;
        match self {
            Family::A => &[A, Ai, An, Ang, Ao],
            Family::O => &[O, Ong, Ou],
            Family::E => &[E, Ei, En, Eng, Er],
            Family::I => &[I, Ia, Ian, Iang, Iao, Ie, In, Ing, Iong, Iou],
            Family::U => &[U, Ua, Uai, Uan, Uang, Uei, Uen, Ueng, Uo],
            Family::V => &[V, Ve, Van, Vn],
        }
    }

    /// `Family::ALL` 内の位置 (練習ゲームのリール番号と一致する)
    pub fn index(self) -> usize {
        Family::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // 端末では ü を打ちにくいので v も受け付ける
            "v" => Ok(Family::V),
            _ => Family::ALL
                .into_iter()
                .find(|f| f.as_str() == s)
                .ok_or_else(|| Error::UnknownToken {
                    kind: "family",
                    token: s.to_string(),
                }),
        }
    }
}

/// 韻母。`V*` は ü で始まる韻母
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Final {
    A,
    Ai,
    An,
    Ang,
    Ao,
    O,
    Ong,
    Ou,
    E,
    Ei,
    En,
    Eng,
    Er,
    I,
    Ia,
    Ian,
    Iang,
    Iao,
    Ie,
    In,
    Ing,
    Iong,
    Iou,
    U,
    Ua,
    Uai,
    Uan,
    Uang,
    Uei,
    Uen,
    Ueng,
    Uo,
    V,
    Ve,
    Van,
    Vn,
}

// MARK: 韻母ごとの許可声母リスト
mod allow {
    use super::Initial;
    use super::Initial::*;

    pub(super) const A_FAMILY: &[Initial] = &[
        Zero, B, P, M, F, D, T, N, L, G, K, H,
        Z, C, S, Zh, Ch, Sh, R,
    ];
    pub(super) const AI_AO_FAMILY: &[Initial] = &[
        Zero, B, P, M, D, T, N, L, G, K, H, Z,
        C, S, Zh, Ch, Sh, R,
    ];

    pub(super) const O_ONLY: &[Initial] = &[Zero, B, P, M, F];
    pub(super) const ONG_ONLY: &[Initial] = &[
        D, T, N, L, G, K, H, Z, C, S, Zh, Ch,
        Sh, R,
    ];
    pub(super) const OU_ONLY: &[Initial] = &[
        Zero, P, M, F, D, T, L, G, K, H, Z, C,
        S, Zh, Ch, Sh, R,
    ];

    pub(super) const E_ONLY: &[Initial] = &[
        Zero, M, D, T, N, L, G, K, H, Z, C, S,
        Zh, Ch, Sh, R,
    ];
    pub(super) const EI_ONLY: &[Initial] = &[
        Zero, B, P, M, F, D, N, L, G, H, Z, Zh,
        Sh,
    ];
    pub(super) const EN_ONLY: &[Initial] = &[
        Zero, B, P, M, F, N, G, K, H, Z, C, S,
        Zh, Ch, Sh, R,
    ];
    pub(super) const ENG_ONLY: &[Initial] = &[
        Zero, B, P, M, F, D, T, N, L, G, K, H,
        Z, C, S, Zh, Ch, Sh, R,
    ];
    pub(super) const ZERO_ONLY: &[Initial] = &[Zero];

    pub(super) const I_BASE: &[Initial] = &[
        Zero, B, P, M, D, T, N, L, J, Q, X,
    ];
    pub(super) const IA_ONLY: &[Initial] = &[Zero, D, L, J, Q, X];
    pub(super) const IANG_ONLY: &[Initial] = &[Zero, N, L, J, Q, X];
    pub(super) const IN_ONLY: &[Initial] = &[Zero, B, P, M, N, L, J, Q, X];
    pub(super) const IONG_ONLY: &[Initial] = &[Zero, J, Q, X];
    pub(super) const IOU_ONLY: &[Initial] = &[Zero, M, D, N, L, J, Q, X];

    pub(super) const U_BASE: &[Initial] = A_FAMILY;
    pub(super) const UA_ONLY: &[Initial] = &[Zero, G, K, H, Zh, Sh];
    pub(super) const UAI_UANG_ONLY: &[Initial] = &[Zero, G, K, H, Zh, Ch, Sh];
    pub(super) const UAN_UO_ONLY: &[Initial] = &[
        Zero, D, T, N, L, G, K, H, Z, C, S, Zh,
        Ch, Sh, R,
    ];
    pub(super) const UEI_ONLY: &[Initial] = &[
        Zero, D, T, G, K, H, Z, C, S, Zh, Ch, Sh,
        R,
    ];
    pub(super) const UEN_ONLY: &[Initial] = &[
        Zero, D, T, L, G, K, H, Z, C, S, Zh, Ch,
        Sh, R,
    ];

    pub(super) const UMLAUT_BASE: &[Initial] = &[Zero, N, L, J, Q, X];
    pub(super) const UMLAUT_AN_N: &[Initial] = &[Zero, J, Q, X];
}

impl Final {
    pub const ALL: [Final; 36] = [
        Final::A,
        Final::Ai,
        Final::An,
        Final::Ang,
        Final::Ao,
        Final::O,
        Final::Ong,
        Final::Ou,
        Final::E,
        Final::Ei,
        Final::En,
        Final::Eng,
        Final::Er,
        Final::I,
        Final::Ia,
        Final::Ian,
        Final::Iang,
        Final::Iao,
        Final::Ie,
        Final::In,
        Final::Ing,
        Final::Iong,
        Final::Iou,
        Final::U,
        Final::Ua,
        Final::Uai,
        Final::Uan,
        Final::Uang,
        Final::Uei,
        Final::Uen,
        Final::Ueng,
        Final::Uo,
        Final::V,
        Final::Ve,
        Final::Van,
        Final::Vn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Final::A => "a",
            Final::Ai => "ai",
            Final::An => "an",
            Final::Ang => "ang",
            Final::Ao => "ao",
            Final::O => "o",
            Final::Ong => "ong",
            Final::Ou => "ou",
            Final::E => "e",
            Final::Ei => "ei",
            Final::En => "en",
            Final::Eng => "eng",
            Final::Er => "er",
            Final::I => "i",
            Final::Ia => "ia",
            Final::Ian => "ian",
            Final::Iang => "iang",
            Final::Iao => "iao",
            Final::Ie => "ie",
            Final::In => "in",
            Final::Ing => "ing",
            Final::Iong => "iong",
            Final::Iou => "iou",
            Final::U => "u",
            Final::Ua => "ua",
            Final::Uai => "uai",
            Final::Uan => "uan",
            Final::Uang => "uang",
            Final::Uei => "uei",
            Final::Uen => "uen",
            Final::Ueng => "ueng",
            Final::Uo => "uo",
            Final::V => "ü",
            Final::Ve => "üe",
            Final::Van => "üan",
            Final::Vn => "ün",
        }
    }

    pub fn family(self) -> Family {
        Family::ALL
            .into_iter()
            .find(|fam| fam.finals().contains(&self))
            .unwrap_or(Family::A)
    }

    /// この韻母と組み合わせられる声母
    pub fn allowed_initials(self) -> &'static [Initial] {
        match self {
            Final::A | Final::An | Final::Ang => allow::A_FAMILY,
            Final::Ai | Final::Ao => allow::AI_AO_FAMILY,
            Final::O => allow::O_ONLY,
            Final::Ong => allow::ONG_ONLY,
            Final::Ou => allow::OU_ONLY,
            Final::E => allow::E_ONLY,
            Final::Ei => allow::EI_ONLY,
            Final::En => allow::EN_ONLY,
            Final::Eng => allow::ENG_ONLY,
            Final::Er | Final::Ueng => allow::ZERO_ONLY,
            Final::I | Final::Ian | Final::Iao | Final::Ie | Final::Ing => allow::I_BASE,
            Final::Ia => allow::IA_ONLY,
            Final::Iang => allow::IANG_ONLY,
            Final::In => allow::IN_ONLY,
            Final::Iong => allow::IONG_ONLY,
            Final::Iou => allow::IOU_ONLY,
            Final::U => allow::U_BASE,
            Final::Ua => allow::UA_ONLY,
            Final::Uai | Final::Uang => allow::UAI_UANG_ONLY,
            Final::Uan | Final::Uo => allow::UAN_UO_ONLY,
            Final::Uei => allow::UEI_ONLY,
            Final::Uen => allow::UEN_ONLY,
            Final::V | Final::Ve => allow::UMLAUT_BASE,
            Final::Van | Final::Vn => allow::UMLAUT_AN_N,
        }
    }

    /// ゼロ声母のときの綴り (yi, wu, yu ...)
    pub fn zero_initial_form(self) -> &'static str {
        match self {
            Final::I => "yi",
            Final::Ia => "ya",
            Final::Ian => "yan",
            Final::Iang => "yang",
            Final::Iao => "yao",
            Final::Ie => "ye",
            Final::In => "yin",
            Final::Ing => "ying",
            Final::Iong => "yong",
            Final::Iou => "you",
            Final::U => "wu",
            Final::Ua => "wa",
            Final::Uai => "wai",
            Final::Uan => "wan",
            Final::Uang => "wang",
            Final::Uei => "wei",
            Final::Uen => "wen",
            Final::Ueng => "weng",
            Final::Uo => "wo",
            Final::V => "yu",
            Final::Ve => "yue",
            Final::Van => "yuan",
            Final::Vn => "yun",
            other => other.as_str(),
        }
    }

    /// 声母が付いたときの短縮形 (iou → iu など)
    fn contracted(self) -> &'static str {
        match self {
            Final::Iou => "iu",
            Final::Uei => "ui",
            Final::Uen => "un",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Final {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Final {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Final::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnknownToken {
                kind: "final",
                token: s.to_string(),
            })
    }
}

// --------------------------------------------------
// 妥当性と表記
// --------------------------------------------------

/// 声母と韻母の組み合わせが存在するか
pub fn is_legal(initial: Initial, fin: Final) -> bool {
    fin.allowed_initials().contains(&initial)
}

/// ラテン文字 (ピンイン) 表記。組み合わせが存在しなければ `None`
///
/// 適用順: ゼロ声母の置き換え → iou/uei/uen の短縮 → j/q/x の後の ü → u
pub fn latin_spelling(initial: Initial, fin: Final) -> Option<String> {
    if !is_legal(initial, fin) {
        return None;
    }

    if initial == Initial::Zero {
        return Some(fin.zero_initial_form().to_string());
    }

    let mut out_final = fin.contracted().to_string();
    if matches!(initial, Initial::J | Initial::Q | Initial::X) && out_final.starts_with('ü') {
        out_final = out_final.replacen('ü', "u", 1);
    }

    Some(format!("{}{}", initial.as_str(), out_final))
}

/// 存在する全ての (声母, 韻母) の組
pub fn legal_pairs() -> impl Iterator<Item = (Initial, Final)> {
    Final::ALL.into_iter().flat_map(|fin| {
        Initial::ALL
            .into_iter()
            .filter(move |i| is_legal(*i, fin))
            .map(move |i| (i, fin))
    })
}

/// ラテン文字表記 → (声母, 韻母) の逆引き辞書
static LATIN_INDEX: LazyLock<HashMap<String, (Initial, Final)>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (initial, fin) in legal_pairs() {
        if let Some(text) = latin_spelling(initial, fin) {
            map.entry(text).or_insert((initial, fin));
        }
    }
    map
});

/// ラテン文字表記から (声母, 韻母) を復元する
pub fn parse_latin(text: &str) -> Option<(Initial, Final)> {
    LATIN_INDEX.get(text.trim()).copied()
}
