// ============================================
// src/arabic.rs
// アラビア文字表記の参照データ (右側スロット用)
// ============================================
//
// 参照表はタブ区切りのまま持っておき、初回アクセス時にセル単位の辞書へ展開する。
// 各行の最後の列がアラビア文字の声母ラベル、それ以外の列が韻母に対応する。
// 列の並びは右から左に書かれた表を写したものなので、韻母ごとの列番号を別に持つ。

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::debug;

use crate::syllable::{Family, Final, Initial};

// MARK: 参照表 (手入力データ)
const A_ROWS: &[&str] = &[
    "آو\tآنڠ\tآن\tآي\tآ\t",
    "\t\t\t\t\t",
    "بآو\tبآنڠ\tبآن\tبآي\tبآ\tب",
    "پآو\tپآنڠ\tپآن\tپآي\tپآ\tپ",
    "مآو\tمآنڠ\tمآن\tمآي\tمآ\tم",
    "\tفآنڠ\tفآن\t\tفآ\tف",
    "\t\t\t\t\t",
    "دآو\tدآنڠ\tدآن\tدآي\tدآ\tد",
    "تآو\tتآنڠ\tتآن\tتآي\tتآ\tت",
    "نآو\tنآنڠ\tنآن\tنآي\tنآ\tن",
    "لآو\tلآنڠ\tلآن\tلآي\tلآ\tل",
    "\t\t\t\t\t",
    "ڠآو\tڠآنڠ\tڠآن\tڠآي\tڠآ\tڠ",
    "كآو\tكآنڠ\tكآن\tكآي\tكآ\tك",
    "حآو\tحآنڠ\tحآن\tحآي\tحآ\tح",
    "\t\t\t\t\t",
    "زآو\tزآنڠ\tزآن\tزآي\tزآ\tز",
    "تسآو\tتسآنڠ\tتسآن\tتسآي\tتسآ\tتس",
    "سآو\tسآنڠ\tسآن\tسآي\tسآ\tس",
    "جآو\tجآنڠ\tجآن\tجآي\tجآ\tج",
    "تشآو\tتشآنڠ\tتشآن\tتشآي\tتشآ\tتش",
    "شآو\tشآنڠ\tشآن\tشآي\tشآ\tش",
    "رآو\tرآنڠ\tرآن\t\t\tر",
];

const O_ROWS: &[&str] = &[
    "ءو\tءونڠ\tووه\t",
    "\t\t\t",
    "\t\tبووه\tب",
    "پءو\t\tپووه\tپ",
    "مءو\t\tمووه\tم",
    "فءو\t\tفووه\tف",
    "\t\t\t",
    "دءو\tدءونڠ\t\tد",
    "تءو\tتءونڠ\t\tت",
    "\tنءونڠ\t\tن",
    "لءو\tلءونڠ\t\tل",
    "\t\t\t",
    "ڠءو\tڠءونڠ\t\tڠ",
    "كءو\tكءونڠ\t\tك",
    "خءو\tخءونڠ\t\tخ",
    "\t\t\t",
    "زءو\tزءونڠ\t\tز",
    "تسءو\tتسءونڠ\t\tتس",
    "سءو\tسءونڠ\t\tس",
    "جءو\tجءونڠ\t\tج",
    "تشءو\tتشءونڠ\t\tتش",
    "شءو\t\t\tش",
    "رءو\t\t\tر",
];

const E_ROWS: &[&str] = &[
    "ءر\tءنڠ\tءن\tءي\tه\t",
    "\t\t\t\t\t",
    "\tبءنڠ\tبءن\tبءي\t\tب",
    "\tپءنڠ\tپءن\tپءي\t\tپ",
    "\tمءنڠ\tمءن\tمءي\tمه\tم",
    "\tفءنڠ\tفءن\t\t\tف",
    "\t\t\t\t\t",
    "\tدءنڠ\t\tدءي\tده\tد",
    "\tتءنڠ\t\tتءي\tته\tت",
    "\tنءنڠ\tنءن\tنءي\tنه\tن",
    "\tلءنڠ\t\tلءي\tله\tل",
    "\t\t\t\t\t",
    "\tڠءنڠ\tڠءن\tڠءي\tڠه\tڠ",
    "\tكءنڠ\tكءن\tكءي\tكه\tك",
    "\tخءنڠ\tخءن\tخءي\tخه\tخ",
    "\t\t\t\t\t",
    "\tزءنڠ\tزءن\tزءي\tزه\tز",
    "\tتسءنڠ\tتسءن\tتسءي\tتسه\tتس",
    "\tسءنڠ\tسءن\tسءي\tسه\tس",
    "\tجءنڠ\tجءن\tجءي\tجه\tج",
    "\tتشءنڠ\tتشءن\tتشءي\tتشه\tتش",
    "\tشءنڠ\tشءن\tشءي\tشه\tش",
    "\t\tرءن\t\tره\tر",
];

const I_ROWS: &[&str] = &[
    "\tيو\tيونڠ\tينڠ\tين\tيه\tيآنڠ\tيآن\tيآو\tيآ\tي\t",
    "\t\t\t\t\t\t\t\t\t\t\t",
    "\t\tبينڠ\tبين\tبيه\tبيآنڠ\tبيآن\tبيآو\t\tبي\tب",
    "\t\tپينڠ\tپين\tپيه\tپيآنڠ\tپيآن\tپيآو\t\tپي\tپ",
    "ميو\t\tمينڠ\tمين\tميه\tميآنڠ\tميآن\tميآو\t\tمي\tم",
    "\t\t\t\t\t\t\t\t\t\tف",
    "ديو\t\tدينڠ\t\tديه\tديآنڠ\tديآن\tديآو\tديآ\tدي\tد",
    "\t\tتينڠ\t\tتيه\tتيآنڠ\tتيآن\tتيآو\t\tتي\tت",
    "نيو\t\tنينڠ\tنين\tنيه\tنيآنڠ\tنيآن\tنيآو\t\tني\tن",
    "ليو\t\tلينڠ\tلين\tليه\tليآنڠ\tليآن\tليآو\tليآ\tلي\tل",
    "\t\t\t\t\t\t\t\t\t\tڠ",
    "\t\t\t\t\t\t\t\t\t\tك",
    "\t\t\t\t\t\t\t\t\t\tخ",
    "جيو\tجيونڠ\tجينڠ\tجين\tجيه\tجيآنڠ\tجيآن\tجيآو\tجيآ\tجي\tجي",
    "تشيو\tتشيونڠ\tتشينڠ\tتشين\tتشيه\tتشيآنڠ\tتشيآن\tتشيآو\tتشيآ\tتشي\tتشي",
    "شيو\tشيونڠ\tشينڠ\tشين\tشيه\tشيآنڠ\tشيآن\tشيآو\tشيآ\tشي\tشي",
];

const U_ROWS: &[&str] = &[
    "ووه\tونڠ\tون\tوي\tوآنڠ\tوآن\tوآي\tوآ\tو\t",
    "\t\t\t\t\t\t\t\t\t",
    "بووه\t\t\t\t\t\t\tبو\tب",
    "پووه\t\t\t\t\t\t\tپو\tپ",
    "مووه\t\t\t\t\t\t\tمو\tم",
    "فووه\t\t\t\t\t\t\tفو\tف",
    "\t\t\t\t\t\t\t\t",
    "دووه\t\tدون\tدوي\t\tدوآن\t\t\tدو\tد",
    "تووه\t\tتون\tتوي\t\tتوآن\t\t\tتو\tت",
    "نووه\t\t\t\t\tنوآن\t\t\tنو\tن",
    "لووه\t\tلون\t\t\tلوآن\t\t\tلو\tل",
    "\t\t\t\t\t\t\t\t",
    "ڠووه\t\tڠون\tڠوي\tڠوآنڠ\tڠوآن\tڠوآي\tڠوآ\tڠو\tڠ",
    "كووه\t\tكون\tكوي\tكوآنڠ\tكوآن\tكوآي\tكوآ\tكو\tك",
    "خووه\t\tخون\tخوي\tخوآنڠ\tخوآن\tخوآي\tخوآ\tخو\tخ",
    "\t\t\t\t\t\t\t\t",
    "زووه\t\tزون\tزوي\t\tزوآن\t\t\tزو\tز",
    "تسووه\t\tتسون\tتسوي\t\tتسوآن\t\t\tتسو\tتس",
    "سووه\t\tسون\tسوي\t\tسوآن\t\t\tسو\tس",
    "جووه\t\tجون\tجوي\tجوآنڠ\tجوآن\tجوآي\tجوآ\tجو\tج",
    "تشووه\t\tتشون\tتشوي\tتشوآنڠ\tتشوآن\tتشوآي\t\tتشو\tتش",
    "شووه\t\tشون\tشوي\tشوآنڠ\tشوآن\tشوآي\tشوآ\tشو\tش",
    "رووه\t\tرون\tروي\t\tروآن\t\t\tرو\tر",
];

/// 参照表の列番号 (韻母 → 列)
fn column_of(fin: Final) -> Option<usize> {
    use Final::*;
    let idx = match fin {
        // a: [ao, ang, an, ai, a]
        A => 4,
        Ai => 3,
        An => 2,
        Ang => 1,
        Ao => 0,
        // o: [ou, ong, o]
        O => 2,
        Ong => 1,
        Ou => 0,
        // e: [er, eng, en, ei, e]
        E => 4,
        Ei => 3,
        En => 2,
        Eng => 1,
        Er => 0,
        // i: [iou, iong, ing, in, ie, iang, ian, iao, ia, i]
        I => 9,
        Ia => 8,
        Ian => 6,
        Iang => 5,
        Iao => 7,
        Ie => 4,
        In => 3,
        Ing => 2,
        Iong => 1,
        Iou => 0,
        // u: [uo, ueng, uen, uei, uang, uan, uai, ua, u]
        U => 8,
        Ua => 7,
        Uai => 6,
        Uan => 5,
        Uang => 4,
        Uei => 3,
        Uen => 2,
        Ueng => 1,
        Uo => 0,
        V | Ve | Van | Vn => return None,
    };
    Some(idx)
}

fn rows_for(family: Family) -> &'static [&'static str] {
    match family {
        Family::A => A_ROWS,
        Family::O => O_ROWS,
        Family::E => E_ROWS,
        Family::I => I_ROWS,
        Family::U => U_ROWS,
        Family::V => &[],
    }
}

/// 行末のアラビア文字ラベル → 声母
fn initial_from_label(label: &str) -> Option<Initial> {
    let initial = match label {
        "ب" => Initial::B,
        "پ" => Initial::P,
        "م" => Initial::M,
        "ف" => Initial::F,
        "د" => Initial::D,
        "ت" => Initial::T,
        "ن" => Initial::N,
        "ل" => Initial::L,
        "ڠ" => Initial::G,
        "ك" => Initial::K,
        "ح" | "خ" => Initial::H,
        "ز" => Initial::Z,
        "تس" => Initial::C,
        "س" => Initial::S,
        "ج" => Initial::Zh,
        "تش" => Initial::Ch,
        "ش" => Initial::Sh,
        "ر" => Initial::R,
        // i 表だけ j/q/x の行が母音付きのラベルで書かれている
        "جي" => Initial::J,
        "تشي" => Initial::Q,
        "شي" => Initial::X,
        _ => return None,
    };
    Some(initial)
}

type CellKey = (Family, Initial, Final);

/// 1グループ分の参照表をセル辞書に展開する。壊れた行は黙って読み飛ばす
fn parse_family(family: Family, out: &mut HashMap<CellKey, &'static str>) {
    for &line in rows_for(family) {
        let parts: Vec<&'static str> = line.split('\t').map(str::trim).collect();
        if parts.iter().filter(|p| !p.is_empty()).count() < 2 {
            continue;
        }

        let Some((label, values)) = parts.split_last() else {
            continue;
        };
        let Some(initial) = initial_from_label(label) else {
            continue;
        };

        for &fin in family.finals() {
            let Some(idx) = column_of(fin) else { continue };
            match values.get(idx) {
                Some(v) if !v.is_empty() => {
                    out.insert((family, initial, fin), *v);
                }
                _ => {}
            }
        }
    }
}

static OVERRIDES: LazyLock<HashMap<CellKey, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for family in Family::ALL {
        parse_family(family, &mut map);
    }
    debug!(cells = map.len(), "arabic reference table parsed");
    map
});

/// 参照表に書かれたセルの表記。韻母名は短縮前 (iou, uei, uen) で引く
pub fn cell_override(family: Family, initial: Initial, fin: Final) -> Option<&'static str> {
    OVERRIDES.get(&(family, initial, fin)).copied()
}

/// 右側の行見出しに使う声母のアラビア文字 (ゼロ声母は空)
pub fn initial_label(initial: Initial) -> &'static str {
    match initial {
        Initial::Zero => "",
        Initial::B => "ب",
        Initial::P => "پ",
        Initial::M => "م",
        Initial::F => "ف",
        Initial::D => "د",
        Initial::T => "ت",
        Initial::N => "ن",
        Initial::L => "ل",
        Initial::G => "ڠ",
        Initial::K => "ك",
        Initial::H => "ح",
        Initial::J => "j",
        Initial::Q => "q",
        Initial::X => "x",
        Initial::Zh => "ج",
        Initial::Ch => "تش",
        Initial::Sh => "ش",
        Initial::R => "ر",
        Initial::Z => "ز",
        Initial::C => "تس",
        Initial::S => "س",
    }
}

/// 右側の列見出しに使う韻母のアラビア文字
pub fn final_label(family: Family, fin: Final) -> Option<&'static str> {
    if fin.family() != family {
        return None;
    }
    use Final::*;
    let label = match fin {
        A => "آ",
        Ai => "آي",
        An => "آن",
        Ang => "آنڠ",
        Ao => "آو",
        O => "ءو",
        Ong => "ءونڠ",
        Ou => "ووه",
        E => "ه",
        Ei => "ءي",
        En => "ءن",
        Eng => "ءنڠ",
        Er => "ءر",
        I => "ي",
        Ia => "يآ",
        Ian => "يآن",
        Iang => "يآنڠ",
        Iao => "يآو",
        Ie => "يه",
        In => "ين",
        Ing => "ينڠ",
        Iong => "يونڠ",
        Iou => "يو",
        U => "و",
        Ua => "وآ",
        Uai => "وآي",
        Uan => "وآن",
        Uang => "وآنڠ",
        Uei => "وي",
        Uen => "ون",
        Ueng => "ونڠ",
        Uo => "ووه",
        V => "يو",
        Ve => "يوي",
        Van => "يوآن",
        Vn => "يون",
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cells_through_column_map() {
        assert_eq!(cell_override(Family::A, Initial::B, Final::A), Some("بآ"));
        assert_eq!(cell_override(Family::A, Initial::B, Final::Ao), Some("بآو"));
        assert_eq!(cell_override(Family::E, Initial::D, Final::E), Some("ده"));
        assert_eq!(cell_override(Family::I, Initial::L, Final::Ia), Some("ليآ"));
        assert_eq!(cell_override(Family::U, Initial::D, Final::Uen), Some("دون"));
    }

    #[test]
    fn labial_rows_use_latin_keys() {
        assert_eq!(cell_override(Family::A, Initial::M, Final::An), Some("مآن"));
        assert_eq!(cell_override(Family::A, Initial::F, Final::Ang), Some("فآنڠ"));
    }

    #[test]
    fn palatal_rows_in_i_table() {
        assert_eq!(cell_override(Family::I, Initial::J, Final::Iou), Some("جيو"));
        assert_eq!(cell_override(Family::I, Initial::X, Final::I), Some("شي"));
    }

    #[test]
    fn blank_and_header_rows_are_skipped() {
        // 見出し行の最後の列は空なので声母にならない
        assert_eq!(cell_override(Family::A, Initial::Zero, Final::A), None);
        // f 行は全て空欄
        assert_eq!(cell_override(Family::I, Initial::F, Final::I), None);
        // ü 表は存在しない
        assert_eq!(cell_override(Family::V, Initial::J, Final::V), None);
    }

    #[test]
    fn empty_cells_have_no_entry() {
        // a 表の r 行は ai/a が空欄
        assert_eq!(cell_override(Family::A, Initial::R, Final::Ai), None);
        assert_eq!(cell_override(Family::A, Initial::R, Final::An), Some("رآن"));
    }

    #[test]
    fn final_label_requires_matching_family() {
        assert_eq!(final_label(Family::A, Final::Ang), Some("آنڠ"));
        assert_eq!(final_label(Family::O, Final::Ang), None);
        assert_eq!(initial_label(Initial::Zero), "");
        assert_eq!(initial_label(Initial::Ch), "تش");
    }
}
