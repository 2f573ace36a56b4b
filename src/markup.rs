// ============================================
// src/markup.rs
// スロット表の HTML 断片の書き出しと、保存済み断片からのセル読み戻し
// ============================================

use std::fmt::Write as _;

use crate::syllable::{Family, Final, Initial};
use crate::table::{Side, header_label, stub_label};

/// HTML 断片 1 つ分の材料
pub struct TableSpec<'a> {
    pub family: Family,
    pub side: Side,
    pub dir: &'a str,
    pub rows: &'a [Initial],
}

/// 表を書き出す。セルの文字列は `cell` が決める (空文字 = 空欄)
pub fn render_table(spec: &TableSpec<'_>, mut cell: impl FnMut(Initial, Final) -> String) -> String {
    let cols = spec.family.finals();

    let mut header = String::new();
    for fin in cols {
        let _ = write!(header, "<th>{}</th>", escape(header_label(spec.side, spec.family, *fin)));
    }

    let mut out = String::new();
    out.push_str("<div class=\"pinyin-grid\">\n");
    let _ = writeln!(out, "  <table class=\"pinyin-grid-table\" dir=\"{}\">", spec.dir);
    out.push_str("    <thead>\n");
    // 上段は固定見出し用、下段は列数を数える側が使う
    let _ = writeln!(out, "      <tr class=\"pinyin-grid-top\"><th class=\"stub\"></th>{header}</tr>");
    let _ = writeln!(out, "      <tr class=\"pinyin-grid-head\"><th class=\"stub\"></th>{header}</tr>");
    out.push_str("    </thead>\n");
    out.push_str("    <tbody>\n");
    for initial in spec.rows {
        let _ = write!(
            out,
            "      <tr><th class=\"stub\">{}</th>",
            escape(stub_label(spec.side, *initial))
        );
        for fin in cols {
            let _ = write!(out, "<td>{}</td>", escape(&cell(*initial, *fin)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("    </tbody>\n");
    out.push_str("  </table>\n");
    out.push_str("</div>");
    out
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// `<tbody>` 内の各行について、`<td>` のテキストを順に取り出す
///
/// 読めない断片は空の表として扱う。
pub fn body_cells(html: &str) -> Vec<Vec<String>> {
    let Some(start) = html.find("<tbody") else {
        return Vec::new();
    };
    let body = &html[start..];
    let body = match body.find("</tbody>") {
        Some(end) => &body[..end],
        None => body,
    };

    body.split("<tr")
        .skip(1)
        .map(|row| {
            let row = row.split("</tr>").next().unwrap_or_default();
            row.split("<td")
                .skip(1)
                .map(|td| {
                    let inner = td.split_once('>').map(|(_, rest)| rest).unwrap_or_default();
                    let inner = inner.split("</td>").next().unwrap_or_default();
                    unescape(strip_tags(inner).trim())
                })
                .collect()
        })
        .collect()
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// 表示用に読み戻した表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridText {
    /// 列見出し (行見出しの列を除く)
    pub headers: Vec<String>,
    /// 行見出し
    pub stubs: Vec<String>,
    pub cells: Vec<Vec<String>>,
}

/// 保存済みの断片を見出し・行見出し・セルに分ける
pub fn parse_grid(html: &str) -> GridText {
    let headers = match html.find("pinyin-grid-head") {
        Some(start) => html[start..]
            .split("</tr>")
            .next()
            .unwrap_or_default()
            .split("<th")
            .skip(2)
            .map(cell_text)
            .collect(),
        None => Vec::new(),
    };

    let stubs = match html.find("<tbody") {
        Some(start) => html[start..]
            .split("</tbody>")
            .next()
            .unwrap_or_default()
            .split("<tr")
            .skip(1)
            .map(|row| row.split("<th").nth(1).map(cell_text).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    GridText {
        headers,
        stubs,
        cells: body_cells(html),
    }
}

/// `<th ...>text</th>` の `<th` より後ろからテキストを取り出す
fn cell_text(fragment: &str) -> String {
    let inner = fragment.split_once('>').map(|(_, rest)| rest).unwrap_or_default();
    let inner = inner.split("</t").next().unwrap_or_default();
    unescape(strip_tags(inner).trim())
}

/// `<thead>` の 2 段目の見出しセル数 (行見出しを除く)
pub fn data_column_count(html: &str) -> usize {
    let Some(start) = html.find("pinyin-grid-head") else {
        return 0;
    };
    let row = &html[start..];
    let row = row.split("</tr>").next().unwrap_or_default();
    row.matches("<th").count().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_reads_back_cells() {
        let spec = TableSpec {
            family: Family::O,
            side: Side::Left,
            dir: "ltr",
            rows: &[Initial::B, Initial::D],
        };
        let html = render_table(&spec, |i, f| format!("{i}{f}"));
        assert!(html.contains("dir=\"ltr\""));
        assert!(html.contains("<th class=\"stub\">d</th>"));
        assert_eq!(data_column_count(&html), 3);

        let cells = body_cells(&html);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1], vec!["do", "dong", "dou"]);
    }

    #[test]
    fn parses_headers_and_stubs() {
        let spec = TableSpec {
            family: Family::A,
            side: Side::Right,
            dir: "rtl",
            rows: &[Initial::B, Initial::P],
        };
        let html = render_table(&spec, |_, _| "x".to_string());
        let grid = parse_grid(&html);
        assert_eq!(grid.headers.len(), 5);
        assert_eq!(grid.stubs, vec!["ب", "پ"]);
        assert_eq!(grid.cells.len(), 2);
        assert_eq!(parse_grid("junk"), GridText::default());
    }

    #[test]
    fn escapes_cell_text() {
        let spec = TableSpec {
            family: Family::E,
            side: Side::Left,
            dir: "ltr",
            rows: &[Initial::M],
        };
        let html = render_table(&spec, |_, _| "<b>&'".to_string());
        assert!(!html.contains("<b>"));
        assert_eq!(body_cells(&html)[0][0], "<b>&'");
    }

    #[test]
    fn tolerates_foreign_markup() {
        let html = "<table><tbody><tr><th>b</th><td class=\"x\"> <span>ba</span> </td><td></td></tr></tbody></table>";
        assert_eq!(body_cells(html), vec![vec!["ba".to_string(), String::new()]]);
        assert!(body_cells("not html").is_empty());
    }
}
