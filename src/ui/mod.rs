// ============================================
// src/ui/mod.rs
// 端末の準備と画面共通のイベントループ
// ============================================

pub mod builder;
pub mod spin;
pub mod tones;
pub mod viewer;

use std::io::stdout;
use std::ops::Range;
use std::time::{Duration, Instant};

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Row, Table},
};

use pinyinwiz::markup::GridText;

/// イベントループの 1 周の間隔
const TICK: Duration = Duration::from_millis(50);

/// イベント処理後に続けるか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 1 画面分のアプリ
pub trait Screen {
    fn draw(&mut self, f: &mut Frame);

    fn on_event(&mut self, event: Event, now: Instant) -> anyhow::Result<Flow>;

    /// 入力が無くても定期的に呼ばれる
    fn tick(&mut self, _now: Instant) -> anyhow::Result<()> {
        Ok(())
    }

    /// 終了前に呼ばれる
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 端末を準備して画面を動かし、エラーでも端末を元に戻す
pub fn run(screen: &mut impl Screen) -> anyhow::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, screen);
    let finished = screen.finish();
    restore_terminal()?;
    result.and(finished)
}

fn setup_terminal() -> anyhow::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(EnableMouseCapture)?; // スワイプ・クリック用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Ok(Terminal::new(backend)?)
}

fn restore_terminal() -> anyhow::Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(DisableMouseCapture)?;
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<impl Backend>, screen: &mut impl Screen) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| screen.draw(f))?;

        if event::poll(TICK)? {
            let ev = event::read()?;
            // キーは押した時だけ
            let is_release = matches!(ev, Event::Key(KeyEvent { kind, .. }) if kind != KeyEventKind::Press);
            if !is_release && screen.on_event(ev, Instant::now())? == Flow::Quit {
                break;
            }
        }
        screen.tick(Instant::now())?;
    }
    Ok(())
}

// --------------------------------------------------
// 共通の描画部品
// --------------------------------------------------

/// 保存済みの表を ratatui の表にする。右側は列を逆順に並べる
pub fn grid_table<'a>(grid: &'a GridText, columns: Range<usize>, rtl: bool, title: String) -> Table<'a> {
    let columns: Vec<usize> = columns.filter(|&c| c < grid.headers.len()).collect();
    let order = |mut cells: Vec<Cell<'a>>, stub: Cell<'a>| {
        if rtl {
            cells.reverse();
            cells.push(stub);
        } else {
            cells.insert(0, stub);
        }
        cells
    };

    let header = Row::new(order(
        columns.iter().map(|&c| Cell::from(grid.headers[c].as_str())).collect(),
        Cell::from(""),
    ))
    .style(Style::default().fg(Color::Yellow).bold());

    let rows = grid.cells.iter().enumerate().map(|(r, cells)| {
        let data = columns
            .iter()
            .map(|&c| {
                let text = cells.get(c).map(String::as_str).unwrap_or_default();
                Cell::from(text)
            })
            .collect();
        let stub = grid.stubs.get(r).map(String::as_str).unwrap_or_default();
        Row::new(order(data, Cell::from(stub).style(Style::default().fg(Color::Cyan))))
    });

    let widths = vec![Constraint::Length(8); columns.len() + 1];
    Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
}

/// 画面中央に重ねる領域
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
