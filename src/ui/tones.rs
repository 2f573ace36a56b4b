// ============================================
// src/ui/tones.rs
// 声調ペア当てゲーム画面
// ============================================

use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode};
use rand::rngs::ThreadRng;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use pinyinwiz::tone_pairs::{COL_HEADERS, COLS, CellId, DropOutcome, ROW_HEADERS, ROWS, ToneGame};

use super::{Flow, Screen};

/// 正解・不正解の色を出す時間
const FLASH: Duration = Duration::from_millis(500);

pub struct TonesScreen {
    game: ToneGame,
    rng: ThreadRng,
    cursor: CellId,
    flash: Option<(bool, Instant)>,
}

impl TonesScreen {
    pub fn new(game: ToneGame) -> Self {
        Self {
            game,
            rng: rand::rng(),
            cursor: CellId { row: 1, col: 1 },
            flash: None,
        }
    }

    fn move_cursor(&mut self, dr: i8, dc: i8) {
        let row = (self.cursor.row as i8 + dr).clamp(1, ROWS as i8) as u8;
        let col = (self.cursor.col as i8 + dc).clamp(1, COLS as i8) as u8;
        if let Some(cell) = CellId::new(row, col) {
            self.cursor = cell;
        }
    }
}

impl Screen for TonesScreen {
    fn on_event(&mut self, event: Event, now: Instant) -> anyhow::Result<Flow> {
        let Event::Key(key) = event else {
            return Ok(Flow::Continue);
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Flow::Quit),
            KeyCode::Char(' ') => self.game.start(&mut self.rng),
            KeyCode::Char('p') => self.game.hide_pinyin = !self.game.hide_pinyin,
            KeyCode::Up => self.move_cursor(-1, 0),
            KeyCode::Down => self.move_cursor(1, 0),
            // 列は右から左へ並ぶ
            KeyCode::Left => self.move_cursor(0, 1),
            KeyCode::Right => self.move_cursor(0, -1),
            KeyCode::Enter => match self.game.drop_on(self.cursor, &mut self.rng) {
                DropOutcome::Correct { .. } => self.flash = Some((true, now)),
                DropOutcome::Wrong => self.flash = Some((false, now)),
                DropOutcome::NoCard => self.game.start(&mut self.rng),
            },
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn tick(&mut self, now: Instant) -> anyhow::Result<()> {
        if self.flash.is_some_and(|(_, at)| now.saturating_duration_since(at) >= FLASH) {
            self.flash = None;
        }
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame) {
        let size = f.area();
        let border = match self.flash {
            Some((true, _)) => Color::Green,
            Some((false, _)) => Color::Red,
            None => Color::White,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title("PINYIN WiZ ! tones");
        let inner = block.inner(size);
        f.render_widget(block, size);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // [0] 得点
                Constraint::Length(4), // [1] カード
                Constraint::Min(7),    // [2] マス
                Constraint::Length(1), // [3] 操作説明
            ])
            .split(inner);

        let (correct, wrong) = self.game.score();
        f.render_widget(
            Paragraph::new(format!(
                "正解 {correct}  ミス {wrong}  残り {}",
                self.game.remaining_in_bag()
            ))
            .style(Style::default().fg(Color::Yellow)),
            chunks[0],
        );

        let card = match self.game.current() {
            Some(card) => {
                let mut lines = vec![Line::from(card.hanzi.clone()).style(Style::default().bold())];
                if !self.game.hide_pinyin {
                    lines.push(Line::from(card.reading().to_string()).style(Style::default().fg(Color::Gray)));
                }
                Paragraph::new(lines)
            }
            None => Paragraph::new("Space でカードをめくる").style(Style::default().fg(Color::DarkGray)),
        };
        f.render_widget(card.centered().block(Block::default().borders(Borders::ALL)), chunks[1]);

        // 列見出しは右から左へ (1 列目が右端)
        let mut header: Vec<Cell> = COL_HEADERS.iter().rev().map(|h| Cell::from(*h)).collect();
        header.push(Cell::from(""));
        let rows = (1..=ROWS).map(|row| {
            let mut cells: Vec<Cell> = (1..=COLS)
                .rev()
                .map(|col| {
                    let style = if self.cursor == (CellId { row, col }) {
                        Style::default().bg(Color::White).fg(Color::Black)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    Cell::from(format!("{row} + {col}")).style(style)
                })
                .collect();
            cells.push(Cell::from(ROW_HEADERS[row as usize - 1]).style(Style::default().fg(Color::Cyan)));
            Row::new(cells).height(1)
        });
        let widths = vec![Constraint::Length(16); COLS as usize + 1];
        f.render_widget(
            Table::new(rows, widths)
                .header(Row::new(header).style(Style::default().fg(Color::Yellow).bold()))
                .block(Block::default().borders(Borders::TOP)),
            chunks[2],
        );

        let hide = if self.game.hide_pinyin { "ON" } else { "OFF" };
        f.render_widget(
            Paragraph::new(format!("矢印:マス Enter:置く Space:めくる p:ピンイン隠す({hide}) q:終了"))
                .style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );
    }
}
