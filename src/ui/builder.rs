// ============================================
// src/ui/builder.rs
// 表ビルダー画面
// ============================================

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use tracing::warn;

use pinyinwiz::builder::BuilderSession;
use pinyinwiz::context::ViewAction;
use pinyinwiz::syllable::{Final, Initial, is_legal};
use pinyinwiz::table::{Side, Slot, Tone, header_label, stub_label};

use super::{Flow, Screen};

/// セルの文字入力中
struct Input {
    initial: Initial,
    fin: Final,
    buffer: String,
}

pub struct BuilderScreen {
    session: BuilderSession,
    export_to: Option<PathBuf>,
    row: usize,
    col: usize,
    input: Option<Input>,
    status: String,
}

impl BuilderScreen {
    pub fn new(session: BuilderSession, export_to: Option<PathBuf>) -> Self {
        Self {
            session,
            export_to,
            row: 0,
            col: 0,
            input: None,
            status: String::new(),
        }
    }

    /// 今の面の行 (スロット順に並べた声母)
    fn rows(&self) -> Vec<(Slot, Initial)> {
        Slot::for_side(self.session.context().side)
            .into_iter()
            .flat_map(|slot| slot.initials().iter().map(move |i| (slot, *i)))
            .collect()
    }

    fn finals(&self) -> &'static [Final] {
        self.session.context().family.finals()
    }

    fn selected(&self) -> Option<(Initial, Final)> {
        let rows = self.rows();
        let (_, initial) = rows.get(self.row)?;
        let fin = self.finals().get(self.col)?;
        Some((*initial, *fin))
    }

    fn dispatch(&mut self, action: ViewAction) -> anyhow::Result<()> {
        self.session.dispatch(action)?;
        self.row = self.row.min(self.rows().len().saturating_sub(1));
        self.col = self.col.min(self.finals().len().saturating_sub(1));
        Ok(())
    }

    fn on_input_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.input = None,
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Char(c) => input.buffer.push(c),
            KeyCode::Enter => {
                if let Some(input) = self.input.take() {
                    let changed = if self.session.context().edit_mode {
                        self.session.commit_cell(input.initial, input.fin, &input.buffer, now)
                    } else {
                        self.session.edit_cell(input.initial, input.fin, &input.buffer, now)
                    };
                    if !changed {
                        self.status = "この組み合わせは編集できません".into();
                    }
                }
            }
            _ => {}
        }
    }

    fn save(&mut self) {
        match self.session.save(self.export_to.as_deref(), Utc::now()) {
            Ok(()) => {
                let meta = &self.session.store().meta.builder;
                self.status = format!("保存しました v{} ({}回目)", meta.version, meta.save_count);
            }
            Err(err) => {
                warn!(%err, "save failed");
                self.status = format!("保存に失敗しました: {err}");
            }
        }
    }
}

impl Screen for BuilderScreen {
    fn on_event(&mut self, event: Event, now: Instant) -> anyhow::Result<Flow> {
        let Event::Key(key) = event else {
            return Ok(Flow::Continue);
        };
        if self.input.is_some() {
            self.on_input_key(key, now);
            return Ok(Flow::Continue);
        }

        let ctx = self.session.context();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Flow::Quit),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.save(),
            KeyCode::Tab => self.dispatch(ViewAction::NextFamily)?,
            KeyCode::BackTab => self.dispatch(ViewAction::PrevFamily)?,
            KeyCode::Char(c @ '1'..='4') => {
                if let Some(tone) = Tone::new(c as u8 - b'0') {
                    self.dispatch(ViewAction::SetTone(tone))?;
                }
            }
            KeyCode::Char('t') => self.dispatch(ViewAction::NextTone)?,
            KeyCode::Char('s') => self.dispatch(ViewAction::ToggleSide)?,
            KeyCode::Char('e') => self.dispatch(ViewAction::ToggleEditMode)?,
            KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Down => self.row = (self.row + 1).min(self.rows().len().saturating_sub(1)),
            KeyCode::Left | KeyCode::Right => {
                // 右側は右から左へ並ぶので左右を入れ替える
                let forward = (key.code == KeyCode::Right) == (ctx.side == Side::Left);
                self.col = if forward {
                    (self.col + 1).min(self.finals().len().saturating_sub(1))
                } else {
                    self.col.saturating_sub(1)
                };
            }
            KeyCode::Char(' ') => {
                if let Some((i, f)) = self.selected() {
                    self.session.toggle_cell(i, f, now);
                }
            }
            KeyCode::Delete | KeyCode::Backspace => {
                if let Some((i, f)) = self.selected() {
                    self.session.clear_cell(i, f, now);
                }
            }
            KeyCode::Enter => {
                if let Some((initial, fin)) = self.selected().filter(|(i, f)| is_legal(*i, *f)) {
                    self.input = Some(Input {
                        initial,
                        fin,
                        buffer: self.session.layer().effective_text(initial, fin),
                    });
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn tick(&mut self, now: Instant) -> anyhow::Result<()> {
        if let Err(err) = self.session.tick(now) {
            warn!(%err, "draft write failed");
            self.status = format!("下書きを保存できません: {err}");
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.session.persist_now()?;
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame) {
        let size = f.area();
        let block = Block::default().borders(Borders::ALL).title("PINYIN WiZ ! builder");
        let inner = block.inner(size);
        f.render_widget(block, size);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // [0] 韻母グループ・声調・面
                Constraint::Min(5),    // [1] 表
                Constraint::Length(1), // [2] 入力欄 / 状態
                Constraint::Length(1), // [3] 操作説明
            ])
            .split(inner);

        let ctx = self.session.context();
        let (on, off) = self.session.counts();
        let mode = if ctx.edit_mode { "全セル編集" } else { "通常" };
        let draft = if self.session.has_pending_draft() { " *" } else { "" };
        f.render_widget(
            Paragraph::new(format!(
                "{} · tone {} · {}  |  表示 {on} / 非表示 {off}  |  {mode}{draft}",
                ctx.family, ctx.tone, ctx.side
            ))
            .style(Style::default().fg(Color::White).bold()),
            chunks[0],
        );

        let layer = self.session.layer();
        let finals = self.finals();
        let rtl = ctx.side == Side::Right;
        let arrange = |mut cells: Vec<Cell<'static>>, stub: Cell<'static>| {
            if rtl {
                cells.reverse();
                cells.push(stub);
            } else {
                cells.insert(0, stub);
            }
            cells
        };

        let header = Row::new(arrange(
            finals
                .iter()
                .map(|fin| Cell::from(header_label(ctx.side, ctx.family, *fin)))
                .collect(),
            Cell::from(""),
        ))
        .style(Style::default().fg(Color::Yellow).bold());

        let rows = self.rows().into_iter().enumerate().map(|(r, (slot, initial))| {
            let cells = finals
                .iter()
                .enumerate()
                .map(|(c, fin)| {
                    let text = layer.effective_text(initial, *fin);
                    let mut style = if !is_legal(initial, *fin) {
                        Style::default().fg(Color::DarkGray)
                    } else if layer.is_off(initial, *fin) {
                        Style::default().fg(Color::Red)
                    } else if layer.get(initial, *fin).is_some_and(|o| o.text.is_some()) {
                        Style::default().fg(Color::Magenta)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    if r == self.row && c == self.col {
                        style = style.bg(Color::White).fg(Color::Black);
                    }
                    let shown = if text.is_empty() && is_legal(initial, *fin) { "·".to_string() } else { text };
                    Cell::from(shown).style(style)
                })
                .collect();
            let stub = if slot.initials().first() == Some(&initial) {
                format!("{} {}", slot, stub_label(ctx.side, initial))
            } else {
                format!("   {}", stub_label(ctx.side, initial))
            };
            Row::new(arrange(cells, Cell::from(stub).style(Style::default().fg(Color::Cyan))))
        });

        let widths = vec![Constraint::Length(9); finals.len() + 1];
        f.render_widget(
            Table::new(rows, widths).header(header).block(Block::default().borders(Borders::TOP)),
            chunks[1],
        );

        let line = match &self.input {
            Some(input) => Line::from(vec![
                Span::styled(format!("{}{} > ", input.initial, input.fin), Style::default().fg(Color::Yellow)),
                Span::raw(input.buffer.clone()),
                Span::styled(" ", Style::default().bg(Color::White)),
            ]),
            None => Line::from(self.status.clone()).style(Style::default().fg(Color::Green)),
        };
        f.render_widget(Paragraph::new(line), chunks[2]);

        f.render_widget(
            Paragraph::new(
                "Tab:韻母 1-4/t:声調 s:面 e:全セル編集 Space:表示切替 Enter:編集 Del:戻す Ctrl+S:保存 q:終了",
            )
            .style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );
    }
}
