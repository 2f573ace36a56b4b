// ============================================
// src/ui/viewer.rs
// 保存済みの表を見る画面
// ============================================

use std::time::Instant;

use crossterm::event::{Event, KeyCode, MouseButton, MouseEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use pinyinwiz::markup::parse_grid;
use pinyinwiz::table::{Side, Slot};
use pinyinwiz::viewer::Viewer;

use super::{Flow, Screen, grid_table};

/// 端末の 1 マスをおおよその画素数に直す (スワイプ判定用)
const CELL_WIDTH_PX: f64 = 10.0;
const CELL_HEIGHT_PX: f64 = 20.0;

pub struct ViewerScreen {
    viewer: Viewer,
    drag_start: Option<(u16, u16, Instant)>,
}

impl ViewerScreen {
    pub fn new(mut viewer: Viewer) -> Self {
        viewer.render();
        Self { viewer, drag_start: None }
    }
}

impl Screen for ViewerScreen {
    fn on_event(&mut self, event: Event, now: Instant) -> anyhow::Result<Flow> {
        match event {
            Event::Key(key) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(Flow::Quit),
                KeyCode::Left => self.viewer.set_pane(Side::Left),
                KeyCode::Right => self.viewer.set_pane(Side::Right),
                KeyCode::Tab | KeyCode::Char('f') => {
                    self.viewer.next_family();
                    self.viewer.render();
                }
                KeyCode::Char(c @ '1'..='4') => {
                    self.viewer.set_tone(i64::from(c as u8 - b'0'));
                    self.viewer.render();
                }
                KeyCode::Char('c') | KeyCode::Enter => self.viewer.cycle_columns(),
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    self.drag_start = Some((mouse.column, mouse.row, now));
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    if let Some((x, y, at)) = self.drag_start.take() {
                        let dx = (f64::from(mouse.column) - f64::from(x)) * CELL_WIDTH_PX;
                        let dy = (f64::from(mouse.row) - f64::from(y)) * CELL_HEIGHT_PX;
                        if !self.viewer.swipe(dx, dy, now.saturating_duration_since(at)) && dx == 0.0 && dy == 0.0 {
                            // その場クリックは列の切り替え
                            self.viewer.cycle_columns();
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn draw(&mut self, f: &mut Frame) {
        let size = f.area();
        let title = format!(
            "PINYIN WiZ ! {} · tone {} · {}",
            self.viewer.family,
            self.viewer.tone(),
            self.viewer.pane
        );
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(size);
        f.render_widget(block, size);

        let pane = self.viewer.pane;
        let slots: Vec<_> = self
            .viewer
            .slots()
            .iter()
            .filter(|v| v.slot.side() == Some(pane))
            .cloned()
            .collect();
        let c_label = self
            .viewer
            .slots()
            .iter()
            .find(|v| v.slot == Slot::C)
            .map(|v| v.label.clone())
            .unwrap_or_default();

        let mut constraints = vec![Constraint::Length(1)];
        for view in &slots {
            let rows = view.slot.initials().len() as u16;
            constraints.push(Constraint::Min(rows + 3));
        }
        constraints.push(Constraint::Length(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        let total = self.viewer.data_columns();
        let page = if total > pinyinwiz::viewer::COL_SPLIT {
            format!("列 {}/3", self.viewer.columns.index() + 1)
        } else {
            String::new()
        };
        f.render_widget(
            Paragraph::new(format!("[{c_label}]  {page}")).style(Style::default().fg(Color::Yellow)),
            chunks[0],
        );

        let columns = self.viewer.columns.columns(total);
        for (i, view) in slots.iter().enumerate() {
            let area = chunks[i + 1];
            match &view.html {
                Some(html) => {
                    let grid = parse_grid(html);
                    let table = grid_table(&grid, columns.clone(), pane == Side::Right, view.title.clone());
                    f.render_widget(table, area);
                }
                None => f.render_widget(
                    Paragraph::new(view.desc.clone())
                        .style(Style::default().fg(Color::DarkGray))
                        .block(Block::default().borders(Borders::ALL).title(view.title.clone())),
                    area,
                ),
            }
        }

        f.render_widget(
            Paragraph::new("←/→:面 Tab:韻母 1-4:声調 c:列 q:終了 (ドラッグでスワイプ)")
                .style(Style::default().fg(Color::DarkGray)),
            chunks[slots.len() + 1],
        );
    }
}
