// ============================================
// src/ui/spin.rs
// スロットゲーム画面
// ============================================

use std::time::Instant;

use crossterm::event::{Event, KeyCode, MouseEventKind};
use rand::rngs::ThreadRng;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::warn;

use pinyinwiz::config::DataPaths;
use pinyinwiz::markup::parse_grid;
use pinyinwiz::practice::{CloseReason, PracticeSession, SpinOutcome};
use pinyinwiz::sampler::{CATEGORIES, FINAL_GROUPS, TONES};
use pinyinwiz::store::Store;
use pinyinwiz::viewer::ColumnView;

use super::{Flow, Screen, centered, grid_table};

/// 確認待ちの操作
enum Pending {
    Remove(usize),
    Reset,
}

/// 回転中のリール表示
struct Reels {
    started: Instant,
    stops: [Instant; 3],
    /// 止まる位置 (声調・子音・韻母)
    targets: [usize; 3],
}

pub struct SpinScreen {
    session: PracticeSession,
    store: Store,
    paths: DataPaths,
    rng: ThreadRng,
    reels: Option<Reels>,
    columns: ColumnView,
    history: ListState,
    pending: Option<Pending>,
    status: String,
}

impl SpinScreen {
    pub fn new(session: PracticeSession, store: Store, paths: DataPaths) -> Self {
        Self {
            session,
            store,
            paths,
            rng: rand::rng(),
            reels: None,
            columns: ColumnView::First,
            history: ListState::default(),
            pending: None,
            status: String::new(),
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.session.save(&self.paths) {
            warn!(%err, "practice data not saved");
            self.status = format!("保存できません: {err}");
        }
    }

    fn spin(&mut self, now: Instant) {
        match self.session.spin(now, &mut self.rng) {
            SpinOutcome::Started { combo, .. } => {
                let times = self.session.reel_stop_times();
                self.reels = Some(Reels {
                    started: now,
                    stops: times.map(|d| now + d),
                    targets: [combo.tone as usize, combo.category as usize, combo.group as usize],
                });
                self.columns = ColumnView::First;
                self.status.clear();
            }
            SpinOutcome::Exhausted => self.status = "すべての組み合わせが出ました".into(),
            SpinOutcome::Busy | SpinOutcome::Locked => {}
        }
    }

    fn close_jackpot(&mut self, reason: CloseReason) -> bool {
        self.session.jackpot.close(reason)
    }

    fn on_settings_key(&mut self, code: KeyCode) -> bool {
        let settings = self.session.settings().clone();
        match code {
            KeyCode::Char('a') => self.session.set_allow_invalid(!settings.allow_invalid_combos),
            KeyCode::Char('j') => self.session.set_jackpot_only(!settings.jackpot_only),
            KeyCode::Char('+') if settings.probability_enabled() => self
                .session
                .settings_mut()
                .set_jackpot_probability(i32::from(settings.jackpot_probability) + 10),
            KeyCode::Char('-') if settings.probability_enabled() => self
                .session
                .settings_mut()
                .set_jackpot_probability(i32::from(settings.jackpot_probability) - 10),
            KeyCode::Char('[') => {
                self.session.settings_mut().spin_speed = (settings.spin_speed - 0.5).max(0.5);
            }
            KeyCode::Char(']') => {
                self.session.settings_mut().spin_speed = (settings.spin_speed + 0.5).min(10.0);
            }
            _ => return false,
        }
        true
    }
}

impl Screen for SpinScreen {
    fn on_event(&mut self, event: Event, now: Instant) -> anyhow::Result<Flow> {
        // ボーナス演出中はクリックかキーで閉じるだけ
        if self.session.jackpot.is_open() {
            match event {
                Event::Mouse(m) if matches!(m.kind, MouseEventKind::Down(_)) => {
                    self.close_jackpot(CloseReason::Click);
                }
                Event::Key(k) if matches!(k.code, KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Esc) => {
                    self.close_jackpot(CloseReason::Key);
                }
                _ => {}
            }
            return Ok(Flow::Continue);
        }

        let Event::Key(key) = event else {
            return Ok(Flow::Continue);
        };

        if let Some(pending) = self.pending.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Enter) {
                match pending {
                    Pending::Remove(index) => {
                        self.session.remove_history(index);
                    }
                    Pending::Reset => {
                        self.session.reset();
                        self.reels = None;
                    }
                }
                self.persist();
            }
            return Ok(Flow::Continue);
        }

        if self.on_settings_key(key.code) {
            self.persist();
            return Ok(Flow::Continue);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(Flow::Quit),
            KeyCode::Esc => {
                if self.session.last_result().is_some() {
                    self.session.dismiss_result();
                } else {
                    return Ok(Flow::Quit);
                }
            }
            KeyCode::Char(' ') => self.spin(now),
            KeyCode::Char('c') => {
                let total = self
                    .session
                    .last_result()
                    .and_then(|r| r.left_html.as_deref())
                    .map(pinyinwiz::markup::data_column_count)
                    .unwrap_or(0);
                self.columns = self.columns.cycled(total);
            }
            KeyCode::Up => self.history.select_previous(),
            KeyCode::Down => self.history.select_next(),
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(index) = self.history.selected() {
                    if index < self.session.sampler().history().len() {
                        self.pending = Some(Pending::Remove(index));
                    }
                }
            }
            KeyCode::Char('r') => self.pending = Some(Pending::Reset),
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn tick(&mut self, now: Instant) -> anyhow::Result<()> {
        let was_spinning = self.session.is_spinning();
        self.session.poll(now, &self.store);
        if was_spinning && !self.session.is_spinning() {
            self.reels = None;
            self.persist();
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.session.save(&self.paths)?;
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame) {
        let size = f.area();
        let block = Block::default().borders(Borders::ALL).title("PINYIN WiZ ! spin");
        let inner = block.inner(size);
        f.render_widget(block, size);

        let outer = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(44)])
            .split(inner);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // [0] 残り
                Constraint::Length(3), // [1] リール
                Constraint::Length(2), // [2] 結果の説明
                Constraint::Min(5),    // [3] 表
                Constraint::Length(1), // [4] 設定
                Constraint::Length(1), // [5] 操作説明
            ])
            .split(outer[0]);

        // 0. 残り数
        let remaining = format!("残り {} / {}", self.session.remaining(), self.session.total());
        let exhausted = if self.session.is_exhausted() { "  (完了)" } else { "" };
        f.render_widget(
            Paragraph::new(format!("{remaining}{exhausted}  {}", self.status)).style(Style::default().fg(Color::Yellow)),
            chunks[0],
        );

        // 1. リール
        let now = Instant::now();
        let labels: [Vec<&str>; 3] = [
            TONES.iter().map(|t| t.arabic).collect(),
            CATEGORIES.iter().map(|c| c.arabic).collect(),
            FINAL_GROUPS.to_vec(),
        ];
        let reel_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(chunks[1]);
        let last = self.session.last_result().map(|r| r.combo);
        for (i, area) in reel_areas.iter().enumerate() {
            let (text, style) = match &self.reels {
                Some(reels) if now < reels.stops[i] => {
                    // 回転中は 80ms ごとに絵柄を送る
                    let step = (now - reels.started).as_millis() / 80;
                    let idx = (step as usize + i) % labels[i].len();
                    (labels[i][idx], Style::default().fg(Color::DarkGray))
                }
                Some(reels) => (labels[i][reels.targets[i]], Style::default().fg(Color::White).bold()),
                None => match last {
                    Some(c) => {
                        let idx = [c.tone, c.category, c.group][i] as usize;
                        (labels[i][idx], Style::default().fg(Color::Green).bold())
                    }
                    None => ("-", Style::default().fg(Color::Gray)),
                },
            };
            f.render_widget(
                Paragraph::new(text)
                    .style(style)
                    .centered()
                    .block(Block::default().borders(Borders::ALL)),
                *area,
            );
        }

        // 2-3. 結果
        if let Some(result) = self.session.last_result() {
            f.render_widget(
                Paragraph::new(vec![
                    Line::from(result.title()).style(Style::default().fg(Color::Magenta).bold()),
                    Line::from(result.description.clone()),
                ]),
                chunks[2],
            );
            let tables = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 2); 2])
                .split(chunks[3]);
            let slot = result.combo.slot_number();
            for (area, html, rtl, name) in [
                (tables[0], &result.left_html, false, format!("L{slot}")),
                (tables[1], &result.right_html, true, format!("R{slot}")),
            ] {
                let Some(html) = html else {
                    f.render_widget(Paragraph::new("表データがありません").block(Block::default().borders(Borders::ALL).title(name)), area);
                    continue;
                };
                let grid = parse_grid(html);
                let cols = self.columns.columns(grid.headers.len());
                f.render_widget(grid_table(&grid, cols, rtl, name), area);
            }
        }

        // 4. 設定
        let s = self.session.settings();
        f.render_widget(
            Paragraph::new(format!(
                "存在しない組み合わせ:{}  ボーナスのみ:{}  確率:{}%  速さ:{:.1}s",
                if s.allow_invalid_combos { "ON" } else { "OFF" },
                if s.jackpot_only { "ON" } else { "OFF" },
                s.jackpot_probability,
                s.spin_speed
            ))
            .style(Style::default().fg(Color::Cyan)),
            chunks[4],
        );
        f.render_widget(
            Paragraph::new("Space:回す c:列 a/j:モード +/-:確率 [/]:速さ ↑↓ x:履歴削除 r:リセット q:終了")
                .style(Style::default().fg(Color::DarkGray)),
            chunks[5],
        );

        // 履歴
        let items: Vec<ListItem> = self
            .session
            .sampler()
            .history()
            .iter()
            .enumerate()
            .map(|(i, combo)| ListItem::new(format!("{}. {combo}", i + 1)))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::LEFT).title("履歴"))
            .highlight_style(Style::default().bg(Color::DarkGray));
        f.render_stateful_widget(list, outer[1], &mut self.history);

        // 確認
        if let Some(pending) = &self.pending {
            let message = match pending {
                Pending::Remove(_) => "この結果を履歴から消しますか? また出るようになります (y/n)",
                Pending::Reset => "履歴をすべて消して最初からやり直しますか? (y/n)",
            };
            let area = centered(size, 60, 3);
            f.render_widget(Clear, area);
            f.render_widget(
                Paragraph::new(message).block(Block::default().borders(Borders::ALL)).wrap(ratatui::widgets::Wrap { trim: true }),
                area,
            );
        }

        // ボーナス演出
        if self.session.jackpot.is_open() {
            let area = centered(size, 40, 5);
            f.render_widget(Clear, area);
            f.render_widget(
                Paragraph::new(vec![
                    Line::from("★ استثناء ★").style(Style::default().fg(Color::Yellow).bold()),
                    Line::from("Space / Enter / Esc"),
                ])
                .centered()
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Yellow))),
                area,
            );
        }
    }
}
