// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pinyinwiz::builder::BuilderSession;
use pinyinwiz::config::DataPaths;
use pinyinwiz::practice::PracticeSession;
use pinyinwiz::store::Store;
use pinyinwiz::tone_pairs::{ToneGame, load_deck};
use pinyinwiz::viewer::Viewer;

// 端末画面 (ratatui)
mod ui;

#[derive(Parser)]
#[command(name = "pinyinwiz", version, about = "PINYIN WiZ. ピンイン表ビルダーと練習ゲーム")]
struct Cli {
    /// データの保存先 (省略時は OS のデータディレクトリ)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 表ビルダー
    Builder {
        /// 保存時にこのファイルにも書き出す
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// 保存済みの表を見る
    View,
    /// スロットゲーム
    Spin,
    /// 声調ペア当てゲーム
    Tones {
        /// カード一覧 (JSON)
        deck: PathBuf,
    },
    /// 表データを書き出す
    Export { out: PathBuf },
    /// 表データを読み込んで置き換える
    Import { input: PathBuf },
    /// 全スロットを作り直す
    Normalize,
    /// スロットゲームの履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// 履歴を表示する
    List,
    /// 履歴をすべて消す
    Reset {
        /// 確認しない
        #[arg(long, short)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let paths = match DataPaths::resolve(cli.data_dir.clone()) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{} {err}", style("error:").red().bold());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&paths);

    match run(cli.command, paths) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

/// 画面が標準出力を使うので、ログはデータディレクトリのファイルへ
fn init_tracing(paths: &DataPaths) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let Ok(file) = OpenOptions::new().create(true).append(true).open(paths.log_file()) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn run(command: Command, paths: DataPaths) -> anyhow::Result<()> {
    info!(dir = %paths.dir().display(), "starting");
    match command {
        Command::Builder { export } => {
            let session = BuilderSession::open(paths);
            ui::run(&mut ui::builder::BuilderScreen::new(session, export))
        }
        Command::View => {
            let mut viewer = Viewer::new();
            viewer.load_store(&paths.store());
            ui::run(&mut ui::viewer::ViewerScreen::new(viewer))
        }
        Command::Spin => {
            let session = PracticeSession::load(&paths);
            let store = Store::load_or_default(&paths.store());
            ui::run(&mut ui::spin::SpinScreen::new(session, store, paths))
        }
        Command::Tones { deck } => {
            let cards = load_deck(&deck).with_context(|| format!("cannot use deck {}", deck.display()))?;
            ui::run(&mut ui::tones::TonesScreen::new(ToneGame::new(cards)?))
        }
        Command::Export { out } => {
            let mut store = Store::load_or_default(&paths.store());
            store.normalize();
            store.write(&out)?;
            println!("{} {}", style("exported").green(), out.display());
            Ok(())
        }
        Command::Import { input } => {
            // 読めなければ今の表データはそのまま
            let mut store = Store::load_or_default(&paths.store());
            store
                .import_file(&input)
                .with_context(|| format!("import failed, keeping current table ({})", input.display()))?;
            store.write(&paths.store())?;
            println!("{} {}", style("imported").green(), input.display());
            Ok(())
        }
        Command::Normalize => {
            let mut store = Store::load_or_default(&paths.store());
            store.normalize();
            store.write(&paths.store())?;
            println!("{} {}", style("normalized").green(), paths.store().display());
            Ok(())
        }
        Command::History { action } => history(action, &paths),
    }
}

fn history(action: HistoryAction, paths: &DataPaths) -> anyhow::Result<()> {
    let mut session = PracticeSession::load(paths);
    match action {
        HistoryAction::List => {
            for (i, combo) in session.sampler().history().iter().enumerate() {
                println!("{:>3}. {combo}", i + 1);
            }
            let remaining = format!("{} / {}", session.remaining(), session.total());
            println!("{} {}", style("remaining").cyan(), style(remaining).bold());
        }
        HistoryAction::Reset { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("履歴をすべて消して最初からやり直しますか?")
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("{}", style("cancelled").yellow());
                return Ok(());
            }
            session.reset();
            session.save(paths)?;
            println!("{}", style("history cleared").green());
        }
    }
    Ok(())
}
