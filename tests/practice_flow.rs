// スロットゲーム: 抽選・履歴の保存・表データの参照

use std::collections::HashSet;
use std::time::{Duration, Instant};

use pinyinwiz::config::DataPaths;
use pinyinwiz::practice::{CloseReason, PracticeSession, SpinOutcome};
use pinyinwiz::sampler::{Mode, Sampler};
use pinyinwiz::save_data::PracticeData;
use pinyinwiz::store::Store;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// 回して止まるまで進め、ボーナス演出が出たら閉じる
fn spin_once(session: &mut PracticeSession, store: &Store, rng: &mut StdRng, now: &mut Instant) -> bool {
    match session.spin(*now, rng) {
        SpinOutcome::Started { stops_at, .. } => {
            *now = stops_at;
            let jackpot = session.poll(*now, store).map(|r| r.jackpot).unwrap_or(false);
            if jackpot {
                session.jackpot.close(CloseReason::Key);
            }
            true
        }
        SpinOutcome::Exhausted => false,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn strict_game_runs_to_completion_without_repeats() {
    let mut store = Store::new();
    store.normalize();
    let mut session = PracticeSession::new(PracticeData::default());
    let mut rng = StdRng::seed_from_u64(2024);
    let mut now = Instant::now();

    let mut seen = HashSet::new();
    while spin_once(&mut session, &store, &mut rng, &mut now) {
        let result = session.last_result().unwrap();
        assert!(seen.insert(result.combo.key()));
        assert!(result.left_html.is_some());
        now += Duration::from_millis(10);
    }
    assert_eq!(seen.len(), Sampler::effective_total(Mode::Strict));
    assert!(session.is_exhausted());
}

#[test]
fn history_and_settings_survive_restart_and_mode_switches() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = DataPaths::at(tmp.path()).unwrap();
    let store = Store::new();
    let mut rng = StdRng::seed_from_u64(8);
    let mut now = Instant::now();

    let mut session = PracticeSession::load(&paths);
    for _ in 0..6 {
        assert!(spin_once(&mut session, &store, &mut rng, &mut now));
    }
    session.set_allow_invalid(true);
    for _ in 0..6 {
        assert!(spin_once(&mut session, &store, &mut rng, &mut now));
    }
    session.save(&paths).unwrap();

    let mut restored = PracticeSession::load(&paths);
    assert_eq!(restored.sampler().history().len(), 12);
    assert!(restored.settings().allow_invalid_combos);

    restored.set_allow_invalid(false);
    let strict_used = restored.sampler().used_count(Mode::Strict);
    assert!(strict_used >= 6);
    assert_eq!(restored.remaining(), 100 - strict_used);
}
