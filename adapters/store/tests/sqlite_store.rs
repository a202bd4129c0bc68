use sortwater_core::{DifficultyBucket, LevelId, NewLevel, PuzzleState};
use sortwater_store::SqliteLevelStore;
use sortwater_system_fingerprint::fingerprint;
use sortwater_system_ingestion::LevelStore;
use tempfile::tempdir;

fn level(variant: usize) -> NewLevel {
    let mut rows = vec![vec![0, 1, 1], vec![1, 0, 0]];
    rows.extend((0..=variant).map(|_| vec![-1, -1, -1]));
    NewLevel {
        state: PuzzleState::from_matrix(&rows).expect("board"),
        difficulty: DifficultyBucket::new("medium"),
        steps_to_solve: 14,
        solution: None,
        source: "candidates.json".to_owned(),
    }
}

#[test]
fn levels_survive_reopening() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("levels.db");

    let first = level(0);
    let second = level(1);
    let expected = vec![fingerprint(&first.state), fingerprint(&second.state)];

    {
        let mut store = SqliteLevelStore::open(&path).expect("open");
        let _ = store.insert_level(first).expect("insert first");
        let _ = store.insert_level(second).expect("insert second");
    }

    let store = SqliteLevelStore::open(&path).expect("reopen");
    assert_eq!(store.total_count().expect("count"), 2);
    assert_eq!(store.all_fingerprints().expect("fingerprints"), expected);

    let levels = store.levels().expect("levels");
    let ids: Vec<LevelId> = levels.iter().map(|level| level.id).collect();
    assert_eq!(ids, vec![LevelId::new(1), LevelId::new(2)]);
    assert!(levels.iter().all(|level| level.created_at == level.updated_at));
    assert!(levels.iter().all(|level| level.steps_to_solve == 14));
}

#[test]
fn empty_database_reports_no_levels() {
    let dir = tempdir().expect("temp dir");
    let store = SqliteLevelStore::open(dir.path().join("empty.db")).expect("open");
    assert_eq!(store.total_count().expect("count"), 0);
    assert_eq!(store.window_stats(10).expect("stats").total(), 0);
    assert!(store.all_fingerprints().expect("fingerprints").is_empty());
    assert!(store.levels().expect("levels").is_empty());
}
