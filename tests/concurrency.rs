use std::{collections::BTreeSet, sync::Arc, thread};

use tempfile::TempDir;
use todo_store::{Draft, FileStore, Priority, Store, TodoService};

fn draft(n: usize) -> Draft {
    Draft::builder()
        .title(format!("task {n}"))
        .description("from a worker thread")
        .priority(Priority::Low)
        .build()
}

#[test]
fn concurrent_creates_get_distinct_sequential_ids() {
    const WORKERS: usize = 24;

    let dir = TempDir::new().unwrap();
    let svc = Arc::new(TodoService::new(FileStore::new(dir.path().join("todo.json"))));

    let handles: Vec<_> = (0..WORKERS)
        .map(|n| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || svc.create(draft(n)).unwrap().id)
        })
        .collect();
    let returned: BTreeSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let expected: BTreeSet<u64> = (1..=WORKERS as u64).collect();
    assert_eq!(returned, expected);

    let stored: BTreeSet<u64> = svc.store().load().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(stored, expected);
}

#[test]
fn two_services_on_one_file_do_not_lose_writes() {
    // Separate service instances stand in for separate processes: only the
    // file lock keeps them apart.
    const PER_SIDE: usize = 10;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("todo.json");
    let left = Arc::new(TodoService::new(FileStore::new(&path)));
    let right = Arc::new(TodoService::new(FileStore::new(&path)));

    let handles: Vec<_> = [left, right]
        .into_iter()
        .flat_map(|svc| {
            (0..PER_SIDE).map(move |n| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || svc.create(draft(n)).unwrap())
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let items = FileStore::new(&path).load().unwrap();
    let ids: BTreeSet<u64> = items.iter().map(|t| t.id).collect();
    assert_eq!(items.len(), 2 * PER_SIDE);
    assert_eq!(ids, (1..=(2 * PER_SIDE) as u64).collect::<BTreeSet<_>>());
}

#[test]
fn readers_never_see_a_torn_file() {
    let dir = TempDir::new().unwrap();
    let svc = Arc::new(TodoService::new(FileStore::new(dir.path().join("todo.json"))));

    let writer = {
        let svc = Arc::clone(&svc);
        thread::spawn(move || {
            for n in 0..40 {
                svc.create(draft(n)).unwrap();
            }
        })
    };

    let mut last_seen = 0;
    while !writer.is_finished() {
        // Any corrupt read would surface as an Err here.
        let seen = svc.list(None).unwrap().len();
        assert!(seen >= last_seen);
        last_seen = seen;
    }
    writer.join().unwrap();
    assert_eq!(svc.list(None).unwrap().len(), 40);
}
