//! Property tests for the debounce contract.

use std::time::Duration;

use desk_common::DebouncedCell;
use proptest::prelude::*;

const DELAY_MS: u64 = 50;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn burst_within_window_commits_only_last(
        updates in prop::collection::vec((any::<i32>(), 0..DELAY_MS), 1..20)
    ) {
        let runtime = paused_runtime();
        let (committed, commits, busy) = runtime.block_on(async {
            let cell = DebouncedCell::new(i32::MIN, Duration::from_millis(DELAY_MS));
            for (value, gap) in &updates {
                cell.update(*value);
                // Nothing may be committed inside the window.
                assert_eq!(cell.committed(), i32::MIN);
                assert!(cell.is_busy());
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            tokio::time::sleep(Duration::from_millis(DELAY_MS + 1)).await;
            (cell.committed(), cell.commit_count(), cell.is_busy())
        });

        let last = updates.last().map(|(value, _)| *value).unwrap();
        prop_assert_eq!(committed, last);
        prop_assert_eq!(commits, 1);
        prop_assert!(!busy);
    }

    #[test]
    fn update_never_commits_synchronously(delay_ms in 0..200u64, value in any::<u16>()) {
        let runtime = paused_runtime();
        runtime.block_on(async {
            let cell = DebouncedCell::new(None, Duration::from_millis(delay_ms));
            cell.update(Some(value));
            assert_eq!(cell.committed(), None);
            assert_eq!(cell.commit_count(), 0);

            let mut rx = cell.subscribe();
            rx.changed().await.unwrap();
            assert_eq!(*rx.borrow(), Some(value));
        });
    }
}
