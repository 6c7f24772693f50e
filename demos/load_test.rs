//! Concurrent load generator for manually exercising a running gateway.
//!
//! Grounded on `original_source`'s `buy/main.go`, which spawns N goroutines
//! hammering the purchase endpoint and tallies outcomes; this is the same
//! shape translated to `tokio::spawn` tasks and `reqwest`. Purely a manual
//! exercising tool, not part of the crate's test suite, hence living under
//! `demos/` as an `[[example]]` target rather than `tests/`.

use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let base_url = env::var("TICKETGATE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
    let concurrency: usize = env::var("LOAD_TEST_USERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(200);

    println!("firing {concurrency} concurrent buy attempts at {base_url}/ticket");

    let client = reqwest::Client::new();
    let tallies: Arc<[AtomicU64; 4]> = Arc::new([
        AtomicU64::new(0), // success
        AtomicU64::new(0), // waiting
        AtomicU64::new(0), // sold out / already purchased / other
        AtomicU64::new(0), // request error
    ]);

    let mut tasks = Vec::with_capacity(concurrency);
    for i in 0..concurrency {
        let client = client.clone();
        let base_url = base_url.clone();
        let tallies = Arc::clone(&tallies);
        tasks.push(tokio::spawn(async move {
            let user_id = format!("load-test-user-{i}");
            let url = format!("{base_url}/ticket?user_id={user_id}");
            match client.get(&url).timeout(Duration::from_secs(5)).send().await {
                Ok(resp) => match resp.status().as_u16() {
                    200 => tallies[0].fetch_add(1, Ordering::Relaxed),
                    202 => tallies[1].fetch_add(1, Ordering::Relaxed),
                    400 | 410 | 500 => tallies[2].fetch_add(1, Ordering::Relaxed),
                    _ => tallies[2].fetch_add(1, Ordering::Relaxed),
                },
                Err(_) => tallies[3].fetch_add(1, Ordering::Relaxed),
            };
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    let mut summary = HashMap::new();
    summary.insert("success", tallies[0].load(Ordering::Relaxed));
    summary.insert("waiting", tallies[1].load(Ordering::Relaxed));
    summary.insert("rejected", tallies[2].load(Ordering::Relaxed));
    summary.insert("request_error", tallies[3].load(Ordering::Relaxed));

    println!("{summary:#?}");
}
