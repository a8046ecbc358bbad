//! Basic usage examples for Pool

use esox_resourcepool::{Pool, PoolConfiguration, Poolable, TeardownError};
use std::time::Duration;

struct Bullet {
    id: u32,
    kind: &'static str,
}

impl Poolable for Bullet {
    fn name(&self) -> &str {
        self.kind
    }

    fn on_borrowed(&mut self) {
        println!("     bullet {} fired", self.id);
    }

    fn on_returned(&mut self) {
        println!("     bullet {} back in the clip", self.id);
    }

    fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError> {
        println!("     bullet {} destroyed (shutdown: {})", self.id, shutdown);
        Ok(())
    }
}

fn main() {
    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Borrow and return
    borrow_and_return();

    // Example 2: Capacity trimming
    capacity_trimming();

    // Example 3: Lock and priority
    lock_and_priority();

    // Example 4: Metrics and snapshots
    metrics_and_snapshots();
}

fn borrow_and_return() {
    println!("1. Borrow and Return:");
    let mut pool = Pool::new("", PoolConfiguration::default()).unwrap();
    pool.register(Bullet { id: 1, kind: "bullet" }, false);

    let key = pool.borrow("bullet").unwrap();
    println!("   Second borrow while out: {:?}", pool.borrow("bullet"));
    pool.return_entry(key).unwrap();
    println!("   Borrow after return: {:?}", pool.borrow("bullet"));
    println!();
}

fn capacity_trimming() {
    println!("2. Capacity Trimming:");
    let mut pool = Pool::new("", PoolConfiguration::new().with_capacity(2)).unwrap();

    for id in 0..4 {
        pool.register(Bullet { id, kind: "bullet" }, false);
    }
    println!("   Entries: {} (capacity 2)\n", pool.len());
}

fn lock_and_priority() {
    println!("3. Lock and Priority:");
    let config = PoolConfiguration::new().with_expire_after(Duration::from_secs(60));
    let mut pool = Pool::new("", config).unwrap();

    let keep = pool.register(Bullet { id: 1, kind: "tracer" }, false);
    let cheap = pool.register(Bullet { id: 2, kind: "tracer" }, false);
    let valued = pool.register(Bullet { id: 3, kind: "tracer" }, false);

    pool.lock(keep, true).unwrap();
    pool.set_entry_priority(valued, 10).unwrap();

    println!("   Trim one:");
    pool.trim(1);
    println!("   cheap still pooled: {}", pool.contains(cheap));
    println!("   Release all unused:");
    pool.release_all_unused();
    println!("   Remaining: {}\n", pool.len());
}

fn metrics_and_snapshots() {
    println!("4. Metrics and Snapshots:");
    let mut pool = Pool::new("", PoolConfiguration::new().with_capacity(8)).unwrap();
    for id in 0..3 {
        pool.register(Bullet { id, kind: "bullet" }, id == 0);
    }

    for snapshot in pool.entry_snapshots() {
        println!(
            "   {} name={} borrowed={} evictable={}",
            snapshot.key,
            snapshot.name,
            snapshot.borrow_count,
            snapshot.is_evictable()
        );
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
