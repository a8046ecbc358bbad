// EsoxSolutions.ResourcePool
// Registry of named, typed resource pools with capacity and expiry trimming

// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use esox_resourcepool::{PoolConfiguration, PoolRegistry, Poolable, TeardownError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Particle {
    id: u32,
}

impl Poolable for Particle {
    fn name(&self) -> &str {
        "spark"
    }

    fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError> {
        println!("  Particle {} released (shutdown: {})", self.id, shutdown);
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== EsoxSolutions.ResourcePool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let registry = PoolRegistry::new();
    let config = PoolConfiguration::new()
        .with_capacity(2)
        .with_auto_release_interval(Duration::from_millis(100));

    let pool = match registry.create_pool::<Particle>("fx", config) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Could not create pool: {e}");
            return;
        }
    };

    {
        let mut pool = pool.lock();
        for id in 0..3 {
            pool.register(Particle { id }, false);
        }
        println!("  Entries after registering 3 into capacity 2: {}", pool.len());

        if let Some(key) = pool.borrow("spark") {
            println!("  Borrowed {}", key);
            if let Err(e) = pool.return_entry(key) {
                eprintln!("Could not return {key}: {e}");
            }
        }
    }

    registry.tick(Duration::from_millis(100));
    registry.shutdown();
}
