//! Registry and tick driver examples

use esox_resourcepool::{PoolConfiguration, PoolRegistry, Poolable, TeardownError, TickDriver};
use std::sync::Arc;
use std::time::Duration;

struct Texture {
    path: String,
}

impl Poolable for Texture {
    fn name(&self) -> &str {
        &self.path
    }

    fn on_evicted(self, shutdown: bool) -> Result<(), TeardownError> {
        if !shutdown {
            println!("   unloading {}", self.path);
        }
        Ok(())
    }
}

struct Sound {
    clip: &'static str,
}

impl Poolable for Sound {
    fn name(&self) -> &str {
        self.clip
    }
}

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ResourcePool - Registry Examples ===\n");

    let registry = Arc::new(PoolRegistry::new());

    let textures = registry
        .create_pool::<Texture>(
            "ui",
            PoolConfiguration::new()
                .with_capacity(2)
                .with_expire_after(Duration::from_millis(300))
                .with_auto_release_interval(Duration::from_millis(100)),
        )
        .unwrap();
    let sounds = registry
        .create_pool::<Sound>("", PoolConfiguration::new().with_multi_borrow(true).with_priority(5))
        .unwrap();

    {
        let mut textures = textures.lock();
        for path in ["button.png", "panel.png"] {
            textures.register(Texture { path: path.to_string() }, false);
        }
    }

    {
        let mut sounds = sounds.lock();
        sounds.register(Sound { clip: "click" }, false);
        let a = sounds.borrow("click").unwrap();
        let b = sounds.borrow("click").unwrap();
        println!("1. Shared borrow: same entry twice = {}", a == b);
        sounds.return_entry(a).unwrap();
        sounds.return_entry(b).unwrap();
    }

    println!("\n2. Tick driver sweeping idle textures:");
    let driver = TickDriver::spawn(Arc::clone(&registry), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(500)).await;
    driver.stop().await;
    println!("   Textures left: {}", textures.lock().len());

    println!("\n3. Pools:");
    for snapshot in registry.pool_snapshots() {
        println!(
            "   {}[{}] entries={} priority={}",
            snapshot.kind, snapshot.name, snapshot.entries, snapshot.priority
        );
    }

    println!("\n4. Prometheus:");
    print!("{}", registry.export_metrics_prometheus(None));

    registry.shutdown();
}
