//! `wahook doctor` - configuration and backend diagnostics

use crate::server::config::{AppConfig, StoreBackend};
use crate::server::{init_stores, load_config};

pub async fn run() -> anyhow::Result<()> {
    println!("wahook doctor\n");

    let config = match check_config() {
        Some(config) => config,
        None => {
            println!("\nSome checks failed. Please fix the issues above.");
            std::process::exit(1);
        }
    };

    let all_ok = check_backends(&config).await;

    println!();
    if all_ok {
        println!("All checks passed! Ready to run wahook.");
    } else {
        println!("Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn check_config() -> Option<AppConfig> {
    print!("Loading configuration... ");

    match load_config() {
        Ok(config) => {
            println!("ok");
            println!(
                "  tracker: threshold={} ttl={}s prefix={}",
                config.tracker.threshold, config.tracker.ttl_secs, config.tracker.key_prefix
            );
            Some(config)
        }
        Err(e) => {
            println!("failed: {:#}", e);
            None
        }
    }
}

async fn check_backends(config: &AppConfig) -> bool {
    print!("Checking counter store ({:?})... ", config.store.backend);

    let stores = match init_stores(config) {
        Ok(stores) => stores,
        Err(e) => {
            println!("failed: {:#}", e);
            return false;
        }
    };

    let mut ok = match stores.store.ping().await {
        Ok(()) => {
            println!("ok");
            true
        }
        Err(e) => {
            println!("unreachable: {}", e);
            if config.store.backend == StoreBackend::Redis {
                println!("  Is Redis running at {}?", config.redis.url);
            }
            false
        }
    };

    print!("Checking deletion queue ({})... ", config.queue.name);
    match stores.queue.pending().await {
        Ok(pending) => println!("ok, {} pending job(s)", pending),
        Err(e) => {
            println!("unreachable: {}", e);
            ok = false;
        }
    }

    ok
}
