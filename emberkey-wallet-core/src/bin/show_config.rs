use emberkey_wallet_core::WalletConfig;
use std::process::ExitCode;

fn main() -> ExitCode {
    emberkey_wallet_core::init();

    let config = match std::env::args().nth(1) {
        Some(path) => WalletConfig::load_from(&path),
        None => WalletConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Emberkey Wallet Core Configuration:\n");
    println!("  Default Network: {}", config.default_network);
    for network in &config.networks {
        let marker = if network.id == config.default_network { "*" } else { " " };
        println!(
            "  {} {} (chain {}) {} {}",
            marker, network.id, network.chain_id, network.native_currency.symbol, network.rpc_url
        );
        if !network.explorer_api_url.is_empty() {
            let key = if network.explorer_api_key.is_some() { "(set)" } else { "(not set)" };
            println!("      Explorer: {}  API key: {}", network.explorer_api_url, key);
        }
    }
    println!(
        "  KDF: Argon2id, {} KiB, {} iterations, {} lanes",
        config.kdf.memory_kib, config.kdf.iterations, config.kdf.parallelism
    );
    println!(
        "  Session: timeout {} ms, heartbeat every {} ms",
        config.session.timeout_ms, config.session.heartbeat_interval_ms
    );
    println!(
        "  Confirmations: {} (poll {} ms, timeout {} ms), chain id check {}",
        config.transactions.confirmations,
        config.transactions.confirmation_poll_ms,
        config.transactions.confirmation_timeout_ms,
        if config.transactions.verify_chain_id { "on" } else { "off" }
    );
    println!("  RPC timeout: {} ms", config.rpc_timeout_ms);
    match &config.storage_dir {
        Some(dir) => println!("  Storage: {}", dir.display()),
        None => println!("  Storage: (platform data directory)"),
    }
    ExitCode::SUCCESS
}
