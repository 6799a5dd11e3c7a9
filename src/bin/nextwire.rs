//! Nextwire operator tool
//!
//! Generates key material, validates configuration and inspects cost
//! matrix files.

use clap::{Parser, Subcommand};
use nextwire::{Config, CostMatrix, CryptoProvider, Keys, Secp256k1Crypto};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Nextwire wire-format tool
#[derive(Parser, Debug)]
#[command(name = "nextwire", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh keypair as hex
    Keygen {
        /// Also print a random packet hash key
        #[arg(long)]
        hash_key: bool,

        /// Print a complete `keys:` config section instead
        #[arg(long, conflicts_with = "hash_key")]
        yaml: bool,
    },

    /// Load configuration, decode keys and print the derived public keys
    CheckConfig {
        /// Path to configuration file (overrides default search paths)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Decode a cost matrix file and summarize it
    Matrix {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

fn main() {
    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    let crypto = Secp256k1Crypto::new();

    match args.command {
        Command::Keygen { hash_key, yaml } => keygen(&crypto, hash_key, yaml),
        Command::CheckConfig { config } => check_config(&crypto, config),
        Command::Matrix { path } => matrix(&path),
    }
}

fn keygen(crypto: &Secp256k1Crypto, hash_key: bool, yaml: bool) {
    if yaml {
        let config = Config {
            keys: Keys::generate(crypto).to_config(),
        };
        match config.to_yaml() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                error!("Failed to serialize keys: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let (public_key, private_key) = crypto.generate_keypair();
    println!("public_key:  {}", hex::encode(public_key));
    println!("private_key: {}", hex::encode(private_key));
    if hash_key {
        let mut key = [0u8; 32];
        crypto.random_bytes(&mut key);
        println!("hash_key:    {}", hex::encode(key));
    }
}

fn check_config(crypto: &Secp256k1Crypto, path: Option<PathBuf>) {
    let (config, loaded_paths) = if let Some(config_path) = &path {
        // Explicit config file specified - load only that file
        match Config::load_file(config_path) {
            Ok(config) => (config, vec![config_path.clone()]),
            Err(e) => {
                error!("Failed to load configuration from {}: {}", config_path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        match Config::load() {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        }
    };

    if loaded_paths.is_empty() {
        error!("No config files found");
        std::process::exit(1);
    }
    for path in &loaded_paths {
        info!(path = %path.display(), "Loaded config file");
    }

    let keys = match config.create_keys() {
        Ok(keys) => keys,
        Err(e) => {
            error!("Invalid key configuration: {}", e);
            std::process::exit(1);
        }
    };

    let router_public = keys.router_public_key(crypto);
    let backend_public = keys.backend_public_key(crypto);
    match (router_public, backend_public) {
        (Ok(router), Ok(backend)) => {
            info!("Keys OK");
            info!("  router_public_key:  {}", hex::encode(router));
            info!("  backend_public_key: {}", hex::encode(backend));
            info!("  relay_public_key:   {}", hex::encode(keys.relay_public_key()));
        }
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid private key: {}", e);
            std::process::exit(1);
        }
    }
}

fn matrix(path: &Path) {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let matrix = match CostMatrix::read(&data) {
        Ok(matrix) => matrix,
        Err(e) => {
            error!("Failed to decode cost matrix {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    info!(
        version = matrix.version,
        bytes = data.len(),
        relays = matrix.num_relays(),
        datacenters = matrix.datacenter_ids.len(),
        memberships = matrix.datacenter_relays.len(),
        rtt_entries = matrix.rtt.len(),
        "Cost matrix"
    );
    for (i, id) in matrix.relay_ids.iter().enumerate() {
        let name = matrix.relay_names.get(i).map(String::as_str).unwrap_or("");
        let address = matrix
            .relay_addresses
            .get(i)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        info!("  {:016x} {} {}", id, name, address);
    }
}
