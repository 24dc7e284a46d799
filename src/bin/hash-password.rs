//! Prints a bcrypt hash suitable for ADMIN_PASSWORD_HASH.
use bcrypt::{hash, DEFAULT_COST};
use std::env;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    let cost = match env::var("BCRYPT_COST") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("BCRYPT_COST must be a number, got {raw:?}");
            std::process::exit(1);
        }),
        Err(_) => DEFAULT_COST,
    };

    match hash(&password, cost) {
        Ok(hashed) => {
            println!("\nCost     : {}", cost);
            println!("Hash     : {}\n", hashed);
            println!("# Paste this into your .env; the admin account is created at startup:");
            println!("ADMIN_PASSWORD_HASH='{}'", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
