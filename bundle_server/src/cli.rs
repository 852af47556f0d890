use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 21] = [
        "RUST_LOG",
        "BUNDLE_HOST",
        "BUNDLE_PORT",
        "BUNDLE_DATABASE_URL",
        "BUNDLE_PROVIDER_URL",
        "BUNDLE_PROVIDER_TIMEOUT",
        "BUNDLE_BACKEND_URL",
        "BUNDLE_FRONTEND_URL",
        "BUNDLE_CALLBACK_PATH",
        "BUNDLE_OFFER_CACHE_TTL",
        "BUNDLE_BASE_CURRENCY",
        "BUNDLE_FALLBACK_OFFER_MTN",
        "BUNDLE_FALLBACK_OFFER_TELECEL",
        "BUNDLE_FALLBACK_OFFER_AIRTELTIGO",
        "BUNDLE_QUEUE_INTERVAL",
        "BUNDLE_RECONCILE_INTERVAL",
        "BUNDLE_WORKER_START_DELAY",
        "BUNDLE_QUEUE_BATCH_SIZE",
        "BUNDLE_RECONCILE_BATCH_SIZE",
        "BUNDLE_MAX_RETRIES",
        "BUNDLE_SKIP_PREFLIGHT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let key_status = match env::var("BUNDLE_PROVIDER_API_KEY") {
        Ok(s) if !s.trim().is_empty() => "Set (hidden)",
        _ => "Not set",
    };
    println!("  {:<35} {key_status:<15}", "BUNDLE_PROVIDER_API_KEY");
}
