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
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "BOS_HOST",
        "BOS_PORT",
        "BOS_DATABASE_URL",
        "BOS_PUBLIC_URL",
        "BOS_ADMIN_EMAILS",
        "BOS_JWT_EXPIRY_HOURS",
        "BOS_PLATFORM_FEE_BPS",
        "BOS_DEFAULT_ORDER_EXPIRY_DAYS",
        "BOS_MAX_ORDER_EXPIRY_DAYS",
        "BOS_EXPIRY_CHECK_INTERVAL_SECS",
        "BOS_RECONCILE_INTERVAL_SECS",
        "BOS_RECONCILE_AFTER_SECS",
        "BOS_STRIPE_API_BASE",
        "BOS_SHOPIFY_API_VERSION",
        "BOS_SHOPIFY_HMAC_CHECKS",
        "BOS_EMAIL_ENABLED",
        "BOS_EMAIL_FROM",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
