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
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "DH_HOST",
        "DH_PORT",
        "DH_DATABASE_URL",
        "DH_ENVIRONMENT",
        "DH_USE_X_FORWARDED_FOR",
        "DH_USE_FORWARDED",
        "DH_MAX_JSON_DEPTH",
        "DH_PIPELINE_WORKERS",
        "DH_JOB_MAX_ATTEMPTS",
        "DH_JOB_RETRY_BASE_SECS",
        "DH_RAPPI_BASE_URL",
        "DH_PEDIDOSYA_BASE_URL",
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
