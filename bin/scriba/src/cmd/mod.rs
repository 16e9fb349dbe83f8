//! CLI subcommands.

pub mod build;
pub mod check;
pub mod new;
pub mod watch;

use scriba_core::Config;

/// Print configuration warnings, such as providers missing their settings.
pub(crate) fn print_config_warnings(config: &Config) {
    let warnings = config.warnings();
    if warnings.is_empty() {
        return;
    }

    println!();
    println!("  Warnings:");
    for warn in &warnings {
        println!("  ⚠ {warn}");
    }
    println!();
}
