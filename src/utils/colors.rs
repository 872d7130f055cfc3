// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Terminal output helpers
//!
//! Provides consistent markers for CLI messages.

use colored::Colorize;

/// Disable colors when NO_COLOR is set or TERM is unset
pub fn configure_colors() {
    if std::env::var_os("NO_COLOR").is_some() || std::env::var_os("TERM").is_none() {
        colored::control::set_override(false);
    }
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title);
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print an info item
pub fn print_info(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}
