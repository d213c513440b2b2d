// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Terminal status lines
//!
//! Consistent check/cross/warning marks across commands. Lines meant for
//! humans go to stderr when stdout carries a document.

use colored::Colorize;

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

/// Print an error cross to stderr
pub fn eprint_error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a warning to stderr
pub fn eprint_warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg);
}
