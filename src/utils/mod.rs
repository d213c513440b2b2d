// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Utility modules
//!
//! Common utilities for the pipesmith CLI.

pub mod colors;

pub use colors::*;
