// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Utility modules
//!
//! Common utilities for the stepgraph CLI.

pub mod colors;

pub use colors::*;
