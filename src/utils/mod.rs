// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Utility modules
//!
//! Common utilities for the pipegraph CLI.

pub mod colors;

pub use colors::*;
