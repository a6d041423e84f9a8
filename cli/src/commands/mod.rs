// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Alpheric content CLI

pub mod config;
pub mod content;
pub mod form;
pub mod slug;

pub use self::config::ConfigCommand;
pub use self::form::FormCommand;
