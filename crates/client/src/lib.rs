// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod callback;
pub mod command;
pub mod config;
pub mod connection;
pub mod credential;
pub mod error;
pub mod frame;
pub mod host;
pub mod listener;
pub mod port;
pub mod queue;
pub mod session;
pub mod test_support;
