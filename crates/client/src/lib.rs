// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod auth;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod test_support;
pub mod tickets;
pub mod transport;
