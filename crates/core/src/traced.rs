// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging metadata for effects.

/// Gives the executor a stable name and key/value fields to log for an effect.
pub trait TracedEffect {
    fn name(&self) -> &'static str;
    fn fields(&self) -> Vec<(&'static str, String)>;
}
