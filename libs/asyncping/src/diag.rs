// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Diagnostic sink for debug mode

/// Receives free-form debug lines. Implementations must not fail or block
/// the caller.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, message: &str);
}

/// Forwards diagnostics to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, message: &str) {
        log::debug!(target: "asyncping", "{}", message);
    }
}
