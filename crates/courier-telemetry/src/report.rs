// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning Rust errors into error-event fields.

use std::error::Error;

/// Short type name of `E`: the last path segment, without generics.
///
/// `std::io::Error` becomes `Error`, `my_app::BadTable<u8>` becomes `BadTable`.
pub fn error_type_name<E: Error + ?Sized>() -> String {
    let full = std::any::type_name::<E>().trim_start_matches("dyn ");
    let path = full
        .split(" + ")
        .next()
        .and_then(|head| head.split('<').next())
        .unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path).to_string()
}

/// The `source()` chain below `err`, one cause per line. `None` without causes.
pub fn source_chain<E: Error + ?Sized>(err: &E) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
