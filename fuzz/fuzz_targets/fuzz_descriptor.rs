// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for listing descriptor decoding and remote path handling

#![no_main]

use libfuzzer_sys::fuzz_target;
use nsg_core::entry::{decode, encode};
use nsg_core::path::join_child;
use nsg_core::RemotePath;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    let entry = decode(&input);
    assert!(entry.full_path().ends_with(entry.name()));

    // Re-encoding a decoded entry must decode to the same entry
    let again = decode(&encode(entry.kind(), entry.full_path()));
    assert_eq!(again.kind(), entry.kind());
    assert_eq!(again.full_path(), entry.full_path());

    let path = RemotePath::new(entry.full_path());
    let _ = path.parent();
    let _ = path.name();
    let _ = join_child(&path.to_path_string(), entry.name());
});
