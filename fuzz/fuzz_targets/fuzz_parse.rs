// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;

use docmorph_core::detect;
use docmorph_core::formats::{linescan, HtmlHandler, MarkdownHandler};
use docmorph_core::Parser;

// Detection and the text parsers must never panic, whatever the bytes.
fuzz_target!(|data: &[u8]| {
    let _ = detect::detect_bytes(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = detect::detect_text(text);
        let _ = linescan::scan(text);
        let _ = MarkdownHandler::new().parse(text);
        let _ = HtmlHandler::new().parse(text);
    }
});
