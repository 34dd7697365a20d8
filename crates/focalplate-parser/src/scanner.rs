// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast line scanner using SIMD-accelerated byte searching
//!
//! Splits survey text into candidate record lines without parsing them,
//! skipping blank lines and `#` comments.

use memchr::memchr;

/// Line scanner for survey files
pub struct LineScanner<'a> {
    content: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> LineScanner<'a> {
    /// Create a new scanner for the given content
    pub fn new(content: &'a str) -> Self {
        // Tolerate a UTF-8 byte order mark
        let pos = if content.starts_with('\u{feff}') {
            '\u{feff}'.len_utf8()
        } else {
            0
        };
        Self {
            content,
            pos,
            line: 0,
        }
    }

    /// Scan to the next non-blank, non-comment line
    ///
    /// Returns (1-based line number, line text without terminator)
    pub fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            let start = self.pos;
            let end = match memchr(b'\n', &bytes[start..]) {
                Some(offset) => start + offset,
                None => bytes.len(),
            };
            self.pos = end + 1;
            self.line += 1;

            let text = self.content[start..end].trim_end_matches('\r');
            let body = text.trim_start();
            if body.is_empty() || body.starts_with('#') {
                continue;
            }
            return Some((self.line, text));
        }

        None
    }

    /// Byte offset reached so far
    pub fn position(&self) -> usize {
        self.pos.min(self.content.len())
    }

    /// Count candidate record lines
    pub fn record_count(content: &'a str) -> usize {
        let mut scanner = Self::new(content);
        let mut count = 0;
        while scanner.next_line().is_some() {
            count += 1;
        }
        count
    }
}

impl<'a> Iterator for LineScanner<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}
