// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Internet checksum (RFC 1071)

/// One's-complement sum of all big-endian 16-bit words in `bytes`,
/// complemented. An odd trailing byte is summed as if padded with a zero.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = bytes.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }

    // Handle odd byte
    if let [last] = words.remainder() {
        sum += (*last as u32) << 8;
    }

    // Fold 32-bit sum to 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}

/// True when `bytes` already carries a correct checksum field.
pub fn verify(bytes: &[u8]) -> bool {
    checksum(bytes) == 0
}
