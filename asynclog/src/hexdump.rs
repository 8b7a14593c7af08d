//! Hexadecimal rendering of binary payloads.
//!
//! ```text
//! address[140721591726995] size[40]
//! 000000 000102030405060708090a0b0c0d0e0f 101112131415161718191a1b1c1d1e1f
//! 000001 2021222324252627
//! ```

/// Bytes rendered per output row.
pub const ROW_BYTES: usize = 32;
/// Bytes between the grouping spaces inside a row.
pub const GROUP_BYTES: usize = 16;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Renders `bytes` as a header line followed by index-prefixed rows of
/// lowercase hex, ending with a newline.
pub fn render_hex_dump(bytes: &[u8]) -> String {
    let rows = bytes.len().div_ceil(ROW_BYTES);
    let mut output = String::with_capacity(48 + rows * (8 + ROW_BYTES * 2 + 1));

    let mut numbers = itoa::Buffer::new();
    output.push_str("address[");
    output.push_str(numbers.format(bytes.as_ptr() as usize));
    output.push_str("] size[");
    output.push_str(numbers.format(bytes.len()));
    output.push_str("]\n");

    for (index, row) in bytes.chunks(ROW_BYTES).enumerate() {
        if index != 0 {
            output.push('\n');
        }
        write_row_index(&mut output, index);
        output.push(' ');
        for (offset, byte) in row.iter().enumerate() {
            if offset != 0 && offset % GROUP_BYTES == 0 {
                output.push(' ');
            }
            output.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            output.push(HEX_DIGITS[(byte & 0xf) as usize] as char);
        }
    }
    if !bytes.is_empty() {
        output.push('\n');
    }
    output
}

// Zero padded to six digits, wider indices are written in full.
fn write_row_index(output: &mut String, index: usize) {
    let mut numbers = itoa::Buffer::new();
    let digits = numbers.format(index);
    for _ in digits.len()..6 {
        output.push('0');
    }
    output.push_str(digits);
}
