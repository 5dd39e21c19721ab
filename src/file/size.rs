//! SI (base-1000) byte count formatting.

const UNITS: [char; 6] = ['k', 'M', 'G', 'T', 'P', 'E'];

/// Format a byte count as a human-readable SI string, e.g. `"1.0 MB"`.
pub fn human_readable_byte_count_si(bytes: i64) -> String {
    if -1000 < bytes && bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut value = bytes;
    let mut unit = 0;
    while value <= -999_950 || value >= 999_950 {
        value /= 1000;
        unit += 1;
    }

    // One decimal, ties rounded away from zero.
    let sign = if value < 0 { "-" } else { "" };
    let tenths = (value.unsigned_abs() + 50) / 100;
    format!("{sign}{}.{} {}B", tenths / 10, tenths % 10, UNITS[unit])
}
