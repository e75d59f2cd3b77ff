//! Kubernetes resource quantities, e.g. `3500m` CPU or `16Gi` memory.

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

/// Decimal suffixes as powers of ten.
const DECIMAL_SUFFIXES: [(&str, i32); 7] = [
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parses a quantity into its base unit value.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }

    // Exponent notation such as 1e3 must be tried before the decimal
    // suffixes, since `E` is both an exponent marker and the exa suffix.
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }

    for (suffix, exponent) in DECIMAL_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| {
                if exponent < 0 {
                    n / 10f64.powi(-exponent)
                } else {
                    n * 10f64.powi(exponent)
                }
            });
        }
    }

    None
}

pub fn parse_cpu_cores(raw: &str) -> Option<f64> {
    parse_quantity(raw)
}

pub fn parse_memory_gb(raw: &str) -> Option<f64> {
    parse_quantity(raw).map(|bytes| bytes / BYTES_PER_GIB)
}
