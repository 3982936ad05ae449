//! Hashing helpers shared by the editor model, the compiler and the runtime.

/// CRC-32 (IEEE 802.3, reflected) lookup table, built at compile time.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Hashes a user function name into the 32-bit key used by the function registry.
pub fn crc32(data: &str) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for byte in data.bytes() {
        crc = CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

/// A fresh 64-bit UUID for a node or asset. Zero is never returned.
pub fn random_u64() -> u64 {
    loop {
        let v = rand::random::<u64>();
        if v != 0 {
            return v;
        }
    }
}

/// Upper-case, zero-padded hex of a 64-bit UUID, used in derived identifiers.
pub fn to_hex64(v: u64) -> String {
    format!("{:016X}", v)
}

pub fn to_hex32(v: u32) -> String {
    format!("{:08X}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_reference_vectors() {
        assert_eq!(crc32(""), 0);
        assert_eq!(crc32("123456789"), 0xCBF4_3926);
        assert_eq!(crc32("The quick brown fox jumps over the lazy dog"), 0x414F_A339);
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(to_hex64(0xAB), "00000000000000AB");
        assert_eq!(to_hex32(0xAB), "000000AB");
    }
}
