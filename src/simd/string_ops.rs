// logcore - simd/string_ops.rs
//
// String transforms built on top of the scanner primitives in `scanner`.
// `replace_char`/`replace_chars` get the same AVX2/SSE2/scalar dispatch as
// `scanner::find_char`, grounded on `simd_string_ops.cpp`'s
// `_mm256_cmpeq_epi8`/`_mm256_blendv_epi8` (AVX2) and SSE4.2 lane code for
// the same two operations. `contains` delegates to `find_substring`, which
// carries its own dispatch. `trim` and `to_lower` stay scalar on purpose:
// the source only vectorizes them under `USE_NEON_SIMD` and falls back to
// `trim_scalar`/`to_lower_scalar` verbatim on AVX2/SSE4.2 builds (see the
// `#elif defined(__AVX2__) || defined(__SSE4_2__)` branch of
// `SimdStringOps::to_lower`), so a scalar byte-replace ASCII transform is
// what this crate's x86_64 target would run either way.

use super::scanner::find_substring;

/// Replace every occurrence of `old` with `new`, returning a new owned
/// buffer. The input is never mutated in place since callers may hold
/// other views over the same underlying mapping. Only defined behavior
/// for ASCII `old`/`new`; non-ASCII characters fall back to the scalar
/// char-by-char path since a SIMD lane holds one byte, not one `char`.
pub fn replace_char(input: &str, old: char, new: char) -> String {
    if !old.is_ascii() || !new.is_ascii() || !input.is_ascii() {
        return input.chars().map(|c| if c == old { new } else { c }).collect();
    }
    let bytes = dispatch_replace_byte(input.as_bytes(), old as u8, new as u8);
    // Safety: input and the replacement are both ASCII, so the result stays valid UTF-8.
    unsafe { String::from_utf8_unchecked(bytes) }
}

/// Replace every occurrence of any character in `set` with `new`.
pub fn replace_chars(input: &str, set: &[char], new: char) -> String {
    if !new.is_ascii() || !input.is_ascii() || !set.iter().all(char::is_ascii) {
        return input
            .chars()
            .map(|c| if set.contains(&c) { new } else { c })
            .collect();
    }
    let mut lookup = [false; 256];
    for &c in set {
        lookup[c as usize] = true;
    }
    let bytes = dispatch_replace_bytes(input.as_bytes(), &lookup, new as u8);
    // Safety: input and the replacement are both ASCII, so the result stays valid UTF-8.
    unsafe { String::from_utf8_unchecked(bytes) }
}

/// Trim leading and trailing ASCII/Unicode whitespace.
pub fn trim(input: &str) -> &str {
    input.trim()
}

/// Case-fold to lowercase.
pub fn to_lower(input: &str) -> String {
    input.to_lowercase()
}

/// Whether `haystack` contains `needle` as a substring.
pub fn contains(haystack: &str, needle: &str) -> bool {
    find_substring(haystack.as_bytes(), needle.as_bytes()).is_some()
}

fn dispatch_replace_byte(data: &[u8], old: u8, new: u8) -> Vec<u8> {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            // Safety: avx2 detected at runtime; function never reads past data.len().
            return unsafe { replace_byte_avx2(data, old, new) };
        }
        if is_x86_feature_detected!("sse2") {
            // Safety: sse2 detected at runtime; function never reads past data.len().
            return unsafe { replace_byte_sse2(data, old, new) };
        }
    }
    replace_byte_scalar(data, old, new)
}

fn replace_byte_scalar(data: &[u8], old: u8, new: u8) -> Vec<u8> {
    data.iter().map(|&b| if b == old { new } else { b }).collect()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn replace_byte_sse2(data: &[u8], old: u8, new: u8) -> Vec<u8> {
    use std::arch::x86_64::*;

    const LANE: usize = 16;
    let mut out = data.to_vec();
    let old_vec = _mm_set1_epi8(old as i8);
    let new_vec = _mm_set1_epi8(new as i8);
    let mut i = 0;
    while i + LANE <= out.len() {
        let ptr = out.as_mut_ptr().add(i) as *mut __m128i;
        let chunk = _mm_loadu_si128(ptr);
        let mask = _mm_cmpeq_epi8(chunk, old_vec);
        let blended = _mm_or_si128(_mm_and_si128(mask, new_vec), _mm_andnot_si128(mask, chunk));
        _mm_storeu_si128(ptr, blended);
        i += LANE;
    }
    for b in &mut out[i..] {
        if *b == old {
            *b = new;
        }
    }
    out
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn replace_byte_avx2(data: &[u8], old: u8, new: u8) -> Vec<u8> {
    use std::arch::x86_64::*;

    const LANE: usize = 32;
    let mut out = data.to_vec();
    let old_vec = _mm256_set1_epi8(old as i8);
    let new_vec = _mm256_set1_epi8(new as i8);
    let mut i = 0;
    while i + LANE <= out.len() {
        let ptr = out.as_mut_ptr().add(i) as *mut __m256i;
        let chunk = _mm256_loadu_si256(ptr);
        let mask = _mm256_cmpeq_epi8(chunk, old_vec);
        let blended = _mm256_blendv_epi8(chunk, new_vec, mask);
        _mm256_storeu_si256(ptr, blended);
        i += LANE;
    }
    for b in &mut out[i..] {
        if *b == old {
            *b = new;
        }
    }
    out
}

fn dispatch_replace_bytes(data: &[u8], lookup: &[bool; 256], new: u8) -> Vec<u8> {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            // Safety: avx2 detected at runtime; function never reads past data.len().
            return unsafe { replace_bytes_avx2(data, lookup, new) };
        }
        if is_x86_feature_detected!("sse2") {
            // Safety: sse2 detected at runtime; function never reads past data.len().
            return unsafe { replace_bytes_sse2(data, lookup, new) };
        }
    }
    replace_bytes_scalar(data, lookup, new)
}

fn replace_bytes_scalar(data: &[u8], lookup: &[bool; 256], new: u8) -> Vec<u8> {
    data.iter()
        .map(|&b| if lookup[b as usize] { new } else { b })
        .collect()
}

/// Builds the per-lane "is this byte one of the set" mask by OR-ing an
/// equality compare per candidate byte actually present in `lookup`,
/// mirroring the source's per-delimiter loop but keeping every compare a
/// full-lane vector op instead of a scalar per-byte insert.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn replace_bytes_sse2(data: &[u8], lookup: &[bool; 256], new: u8) -> Vec<u8> {
    use std::arch::x86_64::*;

    const LANE: usize = 16;
    let mut out = data.to_vec();
    let new_vec = _mm_set1_epi8(new as i8);
    let set: Vec<i8> = lookup
        .iter()
        .enumerate()
        .filter(|(_, &present)| present)
        .map(|(b, _)| b as i8)
        .collect();
    let mut i = 0;
    while i + LANE <= out.len() {
        let ptr = out.as_mut_ptr().add(i) as *mut __m128i;
        let chunk = _mm_loadu_si128(ptr);
        let mut mask = _mm_setzero_si128();
        for &byte in &set {
            let eq = _mm_cmpeq_epi8(chunk, _mm_set1_epi8(byte));
            mask = _mm_or_si128(mask, eq);
        }
        let blended = _mm_or_si128(_mm_and_si128(mask, new_vec), _mm_andnot_si128(mask, chunk));
        _mm_storeu_si128(ptr, blended);
        i += LANE;
    }
    for b in &mut out[i..] {
        if lookup[*b as usize] {
            *b = new;
        }
    }
    out
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn replace_bytes_avx2(data: &[u8], lookup: &[bool; 256], new: u8) -> Vec<u8> {
    use std::arch::x86_64::*;

    const LANE: usize = 32;
    let mut out = data.to_vec();
    let new_vec = _mm256_set1_epi8(new as i8);
    let set: Vec<i8> = lookup
        .iter()
        .enumerate()
        .filter(|(_, &present)| present)
        .map(|(b, _)| b as i8)
        .collect();
    let mut i = 0;
    while i + LANE <= out.len() {
        let ptr = out.as_mut_ptr().add(i) as *mut __m256i;
        let chunk = _mm256_loadu_si256(ptr);
        let mut mask = _mm256_setzero_si256();
        for &byte in &set {
            let eq = _mm256_cmpeq_epi8(chunk, _mm256_set1_epi8(byte));
            mask = _mm256_or_si256(mask, eq);
        }
        let blended = _mm256_blendv_epi8(chunk, new_vec, mask);
        _mm256_storeu_si256(ptr, blended);
        i += LANE;
    }
    for b in &mut out[i..] {
        if lookup[*b as usize] {
            *b = new;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_char_basic() {
        assert_eq!(replace_char("a,b,c", ',', ' '), "a b c");
    }

    #[test]
    fn replace_chars_basic() {
        assert_eq!(replace_chars("a,b;c|d", &[',', ';', '|'], ' '), "a b c d");
    }

    #[test]
    fn trim_basic() {
        assert_eq!(trim("  hello  "), "hello");
    }

    #[test]
    fn to_lower_basic() {
        assert_eq!(to_lower("HeLLo"), "hello");
    }

    #[test]
    fn contains_basic() {
        assert!(contains("hello world", "wor"));
        assert!(!contains("hello world", "xyz"));
    }

    #[test]
    fn replace_char_wide_input_crosses_lane_boundaries() {
        let mut input = "x".repeat(130);
        input.replace_range(0..1, ",");
        input.replace_range(63..64, ",");
        input.replace_range(129..130, ",");
        let replaced = replace_char(&input, ',', '_');
        assert_eq!(replaced.matches('_').count(), 3);
        assert!(replaced.chars().nth(0) == Some('_'));
        assert!(replaced.chars().nth(63) == Some('_'));
        assert!(replaced.chars().nth(129) == Some('_'));
    }

    #[test]
    fn replace_chars_wide_input_matches_scalar_multi_delimiter_path() {
        let input = format!("{},{};{}", "a".repeat(40), "b".repeat(40), "c".repeat(40));
        let replaced = replace_chars(&input, &[',', ';'], ' ');
        assert_eq!(replaced.matches(' ').count(), 2);
        assert!(!replaced.contains(','));
        assert!(!replaced.contains(';'));
    }

    #[test]
    fn replace_char_non_ascii_falls_back_to_char_path() {
        assert_eq!(replace_char("café,x", ',', ' '), "café x");
    }
}
