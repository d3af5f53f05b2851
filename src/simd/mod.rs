// logcore - simd/mod.rs
//
// SIMD byte scanner (B1) and string ops (B3). `scanner`'s `find_char`,
// `find_last`, `count_char`, `find_all_char`, and `find_substring`, and
// `string_ops`'s `replace_char`/`replace_chars`, each offer three code
// paths: a wide vector path (32-byte AVX2 lanes), a narrow vector path
// (16-byte SSE2 lanes), and a scalar fallback used on every other target
// and whenever the wider instruction sets are not present at runtime. All
// three must agree bit-for-bit; only throughput differs. No path reads
// past the end of the input slice. `trim` and `to_lower` stay scalar-only
// — the source they're grounded on (`simd_string_ops.cpp`) only
// vectorizes those two under ARM NEON and falls back to its scalar
// implementation verbatim on AVX2/SSE4.2 builds, so there is no x86 lane
// code to port.

pub mod scanner;
pub mod string_ops;

pub use scanner::ByteScanner;
pub use string_ops::{contains, replace_char, replace_chars, to_lower, trim};
