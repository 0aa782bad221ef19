//! Share codes for replaying an exercise.
//! Code format: <MODE>-<FIX><NN>, e.g. PR-ABNUR42, TS-KOPAG07

use crate::exercise::ExerciseMode;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Five-letter waypoint names used as the readable part of a code.
pub const FIX_NAMES: [&str; 64] = [
    "ABNUR", "BIGLI", "CODAN", "DEKOM", "EVUKI", "FAMEN", "GIVMI", "HALIF", "IBLIN", "JUVAL",
    "KOPAG", "LAMSO", "MOKIP", "NEBUL", "OSKOR", "PIMOS", "RILAM", "SOVAN", "TIPOD", "UMBAX",
    "VEKIN", "WOBUN", "XIDAR", "YOLKO", "ZOMAN", "ARNEM", "BANEX", "CELIK", "DOGAL", "ELBOT",
    "FIRUS", "GOLEX", "HEKTO", "INKAM", "JOMAS", "KELIN", "LUMAK", "MIRSI", "NOLAN", "OBUTA",
    "PESOK", "RAVOK", "SIMLA", "TOBIS", "UPALA", "VARIK", "WESOK", "ADMIS", "BURAK", "CALPO",
    "DORIS", "ETRAK", "FOSIN", "GARMI", "HOSAK", "ILVUS", "KUBAL", "LOBIN", "MAPOS", "NIPOR",
    "OTVIN", "PELUK", "ROSIT", "SUTAL",
];

const INDEX_MASK: u16 = 0x01FF;
const NUMBER_MASK: u16 = 0x7F;
const MAX_NUMBER: u8 = 99;

#[inline]
fn pack(fix_index: u16, nn: u8) -> u16 {
    (fix_index & INDEX_MASK) | ((u16::from(nn) & NUMBER_MASK) << 9)
}

#[inline]
fn unpack(packed: u16) -> (usize, u8) {
    let nn = u8::try_from((packed >> 9) & NUMBER_MASK).unwrap_or(0);
    (usize::from(packed & INDEX_MASK), nn)
}

fn compose_seed(mode: ExerciseMode, fix_index: u16, nn: u8) -> u64 {
    let packed = pack(fix_index, nn);
    let [low, high] = packed.to_le_bytes();
    let mut buf = [0u8; 11];
    buf[..6].copy_from_slice(b"ATCDR-");
    buf[6..8].copy_from_slice(mode.code().as_bytes());
    buf[8] = low;
    buf[9] = high;
    buf[10] = 0x5A;
    (fnv1a64(&buf) & 0xFFFF_FFFF_FFFF_0000) | u64::from(packed)
}

/// Render the share code for `seed`. Only the low 16 bits select the
/// visible fix and number.
#[must_use]
pub fn encode_friendly(mode: ExerciseMode, seed: u64) -> String {
    let (index, nn) = unpack(u16::try_from(seed & 0xFFFF).unwrap_or(0));
    let fix = FIX_NAMES.get(index).copied().unwrap_or(FIX_NAMES[0]);
    format!("{}-{fix}{:02}", mode.code(), nn % (MAX_NUMBER + 1))
}

/// Seed encoded by `code`, ignoring its mode.
#[must_use]
pub fn decode_to_seed(code: &str) -> Option<u64> {
    parse_share_code(code).map(|(_, seed)| seed)
}

/// Mode and seed encoded by `code`. Case-insensitive; surrounding
/// whitespace is ignored.
#[must_use]
pub fn parse_share_code(code: &str) -> Option<(ExerciseMode, u64)> {
    let (mode_part, rest) = code.trim().split_once('-')?;
    let mode = ExerciseMode::from_code(mode_part)?;
    if rest.len() < 3 || !rest.is_ascii() {
        return None;
    }
    let (fix_part, nn_part) = rest.split_at(rest.len() - 2);
    if !nn_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nn: u8 = nn_part.parse().ok()?;
    let fix = fix_part.to_ascii_uppercase();
    let index = FIX_NAMES.iter().position(|name| *name == fix)?;
    let index = u16::try_from(index).ok()?;
    Some((mode, compose_seed(mode, index, nn)))
}

/// Fresh share code from arbitrary entropy, e.g. the wall clock.
#[must_use]
pub fn generate_code_from_entropy(mode: ExerciseMode, entropy: u64) -> String {
    let fix_count = FIX_NAMES.len() as u64;
    let index = u16::try_from(entropy % fix_count).unwrap_or(0);
    let nn = u8::try_from((entropy >> 17) % u64::from(MAX_NUMBER + 1)).unwrap_or(0);
    encode_friendly(mode, compose_seed(mode, index, nn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_seed_reencodes_to_same_code() {
        let (mode, seed) = parse_share_code("TS-KOPAG07").unwrap();
        assert_eq!(mode, ExerciseMode::Test);
        assert_eq!(encode_friendly(mode, seed), "TS-KOPAG07");
    }

    #[test]
    fn codes_are_case_insensitive_and_mode_scoped() {
        let upper = parse_share_code("PR-ABNUR42").unwrap();
        let lower = parse_share_code("  pr-abnur42 ").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.0, ExerciseMode::Practice);

        let test_mode = decode_to_seed("TS-ABNUR42").unwrap();
        assert_ne!(test_mode, upper.1);
    }

    #[test]
    fn malformed_codes_are_rejected() {
        for code in ["", "PR", "XX-ABNUR42", "PR-NOTAFIX42", "PR-ABNUR4x", "PR-42", "PR-ABNÜR42"] {
            assert!(parse_share_code(code).is_none(), "{code}");
        }
    }

    #[test]
    fn entropy_codes_parse_back() {
        for entropy in [0_u64, 1, 99, 0xDEAD_BEEF, u64::MAX] {
            let code = generate_code_from_entropy(ExerciseMode::Practice, entropy);
            assert!(code.starts_with("PR-"));
            let seed = decode_to_seed(&code).unwrap();
            assert_eq!(encode_friendly(ExerciseMode::Practice, seed), code);
        }
    }
}
