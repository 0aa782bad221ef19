use anyhow::{Context, Result, bail};
use atcdrill_engine::seed::FIX_NAMES;
use atcdrill_engine::{ExerciseMode, encode_friendly, generate_code_from_entropy, parse_share_code};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;

/// A seed to drill with, plus the share code it came from when there is one.
#[derive(Debug, Clone)]
pub struct SeedInfo {
    pub seed: u64,
    pub code: Option<String>,
    pub source_mode: Option<ExerciseMode>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self {
            seed,
            code: None,
            source_mode: None,
        }
    }

    #[must_use]
    pub const fn from_share_code(seed: u64, mode: ExerciseMode, code: String) -> Self {
        Self {
            seed,
            code: Some(code),
            source_mode: Some(mode),
        }
    }

    /// Mode to run the exercise in; bare numbers run as practice.
    #[must_use]
    pub fn mode(&self) -> ExerciseMode {
        self.source_mode.unwrap_or_default()
    }

    #[must_use]
    pub fn share_code(&self) -> String {
        self.code
            .clone()
            .unwrap_or_else(|| encode_friendly(self.mode(), self.seed))
    }
}

/// Resolve CLI seed arguments into canonical seed metadata.
///
/// Accepts integers, share codes (`PR-ABNUR42`), `all` / `available` for
/// every share code, and `random:N` for N fresh codes drawn from the clock.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();
    let mut request_all = false;

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case("available") {
            request_all = true;
            continue;
        }

        if let Some(count) = token.strip_prefix("random:") {
            let count: usize = count
                .parse()
                .with_context(|| format!("invalid random seed count in '{token}'"))?;
            let entropy = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
            pending.extend(random_share_code_seeds(count, entropy)?);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Some((mode, seed)) = parse_share_code(token) {
            pending.push(SeedInfo::from_share_code(seed, mode, token.to_ascii_uppercase()));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    if request_all {
        pending.extend(generate_all_share_code_seeds()?);
    }

    let mut deduped: Vec<SeedInfo> = Vec::new();
    let mut index: HashMap<(u64, u8), usize> = HashMap::new();

    for info in pending {
        let key = (info.seed, mode_tag(info.source_mode));
        if let Some(entry) = index.get(&key).and_then(|&slot| deduped.get_mut(slot)) {
            if entry.code.is_none() && info.code.is_some() {
                *entry = info;
            }
        } else {
            index.insert(key, deduped.len());
            deduped.push(info);
        }
    }

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(1337));
    }

    Ok(deduped)
}

fn generate_all_share_code_seeds() -> Result<Vec<SeedInfo>> {
    let modes = [ExerciseMode::Practice, ExerciseMode::Test];
    let mut seeds = Vec::with_capacity(FIX_NAMES.len() * 100 * modes.len());

    for fix in FIX_NAMES {
        for suffix in 0..100 {
            for mode in modes {
                let code = format!("{}-{fix}{suffix:02}", mode.code());
                let (mode, seed) = parse_share_code_checked(&code)?;
                seeds.push(SeedInfo::from_share_code(seed, mode, code));
            }
        }
    }

    Ok(seeds)
}

fn random_share_code_seeds(count: usize, entropy: u64) -> Result<Vec<SeedInfo>> {
    let mut rng = ChaCha20Rng::seed_from_u64(entropy);
    (0..count)
        .map(|_| {
            let mode = if rng.gen_bool(0.5) {
                ExerciseMode::Test
            } else {
                ExerciseMode::Practice
            };
            let code = generate_code_from_entropy(mode, rng.r#gen::<u64>());
            let (mode, seed) = parse_share_code_checked(&code)?;
            Ok(SeedInfo::from_share_code(seed, mode, code))
        })
        .collect()
}

fn parse_share_code_checked(code: &str) -> Result<(ExerciseMode, u64)> {
    parse_share_code(code).with_context(|| format!("failed to parse share code: {code}"))
}

const fn mode_tag(mode: Option<ExerciseMode>) -> u8 {
    match mode {
        Some(ExerciseMode::Practice) => 1,
        Some(ExerciseMode::Test) => 2,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_numeric_and_share_code() {
        let raw = vec!["42".to_string(), "-7".to_string(), "ts-kopag07".to_string()];
        let seeds = resolve_seed_inputs(&raw).unwrap();
        assert!(seeds.iter().any(|s| s.seed == 42 && s.code.is_none()));
        assert!(seeds.iter().any(|s| s.seed == 7 && s.code.is_none()));
        assert!(seeds.iter().any(|s| {
            s.code.as_deref() == Some("TS-KOPAG07") && s.source_mode == Some(ExerciseMode::Test)
        }));
    }

    #[test]
    fn share_code_seeds_keep_their_code() {
        let seeds = resolve_seed_inputs(&["PR-ABNUR42".to_string()]).unwrap();
        assert_eq!(seeds[0].share_code(), "PR-ABNUR42");
        assert_eq!(seeds[0].mode(), ExerciseMode::Practice);
        let numeric = SeedInfo::from_numeric(9);
        assert_eq!(numeric.mode(), ExerciseMode::Practice);
        assert!(numeric.share_code().starts_with("PR-"));
    }

    #[test]
    fn duplicates_collapse_and_prefer_codes() {
        let raw = vec!["5".to_string(), "5".to_string(), String::new()];
        assert_eq!(resolve_seed_inputs(&raw).unwrap().len(), 1);
        assert_eq!(resolve_seed_inputs(&[]).unwrap()[0].seed, 1337);
    }

    #[test]
    fn expands_all_share_codes() {
        let seeds = resolve_seed_inputs(&["all".to_string()]).unwrap();
        assert_eq!(seeds.len(), FIX_NAMES.len() * 100 * 2);
        assert!(seeds.iter().all(|s| s.code.is_some()));
    }

    #[test]
    fn random_codes_parse_back() {
        let seeds = random_share_code_seeds(8, 99).unwrap();
        assert_eq!(seeds.len(), 8);
        for info in &seeds {
            let code = info.code.as_deref().unwrap();
            assert_eq!(parse_share_code(code).map(|(_, seed)| seed), Some(info.seed));
        }
        assert!(resolve_seed_inputs(&["random:x".to_string()]).is_err());
        assert!(resolve_seed_inputs(&["nonsense".to_string()]).is_err());
    }
}
