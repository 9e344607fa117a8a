use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

pub const DEFAULT_SEED: u64 = 1337;
const MAX_RANGE_LEN: u64 = 10_000;

/// Seed metadata used for logic runs and analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    /// Phrase the seed was derived from, if any.
    pub phrase: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed, phrase: None }
    }

    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        Self {
            seed: phrase_seed(phrase),
            phrase: Some(phrase.to_string()),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.phrase
            .as_ref()
            .map_or_else(|| self.seed.to_string(), |phrase| format!("{phrase} ({})", self.seed))
    }
}

/// First eight bytes of the SHA-256 of `phrase`, big-endian.
#[must_use]
pub fn phrase_seed(phrase: &str) -> u64 {
    let digest = Sha256::digest(phrase.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports decimal integers, `0x` hex, inclusive ranges `a..b`, and
/// `phrase:<text>` which hashes the text into a seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Some(phrase) = token.strip_prefix("phrase:") {
            if phrase.is_empty() {
                bail!("Empty seed phrase");
            }
            pending.push(SeedInfo::from_phrase(phrase));
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            let start = parse_number(start)?;
            let end = parse_number(end)?;
            if end < start || end - start >= MAX_RANGE_LEN {
                bail!("Seed range {token} must be ascending and shorter than {MAX_RANGE_LEN}");
            }
            pending.extend((start..=end).map(SeedInfo::from_numeric));
            continue;
        }

        pending.push(SeedInfo::from_numeric(parse_number(token).with_context(|| {
            format!("Unrecognized seed token: {token}")
        })?));
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(deduped)
}

fn parse_number(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed {token}"));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    token
        .parse::<u64>()
        .with_context(|| format!("invalid seed {token}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_numeric_hex_and_negative() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xff"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![42, 7, 255]);
    }

    #[test]
    fn expands_ranges_and_dedupes() {
        let seeds = resolve_seed_inputs(&tokens(&["3..5", "4", "5"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![3, 4, 5]);
        assert!(resolve_seed_inputs(&tokens(&["9..2"])).is_err());
    }

    #[test]
    fn phrases_hash_stably() {
        let seeds = resolve_seed_inputs(&tokens(&["phrase:iron cadet"])).unwrap();
        assert_eq!(seeds[0].seed, phrase_seed("iron cadet"));
        assert_ne!(phrase_seed("iron cadet"), phrase_seed("iron cadets"));
        assert!(seeds[0].label().starts_with("iron cadet ("));
    }

    #[test]
    fn defaults_when_empty_and_rejects_garbage() {
        assert_eq!(
            resolve_seed_inputs(&[]).unwrap(),
            vec![SeedInfo::from_numeric(DEFAULT_SEED)]
        );
        let err = resolve_seed_inputs(&tokens(&["banana"])).unwrap_err();
        assert!(err.to_string().contains("Unrecognized seed token"));
    }
}
