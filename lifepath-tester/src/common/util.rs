use anyhow::{Context, Result, bail};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse CLI seed tokens. Negative numbers fold to their magnitude.
pub fn resolve_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Ok(value) = token.parse::<i64>() {
            seeds.push(value.unsigned_abs());
            continue;
        }
        let value = token
            .parse::<u64>()
            .with_context(|| format!("invalid seed '{token}'"))?;
        seeds.push(value);
    }
    if seeds.is_empty() {
        bail!("at least one seed is required");
    }
    seeds.dedup();
    Ok(seeds)
}
