//! Service hint parsing.
//!
//! A hint has the form `Base[:key=value]*`, for example
//! `Hot:rs=8+4:owner=alice`. Unknown keys and tokens without `=` are ignored.

use crate::constants::{BASE_REPLICATION, CHUNKS_PER_UNIT};
use crate::error::{Result, TypesError};
use serde::{Deserialize, Serialize};

/// Service tier derived from the hint base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HintBase {
    Hot,
    Cold,
    General,
}

impl HintBase {
    /// Case-insensitive; empty or unknown bases map to `General`
    pub fn parse(base: &str) -> Self {
        let base = base.trim();
        if base.eq_ignore_ascii_case("hot") {
            HintBase::Hot
        } else if base.eq_ignore_ascii_case("cold") {
            HintBase::Cold
        } else {
            HintBase::General
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHint {
    pub raw: String,
    pub base: HintBase,
    pub owner: Option<String>,
    pub replicas: Option<u64>,
    /// Erasure-coding profile `(K, M)`
    pub rs: Option<(u64, u64)>,
}

impl ServiceHint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (base, extras) = match raw.find(':') {
            Some(idx) => (raw[..idx].trim(), &raw[idx + 1..]),
            None => (raw, ""),
        };

        let mut hint = ServiceHint {
            raw: raw.to_string(),
            base: HintBase::parse(base),
            owner: None,
            replicas: None,
            rs: None,
        };

        for token in extras.split(':') {
            let token = token.trim();
            let Some((key, val)) = token.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let val = val.trim();
            if val.is_empty() {
                continue;
            }

            match key.as_str() {
                "owner" => hint.owner = Some(val.to_string()),
                "replicas" => {
                    let n = val
                        .parse::<u64>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| {
                            TypesError::InvalidServiceHint(format!("invalid replicas value: {}", val))
                        })?;
                    hint.replicas = Some(n);
                }
                "rs" => hint.rs = Some(parse_rs(val)?),
                _ => {}
            }
        }

        Ok(hint)
    }
}

fn parse_rs(val: &str) -> Result<(u64, u64)> {
    let invalid = || TypesError::InvalidServiceHint(format!("invalid rs value: {}", val));

    let (k, m) = val.split_once('+').ok_or_else(invalid)?;
    let k = k.trim().parse::<u64>().map_err(|_| invalid())?;
    let m = m.trim().parse::<u64>().map_err(|_| invalid())?;
    if k == 0 || m == 0 {
        return Err(invalid());
    }
    if CHUNKS_PER_UNIT as u64 % k != 0 {
        return Err(TypesError::InvalidServiceHint(format!(
            "K must divide {}: {}",
            CHUNKS_PER_UNIT, val
        )));
    }
    if k + m > BASE_REPLICATION {
        return Err(TypesError::InvalidServiceHint(format!(
            "K+M exceeds base replication {}: {}",
            BASE_REPLICATION, val
        )));
    }
    Ok((k, m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bases() {
        assert_eq!(ServiceHint::parse("Hot").unwrap().base, HintBase::Hot);
        assert_eq!(ServiceHint::parse(" COLD ").unwrap().base, HintBase::Cold);
        assert_eq!(ServiceHint::parse("").unwrap().base, HintBase::General);
        assert_eq!(ServiceHint::parse("Warm").unwrap().base, HintBase::General);
    }

    #[test]
    fn test_parse_extras() {
        let hint = ServiceHint::parse("Hot:rs=8+4:replicas=3:owner=alice:junk").unwrap();
        assert_eq!(hint.base, HintBase::Hot);
        assert_eq!(hint.rs, Some((8, 4)));
        assert_eq!(hint.replicas, Some(3));
        assert_eq!(hint.owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_rejects_bad_rs() {
        assert!(ServiceHint::parse("Hot:rs=3+2").is_err()); // 64 % 3 != 0
        assert!(ServiceHint::parse("Hot:rs=8+8").is_err()); // > base replication
        assert!(ServiceHint::parse("Hot:rs=0+2").is_err());
        assert!(ServiceHint::parse("Hot:rs=8").is_err());
        assert!(ServiceHint::parse("Hot:replicas=0").is_err());
    }
}
