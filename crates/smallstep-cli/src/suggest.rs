//! "Did you mean" hints for mistyped names

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Candidates closest to `input`, best first
pub fn closest<'a>(input: &str, candidates: &[&'a str], max_results: usize) -> Vec<&'a str> {
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = strsim::levenshtein(input, candidate);
            (distance > 0 && distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, candidate))
        })
        .collect();
    scored.sort();
    scored.into_iter().take(max_results).map(|(_, c)| c).collect()
}

/// Help text for an unknown name, if anything is close
pub fn did_you_mean(input: &str, candidates: &[&str]) -> Option<String> {
    let matches = closest(input, candidates, 3);
    if matches.is_empty() {
        return None;
    }
    let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
    Some(format!("Did you mean {}?", quoted.join(" or ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &[&str] = &[
        "smallstep_authority",
        "smallstep_provisioner",
        "smallstep_collection",
        "smallstep_collection_instance",
    ];

    #[test]
    fn test_typo_is_suggested() {
        assert_eq!(
            did_you_mean("smallstep_authorty", TYPES).as_deref(),
            Some("Did you mean `smallstep_authority`?")
        );
    }

    #[test]
    fn test_closest_first() {
        assert_eq!(
            closest("smallstep_collections", TYPES, 2),
            vec!["smallstep_collection"]
        );
    }

    #[test]
    fn test_nothing_close() {
        assert_eq!(did_you_mean("certificate", TYPES), None);
    }
}
