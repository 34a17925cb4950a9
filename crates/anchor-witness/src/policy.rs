use crate::error::WitnessError;
use crate::proof::{Role, WitnessProof};

/// A single `MinPercent(p, role)` or `OutOf(k, role)` clause (§4.E.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    OutOf(u32),
    MinPercent(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: RuleKind,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    And,
    Or,
}

/// A parsed witness policy expression (§4.E.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub rules: Vec<Rule>,
    pub op: Option<LogOp>,
    pub log_required: bool,
}

impl Policy {
    /// `OutOf(100%, batch) AND OutOf(100%, system)` (§4.E.2 default).
    pub fn default_policy() -> Self {
        Policy {
            rules: vec![
                Rule { kind: RuleKind::OutOf(100), role: Role::Batch },
                Rule { kind: RuleKind::OutOf(100), role: Role::System },
            ],
            op: Some(LogOp::And),
            log_required: false,
        }
    }
}

/// Tokenizes on whitespace and the grammar's fixed punctuation, then parses
/// top-down per the grammar in §4.E.2. At most one logical operator may
/// appear; mixing `AND` and `OR` is rejected.
pub fn parse_policy(expr: &str) -> Result<Policy, WitnessError> {
    let tokens = tokenize(expr)?;
    let mut pos = 0;
    let mut rules = Vec::new();
    let mut op: Option<LogOp> = None;

    rules.push(parse_rule(&tokens, &mut pos)?);

    loop {
        match tokens.get(pos).map(String::as_str) {
            Some("AND") | Some("OR") => {
                let this_op = if tokens[pos] == "AND" { LogOp::And } else { LogOp::Or };
                match op {
                    None => op = Some(this_op),
                    Some(existing) if existing == this_op => {}
                    Some(_) => {
                        return Err(WitnessError::PolicyParseError(
                            "mixing AND and OR in one policy expression".to_string(),
                        ))
                    }
                }
                pos += 1;
                rules.push(parse_rule(&tokens, &mut pos)?);
            }
            _ => break,
        }
    }

    let log_required = matches!(tokens.get(pos).map(String::as_str), Some("LogRequired"));
    if log_required {
        pos += 1;
    }
    if pos != tokens.len() {
        return Err(WitnessError::PolicyParseError(format!(
            "unexpected trailing token: {}",
            tokens[pos]
        )));
    }

    Ok(Policy { rules, op, log_required })
}

fn tokenize(expr: &str) -> Result<Vec<String>, WitnessError> {
    let normalized = expr
        .replace('(', " ( ")
        .replace(')', " ) ")
        .replace(',', " , ");
    Ok(normalized.split_whitespace().map(str::to_string).collect())
}

fn parse_rule(tokens: &[String], pos: &mut usize) -> Result<Rule, WitnessError> {
    let keyword = tokens
        .get(*pos)
        .ok_or_else(|| WitnessError::PolicyParseError("expected rule".to_string()))?
        .clone();
    *pos += 1;
    expect(tokens, pos, "(")?;

    let number: u32 = tokens
        .get(*pos)
        .ok_or_else(|| WitnessError::PolicyParseError("expected number".to_string()))?
        .trim_end_matches('%')
        .parse()
        .map_err(|_| WitnessError::PolicyParseError("invalid number in rule".to_string()))?;
    *pos += 1;
    expect(tokens, pos, ",")?;

    let role_token = tokens
        .get(*pos)
        .ok_or_else(|| WitnessError::PolicyParseError("expected role".to_string()))?;
    let role = Role::parse(role_token)
        .ok_or_else(|| WitnessError::PolicyParseError(format!("unknown role: {role_token}")))?;
    *pos += 1;
    expect(tokens, pos, ")")?;

    let kind = match keyword.as_str() {
        "OutOf" => RuleKind::OutOf(number),
        "MinPercent" => RuleKind::MinPercent(number),
        other => return Err(WitnessError::PolicyParseError(format!("unknown rule: {other}"))),
    };
    Ok(Rule { kind, role })
}

fn expect(tokens: &[String], pos: &mut usize, expected: &str) -> Result<(), WitnessError> {
    match tokens.get(*pos) {
        Some(t) if t == expected => {
            *pos += 1;
            Ok(())
        }
        other => Err(WitnessError::PolicyParseError(format!(
            "expected '{expected}', found {:?}",
            other
        ))),
    }
}

fn eligible_count(proofs: &[&WitnessProof], log_required: bool) -> (usize, usize) {
    let total = proofs.len();
    let signed = proofs
        .iter()
        .filter(|p| p.signed() && (!log_required || p.has_log))
        .count();
    (signed, total)
}

fn rule_satisfied(rule: &Rule, proofs: &[WitnessProof], log_required: bool) -> bool {
    let scoped: Vec<&WitnessProof> = proofs.iter().filter(|p| p.role == rule.role).collect();
    let (signed, total) = eligible_count(&scoped, log_required);
    match rule.kind {
        RuleKind::OutOf(k) => signed as u32 >= k,
        RuleKind::MinPercent(p) => {
            if total == 0 {
                true
            } else {
                signed * 100 >= (p as usize) * total
            }
        }
    }
}

/// `Evaluate(witnessProofs) -> bool` (§4.E.3).
pub fn evaluate(policy: &Policy, proofs: &[WitnessProof]) -> bool {
    let mut results = policy.rules.iter().map(|r| rule_satisfied(r, proofs, policy.log_required));
    match policy.op {
        Some(LogOp::And) | None => results.all(|ok| ok),
        Some(LogOp::Or) => results.any(|ok| ok),
    }
}

/// `Select(candidates) -> []Witness` (§4.E.4).
pub fn select(policy: &Policy, candidates: &[WitnessProof]) -> Result<Vec<WitnessProof>, WitnessError> {
    let role_selection = |role: Role, rule: &Rule| -> Result<Vec<WitnessProof>, WitnessError> {
        let mut pool: Vec<&WitnessProof> = candidates.iter().filter(|c| c.role == role).collect();
        if policy.log_required {
            pool.sort_by_key(|c| !c.has_log);
        }
        let n = pool.len();
        let required = match rule.kind {
            RuleKind::OutOf(k) => k as usize,
            RuleKind::MinPercent(p) => ((p as usize) * n).div_ceil(100),
        };
        if pool.len() < required {
            return Err(WitnessError::InsufficientWitnesses);
        }
        Ok(pool.into_iter().take(required).cloned().collect())
    };

    match policy.op {
        Some(LogOp::And) | None => {
            let mut selected = Vec::new();
            let mut seen = std::collections::HashSet::new();
            for rule in &policy.rules {
                for w in role_selection(rule.role, rule)? {
                    if seen.insert(w.witness.clone()) {
                        selected.push(w);
                    }
                }
            }
            Ok(selected)
        }
        Some(LogOp::Or) => {
            let mut candidates_by_rule = Vec::new();
            for rule in &policy.rules {
                if let Ok(selected) = role_selection(rule.role, rule) {
                    candidates_by_rule.push((rule.role, selected));
                }
            }
            if candidates_by_rule.is_empty() {
                return Err(WitnessError::InsufficientWitnesses);
            }
            // Prefer the smaller satisfiable selection, ties toward batch.
            candidates_by_rule.sort_by(|a, b| {
                a.1.len()
                    .cmp(&b.1.len())
                    .then_with(|| match (a.0, b.0) {
                        (Role::Batch, Role::System) => std::cmp::Ordering::Less,
                        (Role::System, Role::Batch) => std::cmp::Ordering::Greater,
                        _ => std::cmp::Ordering::Equal,
                    })
            });
            Ok(candidates_by_rule.into_iter().next().unwrap().1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_policy_equivalent() {
        let policy = parse_policy("OutOf(100, batch) AND OutOf(100, system)").unwrap();
        assert_eq!(policy, Policy::default_policy());
    }

    #[test]
    fn parses_minpercent_with_or_and_log_required() {
        let policy = parse_policy("MinPercent(67, system) OR OutOf(1, batch) LogRequired").unwrap();
        assert!(policy.log_required);
        assert_eq!(policy.op, Some(LogOp::Or));
        assert_eq!(policy.rules.len(), 2);
    }

    #[test]
    fn rejects_mixed_operators() {
        assert!(parse_policy("OutOf(1, batch) AND OutOf(1, system) OR OutOf(1, batch)").is_err());
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(parse_policy("OutOf(1, guardian)").is_err());
    }

    fn proof(uri: &str, role: Role, has_log: bool, signed: bool) -> WitnessProof {
        let mut p = WitnessProof::new(uri, role, has_log);
        if signed {
            p.proof = Some(b"sig".to_vec());
        }
        p
    }

    #[test]
    fn evaluate_default_requires_all_signed() {
        let policy = Policy::default_policy();
        let proofs = vec![
            proof("b1", Role::Batch, false, true),
            proof("s1", Role::System, false, true),
        ];
        assert!(evaluate(&policy, &proofs));

        let incomplete = vec![proof("b1", Role::Batch, false, true)];
        assert!(!evaluate(&policy, &incomplete));
    }

    #[test]
    fn evaluate_min_percent_vacuous_on_empty_role() {
        let policy = parse_policy("MinPercent(50, system)").unwrap();
        assert!(evaluate(&policy, &[]));
    }

    #[test]
    fn evaluate_log_required_ignores_unlogged_proofs() {
        let policy = parse_policy("OutOf(1, batch) LogRequired").unwrap();
        let proofs = vec![proof("b1", Role::Batch, false, true)];
        assert!(!evaluate(&policy, &proofs));
        let proofs = vec![proof("b1", Role::Batch, true, true)];
        assert!(evaluate(&policy, &proofs));
    }

    #[test]
    fn select_and_unions_both_roles_deduping_common_witness() {
        let policy = parse_policy("OutOf(1, batch) AND OutOf(1, system)").unwrap();
        let candidates = vec![
            proof("shared", Role::Batch, false, false),
            proof("shared", Role::System, false, false),
        ];
        let selected = select(&policy, &candidates).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn select_or_prefers_smaller_batch_on_tie() {
        let policy = parse_policy("OutOf(1, batch) OR OutOf(1, system)").unwrap();
        let candidates = vec![
            proof("b1", Role::Batch, false, false),
            proof("s1", Role::System, false, false),
        ];
        let selected = select(&policy, &candidates).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].role, Role::Batch);
    }

    #[test]
    fn select_fails_when_insufficient() {
        let policy = parse_policy("OutOf(2, batch)").unwrap();
        let candidates = vec![proof("b1", Role::Batch, false, false)];
        assert!(matches!(select(&policy, &candidates), Err(WitnessError::InsufficientWitnesses)));
    }
}
