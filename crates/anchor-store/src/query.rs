use crate::StoreError;

/// A parsed `query` expression: either an exact tag match (`"name:value"`)
/// or a numeric upper bound (`"name<=N"`), per §6.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Exact { name: String, value: String },
    LessOrEqual { name: String, bound: i64 },
}

pub fn parse_query(expr: &str) -> Result<Query, StoreError> {
    if let Some((name, bound)) = expr.split_once("<=") {
        let bound: i64 = bound
            .trim()
            .parse()
            .map_err(|_| StoreError::InvalidQuery(expr.to_string()))?;
        return Ok(Query::LessOrEqual {
            name: name.trim().to_string(),
            bound,
        });
    }
    if let Some((name, value)) = expr.split_once(':') {
        return Ok(Query::Exact {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        });
    }
    Err(StoreError::InvalidQuery(expr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact() {
        assert_eq!(
            parse_query("anchor:hl:abc").unwrap(),
            Query::Exact {
                name: "anchor".to_string(),
                value: "hl:abc".to_string(),
            }
        );
    }

    #[test]
    fn parses_bound() {
        assert_eq!(
            parse_query("expiry<=100").unwrap(),
            Query::LessOrEqual {
                name: "expiry".to_string(),
                bound: 100,
            }
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_query("nonsense").is_err());
    }
}
