use serde::{Deserialize, Serialize};
use std::fmt;

/// A single statistic value as returned by either platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view; text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_f64() == Some(0.0)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// Integer coercion for count-like statistics, which some drivers return
    /// as text or floats. Values that are not whole numbers are left as is.
    pub fn coerce_int(self) -> Scalar {
        fn whole(f: f64) -> bool {
            f.fract() == 0.0 && f.abs() < i64::MAX as f64
        }
        match self {
            Scalar::Float(f) if whole(f) => Scalar::Int(f as i64),
            Scalar::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Scalar::Int(i);
                }
                match trimmed.parse::<f64>() {
                    Ok(f) if whole(f) => Scalar::Int(f as i64),
                    _ => Scalar::Text(s),
                }
            }
            other => other,
        }
    }

    /// Structural equality: numbers compare numerically, text as text, and
    /// text never equals a number.
    pub fn exact_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_eq_across_numeric_variants() {
        assert!(Scalar::Int(5).exact_eq(&Scalar::Float(5.0)));
        assert!(!Scalar::Int(5).exact_eq(&Scalar::Float(5.1)));
        assert!(!Scalar::Int(5).exact_eq(&Scalar::from("5")));
        assert!(Scalar::from("abc").exact_eq(&Scalar::from("abc")));
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(Scalar::from(" 42 ").coerce_int(), Scalar::Int(42));
        assert_eq!(Scalar::Float(7.0).coerce_int(), Scalar::Int(7));
        assert_eq!(Scalar::from("1E2").coerce_int(), Scalar::Int(100));
        assert_eq!(Scalar::Float(7.5).coerce_int(), Scalar::Float(7.5));
        assert_eq!(Scalar::from("n/a").coerce_int(), Scalar::from("n/a"));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Scalar::from("50.000001").as_f64(), Some(50.000001));
        assert!(Scalar::from("0").is_zero());
        assert!(Scalar::Float(0.0).is_zero());
        assert_eq!(Scalar::from("NaN").as_f64(), None);
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[1, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![Scalar::Int(1), Scalar::Float(2.5), Scalar::from("x")]
        );
    }
}
