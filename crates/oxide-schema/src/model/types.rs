//! Canonical column types.

use serde::Serialize;

/// Logical column type after alias normalization.
///
/// Both the DDL parser and the catalog adapter resolve type names through
/// [`DataType::resolve`], so `int`, `int4` and `integer` all become
/// [`DataType::Integer`] regardless of where they were read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    Smallint,
    Integer,
    Bigint,
    Real,
    Double,
    /// `numeric` with optional precision and scale. `numeric(p)` is stored
    /// with scale 0.
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    /// Fixed-length `character(n)`; a bare `char` is `char(1)`.
    Char { length: u32 },
    /// `character varying`, optionally bounded.
    Varchar { length: Option<u32> },
    Text,
    Bytea,
    Boolean,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Interval,
    Uuid,
    Json,
    Jsonb,
    /// A type the engine does not interpret (enums, domains, extensions).
    Custom { name: String },
}

impl DataType {
    /// Resolves a lower-case PostgreSQL type name and its modifiers.
    ///
    /// Multi-word names are passed with single spaces, e.g.
    /// `"character varying"` or `"timestamp with time zone"`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the name or its modifiers are
    /// not supported.
    pub fn resolve(name: &str, modifiers: &[u32]) -> Result<Self, String> {
        let no_modifiers = |ty: Self| {
            if modifiers.is_empty() {
                Ok(ty)
            } else {
                Err(format!("type {name} does not accept modifiers"))
            }
        };

        match name {
            "smallint" | "int2" => no_modifiers(Self::Smallint),
            "integer" | "int" | "int4" => no_modifiers(Self::Integer),
            "bigint" | "int8" => no_modifiers(Self::Bigint),
            "real" | "float4" => no_modifiers(Self::Real),
            "double precision" | "float8" => no_modifiers(Self::Double),
            "float" => match modifiers {
                [] => Ok(Self::Double),
                [p] if (1..=24).contains(p) => Ok(Self::Real),
                [p] if (25..=53).contains(p) => Ok(Self::Double),
                _ => Err(format!("invalid precision for float: {modifiers:?}")),
            },
            "numeric" | "decimal" => match *modifiers {
                [] => Ok(Self::Numeric {
                    precision: None,
                    scale: None,
                }),
                [p] => Self::numeric(p, 0),
                [p, s] => Self::numeric(p, s),
                _ => Err("numeric accepts at most precision and scale".to_string()),
            },
            "character" | "char" | "bpchar" => match *modifiers {
                [] => Ok(Self::Char { length: 1 }),
                [n] if n > 0 => Ok(Self::Char { length: n }),
                _ => Err(format!("invalid length for {name}: {modifiers:?}")),
            },
            "character varying" | "varchar" => match *modifiers {
                [] => Ok(Self::Varchar { length: None }),
                [n] if n > 0 => Ok(Self::Varchar { length: Some(n) }),
                _ => Err(format!("invalid length for {name}: {modifiers:?}")),
            },
            "text" => no_modifiers(Self::Text),
            "bytea" => no_modifiers(Self::Bytea),
            "boolean" | "bool" => no_modifiers(Self::Boolean),
            "date" => no_modifiers(Self::Date),
            "time" | "time without time zone" => no_modifiers(Self::Time),
            "timestamp" | "timestamp without time zone" => no_modifiers(Self::Timestamp),
            "timestamptz" | "timestamp with time zone" => no_modifiers(Self::Timestamptz),
            "interval" => no_modifiers(Self::Interval),
            "uuid" => no_modifiers(Self::Uuid),
            "json" => no_modifiers(Self::Json),
            "jsonb" => no_modifiers(Self::Jsonb),
            "timetz" | "time with time zone" => {
                Err("time with time zone is not supported".to_string())
            }
            "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2" => Err(
                format!("{name} is not supported; use GENERATED ... AS IDENTITY instead"),
            ),
            other => no_modifiers(Self::Custom {
                name: other.to_string(),
            }),
        }
    }

    fn numeric(precision: u32, scale: u32) -> Result<Self, String> {
        if !(1..=1000).contains(&precision) {
            return Err(format!("numeric precision {precision} must be between 1 and 1000"));
        }
        if scale > precision {
            return Err(format!(
                "numeric scale {scale} must not exceed precision {precision}"
            ));
        }
        Ok(Self::Numeric {
            precision: Some(precision),
            scale: Some(scale),
        })
    }

    /// Renders the canonical PostgreSQL spelling of the type.
    ///
    /// Custom type names are returned unquoted; dialects quote them.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Smallint => "smallint".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Bigint => "bigint".to_string(),
            Self::Real => "real".to_string(),
            Self::Double => "double precision".to_string(),
            Self::Numeric {
                precision: Some(p),
                scale: Some(s),
            } => format!("numeric({p}, {s})"),
            Self::Numeric {
                precision: Some(p),
                scale: None,
            } => format!("numeric({p})"),
            Self::Numeric { .. } => "numeric".to_string(),
            Self::Char { length } => format!("char({length})"),
            Self::Varchar { length: Some(n) } => format!("varchar({n})"),
            Self::Varchar { length: None } => "varchar".to_string(),
            Self::Text => "text".to_string(),
            Self::Bytea => "bytea".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::Timestamp => "timestamp".to_string(),
            Self::Timestamptz => "timestamptz".to_string(),
            Self::Interval => "interval".to_string(),
            Self::Uuid => "uuid".to_string(),
            Self::Json => "json".to_string(),
            Self::Jsonb => "jsonb".to_string(),
            Self::Custom { name } => name.clone(),
        }
    }

    /// Returns true for the integer family, the only types that may back an
    /// identity column.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Smallint | Self::Integer | Self::Bigint)
    }

    /// Returns true for integer, floating point and numeric types.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Smallint
                | Self::Integer
                | Self::Bigint
                | Self::Real
                | Self::Double
                | Self::Numeric { .. }
        )
    }

    const fn integer_rank(&self) -> Option<u8> {
        match self {
            Self::Smallint => Some(1),
            Self::Integer => Some(2),
            Self::Bigint => Some(3),
            _ => None,
        }
    }

    /// Returns true when PostgreSQL converts existing values from `self` to
    /// `target` without a `USING` clause and without losing information.
    #[must_use]
    pub fn widens_to(&self, target: &Self) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (a, b) if a.integer_rank().is_some() && b.integer_rank().is_some() => {
                a.integer_rank() <= b.integer_rank()
            }
            (a, Self::Numeric {
                precision: None, ..
            }) if a.is_integer() => true,
            (Self::Smallint | Self::Integer | Self::Real, Self::Double)
            | (Self::Smallint, Self::Real)
            | (Self::Numeric { .. }, Self::Numeric { precision: None, .. }) => true,
            (
                Self::Numeric {
                    precision: Some(p1),
                    scale: Some(s1),
                },
                Self::Numeric {
                    precision: Some(p2),
                    scale: Some(s2),
                },
            ) => s1 == s2 && p2 >= p1,
            (Self::Varchar { length: Some(a) }, Self::Varchar { length: Some(b) }) => b >= a,
            (Self::Varchar { .. } | Self::Char { .. }, Self::Varchar { length: None } | Self::Text) => {
                true
            }
            (Self::Char { length: a }, Self::Varchar { length: Some(b) }) => b >= a,
            _ => false,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(DataType::resolve("int", &[]), Ok(DataType::Integer));
        assert_eq!(DataType::resolve("int4", &[]), Ok(DataType::Integer));
        assert_eq!(DataType::resolve("int8", &[]), Ok(DataType::Bigint));
        assert_eq!(DataType::resolve("bool", &[]), Ok(DataType::Boolean));
        assert_eq!(DataType::resolve("float8", &[]), Ok(DataType::Double));
        assert_eq!(DataType::resolve("float", &[10]), Ok(DataType::Real));
        assert_eq!(
            DataType::resolve("timestamp with time zone", &[]),
            Ok(DataType::Timestamptz)
        );
        assert_eq!(
            DataType::resolve("character varying", &[255]),
            Ok(DataType::Varchar { length: Some(255) })
        );
    }

    #[test]
    fn test_resolve_char_defaults_to_length_one() {
        assert_eq!(
            DataType::resolve("char", &[]),
            Ok(DataType::Char { length: 1 })
        );
        assert_eq!(
            DataType::resolve("bpchar", &[3]),
            Ok(DataType::Char { length: 3 })
        );
    }

    #[test]
    fn test_resolve_numeric_precision_only_means_scale_zero() {
        assert_eq!(
            DataType::resolve("decimal", &[10]),
            Ok(DataType::Numeric {
                precision: Some(10),
                scale: Some(0)
            })
        );
        assert!(DataType::resolve("numeric", &[2, 5]).is_err());
    }

    #[test]
    fn test_resolve_rejects_serial_and_bad_modifiers() {
        let err = DataType::resolve("serial", &[]).unwrap_err();
        assert!(err.contains("IDENTITY"));
        assert!(DataType::resolve("integer", &[4]).is_err());
        assert!(DataType::resolve("timestamp", &[3]).is_err());
    }

    #[test]
    fn test_resolve_unknown_is_custom() {
        assert_eq!(
            DataType::resolve("citext", &[]),
            Ok(DataType::Custom {
                name: "citext".to_string()
            })
        );
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(DataType::Double.to_sql(), "double precision");
        assert_eq!(
            DataType::Numeric {
                precision: Some(10),
                scale: Some(2)
            }
            .to_sql(),
            "numeric(10, 2)"
        );
        assert_eq!(DataType::Varchar { length: None }.to_sql(), "varchar");
        assert_eq!(DataType::Char { length: 2 }.to_sql(), "char(2)");
    }

    #[test]
    fn test_widening() {
        assert!(DataType::Integer.widens_to(&DataType::Bigint));
        assert!(!DataType::Bigint.widens_to(&DataType::Integer));
        assert!(DataType::Varchar { length: Some(50) }.widens_to(&DataType::Text));
        assert!(DataType::Varchar { length: Some(50) }
            .widens_to(&DataType::Varchar { length: Some(100) }));
        assert!(!DataType::Varchar { length: Some(100) }
            .widens_to(&DataType::Varchar { length: Some(50) }));
        assert!(!DataType::Text.widens_to(&DataType::Integer));
        assert!(!DataType::Integer.widens_to(&DataType::Text));
    }
}
