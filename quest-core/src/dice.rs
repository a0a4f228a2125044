//! Dice shapes, dice notation and the randomness provider.
//!
//! Supports the notation used on the rules cards: `NdM`, sums of several
//! `NdM` terms and flat modifiers (`2d6+1d3-1`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;

/// Most dice a single `NdM` term may roll.
pub const MAX_DICE_PER_TERM: u32 = 1000;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Die shapes used by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D2,
    D3,
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D2 => 2,
            DieType::D3 => 3,
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            2 => Some(DieType::D2),
            3 => Some(DieType::D3),
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// One `NdM` term of an expression. A negative term subtracts its dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub die_type: DieType,
    pub negative: bool,
}

/// A parsed dice expression such as `2d6+1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut terms = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut negative = false;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, negative, &mut terms, &mut modifier)?;
                        current.clear();
                    }
                    negative = ch == '-';
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if current.is_empty() {
            // Trailing sign with nothing after it.
            if notation.ends_with('+') || notation.ends_with('-') {
                return Err(DiceError::InvalidNotation(notation));
            }
        } else {
            Self::parse_term(&current, negative, &mut terms, &mut modifier)?;
        }

        if terms.is_empty() && modifier == 0 {
            return Err(DiceError::NoDice);
        }

        let expr = DiceExpression {
            terms,
            modifier,
            original: notation,
        };
        // Every total the expression can produce must fit in an i32.
        if expr.checked_bounds().is_none() {
            return Err(DiceError::InvalidNotation(expr.original));
        }
        Ok(expr)
    }

    fn parse_term(
        s: &str,
        negative: bool,
        terms: &mut Vec<DiceTerm>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        if let Some(d_pos) = s.find('d') {
            let count_str = &s[..d_pos];
            let sides_str = &s[d_pos + 1..];

            let count: u32 = if count_str.is_empty() {
                1
            } else {
                count_str
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
            };
            if count == 0 || count > MAX_DICE_PER_TERM {
                return Err(DiceError::InvalidNotation(s.to_string()));
            }

            let sides: u32 = sides_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

            terms.push(DiceTerm {
                count,
                die_type,
                negative,
            });
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            let signed = if negative { -value } else { value };
            *modifier = modifier
                .checked_add(signed)
                .ok_or_else(|| DiceError::InvalidNotation(s.to_string()))?;
        }

        Ok(())
    }

    /// Roll the expression with the given provider and return the sum.
    ///
    /// Totals saturate at the `i32` limits, which only matters for
    /// expressions built by hand rather than parsed.
    pub fn roll_with<R: RandomnessProvider + ?Sized>(&self, provider: &R) -> i32 {
        self.terms.iter().fold(self.modifier, |total, term| {
            (0..term.count).fold(total, |total, _| {
                let face = i32::try_from(provider.roll_die(term.die_type)).unwrap_or(i32::MAX);
                if term.negative {
                    total.saturating_sub(face)
                } else {
                    total.saturating_add(face)
                }
            })
        })
    }

    /// Smallest and largest totals, or `None` if either overflows.
    fn checked_bounds(&self) -> Option<(i32, i32)> {
        self.terms
            .iter()
            .try_fold((self.modifier, self.modifier), |(low, high), term| {
                let count = i32::try_from(term.count).ok()?;
                let most = count.checked_mul(term.die_type.sides() as i32)?;
                if term.negative {
                    Some((low.checked_sub(most)?, high.checked_sub(count)?))
                } else {
                    Some((low.checked_add(count)?, high.checked_add(most)?))
                }
            })
    }

    /// Smallest total the expression can produce.
    pub fn minimum(&self) -> i32 {
        self.checked_bounds().map_or(i32::MIN, |(low, _)| low)
    }

    /// Largest total the expression can produce.
    pub fn maximum(&self) -> i32 {
        self.checked_bounds().map_or(i32::MAX, |(_, high)| high)
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Source of uniformly distributed die outcomes.
///
/// Injected everywhere dice are needed so tests can seed or script it.
pub trait RandomnessProvider: Send + Sync {
    /// Roll one die of the given shape (1..=sides).
    fn roll_die(&self, die: DieType) -> u32;

    /// Parse and roll an `NdM` expression, returning the sum.
    fn roll_expression(&self, notation: &str) -> Result<i32, DiceError> {
        let expr = DiceExpression::parse(notation)?;
        Ok(expr.roll_with(self))
    }

    /// Percentile roll (1..=100).
    fn percentile(&self) -> u32 {
        self.roll_die(DieType::D100)
    }
}

/// `StdRng`-backed provider. Seed it for reproducible sequences.
pub struct StdRandomness {
    rng: Mutex<StdRng>,
}

impl StdRandomness {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for StdRandomness {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomnessProvider for StdRandomness {
    fn roll_die(&self, die: DieType) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(1..=die.sides())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d6").unwrap();
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].count, 1);
        assert_eq!(expr.terms[0].die_type, DieType::D6);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_implicit_count_and_modifier() {
        let expr = DiceExpression::parse("d3+2").unwrap();
        assert_eq!(expr.terms[0].count, 1);
        assert_eq!(expr.terms[0].die_type, DieType::D3);
        assert_eq!(expr.modifier, 2);

        let expr = DiceExpression::parse("2D10 - 1").unwrap();
        assert_eq!(expr.terms[0].count, 2);
        assert_eq!(expr.modifier, -1);
    }

    #[test]
    fn test_parse_multiple_terms() {
        let expr = DiceExpression::parse("2d6+1d4-1d2+3").unwrap();
        assert_eq!(expr.terms.len(), 3);
        assert!(expr.terms[2].negative);
        assert_eq!(expr.modifier, 3);
        assert_eq!(expr.minimum(), 2 + 1 - 2 + 3);
        assert_eq!(expr.maximum(), 12 + 4 - 1 + 3);
    }

    #[test]
    fn test_invalid_notation() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert_eq!(DiceExpression::parse("1d7"), Err(DiceError::InvalidDieSize(7)));
        assert!(matches!(
            DiceExpression::parse("xd6"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceExpression::parse("0d6"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceExpression::parse("1d6+"),
            Err(DiceError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_overflowing_notation_is_error_not_panic() {
        let rng = StdRandomness::seeded(1);
        for notation in [
            "2147483647+1",
            "-2147483647-1-1",
            "1000d100+2147483647",
            "1d6-2147483647-100",
        ] {
            assert!(
                matches!(
                    rng.roll_expression(notation),
                    Err(DiceError::InvalidNotation(_))
                ),
                "{notation} should be rejected"
            );
        }
        assert_eq!(
            DiceExpression::parse("2147483647").unwrap().maximum(),
            i32::MAX
        );
    }

    #[test]
    fn test_dice_count_is_limited() {
        assert!(DiceExpression::parse("1000d6").is_ok());
        for notation in ["1001d6", "100000000d100", "4000000000d6"] {
            assert!(matches!(
                DiceExpression::parse(notation),
                Err(DiceError::InvalidNotation(_))
            ));
        }
    }

    #[test]
    fn test_hand_built_expression_saturates() {
        let expr = DiceExpression {
            terms: vec![DiceTerm {
                count: u32::MAX,
                die_type: DieType::D100,
                negative: false,
            }],
            modifier: 0,
            original: "huge".to_string(),
        };
        assert_eq!(expr.maximum(), i32::MAX);
        assert_eq!(expr.minimum(), i32::MIN);
    }

    #[test]
    fn test_roll_expression_range() {
        let rng = StdRandomness::seeded(7);
        for _ in 0..200 {
            let total = rng.roll_expression("2d6+1").unwrap();
            assert!((3..=13).contains(&total));
        }
    }

    #[test]
    fn test_roll_expression_invalid_is_error_not_panic() {
        let rng = StdRandomness::seeded(1);
        assert!(rng.roll_expression("banana").is_err());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = StdRandomness::seeded(42);
        let b = StdRandomness::seeded(42);
        let xs: Vec<u32> = (0..20).map(|_| a.percentile()).collect();
        let ys: Vec<u32> = (0..20).map(|_| b.percentile()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (1..=100).contains(x)));
    }
}
