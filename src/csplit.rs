//! Category split table
//!
//! Categorical splits do not carry their level routing inline. The exporter
//! writes one row per categorical split into a shared lookup table, with one
//! numeric code per level of the split variable. Split records refer to rows
//! of this table by 1-based position.
use crate::errors::CartError;
use serde::{Deserialize, Serialize};

/// Routing code for one category level within a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelCode {
    /// The level routes to the left child.
    SendLeft,
    /// The level does not occur at the node.
    Absent,
    /// The level routes to the right child.
    SendRight,
}

impl LevelCode {
    /// Decode the exporter's numeric code (1, 2 or 3).
    pub fn from_code(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(LevelCode::SendLeft)
        } else if value == 2.0 {
            Some(LevelCode::Absent)
        } else if value == 3.0 {
            Some(LevelCode::SendRight)
        } else {
            None
        }
    }

    /// The exporter's numeric code for this routing.
    pub fn code(&self) -> f64 {
        match self {
            LevelCode::SendLeft => 1.0,
            LevelCode::Absent => 2.0,
            LevelCode::SendRight => 3.0,
        }
    }

    /// The code with left and right exchanged.
    pub fn swapped(&self) -> Self {
        match self {
            LevelCode::SendLeft => LevelCode::SendRight,
            LevelCode::Absent => LevelCode::Absent,
            LevelCode::SendRight => LevelCode::SendLeft,
        }
    }
}

/// Decoded level sets for one categorical split.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategorySplit {
    /// Levels that route to the left child.
    pub left: Vec<String>,
    /// Levels that route to the right child.
    pub right: Vec<String>,
    /// Levels that do not occur at the node.
    pub absent: Vec<String>,
}

/// Category split lookup table.
///
/// On the wire this is a numeric matrix; rows are validated on
/// deserialization so that only the codes 1, 2 and 3 get through.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct CategorySplits {
    rows: Vec<Vec<LevelCode>>,
}

impl CategorySplits {
    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decode row `reference` (1-based) against the ordered level labels of
    /// the split variable.
    ///
    /// * `reference` - 1-based row position, as stored in the split record.
    /// * `levels` - Ordered category labels of the split variable.
    /// * `swap` - Exchange the stored left and right routing.
    ///
    /// Rows may be padded with absent codes beyond the variable's level
    /// count; a routing code out there is an error, padding is not.
    pub fn route(&self, reference: usize, levels: &[String], swap: bool) -> Result<CategorySplit, CartError> {
        let row = match reference.checked_sub(1).and_then(|i| self.rows.get(i)) {
            Some(row) => row,
            None => {
                return Err(CartError::MalformedInput(format!(
                    "category split row {reference} referenced, but the table has {} rows",
                    self.rows.len()
                )))
            }
        };
        let mut split = CategorySplit::default();
        for (position, code) in row.iter().enumerate() {
            let code = if swap { code.swapped() } else { *code };
            match code {
                LevelCode::Absent => {
                    if let Some(level) = levels.get(position) {
                        split.absent.push(level.clone());
                    }
                }
                routed => {
                    let level = levels.get(position).ok_or_else(|| {
                        CartError::MalformedInput(format!(
                            "category split row {reference} routes level position {position}, but the variable defines {} levels",
                            levels.len()
                        ))
                    })?;
                    match routed {
                        LevelCode::SendLeft => split.left.push(level.clone()),
                        _ => split.right.push(level.clone()),
                    }
                }
            }
        }
        Ok(split)
    }
}

impl TryFrom<Vec<Vec<f64>>> for CategorySplits {
    type Error = CartError;

    fn try_from(matrix: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        let mut rows = Vec::with_capacity(matrix.len());
        for (position, raw) in matrix.iter().enumerate() {
            let mut row = Vec::with_capacity(raw.len());
            for value in raw {
                let code = LevelCode::from_code(*value).ok_or_else(|| {
                    CartError::MalformedInput(format!(
                        "category split row {} holds {value}, expected the codes 1, 2 or 3",
                        position + 1
                    ))
                })?;
                row.push(code);
            }
            rows.push(row);
        }
        Ok(CategorySplits { rows })
    }
}

impl From<CategorySplits> for Vec<Vec<f64>> {
    fn from(table: CategorySplits) -> Self {
        table
            .rows
            .iter()
            .map(|row| row.iter().map(LevelCode::code).collect())
            .collect()
    }
}
