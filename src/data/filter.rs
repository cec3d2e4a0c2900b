use super::model::{ShapeError, Table};

// ---------------------------------------------------------------------------
// Boolean masks over a column
// ---------------------------------------------------------------------------

/// One entry per observation; `true` means "selected".
pub type Mask = Vec<bool>;

/// `lo < v < hi` (open interval, as the spectral feature windows use).
pub fn between(values: &[f64], lo: f64, hi: f64) -> Mask {
    values.iter().map(|&v| v > lo && v < hi).collect()
}

/// Closed interval `lo <= v <= hi`.
pub fn within(values: &[f64], lo: f64, hi: f64) -> Mask {
    values.iter().map(|&v| v >= lo && v <= hi).collect()
}

/// Union of several masks of the same length.
pub fn any_of(masks: &[Mask]) -> Mask {
    combine(masks, false, |a, b| a || b)
}

/// Intersection of several masks of the same length.
pub fn all_of(masks: &[Mask]) -> Mask {
    combine(masks, true, |a, b| a && b)
}

fn combine(masks: &[Mask], init: bool, op: impl Fn(bool, bool) -> bool) -> Mask {
    let n = masks.iter().map(|m| m.len()).max().unwrap_or(0);
    (0..n)
        .map(|i| {
            masks
                .iter()
                .fold(init, |acc, m| op(acc, m.get(i).copied().unwrap_or(false)))
        })
        .collect()
}

pub fn invert(mask: &[bool]) -> Mask {
    mask.iter().map(|&b| !b).collect()
}

/// Indices of selected entries.
pub fn selected_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, &keep)| keep)
        .map(|(i, _)| i)
        .collect()
}

/// Keep the values whose mask entry is `true`.
pub fn apply(values: &[f64], mask: &[bool]) -> Result<Vec<f64>, ShapeError> {
    if values.len() != mask.len() {
        return Err(ShapeError::Length {
            what: "mask",
            expected: values.len(),
            got: mask.len(),
        });
    }
    Ok(values
        .iter()
        .zip(mask)
        .filter(|(_, &keep)| keep)
        .map(|(&v, _)| v)
        .collect())
}

/// Return indices of table rows where `column` satisfies `predicate`.
pub fn filtered_rows(
    table: &Table,
    column: &str,
    predicate: impl Fn(f64) -> bool,
) -> Result<Vec<usize>, ShapeError> {
    Ok(table
        .column(column)?
        .iter()
        .enumerate()
        .filter(|(_, &v)| predicate(v))
        .map(|(i, _)| i)
        .collect())
}

/// Gather `values[i]` for each index.
pub fn gather(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_windows_union() {
        let lam = [4070.0, 4100.0, 4200.0, 4340.0, 4850.0, 4950.0];
        let mask = any_of(&[
            between(&lam, 4080.0, 4130.0),
            between(&lam, 4315.0, 4370.0),
            between(&lam, 4830.0, 4900.0),
        ]);
        assert_eq!(mask, vec![false, true, false, true, true, false]);
        assert_eq!(selected_indices(&invert(&mask)), vec![0, 2, 5]);
    }

    #[test]
    fn apply_checks_length() {
        assert_eq!(apply(&[1.0, 2.0, 3.0], &[true, false, true]).unwrap(), vec![1.0, 3.0]);
        assert!(apply(&[1.0], &[true, false]).is_err());
    }

    #[test]
    fn rows_by_predicate() {
        let mut t = Table::new();
        t.push_column("camcol", vec![4.0, 5.0, 4.0]).unwrap();
        let rows = filtered_rows(&t, "camcol", |v| v == 4.0).unwrap();
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(all_of(&[within(&[4.0, 5.0], 3.5, 4.5), vec![true, true]]), vec![true, false]);
    }
}
