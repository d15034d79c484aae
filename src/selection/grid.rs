use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Move `current` within a grid whose rows hold `rows[i]` cells each.
/// Left/right stay inside the row; up/down keep the column, clamped to the
/// target row's length.
pub(crate) fn move_in_grid(current: usize, direction: GridDirection, rows: &[usize]) -> usize {
    let total: usize = rows.iter().sum();
    if total == 0 {
        return 0;
    }
    let current = current.min(total - 1);

    let mut row = 0;
    let mut row_start = 0;
    while row_start + rows[row] <= current {
        row_start += rows[row];
        row += 1;
    }
    let col = current - row_start;
    let row_bounds = |r: usize| {
        let start: usize = rows[..r].iter().sum();
        (start, start + rows[r])
    };

    match direction {
        GridDirection::Left => {
            if current > row_start {
                current - 1
            } else {
                current
            }
        }
        GridDirection::Right => {
            let (_, row_end) = row_bounds(row);
            if current + 1 < row_end {
                current + 1
            } else {
                current
            }
        }
        GridDirection::Up => {
            let target = rows[..row].iter().rposition(|&n| n > 0);
            match target {
                Some(r) => {
                    let (start, end) = row_bounds(r);
                    start + col.min(end - start - 1)
                }
                None => current,
            }
        }
        GridDirection::Down => {
            let target = rows
                .iter()
                .enumerate()
                .skip(row + 1)
                .find(|(_, &n)| n > 0)
                .map(|(r, _)| r);
            match target {
                Some(r) => {
                    let (start, end) = row_bounds(r);
                    start + col.min(end - start - 1)
                }
                None => current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GridDirection::*;

    #[test]
    fn moves_within_ragged_rows() {
        // 0 1 2 3
        // 4 5
        // 6 7 8
        let rows = [4, 2, 3];
        let cases = [
            ((0, Left), 0),
            ((0, Right), 1),
            ((3, Right), 3),
            ((4, Left), 4),
            ((3, Down), 5),
            ((5, Up), 1),
            ((5, Down), 7),
            ((8, Up), 5),
            ((2, Up), 2),
            ((7, Down), 7),
        ];
        for ((from, direction), expected) in cases {
            assert_eq!(
                move_in_grid(from, direction, &rows),
                expected,
                "from {from} {direction:?}"
            );
        }
    }

    #[test]
    fn empty_grid_stays_at_zero() {
        assert_eq!(move_in_grid(3, Down, &[]), 0);
        assert_eq!(move_in_grid(3, Down, &[0]), 0);
    }

    #[test]
    fn out_of_range_cursor_is_clamped_first() {
        assert_eq!(move_in_grid(42, Left, &[3]), 1);
    }
}
