//! Bounded relative displacements for mouse-style transports.
//!
//! A relative mouse report carries a small signed delta per axis.  Larger
//! moves are split into sub-moves, each within `[-max_move, max_move]`, whose
//! sum equals the requested move exactly.
//!
//! ```text
//! request (300, -40), max_move 125
//!   → (125, -40) (125, 0) (50, 0)
//! ```

/// Splits `(dx, dy)` into sub-moves bounded by `max_move` per axis.
///
/// Returns an empty list for a zero request.  A non-positive `max_move` is
/// treated as `1`.
pub fn chunk_displacement(dx: i32, dy: i32, max_move: i32) -> Vec<(i32, i32)> {
    let bound = max_move.max(1);
    let (mut rest_x, mut rest_y) = (dx, dy);
    let mut moves = Vec::new();

    while rest_x != 0 || rest_y != 0 {
        let step_x = rest_x.clamp(-bound, bound);
        let step_y = rest_y.clamp(-bound, bound);
        moves.push((step_x, step_y));
        rest_x -= step_x;
        rest_y -= step_y;
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_splits_large_move_into_bounded_steps() {
        // Arrange / Act
        let moves = chunk_displacement(300, 0, 125);

        // Assert
        assert_eq!(moves, vec![(125, 0), (125, 0), (50, 0)]);
    }

    #[test]
    fn test_chunk_sum_equals_request_and_respects_bound() {
        for (dx, dy, bound) in [(-550, -550, 127), (70, 412, 127), (1, -1000, 7), (32767, 5, 32767)] {
            let moves = chunk_displacement(dx, dy, bound);

            let sum = moves.iter().fold((0, 0), |acc, m| (acc.0 + m.0, acc.1 + m.1));
            assert_eq!(sum, (dx, dy), "sum for ({dx}, {dy}) / {bound}");
            assert!(
                moves.iter().all(|m| m.0.abs() <= bound && m.1.abs() <= bound),
                "bound violated for ({dx}, {dy}) / {bound}"
            );
        }
    }

    #[test]
    fn test_chunk_zero_request_is_empty() {
        assert!(chunk_displacement(0, 0, 127).is_empty());
    }

    #[test]
    fn test_chunk_unit_bound_on_long_move_yields_one_step_per_unit() {
        let moves = chunk_displacement(-40_000, 3, 1);

        assert_eq!(moves.len(), 40_000);
        assert_eq!(moves[0], (-1, 1));
        assert_eq!(moves[3], (-1, 0));
    }

    #[test]
    fn test_chunk_non_positive_bound_still_terminates() {
        assert_eq!(chunk_displacement(2, 0, 0), vec![(1, 0), (1, 0)]);
    }
}
