use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Draw a point uniformly from the box `[lower, upper]`, one draw per axis in x, y, z order.
///
/// A collapsed axis (`lower == upper`) still consumes its draw so 2-D and 3-D runs
/// with the same seed stay aligned on x and y.
pub fn uniform_point<R: Rng + ?Sized>(rng: &mut R, lower: [f64; 3], upper: [f64; 3]) -> [f64; 3] {
    std::array::from_fn(|axis| lower[axis] + rng.random::<f64>() * (upper[axis] - lower[axis]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_same_points() {
        let mut a = create_rng(9);
        let mut b = create_rng(9);
        for _ in 0..16 {
            assert_eq!(
                uniform_point(&mut a, [0.0; 3], [1.0; 3]),
                uniform_point(&mut b, [0.0; 3], [1.0; 3])
            );
        }
    }

    #[test]
    fn collapsed_axis_stays_on_plane() {
        let mut rng = create_rng(1);
        for _ in 0..64 {
            let p = uniform_point(&mut rng, [-5.0, -5.0, 0.0], [5.0, 5.0, 0.0]);
            assert!((-5.0..=5.0).contains(&p[0]));
            assert!((-5.0..=5.0).contains(&p[1]));
            assert_eq!(p[2], 0.0);
        }
    }
}
