use rand::Rng;

/// Draw one price move: a whole number of cents in `[-1.00, +0.99]`.
pub fn price_step<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let cents: i32 = rng.gen_range(0..200) - 100;
    cents as f64 / 100.0
}
