// SPDX-License-Identifier: AGPL-3.0-only

//! Genz integrand families for validation.
//!
//! The six classic families stress distinct integrand pathologies:
//! oscillation, localized peaks, corner singular behavior, Gaussian decay,
//! kinked continuity, and discontinuity. Where a closed form exists on the
//! unit cube, an `*_exact_unit_cube` companion returns the reference value
//! the end-to-end tests check against.
//!
//! All constructors take owned coefficient vectors and return `Sync`
//! closures ready to hand to the engine.

/// `cos(2π·u1 + Σ c_i x_i)`.
pub fn oscillatory(u1: f64, c: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        let phase: f64 = x.iter().zip(&c).map(|(xi, ci)| xi * ci).sum();
        (2.0 * std::f64::consts::PI * u1 + phase).cos()
    }
}

/// Closed form of [`oscillatory`] on `[0,1]^d`:
/// `cos(2π·u1 + Σ c_i/2) · Π sin(c_i/2)/(c_i/2)`. Requires `c_i ≠ 0`.
#[must_use]
pub fn oscillatory_exact_unit_cube(u1: f64, c: &[f64]) -> f64 {
    let half_sum: f64 = c.iter().map(|ci| ci / 2.0).sum();
    let envelope: f64 = c.iter().map(|ci| (ci / 2.0).sin() / (ci / 2.0)).product();
    (2.0 * std::f64::consts::PI * u1 + half_sum).cos() * envelope
}

/// `Π 1 / (c_i⁻² + (x_i − u_i)²)` — a peak at `u` in every dimension.
pub fn product_peak(c: Vec<f64>, u: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        x.iter()
            .zip(&c)
            .zip(&u)
            .map(|((xi, ci), ui)| 1.0 / (ci.powi(-2) + (xi - ui).powi(2)))
            .product()
    }
}

/// Closed form of [`product_peak`] on `[0,1]^d`:
/// `Π c_i · (atan(c_i(1 − u_i)) + atan(c_i·u_i))`.
#[must_use]
pub fn product_peak_exact_unit_cube(c: &[f64], u: &[f64]) -> f64 {
    c.iter()
        .zip(u)
        .map(|(ci, ui)| ci * ((ci * (1.0 - ui)).atan() + (ci * ui).atan()))
        .product()
}

/// `(1 + Σ c_i x_i)^−(d+1)` — peaked at the origin corner.
pub fn corner_peak(c: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        let d = c.len() as i32;
        let s: f64 = x.iter().zip(&c).map(|(xi, ci)| xi * ci).sum();
        (1.0 + s).powi(-(d + 1))
    }
}

/// Closed form of [`corner_peak`] on `[0,1]^d` by inclusion-exclusion:
/// `(1/(d!·Π c_i)) Σ_S (−1)^|S| / (1 + Σ_{i∈S} c_i)`. Practical for
/// `d ≤ 20` or so; the subset loop is `2^d`.
#[must_use]
pub fn corner_peak_exact_unit_cube(c: &[f64]) -> f64 {
    let d = c.len();
    let factorial: f64 = (1..=d).map(|k| k as f64).product();
    let coeff: f64 = c.iter().product::<f64>() * factorial;

    let mut acc = 0.0;
    for subset in 0u64..(1 << d) {
        let sum: f64 = (0..d)
            .filter(|i| subset & (1 << i) != 0)
            .map(|i| c[i])
            .sum();
        let sign = if subset.count_ones() % 2 == 0 { 1.0 } else { -1.0 };
        acc += sign / (1.0 + sum);
    }
    acc / coeff
}

/// `exp(−Σ c_i² (x_i − u_i)²)`.
pub fn gaussian(c: Vec<f64>, u: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        let s: f64 = x
            .iter()
            .zip(&c)
            .zip(&u)
            .map(|((xi, ci), ui)| (ci * (xi - ui)).powi(2))
            .sum();
        (-s).exp()
    }
}

/// `exp(−Σ c_i |x_i − u_i|)` — continuous but kinked at `u`.
pub fn c0_continuous(c: Vec<f64>, u: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        let s: f64 = x
            .iter()
            .zip(&c)
            .zip(&u)
            .map(|((xi, ci), ui)| ci * (xi - ui).abs())
            .sum();
        (-s).exp()
    }
}

/// Closed form of [`c0_continuous`] on `[0,1]^d`:
/// `Π (2 − exp(−c_i u_i) − exp(−c_i (1 − u_i))) / c_i`. Requires `c_i ≠ 0`.
#[must_use]
pub fn c0_continuous_exact_unit_cube(c: &[f64], u: &[f64]) -> f64 {
    c.iter()
        .zip(u)
        .map(|(ci, ui)| (2.0 - (-ci * ui).exp() - (-ci * (1.0 - ui)).exp()) / ci)
        .product()
}

/// `exp(Σ c_i x_i)` inside `x_0 ≤ u_0 ∧ x_1 ≤ u_1`, zero outside.
///
/// In one dimension only the `u_0` cut applies.
pub fn discontinuous(c: Vec<f64>, u: Vec<f64>) -> impl Fn(&[f64]) -> f64 + Sync {
    move |x: &[f64]| {
        if x[0] > u[0] || (x.len() > 1 && x[1] > u[1]) {
            return 0.0;
        }
        let s: f64 = x.iter().zip(&c).map(|(xi, ci)| xi * ci).sum();
        s.exp()
    }
}

/// Closed form of [`discontinuous`] on `[0,1]^d`:
/// `Π (exp(c_i t_i) − 1)/c_i` with `t = (u_0, u_1, 1, …, 1)`.
#[must_use]
pub fn discontinuous_exact_unit_cube(c: &[f64], u: &[f64]) -> f64 {
    c.iter()
        .enumerate()
        .map(|(i, ci)| {
            let t = if i < 2 && i < u.len() { u[i] } else { 1.0 };
            ((ci * t).exp() - 1.0) / ci
        })
        .product()
}
