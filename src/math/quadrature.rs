//! Gauss-Legendre quadrature, used for deterministic reference integrals.

use std::f64::consts::PI;

const ORDER: usize = 8;

fn legendre_polynomial_and_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    if n == 1 {
        return (x, 1.0);
    }

    let mut p_nm2 = 1.0;
    let mut p_nm1 = x;
    for k in 2..=n {
        let kf = k as f64;
        let p_n = ((2.0 * kf - 1.0) * x * p_nm1 - (kf - 1.0) * p_nm2) / kf;
        p_nm2 = p_nm1;
        p_nm1 = p_n;
    }

    let dp_n = (n as f64) * (x * p_nm1 - p_nm2) / (x * x - 1.0);
    (p_nm1, dp_n)
}

/// Nodes and weights on `[-1, 1]` for an `n`-point rule (`n >= 1`).
pub fn gauss_legendre_nodes_weights(n: usize) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(1);
    let mut nodes = vec![0.0_f64; n];
    let mut weights = vec![0.0_f64; n];

    for i in 0..n.div_ceil(2) {
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..80 {
            let (p, dp) = legendre_polynomial_and_derivative(n, z);
            let dz = -p / dp;
            z += dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }

        let (_, dp) = legendre_polynomial_and_derivative(n, z);
        let w = 2.0 / ((1.0 - z * z) * dp * dp);

        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// Integrates `f` over `[a, b]` with an 8-point rule on `panels` equal panels.
pub fn composite_gauss_legendre<F>(f: F, a: f64, b: f64, panels: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let (nodes, weights) = gauss_legendre_nodes_weights(ORDER);
    let panels = panels.max(1);
    let h = (b - a) / panels as f64;

    (0..panels)
        .map(|p| {
            let lo = a + p as f64 * h;
            let c1 = 0.5 * h;
            let c2 = lo + c1;
            c1 * nodes
                .iter()
                .zip(&weights)
                .map(|(&x, &w)| w * f(c1 * x + c2))
                .sum::<f64>()
        })
        .sum()
}
