//------------------------------------------------------------------------------
// Lagrange Polynomials
//------------------------------------------------------------------------------

/// Values and first derivatives at `x` of the Lagrange basis through `xs`.
pub fn lagrange_basis(x: f64, xs: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let values = xs
        .iter()
        .enumerate()
        .map(|(j, &xj)| {
            xs.iter()
                .enumerate()
                .filter(|(m, _)| *m != j)
                .map(|(_, &xm)| (x - xm) / (xj - xm))
                .product()
        })
        .collect();
    let derivs = xs
        .iter()
        .enumerate()
        .map(|(j, &xj)| {
            xs.iter()
                .enumerate()
                .filter(|(i, _)| *i != j)
                .map(|(i, &xi)| {
                    xs.iter()
                        .enumerate()
                        .filter(|(m, _)| *m != i && *m != j)
                        .map(|(_, &xm)| (x - xm) / (xj - xm))
                        .product::<f64>()
                        / (xj - xi)
                })
                .sum()
        })
        .collect();
    (values, derivs)
}

//------------------------------------------------------------------------------
// Gauss Legendre Lobatto Points
//------------------------------------------------------------------------------

/// Gauss-Legendre-Lobatto points on [-1, 1] for a polynomial of `order`, ascending.
pub fn gauss_legendre_lobatto_points(order: usize) -> Vec<f64> {
    debug_assert!(order >= 1, "interpolation order must be at least 1");
    let n = order;

    // Chebyshev-Gauss-Lobatto points as the initial guess, refined by Newton
    // iteration on (1 - x^2) P'_n(x) through the Legendre recurrence
    let mut x: Vec<f64> = (0..=n)
        .map(|i| (std::f64::consts::PI * i as f64 / n as f64).cos())
        .collect();
    let mut error = 1.;
    while error > 1e-15 {
        error = 0.;
        for xi in x.iter_mut() {
            let (mut p_prev, mut p) = (1., *xi);
            for k in 2..=n {
                let kf = k as f64;
                let p_next = ((2. * kf - 1.) * *xi * p - (kf - 1.) * p_prev) / kf;
                p_prev = p;
                p = p_next;
            }
            let dx = (*xi * p - p_prev) / ((n as f64 + 1.) * p);
            *xi -= dx;
            error = f64::max(error, dx.abs());
        }
    }
    x.reverse();
    x
}
