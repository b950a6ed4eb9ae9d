use nalgebra::DVector;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimplexOptions {
    /// Stop once the spread of function values across the simplex falls to this level.
    pub func_tol: f64,
    pub max_iterations: usize,
    /// Edge length of the initial simplex along each coordinate axis.
    pub initial_step: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            func_tol: 1e-10,
            max_iterations: 500,
            initial_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplexResult {
    pub x: DVector<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimises `f` with the Nelder–Mead downhill simplex method.
///
/// Infinite function values are allowed and simply mark points the simplex must avoid.
pub fn nelder_mead<F>(f: F, x0: DVector<f64>, options: &SimplexOptions) -> SimplexResult
where
    F: Fn(&DVector<f64>) -> f64,
{
    let n = x0.len();
    let f0 = f(&x0);
    if n == 0 {
        return SimplexResult {
            x: x0,
            value: f0,
            iterations: 0,
            converged: true,
        };
    }
    let mut vertices: Vec<(DVector<f64>, f64)> = Vec::with_capacity(n + 1);
    vertices.push((x0.clone(), f0));
    for i in 0..n {
        let mut x = x0.clone();
        x[i] += options.initial_step;
        let value = f(&x);
        vertices.push((x, value));
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = vertices[0].1;
        let worst = vertices[n].1;
        if best.is_finite() && (worst - best).abs() <= options.func_tol {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = vertices[..n]
            .iter()
            .fold(DVector::zeros(n), |acc, (x, _)| acc + x)
            / n as f64;
        let worst_x = vertices[n].0.clone();
        let second_worst = vertices[n - 1].1;

        let reflected = &centroid + (&centroid - &worst_x) * REFLECTION;
        let f_reflected = f(&reflected);

        if f_reflected < best {
            let expanded = &centroid + (&reflected - &centroid) * EXPANSION;
            let f_expanded = f(&expanded);
            vertices[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < second_worst {
            vertices[n] = (reflected, f_reflected);
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < worst {
            let x = &centroid + (&reflected - &centroid) * CONTRACTION;
            let value = f(&x);
            (x, value)
        } else {
            let x = &centroid + (&worst_x - &centroid) * CONTRACTION;
            let value = f(&x);
            (x, value)
        };
        if f_contracted < worst.min(f_reflected) {
            vertices[n] = (contracted, f_contracted);
            continue;
        }

        let best_x = vertices[0].0.clone();
        for (x, value) in vertices.iter_mut().skip(1) {
            *x = &best_x + (&*x - &best_x) * SHRINK;
            *value = f(x);
        }
    }

    vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = vertices.swap_remove(0);
    SimplexResult {
        x,
        value,
        iterations,
        converged,
    }
}
