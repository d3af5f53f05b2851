// logcore - svm.rs
//
// One-Class SVM trained by a simplified SMO (two-variable updates, random
// second-variable selection, no working-set heuristics). Grounded on
// `original_source/src/one_class_svm.cpp`'s `SMOSolver`: same KKT check
// (`alpha < tol && f < -tol`, or `alpha > tol && f > tol`), same eta
// negative-curvature guard, same box-clipped two-variable update, same
// `compute_rho` (free support vectors compared against the unscaled `nu`,
// not `nu * n` — literal in the original, not a bug this crate introduces).
// Diverges from the original in one place: the original calls `rand() %
// n_samples_` for the second variable; this uses a deterministic
// counter-driven pick instead (see DESIGN.md).

use crate::error::LoaderError;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Rbf,
    Poly,
    Sigmoid,
}

impl std::str::FromStr for Kernel {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "rbf" => Ok(Self::Rbf),
            "poly" => Ok(Self::Poly),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(LoaderError::InvalidInput {
                message: format!("unknown kernel '{other}', expected linear/rbf/poly/sigmoid"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Gamma {
    Auto,
    Scale,
    Value(f64),
}

#[derive(Debug, Clone)]
pub struct SvmConfig {
    pub kernel: Kernel,
    pub nu: f64,
    pub degree: u32,
    pub coef0: f64,
    pub gamma: Gamma,
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Rbf,
            nu: 0.5,
            degree: 3,
            coef0: 0.0,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 100,
        }
    }
}

pub struct OneClassSvm {
    config: SvmConfig,
    gamma_value: f64,
    support_vectors: Vec<Vec<f64>>,
    alphas: Vec<f64>,
    rho: f64,
}

/// Deterministic, counter-driven "random" second-variable pick: avoids a
/// PRNG dependency for a detail the spec leaves unspecified beyond
/// "pick a random j != i", and keeps training reproducible across runs.
fn pick_second_index(i: usize, n: usize, counter: &AtomicU64) -> usize {
    let step = counter.fetch_add(1, Ordering::Relaxed) as usize;
    let mut j = (i + 1 + step) % n;
    if j == i {
        j = (j + 1) % n;
    }
    j
}

impl OneClassSvm {
    /// Trains on `data` (one row per sample, equal-length feature
    /// vectors). `nu` must lie in `(0, 1]`.
    pub fn fit(data: &[Vec<f64>], config: SvmConfig) -> Result<Self, LoaderError> {
        if data.is_empty() {
            return Err(LoaderError::InvalidInput {
                message: "cannot fit on an empty dataset".to_string(),
            });
        }
        if !(config.nu > 0.0 && config.nu <= 1.0) {
            return Err(LoaderError::InvalidInput {
                message: format!("nu must lie in (0, 1], got {}", config.nu),
            });
        }
        let n_features = data[0].len();
        if data.iter().any(|row| row.len() != n_features) {
            return Err(LoaderError::InvalidInput {
                message: "all samples must share the same dimensionality".to_string(),
            });
        }

        let gamma_value = resolve_gamma(config.gamma, data, n_features);
        let n = data.len();
        let nu_n = config.nu * n as f64;

        let kernel_matrix = build_kernel_matrix(data, &config, gamma_value);

        let mut alphas = vec![0.0; n];
        if n >= 2 {
            alphas[0] = nu_n / 2.0;
            alphas[1] = nu_n / 2.0;
        } else {
            alphas[0] = nu_n.min(1.0);
        }

        let mut f: Vec<f64> = (0..n).map(|i| decision_sum(&kernel_matrix, &alphas, i)).collect();

        let counter = AtomicU64::new(0);
        for _epoch in 0..config.max_iter {
            let mut changed = 0usize;
            for i in 0..n {
                if !violates_kkt(alphas[i], f[i], config.tol) {
                    continue;
                }
                let j = pick_second_index(i, n, &counter);

                let k_ii = kernel_matrix[i][i];
                let k_jj = kernel_matrix[j][j];
                let k_ij = kernel_matrix[i][j];
                let eta = 2.0 * k_ij - k_ii - k_jj;
                if eta >= 0.0 {
                    continue;
                }

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];
                let sum = alpha_i_old + alpha_j_old;

                let lower = (sum - nu_n).max(0.0);
                let upper = sum.min(nu_n);
                if lower >= upper {
                    continue;
                }

                let mut alpha_j_new = alpha_j_old - (f[i] - f[j]) / eta;
                alpha_j_new = alpha_j_new.clamp(lower, upper);
                let alpha_i_new = sum - alpha_j_new;

                if (alpha_j_new - alpha_j_old).abs() < config.tol {
                    continue;
                }

                for (k, f_k) in f.iter_mut().enumerate() {
                    *f_k += (alpha_i_new - alpha_i_old) * kernel_matrix[i][k]
                        + (alpha_j_new - alpha_j_old) * kernel_matrix[j][k];
                }
                alphas[i] = alpha_i_new;
                alphas[j] = alpha_j_new;
                changed += 1;
            }
            if changed == 0 {
                break;
            }
        }

        let rho = compute_rho(&alphas, &f, nu_n, config.tol);
        let mut support_vectors = Vec::new();
        let mut support_alphas = Vec::new();
        for (i, &alpha) in alphas.iter().enumerate() {
            if alpha > config.tol {
                support_vectors.push(data[i].clone());
                support_alphas.push(alpha);
            }
        }
        if support_vectors.is_empty() {
            return Err(LoaderError::InvalidInput {
                message: "no support vectors found".to_string(),
            });
        }

        Ok(Self {
            config,
            gamma_value,
            support_vectors,
            alphas: support_alphas,
            rho,
        })
    }

    /// `score(x) = sum_j alpha_j K(x_j, x) - rho`.
    pub fn score(&self, x: &[f64]) -> f64 {
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.alphas)
            .map(|(sv, &alpha)| alpha * kernel(&self.config, self.gamma_value, sv, x))
            .sum();
        sum - self.rho
    }

    /// +1 inlier, -1 outlier.
    pub fn predict(&self, x: &[f64]) -> i32 {
        if self.score(x) >= 0.0 {
            1
        } else {
            -1
        }
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.len()
    }
}

fn violates_kkt(alpha: f64, f_value: f64, tol: f64) -> bool {
    if alpha < tol && f_value < -tol {
        return true;
    }
    if alpha > tol && f_value > tol {
        return true;
    }
    false
}

/// Free support vectors are compared against the unscaled `nu`
/// (preserved verbatim; see DESIGN.md for the discrepancy this inherits
/// from the textbook description, since `alpha` lives on `[0, nu*n]`).
fn compute_rho(alphas: &[f64], f: &[f64], nu_n: f64, tol: f64) -> f64 {
    let nu = nu_n / alphas.len().max(1) as f64;
    let free: Vec<f64> = alphas
        .iter()
        .zip(f)
        .filter(|(&a, _)| a > 0.0 && a < nu)
        .map(|(_, &fv)| fv)
        .collect();
    if !free.is_empty() {
        return free.iter().sum::<f64>() / free.len() as f64;
    }
    let support: Vec<f64> = alphas
        .iter()
        .zip(f)
        .filter(|(&a, _)| a > tol)
        .map(|(_, &fv)| fv)
        .collect();
    if !support.is_empty() {
        return support.iter().sum::<f64>() / support.len() as f64;
    }
    0.0
}

fn decision_sum(kernel_matrix: &[Vec<f64>], alphas: &[f64], i: usize) -> f64 {
    kernel_matrix[i]
        .iter()
        .zip(alphas)
        .map(|(k, a)| k * a)
        .sum()
}

fn build_kernel_matrix(data: &[Vec<f64>], config: &SvmConfig, gamma_value: f64) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let value = kernel(config, gamma_value, &data[i], &data[j]);
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }
    matrix
}

fn kernel(config: &SvmConfig, gamma_value: f64, a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match config.kernel {
        Kernel::Linear => dot,
        Kernel::Rbf => {
            let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
            (-gamma_value * sq_dist).exp()
        }
        Kernel::Poly => (gamma_value * dot + config.coef0).powi(config.degree as i32),
        Kernel::Sigmoid => (gamma_value * dot + config.coef0).tanh(),
    }
}

fn resolve_gamma(gamma: Gamma, data: &[Vec<f64>], n_features: usize) -> f64 {
    match gamma {
        Gamma::Value(v) => v,
        Gamma::Auto => 1.0 / n_features.max(1) as f64,
        Gamma::Scale => {
            let variance = feature_variance(data, n_features);
            if variance > 0.0 {
                1.0 / (n_features.max(1) as f64 * variance)
            } else {
                1.0 / n_features.max(1) as f64
            }
        }
    }
}

/// Population variance over every element of `data`, matching Eigen's
/// `.variance()` / sklearn's `X.var()` over the flattened matrix — not
/// the variance of per-row means, which is a different (and for
/// symmetric inputs, wrong) quantity.
fn feature_variance(data: &[Vec<f64>], n_features: usize) -> f64 {
    let count = data.len() * n_features;
    if count == 0 {
        return 0.0;
    }
    let total: f64 = data.iter().flat_map(|row| row.iter()).sum();
    let grand_mean = total / count as f64;

    let sum_sq: f64 = data
        .iter()
        .flat_map(|row| row.iter())
        .map(|&x| (x - grand_mean).powi(2))
        .sum();
    sum_sq / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_dataset() {
        let result = OneClassSvm::fit(&[], SvmConfig::default());
        assert!(matches!(result, Err(LoaderError::InvalidInput { .. })));
    }

    #[test]
    fn rejects_nu_out_of_range() {
        let config = SvmConfig {
            nu: 0.0,
            ..SvmConfig::default()
        };
        let result = OneClassSvm::fit(&[vec![0.0]], config);
        assert!(matches!(result, Err(LoaderError::InvalidInput { .. })));
    }

    #[test]
    fn rejects_inconsistent_dimensionality() {
        let result = OneClassSvm::fit(&[vec![0.0, 1.0], vec![0.0]], SvmConfig::default());
        assert!(matches!(result, Err(LoaderError::InvalidInput { .. })));
    }

    #[test]
    fn unknown_kernel_name_is_rejected() {
        assert!("not-a-kernel".parse::<Kernel>().is_err());
    }

    #[test]
    fn fits_tight_cluster_and_scores_outlier_lower() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![-0.1, 0.0],
            vec![0.0, -0.1],
            vec![0.05, 0.05],
        ];
        let config = SvmConfig {
            nu: 0.3,
            gamma: Gamma::Value(2.0),
            ..SvmConfig::default()
        };
        let model = OneClassSvm::fit(&data, config).unwrap();
        assert!(model.support_vector_count() > 0);
        let inlier_score = model.score(&[0.02, 0.02]);
        let outlier_score = model.score(&[50.0, 50.0]);
        assert!(inlier_score > outlier_score);
    }

    #[test]
    fn gamma_auto_is_inverse_of_feature_count() {
        let data = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        assert_eq!(resolve_gamma(Gamma::Auto, &data, 3), 1.0 / 3.0);
    }

    #[test]
    fn gamma_scale_uses_flattened_variance_not_row_mean_variance() {
        // Both rows have mean 5.0, so a row-mean variance is 0 and would
        // wrongly trip the zero-variance fallback. The true flattened
        // variance of [0, 10, 10, 0] around mean 5 is 100/4 = 25.
        let data = vec![vec![0.0, 10.0], vec![10.0, 0.0]];
        let gamma = resolve_gamma(Gamma::Scale, &data, 2);
        assert!((gamma - 1.0 / (2.0 * 25.0)).abs() < 1e-9);
    }
}
