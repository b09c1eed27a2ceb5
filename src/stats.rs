//! Statistical primitives behind the hypothesis tests.
//!
//! Every function returns a statistic plus a finite two-tailed p-value in
//! [0, 1] — inputs that would produce NaN or an infinite statistic are
//! rejected up front as insufficient data, so downstream formatting never
//! sees a non-finite p.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::error::{EngineError, Result};

pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Unbiased sample variance (n − 1 denominator). Zero for n < 2.
pub fn sample_variance(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// 1-based ranks with ties averaged, the midrank convention.
pub fn ranks_with_ties(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the same value; all get the average rank.
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Survival function of the standard normal, 1 − Φ(x).
pub fn normal_sf(x: f64) -> f64 {
    let std_normal = Normal::new(0.0, 1.0).expect("standard normal parameters are valid");
    1.0 - std_normal.cdf(x)
}

fn finite_p(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 }
}

#[derive(Debug, Clone, Copy)]
pub struct TwoSampleT {
    pub t: f64,
    /// Welch–Satterthwaite degrees of freedom (fractional).
    pub df: f64,
    pub p: f64,
    pub mean_a: f64,
    pub mean_b: f64,
}

/// Welch's two-sample t-test: unequal variances assumed, always.
///
/// Requires at least 2 observations per side — below that the sample
/// variance, and with it the statistic, is undefined.
pub fn welch_t(a: &[f64], b: &[f64], context: &str) -> Result<TwoSampleT> {
    for (label, side) in [("A", a), ("B", b)] {
        if side.len() < 2 {
            return Err(EngineError::insufficient(
                context,
                format!("group {label} has {} usable observations, need at least 2", side.len()),
            ));
        }
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, mean_b) = (mean(a), mean(b));
    let (var_a, var_b) = (sample_variance(a), sample_variance(b));

    let se = (var_a / n_a + var_b / n_b).sqrt();
    if se == 0.0 {
        return Err(EngineError::insufficient(context, "both groups have zero variance"));
    }

    let t = (mean_a - mean_b) / se;
    let df = (var_a / n_a + var_b / n_b).powi(2)
        / ((var_a / n_a).powi(2) / (n_a - 1.0) + (var_b / n_b).powi(2) / (n_b - 1.0));

    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EngineError::insufficient(context, e.to_string()))?;
    let p = finite_p(2.0 * (1.0 - t_dist.cdf(t.abs())));

    Ok(TwoSampleT { t, df, p, mean_a, mean_b })
}

#[derive(Debug, Clone, Copy)]
pub struct FTest {
    pub f: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p: f64,
}

/// One-way ANOVA F-test across k ≥ 2 groups.
pub fn one_way_anova(groups: &[Vec<f64>], context: &str) -> Result<FTest> {
    let k = groups.len();
    if k < 2 {
        return Err(EngineError::insufficient(context, format!("{k} group(s), need at least 2")));
    }
    let n_total: usize = groups.iter().map(Vec::len).sum();
    if n_total <= k {
        return Err(EngineError::insufficient(
            context,
            format!("{n_total} observations across {k} groups leave no within-group df"),
        ));
    }

    let grand: f64 = groups.iter().flatten().sum::<f64>() / n_total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand).powi(2);
        ss_within += g.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (n_total - k) as f64;
    if ss_within == 0.0 {
        return Err(EngineError::insufficient(context, "zero within-group variance"));
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    let f_dist = FisherSnedecor::new(df_between, df_within)
        .map_err(|e| EngineError::insufficient(context, e.to_string()))?;
    let p = finite_p(1.0 - f_dist.cdf(f));

    Ok(FTest { f, df_between, df_within, p })
}

#[derive(Debug, Clone, Copy)]
pub struct HTest {
    pub h: f64,
    pub df: f64,
    pub p: f64,
}

/// Kruskal–Wallis rank test across k ≥ 2 groups, with the usual tie
/// correction. P-value from the chi-square approximation.
pub fn kruskal_wallis(groups: &[Vec<f64>], context: &str) -> Result<HTest> {
    let k = groups.len();
    if k < 2 {
        return Err(EngineError::insufficient(context, format!("{k} group(s), need at least 2")));
    }
    if groups.iter().any(|g| g.is_empty()) {
        return Err(EngineError::insufficient(context, "a group has no usable observations"));
    }

    let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
    let n = pooled.len() as f64;
    let ranks = ranks_with_ties(&pooled);

    let mut h = 0.0;
    let mut offset = 0;
    for g in groups {
        let n_i = g.len();
        let rank_sum: f64 = ranks[offset..offset + n_i].iter().sum();
        h += rank_sum.powi(2) / n_i as f64;
        offset += n_i;
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    // Tie correction: 1 − Σ(t³ − t) / (N³ − N) over tie groups.
    let mut sorted = pooled.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_sum += t.powi(3) - t;
        i = j + 1;
    }
    let correction = 1.0 - tie_sum / (n.powi(3) - n);
    if correction == 0.0 {
        return Err(EngineError::insufficient(context, "all pooled observations are identical"));
    }
    h /= correction;

    let df = (k - 1) as f64;
    let chi2_dist = ChiSquared::new(df)
        .map_err(|e| EngineError::insufficient(context, e.to_string()))?;
    let p = finite_p(1.0 - chi2_dist.cdf(h));

    Ok(HTest { h, df, p })
}

#[derive(Debug, Clone)]
pub struct ChiSquareTest {
    pub chi2: f64,
    pub dof: u64,
    pub p: f64,
}

/// Chi-square test of independence over an R × C count table.
///
/// All-zero rows and columns are stripped first; the stripped table must be
/// at least 2 × 2 or the test is degenerate. Applies the Yates continuity
/// correction (clipped at zero) when dof == 1, matching the reference
/// behavior for 2 × 2 tables.
pub fn chi2_independence(counts: &[Vec<u64>], attribute: &str) -> Result<ChiSquareTest> {
    let live_rows: Vec<&Vec<u64>> =
        counts.iter().filter(|row| row.iter().any(|&c| c > 0)).collect();
    let n_cols = live_rows.first().map(|r| r.len()).unwrap_or(0);
    let live_cols: Vec<usize> =
        (0..n_cols).filter(|&j| live_rows.iter().any(|row| row[j] > 0)).collect();

    if live_rows.len() < 2 || live_cols.len() < 2 {
        return Err(EngineError::degenerate(
            attribute,
            format!(
                "{} non-empty row(s) × {} non-empty column(s)",
                live_rows.len(),
                live_cols.len()
            ),
        ));
    }

    let row_totals: Vec<f64> = live_rows
        .iter()
        .map(|row| live_cols.iter().map(|&j| row[j] as f64).sum())
        .collect();
    let col_totals: Vec<f64> = live_cols
        .iter()
        .map(|&j| live_rows.iter().map(|row| row[j] as f64).sum())
        .collect();
    let grand: f64 = row_totals.iter().sum();

    let dof = ((live_rows.len() - 1) * (live_cols.len() - 1)) as u64;
    let yates = dof == 1;

    let mut chi2 = 0.0;
    for (i, row) in live_rows.iter().enumerate() {
        for (jj, &j) in live_cols.iter().enumerate() {
            let observed = row[j] as f64;
            let expected = row_totals[i] * col_totals[jj] / grand;
            let diff = if yates {
                ((observed - expected).abs() - 0.5).max(0.0)
            } else {
                (observed - expected).abs()
            };
            chi2 += diff.powi(2) / expected;
        }
    }

    let chi2_dist = ChiSquared::new(dof as f64)
        .map_err(|e| EngineError::insufficient(attribute, e.to_string()))?;
    let p = finite_p(1.0 - chi2_dist.cdf(chi2));

    Ok(ChiSquareTest { chi2, dof, p })
}

#[derive(Debug, Clone, Copy)]
pub struct ProportionZ {
    pub z: f64,
    pub p: f64,
    pub rate_a: f64,
    pub rate_b: f64,
}

/// Pooled two-proportion z-test on success counts.
pub fn pooled_z(
    succ_a: u64,
    total_a: u64,
    succ_b: u64,
    total_b: u64,
    context: &str,
) -> Result<ProportionZ> {
    if total_a == 0 || total_b == 0 {
        return Err(EngineError::insufficient(
            context,
            format!("group totals are {total_a} and {total_b}; both must be positive"),
        ));
    }

    let (n_a, n_b) = (total_a as f64, total_b as f64);
    let rate_a = succ_a as f64 / n_a;
    let rate_b = succ_b as f64 / n_b;
    let pooled = (succ_a + succ_b) as f64 / (n_a + n_b);
    let se = (pooled * (1.0 - pooled) * (1.0 / n_a + 1.0 / n_b)).sqrt();
    if se == 0.0 {
        return Err(EngineError::insufficient(
            context,
            "pooled proportion is 0 or 1; the standard error vanishes",
        ));
    }

    let z = (rate_a - rate_b) / se;
    let p = finite_p(2.0 * normal_sf(z.abs()));

    Ok(ProportionZ { z, p, rate_a, rate_b })
}
