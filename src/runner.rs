//! Multi-group and pairwise hypothesis tests over one enriched book.

use std::collections::BTreeMap;

use crate::dataset::{Enriched, Metric};
use crate::error::{EngineError, Result};
use crate::result::{ContingencyTable, DegreesOfFreedom, TestKind, TestResult};
use crate::stats;

/// Smallest per-group sample for which the parametric multi-group test is
/// trusted; below it the ANOVA normality/variance assumptions are unreliable
/// and the rank-based test runs instead. Fixed policy, not user-tunable.
pub const MIN_PARAMETRIC_GROUP_SIZE: usize = 20;

/// The two-state multi-group test selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiGroupMethod {
    /// One-way ANOVA F-test.
    Parametric,
    /// Kruskal–Wallis rank test.
    RankBased,
}

pub fn select_multigroup_method(group_sizes: &[usize]) -> MultiGroupMethod {
    select_with_threshold(group_sizes, MIN_PARAMETRIC_GROUP_SIZE)
}

fn select_with_threshold(group_sizes: &[usize], threshold: usize) -> MultiGroupMethod {
    if group_sizes.iter().any(|&n| n < threshold) {
        MultiGroupMethod::RankBased
    } else {
        MultiGroupMethod::Parametric
    }
}

/// Which continuous risk metric a multi-group comparison addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultiGroupMetric {
    Severity,
    Margin,
}

impl MultiGroupMetric {
    fn kind(self, method: MultiGroupMethod) -> TestKind {
        match (self, method) {
            (MultiGroupMetric::Severity, MultiGroupMethod::Parametric) => TestKind::AnovaSeverity,
            (MultiGroupMetric::Severity, MultiGroupMethod::RankBased) => TestKind::KruskalSeverity,
            (MultiGroupMetric::Margin, MultiGroupMethod::Parametric) => TestKind::AnovaMargin,
            (MultiGroupMetric::Margin, MultiGroupMethod::RankBased) => TestKind::KruskalMargin,
        }
    }

    fn label(self) -> &'static str {
        match self {
            MultiGroupMetric::Severity => "severity",
            MultiGroupMetric::Margin => "margin",
        }
    }
}

/// Tests association between one categorical attribute and a risk metric
/// across all of the attribute's groups at once.
pub struct GroupTestRunner<'a> {
    data: &'a Enriched,
}

impl<'a> GroupTestRunner<'a> {
    pub fn new(data: &'a Enriched) -> Self {
        GroupTestRunner { data }
    }

    /// Chi-square test of independence on attribute-value × claim incidence.
    pub fn frequency(&self, attribute: &str) -> Result<TestResult> {
        let labels = self.data.dataset().categorical(attribute)?;
        let had_claim = self.data.had_claim();

        let mut counts: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
        for (label, &had) in labels.iter().zip(had_claim) {
            if let Some(label) = label {
                counts.entry(label.as_str()).or_insert([0, 0])[usize::from(had)] += 1;
            }
        }

        let table = ContingencyTable {
            row_labels: counts.keys().map(|&l| l.to_string()).collect(),
            col_labels: vec!["0".to_string(), "1".to_string()],
            counts: counts.values().map(|c| c.to_vec()).collect(),
        };

        let test = stats::chi2_independence(&table.counts, attribute)?;
        let mut result =
            TestResult::new(TestKind::ChiSquareFrequency, attribute, test.chi2, test.p);
        result.df = Some(DegreesOfFreedom::Single(test.dof as f64));
        result.table = Some(table);
        Ok(result)
    }

    /// Multi-group comparison of conditional claim severity. Null severities
    /// mean "no claim" and are excluded, never zero-filled.
    pub fn severity(&self, attribute: &str) -> Result<TestResult> {
        self.multigroup(attribute, self.data.severity(), MultiGroupMetric::Severity)
    }

    /// Multi-group comparison of underwriting margin.
    pub fn margin(&self, attribute: &str) -> Result<TestResult> {
        let margins: Vec<Option<f64>> = self.data.margin().iter().map(|&m| Some(m)).collect();
        self.multigroup(attribute, &margins, MultiGroupMetric::Margin)
    }

    fn multigroup(
        &self,
        attribute: &str,
        values: &[Option<f64>],
        metric: MultiGroupMetric,
    ) -> Result<TestResult> {
        let labels = self.data.dataset().categorical(attribute)?;
        let context = format!("{} by {attribute}", metric.label());

        // Groups that are empty after null filtering never enter the map,
        // so they are excluded from the partition entirely.
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (label, value) in labels.iter().zip(values) {
            if let (Some(label), Some(v)) = (label, value) {
                groups.entry(label.as_str()).or_default().push(*v);
            }
        }

        if groups.len() < 2 {
            return Err(EngineError::insufficient(
                &context,
                format!("{} non-empty group(s), need at least 2", groups.len()),
            ));
        }

        let partition: Vec<Vec<f64>> = groups.into_values().collect();
        let sizes: Vec<usize> = partition.iter().map(Vec::len).collect();
        let method = select_multigroup_method(&sizes);
        let kind = metric.kind(method);

        let result = match method {
            MultiGroupMethod::Parametric => {
                let test = stats::one_way_anova(&partition, &context)?;
                let mut r = TestResult::new(kind, attribute, test.f, test.p);
                r.df = Some(DegreesOfFreedom::Ratio {
                    between: test.df_between,
                    within: test.df_within,
                });
                r
            }
            MultiGroupMethod::RankBased => {
                let test = stats::kruskal_wallis(&partition, &context)?;
                let mut r = TestResult::new(kind, attribute, test.h, test.p);
                r.df = Some(DegreesOfFreedom::Single(test.df));
                r
            }
        };
        Ok(result)
    }
}

/// Compares exactly two named groups of one attribute.
pub struct PairwiseTester<'a> {
    data: &'a Enriched,
}

impl<'a> PairwiseTester<'a> {
    pub fn new(data: &'a Enriched) -> Self {
        PairwiseTester { data }
    }

    /// Welch two-sample t-test on a continuous metric between groups `a`
    /// and `b`. Unequal variances are always assumed.
    pub fn welch(&self, attribute: &str, metric: &Metric, a: &str, b: &str) -> Result<TestResult> {
        let labels = self.data.dataset().categorical(attribute)?;
        let values = self.data.metric(metric)?;
        let context = format!("welch {} between {attribute}={a} and {attribute}={b}", metric.name());

        let side = |target: &str| -> Vec<f64> {
            labels
                .iter()
                .zip(&values)
                .filter_map(|(label, value)| match (label, value) {
                    (Some(l), Some(v)) if l.as_str() == target => Some(*v),
                    _ => None,
                })
                .collect()
        };

        let test = stats::welch_t(&side(a), &side(b), &context)?;
        let mut result = TestResult::new(TestKind::WelchT, attribute, test.t, test.p);
        result.groups = Some((a.to_string(), b.to_string()));
        result.df = Some(DegreesOfFreedom::Single(test.df));
        result.means = Some((test.mean_a, test.mean_b));
        Ok(result)
    }

    /// Pooled two-proportion z-test on claim incidence between groups `a`
    /// and `b`.
    pub fn proportions(&self, attribute: &str, a: &str, b: &str) -> Result<TestResult> {
        let labels = self.data.dataset().categorical(attribute)?;
        let had_claim = self.data.had_claim();
        let context = format!("proportions between {attribute}={a} and {attribute}={b}");

        let tally = |target: &str| -> (u64, u64) {
            labels.iter().zip(had_claim).fold((0, 0), |(succ, total), (label, &had)| {
                match label {
                    Some(l) if l.as_str() == target => (succ + u64::from(had), total + 1),
                    _ => (succ, total),
                }
            })
        };

        let (succ_a, total_a) = tally(a);
        let (succ_b, total_b) = tally(b);
        let test = stats::pooled_z(succ_a, total_a, succ_b, total_b, &context)?;

        let mut result = TestResult::new(TestKind::PooledZ, attribute, test.z, test.p);
        result.groups = Some((a.to_string(), b.to_string()));
        result.rates = Some((test.rate_a, test.rate_b));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{columns, derive, Dataset};

    fn labelled(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn book(provinces: &[&str], premiums: &[f64], claims: &[f64]) -> Enriched {
        let ds = Dataset::new(provinces.len())
            .with_categorical(columns::PROVINCE, labelled(provinces))
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, premiums.iter().map(|&p| Some(p)).collect())
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, claims.iter().map(|&c| Some(c)).collect())
            .unwrap();
        derive(ds).expect("derive")
    }

    #[test]
    fn frequency_four_record_scenario() {
        // X: one claim-free, one with a claim. Y: two claim-free.
        let data = book(
            &["X", "X", "Y", "Y"],
            &[100.0, 100.0, 100.0, 100.0],
            &[0.0, 50.0, 0.0, 0.0],
        );
        let result = GroupTestRunner::new(&data).frequency(columns::PROVINCE).expect("frequency");

        assert_eq!(result.kind, TestKind::ChiSquareFrequency);
        let table = result.table.as_ref().expect("table");
        assert_eq!(table.row_labels, vec!["X", "Y"]);
        assert_eq!(table.counts, vec![vec![1, 1], vec![2, 0]]);
        assert_eq!(table.row_totals(), vec![2, 2]);
        assert_eq!(table.grand_total() as usize, data.len());
        // Yates-corrected 2×2 with |o − e| = 0.5 everywhere.
        assert!(result.statistic.abs() < 1e-12);
        assert_eq!(result.p_value, Some(1.0));
    }

    #[test]
    fn frequency_missing_column_is_schema_error() {
        let data = book(&["X", "Y"], &[100.0, 100.0], &[0.0, 50.0]);
        let err = GroupTestRunner::new(&data).frequency(columns::GENDER).unwrap_err();
        assert!(matches!(err, EngineError::Schema { .. }));
    }

    #[test]
    fn frequency_single_group_is_degenerate() {
        let data = book(&["X", "X", "X"], &[100.0; 3], &[0.0, 50.0, 0.0]);
        let err = GroupTestRunner::new(&data).frequency(columns::PROVINCE).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateTable { .. }));
    }

    #[test]
    fn small_group_selects_rank_based_severity() {
        // Group A: 5 claimants, group B: 30. The smaller group trips the
        // threshold, so the rank-based test runs even though B is large.
        let mut provinces = Vec::new();
        let mut premiums = Vec::new();
        let mut claims = Vec::new();
        for i in 0..5 {
            provinces.push("A");
            premiums.push(200.0);
            claims.push(10.0 + i as f64);
        }
        for i in 0..30 {
            provinces.push("B");
            premiums.push(200.0);
            claims.push(40.0 + i as f64);
        }
        let data = book(&provinces, &premiums, &claims);
        let result = GroupTestRunner::new(&data).severity(columns::PROVINCE).expect("severity");
        assert_eq!(result.kind, TestKind::KruskalSeverity);
        assert!(matches!(result.df, Some(DegreesOfFreedom::Single(df)) if df == 1.0));
    }

    #[test]
    fn large_groups_select_anova_margin() {
        let mut provinces = Vec::new();
        let mut premiums = Vec::new();
        let mut claims = Vec::new();
        for i in 0..25 {
            provinces.push("A");
            premiums.push(100.0 + i as f64);
            claims.push(0.0);
            provinces.push("B");
            premiums.push(140.0 + i as f64);
            claims.push(0.0);
        }
        let data = book(&provinces, &premiums, &claims);
        let result = GroupTestRunner::new(&data).margin(columns::PROVINCE).expect("margin");
        assert_eq!(result.kind, TestKind::AnovaMargin);
        assert!(
            matches!(result.df, Some(DegreesOfFreedom::Ratio { between, within })
                if between == 1.0 && within == 48.0)
        );
    }

    #[test]
    fn severity_drops_claim_free_groups() {
        // Province C has no claimants at all: it must be excluded from the
        // partition, leaving A and B, not crash the test.
        let provinces = ["A", "A", "A", "B", "B", "B", "C", "C"];
        let claims = [10.0, 12.0, 14.0, 30.0, 32.0, 34.0, 0.0, 0.0];
        let data = book(&provinces, &[100.0; 8], &claims);
        let result = GroupTestRunner::new(&data).severity(columns::PROVINCE).expect("severity");
        assert_eq!(result.kind, TestKind::KruskalSeverity);
    }

    #[test]
    fn severity_with_one_surviving_group_is_insufficient() {
        let provinces = ["A", "A", "B", "B"];
        let claims = [10.0, 12.0, 0.0, 0.0];
        let data = book(&provinces, &[100.0; 4], &claims);
        let err = GroupTestRunner::new(&data).severity(columns::PROVINCE).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn threshold_constant_drives_selection() {
        let sizes = [5usize, 30];
        assert_eq!(
            select_with_threshold(&sizes, MIN_PARAMETRIC_GROUP_SIZE),
            MultiGroupMethod::RankBased
        );
        // Lowering the constant to 5 flips the choice on the same data.
        assert_eq!(select_with_threshold(&sizes, 5), MultiGroupMethod::Parametric);
    }

    fn gender_book() -> Enriched {
        let mut genders = Vec::new();
        let mut premiums = Vec::new();
        let mut claims = Vec::new();
        for i in 0..10 {
            genders.push("F");
            premiums.push(100.0);
            claims.push(20.0 + i as f64);
            genders.push("M");
            premiums.push(100.0);
            claims.push(35.0 + i as f64);
        }
        let ds = Dataset::new(genders.len())
            .with_categorical(columns::GENDER, labelled(&genders))
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, premiums.into_iter().map(Some).collect())
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, claims.into_iter().map(Some).collect())
            .unwrap();
        derive(ds).expect("derive")
    }

    #[test]
    fn pairwise_welch_on_severity() {
        let data = gender_book();
        let result = PairwiseTester::new(&data)
            .welch(columns::GENDER, &Metric::Severity, "F", "M")
            .expect("welch");
        assert_eq!(result.kind, TestKind::WelchT);
        assert_eq!(result.groups, Some(("F".to_string(), "M".to_string())));
        let (mean_f, mean_m) = result.means.expect("means");
        assert!((mean_f - 24.5).abs() < 1e-12);
        assert!((mean_m - 39.5).abs() < 1e-12);
        assert!(result.statistic < 0.0, "F mean is lower, t must be negative");
    }

    #[test]
    fn pairwise_welch_empty_group_is_insufficient() {
        let data = gender_book();
        let err = PairwiseTester::new(&data)
            .welch(columns::GENDER, &Metric::Severity, "F", "U")
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn pairwise_proportions_sign_and_symmetry() {
        // F: 1 claimant of 4; M: 3 claimants of 4.
        let genders = ["F", "F", "F", "F", "M", "M", "M", "M"];
        let claims = [50.0, 0.0, 0.0, 0.0, 50.0, 50.0, 50.0, 0.0];
        let ds = Dataset::new(genders.len())
            .with_categorical(columns::GENDER, labelled(&genders))
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, vec![Some(100.0); 8])
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, claims.iter().map(|&c| Some(c)).collect())
            .unwrap();
        let data = derive(ds).expect("derive");
        let tester = PairwiseTester::new(&data);

        let fm = tester.proportions(columns::GENDER, "F", "M").expect("proportions");
        let mf = tester.proportions(columns::GENDER, "M", "F").expect("proportions");
        assert_eq!(fm.rates, Some((0.25, 0.75)));
        assert!(fm.statistic < 0.0);
        assert!((fm.statistic + mf.statistic).abs() < 1e-12);
        assert_eq!(fm.p_value, mf.p_value);
    }
}
