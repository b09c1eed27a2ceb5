//! Seeded synthetic policy book, a stand-in for the ingestion collaborator.
//!
//! Draws a plausible motor book: per-province claim rates and severity
//! scales, log-normal premiums and vehicle values, occasional nulls in the
//! optional columns. Same seed, same book.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, LogNormal, Poisson};

use crate::dataset::{columns, Dataset};

struct ProvinceProfile {
    name: &'static str,
    postal_codes: &'static [&'static str],
    /// Probability a policy has at least one claim in the period.
    claim_rate: f64,
    /// ln-space location of the per-claim severity distribution.
    severity_mu: f64,
}

/// Calibration is indicative only — the point is realistic shape, not a
/// market fit.
const PROVINCES: &[ProvinceProfile] = &[
    ProvinceProfile {
        name: "Gauteng",
        postal_codes: &["0002", "1459", "2000", "2196"],
        claim_rate: 0.32,
        severity_mu: 7.9,
    },
    ProvinceProfile {
        name: "KwaZulu-Natal",
        postal_codes: &["3201", "4001", "4320"],
        claim_rate: 0.26,
        severity_mu: 7.6,
    },
    ProvinceProfile {
        name: "Western Cape",
        postal_codes: &["7100", "7441", "8001"],
        claim_rate: 0.21,
        severity_mu: 7.4,
    },
    ProvinceProfile {
        name: "Eastern Cape",
        postal_codes: &["5200", "6001"],
        claim_rate: 0.24,
        severity_mu: 7.5,
    },
];

const COVER_CATEGORIES: &[&str] = &["Comprehensive", "ThirdParty", "Windscreen"];
const BODY_TYPES: &[&str] = &["Sedan", "Hatchback", "SUV", "Bakkie"];
const LEGAL_TYPES: &[&str] = &["Individual", "CloseCorporation", "PrivateCompany"];

/// Generate a `rows`-record book. Deterministic in `seed`.
pub fn synthetic_book(seed: u64, rows: usize) -> Dataset {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let premium_dist = LogNormal::new(5.0, 0.6).expect("valid LogNormal params");
    let value_dist = LogNormal::new(11.8, 0.8).expect("valid LogNormal params");
    let extra_claims = Poisson::new(0.3).expect("valid Poisson params");

    let mut province = Vec::with_capacity(rows);
    let mut postal = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut cover = Vec::with_capacity(rows);
    let mut body = Vec::with_capacity(rows);
    let mut legal = Vec::with_capacity(rows);
    let mut premium = Vec::with_capacity(rows);
    let mut claims = Vec::with_capacity(rows);
    let mut claim_count = Vec::with_capacity(rows);
    let mut sum_insured = Vec::with_capacity(rows);
    let mut value_estimate = Vec::with_capacity(rows);

    for _ in 0..rows {
        let profile = &PROVINCES[rng.random_range(0..PROVINCES.len())];
        province.push(Some(profile.name.to_string()));
        postal.push(Some(profile.postal_codes[rng.random_range(0..profile.postal_codes.len())].to_string()));

        // A thin slice of the book has no recorded gender.
        gender.push(if rng.random_bool(0.02) {
            None
        } else {
            Some(if rng.random_bool(0.45) { "F" } else { "M" }.to_string())
        });
        cover.push(Some(COVER_CATEGORIES[rng.random_range(0..COVER_CATEGORIES.len())].to_string()));
        body.push(Some(BODY_TYPES[rng.random_range(0..BODY_TYPES.len())].to_string()));
        legal.push(Some(LEGAL_TYPES[rng.random_range(0..LEGAL_TYPES.len())].to_string()));

        let vehicle_value = value_dist.sample(&mut rng);
        value_estimate.push(if rng.random_bool(0.10) { None } else { Some(vehicle_value) });
        sum_insured.push(Some(vehicle_value * rng.random_range(0.85..1.05)));
        premium.push(Some(premium_dist.sample(&mut rng)));

        let severity_dist =
            LogNormal::new(profile.severity_mu, 1.0).expect("valid LogNormal params");
        if rng.random_bool(profile.claim_rate) {
            let n_claims = 1 + extra_claims.sample(&mut rng) as u64;
            let total: f64 = (0..n_claims).map(|_| severity_dist.sample(&mut rng)).sum();
            claims.push(Some(total));
            claim_count.push(Some(n_claims as f64));
        } else {
            claims.push(Some(0.0));
            claim_count.push(Some(0.0));
        }
    }

    Dataset::new(rows)
        .with_categorical(columns::PROVINCE, province)
        .expect("row count matches")
        .with_categorical(columns::POSTAL_CODE, postal)
        .expect("row count matches")
        .with_categorical(columns::GENDER, gender)
        .expect("row count matches")
        .with_categorical(columns::COVER_CATEGORY, cover)
        .expect("row count matches")
        .with_categorical(columns::BODY_TYPE, body)
        .expect("row count matches")
        .with_categorical(columns::LEGAL_TYPE, legal)
        .expect("row count matches")
        .with_numeric(columns::TOTAL_PREMIUM, premium)
        .expect("row count matches")
        .with_numeric(columns::TOTAL_CLAIMS, claims)
        .expect("row count matches")
        .with_numeric(columns::CLAIM_COUNT, claim_count)
        .expect("row count matches")
        .with_numeric(columns::SUM_INSURED, sum_insured)
        .expect("row count matches")
        .with_numeric(columns::CUSTOM_VALUE_ESTIMATE, value_estimate)
        .expect("row count matches")
}
