//! Exploratory statistics over a raw batch.
//!
//! Nothing here feeds the persona table. These are descriptive summaries and
//! a single nonparametric test used to eyeball differences between groups.

use crate::models::Record;
use serde::Serialize;
use std::collections::BTreeMap;

/// Revenue of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRevenue {
    pub country: String,
    pub revenue: f64,
    /// Share of all records, in percent.
    pub customer_share: f64,
    pub mean_price: f64,
}

/// Descriptive profile of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchProfile {
    pub records: usize,
    pub countries: BTreeMap<String, usize>,
    pub platforms: BTreeMap<String, usize>,
    pub sexes: BTreeMap<String, usize>,
    /// Distinct price levels and how often each occurs, keyed by the printed price.
    pub price_levels: BTreeMap<String, usize>,
    /// Countries sorted by revenue, highest first.
    pub revenue_by_country: Vec<CountryRevenue>,
    pub mean_by_platform: BTreeMap<String, f64>,
    /// Mean price per `COUNTRY/PLATFORM`.
    pub mean_by_country_platform: BTreeMap<String, f64>,
}

impl BatchProfile {
    pub fn from_records(records: &[Record]) -> Self {
        let mut profile = BatchProfile {
            records: records.len(),
            ..Default::default()
        };

        let mut country_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut platform_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut pair_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut prices: Vec<f64> = Vec::with_capacity(records.len());

        for record in records {
            let country = record.country.trim().to_uppercase();
            let platform = record.platform.trim().to_uppercase();
            let sex = record.sex.trim().to_uppercase();

            *profile.countries.entry(country.clone()).or_default() += 1;
            *profile.platforms.entry(platform.clone()).or_default() += 1;
            *profile.sexes.entry(sex).or_default() += 1;
            prices.push(record.price);

            accumulate(&mut country_sums, &country, record.price);
            accumulate(&mut platform_sums, &platform, record.price);
            accumulate(
                &mut pair_sums,
                &format!("{}/{}", country, platform),
                record.price,
            );
        }

        prices.sort_by(f64::total_cmp);
        for price in prices {
            *profile.price_levels.entry(format!("{}", price)).or_default() += 1;
        }

        let total = records.len().max(1) as f64;
        profile.revenue_by_country = country_sums
            .into_iter()
            .map(|(country, (sum, count))| CountryRevenue {
                country,
                revenue: sum,
                customer_share: count as f64 * 100.0 / total,
                mean_price: sum / count as f64,
            })
            .collect();
        profile
            .revenue_by_country
            .sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

        profile.mean_by_platform = means(platform_sums);
        profile.mean_by_country_platform = means(pair_sums);

        profile
    }
}

fn accumulate(map: &mut BTreeMap<String, (f64, usize)>, key: &str, value: f64) {
    let entry = map.entry(key.to_string()).or_insert((0.0, 0));
    entry.0 += value;
    entry.1 += 1;
}

fn means(sums: BTreeMap<String, (f64, usize)>) -> BTreeMap<String, f64> {
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Outcome of a two-sided Mann-Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MannWhitney {
    /// U statistic of the first sample.
    pub u: f64,
    pub p_value: f64,
    pub n1: usize,
    pub n2: usize,
}

impl MannWhitney {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Two-sided Mann-Whitney U test.
///
/// Ties get average ranks. The p-value uses the tie-corrected normal
/// approximation with a 0.5 continuity correction. Empty samples or samples
/// with no variance give `p = 1`.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> MannWhitney {
    let n1 = a.len();
    let n2 = b.len();
    if n1 == 0 || n2 == 0 {
        return MannWhitney {
            u: 0.0,
            p_value: 1.0,
            n1,
            n2,
        };
    }

    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|&v| (v, true))
        .chain(b.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    let n = pooled.len();
    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        // Ranks i+1..=j+1 share their average.
        let avg_rank = (i + j + 2) as f64 / 2.0;
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        rank_sum_a += pooled[i..=j].iter().filter(|(_, from_a)| *from_a).count() as f64 * avg_rank;
        i = j + 1;
    }

    let (n1f, n2f, nf) = (n1 as f64, n2 as f64, n as f64);
    let u1 = rank_sum_a - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;
    let mu = n1f * n2f / 2.0;
    let variance = n1f * n2f / 12.0 * ((nf + 1.0) - tie_term / (nf * (nf - 1.0)));

    let p_value = if variance <= 0.0 {
        1.0
    } else {
        let z = (u1.max(u2) - mu - 0.5) / variance.sqrt();
        (2.0 * normal_sf(z)).min(1.0)
    };

    MannWhitney {
        u: u1,
        p_value,
        n1,
        n2,
    }
}

/// Compare prices of two platforms within one country (codes matched case-insensitively).
pub fn compare_platforms(
    records: &[Record],
    country: &str,
    platform_a: &str,
    platform_b: &str,
) -> MannWhitney {
    let sample = |platform: &str| -> Vec<f64> {
        records
            .iter()
            .filter(|r| {
                r.country.trim().eq_ignore_ascii_case(country.trim())
                    && r.platform.trim().eq_ignore_ascii_case(platform.trim())
            })
            .map(|r| r.price)
            .collect()
    };
    mann_whitney_u(&sample(platform_a), &sample(platform_b))
}

/// Upper tail of the standard normal distribution.
fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function, Chebyshev fit with fractional error below 1.2e-7.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}
