//! Unsupervised behavioral segmentation.
//!
//! Entities with at least one qualifying order are clustered with k-means
//! over standardized numeric features; entities with none are labeled
//! `Unsegmented` without entering the fit. All randomness flows through a
//! PCG generator seeded from configuration, so an identical input batch with
//! an identical seed always produces identical assignments.
//!
//! Known limitation, preserved deliberately: the cluster index -> label table
//! assumes consistent cluster ordering across independent fits, which k-means
//! does not guarantee. The same physical segment may map to a different label
//! after the input batch changes.

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rust_decimal::prelude::ToPrimitive;

use crate::config::SegmentationConfig;
use crate::domain::classification::Segment;
use crate::domain::customer::{CustomerAggregate, CustomerId};
use crate::domain::product::{ProductAggregate, ProductId};

#[derive(Clone, Debug)]
pub struct SegmentationEngine {
    config: SegmentationConfig,
}

impl SegmentationEngine {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Features: order count and recency in days. Customers with zero orders
    /// get `Unsegmented`.
    pub fn segment_customers(
        &self,
        aggregates: &[CustomerAggregate],
        today: NaiveDate,
    ) -> HashMap<CustomerId, Segment> {
        let mut assignments: HashMap<CustomerId, Segment> = aggregates
            .iter()
            .filter(|agg| agg.order_count == 0)
            .map(|agg| (agg.id, Segment::Unsegmented))
            .collect();

        let qualifying: Vec<&CustomerAggregate> =
            aggregates.iter().filter(|agg| agg.order_count > 0).collect();
        if qualifying.is_empty() {
            return assignments;
        }

        let rows: Vec<Vec<f64>> = qualifying
            .iter()
            .map(|agg| {
                vec![f64::from(agg.order_count), self.recency_days(agg.last_order_date, today)]
            })
            .collect();

        let labels = self.cluster_labels(rows, &self.config.customer_labels);
        for (agg, label) in qualifying.iter().zip(labels) {
            assignments.insert(agg.id, label);
        }
        assignments
    }

    /// Features: units sold, revenue, average price, and recency. Products
    /// that never sold get `Unsegmented`.
    pub fn segment_products(
        &self,
        aggregates: &[ProductAggregate],
        today: NaiveDate,
    ) -> HashMap<ProductId, Segment> {
        let mut assignments: HashMap<ProductId, Segment> = aggregates
            .iter()
            .filter(|agg| agg.total_units_sold == 0)
            .map(|agg| (agg.id, Segment::Unsegmented))
            .collect();

        let qualifying: Vec<&ProductAggregate> =
            aggregates.iter().filter(|agg| agg.total_units_sold > 0).collect();
        if qualifying.is_empty() {
            return assignments;
        }

        let rows: Vec<Vec<f64>> = qualifying
            .iter()
            .map(|agg| {
                vec![
                    f64::from(agg.total_units_sold),
                    agg.total_revenue.to_f64().unwrap_or(0.0),
                    agg.avg_price.to_f64().unwrap_or(0.0),
                    self.recency_days(agg.last_sold_date, today),
                ]
            })
            .collect();

        let labels = self.cluster_labels(rows, &self.config.product_labels);
        for (agg, label) in qualifying.iter().zip(labels) {
            assignments.insert(agg.id, label);
        }
        assignments
    }

    fn recency_days(&self, last: Option<NaiveDate>, today: NaiveDate) -> f64 {
        match last {
            Some(date) => (today - date).num_days() as f64,
            None => self.config.missing_recency_days as f64,
        }
    }

    fn cluster_labels(&self, mut rows: Vec<Vec<f64>>, labels: &[String]) -> Vec<Segment> {
        standardize(&mut rows);
        // A batch smaller than k still gets labels: shrink k to fit.
        let k = self.config.cluster_count.min(rows.len());
        let assignment = kmeans(&rows, k, self.config.seed, self.config.max_iterations);
        assignment
            .into_iter()
            .map(|cluster| match labels.get(cluster) {
                Some(label) => Segment::Cluster(label.clone()),
                None => Segment::Unsegmented,
            })
            .collect()
    }
}

/// Z-score each column over the batch. A zero-variance column contributes 0
/// deviation for every row instead of dividing by zero.
fn standardize(rows: &mut [Vec<f64>]) {
    if rows.is_empty() {
        return;
    }
    let dims = rows[0].len();
    let n = rows.len() as f64;

    for d in 0..dims {
        let mean: f64 = rows.iter().map(|row| row[d]).sum::<f64>() / n;
        let variance: f64 = rows.iter().map(|row| (row[d] - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        for row in rows.iter_mut() {
            row[d] = if std_dev > 0.0 { (row[d] - mean) / std_dev } else { 0.0 };
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Lloyd's algorithm with k-means++ seeding over a PCG stream. Deterministic
/// for a fixed (input, k, seed) triple. Ties in assignment go to the lowest
/// cluster index; an emptied cluster keeps its previous centroid.
fn kmeans(rows: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> Vec<usize> {
    if rows.is_empty() || k == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![0; rows.len()];
    }

    let mut rng = Pcg64::seed_from_u64(seed);
    let mut centroids = seed_centroids(rows, k, &mut rng);
    let mut assignment = vec![0usize; rows.len()];

    for _ in 0..max_iterations {
        let mut changed = false;
        for (i, row) in rows.iter().enumerate() {
            let nearest = nearest_centroid(row, &centroids);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = rows
                .iter()
                .zip(&assignment)
                .filter(|(_, &a)| a == cluster)
                .map(|(row, _)| row)
                .collect();
            if members.is_empty() {
                continue;
            }
            for (d, value) in centroid.iter_mut().enumerate() {
                *value = members.iter().map(|row| row[d]).sum::<f64>() / members.len() as f64;
            }
        }
    }

    assignment
}

fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(row, centroid);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// k-means++: first centroid uniform, each further centroid drawn with
/// probability proportional to squared distance from the nearest one chosen
/// so far.
fn seed_centroids(rows: &[Vec<f64>], k: usize, rng: &mut Pcg64) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(rows[rng.gen_range(0..rows.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = rows
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| squared_distance(row, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = rows.len() - 1;
            for (i, weight) in weights.iter().enumerate() {
                target -= weight;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // All points coincide with a centroid already.
            rng.gen_range(0..rows.len())
        };
        centroids.push(rows[next].clone());
    }

    centroids
}
