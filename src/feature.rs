// logcore - feature.rs
//
// Groups parsed records by categorical attribute keys and an optional
// UTC time bucket, then renders counter, sequence, or feature-vector
// output per group. Grounded on
// `original_source/src/feature_extractor.cpp`'s `group_logs` (group-key
// built from category attributes plus a floored time bucket, keyed by a
// `key:value;` string join), `apply_sliding_window` (groups no larger
// than the window pass through untouched; larger groups slide by
// `steps`), and `convert_to_counter_vector`/`convert_to_feature_vector`/
// `convert_to_sequence` (count, column-wise mean, space-joined bodies).
// Diverges from the source in two places: group keys use an
// insertion-ordered map instead of `std::unordered_map` (the source's
// iteration order — and therefore its `group_identifiers` output order —
// is unspecified; this crate makes it deterministic), and time buckets
// render in UTC rather than `std::localtime`'s environment-dependent
// local time, for the same reason.

use crate::error::LoaderError;
use crate::parsers::LogRecord;
use chrono::{DateTime, Timelike, Utc};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractorConfig {
    pub group_by_category: Vec<String>,
    /// Duration string with suffix s/m/h/d, e.g. "5m". `None` disables
    /// time bucketing.
    pub group_by_time: Option<String>,
    pub sliding_window: usize,
    pub steps: usize,
    pub max_feature_len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractionResult {
    pub event_indices: Vec<Vec<usize>>,
    pub group_identifiers: Vec<IndexMap<String, String>>,
    pub counts: Vec<usize>,
    pub sequences: Option<Vec<String>>,
    /// One row per group, one column per supplied feature.
    pub feature_vectors: Option<Vec<Vec<f64>>>,
}

pub struct FeatureExtractor {
    config: FeatureExtractorConfig,
    bucket_seconds: Option<i64>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureExtractorConfig) -> Result<Self, LoaderError> {
        if config.sliding_window > 0 && config.steps == 0 {
            return Err(LoaderError::InvalidInput {
                message: "steps must be positive when sliding_window > 0".to_string(),
            });
        }
        let bucket_seconds = config
            .group_by_time
            .as_deref()
            .map(parse_duration_seconds)
            .filter(|secs| *secs > 0);
        Ok(Self {
            config,
            bucket_seconds,
        })
    }

    /// Group `records`, optionally expanding large groups into sliding
    /// windows, and compute the counter/sequence outputs. `feature_table`
    /// (one numeric row per record, parallel to `records`, `None` entries
    /// treated as null) drives the optional feature-vector output.
    pub fn extract(
        &self,
        records: &[LogRecord],
        feature_table: Option<&[Vec<Option<f64>>]>,
    ) -> FeatureExtractionResult {
        let mut groups: IndexMap<Vec<String>, (IndexMap<String, String>, Vec<usize>)> =
            IndexMap::new();

        for (idx, record) in records.iter().enumerate() {
            let mut key = Vec::with_capacity(self.config.group_by_category.len() + 1);
            let mut identifiers = IndexMap::new();
            for category in &self.config.group_by_category {
                let value = record.get_field(category).to_string();
                identifiers.insert(category.clone(), value.clone());
                key.push(value);
            }

            if let Some(bucket_seconds) = self.bucket_seconds {
                match record.timestamp {
                    Some(ts) => {
                        let bucket = floor_to_bucket(ts, bucket_seconds);
                        identifiers.insert("time_bucket".to_string(), bucket.clone());
                        key.push(bucket);
                    }
                    None => continue,
                }
            }

            groups
                .entry(key)
                .or_insert_with(|| (identifiers, Vec::new()))
                .1
                .push(idx);
        }

        let mut event_indices = Vec::new();
        let mut group_identifiers = Vec::new();
        for (identifiers, indices) in groups.into_values() {
            if self.config.sliding_window > 0 && indices.len() > self.config.sliding_window {
                let mut start = 0;
                while start + self.config.sliding_window <= indices.len() {
                    event_indices.push(indices[start..start + self.config.sliding_window].to_vec());
                    group_identifiers.push(identifiers.clone());
                    start += self.config.steps;
                }
                if start < indices.len() {
                    let tail_start = indices.len().saturating_sub(self.config.sliding_window);
                    let tail = indices[tail_start..].to_vec();
                    if event_indices.last() != Some(&tail) {
                        event_indices.push(tail);
                        group_identifiers.push(identifiers);
                    }
                }
            } else {
                event_indices.push(indices);
                group_identifiers.push(identifiers);
            }
        }

        let counts = event_indices.iter().map(Vec::len).collect();

        let sequences = Some(
            event_indices
                .iter()
                .map(|indices| {
                    let joined = indices
                        .iter()
                        .map(|&i| records[i].body.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.truncate_sequence(joined)
                })
                .collect(),
        );

        let feature_vectors = feature_table.map(|table| {
            event_indices
                .iter()
                .map(|indices| column_means(table, indices))
                .collect()
        });

        FeatureExtractionResult {
            event_indices,
            group_identifiers,
            counts,
            sequences,
            feature_vectors,
        }
    }

    /// Caps a rendered sequence at `max_feature_len` characters; 0 means
    /// unbounded. The source declares `max_feature_len` on its config
    /// struct but never reads it in `convert_to_sequence` — this crate
    /// gives it the behavior its name implies rather than carrying the
    /// field over dead, per the Open Question decision in DESIGN.md.
    fn truncate_sequence(&self, sequence: String) -> String {
        if self.config.max_feature_len == 0 || sequence.chars().count() <= self.config.max_feature_len {
            sequence
        } else {
            sequence.chars().take(self.config.max_feature_len).collect()
        }
    }
}

fn column_means(table: &[Vec<Option<f64>>], indices: &[usize]) -> Vec<f64> {
    let num_columns = indices
        .iter()
        .filter_map(|&i| table.get(i))
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut sums = vec![0.0; num_columns];
    let mut counts = vec![0usize; num_columns];
    for &i in indices {
        let Some(row) = table.get(i) else { continue };
        for (col, value) in row.iter().enumerate() {
            if let Some(v) = value {
                sums[col] += v;
                counts[col] += 1;
            }
        }
    }
    sums.iter()
        .zip(counts.iter())
        .map(|(&sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect()
}

/// Floors `ts` to the nearest `bucket_seconds` boundary and renders it as
/// an ISO-8601 UTC datetime with no timezone suffix.
fn floor_to_bucket(ts: DateTime<Utc>, bucket_seconds: i64) -> String {
    let epoch = ts.timestamp();
    let floored = (epoch / bucket_seconds) * bucket_seconds;
    let bucketed = DateTime::from_timestamp(floored, 0).unwrap_or(ts);
    bucketed
        .with_nanosecond(0)
        .unwrap_or(bucketed)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Parses a duration string with suffix s/m/h/d. An unrecognized suffix
/// is treated as seconds, per spec.
fn parse_duration_seconds(spec: &str) -> i64 {
    let spec = spec.trim();
    if spec.is_empty() {
        return 0;
    }
    let (digits, multiplier) = match spec.chars().last().unwrap() {
        's' => (&spec[..spec.len() - 1], 1),
        'm' => (&spec[..spec.len() - 1], 60),
        'h' => (&spec[..spec.len() - 1], 3600),
        'd' => (&spec[..spec.len() - 1], 86400),
        _ => (spec, 1),
    };
    digits.trim().parse::<i64>().unwrap_or(0) * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(body: &str, category: Option<(&str, &str)>, ts: Option<DateTime<Utc>>) -> LogRecord {
        let mut r = LogRecord {
            body: body.to_string(),
            ..Default::default()
        };
        if let Some((k, v)) = category {
            r.set_field(k, v);
        }
        r.timestamp = ts;
        r
    }

    #[test]
    fn groups_by_category_in_insertion_order() {
        let config = FeatureExtractorConfig {
            group_by_category: vec!["host".to_string()],
            ..Default::default()
        };
        let extractor = FeatureExtractor::new(config).unwrap();
        let records = vec![
            record("a", Some(("host", "b")), None),
            record("b", Some(("host", "a")), None),
            record("c", Some(("host", "b")), None),
        ];
        let result = extractor.extract(&records, None);
        assert_eq!(result.counts, vec![2, 1]);
        assert_eq!(result.group_identifiers[0]["host"], "b");
        assert_eq!(result.group_identifiers[1]["host"], "a");
    }

    #[test]
    fn records_without_timestamp_excluded_from_time_bucketed_grouping() {
        let config = FeatureExtractorConfig {
            group_by_time: Some("1h".to_string()),
            ..Default::default()
        };
        let extractor = FeatureExtractor::new(config).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        let records = vec![record("a", None, Some(ts)), record("b", None, None)];
        let result = extractor.extract(&records, None);
        assert_eq!(result.event_indices, vec![vec![0]]);
    }

    #[test]
    fn time_bucket_floors_to_utc_hour_boundary() {
        let config = FeatureExtractorConfig {
            group_by_time: Some("1h".to_string()),
            ..Default::default()
        };
        let extractor = FeatureExtractor::new(config).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 45, 30).unwrap();
        let records = vec![record("a", None, Some(ts))];
        let result = extractor.extract(&records, None);
        assert_eq!(result.group_identifiers[0]["time_bucket"], "2024-01-01T12:00:00");
    }

    #[test]
    fn sliding_window_expands_large_groups() {
        let config = FeatureExtractorConfig {
            sliding_window: 2,
            steps: 1,
            ..Default::default()
        };
        let extractor = FeatureExtractor::new(config).unwrap();
        let records: Vec<LogRecord> = (0..4).map(|i| record(&i.to_string(), None, None)).collect();
        let result = extractor.extract(&records, None);
        assert_eq!(result.event_indices, vec![vec![0, 1], vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn zero_steps_with_positive_window_is_rejected() {
        let config = FeatureExtractorConfig {
            sliding_window: 2,
            steps: 0,
            ..Default::default()
        };
        assert!(FeatureExtractor::new(config).is_err());
    }

    #[test]
    fn feature_vector_is_column_wise_mean_skipping_nulls() {
        let config = FeatureExtractorConfig::default();
        let extractor = FeatureExtractor::new(config).unwrap();
        let records = vec![record("a", None, None), record("b", None, None)];
        let table = vec![vec![Some(2.0), None], vec![Some(4.0), Some(10.0)]];
        let result = extractor.extract(&records, Some(&table));
        let vectors = result.feature_vectors.unwrap();
        assert_eq!(vectors[0], vec![3.0, 10.0]);
    }

    #[test]
    fn unrecognized_duration_suffix_falls_back_to_seconds() {
        assert_eq!(parse_duration_seconds("30x"), 0);
        assert_eq!(parse_duration_seconds("30"), 30);
        assert_eq!(parse_duration_seconds("5m"), 300);
    }
}
