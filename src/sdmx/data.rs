//! SDMX-JSON data message decoding.
//!
//! Handles series-keyed (`dataSets[].series["0:1"].observations["3"]`) and flat
//! (`dataSets[].observations["0:1:3"]`) layouts, with the structure either at
//! `structure` (1.0) or `structures[n]` (2.0), optionally wrapped in `data`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::period::TIME_PERIOD;
use crate::table::{Table, Value};

pub const OBS_VALUE: &str = "OBS_VALUE";

/// One observation with its full dimension key.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Code ids aligned with [`DataMessage::dimensions`].
    pub key: Vec<String>,
    pub value: Option<f64>,
}

/// A decoded data message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataMessage {
    /// Dimension ids in key order: dataset-level, series-level, observation-level.
    pub dimensions: Vec<String>,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct RawDimValue {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawDimension {
    id: String,
    #[serde(default)]
    values: Vec<RawDimValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDimensions {
    #[serde(default)]
    data_set: Vec<RawDimension>,
    #[serde(default)]
    series: Vec<RawDimension>,
    #[serde(default)]
    observation: Vec<RawDimension>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStructure {
    #[serde(default)]
    dimensions: RawDimensions,
}

#[derive(Debug, Default, Deserialize)]
struct RawSeries {
    #[serde(default)]
    observations: BTreeMap<String, Vec<Json>>,
}

#[derive(Debug, Deserialize)]
struct RawDataSet {
    #[serde(default)]
    structure: Option<usize>,
    #[serde(default)]
    series: BTreeMap<String, RawSeries>,
    #[serde(default)]
    observations: BTreeMap<String, Vec<Json>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBody {
    #[serde(default)]
    data_sets: Vec<RawDataSet>,
    #[serde(default)]
    structure: Option<RawStructure>,
    #[serde(default)]
    structures: Vec<RawStructure>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDataMessage {
    Wrapped { data: RawBody },
    Bare(RawBody),
}

impl DataMessage {
    /// Decodes an SDMX-JSON data message.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawDataMessage =
            serde_json::from_str(text).map_err(|e| Error::parse(format!("data message: {e}")))?;
        let body = match raw {
            RawDataMessage::Wrapped { data } => data,
            RawDataMessage::Bare(body) => body,
        };
        decode(body)
    }

    /// Materializes the observations as `{dimensions..., TIME_PERIOD, OBS_VALUE}`.
    pub fn to_table(&self) -> Table {
        let time_idx = self.dimensions.iter().position(|d| d == TIME_PERIOD);
        let mut columns: Vec<&str> = self
            .dimensions
            .iter()
            .map(String::as_str)
            .filter(|d| *d != TIME_PERIOD)
            .collect();
        columns.push(TIME_PERIOD);
        columns.push(OBS_VALUE);

        let mut table = Table::new(columns);
        for obs in &self.observations {
            let mut row: Vec<Value> = obs
                .key
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != time_idx)
                .map(|(_, k)| Value::from(k.as_str()))
                .collect();
            row.push(time_idx.map(|i| Value::from(obs.key[i].as_str())).unwrap_or(Value::Null));
            row.push(obs.value.into());
            table.push_row(row);
        }
        table
    }
}

fn decode(body: RawBody) -> Result<DataMessage> {
    let structures: Vec<RawStructure> = match body.structure {
        Some(s) => vec![s],
        None => body.structures,
    };
    if body.data_sets.is_empty() {
        return Ok(DataMessage::default());
    }

    let mut out = DataMessage::default();
    for ds in body.data_sets {
        let idx = ds.structure.unwrap_or(0);
        let st = structures
            .get(idx)
            .ok_or_else(|| Error::parse(format!("dataset refers to missing structure {idx}")))?;
        let dims = &st.dimensions;
        let names: Vec<String> = dims
            .data_set
            .iter()
            .chain(&dims.series)
            .chain(&dims.observation)
            .map(|d| d.id.clone())
            .collect();
        if out.dimensions.is_empty() {
            out.dimensions = names;
        } else if out.dimensions != names {
            return Err(Error::parse("datasets with different dimension layouts"));
        }

        let fixed: Vec<String> = dims
            .data_set
            .iter()
            .map(|d| code_at(d, 0))
            .collect::<Result<_>>()?;

        for (series_key, series) in sorted(&ds.series)? {
            let series_codes = codes(&dims.series, &series_key)?;
            for (obs_key, values) in sorted(&series.observations)? {
                let mut key = fixed.clone();
                key.extend(series_codes.iter().cloned());
                key.extend(codes(&dims.observation, &obs_key)?);
                out.observations.push(Observation {
                    key,
                    value: obs_value(values),
                });
            }
        }

        for (obs_key, values) in sorted(&ds.observations)? {
            let mut key = fixed.clone();
            key.extend(codes(&dims.observation, &obs_key)?);
            out.observations.push(Observation {
                key,
                value: obs_value(values),
            });
        }
    }
    Ok(out)
}

fn parse_key(key: &str) -> Result<Vec<usize>> {
    if key.is_empty() {
        return Ok(Vec::new());
    }
    key.split(':')
        .map(|p| {
            p.parse::<usize>()
                .map_err(|_| Error::parse(format!("invalid observation key {key:?}")))
        })
        .collect()
}

// JSON object keys sort as strings; order entries by numeric key instead.
fn sorted<T>(m: &BTreeMap<String, T>) -> Result<Vec<(Vec<usize>, &T)>> {
    let mut v = m
        .iter()
        .map(|(k, t)| Ok((parse_key(k)?, t)))
        .collect::<Result<Vec<_>>>()?;
    v.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(v)
}

fn codes(dims: &[RawDimension], key: &[usize]) -> Result<Vec<String>> {
    if dims.len() != key.len() {
        return Err(Error::parse(format!(
            "key has {} positions but {} dimensions are declared",
            key.len(),
            dims.len()
        )));
    }
    dims.iter().zip(key).map(|(d, &i)| code_at(d, i)).collect()
}

fn code_at(dim: &RawDimension, i: usize) -> Result<String> {
    dim.values
        .get(i)
        .map(|v| v.id.clone())
        .ok_or_else(|| Error::parse(format!("value index {i} out of range for dimension {}", dim.id)))
}

fn obs_value(values: &[Json]) -> Option<f64> {
    match values.first()? {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES: &str = r#"{
      "meta": {},
      "data": {
        "dataSets": [{
          "structure": 0,
          "series": {
            "0:1": {"observations": {"10": ["3.5"], "2": [1.25, 0]}},
            "0:0": {"observations": {"0": [null]}}
          }
        }],
        "structures": [{
          "dimensions": {
            "series": [
              {"id": "FREQ", "values": [{"id": "Q"}]},
              {"id": "REF_AREA", "values": [{"id": "GB"}, {"id": "US"}]}
            ],
            "observation": [{"id": "TIME_PERIOD", "values": [
              {"id": "2000-Q1"}, {"id": "2000-Q2"}, {"id": "2000-Q3"}, {"id": "2000-Q4"},
              {"id": "2001-Q1"}, {"id": "2001-Q2"}, {"id": "2001-Q3"}, {"id": "2001-Q4"},
              {"id": "2002-Q1"}, {"id": "2002-Q2"}, {"id": "2002-Q3"}
            ]}]
          }
        }]
      }
    }"#;

    #[test]
    fn decodes_series_layout_in_numeric_order() {
        let msg = DataMessage::from_json(SERIES).unwrap();
        assert_eq!(msg.dimensions, ["FREQ", "REF_AREA", "TIME_PERIOD"]);
        assert_eq!(msg.observations.len(), 3);
        assert_eq!(msg.observations[0].key, ["Q", "GB", "2000-Q1"]);
        assert_eq!(msg.observations[0].value, None);
        assert_eq!(msg.observations[1].key, ["Q", "US", "2000-Q3"]);
        assert_eq!(msg.observations[1].value, Some(1.25));
        assert_eq!(msg.observations[2].key, ["Q", "US", "2002-Q3"]);
        assert_eq!(msg.observations[2].value, Some(3.5));
    }

    #[test]
    fn table_puts_time_and_value_last() {
        let table = DataMessage::from_json(SERIES).unwrap().to_table();
        assert_eq!(table.columns(), ["FREQ", "REF_AREA", "TIME_PERIOD", "OBS_VALUE"]);
        assert_eq!(table.get(2, TIME_PERIOD), Some(&Value::from("2002-Q3")));
        assert_eq!(table.get(2, OBS_VALUE), Some(&Value::Num(3.5)));
        assert!(table.get(0, OBS_VALUE).unwrap().is_null());
    }

    #[test]
    fn decodes_flat_layout_with_dataset_dimensions() {
        let text = r#"{
          "dataSets": [{"observations": {"0:1": [7], "0:0": ["x"]}}],
          "structure": {"dimensions": {
            "dataSet": [{"id": "FREQ", "values": [{"id": "A"}]}],
            "observation": [
              {"id": "REF_AREA", "values": [{"id": "US"}]},
              {"id": "TIME_PERIOD", "values": [{"id": "1999"}, {"id": "2000"}]}
            ]
          }}
        }"#;
        let msg = DataMessage::from_json(text).unwrap();
        assert_eq!(msg.observations[0].key, ["A", "US", "1999"]);
        assert_eq!(msg.observations[0].value, None);
        assert_eq!(msg.observations[1].value, Some(7.0));
    }

    #[test]
    fn empty_message_yields_empty_table_with_schema() {
        let msg = DataMessage::from_json(r#"{"data": {"dataSets": [], "structures": []}}"#).unwrap();
        let table = msg.to_table();
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["TIME_PERIOD", "OBS_VALUE"]);
    }

    #[test]
    fn out_of_range_index_is_a_parse_error() {
        let text = r#"{"dataSets": [{"observations": {"5": [1]}}],
          "structure": {"dimensions": {"observation": [{"id": "TIME_PERIOD", "values": [{"id": "2000"}]}]}}}"#;
        assert!(matches!(DataMessage::from_json(text), Err(Error::Parse(_))));
    }
}
