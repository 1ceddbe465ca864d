//! Decoding of comma-separated sensor readings.
//!
//! Phone sensor bridges are sloppy about framing: stray line breaks, doubled
//! commas, missing trailing fields. Decoding is lenient about all of that and
//! only rejects fields that are present but not numeric.
//!
//! Reading layout: `ax,ay,az,gx,gy,gz`. Missing fields read as zero; extra
//! fields are ignored.

use crate::error::PacketError;
use crate::types::Sample;

/// Number of sensor fields in one reading.
pub const READING_FIELDS: usize = 6;

/// Decode a reading and stamp it with `timestamp` (seconds).
pub fn parse_reading(raw: &str, timestamp: f64) -> Result<Sample, PacketError> {
    let fields = normalize(raw);
    let values = parse_fields(&fields, 0)?;
    Ok(sample_from(timestamp, &values))
}

/// Decode a reading whose first field is its timestamp in seconds.
///
/// Used to replay recordings, where arrival time carries no meaning.
pub fn parse_timestamped_reading(raw: &str) -> Result<Sample, PacketError> {
    let fields = normalize(raw);
    let (first, rest) = fields.split_first().ok_or(PacketError::MissingTimestamp)?;
    let timestamp = parse_field(first, 0)?;
    if !timestamp.is_finite() {
        return Err(PacketError::InvalidField {
            index: 0,
            value: first.to_string(),
        });
    }
    let values = parse_fields(rest, 1)?;
    Ok(sample_from(timestamp, &values))
}

/// Strip control whitespace, collapse comma runs, trim edge commas.
fn normalize(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect();
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_fields(fields: &[String], index_offset: usize) -> Result<[f64; READING_FIELDS], PacketError> {
    let mut values = [0.0; READING_FIELDS];
    for (i, field) in fields.iter().take(READING_FIELDS).enumerate() {
        values[i] = parse_field(field, i + index_offset)?;
    }
    Ok(values)
}

fn parse_field(field: &str, index: usize) -> Result<f64, PacketError> {
    field.parse::<f64>().map_err(|_| PacketError::InvalidField {
        index,
        value: field.to_string(),
    })
}

fn sample_from(timestamp: f64, values: &[f64; READING_FIELDS]) -> Sample {
    Sample::new(
        timestamp,
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
    )
}
