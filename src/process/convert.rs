// src/process/convert.rs

use anyhow::{anyhow, bail, Result};
use arrow::array::{Array, Date32Array, Float64Array, Int64Array, StringArray, UInt64Array};
use chrono::NaiveDate;

/// Map each year onto the Date32 of its January 1st.
pub fn year_to_date(years: &Int64Array) -> Result<Date32Array> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(|| anyhow!("invalid epoch"))?;
    years
        .iter()
        .map(|opt| {
            opt.map(|y| {
                let date = i32::try_from(y)
                    .ok()
                    .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                    .ok_or_else(|| anyhow!("year {} is out of range", y))?;
                i32::try_from(date.signed_duration_since(epoch).num_days())
                    .map_err(|_| anyhow!("year {} is out of range", y))
            })
            .transpose()
        })
        .collect()
}

/// Cast float counts to unsigned integers. Nulls stay null; a negative,
/// fractional or non-finite value fails the cast.
pub fn float_to_u64(values: &Float64Array) -> Result<UInt64Array> {
    let mut out = Vec::with_capacity(values.len());
    for (row, opt) in values.iter().enumerate() {
        match opt {
            None => out.push(None),
            Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < u64::MAX as f64 => {
                out.push(Some(v as u64))
            }
            Some(v) => bail!("cannot cast {} at row {} to an unsigned integer", v, row),
        }
    }
    Ok(UInt64Array::from(out))
}

/// Replace nulls with empty strings.
pub fn fill_empty(values: &StringArray) -> StringArray {
    values.iter().map(|v| Some(v.unwrap_or(""))).collect()
}
