//! Value conversion between two units of the same kind.
//!
//! `1 <unit> = conversion_factor <base_unit>`, so a value goes through the
//! shared base unit: `value × from.factor ÷ to.factor`.

use crate::interface::{Conversion, Unit, UnitDecoderError};

const RESULT_DECIMALS: i32 = 6;

fn round_result(value: f64) -> f64 {
    let scale = 10f64.powi(RESULT_DECIMALS);
    (value * scale).round() / scale
}

/// Convert `value` from one unit to another.
///
/// Callers are responsible for only passing verified units.
pub fn convert(from: &Unit, to: &Unit, value: f64) -> Result<Conversion, UnitDecoderError> {
    if !value.is_finite() {
        return Err(UnitDecoderError::InvalidValue(value));
    }
    if from.category != to.category {
        return Err(UnitDecoderError::IncompatibleCategory {
            from: from.category.clone(),
            to: to.category.clone(),
        });
    }
    if from.base_unit != to.base_unit {
        return Err(UnitDecoderError::IncompatibleBaseUnit {
            from: from.base_unit.clone(),
            to: to.base_unit.clone(),
        });
    }

    let raw = value * from.conversion_factor / to.conversion_factor;
    if !raw.is_finite() {
        return Err(UnitDecoderError::InvalidValue(value));
    }
    let result = round_result(raw);

    Ok(Conversion {
        input_value: value,
        result,
        formula: format!(
            "{} {} × {} ÷ {} = {:.6} {}",
            value, from.name, from.conversion_factor, to.conversion_factor, result, to.name
        ),
        from_unit: from.clone(),
        to_unit: to.clone(),
    })
}
