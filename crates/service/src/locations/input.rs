//! Sanitization of untrusted location payloads.
//!
//! Request bodies arrive as loose JSON: coordinates may be strings, flags may
//! be "yes"/"0"/"on". Everything is normalized here before it reaches the store.

use serde_json::{Map, Value};

use super::domain::{LocationField, LocationPatch, NewLocation, CITY_NAME_MAX, COUNTRY_CODE_MAX, NOTES_MAX};
use crate::errors::ServiceError;

/// Validate a create payload. `city_name` is required.
pub fn sanitize_new(body: &Value) -> Result<NewLocation, ServiceError> {
    let obj = as_object(body)?;

    let city_name = match obj.get("city_name") {
        Some(v) => city_name(v)?,
        None => return Err(invalid("city_name is required")),
    };

    Ok(NewLocation {
        city_name,
        country_code: match obj.get("country_code") {
            Some(v) => country_code(v)?,
            None => None,
        },
        latitude: match obj.get("latitude") {
            Some(v) => coordinate(v, "latitude", 90.0)?,
            None => None,
        },
        longitude: match obj.get("longitude") {
            Some(v) => coordinate(v, "longitude", 180.0)?,
            None => None,
        },
        notes: match obj.get("notes") {
            Some(v) => bounded_text(v, "notes", NOTES_MAX)?,
            None => None,
        },
        is_favorite: match obj.get("is_favorite") {
            Some(v) => flag(v)?,
            None => false,
        },
    })
}

/// Validate an update payload. Keys outside [`LocationField::UPDATABLE`]
/// are ignored.
pub fn sanitize_patch(body: &Value) -> Result<LocationPatch, ServiceError> {
    let obj = as_object(body)?;
    let mut patch = LocationPatch::default();

    for (key, value) in obj {
        let Some(field) = LocationField::from_name(key) else {
            continue;
        };
        match field {
            LocationField::CityName => patch.city_name = Some(city_name(value)?),
            LocationField::CountryCode => patch.country_code = Some(country_code(value)?),
            LocationField::Latitude => patch.latitude = Some(coordinate(value, "latitude", 90.0)?),
            LocationField::Longitude => patch.longitude = Some(coordinate(value, "longitude", 180.0)?),
            LocationField::Notes => patch.notes = Some(bounded_text(value, "notes", NOTES_MAX)?),
            LocationField::IsFavorite => patch.is_favorite = Some(flag(value)?),
        }
    }
    Ok(patch)
}

fn invalid(msg: impl Into<String>) -> ServiceError {
    ServiceError::Validation(msg.into())
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ServiceError> {
    body.as_object().ok_or_else(|| invalid("request body must be a JSON object"))
}

fn city_name(value: &Value) -> Result<String, ServiceError> {
    match bounded_text(value, "city_name", CITY_NAME_MAX)? {
        Some(name) => Ok(name),
        None => Err(invalid("city_name must not be empty")),
    }
}

fn country_code(value: &Value) -> Result<Option<String>, ServiceError> {
    Ok(bounded_text(value, "country_code", COUNTRY_CODE_MAX)?.map(|c| c.to_uppercase()))
}

/// Trimmed string with a length cap; null and blank become `None`.
fn bounded_text(value: &Value, field: &str, max: usize) -> Result<Option<String>, ServiceError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.trim(),
        _ => return Err(invalid(format!("{field} must be a string"))),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.chars().count() > max {
        return Err(invalid(format!("{field} must be at most {max} characters")));
    }
    Ok(Some(raw.to_string()))
}

/// Number or numeric string within `[-limit, limit]`; null and blank become `None`.
fn coordinate(value: &Value, field: &str, limit: f64) -> Result<Option<f64>, ServiceError> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && (-limit..=limit).contains(&v) => Ok(Some(v)),
        Some(_) => Err(invalid(format!("{field} must be between -{limit} and {limit}"))),
        None => Err(invalid(format!("{field} must be a number"))),
    }
}

fn flag(value: &Value) -> Result<bool, ServiceError> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid("is_favorite must be a boolean")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(invalid("is_favorite must be a boolean")),
        },
        _ => Err(invalid("is_favorite must be a boolean")),
    }
}
