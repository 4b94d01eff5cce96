use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CITY_NAME_MAX: usize = 100;
pub const COUNTRY_CODE_MAX: usize = 10;
pub const NOTES_MAX: usize = 500;

/// A saved location as persisted in the locations file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: u64,
    pub city_name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn same_city(&self, city_name: &str) -> bool {
        self.city_name.to_lowercase() == city_name.to_lowercase()
    }
}

/// Input for creating a location; id and timestamps are assigned by the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewLocation {
    pub city_name: String,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub is_favorite: bool,
}

/// Fields a client may change after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationField {
    CityName,
    CountryCode,
    Latitude,
    Longitude,
    Notes,
    IsFavorite,
}

impl LocationField {
    pub const UPDATABLE: [LocationField; 6] = [
        LocationField::CityName,
        LocationField::CountryCode,
        LocationField::Latitude,
        LocationField::Longitude,
        LocationField::Notes,
        LocationField::IsFavorite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LocationField::CityName => "city_name",
            LocationField::CountryCode => "country_code",
            LocationField::Latitude => "latitude",
            LocationField::Longitude => "longitude",
            LocationField::Notes => "notes",
            LocationField::IsFavorite => "is_favorite",
        }
    }

    /// `None` for unknown and for non-updatable names such as `id`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::UPDATABLE.into_iter().find(|f| f.name() == name)
    }
}

/// A partial update. The outer `Option` says whether the field was sent,
/// the inner one (for nullable fields) whether it is being cleared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationPatch {
    pub city_name: Option<String>,
    pub country_code: Option<Option<String>>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub notes: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        *self == LocationPatch::default()
    }

    /// Apply the present fields; timestamps are the caller's concern.
    pub fn apply_to(self, loc: &mut Location) {
        if let Some(city_name) = self.city_name {
            loc.city_name = city_name;
        }
        if let Some(country_code) = self.country_code {
            loc.country_code = country_code;
        }
        if let Some(latitude) = self.latitude {
            loc.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            loc.longitude = longitude;
        }
        if let Some(notes) = self.notes {
            loc.notes = notes;
        }
        if let Some(is_favorite) = self.is_favorite {
            loc.is_favorite = is_favorite;
        }
    }
}

/// RFC 3339 on write. On read, offset-less ISO-8601 timestamps (as written
/// by older versions of the locations file) are taken as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(D::Error::custom)
    }
}
