//! Value objects and enumerations describing a listing

use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of property advertised by a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyType {
    Apartment,
    House,
    Condo,
    Studio,
    #[default]
    Unknown,
}

impl PropertyType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Condo => "condo",
            Self::Studio => "studio",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "apartment" => Some(Self::Apartment),
            "house" => Some(Self::House),
            "condo" => Some(Self::Condo),
            "studio" => Some(Self::Studio),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Furnishing state reported by the detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FurnishedStatus {
    Furnished,
    SemiFurnished,
    Unfurnished,
    #[default]
    Unknown,
}

impl FurnishedStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Furnished => "furnished",
            Self::SemiFurnished => "semi_furnished",
            Self::Unfurnished => "unfurnished",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "furnished" => Some(Self::Furnished),
            "semi_furnished" => Some(Self::SemiFurnished),
            "unfurnished" => Some(Self::Unfurnished),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Whether pets are accepted; `Unknown` is never conflated with `No`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PetFriendly {
    Yes,
    No,
    #[default]
    Unknown,
}

impl PetFriendly {
    /// Stored as 1 / 0 / NULL
    pub fn to_db_value(&self) -> Option<i64> {
        match self {
            Self::Yes => Some(1),
            Self::No => Some(0),
            Self::Unknown => None,
        }
    }

    pub fn from_db_value(value: Option<i64>) -> Self {
        match value {
            Some(0) => Self::No,
            Some(_) => Self::Yes,
            None => Self::Unknown,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Yes => Some(true),
            Self::No => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<bool> for PetFriendly {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Postal address; every part defaults to an empty string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Asking price breakdown, all values in the source currency
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceInfo {
    pub sale_price: f64,
    pub condo_fee: f64,
    pub iptu: f64,
}

/// Geographic position of a listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinates from parsed components, or `None` for a zero, non-finite
    /// or out-of-range pair
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && latitude != 0.0
            && longitude != 0.0
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then(|| Self::new(latitude, longitude))
    }
}

/// SHA-256 fingerprint of a raw detail payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes the exact bytes of `text`; no whitespace normalization is applied
    pub fn from_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an already computed hex digest (as read back from storage)
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable search input used to build outbound queries
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub city: String,
    pub state: String,
    pub neighborhoods: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub bedrooms_min: Option<u32>,
    pub bedrooms_max: Option<u32>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            neighborhoods: Vec::new(),
            price_min: None,
            price_max: None,
            bedrooms_min: None,
            bedrooms_max: None,
            area_min: None,
            area_max: None,
        }
    }
}

impl SearchCriteria {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            ..Self::default()
        }
    }

    /// Location slug understood by the source site, e.g. `sao-paulo-sp-brasil`
    pub fn location_slug(&self) -> String {
        format!(
            "{}-{}-brasil",
            slugify(&self.city),
            self.state.trim().to_lowercase()
        )
    }

    /// Filter parameters for an outbound search request
    ///
    /// Only bounds that are set are emitted; each neighborhood becomes its
    /// own `filters.location.neighborhoods` pair.
    ///
    /// # Returns
    ///
    /// * Key/value pairs in a stable order, empty for an unfiltered search
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs: Vec<(&'static str, String)> = self
            .neighborhoods
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| ("filters.location.neighborhoods", n.to_string()))
            .collect();

        let bounds = [
            ("filters.priceRange.min", self.price_min),
            ("filters.priceRange.max", self.price_max),
            ("filters.houseSpecs.bedrooms.min", self.bedrooms_min.map(f64::from)),
            ("filters.houseSpecs.bedrooms.max", self.bedrooms_max.map(f64::from)),
            ("filters.houseSpecs.area.min", self.area_min),
            ("filters.houseSpecs.area.max", self.area_max),
        ];
        for (key, value) in bounds {
            if let Some(value) = value {
                pairs.push((key, value.to_string()));
            }
        }
        pairs
    }
}

/// Lowercases, folds Portuguese diacritics to ASCII and joins words with hyphens
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .trim()
        .chars()
        .filter_map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => Some('e'),
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => Some('i'),
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => Some('o'),
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => Some('u'),
            'ç' | 'Ç' => Some('c'),
            'ñ' | 'Ñ' => Some('n'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            c if c.is_whitespace() || c == '-' => Some('-'),
            _ => None,
        })
        .collect();

    folded
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
