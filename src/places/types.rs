use crate::area::{Bounds, LatLng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which attributes the detail phase requests for every place
///
/// Each flag maps to one Places API field; the place ID is always requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AttributeSet {
    pub name: bool,
    pub address: bool,
    pub location: bool,
    pub types: bool,
    pub primary_type: bool,
    pub business_status: bool,
    pub rating: bool,
    pub user_rating_count: bool,
    pub national_phone: bool,
    pub international_phone: bool,
    pub website: bool,
    pub google_maps_uri: bool,
    pub price_level: bool,
    pub opening_hours: bool,
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self {
            name: true,
            address: true,
            location: true,
            types: true,
            primary_type: false,
            business_status: true,
            rating: true,
            user_rating_count: true,
            national_phone: true,
            international_phone: false,
            website: true,
            google_maps_uri: true,
            price_level: false,
            opening_hours: false,
        }
    }
}

impl AttributeSet {
    /// Only the place ID
    pub fn id_only() -> Self {
        Self {
            name: false,
            address: false,
            location: false,
            types: false,
            primary_type: false,
            business_status: false,
            rating: false,
            user_rating_count: false,
            national_phone: false,
            international_phone: false,
            website: false,
            google_maps_uri: false,
            price_level: false,
            opening_hours: false,
        }
    }

    /// Places API field names for the selected attributes
    pub fn field_mask(&self) -> Vec<&'static str> {
        let mut fields = vec!["id"];
        let flags = [
            (self.name, "displayName"),
            (self.address, "formattedAddress"),
            (self.location, "location"),
            (self.types, "types"),
            (self.primary_type, "primaryType"),
            (self.business_status, "businessStatus"),
            (self.rating, "rating"),
            (self.user_rating_count, "userRatingCount"),
            (self.national_phone, "nationalPhoneNumber"),
            (self.international_phone, "internationalPhoneNumber"),
            (self.website, "websiteUri"),
            (self.google_maps_uri, "googleMapsUri"),
            (self.price_level, "priceLevel"),
            (self.opening_hours, "regularOpeningHours"),
        ];
        fields.extend(flags.iter().filter(|(on, _)| *on).map(|(_, field)| *field));
        fields
    }
}

/// One pass of the per-cell query loop
///
/// An empty type list is modelled as a single `Unfiltered` pass so every
/// cell runs the same loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeFilter {
    Unfiltered,
    Included(String),
}

impl TypeFilter {
    /// Builds the query list from configured type names
    ///
    /// Blank entries and duplicates are dropped; an empty result becomes
    /// `[Unfiltered]`.
    pub fn list_from(types: &[String]) -> Vec<TypeFilter> {
        let mut filters: Vec<TypeFilter> = Vec::new();
        for name in types.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let filter = TypeFilter::Included(name.to_string());
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }
        if filters.is_empty() {
            filters.push(TypeFilter::Unfiltered);
        }
        filters
    }

    /// The `includedType` value to send, if any
    pub fn included_type(&self) -> Option<&str> {
        match self {
            Self::Unfiltered => None,
            Self::Included(name) => Some(name),
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfiltered => write!(f, "*"),
            Self::Included(name) => write!(f, "{}", name),
        }
    }
}

/// Where a search query is restricted to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchRegion {
    /// Hard restriction to a rectangle
    Rectangle(Bounds),
    /// Soft bias towards a circle (used for point-like areas)
    Circle { center: LatLng, radius_m: f64 },
}

/// A single page request against the search endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub text_query: String,
    pub region: SearchRegion,
    pub included_type: Option<String>,
    pub page_token: Option<String>,
    pub page_size: u32,
    pub language_code: Option<String>,
    pub region_code: Option<String>,
}

/// A minimal search hit: just enough to deduplicate and spatially filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub place_id: String,
    pub location: Option<LatLng>,
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<SearchHit>,
    pub next_page_token: Option<String>,
}

/// Result of geocoding a location string
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub center: LatLng,
    pub viewport: Option<Bounds>,
    pub formatted_address: Option<String>,
}

/// Full attribute record for one place, the final output unit
///
/// Attributes that were not requested (or not returned) are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub place_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub international_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_maps_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opening_hours: Vec<String>,
}

impl PlaceRecord {
    pub fn new(place_id: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            ..Self::default()
        }
    }
}
